//! Assembling one document from markdown files linked by include directives.
//!
//! A [`GraphBuilder`] parses a root document into a syntax tree, finds the
//! include directives in its text elements and recursively parses every
//! document they name into a [`DependencyGraph`]. [`assemble()`] then merges
//! the graph into a single tree which a [`Renderer`] or the external
//! converter serializes.

mod ast;
mod parse;
mod include;
mod graph;
mod assemble;
mod render;
mod convert;

pub use ast::*;
pub use parse::*;
pub use include::*;
pub use graph::*;
pub use assemble::*;
pub use render::*;
pub use convert::*;
