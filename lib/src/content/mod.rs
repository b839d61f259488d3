//! Turning raw items into typed content.
//!
//! A [`Pipeline`] runs every item of a [`Tree`](crate::store::Tree) through an
//! optional [`TextProcessor`], then through the [`Parser`] that a
//! [`ParserRegistry`] picks for the item's extension, and finally renames the
//! item.

mod parser;
mod registry;
mod process;
mod pipeline;

pub mod parsers;

pub use parser::*;
pub use registry::*;
pub use process::*;
pub use pipeline::*;
pub use parsers::{Html, Image};
