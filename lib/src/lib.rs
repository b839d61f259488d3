#![doc = svgbobdoc::transform!(
//! A toolkit for building documents and static sites from a tree of content.
//!
//! # Overview
//!
//! Quire reads a directory into a hierarchical store of lazily computed
//! items, turns raw bytes into typed content with an extensible set of
//! parsers, and assembles markdown files linked by include directives into a
//! single document.
//!
//! ```svgbob
//!  +-----------+     +------------+     +----------+     +-----------+
//!  | directory |---->| store:Tree |---->| Pipeline |---->| typed Tree|
//!  +-----------+     +-----+------+     +----+-----+     +-----------+
//!                          |                 |
//!                          |           +-----+----------+
//!                          |           | ParserRegistry |
//!                          |           +----------------+
//!                          v
//!                   +--------------+     +-----------+     +--------+
//!                   | GraphBuilder |---->| assemble  |---->| render |
//!                   +--------------+     +-----------+     +--------+
//! ```
//!
//! ## Content
//!
//! A [`store::Tree`] maps hierarchical [`store::Name`]s to
//! [`store::Item`]s. An item pairs immutable metadata with a value that is
//! computed at most once, on first demand, and shared by every reader.
//! [`store::read_dir()`] fills a tree with the raw bytes of every file in a
//! directory.
//!
//! A [`content::Pipeline`] maps each raw item to a typed one: an optional
//! text processor named by the item's `transformation` metadata runs first,
//! then the highest-priority parser that a [`content::ParserRegistry`] finds
//! for the item's extension. Items no parser handles keep their bytes.
//!
//! ## Documents
//!
//! A [`document::GraphBuilder`] parses a root markdown document, follows its
//! `include(...)` directives, and records every reachable document exactly
//! once in a [`document::DependencyGraph`]. A cycle of includes is an
//! error. [`document::assemble()`] merges the graph into one syntax tree,
//! which renders to HTML, to markdown, or through an external converter to
//! any format it supports.
)]

#[macro_use]
pub mod error;
pub mod util;
pub mod value;
pub mod config;
pub mod fstree;
pub mod store;
pub mod content;
pub mod document;

pub use rayon;

#[cfg(test)]
mod thread_safety {
    use static_assertions::assert_impl_all;

    use crate::content::{ParserRegistry, Pipeline, Processors};
    use crate::document::{DependencyGraph, Element};
    use crate::store::{Item, Meta, Name, Tree};

    assert_impl_all!(Item: Send, Sync);
    assert_impl_all!(Tree: Send, Sync);
    assert_impl_all!(Meta: Send, Sync);
    assert_impl_all!(Name: Send, Sync);
    assert_impl_all!(ParserRegistry: Send, Sync);
    assert_impl_all!(Processors: Send, Sync);
    assert_impl_all!(Pipeline: Send, Sync);
    assert_impl_all!(DependencyGraph: Send, Sync);
    assert_impl_all!(Element: Send, Sync);
}
