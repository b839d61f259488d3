//! The hierarchical content store.
//!
//! A [`Tree`] maps [`Name`]s to [`Item`]s. Each item pairs immutable [`Meta`]
//! with a value that is computed at most once, on demand, and shared by every
//! clone of the item. Values are type-erased as [`Data`] and read back with
//! [`Item::read()`].

mod name;
mod meta;
mod item;
mod tree;
mod read;

pub use name::*;
pub use meta::*;
pub use item::*;
pub use tree::*;
pub use read::*;
