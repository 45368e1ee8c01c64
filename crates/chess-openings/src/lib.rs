//! Opening theory lookup.
//!
//! This crate answers whether a position is still known opening theory.
//! It ships a built-in set of named opening lines and can also load an
//! external table of position keys.

pub mod book;
pub mod builtin;
pub mod opening;

pub use book::{position_key, BookError, BookLookup, OpeningBook};
pub use opening::Opening;
