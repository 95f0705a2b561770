//! Schema index module

mod index;
mod loader;

pub use index::{SchemaEntry, SchemaIndex};
