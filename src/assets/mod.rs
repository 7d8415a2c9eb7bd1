//! Local asset enumeration
//!
//! Walks the static folder of every mount and pairs each file with the
//! remote key it is published under.

mod walker;

pub use walker::{walk, walk_mount, collect, AssetWalker, EnumerateError};
