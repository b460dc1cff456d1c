//! Records and collections: the things application code actually touches.

pub mod record;
pub mod collection;
