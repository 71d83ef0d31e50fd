//! Unit-0 (MDU0) layout of a deal slab: header, root table and file table.

pub mod builder;
pub mod error;
pub mod geometry;
pub mod layout;

pub use builder::SlabBuilder;
pub use error::{Result, SlabError};
pub use geometry::SlabGeometry;
pub use layout::{
    pack_length_and_flags, unpack_length_and_flags, Compression, FileRecord, FileTableHeader,
};
