//! Object Module - Heap object layout and lookup

pub mod header;
pub mod table;

pub use header::{Color, HeaderState, ObjectHeader, HEADER_SIZE};
pub use table::ObjectTable;
