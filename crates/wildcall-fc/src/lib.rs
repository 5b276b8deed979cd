//! Wildcall feature cache (.mfc) file format library

pub mod format;
pub mod reader;
pub mod writer;

pub use format::{FcHeader, HEADER_SIZE, MAX_COEFF_WIDTH};
pub use reader::FcReader;
pub use writer::FcWriter;
