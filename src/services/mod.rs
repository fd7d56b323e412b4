//! Service layer for I/O at the edges of the flow

pub mod io;

pub use io::{content_type_for_path, save_download, FileSource, SelectedFile, UNKNOWN_CONTENT_TYPE};
