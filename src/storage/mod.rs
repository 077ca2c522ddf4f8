//! Storage helpers shared by the backup, metadata and session code

pub mod file_io;

pub use file_io::{copy_verified, read_json_optional, remove_if_exists, write_json_atomic};
