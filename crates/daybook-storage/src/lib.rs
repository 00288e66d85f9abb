//! Concrete storage implementation: plain JSON blobs, one file per key.

pub mod json_file_store;

pub use json_file_store::JsonFileStore;
