//! # winsync-file-store
//!
//! A shared medium backed by a directory: one `<key>.json` file per key.
//! Every process on the host that opens the same directory joins the same
//! registry, the way browser windows of one origin share local storage.

pub mod error;
pub mod local_dir;
pub mod watcher;

pub use error::FileMediumError;
pub use local_dir::FileMedium;
