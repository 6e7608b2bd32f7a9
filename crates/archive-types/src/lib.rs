pub mod document;
pub mod message;
pub mod event;
pub mod tool;
pub mod config;
pub mod error;


pub use error::{ArchiveError, ErrorKind};
pub type Result<T> = std::result::Result<T, ArchiveError>;
