//! CLI commands implementation

pub mod index;
pub mod init;
pub mod status;

pub use index::*;
pub use init::*;
pub use status::*;
