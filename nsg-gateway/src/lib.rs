//! Namespace Gateway operations
//!
//! The file-tree operations layer: list, create, delete, search, upload and
//! download over a shared namespace handle, with staged local buffers for
//! whole-file transfers.

pub mod disposition;
pub mod operations;
pub mod response;
pub mod staging;

pub use operations::Gateway;
pub use response::OperationResult;
pub use staging::{ByteStream, OutboundChannel, SizedWriter, StagingArea};
