pub mod config;
pub mod error;
pub mod framing;
pub mod model;

pub use config::Config;
pub use error::AegisError;
pub use model::FileMeta;

/// Fixed chunk size the client pipeline shards files into.
pub const BLOCK_SIZE: usize = 4096;
