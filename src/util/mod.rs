pub mod chunk;
pub mod subscription;

pub use chunk::{chunk, DEFAULT_CHUNK_SIZE};
pub use subscription::{CancelHandle, OpenFuture, Subscription};
