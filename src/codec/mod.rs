pub mod varint;
pub mod fixed;
pub mod wire;
pub mod write_cache;
pub mod message;
