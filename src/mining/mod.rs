//! Block packing and transaction pooling

pub mod mempool;
pub mod packer;

pub use mempool::Mempool;
pub use packer::Packer;
