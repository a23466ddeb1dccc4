//! Plait Store
//!
//! The content-addressed block-store boundary of the plait log: the
//! [`BlockStore`] trait consumed from the environment, an in-memory
//! reference backend, and the [`EntryStore`] adapter that moves verified,
//! canonically-encoded entries across that boundary.

pub mod entry_io;
pub mod error;
pub mod memory;
pub mod traits;

pub use entry_io::EntryStore;
pub use error::StoreError;
pub use memory::MemoryBlockStore;
pub use traits::BlockStore;
