//! Persisted state shared across hook invocations.
//!
//! Every store is best-effort: independent processes may write
//! concurrently, and nothing here takes a lock.

pub mod atomic_io;
pub mod chain_state;
pub mod health_buffer;

pub use chain_state::{ChainState, ChainStore, CommandRecord, FileChainStore, MemoryChainStore};
pub use health_buffer::{FileHealthBuffer, HealthStore, MemoryHealthBuffer};
