//! src/lib.rs
//!
//! @description
//! Off-ledger driver for Aces Table. It bootstraps the program's computation
//! definitions, builds and submits table instructions, queues confidential
//! computations and waits for their finalization, and walks tables through
//! the hand lifecycle.
//!
//! Every operation runs in an explicit `Context` holding the ledger client,
//! the validated settings and the fee payer. The ledger itself sits behind
//! the `LedgerClient` seam.

pub mod builders;
pub mod client;
pub mod computation;
pub mod config;
pub mod context;
pub mod error;
pub mod orchestrator;
pub mod registry;
pub mod retry;

pub use builders::TableParams;
pub use client::{Account, ClientError, Commitment, LedgerClient, TokenBalance, Transaction};
pub use computation::{
    ComputationHandle, Finalization, NonceSource, OsNonce, QueueInstruction, SequentialNonces,
};
pub use config::{Config, ConfigError, Settings};
pub use context::Context;
pub use error::{Error, Result};
pub use orchestrator::{BootstrapReport, HandOutcome, Orchestrator, Step};
pub use registry::Bootstrap;
pub use retry::RetryPolicy;
