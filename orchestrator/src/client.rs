//! src/client.rs
//!
//! @description
//! Transport seam between the orchestrator and a ledger. Everything the
//! orchestrator knows about the ledger it learns through `LedgerClient`:
//! account reads at a chosen commitment, slots, the cluster clock, and
//! atomic transaction submission.

use std::future::Future;

use anchor_lang::prelude::{Clock, Pubkey};
use anchor_lang::solana_program::instruction::Instruction;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How settled a read must be. Reads at a lower level see writes sooner.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Commitment {
    Processed,
    #[default]
    Confirmed,
    Finalized,
}

/// A raw ledger account.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Account {
    pub owner: Pubkey,
    pub data: Vec<u8>,
}

/// The decoded state of a token account.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TokenBalance {
    pub mint: Pubkey,
    pub owner: Pubkey,
    pub amount: u64,
}

/// Instructions executed all-or-nothing, signed by `signers`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    pub instructions: Vec<Instruction>,
    pub signers: Vec<Pubkey>,
}

impl Transaction {
    pub fn new(instructions: Vec<Instruction>, signers: Vec<Pubkey>) -> Self {
        Self {
            instructions,
            signers,
        }
    }
}

/// Why the ledger refused a read or a transaction.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("account {account} already in use")]
    AccountInUse { account: Pubkey },
    #[error("program {program} failed with error {code}: {message}")]
    Program {
        program: Pubkey,
        code: u32,
        message: String,
    },
    #[error("program {program} rejected the transaction: {reason}")]
    Rejected { program: Pubkey, reason: String },
    #[error("missing signature for {account}")]
    MissingSignature { account: Pubkey },
    #[error("unknown program {program}")]
    UnknownProgram { program: Pubkey },
    /// The request never reached the ledger. Safe to retry.
    #[error("ledger unavailable")]
    Unavailable,
}

impl ClientError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ClientError::Unavailable)
    }

    /// Custom error code returned by a program, if any.
    pub fn program_code(&self) -> Option<u32> {
        match self {
            ClientError::Program { code, .. } => Some(*code),
            _ => None,
        }
    }
}

pub trait LedgerClient: Send + Sync {
    fn get_account(
        &self,
        key: &Pubkey,
        commitment: Commitment,
    ) -> impl Future<Output = Result<Option<Account>, ClientError>> + Send;

    fn token_balance(
        &self,
        key: &Pubkey,
        commitment: Commitment,
    ) -> impl Future<Output = Result<Option<TokenBalance>, ClientError>> + Send;

    /// Latest slot visible at `commitment`.
    fn slot(&self, commitment: Commitment) -> impl Future<Output = Result<u64, ClientError>> + Send;

    /// Cluster clock at the latest processed slot.
    fn clock(&self) -> impl Future<Output = Result<Clock, ClientError>> + Send;

    /// Executes `transaction` atomically; returns the slot it landed in.
    fn send_transaction(
        &self,
        transaction: Transaction,
    ) -> impl Future<Output = Result<u64, ClientError>> + Send;
}
