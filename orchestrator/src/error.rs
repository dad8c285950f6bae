//! src/error.rs
//!
//! @description
//! The orchestrator's error taxonomy and the mapping from ledger refusals
//! into it.

use std::time::Duration;

use aces_table::CircuitKind;
use anchor_lang::error::ErrorCode;
use anchor_lang::prelude::Pubkey;
use thiserror::Error;

use crate::client::ClientError;
use crate::config::ConfigError;

/// Error type for orchestrator operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("{method}: supplied address does not match its derivation ({message})")]
    AddressDerivationMismatch {
        method: &'static str,
        message: String,
    },
    #[error("{what} missing at {account}")]
    PrerequisiteMissing {
        what: &'static str,
        account: Pubkey,
    },
    #[error("{what} already exists at {account}")]
    AlreadyExists {
        what: &'static str,
        account: Pubkey,
    },
    #[error("computation definition for {circuit} already initialized")]
    AlreadyInitialized { circuit: CircuitKind },
    #[error("seat {seat_index} at table {table_id} is unavailable")]
    SeatUnavailable { table_id: u64, seat_index: u8 },
    #[error("buy-in {buy_in} is below the minimum of table {table_id}")]
    InsufficientBuyIn { table_id: u64, buy_in: u64 },
    #[error("computation offset {nonce} already in use ({circuit})")]
    NonceCollision { circuit: CircuitKind, nonce: u64 },
    #[error("malformed {circuit} computation request: {reason}")]
    MalformedComputationRequest {
        circuit: CircuitKind,
        reason: String,
    },
    #[error("{circuit} computation {nonce} not finalized after {waited:?}")]
    ComputationTimeout {
        circuit: CircuitKind,
        nonce: u64,
        waited: Duration,
    },
    #[error("{circuit} computation {nonce} failed with code {code}")]
    ComputationFailed {
        circuit: CircuitKind,
        nonce: u64,
        code: u32,
    },
    #[error("ledger unavailable after {attempts} attempts")]
    TransientUnavailable { attempts: u32 },
    #[error("account {account} not found")]
    NotFound { account: Pubkey },
    #[error("{method} rejected: {source}")]
    Rejected {
        method: &'static str,
        #[source]
        source: ClientError,
    },
    #[error("failed to decode {account}: {reason}")]
    Decode { account: Pubkey, reason: String },
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

/// Result type for orchestrator operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Maps a ledger refusal of `method` into the taxonomy. Context-specific
    /// refinements (nonce collisions, seat conflicts) are applied by callers.
    pub(crate) fn from_client(method: &'static str, source: ClientError) -> Self {
        match source {
            ClientError::Unavailable => Error::TransientUnavailable { attempts: 1 },
            ClientError::Program { code, message, .. }
                if code == u32::from(ErrorCode::ConstraintSeeds) =>
            {
                Error::AddressDerivationMismatch { method, message }
            }
            source => Error::Rejected { method, source },
        }
    }

    /// True when retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::TransientUnavailable { .. })
    }

    /// The custom program error code behind a rejection.
    pub fn program_code(&self) -> Option<u32> {
        match self {
            Error::Rejected { source, .. } => source.program_code(),
            _ => None,
        }
    }

    /// The account whose address was already in use, if that is why the
    /// transaction failed.
    pub fn account_in_use(&self) -> Option<Pubkey> {
        match self {
            Error::Rejected {
                source: ClientError::AccountInUse { account },
                ..
            } => Some(*account),
            _ => None,
        }
    }

    /// True for rejections caused by the shape of the account list: missing
    /// accounts or signatures, and accounts without the writability or
    /// program the instruction declares.
    pub fn is_account_list_rejection(&self) -> bool {
        let Error::Rejected { source, .. } = self else {
            return false;
        };
        match source {
            ClientError::MissingSignature { .. } => true,
            ClientError::Program { code, .. } => [
                ErrorCode::AccountNotEnoughKeys,
                ErrorCode::AccountNotSigner,
                ErrorCode::AccountNotMutable,
                ErrorCode::ConstraintMut,
                ErrorCode::InvalidProgramId,
            ]
            .into_iter()
            .any(|expected| *code == u32::from(expected)),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aces_table::AcesTableErrorCode;

    fn program(code: u32) -> ClientError {
        ClientError::Program {
            program: aces_table::ID,
            code,
            message: "failed".to_string(),
        }
    }

    #[test]
    fn test_seed_mismatch_is_a_derivation_error() {
        let err = Error::from_client("join_table", program(u32::from(ErrorCode::ConstraintSeeds)));
        assert!(matches!(
            err,
            Error::AddressDerivationMismatch {
                method: "join_table",
                ..
            }
        ));
    }

    #[test]
    fn test_only_unavailability_is_transient() {
        assert!(Error::from_client("start_hand", ClientError::Unavailable).is_transient());
        let rejected = Error::from_client(
            "start_hand",
            program(u32::from(AcesTableErrorCode::NotEnoughPlayers)),
        );
        assert!(!rejected.is_transient());
        assert_eq!(
            rejected.program_code(),
            Some(u32::from(AcesTableErrorCode::NotEnoughPlayers))
        );
    }

    #[test]
    fn test_account_list_rejections() {
        let missing = Error::from_client(
            "deal_community_cards",
            program(u32::from(ErrorCode::AccountNotEnoughKeys)),
        );
        assert!(missing.is_account_list_rejection());
        let unsigned = Error::from_client(
            "start_hand",
            ClientError::MissingSignature {
                account: Pubkey::new_unique(),
            },
        );
        assert!(unsigned.is_account_list_rejection());
        let game = Error::from_client(
            "start_hand",
            program(u32::from(AcesTableErrorCode::ComputationPending)),
        );
        assert!(!game.is_account_list_rejection());
    }

    #[test]
    fn test_account_in_use() {
        let account = Pubkey::new_unique();
        let err = Error::from_client("create_table", ClientError::AccountInUse { account });
        assert_eq!(err.account_in_use(), Some(account));
        assert_eq!(err.program_code(), None);
    }

    #[test]
    fn test_read_only_account_in_writable_slot() {
        let err = Error::from_client("start_hand", program(u32::from(ErrorCode::ConstraintMut)));
        assert!(err.is_account_list_rejection());
    }
}
