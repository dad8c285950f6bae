//! src/computation.rs
//!
//! @description
//! Client side of the queue/finalize handshake with the compute cluster.
//!
//! @logic
//! Queueing: a computation is addressed by its cluster and a 64-bit nonce
//! (the computation offset). `queue` submits the instruction that creates the
//! instance; the ledger refuses a nonce already in use, which surfaces here
//! as `NonceCollision` with nothing mutated.
//!
//! Finalization: `await_finalization` polls the instance until the cluster
//! marks it finalized or failed, or until the caller's timeout. Timing out
//! never cancels the computation; its callback may still land later and is
//! applied by the ledger at most once.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use aces_table::circuit::CircuitKind;
use aces_table::compute::{ComputationAccount, ComputationStatus};
use aces_table::pda;
use aces_table::state::{PendingComputation, MAX_PLAYERS};
use anchor_lang::prelude::Pubkey;
use rand::rngs::OsRng;
use rand::RngCore;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::builders;
use crate::client::LedgerClient;
use crate::context::Context;
use crate::error::{Error, Result};

/// Source of computation nonces.
pub trait NonceSource: Send + Sync {
    fn next_nonce(&self) -> u64;
}

/// 64 bits from the operating system's RNG per nonce.
#[derive(Clone, Copy, Debug, Default)]
pub struct OsNonce;

impl NonceSource for OsNonce {
    fn next_nonce(&self) -> u64 {
        OsRng.next_u64()
    }
}

/// Consecutive nonces from a starting value. For replayable runs.
#[derive(Debug)]
pub struct SequentialNonces(AtomicU64);

impl SequentialNonces {
    pub fn starting_at(first: u64) -> Self {
        Self(AtomicU64::new(first))
    }
}

impl NonceSource for SequentialNonces {
    fn next_nonce(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed)
    }
}

/// A computation-queueing instruction, minus payer, cluster and nonce.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueueInstruction {
    StartHand {
        table_id: u64,
        hand_id: u64,
        seat_keys: [[u8; 32]; MAX_PLAYERS],
    },
    DealCommunityCards {
        table_id: u64,
        hand_id: u64,
    },
    ResolveShowdown {
        table_id: u64,
        hand_id: u64,
    },
}

impl QueueInstruction {
    pub fn circuit(&self) -> CircuitKind {
        match self {
            QueueInstruction::StartHand { .. } => CircuitKind::ShuffleAndDeal,
            QueueInstruction::DealCommunityCards { .. } => CircuitKind::RevealCommunityCards,
            QueueInstruction::ResolveShowdown { .. } => CircuitKind::EvaluateHandsAndPayout,
        }
    }

    pub fn method(&self) -> &'static str {
        match self {
            QueueInstruction::StartHand { .. } => "start_hand",
            QueueInstruction::DealCommunityCards { .. } => "deal_community_cards",
            QueueInstruction::ResolveShowdown { .. } => "resolve_showdown",
        }
    }

    fn build(
        &self,
        payer: Pubkey,
        cluster_offset: u32,
        nonce: u64,
    ) -> Result<anchor_lang::solana_program::instruction::Instruction> {
        match *self {
            QueueInstruction::StartHand {
                table_id,
                hand_id,
                seat_keys,
            } => builders::start_hand(payer, cluster_offset, table_id, hand_id, nonce, seat_keys),
            QueueInstruction::DealCommunityCards { table_id, hand_id } => {
                builders::deal_community_cards(payer, cluster_offset, table_id, hand_id, nonce)
            }
            QueueInstruction::ResolveShowdown { table_id, hand_id } => {
                builders::resolve_showdown(payer, cluster_offset, table_id, hand_id, nonce)
            }
        }
    }
}

/// A queued computation instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ComputationHandle {
    pub circuit: CircuitKind,
    pub nonce: u64,
    pub address: Pubkey,
    /// Slot of the queueing transaction.
    pub slot: u64,
}

impl ComputationHandle {
    /// Handle of a table's pending computation, for resuming a wait.
    pub fn pending(cluster_offset: u32, pending: &PendingComputation) -> Self {
        Self {
            circuit: pending.circuit,
            nonce: pending.computation_offset,
            address: pda::computation(cluster_offset, pending.computation_offset).0,
            slot: 0,
        }
    }
}

/// A finalized computation; its callback has been applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Finalization {
    pub slot: u64,
}

/// Submits `request` under `nonce`.
pub async fn queue<C: LedgerClient>(
    ctx: &Context<C>,
    request: &QueueInstruction,
    nonce: u64,
) -> Result<ComputationHandle> {
    let circuit = request.circuit();
    let cluster_offset = ctx.settings().cluster_offset;
    let comp_def = pda::comp_def(&ctx.settings().program_id, circuit).0;
    if ctx.account(&comp_def).await?.is_none() {
        return Err(Error::PrerequisiteMissing {
            what: "computation definition",
            account: comp_def,
        });
    }

    let ix = request.build(ctx.payer(), cluster_offset, nonce)?;
    submit_queue(ctx, circuit, request.method(), ix, nonce).await
}

/// Submits an already built queueing instruction for `circuit` under `nonce`.
/// Refusals are classified the same way as for [`queue`].
pub async fn submit_queue<C: LedgerClient>(
    ctx: &Context<C>,
    circuit: CircuitKind,
    method: &'static str,
    ix: anchor_lang::solana_program::instruction::Instruction,
    nonce: u64,
) -> Result<ComputationHandle> {
    let address = pda::computation(ctx.settings().cluster_offset, nonce).0;
    let slot = ctx
        .submit(method, vec![ix], vec![ctx.payer()])
        .await
        .map_err(|err| queue_rejection(err, circuit, nonce, &address))?;

    info!(%circuit, nonce, slot, "computation queued");
    Ok(ComputationHandle {
        circuit,
        nonce,
        address,
        slot,
    })
}

/// Refines a refused queue submission. Accounts out of place in the queue
/// block fail their seed checks, so derivation mismatches count as a
/// malformed request here.
fn queue_rejection(err: Error, circuit: CircuitKind, nonce: u64, address: &Pubkey) -> Error {
    if err.account_in_use() == Some(*address) {
        Error::NonceCollision { circuit, nonce }
    } else if err.is_account_list_rejection()
        || matches!(err, Error::AddressDerivationMismatch { .. })
    {
        Error::MalformedComputationRequest {
            circuit,
            reason: err.to_string(),
        }
    } else {
        err
    }
}

/// Waits for `handle` to finalize, polling with the context's backoff.
pub async fn await_finalization<C: LedgerClient>(
    ctx: &Context<C>,
    handle: &ComputationHandle,
    timeout: Duration,
) -> Result<Finalization> {
    let policy = ctx.settings().retry;
    let started = Instant::now();
    let deadline = started + timeout;
    let mut retry = 0u32;
    loop {
        if let Some(computation) = ctx
            .try_load_compute::<ComputationAccount>(&handle.address)
            .await?
        {
            match computation.status {
                ComputationStatus::Finalized => {
                    let slot = computation.finalized_slot.unwrap_or(computation.queued_slot);
                    info!(circuit = %handle.circuit, nonce = handle.nonce, slot, "computation finalized");
                    return Ok(Finalization { slot });
                }
                ComputationStatus::Failed { code } => {
                    return Err(Error::ComputationFailed {
                        circuit: handle.circuit,
                        nonce: handle.nonce,
                        code,
                    });
                }
                ComputationStatus::Queued => {}
            }
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(Error::ComputationTimeout {
                circuit: handle.circuit,
                nonce: handle.nonce,
                waited: now - started,
            });
        }
        let delay = policy
            .delay(&mut rand::thread_rng(), retry)
            .min(deadline - now);
        debug!(circuit = %handle.circuit, nonce = handle.nonce, ?delay, "computation pending");
        tokio::time::sleep(delay).await;
        retry = retry.saturating_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientError;

    #[test]
    fn test_sequential_nonces() {
        let nonces = SequentialNonces::starting_at(10);
        assert_eq!(nonces.next_nonce(), 10);
        assert_eq!(nonces.next_nonce(), 11);
    }

    #[test]
    fn test_os_nonces_differ() {
        assert_ne!(OsNonce.next_nonce(), OsNonce.next_nonce());
    }

    #[test]
    fn test_queue_instruction_registry() {
        let start = QueueInstruction::StartHand {
            table_id: 1,
            hand_id: 1,
            seat_keys: [[0; 32]; MAX_PLAYERS],
        };
        assert_eq!(start.circuit(), CircuitKind::ShuffleAndDeal);
        let deal = QueueInstruction::DealCommunityCards { table_id: 1, hand_id: 1 };
        assert_eq!(deal.circuit(), CircuitKind::RevealCommunityCards);
        let resolve = QueueInstruction::ResolveShowdown { table_id: 1, hand_id: 1 };
        assert_eq!(resolve.circuit(), CircuitKind::EvaluateHandsAndPayout);

        let ix = deal.build(Pubkey::new_unique(), 5, 99).unwrap();
        assert_eq!(ix.accounts[6].pubkey, pda::computation(5, 99).0);
    }

    #[test]
    fn test_pending_handle_points_at_instance() {
        let pending = PendingComputation {
            computation_offset: 12,
            circuit: CircuitKind::RevealCommunityCards,
            queued_at: 0,
        };
        let handle = ComputationHandle::pending(3, &pending);
        assert_eq!(handle.address, pda::computation(3, 12).0);
        assert_eq!(handle.circuit, CircuitKind::RevealCommunityCards);
    }

    #[test]
    fn test_queue_seed_mismatch_is_malformed() {
        let address = pda::computation(1, 7).0;
        let seeds = Error::from_client(
            "start_hand",
            ClientError::Program {
                program: aces_table::ID,
                code: u32::from(anchor_lang::error::ErrorCode::ConstraintSeeds),
                message: "A seeds constraint was violated".to_string(),
            },
        );
        assert!(matches!(
            queue_rejection(seeds, CircuitKind::ShuffleAndDeal, 7, &address),
            Error::MalformedComputationRequest {
                circuit: CircuitKind::ShuffleAndDeal,
                ..
            }
        ));

        let collision = Error::from_client("start_hand", ClientError::AccountInUse { account: address });
        assert!(matches!(
            queue_rejection(collision, CircuitKind::ShuffleAndDeal, 7, &address),
            Error::NonceCollision { nonce: 7, .. }
        ));

        let other = Error::from_client(
            "start_hand",
            ClientError::AccountInUse {
                account: Pubkey::new_unique(),
            },
        );
        assert!(matches!(
            queue_rejection(other, CircuitKind::ShuffleAndDeal, 7, &address),
            Error::Rejected { .. }
        ));
    }
}
