//! src/orchestrator.rs
//!
//! @description
//! Drives tables through the hand lifecycle. Each operation submits one
//! ledger instruction and then re-reads the affected accounts once that
//! write is visible; the orchestrator keeps no game state of its own.
//!
//! Mutations of one table are serialized behind a per-table lock. Waiting
//! for a computation holds that lock, so a second flow on the same table
//! queues behind it instead of racing it. Other tables are unaffected.
//!
//! @logic
//! `step` reads a table and performs the single next protocol action:
//! 1. A pending computation is awaited.
//! 2. A lone contender, or completed river betting, resolves the showdown.
//! 3. Any other completed betting round deals the next street.
//! 4. A player whose turn timer has run out is force-folded.
//! 5. Otherwise the table waits for a player.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use aces_table::circuit::CircuitKind;
use aces_table::pda;
use aces_table::state::{
    BettingRound, GameState, HandData, PlayerAction, ShowdownResult, Table, MAX_PLAYERS,
};
use aces_table::AcesTableErrorCode;
use anchor_lang::prelude::Pubkey;
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, info, warn};

use crate::builders::{self, TableParams};
use crate::client::LedgerClient;
use crate::computation::{
    self, ComputationHandle, Finalization, NonceSource, OsNonce, QueueInstruction,
};
use crate::context::Context;
use crate::error::{Error, Result};
use crate::registry::{self, Bootstrap};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BootstrapReport {
    pub definitions: Vec<(CircuitKind, Bootstrap)>,
    pub platform_config: Bootstrap,
}

/// The protocol action `step` performed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    /// No hand is running.
    Idle,
    /// Waited for the table's pending computation to finalize.
    Finalized { circuit: CircuitKind },
    /// Queued a computation and waited for it to finalize.
    Computed { circuit: CircuitKind },
    /// The seat to act still has time; `deadline` is a ledger timestamp.
    AwaitingAction { seat: u8, deadline: i64 },
    ForcedFold { seat: u8 },
}

/// A finished hand. `showdown` is `None` when the hand was refunded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HandOutcome {
    pub hand_id: u64,
    pub showdown: Option<ShowdownResult>,
    pub table: Table,
}

pub struct Orchestrator<C, N = OsNonce> {
    ctx: Context<C>,
    nonces: N,
    tables: Mutex<HashMap<u64, Arc<tokio::sync::Mutex<()>>>>,
}

impl<C: LedgerClient> Orchestrator<C, OsNonce> {
    pub fn new(ctx: Context<C>) -> Self {
        Self::with_nonces(ctx, OsNonce)
    }
}

impl<C: LedgerClient, N: NonceSource> Orchestrator<C, N> {
    pub fn with_nonces(ctx: Context<C>, nonces: N) -> Self {
        Self {
            ctx,
            nonces,
            tables: Mutex::new(HashMap::new()),
        }
    }

    pub fn context(&self) -> &Context<C> {
        &self.ctx
    }

    async fn lock(&self, table_id: u64) -> OwnedMutexGuard<()> {
        let lock = {
            let mut tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
            tables.entry(table_id).or_default().clone()
        };
        lock.lock_owned().await
    }

    /// Fee payer first, then `others` not already listed.
    fn signers(&self, others: &[Pubkey]) -> Vec<Pubkey> {
        let mut signers = vec![self.ctx.payer()];
        for key in others {
            if !signers.contains(key) {
                signers.push(*key);
            }
        }
        signers
    }

    // --- Reads ---

    pub async fn table(&self, table_id: u64) -> Result<Table> {
        self.ctx.load(&pda::table(table_id).0).await
    }

    pub async fn hand(&self, table_id: u64, hand_id: u64) -> Result<HandData> {
        let table = pda::table(table_id).0;
        self.ctx.load(&pda::hand(&table, hand_id).0).await
    }

    async fn table_after(&self, table_id: u64, slot: u64) -> Result<Table> {
        self.ctx.load_after(&pda::table(table_id).0, slot).await
    }

    // --- Setup ---

    /// Creates any missing computation definition and the platform config.
    /// The context's payer becomes the platform admin.
    pub async fn bootstrap(&self, treasury_vault: Pubkey) -> Result<BootstrapReport> {
        let definitions = registry::ensure_all(&self.ctx).await?;

        let config = pda::platform_config().0;
        let platform_config = if self.ctx.account(&config).await?.is_some() {
            Bootstrap::AlreadyPresent
        } else {
            let ix = builders::initialize_platform_config(self.ctx.payer(), treasury_vault)?;
            match self
                .ctx
                .submit("initialize_platform_config", vec![ix], self.signers(&[]))
                .await
            {
                Ok(_) => {
                    self.ctx.wait_for_account(&config).await?;
                    Bootstrap::Created
                }
                Err(err) if err.account_in_use() == Some(config) => Bootstrap::AlreadyPresent,
                Err(err) => return Err(err),
            }
        };
        info!(?platform_config, "bootstrap complete");
        Ok(BootstrapReport {
            definitions,
            platform_config,
        })
    }

    pub async fn update_rake_params(&self, rake_bps: u16, rake_max_cap: u64) -> Result<()> {
        let ix = builders::update_rake_params(self.ctx.payer(), rake_bps, rake_max_cap)?;
        let slot = self
            .ctx
            .submit("update_rake_params", vec![ix], self.signers(&[]))
            .await?;
        self.ctx.wait_for_slot(slot).await
    }

    // --- Seating ---

    pub async fn create_table(
        &self,
        creator: Pubkey,
        token_mint: Pubkey,
        params: TableParams,
    ) -> Result<Table> {
        let table_id = params.table_id;
        let key = pda::table(table_id).0;
        let _guard = self.lock(table_id).await;
        let ix = builders::create_table(creator, token_mint, params)?;
        let slot = self
            .ctx
            .submit("create_table", vec![ix], self.signers(&[creator]))
            .await
            .map_err(|err| match err.account_in_use() {
                Some(account) if account == key => Error::AlreadyExists {
                    what: "table",
                    account,
                },
                _ => buy_in_error(err, table_id, params.buy_in),
            })?;
        info!(table_id, %creator, "table created");
        self.table_after(table_id, slot).await
    }

    pub async fn join_table(
        &self,
        player: Pubkey,
        table_id: u64,
        seat_index: u8,
        buy_in: u64,
    ) -> Result<Table> {
        let _guard = self.lock(table_id).await;
        let table = self.table(table_id).await?;
        let ix = builders::join_table(player, table.token_mint, table_id, seat_index, buy_in)?;
        let slot = self
            .ctx
            .submit("join_table", vec![ix], self.signers(&[player]))
            .await
            .map_err(|err| {
                if err.program_code() == Some(u32::from(AcesTableErrorCode::SeatUnavailable)) {
                    Error::SeatUnavailable {
                        table_id,
                        seat_index,
                    }
                } else {
                    buy_in_error(err, table_id, buy_in)
                }
            })?;
        info!(table_id, seat_index, %player, buy_in, "player joined");
        self.table_after(table_id, slot).await
    }

    /// Cashes `player` out to their associated token account.
    pub async fn leave_table(&self, player: Pubkey, table_id: u64) -> Result<Table> {
        let _guard = self.lock(table_id).await;
        let table = self.table(table_id).await?;
        let ix = builders::leave_table(player, table.token_mint, table_id, None)?;
        let slot = self
            .ctx
            .submit("leave_table", vec![ix], self.signers(&[player]))
            .await?;
        info!(table_id, %player, "player left");
        self.table_after(table_id, slot).await
    }

    // --- Hand lifecycle ---

    /// Queues the shuffle for the next hand. `seat_keys` holds each seated
    /// player's public encryption key.
    pub async fn start_hand(
        &self,
        table_id: u64,
        seat_keys: [[u8; 32]; MAX_PLAYERS],
    ) -> Result<ComputationHandle> {
        let _guard = self.lock(table_id).await;
        let table = self.table(table_id).await?;
        let hand_id = table.hand_id_counter.saturating_add(1);
        self.queue_locked(QueueInstruction::StartHand {
            table_id,
            hand_id,
            seat_keys,
        })
        .await
    }

    pub async fn act(&self, player: Pubkey, table_id: u64, action: PlayerAction) -> Result<Table> {
        let _guard = self.lock(table_id).await;
        let ix = builders::player_action(player, table_id, action)?;
        let slot = self
            .ctx
            .submit("player_action", vec![ix], self.signers(&[player]))
            .await?;
        debug!(table_id, %player, ?action, "player acted");
        self.table_after(table_id, slot).await
    }

    pub async fn force_fold(&self, caller: Pubkey, table_id: u64) -> Result<Table> {
        let _guard = self.lock(table_id).await;
        self.force_fold_locked(caller, table_id).await
    }

    async fn force_fold_locked(&self, caller: Pubkey, table_id: u64) -> Result<Table> {
        let ix = builders::force_player_fold(caller, table_id)?;
        let slot = self
            .ctx
            .submit("force_player_fold", vec![ix], self.signers(&[caller]))
            .await?;
        self.table_after(table_id, slot).await
    }

    /// Queues the reveal of the next street.
    pub async fn deal_next_street(&self, table_id: u64) -> Result<ComputationHandle> {
        let _guard = self.lock(table_id).await;
        let table = self.table(table_id).await?;
        self.queue_locked(QueueInstruction::DealCommunityCards {
            table_id,
            hand_id: table.hand_id_counter,
        })
        .await
    }

    /// Queues hand evaluation and payout.
    pub async fn resolve_showdown(&self, table_id: u64) -> Result<ComputationHandle> {
        let _guard = self.lock(table_id).await;
        let table = self.table(table_id).await?;
        self.queue_locked(QueueInstruction::ResolveShowdown {
            table_id,
            hand_id: table.hand_id_counter,
        })
        .await
    }

    pub async fn force_refund(&self, caller: Pubkey, table_id: u64) -> Result<Table> {
        let _guard = self.lock(table_id).await;
        let ix = builders::force_hand_refund(caller, table_id)?;
        let slot = self
            .ctx
            .submit("force_hand_refund", vec![ix], self.signers(&[caller]))
            .await?;
        warn!(table_id, "hand refunded");
        self.table_after(table_id, slot).await
    }

    async fn queue_locked(&self, request: QueueInstruction) -> Result<ComputationHandle> {
        let nonce = self.nonces.next_nonce();
        let handle = computation::queue(&self.ctx, &request, nonce).await?;
        self.ctx.wait_for_slot(handle.slot).await?;
        Ok(handle)
    }

    /// Waits for `handle` with the configured timeout, until its callback's
    /// effects are visible.
    pub async fn finalize(&self, handle: &ComputationHandle) -> Result<Finalization> {
        let timeout = self.ctx.settings().finalization_timeout;
        let finalization = computation::await_finalization(&self.ctx, handle, timeout).await?;
        self.ctx.wait_for_slot(finalization.slot).await?;
        Ok(finalization)
    }

    // --- Driving ---

    pub async fn step(&self, table_id: u64) -> Result<Step> {
        let _guard = self.lock(table_id).await;
        let table = self.table(table_id).await?;

        if let Some(pending) = table.pending_computation {
            let handle = ComputationHandle::pending(self.ctx.settings().cluster_offset, &pending);
            self.finalize(&handle).await?;
            return Ok(Step::Finalized {
                circuit: pending.circuit,
            });
        }
        if table.game_state != GameState::HandInProgress {
            return Ok(Step::Idle);
        }

        let hand_id = table.hand_id_counter;
        let request = if table.contender_count() <= 1 {
            QueueInstruction::ResolveShowdown { table_id, hand_id }
        } else if !table.is_betting_round_complete() {
            let seat = table.turn_position;
            let deadline = table
                .turn_started_at
                .saturating_add(table.turn_duration_seconds as i64);
            let now = self.ctx.clock().await?.unix_timestamp;
            if now <= deadline {
                return Ok(Step::AwaitingAction { seat, deadline });
            }
            info!(table_id, seat, "turn timer expired");
            self.force_fold_locked(self.ctx.payer(), table_id).await?;
            return Ok(Step::ForcedFold { seat });
        } else {
            let hand = self.hand(table_id, hand_id).await?;
            if hand.betting_round == BettingRound::River {
                QueueInstruction::ResolveShowdown { table_id, hand_id }
            } else {
                QueueInstruction::DealCommunityCards { table_id, hand_id }
            }
        };

        let circuit = request.circuit();
        let handle = self.queue_locked(request).await?;
        self.finalize(&handle).await?;
        Ok(Step::Computed { circuit })
    }

    /// Steps the table until its current hand is settled or refunded. Seats
    /// that never act are force-folded once their timers run out.
    pub async fn play_until_settled(&self, table_id: u64) -> Result<HandOutcome> {
        loop {
            match self.step(table_id).await? {
                Step::Idle => break,
                Step::AwaitingAction { seat, deadline } => {
                    let now = self.ctx.clock().await?.unix_timestamp;
                    let wait = deadline.saturating_sub(now).max(0) as u64 + 1;
                    debug!(table_id, seat, wait, "waiting for player");
                    tokio::time::sleep(Duration::from_secs(wait)).await;
                }
                step => debug!(table_id, ?step, "stepped"),
            }
        }

        let table = self.table(table_id).await?;
        let hand_id = table.hand_id_counter;
        let hand = self.hand(table_id, hand_id).await?;
        Ok(HandOutcome {
            hand_id,
            showdown: hand.showdown,
            table,
        })
    }
}

fn buy_in_error(err: Error, table_id: u64, buy_in: u64) -> Error {
    if err.program_code() == Some(u32::from(AcesTableErrorCode::InsufficientBuyIn)) {
        Error::InsufficientBuyIn { table_id, buy_in }
    } else {
        err
    }
}
