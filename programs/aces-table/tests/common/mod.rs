//! tests/common/mod.rs
//!
//! @description
//! Shared fixture for the program's integration tests: a bootstrapped
//! in-process ledger with one table, funded players and a cluster that can be
//! held so tests deliver their own computation outputs.

#![allow(dead_code)]

use std::time::Duration;

use aces_localnet::{Localnet, LocalnetConfig};
use aces_orchestrator::{
    ClientError, Context, LedgerClient, Orchestrator, SequentialNonces, Settings, TableParams,
    Transaction,
};
use aces_table::pda;
use aces_table::state::{HandData, PlayerAction, Table, MAX_PLAYERS};
use anchor_lang::prelude::Pubkey;
use anchor_lang::solana_program::instruction::Instruction;

pub const TABLE_ID: u64 = 42;
pub const FUNDING: u64 = 1_000_000;
pub const STAKES: TableParams = TableParams {
    table_id: TABLE_ID,
    small_blind: 1_000,
    big_blind: 2_000,
    buy_in: 40_000,
};

pub struct Fixture {
    pub localnet: Localnet,
    pub orchestrator: Orchestrator<Localnet, SequentialNonces>,
    pub admin: Pubkey,
    pub treasury: Pubkey,
    pub mint: Pubkey,
    players: Vec<Pubkey>,
}

impl Fixture {
    /// Platform configured and every circuit definition initialized, no table.
    pub async fn new() -> Self {
        let localnet = Localnet::start(LocalnetConfig::default()).await.unwrap();
        let admin = localnet.new_wallet().await.unwrap();
        localnet.provision(admin).await.unwrap();
        let settings = Settings {
            finalization_timeout: Duration::from_secs(10),
            ..Settings::for_cluster(localnet.cluster_offset())
        };
        let ctx = Context::new(localnet.clone(), settings, admin);
        let orchestrator = Orchestrator::with_nonces(ctx, SequentialNonces::starting_at(1));

        let mint = localnet.create_mint(6).await.unwrap();
        let mut players = Vec::with_capacity(8);
        for _ in 0..8 {
            let player = localnet.new_wallet().await.unwrap();
            localnet.fund(&player, &mint, FUNDING).await.unwrap();
            players.push(player);
        }
        let treasury = localnet.new_wallet().await.unwrap();
        orchestrator.bootstrap(treasury).await.unwrap();
        Self {
            localnet,
            orchestrator,
            admin,
            treasury,
            mint,
            players,
        }
    }

    /// A table created by player 0 plus players seated at `seats`.
    pub async fn with_table(seats: &[u8]) -> Self {
        let fx = Self::new().await;
        fx.orchestrator
            .create_table(fx.player(0), fx.mint, STAKES)
            .await
            .unwrap();
        for seat in seats {
            fx.orchestrator
                .join_table(fx.player(*seat as usize), TABLE_ID, *seat, STAKES.buy_in)
                .await
                .unwrap();
        }
        fx
    }

    /// Heads-up table with the first hand dealt.
    pub async fn dealt_heads_up() -> Self {
        let fx = Self::with_table(&[1]).await;
        let handle = fx
            .orchestrator
            .start_hand(TABLE_ID, fx.seat_keys())
            .await
            .unwrap();
        fx.orchestrator.finalize(&handle).await.unwrap();
        fx
    }

    pub fn player(&self, index: usize) -> Pubkey {
        self.players[index]
    }

    pub fn seat_keys(&self) -> [[u8; 32]; MAX_PLAYERS] {
        std::array::from_fn(|i| [i as u8 + 1; 32])
    }

    pub fn vault(&self) -> Pubkey {
        pda::vault(&pda::table(TABLE_ID).0).0
    }

    pub async fn table(&self) -> Table {
        self.orchestrator.table(TABLE_ID).await.unwrap()
    }

    pub async fn hand(&self, hand_id: u64) -> HandData {
        self.orchestrator.hand(TABLE_ID, hand_id).await.unwrap()
    }

    pub async fn wallet_balance(&self, player: usize) -> u64 {
        let wallet = pda::associated_token(&self.player(player), &self.mint);
        self.localnet.token_amount(&wallet).await.unwrap()
    }

    pub async fn vault_balance(&self) -> u64 {
        self.localnet.token_amount(&self.vault()).await.unwrap()
    }

    pub async fn treasury_balance(&self) -> u64 {
        let wallet = pda::associated_token(&self.treasury, &self.mint);
        self.localnet.token_amount(&wallet).await.unwrap()
    }

    /// Sends `ix` signed by `signers`, bypassing the orchestrator.
    pub async fn send(&self, ix: Instruction, signers: &[Pubkey]) -> Result<u64, ClientError> {
        self.localnet
            .send_transaction(Transaction::new(vec![ix], signers.to_vec()))
            .await
    }

    /// Plays `action` for whoever is to act.
    pub async fn act(&self, action: PlayerAction) -> Table {
        let table = self.table().await;
        let player = table.seats[table.turn_position as usize].unwrap().player;
        self.orchestrator
            .act(player, TABLE_ID, action)
            .await
            .unwrap()
    }
}

/// The custom program error code carried by `err`.
pub fn code_of(err: ClientError) -> u32 {
    err.program_code()
        .unwrap_or_else(|| panic!("expected a program error, got {err:?}"))
}

/// Chips on the table plus in the pot.
pub fn chips(table: &Table) -> u64 {
    table.seats.iter().flatten().map(|seat| seat.stack).sum::<u64>() + table.pot
}
