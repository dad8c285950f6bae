#![allow(dead_code)]

use std::time::Duration;

use aces_localnet::{Localnet, LocalnetConfig};
use aces_orchestrator::{Context, Orchestrator, SequentialNonces, Settings, TableParams};
use aces_table::pda;
use aces_table::state::{Table, MAX_PLAYERS};
use anchor_lang::prelude::Pubkey;

pub const FUNDING: u64 = 1_000_000;
pub const STAKES: TableParams = TableParams {
    table_id: 1,
    small_blind: 1_000,
    big_blind: 2_000,
    buy_in: 40_000,
};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

pub struct Harness {
    pub localnet: Localnet,
    pub orchestrator: Orchestrator<Localnet, SequentialNonces>,
    pub payer: Pubkey,
    pub treasury: Pubkey,
    pub mint: Pubkey,
    pub players: Vec<Pubkey>,
}

impl Harness {
    /// A provisioned localnet with eight funded players. Not bootstrapped.
    pub async fn provisioned() -> Self {
        init_tracing();
        let localnet = Localnet::start(LocalnetConfig::default()).await.unwrap();
        let payer = localnet.new_wallet().await.unwrap();
        localnet.provision(payer).await.unwrap();
        Self::attach(localnet, payer).await
    }

    /// An orchestrator over `localnet` with a fresh mint and players.
    pub async fn attach(localnet: Localnet, payer: Pubkey) -> Self {
        let settings = Settings {
            finalization_timeout: Duration::from_secs(10),
            ..Settings::for_cluster(localnet.cluster_offset())
        };
        let ctx = Context::new(localnet.clone(), settings, payer);
        let orchestrator = Orchestrator::with_nonces(ctx, SequentialNonces::starting_at(1_000));
        let mint = localnet.create_mint(6).await.unwrap();
        let mut players = Vec::with_capacity(8);
        for _ in 0..8 {
            let player = localnet.new_wallet().await.unwrap();
            localnet.fund(&player, &mint, FUNDING).await.unwrap();
            players.push(player);
        }
        let treasury = localnet.new_wallet().await.unwrap();
        Self {
            localnet,
            orchestrator,
            payer,
            treasury,
            mint,
            players,
        }
    }

    pub async fn bootstrapped() -> Self {
        let harness = Self::provisioned().await;
        harness.orchestrator.bootstrap(harness.treasury).await.unwrap();
        harness
    }

    /// Bootstrapped, with `STAKES` created by player 0 and players
    /// `1..seated` joined at the seat of the same number.
    pub async fn with_table(seated: usize) -> Self {
        let harness = Self::bootstrapped().await;
        harness
            .orchestrator
            .create_table(harness.players[0], harness.mint, STAKES)
            .await
            .unwrap();
        for seat in 1..seated {
            harness
                .orchestrator
                .join_table(harness.players[seat], STAKES.table_id, seat as u8, STAKES.buy_in)
                .await
                .unwrap();
        }
        harness
    }

    pub fn seat_keys(&self) -> [[u8; 32]; MAX_PLAYERS] {
        std::array::from_fn(|seat| [seat as u8 + 1; 32])
    }

    pub fn vault(&self) -> Pubkey {
        pda::vault(&pda::table(STAKES.table_id).0).0
    }

    pub fn wallet(&self, player: usize) -> Pubkey {
        pda::associated_token(&self.players[player], &self.mint)
    }

    /// Processed token balance of `key`.
    pub async fn tokens(&self, key: &Pubkey) -> u64 {
        self.localnet.token_amount(key).await.unwrap()
    }

    pub fn treasury_wallet(&self) -> Pubkey {
        pda::associated_token(&self.treasury, &self.mint)
    }

    pub async fn table(&self) -> Table {
        self.orchestrator.table(STAKES.table_id).await.unwrap()
    }

    /// Player seated where the action is.
    pub fn to_act(table: &Table) -> Pubkey {
        table.seats[table.turn_position as usize]
            .map(|seat| seat.player)
            .unwrap()
    }
}

/// Chips on the table plus in the pot.
pub fn chips(table: &Table) -> u64 {
    table.seats.iter().flatten().map(|seat| seat.stack).sum::<u64>() + table.pot
}
