//! src/lib.rs
//!
//! @description
//! An in-process ledger with a compute cluster attached, implementing the
//! orchestrator's `LedgerClient`. The table program runs inside
//! `solana-program-test` next to a native compute program stand-in, so the
//! program's own `Accounts` validation and the orchestration flows are
//! exercised end to end without a validator. Test-only: nothing here ships
//! with the orchestrator.
//!
//! @logic
//! - Slots advance with `tokio::time`, one per `slot_duration`, and the
//!   ledger's clock sysvar follows them. Under a paused test clock the ledger
//!   moves only as fast as the test sleeps.
//! - Confirmed reads lag the head by `confirmation_lag_slots`, finalized
//!   reads by twice that.
//! - The cluster picks up queued computations `latency_slots` after they
//!   were queued and delivers their callbacks at the slot boundary.
//! - Failures can be injected: the next sends can be made unavailable, and
//!   computations can be held in the mempool.

mod bank;
mod cluster;
mod compute_program;
mod history;

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use aces_circuits::Hand;
use aces_orchestrator::{Account, ClientError, Commitment, LedgerClient, TokenBalance, Transaction};
use aces_table::circuit::CircuitKind;
use aces_table::compute::{
    sighash, ComputationAccount, ComputationStatus, ComputeAccount, ComputeInstruction, Mempool,
    MempoolSize, COMPUTE_PROGRAM_ID,
};
use aces_table::{pda, AcesTableErrorCode};
use aces_table::state::SealedHand;
use anchor_lang::prelude::{Clock, Pubkey};
use anchor_lang::solana_program::instruction::Instruction;
use anchor_lang::solana_program::program_pack::Pack;
use anchor_spl::token::spl_token;
use anchor_spl::token::spl_token::state::Account as TokenState;
use anyhow::anyhow;
use solana_sdk::signature::Keypair;
use solana_sdk::signer::Signer;
use tokio::sync::{Mutex, MutexGuard};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use self::bank::{is_known_program, Bank, WALLET_LAMPORTS};
use self::cluster::{apply_keystream, Cluster, Outcome};
use self::history::History;

pub use self::cluster::DELIVERED_CAPACITY;

const GENESIS_UNIX_TIMESTAMP: i64 = 1_700_000_000;

const TABLE_METHODS: [&str; 17] = [
    "initialize_platform_config",
    "update_rake_params",
    "create_table",
    "join_table",
    "leave_table",
    CircuitKind::ShuffleAndDeal.init_method(),
    CircuitKind::RevealCommunityCards.init_method(),
    CircuitKind::EvaluateHandsAndPayout.init_method(),
    "start_hand",
    "deal_community_cards",
    "resolve_showdown",
    "player_action",
    "force_player_fold",
    "force_hand_refund",
    CircuitKind::ShuffleAndDeal.callback_method(),
    CircuitKind::RevealCommunityCards.callback_method(),
    CircuitKind::EvaluateHandsAndPayout.callback_method(),
];

/// Method name of an instruction the localnet runs.
fn method_of(ix: &Instruction) -> Option<&'static str> {
    if ix.program_id == COMPUTE_PROGRAM_ID {
        return ComputeInstruction::method_of(&ix.data);
    }
    if ix.program_id != aces_table::ID {
        return None;
    }
    let tag = ix.data.get(..8)?;
    TABLE_METHODS.into_iter().find(|method| tag == sighash(method))
}

#[derive(Clone, Debug)]
pub struct LocalnetConfig {
    pub cluster_offset: u32,
    pub confirmation_lag_slots: u64,
    /// Slots between queueing a computation and its callback.
    pub latency_slots: u64,
    pub slot_duration: Duration,
    pub mempool_size: MempoolSize,
    /// Seeds the cluster's authority, keys and shuffles.
    pub seed: u64,
}

impl Default for LocalnetConfig {
    fn default() -> Self {
        Self {
            cluster_offset: 1,
            confirmation_lag_slots: 1,
            latency_slots: 2,
            slot_duration: Duration::from_millis(400),
            mempool_size: MempoolSize::Small,
            seed: 0,
        }
    }
}

struct State {
    bank: Bank,
    history: History,
    cluster: Cluster,
    slot: u64,
    started: Instant,
    slot_duration: Duration,
    unavailable: u32,
    executed: HashMap<&'static str, usize>,
}

impl State {
    fn clock(&self) -> Clock {
        let elapsed_ms = (self.slot - 1).saturating_mul(self.slot_duration.as_millis() as u64);
        Clock {
            slot: self.slot,
            unix_timestamp: GENESIS_UNIX_TIMESTAMP + (elapsed_ms / 1_000) as i64,
            epoch_start_timestamp: GENESIS_UNIX_TIMESTAMP,
            ..Clock::default()
        }
    }

    fn advance_to(&mut self, slot: u64) {
        self.slot = slot;
        let clock = self.clock();
        self.bank.set_clock(&clock);
    }

    /// Advances to the slot the clock says it is, letting the cluster run
    /// whatever falls due on the way.
    async fn catch_up(&mut self) -> Result<(), ClientError> {
        let per_slot = self.slot_duration.as_nanos().max(1);
        let target = 1 + (self.started.elapsed().as_nanos() / per_slot) as u64;
        while self.slot < target {
            let due = if self.cluster.is_held() {
                None
            } else {
                self.next_due().await?
            };
            let next = match due {
                Some(due) if due > self.slot => due.min(target),
                Some(_) => self.slot + 1,
                None => target,
            };
            self.advance_to(next);
            if due.is_some_and(|due| due <= next) {
                self.run_due().await?;
            }
        }
        Ok(())
    }

    /// The oldest queued computation, if any.
    async fn head_of_mempool(&mut self) -> Result<Option<(u64, ComputationAccount)>, ClientError> {
        let mempool = self
            .bank
            .account(&pda::mempool(self.cluster.offset()).0)
            .await?
            .and_then(|account| Mempool::from_account_data(&account.data).ok());
        let Some(&offset) = mempool.as_ref().and_then(|mempool| mempool.queued.first()) else {
            return Ok(None);
        };
        let computation = self
            .bank
            .account(&pda::computation(self.cluster.offset(), offset).0)
            .await?
            .and_then(|account| ComputationAccount::from_account_data(&account.data).ok());
        Ok(computation.map(|computation| (offset, computation)))
    }

    async fn next_due(&mut self) -> Result<Option<u64>, ClientError> {
        Ok(self
            .head_of_mempool()
            .await?
            .map(|(_, computation)| self.cluster.due_slot(&computation)))
    }

    /// Runs queued computations in FIFO order while they are due.
    async fn run_due(&mut self) -> Result<(), ClientError> {
        while !self.cluster.is_held() {
            let Some((offset, computation)) = self.head_of_mempool().await? else {
                return Ok(());
            };
            if self.cluster.due_slot(&computation) > self.slot {
                return Ok(());
            }
            self.run(offset, &computation).await?;
        }
        Ok(())
    }

    async fn run(&mut self, offset: u64, computation: &ComputationAccount) -> Result<(), ClientError> {
        let circuit = computation.circuit;
        let authority = self.cluster.authority().pubkey();
        let claim = self.cluster.claim(offset).map_err(cluster_fault)?;
        self.execute(Transaction::new(vec![claim], vec![authority]))
            .await?;

        match self.cluster.execute(computation).map_err(cluster_fault)? {
            Outcome::Deliver { callback, finalize } => {
                let delivery = Transaction::new(vec![callback.clone(), finalize], vec![authority]);
                match self.execute(delivery).await {
                    Ok(slot) => info!(%circuit, offset, slot, "callback applied"),
                    Err(err) => {
                        warn!(%circuit, offset, error = %err, "callback rejected");
                        let code = err
                            .program_code()
                            .unwrap_or(u32::from(AcesTableErrorCode::AbortedComputation));
                        let failed = self
                            .cluster
                            .finalize(offset, ComputationStatus::Failed { code })
                            .map_err(cluster_fault)?;
                        self.execute(Transaction::new(vec![failed], vec![authority]))
                            .await?;
                    }
                }
                self.cluster.record_delivery(offset, callback);
            }
            Outcome::Abort { finalize } => {
                self.execute(Transaction::new(vec![finalize], vec![authority]))
                    .await?;
            }
        }
        Ok(())
    }

    /// Processes `transaction` in the current slot and records the accounts
    /// it wrote for the commitment views.
    async fn execute(&mut self, transaction: Transaction) -> Result<u64, ClientError> {
        if let Some(ix) = transaction
            .instructions
            .iter()
            .find(|ix| !is_known_program(&ix.program_id))
        {
            return Err(ClientError::UnknownProgram {
                program: ix.program_id,
            });
        }
        let mut writable: Vec<Pubkey> = transaction
            .instructions
            .iter()
            .flat_map(|ix| ix.accounts.iter())
            .filter(|meta| meta.is_writable)
            .map(|meta| meta.pubkey)
            .collect();
        writable.sort_unstable();
        writable.dedup();
        for key in &writable {
            if !self.history.is_tracked(key) {
                let before = self.bank.account(key).await?;
                self.history.track(*key, before);
            }
        }

        self.bank.process(&transaction).await?;

        for key in writable {
            let after = self.bank.account(&key).await?;
            self.history.record(key, self.slot, after);
        }
        for method in transaction.instructions.iter().filter_map(method_of) {
            *self.executed.entry(method).or_default() += 1;
        }
        Ok(self.slot)
    }

    async fn read(&mut self, key: &Pubkey, commitment: Commitment) -> Result<Option<Account>, ClientError> {
        let slot = self.history.slot_at(self.slot, commitment);
        match self.history.view(key, slot) {
            Some(account) => Ok(account.cloned()),
            None => self.bank.account(key).await,
        }
    }
}

fn cluster_fault(err: anyhow::Error) -> ClientError {
    ClientError::Rejected {
        program: COMPUTE_PROGRAM_ID,
        reason: err.to_string(),
    }
}

fn token_balance(account: Option<Account>) -> Option<TokenBalance> {
    let account = account.filter(|account| account.owner == spl_token::ID)?;
    let state = TokenState::unpack(&account.data).ok()?;
    Some(TokenBalance {
        mint: state.mint,
        owner: state.owner,
        amount: state.amount,
    })
}

/// A cloneable handle; clones share one ledger.
#[derive(Clone)]
pub struct Localnet {
    state: Arc<Mutex<State>>,
    cluster_offset: u32,
    cluster_authority: Pubkey,
    mempool_size: MempoolSize,
}

impl Localnet {
    pub async fn start(config: LocalnetConfig) -> anyhow::Result<Self> {
        let cluster = Cluster::new(config.cluster_offset, config.latency_slots, config.seed)?;
        let cluster_authority = cluster.authority().pubkey();
        let mut bank = Bank::start().await;
        bank.fund_lamports(&cluster_authority, WALLET_LAMPORTS);
        bank.add_keypair(cluster.authority().insecure_clone());

        let mut state = State {
            bank,
            history: History::new(config.confirmation_lag_slots),
            cluster,
            slot: 1,
            started: Instant::now(),
            slot_duration: config.slot_duration,
            unavailable: 0,
            executed: HashMap::new(),
        };
        state.advance_to(1);
        debug!(cluster_offset = config.cluster_offset, %cluster_authority, "localnet started");
        Ok(Self {
            state: Arc::new(Mutex::new(state)),
            cluster_offset: config.cluster_offset,
            cluster_authority,
            mempool_size: config.mempool_size,
        })
    }

    async fn state(&self) -> Result<MutexGuard<'_, State>, ClientError> {
        let mut state = self.state.lock().await;
        state.catch_up().await?;
        Ok(state)
    }

    pub fn cluster_offset(&self) -> u32 {
        self.cluster_offset
    }

    pub fn cluster_authority(&self) -> Pubkey {
        self.cluster_authority
    }

    /// A new keypair with lamports, able to sign transactions that list it.
    pub async fn new_wallet(&self) -> anyhow::Result<Pubkey> {
        let mut state = self.state().await?;
        let key = state.bank.add_keypair(Keypair::new());
        state.bank.fund_lamports(&key, WALLET_LAMPORTS);
        Ok(key)
    }

    /// A new token mint with no freeze authority.
    pub async fn create_mint(&self, decimals: u8) -> anyhow::Result<Pubkey> {
        let mut state = self.state().await?;
        let key = Pubkey::new_unique();
        let authority = state.bank.add_keypair(Keypair::new());
        state.bank.put_mint(&key, &authority, decimals)?;
        Ok(key)
    }

    /// Creates the table program's MXE on this cluster, paid by `payer`.
    pub async fn provision(&self, payer: Pubkey) -> anyhow::Result<()> {
        let ix = ComputeInstruction::init_mxe(
            payer,
            aces_table::ID,
            self.cluster_offset,
            self.cluster_authority,
            self.mempool_size,
        )
        .map_err(|err| anyhow!("building init_mxe: {err}"))?;
        let slot = self
            .state()
            .await?
            .execute(Transaction::new(vec![ix], vec![payer]))
            .await?;
        info!(cluster_offset = self.cluster_offset, slot, "MXE provisioned");
        Ok(())
    }

    /// Credits `amount` of `mint` to the associated token account of `owner`.
    pub async fn fund(&self, owner: &Pubkey, mint: &Pubkey, amount: u64) -> anyhow::Result<Pubkey> {
        let key = pda::associated_token(owner, mint);
        let mut state = self.state().await?;
        if !state.history.is_tracked(&key) {
            let before = state.bank.account(&key).await?;
            state.history.track(key, before);
        }
        state.bank.credit_tokens(&key, mint, owner, amount).await?;
        let after = state.bank.account(&key).await?;
        let slot = state.slot;
        state.history.record(key, slot, after);
        Ok(key)
    }

    /// Processed balance of a token account; zero if it does not exist.
    pub async fn token_amount(&self, key: &Pubkey) -> anyhow::Result<u64> {
        let account = self.state().await?.read(key, Commitment::Processed).await?;
        Ok(token_balance(account).map_or(0, |balance| balance.amount))
    }

    /// The next `count` sends fail as unavailable without reaching the ledger.
    pub async fn fail_next(&self, count: u32) {
        self.state.lock().await.unavailable = count;
    }

    pub async fn hold_computations(&self, held: bool) {
        self.state.lock().await.cluster.hold(held);
    }

    /// Replays the callback the cluster delivered for `computation`.
    pub async fn redeliver_callback(&self, computation: &Pubkey) -> Result<u64, ClientError> {
        let mut state = self.state().await?;
        let callback = state
            .cluster
            .delivered(computation)
            .cloned()
            .ok_or_else(|| ClientError::Rejected {
                program: aces_table::ID,
                reason: format!("no callback delivered for {computation}"),
            })?;
        let authority = state.cluster.authority().pubkey();
        state
            .execute(Transaction::new(vec![callback], vec![authority]))
            .await
    }

    /// Applies `data` as the callback of the queued `computation` in place of
    /// a circuit run: claimed, delivered and finalized in one transaction
    /// signed by the cluster authority.
    pub async fn deliver_output(&self, computation: &Pubkey, data: Vec<u8>) -> Result<u64, ClientError> {
        let mut state = self.state().await?;
        let queued = state
            .bank
            .account(computation)
            .await?
            .and_then(|account| ComputationAccount::from_account_data(&account.data).ok())
            .ok_or_else(|| ClientError::Rejected {
                program: COMPUTE_PROGRAM_ID,
                reason: format!("no computation at {computation}"),
            })?;
        let offset = queued.computation_offset;
        let authority = state.cluster.authority().pubkey();
        let claim = state.cluster.claim(offset).map_err(cluster_fault)?;
        let callback = state.cluster.callback(&queued, data);
        let finalize = state
            .cluster
            .finalize(offset, ComputationStatus::Finalized)
            .map_err(cluster_fault)?;
        let slot = state
            .execute(Transaction::new(
                vec![claim, callback.clone(), finalize],
                vec![authority],
            ))
            .await?;
        state.cluster.record_delivery(offset, callback);
        Ok(slot)
    }

    /// How many instructions named `method` executed successfully.
    pub async fn executed(&self, method: &str) -> usize {
        self.state
            .lock()
            .await
            .executed
            .get(method)
            .copied()
            .unwrap_or(0)
    }

    /// Opens hole cards sealed for the holder of `hand.encryption_key`.
    pub fn open_hole_cards(hand: &SealedHand) -> [u8; 2] {
        let mut bytes = hand.ciphertext;
        apply_keystream(&hand.encryption_key, hand.nonce, &mut bytes);
        Hand::from_bytes(bytes).to_array()
    }
}

impl LedgerClient for Localnet {
    fn get_account(
        &self,
        key: &Pubkey,
        commitment: Commitment,
    ) -> impl Future<Output = Result<Option<Account>, ClientError>> + Send {
        let key = *key;
        async move { self.state().await?.read(&key, commitment).await }
    }

    fn token_balance(
        &self,
        key: &Pubkey,
        commitment: Commitment,
    ) -> impl Future<Output = Result<Option<TokenBalance>, ClientError>> + Send {
        let key = *key;
        async move {
            let account = self.state().await?.read(&key, commitment).await?;
            Ok(token_balance(account))
        }
    }

    fn slot(&self, commitment: Commitment) -> impl Future<Output = Result<u64, ClientError>> + Send {
        async move {
            let state = self.state().await?;
            Ok(state.history.slot_at(state.slot, commitment))
        }
    }

    fn clock(&self) -> impl Future<Output = Result<Clock, ClientError>> + Send {
        async move { Ok(self.state().await?.clock()) }
    }

    fn send_transaction(
        &self,
        transaction: Transaction,
    ) -> impl Future<Output = Result<u64, ClientError>> + Send {
        async move {
            let mut state = self.state().await?;
            if state.unavailable > 0 {
                state.unavailable -= 1;
                debug!("dropping transaction");
                return Err(ClientError::Unavailable);
            }
            state.execute(transaction).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn started() -> Localnet {
        Localnet::start(LocalnetConfig::default()).await.unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_slots_follow_the_clock() {
        let localnet = started().await;
        assert_eq!(localnet.slot(Commitment::Processed).await.unwrap(), 1);
        tokio::time::sleep(Duration::from_millis(1_000)).await;
        assert_eq!(localnet.slot(Commitment::Processed).await.unwrap(), 3);
        assert_eq!(localnet.slot(Commitment::Confirmed).await.unwrap(), 2);
        assert_eq!(localnet.slot(Commitment::Finalized).await.unwrap(), 1);

        let clock = localnet.clock().await.unwrap();
        assert_eq!(clock.unix_timestamp, GENESIS_UNIX_TIMESTAMP);
        tokio::time::sleep(Duration::from_secs(10)).await;
        let clock = localnet.clock().await.unwrap();
        assert_eq!(clock.unix_timestamp, GENESIS_UNIX_TIMESTAMP + 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_provisioned_mxe_becomes_confirmed() {
        let localnet = started().await;
        let payer = localnet.new_wallet().await.unwrap();
        localnet.provision(payer).await.unwrap();
        let mxe = pda::mxe(&aces_table::ID).0;
        assert!(localnet.get_account(&mxe, Commitment::Processed).await.unwrap().is_some());
        assert!(localnet.get_account(&mxe, Commitment::Confirmed).await.unwrap().is_none());
        tokio::time::sleep(Duration::from_millis(400)).await;
        let account = localnet.get_account(&mxe, Commitment::Confirmed).await.unwrap().unwrap();
        assert_eq!(account.owner, COMPUTE_PROGRAM_ID);
        assert_eq!(localnet.executed("init_mxe").await, 1);

        let pool = localnet
            .get_account(&pda::execpool(1).0, Commitment::Processed)
            .await
            .unwrap()
            .unwrap();
        assert!(aces_table::compute::ExecutingPool::from_account_data(&pool.data)
            .unwrap()
            .executing
            .is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_mxe_is_in_use() {
        let localnet = started().await;
        let payer = localnet.new_wallet().await.unwrap();
        localnet.provision(payer).await.unwrap();
        let ix = ComputeInstruction::init_mxe(
            payer,
            aces_table::ID,
            1,
            Pubkey::new_unique(),
            MempoolSize::Tiny,
        )
        .unwrap();
        let err = localnet
            .send_transaction(Transaction::new(vec![ix], vec![payer]))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ClientError::AccountInUse {
                account: pda::mxe(&aces_table::ID).0
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_definition_collision_names_the_account() {
        let localnet = started().await;
        let payer = localnet.new_wallet().await.unwrap();
        localnet.provision(payer).await.unwrap();
        let init = aces_orchestrator::builders::init_comp_def(payer, CircuitKind::ShuffleAndDeal).unwrap();
        let tx = Transaction::new(vec![init], vec![payer]);
        localnet.send_transaction(tx.clone()).await.unwrap();
        assert_eq!(
            localnet.send_transaction(tx).await.unwrap_err(),
            ClientError::AccountInUse {
                account: pda::comp_def(&aces_table::ID, CircuitKind::ShuffleAndDeal).0
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_unsigned_and_unknown_instructions_are_refused() {
        let localnet = started().await;
        let payer = localnet.new_wallet().await.unwrap();
        let ix = ComputeInstruction::init_mxe(
            payer,
            aces_table::ID,
            1,
            Pubkey::new_unique(),
            MempoolSize::Tiny,
        )
        .unwrap();
        assert_eq!(
            localnet
                .send_transaction(Transaction::new(vec![ix.clone()], vec![]))
                .await
                .unwrap_err(),
            ClientError::MissingSignature { account: payer }
        );

        let mut stray = ix;
        stray.program_id = Pubkey::new_unique();
        assert_eq!(
            localnet
                .send_transaction(Transaction::new(vec![stray.clone()], vec![payer]))
                .await
                .unwrap_err(),
            ClientError::UnknownProgram {
                program: stray.program_id
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_unavailable_sends_do_not_execute() {
        let localnet = started().await;
        let caller = localnet.new_wallet().await.unwrap();
        localnet.fail_next(1).await;
        let ix = aces_orchestrator::builders::force_player_fold(caller, 1).unwrap();
        let tx = Transaction::new(vec![ix], vec![caller]);
        assert_eq!(
            localnet.send_transaction(tx.clone()).await,
            Err(ClientError::Unavailable)
        );
        assert!(matches!(
            localnet.send_transaction(tx).await,
            Err(ClientError::Program { .. })
        ));
        assert_eq!(localnet.executed("force_player_fold").await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_only_pooled_computations_are_claimed_or_finalized() {
        let localnet = started().await;
        let payer = localnet.new_wallet().await.unwrap();
        localnet.provision(payer).await.unwrap();
        let (claim, finalize, authority) = {
            let state = localnet.state.lock().await;
            (
                state.cluster.claim(5).unwrap(),
                state
                    .cluster
                    .finalize(5, ComputationStatus::Finalized)
                    .unwrap(),
                state.cluster.authority().pubkey(),
            )
        };
        let not_pooled = u32::from(aces_table::compute::ComputeErrorCode::ComputationNotPooled);
        for ix in [claim, finalize] {
            let err = localnet
                .send_transaction(Transaction::new(vec![ix], vec![authority]))
                .await
                .unwrap_err();
            assert_eq!(err.program_code(), Some(not_pooled));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_funding_accumulates() {
        let localnet = started().await;
        let owner = Pubkey::new_unique();
        let mint = localnet.create_mint(6).await.unwrap();
        let key = localnet.fund(&owner, &mint, 10).await.unwrap();
        localnet.fund(&owner, &mint, 5).await.unwrap();
        assert_eq!(localnet.token_amount(&key).await.unwrap(), 15);
        let balance = localnet
            .token_balance(&key, Commitment::Processed)
            .await
            .unwrap()
            .unwrap();
        assert_eq!((balance.mint, balance.owner), (mint, owner));
    }
}
