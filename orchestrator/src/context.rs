//! src/context.rs
//!
//! @description
//! The explicit context every operation runs in: the ledger client, the
//! validated settings and the fee payer. It owns the two generic waiting
//! loops of the orchestrator: bounded retry of transient failures, and
//! polling until a write becomes visible at the configured commitment.

use std::future::Future;

use aces_table::compute::ComputeAccount;
use anchor_lang::prelude::{Clock, Pubkey};
use anchor_lang::solana_program::instruction::Instruction;
use anchor_lang::AccountDeserialize;
use tracing::{debug, warn};

use crate::client::{Account, ClientError, LedgerClient, TokenBalance, Transaction};
use crate::config::Settings;
use crate::error::{Error, Result};

pub struct Context<C> {
    client: C,
    settings: Settings,
    payer: Pubkey,
}

impl<C: LedgerClient> Context<C> {
    pub fn new(client: C, settings: Settings, payer: Pubkey) -> Self {
        Self {
            client,
            settings,
            payer,
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn payer(&self) -> Pubkey {
        self.payer
    }

    /// Runs `op` until it succeeds, fails definitively, or the retry budget
    /// for transient failures is spent.
    async fn with_retry<T, F, Fut>(&self, method: &'static str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, ClientError>>,
    {
        let policy = self.settings.retry;
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < policy.max_attempts => {
                    let delay = policy.delay(&mut rand::thread_rng(), attempt - 1);
                    warn!(method, attempt, ?delay, "ledger unavailable, retrying");
                    tokio::time::sleep(delay).await;
                }
                Err(err) if err.is_transient() => {
                    return Err(Error::TransientUnavailable { attempts: attempt })
                }
                Err(err) => return Err(Error::from_client(method, err)),
            }
        }
    }

    /// Submits `instructions` as one transaction; returns the slot it landed in.
    pub async fn submit(
        &self,
        method: &'static str,
        instructions: Vec<Instruction>,
        signers: Vec<Pubkey>,
    ) -> Result<u64> {
        let slot = self
            .with_retry(method, || {
                self.client
                    .send_transaction(Transaction::new(instructions.clone(), signers.clone()))
            })
            .await?;
        debug!(method, slot, "transaction processed");
        Ok(slot)
    }

    pub async fn account(&self, key: &Pubkey) -> Result<Option<Account>> {
        let commitment = self.settings.commitment;
        self.with_retry("get_account", || self.client.get_account(key, commitment))
            .await
    }

    pub async fn token_balance(&self, key: &Pubkey) -> Result<Option<TokenBalance>> {
        let commitment = self.settings.commitment;
        self.with_retry("token_balance", || self.client.token_balance(key, commitment))
            .await
    }

    pub async fn clock(&self) -> Result<Clock> {
        self.with_retry("clock", || self.client.clock()).await
    }

    /// Polls until `key` exists. An exhausted budget is `NotFound`.
    pub async fn wait_for_account(&self, key: &Pubkey) -> Result<Account> {
        let policy = self.settings.retry;
        for attempt in 0..policy.max_attempts {
            if let Some(account) = self.account(key).await? {
                return Ok(account);
            }
            if attempt + 1 < policy.max_attempts {
                let delay = policy.delay(&mut rand::thread_rng(), attempt);
                debug!(%key, attempt, ?delay, "account not visible yet");
                tokio::time::sleep(delay).await;
            }
        }
        Err(Error::NotFound { account: *key })
    }

    /// Polls until the configured commitment has reached `slot`.
    pub async fn wait_for_slot(&self, slot: u64) -> Result<()> {
        let policy = self.settings.retry;
        let commitment = self.settings.commitment;
        let mut retry = 0u32;
        loop {
            let seen = self
                .with_retry("get_slot", || self.client.slot(commitment))
                .await?;
            if seen >= slot {
                return Ok(());
            }
            if retry + 1 >= policy.max_attempts {
                return Err(Error::TransientUnavailable {
                    attempts: retry + 1,
                });
            }
            let delay = policy.delay(&mut rand::thread_rng(), retry);
            debug!(slot, seen, ?delay, "waiting for commitment");
            tokio::time::sleep(delay).await;
            retry += 1;
        }
    }

    /// Reads and decodes a program-owned account.
    pub async fn load<T: AccountDeserialize>(&self, key: &Pubkey) -> Result<T> {
        self.try_load(key)
            .await?
            .ok_or(Error::NotFound { account: *key })
    }

    pub async fn try_load<T: AccountDeserialize>(&self, key: &Pubkey) -> Result<Option<T>> {
        let Some(account) = self.account(key).await? else {
            return Ok(None);
        };
        if account.owner != self.settings.program_id {
            return Err(Error::Decode {
                account: *key,
                reason: format!("owned by {}", account.owner),
            });
        }
        T::try_deserialize(&mut &account.data[..])
            .map(Some)
            .map_err(|err| Error::Decode {
                account: *key,
                reason: err.to_string(),
            })
    }

    /// Re-reads `key` once the write that landed in `slot` is visible.
    pub async fn load_after<T: AccountDeserialize>(&self, key: &Pubkey, slot: u64) -> Result<T> {
        self.wait_for_slot(slot).await?;
        self.load(key).await
    }

    /// Reads and decodes an account owned by the compute program.
    pub async fn try_load_compute<T: ComputeAccount>(&self, key: &Pubkey) -> Result<Option<T>> {
        let Some(account) = self.account(key).await? else {
            return Ok(None);
        };
        T::from_account_data(&account.data)
            .map(Some)
            .map_err(|err| Error::Decode {
                account: *key,
                reason: err.to_string(),
            })
    }
}
