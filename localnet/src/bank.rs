//! src/bank.rs
//!
//! @description
//! The test validator: `solana-program-test` running the table program and
//! the compute program stand-in. Turns orchestrator transactions into signed
//! ledger transactions and ledger failures into `ClientError`s.

use std::collections::HashMap;
use std::str::FromStr;

use aces_orchestrator::{Account, ClientError, Transaction};
use aces_table::compute::COMPUTE_PROGRAM_ID;
use anchor_lang::prelude::{AccountInfo, Clock, Pubkey, Rent};
use anchor_lang::solana_program::entrypoint::ProgramResult;
use anchor_lang::solana_program::instruction::{Instruction, InstructionError};
use anchor_lang::solana_program::program_option::COption;
use anchor_lang::solana_program::program_pack::Pack;
use anchor_spl::token::spl_token;
use anchor_spl::token::spl_token::state::{Account as TokenState, AccountState, Mint};
use solana_program_test::{processor, ProgramTest, ProgramTestContext};
use solana_sdk::account::{Account as LedgerAccount, AccountSharedData};
use solana_sdk::compute_budget::ComputeBudgetInstruction;
use solana_sdk::signature::Keypair;
use solana_sdk::signer::Signer;
use solana_sdk::transaction::{Transaction as SignedTransaction, TransactionError};
use tracing::debug;

use crate::compute_program;

/// Lamports given to every wallet the localnet creates.
pub const WALLET_LAMPORTS: u64 = 100_000_000_000;

const MAX_COMPUTE_UNITS: u32 = 1_400_000;

/// Programs the validator runs. Anything else is refused before sending.
pub(crate) fn is_known_program(program: &Pubkey) -> bool {
    [
        aces_table::ID,
        COMPUTE_PROGRAM_ID,
        anchor_lang::system_program::ID,
        spl_token::ID,
        anchor_spl::associated_token::ID,
    ]
    .contains(program)
}

fn table_entry(program_id: &Pubkey, accounts: &[AccountInfo], data: &[u8]) -> ProgramResult {
    let accounts = Box::leak(Box::new(accounts.to_vec()));
    aces_table::entry(program_id, accounts, data)
}

pub(crate) struct Bank {
    context: ProgramTestContext,
    keyring: HashMap<Pubkey, Keypair>,
    sequence: u32,
}

impl Bank {
    pub async fn start() -> Self {
        let mut program_test =
            ProgramTest::new("aces_table", aces_table::ID, processor!(table_entry));
        program_test.add_program(
            "aces_compute",
            COMPUTE_PROGRAM_ID,
            processor!(compute_program::process_instruction),
        );
        program_test.prefer_bpf(false);
        Self {
            context: program_test.start_with_context().await,
            keyring: HashMap::new(),
            sequence: 0,
        }
    }

    /// Lets transactions listing `keypair` as a signer be signed by it.
    pub fn add_keypair(&mut self, keypair: Keypair) -> Pubkey {
        let key = keypair.pubkey();
        self.keyring.insert(key, keypair);
        key
    }

    pub fn set_clock(&mut self, clock: &Clock) {
        self.context.set_sysvar(clock);
    }

    pub async fn account(&mut self, key: &Pubkey) -> Result<Option<Account>, ClientError> {
        let account = self
            .context
            .banks_client
            .get_account(*key)
            .await
            .map_err(|err| {
                debug!(%key, error = %err, "account read failed");
                ClientError::Unavailable
            })?;
        Ok(account
            .filter(|account| account.lamports > 0)
            .map(|account| Account {
                owner: account.owner,
                data: account.data,
            }))
    }

    fn put(&mut self, key: &Pubkey, lamports: u64, owner: Pubkey, data: Vec<u8>) {
        let account = LedgerAccount {
            lamports,
            data,
            owner,
            executable: false,
            rent_epoch: 0,
        };
        self.context.set_account(key, &AccountSharedData::from(account));
    }

    pub fn fund_lamports(&mut self, key: &Pubkey, lamports: u64) {
        self.put(key, lamports, anchor_lang::system_program::ID, Vec::new());
    }

    pub fn put_mint(&mut self, key: &Pubkey, authority: &Pubkey, decimals: u8) -> Result<(), ClientError> {
        let mint = Mint {
            mint_authority: COption::Some(*authority),
            supply: 0,
            decimals,
            is_initialized: true,
            freeze_authority: COption::None,
        };
        let mut data = vec![0u8; Mint::LEN];
        Mint::pack(mint, &mut data).map_err(token_rejection)?;
        self.put(key, Rent::default().minimum_balance(Mint::LEN), spl_token::ID, data);
        Ok(())
    }

    /// Credits `amount` to token account `key`, creating it for `owner`.
    pub async fn credit_tokens(
        &mut self,
        key: &Pubkey,
        mint: &Pubkey,
        owner: &Pubkey,
        amount: u64,
    ) -> Result<(), ClientError> {
        let existing = self
            .account(key)
            .await?
            .filter(|account| account.owner == spl_token::ID)
            .and_then(|account| TokenState::unpack(&account.data).ok());
        let mut state = existing.unwrap_or(TokenState {
            mint: *mint,
            owner: *owner,
            amount: 0,
            delegate: COption::None,
            state: AccountState::Initialized,
            is_native: COption::None,
            delegated_amount: 0,
            close_authority: COption::None,
        });
        state.amount = state.amount.saturating_add(amount);
        let mut data = vec![0u8; TokenState::LEN];
        TokenState::pack(state, &mut data).map_err(token_rejection)?;
        self.put(key, Rent::default().minimum_balance(TokenState::LEN), spl_token::ID, data);
        Ok(())
    }

    /// Signs and processes `transaction`. The validator's own payer covers
    /// fees; every other signer must be listed and held in the keyring.
    pub async fn process(&mut self, transaction: &Transaction) -> Result<(), ClientError> {
        self.sequence = self.sequence.wrapping_add(1);
        // Identical requests must still be distinct ledger transactions.
        let mut instructions = vec![ComputeBudgetInstruction::set_compute_unit_limit(
            MAX_COMPUTE_UNITS - self.sequence % 1_000,
        )];
        instructions.extend(transaction.instructions.iter().cloned());

        let blockhash = self
            .context
            .banks_client
            .get_latest_blockhash()
            .await
            .map_err(|_| ClientError::Unavailable)?;
        let payer = self.context.payer.pubkey();
        let mut signed = SignedTransaction::new_with_payer(&instructions, Some(&payer));
        let required = usize::from(signed.message.header.num_required_signatures);
        let mut signers: Vec<&Keypair> = Vec::with_capacity(required);
        for key in &signed.message.account_keys[..required] {
            if *key == payer {
                signers.push(&self.context.payer);
                continue;
            }
            match self.keyring.get(key) {
                Some(keypair) if transaction.signers.contains(key) => signers.push(keypair),
                _ => return Err(ClientError::MissingSignature { account: *key }),
            }
        }
        signed
            .try_sign(signers.as_slice(), blockhash)
            .map_err(|err| ClientError::Rejected {
                program: first_program(&transaction.instructions),
                reason: err.to_string(),
            })?;

        let outcome = self
            .context
            .banks_client
            .process_transaction_with_metadata(signed)
            .await
            .map_err(|err| {
                debug!(error = %err, "transaction not delivered");
                ClientError::Unavailable
            })?;
        let logs = outcome
            .metadata
            .map(|metadata| metadata.log_messages)
            .unwrap_or_default();
        outcome
            .result
            .map_err(|err| rejection(&transaction.instructions, err, &logs))
    }
}

fn token_rejection(err: anchor_lang::prelude::ProgramError) -> ClientError {
    ClientError::Rejected {
        program: spl_token::ID,
        reason: err.to_string(),
    }
}

fn first_program(instructions: &[Instruction]) -> Pubkey {
    instructions
        .first()
        .map_or(Pubkey::default(), |ix| ix.program_id)
}

/// Maps a failed transaction to what a client reports. Instruction indexes
/// count the leading compute budget instruction.
fn rejection(instructions: &[Instruction], err: TransactionError, logs: &[String]) -> ClientError {
    let TransactionError::InstructionError(index, error) = err else {
        return ClientError::Rejected {
            program: first_program(instructions),
            reason: err.to_string(),
        };
    };
    let program = usize::from(index)
        .checked_sub(1)
        .and_then(|index| instructions.get(index))
        .map_or(Pubkey::default(), |ix| ix.program_id);
    match error {
        InstructionError::Custom(code) => match (code, account_in_use(logs)) {
            (0, Some(account)) => ClientError::AccountInUse { account },
            _ => ClientError::Program {
                program,
                code,
                message: error_message(logs)
                    .unwrap_or_else(|| format!("custom program error {code:#x}")),
            },
        },
        other => ClientError::Rejected {
            program,
            reason: other.to_string(),
        },
    }
}

/// The address a system program `create_account` found already in use.
fn account_in_use(logs: &[String]) -> Option<Pubkey> {
    logs.iter()
        .filter(|line| line.contains("already in use"))
        .find_map(|line| {
            let (_, rest) = line.split_once("address: ")?;
            let (address, _) = rest.split_once(',')?;
            Pubkey::from_str(address.trim()).ok()
        })
}

/// The message of the last program error logged.
fn error_message(logs: &[String]) -> Option<String> {
    logs.iter().rev().find_map(|line| {
        let (_, message) = line.split_once("Error Message: ")?;
        Some(message.trim_end_matches('.').to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn logs(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|line| line.to_string()).collect()
    }

    #[test]
    fn test_in_use_log_names_the_account() {
        let key = Pubkey::new_unique();
        let logs = logs(&[
            "Program 11111111111111111111111111111111 invoke [2]",
            &format!("Create Account: account Address {{ address: {key}, base: None }} already in use"),
        ]);
        let ix = Instruction {
            program_id: aces_table::ID,
            accounts: vec![],
            data: vec![],
        };
        assert_eq!(
            rejection(&[ix], TransactionError::InstructionError(1, InstructionError::Custom(0)), &logs),
            ClientError::AccountInUse { account: key }
        );
    }

    #[test]
    fn test_program_error_carries_its_message() {
        let logs = logs(&[
            "Program log: AnchorError occurred. Error Code: NotEnoughPlayers. Error Number: 6001. Error Message: Not enough players to start a hand.",
        ]);
        let ix = Instruction {
            program_id: aces_table::ID,
            accounts: vec![],
            data: vec![],
        };
        assert_eq!(
            rejection(&[ix], TransactionError::InstructionError(1, InstructionError::Custom(6001)), &logs),
            ClientError::Program {
                program: aces_table::ID,
                code: 6001,
                message: "Not enough players to start a hand".to_string(),
            }
        );
    }
}
