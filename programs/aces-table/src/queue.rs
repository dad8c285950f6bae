//! src/queue.rs
//!
//! @description
//! The ledger side of the queue/finalize handshake with the compute cluster.
//!
//! @logic
//! Queueing: every instruction that starts a computation carries the same
//! leading accounts, all seed-checked by Anchor against the MXE's cluster and
//! the computation offset. `queue_computation` requires the circuit's
//! definition to be initialized and asks the compute program, signing with
//! the program's signer PDA, to record the computation. A computation offset
//! already in use makes the whole transaction fail.
//!
//! Finalization: every callback is signed by the cluster authority recorded
//! in the MXE. `verify_callback` then accepts it only for the table's pending
//! computation and only while that computation is still queued. Anything else
//! is stale and rejected, so a replayed or late finalization is never applied
//! twice.

use anchor_lang::prelude::*;
use anchor_lang::solana_program::instruction::Instruction;
use anchor_lang::solana_program::program::invoke_signed;

use crate::circuit::CircuitKind;
use crate::compute::{
    CallbackAccount, ComputationAccount, ComputationDefinitionAccount, ComputationStatus,
    ComputeAccount, ComputeInstruction, MxeAccount, COMPUTE_PROGRAM_ID,
};
use crate::error::AcesTableErrorCode;
use crate::pda::{self, SIGN_PDA_SEED};
use crate::state::Table;

/// The queueing accounts of an instruction, in the order the compute program
/// expects them.
pub struct QueueAccountInfos<'info> {
    pub payer: AccountInfo<'info>,
    pub mxe_account: AccountInfo<'info>,
    pub mempool: AccountInfo<'info>,
    pub executing_pool: AccountInfo<'info>,
    pub cluster: AccountInfo<'info>,
    pub comp_def: AccountInfo<'info>,
    pub computation: AccountInfo<'info>,
    pub system_program: AccountInfo<'info>,
    pub compute_program: AccountInfo<'info>,
    pub sign_pda_account: AccountInfo<'info>,
}

pub trait QueueComputationAccounts<'info> {
    fn queue_account_infos(&self) -> QueueAccountInfos<'info>;
}

/// Implements `QueueComputationAccounts` for an `Accounts` struct with the
/// standard queueing fields.
macro_rules! queue_computation_accounts {
    ($accounts:ident) => {
        impl<'info> $crate::queue::QueueComputationAccounts<'info> for $accounts<'info> {
            fn queue_account_infos(&self) -> $crate::queue::QueueAccountInfos<'info> {
                use anchor_lang::ToAccountInfo;
                $crate::queue::QueueAccountInfos {
                    payer: self.payer.to_account_info(),
                    mxe_account: self.mxe_account.to_account_info(),
                    mempool: self.mempool.to_account_info(),
                    executing_pool: self.executing_pool.to_account_info(),
                    cluster: self.cluster.to_account_info(),
                    comp_def: self.comp_def.to_account_info(),
                    computation: self.computation.to_account_info(),
                    system_program: self.system_program.to_account_info(),
                    compute_program: self.compute_program.to_account_info(),
                    sign_pda_account: self.sign_pda_account.to_account_info(),
                }
            }
        }
    };
}
pub(crate) use queue_computation_accounts;

fn is_initialized(comp_def: &AccountInfo) -> Result<bool> {
    if comp_def.owner != &COMPUTE_PROGRAM_ID || comp_def.data_is_empty() {
        return Ok(false);
    }
    let data = comp_def.try_borrow_data()?;
    Ok(ComputationDefinitionAccount::from_account_data(&data)?.is_initialized)
}

/// Asks the compute program to queue `circuit` under `computation_offset`.
pub fn queue_computation<'info, T: AnchorSerialize>(
    accounts: &impl QueueComputationAccounts<'info>,
    sign_pda_bump: u8,
    circuit: CircuitKind,
    computation_offset: u64,
    inputs: &T,
    callback_accounts: Vec<CallbackAccount>,
) -> Result<()> {
    let infos = accounts.queue_account_infos();
    require!(
        is_initialized(&infos.comp_def)?,
        AcesTableErrorCode::ComputationDefinitionNotInitialized
    );

    let mut encoded = Vec::new();
    inputs
        .serialize(&mut encoded)
        .map_err(|_| error!(anchor_lang::error::ErrorCode::InstructionDidNotSerialize))?;
    let data = ComputeInstruction::QueueComputation {
        computation_offset,
        circuit,
        inputs: encoded,
        callback_accounts,
    }
    .data()?;

    let ix = Instruction {
        program_id: COMPUTE_PROGRAM_ID,
        accounts: vec![
            AccountMeta::new(*infos.payer.key, true),
            AccountMeta::new_readonly(*infos.sign_pda_account.key, true),
            AccountMeta::new_readonly(*infos.mxe_account.key, false),
            AccountMeta::new(*infos.mempool.key, false),
            AccountMeta::new(*infos.executing_pool.key, false),
            AccountMeta::new(*infos.cluster.key, false),
            AccountMeta::new_readonly(*infos.comp_def.key, false),
            AccountMeta::new(*infos.computation.key, false),
            AccountMeta::new_readonly(*infos.system_program.key, false),
        ],
        data,
    };
    invoke_signed(
        &ix,
        &[
            infos.payer,
            infos.sign_pda_account,
            infos.mxe_account,
            infos.mempool,
            infos.executing_pool,
            infos.cluster,
            infos.comp_def,
            infos.computation,
            infos.system_program,
            infos.compute_program,
        ],
        &[&[SIGN_PDA_SEED, &[sign_pda_bump]]],
    )?;
    msg!("Queued {} computation {}", circuit, computation_offset);
    Ok(())
}

/// Checks that a callback finalizes the table's pending `circuit` computation.
/// The callback's signer has already been matched against `mxe.authority`.
pub fn verify_callback(
    mxe: &MxeAccount,
    computation_key: &Pubkey,
    computation: &ComputationAccount,
    table: &Table,
    circuit: CircuitKind,
) -> Result<()> {
    let pending = table
        .pending_computation
        .filter(|pending| pending.circuit == circuit)
        .ok_or(AcesTableErrorCode::StaleComputation)?;
    let expected = pda::computation(mxe.cluster_offset, pending.computation_offset).0;
    require_keys_eq!(
        *computation_key,
        expected,
        AcesTableErrorCode::StaleComputation
    );
    require!(
        computation.status == ComputationStatus::Queued,
        AcesTableErrorCode::StaleComputation
    );
    Ok(())
}
