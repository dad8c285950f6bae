//! src/compute_program.rs
//!
//! @description
//! Native stand-in for the compute program, registered with the test
//! validator under `COMPUTE_PROGRAM_ID`. It owns the MXE, pool, cluster,
//! definition and computation accounts and enforces who may touch them.
//!
//! @logic
//! - Only the owning program, signing with its signer PDA, may define
//!   circuits and queue computations.
//! - Only the cluster authority may claim a computation (mempool to
//!   executing pool) and finalize it (out of the executing pool).
//! - Accounts are created through the system program at their derived
//!   addresses, so an address already in use fails the whole transaction.

use aces_table::compute::{
    ClusterAccount, ComputationAccount, ComputationDefinitionAccount, ComputationStatus,
    ComputeAccount, ComputeErrorCode, ComputeInstruction, ExecutingPool, Mempool, MxeAccount,
    COMPUTATION_SLACK, COMPUTE_PROGRAM_ID,
};
use aces_table::pda::{
    self, CLUSTER_SEED, COMPUTATION_SEED, COMP_DEF_SEED, EXECPOOL_SEED, MEMPOOL_SEED, MXE_SEED,
    SIGN_PDA_SEED,
};
use anchor_lang::error::ErrorCode;
use anchor_lang::prelude::*;
use anchor_lang::solana_program::entrypoint::ProgramResult;
use anchor_lang::system_program::{self, CreateAccount};

pub fn process_instruction(
    _program_id: &Pubkey,
    accounts: &[AccountInfo],
    data: &[u8],
) -> ProgramResult {
    dispatch(accounts, data).map_err(|err| {
        err.log();
        err.into()
    })
}

fn dispatch(accounts: &[AccountInfo], data: &[u8]) -> Result<()> {
    match ComputeInstruction::decode(data)? {
        ComputeInstruction::InitMxe {
            mxe_program,
            cluster_offset,
            authority,
            mempool_size,
        } => {
            let [payer, mxe, mempool, execpool, cluster, system, ..] = accounts else {
                return err!(ErrorCode::AccountNotEnoughKeys);
            };
            let (mxe_key, bump) = pda::mxe(&mxe_program);
            pda::verify_address("mxe_account", &mxe_key, mxe.key)?;
            let offset = cluster_offset.to_le_bytes();
            let capacity = mempool_size.capacity();

            let value = MxeAccount {
                mxe_program,
                cluster_offset,
                authority,
                mempool_size,
                bump,
            };
            let space = value.to_account_data()?.len();
            create(payer, mxe, system, MXE_SEED, &[mxe_program.as_ref()], space, &value)?;
            if mempool.data_is_empty() {
                let value = Mempool {
                    cluster_offset,
                    capacity: capacity as u32,
                    queued: Vec::new(),
                };
                create(payer, mempool, system, MEMPOOL_SEED, &[&offset], Mempool::space(capacity), &value)?;
            }
            if execpool.data_is_empty() {
                let value = ExecutingPool {
                    cluster_offset,
                    executing: Vec::new(),
                };
                create(payer, execpool, system, EXECPOOL_SEED, &[&offset], ExecutingPool::space(capacity), &value)?;
            }
            if cluster.data_is_empty() {
                let value = ClusterAccount {
                    cluster_offset,
                    authority,
                };
                let space = value.to_account_data()?.len();
                create(payer, cluster, system, CLUSTER_SEED, &[&offset], space, &value)?;
            }
            msg!("MXE for {} on cluster {}", mxe_program, cluster_offset);
            Ok(())
        }
        ComputeInstruction::InitComputationDefinition { circuit } => {
            let [payer, mxe, comp_def, sign_pda, system, ..] = accounts else {
                return err!(ErrorCode::AccountNotEnoughKeys);
            };
            let mxe: MxeAccount = read(mxe)?;
            check_caller(&mxe, sign_pda)?;
            let value = ComputationDefinitionAccount {
                circuit,
                comp_def_offset: circuit.comp_def_offset(),
                mxe_program: mxe.mxe_program,
                is_initialized: true,
            };
            let space = value.to_account_data()?.len();
            let offset = circuit.comp_def_offset().to_le_bytes();
            create(
                payer,
                comp_def,
                system,
                COMP_DEF_SEED,
                &[mxe.mxe_program.as_ref(), &offset],
                space,
                &value,
            )
        }
        ComputeInstruction::QueueComputation {
            computation_offset,
            circuit,
            inputs,
            callback_accounts,
        } => {
            let [payer, sign_pda, mxe, mempool_info, _execpool, _cluster, comp_def, computation, system, ..] =
                accounts
            else {
                return err!(ErrorCode::AccountNotEnoughKeys);
            };
            let mxe: MxeAccount = read(mxe)?;
            check_caller(&mxe, sign_pda)?;
            pda::verify_address("comp_def", &pda::comp_def(&mxe.mxe_program, circuit).0, comp_def.key)?;
            require!(
                read::<ComputationDefinitionAccount>(comp_def)?.is_initialized,
                ErrorCode::AccountNotInitialized
            );
            pda::verify_address("mempool", &pda::mempool(mxe.cluster_offset).0, mempool_info.key)?;
            let mut mempool: Mempool = read(mempool_info)?;
            require!(
                mempool.queued.len() < mempool.capacity as usize,
                ComputeErrorCode::MempoolFull
            );

            let value = ComputationAccount {
                computation_offset,
                circuit,
                mxe_program: mxe.mxe_program,
                comp_def: *comp_def.key,
                payer: *payer.key,
                inputs,
                callback_accounts,
                status: ComputationStatus::Queued,
                queued_slot: Clock::get()?.slot,
                finalized_slot: None,
            };
            let space = value.to_account_data()?.len() + COMPUTATION_SLACK;
            create(
                payer,
                computation,
                system,
                COMPUTATION_SEED,
                &[&mxe.cluster_offset.to_le_bytes(), &computation_offset.to_le_bytes()],
                space,
                &value,
            )?;
            mempool.queued.push(computation_offset);
            write(mempool_info, &mempool)
        }
        ComputeInstruction::ClaimComputation { computation_offset } => {
            let [authority, cluster, mempool_info, execpool_info, ..] = accounts else {
                return err!(ErrorCode::AccountNotEnoughKeys);
            };
            let cluster = check_authority(authority, cluster)?;
            let offset = cluster.cluster_offset;
            pda::verify_address("mempool", &pda::mempool(offset).0, mempool_info.key)?;
            pda::verify_address("executing_pool", &pda::execpool(offset).0, execpool_info.key)?;

            let mut mempool: Mempool = read(mempool_info)?;
            let position = mempool
                .queued
                .iter()
                .position(|queued| *queued == computation_offset)
                .ok_or(ComputeErrorCode::ComputationNotPooled)?;
            mempool.queued.remove(position);
            let mut execpool: ExecutingPool = read(execpool_info)?;
            execpool.executing.push(computation_offset);
            write(mempool_info, &mempool)?;
            write(execpool_info, &execpool)
        }
        ComputeInstruction::FinalizeComputation {
            computation_offset,
            status,
        } => {
            let [authority, cluster, execpool_info, computation_info, ..] = accounts else {
                return err!(ErrorCode::AccountNotEnoughKeys);
            };
            let cluster = check_authority(authority, cluster)?;
            let offset = cluster.cluster_offset;
            pda::verify_address("executing_pool", &pda::execpool(offset).0, execpool_info.key)?;
            pda::verify_address(
                "computation",
                &pda::computation(offset, computation_offset).0,
                computation_info.key,
            )?;

            let mut execpool: ExecutingPool = read(execpool_info)?;
            let position = execpool
                .executing
                .iter()
                .position(|executing| *executing == computation_offset)
                .ok_or(ComputeErrorCode::ComputationNotPooled)?;
            execpool.executing.remove(position);

            let mut computation: ComputationAccount = read(computation_info)?;
            require!(
                computation.status == ComputationStatus::Queued,
                ComputeErrorCode::ComputationNotQueued
            );
            computation.status = status;
            if status == ComputationStatus::Finalized {
                computation.finalized_slot = Some(Clock::get()?.slot);
            }
            write(execpool_info, &execpool)?;
            write(computation_info, &computation)
        }
    }
}

/// The owning program calls through its signer PDA.
fn check_caller(mxe: &MxeAccount, sign_pda: &AccountInfo) -> Result<()> {
    let expected = Pubkey::find_program_address(&[SIGN_PDA_SEED], &mxe.mxe_program).0;
    require!(
        sign_pda.is_signer && *sign_pda.key == expected,
        ComputeErrorCode::UnauthorizedCaller
    );
    Ok(())
}

fn check_authority(authority: &AccountInfo, cluster: &AccountInfo) -> Result<ClusterAccount> {
    let cluster: ClusterAccount = read(cluster)?;
    require!(
        authority.is_signer && *authority.key == cluster.authority,
        ComputeErrorCode::InvalidClusterAuthority
    );
    Ok(cluster)
}

fn read<T: ComputeAccount>(info: &AccountInfo) -> Result<T> {
    require_keys_eq!(*info.owner, COMPUTE_PROGRAM_ID, ErrorCode::AccountOwnedByWrongProgram);
    let data = info.try_borrow_data()?;
    T::from_account_data(&data)
}

fn write<T: ComputeAccount>(info: &AccountInfo, value: &T) -> Result<()> {
    let encoded = value.to_account_data()?;
    let mut data = info.try_borrow_mut_data()?;
    require!(encoded.len() <= data.len(), ErrorCode::AccountDidNotSerialize);
    data[..encoded.len()].copy_from_slice(&encoded);
    data[encoded.len()..].fill(0);
    Ok(())
}

/// Allocates `target` at the address derived from `label` and `auxiliary`
/// and writes `value` into it.
fn create<'info, T: ComputeAccount>(
    payer: &AccountInfo<'info>,
    target: &AccountInfo<'info>,
    system: &AccountInfo<'info>,
    label: &[u8],
    auxiliary: &[&[u8]],
    space: usize,
    value: &T,
) -> Result<()> {
    let (key, bump) = pda::resolve(label, &COMPUTE_PROGRAM_ID, auxiliary);
    pda::verify_address(T::NAME, &key, target.key)?;

    let bump = [bump];
    let mut seeds: Vec<&[u8]> = Vec::with_capacity(auxiliary.len() + 2);
    seeds.push(label);
    seeds.extend_from_slice(auxiliary);
    seeds.push(&bump);

    let lamports = Rent::get()?.minimum_balance(space);
    system_program::create_account(
        CpiContext::new_with_signer(
            system.clone(),
            CreateAccount {
                from: payer.clone(),
                to: target.clone(),
            },
            &[&seeds],
        ),
        lamports,
        space as u64,
        &COMPUTE_PROGRAM_ID,
    )?;
    write(target, value)
}
