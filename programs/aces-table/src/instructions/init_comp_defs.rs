//! src/instructions/init_comp_defs.rs
//!
//! @description
//! The `init_<circuit>_comp_def` instructions. Each registers one circuit of
//! this program with the compute program, creating its computation
//! definition account. Run once per circuit after deployment; a second run
//! fails because the definition account already exists.
//!
//! @accounts
//! - `payer`: Signer paying for the definition account.
//! - `mxe_account`: This program's MXE account. Must already exist.
//! - `comp_def`: The definition, at `["ComputationDefinitionAccount", program, offset]`.
//! - `sign_pda_account`: This program's signer towards the compute program.

use anchor_lang::prelude::*;
use anchor_lang::solana_program::instruction::Instruction;
use anchor_lang::solana_program::program::invoke_signed;

use crate::circuit::CircuitKind;
use crate::compute::{ComputeInstruction, COMPUTE_PROGRAM_ID};
use crate::error::AcesTableErrorCode;
use crate::pda::{self, MXE_SEED, SIGN_PDA_SEED};

pub fn init_comp_def(ctx: Context<InitCompDef>, circuit: CircuitKind) -> Result<()> {
    let accounts = &ctx.accounts;
    pda::verify_address(
        "comp_def",
        &pda::comp_def(&crate::ID, circuit).0,
        &accounts.comp_def.key(),
    )?;
    require!(
        accounts.mxe_account.owner == &COMPUTE_PROGRAM_ID && !accounts.mxe_account.data_is_empty(),
        AcesTableErrorCode::MxeNotInitialized
    );

    let ix = Instruction {
        program_id: COMPUTE_PROGRAM_ID,
        accounts: vec![
            AccountMeta::new(accounts.payer.key(), true),
            AccountMeta::new_readonly(accounts.mxe_account.key(), false),
            AccountMeta::new(accounts.comp_def.key(), false),
            AccountMeta::new_readonly(accounts.sign_pda_account.key(), true),
            AccountMeta::new_readonly(accounts.system_program.key(), false),
        ],
        data: ComputeInstruction::InitComputationDefinition { circuit }.data()?,
    };
    invoke_signed(
        &ix,
        &[
            accounts.payer.to_account_info(),
            accounts.mxe_account.to_account_info(),
            accounts.comp_def.to_account_info(),
            accounts.sign_pda_account.to_account_info(),
            accounts.system_program.to_account_info(),
            accounts.compute_program.to_account_info(),
        ],
        &[&[SIGN_PDA_SEED, &[ctx.bumps.sign_pda_account]]],
    )?;
    msg!(
        "Computation definition for {} initialized at offset {}",
        circuit,
        circuit.comp_def_offset()
    );
    Ok(())
}

/// Shared by the three `init_<circuit>_comp_def` instructions; the circuit
/// comes from the instruction, so `comp_def` is checked in the handler.
#[derive(Accounts)]
pub struct InitCompDef<'info> {
    #[account(mut)]
    pub payer: Signer<'info>,
    /// CHECK: Seed-checked here, read by the compute program.
    #[account(
        seeds = [MXE_SEED, crate::ID.as_ref()],
        bump,
        seeds::program = COMPUTE_PROGRAM_ID
    )]
    pub mxe_account: UncheckedAccount<'info>,
    /// CHECK: Created by the compute program.
    #[account(mut)]
    pub comp_def: UncheckedAccount<'info>,
    /// CHECK: Signs the compute program call.
    #[account(seeds = [SIGN_PDA_SEED], bump)]
    pub sign_pda_account: UncheckedAccount<'info>,
    pub system_program: Program<'info, System>,
    /// CHECK: Fixed program id.
    #[account(address = COMPUTE_PROGRAM_ID)]
    pub compute_program: UncheckedAccount<'info>,
}
