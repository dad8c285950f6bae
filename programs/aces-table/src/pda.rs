//! src/pda.rs
//!
//! @description
//! Address resolver. Every account this program touches, its own and the
//! compute program's, lives at a program-derived address computed from a seed
//! label, the owning program and auxiliary bytes. Derivation is pure and
//! deterministic, so the program, the orchestrator and the cluster all
//! recompute the same addresses independently.
//!
//! Integers in seeds are little-endian. Seed labels are pairwise non-prefix,
//! so no derivation path of one entity can produce another entity's preimage.

use anchor_lang::error::ErrorCode;
use anchor_lang::prelude::*;

use crate::circuit::CircuitKind;
use crate::compute::COMPUTE_PROGRAM_ID;
use crate::error::AcesTableErrorCode;
use crate::state::{HAND_SEED, PLATFORM_CONFIG_SEED, TABLE_SEED, VAULT_SEED};

pub const MXE_SEED: &[u8] = b"MXEAccount";
pub const MEMPOOL_SEED: &[u8] = b"Mempool";
pub const EXECPOOL_SEED: &[u8] = b"Execpool";
pub const CLUSTER_SEED: &[u8] = b"Cluster";
pub const COMP_DEF_SEED: &[u8] = b"ComputationDefinitionAccount";
pub const COMPUTATION_SEED: &[u8] = b"ComputationAccount";
/// The ledger program's own signer when it calls into the compute program.
pub const SIGN_PDA_SEED: &[u8] = b"SignerAccount";

pub const SEED_LABELS: [&[u8]; 11] = [
    PLATFORM_CONFIG_SEED,
    TABLE_SEED,
    VAULT_SEED,
    HAND_SEED,
    MXE_SEED,
    MEMPOOL_SEED,
    EXECPOOL_SEED,
    CLUSTER_SEED,
    COMP_DEF_SEED,
    COMPUTATION_SEED,
    SIGN_PDA_SEED,
];

/// Derives `(address, bump)` for `label` followed by `auxiliary` seeds under `owner`.
pub fn resolve(label: &[u8], owner: &Pubkey, auxiliary: &[&[u8]]) -> (Pubkey, u8) {
    let mut seeds: Vec<&[u8]> = Vec::with_capacity(auxiliary.len() + 1);
    seeds.push(label);
    seeds.extend_from_slice(auxiliary);
    Pubkey::find_program_address(&seeds, owner)
}

// --- Ledger program accounts ---

pub fn platform_config() -> (Pubkey, u8) {
    resolve(PLATFORM_CONFIG_SEED, &crate::ID, &[])
}

pub fn table(table_id: u64) -> (Pubkey, u8) {
    resolve(TABLE_SEED, &crate::ID, &[&table_id.to_le_bytes()])
}

pub fn vault(table: &Pubkey) -> (Pubkey, u8) {
    resolve(VAULT_SEED, &crate::ID, &[table.as_ref()])
}

pub fn hand(table: &Pubkey, hand_id: u64) -> (Pubkey, u8) {
    resolve(HAND_SEED, &crate::ID, &[table.as_ref(), &hand_id.to_le_bytes()])
}

pub fn sign_pda() -> (Pubkey, u8) {
    resolve(SIGN_PDA_SEED, &crate::ID, &[])
}

// --- Compute program accounts ---

pub fn mxe(mxe_program: &Pubkey) -> (Pubkey, u8) {
    resolve(MXE_SEED, &COMPUTE_PROGRAM_ID, &[mxe_program.as_ref()])
}

pub fn mempool(cluster_offset: u32) -> (Pubkey, u8) {
    resolve(MEMPOOL_SEED, &COMPUTE_PROGRAM_ID, &[&cluster_offset.to_le_bytes()])
}

pub fn execpool(cluster_offset: u32) -> (Pubkey, u8) {
    resolve(EXECPOOL_SEED, &COMPUTE_PROGRAM_ID, &[&cluster_offset.to_le_bytes()])
}

pub fn cluster(cluster_offset: u32) -> (Pubkey, u8) {
    resolve(CLUSTER_SEED, &COMPUTE_PROGRAM_ID, &[&cluster_offset.to_le_bytes()])
}

pub fn comp_def(mxe_program: &Pubkey, circuit: CircuitKind) -> (Pubkey, u8) {
    resolve(
        COMP_DEF_SEED,
        &COMPUTE_PROGRAM_ID,
        &[mxe_program.as_ref(), &circuit.comp_def_offset().to_le_bytes()],
    )
}

pub fn computation(cluster_offset: u32, computation_offset: u64) -> (Pubkey, u8) {
    resolve(
        COMPUTATION_SEED,
        &COMPUTE_PROGRAM_ID,
        &[&cluster_offset.to_le_bytes(), &computation_offset.to_le_bytes()],
    )
}

/// Fails unless `supplied` is the address derived for `account`. Mismatches
/// are never corrected.
pub fn verify_address(account: &str, derived: &Pubkey, supplied: &Pubkey) -> Result<()> {
    if derived != supplied {
        return Err(error!(ErrorCode::ConstraintSeeds)
            .with_account_name(account)
            .with_pubkeys((*supplied, *derived)));
    }
    Ok(())
}

/// The canonical token account of `owner` for `mint`.
pub fn associated_token(owner: &Pubkey, mint: &Pubkey) -> Pubkey {
    anchor_spl::associated_token::get_associated_token_address(owner, mint)
}

/// Seat index bounds check shared by seat-addressed instructions.
pub fn seat_index(index: u8) -> Result<usize> {
    let index = index as usize;
    require!(index < crate::state::MAX_PLAYERS, AcesTableErrorCode::InvalidSeatIndex);
    Ok(index)
}
