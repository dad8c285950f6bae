//! src/builders.rs
//!
//! @description
//! Typed instruction builders. Each builder takes exactly the keys its
//! instruction needs, derives every other address through `aces_table::pda`,
//! and fills the program's generated client account struct, so account order
//! and writability always come from the program's own `Accounts` definitions.

use aces_table::circuit::CircuitKind;
use aces_table::compute::COMPUTE_PROGRAM_ID;
use aces_table::state::{PlayerAction, MAX_PLAYERS};
use aces_table::{accounts, instruction, pda};
use anchor_lang::prelude::Pubkey;
use anchor_lang::solana_program::instruction::Instruction;
use anchor_lang::{InstructionData, ToAccountMetas};

use crate::error::Result;

fn assemble(accounts: impl ToAccountMetas, data: impl InstructionData) -> Result<Instruction> {
    Ok(Instruction {
        program_id: aces_table::ID,
        accounts: accounts.to_account_metas(None),
        data: data.data(),
    })
}

/// The leading queue accounts of a computation-starting instruction.
struct QueueKeys {
    mxe_account: Pubkey,
    mempool: Pubkey,
    executing_pool: Pubkey,
    cluster: Pubkey,
    comp_def: Pubkey,
    computation: Pubkey,
    sign_pda_account: Pubkey,
}

impl QueueKeys {
    fn derive(cluster_offset: u32, circuit: CircuitKind, computation_offset: u64) -> Self {
        Self {
            mxe_account: pda::mxe(&aces_table::ID).0,
            mempool: pda::mempool(cluster_offset).0,
            executing_pool: pda::execpool(cluster_offset).0,
            cluster: pda::cluster(cluster_offset).0,
            comp_def: pda::comp_def(&aces_table::ID, circuit).0,
            computation: pda::computation(cluster_offset, computation_offset).0,
            sign_pda_account: pda::sign_pda().0,
        }
    }
}

pub fn initialize_platform_config(admin: Pubkey, treasury_vault: Pubkey) -> Result<Instruction> {
    assemble(
        accounts::InitializePlatformConfig {
            admin,
            platform_config: pda::platform_config().0,
            treasury_vault,
            system_program: anchor_lang::system_program::ID,
        },
        instruction::InitializePlatformConfig {},
    )
}

pub fn update_rake_params(admin: Pubkey, rake_bps: u16, rake_max_cap: u64) -> Result<Instruction> {
    assemble(
        accounts::UpdateRakeParams {
            admin,
            platform_config: pda::platform_config().0,
        },
        instruction::UpdateRakeParams {
            new_rake_bps: rake_bps,
            new_rake_max_cap: rake_max_cap,
        },
    )
}

/// Stakes of a new table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TableParams {
    pub table_id: u64,
    pub small_blind: u64,
    pub big_blind: u64,
    pub buy_in: u64,
}

pub fn create_table(creator: Pubkey, token_mint: Pubkey, params: TableParams) -> Result<Instruction> {
    let table = pda::table(params.table_id).0;
    assemble(
        accounts::CreateTable {
            creator,
            platform_config: pda::platform_config().0,
            table,
            token_mint,
            creator_token_account: pda::associated_token(&creator, &token_mint),
            table_vault: pda::vault(&table).0,
            token_program: anchor_spl::token::ID,
            system_program: anchor_lang::system_program::ID,
        },
        instruction::CreateTable {
            table_id: params.table_id,
            small_blind: params.small_blind,
            big_blind: params.big_blind,
            buy_in: params.buy_in,
        },
    )
}

pub fn join_table(
    player: Pubkey,
    token_mint: Pubkey,
    table_id: u64,
    seat_index: u8,
    buy_in: u64,
) -> Result<Instruction> {
    let table = pda::table(table_id).0;
    assemble(
        accounts::JoinTable {
            player,
            table,
            player_token_account: pda::associated_token(&player, &token_mint),
            table_vault: pda::vault(&table).0,
            token_program: anchor_spl::token::ID,
        },
        instruction::JoinTable {
            table_id,
            seat_index,
            buy_in,
        },
    )
}

/// Cashes `player` out to `destination`, or to their associated token
/// account for `token_mint` when `None`.
pub fn leave_table(
    player: Pubkey,
    token_mint: Pubkey,
    table_id: u64,
    destination: Option<Pubkey>,
) -> Result<Instruction> {
    let table = pda::table(table_id).0;
    assemble(
        accounts::LeaveTable {
            player,
            table,
            table_vault: pda::vault(&table).0,
            destination,
            player_token_account: pda::associated_token(&player, &token_mint),
            token_mint,
            token_program: anchor_spl::token::ID,
            associated_token_program: anchor_spl::associated_token::ID,
            system_program: anchor_lang::system_program::ID,
        },
        instruction::LeaveTable { table_id },
    )
}

pub fn init_comp_def(payer: Pubkey, circuit: CircuitKind) -> Result<Instruction> {
    let accounts = accounts::InitCompDef {
        payer,
        mxe_account: pda::mxe(&aces_table::ID).0,
        comp_def: pda::comp_def(&aces_table::ID, circuit).0,
        sign_pda_account: pda::sign_pda().0,
        system_program: anchor_lang::system_program::ID,
        compute_program: COMPUTE_PROGRAM_ID,
    };
    match circuit {
        CircuitKind::ShuffleAndDeal => assemble(accounts, instruction::InitShuffleAndDealCompDef {}),
        CircuitKind::RevealCommunityCards => {
            assemble(accounts, instruction::InitRevealCommunityCardsCompDef {})
        }
        CircuitKind::EvaluateHandsAndPayout => {
            assemble(accounts, instruction::InitEvaluateHandsAndPayoutCompDef {})
        }
    }
}

pub fn start_hand(
    payer: Pubkey,
    cluster_offset: u32,
    table_id: u64,
    hand_id: u64,
    computation_offset: u64,
    seat_keys: [[u8; 32]; MAX_PLAYERS],
) -> Result<Instruction> {
    let table = pda::table(table_id).0;
    let queue = QueueKeys::derive(cluster_offset, CircuitKind::ShuffleAndDeal, computation_offset);
    assemble(
        accounts::StartHand {
            payer,
            mxe_account: queue.mxe_account,
            mempool: queue.mempool,
            executing_pool: queue.executing_pool,
            cluster: queue.cluster,
            comp_def: queue.comp_def,
            computation: queue.computation,
            system_program: anchor_lang::system_program::ID,
            compute_program: COMPUTE_PROGRAM_ID,
            sign_pda_account: queue.sign_pda_account,
            table,
            hand_data: pda::hand(&table, hand_id).0,
        },
        instruction::StartHand {
            table_id,
            computation_offset,
            seat_keys,
        },
    )
}

pub fn player_action(player: Pubkey, table_id: u64, action: PlayerAction) -> Result<Instruction> {
    assemble(
        accounts::PlayerActionAccounts {
            player,
            table: pda::table(table_id).0,
        },
        instruction::PlayerAction { table_id, action },
    )
}

pub fn force_player_fold(caller: Pubkey, table_id: u64) -> Result<Instruction> {
    assemble(
        accounts::ForcePlayerFold {
            caller,
            table: pda::table(table_id).0,
        },
        instruction::ForcePlayerFold { table_id },
    )
}

pub fn deal_community_cards(
    payer: Pubkey,
    cluster_offset: u32,
    table_id: u64,
    hand_id: u64,
    computation_offset: u64,
) -> Result<Instruction> {
    let table = pda::table(table_id).0;
    let queue = QueueKeys::derive(
        cluster_offset,
        CircuitKind::RevealCommunityCards,
        computation_offset,
    );
    assemble(
        accounts::DealCommunityCards {
            payer,
            mxe_account: queue.mxe_account,
            mempool: queue.mempool,
            executing_pool: queue.executing_pool,
            cluster: queue.cluster,
            comp_def: queue.comp_def,
            computation: queue.computation,
            system_program: anchor_lang::system_program::ID,
            compute_program: COMPUTE_PROGRAM_ID,
            sign_pda_account: queue.sign_pda_account,
            table,
            hand_data: pda::hand(&table, hand_id).0,
        },
        instruction::DealCommunityCards {
            table_id,
            computation_offset,
        },
    )
}

pub fn resolve_showdown(
    payer: Pubkey,
    cluster_offset: u32,
    table_id: u64,
    hand_id: u64,
    computation_offset: u64,
) -> Result<Instruction> {
    let table = pda::table(table_id).0;
    let queue = QueueKeys::derive(
        cluster_offset,
        CircuitKind::EvaluateHandsAndPayout,
        computation_offset,
    );
    assemble(
        accounts::ResolveShowdown {
            payer,
            mxe_account: queue.mxe_account,
            mempool: queue.mempool,
            executing_pool: queue.executing_pool,
            cluster: queue.cluster,
            comp_def: queue.comp_def,
            computation: queue.computation,
            system_program: anchor_lang::system_program::ID,
            compute_program: COMPUTE_PROGRAM_ID,
            sign_pda_account: queue.sign_pda_account,
            table,
            hand_data: pda::hand(&table, hand_id).0,
            platform_config: pda::platform_config().0,
        },
        instruction::ResolveShowdown {
            table_id,
            computation_offset,
        },
    )
}

pub fn force_hand_refund(caller: Pubkey, table_id: u64) -> Result<Instruction> {
    assemble(
        accounts::ForceHandRefund {
            caller,
            table: pda::table(table_id).0,
        },
        instruction::ForceHandRefund { table_id },
    )
}
