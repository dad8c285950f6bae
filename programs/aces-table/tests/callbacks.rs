mod common;

use aces_orchestrator::{Commitment, ComputationHandle, LedgerClient};
use aces_table::circuit::{EvaluateHandsAndPayoutOutput, RevealCommunityCardsOutput};
use aces_table::compute::{ComputationAccount, ComputeAccount, ExecutingPool, Mempool};
use aces_table::error::AcesTableErrorCode;
use aces_table::state::{BettingRound, GameState, PlayerAction, MAX_PLAYERS};
use aces_table::{instruction, pda};
use anchor_lang::prelude::{AccountMeta, Pubkey};
use anchor_lang::solana_program::instruction::Instruction;
use anchor_lang::InstructionData;
use common::{code_of, Fixture, STAKES, TABLE_ID};

async fn queued(fx: &Fixture, handle: &ComputationHandle) -> ComputationAccount {
    let account = fx
        .localnet
        .get_account(&handle.address, Commitment::Processed)
        .await
        .unwrap()
        .unwrap();
    ComputationAccount::from_account_data(&account.data).unwrap()
}

/// Heads-up hand with the pre-flop round closed and the flop queued but
/// held in the mempool.
async fn flop_queued() -> (Fixture, ComputationHandle) {
    let fx = Fixture::dealt_heads_up().await;
    fx.act(PlayerAction::Call).await;
    fx.act(PlayerAction::Check).await;
    fx.localnet.hold_computations(true).await;
    let handle = fx.orchestrator.deal_next_street(TABLE_ID).await.unwrap();
    (fx, handle)
}

/// Offsets waiting in the mempool and claimed into the executing pool.
async fn pools(fx: &Fixture) -> (Vec<u64>, Vec<u64>) {
    let offset = fx.localnet.cluster_offset();
    let read = |key: Pubkey| async move {
        fx.localnet
            .get_account(&key, Commitment::Processed)
            .await
            .unwrap()
            .unwrap()
            .data
    };
    let mempool = Mempool::from_account_data(&read(pda::mempool(offset).0).await).unwrap();
    let execpool = ExecutingPool::from_account_data(&read(pda::execpool(offset).0).await).unwrap();
    (mempool.queued, execpool.executing)
}

fn reveal(cards: [u8; 3], deck_top: u8) -> Vec<u8> {
    instruction::RevealCommunityCardsCallback {
        output: RevealCommunityCardsOutput {
            cards,
            encrypted_deck: [0; 48],
            deck_nonce: 7,
            deck_top,
        },
    }
    .data()
}

#[tokio::test(start_paused = true)]
async fn test_replayed_shuffle_is_stale() {
    let fx = Fixture::with_table(&[1]).await;
    let handle = fx
        .orchestrator
        .start_hand(TABLE_ID, fx.seat_keys())
        .await
        .unwrap();
    fx.orchestrator.finalize(&handle).await.unwrap();
    let dealt = fx.hand(1).await;

    let err = fx.localnet.redeliver_callback(&handle.address).await.unwrap_err();
    assert_eq!(code_of(err), u32::from(AcesTableErrorCode::StaleComputation));
    assert_eq!(fx.hand(1).await, dealt);
}

#[tokio::test(start_paused = true)]
async fn test_callback_requires_cluster_authority() {
    let (fx, handle) = flop_queued().await;
    let computation = queued(&fx, &handle).await;
    let impostor = fx.localnet.new_wallet().await.unwrap();

    let mut accounts = vec![
        AccountMeta::new(impostor, true),
        AccountMeta::new_readonly(pda::mxe(&aces_table::ID).0, false),
        AccountMeta::new_readonly(computation.comp_def, false),
        AccountMeta::new_readonly(handle.address, false),
    ];
    accounts.extend(computation.callback_accounts.iter().map(|account| {
        if account.is_writable {
            AccountMeta::new(account.pubkey, false)
        } else {
            AccountMeta::new_readonly(account.pubkey, false)
        }
    }));
    let forged = Instruction {
        program_id: aces_table::ID,
        accounts,
        data: reveal([0, 1, 2], 7),
    };
    let err = fx.send(forged, &[impostor]).await.unwrap_err();
    assert_eq!(
        code_of(err),
        u32::from(AcesTableErrorCode::InvalidCallbackAuthority)
    );
    let hand = fx.hand(1).await;
    assert_eq!(hand.betting_round, BettingRound::PreFlop);
    assert!(!hand.flop_seen());
}

#[tokio::test(start_paused = true)]
async fn test_invalid_revealed_card_aborts() {
    let (fx, handle) = flop_queued().await;
    assert_eq!(pools(&fx).await, (vec![handle.nonce], vec![]));

    let err = fx
        .localnet
        .deliver_output(&handle.address, reveal([0, 52, 2], 7))
        .await
        .unwrap_err();
    assert_eq!(code_of(err), u32::from(AcesTableErrorCode::AbortedComputation));
    let table = fx.table().await;
    assert_eq!(
        table.pending_computation.map(|pending| pending.computation_offset),
        Some(handle.nonce)
    );
    // the claim rolled back with the callback
    assert_eq!(pools(&fx).await, (vec![handle.nonce], vec![]));

    fx.localnet
        .deliver_output(&handle.address, reveal([0, 1, 2], 7))
        .await
        .unwrap();
    assert_eq!(pools(&fx).await, (vec![], vec![]));
    let hand = fx.hand(1).await;
    assert_eq!(hand.betting_round, BettingRound::Flop);
    assert!(hand.community_cards[..3].iter().all(Option::is_some));
    assert_eq!(hand.deck_top, 7);
    assert!(fx.table().await.pending_computation.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_payout_to_folded_seat_is_rejected() {
    let fx = Fixture::dealt_heads_up().await;
    let table = fx.act(PlayerAction::Fold).await;
    let survivor = table.contenders().next().unwrap();
    let folded = 1 - survivor;
    let pot = table.pot;

    fx.localnet.hold_computations(true).await;
    let handle = fx.orchestrator.resolve_showdown(TABLE_ID).await.unwrap();
    assert_eq!(fx.table().await.game_state, GameState::Settling);

    let payout = |payouts: [u64; MAX_PLAYERS]| {
        instruction::EvaluateHandsAndPayoutCallback {
            output: EvaluateHandsAndPayoutOutput {
                payouts,
                hand_ranks: [u8::MAX; MAX_PLAYERS],
            },
        }
        .data()
    };

    let mut payouts = [0; MAX_PLAYERS];
    payouts[folded] = pot;
    let err = fx
        .localnet
        .deliver_output(&handle.address, payout(payouts))
        .await
        .unwrap_err();
    assert_eq!(code_of(err), u32::from(AcesTableErrorCode::PayoutMismatch));

    let mut payouts = [0; MAX_PLAYERS];
    payouts[survivor] = pot - 1;
    let err = fx
        .localnet
        .deliver_output(&handle.address, payout(payouts))
        .await
        .unwrap_err();
    assert_eq!(code_of(err), u32::from(AcesTableErrorCode::PayoutMismatch));

    let mut payouts = [0; MAX_PLAYERS];
    payouts[survivor] = pot;
    fx.localnet
        .deliver_output(&handle.address, payout(payouts))
        .await
        .unwrap();
    let table = fx.table().await;
    assert_eq!(table.game_state, GameState::AwaitingPlayers);
    assert_eq!(table.pot, 0);
    assert_eq!(table.seats[survivor].unwrap().stack, STAKES.buy_in + STAKES.small_blind);
    assert_eq!(table.seats[folded].unwrap().stack, STAKES.buy_in - STAKES.small_blind);
    assert!(fx.hand(1).await.is_settled);
}
