mod common;

use std::collections::HashSet;

use aces_localnet::Localnet;
use aces_orchestrator::Step;
use aces_table::circuit::CircuitKind;
use aces_table::state::{BettingRound, GameState, PlayerAction};
use common::{chips, Harness, STAKES};

#[tokio::test(start_paused = true)]
async fn test_fold_out_pays_the_survivor_the_whole_pot() {
    let harness = Harness::with_table(3).await;
    let orchestrator = &harness.orchestrator;
    let table_id = STAKES.table_id;

    let handle = orchestrator
        .start_hand(table_id, harness.seat_keys())
        .await
        .unwrap();
    assert_eq!(handle.circuit, CircuitKind::ShuffleAndDeal);
    orchestrator.finalize(&handle).await.unwrap();

    let mut table = harness.table().await;
    assert_eq!(table.game_state, GameState::HandInProgress);
    assert!(table.pot >= STAKES.small_blind + STAKES.big_blind);
    assert_eq!(chips(&table), 3 * STAKES.buy_in);

    while table.contender_count() > 1 {
        table = orchestrator
            .act(Harness::to_act(&table), table_id, PlayerAction::Fold)
            .await
            .unwrap();
    }
    let survivor = table.contenders().next().unwrap();
    let stack_before = table.seats[survivor].unwrap().stack;
    let pot = table.pot;

    let outcome = orchestrator.play_until_settled(table_id).await.unwrap();
    assert_eq!(outcome.hand_id, 1);
    let showdown = outcome.showdown.unwrap();
    assert_eq!(showdown.rake, 0);
    assert_eq!(showdown.payouts[survivor], pot);

    let table = outcome.table;
    assert_eq!(table.game_state, GameState::AwaitingPlayers);
    assert_eq!(table.pot, 0);
    assert_eq!(table.seats[survivor].unwrap().stack, stack_before + pot);
    assert_eq!(chips(&table), 3 * STAKES.buy_in);
    assert_eq!(harness.tokens(&harness.vault()).await, 3 * STAKES.buy_in);
}

#[tokio::test(start_paused = true)]
async fn test_checked_down_hand_reaches_showdown() {
    let harness = Harness::with_table(2).await;
    let orchestrator = &harness.orchestrator;
    let table_id = STAKES.table_id;

    let handle = orchestrator
        .start_hand(table_id, harness.seat_keys())
        .await
        .unwrap();
    orchestrator.finalize(&handle).await.unwrap();

    let mut streets = Vec::new();
    loop {
        match orchestrator.step(table_id).await.unwrap() {
            Step::Idle => break,
            Step::AwaitingAction { .. } => {
                let table = harness.table().await;
                let seat = table.seats[table.turn_position as usize].unwrap();
                let action = if seat.bet_this_round < table.current_bet {
                    PlayerAction::Call
                } else {
                    PlayerAction::Check
                };
                orchestrator
                    .act(seat.player, table_id, action)
                    .await
                    .unwrap();
            }
            Step::Computed { circuit } => streets.push(circuit),
            other => panic!("unexpected step {other:?}"),
        }
    }
    assert_eq!(
        streets,
        vec![
            CircuitKind::RevealCommunityCards,
            CircuitKind::RevealCommunityCards,
            CircuitKind::RevealCommunityCards,
            CircuitKind::EvaluateHandsAndPayout,
        ]
    );

    let hand = orchestrator.hand(table_id, 1).await.unwrap();
    assert!(hand.is_settled);
    assert_eq!(hand.betting_round, BettingRound::Showdown);
    assert!(hand.community_cards.iter().all(Option::is_some));
    let showdown = hand.showdown.unwrap();
    assert!(showdown.hand_ranks[..2].iter().all(|rank| *rank != u8::MAX));

    let table = harness.table().await;
    let treasury = aces_table::pda::associated_token(&harness.treasury, &harness.mint);
    let raked = harness.tokens(&treasury).await;
    assert_eq!(raked, showdown.rake);
    assert_eq!(chips(&table) + raked, 2 * STAKES.buy_in);
    assert_eq!(
        showdown.payouts.iter().sum::<u64>() + showdown.rake,
        2 * STAKES.big_blind
    );
}

#[tokio::test(start_paused = true)]
async fn test_hole_cards_open_only_for_their_seat_key() {
    let harness = Harness::with_table(3).await;
    let orchestrator = &harness.orchestrator;

    let handle = orchestrator
        .start_hand(STAKES.table_id, harness.seat_keys())
        .await
        .unwrap();
    orchestrator.finalize(&handle).await.unwrap();

    let hand = orchestrator.hand(STAKES.table_id, 1).await.unwrap();
    let mut seen = HashSet::new();
    for seat in 0..3 {
        let sealed = hand.hands[seat].unwrap();
        assert_eq!(sealed.encryption_key, harness.seat_keys()[seat]);
        assert_eq!(sealed.player, harness.players[seat]);
        for card in Localnet::open_hole_cards(&sealed) {
            assert!(card < 52);
            assert!(seen.insert(card));
        }
    }
    assert!(hand.hands[3..].iter().all(Option::is_none));
}

#[tokio::test(start_paused = true)]
async fn test_absent_player_is_folded_when_the_timer_runs_out() {
    let harness = Harness::with_table(2).await;
    let orchestrator = &harness.orchestrator;
    let table_id = STAKES.table_id;

    let handle = orchestrator
        .start_hand(table_id, harness.seat_keys())
        .await
        .unwrap();
    orchestrator.finalize(&handle).await.unwrap();
    let table = harness.table().await;
    let first_to_act = table.turn_position as usize;

    match orchestrator.step(table_id).await.unwrap() {
        Step::AwaitingAction { seat, deadline } => {
            assert_eq!(seat as usize, first_to_act);
            assert_eq!(
                deadline,
                table.turn_started_at + table.turn_duration_seconds as i64
            );
        }
        other => panic!("unexpected step {other:?}"),
    }

    let outcome = orchestrator.play_until_settled(table_id).await.unwrap();
    let showdown = outcome.showdown.unwrap();
    assert_eq!(showdown.payouts[first_to_act], 0);
    assert_eq!(showdown.payouts[1 - first_to_act], table.pot);
    assert_eq!(outcome.table.game_state, GameState::AwaitingPlayers);
    assert_eq!(harness.localnet.executed("force_player_fold").await, 1);
}

#[tokio::test(start_paused = true)]
async fn test_second_hand_rotates_the_dealer() {
    let harness = Harness::with_table(2).await;
    let orchestrator = &harness.orchestrator;
    let table_id = STAKES.table_id;

    let mut dealers = Vec::new();
    for hand_id in 1..=2 {
        let handle = orchestrator
            .start_hand(table_id, harness.seat_keys())
            .await
            .unwrap();
        orchestrator.finalize(&handle).await.unwrap();
        let table = harness.table().await;
        assert_eq!(table.hand_id_counter, hand_id);
        dealers.push(table.dealer_position);

        orchestrator
            .act(Harness::to_act(&table), table_id, PlayerAction::Fold)
            .await
            .unwrap();
        let outcome = orchestrator.play_until_settled(table_id).await.unwrap();
        assert_eq!(outcome.hand_id, hand_id);
    }
    assert_ne!(dealers[0], dealers[1]);
    assert_eq!(chips(&harness.table().await), 2 * STAKES.buy_in);
}
