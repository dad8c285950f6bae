mod common;

use aces_orchestrator::Step;
use aces_table::circuit::CircuitKind;
use aces_table::state::{BettingRound, GameState, PlayerAction};
use common::{chips, Fixture, STAKES, TABLE_ID};

/// Checks or calls until the hand is settled; returns the streets dealt.
async fn check_down(fx: &Fixture) -> Vec<CircuitKind> {
    let mut computed = Vec::new();
    loop {
        match fx.orchestrator.step(TABLE_ID).await.unwrap() {
            Step::Idle => return computed,
            Step::AwaitingAction { .. } => {
                let table = fx.table().await;
                let seat = table.seats[table.turn_position as usize].unwrap();
                let action = if seat.bet_this_round < table.current_bet {
                    PlayerAction::Call
                } else {
                    PlayerAction::Check
                };
                fx.act(action).await;
            }
            Step::Computed { circuit } => computed.push(circuit),
            other => panic!("unexpected step {other:?}"),
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_preflop_fold_out_is_not_raked() {
    let fx = Fixture::dealt_heads_up().await;

    let table = fx.act(PlayerAction::Fold).await;
    assert_eq!(table.contender_count(), 1);
    let survivor = table.contenders().next().unwrap();
    let before = table.seats[survivor].unwrap().stack;
    let pot = table.pot;
    assert_eq!(pot, STAKES.small_blind + STAKES.big_blind);

    let outcome = fx.orchestrator.play_until_settled(TABLE_ID).await.unwrap();
    let showdown = outcome.showdown.unwrap();
    assert_eq!(showdown.rake, 0);
    assert_eq!(showdown.payouts[survivor], pot);
    assert_eq!(outcome.table.seats[survivor].unwrap().stack, before + pot);
    assert_eq!(fx.treasury_balance().await, 0);
}

#[tokio::test(start_paused = true)]
async fn test_fold_out_after_flop_pays_the_whole_pot() {
    let fx = Fixture::dealt_heads_up().await;
    fx.act(PlayerAction::Call).await;
    fx.act(PlayerAction::Check).await;
    let step = fx.orchestrator.step(TABLE_ID).await.unwrap();
    assert_eq!(
        step,
        Step::Computed {
            circuit: CircuitKind::RevealCommunityCards
        }
    );
    let hand = fx.hand(1).await;
    assert_eq!(hand.betting_round, BettingRound::Flop);
    assert!(hand.flop_seen());

    let table = fx.act(PlayerAction::Fold).await;
    assert_eq!(table.contender_count(), 1);
    let survivor = table.contenders().next().unwrap();
    let before = table.seats[survivor].unwrap().stack;
    let pot = table.pot;
    assert_eq!(pot, 2 * STAKES.big_blind);

    let outcome = fx.orchestrator.play_until_settled(TABLE_ID).await.unwrap();
    let showdown = outcome.showdown.unwrap();
    assert_eq!(showdown.rake, 0);
    assert_eq!(showdown.payouts[survivor], pot);
    assert_eq!(outcome.table.seats[survivor].unwrap().stack, before + pot);
    assert_eq!(outcome.table.game_state, GameState::AwaitingPlayers);
    assert_eq!(fx.hand(1).await.rake, 0);
    assert_eq!(fx.treasury_balance().await, 0);
    assert_eq!(fx.vault_balance().await, 2 * STAKES.buy_in);
}

#[tokio::test(start_paused = true)]
async fn test_contested_showdown_pays_rake_to_treasury() {
    let fx = Fixture::dealt_heads_up().await;

    let computed = check_down(&fx).await;
    assert_eq!(computed.last(), Some(&CircuitKind::EvaluateHandsAndPayout));

    let hand = fx.hand(1).await;
    assert!(hand.is_settled);
    let showdown = hand.showdown.unwrap();
    // 5% of the 4_000 pot, uncapped by default
    assert_eq!(showdown.rake, 200);
    assert_eq!(hand.rake, 200);
    assert_eq!(
        showdown.payouts.iter().sum::<u64>(),
        2 * STAKES.big_blind - 200
    );
    assert_eq!(fx.treasury_balance().await, 200);
    assert_eq!(fx.vault_balance().await, 2 * STAKES.buy_in - 200);
    assert_eq!(chips(&fx.table().await) + 200, 2 * STAKES.buy_in);
}

#[tokio::test(start_paused = true)]
async fn test_rake_is_capped_by_platform_config() {
    let fx = Fixture::dealt_heads_up().await;
    fx.orchestrator.update_rake_params(500, 150).await.unwrap();

    check_down(&fx).await;

    let showdown = fx.hand(1).await.showdown.unwrap();
    assert_eq!(showdown.rake, 150);
    assert_eq!(fx.treasury_balance().await, 150);
}
