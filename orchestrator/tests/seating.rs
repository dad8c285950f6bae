mod common;

use aces_orchestrator::Error;
use aces_table::state::{GameState, MAX_PLAYERS};
use common::{Harness, FUNDING, STAKES};

#[tokio::test(start_paused = true)]
async fn test_creator_takes_seat_zero() {
    let harness = Harness::with_table(1).await;
    let table = harness.table().await;
    assert_eq!(table.seats[0].unwrap().player, harness.players[0]);
    assert_eq!(table.seats[0].unwrap().stack, STAKES.buy_in);
    assert_eq!(table.player_count, 1);
    assert_eq!(table.min_buy_in, 20 * STAKES.big_blind);
    assert_eq!(table.game_state, GameState::AwaitingPlayers);
    assert_eq!(harness.tokens(&harness.vault()).await, STAKES.buy_in);
    assert_eq!(
        harness.tokens(&harness.wallet(0)).await,
        FUNDING - STAKES.buy_in
    );
}

#[tokio::test(start_paused = true)]
async fn test_full_table_refuses_another_player() {
    let harness = Harness::with_table(MAX_PLAYERS).await;
    let vault_before = harness.tokens(&harness.vault()).await;
    assert_eq!(vault_before, MAX_PLAYERS as u64 * STAKES.buy_in);

    let err = harness
        .orchestrator
        .join_table(harness.players[6], STAKES.table_id, 3, STAKES.buy_in)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::SeatUnavailable {
            table_id: 1,
            seat_index: 3
        }
    ));

    assert_eq!(harness.tokens(&harness.vault()).await, vault_before);
    assert_eq!(harness.tokens(&harness.wallet(6)).await, FUNDING);
    let table = harness.table().await;
    assert_eq!(table.player_count as usize, MAX_PLAYERS);
    assert_eq!(table.seats[3].unwrap().player, harness.players[3]);
}

#[tokio::test(start_paused = true)]
async fn test_short_buy_in_is_refused() {
    let harness = Harness::with_table(1).await;

    let err = harness
        .orchestrator
        .join_table(harness.players[1], STAKES.table_id, 1, STAKES.buy_in - 1)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::InsufficientBuyIn {
            table_id: 1,
            buy_in: 39_999
        }
    ));
    assert!(harness.table().await.seats[1].is_none());
    assert_eq!(harness.tokens(&harness.wallet(1)).await, FUNDING);
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_table_is_refused() {
    let harness = Harness::with_table(1).await;

    let err = harness
        .orchestrator
        .create_table(harness.players[1], harness.mint, STAKES)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::AlreadyExists { what: "table", .. }));

    let table = harness.table().await;
    assert_eq!(table.creator, harness.players[0]);
    assert_eq!(harness.tokens(&harness.wallet(1)).await, FUNDING);
    assert_eq!(harness.localnet.executed("create_table").await, 1);
}

#[tokio::test(start_paused = true)]
async fn test_leaving_cashes_out_the_stack() {
    let harness = Harness::with_table(2).await;

    let table = harness
        .orchestrator
        .leave_table(harness.players[1], STAKES.table_id)
        .await
        .unwrap();
    assert!(table.seats[1].is_none());
    assert_eq!(table.player_count, 1);
    assert_eq!(harness.tokens(&harness.wallet(1)).await, FUNDING);
    assert_eq!(harness.tokens(&harness.vault()).await, STAKES.buy_in);

    // The seat can be taken again.
    let table = harness
        .orchestrator
        .join_table(harness.players[2], STAKES.table_id, 1, STAKES.buy_in)
        .await
        .unwrap();
    assert_eq!(table.seats[1].unwrap().player, harness.players[2]);
}
