//! Unit tests for CanvasReducer.
//!
//! Covers:
//! - Drag selection and overlap rejection
//! - Pricing of the current rectangle
//! - Approve-then-mint ordering and failure at either phase
//! - Stale overlap detection before the mint
//! - Cancellation and late results
//! - Timeouts, plot loading and plot edits

#![allow(clippy::unwrap_used, clippy::expect_used)] // Test code

use super::*;
use crate::calls::{CallBuilder, MintArgs};
use crate::error::ReservationError;
use crate::felt::Felt;
use crate::ledger::{InMemoryLedger, LedgerError};
use crate::plot_index::PlotIndex;
use crate::pricing::Amount;
use crate::types::{Cell, GridBounds, Plot, Rectangle, TokenId};
use plotgrid_core::{effect::Effect, reducer::Reducer};
use plotgrid_testing::{assertions, test_clock, FixedClock, ReducerTest};
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

const FEE_TOKEN: u64 = 0xfee;
const CANVAS: u64 = 0xca5;

/// 0.01 with 18 decimals
const CENT: u128 = 10_000_000_000_000_000;

type Env = CanvasEnvironment<FixedClock>;

fn call_builder() -> CallBuilder {
    CallBuilder::new(Felt::from_u64(FEE_TOKEN), Felt::from_u64(CANVAS))
}

fn settings() -> ReservationSettings {
    ReservationSettings::new(GridBounds::default(), Amount(CENT), call_builder())
}

fn ledger() -> InMemoryLedger {
    InMemoryLedger::new(
        GridBounds::default(),
        Felt::from_u64(FEE_TOKEN),
        Felt::from_u64(CANVAS),
        Amount(CENT),
    )
    .unwrap()
}

fn env_for(ledger: &InMemoryLedger, settings: ReservationSettings) -> Env {
    CanvasEnvironment::new(Arc::new(ledger.clone()), test_clock(), settings)
}

/// Canvas with one plot at the origin, 2x2
fn state_with_origin_plot() -> CanvasState {
    let plot = Plot::minted(
        TokenId::from(100),
        Rectangle::new(0, 0, 2, 2).unwrap(),
        "https://img".into(),
        "https://link".into(),
    );
    CanvasState::with_plots(PlotIndex::from_plots(GridBounds::default(), [plot]).unwrap())
}

fn run_effect(effect: Effect<CanvasAction>) -> Pin<Box<dyn Future<Output = Vec<CanvasAction>> + Send>> {
    Box::pin(async move {
        match effect {
            Effect::None => Vec::new(),
            Effect::Future(fut) => fut.await.into_iter().collect(),
            Effect::Parallel(effects) | Effect::Sequential(effects) => {
                let mut produced = Vec::new();
                for effect in effects {
                    produced.extend(run_effect(effect).await);
                }
                produced
            },
        }
    })
}

/// Reduces `action` and every action its effects produce, until quiet
async fn drive(state: &mut CanvasState, env: &Env, action: CanvasAction) -> Vec<CanvasAction> {
    let reducer = CanvasReducer::new();
    let mut produced = Vec::new();
    let mut queue = VecDeque::from([action]);
    while let Some(action) = queue.pop_front() {
        for effect in reducer.reduce(state, action, env) {
            for next in run_effect(effect).await {
                produced.push(next.clone());
                queue.push_back(next);
            }
        }
    }
    produced
}

/// Drags from `from` to `to` and releases
fn select(state: &mut CanvasState, env: &Env, from: Cell, to: Cell) {
    let reducer = CanvasReducer::new();
    for action in [
        CanvasAction::PointerDown { cell: from },
        CanvasAction::PointerEnter { cell: to },
        CanvasAction::PointerUp,
    ] {
        let effects = reducer.reduce(state, action, env);
        assertions::assert_no_effects(&effects);
    }
}

fn failure(state: &CanvasState) -> Option<&ReservationError> {
    state.attempt.as_ref().and_then(|a| a.failure.as_ref())
}

// ============================================================================
// Selection
// ============================================================================

#[test]
fn test_drag_prices_current_rectangle() {
    let env = env_for(&ledger(), settings());

    ReducerTest::new(CanvasReducer::new())
        .with_env(env)
        .given_state(state_with_origin_plot())
        .when_action(CanvasAction::PointerDown { cell: Cell::new(10, 10) })
        .when_action(CanvasAction::PointerEnter { cell: Cell::new(12, 12) })
        .when_action(CanvasAction::PointerEnter { cell: Cell::new(11, 12) })
        .then_state(|state| {
            assert!(state.selection.active);
            assert_eq!(state.selection.rectangle, Some(Rectangle::new(10, 10, 3, 2).unwrap()));
            assert_eq!(state.selection.price_quote, Some(Amount(6 * CENT)));
            assert_eq!(Amount(6 * CENT).format_units(18), "0.06");
        })
        .then_effects(assertions::assert_no_effects)
        .run();
}

#[test]
fn test_rebounding_to_anchor_gives_single_cell() {
    let env = env_for(&ledger(), settings());

    ReducerTest::new(CanvasReducer::new())
        .with_env(env)
        .given_state(CanvasState::new(GridBounds::default()).unwrap())
        .when_action(CanvasAction::PointerDown { cell: Cell::new(4, 9) })
        .when_action(CanvasAction::PointerEnter { cell: Cell::new(30, 1) })
        .when_action(CanvasAction::PointerEnter { cell: Cell::new(4, 9) })
        .then_state(|state| {
            assert_eq!(state.selection.rectangle, Some(Rectangle::single(Cell::new(4, 9))));
            assert_eq!(state.selection.price_quote, Some(Amount(CENT)));
        })
        .run();
}

#[tokio::test]
async fn test_overlapping_selection_is_rejected_without_ledger_call() {
    let ledger = ledger();
    let env = env_for(&ledger, settings());
    let mut state = state_with_origin_plot();

    // Dragging up-left from (2, 2) gives x=1, y=1, 2x2, which overlaps the plot at (1, 1)
    select(&mut state, &env, Cell::new(2, 2), Cell::new(1, 1));

    assert!(state.selection.is_empty());
    assert!(!state.selection.active);
    assert_eq!(
        state.notice,
        Some(Notice::Failure(ReservationError::OverlapRejected {
            rectangle: Rectangle::new(1, 1, 2, 2).unwrap()
        }))
    );

    // Submitting now has nothing to submit
    let produced = drive(&mut state, &env, CanvasAction::Submit {
        media_ref: "img".into(),
        link_ref: "link".into(),
    })
    .await;
    assert!(produced.is_empty());
    assert_eq!(state.notice, Some(Notice::Failure(ReservationError::NoSelection)));
    assert!(ledger.submitted().await.is_empty());
}

#[test]
fn test_drag_start_on_plot_is_ignored() {
    let env = env_for(&ledger(), settings());

    ReducerTest::new(CanvasReducer::new())
        .with_env(env)
        .given_state(state_with_origin_plot())
        .when_action(CanvasAction::PointerDown { cell: Cell::new(0, 1) })
        .when_action(CanvasAction::PointerEnter { cell: Cell::new(5, 5) })
        .when_action(CanvasAction::PointerUp)
        .then_state(|state| {
            assert!(state.selection.is_empty());
            assert!(state.notice.is_none());
        })
        .then_effects(assertions::assert_no_effects)
        .run();
}

// ============================================================================
// Two-phase commit
// ============================================================================

#[tokio::test]
async fn test_submit_approves_before_minting() {
    let ledger = ledger();
    let env = env_for(&ledger, settings());
    let reducer = CanvasReducer::new();
    let mut state = state_with_origin_plot();

    select(&mut state, &env, Cell::new(10, 20), Cell::new(11, 22));

    let effects = reducer.reduce(
        &mut state,
        CanvasAction::Submit { media_ref: "img".into(), link_ref: "link".into() },
        &env,
    );
    assertions::assert_effects_count(&effects, 1);
    assertions::assert_has_future_effect(&effects);
    assert_eq!(state.phase(), Phase::Approving);
    assert!(state.is_busy());

    // Only the approval has been sent so far
    let produced = run_effect(effects.into_iter().next().unwrap()).await;
    let attempt_id = state.attempt.as_ref().unwrap().id;
    assert_eq!(produced, vec![CanvasAction::ApprovalConfirmed { attempt_id }]);
    let submitted = ledger.submitted().await;
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].entrypoint, "approve");
    assert_eq!(submitted[0].contract_address, Felt::from_u64(FEE_TOKEN));
    assert_eq!(
        submitted[0].calldata,
        vec![Felt::from_u64(CANVAS), Felt::from_u128(6 * CENT), Felt::ZERO]
    );

    for action in produced {
        drive(&mut state, &env, action).await;
    }

    assert_eq!(ledger.entrypoints().await, vec!["approve", "mint"]);
    let attempt = state.attempt.as_ref().unwrap();
    assert_eq!(attempt.phase, Phase::Committed);
    let token_id = attempt.token_id.clone().unwrap();
    assert_eq!(state.notice, Some(Notice::Committed { token_id: token_id.clone() }));
    assert!(state.selection.is_empty());

    let plot = state.plots.get(&token_id).unwrap();
    assert_eq!(plot.rectangle().unwrap(), Rectangle::new(20, 10, 3, 2).unwrap());
    assert_eq!(plot.media_ref, "img");
    assert!(state.plots.occupies(Cell::new(11, 22)));
}

#[tokio::test]
async fn test_failed_approval_never_mints() {
    let ledger = ledger();
    ledger.fail_next("approve", "user rejected the request").await;
    let env = env_for(&ledger, settings());
    let mut state = state_with_origin_plot();

    select(&mut state, &env, Cell::new(10, 10), Cell::new(11, 12));
    drive(&mut state, &env, CanvasAction::Submit { media_ref: String::new(), link_ref: String::new() })
        .await;

    assert_eq!(ledger.entrypoints().await, vec!["approve"]);
    assert_eq!(state.phase(), Phase::Failed);
    assert!(matches!(failure(&state), Some(ReservationError::ApprovalFailed { .. })));
    assert!(state.selection.is_empty());
    assert!(!state.is_busy());
    assert_eq!(state.plots.len(), 1);
}

#[tokio::test]
async fn test_mint_arguments_are_x_y_width_height() {
    let ledger = ledger();
    let env = env_for(&ledger, settings());
    let mut state = CanvasState::new(GridBounds::default()).unwrap();

    // Row 5..=8, column 3..=4 → x=3, y=5, width=2, height=4
    select(&mut state, &env, Cell::new(5, 3), Cell::new(8, 4));
    drive(&mut state, &env, CanvasAction::Submit { media_ref: "m".into(), link_ref: "l".into() }).await;

    let submitted = ledger.submitted().await;
    let mint = submitted.iter().find(|c| c.entrypoint == "mint").unwrap();
    let head: Vec<u128> = mint.calldata[..4].iter().map(|f| f.to_u128().unwrap()).collect();
    assert_eq!(head, vec![3, 5, 2, 4]);
    assert_eq!(state.phase(), Phase::Committed);
}

#[tokio::test]
async fn test_failed_mint_keeps_approval() {
    let ledger = ledger();
    ledger.fail_next("mint", "execution reverted").await;
    let env = env_for(&ledger, settings());
    let mut state = CanvasState::new(GridBounds::default()).unwrap();

    select(&mut state, &env, Cell::new(0, 0), Cell::new(0, 0));
    drive(&mut state, &env, CanvasAction::Submit { media_ref: String::new(), link_ref: String::new() })
        .await;

    assert_eq!(ledger.entrypoints().await, vec!["approve", "mint"]);
    assert_eq!(
        failure(&state),
        Some(&ReservationError::MintFailed {
            reason: LedgerError::Rejected { reason: "execution reverted".into() }.to_string()
        })
    );
    assert_eq!(ledger.allowance(Felt::from_u64(CANVAS)).await, Amount(CENT));
    assert!(state.plots.is_empty());
}

#[tokio::test]
async fn test_submit_while_in_flight_is_refused() {
    let env = env_for(&ledger(), settings());
    let reducer = CanvasReducer::new();
    let mut state = CanvasState::new(GridBounds::default()).unwrap();

    select(&mut state, &env, Cell::new(0, 0), Cell::new(1, 1));
    let submit = CanvasAction::Submit { media_ref: String::new(), link_ref: String::new() };
    let _approval = reducer.reduce(&mut state, submit.clone(), &env);
    let first = state.attempt.as_ref().unwrap().id;

    // A new selection during the flight is allowed, a second submit is not
    select(&mut state, &env, Cell::new(50, 50), Cell::new(50, 50));
    let effects = reducer.reduce(&mut state, submit, &env);

    assertions::assert_no_effects(&effects);
    assert_eq!(state.notice, Some(Notice::Failure(ReservationError::AttemptInProgress)));
    assert_eq!(state.attempt.as_ref().unwrap().id, first);
    assert_eq!(state.phase(), Phase::Approving);
}

#[tokio::test]
async fn test_mint_uses_rectangle_captured_at_submit() {
    let ledger = ledger();
    let env = env_for(&ledger, settings());
    let reducer = CanvasReducer::new();
    let mut state = CanvasState::new(GridBounds::default()).unwrap();
    let submitted = Rectangle::new(2, 1, 3, 2).unwrap();
    let redrawn = Rectangle::new(40, 30, 2, 2).unwrap();

    select(&mut state, &env, Cell::new(1, 2), Cell::new(2, 4));
    assert_eq!(state.selection.rectangle, Some(submitted));
    let effects = reducer.reduce(
        &mut state,
        CanvasAction::Submit { media_ref: "ipfs://first".into(), link_ref: "https://first.example".into() },
        &env,
    );
    assert_eq!(state.phase(), Phase::Approving);

    // Drag and release a disjoint rectangle while the approval is pending
    select(&mut state, &env, Cell::new(30, 40), Cell::new(31, 41));
    assert_eq!(state.selection.confirmed().map(|q| q.rectangle), Some(redrawn));

    for effect in effects {
        for action in run_effect(effect).await {
            drive(&mut state, &env, action).await;
        }
    }
    assert_eq!(ledger.entrypoints().await, vec!["approve", "mint"]);
    assert_eq!(state.phase(), Phase::Committed);

    let calls = ledger.submitted().await;
    let mint = calls.iter().find(|c| c.entrypoint == "mint").unwrap();
    let args = MintArgs::decode(&mint.calldata).unwrap();
    assert_eq!(args.rectangle, submitted);
    assert_eq!(args.media_ref, "ipfs://first");
    assert_eq!(args.link_ref, "https://first.example");

    let token_id = state.attempt.as_ref().unwrap().token_id.clone().unwrap();
    assert_eq!(state.plots.get(&token_id).unwrap().rectangle().unwrap(), submitted);
    assert!(!state.plots.overlaps(&redrawn));
    assert!(redrawn.cells().all(|cell| !state.plots.occupies(cell)));

    // The redrawn rectangle is still selected for the next attempt
    assert_eq!(state.selection.confirmed().map(|q| q.rectangle), Some(redrawn));
    assert_eq!(state.selection.price_quote, Some(Amount(4 * CENT)));
}

#[tokio::test]
async fn test_failure_keeps_selection_drawn_during_flight() {
    let ledger = ledger();
    ledger.fail_next("approve", "user rejected the request").await;
    let env = env_for(&ledger, settings());
    let reducer = CanvasReducer::new();
    let mut state = CanvasState::new(GridBounds::default()).unwrap();
    let redrawn = Rectangle::new(50, 50, 3, 2).unwrap();

    select(&mut state, &env, Cell::new(0, 0), Cell::new(1, 1));
    let effects = reducer.reduce(
        &mut state,
        CanvasAction::Submit { media_ref: String::new(), link_ref: String::new() },
        &env,
    );
    select(&mut state, &env, Cell::new(50, 50), Cell::new(51, 52));

    for effect in effects {
        for action in run_effect(effect).await {
            drive(&mut state, &env, action).await;
        }
    }

    assert_eq!(ledger.entrypoints().await, vec!["approve"]);
    assert_eq!(state.phase(), Phase::Failed);
    assert!(matches!(failure(&state), Some(ReservationError::ApprovalFailed { .. })));
    assert!(matches!(state.notice, Some(Notice::Failure(ReservationError::ApprovalFailed { .. }))));
    assert_eq!(state.selection.confirmed().map(|q| q.rectangle), Some(redrawn));
    assert_eq!(state.selection.price_quote, Some(Amount(6 * CENT)));
}

#[tokio::test]
async fn test_unencodable_text_is_rejected_before_approval() {
    let ledger = ledger();
    let env = env_for(&ledger, settings());
    let mut state = CanvasState::new(GridBounds::default()).unwrap();

    select(&mut state, &env, Cell::new(0, 0), Cell::new(0, 0));
    let produced = drive(&mut state, &env, CanvasAction::Submit {
        media_ref: "https://example.com/ü.png".into(),
        link_ref: String::new(),
    })
    .await;

    assert!(produced.is_empty());
    assert!(state.attempt.is_none());
    assert!(matches!(
        state.notice,
        Some(Notice::Failure(ReservationError::InvalidText { field: "media", .. }))
    ));
    assert!(ledger.submitted().await.is_empty());
}

// ============================================================================
// Races, cancellation and timeouts
// ============================================================================

#[tokio::test]
async fn test_foreign_mint_after_approval_is_stale_overlap() {
    let ledger = ledger();
    let env = env_for(&ledger, settings());
    let reducer = CanvasReducer::new();
    let mut state = CanvasState::new(GridBounds::default()).unwrap();

    select(&mut state, &env, Cell::new(3, 3), Cell::new(5, 5));
    let effects = reducer.reduce(
        &mut state,
        CanvasAction::Submit { media_ref: String::new(), link_ref: String::new() },
        &env,
    );
    let produced = run_effect(effects.into_iter().next().unwrap()).await;

    // Someone else takes (4, 4) while our approval is confirming
    ledger.mint_foreign(Rectangle::new(4, 4, 1, 1).unwrap(), "", "").await.unwrap();

    for action in produced {
        drive(&mut state, &env, action).await;
    }

    let rectangle = Rectangle::new(3, 3, 3, 3).unwrap();
    assert_eq!(failure(&state), Some(&ReservationError::StaleOverlap { rectangle }));
    assert_eq!(ledger.entrypoints().await, vec!["approve"]);
    // The snapshot replaced the local index
    assert!(state.plots.occupies(Cell::new(4, 4)));
    // The approval is not rolled back
    assert_eq!(ledger.allowance(Felt::from_u64(CANVAS)).await, Amount(9 * CENT));
}

#[tokio::test]
async fn test_cancel_suppresses_late_approval() {
    let ledger = ledger();
    let env = env_for(&ledger, settings());
    let reducer = CanvasReducer::new();
    let mut state = CanvasState::new(GridBounds::default()).unwrap();

    select(&mut state, &env, Cell::new(0, 0), Cell::new(0, 1));
    let effects = reducer.reduce(
        &mut state,
        CanvasAction::Submit { media_ref: String::new(), link_ref: String::new() },
        &env,
    );

    let cancel = reducer.reduce(&mut state, CanvasAction::CancelAttempt, &env);
    assertions::assert_no_effects(&cancel);
    assert_eq!(failure(&state), Some(&ReservationError::Cancelled));

    // The approval still lands on the ledger, but the workflow ignores it
    let produced = run_effect(effects.into_iter().next().unwrap()).await;
    for action in produced {
        let effects = reducer.reduce(&mut state, action, &env);
        assertions::assert_no_effects(&effects);
    }
    assert_eq!(state.phase(), Phase::Failed);
    assert_eq!(ledger.entrypoints().await, vec!["approve"]);
}

#[tokio::test]
async fn test_results_for_unknown_attempts_are_ignored() {
    let env = env_for(&ledger(), settings());
    let mut state = CanvasState::new(GridBounds::default()).unwrap();
    let stranger = AttemptId::new();

    for action in [
        CanvasAction::ApprovalConfirmed { attempt_id: stranger },
        CanvasAction::MintReady { attempt_id: stranger, snapshot: Some(Vec::new()) },
        CanvasAction::MintConfirmed { attempt_id: stranger, token_id: TokenId::from(1) },
        CanvasAction::MintFailed {
            attempt_id: stranger,
            error: LedgerError::Transport { message: "down".into() },
        },
    ] {
        assert!(drive(&mut state, &env, action).await.is_empty());
    }
    assert!(state.attempt.is_none());
    assert!(state.plots.is_empty());
    assert!(state.notice.is_none());
}

#[tokio::test]
async fn test_slow_ledger_times_out_into_failed() {
    let ledger = ledger().with_latency(Duration::from_millis(500));
    let settings = settings().with_ledger_timeout(Some(Duration::from_millis(20)));
    let env = env_for(&ledger, settings);
    let mut state = CanvasState::new(GridBounds::default()).unwrap();

    select(&mut state, &env, Cell::new(0, 0), Cell::new(0, 0));
    drive(&mut state, &env, CanvasAction::Submit { media_ref: String::new(), link_ref: String::new() })
        .await;

    assert_eq!(failure(&state), Some(&ReservationError::TimedOut { phase: Phase::Approving }));
    assert!(!state.is_busy());
}

#[tokio::test]
async fn test_refresh_disabled_skips_snapshot() {
    let ledger = ledger();
    let env = env_for(&ledger, settings().with_refresh_before_mint(false));
    let mut state = CanvasState::new(GridBounds::default()).unwrap();

    select(&mut state, &env, Cell::new(7, 7), Cell::new(7, 8));
    drive(&mut state, &env, CanvasAction::Submit { media_ref: String::new(), link_ref: String::new() })
        .await;

    assert_eq!(state.phase(), Phase::Committed);
    assert!(ledger.reads().await.is_empty());
}

// ============================================================================
// Plot set and edits
// ============================================================================

#[tokio::test]
async fn test_refresh_replaces_index_with_ledger_plots() {
    let ledger = ledger();
    ledger.mint_foreign(Rectangle::new(10, 10, 4, 4).unwrap(), "a", "b").await.unwrap();
    let env = env_for(&ledger, settings());
    let mut state = state_with_origin_plot();

    let produced = drive(&mut state, &env, CanvasAction::RefreshPlots).await;

    assert!(matches!(produced.as_slice(), [CanvasAction::PlotsLoaded { plots }] if plots.len() == 1));
    assert_eq!(state.plots.len(), 1);
    assert!(!state.plots.occupies(Cell::new(0, 0)));
    assert!(state.plots.occupies(Cell::new(13, 13)));
}

#[tokio::test]
async fn test_owned_plots_need_an_account() {
    let ledger = ledger();
    ledger.mint_foreign(Rectangle::new(0, 0, 1, 1).unwrap(), "", "").await.unwrap();

    let anonymous = env_for(&ledger, settings());
    let mut state = CanvasState::new(GridBounds::default()).unwrap();
    assert!(drive(&mut state, &anonymous, CanvasAction::LoadOwnedPlots).await.is_empty());

    let env = env_for(&ledger, settings().with_account(ledger.account()));
    select(&mut state, &env, Cell::new(5, 5), Cell::new(5, 5));
    drive(&mut state, &env, CanvasAction::Submit { media_ref: String::new(), link_ref: String::new() })
        .await;
    let minted = state.attempt.as_ref().unwrap().token_id.clone().unwrap();

    state.owned.clear();
    drive(&mut state, &env, CanvasAction::LoadOwnedPlots).await;
    assert_eq!(state.owned, vec![minted]);
}

#[tokio::test]
async fn test_edit_updates_plot_after_refresh() {
    let ledger = ledger();
    let env = env_for(&ledger, settings().with_account(ledger.account()));
    let mut state = CanvasState::new(GridBounds::default()).unwrap();

    select(&mut state, &env, Cell::new(2, 2), Cell::new(3, 3));
    drive(&mut state, &env, CanvasAction::Submit { media_ref: "old".into(), link_ref: "old".into() })
        .await;
    let token_id = state.attempt.as_ref().unwrap().token_id.clone().unwrap();

    let new_media = "https://example.com/a/media/reference/longer/than/one/chunk.png";
    drive(&mut state, &env, CanvasAction::EditPlot {
        token_id: token_id.clone(),
        media_ref: new_media.into(),
        link_ref: String::new(),
    })
    .await;

    assert_eq!(state.notice, Some(Notice::Edited { token_id: token_id.clone() }));
    assert!(state.pending_edit.is_none());
    let plot = state.plots.get(&token_id).unwrap();
    assert_eq!(plot.media_ref, new_media);
    assert_eq!(plot.link_ref, "old");
}

#[tokio::test]
async fn test_edit_of_foreign_plot_fails() {
    let ledger = ledger();
    let foreign = ledger.mint_foreign(Rectangle::new(0, 0, 1, 1).unwrap(), "", "").await.unwrap();
    let env = env_for(&ledger, settings());
    let mut state = CanvasState::new(GridBounds::default()).unwrap();
    drive(&mut state, &env, CanvasAction::RefreshPlots).await;

    drive(&mut state, &env, CanvasAction::EditPlot {
        token_id: foreign.clone(),
        media_ref: "mine now".into(),
        link_ref: String::new(),
    })
    .await;

    assert!(matches!(
        &state.notice,
        Some(Notice::Failure(ReservationError::EditFailed { token_id, .. })) if *token_id == foreign
    ));
    assert!(state.pending_edit.is_none());
}

#[test]
fn test_dismiss_notice() {
    let env = env_for(&ledger(), settings());
    let mut state = CanvasState::new(GridBounds::default()).unwrap();
    state.notice = Some(Notice::Failure(ReservationError::Cancelled));

    ReducerTest::new(CanvasReducer::new())
        .with_env(env)
        .given_state(state)
        .when_action(CanvasAction::DismissNotice)
        .then_state(|state| assert!(state.notice.is_none()))
        .then_effects(assertions::assert_no_effects)
        .run();
}
