//! Reducer for the canvas: drag selection, the approve-then-mint workflow,
//! plot loading and plot edits.

use super::actions::CanvasAction;
use super::environment::CanvasEnvironment;
use super::types::{AttemptId, CanvasState, Notice, Phase, ReservationAttempt};
use crate::calls::{validate_mint_text, Call};
use crate::error::ReservationError;
use crate::ledger::{decode_tokens, minted_token_id, with_timeout, LedgerError, LedgerResult, TxReceipt};
use crate::selection::SelectionOutcome;
use crate::types::{Plot, Rectangle, TokenId};
use plotgrid_core::{async_effect, effect::Effect, environment::Clock, reducer::Reducer};
use smallvec::{smallvec, SmallVec};
use std::sync::Arc;

type Effects = SmallVec<[Effect<CanvasAction>; 4]>;

/// Canvas reducer
///
/// At most one reservation attempt runs at a time. Ledger calls are issued
/// as effects and their results come back as actions tagged with the
/// attempt id; a result that does not match the current attempt and phase
/// is dropped.
#[derive(Clone, Debug)]
pub struct CanvasReducer<C: Clock> {
    _phantom: std::marker::PhantomData<C>,
}

impl<C: Clock> CanvasReducer<C> {
    /// Creates a new canvas reducer
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<C: Clock> Default for CanvasReducer<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> Reducer for CanvasReducer<C> {
    type State = CanvasState;
    type Action = CanvasAction;
    type Environment = CanvasEnvironment<C>;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        let engine = env.settings.selection_engine();

        match action {
            CanvasAction::PointerDown { cell } => {
                engine.begin_selection(&mut state.selection, &state.plots, cell);
                smallvec![Effect::None]
            },

            CanvasAction::PointerEnter { cell } => {
                engine.extend_selection(&mut state.selection, &state.plots, cell);
                smallvec![Effect::None]
            },

            CanvasAction::PointerUp => {
                match engine.end_selection(&mut state.selection, &state.plots) {
                    SelectionOutcome::Confirm(quote) => {
                        tracing::debug!(
                            rectangle = %quote.rectangle,
                            cells = quote.rectangle.cell_count(),
                            amount = %quote.amount,
                            "Selection ready for confirmation"
                        );
                    },
                    SelectionOutcome::Rejected(error) => reject_selection(state, error),
                    SelectionOutcome::Inactive => {},
                }
                smallvec![Effect::None]
            },

            CanvasAction::CancelSelection => {
                engine.cancel_selection(&mut state.selection);
                smallvec![Effect::None]
            },

            CanvasAction::Submit { media_ref, link_ref } => submit(state, env, media_ref, link_ref),

            CanvasAction::ApprovalConfirmed { attempt_id } => {
                let Some(attempt) = current(state, attempt_id, Phase::Approving) else {
                    return smallvec![Effect::None];
                };
                if let Err(error) = attempt.advance(Phase::Approved) {
                    fail_attempt(state, error);
                    return smallvec![Effect::None];
                }
                smallvec![prepare_mint(env, attempt_id)]
            },

            CanvasAction::ApprovalFailed { attempt_id, error } => {
                if current(state, attempt_id, Phase::Approving).is_some() {
                    let failure = match error {
                        LedgerError::Timeout(_) => ReservationError::TimedOut { phase: Phase::Approving },
                        other => ReservationError::ApprovalFailed { reason: other.to_string() },
                    };
                    fail_attempt(state, failure);
                }
                smallvec![Effect::None]
            },

            CanvasAction::MintReady { attempt_id, snapshot } => mint(state, env, attempt_id, snapshot),

            CanvasAction::MintConfirmed { attempt_id, token_id } => commit(state, env, attempt_id, token_id),

            CanvasAction::MintFailed { attempt_id, error } => {
                if current(state, attempt_id, Phase::Minting).is_some() {
                    let failure = match error {
                        LedgerError::Timeout(_) => ReservationError::TimedOut { phase: Phase::Minting },
                        other => ReservationError::MintFailed { reason: other.to_string() },
                    };
                    fail_attempt(state, failure);
                }
                smallvec![Effect::None]
            },

            CanvasAction::CancelAttempt => {
                if state.is_busy() {
                    fail_attempt(state, ReservationError::Cancelled);
                }
                smallvec![Effect::None]
            },

            CanvasAction::RefreshPlots => smallvec![load_plots(env)],

            CanvasAction::PlotsLoaded { plots } => {
                state.plots.replace_all(plots);
                tracing::info!(plots = state.plots.len(), "Plot index rebuilt");
                smallvec![Effect::None]
            },

            CanvasAction::PlotsLoadFailed { reason } => {
                tracing::warn!(%reason, "Loading plots failed");
                state.notice = Some(Notice::Failure(ReservationError::PlotsUnavailable { reason }));
                smallvec![Effect::None]
            },

            CanvasAction::LoadOwnedPlots => {
                let Some(owner) = env.settings.account else {
                    tracing::debug!("No connected account, skipping owned plots");
                    return smallvec![Effect::None];
                };
                let ledger = Arc::clone(&env.ledger);
                let timeout = env.settings.ledger_timeout;
                smallvec![async_effect! {
                    let loaded = with_timeout(timeout, ledger.tokens_by_owner(owner))
                        .await
                        .and_then(|records| decode_tokens(&records));
                    match loaded {
                        Ok(plots) => Some(CanvasAction::OwnedPlotsLoaded { plots }),
                        Err(error) => Some(CanvasAction::PlotsLoadFailed { reason: error.to_string() }),
                    }
                }]
            },

            CanvasAction::OwnedPlotsLoaded { plots } => {
                state.owned = plots.iter().map(|p| p.token_id.clone()).collect();
                for plot in plots {
                    let token_id = plot.token_id.clone();
                    if let Err(error) = state.plots.add(plot) {
                        tracing::warn!(%token_id, %error, "Owned plot conflicts with the index");
                    }
                }
                tracing::debug!(owned = state.owned.len(), "Owned plots loaded");
                smallvec![Effect::None]
            },

            CanvasAction::EditPlot { token_id, media_ref, link_ref } => {
                edit(state, env, token_id, &media_ref, &link_ref)
            },

            CanvasAction::EditConfirmed { token_id } => {
                if state.pending_edit.as_ref() != Some(&token_id) {
                    return smallvec![Effect::None];
                }
                state.pending_edit = None;
                tracing::info!(%token_id, "Plot updated");
                state.notice = Some(Notice::Edited { token_id });
                smallvec![load_plots(env)]
            },

            CanvasAction::EditFailed { token_id, reason } => {
                if state.pending_edit.as_ref() == Some(&token_id) {
                    state.pending_edit = None;
                }
                tracing::warn!(%token_id, %reason, "Plot update failed");
                state.notice = Some(Notice::Failure(ReservationError::EditFailed { token_id, reason }));
                smallvec![Effect::None]
            },

            CanvasAction::DismissNotice => {
                state.notice = None;
                smallvec![Effect::None]
            },
        }
    }
}

/// The current attempt, if it is `id` and waiting in `phase`
fn current(state: &mut CanvasState, id: AttemptId, phase: Phase) -> Option<&mut ReservationAttempt> {
    match state.attempt.as_mut() {
        Some(attempt) if attempt.awaits(id, phase) => Some(attempt),
        _ => {
            tracing::debug!(attempt_id = %id, expected = %phase, "Ignoring result for stale attempt");
            None
        },
    }
}

fn reject_selection(state: &mut CanvasState, error: ReservationError) {
    tracing::info!(reason = error.kind(), %error, "Selection rejected");
    metrics::counter!("canvas.selection.rejected").increment(1);
    state.selection.clear();
    state.notice = Some(Notice::Failure(error));
}

/// Clears the selection if it is still the attempt's rectangle
///
/// A selection drawn while the attempt was in flight is kept.
fn release_selection(state: &mut CanvasState, rectangle: Rectangle) {
    if state.selection.rectangle == Some(rectangle) {
        state.selection.clear();
    }
}

fn fail_attempt(state: &mut CanvasState, error: ReservationError) {
    let Some(attempt) = state.attempt.as_mut() else {
        return;
    };
    let phase = attempt.phase;
    let rectangle = attempt.rectangle;
    if !attempt.fail(error.clone()) {
        return;
    }
    tracing::warn!(
        attempt_id = %attempt.id,
        phase = phase.as_str(),
        reason = error.kind(),
        %error,
        "Reservation failed"
    );
    metrics::counter!("canvas.reservation.failed", "reason" => error.kind()).increment(1);
    release_selection(state, rectangle);
    state.notice = Some(Notice::Failure(error));
}

fn submit<C: Clock>(
    state: &mut CanvasState,
    env: &CanvasEnvironment<C>,
    media_ref: String,
    link_ref: String,
) -> Effects {
    if state.is_busy() {
        tracing::warn!(phase = state.phase().as_str(), "Submit while an attempt is in flight");
        state.notice = Some(Notice::Failure(ReservationError::AttemptInProgress));
        return smallvec![Effect::None];
    }

    let Some(quote) = state.selection.confirmed() else {
        state.notice = Some(Notice::Failure(ReservationError::NoSelection));
        return smallvec![Effect::None];
    };

    // Plots may have changed since the drag ended
    if state.plots.overlaps(&quote.rectangle) {
        reject_selection(state, ReservationError::OverlapRejected { rectangle: quote.rectangle });
        return smallvec![Effect::None];
    }

    // Unencodable text must not cost an approval
    if let Err(error) = validate_mint_text(&media_ref, &link_ref) {
        state.notice = Some(Notice::Failure(error));
        return smallvec![Effect::None];
    }

    let mut attempt = ReservationAttempt::new(quote, media_ref, link_ref, env.clock.now());
    if let Err(error) = attempt.advance(Phase::Approving) {
        state.notice = Some(Notice::Failure(error));
        return smallvec![Effect::None];
    }
    let attempt_id = attempt.id;

    tracing::info!(
        %attempt_id,
        rectangle = %quote.rectangle,
        cells = quote.rectangle.cell_count(),
        amount = %quote.amount,
        "Reservation submitted, requesting fee approval"
    );
    metrics::counter!("canvas.reservation.started").increment(1);
    state.attempt = Some(attempt);
    state.notice = None;

    let call = env.settings.calls.approval_call(env.settings.spender, quote.amount);
    smallvec![execute(env, vec![call], move |result| match result {
        Ok(_) => CanvasAction::ApprovalConfirmed { attempt_id },
        Err(error) => CanvasAction::ApprovalFailed { attempt_id, error },
    })]
}

/// Fetches a fresh snapshot (when enabled) ahead of the mint
fn prepare_mint<C: Clock>(env: &CanvasEnvironment<C>, attempt_id: AttemptId) -> Effect<CanvasAction> {
    if !env.settings.refresh_before_mint {
        return async_effect! { Some(CanvasAction::MintReady { attempt_id, snapshot: None }) };
    }

    let ledger = Arc::clone(&env.ledger);
    let timeout = env.settings.ledger_timeout;
    async_effect! {
        let snapshot = match with_timeout(timeout, ledger.all_tokens())
            .await
            .and_then(|records| decode_tokens(&records))
        {
            Ok(plots) => Some(plots),
            Err(error) => {
                tracing::warn!(%attempt_id, %error, "Snapshot before mint failed, using local plots");
                None
            },
        };
        Some(CanvasAction::MintReady { attempt_id, snapshot })
    }
}

fn mint<C: Clock>(
    state: &mut CanvasState,
    env: &CanvasEnvironment<C>,
    attempt_id: AttemptId,
    snapshot: Option<Vec<Plot>>,
) -> Effects {
    if current(state, attempt_id, Phase::Approved).is_none() {
        return smallvec![Effect::None];
    }

    if let Some(plots) = snapshot {
        state.plots.replace_all(plots);
    }

    let Some(attempt) = state.attempt.as_ref() else {
        return smallvec![Effect::None];
    };
    let rectangle = attempt.rectangle;
    if state.plots.overlaps(&rectangle) {
        // Approval already went through; the allowance stays granted
        fail_attempt(state, ReservationError::StaleOverlap { rectangle });
        return smallvec![Effect::None];
    }

    let call = match env.settings.calls.mint_call(&rectangle, &attempt.media_ref, &attempt.link_ref) {
        Ok(call) => call,
        Err(error) => {
            fail_attempt(state, error);
            return smallvec![Effect::None];
        },
    };

    let advanced = state.attempt.as_mut().map(|a| a.advance(Phase::Minting));
    if let Some(Err(error)) = advanced {
        fail_attempt(state, error);
        return smallvec![Effect::None];
    }
    tracing::info!(%attempt_id, %rectangle, "Fee approved, minting");

    smallvec![execute(env, vec![call], move |result| {
        match result.and_then(|receipt| minted_token_id(&receipt)) {
            Ok(token_id) => CanvasAction::MintConfirmed { attempt_id, token_id },
            Err(error) => CanvasAction::MintFailed { attempt_id, error },
        }
    })]
}

fn commit<C: Clock>(
    state: &mut CanvasState,
    env: &CanvasEnvironment<C>,
    attempt_id: AttemptId,
    token_id: TokenId,
) -> Effects {
    let Some(attempt) = current(state, attempt_id, Phase::Minting) else {
        return smallvec![Effect::None];
    };
    if let Err(error) = attempt.advance(Phase::Committed) {
        fail_attempt(state, error);
        return smallvec![Effect::None];
    }
    attempt.token_id = Some(token_id.clone());
    let plot = Plot::minted(
        token_id.clone(),
        attempt.rectangle,
        attempt.media_ref.clone(),
        attempt.link_ref.clone(),
    );

    let rectangle = attempt.rectangle;
    tracing::info!(%attempt_id, %token_id, cells = rectangle.cell_count(), "Plot minted");
    metrics::counter!("canvas.reservation.committed").increment(1);

    if env.settings.account.is_some() && !state.owned.contains(&token_id) {
        state.owned.push(token_id.clone());
    }
    release_selection(state, rectangle);
    state.notice = Some(Notice::Committed { token_id: token_id.clone() });

    match state.plots.add(plot) {
        Ok(_) => smallvec![Effect::None],
        Err(error) => {
            tracing::warn!(%token_id, %error, "Minted plot conflicts with the local index, reloading");
            smallvec![load_plots(env)]
        },
    }
}

fn edit<C: Clock>(
    state: &mut CanvasState,
    env: &CanvasEnvironment<C>,
    token_id: TokenId,
    media_ref: &str,
    link_ref: &str,
) -> Effects {
    if state.pending_edit.is_some() {
        state.notice = Some(Notice::Failure(ReservationError::AttemptInProgress));
        return smallvec![Effect::None];
    }
    if !state.plots.contains(&token_id) {
        let reason = "unknown plot".to_string();
        state.notice = Some(Notice::Failure(ReservationError::EditFailed { token_id, reason }));
        return smallvec![Effect::None];
    }

    let calls = match env.settings.calls.edit_calls(&token_id, media_ref, link_ref) {
        Ok(calls) if calls.is_empty() => return smallvec![Effect::None],
        Ok(calls) => calls,
        Err(error) => {
            state.notice = Some(Notice::Failure(error));
            return smallvec![Effect::None];
        },
    };

    tracing::info!(%token_id, calls = calls.len(), "Updating plot");
    state.pending_edit = Some(token_id.clone());
    smallvec![execute(env, calls, move |result| match result {
        Ok(_) => CanvasAction::EditConfirmed { token_id },
        Err(error) => CanvasAction::EditFailed { token_id, reason: error.to_string() },
    })]
}

fn load_plots<C: Clock>(env: &CanvasEnvironment<C>) -> Effect<CanvasAction> {
    let ledger = Arc::clone(&env.ledger);
    let timeout = env.settings.ledger_timeout;
    async_effect! {
        let loaded = with_timeout(timeout, ledger.all_tokens())
            .await
            .and_then(|records| decode_tokens(&records));
        match loaded {
            Ok(plots) => Some(CanvasAction::PlotsLoaded { plots }),
            Err(error) => Some(CanvasAction::PlotsLoadFailed { reason: error.to_string() }),
        }
    }
}

/// Submits `calls` as one transaction and maps the outcome to an action
fn execute<C, F>(env: &CanvasEnvironment<C>, calls: Vec<Call>, into_action: F) -> Effect<CanvasAction>
where
    C: Clock,
    F: FnOnce(LedgerResult<TxReceipt>) -> CanvasAction + Send + 'static,
{
    let ledger = Arc::clone(&env.ledger);
    let timeout = env.settings.ledger_timeout;
    let entrypoints: Vec<String> = calls.iter().map(|c| c.entrypoint.clone()).collect();
    tracing::debug!(?entrypoints, "Submitting transaction");
    async_effect! {
        let result = with_timeout(timeout, ledger.execute(calls)).await;
        Some(into_action(result))
    }
}
