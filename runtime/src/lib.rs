//! # Plotgrid Runtime
//!
//! The Store runtime that coordinates reducer execution and effect handling.
//!
//! ## Core Components
//!
//! - **Store**: owns the state, runs the reducer, executes effects
//! - **Feedback loop**: actions produced by effects go back through the reducer
//! - **Effect handles**: await the whole cascade triggered by one action
//!
//! ## Example
//!
//! ```ignore
//! use plotgrid_runtime::Store;
//!
//! let store = Store::new(CanvasState::new(bounds)?, CanvasReducer::new(), env);
//!
//! store.send(CanvasAction::PointerDown { cell: Cell::new(4, 2) }).await?;
//! let rect = store.state(|s| s.selection.rectangle).await;
//! ```

use futures::future::{join_all, BoxFuture};
use plotgrid_core::effect::Effect;
use plotgrid_core::reducer::Reducer;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch, RwLock};

/// Prometheus metrics for observability
pub mod metrics;

/// Error types for the Store runtime
pub mod error {
    use thiserror::Error;

    /// Errors that can occur during Store operations
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum StoreError {
        /// Store is shutting down and not accepting new actions
        #[error("Store is shutting down")]
        ShutdownInProgress,

        /// Timeout waiting for a matching action
        ///
        /// Returned by `send_and_wait_for` when the timeout expires before
        /// a matching action is observed.
        #[error("Timeout waiting for action")]
        Timeout,

        /// Action broadcast channel closed
        #[error("Action broadcast channel closed")]
        ChannelClosed,
    }
}

pub use error::StoreError;

/// Default capacity of the action broadcast channel
const DEFAULT_BROADCAST_CAPACITY: usize = 64;

/// Handle for tracking effect completion
///
/// Returned by [`Store::send()`]. Tracking is cascading: actions fed back by
/// effects are reduced under the same handle, so [`EffectHandle::wait`]
/// returns only once the entire chain started by the original action has
/// settled (for the reservation workflow: approval, snapshot, mint).
#[derive(Clone)]
pub struct EffectHandle {
    effects: Arc<AtomicUsize>,
    completion: watch::Receiver<()>,
}

impl EffectHandle {
    fn new() -> (Self, EffectTracking) {
        let counter = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = watch::channel(());

        let handle = Self {
            effects: Arc::clone(&counter),
            completion: rx,
        };
        let tracking = EffectTracking {
            counter,
            notifier: Arc::new(tx),
        };

        (handle, tracking)
    }

    /// Create a handle that's already complete
    #[must_use]
    pub fn completed() -> Self {
        let (handle, _tracking) = Self::new();
        handle
    }

    /// Number of effects still running under this handle
    #[must_use]
    pub fn pending(&self) -> usize {
        self.effects.load(Ordering::SeqCst)
    }

    /// Wait for all effects (and the effects of their feedback actions) to complete
    pub async fn wait(&mut self) {
        while self.effects.load(Ordering::SeqCst) > 0 {
            if self.completion.changed().await.is_err() {
                break;
            }
        }
    }

    /// Wait for all effects to complete with a timeout
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Timeout`] if the timeout expires first.
    pub async fn wait_with_timeout(&mut self, timeout: Duration) -> Result<(), StoreError> {
        tokio::time::timeout(timeout, self.wait())
            .await
            .map_err(|_| StoreError::Timeout)
    }
}

impl std::fmt::Debug for EffectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectHandle")
            .field("pending_effects", &self.pending())
            .finish_non_exhaustive()
    }
}

/// Internal: tracking context carried through effect execution
#[derive(Clone)]
struct EffectTracking {
    counter: Arc<AtomicUsize>,
    notifier: Arc<watch::Sender<()>>,
}

impl EffectTracking {
    fn increment(&self) {
        self.counter.fetch_add(1, Ordering::SeqCst);
    }

    fn decrement(&self) {
        if self.counter.fetch_sub(1, Ordering::SeqCst) == 1 {
            // Counter reached zero, notify waiters
            let _ = self.notifier.send(());
        }
    }
}

/// Internal: RAII guard that decrements the effect counter on drop
///
/// Keeps the counter honest even if an effect task panics.
struct DecrementGuard(EffectTracking);

impl Drop for DecrementGuard {
    fn drop(&mut self) {
        self.0.decrement();
    }
}

/// Store module - the runtime for reducers
pub mod store {
    use super::{
        broadcast, join_all, Arc, AtomicBool, BoxFuture, DecrementGuard, Duration, Effect,
        EffectHandle, EffectTracking, Ordering, Reducer, RwLock, StoreError,
        DEFAULT_BROADCAST_CAPACITY,
    };

    /// The Store - runtime coordinator for a reducer
    ///
    /// The Store manages:
    /// 1. State (behind `RwLock`; every reduce takes the write lock, so actions
    ///    are applied one at a time)
    /// 2. Reducer (business logic)
    /// 3. Environment (injected dependencies)
    /// 4. Effect execution (with feedback loop)
    ///
    /// Every action produced by an effect is broadcast to subscribers *after*
    /// it has been reduced, so an observer that sees an action can read the
    /// state it produced.
    pub struct Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        state: Arc<RwLock<S>>,
        reducer: Arc<R>,
        environment: Arc<E>,
        shutdown: Arc<AtomicBool>,
        action_broadcast: broadcast::Sender<A>,
    }

    impl<S, A, E, R> Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
        A: Send + Clone + 'static,
        S: Send + Sync + 'static,
        E: Send + Sync + 'static,
    {
        /// Create a new store with initial state, reducer, and environment
        #[must_use]
        pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
            Self::with_broadcast_capacity(initial_state, reducer, environment, DEFAULT_BROADCAST_CAPACITY)
        }

        /// Create a new store with a custom action broadcast capacity
        #[must_use]
        pub fn with_broadcast_capacity(
            initial_state: S,
            reducer: R,
            environment: E,
            capacity: usize,
        ) -> Self {
            let (action_broadcast, _) = broadcast::channel(capacity.max(1));

            Self {
                state: Arc::new(RwLock::new(initial_state)),
                reducer: Arc::new(reducer),
                environment: Arc::new(environment),
                shutdown: Arc::new(AtomicBool::new(false)),
                action_broadcast,
            }
        }

        /// Send an action to the store
        ///
        /// Runs the reducer synchronously under the write lock, then spawns
        /// the returned effects. The handle resolves once the whole cascade
        /// of effects has settled.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
        #[tracing::instrument(skip(self, action), name = "store_send")]
        pub async fn send(&self, action: A) -> Result<EffectHandle, StoreError> {
            if self.shutdown.load(Ordering::SeqCst) {
                tracing::warn!("Rejecting action, store is shutting down");
                return Err(StoreError::ShutdownInProgress);
            }

            let (handle, tracking) = EffectHandle::new();
            self.dispatch(action, &tracking).await;
            Ok(handle)
        }

        /// Send an action and wait for a matching action produced by effects
        ///
        /// Subscribes before sending, so a result produced immediately is not
        /// missed. The matching action has already been reduced when it is
        /// returned.
        ///
        /// # Errors
        ///
        /// - [`StoreError::Timeout`]: no matching action before the timeout
        /// - [`StoreError::ChannelClosed`]: the broadcast channel closed
        /// - [`StoreError::ShutdownInProgress`]: the store is shutting down
        pub async fn send_and_wait_for<F>(
            &self,
            action: A,
            predicate: F,
            timeout: Duration,
        ) -> Result<A, StoreError>
        where
            F: Fn(&A) -> bool,
        {
            let mut rx = self.action_broadcast.subscribe();
            self.send(action).await?;

            let wait = async {
                loop {
                    match rx.recv().await {
                        Ok(action) if predicate(&action) => return Ok(action),
                        Ok(_) => {},
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "Action observer lagged, continuing");
                        },
                        Err(broadcast::error::RecvError::Closed) => {
                            return Err(StoreError::ChannelClosed);
                        },
                    }
                }
            };

            tokio::time::timeout(timeout, wait)
                .await
                .map_err(|_| StoreError::Timeout)?
        }

        /// Subscribe to actions produced by effects
        #[must_use]
        pub fn subscribe_actions(&self) -> broadcast::Receiver<A> {
            self.action_broadcast.subscribe()
        }

        /// Read the current state through a closure
        pub async fn state<F, T>(&self, f: F) -> T
        where
            F: FnOnce(&S) -> T,
        {
            let state = self.state.read().await;
            f(&*state)
        }

        /// Stop accepting new actions
        ///
        /// In-flight effects keep running and their feedback actions are
        /// still reduced; only external `send` calls are refused.
        pub fn shutdown(&self) {
            tracing::info!("Store shutdown requested");
            self.shutdown.store(true, Ordering::SeqCst);
        }

        async fn dispatch(&self, action: A, tracking: &EffectTracking) {
            let effects = {
                let mut state = self.state.write().await;
                self.reducer.reduce(&mut state, action, &self.environment)
            };
            metrics::counter!("store.actions.processed").increment(1);

            for effect in effects {
                self.execute_effect(effect, tracking.clone());
            }
        }

        async fn feedback(&self, action: A, tracking: &EffectTracking) {
            let observed = action.clone();
            self.dispatch(action, tracking).await;
            // No subscribers is fine
            let _ = self.action_broadcast.send(observed);
        }

        fn execute_effect(&self, effect: Effect<A>, tracking: EffectTracking) {
            if effect.is_none() {
                tracing::trace!("Skipping no-op effect");
                metrics::counter!("store.effects.executed", "type" => "none").increment(1);
                return;
            }

            tracking.increment();
            let store = self.clone();
            tokio::spawn(async move {
                let _guard = DecrementGuard(tracking.clone());
                store.run_effect(effect, tracking).await;
            });
        }

        fn run_effect(&self, effect: Effect<A>, tracking: EffectTracking) -> BoxFuture<'static, ()> {
            let store = self.clone();
            Box::pin(async move {
                match effect {
                    Effect::None => {},
                    Effect::Future(fut) => {
                        metrics::counter!("store.effects.executed", "type" => "future").increment(1);
                        if let Some(action) = fut.await {
                            tracing::trace!("Effect::Future produced an action, feeding back");
                            store.feedback(action, &tracking).await;
                        }
                    },
                    Effect::Parallel(effects) => {
                        metrics::counter!("store.effects.executed", "type" => "parallel").increment(1);
                        join_all(effects.into_iter().map(|e| store.run_effect(e, tracking.clone()))).await;
                    },
                    Effect::Sequential(effects) => {
                        metrics::counter!("store.effects.executed", "type" => "sequential").increment(1);
                        for e in effects {
                            store.run_effect(e, tracking.clone()).await;
                        }
                    },
                }
            })
        }
    }

    impl<S, A, E, R> Clone for Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        fn clone(&self) -> Self {
            Self {
                state: Arc::clone(&self.state),
                reducer: Arc::clone(&self.reducer),
                environment: Arc::clone(&self.environment),
                shutdown: Arc::clone(&self.shutdown),
                action_broadcast: self.action_broadcast.clone(),
            }
        }
    }
}

pub use store::Store;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use plotgrid_core::{async_effect, smallvec, SmallVec};

    #[derive(Debug, Clone, Default)]
    struct Ledgerish {
        steps: Vec<&'static str>,
    }

    #[derive(Debug, Clone, PartialEq)]
    enum StepAction {
        Start,
        First,
        Second,
        Both,
        Noop,
    }

    struct StepReducer;

    impl Reducer for StepReducer {
        type State = Ledgerish;
        type Action = StepAction;
        type Environment = ();

        fn reduce(
            &self,
            state: &mut Ledgerish,
            action: StepAction,
            _env: &(),
        ) -> SmallVec<[Effect<StepAction>; 4]> {
            match action {
                StepAction::Start => {
                    state.steps.push("start");
                    smallvec![async_effect! {
                        tokio::time::sleep(Duration::from_millis(5)).await;
                        Some(StepAction::First)
                    }]
                },
                StepAction::First => {
                    state.steps.push("first");
                    smallvec![async_effect! { Some(StepAction::Second) }]
                },
                StepAction::Second => {
                    state.steps.push("second");
                    smallvec![Effect::None]
                },
                StepAction::Both => smallvec![Effect::chain(vec![
                    async_effect! { Some(StepAction::Second) },
                    async_effect! { Some(StepAction::Noop) },
                ])],
                StepAction::Noop => {
                    state.steps.push("noop");
                    smallvec![Effect::None]
                },
            }
        }
    }

    #[tokio::test]
    async fn test_handle_waits_for_whole_cascade() {
        let store = Store::new(Ledgerish::default(), StepReducer, ());

        let mut handle = store.send(StepAction::Start).await.unwrap();
        handle.wait_with_timeout(Duration::from_secs(2)).await.unwrap();

        let steps = store.state(|s| s.steps.clone()).await;
        assert_eq!(steps, vec!["start", "first", "second"]);
        assert_eq!(handle.pending(), 0);
    }

    #[tokio::test]
    async fn test_sequential_effects_keep_order() {
        let store = Store::new(Ledgerish::default(), StepReducer, ());

        let mut handle = store.send(StepAction::Both).await.unwrap();
        handle.wait().await;

        let steps = store.state(|s| s.steps.clone()).await;
        assert_eq!(steps, vec!["second", "noop"]);
    }

    #[tokio::test]
    async fn test_send_and_wait_for_sees_reduced_state() {
        let store = Store::new(Ledgerish::default(), StepReducer, ());

        let action = store
            .send_and_wait_for(StepAction::Start, |a| *a == StepAction::Second, Duration::from_secs(2))
            .await
            .unwrap();

        assert_eq!(action, StepAction::Second);
        let steps = store.state(|s| s.steps.len()).await;
        assert_eq!(steps, 3);
    }

    #[tokio::test]
    async fn test_send_and_wait_for_times_out() {
        let store = Store::new(Ledgerish::default(), StepReducer, ());

        let result = store
            .send_and_wait_for(StepAction::Noop, |a| *a == StepAction::Second, Duration::from_millis(20))
            .await;

        assert_eq!(result, Err(StoreError::Timeout));
    }

    #[tokio::test]
    async fn test_shutdown_rejects_new_actions() {
        let store = Store::new(Ledgerish::default(), StepReducer, ());
        store.shutdown();

        let result = store.send(StepAction::Noop).await;
        assert!(matches!(result, Err(StoreError::ShutdownInProgress)));
    }

    #[tokio::test]
    async fn test_completed_handle_does_not_block() {
        let mut handle = EffectHandle::completed();
        handle.wait_with_timeout(Duration::from_millis(10)).await.unwrap();
    }
}
