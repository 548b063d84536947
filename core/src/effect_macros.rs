//! Declarative macros for ergonomic effect construction

/// Create an `Effect::Future` from an async block body
///
/// The body runs inside `async move` and must evaluate to `Option<Action>`.
///
/// # Example
///
/// ```rust,ignore
/// use plotgrid_core::async_effect;
///
/// let ledger = Arc::clone(&env.ledger);
/// async_effect! {
///     match ledger.all_tokens().await {
///         Ok(records) => Some(CanvasAction::PlotsLoaded { plots: decode(records) }),
///         Err(error) => Some(CanvasAction::PlotsLoadFailed { reason: error.to_string() }),
///     }
/// }
/// ```
#[macro_export]
macro_rules! async_effect {
    ($($body:tt)*) => {
        $crate::effect::Effect::Future(
            ::std::boxed::Box::pin(async move { $($body)* })
        )
    };
}
