//! Dependencies of the canvas reducer.

use crate::calls::CallBuilder;
use crate::felt::Felt;
use crate::ledger::LedgerClient;
use crate::pricing::{Amount, PricingPolicy};
use crate::selection::SelectionEngine;
use crate::types::GridBounds;
use plotgrid_core::environment::Clock;
use std::sync::Arc;
use std::time::Duration;

/// Static reservation settings, usually built from
/// [`CanvasConfig`](crate::config::CanvasConfig)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReservationSettings {
    /// Grid size
    pub bounds: GridBounds,
    /// Per-cell pricing
    pub pricing: PricingPolicy,
    /// Call payload builder
    pub calls: CallBuilder,
    /// Allowance spender (the canvas contract)
    pub spender: Felt,
    /// Connected account, for loading owned plots
    pub account: Option<Felt>,
    /// Bound on each ledger call; `None` waits indefinitely
    pub ledger_timeout: Option<Duration>,
    /// Fetch a fresh plot snapshot before building the mint call
    pub refresh_before_mint: bool,
}

impl ReservationSettings {
    /// Settings spending on behalf of the canvas contract, with no timeout
    /// and a refresh before each mint
    #[must_use]
    pub const fn new(bounds: GridBounds, unit_price: Amount, calls: CallBuilder) -> Self {
        Self {
            bounds,
            pricing: PricingPolicy::new(unit_price),
            spender: calls.canvas_contract(),
            calls,
            account: None,
            ledger_timeout: None,
            refresh_before_mint: true,
        }
    }

    /// Sets the connected account
    #[must_use]
    pub const fn with_account(mut self, account: Felt) -> Self {
        self.account = Some(account);
        self
    }

    /// Bounds every ledger call by `timeout`
    #[must_use]
    pub const fn with_ledger_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.ledger_timeout = timeout;
        self
    }

    /// Enables or disables the pre-mint snapshot
    #[must_use]
    pub const fn with_refresh_before_mint(mut self, refresh: bool) -> Self {
        self.refresh_before_mint = refresh;
        self
    }

    /// Selection engine priced by these settings
    #[must_use]
    pub const fn selection_engine(&self) -> SelectionEngine {
        SelectionEngine::new(self.pricing)
    }
}

/// Canvas environment
#[derive(Clone)]
pub struct CanvasEnvironment<C: Clock> {
    /// Ledger client
    pub ledger: Arc<dyn LedgerClient>,
    /// Clock for attempt timestamps
    pub clock: C,
    /// Reservation settings
    pub settings: ReservationSettings,
}

impl<C: Clock> CanvasEnvironment<C> {
    /// Creates a new environment
    #[must_use]
    pub fn new(ledger: Arc<dyn LedgerClient>, clock: C, settings: ReservationSettings) -> Self {
        Self { ledger, clock, settings }
    }
}
