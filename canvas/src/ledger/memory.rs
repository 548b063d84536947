//! In-process ledger for tests and the demo.

use super::{LedgerClient, LedgerError, LedgerFuture, LedgerResult, RawTokenRecord, TxReceipt};
use crate::calls::{decode_text_update, entrypoints, Call, MintArgs};
use crate::error::GridError;
use crate::felt::Felt;
use crate::plot_index::PlotIndex;
use crate::pricing::{price, Amount};
use crate::types::{GridBounds, Plot, Rectangle, TokenId};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Ledger state; cloned per transaction so a failing call leaves it untouched
#[derive(Clone, Debug)]
struct LedgerBook {
    plots: PlotIndex,
    owners: HashMap<TokenId, Felt>,
    /// Allowance granted by the account, per spender
    allowances: HashMap<Felt, Amount>,
    next_token: u128,
}

#[derive(Debug, Default)]
struct Journal {
    submitted: Vec<Call>,
    reads: Vec<&'static str>,
    scripted_failures: Vec<(String, String)>,
    transactions: u64,
}

#[derive(Debug)]
struct Inner {
    book: LedgerBook,
    journal: Journal,
}

/// Scriptable in-memory ledger
///
/// Behaves like the canvas and fee token contracts for a single connected
/// account:
/// - `approve` sets the account's allowance for a spender
/// - `mint` checks bounds and overlap, spends `cells * unit_price` of the
///   canvas contract's allowance and returns the new token id
/// - `setTokenImg`/`setTokenLink` require the caller to own the plot
///
/// Every submitted call is journaled in order, including calls of rejected
/// transactions. Failures can be scripted per entry point with
/// [`InMemoryLedger::fail_next`].
#[derive(Clone, Debug)]
pub struct InMemoryLedger {
    inner: Arc<Mutex<Inner>>,
    account: Felt,
    fee_token: Felt,
    canvas_contract: Felt,
    unit_price: Amount,
    latency: Duration,
}

impl InMemoryLedger {
    /// Empty ledger over `bounds`
    ///
    /// # Errors
    ///
    /// Returns a [`GridError`] when the grid is too large to index.
    pub fn new(
        bounds: GridBounds,
        fee_token: Felt,
        canvas_contract: Felt,
        unit_price: Amount,
    ) -> Result<Self, GridError> {
        Ok(Self {
            inner: Arc::new(Mutex::new(Inner {
                book: LedgerBook {
                    plots: PlotIndex::new(bounds)?,
                    owners: HashMap::new(),
                    allowances: HashMap::new(),
                    next_token: 1,
                },
                journal: Journal::default(),
            })),
            account: Felt::from_u64(0xacc),
            fee_token,
            canvas_contract,
            unit_price,
            latency: Duration::ZERO,
        })
    }

    /// Sets the connected account
    #[must_use]
    pub const fn with_account(mut self, account: Felt) -> Self {
        self.account = account;
        self
    }

    /// Delays every operation by `latency`
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Connected account
    #[must_use]
    pub const fn account(&self) -> Felt {
        self.account
    }

    /// Makes the next transaction containing `entrypoint` fail with `reason`
    pub async fn fail_next(&self, entrypoint: &str, reason: &str) {
        let mut inner = self.inner.lock().await;
        inner
            .journal
            .scripted_failures
            .push((entrypoint.to_string(), reason.to_string()));
    }

    /// Mints a plot for another account, without fees
    ///
    /// Simulates a competing mint landing between a selection and its submit.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Rejected`] if the rectangle is taken or off-grid.
    pub async fn mint_foreign(&self, rect: Rectangle, media_ref: &str, link_ref: &str) -> LedgerResult<TokenId> {
        let mut inner = self.inner.lock().await;
        let book = &mut inner.book;
        let token_id = TokenId::from(book.next_token);
        let plot = Plot::minted(token_id.clone(), rect, media_ref.to_string(), link_ref.to_string());
        book.plots
            .add(plot)
            .map_err(|e| LedgerError::Rejected { reason: e.to_string() })?;
        book.owners.insert(token_id.clone(), Felt::from_u64(0xf0e));
        book.next_token += 1;
        tracing::debug!(%token_id, %rect, "Foreign plot minted");
        Ok(token_id)
    }

    /// Every call submitted so far, in order
    pub async fn submitted(&self) -> Vec<Call> {
        self.inner.lock().await.journal.submitted.clone()
    }

    /// Entry points of every submitted call, in order
    pub async fn entrypoints(&self) -> Vec<String> {
        let inner = self.inner.lock().await;
        inner.journal.submitted.iter().map(|c| c.entrypoint.clone()).collect()
    }

    /// Read entry points invoked so far, in order
    pub async fn reads(&self) -> Vec<&'static str> {
        self.inner.lock().await.journal.reads.clone()
    }

    /// Remaining allowance of `spender`
    pub async fn allowance(&self, spender: Felt) -> Amount {
        let inner = self.inner.lock().await;
        inner.book.allowances.get(&spender).copied().unwrap_or_default()
    }

    /// Plots currently on the ledger
    pub async fn plots(&self) -> Vec<Plot> {
        self.inner.lock().await.book.plots.all().to_vec()
    }

    async fn execute_now(&self, calls: Vec<Call>) -> LedgerResult<TxReceipt> {
        let mut inner = self.inner.lock().await;
        inner.journal.submitted.extend(calls.iter().cloned());
        inner.journal.transactions += 1;
        let transaction_hash = Felt::from_u64(inner.journal.transactions);

        let scripted = inner
            .journal
            .scripted_failures
            .iter()
            .position(|(entrypoint, _)| calls.iter().any(|c| &c.entrypoint == entrypoint));
        if let Some(pos) = scripted {
            let (entrypoint, reason) = inner.journal.scripted_failures.remove(pos);
            tracing::debug!(%entrypoint, %reason, "Scripted ledger failure");
            return Err(LedgerError::Rejected { reason });
        }

        let mut book = inner.book.clone();
        let mut returned = Vec::new();
        for call in &calls {
            returned = self.apply(&mut book, call)?;
        }
        inner.book = book;

        Ok(TxReceipt { transaction_hash, returned })
    }

    fn apply(&self, book: &mut LedgerBook, call: &Call) -> LedgerResult<Vec<Felt>> {
        let reject = |reason: String| LedgerError::Rejected { reason };

        match call.entrypoint.as_str() {
            entrypoints::APPROVE if call.contract_address == self.fee_token => {
                let [spender, low, _high] = call.calldata.as_slice() else {
                    return Err(reject("approve expects (spender, low, high)".into()));
                };
                let amount = Amount(low.to_u128()?);
                book.allowances.insert(*spender, amount);
                Ok(vec![Felt::from_u64(1)])
            },
            entrypoints::MINT if call.contract_address == self.canvas_contract => {
                let args = MintArgs::decode(&call.calldata)?;
                let cost = price(args.rectangle.cell_count(), self.unit_price)
                    .map_err(|e| reject(e.to_string()))?;
                let allowance = book.allowances.get(&self.canvas_contract).copied().unwrap_or_default();
                let remaining = allowance
                    .checked_sub(cost)
                    .ok_or_else(|| reject(format!("insufficient allowance: {allowance} < {cost}")))?;

                let token_low = book.next_token;
                let token_id = TokenId::from(token_low);
                let plot = Plot::minted(token_id.clone(), args.rectangle, args.media_ref, args.link_ref);
                book.plots.add(plot).map_err(|e| reject(e.to_string()))?;
                book.owners.insert(token_id, self.account);
                book.allowances.insert(self.canvas_contract, remaining);
                book.next_token += 1;
                Ok(vec![Felt::from_u128(token_low), Felt::ZERO])
            },
            entrypoints::SET_TOKEN_IMG | entrypoints::SET_TOKEN_LINK
                if call.contract_address == self.canvas_contract =>
            {
                let (token_id, text) = decode_text_update(&call.calldata)?;
                if book.owners.get(&token_id) != Some(&self.account) {
                    return Err(reject(format!("caller does not own token {token_id}")));
                }
                let Some(current) = book.plots.get(&token_id).cloned() else {
                    return Err(reject(format!("unknown token {token_id}")));
                };
                let updated = if call.entrypoint == entrypoints::SET_TOKEN_IMG {
                    Plot { media_ref: text, ..current }
                } else {
                    Plot { link_ref: text, ..current }
                };
                let rebuilt = book
                    .plots
                    .all()
                    .iter()
                    .map(|p| if p.token_id == token_id { updated.clone() } else { p.clone() })
                    .collect::<Vec<_>>();
                book.plots.replace_all(rebuilt);
                Ok(Vec::new())
            },
            other => Err(reject(format!(
                "no entry point {other} on {}",
                call.contract_address
            ))),
        }
    }

    async fn read(&self, entrypoint: &'static str, owner: Option<Felt>) -> LedgerResult<Vec<RawTokenRecord>> {
        let mut inner = self.inner.lock().await;
        inner.journal.reads.push(entrypoint);
        let book = &inner.book;
        book.plots
            .all()
            .iter()
            .filter(|plot| owner.is_none_or(|o| book.owners.get(&plot.token_id) == Some(&o)))
            .map(|plot| RawTokenRecord::from_plot(plot).map_err(LedgerError::from))
            .collect()
    }

    async fn pause(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

impl LedgerClient for InMemoryLedger {
    fn execute(&self, calls: Vec<Call>) -> LedgerFuture<TxReceipt> {
        let ledger = self.clone();
        Box::pin(async move {
            ledger.pause().await;
            let entrypoints: Vec<_> = calls.iter().map(|c| c.entrypoint.clone()).collect();
            let result = ledger.execute_now(calls).await;
            match &result {
                Ok(receipt) => tracing::debug!(?entrypoints, tx = %receipt.transaction_hash, "Transaction accepted"),
                Err(error) => tracing::debug!(?entrypoints, %error, "Transaction rejected"),
            }
            result
        })
    }

    fn all_tokens(&self) -> LedgerFuture<Vec<RawTokenRecord>> {
        let ledger = self.clone();
        Box::pin(async move {
            ledger.pause().await;
            ledger.read(entrypoints::GET_ALL_TOKENS, None).await
        })
    }

    fn tokens_by_owner(&self, owner: Felt) -> LedgerFuture<Vec<RawTokenRecord>> {
        let ledger = self.clone();
        Box::pin(async move {
            ledger.pause().await;
            ledger.read(entrypoints::GET_TOKENS_BY_OWNER, Some(owner)).await
        })
    }
}
