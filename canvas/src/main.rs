//! Canvas demo.
//!
//! Drives the reservation workflow against an in-memory ledger:
//! a drag over an existing plot is rejected, a free rectangle is approved
//! and minted, and the new plot is edited.
//!
//! Configuration comes from the environment (see `CanvasConfig::from_env`).
//! Set `CANVAS_METRICS_ADDR` to expose Prometheus metrics while it runs.

use anyhow::{bail, Context, Result};
use plotgrid_canvas::ledger::InMemoryLedger;
use plotgrid_canvas::metadata::TokenMetadata;
use plotgrid_canvas::reservation::Notice;
use plotgrid_canvas::{
    CanvasAction, CanvasConfig, CanvasEnvironment, CanvasReducer, CanvasState, Cell, Rectangle,
};
use plotgrid_core::environment::SystemClock;
use plotgrid_runtime::Store;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

type CanvasStore = Store<CanvasState, CanvasAction, CanvasEnvironment<SystemClock>, CanvasReducer<SystemClock>>;

const WAIT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "plotgrid_canvas=debug,plotgrid_runtime=info".into()),
        )
        .init();

    let config = CanvasConfig::from_env();
    let settings = config.settings().context("invalid canvas configuration")?;

    if let Some(addr) = config.metrics_addr {
        plotgrid_runtime::metrics::install_prometheus(addr)?;
    }

    info!(
        rows = settings.bounds.rows,
        cols = settings.bounds.cols,
        unit_price = %settings.pricing.unit_price().format_units(config.fees.decimals),
        "Starting canvas demo"
    );

    let mut ledger = InMemoryLedger::new(
        settings.bounds,
        settings.calls.fee_token(),
        settings.calls.canvas_contract(),
        settings.pricing.unit_price(),
    )?;
    if let Some(account) = settings.account {
        ledger = ledger.with_account(account);
    }
    let settings = settings.with_account(ledger.account());

    ledger
        .mint_foreign(Rectangle::new(10, 10, 4, 3)?, "ipfs://neighbour", "https://neighbour.example")
        .await?;

    let store: CanvasStore = Store::new(
        CanvasState::new(settings.bounds)?,
        CanvasReducer::new(),
        CanvasEnvironment::new(Arc::new(ledger.clone()), SystemClock, settings),
    );

    store
        .send_and_wait_for(
            CanvasAction::RefreshPlots,
            |a| matches!(a, CanvasAction::PlotsLoaded { .. } | CanvasAction::PlotsLoadFailed { .. }),
            WAIT,
        )
        .await?;
    info!(plots = store.state(|s| s.plots.len()).await, "Plots loaded");

    // Dragging into the neighbour's plot is refused before any ledger call.
    drag(&store, Cell::new(8, 8), Cell::new(11, 11)).await?;
    if let Some(Notice::Failure(error)) = store.state(|s| s.notice.clone()).await {
        info!(%error, "Selection rejected");
    }
    store.send(CanvasAction::DismissNotice).await?;

    drag(&store, Cell::new(2, 3), Cell::new(5, 8)).await?;
    let quote = store.state(|s| s.selection.price_quote).await;
    if let Some(amount) = quote {
        info!(price = %amount.format_units(config.fees.decimals), "Selection priced");
    }

    let outcome = store
        .send_and_wait_for(
            CanvasAction::Submit {
                media_ref: "ipfs://my-artwork".to_string(),
                link_ref: "https://example.com".to_string(),
            },
            |a| matches!(a, CanvasAction::MintConfirmed { .. } | CanvasAction::MintFailed { .. }
                | CanvasAction::ApprovalFailed { .. }),
            WAIT,
        )
        .await?;

    let token_id = match outcome {
        CanvasAction::MintConfirmed { token_id, .. } => token_id,
        other => {
            let notice = store.state(|s| s.notice.clone()).await;
            bail!("reservation did not commit: {other:?} ({notice:?})");
        },
    };
    info!(%token_id, "Plot minted");

    store
        .send_and_wait_for(
            CanvasAction::EditPlot {
                token_id: token_id.clone(),
                media_ref: "ipfs://my-artwork-v2".to_string(),
                link_ref: String::new(),
            },
            |a| matches!(a, CanvasAction::EditConfirmed { .. } | CanvasAction::EditFailed { .. }),
            WAIT,
        )
        .await?;
    store
        .send_and_wait_for(CanvasAction::RefreshPlots, |a| matches!(a, CanvasAction::PlotsLoaded { .. }), WAIT)
        .await?;

    let plots = store.state(|s| s.plots.all().to_vec()).await;
    for plot in &plots {
        println!("{}", serde_json::to_string_pretty(&TokenMetadata::for_plot(plot))?);
    }

    let entrypoints = ledger.entrypoints().await;
    info!(?entrypoints, "Ledger calls submitted");
    store.shutdown();
    Ok(())
}

async fn drag(store: &CanvasStore, from: Cell, to: Cell) -> Result<()> {
    store.send(CanvasAction::PointerDown { cell: from }).await?;
    store.send(CanvasAction::PointerEnter { cell: to }).await?;
    store.send(CanvasAction::PointerUp).await?;
    Ok(())
}
