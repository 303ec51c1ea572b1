use clap::Parser;
use marketpay::domain::plan::MembershipPlan;
use marketpay::domain::ports::{Ledger, LedgerRef};
use marketpay::domain::product::Product;
use marketpay::domain::user::UserAccount;
use marketpay::infrastructure::gateway::HttpGateway;
use marketpay::infrastructure::in_memory::InMemoryLedger;
use marketpay::interfaces::http::{AppState, router};
use miette::{IntoDiagnostic, Result};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Address to listen on.
    #[arg(long, default_value = "127.0.0.1:8080")]
    bind: SocketAddr,

    /// Base URL of the payment gateway API.
    #[arg(long)]
    gateway_url: String,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// JSON fixture with users/products/plans to load at startup.
    #[arg(long)]
    seed: Option<PathBuf>,
}

/// Catalog fixture loaded at startup; catalog management itself is
/// outside this service.
#[derive(Deserialize, Default)]
struct Fixture {
    #[serde(default)]
    users: Vec<UserAccount>,
    #[serde(default)]
    products: Vec<Product>,
    #[serde(default)]
    plans: Vec<MembershipPlan>,
}

async fn apply_fixture(ledger: &dyn Ledger, fixture: Fixture) -> miette::Result<()> {
    for user in fixture.users {
        ledger.upsert_user(user).await.into_diagnostic()?;
    }
    for product in fixture.products {
        ledger.upsert_product(product).await.into_diagnostic()?;
    }
    for plan in fixture.plans {
        ledger.upsert_plan(plan).await.into_diagnostic()?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let ledger: LedgerRef = if let Some(db_path) = &cli.db_path {
        #[cfg(feature = "storage-rocksdb")]
        {
            Arc::new(
                marketpay::infrastructure::rocksdb::RocksDbLedger::open(db_path)
                    .into_diagnostic()?,
            )
        }
        #[cfg(not(feature = "storage-rocksdb"))]
        {
            let _ = db_path;
            miette::bail!("built without the storage-rocksdb feature; --db-path is unavailable");
        }
    } else {
        Arc::new(InMemoryLedger::new())
    };

    if let Some(seed_path) = &cli.seed {
        let raw = std::fs::read_to_string(seed_path).into_diagnostic()?;
        let fixture: Fixture = serde_json::from_str(&raw).into_diagnostic()?;
        apply_fixture(ledger.as_ref(), fixture).await?;
        tracing::info!(path = %seed_path.display(), "fixture loaded");
    }

    let gateway = Arc::new(HttpGateway::new(cli.gateway_url.clone()));
    let app = router(AppState::new(ledger, gateway));

    let listener = tokio::net::TcpListener::bind(cli.bind)
        .await
        .into_diagnostic()?;
    tracing::info!(addr = %cli.bind, "marketpay listening");
    axum::serve(listener, app).await.into_diagnostic()?;

    Ok(())
}
