//! Orientation mirror service.
//!
//! Hosts the local HTTP API over the student store. The model bundle is
//! probed at startup so degraded deployments are visible in the logs
//! before the first student sits down.

use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use boussole::config::AppConfig;
use boussole::domains::SchoolDirectory;
use boussole::model::ModelAdapter;
use boussole::server::{run_server, AppState};
use boussole::store::SqliteStudentStore;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = AppConfig::from_env();
    info!("database: {}", config.db_path.display());

    let store = Arc::new(SqliteStudentStore::new(&config.db_path).await?);

    // Startup diagnostics: load the classifier and the school directory the
    // way an interactive session would, so misconfiguration shows up here.
    let adapter = ModelAdapter::load(&config.model_dir);
    if adapter.is_demo() {
        warn!("serving without a trained model; predictions will use the demo fallback");
    }
    match SchoolDirectory::load(&config.schools_csv) {
        Ok(directory) => info!("school directory loaded ({} entries)", directory.all().len()),
        Err(e) => warn!("school directory unavailable ({e}); results will list no schools"),
    }

    let state = AppState { store };
    run_server(&config.bind_addr, state).await
}
