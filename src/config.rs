//! Application configuration.
//!
//! A plain struct built once in `main` (or a test) and passed down to the
//! store, the model adapter and the coordinator. Environment variables
//! override the defaults; there is no process-wide configuration state.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// SQLite database file.
    pub db_path: PathBuf,
    /// Directory holding the model artifact bundle.
    pub model_dir: PathBuf,
    /// School directory CSV.
    pub schools_csv: PathBuf,
    /// Bind address of the local mirror service.
    pub bind_addr: String,
    /// Remote submission endpoint used by the coordinator.
    pub submit_endpoint: String,
    /// Timeout for one remote submission attempt.
    pub submit_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("ressources/data/students.db"),
            model_dir: PathBuf::from("ressources/models"),
            schools_csv: PathBuf::from("ressources/data/ecoles_maroc.csv"),
            bind_addr: "0.0.0.0:5000".to_string(),
            submit_endpoint: "http://127.0.0.1:5000/api/submit".to_string(),
            submit_timeout: Duration::from_secs(5),
        }
    }
}

impl AppConfig {
    /// Defaults overridden by `BOUSSOLE_*` environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(v) = env::var("BOUSSOLE_DB_PATH") {
            config.db_path = PathBuf::from(v);
        }
        if let Ok(v) = env::var("BOUSSOLE_MODEL_DIR") {
            config.model_dir = PathBuf::from(v);
        }
        if let Ok(v) = env::var("BOUSSOLE_SCHOOLS_CSV") {
            config.schools_csv = PathBuf::from(v);
        }
        if let Ok(v) = env::var("BOUSSOLE_BIND_ADDR") {
            config.bind_addr = v;
        }
        if let Ok(v) = env::var("BOUSSOLE_SUBMIT_ENDPOINT") {
            config.submit_endpoint = v;
        }
        if let Ok(v) = env::var("BOUSSOLE_SUBMIT_TIMEOUT_SECS") {
            if let Ok(secs) = v.parse() {
                config.submit_timeout = Duration::from_secs(secs);
            }
        }
        config
    }
}
