use std::path::PathBuf;
use std::time::Duration;

/// Application-level constants
pub const APP_NAME: &str = "Sahaya";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Fixed client polling interval while an alert is non-terminal.
pub const POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Upper bound on device location acquisition.
pub const LOCATION_TIMEOUT: Duration = Duration::from_secs(10);

/// Default bind address for the alert API.
pub const DEFAULT_BIND: &str = "127.0.0.1:7470";

/// Get the application data directory (~/Sahaya)
pub fn app_data_dir() -> PathBuf {
    let home = dirs::home_dir().expect("Cannot determine home directory");
    home.join("Sahaya")
}

/// Path of the alert database
pub fn database_path() -> PathBuf {
    app_data_dir().join("sahaya.db")
}

pub fn default_log_filter() -> &'static str {
    "sahaya=info,axum=warn"
}
