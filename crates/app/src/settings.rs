//! Settings for the `splitledger` binary.
//!
//! Sources, later ones winning:
//!
//! 1. the TOML file (`config/splitledger.toml` unless `--config` is given),
//! 2. `SPLITLEDGER__<SECTION>__<KEY>` environment variables,
//! 3. command-line flags.
//!
//! The API token is never read from the command line.

use std::{fmt, time::Duration};

use clap::Parser;
use client::SessionConfig;
use config::{Config, ConfigBuilder, Environment, File, builder::DefaultState};
use serde::Deserialize;

use crate::error::{AppError, Result};

const DEFAULT_CONFIG_PATH: &str = "config/splitledger.toml";
const ENV_PREFIX: &str = "SPLITLEDGER";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub level: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    pub base_url: String,
    pub token: Option<String>,
    pub timeout_secs: u64,
    /// Registered member id of the signed-in user.
    pub user_id: Option<i64>,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3000".to_string(),
            token: None,
            timeout_secs: 10,
            user_id: None,
        }
    }
}

impl fmt::Debug for ApiSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiSettings")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "***"))
            .field("timeout_secs", &self.timeout_secs)
            .field("user_id", &self.user_id)
            .finish()
    }
}

impl ApiSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    pub notifications_interval_secs: u64,
    pub refresh_groups_on_start: bool,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            notifications_interval_secs: 5,
            refresh_groups_on_start: true,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub app: AppSettings,
    pub api: ApiSettings,
    pub sync: SyncSettings,
}

#[derive(Debug, Parser)]
#[command(name = "splitledger", disable_version_flag = true)]
struct Args {
    /// Optional config file path (TOML).
    #[arg(long)]
    config: Option<String>,
    /// Override base URL (e.g. http://127.0.0.1:3000).
    #[arg(long)]
    base_url: Option<String>,
    /// Override log level (e.g. debug).
    #[arg(long)]
    level: Option<String>,
}

impl Settings {
    pub fn load() -> Result<Self> {
        let args = Args::parse();
        let config_path = args.config.as_deref().unwrap_or(DEFAULT_CONFIG_PATH);
        let builder = Config::builder()
            .add_source(File::with_name(config_path).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            );
        Self::layered(builder, args)
    }

    fn layered(builder: ConfigBuilder<DefaultState>, args: Args) -> Result<Self> {
        let mut settings: Settings = builder.build()?.try_deserialize()?;

        if let Some(base_url) = args.base_url {
            settings.api.base_url = base_url;
        }
        if let Some(level) = args.level {
            settings.app.level = level;
        }

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.api.timeout_secs == 0 {
            return Err(AppError::Setting("api.timeout_secs must be positive".to_string()));
        }
        if self.sync.notifications_interval_secs == 0 {
            return Err(AppError::Setting(
                "sync.notifications_interval_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn session_config(&self) -> Result<SessionConfig> {
        let user_id = self
            .api
            .user_id
            .ok_or_else(|| AppError::Setting("api.user_id is required".to_string()))?;
        let mut config = SessionConfig::new(user_id);
        config.notifications_interval = Duration::from_secs(self.sync.notifications_interval_secs);
        Ok(config)
    }
}
