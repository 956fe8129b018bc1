use std::env;
use std::time::Duration;

use anyhow::{Context, Result};
use relay_engine::{CancelPolicy, DispatcherConfig, FanOut};
use tracing::info;

/// Demo configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct DemoConfig {
    pub dispatcher: DispatcherConfig,
    pub timeout: Duration,
}

impl DemoConfig {
    /// `RELAY_FAN_OUT` (awaited|detached), `RELAY_ON_CANCEL` (abort|detach),
    /// `RELAY_TIMEOUT_MS`. All optional.
    pub fn from_env() -> Result<Self> {
        let fan_out = match env::var("RELAY_FAN_OUT") {
            Ok(v) => v.parse::<FanOut>()?,
            Err(_) => FanOut::default(),
        };
        let on_cancel = match env::var("RELAY_ON_CANCEL") {
            Ok(v) => v.parse::<CancelPolicy>()?,
            Err(_) => CancelPolicy::default(),
        };
        let timeout_ms: u64 = env::var("RELAY_TIMEOUT_MS")
            .unwrap_or_else(|_| "30000".to_string())
            .parse()
            .context("RELAY_TIMEOUT_MS must be a number of milliseconds")?;

        Ok(Self {
            dispatcher: DispatcherConfig::default()
                .with_fan_out(fan_out)
                .with_on_cancel(on_cancel),
            timeout: Duration::from_millis(timeout_ms),
        })
    }

    pub fn log(&self) {
        info!(
            fan_out = %self.dispatcher.fan_out,
            on_cancel = %self.dispatcher.on_cancel,
            timeout_ms = self.timeout.as_millis() as u64,
            "Loaded config"
        );
    }
}
