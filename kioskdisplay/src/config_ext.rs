//! Extension integrating the display engine settings into kioskconfig
//!
//! The `DisplayConfigExt` trait adds typed accessors for the `server` and
//! `display` sections of `kioskconfig::Config`, plus helpers assembling an
//! [`EngineOptions`] and a configured [`RestSourceBuilder`].
//!
//! # Example
//!
//! ```no_run
//! use kioskconfig::get_config;
//! use kioskdisplay::DisplayConfigExt;
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = get_config();
//! let options = config.engine_options()?;
//! let source = config.rest_source_builder()?.build()?;
//! println!("{} every {:?}", source.active_files_url(), options.tick_interval);
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use anyhow::Result;
use kioskconfig::Config;
use serde_yaml::{Number, Value};
use tracing::warn;

use crate::engine::EngineOptions;
use crate::model::{MediaKind, display_duration};
use crate::progress::DEFAULT_TICK_INTERVAL;
use crate::rest_source::{
    DEFAULT_BASE_URL, DEFAULT_DISPLAY_SECONDS, DEFAULT_REQUEST_TIMEOUT_SECS, RestSourceBuilder,
};

/// Shortest tick accepted from configuration
const MIN_TICK_INTERVAL_MS: u64 = 10;

/// Extension trait for the display settings in kioskconfig
///
/// Getters persist their default when the key is missing, so a fresh
/// `config.yaml` lists every setting the display reads.
pub trait DisplayConfigExt {
    fn get_server_base_url(&self) -> Result<String>;
    fn set_server_base_url(&self, url: String) -> Result<()>;

    /// HTTP timeout for playlist requests
    fn get_server_timeout(&self) -> Result<Duration>;

    /// Display time (seconds) for items the server sends without one
    fn get_default_display_time(&self) -> Result<f64>;
    fn set_default_display_time(&self, seconds: f64) -> Result<()>;

    /// Whether rotation starts playing on activation
    fn get_auto_rotation(&self) -> Result<bool>;
    fn set_auto_rotation(&self, enabled: bool) -> Result<()>;

    fn get_tick_interval(&self) -> Result<Duration>;

    /// Period of the background playlist refresh, `None` when disabled (0)
    fn get_refresh_interval(&self) -> Result<Option<Duration>>;

    /// External viewer command template for `kind`, if one is configured
    ///
    /// The template may contain `{url}`, replaced by the item's source
    /// reference when the viewer is spawned.
    fn get_player_command(&self, kind: &MediaKind) -> Result<Option<String>>;

    fn engine_options(&self) -> Result<EngineOptions>;

    /// Builder preloaded with base URL, timeout, display identifier and
    /// default display time
    fn rest_source_builder(&self) -> Result<RestSourceBuilder>;
}

impl DisplayConfigExt for Config {
    fn get_server_base_url(&self) -> Result<String> {
        match self.get_value(&["server", "base_url"]) {
            Ok(Value::String(url)) if !url.trim().is_empty() => Ok(url.trim().to_string()),
            _ => {
                self.set_server_base_url(DEFAULT_BASE_URL.to_string())?;
                Ok(DEFAULT_BASE_URL.to_string())
            }
        }
    }

    fn set_server_base_url(&self, url: String) -> Result<()> {
        self.set_value(&["server", "base_url"], Value::String(url))
    }

    fn get_server_timeout(&self) -> Result<Duration> {
        let ms = self.get_u64_or(&["server", "timeout_ms"], DEFAULT_REQUEST_TIMEOUT_SECS * 1000);
        if ms == 0 {
            warn!("server.timeout_ms is 0, using default");
            return Ok(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS));
        }
        Ok(Duration::from_millis(ms))
    }

    fn get_default_display_time(&self) -> Result<f64> {
        match self.get_value(&["display", "default_display_time"]) {
            Ok(Value::Number(n)) => match n.as_f64() {
                Some(secs) if display_duration(secs).is_some() => Ok(secs),
                _ => {
                    warn!(value = %n, "Invalid display.default_display_time, using default");
                    Ok(DEFAULT_DISPLAY_SECONDS)
                }
            },
            _ => {
                self.set_default_display_time(DEFAULT_DISPLAY_SECONDS)?;
                Ok(DEFAULT_DISPLAY_SECONDS)
            }
        }
    }

    fn set_default_display_time(&self, seconds: f64) -> Result<()> {
        let value = if seconds.fract() == 0.0 && seconds >= 0.0 {
            Value::Number(Number::from(seconds as u64))
        } else {
            Value::Number(Number::from(seconds))
        };
        self.set_value(&["display", "default_display_time"], value)
    }

    fn get_auto_rotation(&self) -> Result<bool> {
        match self.get_value(&["display", "auto_rotation"]) {
            Ok(Value::Bool(b)) => Ok(b),
            Ok(_) => Ok(self.get_bool_or(&["display", "auto_rotation"], true)),
            Err(_) => {
                self.set_auto_rotation(true)?;
                Ok(true)
            }
        }
    }

    fn set_auto_rotation(&self, enabled: bool) -> Result<()> {
        self.set_value(&["display", "auto_rotation"], Value::Bool(enabled))
    }

    fn get_tick_interval(&self) -> Result<Duration> {
        let default_ms = DEFAULT_TICK_INTERVAL.as_millis() as u64;
        let ms = self.get_u64_or(&["display", "tick_interval_ms"], default_ms);
        if ms < MIN_TICK_INTERVAL_MS {
            warn!(ms, min = MIN_TICK_INTERVAL_MS, "display.tick_interval_ms too small, using default");
            return Ok(DEFAULT_TICK_INTERVAL);
        }
        Ok(Duration::from_millis(ms))
    }

    fn get_refresh_interval(&self) -> Result<Option<Duration>> {
        match self.get_u64_or(&["display", "refresh_interval_secs"], 0) {
            0 => Ok(None),
            secs => Ok(Some(Duration::from_secs(secs))),
        }
    }

    fn get_player_command(&self, kind: &MediaKind) -> Result<Option<String>> {
        if !kind.is_known() {
            return Ok(None);
        }
        let command = self.get_string_or(&["display", "players", kind.as_str()], "");
        let command = command.trim();
        Ok((!command.is_empty()).then(|| command.to_string()))
    }

    fn engine_options(&self) -> Result<EngineOptions> {
        Ok(EngineOptions {
            start_playing: self.get_auto_rotation()?,
            tick_interval: self.get_tick_interval()?,
        })
    }

    fn rest_source_builder(&self) -> Result<RestSourceBuilder> {
        Ok(RestSourceBuilder::new()
            .base_url(self.get_server_base_url()?)
            .timeout(self.get_server_timeout()?)
            .display_id(self.get_display_id()?)
            .default_display_seconds(self.get_default_display_time()?))
    }
}
