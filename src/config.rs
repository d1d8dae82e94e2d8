//! Configuration System using Figment
//!
//! Configuration is loaded from:
//! 1. a TOML file (base configuration, `config/plogic.toml` by default)
//! 2. Environment variables (prefixed with `PLOGIC_`, `__` between levels)
//!
//! # Example
//! ```no_run
//! use rust_plogic::config::AppConfig;
//!
//! # fn main() -> rust_plogic::error::PlogicResult<()> {
//! let config = AppConfig::load()?;
//! config.validate()?;
//! println!("Bus: {}", config.bus.port);
//! # Ok(())
//! # }
//! ```

use crate::error::{PlogicError, PlogicResult};
use crate::hardware::plogic::CardOptions;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default location of the configuration file
pub const DEFAULT_CONFIG_PATH: &str = "config/plogic.toml";

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application settings
    pub application: ApplicationConfig,
    /// Serial bus settings
    pub bus: BusConfig,
    /// Logic cards on the bus
    #[serde(default)]
    pub cards: Vec<CardConfig>,
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Application name
    pub name: String,
    /// Logging level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Log output format (pretty, compact, json)
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

/// Serial bus configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusConfig {
    /// Serial port path (e.g. `/dev/ttyUSB0`, `COM3`)
    pub port: String,
    /// Baud rate
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// Reply timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Appended to every command
    #[serde(default = "default_line_terminator")]
    pub line_terminator: String,
}

/// One logic card on the bus
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardConfig {
    /// Name used to select the card from the command line
    pub name: String,
    /// Bus address character
    pub address: String,
    /// Axis letter of the card's pointer register
    pub axis: String,
    /// Delay before reading the reply to a save command, in milliseconds
    #[serde(default = "default_save_settle_ms")]
    pub save_settle_ms: u64,
    /// Start in refresh mode
    #[serde(default)]
    pub refresh_properties: bool,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "compact".to_string()
}

fn default_baud_rate() -> u32 {
    115_200
}

fn default_timeout_ms() -> u64 {
    500
}

fn default_line_terminator() -> String {
    "\r".to_string()
}

fn default_save_settle_ms() -> u64 {
    200
}

/// The single character of `value`, if it is exactly one printable ASCII character.
fn single_char(value: &str) -> Option<char> {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_graphic() => Some(c),
        _ => None,
    }
}

impl BusConfig {
    /// Reply timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl CardConfig {
    /// Bus address character, if well formed
    pub fn address_char(&self) -> Option<char> {
        single_char(&self.address)
    }

    /// Axis letter, if well formed
    pub fn axis_char(&self) -> Option<char> {
        single_char(&self.axis)
    }

    /// Driver options for this card
    pub fn options(&self) -> CardOptions {
        CardOptions {
            save_settle: Duration::from_millis(self.save_settle_ms),
            refresh_properties: self.refresh_properties,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path and environment variables
    ///
    /// Environment variables override the file with prefix `PLOGIC_`.
    /// Example: `PLOGIC_BUS__PORT=/dev/ttyUSB1`
    pub fn load() -> PlogicResult<Self> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific file path
    pub fn load_from<P: AsRef<Path>>(path: P) -> PlogicResult<Self> {
        Figment::new()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("PLOGIC_").split("__"))
            .extract()
            .map_err(PlogicError::from)
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> PlogicResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.application.log_level.to_lowercase().as_str()) {
            return Err(PlogicError::Configuration(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.application.log_level,
                valid_levels.join(", ")
            )));
        }

        let valid_formats = ["pretty", "compact", "json"];
        if !valid_formats.contains(&self.application.log_format.to_lowercase().as_str()) {
            return Err(PlogicError::Configuration(format!(
                "Invalid log_format '{}'. Must be one of: {}",
                self.application.log_format,
                valid_formats.join(", ")
            )));
        }

        if self.cards.is_empty() {
            return Err(PlogicError::Configuration(
                "At least one card must be configured".to_string(),
            ));
        }

        let mut names = std::collections::HashSet::new();
        for card in &self.cards {
            if !names.insert(&card.name) {
                return Err(PlogicError::Configuration(format!(
                    "Duplicate card name: {}",
                    card.name
                )));
            }
            if card.address_char().is_none() {
                return Err(PlogicError::Configuration(format!(
                    "Card '{}': address '{}' must be a single printable character",
                    card.name, card.address
                )));
            }
            if card.axis_char().is_none() {
                return Err(PlogicError::Configuration(format!(
                    "Card '{}': axis '{}' must be a single printable character",
                    card.name, card.axis
                )));
            }
        }

        Ok(())
    }

    /// Card called `name`
    pub fn card(&self, name: &str) -> Option<&CardConfig> {
        self.cards.iter().find(|card| card.name == name)
    }
}
