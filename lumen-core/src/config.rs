//! Board configuration
//!
//! A board describes its panel and rotation defaults in TOML:
//!
//! ```toml
//! [display]
//! controller = "sh1106"
//! width = 128
//! height = 64
//! flush_mode = "column_window"
//! window_columns = 4
//!
//! [scheduler]
//! default_display_time_ms = 5000
//! ```
//!
//! Missing keys take their defaults. Parsing needs `alloc::sync`, so
//! targets without atomics validate the file at build time instead.

use embassy_time::Duration;
use lumen_display::{DisplayError, DisplaySettings};
use serde::{Deserialize, Serialize};

/// Shortest display time a board may configure
pub const MIN_DISPLAY_TIME_MS: u32 = 100;

/// Configuration error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// TOML syntax or type error
    TomlParse,
    /// Display section describes an unsupported panel
    InvalidDisplay(DisplayError),
    /// Scheduler section out of range
    InvalidScheduler,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ConfigError::TomlParse => f.write_str("invalid TOML"),
            ConfigError::InvalidDisplay(e) => write!(f, "invalid display section: {}", e),
            ConfigError::InvalidScheduler => f.write_str("invalid scheduler section"),
        }
    }
}

impl From<DisplayError> for ConfigError {
    fn from(e: DisplayError) -> Self {
        ConfigError::InvalidDisplay(e)
    }
}

/// Rotation defaults
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[serde(default)]
pub struct SchedulerSettings {
    /// Display time for widgets that do not choose their own (ms)
    pub default_display_time_ms: u32,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            default_display_time_ms: 5000,
        }
    }
}

impl SchedulerSettings {
    /// Default display time as a duration
    pub fn default_display_time(&self) -> Duration {
        Duration::from_millis(u64::from(self.default_display_time_ms))
    }
}

/// Complete board configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[serde(default)]
pub struct LumenConfig {
    /// Panel wiring and flush behavior
    pub display: DisplaySettings,
    /// Rotation defaults
    pub scheduler: SchedulerSettings,
}

impl LumenConfig {
    /// Parse and validate a TOML board description
    pub fn from_toml(input: &str) -> Result<Self, ConfigError> {
        let config: LumenConfig = toml::from_str(input).map_err(|_| {
            warn!("board configuration is not valid TOML");
            ConfigError::TomlParse
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check every section
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.display.validate()?;
        if self.scheduler.default_display_time_ms < MIN_DISPLAY_TIME_MS {
            return Err(ConfigError::InvalidScheduler);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use lumen_display::{Controller, FlushMode};

    use super::*;

    #[test]
    fn test_empty_input_gives_defaults() {
        let config = LumenConfig::from_toml("").unwrap();
        assert_eq!(config, LumenConfig::default());
        assert_eq!(
            config.scheduler.default_display_time(),
            Duration::from_secs(5)
        );
    }

    #[test]
    fn test_full_board_file() {
        let config = LumenConfig::from_toml(
            r#"
            [display]
            controller = "sh1106"
            address = 61
            width = 128
            height = 32
            flush_mode = "full_frame"
            reset_pin = 4
            dim_after_ms = 30000

            [scheduler]
            default_display_time_ms = 2500
            "#,
        )
        .unwrap();

        assert_eq!(config.display.controller, Controller::Sh1106);
        assert_eq!(config.display.address, 0x3D);
        assert_eq!(config.display.height, 32);
        assert_eq!(config.display.reset_pin, Some(4));
        assert_eq!(config.display.dim_after_ms, Some(30_000));
        assert_eq!(config.display.flush_mode(), FlushMode::FullFrame);
        assert_eq!(config.scheduler.default_display_time_ms, 2500);
    }

    #[test]
    fn test_window_columns_are_checked() {
        let err = LumenConfig::from_toml("[display]\nwindow_columns = 6\n").unwrap_err();
        assert_eq!(err, ConfigError::InvalidDisplay(DisplayError::InvalidSettings));

        // Irrelevant in full-frame mode
        let ok = LumenConfig::from_toml(
            "[display]\nflush_mode = \"full_frame\"\nwindow_columns = 6\n",
        );
        assert!(ok.is_ok());
    }

    #[test]
    fn test_rejects_bad_input() {
        assert_eq!(
            LumenConfig::from_toml("[display\nwidth = 128"),
            Err(ConfigError::TomlParse)
        );
        assert_eq!(
            LumenConfig::from_toml("[display]\ncontroller = \"st7735\"\n"),
            Err(ConfigError::TomlParse)
        );
        assert_eq!(
            LumenConfig::from_toml("[display]\nheight = 20\n"),
            Err(ConfigError::InvalidDisplay(DisplayError::InvalidDimensions))
        );
        assert_eq!(
            LumenConfig::from_toml("[scheduler]\ndefault_display_time_ms = 10\n"),
            Err(ConfigError::InvalidScheduler)
        );
    }
}
