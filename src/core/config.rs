/// Engine settings, loadable from RON.
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::schema::line::Millis;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("countdown_tick must be greater than zero")]
    ZeroTick,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Interval between countdown ticks.
    pub countdown_tick: Millis,
    /// Echo typed input back to the output.
    pub echo_input: bool,
    pub echo_open: String,
    pub echo_close: String,
    pub error_open: String,
    pub error_close: String,
    pub not_found: String,
    /// Heading printed before the scene list when a jump fails.
    pub scene_list_heading: String,
    /// Heading printed before the command list.
    pub help_heading: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            countdown_tick: 1000,
            echo_input: true,
            echo_open: "<echo>> ".to_string(),
            echo_close: "</echo>".to_string(),
            error_open: "<err>".to_string(),
            error_close: "</err>".to_string(),
            not_found: "command not found".to_string(),
            scene_list_heading: "scenes:".to_string(),
            help_heading: "commands:".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn load_from_ron(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    pub fn parse_ron(input: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = ron::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.countdown_tick == 0 {
            return Err(ConfigError::ZeroTick);
        }
        Ok(())
    }

    /// Wrap already-escaped input as an echo line.
    pub fn echo(&self, input: &str) -> String {
        format!("{}{}{}", self.echo_open, input, self.echo_close)
    }

    pub fn error(&self, message: &str) -> String {
        format!("{}{}{}", self.error_open, message, self.error_close)
    }
}
