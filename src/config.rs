//! Configuration: CLI arguments and environment variables via clap.

use clap::Parser;
use uuid::Uuid;

/// Conclave - deadline-driven group decision engine
#[derive(Parser, Debug, Clone)]
#[command(name = "conclave")]
#[command(about = "Deadline-driven group decision engine")]
pub struct Args {
    /// Unique node identifier for this instance
    #[arg(long, env = "NODE_ID", default_value_t = Uuid::new_v4())]
    pub node_id: Uuid,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
        if !LEVELS.contains(&self.log_level.as_str()) {
            return Err(format!(
                "LOG_LEVEL must be one of {LEVELS:?}, got '{}'",
                self.log_level
            ));
        }
        Ok(())
    }
}
