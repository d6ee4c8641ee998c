pub mod toml_config;

pub use toml_config::OutreachConfig;

#[cfg(feature = "cli")]
use crate::utils::error::Result;
#[cfg(feature = "cli")]
use crate::utils::validation::{validate_file_arg, validate_non_empty_string, Validate};
#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use serde::{Deserialize, Serialize};

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "outreach-engine")]
#[command(about = "Classify prospects, build an outreach sequence and gate it with a pre-flight check")]
pub struct CliConfig {
    #[arg(long, short, default_value = "outreach.toml")]
    pub config: String,

    #[arg(long, short, help = "Prospect file (.csv or .json)")]
    pub prospects: String,

    #[arg(long, short, default_value = "./output")]
    pub output: String,

    #[arg(long, help = "Campaign type; overrides the config file and the recommendation")]
    pub channel: Option<String>,

    #[arg(long, help = "Run the pre-flight check without launching")]
    pub dry_run: bool,

    #[arg(long, short, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub json_logs: bool,
}

#[cfg(feature = "cli")]
impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_file_arg("config", &self.config, &["toml"])?;
        validate_file_arg("prospects", &self.prospects, &["csv", "json"])?;
        validate_non_empty_string("output", &self.output)?;
        if let Some(channel) = &self.channel {
            channel
                .parse::<crate::domain::model::ChannelType>()
                .map_err(|reason| crate::utils::error::OutreachError::InvalidConfigValueError {
                    field: "channel".to_string(),
                    value: channel.clone(),
                    reason,
                })?;
        }
        Ok(())
    }
}
