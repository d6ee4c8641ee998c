pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::LocalStorage;
pub use config::OutreachConfig;
pub use core::{CampaignLauncher, DraftManager, PreflightValidator};
pub use utils::error::{OutreachError, Result};
