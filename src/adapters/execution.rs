use crate::core::launch::{LaunchPackage, LaunchReceipt};
use crate::domain::ports::{ExecutionBackend, Storage};
use crate::utils::error::Result;
use async_trait::async_trait;

pub const LAUNCH_PACKAGE_FILE: &str = "launch_package.json";

/// Hands the package off by writing it to storage for a downstream sender.
pub struct FileExecutionBackend<S: Storage> {
    storage: S,
}

impl<S: Storage> FileExecutionBackend<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    fn campaign_dir(name: &str) -> String {
        let slug: String = name
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
            .collect();
        let slug = slug.trim_matches('-');
        if slug.is_empty() {
            "campaign".to_string()
        } else {
            slug.to_string()
        }
    }
}

#[async_trait]
impl<S: Storage> ExecutionBackend for FileExecutionBackend<S> {
    async fn submit(&self, package: &LaunchPackage) -> Result<LaunchReceipt> {
        let launch_id = uuid::Uuid::new_v4().to_string();
        let path = format!("{}/{}", Self::campaign_dir(package.campaign_name()), LAUNCH_PACKAGE_FILE);

        let body = serde_json::to_vec_pretty(&serde_json::json!({
            "launch_id": launch_id,
            "package": package,
        }))?;
        self.storage.write_file(&path, &body).await?;
        tracing::info!("📁 Launch package written to {}", path);

        Ok(LaunchReceipt {
            launch_id,
            accepted: package.valid_prospect_ids().len(),
            location: Some(path),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_campaign_dir_is_filesystem_safe() {
        type Backend = FileExecutionBackend<crate::adapters::storage::LocalStorage>;
        assert_eq!(Backend::campaign_dir("Q3 Founders / EMEA"), "q3-founders---emea");
        assert_eq!(Backend::campaign_dir("  "), "campaign");
    }
}
