use crate::adapters::http::{ApiClient, DEFAULT_TIMEOUT_SECONDS};
use crate::core::delay::{Delay, RawDelay};
use crate::core::draft::DEFAULT_DEBOUNCE;
use crate::core::preflight::{RateLimit, RateLimitPolicy};
use crate::core::resolver::{ChannelSelection, ResolverPolicy, DEFAULT_MAJORITY_THRESHOLD};
use crate::core::sequence::{ChannelLimits, SequenceFields, SequencePolicy, MAX_SEQUENCE_STEPS};
use crate::domain::model::{AccountConnections, ChannelType};
use crate::utils::error::{OutreachError, Result};
use crate::utils::validation::{
    validate_api_key, validate_endpoint_url, validate_non_empty_string, validate_range, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutreachConfig {
    pub campaign: CampaignConfig,
    #[serde(default)]
    pub accounts: AccountConnections,
    #[serde(default)]
    pub policy: PolicyConfig,
    #[serde(default)]
    pub rate_limits: RateLimitConfig,
    #[serde(default)]
    pub autosave: AutosaveConfig,
    #[serde(default)]
    pub endpoints: Option<EndpointConfig>,
    #[serde(default)]
    pub import: ImportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignConfig {
    pub name: String,
    pub workspace_id: String,
    /// Explicit campaign type; left out, the resolver recommends one.
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(flatten)]
    pub sequence: SequenceFields,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyConfig {
    pub majority_threshold: Option<f64>,
    pub max_steps: Option<usize>,
    pub delay_schedule: Option<Vec<RawDelay>>,
    #[serde(default)]
    pub limits: LimitsConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LimitsConfig {
    pub connector: Option<ChannelLimits>,
    pub messenger: Option<ChannelLimits>,
    pub open_inmail: Option<ChannelLimits>,
    pub email: Option<ChannelLimits>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub warning_ratio: Option<f64>,
    pub connector: Option<RateLimit>,
    pub messenger: Option<RateLimit>,
    pub email: Option<RateLimit>,
    pub open_inmail: Option<RateLimit>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AutosaveConfig {
    pub debounce_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    #[serde(default = "default_assume_approved")]
    pub assume_approved: bool,
}

fn default_assume_approved() -> bool {
    true
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            assume_approved: default_assume_approved(),
        }
    }
}

impl OutreachConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(OutreachError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        // 處理環境變數替換
        let processed_content = Self::substitute_env_vars(content)?;
        Ok(toml::from_str(&processed_content)?)
    }

    /// 替換環境變數 (例如 ${OUTREACH_API_KEY})
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| OutreachError::ConfigError {
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 明確指定的活動類型
    pub fn explicit_channel(&self) -> Result<Option<ChannelType>> {
        self.campaign
            .channel
            .as_deref()
            .map(|raw| {
                raw.parse().map_err(|reason| OutreachError::InvalidConfigValueError {
                    field: "campaign.channel".to_string(),
                    value: raw.to_string(),
                    reason,
                })
            })
            .transpose()
    }

    pub fn channel_selection(&self) -> Result<ChannelSelection> {
        Ok(match self.explicit_channel()? {
            Some(channel) => ChannelSelection::preselected(channel),
            None => ChannelSelection::default_for(self.accounts),
        })
    }

    pub fn resolver_policy(&self) -> ResolverPolicy {
        ResolverPolicy {
            majority_threshold: self
                .policy
                .majority_threshold
                .unwrap_or(DEFAULT_MAJORITY_THRESHOLD),
        }
    }

    pub fn sequence_policy(&self) -> SequencePolicy {
        let defaults = SequencePolicy::default();
        let limits = &self.policy.limits;
        SequencePolicy {
            max_steps: self.policy.max_steps.unwrap_or(defaults.max_steps),
            delay_schedule: self
                .policy
                .delay_schedule
                .as_ref()
                .map(|schedule| schedule.iter().map(Delay::normalize).collect())
                .unwrap_or(defaults.delay_schedule),
            connector: limits.connector.unwrap_or(defaults.connector),
            messenger: limits.messenger.unwrap_or(defaults.messenger),
            open_inmail: limits.open_inmail.unwrap_or(defaults.open_inmail),
            email: limits.email.unwrap_or(defaults.email),
        }
    }

    pub fn rate_limit_policy(&self) -> RateLimitPolicy {
        let defaults = RateLimitPolicy::default();
        let limits = &self.rate_limits;
        RateLimitPolicy {
            connector: limits.connector.unwrap_or(defaults.connector),
            messenger: limits.messenger.unwrap_or(defaults.messenger),
            email: limits.email.unwrap_or(defaults.email),
            open_inmail: limits.open_inmail.unwrap_or(defaults.open_inmail),
            warning_ratio: limits.warning_ratio.unwrap_or(defaults.warning_ratio),
        }
    }

    pub fn autosave_debounce(&self) -> Duration {
        self.autosave
            .debounce_ms
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_DEBOUNCE)
    }

    /// 設定了 `[endpoints]` 時建立 HTTP 客戶端
    pub fn api_client(&self) -> Option<ApiClient> {
        self.endpoints.as_ref().map(|endpoints| {
            ApiClient::new(
                endpoints.base_url.clone(),
                endpoints.api_key.clone(),
                endpoints.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS),
            )
        })
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validate_non_empty_string("campaign.name", &self.campaign.name)?;
        validate_non_empty_string("campaign.workspace_id", &self.campaign.workspace_id)?;
        self.explicit_channel()?;

        if let Some(threshold) = self.policy.majority_threshold {
            validate_range("policy.majority_threshold", threshold, 0.5, 1.0)?;
        }
        if let Some(max_steps) = self.policy.max_steps {
            validate_range("policy.max_steps", max_steps, 1, MAX_SEQUENCE_STEPS)?;
        }
        if let Some(schedule) = &self.policy.delay_schedule {
            if schedule.is_empty() {
                return Err(OutreachError::InvalidConfigValueError {
                    field: "policy.delay_schedule".to_string(),
                    value: "[]".to_string(),
                    reason: "At least one delay is required".to_string(),
                });
            }
        }
        if let Some(ratio) = self.rate_limits.warning_ratio {
            validate_range("rate_limits.warning_ratio", ratio, 0.0, 1.0)?;
        }
        if let Some(debounce) = self.autosave.debounce_ms {
            validate_range("autosave.debounce_ms", debounce, 100, 60_000)?;
        }

        if let Some(endpoints) = &self.endpoints {
            validate_endpoint_url("endpoints.base_url", &endpoints.base_url)?;
            validate_api_key("endpoints.api_key", endpoints.api_key.as_deref())?;
            if let Some(timeout) = endpoints.timeout_seconds {
                validate_range("endpoints.timeout_seconds", timeout, 1, 300)?;
            }
        }

        Ok(())
    }
}

impl Validate for OutreachConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::delay::DelayUnit;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const BASIC: &str = r#"
[campaign]
name = "Q3 founders"
workspace_id = "ws_1"
lead = "Hi {first_name}, saw your talk at RustConf"
alternative = "Loved your talk"

[[campaign.follow_ups]]
text = "Following up on my note"
delay = "2-3 days"

[[campaign.follow_ups]]
text = "Last one from me"
delay = { value = 1, unit = "weeks" }

[accounts]
linkedin = true
email = false
"#;

    #[test]
    fn test_parse_basic_config() {
        let config = OutreachConfig::from_toml_str(BASIC).unwrap();

        assert_eq!(config.campaign.name, "Q3 founders");
        assert_eq!(config.campaign.sequence.follow_ups.len(), 2);
        assert!(config.import.assume_approved);
        assert!(config.api_client().is_none());
        assert!(config.validate().is_ok());

        let selection = config.channel_selection().unwrap();
        assert!(!selection.is_explicit());
        assert_eq!(selection.current(), ChannelType::Connector);

        let sequence = crate::core::sequence::build_sequence(
            ChannelType::Connector,
            &config.campaign.sequence,
            &config.sequence_policy(),
        )
        .unwrap();
        assert_eq!(sequence.follow_ups()[0].delay, Some(Delay::days(2)));
        assert_eq!(sequence.follow_ups()[1].delay, Some(Delay::new(1, DelayUnit::Weeks)));
    }

    #[test]
    fn test_policy_overrides() {
        let content = format!(
            "{}\n{}",
            BASIC,
            r#"
[policy]
majority_threshold = 0.8
max_steps = 5
delay_schedule = ["1 day", { value = 2, unit = "weeks" }]

[policy.limits.connector]
lead = 200
alternative = 100

[rate_limits]
warning_ratio = 0.9

[rate_limits.connector]
daily = 15
weekly = 80

[autosave]
debounce_ms = 500
"#
        );
        let config = OutreachConfig::from_toml_str(&content).unwrap();
        config.validate().unwrap();

        assert_eq!(config.resolver_policy().majority_threshold, 0.8);
        let sequence_policy = config.sequence_policy();
        assert_eq!(sequence_policy.max_steps, 5);
        assert_eq!(sequence_policy.default_delay_for(1), Delay::days(1));
        assert_eq!(sequence_policy.default_delay_for(4), Delay::new(2, DelayUnit::Weeks));
        assert_eq!(sequence_policy.connector.lead, Some(200));
        assert_eq!(sequence_policy.messenger, SequencePolicy::default().messenger);

        let rate_limits = config.rate_limit_policy();
        assert_eq!(rate_limits.connector, RateLimit::new(Some(15), Some(80)));
        assert_eq!(rate_limits.messenger, RateLimitPolicy::default().messenger);
        assert_eq!(config.autosave_debounce(), Duration::from_millis(500));
    }

    #[test]
    fn test_explicit_channel_accepts_legacy_label() {
        let content = BASIC.replace("workspace_id = \"ws_1\"", "workspace_id = \"ws_1\"\nchannel = \"linkedin\"");
        let config = OutreachConfig::from_toml_str(&content).unwrap();
        let selection = config.channel_selection().unwrap();
        assert!(selection.is_explicit());
        assert_eq!(selection.current(), ChannelType::Connector);

        let bad = BASIC.replace("workspace_id = \"ws_1\"", "workspace_id = \"ws_1\"\nchannel = \"fax\"");
        let config = OutreachConfig::from_toml_str(&bad).unwrap();
        assert!(matches!(
            config.validate(),
            Err(OutreachError::InvalidConfigValueError { .. })
        ));
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("OUTREACH_TEST_API_KEY", "k-123");

        let content = format!(
            "{}\n{}",
            BASIC,
            r#"
[endpoints]
base_url = "https://api.example.com/v1"
api_key = "${OUTREACH_TEST_API_KEY}"
"#
        );
        let config = OutreachConfig::from_toml_str(&content).unwrap();
        assert_eq!(config.endpoints.as_ref().unwrap().api_key.as_deref(), Some("k-123"));
        assert!(config.validate().is_ok());
        assert!(config.api_client().is_some());

        std::env::remove_var("OUTREACH_TEST_API_KEY");
    }

    #[test]
    fn test_unresolved_api_key_fails_validation() {
        let content = format!(
            "{}\n{}",
            BASIC,
            r#"
[endpoints]
base_url = "https://api.example.com"
api_key = "${OUTREACH_KEY_THAT_IS_NOT_SET}"
"#
        );
        let config = OutreachConfig::from_toml_str(&content).unwrap();
        assert!(matches!(
            config.validate(),
            Err(OutreachError::MissingConfigError { .. })
        ));
    }

    #[test]
    fn test_config_validation() {
        let content = BASIC.replace("name = \"Q3 founders\"", "name = \"  \"");
        let config = OutreachConfig::from_toml_str(&content).unwrap();
        assert!(config.validate().is_err());

        let content = format!("{}\n[policy]\nmajority_threshold = 0.3\n", BASIC);
        let config = OutreachConfig::from_toml_str(&content).unwrap();
        assert!(config.validate().is_err());

        assert!(matches!(
            OutreachConfig::from_toml_str("[campaign\nname ="),
            Err(OutreachError::TomlError(_))
        ));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(BASIC.as_bytes()).unwrap();

        let config = OutreachConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.campaign.workspace_id, "ws_1");
    }
}
