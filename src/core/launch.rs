use crate::core::eligibility::classify_all;
use crate::core::preflight::{PreflightOutcome, PreflightRequest, PreflightValidator, RateLimitStatus};
use crate::core::resolver::{ChannelSelection, DisabledReason, Resolution, ResolverPolicy};
use crate::core::sequence::{build_sequence, CampaignSequence, SequenceFields, SequencePolicy};
use crate::domain::model::{AccountConnections, ChannelType, Prospect};
use crate::domain::ports::{ContactHistoryStore, ExecutionBackend};
use crate::utils::error::{OutreachError, Result, ValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What the execution backend receives. Only constructible from a pre-flight
/// outcome with at least one valid prospect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LaunchPackage {
    workspace_id: String,
    campaign_name: String,
    campaign_type: ChannelType,
    sequence: CampaignSequence,
    valid_prospect_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rate_limit_status: Option<RateLimitStatus>,
    created_at: DateTime<Utc>,
}

impl LaunchPackage {
    pub(crate) fn from_preflight(
        workspace_id: &str,
        campaign_name: &str,
        sequence: CampaignSequence,
        outcome: &PreflightOutcome,
    ) -> Result<Self> {
        if outcome.valid.is_empty() {
            return Err(OutreachError::NothingToLaunch {
                blocked: outcome.blocked.len(),
            });
        }
        Ok(Self {
            workspace_id: workspace_id.to_string(),
            campaign_name: campaign_name.to_string(),
            campaign_type: sequence.campaign_type,
            sequence,
            valid_prospect_ids: outcome.valid_ids(),
            rate_limit_status: outcome.rate_limit_status,
            created_at: Utc::now(),
        })
    }

    pub fn workspace_id(&self) -> &str {
        &self.workspace_id
    }

    pub fn campaign_name(&self) -> &str {
        &self.campaign_name
    }

    pub fn campaign_type(&self) -> ChannelType {
        self.campaign_type
    }

    pub fn sequence(&self) -> &CampaignSequence {
        &self.sequence
    }

    pub fn valid_prospect_ids(&self) -> &[String] {
        &self.valid_prospect_ids
    }

    pub fn rate_limit_status(&self) -> Option<&RateLimitStatus> {
        self.rate_limit_status.as_ref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchReceipt {
    pub launch_id: String,
    pub accepted: usize,
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LaunchRequest {
    pub workspace_id: String,
    pub campaign_name: String,
    pub accounts: AccountConnections,
    pub selection: ChannelSelection,
    pub fields: SequenceFields,
}

/// Everything decided before hand-off; a dry run stops here.
///
/// `package` is `None` when every prospect was blocked. The plan still carries
/// the per-prospect reasons so they can be reported.
#[derive(Debug, Clone, Serialize)]
pub struct LaunchPlan {
    pub resolution: Resolution,
    pub channel: ChannelType,
    pub preflight: PreflightOutcome,
    pub package: Option<LaunchPackage>,
}

impl LaunchPlan {
    pub fn can_launch(&self) -> bool {
        self.package.is_some()
    }
}

pub struct CampaignLauncher<H: ContactHistoryStore, E: ExecutionBackend> {
    validator: PreflightValidator<H>,
    backend: E,
    resolver_policy: ResolverPolicy,
    sequence_policy: SequencePolicy,
}

impl<H: ContactHistoryStore, E: ExecutionBackend> CampaignLauncher<H, E> {
    pub fn new(
        validator: PreflightValidator<H>,
        backend: E,
        resolver_policy: ResolverPolicy,
        sequence_policy: SequencePolicy,
    ) -> Self {
        Self {
            validator,
            backend,
            resolver_policy,
            sequence_policy,
        }
    }

    pub async fn prepare(&self, request: &LaunchRequest, prospects: &[Prospect]) -> Result<LaunchPlan> {
        tracing::info!("🚀 Preparing campaign '{}' with {} prospects", request.campaign_name, prospects.len());

        let population = classify_all(prospects);
        let mut selection = request.selection;
        let resolution = selection.refresh(&population, request.accounts, &self.resolver_policy);
        let channel = selection.current();
        tracing::info!(
            "📊 Degrees: {} first, {} 2nd/3rd, {} unknown; channel {}",
            resolution.breakdown.first,
            resolution.breakdown.second_or_third,
            resolution.breakdown.unknown,
            channel
        );

        if let Some(option) = resolution.option(channel) {
            match option.disabled_reason {
                Some(DisabledReason::NotImplemented)
                | Some(DisabledReason::LinkedInNotConnected)
                | Some(DisabledReason::EmailNotConnected) => {
                    return Err(ValidationError::ChannelUnavailable {
                        channel: channel.as_str(),
                    }
                    .into());
                }
                // Pre-flight reports each ineligible prospect individually.
                Some(DisabledReason::NoEligibleProspects) | None => {}
            }
        }

        let sequence = build_sequence(channel, &request.fields, &self.sequence_policy)?;

        let preflight = self
            .validator
            .check(PreflightRequest {
                workspace_id: &request.workspace_id,
                channel,
                prospects,
                campaign_name: Some(&request.campaign_name),
                now: Utc::now(),
            })
            .await?;

        let package = match LaunchPackage::from_preflight(
            &request.workspace_id,
            &request.campaign_name,
            sequence,
            &preflight,
        ) {
            Ok(package) => Some(package),
            Err(OutreachError::NothingToLaunch { blocked }) => {
                tracing::warn!("⚠️ All {} prospects were blocked by pre-flight", blocked);
                None
            }
            Err(e) => return Err(e),
        };

        Ok(LaunchPlan {
            resolution,
            channel,
            preflight,
            package,
        })
    }

    pub async fn launch(&self, plan: &LaunchPlan) -> Result<LaunchReceipt> {
        let package = plan.package.as_ref().ok_or(OutreachError::NothingToLaunch {
            blocked: plan.preflight.blocked.len(),
        })?;
        let receipt = self.backend.submit(package).await?;
        tracing::info!(
            "✅ Launched '{}' as {}: {} prospects accepted",
            package.campaign_name(),
            receipt.launch_id,
            receipt.accepted
        );
        Ok(receipt)
    }

    pub async fn run(&self, request: &LaunchRequest, prospects: &[Prospect]) -> Result<(LaunchPlan, LaunchReceipt)> {
        let plan = self.prepare(request, prospects).await?;
        let receipt = self.launch(&plan).await?;
        Ok((plan, receipt))
    }
}
