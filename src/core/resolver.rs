//! Channel recommendation and per-channel availability.
//!
//! [`resolve`] is a pure function of the classified population, the
//! connected accounts and the operator's explicit choice. [`ChannelSelection`]
//! holds the one piece of state: whether the choice is explicit, in which case
//! no later resolution may change it.

use crate::core::eligibility::{DegreeBreakdown, ProspectEligibility};
use crate::domain::model::{AccountConnections, ChannelType};
use serde::{Deserialize, Serialize};

/// Product default; see DESIGN.md before treating it as an invariant.
pub const DEFAULT_MAJORITY_THRESHOLD: f64 = 0.70;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResolverPolicy {
    pub majority_threshold: f64,
}

impl Default for ResolverPolicy {
    fn default() -> Self {
        Self {
            majority_threshold: DEFAULT_MAJORITY_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationReason {
    ExplicitChoice,
    EmailOnlyAccounts,
    NoProspects,
    AllFirstDegree,
    AllSecondOrThird,
    FirstDegreeMajority,
    SecondOrThirdMajority,
    NoClearMajority,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisabledReason {
    NotImplemented,
    NoEligibleProspects,
    LinkedInNotConnected,
    EmailNotConnected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelOption {
    pub channel: ChannelType,
    pub eligible_count: usize,
    pub enabled: bool,
    pub disabled_reason: Option<DisabledReason>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub recommended: Option<ChannelType>,
    pub reason: RecommendationReason,
    pub breakdown: DegreeBreakdown,
    pub options: Vec<ChannelOption>,
}

impl Resolution {
    pub fn option(&self, channel: ChannelType) -> Option<&ChannelOption> {
        self.options.iter().find(|o| o.channel == channel)
    }

    pub fn is_enabled(&self, channel: ChannelType) -> bool {
        self.option(channel).is_some_and(|o| o.enabled)
    }
}

pub fn channel_options(
    population: &[ProspectEligibility],
    accounts: AccountConnections,
) -> Vec<ChannelOption> {
    ChannelType::ALL
        .iter()
        .map(|&channel| {
            let eligible_count = population
                .iter()
                .filter(|p| p.is_eligible_for(channel))
                .count();

            let disabled_reason = if !channel.is_implemented() {
                Some(DisabledReason::NotImplemented)
            } else if eligible_count == 0 {
                Some(DisabledReason::NoEligibleProspects)
            } else if !accounts.supports(channel) {
                Some(match channel {
                    ChannelType::Email => DisabledReason::EmailNotConnected,
                    _ => DisabledReason::LinkedInNotConnected,
                })
            } else {
                None
            };

            ChannelOption {
                channel,
                eligible_count,
                enabled: disabled_reason.is_none(),
                disabled_reason,
            }
        })
        .collect()
}

fn meets(share: f64, threshold: f64) -> bool {
    share + 1e-9 >= threshold
}

fn recommend(
    breakdown: &DegreeBreakdown,
    accounts: AccountConnections,
    explicit: Option<ChannelType>,
    policy: &ResolverPolicy,
) -> (Option<ChannelType>, RecommendationReason) {
    use RecommendationReason::*;

    if explicit.is_some() {
        return (None, ExplicitChoice);
    }
    // Applies regardless of the degree mix: no LinkedIn account, no LinkedIn campaign.
    if !accounts.linkedin && accounts.email {
        return (Some(ChannelType::Email), EmailOnlyAccounts);
    }
    if breakdown.total == 0 {
        return (None, NoProspects);
    }
    if breakdown.first > 0 && breakdown.second_or_third == 0 {
        return (Some(ChannelType::Messenger), AllFirstDegree);
    }
    if breakdown.second_or_third > 0 && breakdown.first == 0 {
        return (Some(ChannelType::Connector), AllSecondOrThird);
    }
    if meets(breakdown.first_share(), policy.majority_threshold) {
        return (Some(ChannelType::Messenger), FirstDegreeMajority);
    }
    if meets(breakdown.second_or_third_share(), policy.majority_threshold) {
        return (Some(ChannelType::Connector), SecondOrThirdMajority);
    }
    (None, NoClearMajority)
}

pub fn resolve(
    population: &[ProspectEligibility],
    accounts: AccountConnections,
    explicit: Option<ChannelType>,
    policy: &ResolverPolicy,
) -> Resolution {
    let breakdown = DegreeBreakdown::of(population);
    let (recommended, reason) = recommend(&breakdown, accounts, explicit, policy);

    tracing::debug!(
        "Resolved channel: {:?} ({:?}) from {} first / {} 2nd-3rd / {} unknown",
        recommended,
        reason,
        breakdown.first,
        breakdown.second_or_third,
        breakdown.unknown
    );

    Resolution {
        recommended,
        reason,
        breakdown,
        options: channel_options(population, accounts),
    }
}

/// The campaign type currently selected in a builder session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSelection {
    current: ChannelType,
    explicit: bool,
}

impl ChannelSelection {
    /// Email when it is the only connected account, connector otherwise.
    pub fn default_for(accounts: AccountConnections) -> Self {
        let current = if !accounts.linkedin && accounts.email {
            ChannelType::Email
        } else {
            ChannelType::Connector
        };
        Self {
            current,
            explicit: false,
        }
    }

    /// A choice carried in from an upstream step counts as explicit.
    pub fn preselected(channel: ChannelType) -> Self {
        Self {
            current: channel,
            explicit: true,
        }
    }

    pub fn choose(&mut self, channel: ChannelType) {
        self.current = channel;
        self.explicit = true;
    }

    pub fn current(&self) -> ChannelType {
        self.current
    }

    pub fn is_explicit(&self) -> bool {
        self.explicit
    }

    pub fn explicit_choice(&self) -> Option<ChannelType> {
        self.explicit.then_some(self.current)
    }

    /// Applies a recommendation unless the operator already chose. Returns
    /// whether the selection changed.
    pub fn apply(&mut self, resolution: &Resolution) -> bool {
        if self.explicit {
            return false;
        }
        match resolution.recommended {
            Some(channel) if channel != self.current => {
                tracing::info!("🎯 Auto-selected {} ({:?})", channel, resolution.reason);
                self.current = channel;
                true
            }
            _ => false,
        }
    }

    pub fn refresh(
        &mut self,
        population: &[ProspectEligibility],
        accounts: AccountConnections,
        policy: &ResolverPolicy,
    ) -> Resolution {
        let resolution = resolve(population, accounts, self.explicit_choice(), policy);
        self.apply(&resolution);
        resolution
    }
}
