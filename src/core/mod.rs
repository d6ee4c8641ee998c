pub mod delay;
pub mod draft;
pub mod eligibility;
pub mod launch;
pub mod preflight;
pub mod resolver;
pub mod sequence;

pub use crate::core::delay::{Delay, DelayUnit, RawDelay, DEFAULT_DELAY};
pub use crate::core::draft::{recover, DraftManager, DraftSnapshot, DraftState};
pub use crate::core::eligibility::{classify, classify_all, ConnectionDegreeBucket, ProspectEligibility};
pub use crate::core::launch::{CampaignLauncher, LaunchPackage, LaunchPlan, LaunchReceipt, LaunchRequest};
pub use crate::core::preflight::{BlockReason, PreflightOutcome, PreflightValidator, RateLimitPolicy};
pub use crate::core::resolver::{resolve, ChannelSelection, Resolution, ResolverPolicy};
pub use crate::core::sequence::{build_sequence, CampaignSequence, SequenceEditor, SequenceFields, SequencePolicy};
pub use crate::domain::ports::{ContactHistoryStore, DraftStore, ExecutionBackend, ProspectSource, Storage};
pub use crate::utils::error::Result;
