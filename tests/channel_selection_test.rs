use outreach_engine::adapters::{InMemoryContactHistory, InMemoryExecutionBackend};
use outreach_engine::core::eligibility::classify_all;
use outreach_engine::core::launch::LaunchRequest;
use outreach_engine::core::resolver::{resolve, ChannelSelection, RecommendationReason};
use outreach_engine::core::sequence::SequenceFields;
use outreach_engine::domain::model::{AccountConnections, ChannelType, Prospect};
use outreach_engine::{CampaignLauncher, OutreachConfig, PreflightValidator};

const CONFIG: &str = r#"
[campaign]
name = "Q4 reconnect"
workspace_id = "ws-9"
lead = "Hey, long time!"

[accounts]
linkedin = true
email = true
"#;

fn prospects(degrees: &[&str]) -> Vec<Prospect> {
    degrees
        .iter()
        .enumerate()
        .map(|(i, degree)| {
            Prospect::new(format!("p{}", i))
                .approved()
                .with_linkedin_url(format!("https://linkedin.com/in/p{}", i))
                .with_connection_degree(*degree)
        })
        .collect()
}

fn launcher(config: &OutreachConfig) -> CampaignLauncher<InMemoryContactHistory, InMemoryExecutionBackend> {
    CampaignLauncher::new(
        PreflightValidator::new(InMemoryContactHistory::default(), config.rate_limit_policy()),
        InMemoryExecutionBackend::default(),
        config.resolver_policy(),
        config.sequence_policy(),
    )
}

fn request(config: &OutreachConfig, selection: ChannelSelection) -> LaunchRequest {
    LaunchRequest {
        workspace_id: config.campaign.workspace_id.clone(),
        campaign_name: config.campaign.name.clone(),
        accounts: config.accounts,
        selection,
        fields: config.campaign.sequence.clone(),
    }
}

#[test]
fn test_two_of_three_first_degree_keeps_default() {
    let accounts = AccountConnections {
        linkedin: true,
        email: false,
    };
    let population = classify_all(&prospects(&["1st", "1st", "2nd"]));
    let mut selection = ChannelSelection::default_for(accounts);

    let resolution = selection.refresh(&population, accounts, &Default::default());

    assert_eq!(resolution.recommended, None);
    assert_eq!(resolution.reason, RecommendationReason::NoClearMajority);
    assert_eq!(selection.current(), ChannelType::Connector);
}

#[tokio::test]
async fn test_first_degree_majority_selects_messenger() {
    let config = OutreachConfig::from_toml_str(CONFIG).unwrap();
    let mut degrees = vec!["1st"; 9];
    degrees.push("2nd");
    let prospects = prospects(&degrees);

    let plan = launcher(&config)
        .prepare(&request(&config, config.channel_selection().unwrap()), &prospects)
        .await
        .unwrap();

    assert_eq!(plan.resolution.reason, RecommendationReason::FirstDegreeMajority);
    assert_eq!(plan.channel, ChannelType::Messenger);
    assert_eq!(plan.preflight.summary.can_proceed, 9);
    assert_eq!(plan.preflight.blocked[0].prospect.id, "p9");
}

#[tokio::test]
async fn test_configured_channel_is_never_overridden() {
    let config = OutreachConfig::from_toml_str(&CONFIG.replace(
        "workspace_id = \"ws-9\"",
        "workspace_id = \"ws-9\"\nchannel = \"connector\"",
    ))
    .unwrap();
    let selection = config.channel_selection().unwrap();
    assert!(selection.is_explicit());

    let prospects = prospects(&["1st", "1st", "1st", "3rd"]);
    let plan = launcher(&config)
        .prepare(&request(&config, selection), &prospects)
        .await
        .unwrap();

    assert_eq!(plan.resolution.reason, RecommendationReason::ExplicitChoice);
    assert_eq!(plan.channel, ChannelType::Connector);
    assert_eq!(plan.preflight.valid_ids(), vec!["p3".to_string()]);
}

#[test]
fn test_majority_threshold_is_configurable() {
    let config = OutreachConfig::from_toml_str(&format!("{}\n[policy]\nmajority_threshold = 0.6\n", CONFIG)).unwrap();
    let population = classify_all(&prospects(&["1st", "1st", "2nd"]));

    let resolution = resolve(&population, config.accounts, None, &config.resolver_policy());
    assert_eq!(resolution.recommended, Some(ChannelType::Messenger));
    assert_eq!(resolution.reason, RecommendationReason::FirstDegreeMajority);
}

#[test]
fn test_unset_sequence_is_empty() {
    let config = OutreachConfig::from_toml_str(
        "[campaign]\nname = \"Empty\"\nworkspace_id = \"ws-9\"\n",
    )
    .unwrap();
    assert_eq!(config.campaign.sequence, SequenceFields::default());
    assert!(config.campaign.sequence.is_empty());
}
