use clap::Parser;
use outreach_engine::adapters::{
    FileExecutionBackend, FileProspectSource, HttpContactHistory, HttpDraftStore,
    HttpExecutionBackend, InMemoryContactHistory, InMemoryDraftStore,
};
use outreach_engine::core::draft::DraftSnapshot;
use outreach_engine::core::launch::{LaunchPlan, LaunchRequest};
use outreach_engine::core::resolver::ChannelSelection;
use outreach_engine::domain::model::ChannelType;
use outreach_engine::domain::ports::{
    ContactHistoryStore, DraftStore, ExecutionBackend, ProspectSource, Storage,
};
use outreach_engine::utils::error::{ErrorSeverity, OutreachError};
use outreach_engine::utils::{logger, validation::Validate};
use outreach_engine::{
    CampaignLauncher, CliConfig, DraftManager, LocalStorage, OutreachConfig, PreflightValidator,
};

const PREFLIGHT_REPORT_FILE: &str = "preflight_report.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 初始化日誌
    logger::init_logger(cli.verbose, logger::LogFormat::from_flag(cli.json_logs));

    tracing::info!("Starting outreach-engine CLI");
    tracing::debug!("CLI config: {:?}", cli);

    if let Err(e) = run(&cli).await {
        tracing::error!(
            "❌ Campaign run failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());

        // 根據錯誤嚴重程度決定退出碼
        let exit_code = match e.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };
        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }

    Ok(())
}

async fn run(cli: &CliConfig) -> outreach_engine::Result<()> {
    // 驗證配置
    cli.validate()?;
    let config = OutreachConfig::from_file(&cli.config)?;
    config.validate()?;

    let source = FileProspectSource::new(
        LocalStorage::new(""),
        cli.prospects.clone(),
        config.import.assume_approved,
    )?;
    let prospects = source.load_prospects().await?;

    let selection = match &cli.channel {
        Some(raw) => {
            let channel: ChannelType = raw.parse().map_err(|reason| OutreachError::InvalidConfigValueError {
                field: "channel".to_string(),
                value: raw.clone(),
                reason,
            })?;
            ChannelSelection::preselected(channel)
        }
        None => config.channel_selection()?,
    };

    let request = LaunchRequest {
        workspace_id: config.campaign.workspace_id.clone(),
        campaign_name: config.campaign.name.clone(),
        accounts: config.accounts,
        selection,
        fields: config.campaign.sequence.clone(),
    };
    let output = LocalStorage::new(cli.output.clone());

    match config.api_client() {
        Some(api) => {
            tracing::info!("📡 Using remote collaborators");
            let launcher = CampaignLauncher::new(
                PreflightValidator::new(HttpContactHistory::new(api.clone()), config.rate_limit_policy()),
                HttpExecutionBackend::new(api.clone()),
                config.resolver_policy(),
                config.sequence_policy(),
            );
            let drafts = DraftManager::new(HttpDraftStore::new(api), request.workspace_id.clone())
                .with_debounce(config.autosave_debounce());
            execute(cli, &launcher, &drafts, &request, &prospects, &output).await
        }
        None => {
            tracing::warn!("⚠️ No [endpoints] configured: using empty contact history and a file launch backend");
            let launcher = CampaignLauncher::new(
                PreflightValidator::new(InMemoryContactHistory::default(), config.rate_limit_policy()),
                FileExecutionBackend::new(output.clone()),
                config.resolver_policy(),
                config.sequence_policy(),
            );
            let drafts = DraftManager::new(InMemoryDraftStore::default(), request.workspace_id.clone())
                .with_debounce(config.autosave_debounce());
            execute(cli, &launcher, &drafts, &request, &prospects, &output).await
        }
    }
}

async fn execute<H, E, D>(
    cli: &CliConfig,
    launcher: &CampaignLauncher<H, E>,
    drafts: &DraftManager<D>,
    request: &LaunchRequest,
    prospects: &[outreach_engine::domain::model::Prospect],
    output: &LocalStorage,
) -> outreach_engine::Result<()>
where
    H: ContactHistoryStore,
    E: ExecutionBackend,
    D: DraftStore + 'static,
{
    let plan = launcher.prepare(request, prospects).await?;

    let saved = drafts
        .force_save(DraftSnapshot {
            name: request.campaign_name.clone(),
            campaign_type: plan.channel,
            sequence: request.fields.clone(),
            prospect_ids: prospects.iter().map(|p| p.id.clone()).collect(),
            current_step: 0,
        })
        .await;
    let draft_id = match saved {
        Ok(id) => id,
        // 衝突時保留最新內容
        Err(OutreachError::DraftConflict { returned, .. }) => returned,
        Err(e) => return Err(e),
    };
    tracing::debug!("Draft {} holds the campaign until launch", draft_id);

    let report = serde_json::to_vec_pretty(&plan)?;
    output.write_file(PREFLIGHT_REPORT_FILE, &report).await?;
    print_report(&plan);

    if cli.dry_run {
        println!("🧪 Dry run: nothing launched. Report: {}/{}", cli.output, PREFLIGHT_REPORT_FILE);
        return Ok(());
    }

    let receipt = launcher.launch(&plan).await?;
    drafts.discard().await?;

    println!(
        "✅ Launched '{}' ({}): {} prospects handed off",
        request.campaign_name, receipt.launch_id, receipt.accepted
    );
    if let Some(location) = receipt.location {
        println!("📁 Package: {}", location);
    }
    Ok(())
}

fn print_report(plan: &LaunchPlan) {
    let summary = &plan.preflight.summary;
    println!("📊 Channel: {} ({:?})", plan.channel, plan.resolution.reason);
    for option in &plan.resolution.options {
        match option.disabled_reason {
            Some(reason) => println!("   {:<13} {:>4} eligible  disabled: {:?}", option.channel.as_str(), option.eligible_count, reason),
            None => println!("   {:<13} {:>4} eligible", option.channel.as_str(), option.eligible_count),
        }
    }
    println!(
        "🔍 Pre-flight: {} total, {} can proceed, {} blocked",
        summary.total, summary.can_proceed, summary.blocked
    );
    for blocked in &plan.preflight.blocked {
        println!("   ⛔ {} {}: {}", blocked.prospect.id, blocked.reason.as_str(), blocked.detail);
    }
    if let Some(status) = &plan.preflight.rate_limit_status {
        println!(
            "⏱️ Sent today {}/{}, this week {}/{}{}",
            status.daily_used,
            status.daily_limit.map_or("-".to_string(), |l| l.to_string()),
            status.weekly_used,
            status.weekly_limit.map_or("-".to_string(), |l| l.to_string()),
            if status.batch_fits { "" } else { " (batch exceeds remaining capacity)" }
        );
    }
}
