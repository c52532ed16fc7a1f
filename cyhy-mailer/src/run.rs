use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, bail};
use cyhy_mailer_config::{
    Config, ConfigLoad, ConfigLoader, ConfigLoaderOptions, ConfigOverrides,
    ConfigWarnings, DirectorySource, require_enabled_category,
};
use cyhy_mailer_core::{
    AdhocContent, Audience, AudienceSelector, BroadcastRequest, CategoryDescriptor,
    DispatchEngine, DispatchOptions, InMemoryDirectory, MessageComposer,
    PostgresStakeholderDirectory, RunReport, SmtpMailer, StakeholderDirectory,
    SummaryDelivery, parse_address,
};
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{AdhocArgs, GlobalArgs, RunArgs, SendArgs};

const DEBUG_FILTER: &str =
    "warn,cyhy_mailer=debug,cyhy_mailer_core=debug,cyhy_mailer_config=debug";

pub fn init_tracing(debug: bool) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(
                |_| (if debug { DEBUG_FILTER } else { "warn" }).into(),
            ),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_config(
    global: &GlobalArgs,
    overrides: ConfigOverrides,
) -> anyhow::Result<Config> {
    let ConfigLoad { config, warnings } =
        ConfigLoader::with_options(ConfigLoaderOptions {
            config_path: global.config.clone(),
            env_file: global.env_file.clone(),
            overrides,
        })
        .load()
        .context("failed to load configuration")?;

    log_warnings(&warnings);
    if config.metadata.env_file_loaded {
        debug!("loaded .env file");
    }
    if let Some(path) = &config.metadata.config_path {
        debug!(path = %path.display(), "using configuration file");
    }
    Ok(config)
}

fn log_warnings(warnings: &ConfigWarnings) {
    for warning in &warnings.items {
        match &warning.hint {
            Some(hint) => warn!(message = %warning.message, hint = %hint, "configuration warning"),
            None => warn!(message = %warning.message, "configuration warning"),
        }
    }
}

/// Open the stakeholder directory. Without a configured source an empty
/// directory is used, which is only acceptable when nothing needs lookups.
async fn open_directory(
    config: &Config,
    needs_lookups: bool,
) -> anyhow::Result<Arc<dyn StakeholderDirectory>> {
    match config.directory_source() {
        DirectorySource::File(path) => {
            let directory = InMemoryDirectory::from_json_file(&path)
                .with_context(|| {
                    format!("failed to load stakeholders from {}", path.display())
                })?;
            info!(path = %path.display(), records = directory.len(), "stakeholder file loaded");
            Ok(Arc::new(directory))
        }
        DirectorySource::Database(url) => {
            let directory = PostgresStakeholderDirectory::connect(&url)
                .await
                .context("failed to connect to the stakeholder database")?;
            Ok(Arc::new(directory))
        }
        DirectorySource::None if needs_lookups => bail!(
            "no stakeholder directory configured; set DATABASE_URL or STAKEHOLDER_FILE"
        ),
        DirectorySource::None => Ok(Arc::new(InMemoryDirectory::default())),
    }
}

fn build_engine(
    config: &Config,
    directory: Arc<dyn StakeholderDirectory>,
) -> anyhow::Result<DispatchEngine> {
    let transport = SmtpMailer::new(&config.smtp_settings())
        .context("failed to configure SMTP transport")?;
    let advisors = config
        .load_advisors()
        .context("failed to load region advisor map")?;
    if advisors.is_enabled() {
        debug!(entries = advisors.len(), "region advisor map loaded");
    }

    Ok(DispatchEngine::new(
        directory,
        Arc::new(transport),
        MessageComposer::new(config.composer_settings()),
        advisors,
        DispatchOptions {
            dry_run: config.dry_run,
            batch_size: config.directory.batch_size,
            summary_to: config.summary.to.clone(),
        },
    ))
}

fn needs_directory(descriptors: &[CategoryDescriptor]) -> bool {
    descriptors.iter().any(|descriptor| {
        descriptor.is_enabled()
            && (descriptor.audience == Audience::Directory
                || descriptor.coverage_checked)
    })
}

pub async fn send(global: &GlobalArgs, args: &SendArgs) -> anyhow::Result<RunReport> {
    let config = load_config(global, args.overrides(global))?;
    require_enabled_category(&config, false)?;
    let descriptors = config.category_descriptors()?;

    let directory = open_directory(&config, needs_directory(&descriptors)).await?;
    let mut engine = build_engine(&config, directory)?;
    if config.dry_run {
        info!("dry run: nothing will be sent");
    }

    if let Err(err) = engine.run_categories(&descriptors).await {
        engine.close().await;
        return Err(anyhow::Error::new(err).context("report dispatch stopped"));
    }

    let report = engine.finish().await;
    print_report(&report, &args.run)?;
    Ok(report)
}

pub async fn adhoc(global: &GlobalArgs, args: &AdhocArgs) -> anyhow::Result<RunReport> {
    let config = load_config(global, args.overrides(global))?;

    let audience = AudienceSelector {
        addresses: args.to.clone(),
        all_stakeholders: args.all_stakeholders,
        federal_stakeholders: args.federal_stakeholders,
    };
    if audience.is_empty() {
        bail!("no audience selected; pass --to, --all-stakeholders or --federal-stakeholders");
    }
    for address in &audience.addresses {
        parse_address(address)
            .with_context(|| format!("--to '{address}' is not an email address"))?;
    }

    let content = AdhocContent {
        subject: args.subject.clone(),
        html_body: read_body(&args.html_body)?,
        text_body: read_body(&args.text_body)?,
    };

    let directory =
        open_directory(&config, audience.stakeholder_filter().is_some()).await?;
    let mut engine = build_engine(&config, directory)?;

    if let Err(err) = engine
        .run_broadcast(&BroadcastRequest { content, audience })
        .await
    {
        engine.close().await;
        return Err(anyhow::Error::new(err).context("broadcast stopped"));
    }

    let report = engine.finish().await;
    print_report(&report, &args.run)?;
    Ok(report)
}

pub async fn db_preflight(global: &GlobalArgs) -> anyhow::Result<()> {
    let config = load_config(
        global,
        ConfigOverrides {
            stakeholder_file: global.stakeholder_file.clone(),
            ..ConfigOverrides::default()
        },
    )?;
    let Some(url) = config.database.url.as_deref() else {
        bail!("no database configured; set DATABASE_URL or [database] url");
    };

    let directory = PostgresStakeholderDirectory::connect(url)
        .await
        .context("failed to connect to PostgreSQL for preflight")?;
    let active = directory
        .preflight()
        .await
        .context("database preflight failed")?;
    directory.close().await;

    println!("Database preflight passed: {active} active stakeholders");
    Ok(())
}

fn read_body(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("failed to read message body {}", path.display()))
}

fn print_report(report: &RunReport, args: &RunArgs) -> anyhow::Result<()> {
    if args.json {
        let rendered = serde_json::to_string_pretty(report)
            .context("failed to serialise run report")?;
        println!("{rendered}");
        return Ok(());
    }

    for line in report.summary.lines() {
        println!("{line}");
    }
    let totals = report.summary.totals();
    println!(
        "Out of {} messages, {} were sent, {} skipped, {} failed, {} held back by dry run.",
        totals.attempted, totals.sent, totals.skipped, totals.failed, totals.dry_run
    );
    match &report.summary_email {
        SummaryDelivery::NotConfigured => {}
        SummaryDelivery::SkippedDryRun => println!("Summary email not sent (dry run)."),
        SummaryDelivery::Sent => println!("Summary email sent."),
        SummaryDelivery::Failed(reason) => {
            println!("Summary email failed: {reason}")
        }
    }
    Ok(())
}
