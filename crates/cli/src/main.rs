mod cli;
mod runner;
mod samples;
mod schedule;

use std::collections::HashMap;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{info, warn};

use jobwatch_core::config::{load_dotenv, Config};
use jobwatch_ingest::OAuthClient;
use jobwatch_llm::Qualifier;
use jobwatch_notify::{Notifier, SlackNotifier};
use jobwatch_tracker::{JobTracker, JsonFileStore};

use crate::cli::{CliArgs, Command};
use crate::runner::Runner;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    load_dotenv();
    let args = CliArgs::parse();
    let config = match args.profile.as_deref() {
        Some(profile) => Config::for_profile(profile),
        None => Config::from_env(),
    };

    match args.command {
        Command::Run { dry_run } => {
            config.log_summary();
            let mut runner = Runner::from_config(&config, dry_run)?;
            let summary = runner.run_once().await;
            if dry_run {
                info!(tracked = runner.tracker().len(), "dry run, snapshot file left untouched");
            } else if !summary.persisted {
                warn!("run finished but seen-job state is only in memory");
            }
            println!("{}", serde_json::to_string_pretty(&summary)?);
            summary.check_auth()?;
        }

        Command::Schedule => {
            config.log_summary();
            if !config.marketplace.has_credentials() {
                bail!("UPWORK_API_KEY and UPWORK_API_SECRET must be set");
            }
            if !config.marketplace.has_tokens() {
                bail!("missing marketplace tokens, run `jobwatch auth` first");
            }
            let mut runner = Runner::from_config(&config, false)?;
            schedule::run_scheduler(&mut runner, &config.scheduler.cron).await?;
        }

        Command::Stats => {
            let tracker = JobTracker::new(Box::new(JsonFileStore::new(&config.tracker.snapshot_path)));
            println!("{}", serde_json::to_string_pretty(&tracker.stats())?);
        }

        Command::Auth { code } => {
            let client = OAuthClient::from_config(&config.marketplace);
            match code {
                Some(code) => {
                    client
                        .exchange_code(&code)
                        .await
                        .context("authorization code exchange failed")?;
                    println!(
                        "Tokens saved to {}. Start watching with `jobwatch schedule`.",
                        config.marketplace.env_file.display()
                    );
                }
                None => {
                    let url = client.authorize_url()?;
                    println!("1. Open this URL and approve access:\n\n   {url}\n");
                    println!("2. Copy the `code` parameter from the redirect URL.");
                    println!("3. Run: jobwatch auth --code <CODE>");
                }
            }
        }

        Command::TestSlack => {
            let Some(notifier) = SlackNotifier::from_config(&config.slack)? else {
                bail!("SLACK_WEBHOOK_URL is not set");
            };
            notifier.test().await.context("Slack test notification failed")?;
            println!("Test notification sent to Slack.");
        }

        Command::TestQualifier => test_qualifier(&config).await?,

        Command::Config => {
            println!("{}", serde_json::to_string_pretty(&config.redacted_summary())?);
        }
    }

    Ok(())
}

async fn test_qualifier(config: &Config) -> Result<()> {
    let qualifier = Qualifier::from_config(&config.qualifier);
    if !qualifier.is_enabled() {
        warn!("qualifier is not configured; every sample will come back unvetted");
    }

    let samples = samples::sample_jobs();
    let expected: HashMap<String, u8> = samples.iter().map(|(job, tier)| (job.id.clone(), *tier)).collect();
    let jobs = samples.into_iter().map(|(job, _)| job).collect();

    let report = qualifier.qualify_jobs(jobs).await;
    let mut matches = 0;
    for verdict in report.qualified.iter().chain(&report.rejected) {
        let want = expected.get(&verdict.job.id).copied().unwrap_or_default();
        let hit = verdict.tier.as_number() == want;
        if hit {
            matches += 1;
        }
        println!(
            "{} {}\n   got {}, expected Tier {}\n   {}",
            if hit { "✓" } else { "✗" },
            verdict.job.title,
            verdict.tier,
            want,
            verdict.reasoning.as_deref().unwrap_or("-"),
        );
    }

    info!(matches, total = report.stats.total, "qualifier test finished");
    println!("\n{}", serde_json::to_string_pretty(&report.stats)?);
    Ok(())
}
