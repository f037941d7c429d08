use clap::{Parser, Subcommand};

/// Watches Upwork for new jobs and forwards the good ones to Slack.
#[derive(Parser, Debug)]
#[command(name = "jobwatch", about = "Upwork job watcher with dedup, AI qualification and Slack delivery")]
pub struct CliArgs {
    /// Config profile; keys resolve as {PROFILE}_{KEY} before {KEY}
    #[arg(long, env = "JOBWATCH_PROFILE", global = true)]
    pub profile: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one fetch → dedup → qualify → notify cycle
    Run {
        /// Keep seen-job state in memory only and skip Slack delivery
        #[arg(long)]
        dry_run: bool,
    },

    /// Run once now, then on every CRON_SCHEDULE fire time until Ctrl-C
    Schedule,

    /// Print what the tracker currently remembers
    Stats,

    /// Authorize against Upwork; without --code, prints the browser URL
    Auth {
        /// Authorization code from the redirect URL
        #[arg(long)]
        code: Option<String>,
    },

    /// Send a connectivity message to the Slack webhook
    TestSlack,

    /// Classify built-in sample jobs and print the verdicts
    TestQualifier,

    /// Print the effective configuration without secrets
    Config,
}
