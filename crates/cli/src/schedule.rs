//! Cron-driven repetition of [`Runner::run_once`].
//!
//! Runs once immediately, then sleeps until each upcoming fire time (UTC).
//! A missed fire time is not caught up: the next one is computed after the
//! run completes.

use std::str::FromStr;

use anyhow::{Context, Result};
use chrono::Utc;
use cron::Schedule;
use tracing::{error, info, warn};

use crate::runner::{RunError, Runner};

/// Parse a cron expression, auto-prepending "0 " for 5-field expressions.
///
/// The `cron` crate requires 6 fields (sec min hr dom mon dow), but users
/// typically write 5-field cron (min hr dom mon dow).
pub fn parse_cron(expr: &str) -> Result<Schedule, cron::error::Error> {
    let parts: Vec<&str> = expr.split_whitespace().collect();
    if parts.len() == 5 {
        Schedule::from_str(&format!("0 {}", expr))
    } else {
        Schedule::from_str(expr)
    }
}

/// Friendly wording for common expressions.
pub fn describe_schedule(expr: &str) -> String {
    let known = match expr.trim() {
        "0 */6 * * *" => Some("every 6 hours"),
        "0 */3 * * *" => Some("every 3 hours"),
        "0 */1 * * *" | "0 * * * *" => Some("every hour"),
        "*/30 * * * *" => Some("every 30 minutes"),
        "*/15 * * * *" => Some("every 15 minutes"),
        "0 9 * * *" => Some("daily at 9:00 AM UTC"),
        "0 9,15 * * *" => Some("daily at 9:00 AM and 3:00 PM UTC"),
        "0 9 * * 1-5" => Some("weekdays at 9:00 AM UTC"),
        _ => None,
    };
    match known {
        Some(text) => text.to_string(),
        None => format!("on cron schedule: {expr}"),
    }
}

/// Loop until Ctrl-C, or until a run finishes needing re-authorization.
pub async fn run_scheduler(runner: &mut Runner, expr: &str) -> Result<()> {
    let schedule = parse_cron(expr).with_context(|| format!("invalid CRON_SCHEDULE '{expr}'"))?;
    info!(cron = %expr, schedule = %describe_schedule(expr), "scheduler started");

    loop {
        if let Err(e) = runner.run_once().await.check_auth() {
            error!("authentication required: run `jobwatch auth`, then restart the scheduler");
            return Err(e.into());
        }

        let Some(next) = schedule.upcoming(Utc).next() else {
            warn!(cron = %expr, "schedule has no upcoming fire time, stopping");
            return Ok(());
        };
        let wait = (next - Utc::now()).to_std().unwrap_or_default();
        info!(next_run = %next, "waiting for next scheduled run (Ctrl-C to stop)");

        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            _ = shutdown_signal() => {
                info!("scheduler stopped");
                return Ok(());
            }
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
