//! Prompt text for job qualification.

use std::path::Path;

use jobwatch_core::JobPosting;

/// Built-in system prompt describing the three tiers.
pub const DEFAULT_SYSTEM_PROMPT: &str = include_str!("../prompts/qualifier-system.md");

/// Load a replacement system prompt from disk.
pub fn load_system_prompt(path: &Path) -> Result<String, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read prompt at {}: {e}", path.display()))?;
    if content.trim().is_empty() {
        return Err(format!("prompt at {} is empty", path.display()));
    }
    Ok(content)
}

/// Render the per-job user prompt.
pub fn user_prompt(job: &JobPosting) -> String {
    let client_info = match &job.client {
        Some(client) => format!(
            "Client Info:\n- Total Hires: {}\n- Total Jobs Posted: {}\n- Location: {}\n- Reviews: {}",
            client.total_hires.unwrap_or(0),
            client.total_posted_jobs.unwrap_or(0),
            client.country.as_deref().unwrap_or("Unknown"),
            client.total_reviews.unwrap_or(0),
        ),
        None => "No client info available".to_string(),
    };

    format!(
        "Evaluate this Upwork job posting:\n\n\
         Title: {title}\n\n\
         Budget: {budget}\n\n\
         Duration: {duration}\n\n\
         {client_info}\n\n\
         Description:\n{description}\n\n\
         Should this job be accepted? Respond with JSON only.",
        title = job.title,
        budget = job.budget.short_label(),
        duration = job.duration.as_deref().unwrap_or("Not specified"),
        description = job.description.as_deref().unwrap_or("No description provided"),
    )
}
