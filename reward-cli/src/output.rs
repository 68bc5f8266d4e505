//! Output Formatting
//!
//! Human-readable renderings of API responses. `--format json` always
//! prints the raw response.

use crate::commands::OutputFormat;
use reward_api::{HealthResponse, PayoutJob};
use reward_core::{Campaign, SubmissionStats, SubmissionView};
use reward_engine::{Balance, PayoutReport, ReconcileReport, SimulationReport};
use serde::Serialize;

/// Format and print data based on output format
pub fn print_output<T: Serialize>(data: &T, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(data),
        // No table layout for generic responses
        OutputFormat::Table | OutputFormat::Plain => print_json(data),
    }
}

fn print_json<T: Serialize>(data: &T) {
    match serde_json::to_string_pretty(data) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error formatting JSON: {}", e),
    }
}

pub fn print_health(health: &HealthResponse, format: OutputFormat) {
    if format == OutputFormat::Json {
        return print_json(health);
    }
    println!("Reward Service Health");
    println!("=====================");
    print_row("Status:", &health.status);
    print_row("Version:", &health.version);
    print_row("Uptime:", &format!("{}s", health.uptime_secs));
    print_row("Storage:", &health.storage);
    if let Some(chain_id) = &health.chain_id {
        print_row("Chain:", chain_id);
    }
    println!();
    println!("Components:");
    for component in &health.components {
        print!("  - {}: {}", component.name, component.status);
        if let Some(msg) = &component.message {
            print!(" ({})", msg);
        }
        println!();
    }
}

pub fn print_stats(stats: &SubmissionStats, format: OutputFormat) {
    if format == OutputFormat::Json {
        return print_json(stats);
    }
    println!("Submission Statistics");
    println!("=====================");
    print_row("Total:", &stats.total.to_string());
    print_row("Pending:", &stats.pending.to_string());
    print_row("Eligible:", &stats.eligible.to_string());
    print_row("Winners:", &stats.winners.to_string());
    print_row("Paid:", &stats.paid.to_string());
    print_row("Rejected:", &stats.rejected.to_string());
}

pub fn print_campaigns(campaigns: &[Campaign], format: OutputFormat) {
    if format == OutputFormat::Json {
        return print_json(&campaigns);
    }
    if campaigns.is_empty() {
        println!("No campaigns.");
        return;
    }
    println!(
        "{:<6} {:<28} {:>12} {:>8} {:<6}",
        "ID", "NAME", "REWARD", "WINNERS", "ACTIVE"
    );
    print_separator();
    for c in campaigns {
        println!(
            "{:<6} {:<28} {:>12} {:>8} {:<6}",
            c.id,
            truncate(&c.name, 28),
            c.reward_amount,
            c.max_winners,
            if c.is_active { "yes" } else { "no" }
        );
    }
}

pub fn print_campaign(campaign: &Campaign, format: OutputFormat) {
    if format == OutputFormat::Json {
        return print_json(campaign);
    }
    print_row("ID:", &campaign.id.to_string());
    print_row("Name:", &campaign.name);
    print_row("Reward:", &campaign.reward_amount.to_string());
    print_row("Max winners:", &campaign.max_winners.to_string());
    print_row("Active:", &campaign.is_active.to_string());
    let t = &campaign.thresholds;
    print_row(
        "Thresholds:",
        &format!(
            "{} views, {} likes, {} comments, {} shares",
            t.min_views, t.min_likes, t.min_comments, t.min_shares
        ),
    );
}

pub fn print_submissions(rows: &[SubmissionView], format: OutputFormat) {
    if format == OutputFormat::Json {
        return print_json(&rows);
    }
    if rows.is_empty() {
        println!("No submissions.");
        return;
    }
    println!(
        "{:<6} {:<20} {:<9} {:>10} {:>8} {:<18}",
        "ID", "CAMPAIGN", "STATUS", "VIEWS", "LIKES", "CONTENT"
    );
    print_separator();
    for row in rows {
        let s = &row.submission;
        println!(
            "{:<6} {:<20} {:<9} {:>10} {:>8} {:<18}",
            s.id,
            truncate(&row.campaign_name, 20),
            s.status,
            s.metrics.views,
            s.metrics.likes,
            s.content_id
        );
    }
}

pub fn print_balance(balance: &Balance, format: OutputFormat) {
    if format == OutputFormat::Json {
        return print_json(balance);
    }
    print_row("Treasury:", &balance.address);
    print_row("Balance:", &balance.balance);
    print_row("Raw:", &balance.raw);
}

pub fn print_payout(report: &PayoutReport, format: OutputFormat) {
    if format == OutputFormat::Json {
        return print_json(report);
    }
    println!("{}", report.message);
    print_separator();
    for item in &report.results {
        let outcome = match (&item.tx_reference, &item.error) {
            (Some(tx), _) if item.success => format!("paid {}", tx),
            (_, Some(err)) => format!("failed: {}", err),
            _ => "failed".to_string(),
        };
        println!(
            "{:<6} {:>12} {:<20} {}",
            item.id,
            item.amount,
            truncate(&item.recipient, 20),
            outcome
        );
    }
    print_separator();
    print_row("Successful:", &report.successful.to_string());
    print_row("Failed:", &report.failed.to_string());
}

pub fn print_simulation(report: &SimulationReport, format: OutputFormat) {
    if format == OutputFormat::Json {
        return print_json(report);
    }
    for item in &report.items {
        println!("{:<6} {:>12} {}", item.id, item.amount, item.recipient);
    }
    print_separator();
    print_row("Count:", &report.count.to_string());
    print_row("Total:", &report.total_amount);
}

pub fn print_reconcile(report: &ReconcileReport, format: OutputFormat) {
    if format == OutputFormat::Json {
        return print_json(report);
    }
    print_row("Checked:", &report.checked.to_string());
    print_row("Matched:", &report.matches.len().to_string());
    for m in &report.matches {
        println!(
            "  {:<6} {:<14} {} {}",
            m.submission_id,
            format!("{:?}", m.source),
            m.tx_reference,
            if m.repaired { "(repaired)" } else { "" }
        );
    }
    if !report.unmatched.is_empty() {
        let ids: Vec<String> = report.unmatched.iter().map(|id| id.to_string()).collect();
        print_row("Unmatched:", &ids.join(","));
    }
}

pub fn print_job(job: &PayoutJob, format: OutputFormat) {
    if format == OutputFormat::Json {
        return print_json(job);
    }
    print_row("Job:", &job.job_id);
    print_row("Status:", &format!("{:?}", job.status));
    print_row("Requested:", &job.requested.to_string());
    print_row("Started:", &job.started_at.to_rfc3339());
    if let Some(finished) = job.finished_at {
        print_row("Finished:", &finished.to_rfc3339());
    }
    if let Some(error) = &job.error {
        print_row("Error:", error);
    }
    if let Some(report) = &job.report {
        println!();
        print_payout(report, format);
    }
}

/// Print success message
pub fn print_success(message: &str) {
    println!("{}", message);
}

/// Print warning message
pub fn print_warning(message: &str) {
    eprintln!("Warning: {}", message);
}

/// Print a table row
pub fn print_row(key: &str, value: &str) {
    println!("{:<14} {}", key, value);
}

/// Print a separator line
pub fn print_separator() {
    println!("{}", "-".repeat(72));
}

fn truncate(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        value.to_string()
    } else {
        let mut out: String = value.chars().take(width.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}
