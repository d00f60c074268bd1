use crate::policy::{ApplyOutcome, DeleteOutcome, DeviceSummary, PolicyListing, SaveOutcome};
use crate::settings::{PowerSettings, SectionSettings};
use chrono::NaiveDateTime;
use colored::Colorize;
use serde::Serialize;

const LABEL_W: usize = 14;

/// `YYYY-MM-DD` part of a stored timestamp.
pub fn date_part(ts: &NaiveDateTime) -> String {
    ts.format("%Y-%m-%d").to_string()
}

fn last_applied_label(ts: Option<&NaiveDateTime>) -> String {
    ts.map(date_part).unwrap_or_else(|| "Never".to_string())
}

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_saved(outcome: &SaveOutcome) {
    let verb = if outcome.created { "Saved" } else { "Updated" };
    println!(
        "{} {} policy '{}' for device: {}",
        "✓".green(),
        verb,
        outcome.policy_name.bold(),
        outcome.device_name
    );
    println!("  {} {}", "Device ID:".dimmed(), outcome.device_id);
}

pub fn print_applied(outcome: &ApplyOutcome) {
    if outcome.dry_run {
        println!(
            "{} policy '{}' for device: {}",
            "Would apply".yellow().bold(),
            outcome.policy_name.bold(),
            outcome.device_name
        );
        for cmd in &outcome.planned {
            println!("  {} {}", ">>".cyan(), cmd);
        }
        if outcome.planned.is_empty() {
            println!("  {}", "(policy has no settings)".dimmed());
        }
        println!("{}", "Dry run complete. No changes applied.".yellow());
        return;
    }

    println!(
        "{} Applied policy '{}' for device: {}",
        "✓".green(),
        outcome.policy_name.bold(),
        outcome.device_name
    );
}

pub fn print_deleted(outcome: &DeleteOutcome) {
    println!("{} Deleted policy '{}'", "✓".green(), outcome.policy_name.bold());
}

fn print_section(settings: &SectionSettings, indent: usize) {
    let pad = " ".repeat(indent);
    for (key, value) in settings {
        println!("{}{}: {}", pad, key, value);
    }
}

pub fn print_policy_listing(listing: &PolicyListing) {
    println!();
    println!("{} {}", "Device:".bold(), listing.device_name);
    println!("{} {}", "ID:".dimmed(), listing.device_id);
    println!();

    if listing.policies.is_empty() {
        println!("{}", "No policies saved yet".yellow());
        return;
    }

    println!("{}", "Saved policies:".bold());
    for policy in &listing.policies {
        let snap = &policy.snapshot;
        println!();
        println!("  • {}", policy.name.green().bold());
        println!(
            "    {}{}",
            format!("{:<w$}", "Created:", w = LABEL_W).dimmed(),
            date_part(&snap.created_at)
        );
        println!(
            "    {}{}",
            format!("{:<w$}", "Last applied:", w = LABEL_W).dimmed(),
            last_applied_label(snap.last_applied.as_ref())
        );
        if let Some(battery) = &snap.settings.battery {
            println!("    {}", "Battery settings:".dimmed());
            print_section(battery, 6);
        }
    }
}

pub fn print_devices(devices: &[DeviceSummary]) {
    if devices.is_empty() {
        println!("{}", "No devices found".yellow());
        return;
    }

    println!();
    println!("{}", "All devices with saved policies:".bold());
    println!();
    for device in devices {
        let marker = if device.current {
            format!(" {}", "(current)".cyan())
        } else {
            String::new()
        };
        println!("• {}{}", device.device_name.bold(), marker);
        println!("  {} {}", "ID:".dimmed(), device.device_id);
        println!("  {} {}", "Policies:".dimmed(), device.policy_names.join(", "));
        println!();
    }
}

pub fn print_current(settings: &PowerSettings) {
    println!();
    println!("{}", "Current power settings:".bold());
    println!();
    if settings.is_empty() {
        println!("  {}", "(no settings reported)".dimmed());
        return;
    }
    for (source, section) in settings.sections() {
        println!("  {}:", source.to_string().cyan().bold());
        print_section(section, 4);
    }
}
