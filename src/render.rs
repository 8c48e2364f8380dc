//! Plain-text views printed by the command line.

use std::fmt::Write;

use callops_orchestrator::TicketSummary;
use callops_protocol::{
    format_duration, format_status, CallRecord, DashboardSummary,
};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn created(record: &CallRecord) -> String {
    record
        .created_at
        .map(|t| t.format(TIME_FORMAT).to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// One row per call, newest first as given.
pub fn call_table(records: &[CallRecord]) -> String {
    if records.is_empty() {
        return "No calls yet.\n".to_string();
    }

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<24} {:<20} {:<12} {:<20} {:<12} {:<9} CREATED",
        "ID", "DRIVER", "LOAD", "CONFIGURATION", "STATUS", "DURATION"
    );
    for record in records {
        let _ = writeln!(
            out,
            "{:<24} {:<20} {:<12} {:<20} {:<12} {:<9} {}{}",
            record.id,
            record.driver_name,
            record.load_number,
            record.configuration_name(),
            record.status.label(),
            format_duration(record.duration_ms),
            created(record),
            if record.emergency_detected() { "  [EMERGENCY]" } else { "" },
        );
    }
    out
}

pub fn call_detail(record: &CallRecord) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Call {}", record.id);
    let _ = writeln!(out, "  Driver:        {}", record.driver_name);
    let _ = writeln!(out, "  Load:          {}", record.load_number);
    let _ = writeln!(out, "  Configuration: {}", record.configuration_name());
    let _ = writeln!(out, "  Status:        {}", record.status.label());
    let _ = writeln!(out, "  Duration:      {}", format_duration(record.duration_ms));
    let _ = writeln!(out, "  Created:       {}", created(record));
    if let Some(provider_id) = &record.provider_call_id {
        let _ = writeln!(out, "  Provider id:   {provider_id}");
    }
    if record.emergency_detected() {
        let _ = writeln!(out, "  EMERGENCY DETECTED");
    }

    if let Some(data) = &record.structured_data {
        let _ = writeln!(out, "\nStructured data:");
        let pretty = serde_json::to_string_pretty(data).unwrap_or_else(|_| data.to_string());
        for line in pretty.lines() {
            let _ = writeln!(out, "  {line}");
        }
    }

    match record.transcript.as_deref().filter(|t| !t.trim().is_empty()) {
        Some(transcript) => {
            let _ = writeln!(out, "\nTranscript:");
            for line in transcript.lines() {
                let _ = writeln!(out, "  {line}");
            }
        }
        None if !record.status.is_terminal() => {
            let _ = writeln!(out, "\nTranscript will be available once the call completes.");
        }
        None => {}
    }
    out
}

pub fn dashboard(summary: &DashboardSummary) -> String {
    let stats = &summary.stats;
    let mut out = String::new();
    let _ = writeln!(out, "Total calls:     {}", stats.total_calls);
    let _ = writeln!(out, "Active calls:    {}", stats.active_calls);
    let _ = writeln!(out, "Completed calls: {}", stats.completed_calls);
    let _ = writeln!(out, "Emergencies:     {}", stats.emergencies);

    let _ = writeln!(out, "\nRecent calls:");
    out.push_str(&call_table(&summary.recent_calls));

    let _ = writeln!(out, "\nConfigurations:");
    if summary.configurations.is_empty() {
        let _ = writeln!(out, "  none");
    }
    for config in &summary.configurations {
        let _ = writeln!(out, "  {:<24} {}", config.id, config.name);
    }
    out
}

pub fn ticket(ticket: &TicketSummary) -> String {
    format!(
        "Session:    {}\nStatus:     {}\nCredential: {}\n",
        ticket.session_id,
        format_status(ticket.initial_status.as_deref()),
        ticket.credential_preview,
    )
}
