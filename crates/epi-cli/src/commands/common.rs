use std::env;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use epi_core::config::SyncConfig;
use epi_core::db::Database;
use epi_core::remote::SupabaseBackend;
use epi_core::services::RecordService;
use epi_core::sync::{PullReport, PushReport, SyncManager, SyncOptions, SyncReport};
use epi_core::{QueueEntry, Record};
use serde_json::{Map, Value};

use crate::error::CliError;

const SUMMARY_CHARS: usize = 60;

pub type CliService = RecordService<SupabaseBackend>;

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> PathBuf {
    cli_db_path
        .or_else(|| env::var_os("EPI_DB_PATH").map(PathBuf::from))
        .unwrap_or_else(default_db_path)
}

pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("epi")
        .join("epi.db")
}

pub fn load_config() -> Result<SyncConfig, CliError> {
    Ok(SyncConfig::from_env()?)
}

pub fn open_service(db_path: &Path) -> Result<CliService, CliError> {
    open_service_with_config(db_path, &load_config()?)
}

pub fn open_service_with_config(
    db_path: &Path,
    config: &SyncConfig,
) -> Result<CliService, CliError> {
    if config.is_configured() {
        tracing::debug!("Remote sync enabled");
    } else {
        tracing::debug!("Running in offline-only mode (no Supabase config)");
    }

    let db = Arc::new(Database::open(db_path)?);
    let remote = Arc::new(SupabaseBackend::new(config.supabase.clone())?);
    let manager = SyncManager::new(db, remote, SyncOptions::from(config));
    Ok(RecordService::new(Arc::new(manager)))
}

pub fn normalize_record_id(id: &str) -> Result<String, CliError> {
    let id = id.trim();
    if id.is_empty() {
        return Err(CliError::EmptyRecordId);
    }
    Ok(id.to_string())
}

/// Parse a record from a JSON object; a missing id is left blank so the
/// service assigns one.
pub fn parse_record(input: &str) -> Result<Record, CliError> {
    let value: Value = serde_json::from_str(input.trim())?;
    let Value::Object(mut object) = value else {
        return Err(CliError::NotAnObject);
    };

    if !matches!(object.get("id"), Some(Value::String(_))) {
        let id = match object.remove("id") {
            Some(Value::Number(number)) => number.to_string(),
            _ => String::new(),
        };
        object.insert("id".to_string(), Value::String(id));
    }
    Ok(Record::from_json(Value::Object(object))?)
}

/// Split `FIELD=VALUE`; the value is JSON when it parses as JSON and a plain
/// string otherwise.
pub fn parse_filter(filter: &str) -> Result<(String, Value), CliError> {
    let Some((field, raw)) = filter.split_once('=') else {
        return Err(CliError::InvalidFilter(filter.to_string()));
    };

    let field = field.trim();
    if field.is_empty() {
        return Err(CliError::InvalidFilter(filter.to_string()));
    }

    let raw = raw.trim();
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((field.to_string(), value))
}

pub fn read_piped_stdin() -> Result<Option<String>, CliError> {
    if io::stdin().is_terminal() {
        return Ok(None);
    }

    let mut input = String::new();
    io::stdin().read_to_string(&mut input)?;
    Ok(Some(input))
}

pub fn format_record_lines(records: &[Record], now: DateTime<Utc>) -> Vec<String> {
    records
        .iter()
        .map(|record| {
            format!(
                "{}  {}  {}",
                record.id,
                format_relative_time(record.updated_at, now),
                record_summary(&record.fields, SUMMARY_CHARS)
            )
        })
        .collect()
}

/// `key=value` pairs of the domain fields, cut to `max_chars`
pub fn record_summary(fields: &Map<String, Value>, max_chars: usize) -> String {
    let summary = fields
        .iter()
        .map(|(key, value)| match value {
            Value::String(text) => format!("{key}={text}"),
            other => format!("{key}={other}"),
        })
        .collect::<Vec<_>>()
        .join(" ");

    if summary.chars().count() <= max_chars {
        summary
    } else {
        let mut truncated = summary
            .chars()
            .take(max_chars.saturating_sub(3))
            .collect::<String>();
        truncated.push_str("...");
        truncated
    }
}

pub fn format_relative_time(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - at).num_seconds().max(0);
    let minutes = seconds / 60;
    let hours = minutes / 60;
    let days = hours / 24;

    if minutes < 1 {
        "just now".to_string()
    } else if hours < 1 {
        format!("{minutes}m ago")
    } else if days < 1 {
        format!("{hours}h ago")
    } else {
        format!("{days}d ago")
    }
}

pub fn format_queue_lines(entries: &[QueueEntry]) -> Vec<String> {
    entries
        .iter()
        .map(|entry| {
            format!(
                "#{} {} {}/{} queued {}",
                entry.entry_id,
                entry.operation,
                entry.collection,
                entry.record_id,
                entry.enqueued_at.to_rfc3339()
            )
        })
        .collect()
}

pub fn format_push_lines(report: &PushReport) -> Vec<String> {
    let mut lines = vec![format!(
        "Pushed {} operations, {} failed",
        report.pushed, report.failed
    )];
    lines.extend(
        report
            .errors
            .iter()
            .map(|error| format!("  #{} {}: {}", error.entry_id, error.record_id, error.message)),
    );
    lines
}

pub fn format_pull_line(report: &PullReport) -> String {
    match &report.error {
        Some(error) => format!("{}: failed ({error})", report.collection),
        None => format!("{}: {} pulled", report.collection, report.pulled),
    }
}

pub fn format_sync_lines(report: &SyncReport) -> Vec<String> {
    let mut lines = format_push_lines(&report.push);
    lines.extend(report.pulls.iter().map(format_pull_line));
    lines.push(format!(
        "Sync {} at {}: {} pushed, {} pulled",
        if report.success() {
            "completed"
        } else {
            "finished with errors"
        },
        report.finished_at.to_rfc3339(),
        report.pushed_total,
        report.pulled_total
    ));
    lines
}
