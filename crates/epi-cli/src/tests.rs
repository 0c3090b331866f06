use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use epi_core::config::SyncConfig;
use epi_core::sync::{EntryError, PullReport, PushReport};
use epi_core::{Collection, Record, SyncOperation};
use pretty_assertions::assert_eq;
use serde_json::json;

use crate::cli::CompletionShell;
use crate::commands::common::{
    format_pull_line, format_push_lines, format_record_lines, format_relative_time,
    normalize_record_id, open_service_with_config, parse_filter, parse_record, record_summary,
};
use crate::commands::completions::render_completions;
use crate::commands::status::{collect_status, format_status_lines, pending_entries};
use crate::commands::watch::resolve_interval;
use crate::error::CliError;

fn offline_service(dir: &tempfile::TempDir) -> crate::commands::common::CliService {
    open_service_with_config(&dir.path().join("epi.db"), &SyncConfig::default()).unwrap()
}

#[test]
fn parse_record_reads_object_with_id() {
    let record = parse_record(r#"{"id": "EST-001", "estoqueAtual": 178}"#).unwrap();
    assert_eq!(record.id, "EST-001");
    assert_eq!(record.field("estoqueAtual"), Some(&json!(178)));
}

#[test]
fn parse_record_leaves_missing_id_blank() {
    let record = parse_record(r#"{"nome": "Luva"}"#).unwrap();
    assert_eq!(record.id, "");
}

#[test]
fn parse_record_stringifies_numeric_id() {
    let record = parse_record(r#"{"id": 42}"#).unwrap();
    assert_eq!(record.id, "42");
}

#[test]
fn parse_record_rejects_non_objects() {
    assert!(matches!(parse_record("[1, 2]"), Err(CliError::NotAnObject)));
    assert!(matches!(
        parse_record("not json"),
        Err(CliError::Serialization(_))
    ));
}

#[test]
fn parse_filter_prefers_json_values() {
    assert_eq!(
        parse_filter("estoqueAtual=178").unwrap(),
        ("estoqueAtual".to_string(), json!(178))
    );
    assert_eq!(
        parse_filter("status = ativo").unwrap(),
        ("status".to_string(), json!("ativo"))
    );
    assert!(parse_filter("status").is_err());
    assert!(parse_filter("=ativo").is_err());
}

#[test]
fn normalize_record_id_trims_and_rejects_empty() {
    assert_eq!(normalize_record_id("  EST-001 ").unwrap(), "EST-001");
    assert!(matches!(
        normalize_record_id("   "),
        Err(CliError::EmptyRecordId)
    ));
}

#[test]
fn format_relative_time_units() {
    let now = Utc::now();
    assert_eq!(format_relative_time(now - ChronoDuration::seconds(30), now), "just now");
    assert_eq!(format_relative_time(now - ChronoDuration::minutes(2), now), "2m ago");
    assert_eq!(format_relative_time(now - ChronoDuration::hours(2), now), "2h ago");
    assert_eq!(format_relative_time(now - ChronoDuration::days(3), now), "3d ago");
    assert_eq!(format_relative_time(now + ChronoDuration::hours(1), now), "just now");
}

#[test]
fn record_summary_truncates_long_content() {
    let record = Record::new("forn-01")
        .with_field("nome", "Protege EPI Distribuidora de Equipamentos de Segurança")
        .with_field("telefone", "(11) 99999-0000");

    let summary = record_summary(&record.fields, 20);
    assert_eq!(summary.chars().count(), 20);
    assert!(summary.ends_with("..."));
}

#[test]
fn format_record_lines_shows_id_and_age() {
    let now = Utc::now();
    let mut record = Record::new("PRZ-001").with_field("descricao", "Troca de luvas");
    record.updated_at = now - ChronoDuration::minutes(5);

    assert_eq!(
        format_record_lines(&[record], now),
        vec!["PRZ-001  5m ago  descricao=Troca de luvas".to_string()]
    );
}

#[test]
fn push_lines_list_failed_entries() {
    let report = PushReport {
        pushed: 2,
        failed: 1,
        errors: vec![EntryError {
            entry_id: 3,
            record_id: "EST-002".to_string(),
            message: "Remote call timed out after 15s".to_string(),
        }],
    };

    assert_eq!(
        format_push_lines(&report),
        vec![
            "Pushed 2 operations, 1 failed".to_string(),
            "  #3 EST-002: Remote call timed out after 15s".to_string(),
        ]
    );
}

#[test]
fn pull_line_reports_error() {
    let report = PullReport {
        collection: Collection::Prazos,
        pulled: 0,
        error: Some("offline".to_string()),
    };
    assert_eq!(format_pull_line(&report), "prazos: failed (offline)");
}

#[test]
fn resolve_interval_rejects_zero() {
    let configured = Duration::from_secs(60);
    assert!(matches!(
        resolve_interval(Some(0), configured),
        Err(CliError::InvalidInterval)
    ));
    assert_eq!(
        resolve_interval(Some(5), configured).unwrap(),
        Duration::from_secs(5)
    );
    assert_eq!(resolve_interval(None, configured).unwrap(), configured);
}

#[test]
fn completions_name_the_binary() {
    let script = String::from_utf8(render_completions(CompletionShell::Bash)).unwrap();
    assert!(script.contains("epi"));
}

#[test]
fn offline_writes_show_up_in_status_and_queue() {
    let dir = tempfile::tempdir().unwrap();
    let service = offline_service(&dir);

    service
        .upsert(Collection::Estoque, parse_record(r#"{"id": "EST-001"}"#).unwrap())
        .unwrap();
    service.remove(Collection::Estoque, "EST-001").unwrap();
    service
        .upsert(Collection::Prazos, parse_record(r#"{"descricao": "x"}"#).unwrap())
        .unwrap();

    let status = collect_status(&service).unwrap();
    assert!(!status.remote_configured);
    assert_eq!(status.pending_operations, 3);
    let prazos = status
        .collections
        .iter()
        .find(|entry| entry.collection == Collection::Prazos)
        .unwrap();
    assert_eq!(prazos.records, 1);
    assert!(prazos.last_pulled_at.is_none());

    let operations = pending_entries(&service)
        .unwrap()
        .into_iter()
        .map(|entry| entry.operation)
        .collect::<Vec<_>>();
    assert_eq!(
        operations,
        vec![
            SyncOperation::Create,
            SyncOperation::Delete,
            SyncOperation::Create
        ]
    );

    let lines = format_status_lines(&status);
    assert_eq!(lines[0], "Remote: offline only");
    assert_eq!(lines[1], "Pending operations: 3");
}

#[test]
fn database_persists_between_opens() {
    let dir = tempfile::tempdir().unwrap();
    offline_service(&dir)
        .upsert(Collection::Funcionarios, Record::new("col-01"))
        .unwrap();

    let reopened = offline_service(&dir);
    assert!(reopened
        .get(Collection::Funcionarios, "col-01")
        .unwrap()
        .is_some());
    assert_eq!(reopened.sync_manager().pending_count().unwrap(), 1);
}
