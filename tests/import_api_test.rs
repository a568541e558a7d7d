// ==========================================
// Import API tests
// ==========================================
// Goal: preview, blocking and background imports, durable log, settings
// ==========================================


use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tabular_import::config::env_keys;
use tabular_import::{
    logging, EventLevel, ImportApi, ImportEvent, ImportSettings, LogFormat, MemoryEventSink,
};
use tempfile::tempdir;
use test_helpers::{create_test_db, read_table, write_csv};

fn settings_for(db_path: &str, log_file: Option<PathBuf>) -> ImportSettings {
    ImportSettings {
        db_path: PathBuf::from(db_path),
        log_file,
        ..ImportSettings::default()
    }
}

#[test]
fn test_preview_reads_without_touching_database() {
    logging::init_test();
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("never_created.db");
    let api = ImportApi::new(settings_for(db_path.to_str().unwrap(), None));

    let previews = api.preview_file("tests/fixtures/orders.csv", Some(2)).unwrap();

    assert_eq!(previews.len(), 1);
    let preview = &previews[0];
    assert_eq!(preview.name, "orders");
    assert_eq!(preview.total_rows, 4);
    assert_eq!(preview.rows.len(), 2);
    assert_eq!(preview.columns[1], "Customer_Name");
    assert_eq!(preview.rows[1][1], None);
    assert!(!db_path.exists());
}

#[test]
fn test_preview_defaults_to_configured_row_count() {
    let dir = tempdir().unwrap();
    let lines: Vec<String> = std::iter::once("n".to_string())
        .chain((0..30).map(|i| i.to_string()))
        .collect();
    let lines: Vec<&str> = lines.iter().map(String::as_str).collect();
    let path = write_csv(&dir, "many.csv", &lines);

    let mut settings = settings_for("unused.db", None);
    settings.preview_rows = 5;
    let previews = ImportApi::new(settings).preview_file(&path, None).unwrap();

    assert_eq!(previews[0].rows.len(), 5);
    assert_eq!(previews[0].total_rows, 30);
}

#[test]
fn test_import_file_report_and_log() {
    logging::init_test();
    let (_db, db_path) = create_test_db().unwrap();
    let dir = tempdir().unwrap();
    let log_path = dir.path().join("import.log");
    let observer = Arc::new(MemoryEventSink::new());
    let api = ImportApi::new(settings_for(&db_path, Some(log_path.clone())))
        .with_observer(observer.clone());

    let report = api.import_file("tests/fixtures/customers.csv").unwrap();

    assert_eq!(report.succeeded(), 1);
    assert_eq!(report.failed(), 0);
    assert_eq!(report.total_rows(), 2);
    assert_eq!(report.sources[0].table_name.as_deref(), Some("customers"));
    assert_eq!(read_table(&db_path, "customers").len(), 2);

    let log = std::fs::read_to_string(&log_path).unwrap();
    let lines: Vec<&str> = log.lines().collect();
    assert_eq!(lines.len(), observer.events().len());
    assert!(lines.iter().all(|l| l.contains(" UTC | INFO | ")));
    assert!(lines
        .last()
        .unwrap()
        .ends_with("import finished: 1 succeeded, 0 failed (rows: 2)"));
    assert!(observer.events().iter().all(|e| e.job_id == report.job_id));
}

#[test]
fn test_json_log_lines_parse_as_events() {
    logging::init_test();
    let (_db, db_path) = create_test_db().unwrap();
    let dir = tempdir().unwrap();
    let log_path = dir.path().join("import.jsonl");
    let mut settings = settings_for(&db_path, Some(log_path.clone()));
    settings.log_format = LogFormat::Json;
    let api = ImportApi::new(settings);

    let err = api.import_file(dir.path().join("absent.csv")).unwrap_err();
    assert!(err.is_load_error());

    let log = std::fs::read_to_string(&log_path).unwrap();
    let events: Vec<ImportEvent> = log
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].level, EventLevel::Error);
}

#[test]
fn test_report_serializes_failures() {
    logging::init_test();
    let (_db, db_path) = create_test_db().unwrap();
    {
        let conn = tabular_import::db::open_sqlite_connection(&db_path).unwrap();
        conn.execute("CREATE TABLE clash (other TEXT)", []).unwrap();
    }
    let dir = tempdir().unwrap();
    let path = write_csv(&dir, "clash.csv", &["a", "1"]);

    let report = ImportApi::new(settings_for(&db_path, None))
        .import_file(&path)
        .unwrap();

    assert_eq!(report.failed(), 1);
    let json = serde_json::to_value(&report).unwrap();
    let error = json["sources"][0]["error"].as_str().unwrap();
    assert!(error.contains("clash"), "{error}");
    assert!(json["sources"][0]["table_name"].is_null());
}

#[tokio::test]
async fn test_spawn_import_completes() {
    logging::init_test();
    let (_db, db_path) = create_test_db().unwrap();
    let api = ImportApi::new(settings_for(&db_path, None));

    let handle = api.spawn_import("tests/fixtures/orders.csv").unwrap();
    let outcomes = handle.wait().await.unwrap();

    assert!(outcomes[0].is_ok());
    assert_eq!(read_table(&db_path, "orders").len(), 4);
}

#[test]
fn test_settings_from_lookup() {
    let vars: HashMap<&str, &str> = HashMap::from([
        (env_keys::DB_PATH, "/tmp/target.db"),
        (env_keys::LOG_FILE, "off"),
        (env_keys::LOG_FORMAT, "json"),
        (env_keys::CSV_DELIMITER, "tab"),
        (env_keys::PREVIEW_ROWS, "3"),
        (env_keys::MISSING_TOKENS, "-, n/a ,"),
    ]);

    let settings =
        ImportSettings::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap();

    assert_eq!(settings.db_path, PathBuf::from("/tmp/target.db"));
    assert_eq!(settings.log_file, None);
    assert_eq!(settings.log_format, LogFormat::Json);
    assert_eq!(settings.csv_delimiter, b'\t');
    assert_eq!(settings.preview_rows, 3);
    assert_eq!(settings.extra_missing_tokens, vec!["-", "n/a"]);
}

#[test]
fn test_configured_delimiter_and_tokens_reach_loader() {
    let dir = tempdir().unwrap();
    let path = write_csv(&dir, "semi.csv", &["a;b", "1;-", "2;3"]);

    let vars: HashMap<&str, &str> = HashMap::from([
        (env_keys::CSV_DELIMITER, ";"),
        (env_keys::MISSING_TOKENS, "-"),
        (env_keys::LOG_FILE, "none"),
    ]);
    let settings =
        ImportSettings::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap();

    let previews = ImportApi::new(settings).preview_file(&path, None).unwrap();
    assert_eq!(previews[0].columns, vec!["a", "b"]);
    assert_eq!(previews[0].rows[0], vec![Some("1".to_string()), None]);
}

#[test]
fn test_invalid_setting_is_rejected() {
    let err = ImportSettings::from_lookup(|key| {
        (key == env_keys::PREVIEW_ROWS).then(|| "lots".to_string())
    })
    .unwrap_err();
    assert!(err.to_string().contains(env_keys::PREVIEW_ROWS));
}
