use serde_json::json;

use super::*;
use crate::progress::MS_PER_DAY;
use crate::storage::StorageError;

fn session_config() -> FormProgressConfig {
    FormProgressConfig { storage: StorageKind::SessionStorage, ..FormProgressConfig::default() }
}

fn local_config(dir: &tempfile::TempDir) -> FormProgressConfig {
    FormProgressConfig { local_dir: dir.path().to_path_buf(), ..FormProgressConfig::default() }
}

fn form(value: serde_json::Value) -> FormData {
    value.as_object().cloned().unwrap_or_default()
}

fn manager() -> ProgressManager {
    ProgressManager::new(session_config()).unwrap()
}

/// Adapter whose medium rejects every call.
struct FailingStorage;

fn medium_down() -> StorageError {
    StorageError::Io(std::io::Error::other("medium down"))
}

#[async_trait::async_trait]
impl ProgressStorage for FailingStorage {
    async fn save(&self, _key: &str, _record: &FormProgress) -> Result<(), StorageError> {
        Err(medium_down())
    }

    async fn load(&self, _key: &str) -> Result<Option<FormProgress>, StorageError> {
        Err(medium_down())
    }

    async fn delete(&self, _key: &str) -> Result<(), StorageError> {
        Err(medium_down())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        Err(medium_down())
    }

    async fn purge_expired(&self, _now_ms: i64) -> Result<usize, StorageError> {
        Err(medium_down())
    }
}

fn failing_manager() -> ProgressManager {
    ProgressManager {
        config: session_config(),
        session_area: SessionArea::new(),
        adapter: Box::new(FailingStorage),
    }
}

// =============================================================================
// construction
// =============================================================================

#[test]
fn indexed_db_is_a_configuration_error() {
    let config = FormProgressConfig { storage: StorageKind::IndexedDb, ..FormProgressConfig::default() };
    let err = ProgressManager::new(config).err().unwrap();
    assert!(matches!(err, ProgressError::Configuration(_)));
}

#[test]
fn server_with_bad_url_is_a_configuration_error() {
    let config = FormProgressConfig {
        storage: StorageKind::Server,
        server_url: "::not a url::".into(),
        ..FormProgressConfig::default()
    };
    let err = ProgressManager::new(config).err().unwrap();
    assert!(matches!(err, ProgressError::Configuration(_)));
}

#[tokio::test]
async fn unknown_storage_behaves_as_local() {
    let dir = tempfile::tempdir().unwrap();
    let mut config: FormProgressConfig = serde_json::from_value(json!({"storage": "webSql"})).unwrap();
    config.local_dir = dir.path().to_path_buf();
    let mgr = ProgressManager::new(config).unwrap();
    assert_eq!(mgr.active_storage(), StorageKind::LocalStorage);

    let record = mgr.create_progress(NewProgress::new("f", "s", form(json!({"a": "x"}))));
    mgr.save_progress(&record).await.unwrap();

    let local = ProgressManager::new(local_config(&dir)).unwrap();
    assert_eq!(local.load_progress("f", "s").await, Some(record));
}

// =============================================================================
// record construction
// =============================================================================

#[test]
fn create_progress_reference_scenario() {
    let mgr = manager();
    let before = now_ms();
    let record = mgr.create_progress(NewProgress::new("form1", "sess1", form(json!({"name": "Alice", "email": ""}))).steps(1, 3));
    let after = now_ms();

    assert_eq!(record.id, "form1_sess1");
    assert_eq!(record.completion_percentage, 50);
    assert_eq!(record.current_step, 1);
    assert_eq!(record.total_steps, 3);
    assert!(record.last_updated >= before && record.last_updated <= after);
    assert_eq!(record.expires_at, record.last_updated + 7 * MS_PER_DAY);
}

#[test]
fn associated_helpers_delegate() {
    assert_eq!(ProgressManager::completion_percentage(&form(json!({"a": "", "b": [], "c": "x", "d": [1]})), 4), 50);
    assert_eq!(ProgressManager::completion_percentage(&form(json!({"a": "x"})), 0), 0);
    assert_ne!(ProgressManager::generate_session_id(), ProgressManager::generate_session_id());
}

// =============================================================================
// persistence
// =============================================================================

#[tokio::test]
async fn save_then_load_round_trips() {
    let mgr = manager();
    let record = mgr.create_progress(NewProgress::new("f", "s", form(json!({"a": "x", "b": [1, 2]}))).user("u1"));
    mgr.save_progress(&record).await.unwrap();
    assert_eq!(mgr.load_progress("f", "s").await, Some(record));
}

#[tokio::test]
async fn load_missing_is_none() {
    assert!(manager().load_progress("f", "nobody").await.is_none());
}

#[tokio::test]
async fn delete_then_load_is_none() {
    let mgr = manager();
    let record = mgr.create_progress(NewProgress::new("f", "s", FormData::new()));
    mgr.save_progress(&record).await.unwrap();
    mgr.delete_progress("f", "s").await.unwrap();
    assert!(mgr.load_progress("f", "s").await.is_none());
}

#[tokio::test]
async fn save_after_delete_recreates_record() {
    let mgr = manager();
    let record = mgr.create_progress(NewProgress::new("f", "s", FormData::new()));
    mgr.save_progress(&record).await.unwrap();
    mgr.delete_progress("f", "s").await.unwrap();
    mgr.save_progress(&record).await.unwrap();
    assert_eq!(mgr.load_progress("f", "s").await, Some(record));
}

#[tokio::test]
async fn clear_all_then_load_is_none() {
    let mgr = manager();
    for (form_id, session) in [("f1", "a"), ("f2", "b")] {
        let record = mgr.create_progress(NewProgress::new(form_id, session, FormData::new()));
        mgr.save_progress(&record).await.unwrap();
    }
    mgr.clear_all_progress().await.unwrap();
    assert!(mgr.load_progress("f1", "a").await.is_none());
    assert!(mgr.load_progress("f2", "b").await.is_none());
}

#[tokio::test]
async fn zero_retention_keeps_records_for_one_day() {
    let mut mgr = manager();
    mgr.update_config(FormProgressConfigUpdate { retention_days: Some(0), ..Default::default() })
        .unwrap();
    let record = mgr.create_progress(NewProgress::new("f", "s", FormData::new()));
    assert_eq!(record.expires_at - record.last_updated, MS_PER_DAY);
    mgr.save_progress(&record).await.unwrap();
    assert_eq!(mgr.load_progress("f", "s").await, Some(record));
}

#[tokio::test]
async fn non_string_values_round_trip_exactly() {
    let dir = tempfile::tempdir().unwrap();
    let data = form(json!({
        "price": 971.986_371_854_762_9,
        "tiny": 1.071_566_039_146_582_6e-75,
        "ratio": 0.1,
        "count": 42,
        "subscribed": true,
        "address": {"street": "1 Main St", "geo": {"lat": 51.507_351, "lng": -0.127_758}},
        "tags": ["a", 2, false, null],
    }));
    let mut values: Vec<f64> = (1..500_i32).map(|i| f64::from(i) * 1.937_117_5 + f64::from(i).sqrt() / 7.0).collect();
    values.push(f64::MAX);
    values.push(f64::MIN_POSITIVE);

    for config in [session_config(), local_config(&dir)] {
        let mgr = ProgressManager::new(config).unwrap();
        let mut data = data.clone();
        data.insert("samples".into(), json!(values));
        let record = mgr.create_progress(NewProgress::new("f", "s", data).steps(2, 4));
        mgr.save_progress(&record).await.unwrap();
        assert_eq!(mgr.load_progress("f", "s").await, Some(record));
    }
}

#[tokio::test]
async fn long_form_ids_save_and_load_in_local_storage() {
    let dir = tempfile::tempdir().unwrap();
    let mgr = ProgressManager::new(local_config(&dir)).unwrap();
    let form_id = "f".repeat(100);
    let session_id = ProgressManager::generate_session_id();
    let record = mgr.create_progress(NewProgress::new(&form_id, &session_id, form(json!({"name": "Alice"}))));
    mgr.save_progress(&record).await.unwrap();
    assert_eq!(mgr.load_progress(&form_id, &session_id).await, Some(record));
    mgr.delete_progress(&form_id, &session_id).await.unwrap();
    assert!(mgr.load_progress(&form_id, &session_id).await.is_none());
}

#[tokio::test]
async fn purge_expired_removes_stale_records() {
    let mgr = manager();
    let mut stale = mgr.create_progress(NewProgress::new("f", "old", FormData::new()));
    stale.expires_at = now_ms() - 1;
    let fresh = mgr.create_progress(NewProgress::new("f", "new", FormData::new()));
    mgr.save_progress(&stale).await.unwrap();
    mgr.save_progress(&fresh).await.unwrap();

    assert_eq!(mgr.purge_expired().await.unwrap(), 1);
    assert_eq!(mgr.load_progress("f", "new").await, Some(fresh));
}

// =============================================================================
// enabled flag
// =============================================================================

#[tokio::test]
async fn disabled_save_persists_nothing() {
    let area = SessionArea::new();
    let disabled = ProgressManager::with_session_area(
        FormProgressConfig { enabled: false, ..session_config() },
        area.clone(),
    )
    .unwrap();
    let record = disabled.create_progress(NewProgress::new("f", "s", form(json!({"a": "x"}))));
    disabled.save_progress(&record).await.unwrap();

    let enabled = ProgressManager::with_session_area(session_config(), area.clone()).unwrap();
    assert!(enabled.load_progress("f", "s").await.is_none());
    assert!(area.is_empty().await);
}

#[tokio::test]
async fn disabled_load_is_always_none() {
    let area = SessionArea::new();
    let enabled = ProgressManager::with_session_area(session_config(), area.clone()).unwrap();
    let record = enabled.create_progress(NewProgress::new("f", "s", FormData::new()));
    enabled.save_progress(&record).await.unwrap();

    let disabled =
        ProgressManager::with_session_area(FormProgressConfig { enabled: false, ..session_config() }, area).unwrap();
    assert!(disabled.load_progress("f", "s").await.is_none());
}

#[tokio::test]
async fn disabled_delete_and_clear_still_apply() {
    let area = SessionArea::new();
    let enabled = ProgressManager::with_session_area(session_config(), area.clone()).unwrap();
    for session in ["a", "b"] {
        let record = enabled.create_progress(NewProgress::new("f", session, FormData::new()));
        enabled.save_progress(&record).await.unwrap();
    }

    let disabled =
        ProgressManager::with_session_area(FormProgressConfig { enabled: false, ..session_config() }, area.clone())
            .unwrap();
    disabled.delete_progress("f", "a").await.unwrap();
    assert_eq!(area.len().await, 1);
    disabled.clear_all_progress().await.unwrap();
    assert!(area.is_empty().await);
}

// =============================================================================
// failure policy
// =============================================================================

#[tokio::test]
async fn save_failure_is_surfaced() {
    let mgr = failing_manager();
    let record = mgr.create_progress(NewProgress::new("f", "s", FormData::new()));
    let err = mgr.save_progress(&record).await.unwrap_err();
    assert!(matches!(err, ProgressError::Storage(StorageError::Io(_))));
}

#[tokio::test]
async fn load_failure_is_swallowed() {
    assert!(failing_manager().load_progress("f", "s").await.is_none());
}

#[tokio::test]
async fn delete_clear_and_purge_failures_are_surfaced() {
    let mgr = failing_manager();
    assert!(mgr.delete_progress("f", "s").await.is_err());
    assert!(mgr.clear_all_progress().await.is_err());
    assert!(mgr.purge_expired().await.is_err());
}

#[tokio::test]
async fn quota_failure_is_surfaced() {
    let mut mgr = manager();
    mgr.update_config(FormProgressConfigUpdate { quota_bytes: Some(8), ..Default::default() })
        .unwrap();
    let record = mgr.create_progress(NewProgress::new("f", "s", form(json!({"a": "x"}))));
    let err = mgr.save_progress(&record).await.unwrap_err();
    assert!(matches!(err, ProgressError::Storage(StorageError::QuotaExceeded { .. })));
}

// =============================================================================
// update_config
// =============================================================================

#[tokio::test]
async fn update_config_merges_shallowly() {
    let mut mgr = manager();
    mgr.update_config(FormProgressConfigUpdate { retention_days: Some(30), ..Default::default() })
        .unwrap();
    assert_eq!(mgr.config().retention_days, 30);
    assert_eq!(mgr.active_storage(), StorageKind::SessionStorage);
    assert!(mgr.config().enabled);

    let record = mgr.create_progress(NewProgress::new("f", "s", FormData::new()));
    assert_eq!(record.expires_at - record.last_updated, 30 * MS_PER_DAY);
}

#[tokio::test]
async fn update_config_swaps_adapter() {
    let dir = tempfile::tempdir().unwrap();
    let mut mgr = ProgressManager::new(FormProgressConfig { local_dir: dir.path().to_path_buf(), ..session_config() })
        .unwrap();
    let record = mgr.create_progress(NewProgress::new("f", "s", FormData::new()));
    mgr.save_progress(&record).await.unwrap();

    mgr.update_config(FormProgressConfigUpdate { storage: Some(StorageKind::LocalStorage), ..Default::default() })
        .unwrap();
    assert_eq!(mgr.active_storage(), StorageKind::LocalStorage);
    assert!(mgr.load_progress("f", "s").await.is_none());

    mgr.update_config(FormProgressConfigUpdate { storage: Some(StorageKind::SessionStorage), ..Default::default() })
        .unwrap();
    assert_eq!(mgr.load_progress("f", "s").await, Some(record));
}

#[tokio::test]
async fn failed_switch_keeps_previous_adapter() {
    let mut mgr = manager();
    let record = mgr.create_progress(NewProgress::new("f", "s", FormData::new()));
    mgr.save_progress(&record).await.unwrap();

    let err = mgr
        .update_config(FormProgressConfigUpdate {
            storage: Some(StorageKind::IndexedDb),
            retention_days: Some(1),
            ..Default::default()
        })
        .unwrap_err();
    assert!(matches!(err, ProgressError::Configuration(_)));
    assert_eq!(mgr.active_storage(), StorageKind::SessionStorage);
    assert_eq!(mgr.config().retention_days, 7);
    assert_eq!(mgr.load_progress("f", "s").await, Some(record));
}

#[tokio::test]
async fn update_config_can_disable() {
    let mut mgr = manager();
    mgr.update_config(FormProgressConfigUpdate { enabled: Some(false), ..Default::default() })
        .unwrap();
    let record = mgr.create_progress(NewProgress::new("f", "s", FormData::new()));
    mgr.save_progress(&record).await.unwrap();

    mgr.update_config(FormProgressConfigUpdate { enabled: Some(true), ..Default::default() })
        .unwrap();
    assert!(mgr.load_progress("f", "s").await.is_none());
}
