//! End-to-end reconciler and entry-operation flows against the mock
//! transports, with pins materialized in a tempdir.

use std::path::Path;
use std::sync::Arc;

use bpfpin_core::testing::{MockAdmin, MockKernel};
use bpfpin_core::tool::MapMeta;
use bpfpin_core::{DeleteOutcome, MapConfig, MapContext, MapError, MapParams, PinnedMap};

struct Fixture {
    kernel: Arc<MockKernel>,
    admin: Arc<MockAdmin>,
    ctx: MapContext,
    dir: tempfile::TempDir,
}

impl Fixture {
    fn new(repinning: bool) -> Self {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
        let kernel = Arc::new(MockKernel::new());
        let admin = Arc::new(MockAdmin::new());
        let config = MapConfig::builder()
            .repinning_enabled(repinning)
            .build()
            .unwrap();
        let ctx = MapContext::with_transports(
            config,
            Arc::clone(&kernel) as Arc<dyn bpfpin_core::kernel::MapKernel>,
            Arc::clone(&admin) as Arc<dyn bpfpin_core::tool::MapAdmin>,
        );
        Self {
            kernel,
            admin,
            ctx,
            dir: tempfile::tempdir().unwrap(),
        }
    }

    fn params(&self, name: &str, version: u32) -> MapParams {
        MapParams {
            filename: self.dir.path().join(name).display().to_string(),
            kernel_type: "hash".to_string(),
            key_size: 4,
            value_size: 8,
            max_entries: 1024,
            name: name.to_string(),
            flags: 0,
            version,
        }
    }

    fn map(&self, name: &str, version: u32) -> PinnedMap {
        self.ctx.pinned_map(self.params(name, version)).unwrap()
    }
}

#[test]
fn ensure_exists_creates_missing_map() {
    let fx = Fixture::new(false);
    let mut map = fx.map("flowstats", 2);

    map.ensure_exists().unwrap();

    assert!(map.is_open());
    assert_eq!(fx.admin.create_calls(), 1);
    assert_eq!(fx.kernel.open_calls(), 1);
    assert_eq!(fx.kernel.mount_calls(), 1);
    // The pin lands at the versioned path.
    assert!(fx.dir.path().join("flowstats2").is_file());
    assert!(!fx.dir.path().join("flowstats").exists());
}

#[test]
fn ensure_exists_is_idempotent() {
    let fx = Fixture::new(false);
    let mut map = fx.map("flowstats", 2);

    map.ensure_exists().unwrap();
    let fd = map.map_fd().unwrap();

    map.ensure_exists().unwrap();

    assert_eq!(map.map_fd().unwrap(), fd);
    assert_eq!(fx.admin.create_calls(), 1, "no second creation call");
    assert_eq!(fx.kernel.open_calls(), 1, "no second open");
}

#[test]
fn ensure_exists_opens_existing_pin_without_creating() {
    let fx = Fixture::new(false);
    let mut map = fx.map("flowstats", 2);
    std::fs::write(fx.dir.path().join("flowstats2"), b"").unwrap();

    map.ensure_exists().unwrap();

    assert!(map.is_open());
    assert_eq!(fx.admin.create_calls(), 0);
    assert_eq!(fx.kernel.open_calls(), 1);
}

#[test]
fn ensure_exists_repins_live_map_from_registry() {
    let fx = Fixture::new(true);
    fx.admin.set_registry(vec![
        MapMeta { id: 3, name: "conntrack".to_string() },
        MapMeta { id: 7, name: "flowstats2".to_string() },
    ]);
    let mut map = fx.map("flowstats", 2);

    map.ensure_exists().unwrap();

    assert!(map.is_open());
    assert_eq!(fx.admin.create_calls(), 0, "repin replaces creation");
    assert_eq!(
        fx.admin.pins(),
        vec![(7, fx.dir.path().join("flowstats2"))]
    );
}

#[test]
fn ensure_exists_falls_through_to_creation_when_repin_misses() {
    let fx = Fixture::new(true);
    fx.admin.set_registry(vec![MapMeta { id: 3, name: "conntrack".to_string() }]);
    let mut map = fx.map("flowstats", 2);

    map.ensure_exists().unwrap();

    assert!(map.is_open());
    assert!(fx.admin.pins().is_empty());
    assert_eq!(fx.admin.create_calls(), 1);
}

#[test]
fn repin_failure_aborts_without_creation() {
    let fx = Fixture::new(true);
    fx.admin.fail_list();
    let mut map = fx.map("flowstats", 2);

    let err = map.ensure_exists().unwrap_err();

    assert!(matches!(err, MapError::Tool(_)));
    assert!(!map.is_open());
    assert_eq!(
        fx.admin.create_calls(),
        0,
        "an indeterminate registry must not be papered over by creating a duplicate"
    );
}

#[test]
fn repinning_disabled_never_consults_the_registry() {
    let fx = Fixture::new(false);
    // Even with a matching live map listed, disabled repinning goes
    // straight to creation.
    fx.admin
        .set_registry(vec![MapMeta { id: 7, name: "flowstats2".to_string() }]);
    let mut map = fx.map("flowstats", 2);

    map.ensure_exists().unwrap();

    assert!(fx.admin.pins().is_empty());
    assert_eq!(fx.admin.create_calls(), 1);
}

#[test]
fn version_one_leaves_pin_path_unsuffixed() {
    let fx = Fixture::new(false);
    let mut map = fx.map("flowstats", 1);

    map.ensure_exists().unwrap();

    assert!(fx.dir.path().join("flowstats").is_file());
    assert_eq!(map.path(), fx.dir.path().join("flowstats"));
}

#[test]
fn get_and_update_round_trip() {
    let fx = Fixture::new(false);
    let mut map = fx.map("flowstats", 2);
    map.ensure_exists().unwrap();

    map.update(&[1, 2, 3, 4], &[9, 9, 9, 9, 0, 0, 0, 1]).unwrap();
    assert_eq!(map.get(&[1, 2, 3, 4]).unwrap(), vec![9, 9, 9, 9, 0, 0, 0, 1]);
    assert_eq!(fx.kernel.entry(&[1, 2, 3, 4]).unwrap().len(), 8);

    let err = map.get(&[4, 3, 2, 1]).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn entry_operations_require_an_open_handle() {
    let fx = Fixture::new(false);
    let map = fx.map("flowstats", 2);

    assert!(map.get(&[0; 4]).unwrap_err().is_usage_error());
    assert!(map.update(&[0; 4], &[0; 8]).unwrap_err().is_usage_error());
    assert!(map.delete(&[0; 4]).unwrap_err().is_usage_error());
    assert!(map.iter(|_, _| ()).unwrap_err().is_usage_error());
}

#[test]
fn wrong_key_and_value_lengths_are_usage_errors() {
    let fx = Fixture::new(false);
    let mut map = fx.map("flowstats", 2);
    map.ensure_exists().unwrap();

    assert!(matches!(
        map.get(&[0; 3]),
        Err(MapError::BadKeySize { expected: 4, got: 3, .. })
    ));
    assert!(matches!(
        map.update(&[0; 4], &[0; 7]),
        Err(MapError::BadValueSize { expected: 8, got: 7, .. })
    ));
}

#[test]
fn per_cpu_maps_reject_direct_operations_even_when_open() {
    let fx = Fixture::new(false);
    let mut params = fx.params("flowstats", 2);
    params.kernel_type = "percpu_hash".to_string();
    let mut map = fx.ctx.pinned_map(params).unwrap();
    map.ensure_exists().unwrap();

    assert!(matches!(
        map.get(&[0; 4]),
        Err(MapError::PerCpuUnsupported { .. })
    ));
    assert!(matches!(
        map.update(&[0; 4], &[0; 8]),
        Err(MapError::PerCpuUnsupported { .. })
    ));
}

#[test]
fn delete_reports_absent_entries_as_a_non_error() {
    let fx = Fixture::new(false);
    let mut map = fx.map("flowstats", 2);
    map.ensure_exists().unwrap();
    fx.admin
        .fail_delete_with("Error: delete failed: No such file or directory");

    assert_eq!(map.delete(&[0; 4]).unwrap(), DeleteOutcome::AlreadyAbsent);
}

#[test]
fn delete_surfaces_other_tool_failures() {
    let fx = Fixture::new(false);
    let mut map = fx.map("flowstats", 2);
    map.ensure_exists().unwrap();
    fx.admin
        .fail_delete_with("Error: map delete failed: Operation not permitted");

    let err = map.delete(&[0; 4]).unwrap_err();
    assert!(matches!(err, MapError::Tool(_)));
    assert!(err.to_string().contains("Operation not permitted"));
}

#[test]
fn delete_passes_the_key_through() {
    let fx = Fixture::new(false);
    let mut map = fx.map("flowstats", 2);
    map.ensure_exists().unwrap();

    assert_eq!(map.delete(&[1, 0, 0, 255]).unwrap(), DeleteOutcome::Deleted);
    assert_eq!(fx.admin.deleted_keys(), vec![vec![1, 0, 0, 255]]);
}

#[test]
fn iter_visits_records_in_dump_order() {
    let fx = Fixture::new(false);
    let mut map = fx.map("flowstats", 2);
    map.ensure_exists().unwrap();
    fx.admin.set_dump_document(
        &br#"[
            {"key":["1","2"],"value":["255"]},
            {"key":["0x0a","11"],"value":["0","0x01"]}
        ]"#[..],
    );

    let mut seen = Vec::new();
    map.iter(|k, v| seen.push((k.to_vec(), v.to_vec()))).unwrap();

    assert_eq!(
        seen,
        vec![
            (vec![0x01, 0x02], vec![0xff]),
            (vec![0x0a, 0x0b], vec![0x00, 0x01]),
        ]
    );
}

#[test]
fn iter_on_malformed_json_never_visits() {
    let fx = Fixture::new(false);
    let mut map = fx.map("flowstats", 2);
    map.ensure_exists().unwrap();
    fx.admin.set_dump_document(&b"Found 0 elements"[..]);

    let mut visits = 0;
    let err = map.iter(|_, _| visits += 1).unwrap_err();

    assert_eq!(visits, 0);
    assert!(matches!(err, MapError::DumpParse { .. }));
    assert!(err.to_string().contains("invalid JSON"));
}

#[test]
fn iter_names_the_record_that_failed_to_decode() {
    let fx = Fixture::new(false);
    let mut map = fx.map("flowstats", 2);
    map.ensure_exists().unwrap();
    fx.admin.set_dump_document(
        &br#"[
            {"key":["1"],"value":["2"]},
            {"key":["bogus"],"value":["3"]}
        ]"#[..],
    );

    let err = map.iter(|_, _| ()).unwrap_err();
    assert!(err.to_string().contains("record 1"));
    assert!(err.to_string().contains("bogus"));
}

#[test]
fn close_returns_the_handle_to_unopened() {
    let fx = Fixture::new(false);
    let mut map = fx.map("flowstats", 2);
    map.ensure_exists().unwrap();
    let fd = map.map_fd().unwrap();

    map.close().unwrap();
    assert!(!map.is_open());
    assert!(map.map_fd().unwrap_err().is_usage_error());
    assert_eq!(fx.kernel.closed(), vec![fd.raw()]);

    // Closing again is a no-op.
    map.close().unwrap();
    assert_eq!(fx.kernel.closed().len(), 1);

    // The pin survives, so re-ensuring reopens without creating.
    map.ensure_exists().unwrap();
    assert!(map.is_open());
    assert_eq!(fx.admin.create_calls(), 1);
    assert_eq!(fx.kernel.open_calls(), 2);
}

#[test]
fn close_before_ensure_is_safe() {
    let fx = Fixture::new(false);
    let mut map = fx.map("flowstats", 2);
    map.close().unwrap();
    assert!(fx.kernel.closed().is_empty());
}

#[test]
fn schema_generations_coexist_on_disk() {
    let fx = Fixture::new(false);
    let mut v1 = fx.map("flowstats", 1);
    let mut v2 = fx.map("flowstats", 2);

    v1.ensure_exists().unwrap();
    v2.ensure_exists().unwrap();

    assert!(fx.dir.path().join("flowstats").is_file());
    assert!(fx.dir.path().join("flowstats2").is_file());
    assert_eq!(fx.admin.create_calls(), 2);
}

#[test]
fn iter_decodes_the_single_record_document() {
    // [{"key":["1","2"],"value":["255"]}] must invoke the visitor exactly
    // once with key [0x01, 0x02] and value [0xff].
    let fx = Fixture::new(false);
    let mut map = fx.map("flowstats", 2);
    map.ensure_exists().unwrap();
    fx.admin
        .set_dump_document(&br#"[{"key":["1","2"],"value":["255"]}]"#[..]);

    let mut seen = Vec::new();
    map.iter(|k, v| seen.push((k.to_vec(), v.to_vec()))).unwrap();

    assert_eq!(seen, vec![(vec![0x01, 0x02], vec![0xff])]);
}

#[test]
fn stat_error_other_than_not_found_aborts_without_creation() {
    let fx = Fixture::new(false);
    // Make the *parent* of the pin a regular file: stat on the pin path
    // then fails with NotADirectory rather than NotFound.
    let blocker = fx.dir.path().join("blocked");
    std::fs::write(&blocker, b"").unwrap();
    let params = MapParams {
        filename: blocker.join("flowstats").display().to_string(),
        kernel_type: "hash".to_string(),
        key_size: 4,
        value_size: 8,
        max_entries: 1024,
        name: "flowstats".to_string(),
        flags: 0,
        version: 1,
    };
    let mut map = fx.ctx.pinned_map(params).unwrap();

    let err = map.ensure_exists().unwrap_err();

    assert!(!map.is_open());
    assert_eq!(fx.admin.create_calls(), 0);
    // Surfaced as the directory-creation or stat failure, never creation.
    assert!(matches!(err, MapError::PinDir { .. } | MapError::Stat { .. }));
}

fn send_sync_check<T: Send + Sync>(_t: &T) {}

#[test]
fn handles_are_send_and_sync() {
    let fx = Fixture::new(false);
    let map = fx.map("flowstats", 2);
    send_sync_check(&map);
    send_sync_check(&fx.ctx);
}

#[test]
fn accessors_reflect_the_versioned_identity() {
    let fx = Fixture::new(false);
    let map = fx.map("flowstats", 3);
    assert_eq!(map.name(), "flowstats3");
    assert_eq!(
        map.path(),
        Path::new(&fx.params("flowstats", 3).versioned_filename())
    );
}
