//! The process-wide engine. Kept in its own test binary so the global starts
//! fresh from the environment.

use fixturegpt_core::{Mode, SnapshotConfig, SyncMode};
use fixturegpt_replay::{Call, configure_cloud_sync, global, snapshot};
use std::io;

#[test]
fn cloud_sync_configuration_applies_to_later_calls() {
    let from_env = SnapshotConfig::from_env().unwrap_or_default();
    let initial = global().config();
    assert_eq!(initial.mode, from_env.mode);
    assert_eq!(initial.sync.sync_mode, from_env.sync.sync_mode);
    assert_eq!(initial.sync.endpoint, from_env.sync.endpoint);
    assert_eq!(initial.fixtures_dir, from_env.fixtures_dir);

    let sum: i64 = snapshot(&Call::new("add").arg(&1).arg(&2).with_mode(Mode::Off), || {
        Ok::<_, io::Error>(3)
    })
    .unwrap();
    assert_eq!(sum, 3);

    configure_cloud_sync("fgpt_test_key_123", SyncMode::Both, Some("http://127.0.0.1:1"));
    let configured = global().config();
    assert_eq!(configured.sync.masked_api_key().as_deref(), Some("fgpt_tes..."));
    assert_eq!(configured.sync.sync_mode, SyncMode::Both);
    assert_eq!(configured.sync.endpoint, "http://127.0.0.1:1");
    assert_eq!(configured.mode, initial.mode);
    assert_eq!(configured.fixtures_dir, initial.fixtures_dir);

    configure_cloud_sync("fgpt_rotated", SyncMode::Cloud, None);
    let rotated = global().config();
    assert_eq!(rotated.sync.masked_api_key().as_deref(), Some("fgpt_rot..."));
    assert_eq!(rotated.sync.sync_mode, SyncMode::Cloud);
    assert_eq!(rotated.sync.endpoint, "http://127.0.0.1:1");

    // Calls that bypass storage are unaffected by an unreachable remote.
    let again: i64 = snapshot(&Call::new("add").arg(&1).arg(&2).with_mode(Mode::Off), || {
        Ok::<_, io::Error>(3)
    })
    .unwrap();
    assert_eq!(again, 3);
}
