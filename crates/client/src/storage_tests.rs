// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn memory_store_set_get_remove() -> anyhow::Result<()> {
    let store = MemoryStore::new();
    store.set(&[("a", "1"), ("b", "2")])?;
    assert_eq!(store.get("a").as_deref(), Some("1"));
    assert_eq!(store.get("b").as_deref(), Some("2"));

    store.remove(&["a", "missing"])?;
    assert_eq!(store.get("a"), None);
    assert_eq!(store.get("b").as_deref(), Some("2"));
    Ok(())
}

#[test]
fn file_store_missing_file_is_empty() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let store = FileStore::open(dir.path().join("session.json"))?;
    assert_eq!(store.get("anything"), None);
    assert!(!store.path().exists());
    Ok(())
}

#[test]
fn file_store_survives_reopen() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("nested/state/session.json");

    {
        let store = FileStore::open(&path)?;
        store.set(&[("tisk.access_token", "acc"), ("tisk.refresh_token", "ref")])?;
    }

    let reopened = FileStore::open(&path)?;
    assert_eq!(reopened.get("tisk.access_token").as_deref(), Some("acc"));
    assert_eq!(reopened.get("tisk.refresh_token").as_deref(), Some("ref"));

    reopened.remove(&["tisk.access_token", "tisk.refresh_token"])?;
    let again = FileStore::open(&path)?;
    assert_eq!(again.get("tisk.access_token"), None);
    Ok(())
}

#[test]
fn file_store_leaves_no_tmp_files() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let store = FileStore::open(dir.path().join("session.json"))?;
    for i in 0..5 {
        let value = i.to_string();
        store.set(&[("k", value.as_str())])?;
    }
    let names: Vec<String> = std::fs::read_dir(dir.path())?
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["session.json".to_owned()]);
    Ok(())
}

#[test]
fn file_store_rejects_corrupt_file() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("session.json");
    std::fs::write(&path, "{not json")?;
    let err = FileStore::open(&path).err();
    assert!(matches!(err, Some(ClientError::Storage(_))));
    Ok(())
}

#[test]
fn apply_removes_then_sets_in_one_commit() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("session.json");
    let store = FileStore::open(&path)?;
    store.set(&[("a", "1"), ("b", "2")])?;

    store.apply(&[("a", "3"), ("c", "4")], &["a", "b"])?;

    let reopened = FileStore::open(&path)?;
    assert_eq!(reopened.get("a").as_deref(), Some("3"));
    assert_eq!(reopened.get("b"), None);
    assert_eq!(reopened.get("c").as_deref(), Some("4"));
    Ok(())
}

#[test]
fn noop_apply_does_not_create_file() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let store = FileStore::open(dir.path().join("session.json"))?;

    store.remove(&["tisk.user"])?;

    assert!(!store.path().exists());
    Ok(())
}
