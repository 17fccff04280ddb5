// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn static_credentials_lookup() {
    let creds =
        StaticCredentials { login_name: Some("alice".into()), login_hash: Some("abc".into()) };
    assert_eq!(creds.get(LOGIN_NAME).as_deref(), Some("alice"));
    assert_eq!(creds.get(LOGIN_HASH).as_deref(), Some("abc"));
    assert_eq!(creds.get("other"), None);
}

#[test]
fn static_credentials_default_is_empty() {
    let creds = StaticCredentials::default();
    assert_eq!(creds.get(LOGIN_NAME), None);
    assert_eq!(creds.get(LOGIN_HASH), None);
}

#[test]
fn file_store_missing_file_yields_nothing() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let store = JsonFileStore::new(dir.path().join("absent.json"));
    assert_eq!(store.get(LOGIN_NAME), None);
    Ok(())
}

#[test]
fn file_store_rereads_on_every_lookup() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("storage.json");
    let store = JsonFileStore::new(&path);

    std::fs::write(&path, r#"{"loginName":"alice","loginHash":"h1"}"#)?;
    assert_eq!(store.get(LOGIN_NAME).as_deref(), Some("alice"));
    assert_eq!(store.get(LOGIN_HASH).as_deref(), Some("h1"));

    std::fs::write(&path, r#"{"loginName":"bob","loginHash":null}"#)?;
    assert_eq!(store.get(LOGIN_NAME).as_deref(), Some("bob"));
    assert_eq!(store.get(LOGIN_HASH), None);
    Ok(())
}

#[yare::parameterized(
    not_json = { "{nope" },
    array = { "[1,2]" },
)]
fn file_store_malformed_file_yields_nothing(contents: &str) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("storage.json");
    std::fs::write(&path, contents).expect("write credential file");
    assert_eq!(JsonFileStore::new(&path).get(LOGIN_NAME), None);
}

#[test]
fn file_store_stringifies_non_string_values() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("storage.json");
    std::fs::write(&path, r#"{"loginName":42}"#)?;
    assert_eq!(JsonFileStore::new(&path).get(LOGIN_NAME).as_deref(), Some("42"));
    Ok(())
}
