// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde_json::json;

use super::*;

/// Listener that appends `"<tag>:<action>"` to a shared log.
fn recorder(log: &Arc<Mutex<Vec<String>>>, tag: &str) -> impl Fn(&str, &Value) + Send + Sync {
    let log = Arc::clone(log);
    let tag = tag.to_owned();
    move |action, _| log.lock().push(format!("{tag}:{action}"))
}

#[test]
fn broadcast_reaches_all_in_registration_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let reg = ListenerRegistry::new();
    reg.on("one", recorder(&log, "one"));
    reg.on("two", recorder(&log, "two"));

    assert_eq!(reg.broadcast("tick", &json!({})), 2);
    assert_eq!(*log.lock(), vec!["one:tick", "two:tick"]);
}

#[test]
fn last_registration_wins_and_keeps_position() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let reg = ListenerRegistry::new();
    reg.on("a", recorder(&log, "a-old"));
    reg.on("b", recorder(&log, "b"));
    reg.on("a", recorder(&log, "a-new"));

    assert_eq!(reg.len(), 2);
    reg.broadcast("x", &Value::Null);
    assert_eq!(*log.lock(), vec!["a-new:x", "b:x"]);
}

#[test]
fn off_is_idempotent() {
    let reg = ListenerRegistry::new();
    reg.on("a", |_, _| {});
    assert!(reg.off("a"));
    assert!(!reg.off("a"));
    assert!(!reg.off("never"));
    assert!(reg.is_empty());
}

#[test]
fn removed_listener_is_not_invoked() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let reg = ListenerRegistry::new();
    reg.on("a", recorder(&log, "a"));
    reg.off("a");

    assert_eq!(reg.broadcast("x", &Value::Null), 0);
    assert_eq!(reg.broadcast("y", &Value::Null), 0);
    assert!(log.lock().is_empty());
}

#[test]
fn listener_removed_mid_broadcast_is_skipped() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let reg = ListenerRegistry::new();
    {
        let handle = reg.clone();
        let log = Arc::clone(&log);
        reg.on("first", move |action, _| {
            log.lock().push(format!("first:{action}"));
            handle.off("second");
        });
    }
    reg.on("second", recorder(&log, "second"));
    reg.on("third", recorder(&log, "third"));

    assert_eq!(reg.broadcast("x", &Value::Null), 2);
    assert_eq!(*log.lock(), vec!["first:x", "third:x"]);
    assert!(!reg.contains("second"));
}

#[test]
fn listener_can_remove_itself() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let reg = ListenerRegistry::new();
    {
        let handle = reg.clone();
        let log = Arc::clone(&log);
        reg.on("once", move |action, _| {
            log.lock().push(action.to_owned());
            handle.off("once");
        });
    }

    reg.broadcast("a", &Value::Null);
    reg.broadcast("b", &Value::Null);
    assert_eq!(*log.lock(), vec!["a"]);
}

#[test]
fn listener_added_mid_broadcast_waits_for_next_frame() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let reg = ListenerRegistry::new();
    {
        let handle = reg.clone();
        let late_log = Arc::clone(&log);
        reg.on("adder", move |_, _| {
            handle.on("late", recorder(&late_log, "late"));
        });
    }

    reg.broadcast("a", &Value::Null);
    assert!(log.lock().is_empty());
    reg.broadcast("b", &Value::Null);
    assert_eq!(*log.lock(), vec!["late:b"]);
}
