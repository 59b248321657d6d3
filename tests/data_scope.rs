use std::sync::Arc;

use cmdflow::{DataScope, Value, value};

#[test]
fn test_get_returns_most_recent_match() {
    let scope = DataScope::new();
    scope.push(value(1u32));
    scope.push(value("x".to_string()));
    scope.push(value(2u32));

    assert_eq!(scope.get::<u32>().as_deref(), Some(&2));
    assert_eq!(scope.get::<String>().as_deref().map(String::as_str), Some("x"));
    assert!(scope.get::<i8>().is_none());
    assert_eq!(scope.len(), 3);
}

#[test]
fn test_lookup_falls_back_to_parent() {
    let parent = DataScope::new();
    parent.push(value(10u32));
    parent.push(value("parent".to_string()));

    let child = DataScope::with_parent(&parent);
    child.push(value(20u32));

    assert_eq!(child.get::<u32>().as_deref(), Some(&20));
    assert_eq!(
        child.get::<String>().as_deref().map(String::as_str),
        Some("parent")
    );
    assert!(parent.get::<f32>().is_none());
    assert!(child.parent().is_some());
}

#[test]
fn test_parent_is_not_kept_alive_by_child() {
    let parent = DataScope::new();
    let child = DataScope::with_parent(&parent);
    drop(parent);

    assert!(child.parent().is_none());
    assert!(child.get::<u32>().is_none());
}

#[test]
fn test_nested_scope_values_are_searched() {
    let outer = DataScope::new();
    outer.push(value(1u8));

    let inner = DataScope::with_parent(&outer);
    inner.push(value(2u8));
    inner.push(value(true));
    let inner_value: Value = inner.clone();
    outer.push(inner_value);

    assert_eq!(outer.get::<u8>().as_deref(), Some(&2));
    assert_eq!(outer.get::<bool>().as_deref(), Some(&true));
    // The nested scope's own fallback to `outer` does not loop.
    assert!(outer.get::<char>().is_none());
    assert_eq!(inner.get::<u8>().as_deref(), Some(&2));
}

#[test]
fn test_scope_containing_itself_does_not_recurse_forever() {
    let scope = DataScope::new();
    scope.push(value('a'));
    let me: Value = scope.clone();
    scope.push(me);

    assert_eq!(scope.get::<char>().as_deref(), Some(&'a'));
    assert!(scope.get::<u64>().is_none());
    assert_eq!(scope.all::<char>().len(), 1);
}

#[test]
fn test_last_skips_nested_scopes() {
    let outer = DataScope::new();
    outer.push(value(5i32));
    let nested: Value = DataScope::new();
    outer.push(nested);

    let last = outer.last().expect("a plain value");
    assert_eq!(last.downcast_ref::<i32>(), Some(&5));
    assert!(DataScope::new().last().is_none());
}

#[test]
fn test_all_flattens_in_insertion_order_then_parent() {
    let parent = DataScope::new();
    parent.push(value(0u16));

    let scope = DataScope::with_parent(&parent);
    scope.push(value(1u16));
    let nested = DataScope::new();
    nested.push(value(2u16));
    nested.push(value(3u16));
    scope.push(nested as Value);
    scope.push(value(4u16));

    let all: Vec<u16> = scope.all::<u16>().iter().map(|v| **v).collect();
    assert_eq!(all, vec![1, 2, 3, 4, 0]);
}

#[test]
fn test_concurrent_lookups_do_not_interfere() {
    let scope = DataScope::new();
    for i in 0..100u32 {
        scope.push(value(i));
    }
    let me: Value = scope.clone();
    scope.push(me);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let scope = Arc::clone(&scope);
            std::thread::spawn(move || {
                for _ in 0..100 {
                    assert_eq!(scope.get::<u32>().as_deref(), Some(&99));
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
}
