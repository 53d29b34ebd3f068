use super::*;
use std::sync::atomic::AtomicUsize;

use serde_json::json;
use tokio::time::Instant;
use webhands_protocols::SearchContext;
use webhands_protocols::testing::FakePage;

/// Page whose drain script hands out whatever the test queued.
fn page_with_queue() -> (Arc<FakePage>, Arc<Mutex<Vec<Value>>>) {
    let page = Arc::new(FakePage::new("https://example.com"));
    let queue: Arc<Mutex<Vec<Value>>> = Arc::new(Mutex::new(Vec::new()));
    let drained = queue.clone();
    page.on_script(DRAIN_MUTATIONS_JS, move |_| {
        let batch: Vec<Value> = drained.lock().drain(..).collect();
        Ok(Value::Array(batch))
    });
    (page, queue)
}

fn added(id: &str) -> Value {
    json!({"type": "added", "target": {"nodeName": "DIV", "id": id, "className": null}})
}

#[tokio::test(start_paused = true)]
async fn test_events_reach_subscribers_in_order() {
    let (page, queue) = page_with_queue();
    let bridge = MutationObserverBridge::new(page);
    let mut subscription = bridge.subscribe().unwrap();
    bridge.start_observing().await.unwrap();
    assert_eq!(bridge.state(), ObserverState::Observing);

    queue.lock().extend([added("first"), added("second")]);
    let first = subscription.recv().await.unwrap();
    let second = subscription.recv().await.unwrap();
    assert_eq!(first.target().id.as_deref(), Some("first"));
    assert_eq!(second.target().id.as_deref(), Some("second"));
}

#[tokio::test(start_paused = true)]
async fn test_start_is_idempotent() {
    let (page, _queue) = page_with_queue();
    let installs = Arc::new(AtomicUsize::new(0));
    let counter = installs.clone();
    page.on_script(INSTALL_OBSERVER_JS, move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(json!(true))
    });
    let bridge = MutationObserverBridge::new(page);
    bridge.start_observing().await.unwrap();
    bridge.start_observing().await.unwrap();
    assert_eq!(installs.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_no_events_after_stop() {
    let (page, queue) = page_with_queue();
    let bridge = MutationObserverBridge::new(page);
    let mut subscription = bridge.subscribe().unwrap();
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = seen.clone();
    bridge.add_handler(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    bridge.start_observing().await.unwrap();
    bridge.stop_observing().await;
    assert_eq!(bridge.state(), ObserverState::Idle);

    queue.lock().push(added("late"));
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(subscription.try_recv().is_none());
    assert_eq!(seen.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_handlers_and_removal() {
    let (page, queue) = page_with_queue();
    let bridge = MutationObserverBridge::new(page);
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = seen.clone();
    let id = bridge.add_handler(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    let mut subscription = bridge.subscribe().unwrap();
    bridge.start_observing().await.unwrap();

    queue.lock().push(added("a"));
    subscription.recv().await.unwrap();
    assert_eq!(seen.load(Ordering::SeqCst), 1);

    assert!(bridge.remove_handler(id));
    assert!(!bridge.remove_handler(id));
    queue.lock().push(added("b"));
    subscription.recv().await.unwrap();
    assert_eq!(seen.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_dropping_subscription_unregisters() {
    let (page, _queue) = page_with_queue();
    let bridge = MutationObserverBridge::new(page);
    let subscription = bridge.subscribe().unwrap();
    assert_eq!(bridge.listener_count(), 1);
    drop(subscription);
    assert_eq!(bridge.listener_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cleanup_is_terminal() {
    let (page, _queue) = page_with_queue();
    let bridge = MutationObserverBridge::new(page);
    bridge.add_handler(|_| {});
    let mut subscription = bridge.subscribe().unwrap();
    bridge.start_observing().await.unwrap();

    bridge.cleanup().await;
    bridge.cleanup().await;
    assert_eq!(bridge.state(), ObserverState::Destroyed);
    assert_eq!(bridge.handler_count(), 0);
    assert!(subscription.recv().await.is_none());

    bridge.start_observing().await.unwrap();
    assert_eq!(bridge.state(), ObserverState::Destroyed);
    assert!(matches!(bridge.subscribe(), Err(DomError::ObserverDestroyed)));
}

#[tokio::test(start_paused = true)]
async fn test_wait_for_element_times_out_without_leaking() {
    let (page, _queue) = page_with_queue();
    let bridge = MutationObserverBridge::new(page);

    let started = Instant::now();
    let err = bridge
        .wait_for_element("#never-appears", Duration::from_millis(200))
        .await
        .unwrap_err();
    let elapsed = started.elapsed();

    assert!(err.is_timeout());
    assert!(elapsed >= Duration::from_millis(200));
    assert!(elapsed < Duration::from_millis(300));
    assert_eq!(bridge.listener_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_wait_for_element_resolves_on_added_event() {
    let (page, queue) = page_with_queue();
    let bridge = MutationObserverBridge::new(page.clone());

    let delayed_page = page.clone();
    let delayed_queue = queue.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(250)).await;
        delayed_page.register_selector(
            SearchContext::Document,
            "#toast",
            vec![ElementHandle::new("toast-1")],
        );
        delayed_queue.lock().push(added("toast"));
    });

    let handle = bridge
        .wait_for_element("#toast", Duration::from_secs(2))
        .await
        .unwrap();
    assert_eq!(handle, ElementHandle::new("toast-1"));
    assert_eq!(bridge.listener_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_wait_for_element_present_immediately() {
    let (page, _queue) = page_with_queue();
    page.register_xpath(
        SearchContext::Document,
        "//button",
        ElementHandle::new("btn"),
    );
    let bridge = MutationObserverBridge::new(page);
    let handle = bridge
        .wait_for_element("//button", Duration::from_millis(50))
        .await
        .unwrap();
    assert_eq!(handle.as_str(), "btn");
}

#[tokio::test(start_paused = true)]
async fn test_wait_for_removal() {
    let (page, queue) = page_with_queue();
    page.register_selector(
        SearchContext::Document,
        ".spinner",
        vec![ElementHandle::new("spin")],
    );
    let bridge = MutationObserverBridge::new(page.clone());

    let delayed_page = page.clone();
    let delayed_queue = queue.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(150)).await;
        delayed_page.unregister_selector(&SearchContext::Document, ".spinner");
        delayed_queue.lock().push(json!({
            "type": "removed",
            "target": {"nodeName": "DIV", "id": null, "className": "spinner"}
        }));
    });

    bridge
        .wait_for_element_removal(".spinner", Duration::from_secs(1))
        .await
        .unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_wait_for_attribute_change() {
    let (page, queue) = page_with_queue();
    page.register_selector(
        SearchContext::Document,
        "#go",
        vec![ElementHandle::new("go")],
    );
    let value: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));
    let current = value.clone();
    page.on_element_script(GET_ATTRIBUTE_JS, move |_, args| {
        assert_eq!(args[0], json!("aria-busy"));
        Ok(current.lock().clone().map(Value::String).unwrap_or(Value::Null))
    });
    let bridge = MutationObserverBridge::new(page);

    let delayed_value = value.clone();
    let delayed_queue = queue.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(120)).await;
        // unrelated attribute first
        delayed_queue.lock().push(json!({
            "type": "attribute",
            "target": {"nodeName": "BUTTON", "id": "go", "className": null},
            "attributeName": "class", "oldValue": null, "newValue": "x"
        }));
        tokio::time::sleep(Duration::from_millis(120)).await;
        *delayed_value.lock() = Some("true".to_string());
        delayed_queue.lock().push(json!({
            "type": "attribute",
            "target": {"nodeName": "BUTTON", "id": "go", "className": null},
            "attributeName": "aria-busy", "oldValue": null, "newValue": "true"
        }));
    });

    let changed = bridge
        .wait_for_attribute_change("#go", "aria-busy", Duration::from_secs(1))
        .await
        .unwrap();
    assert_eq!(changed.as_deref(), Some("true"));
}

#[tokio::test(start_paused = true)]
async fn test_wait_stops_observer_it_started() {
    let (page, _queue) = page_with_queue();
    page.register_selector(SearchContext::Document, "#ready", vec![ElementHandle::new("ready")]);
    let bridge = MutationObserverBridge::new(page);

    bridge
        .wait_for_element("#ready", Duration::from_millis(50))
        .await
        .unwrap();
    assert_eq!(bridge.state(), ObserverState::Idle);

    let err = bridge
        .wait_for_element("#never-appears", Duration::from_millis(50))
        .await
        .unwrap_err();
    assert!(err.is_timeout());
    assert_eq!(bridge.state(), ObserverState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_wait_leaves_explicit_observation_running() {
    let (page, _queue) = page_with_queue();
    page.register_selector(SearchContext::Document, "#ready", vec![ElementHandle::new("ready")]);
    let bridge = MutationObserverBridge::new(page);
    bridge.start_observing().await.unwrap();

    bridge
        .wait_for_element("#ready", Duration::from_millis(50))
        .await
        .unwrap();
    assert_eq!(bridge.state(), ObserverState::Observing);
}

#[tokio::test(start_paused = true)]
async fn test_overlapping_waits_keep_observer_until_last_finishes() {
    let (page, queue) = page_with_queue();
    let bridge = Arc::new(MutationObserverBridge::new(page.clone()));

    let long_wait = {
        let bridge = bridge.clone();
        tokio::spawn(async move {
            bridge
                .wait_for_element("#late", Duration::from_secs(2))
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    let err = bridge
        .wait_for_element("#never-appears", Duration::from_millis(100))
        .await
        .unwrap_err();
    assert!(err.is_timeout());
    assert_eq!(bridge.state(), ObserverState::Observing);

    page.register_selector(SearchContext::Document, "#late", vec![ElementHandle::new("late")]);
    queue.lock().push(added("late"));
    let handle = long_wait.await.unwrap().unwrap();
    assert_eq!(handle.as_str(), "late");
    assert_eq!(bridge.state(), ObserverState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_missing_hook_is_reinstalled() {
    let page = Arc::new(FakePage::new("https://example.com"));
    let installed = Arc::new(AtomicUsize::new(0));
    let counter = installed.clone();
    page.on_script(INSTALL_OBSERVER_JS, move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(json!(true))
    });
    // a drain that finds no hook answers null, as after a navigation
    let hooked = installed.clone();
    page.on_script(DRAIN_MUTATIONS_JS, move |_| {
        if hooked.load(Ordering::SeqCst) >= 2 {
            Ok(json!([added("after-navigation")]))
        } else {
            Ok(Value::Null)
        }
    });
    let bridge = MutationObserverBridge::new(page);
    let mut subscription = bridge.subscribe().unwrap();
    bridge.start_observing().await.unwrap();

    let event = subscription.recv().await.unwrap();
    assert_eq!(event.target().id.as_deref(), Some("after-navigation"));
    assert_eq!(installed.load(Ordering::SeqCst), 2);
}

#[test]
fn test_parse_batch_skips_malformed() {
    let events = parse_batch(json!([added("ok"), {"type": "bogus"}, 42]));
    assert_eq!(events.len(), 1);
    assert!(parse_batch(Value::Null).is_empty());
}
