use std::sync::Arc;
use std::time::Duration;

use super::*;

fn event(job_id: i64, pct: u8) -> ProgressEvent {
    ProgressEvent {
        job_id,
        status: JobStatus::Processing,
        progress_percent: pct,
        copied_size_bytes: u64::from(pct),
        total_size_bytes: 100,
    }
}

#[test]
fn event_serializes_as_flat_json() {
    let json = serde_json::to_value(event(3, 40)).unwrap();
    assert_eq!(json["job_id"], 3);
    assert_eq!(json["status"], "processing");
    assert_eq!(json["progress_percent"], 40);
    assert_eq!(json["copied_size_bytes"], 40);
    assert_eq!(json["total_size_bytes"], 100);
}

#[test]
fn hub_prunes_closed_and_full_subscribers() {
    let hub = SubscriberHub::new(1);
    let mut live = hub.subscribe();
    let closed = hub.subscribe();
    let stalled = hub.subscribe();
    drop(closed.rx);

    // First delivery fills everyone's single slot and drops the closed one.
    assert_eq!(hub.deliver(&event(1, 10)), 2);
    assert_eq!(hub.subscriber_count(), 2);

    // live drains, stalled doesn't.
    assert_eq!(live.rx.try_recv().unwrap(), event(1, 10));
    assert_eq!(hub.deliver(&event(1, 20)), 1);
    assert_eq!(hub.subscriber_count(), 1);
    assert_eq!(live.rx.try_recv().unwrap(), event(1, 20));
    drop(stalled);
}

#[test]
fn unsubscribe_removes_by_id() {
    let hub = SubscriberHub::new(4);
    let a = hub.subscribe();
    let _b = hub.subscribe();
    assert!(hub.unsubscribe(a.id));
    assert!(!hub.unsubscribe(a.id));
    assert_eq!(hub.subscriber_count(), 1);
}

#[test]
fn publish_without_runtime_is_dropped() {
    let bridge = ProgressBridge::new();
    assert!(!bridge.is_attached());
    bridge.publish(event(1, 5));
}

#[tokio::test(flavor = "multi_thread")]
async fn events_cross_from_worker_thread_in_order() {
    let hub = Arc::new(SubscriberHub::new(64));
    let bridge = Arc::new(ProgressBridge::new());
    let drain = bridge.attach(&tokio::runtime::Handle::current(), Arc::clone(&hub));
    let mut a = hub.subscribe();
    let mut b = hub.subscribe();

    let worker_bridge = Arc::clone(&bridge);
    std::thread::spawn(move || {
        for pct in [10, 20, 30] {
            worker_bridge.publish(event(9, pct));
        }
    })
    .join()
    .unwrap();

    for sub in [&mut a, &mut b] {
        for pct in [10, 20, 30] {
            let got = tokio::time::timeout(Duration::from_secs(2), sub.rx.recv())
                .await
                .unwrap()
                .unwrap();
            assert_eq!(got.progress_percent, pct);
        }
    }

    bridge.detach();
    assert!(!bridge.is_attached());
    bridge.publish(event(9, 40));
    tokio::time::timeout(Duration::from_secs(2), drain)
        .await
        .unwrap()
        .unwrap();
}
