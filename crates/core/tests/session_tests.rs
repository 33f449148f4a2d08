//! Session loop: pre-clear ordering, cadence, busy guard, and cancellation.

mod common;

use std::sync::Arc;
use std::time::Duration;

use car_upload_core::driver::{DriverPhase, TickOutcome};
use car_upload_core::error::SessionError;
use car_upload_core::model::Car;
use car_upload_core::queue::QueueOrder;
use car_upload_core::session::{SessionConfig, SessionPlan, UploadSession};
use common::{models, Call, FakeClient};

fn plan(cars: &[&str], keys: &[&str], clear_first: bool) -> SessionPlan {
    SessionPlan {
        cars: cars.iter().map(|c| Car::new(*c)).collect(),
        models: models(keys),
        clear_first,
        order: QueueOrder::Fifo,
    }
}

#[tokio::test(start_paused = true)]
async fn runs_until_every_model_is_uploaded() {
    let client = Arc::new(FakeClient::new());
    client.script("bob/models/m1", &["InProgress", "Success"]);
    client.script("bob/models/m2", &["Pending", "InProgress", "Failed"]);

    let session = UploadSession::new(
        Arc::clone(&client),
        plan(&["C1"], &["bob/models/m1", "bob/models/m2"], false),
        SessionConfig::default(),
    )
    .unwrap();
    let snapshot = session.start().wait().await;

    assert_eq!(snapshot.phase, DriverPhase::Done);
    assert!(!snapshot.cancelled);
    assert_eq!(snapshot.remaining, 0);
    assert_eq!(snapshot.progress_percent(), 100.0);

    let statuses: Vec<(&str, &str)> = snapshot
        .records
        .iter()
        .map(|r| (r.model_name.as_str(), r.status.as_str()))
        .collect();
    assert_eq!(statuses, [("bob-m1", "Success"), ("bob-m2", "Failed")]);
    assert!(!client
        .calls()
        .iter()
        .any(|c| matches!(c, Call::DeleteAll { .. })));
}

#[tokio::test(start_paused = true)]
async fn pre_clear_issues_one_delete_for_all_cars_before_uploading() {
    let client = Arc::new(FakeClient::new());
    let session = UploadSession::new(
        Arc::clone(&client),
        plan(&["C1", "C2"], &["u/models/a", "u/models/b", "u/models/c"], true),
        SessionConfig::default(),
    )
    .unwrap();
    session.start().wait().await;

    let calls = client.calls();
    assert_eq!(
        calls[0],
        Call::DeleteAll {
            car_ids: vec!["C1".into(), "C2".into()]
        }
    );
    let deletes = calls
        .iter()
        .filter(|c| matches!(c, Call::DeleteAll { .. }))
        .count();
    assert_eq!(deletes, 1);
    assert!(calls[1..].iter().all(|c| match c {
        Call::Submit { car, .. } | Call::Poll { car, .. } => car == "C1",
        Call::DeleteAll { .. } => false,
    }));
    assert_eq!(client.submits().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn failed_pre_clear_still_uploads() {
    let client = Arc::new(FakeClient::new());
    client.fail_delete();
    let session = UploadSession::new(
        Arc::clone(&client),
        plan(&["C1"], &["u/models/a"], true),
        SessionConfig::default(),
    )
    .unwrap();
    let snapshot = session.start().wait().await;

    assert_eq!(client.submits(), ["u/models/a"]);
    assert_eq!(snapshot.records[0].status, "Success");
}

#[tokio::test(start_paused = true)]
async fn ticks_follow_the_configured_interval() {
    let client = Arc::new(FakeClient::new());
    client.script("u/models/a", &["InProgress", "InProgress", "Success"]);
    let config = SessionConfig {
        tick_interval: Duration::from_millis(1_000),
        ..SessionConfig::default()
    };
    let session = UploadSession::new(Arc::clone(&client), plan(&["C1"], &["u/models/a"], false), config)
        .unwrap();

    let started = tokio::time::Instant::now();
    session.start().wait().await;

    // submit + three polls; the first tick fires immediately.
    assert_eq!(client.calls().len(), 4);
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(3) && elapsed < Duration::from_secs(4), "{elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn overlapping_ticks_are_skipped_while_busy() {
    let client = Arc::new(FakeClient::with_delay(Duration::from_secs(5)));
    let session = UploadSession::new(
        Arc::clone(&client),
        plan(&["C1"], &["u/models/a", "u/models/b"], false),
        SessionConfig::default(),
    )
    .unwrap();

    let (first, second) = tokio::join!(session.tick(), session.tick());

    assert!(matches!(first, TickOutcome::Submitted { .. }));
    assert_eq!(second, TickOutcome::Skipped);
    assert_eq!(client.submits(), ["u/models/a"]);
    assert_eq!(session.snapshot().remaining, 1);
}

#[tokio::test(start_paused = true)]
async fn cancel_keeps_ledger_and_stops_calls() {
    let client = Arc::new(FakeClient::new());
    client.script("u/models/a", &["InProgress"; 50]);
    let session = UploadSession::new(
        Arc::clone(&client),
        plan(&["C1"], &["u/models/a", "u/models/b"], false),
        SessionConfig::default(),
    )
    .unwrap();

    let handle = session.start();
    let mut rx = handle.snapshots();
    rx.wait_for(|s| s.records.len() == 1).await.unwrap();

    handle.cancel();
    let snapshot = handle.wait().await;
    assert!(snapshot.cancelled);
    assert!(snapshot.is_finished());
    assert_eq!(snapshot.records.len(), 1);
    assert_eq!(snapshot.records[0].status, "InProgress");
    assert_eq!(snapshot.remaining, 1);

    let calls = client.calls().len();
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(client.calls().len(), calls);
    assert_eq!(rx.borrow().records, snapshot.records);
}

#[tokio::test(start_paused = true)]
async fn dropping_the_handle_cancels() {
    let client = Arc::new(FakeClient::new());
    client.script("u/models/a", &["InProgress"; 50]);
    let session = UploadSession::new(
        Arc::clone(&client),
        plan(&["C1"], &["u/models/a"], false),
        SessionConfig::default(),
    )
    .unwrap();

    let handle = session.start();
    let mut rx = handle.snapshots();
    rx.wait_for(|s| !s.records.is_empty()).await.unwrap();
    drop(handle);

    rx.wait_for(|s| s.cancelled).await.unwrap();
    let calls = client.calls().len();
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(client.calls().len(), calls);
}

#[test]
fn session_needs_a_car() {
    let client = Arc::new(FakeClient::new());
    let err = UploadSession::new(client, plan(&[], &["u/models/a"], false), SessionConfig::default())
        .err()
        .unwrap();
    assert_eq!(err, SessionError::NoTargetCar);
}

#[test]
fn session_rejects_zero_interval() {
    let client = Arc::new(FakeClient::new());
    let config = SessionConfig {
        tick_interval: Duration::ZERO,
        ..SessionConfig::default()
    };
    let err = UploadSession::new(client, plan(&["C1"], &["u/models/a"], false), config)
        .err()
        .unwrap();
    assert_eq!(err, SessionError::ZeroInterval);
}
