use chrono::{TimeZone, Utc};
use wayfind_core::Coordinate;

use super::*;
use crate::sensor::{ChannelSensor, SensorHandle};

fn fix(lat: f64, lng: f64) -> UserLocation {
    UserLocation::new(
        Coordinate::new(lat, lng).unwrap(),
        Some(12.0),
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
    )
}

fn start() -> (GeoSubscription, SensorHandle) {
    let (sensor, handle) = ChannelSensor::new();
    let sub = GeoWatcher::start(sensor, GeoWatcherConfig::default());
    (sub, handle)
}

#[tokio::test]
async fn fix_is_emitted_and_becomes_last_known() {
    let (mut sub, handle) = start();
    handle.push_fix(fix(47.6, -122.3));

    let event = sub.next_event().await.unwrap();
    assert_eq!(event, LocationEvent::Fix(fix(47.6, -122.3)));
    assert_eq!(sub.current().last_known, Some(fix(47.6, -122.3)));
    assert!(sub.current().fault.is_none());
    assert!(handle.is_watching());
}

#[tokio::test]
async fn fault_keeps_previous_fix() {
    let (mut sub, handle) = start();
    handle.push_fix(fix(47.6, -122.3));
    handle.push_fault(LocationFault::PositionUnavailable);

    assert!(matches!(sub.next_event().await, Some(LocationEvent::Fix(_))));
    assert_eq!(
        sub.next_event().await,
        Some(LocationEvent::Fault(LocationFault::PositionUnavailable))
    );

    let state = sub.current();
    assert_eq!(state.last_known, Some(fix(47.6, -122.3)));
    assert_eq!(state.fault, Some(LocationFault::PositionUnavailable));
}

#[tokio::test]
async fn permission_denied_then_fix_clears_fault() {
    let (mut sub, handle) = start();
    handle.push_fault(LocationFault::PermissionDenied);
    assert_eq!(
        sub.next_event().await,
        Some(LocationEvent::Fault(LocationFault::PermissionDenied))
    );
    assert!(sub.current().last_known.is_none());

    handle.push_fix(fix(40.7, -74.0));
    assert!(matches!(sub.next_event().await, Some(LocationEvent::Fix(_))));
    assert!(sub.current().fault.is_none());
    assert_eq!(sub.current().last_known, Some(fix(40.7, -74.0)));
}

#[tokio::test(start_paused = true)]
async fn timeout_is_raised_locally_when_no_fix_arrives() {
    let (mut sub, _handle) = start();
    let started = Instant::now();

    let event = sub.next_event().await;
    assert_eq!(event, Some(LocationEvent::Fault(LocationFault::Timeout)));
    assert!(started.elapsed() >= Duration::from_secs(10));
    assert_eq!(sub.current().fault, Some(LocationFault::Timeout));
}

#[tokio::test(start_paused = true)]
async fn no_timeout_once_a_fix_has_arrived() {
    let (mut sub, handle) = start();
    handle.push_fix(fix(47.6, -122.3));
    assert!(matches!(sub.next_event().await, Some(LocationEvent::Fix(_))));

    tokio::time::sleep(Duration::from_secs(30)).await;
    handle.push_fix(fix(47.7, -122.3));

    assert_eq!(
        sub.next_event().await,
        Some(LocationEvent::Fix(fix(47.7, -122.3)))
    );
}

#[tokio::test(start_paused = true)]
async fn retry_requests_fix_clears_fault_and_rearms_window() {
    let (mut sub, handle) = start();
    handle.push_fault(LocationFault::PermissionDenied);
    assert!(matches!(
        sub.next_event().await,
        Some(LocationEvent::Fault(LocationFault::PermissionDenied))
    ));

    let mut state = sub.state();
    sub.retry();
    state.wait_for(|s| s.fault.is_none()).await.unwrap();
    assert_eq!(handle.fix_requests(), 1);
    assert!(sub.is_active());

    assert_eq!(
        sub.next_event().await,
        Some(LocationEvent::Fault(LocationFault::Timeout))
    );
}

#[tokio::test]
async fn stop_releases_sensor_and_is_idempotent() {
    let (mut sub, handle) = start();
    handle.push_fix(fix(47.6, -122.3));
    assert!(matches!(sub.next_event().await, Some(LocationEvent::Fix(_))));

    sub.stop().await;
    assert!(handle.is_released());
    assert!(!handle.is_watching());
    assert!(!sub.is_active());
    assert_eq!(sub.current(), LocationState::default());

    assert!(!handle.push_fix(fix(1.0, 1.0)));
    assert!(sub.next_event().await.is_none());

    sub.stop().await;
    sub.retry();
    assert!(sub.next_event().await.is_none());
}

#[tokio::test]
async fn stop_discards_undelivered_events() {
    let (mut sub, handle) = start();
    handle.push_fix(fix(47.6, -122.3));
    handle.push_fix(fix(47.7, -122.3));
    // Let the task forward both readings before stopping.
    let mut state = sub.state();
    state
        .wait_for(|s| s.last_known == Some(fix(47.7, -122.3)))
        .await
        .unwrap();

    sub.stop().await;
    assert!(sub.next_event().await.is_none());
}

#[tokio::test]
async fn closed_sensor_reports_position_unavailable() {
    let (sensor, handle) = ChannelSensor::new();
    let mut sub = GeoWatcher::start(sensor, GeoWatcherConfig::default());
    drop(handle);

    assert_eq!(
        sub.next_event().await,
        Some(LocationEvent::Fault(LocationFault::PositionUnavailable))
    );
}
