//! Gateway failure injection: dead-lettering, recovery, and terminal
//! rejections under the full wiring.

use crate::integration::harness::TestNode;
use dk_01_key_lifecycle::ports::GatewayError;
use shared_bus::{DirectoryEvent, EventPublisher};
use shared_types::{ClaimReason, ClaimType, KeyEventPayload, KeyRecord, KeyState};
use std::time::Duration;

fn payload(record: &KeyRecord) -> KeyEventPayload {
    KeyEventPayload::new(record.id, record.owner, record.state)
        .with_reason(ClaimReason::UserRequested)
}

#[tokio::test]
async fn test_outage_then_recovery_completes_the_transition() {
    let node = TestNode::start().await;
    node.gateway
        .fail_with(GatewayError::Unavailable("directory offline".into()));

    let record = node.seed_record("5511999990000", KeyState::Confirmed);
    node.bus
        .publish(DirectoryEvent::KeyConfirmed(payload(&record)))
        .await;

    // While the directory is down the record must not move; the trigger
    // circulates through the dead-letter channel instead.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(node.state_of(record.id), KeyState::Confirmed);
    assert!(node.bus.events_dead_lettered() >= 1);

    node.gateway.recover();
    node.wait_for_state(record.id, KeyState::AddKeyReady).await;

    node.shutdown().await;
}

#[tokio::test]
async fn test_exhausted_retry_budget_leaves_state_untouched() {
    let node = TestNode::start_with_retry(2, Duration::from_millis(5)).await;
    node.gateway
        .fail_with(GatewayError::Unavailable("directory offline".into()));

    let record = node.seed_record("5511999990000", KeyState::PortabilityRequestConfirmOpened);
    let (record, _claim) = node.seed_claim(&record, ClaimType::Portability);

    node.bus
        .publish(DirectoryEvent::PortabilityRequestConfirmOpened(payload(
            &record,
        )))
        .await;

    // Budget of 2: the trigger is redelivered twice, fails both times, and
    // is then dropped. The record never moves.
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(
        node.state_of(record.id),
        KeyState::PortabilityRequestConfirmOpened
    );
    assert_eq!(node.bus.events_dead_lettered(), 3);

    node.shutdown().await;
}

#[tokio::test]
async fn test_rejection_is_not_retried() {
    let node = TestNode::start().await;
    node.gateway
        .fail_with(GatewayError::Rejected("value in dispute".into()));

    let record = node.seed_record("5511999990000", KeyState::Confirmed);
    node.bus
        .publish(DirectoryEvent::KeyConfirmed(payload(&record)))
        .await;

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(node.state_of(record.id), KeyState::Confirmed);
    assert_eq!(node.bus.events_dead_lettered(), 0);

    node.shutdown().await;
}
