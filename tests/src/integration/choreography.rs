//! Happy-path choreography: triggers in, transitions and outcome events out.

use crate::integration::harness::TestNode;
use dk_01_key_lifecycle::adapters::GatewayCall;
use dk_01_key_lifecycle::ports::ClaimStore;
use shared_bus::{DirectoryEvent, EventFilter, EventPublisher, EventTopic};
use shared_types::{
    ClaimReason, ClaimStatus, ClaimType, KeyEventPayload, KeyRecord, KeyState,
};
use std::time::Duration;

fn payload(record: &KeyRecord) -> KeyEventPayload {
    KeyEventPayload::new(record.id, record.owner, record.state)
        .with_reason(ClaimReason::UserRequested)
}

#[tokio::test]
async fn test_confirm_registers_key_end_to_end() {
    let node = TestNode::start().await;
    let record = node.seed_record("5511999990000", KeyState::Confirmed);

    let mut sub = node
        .bus
        .subscribe(EventFilter::topics(vec![EventTopic::KeyLifecycle]));

    node.bus
        .publish(DirectoryEvent::KeyConfirmed(payload(&record)))
        .await;

    node.wait_for_state(record.id, KeyState::AddKeyReady).await;
    assert_eq!(
        node.gateway
            .count(|c| matches!(c, GatewayCall::CreateKey(_))),
        1
    );

    // The outcome event reaches downstream subscribers. Skip the trigger
    // itself, which shares the topic.
    loop {
        match sub.recv().await.expect("bus closed") {
            DirectoryEvent::KeyReady(p) => {
                assert_eq!(p.id, record.id);
                break;
            }
            DirectoryEvent::KeyConfirmed(_) => continue,
            other => panic!("unexpected event {other:?}"),
        }
    }

    node.shutdown().await;
}

#[tokio::test]
async fn test_duplicate_trigger_is_absorbed() {
    let node = TestNode::start().await;
    let record = node.seed_record("5511999990000", KeyState::Confirmed);

    // At-least-once delivery: the same trigger arrives twice. The loop is
    // sequential, so the replay sees the already-advanced record.
    node.bus
        .publish(DirectoryEvent::KeyConfirmed(payload(&record)))
        .await;
    node.bus
        .publish(DirectoryEvent::KeyConfirmed(payload(&record)))
        .await;

    node.wait_for_state(record.id, KeyState::AddKeyReady).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(node.state_of(record.id), KeyState::AddKeyReady);
    assert_eq!(
        node.gateway
            .count(|c| matches!(c, GatewayCall::CreateKey(_))),
        1
    );

    node.shutdown().await;
}

#[tokio::test]
async fn test_ownership_claim_closes_across_two_records() {
    let node = TestNode::start().await;
    let record = node.seed_record("5511999990000", KeyState::ClaimClosing);
    let (record, claim) = node.seed_claim(&record, ClaimType::Ownership);
    let counterpart = node.seed_record("5511999990000", KeyState::OwnershipWaiting);

    node.bus
        .publish(DirectoryEvent::ClaimClosing(payload(&record)))
        .await;

    node.wait_for_state(record.id, KeyState::ClaimClosed).await;
    node.wait_for_state(counterpart.id, KeyState::OwnershipReady)
        .await;
    assert_eq!(
        node.claims.get_by_id(claim.id).unwrap().unwrap().status,
        ClaimStatus::Closed
    );
    // The registration moved peer-to-peer: one delete, one create.
    assert_eq!(
        node.gateway
            .count(|c| matches!(c, GatewayCall::DeleteKey(_))),
        1
    );
    assert_eq!(
        node.gateway
            .count(|c| matches!(c, GatewayCall::CreateKey(_))),
        1
    );

    node.shutdown().await;
}

#[tokio::test]
async fn test_claim_denied_returns_key_to_owner() {
    let node = TestNode::start().await;
    let record = node.seed_record("5511999990000", KeyState::ClaimDenied);
    let (record, claim) = node.seed_claim(&record, ClaimType::Ownership);

    node.bus
        .publish(DirectoryEvent::ClaimDenied(payload(&record)))
        .await;

    node.wait_for_state(record.id, KeyState::Ready).await;
    assert_eq!(
        node.claims.get_by_id(claim.id).unwrap().unwrap().status,
        ClaimStatus::Denied
    );

    node.shutdown().await;
}

#[tokio::test]
async fn test_portability_cancel_request_round_trip() {
    let node = TestNode::start().await;
    let record = node.seed_record("5511999990000", KeyState::PortabilityRequestCancelOpened);
    let (record, claim) = node.seed_claim(&record, ClaimType::Portability);

    // The user asks to keep the key: the cancel is forwarded first.
    node.bus
        .publish(DirectoryEvent::PortabilityRequestCancelOpened(payload(
            &record,
        )))
        .await;
    node.wait_for_state(record.id, KeyState::PortabilityRequestCancelStarted)
        .await;
    assert_eq!(
        node.gateway
            .count(|c| matches!(c, GatewayCall::CancelPortability(..))),
        1
    );

    // The directory acknowledges and the sync feed reports it started.
    node.bus
        .publish(DirectoryEvent::PortabilityRequestCancelStarted(payload(
            &record,
        )))
        .await;
    node.wait_for_state(record.id, KeyState::Ready).await;
    assert_eq!(
        node.claims.get_by_id(claim.id).unwrap().unwrap().status,
        ClaimStatus::Canceled
    );

    node.shutdown().await;
}

#[tokio::test]
async fn test_portability_confirm_donates_the_key() {
    let node = TestNode::start().await;
    let record = node.seed_record("5511999990000", KeyState::PortabilityRequestConfirmOpened);
    let (record, claim) = node.seed_claim(&record, ClaimType::Portability);

    node.bus
        .publish(DirectoryEvent::PortabilityRequestConfirmOpened(payload(
            &record,
        )))
        .await;
    node.wait_for_state(record.id, KeyState::PortabilityRequestConfirmStarted)
        .await;

    node.bus
        .publish(DirectoryEvent::PortabilityRequestConfirmStarted(payload(
            &record,
        )))
        .await;
    node.wait_for_state(record.id, KeyState::Canceled).await;
    assert_eq!(
        node.claims.get_by_id(claim.id).unwrap().unwrap().status,
        ClaimStatus::Confirmed
    );

    node.shutdown().await;
}

#[tokio::test]
async fn test_administrative_cancel_by_value() {
    let node = TestNode::start().await;
    let record = node.seed_record("5511999990000", KeyState::PortabilityStarted);
    let (record, claim) = node.seed_claim(&record, ClaimType::Portability);

    node.bus
        .publish(DirectoryEvent::PortabilityCancelRequested {
            value: "5511999990000".into(),
            reason: ClaimReason::AccountClosed,
        })
        .await;

    node.wait_for_state(record.id, KeyState::PortabilityCanceled)
        .await;
    let claim = node.claims.get_by_id(claim.id).unwrap().unwrap();
    assert_eq!(claim.status, ClaimStatus::Canceled);
    assert_eq!(claim.reason, Some(ClaimReason::AccountClosed));

    node.shutdown().await;
}
