use datatrans_gateway::{notification_status, GatewayError, ProtocolError, TransactionKind};

use crate::support::*;

mod support;

#[tokio::test]
async fn alias_registration_notification() {
    let t = TestGateway::new(StubTransport::new(200, ""));
    let result = t.gateway.handle_notification(ALIAS_SUCCESS).await;
    assert_eq!(notification_status(&result), 200);
    let stored = result.unwrap();
    assert_eq!(stored.record.kind(), TransactionKind::AliasRegistration);
    assert!(stored.record.is_success());
    assert_eq!(stored.record.card().and_then(|c| c.card_alias.as_deref()), Some("70119122433810042"));
    assert!(stored.record.card().and_then(|c| c.expiry_date).is_some());
    assert_eq!(t.store.all().len(), 1);
    assert_eq!(t.transport.call_count(), 0);
    assert_eq!(t.shut_down().await, [1, 0, 0, 0]);
}

#[tokio::test]
async fn payment_notification() {
    let t = TestGateway::new(StubTransport::new(200, ""));
    let stored = t.gateway.handle_notification(PAYMENT_SUCCESS).await.unwrap();
    assert_eq!(stored.record.kind(), TransactionKind::Payment);
    assert_eq!(stored.record.to_string(), "Payment 170719094930353253 (successful)");
    assert_eq!(t.shut_down().await, [0, 1, 0, 0]);
}

#[tokio::test]
async fn declined_notifications_are_stored() {
    let t = TestGateway::new(StubTransport::new(200, ""));
    let result = t.gateway.handle_notification(PAYMENT_DECLINED).await;
    assert_eq!(notification_status(&result), 200);
    assert!(!result.unwrap().record.is_success());
    let result = t.gateway.handle_notification(ALIAS_DECLINED).await;
    assert_eq!(notification_status(&result), 200);
    assert_eq!(t.store.len(), 2);
    assert_eq!(t.shut_down().await, [1, 1, 0, 0]);
}

#[tokio::test]
async fn forged_notifications_are_rejected() {
    let t = TestGateway::new(StubTransport::new(200, ""));
    let result = t.gateway.handle_notification(ALIAS_WRONG_SIGN2).await;
    assert_eq!(notification_status(&result), 403);
    assert!(matches!(result, Err(GatewayError::Protocol(ProtocolError::SignatureMismatch(_)))));
    assert!(t.store.is_empty());
    assert_eq!(t.shut_down().await, [0, 0, 0, 0]);
}

#[tokio::test]
async fn malformed_notifications_are_rejected() {
    let t = TestGateway::new(StubTransport::new(200, ""));
    let result = t.gateway.handle_notification("<uppTransactionService><body></uppTransactionService>").await;
    assert_eq!(notification_status(&result), 400);
    let result = t.gateway.handle_notification("not xml at all").await;
    assert_eq!(notification_status(&result), 400);
    assert!(t.store.is_empty());
    assert_eq!(t.shut_down().await, [0, 0, 0, 0]);
}

#[tokio::test]
async fn redelivered_notifications_are_accepted_once() {
    let t = TestGateway::new(StubTransport::new(200, ""));
    let first = t.gateway.handle_notification(PAYMENT_SUCCESS).await;
    assert_eq!(notification_status(&first), 200);
    let first_id = first.unwrap().id;
    for _ in 0..2 {
        let again = t.gateway.handle_notification(PAYMENT_SUCCESS).await;
        assert_eq!(notification_status(&again), 200);
        assert_eq!(again.unwrap().id, first_id);
    }
    assert_eq!(t.store.len(), 1);
    assert_eq!(t.shut_down().await, [0, 1, 0, 0]);
}

#[tokio::test]
async fn redelivered_declines_are_accepted_once() {
    let t = TestGateway::new(StubTransport::new(200, ""));
    for _ in 0..3 {
        let result = t.gateway.handle_notification(PAYMENT_DECLINED).await;
        assert_eq!(notification_status(&result), 200);
    }
    assert_eq!(t.store.len(), 1);
    assert_eq!(t.shut_down().await, [0, 1, 0, 0]);
}
