use std::sync::Arc;

use client::{
    DEFAULT_API_ERROR_MESSAGE, DomainError, Repository,
    transport::{Method, MockTransport},
};
use ledger::{MemberKey, Money};
use rstest::rstest;
use serde_json::{Value, json};

fn repository() -> (Repository, MockTransport) {
    let transport = MockTransport::new();
    (Repository::new(Arc::new(transport.clone())), transport)
}

fn group_json(id: i64) -> Value {
    json!({
        "id": id,
        "name": "Lisbon",
        "description": "spring trip",
        "estimated_price_minor": 120000,
        "currency": "EUR",
        "created_at": "2024-04-02T18:30:00+02:00",
        "owner_id": 1,
        "is_owner": true,
        "registered_members": [
            {"id": 1, "display_name": "Ann", "phone": "+391"},
            {"id": 2, "display_name": "Ben", "phone": "+392"}
        ],
        "external_members": [
            {"id": 1, "display_name": "Cleo"}
        ]
    })
}

fn expenses_json(group_id: i64) -> Value {
    json!({
        "expenses": [
            {
                "id": 10,
                "group_id": group_id,
                "total_minor": 9000,
                "creditor_registered_id": 1,
                "creditor_external_id": null,
                "registered_splits": [
                    {"id": 100, "debtor_id": 1, "amount_minor": 3000},
                    {"id": 101, "debtor_id": 2, "amount_minor": 3000}
                ],
                "external_splits": [
                    {"id": 200, "debtor_external_id": 1, "amount_minor": 3000}
                ]
            }
        ]
    })
}

enum Outcome {
    Connection,
    Api(u16, &'static str),
    Shape,
    Success,
}

/// Feeds every kind of transport outcome through the boundary.
#[rstest]
#[case::transport_failure(None, Outcome::Connection)]
#[case::api_error_with_message(
    Some((404, br#"{"message":"group not found"}"#.to_vec())),
    Outcome::Api(404, "group not found")
)]
#[case::api_error_with_garbage(
    Some((500, b"<html>Internal Server Error</html>".to_vec())),
    Outcome::Api(500, DEFAULT_API_ERROR_MESSAGE)
)]
#[case::api_error_with_other_json(
    Some((409, br#"{"error":"conflict"}"#.to_vec())),
    Outcome::Api(409, DEFAULT_API_ERROR_MESSAGE)
)]
#[case::api_error_with_empty_body(
    Some((401, Vec::new())),
    Outcome::Api(401, DEFAULT_API_ERROR_MESSAGE)
)]
#[case::malformed_success(Some((200, br#"{"groups": "nope"}"#.to_vec())), Outcome::Shape)]
#[case::non_json_success(Some((200, b"ok".to_vec())), Outcome::Shape)]
#[case::success(
    Some((200, json!({"groups": [group_json(1)]}).to_string().into_bytes())),
    Outcome::Success
)]
#[tokio::test]
async fn every_outcome_maps_to_exactly_one_result(
    #[case] response: Option<(u16, Vec<u8>)>,
    #[case] expected: Outcome,
) {
    let (repository, transport) = repository();
    match response {
        Some((status, body)) => transport.push_raw(status, body),
        None => transport.push_connection_failure("connection refused"),
    }

    let result = repository.fetch_groups().await;

    match (result, expected) {
        (Err(DomainError::Connection(message)), Outcome::Connection) => {
            assert!(message.contains("connection refused"));
        }
        (Err(DomainError::Api { status, message }), Outcome::Api(want_status, want_message)) => {
            assert_eq!(status, want_status);
            assert_eq!(message, want_message);
        }
        (Err(DomainError::UnexpectedShape(_)), Outcome::Shape) => {}
        (Ok(groups), Outcome::Success) => assert_eq!(groups.len(), 1),
        (other, _) => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(transport.requests().len(), 1);
}

#[tokio::test]
async fn load_group_combines_membership_and_expenses() {
    let (repository, transport) = repository();
    transport.push_json(200, group_json(3));
    transport.push_json(200, expenses_json(3));

    let group = repository.load_group(3).await.unwrap();

    assert_eq!(group.name(), "Lisbon");
    assert_eq!(group.estimated_price(), Some(Money::new(120_000)));
    assert_eq!(group.expenses().len(), 1);
    assert_eq!(
        group.balance_of(MemberKey::Registered(1)).unwrap(),
        Money::new(-6_000)
    );
    assert_eq!(
        group.balance_of(MemberKey::External(1)).unwrap(),
        Money::new(3_000)
    );

    let paths: Vec<String> = transport.requests().into_iter().map(|r| r.path).collect();
    assert_eq!(paths, vec!["groups/3", "groups/3/expenses"]);
}

#[tokio::test]
async fn split_referencing_unknown_member_is_unexpected_shape() {
    let (repository, transport) = repository();
    transport.push_json(200, group_json(3));
    transport.push_json(
        200,
        json!({
            "expenses": [{
                "id": 11,
                "group_id": 3,
                "total_minor": 500,
                "creditor_registered_id": 1,
                "creditor_external_id": null,
                "registered_splits": [{"id": 110, "debtor_id": 99, "amount_minor": 500}],
                "external_splits": []
            }]
        }),
    );

    let err = repository.load_group(3).await.unwrap_err();
    assert_eq!(
        err,
        DomainError::UnexpectedShape(
            "Unknown member: expense 11 references registered:99".to_string()
        )
    );
}

#[tokio::test]
async fn expense_with_two_creditors_is_unexpected_shape() {
    let (repository, transport) = repository();
    transport.push_json(
        200,
        json!({
            "expenses": [{
                "id": 12,
                "group_id": 3,
                "total_minor": 500,
                "creditor_registered_id": 1,
                "creditor_external_id": 1
            }]
        }),
    );

    let err = repository.fetch_group_expenses(3).await.unwrap_err();
    assert!(matches!(err, DomainError::UnexpectedShape(_)));
}

#[tokio::test]
async fn overflowing_splits_are_unexpected_shape() {
    let (repository, transport) = repository();
    transport.push_json(
        200,
        json!({
            "expenses": [{
                "id": 13,
                "group_id": 3,
                "total_minor": 100,
                "creditor_registered_id": 1,
                "creditor_external_id": null,
                "registered_splits": [
                    {"id": 130, "debtor_id": 1, "amount_minor": i64::MAX},
                    {"id": 131, "debtor_id": 2, "amount_minor": 1}
                ]
            }]
        }),
    );

    let err = repository.fetch_group_expenses(3).await.unwrap_err();
    assert_eq!(
        err,
        DomainError::UnexpectedShape("Amount overflow".to_string())
    );
}

#[tokio::test]
async fn owner_outside_membership_is_unexpected_shape() {
    let (repository, transport) = repository();
    let mut group = group_json(5);
    group["owner_id"] = json!(42);
    transport.push_json(200, json!({ "groups": [group] }));

    let err = repository.fetch_groups().await.unwrap_err();
    assert!(matches!(err, DomainError::UnexpectedShape(_)));
}

#[tokio::test]
async fn member_operations_return_updated_membership() {
    let (repository, transport) = repository();
    transport.push_json(200, group_json(3));
    transport.push_json(200, group_json(3));

    let group = repository.add_external_member(3, "Cleo").await.unwrap();
    assert_eq!(group.external_members()[0].display_name, "Cleo");
    let group = repository
        .add_registered_member(3, "+392")
        .await
        .unwrap();
    assert_eq!(group.registered_members().len(), 2);

    let requests = transport.requests();
    assert_eq!(requests[0].method, Method::Post);
    assert_eq!(requests[0].path, "groups/3/members");
    assert_eq!(
        requests[0].body,
        Some(json!({"kind": "external", "display_name": "Cleo"}))
    );
    assert_eq!(
        requests[1].body,
        Some(json!({"kind": "registered", "phone": "+392"}))
    );
}

#[tokio::test]
async fn notifications_endpoints() {
    let (repository, transport) = repository();
    let notifications = json!({
        "notifications": [
            {"id": 1, "message": "Ben added an expense", "created_at": "2024-04-03T08:00:00Z", "is_read": false}
        ]
    });
    transport.push_json(200, notifications.clone());
    transport.push_json(200, notifications);
    transport.push_raw(204, Vec::new());

    assert_eq!(repository.fetch_notifications().await.unwrap().len(), 1);
    let unread = repository.fetch_unread_notifications().await.unwrap();
    assert_eq!(unread[0].message, "Ben added an expense");
    repository.mark_notification_read(1).await.unwrap();

    let paths: Vec<String> = transport.requests().into_iter().map(|r| r.path).collect();
    assert_eq!(
        paths,
        vec!["notifications", "notifications/unread", "notifications/1/read"]
    );
}
