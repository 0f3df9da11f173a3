pub mod common;

use queue_desk::api::{
    self,
    ticket::{Service, Status},
    window::{CallNext, Id},
};
use reqwest::StatusCode;
use serde_json::json;

use self::common::{Client, WINDOWS};

fn called(outcome: CallNext) -> (api::Window, api::Ticket) {
    match outcome {
        CallNext::Called { window, ticket, .. } => (window, ticket),
        CallNext::Empty { message } => panic!("nothing called: {message}"),
    }
}

#[tokio::test]
async fn lists_idle_windows() {
    let client = Client::new().await;

    let windows = client.windows().await.expect("windows");

    assert_eq!(windows.len(), usize::from(WINDOWS));
    for (n, window) in (1..).zip(&windows) {
        assert_eq!(window.id, Id(n));
        assert_eq!(window.name, format!("Window {n}"));
        assert!(!window.busy);
        assert_eq!(window.current_ticket_id, None);
    }
}

#[tokio::test]
async fn reports_empty_queue() {
    let client = Client::new().await;
    client.create_ticket("S2").await.expect("created");

    let outcome = client.call_next(1, Some("S1")).await.expect("answered");

    match outcome {
        CallNext::Empty { message } => {
            assert_eq!(message, CallNext::NO_TICKETS_WAITING);
        }
        CallNext::Called { ticket, .. } => panic!("called {}", ticket.code),
    }
    let windows = client.windows().await.expect("windows");
    assert!(!windows[0].busy);
}

#[tokio::test]
async fn calls_oldest_ticket_of_default_service() {
    let client = Client::new().await;
    client.create_ticket("S1").await.expect("created");
    client.create_ticket("S1").await.expect("created");

    let (window, ticket) =
        called(client.call_next(2, None).await.expect("called"));

    assert_eq!(ticket.code, "S1-001");
    assert_eq!(ticket.status, Status::Serving);
    assert_eq!(ticket.window_id, Some(Id(2)));
    assert!(ticket.started_at.is_some());
    assert!(window.busy);
    assert_eq!(window.current_ticket_id, Some(ticket.id));
}

#[tokio::test]
async fn refuses_call_on_busy_window() {
    let client = Client::new().await;
    client.create_ticket("S1").await.expect("created");
    client.create_ticket("S1").await.expect("created");
    client.call_next(1, Some("S1")).await.expect("called");

    let (status, error) = client
        .error(client.window_op(1, "call-next").json(&json!({})))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error, "Window 1 is already serving a ticket");
    let lookup = client.ticket("S1-002").await.expect("found");
    assert_eq!(lookup.ticket.status, Status::Waiting);
}

#[tokio::test]
async fn recalls_current_ticket() {
    let client = Client::new().await;
    client.create_ticket("S3").await.expect("created");
    client.call_next(4, Some("S3")).await.expect("called");

    let recall = client.recall(4).await.expect("recalled");

    assert!(recall.ok);
    assert_eq!(recall.ticket.code, "S3-001");
    assert_eq!(recall.ticket.status, Status::Serving);
}

#[tokio::test]
async fn refuses_recall_without_ticket() {
    let client = Client::new().await;

    let (status, error) =
        client.error(client.window_op(3, "recall")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error, "No active ticket");
}

#[tokio::test]
async fn completes_and_frees_window() {
    let client = Client::new().await;
    client.create_ticket("S1").await.expect("created");
    client.call_next(1, Some("S1")).await.expect("called");

    let done = client.complete(1).await.expect("completed");

    assert!(done.ok);
    assert_eq!(done.ticket.status, Status::Done);
    assert!(done.ticket.completed_at.is_some());
    assert!(!done.window.busy);
    assert_eq!(done.window.current_ticket_id, None);
    assert_eq!(
        client.complete(1).await.expect_err("nothing to complete"),
        StatusCode::BAD_REQUEST,
    );
}

#[tokio::test]
async fn skips_and_frees_window() {
    let client = Client::new().await;
    client.create_ticket("S2").await.expect("created");
    client.create_ticket("S2").await.expect("created");
    client.call_next(1, Some("S2")).await.expect("called");

    let skipped = client.skip(1).await.expect("skipped");

    assert_eq!(skipped.ticket.code, "S2-001");
    assert_eq!(skipped.ticket.status, Status::Skipped);
    assert!(!skipped.window.busy);
    let (_, next) =
        called(client.call_next(1, Some("S2")).await.expect("called"));
    assert_eq!(next.code, "S2-002");
}

#[tokio::test]
async fn transfers_to_idle_window() {
    let client = Client::new().await;
    client.create_ticket("S1").await.expect("created");
    client.call_next(1, Some("S1")).await.expect("called");

    let moved = client.transfer(1, 5).await.expect("transferred");

    assert!(moved.ok);
    assert_eq!(moved.ticket.status, Status::Transferred);
    assert_eq!(moved.ticket.window_id, Some(Id(5)));
    assert!(!moved.source.busy);
    assert_eq!(moved.source.current_ticket_id, None);
    assert!(moved.target.busy);
    assert_eq!(moved.target.current_ticket_id, Some(moved.ticket.id));

    let done = client.complete(5).await.expect("completed");
    assert_eq!(done.ticket.status, Status::Done);
    assert_eq!(done.ticket.service, Service::S1);
}

#[tokio::test]
async fn refuses_invalid_transfers() {
    let client = Client::new().await;
    client.create_ticket("S1").await.expect("created");
    client.create_ticket("S1").await.expect("created");
    client.call_next(1, Some("S1")).await.expect("called");
    client.call_next(2, Some("S1")).await.expect("called");

    let to = |target: i32| {
        client
            .window_op(1, "transfer")
            .json(&json!({ "targetWindowId": target }))
    };

    let (status, _) = client.error(to(2)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = client.error(to(1)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, error) = client.error(to(42)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error, "Window 42 not found");

    let (status, error) = client
        .error(
            client
                .window_op(3, "transfer")
                .json(&json!({ "targetWindowId": 4 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error, "No active ticket");
}

#[tokio::test]
async fn unknown_window_is_not_found() {
    let client = Client::new().await;
    client.create_ticket("S1").await.expect("created");

    for op in ["call-next", "recall", "complete", "skip"] {
        let (status, error) = client.error(client.window_op(99, op)).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{op}");
        assert_eq!(error, "Window 99 not found", "{op}");
    }
    let lookup = client.ticket("S1-001").await.expect("found");
    assert_eq!(lookup.ticket.status, Status::Waiting);
}

#[tokio::test]
async fn refuses_transfer_without_usable_target() {
    let client = Client::new().await;
    client.create_ticket("S1").await.expect("created");
    client.call_next(1, Some("S1")).await.expect("called");

    for body in [json!({}), json!({ "targetWindowId": "2" })] {
        let (status, error) = client
            .error(client.window_op(1, "transfer").json(&body))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{body}");
        assert_eq!(error, "Source or target window not found", "{body}");
    }
    let (status, error) = client.error(client.window_op(1, "transfer")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error, "Source or target window not found");

    let windows = client.windows().await.expect("windows");
    assert!(windows[0].busy);
}

#[tokio::test]
async fn non_numeric_window_is_not_found() {
    let client = Client::new().await;

    for op in ["call-next", "recall", "complete", "skip", "transfer"] {
        let path = format!("/api/windows/abc/{op}");
        let (status, error) = client.error(client.post(&path)).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{op}");
        assert_eq!(error, "Window abc not found", "{op}");
    }
}
