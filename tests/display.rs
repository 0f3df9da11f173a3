pub mod common;

use queue_desk::api::{
    display::{NowServing, Row},
    ticket::Service,
    window::Id,
};

use self::common::Client;

fn row(rows: &[Row], service: Service) -> &Row {
    rows.iter()
        .find(|row| row.service == service)
        .expect("every service has a row")
}

#[tokio::test]
async fn starts_blank() {
    let client = Client::new().await;

    let display = client.display().await.expect("display");

    let services = display.rows.iter().map(|r| r.service).collect::<Vec<_>>();
    assert_eq!(services, Service::ALL);
    for row in &display.rows {
        assert_eq!(row.now_serving, NowServing::default());
        assert_eq!(row.next, None);
    }
}

#[tokio::test]
async fn shows_serving_and_next() {
    let client = Client::new().await;
    for _ in 0..3 {
        client.create_ticket("S1").await.expect("created");
    }
    client.create_ticket("S2").await.expect("created");
    client.call_next(3, Some("S1")).await.expect("called");

    let rows = client.display().await.expect("display").rows;

    let s1 = row(&rows, Service::S1);
    assert_eq!(s1.now_serving.code.as_deref(), Some("S1-001"));
    assert_eq!(s1.now_serving.window_id, Some(Id(3)));
    assert_eq!(s1.next.as_deref(), Some("S1-002"));
    let s2 = row(&rows, Service::S2);
    assert_eq!(s2.now_serving, NowServing::default());
    assert_eq!(s2.next.as_deref(), Some("S2-001"));
    assert_eq!(row(&rows, Service::S3).next, None);
}

#[tokio::test]
async fn shows_most_recent_window_of_service() {
    let client = Client::new().await;
    client.create_ticket("S1").await.expect("created");
    client.create_ticket("S1").await.expect("created");
    client.call_next(1, Some("S1")).await.expect("called");
    client.call_next(2, Some("S1")).await.expect("called");

    let rows = client.display().await.expect("display").rows;

    let s1 = row(&rows, Service::S1);
    assert_eq!(s1.now_serving.code.as_deref(), Some("S1-002"));
    assert_eq!(s1.now_serving.window_id, Some(Id(2)));
    assert_eq!(s1.next, None);
}

#[tokio::test]
async fn follows_transfers_and_completion() {
    let client = Client::new().await;
    client.create_ticket("S3").await.expect("created");
    client.call_next(1, Some("S3")).await.expect("called");

    let moved = client.transfer(1, 6).await.expect("transferred");
    let s3 = row(&moved.display, Service::S3);
    assert_eq!(s3.now_serving.code.as_deref(), Some("S3-001"));
    assert_eq!(s3.now_serving.window_id, Some(Id(6)));

    let done = client.complete(6).await.expect("completed");
    let s3 = row(&done.display, Service::S3);
    assert_eq!(s3.now_serving, NowServing::default());
}
