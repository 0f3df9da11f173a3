use std::time::Duration;

use constcat::concat;
use eventsource_stream::{Event, EventStreamError, Eventsource as _};
use futures::{stream::LocalBoxStream, StreamExt as _};
use queue_desk::{
    api, http,
    queue::{memory, Estimator},
    Desk,
};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::json;
use tokio::net::TcpListener;

pub const WINDOWS: u16 = 6;

const API: &str = "/api";
const TICKETS: &str = concat!(API, "/tickets");
const WINDOWS_PATH: &str = concat!(API, "/windows");
const DISPLAY: &str = concat!(API, "/display");
const EVENTS: &str = concat!(API, "/events");
const SEED: &str = concat!(API, "/seed");

pub struct Client {
    inner: reqwest::Client,
    base_url: String,
    pub desk: Desk,
}

impl Client {
    /// Serves a fresh in-memory desk on an ephemeral port.
    pub async fn new() -> Self {
        let desk =
            Desk::from(memory::Store::new(WINDOWS, Estimator::default()));
        Self::serve(desk).await
    }

    pub async fn serve(desk: Desk) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind a listener");
        let addr = listener.local_addr().expect("no local address");
        let app = http::router(desk.clone(), Duration::from_secs(15));
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("server failed");
        });

        Self {
            inner: reqwest::Client::new(),
            base_url: format!("http://{addr}"),
            desk,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn send<T: DeserializeOwned>(
        req: reqwest::RequestBuilder,
    ) -> Result<T, StatusCode> {
        Ok(req
            .send()
            .await
            .expect("failed to send a request")
            .error_for_status()
            .map_err(|e| e.status().expect("status error"))?
            .json::<T>()
            .await
            .expect("failed to get a response"))
    }

    /// Sends the request and returns the status with the error message.
    pub async fn error(
        &self,
        req: reqwest::RequestBuilder,
    ) -> (StatusCode, String) {
        let res = req.send().await.expect("failed to send a request");
        let status = res.status();
        let body = res
            .json::<api::Error>()
            .await
            .expect("failed to get an error body");
        (status, body.error)
    }

    pub fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.inner.post(self.url(path))
    }

    pub async fn create_ticket(
        &self,
        service: &str,
    ) -> Result<api::Ticket, StatusCode> {
        self.create_ticket_with(json!({ "service": service })).await
    }

    pub async fn create_ticket_with(
        &self,
        body: serde_json::Value,
    ) -> Result<api::Ticket, StatusCode> {
        Self::send(self.post(TICKETS).json(&body)).await
    }

    pub async fn ticket(
        &self,
        code: &str,
    ) -> Result<api::ticket::Lookup, StatusCode> {
        Self::send(self.inner.get(self.url(&format!("{TICKETS}/{code}"))))
            .await
    }

    pub async fn windows(&self) -> Result<Vec<api::Window>, StatusCode> {
        Self::send(self.inner.get(self.url(WINDOWS_PATH))).await
    }

    pub fn window_op(&self, id: i32, op: &str) -> reqwest::RequestBuilder {
        self.post(&format!("{WINDOWS_PATH}/{id}/{op}"))
    }

    pub async fn call_next(
        &self,
        window: i32,
        service: Option<&str>,
    ) -> Result<api::window::CallNext, StatusCode> {
        let mut req = self.window_op(window, "call-next");
        if let Some(service) = service {
            req = req.json(&json!({ "service": service }));
        }
        Self::send(req).await
    }

    pub async fn recall(
        &self,
        window: i32,
    ) -> Result<api::window::Recall, StatusCode> {
        Self::send(
            self.window_op(window, "recall")
                .json(&json!({ "reason": "customer not present" })),
        )
        .await
    }

    pub async fn complete(
        &self,
        window: i32,
    ) -> Result<api::window::Finished, StatusCode> {
        Self::send(self.window_op(window, "complete")).await
    }

    pub async fn skip(
        &self,
        window: i32,
    ) -> Result<api::window::Finished, StatusCode> {
        Self::send(
            self.window_op(window, "skip")
                .json(&json!({ "reason": "no show" })),
        )
        .await
    }

    pub async fn transfer(
        &self,
        window: i32,
        target: i32,
    ) -> Result<api::window::Transferred, StatusCode> {
        Self::send(
            self.window_op(window, "transfer")
                .json(&json!({ "targetWindowId": target })),
        )
        .await
    }

    pub async fn display(&self) -> Result<api::display::Response, StatusCode> {
        Self::send(self.inner.get(self.url(DISPLAY))).await
    }

    pub async fn seed(&self) -> Result<api::Ack, StatusCode> {
        Self::send(self.post(SEED)).await
    }

    pub async fn events(&self) -> EventStream {
        let res = self
            .inner
            .get(self.url(EVENTS))
            .send()
            .await
            .expect("failed to open the event stream")
            .error_for_status()
            .expect("wrong status code");
        EventStream {
            inner: res.bytes_stream().eventsource().boxed_local(),
        }
    }
}

/// Reader of a server-sent event stream.
pub struct EventStream {
    inner: LocalBoxStream<
        'static,
        Result<Event, EventStreamError<reqwest::Error>>,
    >,
}

impl EventStream {
    /// Waits for the next event and returns its name and payload.
    pub async fn next(&mut self) -> (String, serde_json::Value) {
        let event =
            tokio::time::timeout(Duration::from_secs(5), self.inner.next())
                .await
                .expect("no event within 5s")
                .expect("event stream ended")
                .expect("failed to read the event stream");
        let payload =
            serde_json::from_str(&event.data).expect("invalid payload");
        (event.event, payload)
    }

    /// Names of the next `n` events.
    pub async fn next_names(&mut self, n: usize) -> Vec<String> {
        let mut names = Vec::with_capacity(n);
        for _ in 0..n {
            names.push(self.next().await.0);
        }
        names
    }
}
