use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use axum::{
    extract::{rejection::PathRejection, FromRequestParts, Path, State},
    http::{request, StatusCode},
    response::{
        sse::{self, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, RequestPartsExt as _, Router,
};
use derive_more::{Display, From};
use futures::{future, stream, Stream, StreamExt as _};
use tower_http::trace::TraceLayer;

use crate::{
    api,
    queue::{self, Code, Service},
    Desk,
};

/// Builds the queue API on top of the desk.
///
/// `keep_alive` is the interval of the comments keeping idle event streams
/// open.
pub fn router(desk: Desk, keep_alive: Duration) -> Router {
    Router::new()
        .route("/api/events", get(events))
        .route("/api/tickets", post(create_ticket))
        .route("/api/tickets/:code", get(get_ticket))
        .route("/api/windows", get(list_windows))
        .route("/api/windows/:id/call-next", post(call_next))
        .route("/api/windows/:id/recall", post(recall))
        .route("/api/windows/:id/complete", post(complete))
        .route("/api/windows/:id/skip", post(skip))
        .route("/api/windows/:id/transfer", post(transfer))
        .route("/api/display", get(display))
        .route("/api/seed", post(seed))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(AppState { desk, keep_alive }))
}

type SharedAppState = Arc<AppState>;

struct AppState {
    desk: Desk,

    keep_alive: Duration,
}

/// Failure of a request, answered as `{"error": ...}`.
#[derive(Debug, Display, From)]
pub enum Error {
    #[from]
    Queue(queue::Error),

    /// Window id in the path that is not a number.
    #[display("Window {_0} not found")]
    UnknownWindow(String),

    /// Transfer without a usable `targetWindowId`.
    #[display("Source or target window not found")]
    UnknownTarget,

    #[display("{}", _0.body_text())]
    #[from]
    Path(PathRejection),
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        use queue::Error as Q;

        let status = match &self {
            Self::Queue(Q::WindowNotFound(_) | Q::TicketNotFound(_))
            | Self::UnknownWindow(_)
            | Self::UnknownTarget => StatusCode::NOT_FOUND,
            Self::Queue(
                Q::NoActiveTicket
                | Q::WindowBusy(_)
                | Q::TargetBusy(_)
                | Q::SameWindow,
            ) => StatusCode::BAD_REQUEST,
            Self::Queue(Q::Db(e)) => {
                tracing::error!(error = %e, "database operation failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Path(rejection) => rejection.status(),
        };
        let body = api::Error {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Window id taken from the `:id` path segment.
struct WindowId(api::window::Id);

#[async_trait]
impl FromRequestParts<SharedAppState> for WindowId {
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut request::Parts,
        _: &SharedAppState,
    ) -> Result<Self, Self::Rejection> {
        let Path(raw) = parts.extract::<Path<String>>().await?;
        let id = raw.parse().map_err(|_| Error::UnknownWindow(raw))?;

        Ok(Self(api::window::Id(id)))
    }
}

async fn create_ticket(
    State(state): State<SharedAppState>,
    input: Option<Json<api::ticket::CreateInput>>,
) -> Result<(StatusCode, Json<api::Ticket>), Error> {
    let input = input.map(|Json(i)| i).unwrap_or_default();

    let ticket = state.desk.create_ticket(input.into()).await?;

    Ok((StatusCode::CREATED, Json(api::Ticket::from(&ticket))))
}

async fn get_ticket(
    State(state): State<SharedAppState>,
    code: Result<Path<String>, PathRejection>,
) -> Result<Json<api::ticket::Lookup>, Error> {
    let Path(code) = code?;
    let code = code
        .parse::<Code>()
        .map_err(|_| queue::Error::TicketNotFound(code))?;
    let status = state.desk.ticket_status(code).await?;

    Ok(Json(api::ticket::Lookup::from(&status)))
}

async fn list_windows(
    State(state): State<SharedAppState>,
) -> Result<Json<Vec<api::Window>>, Error> {
    let windows = state.desk.windows().await?;

    Ok(Json(windows.iter().map(api::Window::from).collect()))
}

async fn call_next(
    State(state): State<SharedAppState>,
    WindowId(id): WindowId,
    input: Option<Json<api::window::CallNextInput>>,
) -> Result<Json<api::window::CallNext>, Error> {
    let input = input.map(|Json(i)| i).unwrap_or_default();
    let service = Service::parse_or_default(input.service.as_deref());

    let Some((called, display)) = state.desk.call_next(id, service).await?
    else {
        return Ok(Json(api::window::CallNext::Empty {
            message: api::window::CallNext::NO_TICKETS_WAITING.to_owned(),
        }));
    };

    Ok(Json(api::window::CallNext::Called {
        window: api::Window::from(&called.window),
        ticket: api::Ticket::from(&called.ticket),
        display: api::display::rows(&display),
    }))
}

async fn recall(
    State(state): State<SharedAppState>,
    WindowId(id): WindowId,
    input: Option<Json<api::window::ReasonInput>>,
) -> Result<Json<api::window::Recall>, Error> {
    if let Some(reason) = input.and_then(|Json(i)| i.reason) {
        tracing::debug!(window = %id, %reason, "recall requested");
    }

    let (ticket, display) = state.desk.recall(id).await?;

    Ok(Json(api::window::Recall {
        ok: true,
        ticket: api::Ticket::from(&ticket),
        display: api::display::rows(&display),
    }))
}

async fn complete(
    State(state): State<SharedAppState>,
    WindowId(id): WindowId,
) -> Result<Json<api::window::Finished>, Error> {
    let (done, display) = state.desk.complete(id).await?;

    Ok(Json(finished(&done, &display)))
}

async fn skip(
    State(state): State<SharedAppState>,
    WindowId(id): WindowId,
    input: Option<Json<api::window::ReasonInput>>,
) -> Result<Json<api::window::Finished>, Error> {
    let reason = input.and_then(|Json(i)| i.reason);

    let (skipped, display) = state.desk.skip(id, reason.as_deref()).await?;

    Ok(Json(finished(&skipped, &display)))
}

fn finished(
    assignment: &queue::Assignment,
    display: &[queue::DisplayRow],
) -> api::window::Finished {
    api::window::Finished {
        ok: true,
        ticket: api::Ticket::from(&assignment.ticket),
        window: api::Window::from(&assignment.window),
        display: api::display::rows(display),
    }
}

async fn transfer(
    State(state): State<SharedAppState>,
    WindowId(id): WindowId,
    input: Option<Json<api::window::TransferInput>>,
) -> Result<Json<api::window::Transferred>, Error> {
    let target = input
        .and_then(|Json(i)| i.target_window_id)
        .ok_or(Error::UnknownTarget)?;

    let (moved, display) = state.desk.transfer(id, target).await?;

    Ok(Json(api::window::Transferred {
        ok: true,
        ticket: api::Ticket::from(&moved.ticket),
        source: api::Window::from(&moved.source),
        target: api::Window::from(&moved.target),
        display: api::display::rows(&display),
    }))
}

async fn display(
    State(state): State<SharedAppState>,
) -> Result<Json<api::display::Response>, Error> {
    let rows = state.desk.display_rows().await?;

    Ok(Json(api::display::Response {
        rows: api::display::rows(&rows),
    }))
}

async fn seed(
    State(state): State<SharedAppState>,
) -> Result<Json<api::Ack>, Error> {
    state.desk.seed().await?;

    Ok(Json(api::Ack { ok: true }))
}

async fn events(
    State(state): State<SharedAppState>,
) -> Result<
    Sse<impl Stream<Item = Result<sse::Event, axum::Error>>>,
    Error,
> {
    let (init, subscription) = state.desk.subscribe().await?;

    let stream = stream::once(future::ready(init))
        .chain(subscription)
        .map(|event| to_sse(&event));

    Ok(Sse::new(stream)
        .keep_alive(KeepAlive::new().interval(state.keep_alive)))
}

/// Encodes the event payload under the event's name.
fn to_sse(event: &api::Event) -> Result<sse::Event, axum::Error> {
    use api::Event as Ev;

    let sse = sse::Event::default().event(event.kind());
    match event {
        Ev::Init(snapshot) => sse.json_data(snapshot),
        Ev::WindowUpdated(window) => sse.json_data(window),
        Ev::TicketCreated(ticket) | Ev::TicketUpdated(ticket) => {
            sse.json_data(ticket)
        }
        Ev::DisplayUpdated(rows) => sse.json_data(rows),
    }
}
