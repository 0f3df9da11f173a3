use serde::{Deserialize, Serialize};

use crate::queue;

pub use crate::queue::{ticket::Service, window};

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Row {
    pub service: Service,
    pub now_serving: NowServing,
    pub next: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NowServing {
    pub code: Option<String>,
    pub window_id: Option<window::Id>,
}

impl From<&queue::DisplayRow> for Row {
    fn from(row: &queue::DisplayRow) -> Self {
        let now_serving = row
            .now_serving
            .map(|(code, window)| NowServing {
                code: Some(code.to_string()),
                window_id: Some(window),
            })
            .unwrap_or_default();
        Self {
            service: row.service,
            now_serving,
            next: row.next.map(|code| code.to_string()),
        }
    }
}

pub fn rows(rows: &[queue::DisplayRow]) -> Vec<Row> {
    rows.iter().map(Row::from).collect()
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Response {
    pub rows: Vec<Row>,
}
