use std::{fmt, str::FromStr};

use derive_more::Display;
use enum_utils::TryFromRepr;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::window;

#[derive(Clone, Debug)]
pub struct Ticket {
    pub id: Id,
    pub service: Service,
    pub number: u32,
    pub status: Status,
    pub window: Option<window::Id>,
    pub created_at: OffsetDateTime,
    pub started_at: Option<OffsetDateTime>,
    pub completed_at: Option<OffsetDateTime>,
    pub notes: Option<String>,
    pub owner_name: Option<String>,
    pub locality: Option<String>,
}

impl Ticket {
    pub fn code(&self) -> Code {
        Code::new(self.service, self.number)
    }
}

/// Fields supplied by the customer when taking a ticket.
#[derive(Clone, Debug, Default)]
pub struct New {
    pub service: Service,
    pub notes: Option<String>,
    pub owner_name: Option<String>,
    pub locality: Option<String>,
}

#[derive(
    Clone, Copy, Debug, Default, Deserialize, Display, Eq, Hash, PartialEq,
    Serialize,
)]
pub struct Id(pub(crate) Uuid);

impl Id {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    enum_utils::FromStr,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
pub enum Service {
    #[default]
    S1,
    S2,
    S3,
}

impl Service {
    pub const ALL: [Self; 3] = [Self::S1, Self::S2, Self::S3];

    /// Parses a client-supplied service name, falling back to the first
    /// service when it is missing or unknown.
    pub fn parse_or_default(name: Option<&str>) -> Self {
        match name.map(str::parse::<Self>) {
            Some(Ok(service)) => service,
            Some(Err(())) => {
                tracing::warn!(
                    service = name.unwrap_or_default(),
                    fallback = %Self::default(),
                    "unknown service requested",
                );
                Self::default()
            }
            None => Self::default(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::S1 => "S1",
            Self::S2 => "S2",
            Self::S3 => "S3",
        }
    }
}

#[derive(
    Clone, Copy, Debug, Deserialize, Eq, TryFromRepr, PartialEq, Serialize,
)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Status {
    /// Queued at the tail of its service line.
    Waiting = 1,

    /// Called to a window.
    Serving = 2,

    /// Served to completion.
    Done = 3,

    /// Called but abandoned.
    Skipped = 4,

    /// Moved to another window, which is now serving it.
    Transferred = 5,
}

impl Status {
    /// Whether a window currently holds a ticket in this status.
    pub fn is_assigned(self) -> bool {
        matches!(self, Self::Serving | Self::Transferred)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Skipped)
    }
}

/// Human-readable ticket code, e.g. `S1-005`.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Code {
    pub service: Service,
    pub number: u32,
}

impl Code {
    pub fn new(service: Service, number: u32) -> Self {
        Self { service, number }
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:03}", self.service, self.number)
    }
}

#[derive(Clone, Debug, Display, Eq, PartialEq)]
#[display("invalid ticket code: {_0}")]
pub struct InvalidCode(String);

impl FromStr for Code {
    type Err = InvalidCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidCode(s.to_owned());

        let (service, number) = s.split_once('-').ok_or_else(invalid)?;
        let service = service.parse::<Service>().map_err(|()| invalid())?;
        if !number.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let number = number.parse::<u32>().map_err(|_| invalid())?;

        // Only the canonical zero-padded spelling names a ticket.
        let code = Self { service, number };
        if code.to_string() != s {
            return Err(invalid());
        }
        Ok(code)
    }
}
