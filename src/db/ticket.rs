use std::error::Error as StdError;

use tokio_postgres::{
    types::{
        accepts, private::BytesMut, to_sql_checked, FromSql, IsNull, ToSql,
        Type,
    },
    GenericClient, Row,
};
use uuid::Uuid;

use crate::queue::{
    ticket::{Id, Service, Status},
    Code, Error, Ticket,
};

impl FromSql<'_> for Id {
    accepts!(UUID);

    fn from_sql(
        ty: &Type,
        raw: &[u8],
    ) -> Result<Self, Box<dyn StdError + Sync + Send>> {
        Uuid::from_sql(ty, raw).map(Self)
    }
}

impl ToSql for Id {
    accepts!(UUID);

    to_sql_checked!();

    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn StdError + Sync + Send>> {
        self.0.to_sql(ty, out)
    }
}

impl FromSql<'_> for Status {
    accepts!(INT2);

    fn from_sql(
        ty: &Type,
        raw: &[u8],
    ) -> Result<Self, Box<dyn StdError + Sync + Send>> {
        let repr = i16::from_sql(ty, raw)?;
        let repr = u8::try_from(repr)?;
        let status = Self::try_from(repr).map_err(|_| "invalid status")?;
        Ok(status)
    }
}

impl ToSql for Status {
    accepts!(INT2);

    to_sql_checked!();

    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn StdError + Sync + Send>> {
        let repr = i16::from((*self) as u8);
        repr.to_sql(ty, out)
    }
}

impl FromSql<'_> for Service {
    accepts!(TEXT, VARCHAR);

    fn from_sql(
        ty: &Type,
        raw: &[u8],
    ) -> Result<Self, Box<dyn StdError + Sync + Send>> {
        let name = <&str>::from_sql(ty, raw)?;
        let service = name.parse().map_err(|()| "invalid service")?;
        Ok(service)
    }
}

impl ToSql for Service {
    accepts!(TEXT, VARCHAR);

    to_sql_checked!();

    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn StdError + Sync + Send>> {
        self.as_str().to_sql(ty, out)
    }
}

/// Columns [`from_row`] expects, in `SELECT` and `RETURNING` lists.
pub(super) const COLUMNS: &str = "\
    id, service, number, status, window_id, \
    created_at, started_at, completed_at, \
    notes, owner_name, woreda";

pub(super) fn from_row(row: &Row) -> Ticket {
    Ticket {
        id: row.get("id"),
        service: row.get("service"),
        number: row.get::<_, i32>("number") as u32,
        status: row.get("status"),
        window: row.get("window_id"),
        created_at: row.get("created_at"),
        started_at: row.get("started_at"),
        completed_at: row.get("completed_at"),
        notes: row.get("notes"),
        owner_name: row.get("owner_name"),
        locality: row.get("woreda"),
    }
}

pub(super) async fn get_by_id(
    client: &(impl GenericClient + Sync),
    id: Id,
) -> Result<Option<Ticket>, Error> {
    let sql = format!("SELECT {COLUMNS} FROM tickets WHERE id = $1");
    Ok(client.query_opt(sql.as_str(), &[&id]).await?.as_ref().map(from_row))
}

pub(super) async fn get_by_code(
    client: &(impl GenericClient + Sync),
    code: Code,
) -> Result<Option<Ticket>, Error> {
    let sql = format!("SELECT {COLUMNS} FROM tickets WHERE code = $1");
    Ok(client
        .query_opt(sql.as_str(), &[&code.to_string()])
        .await?
        .as_ref()
        .map(from_row))
}

/// Moves the ticket served at `window` into a terminal status.
///
/// Matches nothing unless the ticket is still assigned to that window.
pub(super) async fn finish(
    client: &(impl GenericClient + Sync),
    id: Id,
    window: crate::queue::window::Id,
    status: Status,
) -> Result<Option<Ticket>, Error> {
    let sql = format!(
        "UPDATE tickets \
         SET status = $1, completed_at = now() \
         WHERE id = $2 AND window_id = $3 AND status IN ($4, $5) \
         RETURNING {COLUMNS}"
    );
    Ok(client
        .query_opt(
            sql.as_str(),
            &[&status, &id, &window, &Status::Serving, &Status::Transferred],
        )
        .await?
        .as_ref()
        .map(from_row))
}
