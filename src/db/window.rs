use std::error::Error as StdError;

use tokio_postgres::{
    types::{
        accepts, private::BytesMut, to_sql_checked, FromSql, IsNull, ToSql,
        Type,
    },
    GenericClient, Row,
};

use crate::queue::{
    ticket,
    window::{Id, Window},
    Error,
};

impl FromSql<'_> for Id {
    accepts!(INT4);

    fn from_sql(
        ty: &Type,
        raw: &[u8],
    ) -> Result<Self, Box<dyn StdError + Sync + Send>> {
        i32::from_sql(ty, raw).map(Self)
    }
}

impl ToSql for Id {
    accepts!(INT4);

    to_sql_checked!();

    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn StdError + Sync + Send>> {
        self.0.to_sql(ty, out)
    }
}

pub(super) fn from_row(row: &Row) -> Window {
    Window {
        id: row.get("id"),
        name: row.get("name"),
        current_ticket: row.get("current_ticket_id"),
        busy: row.get("busy"),
        updated_at: row.get("updated_at"),
    }
}

pub(super) async fn list(
    client: &(impl GenericClient + Sync),
) -> Result<Vec<Window>, Error> {
    const SQL: &str = "\
        SELECT id, name, current_ticket_id, busy, updated_at \
        FROM windows \
        ORDER BY id";
    Ok(client.query(SQL, &[]).await?.iter().map(from_row).collect())
}

/// Reads the windows and locks their rows until the transaction ends.
pub(super) async fn lock(
    client: &(impl GenericClient + Sync),
    ids: &[Id],
) -> Result<Vec<Window>, Error> {
    // Rows are locked in id order, so concurrent transfers cannot deadlock.
    const SQL: &str = "\
        SELECT id, name, current_ticket_id, busy, updated_at \
        FROM windows \
        WHERE id = ANY($1) \
        ORDER BY id \
        FOR UPDATE";
    Ok(client.query(SQL, &[&ids]).await?.iter().map(from_row).collect())
}

pub(super) async fn get(
    client: &(impl GenericClient + Sync),
    id: Id,
) -> Result<Window, Error> {
    const SQL: &str = "\
        SELECT id, name, current_ticket_id, busy, updated_at \
        FROM windows \
        WHERE id = $1";
    client
        .query_opt(SQL, &[&id])
        .await?
        .as_ref()
        .map(from_row)
        .ok_or(Error::WindowNotFound(id))
}

pub(super) async fn assign(
    client: &(impl GenericClient + Sync),
    id: Id,
    ticket: ticket::Id,
) -> Result<Window, Error> {
    const SQL: &str = "\
        UPDATE windows \
        SET current_ticket_id = $1, busy = TRUE, updated_at = now() \
        WHERE id = $2 \
        RETURNING id, name, current_ticket_id, busy, updated_at";
    client
        .query_opt(SQL, &[&ticket, &id])
        .await?
        .as_ref()
        .map(from_row)
        .ok_or(Error::WindowNotFound(id))
}

pub(super) async fn release(
    client: &(impl GenericClient + Sync),
    id: Id,
) -> Result<Window, Error> {
    const SQL: &str = "\
        UPDATE windows \
        SET current_ticket_id = NULL, busy = FALSE, updated_at = now() \
        WHERE id = $1 \
        RETURNING id, name, current_ticket_id, busy, updated_at";
    client
        .query_opt(SQL, &[&id])
        .await?
        .as_ref()
        .map(from_row)
        .ok_or(Error::WindowNotFound(id))
}
