//! Client and vehicle directory queries.

use rusqlite::{params, OptionalExtension};

use super::utils::{canonical_id, row_id};
use crate::{
    error::{DatabaseResultExt, Result, TrackerError},
    models::{ClientProfile, IdKind, RecordId, Vehicle},
};

const INSERT_CLIENT_SQL: &str = "INSERT INTO clients (name, email, phone) VALUES (?1, ?2, ?3)";
const CHECK_EMAIL_SQL: &str = "SELECT EXISTS(SELECT 1 FROM clients WHERE email = ?1)";
const SELECT_CLIENT_SQL: &str = "SELECT id, name, email, phone FROM clients WHERE id = ?1";
const SELECT_CLIENT_BY_EMAIL_SQL: &str =
    "SELECT id, name, email, phone FROM clients WHERE email = ?1";
const SELECT_CLIENTS_SQL: &str = "SELECT id, name, email, phone FROM clients ORDER BY name, id";
const INSERT_VEHICLE_SQL: &str = "INSERT INTO vehicles (client_id, brand, model, year, plate, protection_level) VALUES (?1, ?2, ?3, ?4, ?5, ?6)";
const SELECT_VEHICLE_SQL: &str = "SELECT id, client_id, brand, model, year, plate, protection_level FROM vehicles WHERE id = ?1";

impl super::Database {
    fn build_client_from_row(row: &rusqlite::Row) -> rusqlite::Result<ClientProfile> {
        Ok(ClientProfile {
            id: canonical_id(row, 0, IdKind::Client)?,
            name: row.get(1)?,
            email: row.get(2)?,
            phone: row.get(3)?,
        })
    }

    fn build_vehicle_from_row(row: &rusqlite::Row) -> rusqlite::Result<Vehicle> {
        Ok(Vehicle {
            id: canonical_id(row, 0, IdKind::Vehicle)?,
            client_id: canonical_id(row, 1, IdKind::Client)?,
            brand: row.get(2)?,
            model: row.get(3)?,
            year: row.get::<_, Option<i64>>(4)?.map(|y| y as u16),
            plate: row.get(5)?,
            protection_level: row.get(6)?,
        })
    }

    /// Registers a client. E-mail addresses are unique (case-insensitive).
    pub fn insert_client(
        &mut self,
        name: &str,
        email: &str,
        phone: Option<&str>,
    ) -> Result<ClientProfile> {
        let email = email.trim();
        if name.trim().is_empty() {
            return Err(TrackerError::validation("name").with_reason("must not be empty"));
        }
        if !email.contains('@') {
            return Err(TrackerError::validation("email")
                .with_reason(format!("'{email}' is not an e-mail address")));
        }
        let taken: bool = self
            .connection
            .query_row(CHECK_EMAIL_SQL, params![email], |row| row.get(0))
            .db_context("Failed to check e-mail")?;
        if taken {
            return Err(TrackerError::validation("email")
                .with_reason(format!("'{email}' is already registered")));
        }

        self.connection
            .execute(INSERT_CLIENT_SQL, params![name.trim(), email, phone])
            .db_context("Failed to insert client")?;

        Ok(ClientProfile {
            id: RecordId::canonical(IdKind::Client, self.connection.last_insert_rowid()),
            name: name.trim().to_string(),
            email: email.to_string(),
            phone: phone.map(String::from),
        })
    }

    pub fn get_client(&self, id: &RecordId) -> Result<Option<ClientProfile>> {
        let Some(row) = id.row_id(IdKind::Client) else {
            return Ok(None);
        };
        self.connection
            .query_row(SELECT_CLIENT_SQL, params![row], Self::build_client_from_row)
            .optional()
            .db_context("Failed to get client")
    }

    pub fn get_client_by_email(&self, email: &str) -> Result<Option<ClientProfile>> {
        self.connection
            .query_row(
                SELECT_CLIENT_BY_EMAIL_SQL,
                params![email.trim()],
                Self::build_client_from_row,
            )
            .optional()
            .db_context("Failed to get client by e-mail")
    }

    pub fn list_clients(&self) -> Result<Vec<ClientProfile>> {
        let mut stmt = self
            .connection
            .prepare(SELECT_CLIENTS_SQL)
            .db_context("Failed to prepare query")?;

        let clients = stmt
            .query_map([], Self::build_client_from_row)
            .db_context("Failed to query clients")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .db_context("Failed to fetch clients")?;

        Ok(clients)
    }

    /// Registers a vehicle for an existing client.
    pub fn insert_vehicle(&mut self, vehicle: &Vehicle) -> Result<Vehicle> {
        let client_row = row_id(IdKind::Client, &vehicle.client_id)?;
        if self.get_client(&vehicle.client_id)?.is_none() {
            return Err(TrackerError::not_found("client", &vehicle.client_id));
        }

        self.connection
            .execute(
                INSERT_VEHICLE_SQL,
                params![
                    client_row,
                    vehicle.brand,
                    vehicle.model,
                    vehicle.year.map(i64::from),
                    vehicle.plate,
                    vehicle.protection_level
                ],
            )
            .db_context("Failed to insert vehicle")?;

        Ok(Vehicle {
            id: RecordId::canonical(IdKind::Vehicle, self.connection.last_insert_rowid()),
            ..vehicle.clone()
        })
    }

    pub fn get_vehicle(&self, id: &RecordId) -> Result<Option<Vehicle>> {
        let Some(row) = id.row_id(IdKind::Vehicle) else {
            return Ok(None);
        };
        self.connection
            .query_row(SELECT_VEHICLE_SQL, params![row], Self::build_vehicle_from_row)
            .optional()
            .db_context("Failed to get vehicle")
    }
}
