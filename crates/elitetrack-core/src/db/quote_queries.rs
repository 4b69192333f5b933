//! Quote queries.

use jiff::Timestamp;
use rusqlite::{params, OptionalExtension};

use super::utils::{canonical_id, opt_string, opt_timestamp, parsed, row_id, timestamp};
use crate::{
    error::{DatabaseResultExt, Result, TrackerError},
    models::{IdKind, QuoteFilter, QuotePatch, QuoteRecord, QuoteVehicle, RecordId},
};

const QUOTE_COLUMNS: &str = "id, client_id, project_id, vehicle_brand, vehicle_model, vehicle_year, vehicle_plate, protection_level, service_type, description, status, created_at, estimated_price, estimated_days, executor_notes, executor_id, executor_name, responded_at, client_response, approved_at, rejected_at";
const INSERT_QUOTE_SQL: &str = "INSERT INTO quotes (client_id, project_id, vehicle_brand, vehicle_model, vehicle_year, vehicle_plate, protection_level, service_type, description, status, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)";
const UPDATE_QUOTE_SQL: &str = "UPDATE quotes SET status = ?1, project_id = ?2, estimated_price = ?3, estimated_days = ?4, executor_notes = ?5, executor_id = ?6, executor_name = ?7, responded_at = ?8, client_response = ?9, approved_at = ?10, rejected_at = ?11 WHERE id = ?12";

impl super::Database {
    fn build_quote_from_row(row: &rusqlite::Row) -> rusqlite::Result<QuoteRecord> {
        Ok(QuoteRecord {
            id: canonical_id(row, 0, IdKind::Quote)?,
            client_id: RecordId::new(row.get::<_, String>(1)?),
            project_id: row.get::<_, Option<String>>(2)?.map(RecordId::new),
            vehicle: QuoteVehicle {
                brand: row.get(3)?,
                model: row.get(4)?,
                year: row.get::<_, Option<i64>>(5)?.map(|y| y as u16),
                plate: row.get(6)?,
            },
            protection_level: row.get(7)?,
            service_type: row.get(8)?,
            description: row.get(9)?,
            status: parsed(row, 10)?,
            created_at: timestamp(row, 11)?,
            estimated_price: row.get(12)?,
            estimated_days: row.get::<_, Option<i64>>(13)?.map(|d| d as u32),
            executor_notes: row.get(14)?,
            executor_id: row.get::<_, Option<String>>(15)?.map(RecordId::new),
            executor_name: row.get(16)?,
            responded_at: opt_timestamp(row, 17)?,
            client_response: row.get(18)?,
            approved_at: opt_timestamp(row, 19)?,
            rejected_at: opt_timestamp(row, 20)?,
        })
    }

    fn get_quote(&self, row: i64) -> Result<Option<QuoteRecord>> {
        self.connection
            .query_row(
                &format!("SELECT {QUOTE_COLUMNS} FROM quotes WHERE id = ?1"),
                params![row],
                Self::build_quote_from_row,
            )
            .optional()
            .db_context("Failed to get quote")
    }

    /// Stores a new quote request; the store assigns id and creation time.
    pub fn insert_quote(&mut self, draft: &QuoteRecord) -> Result<QuoteRecord> {
        let created_at = Timestamp::now();
        self.connection
            .execute(
                INSERT_QUOTE_SQL,
                params![
                    draft.client_id.as_str(),
                    draft.project_id.as_ref().map(RecordId::as_str),
                    draft.vehicle.brand,
                    draft.vehicle.model,
                    draft.vehicle.year.map(i64::from),
                    draft.vehicle.plate,
                    draft.protection_level,
                    draft.service_type,
                    draft.description,
                    draft.status.as_str(),
                    created_at.to_string()
                ],
            )
            .db_context("Failed to insert quote")?;

        let row = self.connection.last_insert_rowid();
        self.get_quote(row)?
            .ok_or_else(|| TrackerError::not_found("quote", RecordId::canonical(IdKind::Quote, row)))
    }

    /// Lists quotes matching the filter, oldest first.
    pub fn list_quotes(&self, filter: &QuoteFilter) -> Result<Vec<QuoteRecord>> {
        let mut stmt = self
            .connection
            .prepare(&format!(
                "SELECT {QUOTE_COLUMNS} FROM quotes WHERE (?1 IS NULL OR client_id = ?1) ORDER BY created_at, id"
            ))
            .db_context("Failed to prepare query")?;

        let quotes = stmt
            .query_map(
                params![filter.client_id.as_ref().map(RecordId::as_str)],
                Self::build_quote_from_row,
            )
            .db_context("Failed to query quotes")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .db_context("Failed to fetch quotes")?;

        Ok(quotes
            .into_iter()
            .filter(|q| filter.matches(&q.client_id, q.status))
            .collect())
    }

    /// Applies a patch to a quote and returns the stored record.
    pub fn update_quote(&mut self, id: &RecordId, patch: &QuotePatch) -> Result<QuoteRecord> {
        let row = row_id(IdKind::Quote, id)?;
        let mut quote = self
            .get_quote(row)?
            .ok_or_else(|| TrackerError::not_found("quote", id))?;

        if let Some(status) = patch.status {
            quote.status = status;
        }
        if let Some(v) = &patch.project_id {
            quote.project_id = v.clone();
        }
        if let Some(v) = patch.estimated_price {
            quote.estimated_price = v;
        }
        if let Some(v) = patch.estimated_days {
            quote.estimated_days = v;
        }
        if let Some(v) = &patch.executor_notes {
            quote.executor_notes = v.clone();
        }
        if let Some(v) = &patch.executor_id {
            quote.executor_id = v.clone();
        }
        if let Some(v) = &patch.executor_name {
            quote.executor_name = v.clone();
        }
        if let Some(v) = patch.responded_at {
            quote.responded_at = v;
        }
        if let Some(v) = &patch.client_response {
            quote.client_response = v.clone();
        }
        if let Some(v) = patch.approved_at {
            quote.approved_at = v;
        }
        if let Some(v) = patch.rejected_at {
            quote.rejected_at = v;
        }

        self.connection
            .execute(
                UPDATE_QUOTE_SQL,
                params![
                    quote.status.as_str(),
                    quote.project_id.as_ref().map(RecordId::as_str),
                    quote.estimated_price,
                    quote.estimated_days.map(i64::from),
                    quote.executor_notes,
                    quote.executor_id.as_ref().map(RecordId::as_str),
                    quote.executor_name,
                    opt_string(quote.responded_at),
                    quote.client_response,
                    opt_string(quote.approved_at),
                    opt_string(quote.rejected_at),
                    row
                ],
            )
            .db_context("Failed to update quote")?;

        Ok(quote)
    }
}
