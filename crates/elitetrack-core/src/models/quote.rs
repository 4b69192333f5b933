//! Quote model and its one-directional status pipeline.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use super::{Actor, QuoteStatus, RecordId, Role};
use crate::error::{Result, TrackerError};

/// Vehicle description attached to a quote request.
///
/// Quotes are often requested before the vehicle is registered, so the
/// details travel with the quote instead of referencing a [`Vehicle`].
///
/// [`Vehicle`]: super::Vehicle
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct QuoteVehicle {
    pub brand: String,
    pub model: String,
    pub year: Option<u16>,
    pub plate: Option<String>,
}

/// A request for an armoring quote and the shop's answer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuoteRecord {
    pub id: RecordId,

    /// Client asking for the quote
    pub client_id: RecordId,

    /// Project the quote turned into, once approved
    pub project_id: Option<RecordId>,

    pub vehicle: QuoteVehicle,

    /// Requested protection level
    pub protection_level: Option<String>,

    /// Kind of service (full armoring, glass replacement, ...)
    pub service_type: String,

    pub description: Option<String>,

    #[serde(default)]
    pub status: QuoteStatus,

    pub created_at: Timestamp,

    // Executor's answer
    pub estimated_price: Option<f64>,
    pub estimated_days: Option<u32>,
    pub executor_notes: Option<String>,
    pub executor_id: Option<RecordId>,
    pub executor_name: Option<String>,
    pub responded_at: Option<Timestamp>,

    // Client's answer
    pub client_response: Option<String>,
    pub approved_at: Option<Timestamp>,
    pub rejected_at: Option<Timestamp>,
}

/// Transition requested on a quote.
#[derive(Debug, Clone, PartialEq)]
pub enum QuoteAction {
    /// Staff reviewed the request
    Analyze,
    /// Staff parked the request
    Hold,
    /// Staff sends a priced proposal to the client
    Send {
        price: f64,
        days: u32,
        notes: Option<String>,
    },
    /// Client accepts the proposal
    Approve { response: Option<String> },
    /// Client declines the proposal
    Reject { response: Option<String> },
    /// Staff withdraws the quote
    Expire,
}

impl QuoteAction {
    /// Status the quote ends up in.
    pub fn target(&self) -> QuoteStatus {
        match self {
            QuoteAction::Analyze => QuoteStatus::Analyzed,
            QuoteAction::Hold => QuoteStatus::Holding,
            QuoteAction::Send { .. } => QuoteStatus::Sent,
            QuoteAction::Approve { .. } => QuoteStatus::Approved,
            QuoteAction::Reject { .. } => QuoteStatus::Rejected,
            QuoteAction::Expire => QuoteStatus::Expired,
        }
    }
}

impl QuoteRecord {
    /// Returns the quote after applying `action` on behalf of `actor`.
    ///
    /// Transitions only move forward through the pipeline. Approval and
    /// rejection answer a `sent` quote and belong to the quote's client; every
    /// other transition is reserved to staff.
    pub fn apply(&self, action: &QuoteAction, actor: &Actor, now: Timestamp) -> Result<Self> {
        if self.status.is_terminal() {
            return Err(TrackerError::guard(format!(
                "quote {} is already {}",
                self.id,
                self.status.as_str()
            )));
        }

        let target = action.target();
        match action {
            QuoteAction::Approve { .. } | QuoteAction::Reject { .. } => {
                if actor.role != Role::Client || actor.id != self.client_id {
                    return Err(TrackerError::guard(
                        "only the requesting client can answer a quote",
                    ));
                }
                if self.status != QuoteStatus::Sent {
                    return Err(TrackerError::guard(format!(
                        "quote {} has not been sent to the client",
                        self.id
                    )));
                }
            }
            _ => {
                if !actor.is_staff() {
                    return Err(TrackerError::guard(format!(
                        "{} cannot move a quote to {}",
                        actor.role.as_str(),
                        target.as_str()
                    )));
                }
                if target != QuoteStatus::Expired && target.rank() <= self.status.rank() {
                    return Err(TrackerError::guard(format!(
                        "quote {} cannot go from {} to {}",
                        self.id,
                        self.status.as_str(),
                        target.as_str()
                    )));
                }
            }
        }

        let mut next = self.clone();
        next.status = target;
        match action {
            QuoteAction::Send { price, days, notes } => {
                if !price.is_finite() || *price <= 0.0 {
                    return Err(TrackerError::validation("estimated_price")
                        .with_reason("must be a positive amount"));
                }
                if *days == 0 {
                    return Err(TrackerError::validation("estimated_days")
                        .with_reason("must be at least one day"));
                }
                next.estimated_price = Some(*price);
                next.estimated_days = Some(*days);
                next.executor_notes = notes.clone();
                next.executor_id = Some(actor.id.clone());
                next.executor_name = Some(actor.name.clone());
                next.responded_at = Some(now);
            }
            QuoteAction::Approve { response } => {
                next.client_response = response.clone();
                next.approved_at = Some(now);
            }
            QuoteAction::Reject { response } => {
                next.client_response = response.clone();
                next.rejected_at = Some(now);
            }
            QuoteAction::Analyze | QuoteAction::Hold | QuoteAction::Expire => {}
        }
        Ok(next)
    }

    /// Pending review by staff (`pending` or `analyzed`).
    pub fn awaits_review(&self) -> bool {
        matches!(self.status, QuoteStatus::Pending | QuoteStatus::Analyzed)
    }
}
