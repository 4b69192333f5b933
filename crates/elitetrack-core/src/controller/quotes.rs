//! Quote requests and the quote pipeline.

use super::{
    outbox::{PendingWrite, WriteJob},
    state::{Action, Entity},
    ProjectStateController,
};
use crate::{
    error::{Result, TrackerError},
    models::{IdKind, QuoteAction, QuotePatch, QuoteRecord, QuoteStatus, RecordId, Role},
    params::NewQuote,
};

impl ProjectStateController {
    /// Files a quote request on behalf of the acting client.
    ///
    /// # Errors
    ///
    /// * `TrackerError::GuardViolation` - When the actor is not the client
    ///   named in `params`
    /// * `TrackerError::Validation` - When the parameters are invalid
    pub async fn request_quote(&self, params: NewQuote) -> Result<PendingWrite> {
        let actor = self.actor();
        if actor.role != Role::Client || actor.id != params.client_id {
            return Err(TrackerError::guard(
                "quote requests are filed by the client they are for",
            ));
        }
        self.insert_quote(params, QuoteStatus::Pending).await
    }

    /// Records a quote on a client's behalf, starting at `pending` or
    /// `analyzed`.
    pub async fn create_quote(&self, params: NewQuote, status: QuoteStatus) -> Result<PendingWrite> {
        let actor = self.actor();
        if !actor.is_staff() {
            return Err(TrackerError::guard(format!(
                "{} cannot record quotes for other clients",
                actor.role.as_str()
            )));
        }
        if !matches!(status, QuoteStatus::Pending | QuoteStatus::Analyzed) {
            return Err(TrackerError::validation("status").with_reason(format!(
                "a new quote starts as pending or analyzed, not {}",
                status.as_str()
            )));
        }
        self.insert_quote(params, status).await
    }

    async fn insert_quote(&self, params: NewQuote, status: QuoteStatus) -> Result<PendingWrite> {
        params.validate()?;
        let now = self.now();
        let quote = QuoteRecord {
            id: self.inner.ids.next(IdKind::Quote, now),
            client_id: params.client_id,
            project_id: params.project_id,
            vehicle: params.vehicle,
            protection_level: params.protection_level,
            service_type: params.service_type.trim().to_string(),
            description: params.description,
            status,
            created_at: now,
            estimated_price: None,
            estimated_days: None,
            executor_notes: None,
            executor_id: None,
            executor_name: None,
            responded_at: None,
            client_response: None,
            approved_at: None,
            rejected_at: None,
        };

        let (pending, changed) = self.inner.shared.update(|_| {
            let pending = self.inner.outbox.enqueue(WriteJob::CreateQuote {
                id: quote.id.clone(),
            });
            Ok((Some(Action::Optimistic(Entity::Quote(quote))), pending))
        })?;
        self.inner.shared.persist(changed).await;
        Ok(pending)
    }

    /// Moves a quote along its pipeline.
    ///
    /// # Errors
    ///
    /// * `TrackerError::NotFound` - When the quote is unknown
    /// * `TrackerError::GuardViolation` - When the transition is not allowed
    ///   for the actor or the current status
    /// * `TrackerError::Validation` - When a proposal has no valid price or
    ///   duration
    pub async fn transition_quote(&self, id: &RecordId, action: QuoteAction) -> Result<PendingWrite> {
        let actor = self.actor();
        let now = self.now();
        let (pending, changed) = self.inner.shared.update(|state| {
            let before = state
                .quote(id)
                .ok_or_else(|| TrackerError::not_found("quote", id))?;
            let after = before.apply(&action, actor, now)?;
            let pending = self.inner.outbox.enqueue(WriteJob::UpdateQuote {
                id: before.id.clone(),
                patch: QuotePatch::diff(before, &after),
            });
            Ok((Some(Action::Replace(Entity::Quote(after))), pending))
        })?;
        self.inner.shared.persist(changed).await;
        Ok(pending)
    }

    pub async fn analyze_quote(&self, id: &RecordId) -> Result<PendingWrite> {
        self.transition_quote(id, QuoteAction::Analyze).await
    }

    pub async fn hold_quote(&self, id: &RecordId) -> Result<PendingWrite> {
        self.transition_quote(id, QuoteAction::Hold).await
    }

    /// Sends a priced proposal to the client.
    pub async fn send_quote_to_client(
        &self,
        id: &RecordId,
        price: f64,
        days: u32,
        notes: Option<String>,
    ) -> Result<PendingWrite> {
        self.transition_quote(id, QuoteAction::Send { price, days, notes })
            .await
    }

    pub async fn approve_quote(&self, id: &RecordId, response: Option<String>) -> Result<PendingWrite> {
        self.transition_quote(id, QuoteAction::Approve { response })
            .await
    }

    pub async fn reject_quote(&self, id: &RecordId, response: Option<String>) -> Result<PendingWrite> {
        self.transition_quote(id, QuoteAction::Reject { response })
            .await
    }

    pub async fn expire_quote(&self, id: &RecordId) -> Result<PendingWrite> {
        self.transition_quote(id, QuoteAction::Expire).await
    }

    pub fn quote(&self, id: &RecordId) -> Result<QuoteRecord> {
        self.inner
            .shared
            .read(|s| s.quote(id).cloned())
            .ok_or_else(|| TrackerError::not_found("quote", id))
    }

    pub fn quotes(&self) -> Vec<QuoteRecord> {
        self.inner.shared.read(|s| s.quotes.to_vec())
    }

    fn quotes_where(&self, keep: impl Fn(&QuoteRecord) -> bool) -> Vec<QuoteRecord> {
        self.inner
            .shared
            .read(|s| s.quotes.iter().filter(|q| keep(q)).cloned().collect())
    }

    pub fn quotes_for_client(&self, client_id: &RecordId) -> Vec<QuoteRecord> {
        self.quotes_where(|q| &q.client_id == client_id)
    }

    pub fn quotes_with_status(&self, status: QuoteStatus) -> Vec<QuoteRecord> {
        self.quotes_where(|q| q.status == status)
    }

    /// Quotes waiting for staff review (`pending` or `analyzed`).
    pub fn pending_quotes(&self) -> Vec<QuoteRecord> {
        self.quotes_where(QuoteRecord::awaits_review)
    }

    /// Quotes waiting for the client's answer.
    pub fn sent_quotes(&self) -> Vec<QuoteRecord> {
        self.quotes_with_status(QuoteStatus::Sent)
    }
}
