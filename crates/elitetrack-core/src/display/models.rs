//! Display implementations for domain models.
//!
//! Every implementation produces markdown for the terminal renderer. Records
//! still waiting for their create round-trip are marked as such.

use std::fmt;

use super::datetime::{LocalDateTime, MaybeDate};
use crate::models::{
    ClientProfile, ConversationRecord, MessageRecord, ProjectRecord, ProjectStatus, QuoteRecord,
    QuoteStatus, QuoteVehicle, RecordId, Role, StepStatus, TimelineStep, Vehicle,
};

fn pending_marker(id: &RecordId) -> &'static str {
    if id.is_provisional() {
        " _(not yet stored)_"
    } else {
        ""
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for QuoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for ProjectRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "# Project {} ({}){}",
            self.id,
            self.qr_code,
            pending_marker(&self.id)
        )?;
        writeln!(f)?;

        writeln!(f, "- Status: {} ({}%)", self.status, self.progress)?;
        writeln!(f, "- Client: {}", self.client_id)?;
        writeln!(f, "- Vehicle: {}", self.vehicle_id)?;
        writeln!(f, "- Start: {}", MaybeDate(&self.start_date))?;
        writeln!(
            f,
            "- Estimated delivery: {}",
            MaybeDate(&self.estimated_delivery)
        )?;
        if let Some(delivered) = &self.actual_delivery {
            writeln!(f, "- Delivered: {}", LocalDateTime(delivered))?;
        }
        writeln!(f, "- Updated: {}", LocalDateTime(&self.updated_at))?;

        if self.timeline.is_empty() {
            writeln!(f, "\nNo steps in this project.")?;
        } else {
            writeln!(
                f,
                "\n## Timeline ({}/{})",
                self.completed_steps(),
                self.timeline.len()
            )?;
            writeln!(f)?;
            for step in &self.timeline {
                write!(f, "{step}")?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for TimelineStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "### {}. {} ({})",
            self.position + 1,
            self.title,
            self.status.with_icon()
        )?;
        writeln!(f)?;
        writeln!(f, "`{}`", self.id)?;
        writeln!(f)?;

        if let Some(description) = &self.description {
            writeln!(f, "{description}")?;
            writeln!(f)?;
        }

        if self.estimated_date.is_some() {
            writeln!(f, "- Forecast: {}", MaybeDate(&self.estimated_date))?;
        }
        if let Some(done) = &self.completion_date {
            writeln!(f, "- Completed: {}", LocalDateTime(done))?;
        }
        if let Some(technician) = &self.technician {
            writeln!(f, "- Technician: {technician}")?;
        }
        if let Some(notes) = &self.notes {
            writeln!(f, "- Notes: {notes}")?;
        }

        if !self.photos.is_empty() {
            writeln!(f)?;
            writeln!(f, "#### Photos")?;
            writeln!(f)?;
            for photo in &self.photos {
                writeln!(f, "- {photo}")?;
            }
        }
        writeln!(f)
    }
}

impl fmt::Display for ConversationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "# Conversation {} (project {}){}",
            self.id,
            self.project_id,
            pending_marker(&self.id)
        )?;
        writeln!(f)?;
        let participants: Vec<&str> = self.participants.iter().map(RecordId::as_str).collect();
        writeln!(f, "- Participants: {}", participants.join(", "))?;
        writeln!(f, "- Opened: {}", LocalDateTime(&self.created_at))
    }
}

impl fmt::Display for MessageRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unread = if self.read { "" } else { " •" };
        writeln!(
            f,
            "**{}** ({}, {}){unread}{}",
            self.sender_name,
            self.sender_role,
            LocalDateTime(&self.created_at),
            pending_marker(&self.id)
        )?;
        writeln!(f)?;
        writeln!(f, "> {}", self.content)?;
        writeln!(f)
    }
}

impl fmt::Display for QuoteVehicle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.brand, self.model)?;
        if let Some(year) = self.year {
            write!(f, " ({year})")?;
        }
        if let Some(plate) = &self.plate {
            write!(f, ", plate {plate}")?;
        }
        Ok(())
    }
}

impl fmt::Display for QuoteRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "## Quote {}: {} ({}){}",
            self.id,
            self.service_type,
            self.status,
            pending_marker(&self.id)
        )?;
        writeln!(f)?;
        writeln!(f, "- Client: {}", self.client_id)?;
        writeln!(f, "- Vehicle: {}", self.vehicle)?;
        if let Some(level) = &self.protection_level {
            writeln!(f, "- Protection level: {level}")?;
        }
        if let Some(project) = &self.project_id {
            writeln!(f, "- Project: {project}")?;
        }
        writeln!(f, "- Requested: {}", LocalDateTime(&self.created_at))?;

        if let (Some(price), Some(days)) = (self.estimated_price, self.estimated_days) {
            writeln!(f, "- Proposal: {price:.2} in {days} days")?;
        }
        if let Some(name) = &self.executor_name {
            writeln!(f, "- Answered by: {name}")?;
        }
        if let Some(at) = &self.responded_at {
            writeln!(f, "- Sent: {}", LocalDateTime(at))?;
        }
        if let Some(at) = self.approved_at.as_ref().or(self.rejected_at.as_ref()) {
            writeln!(f, "- Client answered: {}", LocalDateTime(at))?;
        }

        if let Some(description) = &self.description {
            writeln!(f)?;
            writeln!(f, "{description}")?;
        }
        if let Some(notes) = &self.executor_notes {
            writeln!(f)?;
            writeln!(f, "**Executor notes:** {notes}")?;
        }
        if let Some(response) = &self.client_response {
            writeln!(f)?;
            writeln!(f, "**Client response:** {response}")?;
        }
        writeln!(f)
    }
}

impl fmt::Display for ClientProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}> (`{}`)", self.name, self.email, self.id)?;
        if let Some(phone) = &self.phone {
            write!(f, ", {phone}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Vehicle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (`{}`, client {})", self.label(), self.id, self.client_id)
    }
}
