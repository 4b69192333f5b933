//! Parameter structures for controller operations.
//!
//! These are plain structs without framework derives so that every surface
//! (the CLI today) can wrap them with its own argument parsing and convert
//! with `.into()`.
//!
//! ```ignore
//! #[derive(Args)]
//! pub struct CreateProjectArgs { /* clap attributes */ }
//!
//! impl From<CreateProjectArgs> for NewProject { /* ... */ }
//! ```

use jiff::civil::Date;
use serde::{Deserialize, Serialize};

use crate::{
    error::{Result, TrackerError},
    models::{QuoteVehicle, RecordId},
};

/// Parameters for creating a project.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewProject {
    /// Owning client
    pub client_id: RecordId,
    /// Vehicle being armored
    pub vehicle_id: RecordId,
    /// Code printed on the vehicle's QR tag (unique)
    pub qr_code: String,
    /// Step titles in order; empty means the default stages
    #[serde(default)]
    pub steps: Vec<String>,
    pub start_date: Option<Date>,
    pub estimated_delivery: Option<Date>,
}

impl NewProject {
    /// Validate the project parameters.
    ///
    /// # Errors
    ///
    /// * `TrackerError::Validation` - When the QR code or a step title is
    ///   blank, or the estimated delivery precedes the start date
    pub fn validate(&self) -> Result<()> {
        if self.qr_code.trim().is_empty() {
            return Err(TrackerError::validation("qr_code").with_reason("must not be empty"));
        }
        if let Some(position) = self.steps.iter().position(|t| t.trim().is_empty()) {
            return Err(TrackerError::validation("steps")
                .with_reason(format!("step {} has an empty title", position + 1)));
        }
        if let (Some(start), Some(delivery)) = (self.start_date, self.estimated_delivery) {
            if delivery < start {
                return Err(TrackerError::validation("estimated_delivery")
                    .with_reason(format!("{delivery} is before the start date {start}")));
            }
        }
        Ok(())
    }
}

/// Parameters for requesting a quote.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewQuote {
    /// Client the quote is for
    pub client_id: RecordId,
    /// Project the quote relates to, if any
    pub project_id: Option<RecordId>,
    pub vehicle: QuoteVehicle,
    pub protection_level: Option<String>,
    /// Kind of service requested
    pub service_type: String,
    pub description: Option<String>,
}

impl NewQuote {
    /// Validate the quote parameters.
    ///
    /// # Errors
    ///
    /// * `TrackerError::Validation` - When the service type or the vehicle's
    ///   brand or model is blank
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("service_type", &self.service_type),
            ("vehicle.brand", &self.vehicle.brand),
            ("vehicle.model", &self.vehicle.model),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(TrackerError::validation(field).with_reason("must not be empty"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use jiff::civil::date;

    use super::*;

    fn project() -> NewProject {
        NewProject {
            client_id: RecordId::new("cli_1"),
            vehicle_id: RecordId::new("veh_1"),
            qr_code: "QR-001".to_string(),
            steps: vec![],
            start_date: Some(date(2025, 1, 10)),
            estimated_delivery: Some(date(2025, 3, 1)),
        }
    }

    #[test]
    fn test_new_project_validate_ok() {
        assert!(project().validate().is_ok());
    }

    #[test]
    fn test_new_project_rejects_blank_qr_code() {
        let mut params = project();
        params.qr_code = "  ".to_string();

        match params.validate().unwrap_err() {
            TrackerError::Validation { field, .. } => assert_eq!(field, "qr_code"),
            other => panic!("Expected Validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_new_project_rejects_blank_step_title() {
        let mut params = project();
        params.steps = vec!["Check-in".to_string(), String::new()];

        match params.validate().unwrap_err() {
            TrackerError::Validation { field, reason } => {
                assert_eq!(field, "steps");
                assert!(reason.contains("step 2"));
            }
            other => panic!("Expected Validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_new_project_rejects_delivery_before_start() {
        let mut params = project();
        params.estimated_delivery = Some(date(2025, 1, 1));

        match params.validate().unwrap_err() {
            TrackerError::Validation { field, .. } => assert_eq!(field, "estimated_delivery"),
            other => panic!("Expected Validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_new_quote_requires_vehicle_model() {
        let params = NewQuote {
            client_id: RecordId::new("cli_1"),
            service_type: "Full armoring".to_string(),
            vehicle: QuoteVehicle {
                brand: "Toyota".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };

        match params.validate().unwrap_err() {
            TrackerError::Validation { field, .. } => assert_eq!(field, "vehicle.model"),
            other => panic!("Expected Validation error, got {other:?}"),
        }
    }
}
