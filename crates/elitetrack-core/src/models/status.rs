//! Status enumerations for projects, steps, quotes and actor roles.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Aggregate status of a project.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    /// No step completed yet
    #[default]
    Pending,

    /// At least one step completed
    InProgress,

    /// Every step completed
    Completed,

    /// Vehicle handed back to the client
    Delivered,
}

impl FromStr for ProjectStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(ProjectStatus::Pending),
            "in_progress" | "inprogress" => Ok(ProjectStatus::InProgress),
            "completed" => Ok(ProjectStatus::Completed),
            "delivered" => Ok(ProjectStatus::Delivered),
            _ => Err(format!("Invalid project status: {s}")),
        }
    }
}

impl ProjectStatus {
    /// Convert to database string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Pending => "pending",
            ProjectStatus::InProgress => "in_progress",
            ProjectStatus::Completed => "completed",
            ProjectStatus::Delivered => "delivered",
        }
    }

    /// A locked project accepts no further step mutations.
    pub fn is_locked(&self) -> bool {
        matches!(self, ProjectStatus::Completed | ProjectStatus::Delivered)
    }
}

/// Status of a single timeline step.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Step has not started
    #[default]
    Pending,

    /// Step is being worked on
    InProgress,

    /// Step has been completed
    Completed,
}

impl FromStr for StepStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(StepStatus::Pending),
            "in_progress" | "inprogress" => Ok(StepStatus::InProgress),
            "completed" => Ok(StepStatus::Completed),
            _ => Err(format!("Invalid step status: {s}")),
        }
    }
}

impl StepStatus {
    /// Convert to database string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Pending => "pending",
            StepStatus::InProgress => "in_progress",
            StepStatus::Completed => "completed",
        }
    }

    /// Get status with consistent icon formatting for display.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use elitetrack_core::models::StepStatus;
    ///
    /// assert_eq!(StepStatus::Completed.with_icon(), "✓ Completed");
    /// assert_eq!(StepStatus::InProgress.with_icon(), "➤ In Progress");
    /// assert_eq!(StepStatus::Pending.with_icon(), "○ Pending");
    /// ```
    pub fn with_icon(&self) -> &'static str {
        match self {
            StepStatus::Completed => "✓ Completed",
            StepStatus::InProgress => "➤ In Progress",
            StepStatus::Pending => "○ Pending",
        }
    }
}

/// Status of a quote in its one-directional pipeline.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum QuoteStatus {
    #[default]
    Pending,
    Analyzed,
    Holding,
    Sent,
    Approved,
    Rejected,
    Expired,
}

impl FromStr for QuoteStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(QuoteStatus::Pending),
            "analyzed" => Ok(QuoteStatus::Analyzed),
            "holding" => Ok(QuoteStatus::Holding),
            "sent" => Ok(QuoteStatus::Sent),
            "approved" => Ok(QuoteStatus::Approved),
            "rejected" => Ok(QuoteStatus::Rejected),
            "expired" => Ok(QuoteStatus::Expired),
            _ => Err(format!("Invalid quote status: {s}")),
        }
    }
}

impl QuoteStatus {
    /// Convert to database string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            QuoteStatus::Pending => "pending",
            QuoteStatus::Analyzed => "analyzed",
            QuoteStatus::Holding => "holding",
            QuoteStatus::Sent => "sent",
            QuoteStatus::Approved => "approved",
            QuoteStatus::Rejected => "rejected",
            QuoteStatus::Expired => "expired",
        }
    }

    /// Terminal statuses accept no further transition.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            QuoteStatus::Approved | QuoteStatus::Rejected | QuoteStatus::Expired
        )
    }

    /// Position in the pipeline; transitions only ever move forward.
    pub(crate) fn rank(&self) -> u8 {
        match self {
            QuoteStatus::Pending => 0,
            QuoteStatus::Analyzed => 1,
            QuoteStatus::Holding => 2,
            QuoteStatus::Sent => 3,
            QuoteStatus::Approved | QuoteStatus::Rejected | QuoteStatus::Expired => 4,
        }
    }
}

/// Role of the acting user.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Client,
    Executor,
    Admin,
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "client" => Ok(Role::Client),
            "executor" => Ok(Role::Executor),
            "admin" => Ok(Role::Admin),
            _ => Err(format!("Invalid role: {s}")),
        }
    }
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Client => "client",
            Role::Executor => "executor",
            Role::Admin => "admin",
        }
    }

    /// Executors and administrators drive the project workflow.
    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Executor | Role::Admin)
    }
}
