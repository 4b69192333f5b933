//! Command-line argument definitions using clap's derive API.
//!
//! Argument structs carry the clap attributes and convert into the core
//! parameter types with `From`, so the core stays free of CLI concerns:
//!
//! ```text
//! User Input → CLI Args (clap) → Core Params → Controller
//! ```

use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use elitetrack_core::{
    models::{QuoteStatus, QuoteVehicle, RecordId, Role},
    params::{NewProject, NewQuote},
    timeline::StepFields,
};
use jiff::civil::Date;

/// Tracker for vehicle armoring projects
///
/// Follows each vehicle through its armoring timeline, keeps the conversation
/// between workshop and client, and runs the quote pipeline. Every command
/// runs as one user (`--as-role`, `--as-id`); changes show up locally at once
/// and are then written to the store.
#[derive(Parser)]
#[command(version, about, name = "et")]
pub struct Args {
    /// Path to the SQLite store. Defaults to
    /// $XDG_DATA_HOME/elitetrack/elitetrack.db
    #[arg(long, global = true)]
    pub database_file: Option<PathBuf>,

    /// Path to the local state cache. Defaults to
    /// $XDG_CACHE_HOME/elitetrack/cache.db
    #[arg(long, global = true)]
    pub cache_file: Option<PathBuf>,

    /// Directory for uploaded step photos. Defaults to
    /// $XDG_DATA_HOME/elitetrack/blobs
    #[arg(long, global = true)]
    pub blob_dir: Option<PathBuf>,

    /// Work from the local cache only, without touching the store
    #[arg(long, global = true)]
    pub offline: bool,

    /// Disable colored output and use plain text
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Role of the acting user
    #[arg(long, global = true, value_enum, default_value_t = RoleArg::Executor)]
    pub as_role: RoleArg,

    /// Id of the acting user (a client id such as `cli_1` for clients)
    #[arg(long, global = true, default_value = "staff")]
    pub as_id: String,

    /// Display name of the acting user
    #[arg(long, global = true, default_value = "Workshop")]
    pub as_name: String,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage armoring projects
    #[command(alias = "p")]
    Project {
        #[command(subcommand)]
        command: ProjectCommands,
    },
    /// Move timeline steps forward
    #[command(alias = "s")]
    Step {
        #[command(subcommand)]
        command: StepCommands,
    },
    /// Talk about a project
    #[command(alias = "c")]
    Chat {
        #[command(subcommand)]
        command: ChatCommands,
    },
    /// Request and answer quotes
    #[command(alias = "q")]
    Quote {
        #[command(subcommand)]
        command: QuoteCommands,
    },
    /// Manage the client directory
    Client {
        #[command(subcommand)]
        command: ClientCommands,
    },
    /// Register vehicles
    Vehicle {
        #[command(subcommand)]
        command: VehicleCommands,
    },
}

/// Role of the acting user.
#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum RoleArg {
    Client,
    Executor,
    Admin,
}

impl From<RoleArg> for Role {
    fn from(val: RoleArg) -> Self {
        match val {
            RoleArg::Client => Role::Client,
            RoleArg::Executor => Role::Executor,
            RoleArg::Admin => Role::Admin,
        }
    }
}

// ============================================================================
// Projects
// ============================================================================

/// Create a project with a pending timeline
#[derive(ClapArgs)]
pub struct CreateProjectArgs {
    /// Code printed on the vehicle's QR tag
    pub qr_code: String,
    /// Owning client id
    #[arg(long)]
    pub client: String,
    /// Vehicle id
    #[arg(long)]
    pub vehicle: String,
    /// Step title, repeat for each step in order. Defaults to the standard
    /// armoring stages
    #[arg(long = "step")]
    pub steps: Vec<String>,
    /// Start date (YYYY-MM-DD)
    #[arg(long)]
    pub start: Option<Date>,
    /// Estimated delivery date (YYYY-MM-DD)
    #[arg(long)]
    pub delivery: Option<Date>,
}

impl From<CreateProjectArgs> for NewProject {
    fn from(val: CreateProjectArgs) -> Self {
        NewProject {
            client_id: val.client.into(),
            vehicle_id: val.vehicle.into(),
            qr_code: val.qr_code,
            steps: val.steps,
            start_date: val.start,
            estimated_delivery: val.delivery,
        }
    }
}

/// List projects
#[derive(ClapArgs)]
pub struct ListProjectsArgs {
    /// Only projects of this client id
    #[arg(long, conflicts_with = "email")]
    pub client: Option<String>,
    /// Only projects of the client registered under this e-mail
    #[arg(long)]
    pub email: Option<String>,
}

/// A project, by id or by QR code
#[derive(ClapArgs)]
pub struct ProjectRefArgs {
    /// Project id (or QR code with --qr)
    pub project: String,
    /// Treat the argument as a QR code
    #[arg(long)]
    pub qr: bool,
}

#[derive(Subcommand)]
pub enum ProjectCommands {
    /// Create a new project
    #[command(alias = "c")]
    Create(CreateProjectArgs),
    /// List projects
    #[command(alias = "l")]
    List(ListProjectsArgs),
    /// Show a project with its timeline
    #[command(alias = "s")]
    Show(ProjectRefArgs),
    /// Hand a completed project over to its client
    Deliver(ProjectRefArgs),
}

// ============================================================================
// Steps
// ============================================================================

/// A step within a project
#[derive(ClapArgs)]
pub struct StepRefArgs {
    /// Project id
    pub project: String,
    /// Step id
    pub step: String,
}

impl StepRefArgs {
    pub fn ids(&self) -> (RecordId, RecordId) {
        (
            RecordId::new(self.project.as_str()),
            RecordId::new(self.step.as_str()),
        )
    }
}

/// Complete a step
#[derive(ClapArgs)]
pub struct CompleteStepArgs {
    #[command(flatten)]
    pub target: StepRefArgs,
    /// Estimated date for the next step (YYYY-MM-DD); required unless the
    /// step is the last one
    #[arg(short, long)]
    pub forecast: Option<Date>,
}

/// Edit a step's free-form fields
#[derive(ClapArgs)]
pub struct EditStepArgs {
    #[command(flatten)]
    pub target: StepRefArgs,
    #[arg(short, long)]
    pub description: Option<String>,
    #[arg(short, long)]
    pub notes: Option<String>,
    /// Technician in charge
    #[arg(short, long)]
    pub technician: Option<String>,
}

impl From<&EditStepArgs> for StepFields {
    fn from(val: &EditStepArgs) -> Self {
        StepFields {
            description: val.description.clone(),
            notes: val.notes.clone(),
            technician: val.technician.clone(),
        }
    }
}

/// Attach a photo to a step
#[derive(ClapArgs)]
pub struct StepPhotoArgs {
    #[command(flatten)]
    pub target: StepRefArgs,
    /// Image file to upload
    pub file: PathBuf,
}

#[derive(Subcommand)]
pub enum StepCommands {
    /// Start a pending step
    Start(StepRefArgs),
    /// Complete a step
    #[command(alias = "done")]
    Complete(CompleteStepArgs),
    /// Move a completed step back to in progress
    Reopen(StepRefArgs),
    /// Edit description, notes or technician
    Edit(EditStepArgs),
    /// Upload a photo for a step
    Photo(StepPhotoArgs),
}

// ============================================================================
// Chat
// ============================================================================

/// The conversation of a project
#[derive(ClapArgs)]
pub struct ChatRefArgs {
    /// Project id
    pub project: String,
}

/// Send a message
#[derive(ClapArgs)]
pub struct SendMessageArgs {
    /// Project id
    pub project: String,
    /// Message text
    pub content: String,
}

#[derive(Subcommand)]
pub enum ChatCommands {
    /// Open (or create) the project's conversation
    Open(ChatRefArgs),
    /// Send a message in the project's conversation
    Send(SendMessageArgs),
    /// Show the project's conversation
    Show(ChatRefArgs),
    /// Mark the conversation as read
    Read(ChatRefArgs),
}

// ============================================================================
// Quotes
// ============================================================================

/// Request a quote
#[derive(ClapArgs)]
pub struct RequestQuoteArgs {
    /// Kind of service (full armoring, glass replacement, ...)
    #[arg(long)]
    pub service: String,
    #[arg(long)]
    pub brand: String,
    #[arg(long)]
    pub model: String,
    #[arg(long)]
    pub year: Option<u16>,
    #[arg(long)]
    pub plate: Option<String>,
    /// Requested protection level
    #[arg(long)]
    pub protection: Option<String>,
    #[arg(short, long)]
    pub description: Option<String>,
    /// Related project id
    #[arg(long)]
    pub project: Option<String>,
    /// Client the quote is for; staff only, clients always request for
    /// themselves
    #[arg(long)]
    pub client: Option<String>,
}

impl RequestQuoteArgs {
    /// Converts to core parameters, defaulting the client to `actor_id`.
    pub fn into_params(self, actor_id: &RecordId) -> NewQuote {
        NewQuote {
            client_id: self
                .client
                .map(RecordId::from)
                .unwrap_or_else(|| actor_id.clone()),
            project_id: self.project.map(RecordId::from),
            vehicle: QuoteVehicle {
                brand: self.brand,
                model: self.model,
                year: self.year,
                plate: self.plate,
            },
            protection_level: self.protection,
            service_type: self.service,
            description: self.description,
        }
    }
}

/// List quotes
#[derive(ClapArgs)]
pub struct ListQuotesArgs {
    /// Only quotes with this status
    #[arg(long, value_enum)]
    pub status: Option<QuoteStatusArg>,
    /// Only quotes waiting for staff review
    #[arg(long, conflicts_with = "status")]
    pub pending: bool,
}

/// A quote by id
#[derive(ClapArgs)]
pub struct QuoteRefArgs {
    /// Quote id
    pub quote: String,
}

/// Send a priced proposal to the client
#[derive(ClapArgs)]
pub struct SendQuoteArgs {
    /// Quote id
    pub quote: String,
    /// Estimated price
    #[arg(long)]
    pub price: f64,
    /// Estimated duration in days
    #[arg(long)]
    pub days: u32,
    #[arg(short, long)]
    pub notes: Option<String>,
}

/// Answer a proposal
#[derive(ClapArgs)]
pub struct AnswerQuoteArgs {
    /// Quote id
    pub quote: String,
    /// Message for the workshop
    #[arg(short, long)]
    pub response: Option<String>,
}

#[derive(Subcommand)]
pub enum QuoteCommands {
    /// Request a quote
    #[command(alias = "r")]
    Request(RequestQuoteArgs),
    /// List quotes
    #[command(alias = "l")]
    List(ListQuotesArgs),
    /// Mark a quote as analyzed
    Analyze(QuoteRefArgs),
    /// Put a quote on hold
    Hold(QuoteRefArgs),
    /// Send a priced proposal
    Send(SendQuoteArgs),
    /// Approve a proposal (client)
    Approve(AnswerQuoteArgs),
    /// Reject a proposal (client)
    Reject(AnswerQuoteArgs),
    /// Withdraw a quote
    Expire(QuoteRefArgs),
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum QuoteStatusArg {
    Pending,
    Analyzed,
    Holding,
    Sent,
    Approved,
    Rejected,
    Expired,
}

impl From<QuoteStatusArg> for QuoteStatus {
    fn from(val: QuoteStatusArg) -> Self {
        match val {
            QuoteStatusArg::Pending => QuoteStatus::Pending,
            QuoteStatusArg::Analyzed => QuoteStatus::Analyzed,
            QuoteStatusArg::Holding => QuoteStatus::Holding,
            QuoteStatusArg::Sent => QuoteStatus::Sent,
            QuoteStatusArg::Approved => QuoteStatus::Approved,
            QuoteStatusArg::Rejected => QuoteStatus::Rejected,
            QuoteStatusArg::Expired => QuoteStatus::Expired,
        }
    }
}

// ============================================================================
// Directory
// ============================================================================

/// Register a client
#[derive(ClapArgs)]
pub struct AddClientArgs {
    pub name: String,
    pub email: String,
    #[arg(long)]
    pub phone: Option<String>,
}

#[derive(Subcommand)]
pub enum ClientCommands {
    /// Register a client
    Add(AddClientArgs),
    /// List registered clients
    List,
}

/// Register a vehicle
#[derive(ClapArgs)]
pub struct AddVehicleArgs {
    /// Owning client id
    #[arg(long)]
    pub client: String,
    pub brand: String,
    pub model: String,
    #[arg(long)]
    pub year: Option<u16>,
    #[arg(long)]
    pub plate: Option<String>,
    #[arg(long)]
    pub protection: Option<String>,
}

#[derive(Subcommand)]
pub enum VehicleCommands {
    /// Register a vehicle for a client
    Add(AddVehicleArgs),
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_args_are_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_create_project_conversion() {
        let args = Args::parse_from([
            "et",
            "project",
            "create",
            "QR-7",
            "--client",
            "cli_1",
            "--vehicle",
            "veh_2",
            "--step",
            "Glass",
            "--step",
            "Doors",
            "--delivery",
            "2025-03-01",
        ]);
        let Some(Commands::Project {
            command: ProjectCommands::Create(create),
        }) = args.command
        else {
            panic!("expected project create");
        };

        let params = NewProject::from(create);
        assert_eq!(params.qr_code, "QR-7");
        assert_eq!(params.client_id, RecordId::new("cli_1"));
        assert_eq!(params.steps, ["Glass", "Doors"]);
        assert_eq!(params.estimated_delivery, Some(jiff::civil::date(2025, 3, 1)));
    }

    #[test]
    fn test_quote_request_defaults_to_actor() {
        let args = Args::parse_from([
            "et",
            "--as-role",
            "client",
            "--as-id",
            "cli_3",
            "quote",
            "request",
            "--service",
            "Full armoring",
            "--brand",
            "Toyota",
            "--model",
            "Hilux",
        ]);
        assert!(args.as_role == RoleArg::Client);
        let Some(Commands::Quote {
            command: QuoteCommands::Request(request),
        }) = args.command
        else {
            panic!("expected quote request");
        };

        let params = request.into_params(&RecordId::new(args.as_id));
        assert_eq!(params.client_id, RecordId::new("cli_3"));
        assert_eq!(params.vehicle.model, "Hilux");
    }
}
