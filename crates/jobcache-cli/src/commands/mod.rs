//! Subcommands. Worker-facing commands live in `worker`, REST calls in
//! `account`, `jobs` and `billing`.

mod account;
mod billing;
mod jobs;
mod worker;

use anyhow::Result;
use clap::Subcommand;
use jobcache_core::models::Plan;
use jobcache_core::ApiError;

use crate::context::AppContext;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Pre-cache the app shell and activate this version
    Install,
    /// Delete caches left behind by other versions
    Activate,
    /// Fetch a URL through the worker's cache strategies
    Fetch {
        /// URL, absolute or relative to the origin
        url: String,
        #[arg(short = 'X', long, default_value = "GET")]
        method: String,
        /// Treat the request as a page navigation
        #[arg(long)]
        navigate: bool,
        /// Request body (sent as JSON)
        #[arg(short, long)]
        data: Option<String>,
        /// Extra header, "Name: value"
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,
    },
    /// Replay queued offline actions
    Sync {
        /// apply-job, update-profile or search-jobs; every kind when omitted
        tag: Option<String>,
    },
    /// Deliver a push message
    Push {
        /// JSON payload, e.g. '{"body": "New jobs!"}'
        payload: Option<String>,
    },
    /// Send a control message, e.g. '{"type": "SKIP_WAITING"}'
    Message { message: String },
    /// Handle worker events given as JSON lines on stdin
    Run,
    /// Inspect or change the response cache
    Cache {
        #[command(subcommand)]
        action: CacheCommand,
    },
    /// Inspect or clear the offline action queue
    Queue {
        #[command(subcommand)]
        action: QueueCommand,
    },
    /// Log in and save the session
    Login {
        email: Option<String>,
        /// Remember the password in the OS keychain
        #[arg(long)]
        remember: bool,
    },
    /// Create an account and log in
    Register {
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        email: String,
    },
    /// End the session
    Logout,
    /// Show the logged-in user
    Me,
    /// Show or update the profile
    Profile {
        #[command(subcommand)]
        action: ProfileCommand,
    },
    /// Search jobs
    Search {
        keywords: Option<String>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        job_type: Option<String>,
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Apply to a job
    Apply {
        job_id: String,
        #[arg(long)]
        cover_letter: Option<String>,
        /// Full application body as JSON (overrides --cover-letter)
        #[arg(long)]
        data: Option<String>,
    },
    /// List applications, or update one
    Applications {
        #[command(subcommand)]
        action: Option<ApplicationsCommand>,
    },
    /// Show one job
    Job { job_id: String },
    /// Payment operations
    Payment {
        #[command(subcommand)]
        action: PaymentCommand,
    },
    /// Subscription operations
    Subscription {
        #[command(subcommand)]
        action: SubscriptionCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum CacheCommand {
    /// List namespaces and their entries
    List {
        /// Only this namespace
        namespace: Option<String>,
    },
    /// Delete this version's caches (or every cache with --all)
    Clear {
        #[arg(long)]
        all: bool,
    },
    /// Fetch URLs into the static cache
    Add {
        #[arg(required = true)]
        urls: Vec<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum QueueCommand {
    /// List pending actions, oldest first
    List,
    /// Drop pending actions of one kind, or all of them
    Clear { tag: Option<String> },
}

#[derive(Subcommand, Debug)]
pub enum ProfileCommand {
    Show,
    /// Replace profile fields from a JSON object
    Update { data: String },
}

#[derive(Subcommand, Debug)]
pub enum ApplicationsCommand {
    /// Set an application's status
    Update { id: String, status: String },
}

#[derive(Subcommand, Debug)]
pub enum PaymentCommand {
    /// Show the payment provider configuration
    Config,
    /// Start a payment for a plan
    Init { plan: Plan },
    /// Verify a payment by reference
    Verify { reference: String },
}

#[derive(Subcommand, Debug)]
pub enum SubscriptionCommand {
    Status,
    Cancel,
}

pub async fn run(ctx: &AppContext, command: Command) -> Result<()> {
    match command {
        Command::Install => worker::install(ctx).await,
        Command::Activate => worker::activate(ctx).await,
        Command::Fetch {
            url,
            method,
            navigate,
            data,
            headers,
        } => worker::fetch(ctx, &method, &url, navigate, data, &headers).await,
        Command::Sync { tag } => worker::sync(ctx, tag.as_deref()).await,
        Command::Push { payload } => worker::push(ctx, payload.as_deref()).await,
        Command::Message { message } => worker::message(ctx, &message).await,
        Command::Run => worker::run(ctx).await,
        Command::Cache { action } => worker::cache(ctx, action).await,
        Command::Queue { action } => worker::queue(ctx, action),
        Command::Login { email, remember } => account::login(ctx, email, remember).await,
        Command::Register {
            first_name,
            last_name,
            email,
        } => account::register(ctx, first_name, last_name, email).await,
        Command::Logout => account::logout(ctx).await,
        Command::Me => account::me(ctx).await,
        Command::Profile { action } => account::profile(ctx, action).await,
        Command::Search {
            keywords,
            location,
            job_type,
            page,
            limit,
        } => {
            let search = jobcache_core::models::JobSearch {
                keywords,
                location,
                job_type,
                page,
                limit,
            };
            jobs::search(ctx, &search).await
        }
        Command::Apply {
            job_id,
            cover_letter,
            data,
        } => jobs::apply(ctx, &job_id, cover_letter, data.as_deref()).await,
        Command::Applications { action } => jobs::applications(ctx, action).await,
        Command::Job { job_id } => jobs::job(ctx, &job_id).await,
        Command::Payment { action } => billing::payment(ctx, action).await,
        Command::Subscription { action } => billing::subscription(ctx, action).await,
    }
}

/// Treat "offline, saved for sync" as a soft outcome: tell the user and
/// carry on. Every other error passes through.
fn unless_queued<T>(result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) => match e.downcast_ref::<ApiError>() {
            Some(ApiError::Offline { queued: true }) => {
                eprintln!("Offline: saved for background sync. Run `jobcache sync` once you are back online.");
                Ok(None)
            }
            _ => Err(e),
        },
    }
}

/// Parse a JSON argument, naming the argument in the error.
fn parse_json_arg(name: &str, raw: &str) -> Result<serde_json::Value> {
    serde_json::from_str(raw).map_err(|e| anyhow::anyhow!("{} is not valid JSON: {}", name, e))
}
