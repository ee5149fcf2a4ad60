//! FIM Guide terminal dashboard
//!
//! Shows borrowers and lenders where their loans stand and drives the
//! payment confirmation workflow against the FIM Guide backend.

use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use fimguide_logic::client::HttpLoanBackend;
use fimguide_logic::config::DashboardConfig;
use fimguide_logic::confirm::confirm_action;
use fimguide_logic::dashboard::{sign_in, Dashboard};
use fimguide_logic::format::parse_date;
use fimguide_logic::loan_message::today;
use fimguide_logic::notification::ReminderKind;
use fimguide_logic::payment::{Attachment, UploadDraft};
use fimguide_logic::session::{
    delete_session, require_session, save_session, token_has_audience, Session,
};
use fimguide_logic::types::Role;
use fimguide_logic::verification::{VerificationStatus, VERIFY_WARNING};

mod config;
mod render;

// ============================================================================
// CLI
// ============================================================================

#[derive(Parser)]
#[command(name = "fimguide")]
#[command(about = "FIM Guide loan dashboard for borrowers and lenders")]
struct Cli {
    /// Path to dashboard configuration file
    #[arg(short, long, env = "FIMGUIDE_CONFIG", default_value = "fimguide.toml", global = true)]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Session file (overrides session_file from the config)
    #[arg(long, global = true)]
    session: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in with an identity provider access token or a user id
    Login {
        /// Access token issued by the identity provider
        #[arg(long, conflicts_with = "user_id", required_unless_present = "user_id")]
        token: Option<String>,
        /// Backend user id (no identity provider)
        #[arg(long)]
        user_id: Option<String>,
    },
    /// Forget the stored session
    Logout,
    /// List your loans
    Loans,
    /// Show the "Coming up" panel, loan details and recent payments
    Show {
        /// Loan number (default: first listed loan)
        loan: Option<String>,
        /// Side to view when you are both lender and borrower
        #[arg(long)]
        role: Option<Role>,
        /// Print the loan snapshot as JSON instead
        #[arg(long)]
        json: bool,
    },
    /// Payment confirmation history for a loan
    History {
        loan: String,
        #[arg(long)]
        role: Option<Role>,
    },
    /// Upload a payment confirmation with its receipt
    Upload {
        #[arg(long)]
        loan: String,
        /// Amount paid
        #[arg(long)]
        amount: String,
        /// Payment date (YYYY-MM-DD)
        #[arg(long, value_parser = parse_date_arg)]
        date: NaiveDate,
        /// Your side of the loan, when you are both lender and borrower
        #[arg(long)]
        payer: Option<Role>,
        /// Receipt image or PDF
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        method: Option<String>,
        #[arg(long)]
        comment: Option<String>,
    },
    /// Set the verification status of a payment you received
    Verify {
        #[arg(long)]
        loan: String,
        /// Confirmation id (cfid)
        #[arg(long)]
        record: String,
        /// unverified, not-received, wrong-amount, wrong-date or verified
        #[arg(long)]
        status: VerificationStatus,
        #[arg(long)]
        role: Option<Role>,
        /// Skip the confirmation prompt for `verified`
        #[arg(long)]
        yes: bool,
    },
    /// Comment on a payment you received
    Comment {
        #[arg(long)]
        loan: String,
        #[arg(long)]
        record: String,
        /// Comment text (empty clears it)
        #[arg(long, default_value = "")]
        text: String,
        #[arg(long)]
        role: Option<Role>,
    },
    /// Email reminder settings
    Notifications {
        #[command(subcommand)]
        command: NotificationCommands,
    },
    /// Account settings
    Account {
        #[command(subcommand)]
        command: AccountCommands,
    },
    /// Link the signed-in identity to your backend user
    Link,
}

#[derive(Subcommand)]
enum NotificationCommands {
    /// Show reminder settings for a loan, or list loans that can have them
    Show { loan: Option<String> },
    /// Change reminder settings for a loan
    Set {
        loan: String,
        #[arg(long)]
        email: Option<String>,
        /// Payment due reminder on/off
        #[arg(long, value_parser = clap::builder::BoolishValueParser::new())]
        due: Option<bool>,
        /// Days between payment due reminders (0-14)
        #[arg(long)]
        due_days: Option<u8>,
        /// Payment receivable reminder on/off
        #[arg(long, value_parser = clap::builder::BoolishValueParser::new())]
        receive: Option<bool>,
        /// Days between payment receivable reminders (0-14)
        #[arg(long)]
        receive_days: Option<u8>,
    },
}

#[derive(Subcommand)]
enum AccountCommands {
    /// Show the account email
    Email,
    /// Change the account email
    SetEmail { email: String },
}

fn parse_date_arg(s: &str) -> Result<NaiveDate, String> {
    parse_date(s).ok_or_else(|| format!("invalid date '{}', expected YYYY-MM-DD", s))
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    // Initialize logging (LOG_DESTINATION=console|file)
    let _log_guard = fimguide_logic::logging::init_logging(
        cli.verbose,
        &["fimguide", "fimguide_logic"],
        "fimguide",
    );

    let config = config::load(&cli.config, cli.session)
        .with_context(|| format!("Failed to load config from {:?}", cli.config))?;

    match cli.command {
        Commands::Login { token, user_id } => run_login(&config, token, user_id).await,
        Commands::Logout => {
            delete_session(&config.session_file);
            println!("Signed out.");
            Ok(())
        }
        command => {
            let dashboard = open_dashboard(&config)?;
            run_command(dashboard, command, &config.session_file).await
        }
    }
}

// ============================================================================
// Session
// ============================================================================

async fn run_login(
    config: &DashboardConfig,
    token: Option<String>,
    user_id: Option<String>,
) -> Result<()> {
    let session = match (token, user_id) {
        (Some(token), _) => {
            if let Some(audience) = &config.auth_audience {
                if !token_has_audience(token.trim(), audience) {
                    bail!("Access token was not issued for audience '{}'", audience);
                }
            }
            let backend = HttpLoanBackend::new(config)?;
            sign_in(&backend, token.trim()).await?
        }
        (None, Some(user_id)) => {
            let user_id = user_id.trim();
            if user_id.is_empty() {
                bail!("--user-id must not be empty");
            }
            Session::for_user(user_id)
        }
        (None, None) => bail!("Pass --token or --user-id"),
    };
    save_session(&config.session_file, &session)?;
    println!("Signed in as user {}.", session.user_id);
    Ok(())
}

fn open_dashboard(config: &DashboardConfig) -> Result<Dashboard<HttpLoanBackend>> {
    let session = require_session(&config.session_file)?;
    if session.token_expired() {
        warn!("Stored access token has expired; bearer requests will fail until you log in again");
    }
    info!("Session for user {}", session.user_id);
    let backend = HttpLoanBackend::new(config)?;
    Ok(Dashboard::new(
        backend,
        session,
        config.default_reminder_days,
    ))
}

// ============================================================================
// Commands
// ============================================================================

async fn run_command(
    mut dashboard: Dashboard<HttpLoanBackend>,
    command: Commands,
    session_file: &Path,
) -> Result<()> {
    match command {
        Commands::Loans => {
            print!("{}", render::loan_list(&dashboard.loans().await));
        }
        Commands::Show { loan, role, json } => {
            let view = dashboard
                .open_loan(loan.as_deref(), role, today())
                .await
                .ok_or_else(|| match &loan {
                    Some(l) => anyhow!("Loan {} could not be loaded", l),
                    None => anyhow!("You have no loans to show"),
                })?;
            if json {
                println!("{}", serde_json::to_string_pretty(&view.snapshot)?);
            } else {
                print!("{}", render::loan_view(&view));
            }
        }
        Commands::History { loan, role } => {
            let viewer = dashboard.resolve_role(&loan, role).await.ok();
            let history = dashboard.history(&loan).await;
            print!("{}", render::history(&history, viewer));
        }
        Commands::Upload {
            loan,
            amount,
            date,
            payer,
            file,
            method,
            comment,
        } => {
            let payer = dashboard.resolve_role(&loan, payer).await?;
            let attachment = Attachment::load(&file).await?;
            let draft = UploadDraft {
                loan_no: loan,
                amount,
                payment_date: Some(date),
                payer_role: Some(payer),
                payment_method: method,
                comment,
                attachment: Some(attachment),
            };
            let (message, history) = dashboard.upload_payment(draft).await?;
            println!("{}", message);
            print!("{}", render::history(&history, Some(payer)));
        }
        Commands::Verify {
            loan,
            record,
            status,
            role,
            yes,
        } => {
            let viewer = dashboard.resolve_role(&loan, role).await?;
            if status.requires_confirmation() && !yes {
                confirm_action(
                    &format!("Mark payment {} on {} as verified?", record, loan),
                    VERIFY_WARNING,
                )
                .await?;
            }
            let history = dashboard
                .set_verification(&loan, &record, viewer, status)
                .await
                .context("Failed to update status")?;
            println!("Status updated successfully!");
            print!("{}", render::history(&history, Some(viewer)));
        }
        Commands::Comment {
            loan,
            record,
            text,
            role,
        } => {
            let viewer = dashboard.resolve_role(&loan, role).await?;
            let saved = dashboard
                .save_comment(&loan, &record, viewer, Some(text.trim()))
                .await
                .context("Failed to save comment")?;
            match saved {
                Some(history) => {
                    println!("Comment saved!");
                    print!("{}", render::history(&history, Some(viewer)));
                }
                None => println!("Comment unchanged."),
            }
        }
        Commands::Notifications { command } => match command {
            NotificationCommands::Show { loan: None } => {
                print!("{}", render::loan_list(&dashboard.settings_loans().await));
            }
            NotificationCommands::Show { loan: Some(loan) } => {
                let settings = dashboard.notification_settings(&loan).await;
                print!("{}", render::notifications(&loan, settings.form()));
            }
            NotificationCommands::Set {
                loan,
                email,
                due,
                due_days,
                receive,
                receive_days,
            } => {
                let mut settings = dashboard.notification_settings_for_write(&loan).await?;
                if let Some(email) = email {
                    settings.set_email(&email);
                }
                settings.set_reminder(ReminderKind::PaymentDue, due, due_days)?;
                settings.set_reminder(ReminderKind::PaymentReceivable, receive, receive_days)?;
                let writes = dashboard.save_notification_settings(&mut settings).await?;
                if writes == 0 {
                    println!("Nothing changed.");
                } else {
                    println!("Reminder settings saved.");
                }
                print!("{}", render::notifications(&loan, settings.form()));
            }
        },
        Commands::Account { command } => match command {
            AccountCommands::Email => match dashboard.account_email().await {
                Some(email) => println!("{}", email),
                None => println!("No email on file."),
            },
            AccountCommands::SetEmail { email } => {
                dashboard.update_account_email(&email).await?;
                save_session(session_file, dashboard.session())?;
                println!("Email updated to {}.", email.trim());
            }
        },
        Commands::Link => {
            dashboard.link_identity().await?;
            println!("Identity linked to user {}.", dashboard.session().user_id);
        }
        Commands::Login { .. } | Commands::Logout => {
            bail!("login and logout do not need an open dashboard")
        }
    }
    Ok(())
}
