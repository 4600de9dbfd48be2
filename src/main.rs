use briefing_bot::config::AppConfig;
use briefing_bot::observability;
use briefing_bot::tasks::alert::{check_recipient, send_alert};
use briefing_bot::tasks::briefing::send_briefing_now;
use briefing_bot::tasks::{scheduler, BriefingService};
use briefing_bot::{AppResult, Dialect};
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

/// CLI options
#[derive(Parser, Debug)]
#[command(author, version, about = "Market news briefings over Telegram", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Send the briefing every day at BRIEFING_TIME until stopped
    Server,
    /// Send the briefing to every opted-in user now
    Briefing,
    /// Send a direct message to one user
    Alert {
        /// Directory id of the user
        user_id: String,
        /// Message body (Telegram HTML)
        message: String,
    },
    /// Print the briefing without sending it
    Preview {
        /// Render Markdown instead of Telegram HTML
        #[arg(long)]
        markdown: bool,
    },
    /// Check that the Telegram token stored for a user works
    Check {
        /// Directory id of the user
        user_id: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();
    observability::init_logging();

    let args = Args::parse();
    match run(args.command).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "Run aborted");
            if e.is_fatal() {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

async fn run(command: Command) -> AppResult<ExitCode> {
    let config = AppConfig::from_env()?;
    let service = Arc::new(BriefingService::from_config(&config)?);

    match command {
        Command::Server => {
            info!(feeds = config.feeds.len(), "Briefing bot started");
            tokio::select! {
                _ = scheduler::start(service, config.schedule) => {}
                _ = tokio::signal::ctrl_c() => info!("Shutting down"),
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Briefing => {
            let report = send_briefing_now(&service).await?;
            println!("{}", report.summary());
            for failure in &report.failures {
                println!(
                    "  - {}: {}",
                    failure.chat_id,
                    failure.error.as_deref().unwrap_or("unknown error")
                );
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Alert { user_id, message } => {
            if send_alert(&service, &user_id, &message).await? {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::FAILURE)
            }
        }
        Command::Preview { markdown } => {
            let dialect = if markdown { Dialect::Markdown } else { Dialect::Html };
            println!("{}", service.build_digest(dialect).await);
            Ok(ExitCode::SUCCESS)
        }
        Command::Check { user_id } => match check_recipient(&service, &user_id).await {
            Ok(Some(bot)) => {
                println!(
                    "User {} sends through @{} (id {})",
                    user_id,
                    bot.username.unwrap_or(bot.first_name),
                    bot.id
                );
                Ok(ExitCode::SUCCESS)
            }
            Ok(None) => {
                println!("User {user_id} not found or missing Telegram settings");
                Ok(ExitCode::FAILURE)
            }
            Err(e) if !e.is_fatal() => {
                println!("Token for user {user_id} was rejected: {e}");
                Ok(ExitCode::FAILURE)
            }
            Err(e) => Err(e),
        },
    }
}
