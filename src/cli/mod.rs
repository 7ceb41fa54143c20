pub mod commands;
pub mod config;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::error::MarketError;

#[derive(Parser)]
#[command(name = "tailor-market")]
#[command(about = "Tailor Market CLI - boutiques post jobs, tailors apply")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Sign up, sign in and account management")]
    Auth {
        #[command(subcommand)]
        cmd: commands::auth::AuthCommands,
    },

    #[command(about = "Browse, post and manage jobs")]
    Jobs {
        #[command(subcommand)]
        cmd: commands::jobs::JobCommands,
    },

    #[command(about = "Apply to jobs and review applications")]
    Applications {
        #[command(subcommand)]
        cmd: commands::applications::ApplicationCommands,
    },

    #[command(about = "View and edit profiles")]
    Profile {
        #[command(subcommand)]
        cmd: commands::profile::ProfileCommands,
    },

    #[command(about = "Manage a tailor's portfolio")]
    Portfolio {
        #[command(subcommand)]
        cmd: commands::portfolio::PortfolioCommands,
    },

    #[command(about = "Subscription plans")]
    Plans {
        #[command(subcommand)]
        cmd: commands::plans::PlanCommands,
    },

    #[command(about = "Direct messages (subscribers only)")]
    Messages {
        #[command(subcommand)]
        cmd: commands::messages::MessageCommands,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let ctx = config::connect().await?;

    let result = match cli.command {
        Commands::Auth { cmd } => commands::auth::handle(cmd, &ctx, output_format.clone()).await,
        Commands::Jobs { cmd } => commands::jobs::handle(cmd, &ctx, output_format.clone()).await,
        Commands::Applications { cmd } => commands::applications::handle(cmd, &ctx, output_format.clone()).await,
        Commands::Profile { cmd } => commands::profile::handle(cmd, &ctx, output_format.clone()).await,
        Commands::Portfolio { cmd } => commands::portfolio::handle(cmd, &ctx, output_format.clone()).await,
        Commands::Plans { cmd } => commands::plans::handle(cmd, &ctx, output_format.clone()).await,
        Commands::Messages { cmd } => commands::messages::handle(cmd, &ctx, output_format.clone()).await,
    };

    // Domain failures are reported with their user-facing message, never the internal one.
    result.map_err(|err| match err.downcast::<MarketError>() {
        Ok(market) => {
            if let OutputFormat::Json = output_format {
                if let Ok(rendered) = serde_json::to_string_pretty(&market.to_json()) {
                    println!("{}", rendered);
                }
            }
            if market.is_paywall() {
                anyhow::anyhow!("{} Run 'tailor-market plans list' to upgrade.", market.user_message())
            } else {
                anyhow::anyhow!(market.user_message())
            }
        }
        Err(other) => other,
    })
}
