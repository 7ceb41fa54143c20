use clap::Subcommand;
use serde_json::json;
use uuid::Uuid;

use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::services::MarketContext;
use crate::validation::PortfolioDraft;

#[derive(Subcommand)]
pub enum PortfolioCommands {
    #[command(about = "List portfolio items (defaults to yours)")]
    List {
        #[arg(help = "Tailor user ID")]
        tailor_id: Option<Uuid>,
    },

    #[command(about = "Add a portfolio item")]
    Add {
        #[arg(long)]
        title: String,
        #[arg(long)]
        category: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, help = "http(s) link to an image")]
        image_url: Option<String>,
    },

    #[command(about = "Remove one of your portfolio items")]
    Delete {
        #[arg(help = "Portfolio item ID")]
        id: Uuid,
    },
}

pub async fn handle(cmd: PortfolioCommands, ctx: &MarketContext, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        PortfolioCommands::List { tailor_id } => {
            let items = match tailor_id {
                Some(id) => ctx.portfolio().list(id).await?,
                None => ctx.portfolio().mine().await?,
            };
            if items.is_empty() {
                return output_empty_collection(&output_format, "portfolio", "No portfolio items");
            }
            match output_format {
                OutputFormat::Json => output_json("portfolio", &items),
                OutputFormat::Text => {
                    println!("{:<38} {:<16} {:<30} {}", "ID", "CATEGORY", "TITLE", "ADDED");
                    println!("{}", "-".repeat(100));
                    for item in &items {
                        println!(
                            "{:<38} {:<16} {:<30} {}",
                            item.id,
                            truncate(&item.category, 16),
                            truncate(&item.title, 30),
                            format_date(&item.created_at)
                        );
                    }
                    Ok(())
                }
            }
        }
        PortfolioCommands::Add { title, category, description, image_url } => {
            let item = ctx.portfolio().add(&PortfolioDraft { title, description, image_url, category }).await?;
            output_success(&output_format, &format!("Added '{}' ({})", item.title, item.id), Some(json!({ "item": item })))
        }
        PortfolioCommands::Delete { id } => {
            ctx.portfolio().delete(id).await?;
            output_success(&output_format, &format!("Portfolio item {} deleted", id), None)
        }
    }
}
