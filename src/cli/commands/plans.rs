use clap::Subcommand;

use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::services::MarketContext;

#[derive(Subcommand)]
pub enum PlanCommands {
    #[command(about = "List subscription plans")]
    List,

    #[command(about = "Subscribe to a plan")]
    Subscribe {
        #[arg(help = "Plan ID, e.g. basic_monthly")]
        plan: String,
    },

    #[command(about = "Cancel your subscription")]
    Cancel,
}

pub async fn handle(cmd: PlanCommands, ctx: &MarketContext, output_format: OutputFormat) -> anyhow::Result<()> {
    let subscriptions = ctx.subscriptions();
    match cmd {
        PlanCommands::List => {
            let plans = subscriptions.plans();
            match output_format {
                OutputFormat::Json => output_json("plans", plans),
                OutputFormat::Text => {
                    let current = ctx.store().identity().map(|i| i.subscription_tier);
                    for plan in plans {
                        let marker = if current == Some(plan.tier) { " (current)" } else { "" };
                        println!("{} - {} {}/month{}", plan.name, plan.currency, plan.price, marker);
                        println!("  id: {}", plan.id);
                        for feature in plan.features {
                            println!("  • {}", feature);
                        }
                        println!();
                    }
                    Ok(())
                }
            }
        }
        PlanCommands::Subscribe { plan } => {
            let plan = subscriptions.subscribe(&plan).await?;
            output_success(&output_format, &format!("Subscribed to {}", plan.name), None)
        }
        PlanCommands::Cancel => {
            subscriptions.cancel().await?;
            output_success(&output_format, "Subscription cancelled", None)
        }
    }
}
