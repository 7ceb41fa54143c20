use clap::Subcommand;
use serde_json::json;
use uuid::Uuid;

use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::models::ApplicationStatus;
use crate::services::MarketContext;
use crate::store::StatusFilter;
use crate::validation::ApplicationDraft;

#[derive(Subcommand)]
pub enum ApplicationCommands {
    #[command(about = "Apply to an open job")]
    Apply {
        #[arg(help = "Job ID")]
        job_id: Uuid,
        #[arg(long, help = "Cover letter")]
        cover_letter: Option<String>,
        #[arg(long, help = "Proposed budget in rupees")]
        budget: Option<String>,
    },

    #[command(about = "List your applications")]
    Mine,

    #[command(about = "List applications received on your jobs")]
    Received {
        #[arg(long, help = "Only this job")]
        job: Option<Uuid>,
        #[arg(long, help = "pending, accepted or rejected")]
        status: Option<String>,
    },

    #[command(about = "Accept a pending application")]
    Accept {
        #[arg(help = "Application ID")]
        id: Uuid,
    },

    #[command(about = "Reject a pending application")]
    Reject {
        #[arg(help = "Application ID")]
        id: Uuid,
    },

    #[command(about = "Withdraw your pending application")]
    Withdraw {
        #[arg(help = "Application ID")]
        id: Uuid,
    },
}

pub async fn handle(cmd: ApplicationCommands, ctx: &MarketContext, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        ApplicationCommands::Apply { job_id, cover_letter, budget } => {
            let draft = ApplicationDraft { job_id, cover_letter, proposed_budget: budget };
            let application = ctx.applications().apply(&draft).await?;
            output_success(
                &output_format,
                &format!("Applied to job {}", job_id),
                Some(json!({ "application": application })),
            )
        }
        ApplicationCommands::Mine => {
            let submitted = ctx.applications().mine().await?;
            if submitted.is_empty() {
                return output_empty_collection(&output_format, "applications", "You have not applied to any jobs");
            }
            match output_format {
                OutputFormat::Json => output_json("applications", &submitted),
                OutputFormat::Text => {
                    println!("{:<38} {:<30} {:<10} {:<24} {}", "ID", "JOB", "STATUS", "BOUTIQUE", "APPLIED");
                    println!("{}", "-".repeat(115));
                    for s in &submitted {
                        println!(
                            "{:<38} {:<30} {:<10} {:<24} {}",
                            s.application.id,
                            truncate(&s.job.title, 30),
                            s.application.status,
                            truncate(&s.job.boutique.email, 24),
                            format_date(&s.application.created_at)
                        );
                    }
                    Ok(())
                }
            }
        }
        ApplicationCommands::Received { job, status } => {
            let filter = match status {
                Some(raw) => StatusFilter::Only(raw.parse::<ApplicationStatus>().map_err(|e| anyhow::anyhow!(e))?),
                None => StatusFilter::All,
            };
            let received = ctx.applications().received(job, filter).await?;
            if received.is_empty() {
                return output_empty_collection(&output_format, "applications", "No applications yet");
            }
            match output_format {
                OutputFormat::Json => output_json("applications", &received),
                OutputFormat::Text => {
                    println!("{:<38} {:<28} {:<10} {:<26} {}", "ID", "JOB", "STATUS", "TAILOR", "PROPOSED");
                    println!("{}", "-".repeat(115));
                    for r in &received {
                        let proposed = r.application.proposed_budget.map(|b| format!("₹{}", b)).unwrap_or_default();
                        println!(
                            "{:<38} {:<28} {:<10} {:<26} {}",
                            r.application.id,
                            truncate(&r.job.title, 28),
                            r.application.status,
                            truncate(&r.tailor.email, 26),
                            proposed
                        );
                    }
                    Ok(())
                }
            }
        }
        ApplicationCommands::Accept { id } => review(ctx, &output_format, id, ApplicationStatus::Accepted).await,
        ApplicationCommands::Reject { id } => review(ctx, &output_format, id, ApplicationStatus::Rejected).await,
        ApplicationCommands::Withdraw { id } => {
            ctx.applications().withdraw(id).await?;
            output_success(&output_format, &format!("Application {} withdrawn", id), None)
        }
    }
}

async fn review(
    ctx: &MarketContext,
    output_format: &OutputFormat,
    id: Uuid,
    decision: ApplicationStatus,
) -> anyhow::Result<()> {
    let application = ctx.applications().review(id, decision).await?;
    output_success(
        output_format,
        &format!("Application {} {}", id, application.status),
        Some(json!({ "application": application })),
    )
}
