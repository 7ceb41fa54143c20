use clap::Subcommand;
use serde_json::json;
use uuid::Uuid;

use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::models::{Job, JobStatus, JobType};
use crate::policy::JobView;
use crate::services::{JobQuery, MarketContext};
use crate::validation::JobDraft;

#[derive(Subcommand)]
pub enum JobCommands {
    #[command(about = "List open jobs")]
    List {
        #[arg(long, help = "Filter by location (subscribers only)")]
        location: Option<String>,
        #[arg(long, help = "Search titles, and descriptions for subscribers")]
        search: Option<String>,
    },

    #[command(about = "Show full job details (subscribers only)")]
    Show {
        #[arg(help = "Job ID")]
        id: Uuid,
    },

    #[command(about = "Post a new job")]
    Post {
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: String,
        #[arg(long, help = "Minimum budget in rupees")]
        budget_min: String,
        #[arg(long, help = "Maximum budget in rupees")]
        budget_max: String,
        #[arg(long)]
        location: String,
        #[arg(long, help = "Deadline, YYYY-MM-DD")]
        deadline: String,
        #[arg(long, default_value = "", help = "Additional requirements")]
        requirements: String,
        #[arg(long, default_value = "full_time", help = "full_time, part_time or contract")]
        job_type: String,
    },

    #[command(about = "List jobs you posted")]
    Mine,

    #[command(about = "Move a job to a new status")]
    Status {
        #[arg(help = "Job ID")]
        id: Uuid,
        #[arg(help = "open, in_progress, completed or cancelled")]
        status: String,
    },

    #[command(about = "Delete an open job you posted")]
    Delete {
        #[arg(help = "Job ID")]
        id: Uuid,
    },
}

pub async fn handle(cmd: JobCommands, ctx: &MarketContext, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        JobCommands::List { location, search } => {
            let views = ctx.jobs().list_open(&JobQuery { location, search }).await?;
            if views.is_empty() {
                return output_empty_collection(&output_format, "jobs", "No open jobs");
            }
            match output_format {
                OutputFormat::Json => output_json("jobs", &views),
                OutputFormat::Text => {
                    print_views(&views);
                    if views.iter().any(JobView::is_redacted) {
                        println!();
                        println!("Subscribe to see descriptions, locations and deadlines.");
                    }
                    Ok(())
                }
            }
        }
        JobCommands::Show { id } => {
            let view = ctx.jobs().open_details(id).await?;
            match (&output_format, &view) {
                (OutputFormat::Json, _) => output_json("job", &view),
                (OutputFormat::Text, JobView::Detailed(job)) => {
                    print_job(job);
                    Ok(())
                }
                (OutputFormat::Text, JobView::Summary(summary)) => {
                    println!("{} ({})", summary.title, format_budget(summary.budget_min, summary.budget_max));
                    Ok(())
                }
            }
        }
        JobCommands::Post { title, description, budget_min, budget_max, location, deadline, requirements, job_type } => {
            let job_type: JobType = job_type.parse().map_err(|e: String| anyhow::anyhow!(e))?;
            let draft = JobDraft { title, description, budget_min, budget_max, location, deadline, requirements, job_type };
            let job = ctx.jobs().post(&draft).await?;
            output_success(&output_format, &format!("Posted job '{}' ({})", job.title, job.id), Some(json!({ "job": job })))
        }
        JobCommands::Mine => {
            let jobs = ctx.jobs().mine().await?;
            if jobs.is_empty() {
                return output_empty_collection(&output_format, "jobs", "You have not posted any jobs");
            }
            match output_format {
                OutputFormat::Json => output_json("jobs", &jobs),
                OutputFormat::Text => {
                    println!("{:<38} {:<30} {:<12} {:<22} {}", "ID", "TITLE", "STATUS", "BUDGET", "DEADLINE");
                    println!("{}", "-".repeat(115));
                    for job in &jobs {
                        println!(
                            "{:<38} {:<30} {:<12} {:<22} {}",
                            job.id,
                            truncate(&job.title, 30),
                            job.status,
                            format_budget(job.budget_min, job.budget_max),
                            format_date(&job.deadline)
                        );
                    }
                    Ok(())
                }
            }
        }
        JobCommands::Status { id, status } => {
            let next: JobStatus = status.parse().map_err(|e: String| anyhow::anyhow!(e))?;
            let job = ctx.jobs().update_status(id, next).await?;
            output_success(&output_format, &format!("Job '{}' is now {}", job.title, job.status), Some(json!({ "job": job })))
        }
        JobCommands::Delete { id } => {
            ctx.jobs().delete(id).await?;
            output_success(&output_format, &format!("Job {} deleted", id), None)
        }
    }
}

fn print_views(views: &[JobView]) {
    println!("{:<38} {:<30} {:<22} {:<16} {}", "ID", "TITLE", "BUDGET", "LOCATION", "DEADLINE");
    println!("{}", "-".repeat(120));
    for view in views {
        match view {
            JobView::Detailed(job) => println!(
                "{:<38} {:<30} {:<22} {:<16} {}",
                job.id,
                truncate(&job.title, 30),
                format_budget(job.budget_min, job.budget_max),
                truncate(&job.location, 16),
                format_date(&job.deadline)
            ),
            JobView::Summary(summary) => println!(
                "{:<38} {:<30} {:<22} {:<16} {}",
                summary.id,
                truncate(&summary.title, 30),
                format_budget(summary.budget_min, summary.budget_max),
                "🔒",
                "🔒"
            ),
        }
    }
}

fn print_job(job: &Job) {
    println!("{}", job.title);
    println!("Budget:   {}", format_budget(job.budget_min, job.budget_max));
    println!("Location: {}", job.location);
    println!("Deadline: {}", format_date(&job.deadline));
    println!("Status:   {}", job.status);
    println!();
    println!("{}", job.description);
    if let Some(requirements) = &job.requirements {
        println!();
        println!("Requirements: {}", requirements);
    }
}
