use clap::Subcommand;
use serde_json::json;
use uuid::Uuid;

use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::error::MarketError;
use crate::models::Profile;
use crate::policy::AccessError;
use crate::services::MarketContext;
use crate::validation::ProfileDraft;

#[derive(Subcommand)]
pub enum ProfileCommands {
    #[command(about = "Show a profile and portfolio (defaults to yours)")]
    Show {
        #[arg(help = "User ID")]
        user_id: Option<Uuid>,
    },

    #[command(about = "Create or replace your profile")]
    Update {
        #[arg(long)]
        full_name: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long, help = "Years of experience")]
        experience: Option<String>,
        #[arg(long = "specialization", help = "Repeat for each specialization")]
        specializations: Vec<String>,
        #[arg(long)]
        bio: Option<String>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long, help = "Hourly rate in rupees")]
        hourly_rate: Option<String>,
    },
}

pub async fn handle(cmd: ProfileCommands, ctx: &MarketContext, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        ProfileCommands::Show { user_id } => {
            let user_id = match user_id {
                Some(id) => id,
                None => match ctx.session().identity() {
                    Some(identity) => identity.id,
                    None => return Err(MarketError::from(AccessError::NotSignedIn).into()),
                },
            };
            let page = ctx.profiles().page(user_id).await?;
            match output_format {
                OutputFormat::Json => {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&json!({ "profile": page.profile, "portfolio": page.portfolio }))?
                    );
                    Ok(())
                }
                OutputFormat::Text => {
                    match &page.profile {
                        Some(profile) => print_profile(profile),
                        None => println!("No profile yet"),
                    }
                    if !page.portfolio.is_empty() {
                        println!();
                        println!("Portfolio:");
                        for item in &page.portfolio {
                            println!("  {} [{}] {}", item.id, item.category, item.title);
                        }
                    }
                    Ok(())
                }
            }
        }
        ProfileCommands::Update { full_name, phone, experience, specializations, bio, location, hourly_rate } => {
            let draft = ProfileDraft {
                full_name,
                phone,
                experience_years: experience,
                specializations,
                bio,
                location,
                hourly_rate,
            };
            let profile = ctx.profiles().save(&draft).await?;
            output_success(&output_format, "Profile saved", Some(json!({ "profile": profile })))
        }
    }
}

fn print_profile(profile: &Profile) {
    let field = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".to_string());
    println!("Name:        {}", field(&profile.full_name));
    println!("Phone:       {}", field(&profile.phone));
    println!("Location:    {}", field(&profile.location));
    if let Some(years) = profile.experience_years {
        println!("Experience:  {} years", years);
    }
    if let Some(rate) = profile.hourly_rate {
        println!("Hourly rate: ₹{}", rate);
    }
    if let Some(specializations) = &profile.specializations {
        println!("Skills:      {}", specializations.join(", "));
    }
    if let Some(bio) = &profile.bio {
        println!();
        println!("{}", bio);
    }
}
