use clap::Subcommand;
use serde_json::json;
use uuid::Uuid;

use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::error::MarketError;
use crate::models::{Role, SubscriptionTier};
use crate::policy::AccessError;
use crate::services::MarketContext;
use crate::validation::{SignInForm, SignUpForm};

#[derive(Subcommand)]
pub enum AuthCommands {
    #[command(about = "Create an account")]
    Signup {
        #[arg(help = "Email")]
        email: String,
        #[arg(long, help = "Account type: boutique or tailor")]
        role: String,
        #[arg(long, help = "Password")]
        password: String,
        #[arg(long, help = "Repeat the password")]
        confirm: String,
    },

    #[command(about = "Sign in with email and password")]
    Login {
        #[arg(help = "Email")]
        email: String,
        #[arg(long, help = "Password")]
        password: String,
    },

    #[command(about = "Sign out")]
    Logout,

    #[command(about = "Show the signed-in account")]
    Whoami,

    #[command(about = "Change a user's role (admin only)")]
    SetRole {
        #[arg(help = "User ID")]
        user_id: Uuid,
        #[arg(help = "Role: boutique, tailor or admin")]
        role: String,
    },

    #[command(about = "Change a subscription tier")]
    SetTier {
        #[arg(help = "Tier: free, basic or premium")]
        tier: String,
        #[arg(long, help = "User ID (defaults to yourself)")]
        user_id: Option<Uuid>,
    },
}

pub async fn handle(cmd: AuthCommands, ctx: &MarketContext, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        AuthCommands::Signup { email, role, password, confirm } => {
            let role: Role = role.parse().map_err(|e: String| anyhow::anyhow!(e))?;
            let form = SignUpForm { email, password, confirm_password: confirm, role };
            let identity = ctx.sign_up(&form).await?;
            output_success(
                &output_format,
                &format!("Signed up as {} ({})", identity.email, identity.role),
                Some(json!({ "identity": identity })),
            )
        }
        AuthCommands::Login { email, password } => {
            let identity = ctx.sign_in(&SignInForm { email, password }).await?;
            output_success(
                &output_format,
                &format!("Signed in as {} ({}, {} plan)", identity.email, identity.role, identity.subscription_tier),
                Some(json!({ "identity": identity })),
            )
        }
        AuthCommands::Logout => {
            ctx.sign_out().await;
            output_success(&output_format, "Signed out", None)
        }
        AuthCommands::Whoami => match ctx.store().identity() {
            Some(identity) => match output_format {
                OutputFormat::Json => output_json("identity", &identity),
                OutputFormat::Text => {
                    println!("Email: {}", identity.email);
                    println!("Role:  {}", identity.role);
                    println!("Plan:  {}", identity.subscription_tier);
                    println!("ID:    {}", identity.id);
                    Ok(())
                }
            },
            None => match output_format {
                OutputFormat::Json => output_json("identity", &serde_json::Value::Null),
                OutputFormat::Text => {
                    println!("Not signed in");
                    Ok(())
                }
            },
        },
        AuthCommands::SetRole { user_id, role } => {
            let role: Role = role.parse().map_err(|e: String| anyhow::anyhow!(e))?;
            let identity = ctx.set_user_role(user_id, role).await?;
            output_success(
                &output_format,
                &format!("{} is now {}", identity.email, identity.role),
                Some(json!({ "identity": identity })),
            )
        }
        AuthCommands::SetTier { tier, user_id } => {
            let tier: SubscriptionTier = tier.parse().map_err(|e: String| anyhow::anyhow!(e))?;
            let target = match user_id.or_else(|| ctx.store().identity().map(|i| i.id)) {
                Some(id) => id,
                None => return Err(MarketError::from(AccessError::NotSignedIn).into()),
            };
            let identity = ctx.set_subscription_tier(target, tier).await?;
            output_success(
                &output_format,
                &format!("{} is now on the {} plan", identity.email, identity.subscription_tier),
                Some(json!({ "identity": identity })),
            )
        }
    }
}
