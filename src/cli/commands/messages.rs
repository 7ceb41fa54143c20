use clap::Subcommand;
use uuid::Uuid;

use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::services::MarketContext;

#[derive(Subcommand)]
pub enum MessageCommands {
    #[command(about = "Send a message")]
    Send {
        #[arg(help = "Recipient user ID")]
        to: Uuid,
        #[arg(help = "Message text")]
        content: String,
    },

    #[command(about = "Show the conversation with a user")]
    Thread {
        #[arg(help = "Other user's ID")]
        with: Uuid,
    },
}

pub async fn handle(cmd: MessageCommands, ctx: &MarketContext, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        MessageCommands::Send { to, content } => {
            let message = ctx.messages().send(to, &content).await?;
            output_success(&output_format, &format!("Message {} sent", message.id), None)
        }
        MessageCommands::Thread { with } => {
            let messages = ctx.messages().conversation(with).await?;
            if messages.is_empty() {
                return output_empty_collection(&output_format, "messages", "No messages yet");
            }
            match output_format {
                OutputFormat::Json => output_json("messages", &messages),
                OutputFormat::Text => {
                    for message in &messages {
                        let who = if message.sender_id == with { "them" } else { "you" };
                        println!("[{}] {}: {}", message.created_at.format("%Y-%m-%d %H:%M"), who, message.content);
                    }
                    Ok(())
                }
            }
        }
    }
}
