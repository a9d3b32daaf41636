use teloxide::prelude::*;
use teloxide::types::BotCommand;
use teloxide::utils::command::BotCommands;
use tracing::info;

/// Commands the bot understands. Anything else that looks like a command
/// gets a usage hint; plain text is encoded as a QR image.
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Supported commands:")]
pub enum Command {
    #[command(description = "Greet and explain what the bot does.")]
    Start,
    #[command(description = "Show usage instructions.")]
    Help,
    #[command(description = "What this bot is.")]
    About,
}

/// Publish the command menu that appears in the Telegram client.
pub async fn set_bot_commands(bot: &Bot) -> Result<(), teloxide::RequestError> {
    let commands = vec![
        BotCommand::new("start", "Greet and explain what the bot does"),
        BotCommand::new("help", "Show usage instructions"),
        BotCommand::new("about", "What this bot is"),
    ];
    bot.set_my_commands(commands).await?;
    info!("Bot command menu registered");
    Ok(())
}
