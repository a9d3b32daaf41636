//! Command routing for chat messages.
//!
//! Each update is handled independently; there is no state carried between
//! messages. Routing itself is a pure function so the dispatch table can be
//! tested without a network.

use std::sync::Arc;

use teloxide::types::{Message, Update, UpdateKind};
use teloxide::utils::command::BotCommands;
use tracing::warn;

use crate::bot::commands::Command;
use crate::bot::delivery::BotDelivery;
use crate::qr::{self, QrConfig};

const GREETING: &str = "Hi! Send me any text and I'll reply with a QR code image.";
const USAGE: &str =
    "Send a text message and I'll reply with a QR code for it.\n\
     /start - greeting\n/help - this message\n/about - what this bot is";
const ABOUT: &str = "A small bot that turns text messages into QR code images.";
const UNKNOWN_COMMAND: &str = "Unknown command. Send /help for usage.";
const EMPTY_TEXT: &str = "I need some text to encode. Send a plain text message.";
const GENERATION_FAILED: &str = "Sorry, I could not generate a QR code for that message.";
const DELIVERY_FAILED: &str = "Sorry, something went wrong sending your QR code.";

/// What a message resolves to.
#[derive(Debug, PartialEq, Eq)]
pub enum Route {
    /// Answer with a static text reply.
    Reply(&'static str),
    /// Encode the text as a QR image and reply with it.
    Encode(String),
}

/// Resolve message text to a route. Commands dispatch through the closed
/// [`Command`] enum; everything else is free text.
pub fn route(text: &str, bot_username: &str) -> Route {
    if let Ok(command) = Command::parse(text, bot_username) {
        return match command {
            Command::Start => Route::Reply(GREETING),
            Command::Help => Route::Reply(USAGE),
            Command::About => Route::Reply(ABOUT),
        };
    }

    let trimmed = text.trim();
    if trimmed.starts_with('/') {
        Route::Reply(UNKNOWN_COMMAND)
    } else if trimmed.is_empty() {
        Route::Reply(EMPTY_TEXT)
    } else {
        Route::Encode(text.to_string())
    }
}

/// Extract the message from an update, if it is one. Edited messages,
/// channel posts and the rest are ignored.
pub fn message_of(update: Update) -> Option<Message> {
    match update.kind {
        UpdateKind::Message(msg) => Some(msg),
        _ => None,
    }
}

/// Executes routes: generates artifacts and delivers replies. Any failure
/// to produce or send an artifact is reported back to the chat as a
/// plain-text error rather than dropped.
pub struct MessageRouter {
    delivery: Arc<BotDelivery>,
    qr: QrConfig,
    bot_username: String,
}

impl MessageRouter {
    pub fn new(delivery: Arc<BotDelivery>, qr: QrConfig, bot_username: String) -> Self {
        Self { delivery, qr, bot_username }
    }

    pub async fn handle_update(&self, update: Update) {
        if let Some(msg) = message_of(update) {
            self.handle_message(&msg).await;
        }
    }

    pub async fn handle_message(&self, msg: &Message) {
        // Stickers, photos and other non-text messages are ignored.
        let Some(text) = msg.text() else { return };

        let chat_id = msg.chat.id.0;
        let reply_to = Some(msg.id.0 as i64);

        match route(text, &self.bot_username) {
            Route::Reply(reply) => {
                if let Err(e) = self.delivery.send_message(chat_id, reply, reply_to).await {
                    warn!("Failed to deliver reply: {e}");
                }
            }
            Route::Encode(text) => self.reply_with_qr(chat_id, &text, reply_to).await,
        }
    }

    async fn reply_with_qr(&self, chat_id: i64, text: &str, reply_to: Option<i64>) {
        match qr::generate(text, &self.qr) {
            Ok(png) => {
                if let Err(e) = self
                    .delivery
                    .send_qr_image(chat_id, png, None, reply_to)
                    .await
                {
                    warn!("QR delivery failed: {e}");
                    self.delivery
                        .send_message(chat_id, DELIVERY_FAILED, reply_to)
                        .await
                        .ok();
                }
            }
            Err(e) => {
                warn!("QR generation failed: {e}");
                self.delivery
                    .send_message(chat_id, GENERATION_FAILED, reply_to)
                    .await
                    .ok();
            }
        }
    }
}
