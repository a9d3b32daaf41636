//! Outbound Telegram delivery.

use teloxide::prelude::*;
use teloxide::types::{InputFile, MessageId, ReplyParameters};
use tracing::{info, warn};

/// Thin wrapper over the Telegram send-message / send-photo calls. Failures
/// come back as human-readable strings; they end up in error replies and in
/// the `detail` field of 500 responses.
pub struct BotDelivery {
    bot: Bot,
}

impl BotDelivery {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        reply_to_message_id: Option<i64>,
    ) -> Result<i64, String> {
        let mut request = self.bot.send_message(ChatId(chat_id), text);

        if let Some(msg_id) = reply_to_message_id {
            request = request.reply_parameters(ReplyParameters::new(MessageId(msg_id as i32)));
        }

        request.await.map(|msg| msg.id.0 as i64).map_err(|e| {
            let msg = format!("Failed to send message: {e}");
            warn!("{}", msg);
            msg
        })
    }

    /// Send a QR image from in-memory PNG bytes.
    pub async fn send_qr_image(
        &self,
        chat_id: i64,
        png: Vec<u8>,
        caption: Option<&str>,
        reply_to_message_id: Option<i64>,
    ) -> Result<i64, String> {
        info!("Sending QR image to chat {} ({} bytes)", chat_id, png.len());

        let input_file = InputFile::memory(png).file_name("qrcode.png");
        let mut request = self.bot.send_photo(ChatId(chat_id), input_file);

        if let Some(cap) = caption {
            request = request.caption(cap);
        }

        if let Some(msg_id) = reply_to_message_id {
            request = request.reply_parameters(ReplyParameters::new(MessageId(msg_id as i32)));
        }

        request.await.map(|msg| msg.id.0 as i64).map_err(|e| {
            let msg = format!("Failed to send image: {e}");
            warn!("{}", msg);
            msg
        })
    }
}
