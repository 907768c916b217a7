use async_trait::async_trait;
use teloxide::prelude::*;

use crate::scheduling::{MessageTransport, TransportError};

pub struct TelegramDeliveryChannel {
    bot: Bot,
}

impl TelegramDeliveryChannel {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl MessageTransport<ChatId> for TelegramDeliveryChannel {
    async fn send(&self, subscriber: &ChatId, text: &str) -> Result<(), TransportError> {
        self.bot.send_message(*subscriber, text).await?;
        Ok(())
    }
}
