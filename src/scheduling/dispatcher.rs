use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::{clock::Clock, countdown};

use super::SubscriberKey;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error(transparent)]
    Telegram(#[from] teloxide::RequestError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[async_trait]
pub trait MessageTransport<K: SubscriberKey>: Send + Sync + 'static {
    async fn send(&self, subscriber: &K, text: &str) -> Result<(), TransportError>;
}

pub struct NotificationDispatcher<K: SubscriberKey> {
    target_date: NaiveDate,
    clock: Arc<dyn Clock>,
    transport: Arc<dyn MessageTransport<K>>,
}

impl<K: SubscriberKey> NotificationDispatcher<K> {
    pub fn new(
        target_date: NaiveDate,
        clock: Arc<dyn Clock>,
        transport: Arc<dyn MessageTransport<K>>,
    ) -> Self {
        Self {
            target_date,
            clock,
            transport,
        }
    }

    pub async fn deliver(&self, subscriber: &K) {
        let countdown = countdown::compute(self.clock.now(), self.target_date);

        log::info!(
            "Sending countdown. [subscriber = {}, days_left = {}]",
            subscriber,
            countdown.days_left
        );

        match self.transport.send(subscriber, &countdown.message).await {
            Ok(()) => log::info!("Countdown delivered. [subscriber = {}]", subscriber),
            Err(error) => log::error!(
                "Failed to deliver countdown. [subscriber = {}, error = {}]",
                subscriber,
                error
            ),
        }
    }
}
