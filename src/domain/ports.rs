//! Collaborators of the notification dispatcher. Production implementations
//! live in `infra` (HTTP clients) and `app::subscriptions` (Postgres).

use anyhow::Result;
use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::notification::{Delivery, DeliveryError};
use crate::domain::subscription::ActiveSubscription;
use crate::domain::weather::{WeatherError, WeatherSnapshot};

#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    async fn active_subscriptions(&self) -> Result<Vec<ActiveSubscription>>;

    /// Sets `last_notified_at` and nothing else.
    async fn mark_notified(&self, subscription_id: Uuid, at: OffsetDateTime) -> Result<()>;
}

#[async_trait]
pub trait WeatherSource: Send + Sync {
    async fn current_weather(&self, city: &str) -> Result<WeatherSnapshot, WeatherError>;
}

#[async_trait]
pub trait NotificationChannel: Send + Sync {
    async fn deliver(
        &self,
        target: &ActiveSubscription,
        snapshot: &WeatherSnapshot,
    ) -> Result<Delivery, DeliveryError>;
}
