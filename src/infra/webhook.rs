use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{info, warn};

use crate::domain::notification::{Delivery, DeliveryError};
use crate::domain::ports::NotificationChannel;
use crate::domain::subscription::ActiveSubscription;
use crate::domain::weather::WeatherSnapshot;

pub const WEATHER_UPDATE_EVENT: &str = "weather_update";

#[derive(Clone)]
pub struct WebhookClient {
    client: Client,
}

impl WebhookClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl NotificationChannel for WebhookClient {
    async fn deliver(
        &self,
        target: &ActiveSubscription,
        snapshot: &WeatherSnapshot,
    ) -> Result<Delivery, DeliveryError> {
        let subscription = &target.subscription;
        let Some(url) = subscription
            .webhook_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
        else {
            warn!(
                subscription_id = %subscription.id,
                "skipping webhook, no URL configured"
            );
            return Ok(Delivery::Skipped);
        };

        let response = self
            .client
            .post(url)
            .json(&webhook_payload(target, snapshot))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::Status(status.as_u16()));
        }

        info!(url = %url, city = %subscription.city, "weather webhook sent");
        Ok(Delivery::Sent)
    }
}

pub fn webhook_payload(target: &ActiveSubscription, snapshot: &WeatherSnapshot) -> Value {
    json!({
        "event": WEATHER_UPDATE_EVENT,
        "subscription_id": target.subscription.id,
        "user_email": target.owner_email,
        "city": target.subscription.city,
        "data": {
            "temperature": snapshot.temperature,
            "feels_like": snapshot.feels_like,
            "description": snapshot.description_or_default(),
            "humidity": snapshot.humidity,
            "wind_speed": snapshot.wind_speed,
            "raw": snapshot.raw,
        }
    })
}
