use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::info;

use crate::domain::notification::{Delivery, DeliveryError};
use crate::domain::ports::NotificationChannel;
use crate::domain::subscription::ActiveSubscription;
use crate::domain::weather::WeatherSnapshot;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct EmailSettings {
    pub api_url: String,
    pub api_token: String,
    pub from: String,
}

/// Sends mail through a transactional email HTTP API.
#[derive(Clone)]
pub struct EmailClient {
    client: Client,
    settings: EmailSettings,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
}

#[derive(Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

impl EmailClient {
    pub fn new(settings: EmailSettings) -> Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client, settings })
    }

    pub async fn send(&self, to: &str, email: &RenderedEmail) -> Result<(), DeliveryError> {
        let body = SendEmailRequest {
            from: &self.settings.from,
            to: [to],
            subject: &email.subject,
            html: &email.html,
        };

        let response = self
            .client
            .post(&self.settings.api_url)
            .bearer_auth(&self.settings.api_token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::Status(status.as_u16()));
        }
        Ok(())
    }
}

#[async_trait]
impl NotificationChannel for EmailClient {
    async fn deliver(
        &self,
        target: &ActiveSubscription,
        snapshot: &WeatherSnapshot,
    ) -> Result<Delivery, DeliveryError> {
        let email = render_weather_email(&target.subscription.city, snapshot);
        self.send(&target.owner_email, &email).await?;
        info!(
            to = %target.owner_email,
            city = %target.subscription.city,
            "weather email sent"
        );
        Ok(Delivery::Sent)
    }
}

pub fn render_weather_email(city: &str, snapshot: &WeatherSnapshot) -> RenderedEmail {
    let city_html = escape_html(city);
    let description = match snapshot.description.as_deref() {
        Some(description) => escape_html(&capitalize(description)),
        None => snapshot.description_or_default().to_string(),
    };
    let wind_speed = snapshot
        .wind_speed
        .map(|speed| speed.to_string())
        .unwrap_or_else(|| "N/A".to_string());

    let html = format!(
        "<!DOCTYPE html>\n\
         <html>\n\
         <body style=\"font-family: sans-serif;\">\n\
         <h2>Weather update for {city_html}</h2>\n\
         <p>{description}</p>\n\
         <table>\n\
         <tr><td>Temperature</td><td>{temperature} &deg;C</td></tr>\n\
         <tr><td>Feels like</td><td>{feels_like} &deg;C</td></tr>\n\
         <tr><td>Humidity</td><td>{humidity}%</td></tr>\n\
         <tr><td>Wind speed</td><td>{wind_speed} m/s</td></tr>\n\
         </table>\n\
         </body>\n\
         </html>\n",
        temperature = snapshot.temperature,
        feels_like = snapshot.feels_like,
        humidity = snapshot.humidity,
    );

    RenderedEmail {
        subject: format!("Your Weather Update for {}", city),
        html,
    }
}

// Upper-cases the first character and lower-cases the rest.
fn capitalize(input: &str) -> String {
    let mut chars = input.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
