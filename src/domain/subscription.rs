use serde::{Deserialize, Serialize};
use std::fmt;
use time::OffsetDateTime;
use url::Url;
use uuid::Uuid;

pub const MAX_CITY_LEN: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub city: String,
    pub notification_period: NotificationPeriod,
    pub notification_method: NotificationMethod,
    pub webhook_url: Option<String>,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_notified_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// An active subscription joined with the address of its owner, as the
/// dispatcher sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveSubscription {
    pub subscription: Subscription,
    pub owner_email: String,
}

impl fmt::Display for ActiveSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {} ({})",
            self.owner_email, self.subscription.city, self.subscription.notification_period
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationMethod {
    Email,
    Webhook,
}

impl NotificationMethod {
    /// Case-insensitive, so `"EMAIL"` and `"Email"` both map to `Email`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "email" => Some(Self::Email),
            "webhook" => Some(Self::Webhook),
            _ => None,
        }
    }

    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "email" => Some(Self::Email),
            "webhook" => Some(Self::Webhook),
            _ => None,
        }
    }

    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Webhook => "webhook",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum NotificationPeriod {
    OneHour,
    ThreeHours,
    SixHours,
    TwelveHours,
}

impl NotificationPeriod {
    pub const ALL: [NotificationPeriod; 4] = [
        Self::OneHour,
        Self::ThreeHours,
        Self::SixHours,
        Self::TwelveHours,
    ];

    pub fn from_hours(hours: i64) -> Option<Self> {
        match hours {
            1 => Some(Self::OneHour),
            3 => Some(Self::ThreeHours),
            6 => Some(Self::SixHours),
            12 => Some(Self::TwelveHours),
            _ => None,
        }
    }

    pub fn hours(&self) -> u8 {
        match self {
            Self::OneHour => 1,
            Self::ThreeHours => 3,
            Self::SixHours => 6,
            Self::TwelveHours => 12,
        }
    }
}

impl TryFrom<i64> for NotificationPeriod {
    type Error = SubscriptionError;

    fn try_from(hours: i64) -> Result<Self, Self::Error> {
        Self::from_hours(hours).ok_or(SubscriptionError::InvalidPeriod(hours))
    }
}

impl From<NotificationPeriod> for i64 {
    fn from(period: NotificationPeriod) -> Self {
        i64::from(period.hours())
    }
}

impl fmt::Display for NotificationPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.hours() {
            1 => write!(f, "1 Hour"),
            hours => write!(f, "{} Hours", hours),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubscriptionError {
    #[error("city cannot be empty")]
    EmptyCity,
    #[error("city must be at most {MAX_CITY_LEN} characters")]
    CityTooLong,
    #[error("notification_period must be one of 1, 3, 6, 12 (got {0})")]
    InvalidPeriod(i64),
    #[error("notification_method must be one of email, webhook (got {0:?})")]
    InvalidMethod(String),
    #[error("webhook_url is required for the webhook notification method")]
    MissingWebhookUrl,
    #[error("webhook_url must be an http or https URL")]
    InvalidWebhookUrl,
}

/// Validated fields of a subscription, ready to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSubscription {
    pub city: String,
    pub notification_period: NotificationPeriod,
    pub notification_method: NotificationMethod,
    pub webhook_url: Option<String>,
    pub is_active: bool,
}

impl NewSubscription {
    pub fn parse(
        city: &str,
        notification_period: i64,
        notification_method: &str,
        webhook_url: Option<&str>,
    ) -> Result<Self, SubscriptionError> {
        let notification_method = NotificationMethod::parse(notification_method)
            .ok_or_else(|| SubscriptionError::InvalidMethod(notification_method.to_string()))?;

        Self::build(
            city,
            NotificationPeriod::try_from(notification_period)?,
            notification_method,
            webhook_url,
            true,
        )
    }

    fn build(
        city: &str,
        notification_period: NotificationPeriod,
        notification_method: NotificationMethod,
        webhook_url: Option<&str>,
        is_active: bool,
    ) -> Result<Self, SubscriptionError> {
        let city = normalize_city(city)?;
        let webhook_url = match notification_method {
            NotificationMethod::Email => None,
            NotificationMethod::Webhook => Some(validate_webhook_url(webhook_url)?),
        };

        Ok(Self {
            city,
            notification_period,
            notification_method,
            webhook_url,
            is_active,
        })
    }
}

/// Partial update sent by the owner. Fields left as `None` keep their
/// stored value; the merged result is validated as a whole.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SubscriptionChanges {
    pub city: Option<String>,
    pub notification_period: Option<i64>,
    pub notification_method: Option<String>,
    pub webhook_url: Option<String>,
    pub is_active: Option<bool>,
}

impl SubscriptionChanges {
    pub fn apply_to(&self, current: &Subscription) -> Result<NewSubscription, SubscriptionError> {
        let notification_period = match self.notification_period {
            Some(hours) => NotificationPeriod::try_from(hours)?,
            None => current.notification_period,
        };
        let notification_method = match &self.notification_method {
            Some(method) => NotificationMethod::parse(method)
                .ok_or_else(|| SubscriptionError::InvalidMethod(method.clone()))?,
            None => current.notification_method,
        };
        let webhook_url = self
            .webhook_url
            .as_deref()
            .or(current.webhook_url.as_deref());

        NewSubscription::build(
            self.city.as_deref().unwrap_or(&current.city),
            notification_period,
            notification_method,
            webhook_url,
            self.is_active.unwrap_or(current.is_active),
        )
    }
}

/// Trims surrounding whitespace and title-cases each word:
/// `"  nEw yOrK "` becomes `"New York"`.
pub fn normalize_city(city: &str) -> Result<String, SubscriptionError> {
    let trimmed = city.trim();
    if trimmed.is_empty() {
        return Err(SubscriptionError::EmptyCity);
    }

    let mut normalized = String::with_capacity(trimmed.len());
    let mut previous_is_alpha = false;
    for ch in trimmed.chars() {
        if ch.is_alphabetic() {
            if previous_is_alpha {
                normalized.extend(ch.to_lowercase());
            } else {
                push_titlecase(&mut normalized, ch);
            }
            previous_is_alpha = true;
        } else {
            normalized.push(ch);
            previous_is_alpha = false;
        }
    }

    if normalized.chars().count() > MAX_CITY_LEN {
        return Err(SubscriptionError::CityTooLong);
    }
    Ok(normalized)
}

// Titlecase rather than uppercase: the Latin digraphs have their own
// titlecase letter, and an uppercase expansion ("ß" to "SS") keeps only its
// first character capital.
fn push_titlecase(out: &mut String, ch: char) {
    let digraph = match ch {
        '\u{01C4}'..='\u{01C6}' => Some('\u{01C5}'),
        '\u{01C7}'..='\u{01C9}' => Some('\u{01C8}'),
        '\u{01CA}'..='\u{01CC}' => Some('\u{01CB}'),
        '\u{01F1}'..='\u{01F3}' => Some('\u{01F2}'),
        _ => None,
    };
    if let Some(titled) = digraph {
        out.push(titled);
        return;
    }

    let mut upper = ch.to_uppercase();
    if let Some(first) = upper.next() {
        out.push(first);
    }
    out.extend(upper.flat_map(char::to_lowercase));
}

fn validate_webhook_url(webhook_url: Option<&str>) -> Result<String, SubscriptionError> {
    let webhook_url = webhook_url
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or(SubscriptionError::MissingWebhookUrl)?;

    let parsed = Url::parse(webhook_url).map_err(|_| SubscriptionError::InvalidWebhookUrl)?;
    match parsed.scheme() {
        "http" | "https" => Ok(webhook_url.to_string()),
        _ => Err(SubscriptionError::InvalidWebhookUrl),
    }
}
