use anyhow::{anyhow, Result};
use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::Row;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::ports::SubscriptionStore;
use crate::domain::subscription::{
    ActiveSubscription, NewSubscription, NotificationMethod, NotificationPeriod, Subscription,
};
use crate::infra::db::Db;

const SUBSCRIPTION_COLUMNS: &str = "s.id, s.user_id, s.city, s.notification_period, \
     s.notification_method::text AS notification_method, s.webhook_url, s.is_active, \
     s.last_notified_at, s.created_at, s.updated_at";

#[derive(Clone)]
pub struct SubscriptionService {
    db: Db,
}

impl SubscriptionService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn create(&self, user_id: Uuid, input: NewSubscription) -> Result<Subscription> {
        let row = sqlx::query(&format!(
            "WITH s AS ( \
                INSERT INTO subscriptions \
                    (id, user_id, city, notification_period, notification_method, webhook_url, is_active) \
                VALUES ($1, $2, $3, $4, $5::notification_method, $6, $7) \
                RETURNING * \
             ) \
             SELECT {SUBSCRIPTION_COLUMNS} FROM s"
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(&input.city)
        .bind(i16::from(input.notification_period.hours()))
        .bind(input.notification_method.as_db())
        .bind(&input.webhook_url)
        .bind(input.is_active)
        .fetch_one(self.db.pool())
        .await?;

        subscription_from_row(&row)
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Subscription>> {
        let rows = sqlx::query(&format!(
            "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions s \
             WHERE s.user_id = $1 \
             ORDER BY s.created_at DESC, s.id DESC"
        ))
        .bind(user_id)
        .fetch_all(self.db.pool())
        .await?;

        rows.iter().map(subscription_from_row).collect()
    }

    pub async fn get(&self, user_id: Uuid, subscription_id: Uuid) -> Result<Option<Subscription>> {
        let row = sqlx::query(&format!(
            "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions s \
             WHERE s.id = $1 AND s.user_id = $2"
        ))
        .bind(subscription_id)
        .bind(user_id)
        .fetch_optional(self.db.pool())
        .await?;

        row.as_ref().map(subscription_from_row).transpose()
    }

    /// Overwrites the user-editable fields. `last_notified_at` is left alone.
    pub async fn update(
        &self,
        user_id: Uuid,
        subscription_id: Uuid,
        input: NewSubscription,
    ) -> Result<Option<Subscription>> {
        let row = sqlx::query(&format!(
            "WITH s AS ( \
                UPDATE subscriptions \
                SET city = $3, \
                    notification_period = $4, \
                    notification_method = $5::notification_method, \
                    webhook_url = $6, \
                    is_active = $7, \
                    updated_at = now() \
                WHERE id = $1 AND user_id = $2 \
                RETURNING * \
             ) \
             SELECT {SUBSCRIPTION_COLUMNS} FROM s"
        ))
        .bind(subscription_id)
        .bind(user_id)
        .bind(&input.city)
        .bind(i16::from(input.notification_period.hours()))
        .bind(input.notification_method.as_db())
        .bind(&input.webhook_url)
        .bind(input.is_active)
        .fetch_optional(self.db.pool())
        .await?;

        row.as_ref().map(subscription_from_row).transpose()
    }

    pub async fn delete(&self, user_id: Uuid, subscription_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM subscriptions WHERE id = $1 AND user_id = $2")
            .bind(subscription_id)
            .bind(user_id)
            .execute(self.db.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl SubscriptionStore for SubscriptionService {
    async fn active_subscriptions(&self) -> Result<Vec<ActiveSubscription>> {
        let rows = sqlx::query(&format!(
            "SELECT {SUBSCRIPTION_COLUMNS}, u.email AS owner_email \
             FROM subscriptions s \
             JOIN users u ON u.id = s.user_id \
             WHERE s.is_active \
             ORDER BY s.city, s.id"
        ))
        .fetch_all(self.db.pool())
        .await?;

        let mut active = Vec::with_capacity(rows.len());
        for row in rows {
            active.push(ActiveSubscription {
                subscription: subscription_from_row(&row)?,
                owner_email: row.get("owner_email"),
            });
        }
        Ok(active)
    }

    async fn mark_notified(&self, subscription_id: Uuid, at: OffsetDateTime) -> Result<()> {
        sqlx::query("UPDATE subscriptions SET last_notified_at = $2 WHERE id = $1")
            .bind(subscription_id)
            .bind(at)
            .execute(self.db.pool())
            .await?;
        Ok(())
    }
}

fn subscription_from_row(row: &PgRow) -> Result<Subscription> {
    let period: i16 = row.get("notification_period");
    let notification_period = NotificationPeriod::from_hours(i64::from(period))
        .ok_or_else(|| anyhow!("unknown notification period: {}", period))?;

    let method: String = row.get("notification_method");
    let notification_method = NotificationMethod::from_db(&method)
        .ok_or_else(|| anyhow!("unknown notification method: {}", method))?;

    Ok(Subscription {
        id: row.get("id"),
        user_id: row.get("user_id"),
        city: row.get("city"),
        notification_period,
        notification_method,
        webhook_url: row.get("webhook_url"),
        is_active: row.get("is_active"),
        last_notified_at: row.get("last_notified_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}
