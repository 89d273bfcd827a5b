use anyhow::Result;
use std::fmt;
use time::OffsetDateTime;
use tracing::{debug, error, info, warn};

use crate::app::notifications::channels::Channels;
use crate::app::notifications::schedule::{select_due, SchedulePolicy};
use crate::app::notifications::weather::fetch_snapshots;
use crate::domain::notification::Delivery;
use crate::domain::ports::{SubscriptionStore, WeatherSource};
use crate::domain::subscription::ActiveSubscription;

/// Counts for one dispatch run, meant for logs and operators.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub active: usize,
    pub due: usize,
    pub sent: usize,
    pub failed: usize,
    /// Due subscriptions left untouched because their city had no weather.
    pub without_weather: usize,
}

impl fmt::Display for DispatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.active == 0 {
            return write!(f, "No active subscriptions to notify.");
        }
        write!(
            f,
            "Notification check complete: {} due, {} sent",
            self.due, self.sent
        )?;
        if self.failed > 0 {
            write!(f, ", {} failed", self.failed)?;
        }
        write!(f, ".")
    }
}

pub struct Dispatcher<'a> {
    store: &'a dyn SubscriptionStore,
    weather: &'a dyn WeatherSource,
    channels: Channels<'a>,
    policy: SchedulePolicy,
}

impl<'a> Dispatcher<'a> {
    pub fn new(
        store: &'a dyn SubscriptionStore,
        weather: &'a dyn WeatherSource,
        channels: Channels<'a>,
        policy: SchedulePolicy,
    ) -> Self {
        Self {
            store,
            weather,
            channels,
            policy,
        }
    }

    /// One pass over the active subscriptions. Only a failure to load them
    /// is returned as an error; per-city and per-subscription problems are
    /// logged and counted.
    pub async fn run(&self, now: OffsetDateTime) -> Result<DispatchSummary> {
        let cycle = self.policy.cycle_instant(now);
        let active = self.store.active_subscriptions().await?;
        if active.is_empty() {
            info!("no active subscriptions");
            return Ok(DispatchSummary::default());
        }

        let mut summary = DispatchSummary {
            active: active.len(),
            ..Default::default()
        };
        let due = select_due(self.policy, cycle, active);
        summary.due = due.subscriptions.len();
        if due.is_empty() {
            info!(active = summary.active, "no subscriptions due");
            return Ok(summary);
        }

        info!(
            due = summary.due,
            cities = due.cities.len(),
            policy = ?self.policy,
            "dispatching weather notifications"
        );
        let snapshots = fetch_snapshots(self.weather, &due.cities).await;

        for target in &due.subscriptions {
            let subscription = &target.subscription;
            let Some(snapshot) = snapshots.get(&subscription.city).and_then(Option::as_ref) else {
                debug!(
                    subscription_id = %subscription.id,
                    city = %subscription.city,
                    "no weather for city, leaving subscription for next run"
                );
                summary.without_weather += 1;
                continue;
            };

            let channel = self.channels.route(subscription.notification_method);
            match channel.deliver(target, snapshot).await {
                Ok(Delivery::Sent) => summary.sent += 1,
                Ok(Delivery::Skipped) => {}
                Err(err) => {
                    summary.failed += 1;
                    error!(
                        error = %err,
                        subscription_id = %subscription.id,
                        method = subscription.notification_method.as_db(),
                        "failed to deliver weather notification"
                    );
                }
            }

            self.mark_notified(target, cycle).await;
        }

        info!(
            due = summary.due,
            sent = summary.sent,
            failed = summary.failed,
            without_weather = summary.without_weather,
            "dispatch finished"
        );
        Ok(summary)
    }

    // Runs after every delivery attempt, whatever its outcome.
    async fn mark_notified(&self, target: &ActiveSubscription, at: OffsetDateTime) {
        if let Err(err) = self.store.mark_notified(target.subscription.id, at).await {
            warn!(
                error = ?err,
                subscription_id = %target.subscription.id,
                "failed to record notification time"
            );
        }
    }
}
