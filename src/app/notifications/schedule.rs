use std::collections::BTreeSet;
use time::{Duration, OffsetDateTime, Time, UtcOffset};

use crate::domain::subscription::{ActiveSubscription, NotificationPeriod, Subscription};

/// A subscription notified this recently is not due again in hourly mode.
pub const RECENT_WINDOW: Duration = Duration::hours(1);
/// Minimum gap between two notifications in accelerated mode.
pub const ACCELERATED_GAP: Duration = Duration::minutes(14);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulePolicy {
    /// Due on UTC hours divisible by the subscription period.
    Hourly,
    /// Due every 14 minutes regardless of period, for exercising the
    /// pipeline on a short timeline.
    Accelerated,
}

impl SchedulePolicy {
    pub fn from_accelerated_flag(accelerated: bool) -> Self {
        if accelerated {
            Self::Accelerated
        } else {
            Self::Hourly
        }
    }

    /// The instant a run is evaluated and recorded at. Hourly runs are pinned
    /// to the top of their UTC hour so that every run in the same hour shares
    /// one cycle.
    pub fn cycle_instant(self, now: OffsetDateTime) -> OffsetDateTime {
        let now = now.to_offset(UtcOffset::UTC);
        match self {
            Self::Hourly => {
                now.replace_time(Time::MIDNIGHT) + Duration::hours(i64::from(now.hour()))
            }
            Self::Accelerated => now,
        }
    }

    pub fn is_due(self, subscription: &Subscription, now: OffsetDateTime) -> bool {
        match self {
            Self::Hourly => {
                let hour = now.to_offset(UtcOffset::UTC).hour();
                is_on_schedule(subscription.notification_period, hour)
                    && !notified_within(subscription.last_notified_at, now, RECENT_WINDOW)
            }
            Self::Accelerated => match subscription.last_notified_at {
                None => true,
                Some(last) => now - last >= ACCELERATED_GAP,
            },
        }
    }
}

pub fn is_on_schedule(period: NotificationPeriod, hour: u8) -> bool {
    hour % period.hours() == 0
}

fn notified_within(
    last_notified_at: Option<OffsetDateTime>,
    now: OffsetDateTime,
    window: Duration,
) -> bool {
    match last_notified_at {
        Some(last) => last > now - window,
        None => false,
    }
}

#[derive(Debug, Default)]
pub struct DueSet {
    pub subscriptions: Vec<ActiveSubscription>,
    pub cities: BTreeSet<String>,
}

impl DueSet {
    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }
}

pub fn select_due(
    policy: SchedulePolicy,
    now: OffsetDateTime,
    active: Vec<ActiveSubscription>,
) -> DueSet {
    let subscriptions: Vec<_> = active
        .into_iter()
        .filter(|target| policy.is_due(&target.subscription, now))
        .collect();
    let cities = subscriptions
        .iter()
        .map(|target| target.subscription.city.clone())
        .collect();

    DueSet {
        subscriptions,
        cities,
    }
}
