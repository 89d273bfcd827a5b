//! Periodic weather notifications: pick the subscriptions that are due,
//! fetch weather once per city and hand each subscription to its channel.

pub mod channels;
pub mod dispatcher;
pub mod schedule;
pub mod weather;

pub use channels::Channels;
pub use dispatcher::{DispatchSummary, Dispatcher};
pub use schedule::SchedulePolicy;
