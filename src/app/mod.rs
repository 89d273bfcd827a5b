pub mod notifications;
pub mod subscriptions;
pub mod users;
