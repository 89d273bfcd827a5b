/// What a channel did with a notification it was handed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    /// Nothing to deliver to, e.g. a webhook subscription without a URL.
    Skipped,
}

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("endpoint responded with status {0}")]
    Status(u16),
}
