use crate::domain::ports::NotificationChannel;
use crate::domain::subscription::NotificationMethod;

/// The two delivery channels, one per [`NotificationMethod`].
#[derive(Clone, Copy)]
pub struct Channels<'a> {
    email: &'a dyn NotificationChannel,
    webhook: &'a dyn NotificationChannel,
}

impl<'a> Channels<'a> {
    pub fn new(email: &'a dyn NotificationChannel, webhook: &'a dyn NotificationChannel) -> Self {
        Self { email, webhook }
    }

    pub fn route(&self, method: NotificationMethod) -> &'a dyn NotificationChannel {
        match method {
            NotificationMethod::Email => self.email,
            NotificationMethod::Webhook => self.webhook,
        }
    }
}
