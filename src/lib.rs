pub mod app;
pub mod config;
pub mod domain;
pub mod http;
pub mod infra;
pub mod jobs;

use crate::infra::{cache::RedisCache, db::Db};
use crate::jobs::notification_scheduler::DispatchSettings;

#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub cache: RedisCache,
    pub admin_token: Option<String>,
    pub dispatch: DispatchSettings,
}
