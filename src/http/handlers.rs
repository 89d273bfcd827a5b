use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app::subscriptions::SubscriptionService;
use crate::app::users::UserService;
use crate::domain::subscription::{NewSubscription, Subscription, SubscriptionChanges};
use crate::domain::user::User;
use crate::http::{AdminToken, AppError, AuthUser};
use crate::jobs::notification_scheduler;
use crate::AppState;

const MAX_EMAIL_LEN: usize = 254;

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
}

pub(crate) async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let db = state.db.ping().await.is_ok();
    let redis = state.cache.ping().await.is_ok();
    let status = if db && redis { "ok" } else { "degraded" };

    Json(HealthResponse { status })
}

#[derive(Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
}

pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let email = payload.email.trim();
    if email.is_empty() {
        return Err(AppError::bad_request("email is required"));
    }
    if email.len() > MAX_EMAIL_LEN || !email.contains('@') {
        return Err(AppError::bad_request("email is invalid"));
    }

    let service = UserService::new(state.db.clone());
    let user = service.create_user(email).await.map_err(|err| {
        if db_error_code(&err).as_deref() == Some("23505") {
            return AppError::conflict("Email already taken");
        }
        tracing::error!(error = ?err, "failed to create user");
        AppError::internal("failed to create user")
    })?;

    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn get_current_user(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<User>, AppError> {
    let service = UserService::new(state.db.clone());
    let user = service.get_user(auth.user_id).await.map_err(|err| {
        tracing::error!(error = ?err, "failed to load user");
        AppError::internal("failed to load user")
    })?;

    user.map(Json)
        .ok_or_else(|| AppError::not_found("user not found"))
}

#[derive(Deserialize)]
pub struct CreateSubscriptionRequest {
    pub city: String,
    pub notification_period: i64,
    pub notification_method: String,
    pub webhook_url: Option<String>,
}

#[derive(Serialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
}

pub async fn list_subscriptions(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<ListResponse<Subscription>>, AppError> {
    let service = SubscriptionService::new(state.db.clone());
    let items = service.list_for_user(auth.user_id).await.map_err(|err| {
        tracing::error!(error = ?err, "failed to list subscriptions");
        AppError::internal("failed to list subscriptions")
    })?;

    Ok(Json(ListResponse { items }))
}

pub async fn create_subscription(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateSubscriptionRequest>,
) -> Result<(StatusCode, Json<Subscription>), AppError> {
    let input = NewSubscription::parse(
        &payload.city,
        payload.notification_period,
        &payload.notification_method,
        payload.webhook_url.as_deref(),
    )?;

    let service = SubscriptionService::new(state.db.clone());
    let subscription = service
        .create(auth.user_id, input)
        .await
        .map_err(|err| subscription_write_error(err, "failed to create subscription"))?;

    Ok((StatusCode::CREATED, Json(subscription)))
}

pub async fn get_subscription(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Subscription>, AppError> {
    let service = SubscriptionService::new(state.db.clone());
    let subscription = service.get(auth.user_id, id).await.map_err(|err| {
        tracing::error!(error = ?err, "failed to load subscription");
        AppError::internal("failed to load subscription")
    })?;

    subscription
        .map(Json)
        .ok_or_else(|| AppError::not_found("subscription not found"))
}

pub async fn update_subscription(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
    Json(changes): Json<SubscriptionChanges>,
) -> Result<Json<Subscription>, AppError> {
    let service = SubscriptionService::new(state.db.clone());
    let current = service
        .get(auth.user_id, id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to load subscription");
            AppError::internal("failed to load subscription")
        })?
        .ok_or_else(|| AppError::not_found("subscription not found"))?;

    let input = changes.apply_to(&current)?;
    let updated = service
        .update(auth.user_id, id, input)
        .await
        .map_err(|err| subscription_write_error(err, "failed to update subscription"))?;

    updated
        .map(Json)
        .ok_or_else(|| AppError::not_found("subscription not found"))
}

pub async fn delete_subscription(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    let service = SubscriptionService::new(state.db.clone());
    let deleted = service.delete(auth.user_id, id).await.map_err(|err| {
        tracing::error!(error = ?err, "failed to delete subscription");
        AppError::internal("failed to delete subscription")
    })?;

    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("subscription not found"))
    }
}

#[derive(Serialize)]
pub struct RunNotificationsResponse {
    pub status: String,
}

pub async fn run_notifications(
    _admin: AdminToken,
    State(state): State<AppState>,
) -> Result<Json<RunNotificationsResponse>, AppError> {
    let status = notification_scheduler::run_once(&state.db, &state.cache, &state.dispatch)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "manual notification run failed");
            AppError::internal("notification run failed")
        })?;

    tracing::info!(status = %status, "manual notification run finished");
    Ok(Json(RunNotificationsResponse { status }))
}

fn subscription_write_error(err: anyhow::Error, context: &'static str) -> AppError {
    match db_error_code(&err).as_deref() {
        Some("23505") => AppError::conflict("an active subscription for this city already exists"),
        Some("23503") => AppError::unauthorized("unknown user"),
        _ => {
            tracing::error!(error = ?err, "{}", context);
            AppError::internal(context)
        }
    }
}

fn db_error_code(err: &anyhow::Error) -> Option<String> {
    let sqlx_err = err.downcast_ref::<sqlx::Error>()?;
    let db_err = sqlx_err.as_database_error()?;
    db_err.code().map(|code| code.into_owned())
}
