use anyhow::anyhow;
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use skycast::config::AppConfig;
use skycast::infra::{cache::RedisCache, db::Db};
use skycast::jobs::notification_scheduler::{self, DispatchSettings};
use skycast::{http, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;

    let db = Db::connect(&config).await?;
    let cache = RedisCache::connect(&config.redis_url).await?;

    let state = AppState {
        db,
        cache,
        admin_token: config.admin_token.clone(),
        dispatch: DispatchSettings::from_config(&config),
    };

    match config.app_mode.as_str() {
        "api" => {
            let app: Router = http::router(state).layer(TraceLayer::new_for_http());
            let listener = tokio::net::TcpListener::bind(&config.http_addr).await?;
            tracing::info!("listening on {}", config.http_addr);

            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;
        }
        "worker" => {
            tracing::info!("starting worker mode");
            if config.weather_api_key.is_none() {
                tracing::warn!("OPENWEATHERMAP_API_KEY is not set, every run will fail");
            }
            tokio::select! {
                result = notification_scheduler::run(state.db.clone(), state.cache.clone(), state.dispatch.clone()) => {
                    result?;
                }
                _ = shutdown_signal() => {}
            }
        }
        other => return Err(anyhow!("unknown APP_MODE: {}", other)),
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
