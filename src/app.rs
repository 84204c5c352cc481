/*
 * Responsibility
 * - Config読み込み → 依存生成 (PgPool / AuthService / AuthorizationGuard / TaskStore) → Router 組み立て
 * - Middleware の適用 (認証 / security headers / request-id / timeout など)
 * - axum::serve() で起動 (Ctrl+C で graceful shutdown)
 */
use std::{panic, process, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    api,
    config::Config,
    middleware,
    repos::task_repo::PgTaskStore,
    services::auth::{AuthorizationGuard, build_auth_service},
    state::AppState,
};

fn init_tracing() {
    // Prefer RUST_LOG if set; otherwise use a sensible default.
    // Ex:
    // RUST_LOG=info,tasks_api=debug,tower_http=debug cargo run
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook(abort_on_panic: bool) {
    // Keep the default hook as a fallback (prints to stderr with location/payload).
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        // Always surface panics via tracing so they don't get "lost".
        tracing::error!(%info, "panic");

        // abort すると認証中の panic も Anonymous に落とせずプロセスごと落ちる
        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

pub async fn run() -> Result<()> {
    init_tracing();
    let config = Config::from_env().context("failed to load configuration")?;
    init_panic_hook(config.abort_on_panic);

    tracing::info!(
        "starting API in {:?} mode on {}",
        config.app_env,
        config.addr
    );

    let db = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&config.database_url)
        .await
        .context("failed to connect to database")?;

    let state = build_state(&config, db)?;
    let app = build_router(state, config.request_timeout);

    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

fn build_state(config: &Config, db: sqlx::PgPool) -> Result<AppState> {
    // 弱い secret はここで起動失敗にする
    let auth = build_auth_service(config, db.clone()).context("invalid token configuration")?;
    let guard = AuthorizationGuard::new(config.authz_denial);

    tracing::info!(
        token_lifetime_ms = auth.codec().lifetime().num_milliseconds(),
        admin_role = auth.resolver().role_mapping().admin_role(),
        denial = ?guard.denial_policy(),
        "auth configured"
    );

    Ok(AppState::new(auth, guard, Arc::new(PgTaskStore::new(db))))
}

fn build_router(state: AppState, request_timeout: Duration) -> Router {
    // 認証は v1 全体に掛ける。匿名でも通過し、保護 route だけ extractor が 401 を返す
    let v1 = middleware::auth::apply(api::v1::routes(), Arc::clone(&state.auth));

    let router = Router::new().nest("/api/v1", v1).with_state(state);

    let router = middleware::security_headers::apply(router);
    middleware::http::apply(router, request_timeout)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        return;
    }
    tracing::info!("shutdown signal received");
}
