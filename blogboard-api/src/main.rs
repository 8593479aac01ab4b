use crate::{config::Env, server::ServerState};
use axum::{http::StatusCode, middleware};
use blogboard_db::client::{DbClient, DbError};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use std::{net::SocketAddr, str::FromStr, sync::Arc};
use thiserror::Error;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod server;

#[derive(Debug, Error)]
enum InitError {
    #[error("Error parsing .env file: {0}")]
    Dotenv(#[from] dotenvy::Error),
    #[error("Error parsing environment: {0}")]
    Envy(#[from] envy::Error),
    #[error("Error connecting to the database: {0}")]
    DatabaseConnect(#[from] sqlx::Error),
    #[error("Error preparing the database: {0}")]
    DatabaseMigrate(#[from] DbError),
    #[error("Error binding tcp listener: {0}")]
    TcpBind(std::io::Error),
    #[error("Error serving server: {0}")]
    TcpServe(std::io::Error),
}

fn install_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "blogboard_api=debug,\
                blogboard_db=debug,\
                tower_http=debug,axum::rejection=trace,sqlx=warn"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn get_env() -> Result<Env, InitError> {
    if let Err(e) = dotenvy::dotenv() {
        if e.not_found() {
            debug!("No .dotenv file found");
        } else {
            return Err(e.into());
        }
    }

    envy::from_env().map_err(InitError::from)
}

async fn connect_database(env: &Env) -> Result<DbClient, InitError> {
    let connect_options = PgConnectOptions::from_str(&env.database_url)?.options([(
        "statement_timeout",
        env.database_statement_timeout_ms.to_string(),
    )]);

    let pool = PgPoolOptions::new()
        .max_connections(env.database_max_connections)
        .acquire_timeout(env.database_acquire_timeout())
        .connect_with(connect_options)
        .await?;

    Ok(DbClient::new(pool))
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "Could not listen for the shutdown signal");
        std::future::pending::<()>().await;
    }

    info!("Shutting down");
}

#[tokio::main]
async fn main() -> Result<(), InitError> {
    install_tracing();
    let env = get_env()?;

    let db_client = connect_database(&env).await?;
    db_client.migrate().await?;
    debug!("Database migrations applied");

    let state = ServerState {
        db_client: Arc::new(db_client),
    };

    let timeout_layer =
        TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, env.request_timeout());
    let tracing_layer = TraceLayer::new_for_http();
    let app = server::routes()
        .with_state(state)
        .layer(timeout_layer)
        .layer(middleware::map_response(server::timeout_response))
        .layer(tracing_layer);

    let server_address = SocketAddr::new(env.server_address, env.server_port);
    let listener = tokio::net::TcpListener::bind(server_address)
        .await
        .map_err(InitError::TcpBind)?;
    info!(%server_address, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(InitError::TcpServe)?;

    Ok(())
}
