use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;

use gondola_api::app::{build_app, services};
use gondola_api::config::ApiConfig;
use gondola_auth::{
    AccountDirectory, InMemoryAccountDirectory, InMemoryOrganizationDirectory,
    OrganizationDirectory,
};
use gondola_infra::{PostgresAccountDirectory, PostgresOrganizationDirectory};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ApiConfig::from_env().context("invalid configuration")?;
    gondola_observability::init_with(config.log_format);

    if config.auth.uses_dev_secret() {
        tracing::warn!("JWT_SECRET not set; using insecure dev default");
    }

    let (accounts, organizations): (Arc<dyn AccountDirectory>, Arc<dyn OrganizationDirectory>) =
        match &config.database_url {
            Some(url) => {
                let pool = gondola_infra::connect(url)
                    .await
                    .context("failed to connect to DATABASE_URL")?;
                gondola_infra::ensure_schema(&pool)
                    .await
                    .context("failed to apply schema")?;
                tracing::info!("using postgres directories");
                (
                    Arc::new(PostgresAccountDirectory::new(pool.clone())),
                    Arc::new(PostgresOrganizationDirectory::new(pool)),
                )
            }
            None => {
                tracing::info!("DATABASE_URL not set; using in-memory directories");
                (
                    Arc::new(InMemoryAccountDirectory::new()),
                    Arc::new(InMemoryOrganizationDirectory::new()),
                )
            }
        };

    if let Some(admin) = &config.bootstrap_admin {
        match services::seed_admin(accounts.as_ref(), organizations.as_ref(), admin, Utc::now())
            .await
            .context("failed to seed bootstrap admin")?
        {
            Some(summary) => tracing::info!(
                account_id = %summary.id,
                organization_id = %summary.organization_id,
                "bootstrap admin created"
            ),
            None => tracing::info!("bootstrap admin already exists"),
        }
    }

    let services = services::build_services(&config.auth, accounts, organizations, config.request_timeout)
        .context("failed to build services")?;
    let app = build_app(services);

    let listener = tokio::net::TcpListener::bind(config.server_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.server_addr))?;

    tracing::info!(addr = %listener.local_addr()?, env = ?config.env, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
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
