use {
    audit_logs::{
        AppState,
        config::Config,
        domain::{action::ActionRegistry, error::AuditError},
        infra::{
            postgres::{audit_repo::PgAuditStore, identity_repo::PgIdentityProvider},
            search::opensearch::OpenSearchIndex,
        },
        services::{
            audit_service::{AuditLogService, AuditLogServiceParams},
            index_retry::run_index_retry_worker,
            permission::AuditLogPolicy,
            unit_of_work::{DeferredIndexQueue, DualWriteUnitOfWork},
        },
    },
    axum::extract::DefaultBodyLimit,
    sqlx::postgres::PgPoolOptions,
    std::{net::SocketAddr, sync::Arc, time::Duration},
    tokio::{signal, sync::watch},
    tower_http::timeout::TimeoutLayer,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "audit log service failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AuditError> {
    let config = Config::from_env()?;

    let registry = Arc::new(ActionRegistry::from_config(&config.load_actions()?)?);
    tracing::info!(actions = registry.len(), "action registry loaded");

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .acquire_timeout(Duration::from_secs(3))
        .connect(&config.database_url)
        .await?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| AuditError::Config(format!("migrations failed: {e}")))?;

    let index = Arc::new(OpenSearchIndex::new(
        &config.search_url,
        config.search_index.clone(),
        config.search_alias.clone(),
    )?);
    if let Err(e) = index.ensure_index().await {
        // The index is a derived store; keep serving and let writes defer.
        tracing::warn!(error = %e, "could not bootstrap search index");
    }

    let store = Arc::new(PgAuditStore::new(pool.clone()));
    let (deferred, deferred_rx) = DeferredIndexQueue::channel();
    let unit_of_work = DualWriteUnitOfWork::new(store.clone(), index.clone(), deferred);

    let service = AuditLogService::new(AuditLogServiceParams {
        registry,
        store,
        index: index.clone(),
        identities: Arc::new(PgIdentityProvider::new(pool.clone())),
        permissions: Arc::new(AuditLogPolicy::new(config.readers.clone())),
        unit_of_work,
        system_user: config.system_user.clone(),
        mode: config.mode,
    });
    tracing::info!(mode = ?service.mode(), "audit log service ready");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker = tokio::spawn(run_index_retry_worker(
        index,
        deferred_rx,
        config.retry,
        shutdown_rx,
    ));

    let state = AppState {
        service: Arc::new(service),
    };
    let app = audit_logs::adapters::http::router(state)
        .layer(DefaultBodyLimit::max(64 * 1024))
        .layer(TimeoutLayer::new(Duration::from_secs(10)));

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .map_err(|e| AuditError::Config(format!("binding {}: {e}", config.bind_addr)))?;
    tracing::info!("listening on {}", config.bind_addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(|e| AuditError::Config(format!("server error: {e}")))?;

    let _ = shutdown_tx.send(true);
    if let Err(e) = worker.await {
        tracing::error!(error = %e, "index retry worker panicked");
    }
    pool.close().await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to listen for ctrl+c");
    };

    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to listen for SIGTERM")
            .recv()
            .await;
    };

    tokio::select! {
        _ = ctrl_c => tracing::info!("received ctrl+c, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
