use {
    order_sync::{
        AppState,
        adapters::{http::router, jeko::JekoClient, twilio::TwilioMessenger},
        config::AppConfig,
        domain::provider::{Messenger, PaymentGateway},
        infra::postgres::{job_repo::PgNotificationQueue, order_repo::PgOrderStore},
        services::{
            notifier::NotificationDispatcher,
            worker::{run_reaper, run_worker},
        },
    },
    sqlx::postgres::PgPoolOptions,
    std::{sync::Arc, time::Duration},
    tokio::{signal, sync::watch},
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    dotenvy::dotenv().ok();
    let config = AppConfig::from_env().expect("invalid configuration");

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .acquire_timeout(Duration::from_secs(3))
        .connect(&config.database_url)
        .await
        .expect("failed to connect to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("failed to run migrations");

    let gateway: Option<Arc<dyn PaymentGateway>> = match config.jeko.clone() {
        Some(credentials) => Some(Arc::new(
            JekoClient::new(credentials).expect("failed to build Jeko client"),
        )),
        None => {
            tracing::warn!("Jeko credentials not configured, payment issuing disabled");
            None
        }
    };
    let messenger: Option<Arc<dyn Messenger>> = match config.twilio.clone() {
        Some(credentials) => Some(Arc::new(
            TwilioMessenger::new(credentials).expect("failed to build Twilio client"),
        )),
        None => {
            tracing::warn!("Twilio credentials not configured, notifications disabled");
            None
        }
    };

    let state = AppState {
        store: Arc::new(PgOrderStore::new(pool.clone())),
        queue: Arc::new(PgNotificationQueue::new(pool)),
        gateway,
        webhook_secret: config.jeko_webhook_secret.clone(),
        public_base_url: config.public_base_url.clone(),
        admin_phones: config.admin_phones.clone().into(),
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let dispatcher = NotificationDispatcher::new(messenger, config.templates.clone());
    let worker = tokio::spawn(run_worker(
        state.queue.clone(),
        state.store.clone(),
        dispatcher,
        shutdown_rx.clone(),
    ));
    let reaper = tokio::spawn(run_reaper(state.queue.clone(), shutdown_rx));

    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .expect("failed to bind listen address");
    tracing::info!("listening on {}", config.listen_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    shutdown_tx.send(true).ok();
    let _ = tokio::join!(worker, reaper);
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
