// region:    --- Imports
use auction_marketplace::config::Config;
use auction_marketplace::database::{DatabaseManager, PostgresStore};
use auction_marketplace::handlers;
use auction_marketplace::message_broker::{KafkaEventPublisher, KafkaManager};
use auction_marketplace::state::AppState;
use auction_marketplace::users::commands::ensure_bootstrap_rep;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};
// endregion: --- Imports

// region:    --- Main
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .without_time()
        .with_target(false)
        .init();

    let config = Config::from_env()?;

    let db_manager = DatabaseManager::new(&config).await?;
    if let Err(e) = db_manager.initialize_database().await {
        error!("{:<12} --> Database initialization failed: {:?}", "Main", e);
        return Err(e.into());
    }
    info!("{:<12} --> Database ready", "Main");

    let kafka_manager = KafkaManager::new(&config.kafka_brokers)?;
    if let Err(e) = kafka_manager
        .create_topic(&config.events_topic, config.events_partitions, 1)
        .await
    {
        error!("{:<12} --> Kafka initialization failed: {:?}", "Main", e);
        return Err(e.into());
    }
    info!("{:<12} --> Kafka ready", "Main");

    let state = AppState::new(
        Arc::new(PostgresStore::new(db_manager.get_pool())),
        Arc::new(KafkaEventPublisher::new(
            kafka_manager.get_producer(),
            config.events_topic.clone(),
        )),
    )
    .with_max_bid_retries(config.max_bid_retries);

    if let Some(rep) = &config.bootstrap_rep {
        ensure_bootstrap_rep(&state, &rep.username, &rep.email, &rep.password).await?;
        info!("{:<12} --> Rep account ready: {}", "Main", rep.username);
    }

    let routes_all = handlers::routes(state);

    let listener = TcpListener::bind(&config.listen_addr).await?;
    info!(
        "{:<12} --> Web Server: Listening on {}",
        "Main",
        listener.local_addr()?
    );

    if let Err(err) = axum::serve(listener, routes_all.into_make_service()).await {
        error!("{:<12} --> Server error: {}", "Main", err);
    }
    Ok(())
}
// endregion: --- Main
