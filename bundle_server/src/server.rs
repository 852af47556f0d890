use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, App, HttpServer};
use bundle_engine::{FulfillmentApi, SqliteDatabase};
use bundle_provider::ProviderApi;
use log::*;

use crate::{
    config::ServerConfig,
    errors::ServerError,
    hooks::create_activity_event_handlers,
    routes::health,
    workers::{start_queue_worker, start_reconciliation_worker},
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.run_migrations().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let provider =
        ProviderApi::new(config.provider.clone()).map_err(|e| ServerError::ConfigurationError(e.to_string()))?;
    if config.skip_preflight {
        warn!("🚀️ Skipping the provider preflight check. BUNDLE_SKIP_PREFLIGHT is set");
    } else {
        preflight_check(&provider).await;
    }
    let handlers = create_activity_event_handlers(db.clone());
    let producers = handlers.producers();
    handlers.start_handlers().await;
    let api = FulfillmentApi::new(db, provider, producers).with_policy(config.policy);
    info!("🚀️ Fulfillment policy: {:?}", api.policy());
    let _queue_worker = start_queue_worker(api.clone(), config.workers);
    let _reconciliation_worker = start_reconciliation_worker(api, config.workers);
    let srv = create_server_instance(&config)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

/// Logs the provider balance. A failure is only a warning: the workers retry on their own once the provider is back.
pub async fn preflight_check(provider: &ProviderApi) {
    match provider.check_balance().await {
        Ok(balance) => {
            info!("🚀️ Provider is reachable. Wallet balance: {:.2} {}", balance.balance, balance.currency)
        },
        Err(e) => warn!("🚀️ Provider preflight check failed. Orders will be retried once it is reachable. {e}"),
    }
}

pub fn create_server_instance(config: &ServerConfig) -> Result<Server, ServerError> {
    let srv = HttpServer::new(move || {
        App::new().wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("bundle::access_log")).service(health)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}
