use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use std::io;
use std::sync::Arc;

use taskmanager::config::{Config, StorageBackend};
use taskmanager::routes;
use taskmanager::store::{MemoryStore, PgStore, Store};
use taskmanager::AppState;

async fn open_store(config: &Config) -> io::Result<Arc<dyn Store>> {
    match config.storage {
        StorageBackend::Memory => {
            log::warn!("using in-memory storage; data is lost on shutdown");
            Ok(Arc::new(MemoryStore::new()))
        }
        StorageBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "DATABASE_URL must be set"))?;
            let store = PgStore::connect(url, config.db_max_connections, config.store_timeout)
                .await
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
            store
                .migrate()
                .await
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
            log::info!("connected to PostgreSQL, schema ready");
            Ok(Arc::new(store))
        }
    }
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::from_env()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;
    let store = open_store(&config).await?;
    let state = web::Data::new(AppState::from_config(store, &config));
    let limits = state.limits;

    log::info!("starting taskmanager at {}", config.server_url());
    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .wrap(Logger::default())
            .configure(|cfg| routes::config_with(cfg, &limits))
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .run()
    .await
}
