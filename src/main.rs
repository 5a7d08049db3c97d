// Import from library crate
use storefront::config::Config;
use storefront::services::{MongoCatalog, MongoSaleLedger, StorageOrigin};
use storefront::state::AppState;
use storefront::{db, handlers, security};

use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use dotenv::dotenv;
use std::io;
use std::sync::Arc;

/// Access log without the query string: download links are bearer credentials
const ACCESS_LOG_FORMAT: &str = "%a \"%U\" %s %b %T";

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv().ok();
    env_logger::init();

    if std::env::args().nth(1).as_deref() == Some("generate-secret") {
        println!("{}", security::generate_secret());
        return Ok(());
    }

    let config = Config::from_env().map_err(|e| {
        log::error!("Invalid configuration: {}", e);
        io::Error::new(io::ErrorKind::InvalidInput, e.to_string())
    })?;

    let db = db::init_db(&config).await.map_err(|e| {
        log::error!("Failed to initialize database: {}", e);
        io::Error::other(e)
    })?;

    let ledger = Arc::new(MongoSaleLedger::new(&db));
    let catalog = Arc::new(MongoCatalog::new(&db));
    db::ensure_indexes(&ledger, &catalog)
        .await
        .map_err(io::Error::other)?;

    let origin = Arc::new(StorageOrigin::new(config.asset_root.clone()));
    let state = AppState::new(&config, ledger, catalog, origin);

    log::info!("🚀 Starting server at {}:{}", config.host, config.port);
    log::info!("🔗 Download links valid for {}s", config.link_ttl_secs);
    log::info!("🔒 CORS allowed origins: {:?}", config.cors_origins);

    let origins = config.cors_origins.clone();
    HttpServer::new(move || {
        let mut cors = Cors::default()
            .allowed_methods(vec!["GET", "POST"])
            .allow_any_header()
            .max_age(3600);

        for origin in &origins {
            cors = cors.allowed_origin(origin);
        }

        App::new()
            .wrap(cors)
            .wrap(Logger::new(ACCESS_LOG_FORMAT))
            .app_data(web::Data::new(state.clone()))
            .configure(handlers::configure)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
