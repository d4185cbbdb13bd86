mod api;
mod config;
mod database;
mod middleware;
mod models;
mod services;
mod state;
mod utils;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::{AppConfig, StorageBackend};
use crate::database::{MemoryStore, Store};
use crate::state::AppState;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = AppConfig::from_env().map_err(|e| {
        log::error!("❌ Invalid configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e)
    })?;

    log::info!("🚀 Starting Coworking Booking Service...");
    log::debug!("⚙️  {:?}", config);

    let store: Arc<dyn Store> = match (config.storage, config.database_url.as_deref()) {
        (StorageBackend::MongoDB, Some(url)) => {
            let db = database::MongoDB::new(url).await.map_err(|e| {
                log::error!("❌ Failed to connect to MongoDB: {}", e);
                std::io::Error::new(std::io::ErrorKind::ConnectionRefused, e.to_string())
            })?;
            log::info!("✅ MongoDB connected successfully");
            Arc::new(db)
        }
        (StorageBackend::MongoDB, None) => {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "DATABASE_URL must be set",
            ));
        }
        (StorageBackend::Memory, _) => {
            log::warn!("⚠️  Using in-memory store, data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let bind = (config.host.clone(), config.port);
    let cors_origins = config.cors_origins.clone();
    let state = web::Data::new(AppState::new(store, config));

    log::info!("🌐 Server starting on {}:{}", bind.0, bind.1);
    log::info!("📚 Swagger UI available at: http://{}:{}/swagger-ui/", bind.0, bind.1);
    log::info!("📄 OpenAPI spec at: http://{}:{}/api-docs/openapi.json", bind.0, bind.1);

    HttpServer::new(move || {
        let cors = cors_origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .allowed_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                actix_web::http::header::AUTHORIZATION,
                actix_web::http::header::CONTENT_TYPE,
                actix_web::http::header::ACCEPT,
            ])
            .expose_headers(vec![actix_web::http::header::CONTENT_TYPE])
            .max_age(3600);

        let openapi = api::swagger::ApiDoc::openapi();

        App::new()
            .app_data(state.clone())
            .wrap(cors)
            .wrap(middleware::SecurityHeaders)
            .wrap(Logger::default())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", openapi)
            )
            .route("/health", web::get().to(api::health::health_check))
            .configure(api::configure)
    })
    .bind(bind)?
    .run()
    .await
}
