use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use std::sync::{Arc, Mutex};

use koha_opac_client::api::{self, AppState};
use koha_opac_client::config::PortalConfig;
use koha_opac_client::history::AttemptLog;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = PortalConfig::load();
    let db_path =
        std::env::var("OPAC_HISTORY_DB").unwrap_or_else(|_| "opac_history.db".to_string());
    let history = AttemptLog::new(&db_path).expect("Failed to open history database");

    let state = web::Data::new(AppState {
        config,
        history: Arc::new(Mutex::new(history)),
    });

    let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = std::env::var("PORT")
        .unwrap_or_else(|_| "8080".to_string())
        .parse::<u16>()
        .expect("PORT must be a valid number");

    log::info!("🚀 Starting Koha OPAC service");
    log::info!("🌐 Server running at http://{}:{}", host, port);
    log::info!("📚 Portal: {}", state.config.base_url);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(state.clone())
            .wrap(middleware::Logger::default())
            .wrap(cors)
            .route("/api/health", web::get().to(api::health_check))
            .route("/api/checkouts", web::post().to(api::checkouts_handler))
            .route("/api/renew", web::post().to(api::renew_handler))
            .route("/api/history", web::get().to(api::history_handler))
            .route("/api/history", web::delete().to(api::clear_history_handler))
    })
    .bind((host.as_str(), port))?
    .run()
    .await
}
