use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};

use crate::{
    auth::TokenKeys,
    config::Config,
    mail::{LogMailer, Mailer, SmtpMailer},
    store::{PgStore, SurveyStore},
};

mod auth;
mod config;
mod engine;
mod error;
mod mail;
mod models;
mod routes;
mod store;

#[cfg(test)]
mod testing;

pub(crate) struct AppData {
    store: Arc<dyn SurveyStore>,
    mailer: Arc<dyn Mailer>,
    tokens: TokenKeys,
    public_url: String,
    secure_cookies: bool,
}

#[actix_web::main]
async fn main() {
    // load .env first so RUST_LOG can come from it
    let dotenv_result = dotenvy::dotenv();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    if let Err(e) = dotenv_result {
        log::info!("No .env file loaded: {}", e);
    }
    let config = Config::load().expect("Environment misconfigured");

    let store = PgStore::connect(&config.database_url, config.database_max_connections)
        .await
        .expect("Failed to connect to database");
    store
        .migrate()
        .await
        .expect("Failed to run database migrations");

    let mailer: Arc<dyn Mailer> = match &config.smtp {
        Some(smtp) => Arc::new(SmtpMailer::new(smtp).expect("SMTP misconfigured")),
        None => {
            log::warn!("SMTP_HOST not set, verification codes are written to the log");
            Arc::new(LogMailer)
        }
    };

    let app_data = web::Data::new(AppData {
        store: Arc::new(store),
        mailer,
        tokens: TokenKeys::new(&config.jwt_secret, config.token_ttl),
        public_url: config.public_url.clone(),
        secure_cookies: config.secure_cookies,
    });

    log::info!("Listening on {}:{}", config.bind_address, config.port);
    HttpServer::new(move || {
        App::new()
            .app_data(app_data.clone())
            .app_data(routes::json_config())
            .wrap(middleware::NormalizePath::new(
                middleware::TrailingSlash::Trim,
            ))
            .wrap(middleware::Logger::default())
            .wrap(Cors::permissive())
            .configure(routes::configure)
    })
    .bind((config.bind_address.as_str(), config.port))
    .expect("Failed to bind address")
    .run()
    .await
    .expect("Server stopped unexpectedly")
}
