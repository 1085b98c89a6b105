mod config;
mod db;
mod error;
mod middleware;
mod models;
mod routes;
mod services;
mod utils;

use actix_web::{web, App, HttpServer};

use crate::config::AppConfig;
use crate::services::mailer::Mailer;
use crate::services::market_data::MarketDataService;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    let config = AppConfig::from_env();

    let store = if config.mock_mode() {
        println!("⚠️  DATABASE_URL not set, running in mock mode");
        println!("⚠️  All data lives in memory and is lost on restart");
        db::connect(&config)
            .await
            .expect("Failed to build mock store")
    } else {
        println!("🔌 Connecting to database...");
        let store = db::connect(&config)
            .await
            .expect("Failed to connect to database");
        println!("✅ Database connected!");
        store
    };

    let market = MarketDataService::new(&config);
    let mailer = Mailer::from_config(&config);

    println!("🚀 Starting server on http://{}:{}", config.host, config.port);

    let bind_addr = (config.host.clone(), config.port);
    let store = web::Data::new(store);
    let market = web::Data::new(market);
    let mailer = web::Data::new(mailer);
    let config = web::Data::new(config);

    HttpServer::new(move || {
        App::new()
            .app_data(store.clone())
            .app_data(market.clone())
            .app_data(mailer.clone())
            .app_data(config.clone())
            .configure(routes::configure_routes)
    })
    .bind(bind_addr)?
    .run()
    .await
}
