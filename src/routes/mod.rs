pub mod auth;
pub mod health;
pub mod market;
pub mod trade;
pub mod wallet;

use actix_web::web;

/// Wires the whole REST surface under /api.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .configure(auth::auth_routes)
            .configure(wallet::wallet_routes)
            .configure(trade::trade_routes)
            .configure(market::market_routes)
            .service(health::health_check),
    );
}
