use actix_web::{get, web, HttpResponse};
use serde::Deserialize;

use crate::services::market_data::{search_catalog, MarketDataService, TRADING_PAIRS};

#[derive(Deserialize)]
pub struct HistoryQuery {
    pub days: Option<u32>,
}

#[derive(Deserialize)]
pub struct SearchQuery {
    pub query: Option<String>,
}

/// GET /api/market/prices - Current prices for the supported coins (PUBLIC)
#[get("/prices")]
pub async fn get_prices(market: web::Data<MarketDataService>) -> HttpResponse {
    let prices = market.prices().await;
    HttpResponse::Ok().json(serde_json::json!({ "prices": prices }))
}

/// GET /api/market/{symbol}/history?days=7 - Price history series (PUBLIC)
#[get("/{symbol}/history")]
pub async fn get_history(
    path: web::Path<String>,
    query: web::Query<HistoryQuery>,
    market: web::Data<MarketDataService>,
) -> HttpResponse {
    let symbol = path.into_inner();
    let days = query.days.unwrap_or(7);

    match market.history(&symbol, days).await {
        Ok(history) => HttpResponse::Ok().json(serde_json::json!({
            "symbol": symbol.to_uppercase(),
            "history": history,
        })),
        Err(e) => e.to_response(),
    }
}

/// GET /api/market/pairs - Supported trading pairs (PUBLIC)
#[get("/pairs")]
pub async fn get_pairs() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "pairs": TRADING_PAIRS }))
}

/// GET /api/market/stats - Demo exchange-wide statistics (PUBLIC)
#[get("/stats")]
pub async fn get_stats() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "total_volume": 85_000_000_000.0_f64,
        "total_market_cap": 1_800_000_000_000.0_f64,
        "active_traders": 1_250_000,
        "daily_transactions": 2_850_000,
        "btc_dominance": 47.2,
        "fear_greed_index": 65,
    }))
}

/// GET /api/market/search?query=bit - Catalog search by name or symbol (PUBLIC)
#[get("/search")]
pub async fn search(query: web::Query<SearchQuery>) -> HttpResponse {
    let q = match query.query.as_deref().map(str::trim) {
        Some(q) if !q.is_empty() => q,
        _ => {
            return HttpResponse::BadRequest().json(serde_json::json!({
                "error": "Query parameter required"
            }));
        }
    };

    HttpResponse::Ok().json(serde_json::json!({ "results": search_catalog(q) }))
}

pub fn market_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/market")
            .service(get_prices)
            .service(get_pairs)
            .service(get_stats)
            .service(search)
            // /{symbol}/history last so it cannot shadow the fixed paths
            .service(get_history)
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, App};

    macro_rules! test_app {
        () => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new(MarketDataService::static_only()))
                    .configure(market_routes),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn test_prices_endpoint() {
        let app = test_app!();
        let req = test::TestRequest::get().uri("/market/prices").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        let prices = body["prices"].as_array().unwrap();
        assert_eq!(prices.len(), 4);
        assert_eq!(prices[0]["id"], "bitcoin");
    }

    #[actix_web::test]
    async fn test_history_defaults_to_seven_days() {
        let app = test_app!();
        let req = test::TestRequest::get()
            .uri("/market/btc/history")
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["symbol"], "BTC");
        assert_eq!(body["history"].as_array().unwrap().len(), 8);
    }

    #[actix_web::test]
    async fn test_history_rejects_unknown_symbol() {
        let app = test_app!();
        let req = test::TestRequest::get()
            .uri("/market/wat/history?days=7")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
    }

    #[actix_web::test]
    async fn test_pairs_and_stats() {
        let app = test_app!();

        let req = test::TestRequest::get().uri("/market/pairs").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["pairs"].as_array().unwrap().len(), 5);

        let req = test::TestRequest::get().uri("/market/stats").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["btc_dominance"], 47.2);
        assert_eq!(body["fear_greed_index"], 65);
    }

    #[actix_web::test]
    async fn test_search_requires_query() {
        let app = test_app!();

        let req = test::TestRequest::get().uri("/market/search").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);

        let req = test::TestRequest::get()
            .uri("/market/search?query=bit")
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert!(body["results"]
            .as_array()
            .unwrap()
            .iter()
            .any(|c| c["id"] == "bitcoin"));
    }
}
