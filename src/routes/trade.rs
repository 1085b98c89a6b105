use actix_web::{get, post, web, HttpResponse};
use serde::Deserialize;
use validator::Validate;

use crate::db::Store;
use crate::middleware::AuthUser;
use crate::models::dto::{CreateOrderRequest, OrderBookResponse, OrderResponse};
use crate::models::order::{OrderSide, OrderStatus};
use crate::services::market_data::TRADING_PAIRS;
use crate::services::order_service::OrderService;

#[derive(Deserialize)]
pub struct OrderListQuery {
    pub status: Option<OrderStatus>,
    #[serde(rename = "type")]
    pub side: Option<OrderSide>,
}

/// GET /api/trade/orders - Orders of the current user, newest first,
/// optionally filtered by ?status= and ?type= (PROTECTED)
#[get("/orders")]
pub async fn get_orders(
    auth_user: AuthUser,
    query: web::Query<OrderListQuery>,
    store: web::Data<Store>,
) -> HttpResponse {
    match store
        .orders_for_user(auth_user.user_id, query.status, query.side)
        .await
    {
        Ok(orders) => {
            let orders: Vec<OrderResponse> =
                orders.into_iter().map(OrderResponse::from).collect();
            HttpResponse::Ok().json(serde_json::json!({ "orders": orders }))
        }
        Err(e) => e.to_response(),
    }
}

/// POST /api/trade/orders - Place a limit or market order (PROTECTED)
#[post("/orders")]
pub async fn create_order(
    auth_user: AuthUser,
    body: web::Json<CreateOrderRequest>,
    store: web::Data<Store>,
) -> HttpResponse {
    if let Err(errors) = body.validate() {
        return HttpResponse::BadRequest().json(errors);
    }

    match OrderService::create_order(&store, auth_user.user_id, body.into_inner()).await {
        Ok(order) => HttpResponse::Created().json(serde_json::json!({
            "message": "Order created successfully",
            "order": OrderResponse::from(order),
        })),
        Err(e) => e.to_response(),
    }
}

/// POST /api/trade/orders/{order_id}/cancel - Cancel a pending order (PROTECTED)
#[post("/orders/{order_id}/cancel")]
pub async fn cancel_order(
    auth_user: AuthUser,
    path: web::Path<i32>,
    store: web::Data<Store>,
) -> HttpResponse {
    let order_id = path.into_inner();
    match OrderService::cancel_order(&store, auth_user.user_id, order_id).await {
        Ok(order) => HttpResponse::Ok().json(serde_json::json!({
            "message": "Order cancelled successfully",
            "order": OrderResponse::from(order),
        })),
        Err(e) => e.to_response(),
    }
}

/// GET /api/trade/orderbook/{pair} - Pending bids and asks for a pair (PUBLIC)
///
/// The pair arrives with a dash ("ETH-USDT") since a slash cannot appear in
/// a path segment.
#[get("/orderbook/{pair}")]
pub async fn get_orderbook(path: web::Path<String>, store: web::Data<Store>) -> HttpResponse {
    let pair = path.into_inner().replace('-', "/").to_uppercase();
    if !TRADING_PAIRS.contains(&pair.as_str()) {
        return HttpResponse::BadRequest().json(serde_json::json!({
            "error": "Invalid trading pair"
        }));
    }

    match store.orderbook(&pair).await {
        Ok((bids, asks)) => HttpResponse::Ok().json(OrderBookResponse {
            pair,
            bids: bids.into_iter().map(OrderResponse::from).collect(),
            asks: asks.into_iter().map(OrderResponse::from).collect(),
        }),
        Err(e) => e.to_response(),
    }
}

pub fn trade_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/trade")
            .service(get_orders)
            .service(create_order)
            .service(cancel_order)
            .service(get_orderbook)
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, App};
    use serde_json::json;

    use crate::db::MemStore;
    use crate::routes::auth::auth_routes;

    macro_rules! test_app {
        () => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new(Store::Mock(MemStore::new())))
                    .configure(auth_routes)
                    .configure(trade_routes),
            )
            .await
        };
    }

    macro_rules! register_and_login {
        ($app:expr) => {{
            let req = test::TestRequest::post()
                .uri("/auth/register")
                .set_json(json!({
                    "email": "trader@example.com",
                    "password": "password123",
                    "firstName": "Active",
                    "lastName": "Trader"
                }))
                .to_request();
            let body: serde_json::Value = test::call_and_read_body_json($app, req).await;
            body["token"].as_str().unwrap().to_string()
        }};
    }

    #[actix_web::test]
    async fn test_limit_buy_and_filtered_listing() {
        let app = test_app!();
        let token = register_and_login!(&app);

        let req = test::TestRequest::post()
            .uri("/trade/orders")
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .set_json(json!({
                "type": "BUY",
                "pair": "ETH/USDT",
                "amount": 1.5,
                "price": 3000.0,
                "orderType": "LIMIT"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 201);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["order"]["status"], "PENDING");
        assert_eq!(body["order"]["type"], "BUY");

        let req = test::TestRequest::get()
            .uri("/trade/orders?status=PENDING&type=BUY")
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["orders"].as_array().unwrap().len(), 1);

        let req = test::TestRequest::get()
            .uri("/trade/orders?status=FILLED")
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert!(body["orders"].as_array().unwrap().is_empty());
    }

    #[actix_web::test]
    async fn test_market_order_returns_filled() {
        let app = test_app!();
        let token = register_and_login!(&app);

        let req = test::TestRequest::post()
            .uri("/trade/orders")
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .set_json(json!({
                "type": "BUY",
                "pair": "BTC/USDT",
                "amount": 0.1,
                "orderType": "MARKET"
            }))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["order"]["status"], "FILLED");
        assert!(!body["order"]["filled_at"].is_null());
    }

    #[actix_web::test]
    async fn test_cancel_pending_order() {
        let app = test_app!();
        let token = register_and_login!(&app);

        let req = test::TestRequest::post()
            .uri("/trade/orders")
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .set_json(json!({
                "type": "BUY",
                "pair": "ETH/USDT",
                "amount": 1.0,
                "price": 2900.0,
                "orderType": "LIMIT"
            }))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        let order_id = body["order"]["id"].as_i64().unwrap();

        let req = test::TestRequest::post()
            .uri(&format!("/trade/orders/{}/cancel", order_id))
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["order"]["status"], "CANCELLED");

        // Cancelling again is a state error
        let req = test::TestRequest::post()
            .uri(&format!("/trade/orders/{}/cancel", order_id))
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
    }

    #[actix_web::test]
    async fn test_orderbook_is_public_and_validates_pair() {
        let app = test_app!();
        let token = register_and_login!(&app);

        let req = test::TestRequest::post()
            .uri("/trade/orders")
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .set_json(json!({
                "type": "BUY",
                "pair": "ETH/USDT",
                "amount": 1.0,
                "price": 3050.0,
                "orderType": "LIMIT"
            }))
            .to_request();
        test::call_service(&app, req).await;

        // No Authorization header on purpose
        let req = test::TestRequest::get()
            .uri("/trade/orderbook/ETH-USDT")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["pair"], "ETH/USDT");
        assert_eq!(body["bids"].as_array().unwrap().len(), 1);
        assert!(body["asks"].as_array().unwrap().is_empty());

        let req = test::TestRequest::get()
            .uri("/trade/orderbook/ETH-DOGE")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
    }

    #[actix_web::test]
    async fn test_create_order_requires_auth() {
        let app = test_app!();

        let req = test::TestRequest::post()
            .uri("/trade/orders")
            .set_json(json!({
                "type": "BUY",
                "pair": "ETH/USDT",
                "amount": 1.0,
                "price": 3000.0,
                "orderType": "LIMIT"
            }))
            .to_request();
        let resp = test::try_call_service(&app, req).await;
        match resp {
            Ok(resp) => assert_eq!(resp.status(), 401),
            Err(e) => assert_eq!(e.error_response().status(), 401),
        }
    }
}
