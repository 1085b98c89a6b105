use rust_decimal::Decimal;

use crate::db::{NewOrder, Store};
use crate::error::ApiError;
use crate::models::dto::CreateOrderRequest;
use crate::models::order::{self, OrderKind, OrderSide};
use crate::services::market_data::TRADING_PAIRS;

pub struct OrderService;

impl OrderService {
    /// Creates a new order. Sell orders are checked against the base-currency
    /// wallet balance inside the store's transactional boundary; market orders
    /// fill immediately through an explicit state transition (there is no
    /// matching engine and no delayed background task).
    pub async fn create_order(
        store: &Store,
        user_id: i32,
        request: CreateOrderRequest,
    ) -> Result<order::Model, ApiError> {
        let base_currency = Self::parse_pair(&request.pair)?;

        let amount = Decimal::from_f64_retain(request.amount)
            .filter(|a| *a > Decimal::ZERO)
            .ok_or_else(|| ApiError::Validation("Invalid order details".to_string()))?;

        let price = match request.kind {
            OrderKind::Limit => {
                let price = request
                    .price
                    .and_then(Decimal::from_f64_retain)
                    .filter(|p| *p > Decimal::ZERO)
                    .ok_or_else(|| {
                        ApiError::Validation("Price required for limit orders".to_string())
                    })?;
                Some(price)
            }
            // Market orders execute at market price
            OrderKind::Market => None,
        };

        let new_order = NewOrder {
            user_id,
            pair: request.pair.clone(),
            side: request.side,
            kind: request.kind,
            amount,
            price,
        };

        let order = match request.side {
            OrderSide::Sell => {
                store
                    .insert_sell_order_checked(new_order, &base_currency)
                    .await?
            }
            OrderSide::Buy => store.insert_order(new_order).await?,
        };

        match request.kind {
            OrderKind::Market => store.fill_order(order.id).await,
            OrderKind::Limit => Ok(order),
        }
    }

    /// Cancels an order still in the PENDING state.
    pub async fn cancel_order(
        store: &Store,
        user_id: i32,
        order_id: i32,
    ) -> Result<order::Model, ApiError> {
        store.cancel_order(user_id, order_id).await
    }

    /// Validates pair membership and returns the base currency ("ETH/USDT" -> "ETH").
    fn parse_pair(pair: &str) -> Result<String, ApiError> {
        if !TRADING_PAIRS.contains(&pair) {
            return Err(ApiError::Validation("Invalid trading pair".to_string()));
        }
        Ok(pair.split('/').next().unwrap_or_default().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MemStore, NewWallet, Store};
    use crate::models::order::OrderStatus;
    use rust_decimal_macros::dec;

    fn mock_store() -> Store {
        Store::Mock(MemStore::new())
    }

    async fn funded_wallet(store: &Store, user_id: i32, currency: &str, balance: Decimal) {
        let wallet = store
            .insert_wallet(NewWallet {
                user_id,
                currency: currency.to_string(),
                address: format!("0xaddr-{}", currency),
                private_key: "0xkey".to_string(),
            })
            .await
            .unwrap();
        store.credit_wallet(wallet.id, balance).await;
    }

    fn request(side: OrderSide, kind: OrderKind, amount: f64, price: Option<f64>) -> CreateOrderRequest {
        CreateOrderRequest {
            side,
            pair: "ETH/USDT".to_string(),
            amount,
            price,
            kind,
        }
    }

    #[tokio::test]
    async fn test_limit_buy_rests_as_pending() {
        let store = mock_store();
        let order = OrderService::create_order(
            &store,
            1,
            request(OrderSide::Buy, OrderKind::Limit, 1.0, Some(3000.0)),
        )
        .await
        .unwrap();

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.price, Some(dec!(3000.0)));
        assert!(order.filled_at.is_none());
    }

    #[tokio::test]
    async fn test_market_buy_fills_immediately() {
        let store = mock_store();
        let order = OrderService::create_order(
            &store,
            1,
            request(OrderSide::Buy, OrderKind::Market, 1.0, None),
        )
        .await
        .unwrap();

        assert_eq!(order.status, OrderStatus::Filled);
        assert!(order.filled_at.is_some());
        assert_eq!(order.price, None);
    }

    #[tokio::test]
    async fn test_limit_order_requires_price() {
        let store = mock_store();
        let result = OrderService::create_order(
            &store,
            1,
            request(OrderSide::Buy, OrderKind::Limit, 1.0, None),
        )
        .await;
        assert!(matches!(result, Err(ApiError::Validation(_))));
    }

    #[tokio::test]
    async fn test_unknown_pair_rejected() {
        let store = mock_store();
        let mut req = request(OrderSide::Buy, OrderKind::Limit, 1.0, Some(1.0));
        req.pair = "ETH/DOGE".to_string();
        let result = OrderService::create_order(&store, 1, req).await;
        assert!(matches!(result, Err(ApiError::Validation(_))));
    }

    #[tokio::test]
    async fn test_sell_exceeding_balance_is_never_persisted() {
        let store = mock_store();
        funded_wallet(&store, 1, "ETH", dec!(0.5)).await;

        let result = OrderService::create_order(
            &store,
            1,
            request(OrderSide::Sell, OrderKind::Limit, 1.0, Some(3000.0)),
        )
        .await;
        assert!(matches!(result, Err(ApiError::Validation(_))));

        let orders = store.orders_for_user(1, None, None).await.unwrap();
        assert!(orders.is_empty());
    }

    #[tokio::test]
    async fn test_sell_without_wallet_is_rejected() {
        let store = mock_store();
        let result = OrderService::create_order(
            &store,
            1,
            request(OrderSide::Sell, OrderKind::Limit, 1.0, Some(3000.0)),
        )
        .await;
        assert!(matches!(result, Err(ApiError::Validation(_))));
    }

    #[tokio::test]
    async fn test_funded_sell_rests_in_the_book() {
        let store = mock_store();
        funded_wallet(&store, 1, "ETH", dec!(10)).await;

        let order = OrderService::create_order(
            &store,
            1,
            request(OrderSide::Sell, OrderKind::Limit, 2.0, Some(3100.0)),
        )
        .await
        .unwrap();
        assert_eq!(order.status, OrderStatus::Pending);

        let (bids, asks) = store.orderbook("ETH/USDT").await.unwrap();
        assert!(bids.is_empty());
        assert_eq!(asks.len(), 1);
        assert_eq!(asks[0].id, order.id);
    }

    #[tokio::test]
    async fn test_cancel_is_terminal() {
        let store = mock_store();
        let order = OrderService::create_order(
            &store,
            1,
            request(OrderSide::Buy, OrderKind::Limit, 1.0, Some(2900.0)),
        )
        .await
        .unwrap();

        let cancelled = OrderService::cancel_order(&store, 1, order.id).await.unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert!(cancelled.cancelled_at.is_some());

        // Second cancel: state error, status unchanged
        let second = OrderService::cancel_order(&store, 1, order.id).await;
        assert!(matches!(second, Err(ApiError::Validation(_))));
        let current = store.find_order(1, order.id).await.unwrap().unwrap();
        assert_eq!(current.status, OrderStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_cancel_filled_order_rejected() {
        let store = mock_store();
        let order = OrderService::create_order(
            &store,
            1,
            request(OrderSide::Buy, OrderKind::Market, 1.0, None),
        )
        .await
        .unwrap();
        assert_eq!(order.status, OrderStatus::Filled);

        let result = OrderService::cancel_order(&store, 1, order.id).await;
        assert!(matches!(result, Err(ApiError::Validation(_))));
    }

    #[tokio::test]
    async fn test_cancel_foreign_order_is_not_found() {
        let store = mock_store();
        let order = OrderService::create_order(
            &store,
            1,
            request(OrderSide::Buy, OrderKind::Limit, 1.0, Some(2900.0)),
        )
        .await
        .unwrap();

        let result = OrderService::cancel_order(&store, 2, order.id).await;
        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_orderbook_sorting() {
        let store = mock_store();
        funded_wallet(&store, 1, "ETH", dec!(100)).await;

        for price in [3000.0, 3200.0, 3100.0] {
            OrderService::create_order(
                &store,
                1,
                request(OrderSide::Buy, OrderKind::Limit, 1.0, Some(price)),
            )
            .await
            .unwrap();
            OrderService::create_order(
                &store,
                1,
                request(OrderSide::Sell, OrderKind::Limit, 1.0, Some(price)),
            )
            .await
            .unwrap();
        }

        let (bids, asks) = store.orderbook("ETH/USDT").await.unwrap();
        let bid_prices: Vec<_> = bids.iter().map(|o| o.price.unwrap()).collect();
        let ask_prices: Vec<_> = asks.iter().map(|o| o.price.unwrap()).collect();
        assert_eq!(bid_prices, vec![dec!(3200.0), dec!(3100.0), dec!(3000.0)]);
        assert_eq!(ask_prices, vec![dec!(3000.0), dec!(3100.0), dec!(3200.0)]);
    }
}
