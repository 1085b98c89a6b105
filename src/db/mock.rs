// In-memory store used when DATABASE_URL is not configured.
// Tables are Vec<Model> behind RwLocks; ids come from one shared counter.
// Multi-step writes (debit + transaction record, balance check + order
// insert) run while holding the wallets guard so they stay atomic with
// respect to other requests.

use std::sync::RwLock;
use std::sync::atomic::{AtomicI32, Ordering};

use chrono::Utc;
use rust_decimal::Decimal;

use crate::error::ApiError;
use crate::models::order::{self, OrderSide, OrderStatus};
use crate::models::transaction::{self, TransactionType};
use crate::models::{users, wallet};

use super::{NewOrder, NewUser, NewWallet};

pub struct MemStore {
    users: RwLock<Vec<users::Model>>,
    wallets: RwLock<Vec<wallet::Model>>,
    transactions: RwLock<Vec<transaction::Model>>,
    orders: RwLock<Vec<order::Model>>,
    next_id: AtomicI32,
}

impl MemStore {
    pub fn new() -> Self {
        MemStore {
            users: RwLock::new(Vec::new()),
            wallets: RwLock::new(Vec::new()),
            transactions: RwLock::new(Vec::new()),
            orders: RwLock::new(Vec::new()),
            next_id: AtomicI32::new(1),
        }
    }

    fn next_id(&self) -> i32 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    pub fn find_user_by_email(&self, email: &str) -> Result<Option<users::Model>, ApiError> {
        let users = self.users.read().expect("users lock poisoned");
        Ok(users.iter().find(|u| u.email == email).cloned())
    }

    pub fn find_user_by_id(&self, id: i32) -> Result<Option<users::Model>, ApiError> {
        let users = self.users.read().expect("users lock poisoned");
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    pub fn insert_user(&self, new: NewUser) -> Result<users::Model, ApiError> {
        let now = Utc::now();
        let user = users::Model {
            id: self.next_id(),
            email: new.email,
            password_hash: new.password_hash,
            first_name: new.first_name,
            last_name: new.last_name,
            reset_token: None,
            reset_token_expires: None,
            created_at: now,
            updated_at: now,
        };
        let mut users = self.users.write().expect("users lock poisoned");
        users.push(user.clone());
        Ok(user)
    }

    pub fn set_reset_token(
        &self,
        user_id: i32,
        token: &str,
        expires: chrono::DateTime<Utc>,
    ) -> Result<(), ApiError> {
        let mut users = self.users.write().expect("users lock poisoned");
        let user = users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
        user.reset_token = Some(token.to_string());
        user.reset_token_expires = Some(expires);
        user.updated_at = Utc::now();
        Ok(())
    }

    pub fn find_user_by_reset_token(&self, token: &str) -> Result<Option<users::Model>, ApiError> {
        let users = self.users.read().expect("users lock poisoned");
        Ok(users
            .iter()
            .find(|u| u.reset_token.as_deref() == Some(token))
            .cloned())
    }

    pub fn reset_password(&self, user_id: i32, new_hash: &str) -> Result<(), ApiError> {
        let mut users = self.users.write().expect("users lock poisoned");
        let user = users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
        user.password_hash = new_hash.to_string();
        user.reset_token = None;
        user.reset_token_expires = None;
        user.updated_at = Utc::now();
        Ok(())
    }

    // ------------------------------------------------------------------
    // Wallets / transactions
    // ------------------------------------------------------------------

    pub fn wallets_for_user(&self, user_id: i32) -> Result<Vec<wallet::Model>, ApiError> {
        let wallets = self.wallets.read().expect("wallets lock poisoned");
        Ok(wallets
            .iter()
            .filter(|w| w.user_id == user_id)
            .cloned()
            .collect())
    }

    pub fn find_wallet(
        &self,
        user_id: i32,
        wallet_id: i32,
    ) -> Result<Option<wallet::Model>, ApiError> {
        let wallets = self.wallets.read().expect("wallets lock poisoned");
        Ok(wallets
            .iter()
            .find(|w| w.id == wallet_id && w.user_id == user_id)
            .cloned())
    }

    pub fn insert_wallet(&self, new: NewWallet) -> Result<wallet::Model, ApiError> {
        let wallet = wallet::Model {
            id: self.next_id(),
            user_id: new.user_id,
            currency: new.currency,
            address: new.address,
            private_key: new.private_key,
            balance: Decimal::ZERO,
            created_at: Utc::now(),
        };
        let mut wallets = self.wallets.write().expect("wallets lock poisoned");
        wallets.push(wallet.clone());
        Ok(wallet)
    }

    /// Debit the wallet and record the SEND transaction while the wallets
    /// guard is held, so no other request can observe the half-done state.
    pub fn send_from_wallet(
        &self,
        user_id: i32,
        wallet_id: i32,
        to_address: &str,
        amount: Decimal,
    ) -> Result<(), ApiError> {
        let mut wallets = self.wallets.write().expect("wallets lock poisoned");
        let wallet = wallets
            .iter_mut()
            .find(|w| w.id == wallet_id && w.user_id == user_id)
            .ok_or_else(|| ApiError::NotFound("Wallet not found".to_string()))?;

        if wallet.balance < amount {
            return Err(ApiError::Validation("Insufficient balance".to_string()));
        }

        wallet.balance -= amount;
        let record = transaction::Model {
            id: self.next_id(),
            user_id,
            wallet_id,
            tx_type: TransactionType::Send,
            amount,
            currency: wallet.currency.clone(),
            from_address: wallet.address.clone(),
            to_address: to_address.to_string(),
            status: "COMPLETED".to_string(),
            created_at: Utc::now(),
        };
        self.transactions
            .write()
            .expect("transactions lock poisoned")
            .push(record);
        Ok(())
    }

    /// Test fixture: the API has no deposit endpoint, balances only decrease.
    #[cfg(test)]
    pub fn credit_wallet(&self, wallet_id: i32, amount: Decimal) {
        let mut wallets = self.wallets.write().expect("wallets lock poisoned");
        if let Some(wallet) = wallets.iter_mut().find(|w| w.id == wallet_id) {
            wallet.balance += amount;
        }
    }

    pub fn transactions_for_user(
        &self,
        user_id: i32,
    ) -> Result<Vec<transaction::Model>, ApiError> {
        let transactions = self.transactions.read().expect("transactions lock poisoned");
        let mut result: Vec<transaction::Model> = transactions
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(result)
    }

    // ------------------------------------------------------------------
    // Orders
    // ------------------------------------------------------------------

    pub fn insert_order(&self, new: NewOrder) -> Result<order::Model, ApiError> {
        let mut orders = self.orders.write().expect("orders lock poisoned");
        Ok(Self::push_order(&mut orders, self.next_id(), new))
    }

    /// Balance check and insert under the wallets guard: a concurrent debit
    /// cannot slip between the read and the insert.
    pub fn insert_sell_order_checked(
        &self,
        new: NewOrder,
        base_currency: &str,
    ) -> Result<order::Model, ApiError> {
        let wallets = self.wallets.read().expect("wallets lock poisoned");
        let balance = wallets
            .iter()
            .find(|w| w.user_id == new.user_id && w.currency == base_currency)
            .map(|w| w.balance);

        match balance {
            Some(b) if b >= new.amount => {}
            _ => return Err(ApiError::Validation("Insufficient balance".to_string())),
        }

        let mut orders = self.orders.write().expect("orders lock poisoned");
        Ok(Self::push_order(&mut orders, self.next_id(), new))
    }

    fn push_order(orders: &mut Vec<order::Model>, id: i32, new: NewOrder) -> order::Model {
        let order = order::Model {
            id,
            user_id: new.user_id,
            pair: new.pair,
            side: new.side,
            kind: new.kind,
            amount: new.amount,
            price: new.price,
            status: OrderStatus::Pending,
            created_at: Utc::now(),
            filled_at: None,
            cancelled_at: None,
        };
        orders.push(order.clone());
        order
    }

    pub fn orders_for_user(
        &self,
        user_id: i32,
        status: Option<OrderStatus>,
        side: Option<OrderSide>,
    ) -> Result<Vec<order::Model>, ApiError> {
        let orders = self.orders.read().expect("orders lock poisoned");
        let mut result: Vec<order::Model> = orders
            .iter()
            .filter(|o| o.user_id == user_id)
            .filter(|o| status.map_or(true, |s| o.status == s))
            .filter(|o| side.map_or(true, |s| o.side == s))
            .cloned()
            .collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(result)
    }

    pub fn find_order(
        &self,
        user_id: i32,
        order_id: i32,
    ) -> Result<Option<order::Model>, ApiError> {
        let orders = self.orders.read().expect("orders lock poisoned");
        Ok(orders
            .iter()
            .find(|o| o.id == order_id && o.user_id == user_id)
            .cloned())
    }

    /// PENDING -> FILLED. Terminal states are never overwritten.
    pub fn fill_order(&self, order_id: i32) -> Result<order::Model, ApiError> {
        let mut orders = self.orders.write().expect("orders lock poisoned");
        let order = orders
            .iter_mut()
            .find(|o| o.id == order_id)
            .ok_or_else(|| ApiError::NotFound("Order not found".to_string()))?;
        if order.status == OrderStatus::Pending {
            order.status = OrderStatus::Filled;
            order.filled_at = Some(Utc::now());
        }
        Ok(order.clone())
    }

    /// PENDING -> CANCELLED, rejected for terminal orders.
    pub fn cancel_order(&self, user_id: i32, order_id: i32) -> Result<order::Model, ApiError> {
        let mut orders = self.orders.write().expect("orders lock poisoned");
        let order = orders
            .iter_mut()
            .find(|o| o.id == order_id && o.user_id == user_id)
            .ok_or_else(|| ApiError::NotFound("Order not found".to_string()))?;
        if order.status != OrderStatus::Pending {
            return Err(ApiError::Validation(
                "Cannot cancel order in current state".to_string(),
            ));
        }
        order.status = OrderStatus::Cancelled;
        order.cancelled_at = Some(Utc::now());
        Ok(order.clone())
    }

    /// Pending orders for a pair: bids sorted price descending, asks ascending.
    pub fn orderbook(
        &self,
        pair: &str,
    ) -> Result<(Vec<order::Model>, Vec<order::Model>), ApiError> {
        let orders = self.orders.read().expect("orders lock poisoned");
        let mut bids: Vec<order::Model> = orders
            .iter()
            .filter(|o| o.pair == pair && o.side == OrderSide::Buy && o.status == OrderStatus::Pending)
            .cloned()
            .collect();
        let mut asks: Vec<order::Model> = orders
            .iter()
            .filter(|o| o.pair == pair && o.side == OrderSide::Sell && o.status == OrderStatus::Pending)
            .cloned()
            .collect();
        bids.sort_by(|a, b| b.price.cmp(&a.price));
        asks.sort_by(|a, b| a.price.cmp(&b.price));
        Ok((bids, asks))
    }
}

impl Default for MemStore {
    fn default() -> Self {
        Self::new()
    }
}
