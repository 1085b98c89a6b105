// ============================================================================
// PERSISTENCE GATEWAY
// ============================================================================
//
// Description:
//   Single entry point for all reads and writes. Two backends, selected at
//   startup from AppConfig:
//     - Postgres(DatabaseConnection) : SeaORM against a real database
//     - Mock(MemStore)               : in-memory tables for demo mode
//
//   Multi-step writes (wallet debit + transaction record, sell balance check
//   + order insert) run inside a SeaORM transaction on Postgres and under a
//   single lock guard in mock mode.
//
// ============================================================================

pub mod mock;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::*;

use crate::config::AppConfig;
use crate::error::ApiError;
use crate::models::order::{self, OrderKind, OrderSide, OrderStatus};
use crate::models::transaction::{self, TransactionType};
use crate::models::{users, wallet};

pub use mock::MemStore;

pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
}

pub struct NewWallet {
    pub user_id: i32,
    pub currency: String,
    pub address: String,
    pub private_key: String,
}

pub struct NewOrder {
    pub user_id: i32,
    pub pair: String,
    pub side: OrderSide,
    pub kind: OrderKind,
    pub amount: Decimal,
    pub price: Option<Decimal>,
}

pub enum Store {
    Postgres(DatabaseConnection),
    Mock(MemStore),
}

/// Connects to Postgres when DATABASE_URL is configured, otherwise builds
/// the in-memory mock store.
pub async fn connect(config: &AppConfig) -> Result<Store, DbErr> {
    match &config.database_url {
        Some(url) => {
            let db = Database::connect(url).await?;
            Ok(Store::Postgres(db))
        }
        None => Ok(Store::Mock(MemStore::new())),
    }
}

impl Store {
    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<users::Model>, ApiError> {
        match self {
            Store::Postgres(db) => Ok(users::Entity::find()
                .filter(users::Column::Email.eq(email))
                .one(db)
                .await?),
            Store::Mock(m) => m.find_user_by_email(email),
        }
    }

    pub async fn find_user_by_id(&self, id: i32) -> Result<Option<users::Model>, ApiError> {
        match self {
            Store::Postgres(db) => Ok(users::Entity::find_by_id(id).one(db).await?),
            Store::Mock(m) => m.find_user_by_id(id),
        }
    }

    pub async fn insert_user(&self, new: NewUser) -> Result<users::Model, ApiError> {
        match self {
            Store::Postgres(db) => {
                let now = Utc::now();
                let user = users::ActiveModel {
                    email: Set(new.email),
                    password_hash: Set(new.password_hash),
                    first_name: Set(new.first_name),
                    last_name: Set(new.last_name),
                    reset_token: Set(None),
                    reset_token_expires: Set(None),
                    created_at: Set(now),
                    updated_at: Set(now),
                    ..Default::default()
                };
                Ok(user.insert(db).await?)
            }
            Store::Mock(m) => m.insert_user(new),
        }
    }

    pub async fn set_reset_token(
        &self,
        user_id: i32,
        token: &str,
        expires: DateTime<Utc>,
    ) -> Result<(), ApiError> {
        match self {
            Store::Postgres(db) => {
                let user = users::Entity::find_by_id(user_id)
                    .one(db)
                    .await?
                    .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
                let mut active: users::ActiveModel = user.into();
                active.reset_token = Set(Some(token.to_string()));
                active.reset_token_expires = Set(Some(expires));
                active.updated_at = Set(Utc::now());
                active.update(db).await?;
                Ok(())
            }
            Store::Mock(m) => m.set_reset_token(user_id, token, expires),
        }
    }

    pub async fn find_user_by_reset_token(
        &self,
        token: &str,
    ) -> Result<Option<users::Model>, ApiError> {
        match self {
            Store::Postgres(db) => Ok(users::Entity::find()
                .filter(users::Column::ResetToken.eq(token))
                .one(db)
                .await?),
            Store::Mock(m) => m.find_user_by_reset_token(token),
        }
    }

    /// Stores the new hash and clears the reset token in one update.
    pub async fn reset_password(&self, user_id: i32, new_hash: &str) -> Result<(), ApiError> {
        match self {
            Store::Postgres(db) => {
                let user = users::Entity::find_by_id(user_id)
                    .one(db)
                    .await?
                    .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
                let mut active: users::ActiveModel = user.into();
                active.password_hash = Set(new_hash.to_string());
                active.reset_token = Set(None);
                active.reset_token_expires = Set(None);
                active.updated_at = Set(Utc::now());
                active.update(db).await?;
                Ok(())
            }
            Store::Mock(m) => m.reset_password(user_id, new_hash),
        }
    }

    // ------------------------------------------------------------------
    // Wallets / transactions
    // ------------------------------------------------------------------

    pub async fn wallets_for_user(&self, user_id: i32) -> Result<Vec<wallet::Model>, ApiError> {
        match self {
            Store::Postgres(db) => Ok(wallet::Entity::find()
                .filter(wallet::Column::UserId.eq(user_id))
                .all(db)
                .await?),
            Store::Mock(m) => m.wallets_for_user(user_id),
        }
    }

    pub async fn find_wallet(
        &self,
        user_id: i32,
        wallet_id: i32,
    ) -> Result<Option<wallet::Model>, ApiError> {
        match self {
            Store::Postgres(db) => Ok(wallet::Entity::find_by_id(wallet_id)
                .filter(wallet::Column::UserId.eq(user_id))
                .one(db)
                .await?),
            Store::Mock(m) => m.find_wallet(user_id, wallet_id),
        }
    }

    pub async fn insert_wallet(&self, new: NewWallet) -> Result<wallet::Model, ApiError> {
        match self {
            Store::Postgres(db) => {
                let wallet = wallet::ActiveModel {
                    user_id: Set(new.user_id),
                    currency: Set(new.currency),
                    address: Set(new.address),
                    private_key: Set(new.private_key),
                    balance: Set(Decimal::ZERO),
                    created_at: Set(Utc::now()),
                    ..Default::default()
                };
                Ok(wallet.insert(db).await?)
            }
            Store::Mock(m) => m.insert_wallet(new),
        }
    }

    /// Debits the source wallet and records the SEND transaction inside one
    /// transactional boundary.
    pub async fn send_from_wallet(
        &self,
        user_id: i32,
        wallet_id: i32,
        to_address: &str,
        amount: Decimal,
    ) -> Result<(), ApiError> {
        match self {
            Store::Postgres(db) => {
                let txn = db.begin().await?;

                // SELECT ... FOR UPDATE: the balance check and the debit see
                // the same row state even under concurrent sends
                let wallet = wallet::Entity::find_by_id(wallet_id)
                    .filter(wallet::Column::UserId.eq(user_id))
                    .lock_exclusive()
                    .one(&txn)
                    .await?
                    .ok_or_else(|| ApiError::NotFound("Wallet not found".to_string()))?;

                if wallet.balance < amount {
                    // txn dropped here -> rollback
                    return Err(ApiError::Validation("Insufficient balance".to_string()));
                }

                let new_balance = wallet.balance - amount;
                let currency = wallet.currency.clone();
                let from_address = wallet.address.clone();

                let mut active: wallet::ActiveModel = wallet.into();
                active.balance = Set(new_balance);
                active.update(&txn).await?;

                let record = transaction::ActiveModel {
                    user_id: Set(user_id),
                    wallet_id: Set(wallet_id),
                    tx_type: Set(TransactionType::Send),
                    amount: Set(amount),
                    currency: Set(currency),
                    from_address: Set(from_address),
                    to_address: Set(to_address.to_string()),
                    status: Set("COMPLETED".to_string()),
                    created_at: Set(Utc::now()),
                    ..Default::default()
                };
                record.insert(&txn).await?;

                txn.commit().await?;
                Ok(())
            }
            Store::Mock(m) => m.send_from_wallet(user_id, wallet_id, to_address, amount),
        }
    }

    /// Test fixture, mock backend only.
    #[cfg(test)]
    pub async fn credit_wallet(&self, wallet_id: i32, amount: Decimal) {
        match self {
            Store::Postgres(_) => unimplemented!("test fixture for the mock backend"),
            Store::Mock(m) => m.credit_wallet(wallet_id, amount),
        }
    }

    pub async fn transactions_for_user(
        &self,
        user_id: i32,
    ) -> Result<Vec<transaction::Model>, ApiError> {
        match self {
            Store::Postgres(db) => Ok(transaction::Entity::find()
                .filter(transaction::Column::UserId.eq(user_id))
                .order_by_desc(transaction::Column::CreatedAt)
                .order_by_desc(transaction::Column::Id)
                .all(db)
                .await?),
            Store::Mock(m) => m.transactions_for_user(user_id),
        }
    }

    // ------------------------------------------------------------------
    // Orders
    // ------------------------------------------------------------------

    pub async fn insert_order(&self, new: NewOrder) -> Result<order::Model, ApiError> {
        match self {
            Store::Postgres(db) => Ok(Self::order_active_model(&new).insert(db).await?),
            Store::Mock(m) => m.insert_order(new),
        }
    }

    /// Sell-order path: the base-currency wallet row is locked for the length
    /// of the transaction, so a concurrent debit cannot slip between the
    /// balance check and the insert.
    pub async fn insert_sell_order_checked(
        &self,
        new: NewOrder,
        base_currency: &str,
    ) -> Result<order::Model, ApiError> {
        match self {
            Store::Postgres(db) => {
                let txn = db.begin().await?;

                let wallet = wallet::Entity::find()
                    .filter(wallet::Column::UserId.eq(new.user_id))
                    .filter(wallet::Column::Currency.eq(base_currency))
                    .lock_exclusive()
                    .one(&txn)
                    .await?;

                match wallet {
                    Some(w) if w.balance >= new.amount => {}
                    _ => return Err(ApiError::Validation("Insufficient balance".to_string())),
                }

                let order = Self::order_active_model(&new).insert(&txn).await?;
                txn.commit().await?;
                Ok(order)
            }
            Store::Mock(m) => m.insert_sell_order_checked(new, base_currency),
        }
    }

    fn order_active_model(new: &NewOrder) -> order::ActiveModel {
        order::ActiveModel {
            user_id: Set(new.user_id),
            pair: Set(new.pair.clone()),
            side: Set(new.side),
            kind: Set(new.kind),
            amount: Set(new.amount),
            price: Set(new.price),
            status: Set(OrderStatus::Pending),
            created_at: Set(Utc::now()),
            filled_at: Set(None),
            cancelled_at: Set(None),
            ..Default::default()
        }
    }

    pub async fn orders_for_user(
        &self,
        user_id: i32,
        status: Option<OrderStatus>,
        side: Option<OrderSide>,
    ) -> Result<Vec<order::Model>, ApiError> {
        match self {
            Store::Postgres(db) => {
                let mut query = order::Entity::find().filter(order::Column::UserId.eq(user_id));
                if let Some(status) = status {
                    query = query.filter(order::Column::Status.eq(status));
                }
                if let Some(side) = side {
                    query = query.filter(order::Column::Side.eq(side));
                }
                Ok(query
                    .order_by_desc(order::Column::CreatedAt)
                    .order_by_desc(order::Column::Id)
                    .all(db)
                    .await?)
            }
            Store::Mock(m) => m.orders_for_user(user_id, status, side),
        }
    }

    pub async fn find_order(
        &self,
        user_id: i32,
        order_id: i32,
    ) -> Result<Option<order::Model>, ApiError> {
        match self {
            Store::Postgres(db) => Ok(order::Entity::find_by_id(order_id)
                .filter(order::Column::UserId.eq(user_id))
                .one(db)
                .await?),
            Store::Mock(m) => m.find_order(user_id, order_id),
        }
    }

    /// PENDING -> FILLED. Terminal states are never overwritten.
    pub async fn fill_order(&self, order_id: i32) -> Result<order::Model, ApiError> {
        match self {
            Store::Postgres(db) => {
                let order = order::Entity::find_by_id(order_id)
                    .one(db)
                    .await?
                    .ok_or_else(|| ApiError::NotFound("Order not found".to_string()))?;
                if order.status != OrderStatus::Pending {
                    return Ok(order);
                }
                let mut active: order::ActiveModel = order.into();
                active.status = Set(OrderStatus::Filled);
                active.filled_at = Set(Some(Utc::now()));
                Ok(active.update(db).await?)
            }
            Store::Mock(m) => m.fill_order(order_id),
        }
    }

    /// PENDING -> CANCELLED, rejected for terminal orders.
    pub async fn cancel_order(
        &self,
        user_id: i32,
        order_id: i32,
    ) -> Result<order::Model, ApiError> {
        match self {
            Store::Postgres(db) => {
                let order = order::Entity::find_by_id(order_id)
                    .filter(order::Column::UserId.eq(user_id))
                    .one(db)
                    .await?
                    .ok_or_else(|| ApiError::NotFound("Order not found".to_string()))?;
                if order.status != OrderStatus::Pending {
                    return Err(ApiError::Validation(
                        "Cannot cancel order in current state".to_string(),
                    ));
                }
                let mut active: order::ActiveModel = order.into();
                active.status = Set(OrderStatus::Cancelled);
                active.cancelled_at = Set(Some(Utc::now()));
                Ok(active.update(db).await?)
            }
            Store::Mock(m) => m.cancel_order(user_id, order_id),
        }
    }

    /// Pending orders for a pair: (bids desc by price, asks asc by price).
    pub async fn orderbook(
        &self,
        pair: &str,
    ) -> Result<(Vec<order::Model>, Vec<order::Model>), ApiError> {
        match self {
            Store::Postgres(db) => {
                let bids = order::Entity::find()
                    .filter(order::Column::Pair.eq(pair))
                    .filter(order::Column::Side.eq(OrderSide::Buy))
                    .filter(order::Column::Status.eq(OrderStatus::Pending))
                    .order_by_desc(order::Column::Price)
                    .all(db)
                    .await?;
                let asks = order::Entity::find()
                    .filter(order::Column::Pair.eq(pair))
                    .filter(order::Column::Side.eq(OrderSide::Sell))
                    .filter(order::Column::Status.eq(OrderStatus::Pending))
                    .order_by_asc(order::Column::Price)
                    .all(db)
                    .await?;
                Ok((bids, asks))
            }
            Store::Mock(m) => m.orderbook(pair),
        }
    }
}
