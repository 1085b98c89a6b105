use actix_web::{get, post, web, HttpResponse};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::db::Store;
use crate::middleware::AuthUser;
use crate::models::dto::decimal_to_f64;
use crate::models::{transaction, wallet};
use crate::services::wallet_service::WalletService;

#[derive(Deserialize, Validate)]
pub struct CreateWalletRequest {
    #[validate(length(min = 1, message = "Currency is required"))]
    pub currency: String,
}

#[derive(Deserialize, Validate)]
pub struct SendRequest {
    #[serde(rename = "toAddress")]
    #[validate(length(min = 1, message = "Destination address is required"))]
    pub to_address: String,
    pub amount: f64,
}

#[derive(Serialize)]
pub struct WalletResponse {
    pub id: i32,
    pub currency: String,
    pub address: String,
    pub balance: f64,
    #[serde(rename = "createdAt")]
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<wallet::Model> for WalletResponse {
    fn from(w: wallet::Model) -> Self {
        WalletResponse {
            id: w.id,
            currency: w.currency,
            address: w.address,
            balance: decimal_to_f64(w.balance),
            created_at: w.created_at,
        }
    }
}

#[derive(Serialize)]
pub struct TransactionResponse {
    pub id: i32,
    #[serde(rename = "type")]
    pub tx_type: transaction::TransactionType,
    pub symbol: String,
    pub amount: f64,
    pub value: f64,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub status: String,
}

impl From<transaction::Model> for TransactionResponse {
    fn from(t: transaction::Model) -> Self {
        let amount = decimal_to_f64(t.amount);
        TransactionResponse {
            id: t.id,
            tx_type: t.tx_type,
            symbol: t.currency,
            amount,
            // Placeholder valuation, no price feed lookup on this path
            value: amount * 100.0,
            timestamp: t.created_at,
            status: t.status,
        }
    }
}

/// GET /api/wallet - All wallets of the current user (PROTECTED)
#[get("")]
pub async fn get_wallets(auth_user: AuthUser, store: web::Data<Store>) -> HttpResponse {
    match store.wallets_for_user(auth_user.user_id).await {
        Ok(wallets) => {
            let wallets: Vec<WalletResponse> =
                wallets.into_iter().map(WalletResponse::from).collect();
            HttpResponse::Ok().json(serde_json::json!({ "wallets": wallets }))
        }
        Err(e) => e.to_response(),
    }
}

/// POST /api/wallet/create - New wallet for a supported currency (PROTECTED)
#[post("/create")]
pub async fn create_wallet(
    auth_user: AuthUser,
    body: web::Json<CreateWalletRequest>,
    store: web::Data<Store>,
) -> HttpResponse {
    if let Err(errors) = body.validate() {
        return HttpResponse::BadRequest().json(errors);
    }

    let currency = body.currency.to_uppercase();
    match WalletService::create_wallet(&store, auth_user.user_id, &currency).await {
        Ok(wallet) => HttpResponse::Created().json(serde_json::json!({
            "message": "Wallet created successfully",
            "wallet": WalletResponse::from(wallet),
        })),
        Err(e) => e.to_response(),
    }
}

/// GET /api/wallet/{wallet_id}/balance - Single wallet balance (PROTECTED)
#[get("/{wallet_id}/balance")]
pub async fn get_balance(
    auth_user: AuthUser,
    path: web::Path<i32>,
    store: web::Data<Store>,
) -> HttpResponse {
    let wallet_id = path.into_inner();
    match store.find_wallet(auth_user.user_id, wallet_id).await {
        Ok(Some(wallet)) => HttpResponse::Ok().json(serde_json::json!({
            "balance": decimal_to_f64(wallet.balance),
            "currency": wallet.currency,
        })),
        Ok(None) => HttpResponse::NotFound().json(serde_json::json!({
            "error": "Wallet not found"
        })),
        Err(e) => e.to_response(),
    }
}

/// POST /api/wallet/{wallet_id}/send - Debit the wallet and record the
/// transfer (PROTECTED)
#[post("/{wallet_id}/send")]
pub async fn send(
    auth_user: AuthUser,
    path: web::Path<i32>,
    body: web::Json<SendRequest>,
    store: web::Data<Store>,
) -> HttpResponse {
    if let Err(errors) = body.validate() {
        return HttpResponse::BadRequest().json(errors);
    }

    let wallet_id = path.into_inner();
    match WalletService::send(
        &store,
        auth_user.user_id,
        wallet_id,
        &body.to_address,
        body.amount,
    )
    .await
    {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({
            "message": "Transaction sent successfully"
        })),
        Err(e) => e.to_response(),
    }
}

/// GET /api/wallet/transactions - Transaction history, newest first (PROTECTED)
#[get("/transactions")]
pub async fn get_transactions(auth_user: AuthUser, store: web::Data<Store>) -> HttpResponse {
    match store.transactions_for_user(auth_user.user_id).await {
        Ok(transactions) => {
            let transactions: Vec<TransactionResponse> = transactions
                .into_iter()
                .map(TransactionResponse::from)
                .collect();
            HttpResponse::Ok().json(serde_json::json!({ "transactions": transactions }))
        }
        Err(e) => e.to_response(),
    }
}

pub fn wallet_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/wallet")
            // /transactions must register before the /{wallet_id}/... routes
            .service(get_transactions)
            .service(create_wallet)
            .service(get_balance)
            .service(send)
            .service(get_wallets)
    );
}
