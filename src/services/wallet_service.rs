use rust_decimal::Decimal;
use rand::Rng;
use rand::distributions::Alphanumeric;

use crate::db::{NewWallet, Store};
use crate::error::ApiError;
use crate::models::wallet;

/// Currency allow-list for wallet creation.
pub const SUPPORTED_CURRENCIES: [&str; 4] = ["BTC", "ETH", "USDT", "BNB"];

pub struct WalletService;

impl WalletService {
    /// Creates a wallet for one of the supported currencies with a freshly
    /// generated placeholder keypair and a zero balance.
    pub async fn create_wallet(
        store: &Store,
        user_id: i32,
        currency: &str,
    ) -> Result<wallet::Model, ApiError> {
        if !SUPPORTED_CURRENCIES.contains(&currency) {
            return Err(ApiError::Validation("Invalid currency".to_string()));
        }

        let (address, private_key) = Self::generate_keypair(currency);

        store
            .insert_wallet(NewWallet {
                user_id,
                currency: currency.to_string(),
                address,
                private_key,
            })
            .await
    }

    /// Demo key material only. The ETH family gets a hex keypair; BTC gets a
    /// bech32-looking placeholder string. No custody, no encryption at rest.
    pub fn generate_keypair(currency: &str) -> (String, String) {
        match currency {
            "BTC" => {
                let address = format!("bc1q{}", random_lowercase(20));
                let private_key = format!("xprv{}", random_lowercase(62));
                (address, private_key)
            }
            // ETH, USDT and BNB all use ethereum-style addresses here
            _ => {
                let mut address_bytes = [0u8; 20];
                rand::thread_rng().fill(&mut address_bytes);
                let mut key_bytes = [0u8; 32];
                rand::thread_rng().fill(&mut key_bytes);
                (
                    format!("0x{}", hex::encode(address_bytes)),
                    format!("0x{}", hex::encode(key_bytes)),
                )
            }
        }
    }

    /// Debits the wallet and records the transfer. The balance check and the
    /// two writes happen inside the store's transactional boundary.
    pub async fn send(
        store: &Store,
        user_id: i32,
        wallet_id: i32,
        to_address: &str,
        amount: f64,
    ) -> Result<(), ApiError> {
        if to_address.trim().is_empty() || amount <= 0.0 {
            return Err(ApiError::Validation(
                "Invalid transaction details".to_string(),
            ));
        }

        let amount = Decimal::from_f64_retain(amount)
            .ok_or_else(|| ApiError::Validation("Invalid amount format".to_string()))?;

        store
            .send_from_wallet(user_id, wallet_id, to_address, amount)
            .await
    }
}

fn random_lowercase(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect::<String>()
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MemStore, Store};
    use rust_decimal_macros::dec;

    fn mock_store() -> Store {
        Store::Mock(MemStore::new())
    }

    #[test]
    fn test_generate_keypair_formats() {
        let (address, key) = WalletService::generate_keypair("BTC");
        assert!(address.starts_with("bc1q"));
        assert_eq!(address.len(), 24);
        assert!(key.starts_with("xprv"));

        for currency in ["ETH", "USDT", "BNB"] {
            let (address, key) = WalletService::generate_keypair(currency);
            assert!(address.starts_with("0x"));
            assert_eq!(address.len(), 42);
            assert!(key.starts_with("0x"));
            assert_eq!(key.len(), 66);
        }
    }

    #[tokio::test]
    async fn test_create_wallet_rejects_unknown_currency() {
        let store = mock_store();
        let result = WalletService::create_wallet(&store, 1, "DOGE").await;
        assert!(matches!(result, Err(ApiError::Validation(_))));
        assert!(store.wallets_for_user(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_wallet_starts_empty() {
        let store = mock_store();
        let wallet = WalletService::create_wallet(&store, 1, "ETH").await.unwrap();
        assert_eq!(wallet.currency, "ETH");
        assert!(!wallet.address.is_empty());
        assert_eq!(wallet.balance, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_send_debits_and_records_transaction() {
        let store = mock_store();
        let wallet = WalletService::create_wallet(&store, 1, "ETH").await.unwrap();
        store.credit_wallet(wallet.id, dec!(2.5)).await;

        WalletService::send(&store, 1, wallet.id, "0xdeadbeef", 1.0)
            .await
            .unwrap();

        let wallets = store.wallets_for_user(1).await.unwrap();
        assert_eq!(wallets[0].balance, dec!(1.5));

        let transactions = store.transactions_for_user(1).await.unwrap();
        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0].to_address, "0xdeadbeef");
        assert_eq!(transactions[0].currency, "ETH");
        assert_eq!(transactions[0].status, "COMPLETED");
    }

    #[tokio::test]
    async fn test_send_insufficient_balance_leaves_no_trace() {
        let store = mock_store();
        let wallet = WalletService::create_wallet(&store, 1, "BTC").await.unwrap();
        store.credit_wallet(wallet.id, dec!(0.5)).await;

        let result = WalletService::send(&store, 1, wallet.id, "bc1qsomewhere", 1.0).await;
        assert!(matches!(result, Err(ApiError::Validation(_))));

        // Neither the debit nor the transaction record happened
        let wallets = store.wallets_for_user(1).await.unwrap();
        assert_eq!(wallets[0].balance, dec!(0.5));
        assert!(store.transactions_for_user(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_send_rejects_bad_details() {
        let store = mock_store();
        let wallet = WalletService::create_wallet(&store, 1, "ETH").await.unwrap();

        assert!(WalletService::send(&store, 1, wallet.id, "", 1.0).await.is_err());
        assert!(WalletService::send(&store, 1, wallet.id, "0xabc", 0.0).await.is_err());
        assert!(WalletService::send(&store, 1, wallet.id, "0xabc", -1.0).await.is_err());
    }

    #[tokio::test]
    async fn test_send_unknown_wallet_is_not_found() {
        let store = mock_store();
        let result = WalletService::send(&store, 1, 999, "0xabc", 1.0).await;
        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }
}
