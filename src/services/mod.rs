pub mod mailer;
pub mod market_data;
pub mod order_service;
pub mod wallet_service;
