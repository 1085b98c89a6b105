// Runtime configuration, read once at startup from the environment
// (dotenv is loaded first in main). Mock mode is not a global flag: it is
// decided here and threaded through the constructed services.

use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Postgres connection string. Absent => in-memory mock mode.
    pub database_url: Option<String>,
    pub host: String,
    pub port: u16,
    /// Base URL of the web client, used to build password-reset links.
    pub frontend_url: String,
    /// HTTP mail API endpoint (e.g. Resend/Mailgun). Absent => reset emails
    /// are logged to the console instead of being delivered.
    pub mail_api_url: Option<String>,
    pub mail_api_key: Option<String>,
    pub mail_from: String,
    /// When false, the market data proxy skips the live feed entirely and
    /// serves the static dataset.
    pub market_data_live: bool,
    /// Timeout for live price-feed requests, in seconds.
    pub market_fetch_timeout_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        AppConfig {
            database_url: non_empty_var("DATABASE_URL"),
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            mail_api_url: non_empty_var("MAIL_API_URL"),
            mail_api_key: non_empty_var("MAIL_API_KEY"),
            mail_from: env::var("MAIL_FROM")
                .unwrap_or_else(|_| "no-reply@exchange.local".to_string()),
            market_data_live: env::var("MARKET_DATA_LIVE")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(true),
            market_fetch_timeout_secs: env::var("MARKET_FETCH_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
        }
    }

    pub fn mock_mode(&self) -> bool {
        self.database_url.is_none()
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}
