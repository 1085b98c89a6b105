use serde_json::json;

use crate::config::AppConfig;
use crate::error::ApiError;

/// Outbound email. With MAIL_API_URL and MAIL_API_KEY configured, messages go
/// to an HTTP mail API (Resend-style JSON payload); otherwise they are logged
/// to the console, which is enough for local development.
pub enum Mailer {
    Console,
    Http {
        client: reqwest::Client,
        endpoint: String,
        api_key: String,
        from: String,
    },
}

impl Mailer {
    pub fn from_config(config: &AppConfig) -> Self {
        match (&config.mail_api_url, &config.mail_api_key) {
            (Some(endpoint), Some(api_key)) => Mailer::Http {
                client: reqwest::Client::new(),
                endpoint: endpoint.clone(),
                api_key: api_key.clone(),
                from: config.mail_from.clone(),
            },
            _ => Mailer::Console,
        }
    }

    pub async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), ApiError> {
        match self {
            Mailer::Console => {
                log::info!("mock email sent");
                log::info!("to: {}", to);
                log::info!("subject: {}", subject);
                log::info!("html: {}", html);
                Ok(())
            }
            Mailer::Http {
                client,
                endpoint,
                api_key,
                from,
            } => {
                client
                    .post(endpoint)
                    .bearer_auth(api_key)
                    .json(&json!({
                        "from": from,
                        "to": to,
                        "subject": subject,
                        "html": html,
                    }))
                    .send()
                    .await
                    .map_err(|e| ApiError::Internal(format!("Failed to send email: {}", e)))?
                    .error_for_status()
                    .map_err(|e| ApiError::Internal(format!("Mail API rejected email: {}", e)))?;
                Ok(())
            }
        }
    }
}
