use serde::Serialize;
use chrono::{DateTime, Utc};

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub mode: String, // "postgres" or "mock"
    pub time: DateTime<Utc>,
}
