use url::Url;

use crate::error::{AppError, Result};
use crate::models::SessionUser;

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub api_token: Option<String>,
    pub user_id: Option<String>,
    pub user_name: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let api_url = std::env::var("TUNEBOX_API_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:3000".to_string());

        Url::parse(&api_url)
            .map_err(|e| AppError::Config(format!("Invalid TUNEBOX_API_URL: {}", e)))?;

        let api_token = std::env::var("TUNEBOX_API_TOKEN").ok();
        let user_id = std::env::var("TUNEBOX_USER_ID").ok();
        let user_name = std::env::var("TUNEBOX_USER_NAME").ok();

        Ok(Self {
            api_url,
            api_token,
            user_id,
            user_name,
        })
    }

    pub fn get_missing_config(&self) -> Vec<String> {
        let mut missing = Vec::new();

        if self.api_token.as_deref().unwrap_or("").is_empty() {
            missing.push("TUNEBOX_API_TOKEN".to_string());
        }
        if self.user_id.as_deref().unwrap_or("").is_empty() {
            missing.push("TUNEBOX_USER_ID".to_string());
        }

        missing
    }

    /// The identity the session provider hands us, when one is configured.
    pub fn session_user(&self) -> Option<SessionUser> {
        let id = self.user_id.as_deref()?.trim();
        if id.is_empty() {
            return None;
        }

        Some(SessionUser {
            id: id.to_string(),
            name: self.user_name.clone(),
            email: None,
        })
    }
}
