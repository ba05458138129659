use anyhow::{Context, Result};

/// Secrets and environment-specific values. Everything else lives in the TOML
/// `FileConfig`.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub mexico_postal_api_key: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            database_url: std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            mexico_postal_api_key: std::env::var("MEXICO_POSTAL_API_KEY")
                .ok()
                .filter(|k| !k.is_empty()),
        };

        config.log_keys();
        Ok(config)
    }

    fn log_keys(&self) {
        tracing::info!("Config loaded:");
        tracing::info!("  DATABASE_URL: <set>");
        tracing::info!("  MEXICO_POSTAL_API_KEY: {}", preview_opt(&self.mexico_postal_api_key));
    }
}

fn preview_opt(val: &Option<String>) -> String {
    match val {
        Some(v) if !v.is_empty() => {
            let head: String = v.chars().take(5).collect();
            format!("{}...({} chars)", head, v.chars().count())
        }
        _ => "<not set>".to_string(),
    }
}
