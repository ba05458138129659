use std::time::Duration;

use crate::error::Result;
use crate::throttle::Throttle;
use crate::types::{CodigosPostalesEntry, MexicoPostalResponse};
use crate::{check_status, DEFAULT_USER_AGENT};

pub const CODIGOS_POSTALES_URL: &str = "https://api.codigospostales.mx/cp";
pub const MEXICO_POSTAL_URL: &str = "https://mexico-postal-codes.p.rapidapi.com/";
const MEXICO_POSTAL_HOST: &str = "mexico-postal-codes.p.rapidapi.com";

/// Client for codigospostales.mx, searched by colonia + municipio.
pub struct CodigosPostalesClient {
    client: reqwest::Client,
    base_url: String,
    user_agent: String,
    throttle: Throttle,
}

impl CodigosPostalesClient {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: CODIGOS_POSTALES_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            throttle: Throttle::disabled(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_throttle(mut self, min_interval: Duration) -> Self {
        self.throttle = Throttle::new(min_interval);
        self
    }

    pub async fn lookup(&self, colonia: &str, municipio: &str) -> Result<Vec<CodigosPostalesEntry>> {
        self.throttle.wait().await;

        let resp = self
            .client
            .get(&self.base_url)
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .query(&[("colonia", colonia), ("municipio", municipio)])
            .send()
            .await?;

        let resp = check_status(resp).await?;
        let entries: Vec<CodigosPostalesEntry> = resp.json().await?;
        tracing::debug!(colonia, municipio, count = entries.len(), "codigospostales.mx lookup");
        Ok(entries)
    }
}

/// Client for the Mexico Postal Codes API on RapidAPI.
pub struct MexicoPostalClient {
    client: reqwest::Client,
    base_url: String,
    host: String,
    api_key: String,
    user_agent: String,
    throttle: Throttle,
}

impl MexicoPostalClient {
    pub fn new(client: reqwest::Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: MEXICO_POSTAL_URL.to_string(),
            host: MEXICO_POSTAL_HOST.to_string(),
            api_key: api_key.into(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            throttle: Throttle::disabled(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_throttle(mut self, min_interval: Duration) -> Self {
        self.throttle = Throttle::new(min_interval);
        self
    }

    pub async fn lookup(
        &self,
        colonia: &str,
        municipio: &str,
        estado: &str,
    ) -> Result<MexicoPostalResponse> {
        self.throttle.wait().await;

        let resp = self
            .client
            .get(&self.base_url)
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .header("X-RapidAPI-Key", &self.api_key)
            .header("X-RapidAPI-Host", &self.host)
            .query(&[("colonia", colonia), ("municipio", municipio), ("estado", estado)])
            .send()
            .await?;

        let resp = check_status(resp).await?;
        let body: MexicoPostalResponse = resp.json().await?;
        tracing::debug!(
            colonia,
            municipio,
            count = body.postal_codes.len(),
            "Mexico Postal Codes lookup"
        );
        Ok(body)
    }
}
