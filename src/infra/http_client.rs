use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::error::{ExoMercatError, Result};

/// Synchronous TAP endpoint speaking ADQL with JSON results
pub struct TapClient {
    client: reqwest::Client,
    endpoint: String,
}

/// Column metadata plus row arrays, the JSON shape TAP services return
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TapTable {
    #[serde(default)]
    pub metadata: Vec<TapColumn>,
    #[serde(default)]
    pub data: Vec<Vec<Value>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TapColumn {
    pub name: String,
}

impl TapTable {
    pub fn column(&self, name: &str) -> Option<usize> {
        self.metadata.iter().position(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn text(row: &[Value], idx: Option<usize>) -> Option<String> {
        match row.get(idx?)? {
            Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn float(row: &[Value], idx: Option<usize>) -> Option<f64> {
        match row.get(idx?)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl TapClient {
    pub fn new(endpoint: impl Into<String>, timeout_seconds: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .user_agent(concat!("exo_mercat/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub async fn query(&self, adql: &str) -> Result<TapTable> {
        debug!("TAP query to {} ({} chars)", self.endpoint, adql.len());
        let response = self
            .client
            .post(&self.endpoint)
            .form(&[
                ("REQUEST", "doQuery"),
                ("LANG", "ADQL"),
                ("FORMAT", "json"),
                ("QUERY", adql),
            ])
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExoMercatError::Resolver {
                message: format!("{} returned {}: {}", self.endpoint, status, body.chars().take(200).collect::<String>()),
            });
        }
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// ADQL string literal with embedded quotes doubled
pub fn adql_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// `CONTAINS(POINT(..), CIRCLE(..)) = 1` joined with OR
pub fn cone_condition(ra_column: &str, dec_column: &str, positions: &[(f64, f64)], radius_deg: f64) -> String {
    positions
        .iter()
        .map(|(ra, dec)| {
            format!(
                "CONTAINS(POINT('ICRS', {}, {}), CIRCLE('ICRS', {}, {}, {})) = 1",
                ra_column, dec_column, ra, dec, radius_deg
            )
        })
        .collect::<Vec<_>>()
        .join(" OR ")
}
