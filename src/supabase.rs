//! Supabase PostgREST client. One row per insert call, no batch insert, no
//! upsert semantics.

use anyhow::{anyhow, Context, Result};
use serde_json::Value;

use crate::upload::TableClient;

pub struct SupabaseClient {
    client: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
}

impl SupabaseClient {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }
}

impl TableClient for SupabaseClient {
    fn insert(&self, table: &str, row: &Value) -> Result<()> {
        let url = format!("{}/rest/v1/{}", self.base_url, table);
        let response = self
            .client
            .post(&url)
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Prefer", "return=minimal")
            .json(row)
            .send()
            .context("Supabase request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(anyhow!("Supabase returned {}: {}", status, body));
        }
        Ok(())
    }
}
