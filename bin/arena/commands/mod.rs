//! CLI commands. Each talks to a running arena server over HTTP.

pub mod leaderboard;
pub mod plagiarism;
pub mod queue;

use anyhow::{bail, Result};
use predict_arena::api::routes::ErrorResponse;
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;

pub struct ArenaApi {
    base_url: String,
    http: reqwest::Client,
}

impl ArenaApi {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(120))
                .build()
                .unwrap_or_default(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let resp = self.http.get(self.url(path)).send().await?;
        decode(resp).await
    }

    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let resp = self.http.post(self.url(path)).json(body).send().await?;
        decode(resp).await
    }

    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let resp = self.http.post(self.url(path)).send().await?;
        decode(resp).await
    }
}

async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
    let status = resp.status();
    if !status.is_success() {
        let detail = resp
            .json::<ErrorResponse>()
            .await
            .map(|e| e.detail)
            .unwrap_or_else(|_| format!("server returned {}", status));
        bail!(detail);
    }
    Ok(resp.json().await?)
}
