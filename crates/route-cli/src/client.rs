//! HTTP client for the route server API.

use anyhow::{bail, Result};
use route_core::Coordinate;
use serde::Serialize;
use serde_json::{json, Value};

/// Client for a running route server.
pub struct RouteClient {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct RouteRequest {
    start: Coordinate,
    end: Coordinate,
}

impl RouteClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Responses are read as untyped JSON since infeasible modes carry
    /// `null` day counts.
    async fn read(response: reqwest::Response) -> Result<Value> {
        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);
        if !status.is_success() {
            let message = body["error"].as_str().unwrap_or("no error message");
            bail!("server returned {}: {}", status, message);
        }
        Ok(body)
    }

    /// Compute a terrain-classified route with travel times.
    pub async fn route(&self, start: Coordinate, end: Coordinate) -> Result<Value> {
        let url = format!("{}/v1/routes", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&RouteRequest { start, end })
            .send()
            .await?;
        Self::read(response).await
    }

    pub async fn travel_modes(&self) -> Result<Value> {
        let url = format!("{}/v1/travel-modes", self.base_url);
        Self::read(self.client.get(&url).send().await?).await
    }

    pub async fn terrain(&self, at: Coordinate) -> Result<Value> {
        let url = format!("{}/v1/terrain", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("lon", at.lon), ("lat", at.lat)])
            .send()
            .await?;
        Self::read(response).await
    }

    pub async fn road_status(&self) -> Result<Value> {
        let url = format!("{}/v1/roads", self.base_url);
        Self::read(self.client.get(&url).send().await?).await
    }

    pub async fn reload_roads(&self) -> Result<Value> {
        let url = format!("{}/v1/roads/reload", self.base_url);
        Self::read(self.client.post(&url).send().await?).await
    }

    pub async fn clear_road_cache(&self) -> Result<()> {
        let url = format!("{}/v1/roads/cache", self.base_url);
        let response = self.client.delete(&url).send().await?;
        if !response.status().is_success() {
            bail!("server returned {}", response.status());
        }
        Ok(())
    }

    /// Shortest road path between the nodes nearest to each endpoint.
    pub async fn road_path(
        &self,
        start: Coordinate,
        end: Coordinate,
        max_snap_km: Option<f64>,
    ) -> Result<Value> {
        let url = format!("{}/v1/roads/path", self.base_url);
        let mut body = json!({ "start": start, "end": end });
        if let Some(km) = max_snap_km {
            body["max_snap_km"] = json!(km);
        }
        Self::read(self.client.post(&url).json(&body).send().await?).await
    }
}
