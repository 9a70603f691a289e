//! HTTP client for the avroute server API.

use anyhow::{anyhow, Context, Result};
use avroute_core::{Coord, ErrorKind, PathStats, Waypoint};
use reqwest::blocking::Client;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Response envelope of `GET /v1/paths/...`, success or failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathReply {
    pub ok: bool,
    pub waypoints: Vec<Waypoint>,
    pub message: String,
    pub errors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<PathStats>,
}

pub struct RouteClient {
    client: Client,
    base_url: String,
}

impl RouteClient {
    /// Create a client for a server such as `http://localhost:3000`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .with_context(|| format!("invalid server url {:?}", self.base_url))?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("{} cannot be a base url", self.base_url))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub fn path_url(
        &self,
        from: Coord,
        to: Coord,
        risk_weight: Option<f64>,
        time_budget_s: Option<f64>,
    ) -> Result<Url> {
        let corners = [from.lon, from.lat, to.lon, to.lat].map(|v| v.to_string());
        let mut segments = vec!["v1", "paths"];
        segments.extend(corners.iter().map(String::as_str));
        let mut url = self.endpoint(&segments)?;

        let mut params = Vec::new();
        if let Some(weight) = risk_weight {
            params.push(("risk_weight", weight.to_string()));
        }
        if let Some(budget) = time_budget_s {
            params.push(("time_budget_s", budget.to_string()));
        }
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }
        Ok(url)
    }

    pub fn forecasts_url(&self, location: &str) -> Result<Url> {
        self.endpoint(&["v1", "forecasts", location])
    }

    /// Request a path. Failure envelopes are returned as replies with
    /// `ok == false`; only transport and decoding problems are errors.
    pub fn find_path(
        &self,
        from: Coord,
        to: Coord,
        risk_weight: f64,
        time_budget_s: f64,
    ) -> Result<PathReply> {
        let url = self.path_url(from, to, Some(risk_weight), Some(time_budget_s))?;
        // Leave headroom over the search deadline for the round trip.
        let timeout = Duration::from_secs_f64(time_budget_s.max(0.0) + 10.0);
        let response = self
            .client
            .get(url.clone())
            .timeout(timeout)
            .send()
            .with_context(|| format!("GET {url}"))?;

        let status = response.status();
        tracing::debug!(%status, "path response");
        response
            .json::<PathReply>()
            .with_context(|| format!("decoding path response ({status})"))
    }

    /// Newest forecast records for a location, as returned by the server.
    pub fn forecasts(&self, location: &str) -> Result<serde_json::Value> {
        let url = self.forecasts_url(location)?;
        let response = self.client.get(url.clone()).send()?;
        if !response.status().is_success() {
            return Err(anyhow!("GET {url} failed: {}", response.status()));
        }
        Ok(response.json()?)
    }
}
