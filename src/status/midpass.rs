use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

use super::{StatusSource, NOT_FOUND_STATUS};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApplicationResponse {
    passport_status: PassportStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PassportStatus {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct City {
    id: u32,
    name: String,
}

/// info.midpass.ru client with a bounded per-request timeout so one slow
/// lookup cannot stall a whole reconcile pass.
pub struct MidpassClient {
    http: reqwest::Client,
    base_url: String,
}

impl MidpassClient {
    pub fn new(base_url: String, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build midpass HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn fetch_status(&self, url: String) -> Result<String> {
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("status request to {url} failed"))?;

        // The site answers 404 for numbers it has never seen; that is a
        // regular status from the tracker's point of view, not a failure.
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(NOT_FOUND_STATUS.to_string());
        }

        let application: ApplicationResponse = response
            .error_for_status()
            .with_context(|| format!("status request to {url} returned an error"))?
            .json()
            .await
            .context("failed to decode status response")?;

        Ok(application.passport_status.name)
    }
}

#[async_trait]
impl StatusSource for MidpassClient {
    async fn lookup_status(&self, application_number: &str) -> Result<String> {
        let url = format!("{}/api/request/{}", self.base_url, application_number);
        self.fetch_status(url).await
    }

    async fn lookup_status_in_city(
        &self,
        application_number: &str,
        city_id: u32,
    ) -> Result<String> {
        let url = format!(
            "{}/api/request/{}?cityId={}",
            self.base_url, application_number, city_id
        );
        self.fetch_status(url).await
    }

    async fn lookup_city_id(&self, city_name: &str) -> Result<Option<u32>> {
        let url = format!("{}/api/cities", self.base_url);
        let cities: Vec<City> = self
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("city list request to {url} failed"))?
            .error_for_status()
            .context("city list request returned an error")?
            .json()
            .await
            .context("failed to decode city list")?;

        let wanted = city_name.trim().to_lowercase();
        Ok(cities
            .into_iter()
            .find(|city| city.name.to_lowercase() == wanted)
            .map(|city| city.id))
    }
}
