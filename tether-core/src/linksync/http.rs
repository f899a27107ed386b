// SPDX-FileCopyrightText: 2026 Tether Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! HTTP Linking API
//!
//! reqwest-backed implementation of [`LinkingApi`]. The server-side
//! timeout rides in the `timeout` query parameter; the per-request HTTP
//! timeout is left to the coordinator's client deadline, so the socket is
//! never torn down while the server is still within its own budget.

use std::time::Duration;

use super::{ArchiveLocation, ArchiveWaitResult, LinkWaitResult, LinkingApi, LinkingApiError};
use crate::devices::{parse_device, HttpApiConfig};

/// reqwest-backed linking API client.
pub struct HttpLinkingApi {
    client: reqwest::Client,
    config: HttpApiConfig,
}

impl HttpLinkingApi {
    pub fn new(config: HttpApiConfig) -> Result<Self, LinkingApiError> {
        // No client-wide timeout: long-polls outlive ordinary requests and
        // the coordinator enforces the client deadline.
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| LinkingApiError::Network(e.to_string()))?;
        Ok(HttpLinkingApi { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }
}

impl LinkingApi for HttpLinkingApi {
    async fn wait_for_linked_device(
        &self,
        token: &str,
        timeout: Duration,
    ) -> Result<LinkWaitResult, LinkingApiError> {
        let url = self.url(&format!(
            "/v1/devices/wait_for_linked_device/{}?timeout={}",
            token,
            timeout.as_secs()
        ));

        let response = self
            .client
            .get(url)
            .basic_auth(&self.config.username, Some(&self.config.password))
            .send()
            .await
            .map_err(|e| LinkingApiError::Network(e.to_string()))?;

        match response.status().as_u16() {
            200 => {
                let body = response
                    .text()
                    .await
                    .map_err(|e| LinkingApiError::Network(e.to_string()))?;
                let device = parse_device(&body)
                    .map_err(|e| LinkingApiError::InvalidResponse(e.to_string()))?
                    .ok_or_else(|| {
                        LinkingApiError::InvalidResponse("linked device has invalid id".into())
                    })?;
                Ok(LinkWaitResult::Linked(device))
            }
            204 => Ok(LinkWaitResult::Timeout),
            400 => Err(LinkingApiError::InvalidRequest(
                "invalid provisioning token".into(),
            )),
            429 => Err(LinkingApiError::RateLimited),
            status => Err(LinkingApiError::UnexpectedStatus(status)),
        }
    }

    async fn set_transfer_archive(
        &self,
        destination_device_id: u32,
        destination_created_ms: u64,
        archive: &ArchiveLocation,
    ) -> Result<(), LinkingApiError> {
        let body = serde_json::json!({
            "destinationDeviceId": destination_device_id,
            "destinationDeviceCreated": destination_created_ms,
            "transferArchive": archive,
        });

        let response = self
            .client
            .put(self.url("/v1/devices/transfer_archive"))
            .basic_auth(&self.config.username, Some(&self.config.password))
            .json(&body)
            .send()
            .await
            .map_err(|e| LinkingApiError::Network(e.to_string()))?;

        match response.status().as_u16() {
            200 | 204 => Ok(()),
            400 => Err(LinkingApiError::InvalidRequest(
                "transfer archive rejected".into(),
            )),
            429 => Err(LinkingApiError::RateLimited),
            status => Err(LinkingApiError::UnexpectedStatus(status)),
        }
    }

    async fn wait_for_transfer_archive(
        &self,
        timeout: Duration,
    ) -> Result<ArchiveWaitResult, LinkingApiError> {
        let url = self.url(&format!(
            "/v1/devices/transfer_archive?timeout={}",
            timeout.as_secs()
        ));

        let response = self
            .client
            .get(url)
            .basic_auth(&self.config.username, Some(&self.config.password))
            .send()
            .await
            .map_err(|e| LinkingApiError::Network(e.to_string()))?;

        match response.status().as_u16() {
            200 => {
                let location: ArchiveLocation = response
                    .json()
                    .await
                    .map_err(|e| LinkingApiError::InvalidResponse(e.to_string()))?;
                Ok(ArchiveWaitResult::Uploaded(location))
            }
            204 => Ok(ArchiveWaitResult::Timeout),
            400 => Err(LinkingApiError::InvalidRequest("wait rejected".into())),
            429 => Err(LinkingApiError::RateLimited),
            status => Err(LinkingApiError::UnexpectedStatus(status)),
        }
    }
}
