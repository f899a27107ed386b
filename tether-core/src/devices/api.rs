// SPDX-FileCopyrightText: 2026 Tether Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Device API
//!
//! The server surface for the account's device list. The trait is what the
//! rest of the crate depends on; `HttpDeviceApi` is the reqwest-backed
//! implementation behind the `http-api` feature.

use thiserror::Error;

use super::record::LinkedDeviceRecord;

/// Errors from the device API.
#[derive(Error, Debug, Clone)]
pub enum DeviceApiError {
    /// Transport failure; retryable, orthogonal to timeouts.
    #[error("Network error: {0}")]
    Network(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Unexpected response: {0}")]
    InvalidResponse(String),

    #[error("Unexpected HTTP status {0}")]
    UnexpectedStatus(u16),
}

/// The account's device-list endpoints.
pub trait DeviceApi {
    /// `GET /v1/devices`
    fn list_devices(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<LinkedDeviceRecord>, DeviceApiError>> + Send;

    /// `DELETE /v1/devices/{id}`
    fn unlink_device(
        &self,
        id: u32,
    ) -> impl std::future::Future<Output = Result<(), DeviceApiError>> + Send;

    /// `PUT /v1/accounts/name?deviceId={id}` with the encrypted name.
    fn rename_device(
        &self,
        id: u32,
        encrypted_name: &[u8],
    ) -> impl std::future::Future<Output = Result<(), DeviceApiError>> + Send;
}

#[cfg(feature = "http-api")]
pub use http::{HttpApiConfig, HttpDeviceApi};

#[cfg(feature = "http-api")]
mod http {
    use std::time::Duration;

    use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

    use super::{DeviceApi, DeviceApiError};
    use crate::devices::record::{parse_device_list, LinkedDeviceRecord};

    /// Configuration shared by the HTTP API clients.
    #[derive(Clone, Debug)]
    pub struct HttpApiConfig {
        /// Base server URL (`https://...`), without a trailing slash.
        pub base_url: String,
        /// Basic-auth username (account identifier).
        pub username: String,
        /// Basic-auth password.
        pub password: String,
        /// Timeout for ordinary (non-long-poll) requests.
        pub request_timeout: Duration,
    }

    impl HttpApiConfig {
        pub fn new(base_url: impl Into<String>, username: impl Into<String>, password: impl Into<String>) -> Self {
            HttpApiConfig {
                base_url: base_url.into(),
                username: username.into(),
                password: password.into(),
                request_timeout: Duration::from_secs(30),
            }
        }
    }

    /// reqwest-backed device API client.
    pub struct HttpDeviceApi {
        client: reqwest::Client,
        config: HttpApiConfig,
    }

    impl HttpDeviceApi {
        pub fn new(config: HttpApiConfig) -> Result<Self, DeviceApiError> {
            let client = reqwest::Client::builder()
                .timeout(config.request_timeout)
                .build()
                .map_err(|e| DeviceApiError::Network(e.to_string()))?;
            Ok(HttpDeviceApi { client, config })
        }

        fn url(&self, path: &str) -> String {
            format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
        }
    }

    impl DeviceApi for HttpDeviceApi {
        async fn list_devices(&self) -> Result<Vec<LinkedDeviceRecord>, DeviceApiError> {
            let response = self
                .client
                .get(self.url("/v1/devices"))
                .basic_auth(&self.config.username, Some(&self.config.password))
                .send()
                .await
                .map_err(|e| DeviceApiError::Network(e.to_string()))?;

            match response.status().as_u16() {
                200 => {
                    let body = response
                        .text()
                        .await
                        .map_err(|e| DeviceApiError::Network(e.to_string()))?;
                    parse_device_list(&body)
                        .map_err(|e| DeviceApiError::InvalidResponse(e.to_string()))
                }
                429 => Err(DeviceApiError::RateLimited),
                status => Err(DeviceApiError::UnexpectedStatus(status)),
            }
        }

        async fn unlink_device(&self, id: u32) -> Result<(), DeviceApiError> {
            let response = self
                .client
                .delete(self.url(&format!("/v1/devices/{}", id)))
                .basic_auth(&self.config.username, Some(&self.config.password))
                .send()
                .await
                .map_err(|e| DeviceApiError::Network(e.to_string()))?;

            match response.status().as_u16() {
                200 | 204 => Ok(()),
                429 => Err(DeviceApiError::RateLimited),
                status => Err(DeviceApiError::UnexpectedStatus(status)),
            }
        }

        async fn rename_device(&self, id: u32, encrypted_name: &[u8]) -> Result<(), DeviceApiError> {
            let body = serde_json::json!({ "deviceName": BASE64.encode(encrypted_name) });

            let response = self
                .client
                .put(self.url(&format!("/v1/accounts/name?deviceId={}", id)))
                .basic_auth(&self.config.username, Some(&self.config.password))
                .json(&body)
                .send()
                .await
                .map_err(|e| DeviceApiError::Network(e.to_string()))?;

            // Success is exactly 204.
            match response.status().as_u16() {
                204 => Ok(()),
                400 => Err(DeviceApiError::InvalidRequest("rename rejected".into())),
                429 => Err(DeviceApiError::RateLimited),
                status => Err(DeviceApiError::UnexpectedStatus(status)),
            }
        }
    }
}
