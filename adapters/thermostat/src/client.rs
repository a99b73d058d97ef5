//! HTTP client for thermostat reads and writes.

use hvac_core::{retry, EditableSettings, RegisterWrite, ThermostatData, ThermostatInfo};
use reqwest::{header, Client, RequestBuilder, Response};
use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};

use crate::error::ClientError;
use crate::ClientConfig;

/// Thermostat client
#[derive(Clone)]
pub struct ThermostatClient {
    /// HTTP client
    client: Client,
    config: ClientConfig,
}

impl ThermostatClient {
    /// Create a new client
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        info!(url = %config.base_url, "Creating thermostat client");
        Ok(Self {
            client: Client::builder().timeout(config.timeout).build()?,
            config,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        if self.config.auth_token.is_empty() {
            builder
        } else {
            builder.header(
                header::AUTHORIZATION,
                format!("Bearer {}", self.config.auth_token),
            )
        }
    }

    /// One GET attempt; non-2xx counts as failure
    async fn get_once(&self, path: &str) -> Result<Response, ClientError> {
        let url = self.config.url_for(path);
        debug!(url = %url, "GET");
        let response = self.authorize(self.client.get(&url)).send().await?;
        if !response.status().is_success() {
            return Err(ClientError::status(response.status()));
        }
        Ok(response)
    }

    /// GET with retries, then parse the JSON body
    async fn get_json(&self, path: &str) -> Result<Value, ClientError> {
        let response = retry(self.config.max_retries, || self.get_once(path)).await?;
        Ok(response.json().await?)
    }

    /// Read and decode the register dump without collapsing errors
    #[instrument(skip(self))]
    pub async fn read_registers(&self) -> Result<ThermostatData, ClientError> {
        let body = self.get_json("/read").await?;
        Ok(ThermostatData::from_json(&body)?)
    }

    /// Current thermostat state.
    ///
    /// Any failure is logged and reported as [`ClientError::Offline`].
    pub async fn get_data(&self) -> Result<ThermostatData, ClientError> {
        self.read_registers().await.map_err(|e| {
            error!(error = %e, "Failed to read thermostat");
            ClientError::Offline
        })
    }

    /// Device identity; the serial reads "Unknown" when the device cannot
    /// be reached
    #[instrument(skip(self))]
    pub async fn get_info(&self) -> ThermostatInfo {
        let body = match self.get_json("/info").await {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "Failed to read thermostat info");
                return ThermostatInfo::unknown();
            }
        };
        serde_json::from_value(body).unwrap_or_else(|e| {
            warn!(error = %e, "Unexpected thermostat info payload");
            ThermostatInfo::unknown()
        })
    }

    async fn put_once(&self, write: &RegisterWrite) -> Result<(), ClientError> {
        let url = self.config.url_for(&write.path());
        debug!(url = %url, value = write.value, "PUT");
        let response = self
            .authorize(self.client.put(&url))
            .json(&write.body())
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ClientError::status(response.status()));
        }
        Ok(())
    }

    /// Write one register with retries
    #[instrument(skip(self), fields(register = write.register, parameter = write.parameter))]
    pub async fn write_register(&self, write: RegisterWrite) -> Result<(), ClientError> {
        retry(self.config.max_retries, || self.put_once(&write))
            .await
            .map_err(|e| ClientError::WriteFailed {
                parameter: write.parameter,
                message: e.to_string(),
            })
    }

    /// Apply `settings`, writing only the registers that differ from the
    /// device's current state. Writes stop at the first failure.
    ///
    /// Returns the writes that were sent.
    pub async fn set_data(
        &self,
        settings: &EditableSettings,
    ) -> Result<Vec<RegisterWrite>, ClientError> {
        let current = self.get_data().await?;
        let writes = settings.changes_from(&current);

        for write in &writes {
            self.write_register(*write).await?;
        }

        info!(writes = writes.len(), "Thermostat settings applied");
        Ok(writes)
    }
}
