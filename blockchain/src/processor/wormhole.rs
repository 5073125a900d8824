use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use common::{AttestationKey, AttestationLookup, AttestationSource, BridgeError};

// Default API URL của WormholeScan
pub const DEFAULT_WORMHOLESCAN_API_URL: &str = "https://api.wormholescan.io/api/v1/";

// Kết quả của WormholeScan /vaas endpoint
#[derive(Debug, Serialize, Deserialize)]
struct WormholeScanResponse<T> {
    #[serde(default)]
    data: Option<T>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VaaRecord {
    #[serde(default)]
    sequence: Option<String>,
    #[serde(default)]
    vaa: Option<String>,
    #[serde(default)]
    tx_hash: Option<String>,
}

// Triển khai AttestationSource qua WormholeScan API
pub struct WormholeScanClient {
    client: Client,
    base_url: Url,
}

impl WormholeScanClient {
    pub fn new(api_url: &str) -> Result<Self, BridgeError> {
        Self::with_config(api_url, None)
    }

    /// Khởi tạo với cấu hình chi tiết
    pub fn with_config(api_url: &str, timeout_seconds: Option<u64>) -> Result<Self, BridgeError> {
        let mut client_builder = Client::builder();

        if let Some(timeout) = timeout_seconds {
            client_builder = client_builder.timeout(std::time::Duration::from_secs(timeout));
            debug!("Setting custom timeout of {} seconds for WormholeScan client", timeout);
        }

        let client = client_builder
            .build()
            .map_err(|e| BridgeError::Http(format!("Failed to build HTTP client for WormholeScan: {}", e)))?;

        // Url::join bỏ mất segment cuối nếu thiếu dấu '/'
        let normalized = if api_url.ends_with('/') {
            api_url.to_string()
        } else {
            format!("{}/", api_url)
        };
        let base_url = Url::parse(&normalized)
            .map_err(|e| BridgeError::Config(format!("Invalid WormholeScan API URL {}: {}", api_url, e)))?;

        info!("Initializing WormholeScan client with API URL: {}", base_url);
        Ok(Self { client, base_url })
    }

    /// `vaas/{chain}/{emitter}/{sequence}`; falls back to the tx hash when the
    /// emitter is unknown
    pub fn vaa_url(&self, key: &AttestationKey) -> Result<Url, BridgeError> {
        let emitter = key
            .emitter
            .as_deref()
            .map(|e| e.trim_start_matches("0x").to_lowercase())
            .unwrap_or_else(|| key.tx_hash.clone());
        let path = format!("vaas/{}/{}/{}", key.wormhole_chain_id, emitter, key.sequence);
        self.base_url
            .join(&path)
            .map_err(|e| BridgeError::Http(format!("Failed to join URL: {}", e)))
    }
}

#[async_trait]
impl AttestationSource for WormholeScanClient {
    async fn fetch_attestation(&self, key: &AttestationKey) -> common::Result<AttestationLookup> {
        let url = self.vaa_url(key)?;
        debug!("Fetching VAA for sequence {} from {}", key.sequence, url);

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| BridgeError::Http(format!("Failed to send request to {}: {}", url, e)))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!("VAA for sequence {} not signed yet", key.sequence);
            return Ok(AttestationLookup::NotYetAvailable);
        }
        if !status.is_success() {
            warn!("WormholeScan returned {} for {}", status, url);
            return Err(BridgeError::Http(format!("WormholeScan returned {}", status)));
        }

        let body: WormholeScanResponse<VaaRecord> = response
            .json()
            .await
            .map_err(|e| BridgeError::Http(format!("Failed to parse WormholeScan response: {}", e)))?;

        Ok(lookup_from_record(body.data))
    }
}

fn lookup_from_record(record: Option<VaaRecord>) -> AttestationLookup {
    let Some(record) = record else {
        return AttestationLookup::NotYetAvailable;
    };
    match record.vaa.filter(|vaa| !vaa.is_empty()) {
        Some(vaa) => {
            info!(
                "VAA available for sequence {} (tx {})",
                record.sequence.as_deref().unwrap_or("?"),
                record.tx_hash.as_deref().unwrap_or("?")
            );
            AttestationLookup::Available(vaa)
        }
        None => AttestationLookup::NotYetAvailable,
    }
}
