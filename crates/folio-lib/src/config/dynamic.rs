use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DynamicConfig {
    pub timeout: u32,
    #[serde(rename = "tLSHandshakeTimeout")]
    pub tls_handshake_timeout: u32,
    #[serde(rename = "idleConnTimeout")]
    pub idle_conn_timeout: u32,
    #[serde(rename = "maxIdleConnsPerHost")]
    pub max_idle_conns_per_host: u32,
    #[serde(rename = "dropboxTokenUrl")]
    pub dropbox_token_url: String,
    #[serde(rename = "dropboxApiUrl")]
    pub dropbox_api_url: String,
    #[serde(rename = "dropboxContentUrl")]
    pub dropbox_content_url: String,
    /// Folder listed and uploaded into; the empty string is the account root.
    #[serde(rename = "galleryFolder")]
    pub gallery_folder: String,
    #[serde(rename = "galleryPasscode")]
    pub gallery_passcode: String,
    #[serde(rename = "maxAuthRetries")]
    pub max_auth_retries: u32,
    /// Seconds a gallery notification stays visible.
    #[serde(rename = "notificationTtl")]
    pub notification_ttl: u32,
    #[serde(rename = "cacheVersion")]
    pub cache_version: String,
    #[serde(rename = "siteOrigin")]
    pub site_origin: String,
    #[serde(rename = "coreAssets")]
    pub core_assets: Vec<String>,
}

impl Default for DynamicConfig {
    fn default() -> Self {
        Self {
            timeout: 30,
            tls_handshake_timeout: 10,
            idle_conn_timeout: 90,
            max_idle_conns_per_host: 100,
            dropbox_token_url: "https://api.dropbox.com/oauth2/token".into(),
            dropbox_api_url: "https://api.dropboxapi.com".into(),
            dropbox_content_url: "https://content.dropboxapi.com".into(),
            gallery_folder: String::new(),
            gallery_passcode: "1234".into(),
            max_auth_retries: 1,
            notification_ttl: 3,
            cache_version: "folio-portfolio-v4".into(),
            site_origin: "http://localhost:5173".into(),
            core_assets: vec![
                "/".into(),
                "/index.html".into(),
                "/manifest.json".into(),
                "/icon.png".into(),
            ],
        }
    }
}

impl DynamicConfig {
    /// Resolve the configured core asset paths against `site_origin`.
    pub fn core_asset_urls(&self) -> Vec<String> {
        let origin = self.site_origin.trim_end_matches('/');
        self.core_assets
            .iter()
            .map(|asset| {
                if asset.starts_with("http://") || asset.starts_with("https://") {
                    asset.clone()
                } else {
                    format!("{origin}/{}", asset.trim_start_matches('/'))
                }
            })
            .collect()
    }
}
