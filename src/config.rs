//! Configuration for Signet
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Default token lifetime in hours
pub const DEFAULT_TOKEN_TTL_HOURS: i64 = 24;

/// Signet - signature-token service for claim document signing
#[derive(Parser, Debug, Clone)]
#[command(name = "signet")]
#[command(about = "Signature-token service for not-at-fault claim cases")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "signet")]
    pub mongodb_db: String,

    /// Directory for encrypted signed-document files
    #[arg(long, env = "STORAGE_ROOT", default_value = "./storage/signed")]
    pub storage_root: PathBuf,

    /// Public base URL used to build prefilled form links
    /// (e.g. "https://claims.example.com")
    #[arg(long, env = "PUBLIC_URL", default_value = "http://localhost:8080")]
    pub public_url: String,

    /// Active document encryption key, 32 bytes hex (required in production)
    #[arg(long, env = "DOCUMENT_KEY")]
    pub document_key: Option<String>,

    /// Version number of the active document key
    #[arg(long, env = "DOCUMENT_KEY_VERSION", default_value = "1")]
    pub document_key_version: u32,

    /// Retired document keys as "version:hex" pairs, comma separated
    /// (e.g. "1:aabb...,2:ccdd..."). Kept so documents encrypted before a
    /// rotation remain decryptable.
    #[arg(long, env = "DOCUMENT_KEYS_PREVIOUS")]
    pub document_keys_previous: Option<String>,

    /// Token time-to-live in hours
    #[arg(long, env = "TOKEN_TTL_HOURS", default_value_t = DEFAULT_TOKEN_TTL_HOURS)]
    pub token_ttl_hours: i64,

    /// HTTP email API endpoint for completion notifications
    /// (e.g. "https://api.mailer.example.com/v1/send"). Unset disables email.
    #[arg(long, env = "EMAIL_API_URL")]
    pub email_api_url: Option<String>,

    /// Bearer token for the email API
    #[arg(long, env = "EMAIL_API_KEY")]
    pub email_api_key: Option<String>,

    /// From address for completion notifications
    #[arg(long, env = "EMAIL_FROM", default_value = "claims@example.com")]
    pub email_from: String,

    /// API key required for token issuance and document retrieval
    #[arg(long, env = "API_KEY")]
    pub api_key: Option<String>,

    /// Enable development mode (no API key required, generated document key)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Parse the retired-key list into (version, hex) pairs
    pub fn previous_keys(&self) -> Result<Vec<(u32, String)>, String> {
        let Some(ref raw) = self.document_keys_previous else {
            return Ok(Vec::new());
        };

        let mut keys = Vec::new();
        for entry in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let (version, hex_key) = entry
                .split_once(':')
                .ok_or_else(|| format!("Invalid key entry '{}': expected version:hex", entry))?;
            let version: u32 = version
                .parse()
                .map_err(|_| format!("Invalid key version '{}'", version))?;
            keys.push((version, hex_key.to_string()));
        }
        Ok(keys)
    }

    /// All configured keys by version, active key included
    pub fn key_table(&self) -> Result<HashMap<u32, String>, String> {
        let mut table: HashMap<u32, String> = self.previous_keys()?.into_iter().collect();
        if let Some(ref active) = self.document_key {
            table.insert(self.document_key_version, active.clone());
        }
        Ok(table)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.dev_mode {
            if self.document_key.is_none() {
                return Err("DOCUMENT_KEY is required in production mode".to_string());
            }
            if self.api_key.is_none() {
                return Err("API_KEY is required in production mode".to_string());
            }
        }

        let table = self.key_table()?;
        for (version, hex_key) in &table {
            let decoded = hex::decode(hex_key)
                .map_err(|_| format!("Document key v{} is not valid hex", version))?;
            if decoded.len() != 32 {
                return Err(format!(
                    "Document key v{} must be 32 bytes, got {}",
                    version,
                    decoded.len()
                ));
            }
        }

        if self.token_ttl_hours <= 0 {
            return Err("TOKEN_TTL_HOURS must be positive".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> Args {
        Args::parse_from(["signet", "--dev-mode"])
    }

    #[test]
    fn test_defaults_valid_in_dev_mode() {
        let args = base_args();
        assert!(args.validate().is_ok());
        assert_eq!(args.token_ttl_hours, DEFAULT_TOKEN_TTL_HOURS);
    }

    #[test]
    fn test_production_requires_document_key() {
        let mut args = base_args();
        args.dev_mode = false;
        args.api_key = Some("k".into());
        assert!(args.validate().is_err());

        args.document_key = Some(hex::encode([7u8; 32]));
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_rejects_short_key() {
        let mut args = base_args();
        args.document_key = Some(hex::encode([7u8; 16]));
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_previous_keys_parsing() {
        let mut args = base_args();
        args.document_key = Some(hex::encode([1u8; 32]));
        args.document_key_version = 3;
        args.document_keys_previous =
            Some(format!("1:{},2:{}", hex::encode([2u8; 32]), hex::encode([3u8; 32])));

        let table = args.key_table().unwrap();
        assert_eq!(table.len(), 3);
        assert!(table.contains_key(&1) && table.contains_key(&2) && table.contains_key(&3));
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_malformed_previous_keys_rejected() {
        let mut args = base_args();
        args.document_keys_previous = Some("no-colon-here".into());
        assert!(args.previous_keys().is_err());
    }
}
