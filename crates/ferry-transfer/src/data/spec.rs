use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default chunk size: 16 MiB.
pub const DEFAULT_CHUNK_SIZE: u64 = 16_777_216;

/// Default wall-clock budget for a single invocation.
pub const DEFAULT_TIME_BUDGET: Duration = Duration::from_secs(300);

/// Where the bytes come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceDescriptor {
    /// A file held by the managed storage provider, addressed by id.
    ManagedFile { id: String },
    /// Any HTTP(S) URL that honours `Range` requests.
    RemoteUrl { url: String },
}

impl SourceDescriptor {
    pub fn managed(id: impl Into<String>) -> Self {
        Self::ManagedFile { id: id.into() }
    }

    pub fn remote(url: impl Into<String>) -> Self {
        Self::RemoteUrl { url: url.into() }
    }

    /// Managed sources are fetched with the caller's credentials; remote URLs never are.
    pub fn is_managed(&self) -> bool {
        matches!(self, Self::ManagedFile { .. })
    }
}

/// Where the bytes go.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DestinationDescriptor {
    /// Session-initiation endpoint. Must carry `uploadType=resumable`, may carry `key=`.
    pub upload_url: String,
    /// Opaque metadata forwarded verbatim as the session-initiation body.
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl DestinationDescriptor {
    pub fn new(upload_url: impl Into<String>, metadata: serde_json::Value) -> Self {
        Self {
            upload_url: upload_url.into(),
            metadata,
        }
    }
}

/// Tunables for a single transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferConfig {
    pub chunk_size: u64,
    #[serde(with = "duration_secs")]
    pub time_budget: Duration,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            time_budget: DEFAULT_TIME_BUDGET,
        }
    }
}

impl TransferConfig {
    #[must_use]
    pub fn chunk_size(mut self, chunk_size: u64) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    #[must_use]
    pub fn time_budget(mut self, time_budget: Duration) -> Self {
        self.time_budget = time_budget;
        self
    }
}

/// Everything needed to start a transfer. Immutable once the run begins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferSpec {
    pub source: SourceDescriptor,
    pub destination: DestinationDescriptor,
    /// Bearer token. Required for managed sources and for destinations without an API key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default)]
    pub config: TransferConfig,
}

impl TransferSpec {
    pub fn new(source: SourceDescriptor, destination: DestinationDescriptor) -> Self {
        Self {
            source,
            destination,
            token: None,
            config: TransferConfig::default(),
        }
    }

    #[must_use]
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    #[must_use]
    pub fn config(mut self, config: TransferConfig) -> Self {
        self.config = config;
        self
    }

    /// Rejects specs that cannot possibly run.
    pub fn validate(&self) -> Result<()> {
        match &self.source {
            SourceDescriptor::ManagedFile { id } if id.trim().is_empty() => {
                return Err(Error::Validation("managed file id is empty".into()));
            }
            SourceDescriptor::RemoteUrl { url } if url.trim().is_empty() => {
                return Err(Error::Validation("source url is empty".into()));
            }
            SourceDescriptor::ManagedFile { .. } if self.token.is_none() => {
                return Err(Error::Validation(
                    "a credential token is required to read a managed file".into(),
                ));
            }
            _ => {}
        }
        if self.destination.upload_url.trim().is_empty() {
            return Err(Error::Validation("destination upload url is empty".into()));
        }
        if self.config.chunk_size == 0 {
            return Err(Error::Validation("chunk size must be greater than 0".into()));
        }
        Ok(())
    }

    /// Authorization header value built from the token, if any.
    pub fn bearer(&self) -> Option<String> {
        self.token.as_ref().map(|t| format!("Bearer {t}"))
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn destination() -> DestinationDescriptor {
        DestinationDescriptor::new(
            "https://upload.example.com/files?uploadType=resumable",
            json!({ "name": "movie.mp4" }),
        )
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = TransferConfig::default();
        assert_eq!(config.chunk_size, 16_777_216);
        assert_eq!(config.time_budget, Duration::from_secs(300));
    }

    #[test]
    fn managed_source_requires_token() {
        let spec = TransferSpec::new(SourceDescriptor::managed("abc"), destination());
        assert!(matches!(spec.validate(), Err(Error::Validation(_))));
        assert!(spec.token("t").validate().is_ok());
    }

    #[test]
    fn remote_source_needs_no_token() {
        let spec = TransferSpec::new(
            SourceDescriptor::remote("https://cdn.example.com/a.bin"),
            destination(),
        );
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        let spec = TransferSpec::new(
            SourceDescriptor::remote("https://cdn.example.com/a.bin"),
            destination(),
        )
        .config(TransferConfig::default().chunk_size(0));
        assert!(matches!(spec.validate(), Err(Error::Validation(_))));
    }

    #[test]
    fn spec_serializes_with_tagged_source() {
        let spec = TransferSpec::new(SourceDescriptor::managed("abc"), destination()).token("t");
        let value = serde_json::to_value(&spec).unwrap();
        assert_eq!(value["source"], json!({ "kind": "managed_file", "id": "abc" }));
        assert_eq!(value["config"]["time_budget"], json!(300));
        let back: TransferSpec = serde_json::from_value(value).unwrap();
        assert_eq!(back, spec);
    }
}
