//! Sources that can report their size and serve arbitrary byte ranges.

use std::future::Future;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use url::Url;

use super::http::{HttpClient, HttpRequest, HttpResponse};
use crate::core::{disposition_file_name, is_success, mime_type, parse_content_range};
use crate::data::{ByteRange, ResolvedSource, SourceDescriptor};
use crate::error::{Error, Result};

/// MIME prefix of provider-native documents, which have no byte representation.
pub const NATIVE_MIME_PREFIX: &str = "application/vnd.google-apps";

/// A source the engine can size up once and then read range by range.
pub trait RangeFetchable {
    /// Learn size, type and name of the source.
    ///
    /// `started_at` names sources that do not announce a file name.
    fn probe(&self, started_at: DateTime<Utc>) -> impl Future<Output = Result<ResolvedSource>> + Send;

    /// Download exactly the bytes of `range`.
    fn fetch_range(&self, range: ByteRange) -> impl Future<Output = Result<Bytes>> + Send;
}

/// Metadata fields requested from the managed storage provider.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileMetadata {
    mime_type: String,
    #[serde(default)]
    size: Option<SizeField>,
    #[serde(default)]
    name: Option<String>,
}

/// The provider reports sizes as decimal strings; accept plain numbers too.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SizeField {
    Number(u64),
    Text(String),
}

impl SizeField {
    fn bytes(&self) -> Option<u64> {
        match self {
            SizeField::Number(n) => Some(*n),
            SizeField::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// A file in managed storage. Every request carries the bearer credential.
pub struct ManagedFileSource<'a, C> {
    client: &'a C,
    metadata_url: String,
    media_url: String,
    bearer: Option<String>,
}

impl<'a, C: HttpClient> ManagedFileSource<'a, C> {
    pub fn new(client: &'a C, files_url: &str, id: &str, bearer: Option<String>) -> Result<Self> {
        let mut file_url = Url::parse(files_url)
            .map_err(|e| Error::Validation(format!("invalid managed files url '{files_url}': {e}")))?;
        file_url
            .path_segments_mut()
            .map_err(|()| Error::Validation(format!("managed files url '{files_url}' cannot take a path")))?
            .pop_if_empty()
            .push(id);
        file_url.query_pairs_mut().append_pair("supportsAllDrives", "true");

        let mut metadata_url = file_url.clone();
        metadata_url.query_pairs_mut().append_pair("fields", "mimeType,size,name");
        let mut media_url = file_url;
        media_url.query_pairs_mut().append_pair("alt", "media");

        Ok(Self {
            client,
            metadata_url: metadata_url.into(),
            media_url: media_url.into(),
            bearer,
        })
    }
}

impl<C: HttpClient> RangeFetchable for ManagedFileSource<'_, C> {
    async fn probe(&self, _started_at: DateTime<Utc>) -> Result<ResolvedSource> {
        let request = HttpRequest::get(&self.metadata_url).header_opt("Authorization", self.bearer.as_deref());
        let response = send(self.client, request).await?;
        if !is_success(response.status) {
            return Err(Error::Download {
                status: response.status,
                body: response.text(),
            });
        }

        let metadata: FileMetadata = serde_json::from_slice(&response.body)
            .map_err(|e| Error::InvalidResponse(format!("file metadata: {e}")))?;
        if metadata.mime_type.starts_with(NATIVE_MIME_PREFIX) {
            return Err(Error::UnsupportedSourceKind {
                mime_type: metadata.mime_type,
            });
        }
        let Some(size_bytes) = metadata.size.as_ref().and_then(SizeField::bytes) else {
            return Err(Error::UnsupportedSourceKind {
                mime_type: metadata.mime_type,
            });
        };

        Ok(ResolvedSource {
            mime_type: metadata.mime_type,
            size_bytes,
            file_name: metadata.name,
        })
    }

    async fn fetch_range(&self, range: ByteRange) -> Result<Bytes> {
        let request = HttpRequest::get(&self.media_url)
            .header("Range", range.range_header())
            .header_opt("Authorization", self.bearer.as_deref());
        read_range(send(self.client, request).await?, range)
    }
}

/// A plain URL. Never sent credentials.
pub struct RemoteUrlSource<'a, C> {
    client: &'a C,
    url: &'a str,
}

impl<'a, C: HttpClient> RemoteUrlSource<'a, C> {
    pub fn new(client: &'a C, url: &'a str) -> Self {
        Self { client, url }
    }
}

impl<C: HttpClient> RangeFetchable for RemoteUrlSource<'_, C> {
    async fn probe(&self, started_at: DateTime<Utc>) -> Result<ResolvedSource> {
        let request = HttpRequest::get(self.url).header("Range", "bytes=0-1");
        let response = send(self.client, request).await?;
        if response.status != 206 {
            return Err(Error::RangeUnsupported(format!(
                "probe of {} answered {} instead of 206 Partial Content",
                self.url, response.status
            )));
        }
        let content_range = response
            .header_value("Content-Range")
            .ok_or_else(|| Error::RangeUnsupported(format!("{} sent no Content-Range header", self.url)))?;
        let size_bytes = parse_content_range(content_range)
            .and_then(|r| r.total)
            .ok_or_else(|| {
                Error::RangeUnsupported(format!(
                    "{} sent an unusable Content-Range '{content_range}'",
                    self.url
                ))
            })?;

        let file_name = response
            .header_value("Content-Disposition")
            .and_then(disposition_file_name)
            .unwrap_or_else(|| started_at.timestamp_millis().to_string());

        Ok(ResolvedSource {
            mime_type: mime_type(response.header_value("Content-Type")),
            size_bytes,
            file_name: Some(file_name),
        })
    }

    async fn fetch_range(&self, range: ByteRange) -> Result<Bytes> {
        let request = HttpRequest::get(self.url).header("Range", range.range_header());
        read_range(send(self.client, request).await?, range)
    }
}

/// Adapter chosen by [`SourceDescriptor`] variant.
pub enum Source<'a, C> {
    Managed(ManagedFileSource<'a, C>),
    Remote(RemoteUrlSource<'a, C>),
}

impl<'a, C: HttpClient> Source<'a, C> {
    pub fn new(
        client: &'a C,
        descriptor: &'a SourceDescriptor,
        bearer: Option<String>,
        managed_files_url: &str,
    ) -> Result<Self> {
        Ok(match descriptor {
            SourceDescriptor::ManagedFile { id } => {
                Source::Managed(ManagedFileSource::new(client, managed_files_url, id, bearer)?)
            }
            SourceDescriptor::RemoteUrl { url } => Source::Remote(RemoteUrlSource::new(client, url)),
        })
    }
}

impl<C: HttpClient> RangeFetchable for Source<'_, C> {
    async fn probe(&self, started_at: DateTime<Utc>) -> Result<ResolvedSource> {
        match self {
            Source::Managed(s) => s.probe(started_at).await,
            Source::Remote(s) => s.probe(started_at).await,
        }
    }

    async fn fetch_range(&self, range: ByteRange) -> Result<Bytes> {
        match self {
            Source::Managed(s) => s.fetch_range(range).await,
            Source::Remote(s) => s.fetch_range(range).await,
        }
    }
}

pub(crate) async fn send<C: HttpClient>(client: &C, request: HttpRequest) -> Result<HttpResponse> {
    tracing::debug!(method = %request.method, url = %request.url, "sending request");
    client
        .send(request)
        .await
        .map_err(|e| Error::Network(e.to_string()))
}

fn read_range(response: HttpResponse, range: ByteRange) -> Result<Bytes> {
    if !is_success(response.status) {
        return Err(Error::Download {
            status: response.status,
            body: response.text(),
        });
    }
    let actual = response.body.len() as u64;
    if actual != range.len() {
        return Err(Error::RangeMismatch {
            expected: range.len(),
            actual,
        });
    }
    Ok(response.body)
}
