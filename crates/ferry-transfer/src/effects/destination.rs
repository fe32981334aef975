//! Destinations speaking the resumable-upload protocol.

use std::future::Future;

use bytes::Bytes;
use serde_json::Value;

use super::http::{HttpClient, HttpRequest, HttpResponse};
use super::source::send;
use crate::core::{UploadStatus, classify_upload_status, is_success, parse_query_parameters};
use crate::data::{ByteRange, DestinationDescriptor, ResolvedSource, Session};
use crate::error::{Error, Result};

/// What the destination said about an uploaded chunk.
#[derive(Debug, Clone, PartialEq)]
pub enum ChunkReply {
    /// Upload finished; carries the destination's metadata for the new object.
    Complete(Value),
    /// Chunk stored, the next one is expected.
    Continue,
}

/// A destination that accepts an object as a sequence of ordered chunks.
pub trait ResumableUploadable {
    /// Negotiate a session for an object described by `source`.
    fn open_session(&self, source: &ResolvedSource) -> impl Future<Output = Result<Session>> + Send;

    /// Upload chunk `index`, covering `range` of a `total`-byte object.
    fn upload_chunk(
        &self,
        session: &Session,
        index: usize,
        range: ByteRange,
        total: u64,
        body: Bytes,
    ) -> impl Future<Output = Result<ChunkReply>> + Send;

    /// Close a session for a zero-byte object.
    fn finalize_empty(&self, session: &Session) -> impl Future<Output = Result<ChunkReply>> + Send;
}

/// Session-URI based resumable upload, as served by the managed storage,
/// video hosting and file ingestion APIs.
pub struct ResumableDestination<'a, C> {
    client: &'a C,
    descriptor: &'a DestinationDescriptor,
    bearer: Option<String>,
}

impl<'a, C: HttpClient> ResumableDestination<'a, C> {
    pub fn new(client: &'a C, descriptor: &'a DestinationDescriptor, bearer: Option<String>) -> Self {
        Self {
            client,
            descriptor,
            bearer,
        }
    }

    /// Credential for the initiating request. A `key=` parameter in the URL
    /// authenticates on its own, so no bearer header is sent with it.
    fn session_authorization(&self) -> Result<Option<&str>> {
        let parsed = parse_query_parameters(&self.descriptor.upload_url)?;
        if !parsed.declares_resumable() {
            return Err(Error::Configuration(format!(
                "'{}' does not declare uploadType=resumable",
                parsed.base
            )));
        }
        if parsed.has_api_key() {
            return Ok(None);
        }
        match self.bearer.as_deref() {
            Some(bearer) => Ok(Some(bearer)),
            None => Err(Error::Configuration(
                "destination carries no API key and no credential token was supplied".into(),
            )),
        }
    }

    async fn put(&self, session: &Session, index: usize, content_range: String, body: Bytes) -> Result<ChunkReply> {
        let request = HttpRequest::put(&session.location)
            .header("Content-Range", content_range)
            .body(body);
        let response = send(self.client, request).await?;
        chunk_reply(index, response)
    }
}

impl<C: HttpClient> ResumableUploadable for ResumableDestination<'_, C> {
    async fn open_session(&self, source: &ResolvedSource) -> Result<Session> {
        let authorization = self.session_authorization()?;
        let metadata = serde_json::to_vec(&self.descriptor.metadata)
            .map_err(|e| Error::Validation(format!("destination metadata: {e}")))?;

        let request = HttpRequest::post(&self.descriptor.upload_url)
            .header("Content-Type", "application/json; charset=UTF-8")
            .header("X-Upload-Content-Type", source.mime_type.as_str())
            .header("X-Upload-Content-Length", source.size_bytes.to_string())
            .header_opt("Authorization", authorization)
            .body(metadata);
        let response = send(self.client, request).await?;

        if !is_success(response.status) {
            return Err(Error::Session {
                status: response.status,
                body: response.text(),
            });
        }
        let location = response
            .header_value("Location")
            .filter(|l| !l.trim().is_empty())
            .ok_or_else(|| Error::Session {
                status: response.status,
                body: "response carried no Location header".into(),
            })?;

        Ok(Session {
            location: location.trim().to_string(),
        })
    }

    async fn upload_chunk(
        &self,
        session: &Session,
        index: usize,
        range: ByteRange,
        total: u64,
        body: Bytes,
    ) -> Result<ChunkReply> {
        self.put(session, index, range.content_range(total), body).await
    }

    async fn finalize_empty(&self, session: &Session) -> Result<ChunkReply> {
        self.put(session, 0, "bytes */0".to_string(), Bytes::new()).await
    }
}

fn chunk_reply(index: usize, response: HttpResponse) -> Result<ChunkReply> {
    match classify_upload_status(response.status) {
        UploadStatus::Complete => {
            if response.body.iter().all(u8::is_ascii_whitespace) {
                return Ok(ChunkReply::Complete(Value::Null));
            }
            serde_json::from_slice(&response.body)
                .map(ChunkReply::Complete)
                .map_err(|e| Error::InvalidResponse(format!("final upload response is not JSON: {e}")))
        }
        UploadStatus::Continue => Ok(ChunkReply::Continue),
        UploadStatus::Rejected => Err(Error::Transfer {
            index,
            status: response.status,
            body: response.text(),
        }),
    }
}
