//! Pure transformations: chunk planning, URL and header parsing, status
//! classification. Nothing in here performs I/O.

mod headers;
mod plan;
mod query;
mod status;

pub use headers::{
    ContentRange, DEFAULT_MIME_TYPE, disposition_file_name, mime_type, parse_content_range,
};
pub use plan::{CHUNK_GRANULARITY, plan_chunks};
pub use query::{ParsedUrl, QueryValue, parse_query_parameters};
pub use status::{RESUME_INCOMPLETE, UploadStatus, classify_upload_status, is_success};
