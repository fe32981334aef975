/// Status a resumable-upload server sends when it wants the next chunk.
pub const RESUME_INCOMPLETE: u16 = 308;

/// How the destination answered a chunk upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStatus {
    /// 2xx: the object is complete and the body carries its metadata.
    Complete,
    /// 308: chunk accepted, send the next one.
    Continue,
    /// Anything else.
    Rejected,
}

pub fn classify_upload_status(status: u16) -> UploadStatus {
    match status {
        200..=299 => UploadStatus::Complete,
        RESUME_INCOMPLETE => UploadStatus::Continue,
        _ => UploadStatus::Rejected,
    }
}

pub fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}
