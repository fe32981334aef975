//! I/O behind traits: HTTP, sources, destinations, checkpoint storage and time.
//!
//! The engine is written against these traits only, so every effect can be
//! swapped for a scripted double in tests.

pub mod clock;
pub mod destination;
pub mod http;
pub mod source;
pub mod store;

pub use clock::{Clock, SystemClock};
pub use destination::{ChunkReply, ResumableDestination, ResumableUploadable};
#[cfg(feature = "reqwest")]
pub use http::ReqwestClient;
pub use http::{HttpClient, HttpRequest, HttpResponse, Method};
pub use source::{
    ManagedFileSource, NATIVE_MIME_PREFIX, RangeFetchable, RemoteUrlSource, Source,
};
pub use store::{CheckpointStore, MemoryStore};
