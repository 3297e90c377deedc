//! HTML rendering of the local archive.
//!
//! [`BodyTransformer`] turns one stored message body into a self-contained
//! fragment, [`Templates`] lays fragments out as documents, and
//! [`ArchiveRenderer`] walks the store to emit one document per conversation
//! plus an index.

mod archive;
mod templates;
mod transform;

pub use archive::{ArchiveRenderer, IndexEntry, RenderReport, SkippedConversation};
pub use templates::{RenderedMessage, Templates, DEFAULT_STYLESHEET, TIMESTAMP_FORMAT};
pub use transform::{sniff_image_mime, BodyTransformer};
