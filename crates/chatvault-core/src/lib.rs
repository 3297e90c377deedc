//! chatvault-core - Core library for chatvault
//!
//! Incrementally mirrors Microsoft Teams chats into a local archive and
//! renders that archive as self-contained HTML. The CLI is a thin layer over
//! [`sync::MessageSynchronizer`] and [`render::ArchiveRenderer`].

pub mod config;
pub mod error;
pub mod hosted;
pub mod markup;
pub mod models;
pub mod remote;
pub mod render;
pub mod store;
pub mod sync;
pub mod util;

pub use config::ArchiveConfig;
pub use error::{Error, Result};
pub use models::{Attachment, AttachmentKind, Conversation, HostedContent, HostedContentId, Message};
pub use remote::{ChatSource, GraphClient};
pub use store::{ArchiveStore, StoreKey};
