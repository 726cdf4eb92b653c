//! Conversation context: the shared store and the frame fuser that writes to it.
//!
//! | Writer | Path |
//! |--------|------|
//! | Ingestion tasks | [`ContextFuser::fuse_image`] → [`ContextStore::append`] |
//! | Session start | [`ContextStore::append`] (standing instructions) |
//! | Response engine | [`ContextStore::snapshot`] → [`ContextStore::replace`] |

pub mod fuser;
pub mod store;

pub use fuser::{ContextFuser, encode_image, sniff_mime};
pub use store::{ContextStore, StaleContext};
