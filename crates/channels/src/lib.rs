//! Frame transport implementations for LookOut.
//!
//! A transport delivers camera frames as byte streams and small JSON packets
//! (location updates) to the handlers a session registers.
//!
//! Available transports:
//! - **Local**: in-process room over tokio channels (tests, `lookout replay`)

pub mod local;

pub use local::{LocalStreamReader, LocalStreamWriter, LocalTransport};
