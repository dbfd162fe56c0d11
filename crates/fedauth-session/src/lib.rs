//! # fedauth-session
//!
//! Session persistence for federated sign-in.
//!
//! A [`SessionTicket`] is serialized to JSON and passed through a
//! [`TransformPipeline`] (raw DEFLATE, then AES-256-GCM under a rotating
//! key ring) before being written as one or more cookies by the
//! [`SessionCookieCodec`].
//!
//! ## Example
//!
//! ```
//! use fedauth_core::FederationConfig;
//! use fedauth_session::{SessionCookieCodec, SessionTicket};
//!
//! let codec = SessionCookieCodec::from_config(&FederationConfig::for_testing()).unwrap();
//! let ticket = SessionTicket::new("u1", "alice", None, codec.lifetime());
//! let value = codec.encode_value(&ticket).unwrap();
//! assert_eq!(codec.decode_value(&value).unwrap(), ticket);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod compression;
pub mod cookie;
pub mod error;
pub mod pipeline;
pub mod protection;
pub mod ticket;

pub use compression::DeflateStage;
pub use cookie::SessionCookieCodec;
pub use error::{SessionError, SessionResult, TransformError, TransformResult};
pub use pipeline::{PipelineVersion, TransformPipeline, TransformStage};
pub use protection::{key_ring_from_config, ProtectionStage};
pub use ticket::SessionTicket;
