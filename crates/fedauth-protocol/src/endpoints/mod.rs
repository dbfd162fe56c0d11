//! HTTP endpoints for federated sign-in.
//!
//! - **Sign-in** - receives the identity provider's form post
//! - **Session** - reports the session carried by the request cookies
//!
//! # Example
//!
//! ```rust,ignore
//! use fedauth_protocol::endpoints::{federation_router, FederationState};
//!
//! let app = federation_router(orchestrator.app_root())
//!     .with_state(FederationState::new(orchestrator, cookies));
//! ```

mod router;
mod session;
mod signin;
mod state;

pub use router::*;
pub use session::*;
pub use signin::*;
pub use state::*;
