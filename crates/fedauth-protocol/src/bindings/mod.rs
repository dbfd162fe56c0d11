//! Transport bindings that deliver signed tokens.
//!
//! - **WS-Federation passive POST**: `wa`, `wresult` and `wctx` form fields

mod wsfed_post;

pub use wsfed_post::*;
