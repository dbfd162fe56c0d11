//! End-to-End Integration Tests
//!
//! These tests drive the complete sign-in router with mock token
//! validation and identity linking collaborators.

mod common;
mod session_endpoint;
mod signin_endpoint;
