//! Security utilities.
//!
//! Credential scrubbing keeps Vault tokens, service account JWTs and AWS
//! keys out of log output and error messages.

pub mod credential_scrubber;

pub use credential_scrubber::{safe_error_message, scrub_credentials};
