//! HTTP-level middleware shared by every service router.

pub mod security;

pub use security::security_headers;
