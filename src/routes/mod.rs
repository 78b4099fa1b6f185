//! Router Module Index
//!
//! Routes grouped by who may reach them. Unlike a per-group layer, the gateway wraps the whole
//! router and decides access from the path, so these groups document intent and keep the URL
//! prefixes in one place per audience.

/// Routes open to anonymous callers (login, logout, registration, health).
pub mod public;

/// Routes under `/api/private` that any authenticated role may call.
pub mod authenticated;

/// Routes under `/api/private/admin`, restricted to ADMIN by the access policy.
pub mod admin;
