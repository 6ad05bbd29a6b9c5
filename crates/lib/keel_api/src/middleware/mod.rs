//! Request middleware: correlation ids and the authentication gate.

pub mod auth;
pub mod correlation;
