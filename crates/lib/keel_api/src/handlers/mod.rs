//! Ready-made handlers for routes every service exposes.

pub mod auth;
