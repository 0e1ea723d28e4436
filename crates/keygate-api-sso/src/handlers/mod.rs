//! HTTP handlers for the SSO API.

pub mod admin;
pub mod cookie;
pub mod login;
