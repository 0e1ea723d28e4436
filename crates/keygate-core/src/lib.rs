//! keygate Core Library
//!
//! Shared types for the keygate SSO broker.
//!
//! # Modules
//!
//! - [`ids`] - Strongly typed identifiers (ProviderId, LoginSessionId)
//! - [`language`] - Browser language inference for provisioned accounts
//!
//! # Example
//!
//! ```
//! use keygate_core::{Language, ProviderId};
//!
//! let provider = ProviderId::new();
//! let language = Language::from_accept_language(Some("zh-CN,zh;q=0.9"));
//! assert_eq!(language, Language::ZhCn);
//! # let _ = provider;
//! ```

pub mod ids;
pub mod language;

pub use ids::{LoginSessionId, ParseIdError, ProviderId};
pub use language::Language;
