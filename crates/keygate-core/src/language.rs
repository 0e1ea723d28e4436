//! Language inference for accounts created on first federated login.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// UI language stored on a local account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    #[serde(rename = "zh-CN")]
    ZhCn,
    #[default]
    #[serde(rename = "en-US")]
    EnUs,
}

impl Language {
    /// Infer the language from a raw `Accept-Language` header value.
    ///
    /// Simplified Chinese is chosen whenever `zh-CN` appears anywhere in the
    /// header, regardless of its quality weight. Everything else, including a
    /// missing header, falls back to `en-US`.
    #[must_use]
    pub fn from_accept_language(header: Option<&str>) -> Self {
        match header {
            Some(value) if value.contains("zh-CN") => Self::ZhCn,
            _ => Self::EnUs,
        }
    }

    /// BCP 47 tag as persisted on the account.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ZhCn => "zh-CN",
            Self::EnUs => "en-US",
        }
    }
}

impl Display for Language {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zh_cn_anywhere_in_header() {
        assert_eq!(
            Language::from_accept_language(Some("en-US,en;q=0.9,zh-CN;q=0.8")),
            Language::ZhCn
        );
    }

    #[test]
    fn test_other_languages_fall_back_to_english() {
        assert_eq!(
            Language::from_accept_language(Some("zh-TW,fr;q=0.5")),
            Language::EnUs
        );
        assert_eq!(Language::from_accept_language(None), Language::EnUs);
    }

    #[test]
    fn test_serde_uses_bcp47_tags() {
        assert_eq!(serde_json::to_string(&Language::ZhCn).unwrap(), "\"zh-CN\"");
        assert_eq!(Language::EnUs.to_string(), "en-US");
    }
}
