use isolang::Language;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, RevoiceError};

/// An ISO 639-1 language code, optionally followed by a region subtag (`zh-CN`).
///
/// Codes are normalized on parse: the primary subtag is lowercased and the
/// region is uppercased, with `_` accepted as a separator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LanguageCode {
    code: String,
}

impl LanguageCode {
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(RevoiceError::Validation("Language code is empty".to_string()));
        }

        let mut parts = trimmed.splitn(2, ['-', '_']);
        let primary = parts.next().unwrap_or_default().to_lowercase();
        let region = parts.next().map(|r| r.to_uppercase());

        if primary.len() != 2 || Language::from_639_1(&primary).is_none() {
            return Err(RevoiceError::Validation(format!(
                "Invalid language code: {}",
                input
            )));
        }

        let code = match region {
            Some(region) if !region.is_empty() && region.chars().all(|c| c.is_ascii_alphanumeric()) => {
                format!("{}-{}", primary, region)
            }
            Some(_) => {
                return Err(RevoiceError::Validation(format!(
                    "Invalid region in language code: {}",
                    input
                )));
            }
            None => primary,
        };

        Ok(Self { code })
    }

    /// Accept what a recognizer reports: a code ("en") or an English name ("english")
    pub fn from_detected(input: &str) -> Option<Self> {
        if let Ok(code) = Self::parse(input) {
            return Some(code);
        }

        let name = input
            .split_whitespace()
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                    None => String::new(),
                }
            })
            .collect::<Vec<String>>()
            .join(" ");

        Language::from_name(&name)
            .and_then(|lang| lang.to_639_1())
            .and_then(|code| Self::parse(code).ok())
    }

    pub fn as_str(&self) -> &str {
        &self.code
    }

    /// The two-letter primary subtag
    pub fn primary(&self) -> &str {
        self.code.split('-').next().unwrap_or(&self.code)
    }

    /// English name of the language, used in translation prompts
    pub fn name(&self) -> &'static str {
        Language::from_639_1(self.primary())
            .map(|lang| lang.to_name())
            .unwrap_or("Unknown")
    }

    /// Same language, ignoring region
    pub fn same_language(&self, other: &LanguageCode) -> bool {
        self.primary() == other.primary()
    }
}

impl fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code)
    }
}

impl FromStr for LanguageCode {
    type Err = RevoiceError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for LanguageCode {
    type Error = RevoiceError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<LanguageCode> for String {
    fn from(code: LanguageCode) -> Self {
        code.code
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_normalizes() {
        assert_eq!(LanguageCode::parse(" HI ").unwrap().as_str(), "hi");
        assert_eq!(LanguageCode::parse("zh_cn").unwrap().as_str(), "zh-CN");
        assert_eq!(LanguageCode::parse("pt-br").unwrap().primary(), "pt");
    }

    #[test]
    fn test_parse_rejects_unknown() {
        assert!(matches!(LanguageCode::parse(""), Err(RevoiceError::Validation(_))));
        assert!(LanguageCode::parse("xx").is_err());
        assert!(LanguageCode::parse("english").is_err());
        assert!(LanguageCode::parse("en-").is_err());
    }

    #[test]
    fn test_from_detected_accepts_names_and_codes() {
        let detected = |s: &str| LanguageCode::from_detected(s).map(|l| l.to_string());
        assert_eq!(detected("english").as_deref(), Some("en"));
        assert_eq!(detected("SPANISH").as_deref(), Some("es"));
        assert_eq!(detected("Hindi").as_deref(), Some("hi"));
        assert_eq!(detected("fr").as_deref(), Some("fr"));
        assert_eq!(detected("elvish"), None);
        assert_eq!(detected(""), None);
    }

    #[test]
    fn test_name_and_comparison() {
        let hindi = LanguageCode::parse("hi").unwrap();
        assert_eq!(hindi.name(), "Hindi");

        let zh_cn = LanguageCode::parse("zh-CN").unwrap();
        let zh_tw = LanguageCode::parse("zh-TW").unwrap();
        assert!(zh_cn.same_language(&zh_tw));
        assert_ne!(zh_cn, zh_tw);
    }
}
