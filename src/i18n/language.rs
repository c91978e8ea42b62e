use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::str::FromStr;
use unic_langid::{langid, LanguageIdentifier};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SupportedLanguage {
    #[default]
    #[serde(rename = "en")]
    English,
    #[serde(rename = "tr")]
    Turkish,
}

impl SupportedLanguage {
    pub fn all() -> &'static [SupportedLanguage] {
        &[SupportedLanguage::English, SupportedLanguage::Turkish]
    }

    pub fn code(&self) -> &'static str {
        match self {
            SupportedLanguage::English => "en",
            SupportedLanguage::Turkish => "tr",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SupportedLanguage::English => "English",
            SupportedLanguage::Turkish => "Türkçe",
        }
    }

    /// Language identifier used by Fluent for plural rules
    pub fn lang_id(&self) -> LanguageIdentifier {
        match self {
            SupportedLanguage::English => langid!("en-US"),
            SupportedLanguage::Turkish => langid!("tr"),
        }
    }

    /// Parse from Accept-Language header, falling back to `fallback`
    pub fn from_accept_language(accept_language: &str, fallback: SupportedLanguage) -> Self {
        for lang_part in accept_language.split(',') {
            let lang = lang_part.trim().split(';').next().unwrap_or("");
            let lang = lang.to_lowercase();

            if lang.starts_with("tr") {
                return SupportedLanguage::Turkish;
            } else if lang.starts_with("en") {
                return SupportedLanguage::English;
            }
        }

        fallback
    }
}

impl Display for SupportedLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for SupportedLanguage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "en" | "english" | "en-us" | "en-gb" => Ok(SupportedLanguage::English),
            "tr" | "turkish" | "türkçe" | "tr-tr" => Ok(SupportedLanguage::Turkish),
            _ => Err(format!("Unsupported language: {}", s)),
        }
    }
}
