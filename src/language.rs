use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

/// Caption language. Controls the font family used when burning text into an
/// image and filters the caption feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    English,
    Urdu,
    Roman,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::English => "english",
            Language::Urdu => "urdu",
            Language::Roman => "roman",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "english" => Ok(Language::English),
            "urdu" => Ok(Language::Urdu),
            "roman" => Ok(Language::Roman),
            other => Err(anyhow!(
                "unknown language '{}' (expected english, urdu, or roman)",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_languages() {
        assert_eq!("english".parse::<Language>().unwrap(), Language::English);
        assert_eq!(" Urdu ".parse::<Language>().unwrap(), Language::Urdu);
        assert_eq!("ROMAN".parse::<Language>().unwrap(), Language::Roman);
    }

    #[test]
    fn rejects_unknown_language() {
        assert!("french".parse::<Language>().is_err());
    }

    #[test]
    fn serializes_lowercase() {
        let json = serde_json::to_string(&Language::Urdu).unwrap();
        assert_eq!(json, "\"urdu\"");
    }
}
