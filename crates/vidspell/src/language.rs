use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Language mode a video is analysed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    /// Standard English; spelling flags are dictionary cross-checked.
    #[serde(rename = "en", alias = "english")]
    En,
    /// Romanized Hindi ("Hinglish"); no dictionary, captions go to human review.
    #[serde(rename = "hi-latin", alias = "hinglish")]
    HiLatin,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::HiLatin => "hi-latin",
        }
    }

    /// Language hint handed to the speech-to-text engine.
    pub fn speech_hint(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::HiLatin => "hi",
        }
    }

    pub fn is_english(&self) -> bool {
        matches!(self, Language::En)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" | "english" => Ok(Language::En),
            "hi-latin" | "hinglish" => Ok(Language::HiLatin),
            other => Err(format!("Unsupported language mode: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_codes_and_aliases() {
        assert_eq!("en".parse::<Language>().unwrap(), Language::En);
        assert_eq!("English".parse::<Language>().unwrap(), Language::En);
        assert_eq!("hi-latin".parse::<Language>().unwrap(), Language::HiLatin);
        assert_eq!("hinglish".parse::<Language>().unwrap(), Language::HiLatin);
        assert!("fr".parse::<Language>().is_err());
    }

    #[test]
    fn test_speech_hint() {
        assert_eq!(Language::En.speech_hint(), "en");
        assert_eq!(Language::HiLatin.speech_hint(), "hi");
    }

    #[test]
    fn test_serde_roundtrip_uses_codes() {
        assert_eq!(
            serde_json::to_string(&Language::HiLatin).unwrap(),
            "\"hi-latin\""
        );
        let parsed: Language = serde_json::from_str("\"hinglish\"").unwrap();
        assert_eq!(parsed, Language::HiLatin);
    }
}
