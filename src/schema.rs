//! The prompt/parser contract.
//!
//! The prompt template in [`crate::prompts`] and the field matchers in
//! [`crate::extract`] both read their key names and label strings from here.
//! Changing anything in this module changes what the model is asked to emit
//! *and* what the extractor looks for, so bump [`SCHEMA_VERSION`] with it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Version of the prompt/parser contract.
pub const SCHEMA_VERSION: u32 = 1;

pub const KEY_TITLE: &str = "title";
pub const KEY_SUMMARY: &str = "summary";
pub const KEY_SENTIMENT: &str = "sentiment";
pub const KEY_CONFIDENCE: &str = "confidence";
pub const KEY_INSIGHTS: &str = "insights";
pub const KEY_URL: &str = "url";

/// Upper bound of the confidence scale the model is asked to use.
pub const MAX_CONFIDENCE: u8 = 10;

/// Summary used when the model reply carries none.
pub const DEFAULT_SUMMARY: &str = "No summary.";

/// Market-mood classification of a single article.
///
/// The five real labels are ordered from most bearish to most bullish.
/// [`SentimentLabel::Unknown`] is not a valid model answer; it marks a reply
/// whose sentiment could not be recovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SentimentLabel {
    #[serde(rename = "Very Bearish")]
    VeryBearish,
    #[serde(rename = "Bearish")]
    Bearish,
    #[serde(rename = "Neutral")]
    Neutral,
    #[serde(rename = "Bullish")]
    Bullish,
    #[serde(rename = "Very Bullish")]
    VeryBullish,
    #[serde(rename = "Unknown")]
    Unknown,
}

impl SentimentLabel {
    /// The labels the model may answer with, most bullish first, as listed in the prompt.
    pub const CHOICES: [SentimentLabel; 5] = [
        SentimentLabel::VeryBullish,
        SentimentLabel::Bullish,
        SentimentLabel::Neutral,
        SentimentLabel::Bearish,
        SentimentLabel::VeryBearish,
    ];

    /// The exact string the model is told to use for this label.
    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::VeryBearish => "Very Bearish",
            SentimentLabel::Bearish => "Bearish",
            SentimentLabel::Neutral => "Neutral",
            SentimentLabel::Bullish => "Bullish",
            SentimentLabel::VeryBullish => "Very Bullish",
            SentimentLabel::Unknown => "Unknown",
        }
    }

    /// Map a model-supplied label onto the enumeration.
    ///
    /// Matching ignores case, whitespace, `_` and `-`, so `"very bullish"`,
    /// `"VeryBullish"` and `"VERY_BULLISH"` are all [`SentimentLabel::VeryBullish`].
    /// Anything that is not one of the five choices is [`SentimentLabel::Unknown`].
    pub fn parse_loose(raw: &str) -> SentimentLabel {
        let normalized: String = raw
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
            .flat_map(char::to_lowercase)
            .collect();

        match normalized.as_str() {
            "verybearish" => SentimentLabel::VeryBearish,
            "bearish" => SentimentLabel::Bearish,
            "neutral" => SentimentLabel::Neutral,
            "bullish" => SentimentLabel::Bullish,
            "verybullish" => SentimentLabel::VeryBullish,
            _ => SentimentLabel::Unknown,
        }
    }

    /// Signed position on the bearish..bullish axis, `-2..=2`. `Unknown` sits at 0.
    pub fn score(&self) -> i8 {
        match self {
            SentimentLabel::VeryBearish => -2,
            SentimentLabel::Bearish => -1,
            SentimentLabel::Neutral | SentimentLabel::Unknown => 0,
            SentimentLabel::Bullish => 1,
            SentimentLabel::VeryBullish => 2,
        }
    }

    pub fn is_bullish(&self) -> bool {
        matches!(self, SentimentLabel::Bullish | SentimentLabel::VeryBullish)
    }

    pub fn is_bearish(&self) -> bool {
        matches!(self, SentimentLabel::Bearish | SentimentLabel::VeryBearish)
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_loose_exact_labels() {
        for label in SentimentLabel::CHOICES {
            assert_eq!(SentimentLabel::parse_loose(label.as_str()), label);
        }
    }

    #[test]
    fn test_parse_loose_variants() {
        assert_eq!(SentimentLabel::parse_loose("VeryBullish"), SentimentLabel::VeryBullish);
        assert_eq!(SentimentLabel::parse_loose("very_bearish"), SentimentLabel::VeryBearish);
        assert_eq!(SentimentLabel::parse_loose("  NEUTRAL "), SentimentLabel::Neutral);
        assert_eq!(SentimentLabel::parse_loose("Slightly Bullish"), SentimentLabel::Unknown);
        assert_eq!(SentimentLabel::parse_loose(""), SentimentLabel::Unknown);
    }

    #[test]
    fn test_serialized_names_match_prompt_strings() {
        for label in SentimentLabel::CHOICES {
            let json = serde_json::to_string(&label).unwrap();
            assert_eq!(json, format!("\"{}\"", label.as_str()));
        }
        let unknown: SentimentLabel = serde_json::from_str("\"Unknown\"").unwrap();
        assert_eq!(unknown, SentimentLabel::Unknown);
    }

    #[test]
    fn test_scores_are_ordered() {
        let scores: Vec<i8> = SentimentLabel::CHOICES.iter().map(|l| l.score()).collect();
        assert_eq!(scores, vec![2, 1, 0, -1, -2]);
        assert_eq!(SentimentLabel::Unknown.score(), 0);
        assert!(!SentimentLabel::Unknown.is_bullish());
        assert!(!SentimentLabel::Unknown.is_bearish());
    }
}
