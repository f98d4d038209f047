//! Recovery of a [`SentimentResult`] from free-form model output.
//!
//! Model replies usually *resemble* the JSON object the prompt asks for, but
//! they arrive wrapped in prose or code fences, truncated, or with fields
//! missing. Instead of deserializing the whole reply, each field has its own
//! key-anchored matcher returning `Option<T>`, and [`extract`] fills every
//! `None` with a fixed default. A broken field never affects its neighbours.
//!
//! | Field | Pattern | Default |
//! |-------|---------|---------|
//! | `sentiment` | `"sentiment": "<string>"` | [`SentimentLabel::Unknown`] |
//! | `confidence` | `"confidence": <int>` (clamped to `0..=10`) | `0` |
//! | `summary` | `"summary": "<string>"` (may span lines) | `"No summary."` |
//! | `insights` | every `"<string>"` inside `"insights": [ ... ]` | empty |
//!
//! `title` and `url` are never read from the reply.

use crate::models::SentimentResult;
use crate::schema::{
    DEFAULT_SUMMARY, KEY_CONFIDENCE, KEY_INSIGHTS, KEY_SENTIMENT, KEY_SUMMARY, MAX_CONFIDENCE,
    SentimentLabel,
};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// A double-quoted string body that may contain backslash escapes.
const QUOTED: &str = r#""((?:[^"\\]|\\.)*)""#;

static SENTIMENT_RE: Lazy<Regex> = Lazy::new(|| string_field(KEY_SENTIMENT));
static SUMMARY_RE: Lazy<Regex> = Lazy::new(|| string_field(KEY_SUMMARY));
static CONFIDENCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r#""{}"\s*:\s*"?\s*(-?\d+)"#,
        regex::escape(KEY_CONFIDENCE)
    ))
    .unwrap()
});
static INSIGHTS_OPEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r#""{}"\s*:\s*\["#, regex::escape(KEY_INSIGHTS))).unwrap()
});
static QUOTED_TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(&format!("(?s){QUOTED}")).unwrap());

fn string_field(key: &str) -> Regex {
    Regex::new(&format!(r#"(?s)"{}"\s*:\s*{QUOTED}"#, regex::escape(key))).unwrap()
}

/// Build the result for one article from the raw model reply.
///
/// Never fails. `title` and `url` are threaded through from the request.
pub fn extract(raw: &str, title: &str, url: &str) -> SentimentResult {
    let sentiment = extract_sentiment(raw);
    let confidence = extract_confidence(raw);
    let summary = extract_summary(raw);
    let insights = extract_insights(raw);

    if sentiment.is_none() || confidence.is_none() || summary.is_none() || insights.is_none() {
        debug!(
            %url,
            sentiment = sentiment.is_some(),
            confidence = confidence.is_some(),
            summary = summary.is_some(),
            insights = insights.is_some(),
            "Model reply is missing fields; using defaults"
        );
    }

    SentimentResult {
        title: title.to_string(),
        sentiment: sentiment.unwrap_or(SentimentLabel::Unknown),
        confidence: confidence.unwrap_or(0),
        summary: summary.unwrap_or_else(|| DEFAULT_SUMMARY.to_string()),
        insights: insights.unwrap_or_default(),
        url: url.to_string(),
    }
}

/// The `sentiment` label, if a non-empty one is present.
///
/// A present but unrecognised label yields `Some(Unknown)`.
pub fn extract_sentiment(raw: &str) -> Option<SentimentLabel> {
    let value = quoted_field(&SENTIMENT_RE, raw)?;
    Some(SentimentLabel::parse_loose(&value))
}

/// The `confidence` score, clamped into `0..=10`.
///
/// Negative values clamp to 0; values above 10, including ones too large for
/// any integer type, clamp to 10.
pub fn extract_confidence(raw: &str) -> Option<u8> {
    let digits = CONFIDENCE_RE.captures(raw)?.get(1)?.as_str();
    if digits.starts_with('-') {
        return Some(0);
    }
    let value = digits.parse::<u64>().unwrap_or(u64::MAX);
    Some(value.min(u64::from(MAX_CONFIDENCE)) as u8)
}

/// The `summary` text, which may contain newlines.
pub fn extract_summary(raw: &str) -> Option<String> {
    quoted_field(&SUMMARY_RE, raw)
}

/// Every quoted token inside the `insights` array, in order.
///
/// `None` when there is no `insights` key or its array is never closed.
pub fn extract_insights(raw: &str) -> Option<Vec<String>> {
    let open = INSIGHTS_OPEN_RE.find(raw)?;
    let block = bracket_block(&raw[open.end()..])?;
    let insights = QUOTED_TOKEN_RE
        .captures_iter(block)
        .filter_map(|caps| caps.get(1))
        .map(|m| unescape(m.as_str()).trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    Some(insights)
}

fn quoted_field(re: &Regex, raw: &str) -> Option<String> {
    let captured = re.captures(raw)?.get(1)?.as_str();
    let value = unescape(captured).trim().to_string();
    if value.is_empty() { None } else { Some(value) }
}

/// Text up to the `]` matching an already-consumed `[`.
///
/// Brackets inside quoted strings do not count.
fn bracket_block(after_open: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in after_open.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '[' => depth += 1,
            ']' if depth == 0 => return Some(&after_open[..i]),
            ']' => depth -= 1,
            _ => {}
        }
    }
    None
}

/// Resolve JSON-style backslash escapes, joining `\uD83D\uDE00` style
/// surrogate pairs. Unknown escapes and lone surrogates are kept as written.
fn unescape(s: &str) -> String {
    if !s.contains('\\') {
        return s.to_string();
    }

    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some('/') => out.push('/'),
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('u') => match unicode_escape(chars.as_str()) {
                Some((decoded, consumed)) => {
                    out.push(decoded);
                    chars.nth(consumed - 1);
                }
                None => out.push_str("\\u"),
            },
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Decode the digits following a `\u`, plus a trailing `\uXXXX` low surrogate
/// when the first unit is a high surrogate. Returns the char and the number of
/// chars consumed from `rest`.
fn unicode_escape(rest: &str) -> Option<(char, usize)> {
    let unit = hex4(rest)?;
    if !(0xD800..=0xDBFF).contains(&unit) {
        return char::from_u32(unit).map(|c| (c, 4));
    }
    let low = rest[4..].strip_prefix("\\u").and_then(hex4)?;
    if !(0xDC00..=0xDFFF).contains(&low) {
        return None;
    }
    let code = 0x10000 + ((unit - 0xD800) << 10) + (low - 0xDC00);
    char::from_u32(code).map(|c| (c, 10))
}

fn hex4(s: &str) -> Option<u32> {
    let digits = s.get(..4)?;
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    u32::from_str_radix(digits, 16).ok()
}
