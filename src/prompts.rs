//! Prompt rendering for the sentiment analyst.
//!
//! Key names and label strings come from [`crate::schema`] so that the reply
//! format asked for here is the one [`crate::extract`] parses.

use crate::schema::{
    KEY_CONFIDENCE, KEY_INSIGHTS, KEY_SENTIMENT, KEY_SUMMARY, KEY_TITLE, KEY_URL, MAX_CONFIDENCE,
    SentimentLabel,
};

/// Render the analysis instruction for one article.
///
/// Pure and total: the same inputs always produce the same prompt.
pub fn sentiment_prompt(title: &str, description: &str, url: &str, content: &str) -> String {
    let labels = SentimentLabel::CHOICES
        .iter()
        .map(|label| format!("   - {}", label.as_str()))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"You are a financial news sentiment analyst.

Given a news article with the following fields:
- Title: {title}
- Description: {description}
- URL: {url}
- Full Content: {content}

Please:
1. Summarize the main points of the article in 2–3 sentences.
2. Classify the sentiment as one of:
{labels}
3. Assign a confidence score from 0 to {max_confidence}, as a whole number.
4. Extract 2–4 bullet-point key insights that explain the sentiment choice.
5. Return the information in this JSON format:

```json
{{
  "{k_title}": "{title}",
  "{k_summary}": "...",
  "{k_sentiment}": "...",
  "{k_confidence}": ...,
  "{k_insights}": ["...", "..."],
  "{k_url}": "{url}"
}}
```"#,
        title = title,
        description = description,
        url = url,
        content = content,
        labels = labels,
        max_confidence = MAX_CONFIDENCE,
        k_title = KEY_TITLE,
        k_summary = KEY_SUMMARY,
        k_sentiment = KEY_SENTIMENT,
        k_confidence = KEY_CONFIDENCE,
        k_insights = KEY_INSIGHTS,
        k_url = KEY_URL,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompt() -> String {
        sentiment_prompt(
            "Stocks rally on rate cut hopes",
            "Markets climbed on Tuesday.",
            "https://example.com/rally",
            "The S&P 500 rose 1.2%.\nTreasury yields fell.",
        )
    }

    #[test]
    fn test_prompt_restates_article_verbatim() {
        let p = prompt();
        assert!(p.contains("- Title: Stocks rally on rate cut hopes"));
        assert!(p.contains("- Description: Markets climbed on Tuesday."));
        assert!(p.contains("- URL: https://example.com/rally"));
        assert!(p.contains("The S&P 500 rose 1.2%.\nTreasury yields fell."));
    }

    #[test]
    fn test_prompt_lists_every_label() {
        let p = prompt();
        for label in SentimentLabel::CHOICES {
            assert!(p.contains(&format!("   - {}\n", label.as_str())), "missing {label}");
        }
        assert!(!p.contains("Unknown"));
    }

    #[test]
    fn test_prompt_names_every_response_key() {
        let p = prompt();
        for key in [KEY_TITLE, KEY_SUMMARY, KEY_SENTIMENT, KEY_CONFIDENCE, KEY_INSIGHTS, KEY_URL] {
            assert!(p.contains(&format!("\"{key}\":")), "missing key {key}");
        }
        assert!(p.contains("from 0 to 10"));
        assert!(p.contains("2–3 sentences"));
        assert!(p.contains("2–4 bullet-point"));
    }

    #[test]
    fn test_prompt_is_deterministic() {
        assert_eq!(prompt(), prompt());
    }
}
