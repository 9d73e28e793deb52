//! Draft field limits enforced by the platform.
//!
//! The draft endpoint rejects over-long fields instead of clamping them,
//! so fields are truncated client-side before submission. Titles are
//! limited by character count with a byte-length fallback; author and
//! digest are limited by UTF-8 byte length.

use std::fmt;

/// Primary title limit, in characters.
pub const MAX_TITLE_CHARS: usize = 64;
/// Fallback title limit, in UTF-8 bytes.
pub const MAX_TITLE_BYTES: usize = 192;
/// Author byline limit, in UTF-8 bytes.
pub const MAX_AUTHOR_BYTES: usize = 20;
/// Digest limit, in UTF-8 bytes.
pub const MAX_DIGEST_BYTES: usize = 120;
/// Byte budget for a digest derived from the title, small enough to
/// survive the platform's own summary handling.
pub const DERIVED_DIGEST_BYTES: usize = 54;

/// Longest prefix of `text` that fits in `max_bytes` without splitting a
/// UTF-8 code point.
pub fn truncate_by_bytes(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// The unit a limit is measured in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    Chars(usize),
    Bytes(usize),
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Limit::Chars(n) => write!(f, "{n}字符"),
            Limit::Bytes(n) => write!(f, "{n}字节"),
        }
    }
}

/// One field that had to be shortened; reported to the caller so silent
/// truncation never reaches a published draft unnoticed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Truncation {
    /// Field name as it appears in the draft payload.
    pub field: &'static str,
    pub limit: Limit,
    pub original: String,
    pub kept: String,
}

impl fmt::Display for Truncation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}超过{}已截断: {} -> {}",
            self.field, self.limit, self.original, self.kept
        )
    }
}

/// Title, author and digest after limit enforcement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftFields {
    pub title: String,
    pub author: String,
    pub digest: String,
}

/// Applies the platform limits to the user-supplied fields.
///
/// A missing digest is derived from the title, clipped to a shorter
/// budget than an explicit digest gets. Every shortened field is recorded
/// as a [`Truncation`] event.
pub fn enforce(title: &str, author: &str, digest: Option<&str>) -> (DraftFields, Vec<Truncation>) {
    let mut events = Vec::new();

    let title_out = if title.chars().count() > MAX_TITLE_CHARS {
        let kept: String = title.chars().take(MAX_TITLE_CHARS).collect();
        events.push(Truncation {
            field: "title",
            limit: Limit::Chars(MAX_TITLE_CHARS),
            original: title.to_string(),
            kept: kept.clone(),
        });
        kept
    } else if title.len() > MAX_TITLE_BYTES {
        let kept = truncate_by_bytes(title, MAX_TITLE_BYTES).to_string();
        events.push(Truncation {
            field: "title",
            limit: Limit::Bytes(MAX_TITLE_BYTES),
            original: title.to_string(),
            kept: kept.clone(),
        });
        kept
    } else {
        title.to_string()
    };

    let author_out = {
        let kept = truncate_by_bytes(author, MAX_AUTHOR_BYTES);
        if kept.len() < author.len() {
            events.push(Truncation {
                field: "author",
                limit: Limit::Bytes(MAX_AUTHOR_BYTES),
                original: author.to_string(),
                kept: kept.to_string(),
            });
        }
        kept.to_string()
    };

    let digest_out = match digest {
        Some(digest) if !digest.is_empty() => {
            let kept = truncate_by_bytes(digest, MAX_DIGEST_BYTES);
            if kept.len() < digest.len() {
                events.push(Truncation {
                    field: "digest",
                    limit: Limit::Bytes(MAX_DIGEST_BYTES),
                    original: digest.to_string(),
                    kept: kept.to_string(),
                });
            }
            kept.to_string()
        }
        // No digest supplied: derive one from the title.
        _ => truncate_by_bytes(title, DERIVED_DIGEST_BYTES).to_string(),
    };

    (
        DraftFields {
            title: title_out,
            author: author_out,
            digest: digest_out,
        },
        events,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_by_bytes_short_input_unchanged() {
        assert_eq!(truncate_by_bytes("hello", 20), "hello");
        assert_eq!(truncate_by_bytes("", 10), "");
    }

    #[test]
    fn test_truncate_by_bytes_ascii() {
        assert_eq!(truncate_by_bytes("hello world", 5), "hello");
    }

    #[test]
    fn test_truncate_by_bytes_never_splits_a_code_point() {
        // Every CJK char below is 3 bytes in UTF-8.
        let text = "微信公众号";
        assert_eq!(truncate_by_bytes(text, 7), "微信");
        assert_eq!(truncate_by_bytes(text, 9), "微信公");
        assert!(truncate_by_bytes(text, 8).is_char_boundary(truncate_by_bytes(text, 8).len()));
    }

    #[test]
    fn test_truncate_by_bytes_zero_budget() {
        assert_eq!(truncate_by_bytes("任意", 0), "");
    }

    #[test]
    fn test_enforce_title_by_chars() {
        let long_title = "字".repeat(70);
        let (fields, events) = enforce(&long_title, "", None);
        assert_eq!(fields.title.chars().count(), 64);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].field, "title");
        assert_eq!(events[0].limit, Limit::Chars(64));
    }

    #[test]
    fn test_enforce_title_bytes_fallback() {
        // 64 four-byte emoji: within the char limit but 256 bytes.
        let title = "🎉".repeat(64);
        let (fields, events) = enforce(&title, "", None);
        assert_eq!(events[0].limit, Limit::Bytes(192));
        assert!(fields.title.len() <= 192);
        assert_eq!(fields.title.chars().count(), 48);
    }

    #[test]
    fn test_enforce_title_within_limits_untouched() {
        let (fields, events) = enforce("正常标题", "作者", Some("摘要"));
        assert_eq!(fields.title, "正常标题");
        assert_eq!(fields.author, "作者");
        assert_eq!(fields.digest, "摘要");
        assert!(events.is_empty());
    }

    #[test]
    fn test_enforce_author_by_bytes() {
        // 9 CJK chars = 27 bytes, over the 20-byte cap.
        let (fields, events) = enforce("标题", "很长很长的作者署名", None);
        assert!(fields.author.len() <= 20);
        assert_eq!(fields.author, "很长很长的作");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].field, "author");
    }

    #[test]
    fn test_enforce_empty_author_stays_empty() {
        let (fields, events) = enforce("标题", "", None);
        assert_eq!(fields.author, "");
        assert!(events.is_empty());
    }

    #[test]
    fn test_enforce_derives_digest_from_title() {
        let title = "一二三四五六七八九十一二三四五六七八九十一二三四五";
        let (fields, _) = enforce(title, "", None);
        assert_eq!(fields.digest, truncate_by_bytes(title, 54));
        assert!(fields.digest.len() <= 54);
    }

    #[test]
    fn test_enforce_empty_digest_treated_as_missing() {
        let (fields, _) = enforce("标题", "", Some(""));
        assert_eq!(fields.digest, "标题");
    }

    #[test]
    fn test_enforce_digest_by_bytes() {
        let digest = "摘".repeat(50);
        let (fields, events) = enforce("标题", "", Some(&digest));
        assert!(fields.digest.len() <= 120);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].field, "digest");
        assert_eq!(events[0].limit, Limit::Bytes(120));
    }

    #[test]
    fn test_truncation_display_names_field_and_limit() {
        let (_, events) = enforce(&"字".repeat(70), "", None);
        let rendered = events[0].to_string();
        assert!(rendered.contains("title"));
        assert!(rendered.contains("64字符"));
    }
}
