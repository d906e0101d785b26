//! Derived document metadata: reading time, excerpt, category.

use unicode_segmentation::UnicodeSegmentation;

pub const DEFAULT_WORDS_PER_MINUTE: u32 = 225;

pub fn word_count(text: &str) -> usize {
    text.unicode_words().count()
}

/// Minutes needed to read `text`, never less than one
pub fn reading_minutes(text: &str, words_per_minute: u32) -> u64 {
    let wpm = u64::from(words_per_minute.max(1));
    let words = word_count(text) as u64;
    words.div_ceil(wpm).max(1)
}

pub fn format_read_time(minutes: u64) -> String {
    format!("{} min read", minutes.max(1))
}

/// Author-supplied read time: a display string or a number of minutes
pub fn read_time_override(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        serde_yaml::Value::Number(n) => {
            let minutes = n
                .as_u64()
                .or_else(|| n.as_f64().map(|f| f.ceil().max(0.0) as u64))?;
            Some(format_read_time(minutes))
        }
        _ => None,
    }
}

/// Collapse whitespace and cut `text` to at most `max_chars`, on a word boundary
pub fn excerpt(text: &str, max_chars: usize) -> String {
    let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if normalized.chars().count() <= max_chars {
        return normalized;
    }

    let mut out = String::new();
    for word in normalized.split(' ') {
        let needed = if out.is_empty() { 0 } else { 1 } + word.chars().count();
        if out.chars().count() + needed > max_chars {
            break;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }

    // A single word longer than the limit is cut mid-word
    if out.is_empty() {
        out = normalized.chars().take(max_chars).collect();
    }

    let trimmed = out.trim_end_matches([',', ';', ':', '.', ' ']);
    format!("{}…", trimmed)
}

/// Explicit category, else the first tag, else `fallback`
pub fn category(explicit: Option<&str>, tags: &[String], fallback: &str) -> String {
    explicit
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .or_else(|| tags.first().map(|t| t.trim()).filter(|t| !t.is_empty()))
        .unwrap_or(fallback)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reading_time_rounds_up() {
        let words = vec!["word"; 450].join(" ");
        assert_eq!(reading_minutes(&words, 225), 2);

        let words = vec!["word"; 451].join(" ");
        assert_eq!(reading_minutes(&words, 225), 3);
    }

    #[test]
    fn test_reading_time_minimum_one() {
        assert_eq!(reading_minutes("", 225), 1);
        assert_eq!(format_read_time(reading_minutes("short", 225)), "1 min read");
    }

    #[test]
    fn test_read_time_override() {
        let s = serde_yaml::Value::String("7 min read".into());
        assert_eq!(read_time_override(&s).as_deref(), Some("7 min read"));

        let n: serde_yaml::Value = serde_yaml::from_str("4").unwrap();
        assert_eq!(read_time_override(&n).as_deref(), Some("4 min read"));

        let blank = serde_yaml::Value::String("  ".into());
        assert_eq!(read_time_override(&blank), None);
    }

    #[test]
    fn test_excerpt_short_text_untouched() {
        assert_eq!(excerpt("A  short\nline.", 160), "A short line.");
    }

    #[test]
    fn test_excerpt_truncates_on_word_boundary() {
        let text = "The quick brown fox jumps over the lazy dog";
        let cut = excerpt(text, 20);
        assert_eq!(cut, "The quick brown fox…");
        assert!(cut.chars().count() <= 21);
    }

    #[test]
    fn test_category_fallbacks() {
        let tags = vec!["rust".to_string()];
        assert_eq!(category(Some("Essays"), &tags, "General"), "Essays");
        assert_eq!(category(None, &tags, "General"), "rust");
        assert_eq!(category(Some(" "), &[], "General"), "General");
    }
}
