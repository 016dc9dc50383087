//! Hard length limits for channels with a platform character cap.
//!
//! Truncation is blunt: it may cut mid-word. Over-length output is never
//! rejected, so this step cannot fail.

const ELLIPSIS: &str = "...";

/// Trims `text` and, when a ceiling is given, cuts it to at most `ceiling`
/// characters. Over-length text keeps its first `ceiling - 3` characters
/// followed by `...`.
pub fn enforce(text: &str, ceiling: Option<usize>) -> String {
    let text = text.trim();
    let Some(ceiling) = ceiling else {
        return text.to_string();
    };

    if text.chars().count() <= ceiling {
        return text.to_string();
    }

    let ellipsis_len = ELLIPSIS.chars().count();
    if ceiling < ellipsis_len {
        // No room for the marker; keep what fits.
        let kept: String = text.chars().take(ceiling).collect();
        return kept.trim_end().to_string();
    }

    let mut truncated: String = text.chars().take(ceiling - ellipsis_len).collect();
    truncated.push_str(ELLIPSIS);
    truncated
}
