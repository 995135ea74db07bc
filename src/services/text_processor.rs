// Text Processing Service
// Normalization of extracted text and the local rule-based sentence splitter

use regex::{Captures, Regex};
use std::sync::OnceLock;

/// Tokens that end with a period without ending the sentence (lower-cased, trailing dot removed).
const ABBREVIATIONS: &[&str] = &[
    "e.g", "i.e", "al", "fig", "figs", "eq", "eqs", "tab", "sec", "ref", "refs", "cf", "vs",
    "approx", "no", "dr", "mr", "mrs", "ms", "prof", "resp",
];

fn space_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\u{3000}\u{00A0}\u{2009}\u{202F}]").expect("space regex"))
}

fn horizontal_ws_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[ \t\x0C\x0B]+").expect("whitespace regex"))
}

fn hyphen_break_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([\p{L}\p{N}-]*\p{L})-\n(\p{Ll})").expect("hyphenation regex"))
}

fn blank_lines_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n\s*\n").expect("paragraph regex"))
}

fn excess_newlines_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n{3,}").expect("newline regex"))
}

/// Normalize text coming out of PDF/DOCX extraction.
pub fn normalize_extracted_text(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let mut s = text
        .replace('\u{201c}', "\"")
        .replace('\u{201d}', "\"")
        .replace('\u{2018}', "'")
        .replace('\u{2019}', "'")
        .replace('\u{2014}', "-")
        .replace('\u{2013}', "-")
        .replace('\u{fb01}', "fi")
        .replace('\u{fb02}', "fl")
        .replace('\u{00ad}', "");

    s = space_re().replace_all(&s, " ").to_string();
    s = s.replace("\r\n", "\n").replace('\r', "\n");
    s = horizontal_ws_re().replace_all(&s, " ").to_string();

    s = s.lines().map(|ln| ln.trim()).collect::<Vec<_>>().join("\n");

    // "experi-\nment" -> "experiment", but "state-of-the-\nart" keeps its hyphen
    s = hyphen_break_re()
        .replace_all(&s, |caps: &Captures| {
            let (head, tail) = (&caps[1], &caps[2]);
            if head.contains('-') {
                format!("{}-{}", head, tail)
            } else {
                format!("{}{}", head, tail)
            }
        })
        .to_string();
    s = excess_newlines_re().replace_all(&s, "\n\n").to_string();

    s.trim().to_string()
}

/// Split English prose into sentences.
/// Blank lines are hard boundaries; single line breaks are treated as spaces.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    if text.trim().is_empty() {
        return sentences;
    }

    for paragraph in blank_lines_re().split(text) {
        let flat = paragraph.split_whitespace().collect::<Vec<_>>().join(" ");
        if !flat.is_empty() {
            split_paragraph(&flat, &mut sentences);
        }
    }
    sentences
}

fn split_paragraph(text: &str, out: &mut Vec<String>) {
    let mut sentences = Vec::new();
    // An unbalanced quote would swallow the rest of the paragraph
    if !split_with_quotes(text, true, &mut sentences) {
        sentences.clear();
        split_with_quotes(text, false, &mut sentences);
    }
    out.extend(sentences);
}

/// Returns false when `track_quotes` is set and a quote is still open at the end.
fn split_with_quotes(text: &str, track_quotes: bool, out: &mut Vec<String>) -> bool {
    let chars: Vec<char> = text.chars().collect();
    let mut buffer = String::new();
    let mut in_quote = false;
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        buffer.push(ch);

        // Only a quote after whitespace or a bracket opens; `5"` is an inch mark
        if track_quotes && ch == '"' {
            if in_quote {
                in_quote = false;
            } else if i == 0 || matches!(chars[i - 1], ' ' | '(' | '[') {
                in_quote = true;
            }
        }

        if matches!(ch, '.' | '!' | '?') {
            // Absorb "?!", "...", closing quotes and brackets
            while i + 1 < chars.len() && matches!(chars[i + 1], '.' | '!' | '?' | '"' | '\'' | ')' | ']') {
                i += 1;
                buffer.push(chars[i]);
                if chars[i] == '"' {
                    in_quote = false;
                }
            }

            let at_boundary = i + 1 >= chars.len() || chars[i + 1].is_whitespace();
            let abbreviation = buffer.ends_with('.') && ends_with_abbreviation(&buffer);

            if at_boundary && !in_quote && !abbreviation {
                let sentence = buffer.trim();
                if !sentence.is_empty() {
                    out.push(sentence.to_string());
                }
                buffer.clear();
            }
        }

        i += 1;
    }

    let remaining = buffer.trim();
    if !remaining.is_empty() {
        out.push(remaining.to_string());
    }
    !in_quote
}

fn ends_with_abbreviation(buffer: &str) -> bool {
    let without_dot = buffer.strip_suffix('.').unwrap_or(buffer);
    let token = without_dot
        .rsplit(|c: char| c.is_whitespace() || c == '(')
        .next()
        .unwrap_or("")
        .to_lowercase();

    // Initials such as "J. Smith"
    if token.chars().count() == 1 && token.chars().all(|c| c.is_alphabetic()) {
        return true;
    }
    ABBREVIATIONS.contains(&token.as_str())
}

/// Truncate to at most `max_chars` Unicode scalars, never splitting a character.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Single-line preview for logs and debug output.
pub fn preview(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        flat
    } else {
        format!("{}...", truncate_chars(&flat, max_chars))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_extracted_text() {
        let raw = "The \u{201c}robust\u{201d} experi-\nment\r\nworks.\u{00A0}Really.\n\n\n\nNext";
        let normalized = normalize_extracted_text(raw);
        assert_eq!(normalized, "The \"robust\" experiment\nworks. Really.\n\nNext");
    }

    #[test]
    fn test_split_basic_sentences() {
        let sentences = split_sentences("First sentence here. Second one follows! Is this third?");
        assert_eq!(
            sentences,
            vec!["First sentence here.", "Second one follows!", "Is this third?"]
        );
    }

    #[test]
    fn test_split_respects_decimals_and_abbreviations() {
        let sentences = split_sentences(
            "Accuracy rose to 93.5 percent, e.g. on CIFAR. See Fig. 2 and Smith et al. for details.",
        );
        assert_eq!(
            sentences,
            vec![
                "Accuracy rose to 93.5 percent, e.g. on CIFAR.",
                "See Fig. 2 and Smith et al. for details."
            ]
        );
    }

    #[test]
    fn test_split_quotes_and_line_breaks() {
        let text = "They wrote \"it works. mostly.\" Then\nthey stopped.\n\nNew paragraph without dot";
        let sentences = split_sentences(text);
        assert_eq!(
            sentences,
            vec![
                "They wrote \"it works. mostly.\"",
                "Then they stopped.",
                "New paragraph without dot"
            ]
        );
    }

    #[test]
    fn test_split_survives_unbalanced_quotes() {
        let sentences = split_sentences(
            "Samples were cut to 5\" wide strips for testing. Our method outperforms all baselines. We evaluate on a small dataset only.",
        );
        assert_eq!(
            sentences,
            vec![
                "Samples were cut to 5\" wide strips for testing.",
                "Our method outperforms all baselines.",
                "We evaluate on a small dataset only."
            ]
        );

        let broken = split_sentences("He said \"it works. It does. Nobody closed the quote.");
        assert_eq!(broken.len(), 3);
    }

    #[test]
    fn test_normalize_keeps_compound_hyphens() {
        assert_eq!(
            normalize_extracted_text("Our model achieves state-of-the-\nart accuracy on every benchmark."),
            "Our model achieves state-of-the-art accuracy on every benchmark."
        );
        assert_eq!(normalize_extracted_text("a well-known experi-\nment"), "a well-known experiment");
    }

    #[test]
    fn test_split_empty() {
        assert!(split_sentences("").is_empty());
        assert!(split_sentences("   \n  ").is_empty());
    }

    #[test]
    fn test_truncate_and_preview() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(preview("a  b\nc", 10), "a b c");
        assert_eq!(preview("abcdefghijkl", 4), "abcd...");
    }
}
