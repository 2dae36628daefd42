//! Pure text helpers: sentence splitting, summaries and chapter headings.
//!
//! Nothing here knows about playback; chapter starts are plain character
//! offsets the caller can hand to `seek`.

use once_cell::sync::Lazy;
use regex::Regex;

/// Headings at or above this many chars are treated as body text.
const MAX_HEADING_CHARS: usize = 60;

static RE_NUMBERED_HEADING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(chapter|part|book|section)\s+([0-9]+|[ivxlcdm]+)\b")
        .expect("heading pattern is valid")
});

/// A detected heading and where it starts in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chapter {
    pub title: String,
    /// Character offset of the heading's first visible char.
    pub start: usize,
}

/// Very lightweight sentence splitter based on punctuation.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();

    for ch in text.chars() {
        current.push(ch);
        if matches!(ch, '.' | '!' | '?') {
            if current.chars().any(|c| !c.is_whitespace()) {
                sentences.push(current.trim().to_string());
            }
            current.clear();
        }
    }

    if current.chars().any(|c| !c.is_whitespace()) {
        sentences.push(current.trim().to_string());
    }

    sentences
}

/// The first `max_sentences` sentences, whitespace-collapsed and joined.
pub fn summarize(text: &str, max_sentences: usize) -> String {
    split_sentences(text)
        .into_iter()
        .take(max_sentences)
        .map(|sentence| sentence.split_whitespace().collect::<Vec<_>>().join(" "))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Scan line by line for headings: short all-caps lines, or lines that open
/// with "Chapter 3", "PART IV" and the like.
pub fn detect_chapters(text: &str) -> Vec<Chapter> {
    let mut chapters = Vec::new();
    let mut line_start = 0usize;

    for line in text.split('\n') {
        let line_chars = line.chars().count();
        let trimmed = line.trim();
        if is_heading(trimmed) {
            let leading = line.chars().take_while(|c| c.is_whitespace()).count();
            chapters.push(Chapter {
                title: trimmed.to_string(),
                start: line_start + leading,
            });
        }
        // +1 for the '\n' consumed by split.
        line_start += line_chars + 1;
    }

    chapters
}

fn is_heading(line: &str) -> bool {
    if line.is_empty() || line.chars().count() >= MAX_HEADING_CHARS {
        return false;
    }
    if RE_NUMBERED_HEADING.is_match(line) {
        return true;
    }
    let letters = line.chars().filter(|c| c.is_alphabetic()).count();
    letters >= 2 && line.chars().any(char::is_uppercase) && !line.chars().any(char::is_lowercase)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_terminal_punctuation() {
        let sentences = split_sentences("One. Two! Three? Four");
        assert_eq!(sentences, vec!["One.", "Two!", "Three?", "Four"]);
    }

    #[test]
    fn summary_keeps_first_sentences() {
        let text = "First line.\nSecond   line. Third line. Fourth line.";
        assert_eq!(summarize(text, 2), "First line. Second line.");
        assert_eq!(summarize("", 3), "");
    }

    #[test]
    fn detects_uppercase_and_numbered_headings() {
        let text = "INTRODUCTION\nSome body text here.\n\n  Chapter 2: The Road\nMore text.\nPART IV\n";
        let chapters = detect_chapters(text);
        let titles: Vec<&str> = chapters.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["INTRODUCTION", "Chapter 2: The Road", "PART IV"]);

        assert_eq!(chapters[0].start, 0);
        let second: String = text.chars().skip(chapters[1].start).take(9).collect();
        assert_eq!(second, "Chapter 2");
        let third: String = text.chars().skip(chapters[2].start).take(7).collect();
        assert_eq!(third, "PART IV");
    }

    #[test]
    fn blank_numeric_and_long_lines_are_not_headings() {
        let long = "A".repeat(80);
        let text = format!("\n   \n12345\nI\n{long}\n");
        assert!(detect_chapters(&text).is_empty());
    }

    #[test]
    fn offsets_count_chars() {
        let text = "café au lait\nÉPILOGUE";
        let chapters = detect_chapters(text);
        assert_eq!(chapters.len(), 1);
        assert_eq!(chapters[0].start, 13);
    }
}
