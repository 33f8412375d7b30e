//! Greedy word wrapping with optional CJK visual-width measurement.

/// Visual width of a character in layout units.
///
/// Hangul, Kana and CJK ideographs are double width; everything else
/// counts as one unit.
pub fn char_width(c: char) -> usize {
    if is_wide(c) {
        2
    } else {
        1
    }
}

/// Whether a character is rendered double width.
pub fn is_wide(c: char) -> bool {
    matches!(
        c as u32,
        0x1100..=0x11FF       // Hangul Jamo
            | 0x3040..=0x30FF // Hiragana, Katakana
            | 0x3130..=0x318F // Hangul compatibility Jamo
            | 0x3400..=0x4DBF // CJK extension A
            | 0x4E00..=0x9FFF // CJK unified ideographs
            | 0xAC00..=0xD7AF // Hangul syllables
            | 0xFF01..=0xFF60 // Fullwidth forms
    )
}

/// How line length is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Measure {
    /// One unit per character.
    Chars,
    /// Double-width units for CJK characters.
    Visual,
}

impl Measure {
    /// Length of a string under this measure.
    pub fn width_of(&self, s: &str) -> usize {
        match self {
            Measure::Chars => s.chars().count(),
            Measure::Visual => s.chars().map(char_width).sum(),
        }
    }
}

/// Wrap `text` into lines of at most `budget` units.
///
/// Words are packed greedily while `line + 1 + word <= budget`. A word
/// longer than the budget gets a line of its own and is never split,
/// except in visual mode where a word made of wide characters may break
/// between characters.
pub fn wrap_words(text: &str, budget: usize, measure: Measure) -> Vec<String> {
    let budget = budget.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for word in text.split_whitespace() {
        for piece in split_oversized(word, budget, measure) {
            let piece_len = measure.width_of(piece);
            if current.is_empty() {
                current.push_str(piece);
                current_len = piece_len;
            } else if current_len + 1 + piece_len <= budget {
                current.push(' ');
                current.push_str(piece);
                current_len += 1 + piece_len;
            } else {
                lines.push(std::mem::take(&mut current));
                current.push_str(piece);
                current_len = piece_len;
            }
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Break an oversized run of wide characters at character boundaries.
fn split_oversized(word: &str, budget: usize, measure: Measure) -> Vec<&str> {
    if measure == Measure::Chars
        || measure.width_of(word) <= budget
        || !word.chars().all(is_wide)
    {
        return vec![word];
    }

    let mut pieces = Vec::new();
    let mut start = 0usize;
    let mut width = 0usize;
    for (idx, c) in word.char_indices() {
        let w = char_width(c);
        if width + w > budget && idx > start {
            pieces.push(&word[start..idx]);
            start = idx;
            width = 0;
        }
        width += w;
    }
    pieces.push(&word[start..]);
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packs_words_greedily() {
        let lines = wrap_words("the quick brown fox jumps", 10, Measure::Chars);
        assert_eq!(lines, vec!["the quick", "brown fox", "jumps"]);
    }

    #[test]
    fn exact_fit_stays_on_line() {
        // "abcd efghi" is exactly 10 characters including the space
        let lines = wrap_words("abcd efghi jk", 10, Measure::Chars);
        assert_eq!(lines, vec!["abcd efghi", "jk"]);
    }

    #[test]
    fn long_word_gets_own_line_unsplit() {
        let lines = wrap_words("a supercalifragilistic b", 8, Measure::Chars);
        assert_eq!(lines, vec!["a", "supercalifragilistic", "b"]);
    }

    #[test]
    fn collapses_whitespace_and_newlines() {
        let lines = wrap_words("  one\n\ntwo\tthree  ", 40, Measure::Chars);
        assert_eq!(lines, vec!["one two three"]);
    }

    #[test]
    fn empty_text_has_no_lines() {
        assert!(wrap_words("", 10, Measure::Chars).is_empty());
        assert!(wrap_words(" \n ", 10, Measure::Chars).is_empty());
    }

    #[test]
    fn visual_measure_counts_wide_chars_twice() {
        assert_eq!(Measure::Visual.width_of("안녕"), 4);
        assert_eq!(Measure::Visual.width_of("ab안"), 4);
        assert_eq!(Measure::Chars.width_of("안녕"), 2);
    }

    #[test]
    fn visual_mode_breaks_unspaced_cjk_runs() {
        let lines = wrap_words("こんにちは世界", 6, Measure::Visual);
        assert_eq!(lines, vec!["こんに", "ちは世", "界"]);
    }

    #[test]
    fn visual_mode_keeps_latin_words_whole() {
        let lines = wrap_words("extraordinary", 6, Measure::Visual);
        assert_eq!(lines, vec!["extraordinary"]);
    }
}
