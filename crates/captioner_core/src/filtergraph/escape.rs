//! Literal escaping for the engine's filter-graph syntax.
//!
//! A text parameter inside `-filter_complex` is parsed three times:
//!
//! 1. **Graph level.** The filter's argument string is read as one token
//!    terminated by `[ ] , ;`. `'...'` is taken verbatim and `\c` yields
//!    `c` outside quotes.
//! 2. **Option level.** Each value is read as a token terminated by `:`,
//!    with the same quoting rules. Unescaped leading and trailing
//!    whitespace is trimmed.
//! 3. **Expansion level.** The text filter treats `\c` as a literal `c`
//!    and `%` as the start of an expansion sequence.
//!
//! [`escape_literal`] covers levels 3 and 2 in a single pass over the
//! input and [`quote_literal`] wraps the result for level 1.
//! [`unescape_literal`] is the reference parser for all three levels.

const WHITESPACE: [char; 4] = [' ', '\n', '\t', '\r'];

/// Escape plain text for the option and expansion levels.
///
/// Per character, in one pass:
///
/// | input                        | output  |
/// |------------------------------|---------|
/// | `\`                          | `\\\\`  |
/// | `%`                          | `\\%`   |
/// | `'`                          | `\'`    |
/// | `:`                          | `\:`    |
/// | carriage return              | dropped |
/// | leading or trailing blank    | `\` + c |
///
/// Everything else, including brackets, commas, semicolons, line breaks
/// and non-ASCII text, passes through untouched.
pub fn escape_literal(text: &str) -> String {
    let text: String = text.chars().filter(|&c| c != '\r').collect();
    let mut out = String::with_capacity(text.len() + 8);
    let (first, last) = content_bounds(&text);
    for (i, c) in text.char_indices() {
        match c {
            '\\' => out.push_str(r"\\\\"),
            '%' => out.push_str(r"\\%"),
            '\'' | ':' => {
                out.push('\\');
                out.push(c);
            }
            _ if WHITESPACE.contains(&c) && (i < first || i >= last) => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

/// Escape and quote for the graph level: the complete parameter value.
pub fn quote_literal(text: &str) -> String {
    quote_graph(&escape_literal(text))
}

/// Quote a value that is not text-expanded (file paths, colours).
///
/// The option and graph levels still apply, so `C:/x.ttf` keeps its colon.
pub fn quote_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 4);
    let (first, last) = content_bounds(value);
    for (i, c) in value.char_indices() {
        let edge = WHITESPACE.contains(&c) && (i < first || i >= last);
        if matches!(c, '\\' | '\'' | ':') || edge {
            out.push('\\');
        }
        out.push(c);
    }
    quote_graph(&out)
}

/// Parse a parameter value the way the engine does for a text parameter.
///
/// Returns `None` for input the engine would reject or misread: an
/// unterminated quote, a dangling backslash, an unescaped separator or a
/// bare `%`.
pub fn unescape_literal(value: &str) -> Option<String> {
    expand(&parse_value(value)?)
}

/// Graph and option levels only.
fn parse_value(value: &str) -> Option<String> {
    let (graph, rest) = read_token(value, &['[', ']', ',', ';'])?;
    if !rest.is_empty() {
        return None;
    }
    let (option, rest) = read_token(&graph, &[':'])?;
    rest.is_empty().then_some(option)
}

/// Wrap in single quotes; an embedded `'` closes, escapes and reopens.
fn quote_graph(body: &str) -> String {
    format!("'{}'", body.replace('\'', r"'\''"))
}

/// Byte range between leading and trailing whitespace.
fn content_bounds(text: &str) -> (usize, usize) {
    let first = text.len() - text.trim_start_matches(&WHITESPACE[..]).len();
    let last = text.trim_end_matches(&WHITESPACE[..]).len().max(first);
    (first, last)
}

/// Read one token up to an unquoted, unescaped terminator.
///
/// Leading whitespace is skipped and trailing whitespace trimmed, except
/// where it was quoted or escaped. Returns the token and the unread rest.
fn read_token<'a>(input: &'a str, terms: &[char]) -> Option<(String, &'a str)> {
    let input = input.trim_start_matches(&WHITESPACE[..]);
    let mut out = String::with_capacity(input.len());
    // Length of `out` that trimming must not cut into
    let mut keep = 0;
    let mut chars = input.char_indices();
    let mut rest = "";
    while let Some((i, c)) = chars.next() {
        if terms.contains(&c) {
            rest = &input[i..];
            break;
        }
        match c {
            '\\' => {
                out.push(chars.next()?.1);
                keep = out.len();
            }
            '\'' => loop {
                match chars.next()?.1 {
                    '\'' => {
                        keep = out.len();
                        break;
                    }
                    q => out.push(q),
                }
            },
            _ => out.push(c),
        }
    }
    let trimmed = out[keep..].trim_end_matches(&WHITESPACE[..]).len();
    out.truncate(keep + trimmed);
    Some((out, rest))
}

/// Expansion level: `\c` is `c`, bare `%` is invalid.
fn expand(value: &str) -> Option<String> {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.push(chars.next()?),
            // An unescaped % would start an expansion sequence
            '%' => return None,
            _ => out.push(c),
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_vector_apostrophe_colon_backslash() {
        let input = "it's: a\\test";
        assert_eq!(escape_literal(input), r"it\'s\: a\\\\test");
        assert_eq!(quote_literal(input), r"'it\'\''s\: a\\\\test'");
        assert_eq!(unescape_literal(&quote_literal(input)).as_deref(), Some(input));
    }

    #[test]
    fn fixed_vectors() {
        let cases = [
            ("HELLO WORLD", "HELLO WORLD"),
            ("50%", r"50\\%"),
            ("a:b:c", r"a\:b\:c"),
            ("two\nlines", "two\nlines"),
            (r"C:\path", r"C\:\\\\path"),
            ("[x],y;z", "[x],y;z"),
            ("''", r"\'\'"),
            (r"\n", r"\\\\n"),
            (" pad ", r"\ pad\ "),
        ];
        for (input, expected) in cases {
            assert_eq!(escape_literal(input), expected, "input {input:?}");
        }
    }

    #[test]
    fn option_separator_stays_inside_text() {
        let filter = format!("text={}:fontsize=60", quote_literal("it's: 100%"));
        let (args, rest) = read_token(&filter, &['[', ']', ',', ';']).unwrap();
        assert!(rest.is_empty());

        let value = args.strip_prefix("text=").unwrap();
        let (text, rest) = read_token(value, &[':']).unwrap();
        assert_eq!(rest, ":fontsize=60");
        assert_eq!(expand(&text).as_deref(), Some("it's: 100%"));
    }

    #[test]
    fn round_trips_metacharacter_combinations() {
        let alphabet = ['a', '\\', '\'', ':', '[', ']', ',', ';', '\n', '%', ' ', 'n'];
        // Every string of length <= 3 over the alphabet
        let mut inputs = vec![String::new()];
        for _ in 0..3 {
            let mut next = Vec::new();
            for prefix in &inputs {
                for c in alphabet {
                    let mut s = prefix.clone();
                    s.push(c);
                    next.push(s);
                }
            }
            inputs.extend(next);
        }
        for input in inputs {
            let parsed = unescape_literal(&quote_literal(&input));
            assert_eq!(parsed.as_deref(), Some(input.as_str()), "input {input:?}");
        }
    }

    #[test]
    fn round_trips_printable_ascii() {
        let all: String = (0x20u8..0x7f).map(char::from).collect();
        assert_eq!(unescape_literal(&quote_literal(&all)), Some(all));
    }

    #[test]
    fn unicode_passes_through() {
        let text = "안녕 こんにちは 你好 🎬";
        assert_eq!(escape_literal(text), text);
        assert_eq!(
            unescape_literal(&quote_literal(text)).as_deref(),
            Some(text)
        );
    }

    #[test]
    fn carriage_returns_are_dropped() {
        assert_eq!(escape_literal("a\r\nb"), "a\nb");
    }

    #[test]
    fn under_escaped_values_are_rejected() {
        // Single graph-level quoting leaves a bare quote for the option level
        assert_eq!(unescape_literal(r"'it'\''s'"), None);
        // Unescaped option separator
        assert_eq!(unescape_literal("'a:b'"), None);
        // Expansion sequence
        assert_eq!(unescape_literal(r"'\%{pts}'"), None);
        assert_eq!(unescape_literal("'50%'"), None);
        // Unterminated quote
        assert_eq!(unescape_literal("'abc"), None);
    }

    #[test]
    fn unescaped_backslash_is_swallowed() {
        assert_eq!(unescape_literal(r"'back\slash'").as_deref(), Some("backslash"));
        assert_eq!(
            unescape_literal(&quote_literal(r"back\slash")).as_deref(),
            Some(r"back\slash")
        );
    }

    #[test]
    fn quote_value_escapes_option_separators() {
        assert_eq!(quote_value("/fonts/Noto Sans.ttf"), "'/fonts/Noto Sans.ttf'");
        assert_eq!(quote_value("C:/Fonts/x.ttf"), r"'C\:/Fonts/x.ttf'");
        assert_eq!(quote_value("it's.ttf"), r"'it\'\''s.ttf'");
        assert_eq!(
            parse_value(&quote_value(r"C:\Fonts\it's.ttf")).as_deref(),
            Some(r"C:\Fonts\it's.ttf")
        );
    }
}
