//! Checks applied to user text before it is piped into the engine.

pub const MIN_TRIMMED_CHARS: usize = 2;
pub const MAX_INPUT_BYTES: usize = 100 * 1024;
pub const MAX_SPECIAL_CHAR_RATIO: f64 = 0.3;
pub const SPECIAL_CHARS: &str = "!@#$%^&*()_+[]{}|\\;:'\",.<>?`~";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputRejection {
    #[error("Input content cannot be empty.")]
    Empty,
    #[error("Input content must be at least 2 characters long.")]
    TooShort,
    #[error("Input content exceeds maximum size of 100KB.")]
    TooLarge,
    #[error("Input contains too many special characters.")]
    TooManySpecialChars,
    #[error("Input contains invalid control characters.")]
    ControlCharacters,
    #[error("Input contains invalid Unicode characters.")]
    InvalidUnicode,
}

/// Sanitized text ready for the engine, plus whether sanitizing changed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedInput {
    pub text: String,
    pub sanitized: bool,
}

/// Runs the checks in a fixed order and reports the first failure.
pub fn validate(text: &str) -> Result<(), InputRejection> {
    validate_content(text, text.len())
}

/// Same checks for raw bytes; undecodable input fails last, after the
/// checks that can be evaluated on a lossy decode.
pub fn validate_bytes(raw: &[u8]) -> Result<(), InputRejection> {
    match std::str::from_utf8(raw) {
        Ok(text) => validate(text),
        Err(_) => {
            let lossy = String::from_utf8_lossy(raw);
            validate_content(&lossy, raw.len())?;
            Err(InputRejection::InvalidUnicode)
        }
    }
}

/// Whitespace for emptiness checks. The ASCII information separators
/// U+001C..=U+001F count as blank even though `char::is_whitespace` disagrees.
fn is_blank(c: char) -> bool {
    c.is_whitespace() || ('\u{1c}'..='\u{1f}').contains(&c)
}

fn validate_content(text: &str, byte_len: usize) -> Result<(), InputRejection> {
    let trimmed = text.trim_matches(is_blank);
    if trimmed.is_empty() {
        return Err(InputRejection::Empty);
    }
    if trimmed.chars().count() < MIN_TRIMMED_CHARS {
        return Err(InputRejection::TooShort);
    }
    if byte_len > MAX_INPUT_BYTES {
        return Err(InputRejection::TooLarge);
    }

    let total = text.chars().count();
    let special = text.chars().filter(|c| SPECIAL_CHARS.contains(*c)).count();
    if special as f64 / total as f64 > MAX_SPECIAL_CHAR_RATIO {
        return Err(InputRejection::TooManySpecialChars);
    }

    if text.chars().any(is_disallowed_control) {
        return Err(InputRejection::ControlCharacters);
    }
    Ok(())
}

fn is_disallowed_control(c: char) -> bool {
    (c as u32) < 32 && !matches!(c, '\t' | '\n' | '\r')
}

/// Drops NULs, blanks out other control characters and collapses every
/// whitespace run into a single space. Idempotent.
pub fn sanitize(text: &str) -> String {
    let replaced: String = text
        .chars()
        .filter(|c| *c != '\0')
        .map(|c| if is_disallowed_control(c) { ' ' } else { c })
        .collect();
    replaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn prepare(text: &str) -> Result<PreparedInput, InputRejection> {
    validate(text)?;
    let cleaned = sanitize(text);
    let sanitized = cleaned != text;
    Ok(PreparedInput {
        text: cleaned,
        sanitized,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_whitespace_only_are_rejected_first() {
        assert_eq!(validate(""), Err(InputRejection::Empty));
        assert_eq!(validate(" \n\t "), Err(InputRejection::Empty));
    }

    #[test]
    fn information_separators_trim_like_whitespace() {
        assert_eq!(validate("\u{1c}\u{1c}"), Err(InputRejection::Empty));
        assert_eq!(validate("\u{1f} \u{1d}"), Err(InputRejection::Empty));
        assert_eq!(validate("\u{1c}a"), Err(InputRejection::TooShort));
        assert_eq!(validate("a\u{1e}b"), Err(InputRejection::ControlCharacters));
    }

    #[test]
    fn single_visible_character_is_too_short() {
        assert_eq!(validate("  a  "), Err(InputRejection::TooShort));
        assert_eq!(validate("ab"), Ok(()));
    }

    #[test]
    fn size_limit_counts_utf8_bytes() {
        let at_limit = "a".repeat(MAX_INPUT_BYTES);
        assert_eq!(validate(&at_limit), Ok(()));

        let multibyte = "é".repeat(MAX_INPUT_BYTES / 2 + 1);
        assert_eq!(validate(&multibyte), Err(InputRejection::TooLarge));
    }

    #[test]
    fn special_character_ratio_above_threshold_fails() {
        assert_eq!(validate("abcdefg!!!"), Ok(()));
        assert_eq!(validate("abcdef!!!!"), Err(InputRejection::TooManySpecialChars));
    }

    #[test]
    fn size_check_runs_before_special_ratio() {
        let text = "!".repeat(MAX_INPUT_BYTES + 1);
        assert_eq!(validate(&text), Err(InputRejection::TooLarge));
    }

    #[test]
    fn control_characters_other_than_tab_newline_cr_fail() {
        assert_eq!(validate("line one\r\n\tline two"), Ok(()));
        assert_eq!(validate("bell\u{7}here"), Err(InputRejection::ControlCharacters));
        assert_eq!(validate("nul\0here"), Err(InputRejection::ControlCharacters));
    }

    #[test]
    fn undecodable_bytes_fail_after_other_checks() {
        assert_eq!(validate_bytes(b"valid text"), Ok(()));
        assert_eq!(
            validate_bytes(b"plain text \xff\xfe more"),
            Err(InputRejection::InvalidUnicode)
        );
        assert_eq!(validate_bytes(b"\xff"), Err(InputRejection::TooShort));
    }

    #[test]
    fn sanitize_strips_controls_and_collapses_whitespace() {
        assert_eq!(sanitize("  hello\0 \u{1}world\n\n\tagain  "), "hello world again");
        assert_eq!(sanitize("a\u{1b}b"), "a b");
        assert_eq!(sanitize(""), "");
    }

    #[test]
    fn sanitize_is_idempotent() {
        let samples = [
            "plain",
            "  padded \t text \r\n",
            "ctl\u{2}\u{3}\u{4}mix\0ed",
            "\0\0\0",
            "unicode\u{a0}space and\u{2003}em",
            "",
        ];
        for sample in samples {
            let once = sanitize(sample);
            assert_eq!(sanitize(&once), once, "sample {sample:?}");
        }
    }

    #[test]
    fn sanitized_text_never_fails_on_control_characters() {
        let samples = ["ab\0cd\u{5}ef", "x\u{1f}y\u{0b}z", "tab\tand\u{7f}del"];
        for sample in samples {
            let cleaned = sanitize(sample);
            assert_ne!(validate(&cleaned), Err(InputRejection::ControlCharacters));
        }
    }

    #[test]
    fn prepare_flags_changed_text() {
        let prepared = prepare("hello   world").expect("valid");
        assert_eq!(prepared.text, "hello world");
        assert!(prepared.sanitized);

        let untouched = prepare("hello world").expect("valid");
        assert!(!untouched.sanitized);

        assert_eq!(prepare(" "), Err(InputRejection::Empty));
    }
}
