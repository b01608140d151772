//! Plate text normalization
//!
//! OCR confuses visually similar glyphs (`O`/`0`, `S`/`5`, `B`/`8` ...).
//! [`normalize`] repairs raw OCR text towards the national plate grammar
//! (one to three letters, one to four digits, an optional trailing letter)
//! and only ever returns a changed string when the repaired string is valid.

use regex::Regex;
use std::sync::OnceLock;

/// Organization-issued prefixes exempt from grammar correction
pub const VANITY_PREFIXES: &[&str] = &[
    "PUTRAJAYA", "PROTON", "PERODUA", "WAJA", "SUKOM", "LIMO", "RIMAU",
    "BAMBEE", "IM4U", "1M4U", "PATRIOT", "VIP", "VIPS", "PERFECT", "NAAM",
    "G1M", "GP", "US", "UP", "A1M", "GOLD", "MALAYSIA", "NBOS", "GTR",
    "SAM", "K1M", "T1M", "FFF", "GG", "G", "FD", "FE", "FB", "X", "XX",
    "YY", "UU", "Q", "KRISS", "LOTUS", "MADANI", "NBOS", "PETRA", "PUTRA",
    "PERSONA", "PERDANA", "SATRIA", "SAS", "TIARA", "UNIMAS", "UNISZA", "UTEM",
    "UiTM", "IIUM", "WAJA", "WCEC", "XIIINAM", "XOIC", "XXVIASEAN", "XXXIDB",
    "UUU",
];

fn plate_grammar() -> &'static Regex {
    static GRAMMAR: OnceLock<Regex> = OnceLock::new();
    GRAMMAR.get_or_init(|| Regex::new(r"^[A-Z]{1,3}[0-9]{1,4}[A-Z]?$").expect("valid plate grammar"))
}

/// True when `text` matches the canonical plate grammar
pub fn is_valid_plate(text: &str) -> bool {
    plate_grammar().is_match(text)
}

/// Uppercase and drop spaces and hyphens
pub fn clean(text: &str) -> String {
    text.to_uppercase()
        .chars()
        .filter(|c| *c != ' ' && *c != '-')
        .collect()
}

fn correct_prefix_letter(c: char) -> char {
    match c {
        'O' => 'Q',
        'N' => 'W',
        other => other,
    }
}

fn correct_digit(c: char) -> char {
    match c {
        'B' => '8',
        'O' | 'D' | 'Q' => '0',
        'I' => '1',
        'S' => '5',
        'Z' => '7',
        'G' => '6',
        'J' => '3',
        other => other,
    }
}

/// Repair raw OCR text into a canonical plate string. Never fails.
pub fn normalize(raw_text: &str) -> String {
    if VANITY_PREFIXES.iter().any(|vp| raw_text.starts_with(vp)) {
        return raw_text.to_string();
    }

    let text = clean(raw_text);
    if text.chars().count() < 2 || is_valid_plate(&text) {
        return text;
    }

    let Some(digit_start) = text.find(|c: char| c.is_ascii_digit()) else {
        return text;
    };
    let (prefix, rest) = text.split_at(digit_start);

    let prefix: String = prefix
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .map(correct_prefix_letter)
        .take(3)
        .collect();

    let number: String = rest
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(correct_digit)
        .filter(|c| c.is_ascii_digit())
        .take(4)
        .collect();

    let suffix = rest
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .last()
        .map(String::from)
        .unwrap_or_default();

    let candidate = format!("{}{}{}", prefix, number, suffix);
    if is_valid_plate(&candidate) {
        candidate
    } else {
        text
    }
}

/// Whether an uppercase raw reading carries a vanity prefix at, or within a
/// few characters of, its start.
pub fn is_vanity_reading(raw_upper: &str) -> bool {
    VANITY_PREFIXES.iter().any(|vp| {
        if raw_upper.starts_with(vp) {
            return true;
        }
        let window: String = raw_upper.chars().take(vp.chars().count() + 4).collect();
        window.contains(vp)
    })
}

/// Digit-to-letter lookalike substitution applied to vanity readings
pub fn vanity_lookalikes(raw: &str) -> String {
    raw.replace('0', "O").replace('1', "I")
}
