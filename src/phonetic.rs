//! Phonetic keys: a romanized pronunciation used to compare mentions.
//!
//! Han characters become toneless pinyin, other letters and digits are
//! lowercased and kept, everything else (spaces, punctuation) is dropped.
//! "北京", "北jing" and "Bei Jing" all encode to `beijing`.

use pinyin::ToPinyin;

/// Append the key fragment for a single character to `out`.
///
/// Returns `true` when the character contributed anything.
pub fn push_char_key(c: char, out: &mut String) -> bool {
    if let Some(p) = c.to_pinyin() {
        out.push_str(p.plain());
        return true;
    }
    if c.is_alphanumeric() {
        out.extend(c.to_lowercase());
        return true;
    }
    false
}

/// Encode `text` into its phonetic key.
pub fn phonetic_key(text: &str) -> String {
    let mut key = String::with_capacity(text.len() * 2);
    for c in text.chars() {
        push_char_key(c, &mut key);
    }
    key
}

/// Characters that belong to a Latin or digit run which must never be split
/// by a span boundary ("jing" in "北jing").
pub fn is_run_char(c: char) -> bool {
    c.is_ascii_alphanumeric()
}
