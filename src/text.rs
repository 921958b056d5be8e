//! Turkish-aware text helpers.
//!
//! Everything here is pure and total: case folding for the dotted/dotless I
//! pairs, HTML entity decoding for text exported by the sheet backend, a
//! collation order that matches the Turkish alphabet, and the comma-split
//! used for co-assigned people.

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use std::cmp::Ordering;

/// Collation order of letters. `q`, `w` and `x` are not Turkish letters but
/// appear in foreign names and sort where the Latin alphabet puts them.
const ALPHABET: &str = "abcçdefgğhıijklmnoöpqrsştuüvwxyz";

lazy_static! {
    static ref ENTITY_PATTERN: Regex = Regex::new(r"&(?:amp|lt|gt|quot|#39|nbsp);")
        .expect("entity pattern is valid");
}

/// Lowercase with Turkish rules: `İ` becomes `i` and `I` becomes `ı`.
///
/// The remaining pairs (Ğ/ğ, Ü/ü, Ş/ş, Ö/ö, Ç/ç) already lowercase correctly
/// under the Unicode default mapping.
pub fn tr_lower(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            'İ' => out.push('i'),
            'I' => out.push('ı'),
            _ => out.extend(c.to_lowercase()),
        }
    }
    out
}

/// Case-insensitive substring test using [`tr_lower`] on both sides.
pub fn tr_contains(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    tr_lower(haystack).contains(&tr_lower(needle))
}

/// Case-insensitive equality of trimmed strings.
pub fn tr_eq(a: &str, b: &str) -> bool {
    tr_lower(a.trim()) == tr_lower(b.trim())
}

/// Decode the handful of HTML entities the sheet export produces.
///
/// Single pass: `&amp;lt;` decodes to `&lt;`, not `<`.
pub fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    ENTITY_PATTERN
        .replace_all(s, |caps: &Captures| match &caps[0] {
            "&amp;" => "&",
            "&lt;" => "<",
            "&gt;" => ">",
            "&quot;" => "\"",
            "&#39;" => "'",
            _ => " ",
        })
        .into_owned()
}

/// Split a comma-joined person field into trimmed, non-empty names.
pub fn split_names(field: &str) -> impl Iterator<Item = &str> {
    field.split(',').map(str::trim).filter(|name| !name.is_empty())
}

/// Compare two strings in Turkish collation order.
///
/// Primary level: punctuation and spaces, then digits, then letters in
/// alphabet order, then anything else; case and circumflex are ignored.
/// Ties fall through to circumflex, then lowercase-before-uppercase, then
/// raw code points so the order is total.
pub fn tr_compare(a: &str, b: &str) -> Ordering {
    a.chars()
        .map(primary_key)
        .cmp(b.chars().map(primary_key))
        .then_with(|| a.chars().map(accent_key).cmp(b.chars().map(accent_key)))
        .then_with(|| a.chars().map(case_key).cmp(b.chars().map(case_key)))
        .then_with(|| a.cmp(b))
}

/// Sort a list of strings in place with [`tr_compare`].
pub fn tr_sort(items: &mut [String]) {
    items.sort_by(|a, b| tr_compare(a, b));
}

fn fold_char(c: char) -> char {
    match c {
        'İ' => 'i',
        'I' => 'ı',
        'â' | 'Â' => 'a',
        'î' | 'Î' => 'i',
        'û' | 'Û' => 'u',
        _ => c.to_lowercase().next().unwrap_or(c),
    }
}

fn primary_key(c: char) -> (u8, u32) {
    let folded = fold_char(c);
    if let Some(pos) = ALPHABET.chars().position(|letter| letter == folded) {
        return (2, pos as u32);
    }
    if let Some(digit) = c.to_digit(10) {
        return (1, digit);
    }
    if !c.is_alphanumeric() {
        return (0, c as u32);
    }
    (3, folded as u32)
}

fn accent_key(c: char) -> u8 {
    matches!(c, 'â' | 'Â' | 'î' | 'Î' | 'û' | 'Û') as u8
}

fn case_key(c: char) -> u8 {
    c.is_uppercase() as u8
}
