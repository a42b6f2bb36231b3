// SPDX-License-Identifier: GPL-3.0-or-later

//! Text folding applied before titles and artists are compared.
//!
//! Folding lowercases, strips diacritics (NFKD with combining marks removed),
//! drops punctuation and collapses whitespace. Titles additionally lose
//! featured-artist annotations and trailing version qualifiers such as
//! `(Remastered 2011)` or `- Live`.

use lazy_static::lazy_static;
use regex::Regex;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    // (feat. X), [ft. X], (featuring X) anywhere in the title
    static ref BRACKETED_FEATURING: Regex =
        Regex::new(r"(?i)\s*[(\[]\s*(?:feat\.?|ft\.?|featuring|with)\s[^)\]]*[)\]]").unwrap();

    // "Song feat. X" / "Song ft. X" / "Song featuring X" up to the end
    static ref TRAILING_FEATURING: Regex =
        Regex::new(r"(?i)\s+(?:feat\.?|ft\.?|featuring)\s.*$").unwrap();

    static ref TRAILING_BRACKETS: Regex = Regex::new(r"\s*[(\[][^)\]]*[)\]]\s*$").unwrap();

    static ref ANY_BRACKETS: Regex = Regex::new(r"\s*[(\[][^)\]]*[)\]]").unwrap();

    // "- Live", "- 2011 Remaster", "- Radio Edit", "- Acoustic Version" at the end
    static ref VERSION_QUALIFIER: Regex = Regex::new(
        r"(?i)\s+[-\x{2013}\x{2014}]\s+[^-\x{2013}\x{2014}]*\b(?:live|remaster(?:ed)?|radio edit|edit|version|mix|remix|mono|stereo|acoustic|demo|single|instrumental|bonus track|re-?recorded)\b[^-\x{2013}\x{2014}]*$"
    ).unwrap();

    // Any trailing " - something", also with an en or em dash
    static ref TRAILING_DASH: Regex = Regex::new(r"\s+[-\x{2013}\x{2014}]\s+.*$").unwrap();

    static ref LEADING_THE: Regex = Regex::new(r"^the\s+").unwrap();
}

/// Lowercase, fold diacritics, drop punctuation, collapse whitespace.
pub fn fold(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.nfkd().filter(|c| !is_combining_mark(*c)) {
        if c.is_alphanumeric() {
            out.extend(c.to_lowercase());
        } else if !matches!(c, '\'' | '\u{2019}' | '.') {
            // apostrophes and dots vanish: "Don't" -> "dont", "R.E.M." -> "rem"
            out.push(' ');
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Fold a title after removing featuring annotations and version qualifiers.
///
/// Falls back to the plainly folded title when stripping would leave nothing,
/// so `"(Intro)"` still compares as `"intro"`.
pub fn normalize_title(title: &str) -> String {
    let mut stripped = BRACKETED_FEATURING.replace_all(title, "").into_owned();
    stripped = TRAILING_FEATURING.replace(&stripped, "").into_owned();

    loop {
        let next = TRAILING_BRACKETS.replace(&stripped, "").into_owned();
        let next = VERSION_QUALIFIER.replace(&next, "").into_owned();
        if next == stripped {
            break;
        }
        stripped = next;
    }

    let folded = fold(&stripped);
    if folded.is_empty() {
        fold(title)
    } else {
        folded
    }
}

/// Fold an artist name and drop a leading "the".
pub fn normalize_artist(artist: &str) -> String {
    let folded = fold(artist);
    let stripped = LEADING_THE.replace(&folded, "").into_owned();
    if stripped.is_empty() {
        folded
    } else {
        stripped
    }
}

/// Remove every bracketed segment and the trailing ` - qualifier`, keeping
/// the original casing so the result can be sent as a query.
pub fn simplify_title(title: &str) -> String {
    let without_brackets = ANY_BRACKETS.replace_all(title, "");
    let without_dash = TRAILING_DASH.replace(&without_brackets, "");
    let simplified = without_dash.split_whitespace().collect::<Vec<_>>().join(" ");

    if simplified.is_empty() {
        title.trim().to_string()
    } else {
        simplified
    }
}

/// Tokens of a folded string in sorted order, re-joined with single spaces.
pub fn sorted_tokens(folded: &str) -> String {
    let mut tokens: Vec<&str> = folded.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}
