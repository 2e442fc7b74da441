//! Artist/title normalization and shared text helpers.
//!
//! The normalizer pulls "featuring" clauses out of whichever of the artist,
//! title and subtitle fields carry them, and returns a [`NormalizedQuery`].
//! The helpers below it produce the comparison strings used by the matcher
//! and the lookup keys used by the genre taxonomy.
//!
//! CRITICAL: `genre_key` is applied to stored genre names and to queried tags
//! alike. Changing it changes which aliases collide at taxonomy load.

use any_ascii::any_ascii;
use once_cell::sync::Lazy;
use regex::Regex;
use rustc_hash::FxHashSet;
use unicode_normalization::UnicodeNormalization;

use crate::config::NormalizerConfig;
use crate::models::NormalizedQuery;

// ============================================================================
// REGEX PATTERNS
// ============================================================================

/// Featuring markers followed by their separator. Dotted forms may be glued
/// to the name ("feat.Someone"); bare forms need whitespace.
const FEAT_MARKERS: &str = r"featuring\s+|feat\.\s*|feat\s+|ft\.\s*|ft\s+";

/// One bracketed clause body; a single level of nesting is allowed so
/// "(feat. A (UK))" closes on the outer bracket.
const BRACKET_BODY: &str = r"(?:[^\(\)\[\]]|[\(\[][^\(\)\[\]]*[\)\]])*";

/// Featuring clauses in the artist field: "(feat. X)", "[ft. X]", "(with X)",
/// and unbracketed "feat. X" / "with X" running to the next bracket or the end.
/// A bare "with" must follow a name, so "With Confidence" stays whole.
pub static ARTIST_FEATURING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)[\(\[]\s*(?:{m}|with\s+)(?P<bracket>{b})[\)\]]|(?:(?:^|\s)(?:{m})|\swith\s+)(?P<bare>[^\(\)\[\]]+)",
        m = FEAT_MARKERS,
        b = BRACKET_BODY
    ))
    .unwrap()
});

/// Featuring clauses in title/subtitle fields. Bare "with" is ordinary title
/// text here ("Dancing with Myself"); only the bracketed form counts.
pub static TITLE_FEATURING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)[\(\[]\s*(?:{m}|with\s+)(?P<bracket>{b})[\)\]]|(?:^|\s)(?:{m})(?P<bare>[^\(\)\[\]]+)",
        m = FEAT_MARKERS,
        b = BRACKET_BODY
    ))
    .unwrap()
});

/// "&" or the word "and" between two names of a featuring clause
pub static AND_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s*&\s*|\s+and\s+").unwrap());

/// Oxford-comma leftover: "A, B, and C" leaves "and C" as the last segment
pub static LEADING_AND: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^and\s+").unwrap());

/// Collaboration separators inside the artist field itself.
/// Matches: &, +, ",", x, vs, vs.
pub static COLLABORATION_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s*[&,+]\s*|\s+(?:x|vs\.?)\s+").unwrap());

/// Brackets left with nothing inside after a clause was cut out
pub static EMPTY_BRACKETS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\(\[]\s*[\)\]]").unwrap());

/// Padding just inside a bracket: "( Remix )"
pub static BRACKET_PADDING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([\(\[])\s+|\s+([\)\]])").unwrap());

/// A dash left dangling at the end: "Song - feat. X" → "Song -"
pub static TRAILING_DASH: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*[-–—]+\s*$").unwrap());

/// A marker with no name after it: "Song feat."
pub static DANGLING_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s+(?:featuring|feat\.?|ft\.?)\s*$").unwrap());

/// Any run of whitespace
pub static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Anything that is not a lowercase ASCII letter or digit (after folding)
pub static NON_ALNUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").unwrap());

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

/// Check if a character is a Unicode combining mark (diacritical mark).
/// Used to filter out accents during normalization.
pub fn is_combining_mark(c: char) -> bool {
    matches!(c as u32, 0x0300..=0x036F | 0x1AB0..=0x1AFF | 0x1DC0..=0x1DFF | 0xFE20..=0xFE2F)
}

/// Fold Unicode text to ASCII by applying NFKD decomposition and removing combining marks.
/// e.g., "Beyoncé" → "beyonce", "Motörhead" → "motorhead"
pub fn fold_to_ascii(s: &str) -> String {
    // First strip diacritics via NFKD decomposition
    let stripped: String = s.nfkd().filter(|c| !is_combining_mark(*c)).collect();
    // Then transliterate any remaining non-ASCII (Cyrillic, Hebrew, CJK, etc.)
    any_ascii(&stripped).to_lowercase()
}

/// Collapse whitespace runs into single spaces and trim.
pub fn collapse_whitespace(s: &str) -> String {
    WHITESPACE.replace_all(s.trim(), " ").into_owned()
}

/// Comparison form used by the matcher: folded, lowercased, whitespace collapsed.
pub fn normalize_text(s: &str) -> String {
    collapse_whitespace(&fold_to_ascii(s))
}

/// Lookup key for genre names, aliases and tags.
///
/// Case, accents and punctuation are ignored, and the usual spellings of
/// "and" are unified:
/// "Happy Hardcore" / "happy-hardcore" → "happy hardcore",
/// "Drum 'n' Bass" / "drum & bass" / "drum+bass" → "drum and bass",
/// "R&B" → "r and b".
pub fn genre_key(s: &str) -> String {
    let folded = fold_to_ascii(s).replace(['&', '+'], " and ");
    let spaced = NON_ALNUM.replace_all(&folded, " ");
    spaced
        .split_whitespace()
        .map(|token| if token == "n" { "and" } else { token })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Split a featuring clause into individual names.
///
/// Commas split first; "&" and "and" only split the last comma segment,
/// so "A, B & C" → ["A", "B", "C"] and "A & B, C" → ["A & B", "C"].
pub fn split_artists(clause: &str) -> Vec<String> {
    let segments: Vec<String> = clause
        .split(',')
        .map(|s| LEADING_AND.replace(s.trim(), "").into_owned())
        .filter(|s| !s.trim().is_empty())
        .collect();

    let Some((last, head)) = segments.split_last() else {
        return Vec::new();
    };

    let mut names: Vec<String> = head.iter().map(|s| collapse_whitespace(s)).collect();
    names.extend(
        AND_SEPARATOR
            .split(last)
            .map(collapse_whitespace)
            .filter(|s| !s.is_empty()),
    );
    names
}

/// Tidy a field after clauses were cut out of it.
fn tidy_field(s: &str) -> String {
    let mut result = EMPTY_BRACKETS.replace_all(s, " ").into_owned();
    result = BRACKET_PADDING.replace_all(&result, "$1$2").into_owned();
    result = collapse_whitespace(&result);
    TRAILING_DASH.replace(&result, "").into_owned()
}

/// Drop trailing markers that introduce nobody.
fn strip_dangling_markers(s: &str) -> String {
    let mut result = s.trim_end().to_string();
    while let Some(m) = DANGLING_MARKER.find(&result) {
        result.truncate(m.start());
    }
    result
}

/// Cut every featuring clause matched by `pattern` out of `field`.
/// Returns the cleaned field and the names found, in order of appearance.
fn extract_featuring(field: &str, pattern: &Regex) -> (String, Vec<String>) {
    let mut names = Vec::new();
    let mut cleaned = String::with_capacity(field.len());
    let mut last = 0;

    for caps in pattern.captures_iter(field) {
        let Some(whole) = caps.get(0) else { continue };
        cleaned.push_str(&field[last..whole.start()]);
        cleaned.push(' ');
        last = whole.end();

        let clause = caps
            .name("bracket")
            .or_else(|| caps.name("bare"))
            .map_or("", |m| m.as_str());
        names.extend(split_artists(clause));
    }

    if last == 0 {
        // No clause: the field passes through, trimmed
        let trimmed = field.trim();
        if DANGLING_MARKER.is_match(trimmed) {
            return (tidy_field(&strip_dangling_markers(trimmed)), names);
        }
        return (trimmed.to_string(), names);
    }

    cleaned.push_str(&field[last..]);
    (tidy_field(&strip_dangling_markers(&cleaned)), names)
}

// ============================================================================
// NORMALIZER
// ============================================================================

/// Pure artist/title normalizer.
#[derive(Clone, Debug, Default)]
pub struct Normalizer {
    config: NormalizerConfig,
}

impl Normalizer {
    pub fn new(config: NormalizerConfig) -> Self {
        Self { config }
    }

    /// Normalize a raw (artist, title, subtitle) triple.
    ///
    /// Never fails: input without any featuring marker yields an empty
    /// additional-artist list and the fields trimmed.
    pub fn normalize(&self, artist: &str, title: &str, subtitle: &str) -> NormalizedQuery {
        let (artist_head, artist_featured) = extract_featuring(artist, &ARTIST_FEATURING);
        let (title, title_featured) = extract_featuring(title, &TITLE_FEATURING);
        let (subtitle, subtitle_featured) = extract_featuring(subtitle, &TITLE_FEATURING);

        let (mut primary, collaborators) = if self.config.split_collaborations {
            let mut parts = COLLABORATION_SEPARATOR
                .split(&artist_head)
                .map(collapse_whitespace)
                .filter(|s| !s.is_empty());
            let primary = parts.next().unwrap_or_default();
            (primary, parts.collect::<Vec<_>>())
        } else {
            (artist_head, Vec::new())
        };

        let mut extracted = collaborators
            .into_iter()
            .chain(artist_featured)
            .chain(title_featured)
            .chain(subtitle_featured);

        // An artist field holding only "feat. X" promotes the first name
        if primary.is_empty() {
            primary = extracted.next().unwrap_or_default();
        }

        let mut seen: FxHashSet<String> = FxHashSet::default();
        seen.insert(primary.to_lowercase());
        let additional_artists = extracted
            .filter(|name| seen.insert(name.to_lowercase()))
            .collect();

        NormalizedQuery {
            artist: primary,
            additional_artists,
            title,
            subtitle,
        }
    }
}

/// Normalize with the default configuration.
pub fn normalize(artist: &str, title: &str, subtitle: &str) -> NormalizedQuery {
    Normalizer::default().normalize(artist, title, subtitle)
}

// ============================================================================
// TESTS
// ============================================================================
