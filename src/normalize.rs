//! Text canonicalization ahead of trigger-term search.
//!
//! Produces two comparison variants of a message: `spaced` keeps the word breaks,
//! `collapsed` drops all whitespace so "l f o" still reads as "lfo". Offsets into
//! `collapsed` map back to `spaced`, which is the message position matches are ordered by.
//! Pictographs and other symbols drop out rather than being spelled as words.

use deunicode::deunicode_with_tofu;
use lazy_static::lazy_static;
use std::collections::HashMap;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    /// Lookalike glyphs people use to dodge reactions, mapped to what they imitate
    static ref EVASION_GLYPHS: HashMap<char, char> = {
        let mut m = HashMap::new();
        m.insert('\u{A71E}', 'i');
        m.insert('\u{2006}', ' ');
        m
    };
}

/// Both search variants of one message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedText {
    /// Lower-case ASCII with spaces preserved
    pub spaced: String,
    /// `spaced` with all whitespace removed
    pub collapsed: String,
    /// For each byte of `collapsed`, its offset in `spaced`
    collapsed_offsets: Vec<usize>,
}

impl NormalizedText {
    /// Pick the variant a term scans
    pub fn variant(&self, spaced: bool) -> &str {
        if spaced {
            &self.spaced
        } else {
            &self.collapsed
        }
    }

    /// Translate an offset in the chosen variant to its offset in `spaced`.
    /// The end of `collapsed` maps to the end of `spaced`.
    pub fn spaced_offset(&self, spaced: bool, offset: usize) -> usize {
        if spaced {
            return offset;
        }
        self.collapsed_offsets
            .get(offset)
            .copied()
            .unwrap_or(self.spaced.len())
    }
}

/// Normalize raw message text. Never fails; unrepresentable characters drop out.
pub fn normalize(raw: &str) -> NormalizedText {
    let spaced = to_search_ascii(raw);

    let mut collapsed = String::with_capacity(spaced.len());
    let mut collapsed_offsets = Vec::with_capacity(spaced.len());
    for (i, c) in spaced.char_indices().filter(|(_, c)| !c.is_ascii_whitespace()) {
        collapsed.push(c);
        collapsed_offsets.push(i);
    }

    NormalizedText {
        spaced,
        collapsed,
        collapsed_offsets,
    }
}

/// Letters, digits, whitespace and ASCII punctuation survive; emoji and other symbols
/// would otherwise be transliterated into their names
fn is_searchable(c: char) -> bool {
    c.is_alphanumeric() || c.is_whitespace() || c.is_ascii_punctuation()
}

fn to_search_ascii(raw: &str) -> String {
    let unglyphed: String = raw
        .chars()
        .map(|c| EVASION_GLYPHS.get(&c).copied().unwrap_or(c))
        .collect();

    // NFKD folds superscripts, widths and ligatures; combining marks are the stripped accents
    let decomposed: String = unglyphed
        .nfkd()
        .filter(|c| !is_combining_mark(*c) && is_searchable(*c))
        .collect();

    deunicode_with_tofu(&decomposed, "").to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input() {
        let n = normalize("");
        assert_eq!(n.spaced, "");
        assert_eq!(n.collapsed, "");
    }

    #[test]
    fn test_diacritics_and_case() {
        let n = normalize("Crème Brûlée");
        assert_eq!(n.spaced, "creme brulee");
        assert_eq!(n.collapsed, "cremebrulee");
    }

    #[test]
    fn test_evasion_glyphs() {
        let n = normalize("ᵖꜞᵗᶜʰ ˢʰꜞᶠᵗᵉʳ");
        assert_eq!(n.spaced, "pitch shifter");
        assert_eq!(n.collapsed, "pitchshifter");

        let n = normalize("l\u{2006}f\u{2006}o");
        assert_eq!(n.spaced, "l f o");
        assert_eq!(n.collapsed, "lfo");
    }

    #[test]
    fn test_width_and_ligatures() {
        assert_eq!(normalize("ＦＭ").spaced, "fm");
        assert_eq!(normalize("ﬁlter").spaced, "filter");
    }

    #[test]
    fn test_output_is_ascii() {
        let n = normalize("naïve café — ☃ 東京");
        assert!(n.spaced.is_ascii());
        assert!(n.collapsed.is_ascii());
        assert!(!n.collapsed.contains(' '));
    }

    #[test]
    fn test_collapsed_is_idempotent() {
        for raw in ["vocal filter pro", "Ünïcödé  spaces", ":lfo: and FM", ""] {
            let once = normalize(raw).collapsed;
            let twice = normalize(&once);
            assert_eq!(twice.spaced, once);
            assert_eq!(twice.collapsed, once);
        }
    }

    #[test]
    fn test_pictographs_drop_out() {
        let n = normalize("🎸🔥");
        assert_eq!(n.spaced, "");
        assert_eq!(n.collapsed, "");

        let n = normalize("🔥 nice ☃ 🦄");
        assert_eq!(n.collapsed, "nice");
        assert!(!n.spaced.contains("fire"));
        assert_eq!(normalize("🔥fm").spaced, "fm");
    }

    #[test]
    fn test_collapsed_drops_all_whitespace() {
        let n = normalize("l\nf\to  ");
        assert_eq!(n.collapsed, "lfo");
        assert_eq!(n.spaced, "l\nf\to  ");
    }

    #[test]
    fn test_spaced_offsets() {
        let n = normalize("a b fm lfo");
        assert_eq!(n.collapsed, "abfmlfo");
        assert_eq!(n.spaced_offset(false, 0), 0);
        assert_eq!(n.spaced_offset(false, 2), 4);
        assert_eq!(n.spaced_offset(false, 4), 7);
        assert_eq!(n.spaced_offset(false, 7), n.spaced.len());
        assert_eq!(n.spaced_offset(true, 4), 4);
    }

    #[test]
    fn test_variant_selection() {
        let n = normalize("of me");
        assert_eq!(n.variant(true), "of me");
        assert_eq!(n.variant(false), "ofme");
    }
}
