//! Reaction matching: scan normalized text for every usable trigger term, drop occurrences
//! the term's context rules veto, and resolve the survivors to reaction symbols.

use crate::catalogue::{Catalogue, TriggerTerm};
use crate::normalize::{normalize, NormalizedText};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Inline-code / emoji-shortcode delimiter
const SHORTCODE_DELIMITER: char = ':';

/// A surviving occurrence of a term
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match<'c> {
    /// Term key that matched
    pub term: &'c str,
    /// Message position: byte offset of the match in the spaced variant
    pub start: usize,
    /// Byte offset of the match in the variant that was scanned
    pub variant_start: usize,
    /// Whether the spaced variant was scanned
    pub spaced: bool,
}

/// Why an occurrence was dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Suppression<'c> {
    Before(&'c str),
    After(&'c str),
    Shortcode,
    WordInterior,
}

/// Build a symbol map from platform names, lower-casing them the way term keys are stored
pub fn symbol_map<S, I, N>(symbols: I) -> HashMap<String, S>
where
    I: IntoIterator<Item = (N, S)>,
    N: AsRef<str>,
{
    symbols
        .into_iter()
        .map(|(name, symbol)| (name.as_ref().to_lowercase(), symbol))
        .collect()
}

/// Surviving matches ordered by message position; at most one per position.
///
/// Collapsed-variant offsets are translated to spaced-variant offsets first, so matches
/// from both variants share one left-to-right order. Terms without an entry in `symbols`
/// are skipped. Terms are visited in catalogue order (ascending key), and a later term
/// matching at an already-claimed position replaces the earlier one.
pub fn find_matches<'c, S>(
    text: &NormalizedText,
    symbols: &HashMap<String, S>,
    catalogue: &'c Catalogue,
) -> Vec<Match<'c>> {
    let mut by_index: BTreeMap<usize, Match<'c>> = BTreeMap::new();

    for term in catalogue.terms().filter(|t| symbols.contains_key(t.key())) {
        let haystack = text.variant(term.use_spaced_variant);
        for variant_start in occurrences(haystack, term.key()) {
            if let Some(reason) = suppression(haystack, variant_start, term) {
                debug!("{:?} at {} suppressed: {:?}", term.key(), variant_start, reason);
                continue;
            }
            let start = text.spaced_offset(term.use_spaced_variant, variant_start);
            by_index.insert(
                start,
                Match {
                    term: term.key(),
                    start,
                    variant_start,
                    spaced: term.use_spaced_variant,
                },
            );
        }
    }

    by_index.into_values().collect()
}

/// Reaction symbols for already-normalized text, in match order, each symbol once
pub fn reactions_for<'s, S: PartialEq>(
    text: &NormalizedText,
    symbols: &'s HashMap<String, S>,
    catalogue: &Catalogue,
) -> Vec<&'s S> {
    let mut reactions: Vec<&'s S> = Vec::new();
    for m in find_matches(text, symbols, catalogue) {
        if let Some(symbol) = symbols.get(m.term) {
            if !reactions.contains(&symbol) {
                reactions.push(symbol);
            }
        }
    }
    reactions
}

/// Normalize raw message content and resolve its reactions
pub fn reactions_for_message<'s, S: PartialEq>(
    content: &str,
    symbols: &'s HashMap<String, S>,
    catalogue: &Catalogue,
) -> Vec<&'s S> {
    let text = normalize(content);
    debug!("searchtext transformed {:?} -> {:?}", content, text);
    reactions_for(&text, symbols, catalogue)
}

/// Start offsets of `key` in `haystack`, resuming after each match's end
fn occurrences<'a>(haystack: &'a str, key: &'a str) -> impl Iterator<Item = usize> + 'a {
    let mut from = 0;
    std::iter::from_fn(move || {
        if key.is_empty() {
            return None;
        }
        let start = from + haystack.get(from..)?.find(key)?;
        from = start + key.len();
        Some(start)
    })
}

fn suppression<'c>(text: &str, start: usize, term: &'c TriggerTerm) -> Option<Suppression<'c>> {
    let end = start + term.key().len();

    if let Some(o) = term.no_before.iter().find(|o| preceded_by(text, start, o)) {
        return Some(Suppression::Before(o));
    }
    if let Some(o) = term.no_after.iter().find(|o| followed_by(text, end, o)) {
        return Some(Suppression::After(o));
    }

    let before = text.get(..start).and_then(|s| s.chars().next_back());
    let after = text.get(end..).and_then(|s| s.chars().next());

    if before == Some(SHORTCODE_DELIMITER) && after == Some(SHORTCODE_DELIMITER) {
        return Some(Suppression::Shortcode);
    }

    // collapsed text has no word boundaries left to test
    if term.use_spaced_variant
        && (before.is_some_and(char::is_alphanumeric) || after.is_some_and(char::is_alphanumeric))
    {
        return Some(Suppression::WordInterior);
    }

    None
}

/// Windows that would start before the text begins never match
fn preceded_by(text: &str, start: usize, context: &str) -> bool {
    start
        .checked_sub(context.len())
        .and_then(|from| text.get(from..start))
        .is_some_and(|window| window == context)
}

/// Windows that would run past the end never match
fn followed_by(text: &str, end: usize, context: &str) -> bool {
    end.checked_add(context.len())
        .and_then(|to| text.get(end..to))
        .is_some_and(|window| window == context)
}
