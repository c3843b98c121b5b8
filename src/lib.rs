//! autoreact - picks the reactions a chat message has earned
//!
//! Message text is normalized into a spaced and a space-collapsed ASCII variant, then
//! every trigger term in the catalogue that has a usable reaction symbol is searched for.
//! Occurrences vetoed by the term's context rules are dropped; the rest come back as
//! reaction symbols in the order they appear, each at most once.
//!
//! ```
//! use autoreact::{reactions_for_message, symbol_map, Catalogue, TriggerTerm};
//!
//! let catalogue = Catalogue::from_terms(vec![TriggerTerm::plain("lfo").unwrap()]).unwrap();
//! let symbols = symbol_map(vec![("LFO", "<:lfo:42>")]);
//! assert_eq!(reactions_for_message("l f o!", &symbols, &catalogue), vec![&"<:lfo:42>"]);
//! ```

pub mod catalogue;
pub mod error;
pub mod matcher;
pub mod normalize;

pub use catalogue::{
    default_catalogue_path, load_catalogue, Catalogue, SharedCatalogue, TermOptions, TriggerTerm,
};
pub use error::{OverrideSide, ReactError};
pub use matcher::{find_matches, reactions_for, reactions_for_message, symbol_map, Match};
pub use normalize::{normalize, NormalizedText};
