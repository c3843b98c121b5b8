//! Trigger-term catalogue: typed per-term records, validated once at load time.

use crate::error::{OverrideSide, ReactError};
use crate::normalize::normalize;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

/// Default catalogue file name
const CATALOGUE_FILE: &str = "catalogue.json";

/// Directory under the user config dir
const CONFIG_DIR: &str = "autoreact";

lazy_static! {
    /// Printable ASCII, at least one non-space character
    static ref RE_KEY: Regex = Regex::new(r"^[\x20-\x7e]*[\x21-\x7e][\x20-\x7e]*$").unwrap();
}

// ============================================================================
// File format
// ============================================================================

/// On-disk catalogue
#[derive(Debug, Deserialize)]
pub struct CatalogueFile {
    /// Format version
    #[serde(default)]
    pub version: String,

    /// Map of term key to its options
    pub terms: BTreeMap<String, TermOptions>,
}

/// Per-term options; every field defaults so `{}` is a plain term
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TermOptions {
    /// Scan the space-preserving variant instead of the collapsed one
    #[serde(default)]
    pub use_spaced_variant: bool,

    /// Suppress when the text right before the match equals one of these
    #[serde(default)]
    pub no_before: Vec<String>,

    /// Suppress when the text right after the match equals one of these
    #[serde(default)]
    pub no_after: Vec<String>,
}

// ============================================================================
// Validated catalogue
// ============================================================================

/// A validated trigger term
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerTerm {
    key: String,
    pub use_spaced_variant: bool,
    pub no_before: Vec<String>,
    pub no_after: Vec<String>,
}

impl TriggerTerm {
    /// Build a term, lower-casing the key and rejecting keys or override entries that
    /// could never match the variant the term scans
    pub fn new(key: &str, options: TermOptions) -> Result<Self, ReactError> {
        if key.is_empty() {
            return Err(ReactError::EmptyKey);
        }
        // collapsed text holds no whitespace at all
        let whitespace_in_collapsed =
            !options.use_spaced_variant && key.chars().any(|c| c.is_ascii_whitespace());
        if !RE_KEY.is_match(key) || whitespace_in_collapsed {
            return Err(ReactError::InvalidKey {
                key: key.to_string(),
            });
        }
        let key = key.to_ascii_lowercase();
        let spaced = options.use_spaced_variant;

        let no_before = clean_overrides(&key, options.no_before, spaced, OverrideSide::Before)?;
        let no_after = clean_overrides(&key, options.no_after, spaced, OverrideSide::After)?;

        Ok(Self {
            key,
            use_spaced_variant: options.use_spaced_variant,
            no_before,
            no_after,
        })
    }

    /// A term with no suppression rules
    pub fn plain(key: &str) -> Result<Self, ReactError> {
        Self::new(key, TermOptions::default())
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

/// Normalize overrides into the variant the term scans, drop repeats, keep order.
/// An entry that normalizes to nothing would veto every match, so it is rejected.
fn clean_overrides(
    key: &str,
    overrides: Vec<String>,
    spaced: bool,
    side: OverrideSide,
) -> Result<Vec<String>, ReactError> {
    let mut seen = HashSet::new();
    let mut cleaned = Vec::with_capacity(overrides.len());
    for o in overrides {
        let o = normalize(&o).variant(spaced).to_string();
        if o.is_empty() {
            return Err(ReactError::EmptyOverride {
                key: key.to_string(),
                side,
            });
        }
        if seen.insert(o.clone()) {
            cleaned.push(o);
        }
    }
    Ok(cleaned)
}

/// Immutable term table, iterated in ascending key order
#[derive(Debug, Clone, Default)]
pub struct Catalogue {
    terms: BTreeMap<String, TriggerTerm>,
}

impl Catalogue {
    /// Build from already-constructed terms; two terms folding to the same key is an error
    pub fn from_terms<I>(terms: I) -> Result<Self, ReactError>
    where
        I: IntoIterator<Item = TriggerTerm>,
    {
        let mut map = BTreeMap::new();
        for term in terms {
            let key = term.key.clone();
            if map.insert(key.clone(), term).is_some() {
                return Err(ReactError::DuplicateKey { key });
            }
        }
        Ok(Self { terms: map })
    }

    pub fn from_file(file: CatalogueFile) -> Result<Self, ReactError> {
        let terms = file
            .terms
            .into_iter()
            .map(|(key, options)| TriggerTerm::new(&key, options))
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_terms(terms)
    }

    pub fn from_json(content: &str) -> Result<Self, ReactError> {
        let file: CatalogueFile =
            serde_json::from_str(content).map_err(|e| ReactError::CatalogueParse(e.to_string()))?;
        debug!("Parsed catalogue version {:?}", file.version);
        Self::from_file(file)
    }

    pub fn get(&self, key: &str) -> Option<&TriggerTerm> {
        self.terms.get(key)
    }

    pub fn terms(&self) -> impl Iterator<Item = &TriggerTerm> {
        self.terms.values()
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

// ============================================================================
// Loading
// ============================================================================

/// Default catalogue location: `<config_dir>/autoreact/catalogue.json`
pub fn default_catalogue_path() -> Result<PathBuf, ReactError> {
    let config = dirs::config_dir().ok_or(ReactError::NoConfigDir)?;
    Ok(config.join(CONFIG_DIR).join(CATALOGUE_FILE))
}

/// Load and validate a catalogue file
pub fn load_catalogue(path: &Path) -> Result<Catalogue, ReactError> {
    if !path.exists() {
        return Err(ReactError::CatalogueNotFound(path.to_path_buf()));
    }

    let content = fs::read_to_string(path).map_err(|e| ReactError::CatalogueRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    let catalogue = Catalogue::from_json(&content)?;
    info!("Loaded {} trigger terms from {:?}", catalogue.len(), path);
    Ok(catalogue)
}

// ============================================================================
// Hot reload
// ============================================================================

/// Catalogue shared across threads; reloads swap in a whole new snapshot
#[derive(Debug, Default)]
pub struct SharedCatalogue {
    current: RwLock<Arc<Catalogue>>,
}

impl SharedCatalogue {
    pub fn new(catalogue: Catalogue) -> Self {
        Self {
            current: RwLock::new(Arc::new(catalogue)),
        }
    }

    /// The catalogue in effect right now; scans keep using it even if a reload lands
    pub fn snapshot(&self) -> Arc<Catalogue> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&*guard),
            Err(poisoned) => Arc::clone(&*poisoned.into_inner()),
        }
    }

    pub fn replace(&self, catalogue: Catalogue) {
        let next = Arc::new(catalogue);
        match self.current.write() {
            Ok(mut guard) => *guard = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
    }

    /// Re-read `path`; on any error the previous snapshot stays in effect
    pub fn reload(&self, path: &Path) -> Result<usize, ReactError> {
        let catalogue = load_catalogue(path)?;
        let count = catalogue.len();
        self.replace(catalogue);
        Ok(count)
    }
}

#[cfg(test)]
pub(crate) fn sample_catalogue() -> Catalogue {
    match Catalogue::from_json(include_str!("../catalogue.json")) {
        Ok(c) => c,
        Err(e) => panic!("sample catalogue is invalid: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn opts(spaced: bool, before: &[&str], after: &[&str]) -> TermOptions {
        TermOptions {
            use_spaced_variant: spaced,
            no_before: before.iter().map(|s| s.to_string()).collect(),
            no_after: after.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_sample_catalogue_loads() {
        let catalogue = sample_catalogue();
        assert_eq!(catalogue.len(), 6);
        let fm = catalogue.get("fm").unwrap();
        assert!(fm.use_spaced_variant);
        let filter = catalogue.get("filter").unwrap();
        assert_eq!(filter.no_before, vec!["vocal"]);
        assert_eq!(filter.no_after, vec!["pro"]);
        assert!(!catalogue.get("lfo").unwrap().use_spaced_variant);
    }

    #[test]
    fn test_keys_are_lowercased_and_ordered() {
        let catalogue = Catalogue::from_terms(vec![
            TriggerTerm::plain("LFO").unwrap(),
            TriggerTerm::plain("Filter").unwrap(),
        ])
        .unwrap();
        let keys: Vec<&str> = catalogue.terms().map(|t| t.key()).collect();
        assert_eq!(keys, vec!["filter", "lfo"]);
    }

    #[test]
    fn test_empty_key_rejected() {
        assert!(matches!(TriggerTerm::plain(""), Err(ReactError::EmptyKey)));
        assert!(matches!(
            Catalogue::from_json(r#"{"terms": {"": {}}}"#),
            Err(ReactError::EmptyKey)
        ));
    }

    #[test]
    fn test_invalid_keys_rejected() {
        assert!(matches!(TriggerTerm::plain("   "), Err(ReactError::InvalidKey { .. })));
        assert!(matches!(TriggerTerm::plain("filtré"), Err(ReactError::InvalidKey { .. })));
    }

    #[test]
    fn test_spaced_keys_only_on_spaced_terms() {
        // collapsed text never contains the space, so the term could never fire
        assert!(matches!(TriggerTerm::plain("of me"), Err(ReactError::InvalidKey { .. })));
        assert!(matches!(
            Catalogue::from_json(r#"{"terms": {"filter pro": {}}}"#),
            Err(ReactError::InvalidKey { key }) if key == "filter pro"
        ));
        let term = TriggerTerm::new("of me", opts(true, &[], &[])).unwrap();
        assert_eq!(term.key(), "of me");
    }

    #[test]
    fn test_empty_override_rejected() {
        let err = TriggerTerm::new("filter", opts(false, &["vocal", ""], &[])).unwrap_err();
        match err {
            ReactError::EmptyOverride { key, side } => {
                assert_eq!(key, "filter");
                assert_eq!(side, OverrideSide::Before);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(TriggerTerm::new("filter", opts(false, &[], &[""])).is_err());
        // whitespace and emoji normalize away to nothing
        assert!(TriggerTerm::new("filter", opts(false, &["  "], &[])).is_err());
        assert!(TriggerTerm::new("filter", opts(true, &[], &["🎸"])).is_err());
    }

    #[test]
    fn test_overrides_normalized_to_term_variant() {
        let collapsed = TriggerTerm::new("filter", opts(false, &["Vocál", "low pass"], &[])).unwrap();
        assert_eq!(collapsed.no_before, vec!["vocal", "lowpass"]);

        let spaced = TriggerTerm::new("fm", opts(true, &["Vocál "], &["ＰＲＯ"])).unwrap();
        assert_eq!(spaced.no_before, vec!["vocal "]);
        assert_eq!(spaced.no_after, vec!["pro"]);
    }

    #[test]
    fn test_overrides_deduplicated_in_order() {
        let term = TriggerTerm::new("filter", opts(false, &["Vocal", "low", "vocal"], &[])).unwrap();
        assert_eq!(term.no_before, vec!["vocal", "low"]);
    }

    #[test]
    fn test_duplicate_after_case_folding() {
        let result = Catalogue::from_terms(vec![
            TriggerTerm::plain("fm").unwrap(),
            TriggerTerm::plain("FM").unwrap(),
        ]);
        assert!(matches!(result, Err(ReactError::DuplicateKey { key }) if key == "fm"));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            Catalogue::from_json(r#"{"terms": {"fm": {"no_before": "vocal"}}}"#),
            Err(ReactError::CatalogueParse(_))
        ));
        assert!(matches!(
            Catalogue::from_json(r#"{"terms": {"fm": {"nobefore": ["x"]}}}"#),
            Err(ReactError::CatalogueParse(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.json");
        assert!(matches!(load_catalogue(&path), Err(ReactError::CatalogueNotFound(_))));
    }

    #[test]
    fn test_shared_catalogue_reload() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"terms": {{"lfo": {{}}, "fm": {{}}}}}}"#).unwrap();

        let shared = SharedCatalogue::new(sample_catalogue());
        let before = shared.snapshot();

        assert_eq!(shared.reload(file.path()).unwrap(), 2);
        // old snapshot is untouched by the swap
        assert_eq!(before.len(), 6);
        assert_eq!(shared.snapshot().len(), 2);

        let broken = tempfile::NamedTempFile::new().unwrap();
        fs::write(broken.path(), r#"{"terms": {"": {}}}"#).unwrap();
        assert!(shared.reload(broken.path()).is_err());
        assert_eq!(shared.snapshot().len(), 2);
    }
}
