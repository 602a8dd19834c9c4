//! Parser registry.
//!
//! Parsers are registered at construction time under a normalized provider key
//! and looked up per job. Registrations live in tiers that are searched in a
//! fixed order, so a standard parser shadows a proprietary one of the same
//! name.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use super::example::ExampleParser;
use super::maxar::MaxarParser;
use super::planet::PlanetParser;
use super::types::{MetadataParser, ParserError};

/// Registration tier, in lookup order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ParserTier {
    /// Parsers shipped with the crate
    Standard,
    /// Parsers supplied by the embedding application
    Proprietary,
}

impl ParserTier {
    /// All tiers, in lookup order.
    pub const ALL: [ParserTier; 2] = [ParserTier::Standard, ParserTier::Proprietary];

    pub fn as_str(&self) -> &'static str {
        match self {
            ParserTier::Standard => "standard",
            ParserTier::Proprietary => "proprietary",
        }
    }
}

impl fmt::Display for ParserTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalizes a provider key the way parser module names are spelled:
/// trimmed, lower-cased, with dashes and spaces turned into underscores.
pub fn normalize_key(key: &str) -> String {
    key.trim()
        .chars()
        .map(|c| match c {
            '-' | ' ' => '_',
            c => c.to_ascii_lowercase(),
        })
        .collect()
}

/// Provider key to parser lookup.
#[derive(Default, Clone)]
pub struct ParserRegistry {
    tiers: HashMap<ParserTier, BTreeMap<String, Arc<dyn MetadataParser>>>,
}

impl ParserRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the built-in parsers in the standard tier.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(ParserTier::Standard, "example", Arc::new(ExampleParser));
        registry.register(ParserTier::Standard, "maxar", Arc::new(MaxarParser));
        registry.register(ParserTier::Standard, "planet", Arc::new(PlanetParser));
        registry
    }

    /// Registers a parser, replacing any parser with the same key in the tier.
    pub fn register(&mut self, tier: ParserTier, key: &str, parser: Arc<dyn MetadataParser>) {
        let key = normalize_key(key);
        debug!(tier = %tier, key = %key, parser = parser.name(), "Registered parser");
        self.tiers.entry(tier).or_default().insert(key, parser);
    }

    /// Looks up the parser for a provider key, standard tier first.
    pub fn get_parser(&self, provider: &str) -> Result<Arc<dyn MetadataParser>, ParserError> {
        let key = normalize_key(provider);
        ParserTier::ALL
            .iter()
            .filter_map(|tier| self.tiers.get(tier))
            .find_map(|parsers| parsers.get(&key))
            .cloned()
            .ok_or(ParserError::UnsupportedProvider(key))
    }

    /// Registered keys per tier. Every tier is present, possibly empty.
    pub fn list_available(&self) -> BTreeMap<ParserTier, BTreeSet<String>> {
        ParserTier::ALL
            .iter()
            .map(|tier| {
                let keys = self
                    .tiers
                    .get(tier)
                    .map(|parsers| parsers.keys().cloned().collect())
                    .unwrap_or_default();
                (*tier, keys)
            })
            .collect()
    }
}

impl fmt::Debug for ParserRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParserRegistry")
            .field("parsers", &self.list_available())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::types::{empty_fragment, ItemFragment, ParseInput};

    struct Named(&'static str);

    impl MetadataParser for Named {
        fn name(&self) -> &str {
            self.0
        }

        fn parse(&self, _input: &ParseInput<'_>) -> Result<ItemFragment, ParserError> {
            Ok(empty_fragment(&[]))
        }
    }

    #[test]
    fn test_normalize_key() {
        assert_eq!(normalize_key(" Maxar "), "maxar");
        assert_eq!(normalize_key("Planet-Scope v2"), "planet_scope_v2");
    }

    #[test]
    fn test_builtin_lookup_is_normalized() {
        let registry = ParserRegistry::with_builtin();
        assert_eq!(registry.get_parser("MAXAR").unwrap().name(), "maxar");
        assert_eq!(registry.get_parser(" planet ").unwrap().name(), "planet");
    }

    #[test]
    fn test_unknown_provider() {
        let Err(err) = ParserRegistry::with_builtin().get_parser("Acme-Sat") else {
            panic!("acme_sat should not be registered");
        };
        assert_eq!(err, ParserError::UnsupportedProvider("acme_sat".to_string()));
    }

    #[test]
    fn test_standard_tier_wins() {
        let mut registry = ParserRegistry::new();
        registry.register(ParserTier::Proprietary, "acme", Arc::new(Named("private")));
        assert_eq!(registry.get_parser("acme").unwrap().name(), "private");

        registry.register(ParserTier::Standard, "acme", Arc::new(Named("public")));
        assert_eq!(registry.get_parser("acme").unwrap().name(), "public");
    }

    #[test]
    fn test_list_available_includes_empty_tiers() {
        let listing = ParserRegistry::new().list_available();
        assert_eq!(listing.len(), 2);
        assert!(listing.values().all(BTreeSet::is_empty));

        let listing = ParserRegistry::with_builtin().list_available();
        let standard: Vec<_> = listing[&ParserTier::Standard].iter().cloned().collect();
        assert_eq!(standard, vec!["example", "maxar", "planet"]);
        assert!(listing[&ParserTier::Proprietary].is_empty());
    }
}
