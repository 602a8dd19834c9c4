//! Parsers command - list registered metadata parsers.

use std::collections::{BTreeMap, BTreeSet};

use stacgen::parser::{ParserRegistry, ParserTier};

use crate::error::CliError;

/// Print the built-in parsers grouped by tier.
pub fn run() -> Result<(), CliError> {
    let registry = ParserRegistry::with_builtin();
    print!("{}", format_listing(&registry.list_available()));
    Ok(())
}

fn format_listing(available: &BTreeMap<ParserTier, BTreeSet<String>>) -> String {
    let mut out = String::new();
    for (tier, keys) in available {
        out.push_str(&format!("{}:\n", tier));
        if keys.is_empty() {
            out.push_str("  (none)\n");
        }
        for key in keys {
            out.push_str(&format!("  {}\n", key));
        }
    }
    out
}
