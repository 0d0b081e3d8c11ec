//! Placeholder keys, aliases and their replacement values
//!
//! A [`PlaceholderMap`] is derived once per merge call from the quote.
//! Every key the engine claims to support resolves to a non-empty value;
//! blanks in the quote fall back to neutral text rather than rendering an
//! empty substitution.

use crate::numwords::format_currency;
use crate::quote::Quote;

/// A placeholder key plus the literal aliases templates are known to use
/// for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSpec {
    pub key: String,
    pub aliases: Vec<String>,
}

impl TokenSpec {
    pub fn new(key: &str, aliases: &[&str]) -> Self {
        Self {
            key: key.to_string(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// Key followed by aliases, in match-priority order.
    pub fn literals(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.key.as_str()).chain(self.aliases.iter().map(String::as_str))
    }
}

/// The company-name marker and the spellings observed in uploaded
/// agreement templates.
pub fn company_token_specs() -> Vec<TokenSpec> {
    vec![TokenSpec::new(
        "{{Company Name}}",
        &["{{Company_Name}}", "[Client.Company]", "comp"],
    )]
}

/// Mapping from placeholder key to replacement string.
#[derive(Debug, Clone, Default)]
pub struct PlaceholderMap {
    entries: Vec<(String, String)>,
}

impl PlaceholderMap {
    /// Build the map for one merge call.
    pub fn from_quote(quote: &Quote, quote_number: &str) -> Self {
        let company = quote.company_or_fallback();
        let quote_number = if quote_number.trim().is_empty() {
            "Pending".to_string()
        } else {
            quote_number.to_string()
        };

        let entries = vec![
            // The company marker sits in agreement title lines, so its
            // substitution carries the "For" lead-in.
            ("{{Company Name}}".to_string(), format!("For {company}")),
            ("{{Client Name}}".to_string(), quote.client_or_fallback().to_string()),
            ("{{Quote Number}}".to_string(), quote_number),
            (
                "{{Total Cost}}".to_string(),
                format_currency(quote.calculation.total_cost),
            ),
        ];

        Self { entries }
    }

    /// Look up the replacement for a placeholder key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Number of placeholder keys in the map.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
