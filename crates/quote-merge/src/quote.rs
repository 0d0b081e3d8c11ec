//! Quote data model
//!
//! JSON-shaped input owned by the caller; the merge engine only ever reads
//! from it. Every field defaults so partially-filled quotes from the UI
//! deserialize without ceremony.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A quote to be merged into an agreement template.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Quote {
    pub client_name: String,
    pub client_email: String,
    pub company: String,
    pub configuration: Configuration,
    pub calculation: Calculation,
    pub pricing_tier: PricingTier,
    pub deal: Option<Deal>,
    /// Up to two parties; extras are ignored by the renderer.
    pub signatures: Vec<SignatureBlock>,
}

/// What is being migrated and for how long.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Configuration {
    pub migration_type: String,
    pub number_of_users: u32,
    pub data_size_gb: f64,
    pub instance_count: u32,
    pub instance_type: String,
    pub duration_months: u32,
}

/// Pre-computed pricing; the engine renders these, it never recalculates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Calculation {
    pub user_cost: f64,
    pub data_cost: f64,
    pub migration_cost: f64,
    pub instance_cost: f64,
    pub total_cost: f64,
}

/// Selected pricing tier.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PricingTier {
    pub name: String,
    pub features: Vec<String>,
}

/// Optional CRM deal metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Deal {
    pub id: String,
    pub name: String,
    pub amount: f64,
    pub stage: String,
}

/// One party's signature block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SignatureBlock {
    pub signer_name: String,
    pub title: String,
    /// ISO date string as supplied by the signature capture flow.
    pub date: String,
    /// Chosen signature style (e.g. "typed", "drawn").
    pub style: String,
    /// Raw signature text as entered/drawn.
    pub signature_text: String,
}

impl SignatureBlock {
    /// The date rendered long-form ("March 4, 2026"), falling back to the
    /// raw string when it is not an ISO date.
    pub fn formatted_date(&self) -> String {
        NaiveDate::parse_from_str(&self.date, "%Y-%m-%d")
            .map(|d| d.format("%B %-d, %Y").to_string())
            .unwrap_or_else(|_| self.date.clone())
    }
}

impl Quote {
    /// Company name with the guaranteed non-empty fallback used wherever a
    /// placeholder must never render blank.
    pub fn company_or_fallback(&self) -> &str {
        if self.company.trim().is_empty() {
            "Valued Client"
        } else {
            &self.company
        }
    }

    /// Client name, falling back to the company name.
    pub fn client_or_fallback(&self) -> &str {
        if self.client_name.trim().is_empty() {
            self.company_or_fallback()
        } else {
            &self.client_name
        }
    }
}
