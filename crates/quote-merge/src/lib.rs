//! Quote Merge - template merge / placeholder substitution engine
//!
//! This crate turns a structured quote record plus an uploaded PDF template
//! into a client-facing agreement document:
//! - Quote data model (serde JSON-shaped)
//! - Defensive text sanitization for restricted font repertoires
//! - Content overlay rendering driven by declarative layout tables
//! - Literal placeholder-token location and footprint-limited replacement
//! - Two merge strategies: full overlay on page one, or patching a single
//!   page of a multi-page agreement while copying everything else verbatim
//!
//! # Example
//!
//! ```ignore
//! use quote_merge::{MergeEngine, MergeFonts, Quote, TemplateKind};
//!
//! let quote: Quote = serde_json::from_str(quote_json)?;
//! let engine = MergeEngine::new(MergeFonts::builtin());
//! let output = engine.merge(&template_bytes, &quote, "Q-2041", TemplateKind::Generic)?;
//! store.save(&output.bytes, &meta)?;
//! ```

mod engine;
mod layout;
mod locate;
mod numwords;
mod overlay;
mod placeholder;
mod quote;
mod replace;
mod sanitize;
mod store;
mod strategy;

pub use engine::{Branding, MergeEngine, MergeFonts, MergeOutput};
pub use layout::{LayoutSpec, PatchLayout, PatchRegion, TableColumn};
pub use locate::{find_tokens, LocatorConfig, TokenMatch, TokenSearch};
pub use numwords::{format_currency, number_words};
pub use placeholder::{company_token_specs, PlaceholderMap, TokenSpec};
pub use quote::{Calculation, Configuration, Deal, PricingTier, Quote, SignatureBlock};
pub use replace::{apply_fallback, replace_tokens};
pub use sanitize::{sanitize, sanitize_counted, SanitizeReport};
pub use store::{DocumentMeta, DocumentStore, MemoryStore, StoreError};
pub use strategy::{FallbackSpot, MergeStrategy, PageReplaceConfig, TemplateKind};

use thiserror::Error;

/// Errors that can occur while merging a quote into a template
#[derive(Debug, Error)]
pub enum MergeError {
    /// Bad magic header; fatal, not worth retrying.
    #[error("template is not a PDF document (missing %PDF- header)")]
    InvalidFormat,

    /// Structure unreadable past the header; fatal.
    #[error("template structure is corrupt: {0}")]
    CorruptDocument(String),

    /// Font parse/embed failed; fatal for this call, safe to retry with
    /// fresh font bytes.
    #[error("font embedding failed: {0}")]
    FontEmbedFailure(String),

    /// A page-level operation failed; carries enough context to log which
    /// page and operation fell over.
    #[error("merge failed on page {page} during {operation}: {source}")]
    PageOperation {
        page: usize,
        operation: &'static str,
        #[source]
        source: pdf_core::PdfError,
    },

    #[error("PDF error: {0}")]
    Pdf(#[from] pdf_core::PdfError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for merge operations
pub type Result<T> = std::result::Result<T, MergeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_condition() {
        let err = MergeError::InvalidFormat;
        assert!(err.to_string().contains("%PDF-"));

        let err = MergeError::CorruptDocument("bad xref".to_string());
        assert!(err.to_string().contains("bad xref"));
    }
}
