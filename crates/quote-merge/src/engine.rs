//! The merge engine entry point
//!
//! One synchronous, stateless call per merge:
//! load and validate the template, classify the strategy once, deep-copy
//! every page into a fresh output document, overlay and/or substitute on
//! the target page(s) only, serialize, return bytes plus result metadata.
//!
//! Nothing mutable outlives a call. Fonts and branding are injected at
//! construction and instantiated fresh into each output document, so
//! concurrent merges share no mutable state.

use crate::layout::LayoutSpec;
use crate::locate::{find_tokens, LocatorConfig};
use crate::overlay::OverlayRenderer;
use crate::placeholder::{company_token_specs, PlaceholderMap};
use crate::quote::Quote;
use crate::replace::{apply_fallback, replace_tokens, BODY_BOLD_FONT, BODY_FONT};
use crate::sanitize::SanitizeReport;
use crate::strategy::{MergeStrategy, PageReplaceConfig, TemplateKind};
use crate::{MergeError, Result};
use pdf_core::{BuiltinFont, FontData, PdfDocument, PdfError};

/// The font pair every merge draws with.
///
/// Each engine owns its own instances; cloning them into the output
/// document keeps embedding state private to the call.
#[derive(Debug, Clone)]
pub struct MergeFonts {
    regular: FontData,
    bold: FontData,
}

impl MergeFonts {
    /// Built-in Helvetica pair; renders without shipping font files.
    pub fn builtin() -> Self {
        Self {
            regular: FontData::builtin(BuiltinFont::Helvetica),
            bold: FontData::builtin(BuiltinFont::HelveticaBold),
        }
    }

    /// Brand fonts from TrueType bytes.
    pub fn from_ttf(regular: &[u8], bold: &[u8]) -> Result<Self> {
        let regular = FontData::from_ttf("brand-regular", regular)
            .map_err(|e| MergeError::FontEmbedFailure(e.to_string()))?;
        let bold = FontData::from_ttf("brand-bold", bold)
            .map_err(|e| MergeError::FontEmbedFailure(e.to_string()))?;
        Ok(Self { regular, bold })
    }
}

/// Static branding drawn by the overlay renderer.
#[derive(Debug, Clone)]
pub struct Branding {
    pub product_name: String,
    pub partner_badge: String,
    pub contact_line: String,
    pub classification: String,
    /// Optional logo image bytes (PNG or JPEG) for the header band; a
    /// vector mark is drawn when absent.
    pub logo: Option<Vec<u8>>,
}

impl Default for Branding {
    fn default() -> Self {
        Self {
            product_name: "CloudMove".to_string(),
            partner_badge: "Certified Migration Partner".to_string(),
            contact_line: "sales@cloudmove.example | +1 (555) 010-0199".to_string(),
            classification: "Confidential | Prepared for client review".to_string(),
            logo: None,
        }
    }
}

/// Result of one merge call.
#[derive(Debug, Clone)]
pub struct MergeOutput {
    /// Serialized output document.
    pub bytes: Vec<u8>,
    /// Page count; equals the template's for both strategies.
    pub page_count: usize,
    /// True when exact token search failed and the candidate-offset
    /// fallback ran. Callers should warn the user.
    pub fallback_used: bool,
    /// Characters the sanitizer dropped or replaced across the call.
    pub chars_dropped: usize,
}

/// Merges quote records into uploaded PDF templates.
pub struct MergeEngine {
    fonts: MergeFonts,
    layout: LayoutSpec,
    branding: Branding,
    locator: LocatorConfig,
    page_replace: Option<PageReplaceConfig>,
}

impl MergeEngine {
    /// Create an engine with default layout, branding and tolerances.
    pub fn new(fonts: MergeFonts) -> Self {
        Self {
            fonts,
            layout: LayoutSpec::default(),
            branding: Branding::default(),
            locator: LocatorConfig::default(),
            page_replace: None,
        }
    }

    pub fn with_branding(mut self, branding: Branding) -> Self {
        self.branding = branding;
        self
    }

    pub fn with_layout(mut self, layout: LayoutSpec) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_locator_config(mut self, locator: LocatorConfig) -> Self {
        self.locator = locator;
        self
    }

    /// Override the page-replace target/fallback configuration.
    pub fn with_page_replace_config(mut self, config: PageReplaceConfig) -> Self {
        self.page_replace = Some(config);
        self
    }

    /// Merge a quote into a template.
    ///
    /// # Arguments
    /// * `template_bytes` - Raw template PDF bytes (must start with `%PDF-`)
    /// * `quote` - Read-only quote record
    /// * `quote_number` - Human-facing quote identifier
    /// * `kind` - Template classification hint from the caller's catalog
    pub fn merge(
        &self,
        template_bytes: &[u8],
        quote: &Quote,
        quote_number: &str,
        kind: TemplateKind,
    ) -> Result<MergeOutput> {
        let source = PdfDocument::from_bytes(template_bytes).map_err(|e| match e {
            PdfError::InvalidMagic => MergeError::InvalidFormat,
            PdfError::Corrupt(msg) => MergeError::CorruptDocument(msg),
            other => MergeError::Pdf(other),
        })?;
        let page_count = source.page_count();

        // One-time classification; no mid-merge strategy change.
        let strategy = MergeStrategy::select(kind, self.page_replace.clone());
        log::info!(
            "merging quote {quote_number} into {page_count}-page template ({strategy:?})",
        );

        let mut out = PdfDocument::new_output();
        for index in 0..page_count {
            out.append_page_from(&source, index)
                .map_err(|e| MergeError::PageOperation {
                    page: index,
                    operation: "page copy",
                    source: e,
                })?;
        }

        out.add_font(BODY_FONT, self.fonts.regular.clone())?;
        out.add_font(BODY_BOLD_FONT, self.fonts.bold.clone())?;

        let renderer = OverlayRenderer::new(&self.layout, &self.branding);
        let mut report = SanitizeReport::default();
        let mut fallback_used = false;

        match &strategy {
            MergeStrategy::GenericOverlay => {
                if page_count > 0 {
                    renderer
                        .render_full(&mut out, 0, quote, quote_number, &mut report)
                        .map_err(|e| page_error(e, 0, "overlay"))?;
                }
            }
            MergeStrategy::PageReplace(config) => {
                let target = config.target_index;
                if target >= page_count {
                    return Err(MergeError::Pdf(PdfError::InvalidPage(target, page_count)));
                }

                let placeholders = PlaceholderMap::from_quote(quote, quote_number);
                let specs = company_token_specs();
                let search = find_tokens(&source, &specs, &self.locator)?;

                // Substitutions stay on the target page; every other page
                // must come out byte-identical.
                let target_matches: Vec<_> = search
                    .matches()
                    .iter()
                    .filter(|m| m.page_index == target)
                    .cloned()
                    .collect();

                if target_matches.is_empty() {
                    // Documented degraded mode: the page is classified as
                    // requiring substitution, so place the company line at
                    // the configured candidate offsets and flag the result.
                    let text = placeholders
                        .get("{{Company Name}}")
                        .unwrap_or("For Valued Client")
                        .to_string();
                    apply_fallback(&mut out, target, &config.fallback_spots, &text, &mut report)
                        .map_err(|e| page_error(e, target, "fallback substitution"))?;
                    fallback_used = true;
                } else {
                    replace_tokens(&mut out, &target_matches, &placeholders, &mut report)
                        .map_err(|e| page_error(e, target, "token replacement"))?;
                }

                renderer
                    .render_patch(&mut out, target, quote, quote_number, &mut report)
                    .map_err(|e| page_error(e, target, "patch overlay"))?;
            }
        }

        let bytes = out.to_bytes()?;

        if report.lossy() {
            log::info!(
                "merge for quote {quote_number} dropped {} and replaced {} characters during sanitization",
                report.dropped,
                report.replaced
            );
        }

        Ok(MergeOutput {
            bytes,
            page_count,
            fallback_used,
            chars_dropped: report.dropped + report.replaced,
        })
    }
}

fn page_error(e: MergeError, page: usize, operation: &'static str) -> MergeError {
    match e {
        MergeError::Pdf(source) => MergeError::PageOperation {
            page,
            operation,
            source,
        },
        other => other,
    }
}
