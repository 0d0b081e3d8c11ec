//! Merge strategy selection
//!
//! The strategy is classified exactly once at merge start from the
//! caller-supplied template hint; there is no mid-merge state change.

/// Template category hint supplied by the caller's template catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    /// Plain uploaded template: overlay the first page, copy the rest.
    Generic,
    /// Multi-page agreement ("statement of work"-shaped): patch one page.
    Agreement,
}

impl TemplateKind {
    /// Classify from a template file name or catalog category string.
    pub fn from_hint(hint: &str) -> Self {
        let hint = hint.to_ascii_lowercase();
        if hint.contains("statement of work")
            || hint.contains("sow")
            || hint.contains("agreement")
        {
            TemplateKind::Agreement
        } else {
            TemplateKind::Generic
        }
    }
}

/// One candidate position for degraded-mode substitution, as fractions of
/// the page size (y from the top edge, at the text baseline).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FallbackSpot {
    pub x: f32,
    pub y: f32,
    pub font_size: f32,
}

/// Configuration for the page-replace strategy.
#[derive(Debug, Clone)]
pub struct PageReplaceConfig {
    /// 0-based index of the page to patch.
    pub target_index: usize,
    /// Candidate offsets tried in order when exact token search finds
    /// nothing. This is template-specific tuning carried as explicit
    /// configuration, not computed geometry.
    pub fallback_spots: Vec<FallbackSpot>,
}

impl Default for PageReplaceConfig {
    fn default() -> Self {
        Self {
            target_index: 0,
            // Title-area candidates observed across uploaded agreement
            // templates: directly under the heading, one line lower, and
            // centered variants of the same band.
            fallback_spots: vec![
                FallbackSpot {
                    x: 0.08,
                    y: 0.135,
                    font_size: 20.0,
                },
                FallbackSpot {
                    x: 0.08,
                    y: 0.175,
                    font_size: 20.0,
                },
                FallbackSpot {
                    x: 0.35,
                    y: 0.135,
                    font_size: 16.0,
                },
            ],
        }
    }
}

/// The two merge paths. Both preserve the template's page count.
#[derive(Debug, Clone)]
pub enum MergeStrategy {
    /// Copy all pages verbatim, then run the full overlay on page 0.
    GenericOverlay,
    /// Copy all pages verbatim, then substitute tokens and repaint the
    /// narrow overlay regions on the target page only.
    PageReplace(PageReplaceConfig),
}

impl MergeStrategy {
    /// One-time classification at merge start.
    pub fn select(kind: TemplateKind, config: Option<PageReplaceConfig>) -> Self {
        match kind {
            TemplateKind::Generic => MergeStrategy::GenericOverlay,
            TemplateKind::Agreement => {
                MergeStrategy::PageReplace(config.unwrap_or_default())
            }
        }
    }
}
