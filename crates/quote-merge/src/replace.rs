//! Token replacement: mask the original footprint, redraw the substitution
//!
//! For each located token the original glyphs are covered by an opaque
//! rectangle sized to the token's measured bounding box, then the sanitized
//! replacement is drawn at the same baseline origin, inheriting the run's
//! font size and weight. Nothing outside the mask is altered.
//!
//! When exact search found nothing on a page that the template
//! classification says requires substitution, [`apply_fallback`] draws the
//! replacement at each configured candidate offset. That is deliberate
//! degraded-mode behavior; callers learn about it through the merge result
//! flag and a warning log, never silently.

use crate::locate::TokenMatch;
use crate::placeholder::PlaceholderMap;
use crate::sanitize::{sanitize_counted, SanitizeReport};
use crate::strategy::FallbackSpot;
use crate::Result;
use pdf_core::{Align, Color, PdfDocument};

/// Padding around the measured token footprint, in points.
const MASK_PADDING: f32 = 1.5;

/// Smallest font size used for redraws; protects against nonsense sizes
/// recovered from malformed content streams.
const MIN_REDRAW_SIZE: f32 = 6.0;

/// Font names the engine registers on every output document.
pub(crate) const BODY_FONT: &str = "body";
pub(crate) const BODY_BOLD_FONT: &str = "body-bold";

fn redraw_font(bold: bool) -> &'static str {
    if bold {
        BODY_BOLD_FONT
    } else {
        BODY_FONT
    }
}

/// Mask each match and redraw its replacement. Returns how many matches
/// were substituted (matches whose token has no map entry are skipped).
pub fn replace_tokens(
    doc: &mut PdfDocument,
    matches: &[TokenMatch],
    placeholders: &PlaceholderMap,
    report: &mut SanitizeReport,
) -> Result<usize> {
    let mut replaced = 0;

    for m in matches {
        let replacement = match placeholders.get(&m.token) {
            Some(value) => value,
            None => {
                log::debug!("no replacement mapped for token {:?}; skipping", m.token);
                continue;
            }
        };
        let replacement = sanitize_counted(replacement, report);

        let font_name = redraw_font(m.bold);
        let size = m.font_size.max(MIN_REDRAW_SIZE);
        let font = doc.font(font_name)?;

        // The mask must cover the original glyphs and the incoming text;
        // both widths are measured, never assumed.
        let token_width = font.text_width(&m.literal, size);
        let replacement_width = font.text_width(&replacement, size);
        let mask_width = token_width.max(replacement_width) + 2.0 * MASK_PADDING;
        let ascent = font.ascent(size);
        let descent = font.descent(size);

        let (_, page_height) = doc.page_size(m.page_index)?;
        // Match coordinates are PDF-space at the baseline; drawing calls
        // take y from the top edge.
        let mask_top = page_height - m.y - ascent - MASK_PADDING;
        let mask_height = ascent + descent + 2.0 * MASK_PADDING;

        doc.fill_rect(
            m.page_index,
            m.x - MASK_PADDING,
            mask_top,
            mask_width,
            mask_height,
            Color::white(),
        )?;

        doc.set_font(font_name, size)?;
        doc.set_text_color(Color::black());
        doc.insert_text(&replacement, m.page_index, m.x, page_height - m.y, Align::Left)?;

        log::debug!(
            "replaced token {:?} on page {} at ({:.1}, {:.1})",
            m.literal,
            m.page_index,
            m.x,
            m.y
        );
        replaced += 1;
    }

    Ok(replaced)
}

/// Draw `text` at each candidate offset on the target page.
///
/// Used only when exact token search came up empty; every spot is masked
/// to its measured text footprint and overdrawn in sequence.
pub fn apply_fallback(
    doc: &mut PdfDocument,
    page_index: usize,
    spots: &[FallbackSpot],
    text: &str,
    report: &mut SanitizeReport,
) -> Result<()> {
    let text = sanitize_counted(text, report);
    let (page_width, page_height) = doc.page_size(page_index)?;

    log::warn!(
        "token search found nothing on page {page_index}; applying degraded-mode substitution at {} candidate offset(s)",
        spots.len()
    );

    for spot in spots {
        let x = spot.x * page_width;
        let y = spot.y * page_height;
        let font = doc.font(BODY_BOLD_FONT)?;

        let width = font.text_width(&text, spot.font_size) + 2.0 * MASK_PADDING;
        let ascent = font.ascent(spot.font_size);
        let descent = font.descent(spot.font_size);

        doc.fill_rect(
            page_index,
            x - MASK_PADDING,
            y - ascent - MASK_PADDING,
            width,
            ascent + descent + 2.0 * MASK_PADDING,
            Color::white(),
        )?;

        doc.set_font(BODY_BOLD_FONT, spot.font_size)?;
        doc.set_text_color(Color::black());
        doc.insert_text(&text, page_index, x, y, Align::Left)?;
    }

    Ok(())
}
