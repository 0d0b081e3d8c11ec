//! Content overlay rendering
//!
//! Draws the quote-derived agreement content onto a copied template page.
//! Two modes, never conflated:
//! - [`OverlayRenderer::render_full`] paints the complete agreement layout
//!   (header band, title, billing blocks, project summary, pricing table,
//!   optional signatures, footer) onto page one of a generic template.
//! - [`OverlayRenderer::render_patch`] repaints only the title line, the
//!   introductory paragraph and the pricing table region of an agreement
//!   page, masking exactly those rectangles and nothing else.
//!
//! Every drawn string passes the sanitizer first; widths are measured on
//! the sanitized text.

use crate::engine::Branding;
use crate::layout::{LayoutSpec, PatchRegion};
use crate::numwords::{format_currency, number_words};
use crate::quote::Quote;
use crate::replace::{BODY_BOLD_FONT, BODY_FONT};
use crate::sanitize::{sanitize_counted, SanitizeReport};
use crate::Result;
use pdf_core::{wrap_text, Align, Color, PdfDocument};

/// Header band fill.
fn band_color() -> Color {
    Color::from_rgb(30, 41, 66)
}

/// Hairline rules and muted text.
fn muted_color() -> Color {
    Color::from_rgb(95, 104, 120)
}

/// Row tint for the totals row.
fn tint_color() -> Color {
    Color::from_rgb(238, 241, 246)
}

/// One row of the services-and-pricing table, already formatted.
struct LineItem {
    description: String,
    qty: String,
    unit: String,
    amount: String,
}

/// Build the table rows from the quote's configuration and calculation.
///
/// Unit prices guard against zero quantities and render "N/A" instead of a
/// division artifact.
fn line_items(quote: &Quote) -> Vec<LineItem> {
    let config = &quote.configuration;
    let calc = &quote.calculation;

    let migration_amount = calc.user_cost + calc.data_cost + calc.migration_cost;
    let per_user = if config.number_of_users == 0 {
        "N/A".to_string()
    } else {
        format_currency(migration_amount / config.number_of_users as f64)
    };

    let per_instance = if config.instance_count == 0 {
        "N/A".to_string()
    } else {
        format_currency(calc.instance_cost / config.instance_count as f64)
    };

    let migration_type = if config.migration_type.trim().is_empty() {
        "Data".to_string()
    } else {
        config.migration_type.clone()
    };

    let managed_description = if config.instance_type.trim().is_empty() {
        "Managed migration service".to_string()
    } else {
        format!("Managed migration service ({})", config.instance_type)
    };

    vec![
        LineItem {
            description: format!("{migration_type} migration service"),
            qty: format!("{} users", config.number_of_users),
            unit: per_user,
            amount: format_currency(migration_amount),
        },
        LineItem {
            description: managed_description,
            qty: format!("{} instances", config.instance_count),
            unit: per_instance,
            amount: format_currency(calc.instance_cost),
        },
    ]
}

/// Renders quote content onto pages of an output document.
pub(crate) struct OverlayRenderer<'a> {
    layout: &'a LayoutSpec,
    branding: &'a Branding,
}

impl<'a> OverlayRenderer<'a> {
    pub(crate) fn new(layout: &'a LayoutSpec, branding: &'a Branding) -> Self {
        Self { layout, branding }
    }

    /// Sanitize and draw one string.
    #[allow(clippy::too_many_arguments)]
    fn text(
        &self,
        doc: &mut PdfDocument,
        page: usize,
        raw: &str,
        font: &str,
        size: f32,
        x: f32,
        y: f32,
        align: Align,
        color: Color,
        report: &mut SanitizeReport,
    ) -> Result<()> {
        let clean = sanitize_counted(raw, report);
        doc.set_font(font, size)?;
        doc.set_text_color(color);
        doc.insert_text(&clean, page, x, y, align)?;
        Ok(())
    }

    /// Full agreement overlay for the generic template strategy.
    pub(crate) fn render_full(
        &self,
        doc: &mut PdfDocument,
        page: usize,
        quote: &Quote,
        quote_number: &str,
        report: &mut SanitizeReport,
    ) -> Result<()> {
        let (w, h) = doc.page_size(page)?;
        let l = self.layout;
        let margin = l.x(l.margin_x, w);
        let right = w - margin;

        self.draw_header_band(doc, page, w, h, report)?;

        // Agreement title with the company substituted, quote number at
        // the right end of the same line.
        let title_y = l.y(l.title_y, h);
        let company = quote.company_or_fallback().to_string();
        self.text(
            doc,
            page,
            &format!("Migration Services Agreement for {company}"),
            BODY_BOLD_FONT,
            l.title_size,
            margin,
            title_y,
            Align::Left,
            Color::black(),
            report,
        )?;
        self.text(
            doc,
            page,
            &format!("Quote {quote_number}"),
            BODY_FONT,
            l.small_size,
            right,
            title_y,
            Align::Right,
            muted_color(),
            report,
        )?;

        if let Some(deal) = &quote.deal {
            self.text(
                doc,
                page,
                &format!("Deal: {} ({})", deal.name, deal.stage),
                BODY_FONT,
                l.small_size,
                margin,
                title_y + l.y(l.row_height, h),
                Align::Left,
                muted_color(),
                report,
            )?;
        }

        self.draw_billing_blocks(doc, page, quote, w, h, report)?;
        self.draw_project_summary(doc, page, quote, w, h, report)?;
        self.draw_pricing_table(doc, page, quote, l.table_y, w, h, report)?;

        if !quote.signatures.is_empty() {
            self.draw_signatures(doc, page, quote, w, h, report)?;
        }

        let page_label = doc_page_label(doc, page);
        self.draw_footer(doc, page, w, h, page_label, report)?;

        Ok(())
    }

    /// Narrow patch overlay for the page-replace strategy.
    ///
    /// Masks and repaints exactly three regions: the title line, the
    /// introductory paragraph and the pricing table. The rest of the page's
    /// original content stays untouched; there is no full-page background
    /// in this mode.
    pub(crate) fn render_patch(
        &self,
        doc: &mut PdfDocument,
        page: usize,
        quote: &Quote,
        quote_number: &str,
        report: &mut SanitizeReport,
    ) -> Result<()> {
        let (w, h) = doc.page_size(page)?;
        let l = self.layout;
        let company = quote.company_or_fallback().to_string();
        let config = &quote.configuration;

        // Title region.
        let title = resolve_region(&l.patch.title, w, h);
        doc.fill_rect(page, title.x, title.y, title.width, title.height, Color::white())?;
        let title_baseline = title.y + title.height * 0.7;
        self.text(
            doc,
            page,
            &format!("Statement of Work for {company}"),
            BODY_BOLD_FONT,
            l.title_size,
            title.x,
            title_baseline,
            Align::Left,
            Color::black(),
            report,
        )?;
        self.text(
            doc,
            page,
            &format!("Quote {quote_number}"),
            BODY_FONT,
            l.small_size,
            title.x + title.width,
            title_baseline,
            Align::Right,
            muted_color(),
            report,
        )?;

        // Introductory paragraph region.
        let intro = resolve_region(&l.patch.intro, w, h);
        doc.fill_rect(page, intro.x, intro.y, intro.width, intro.height, Color::white())?;

        let migration_type = if config.migration_type.trim().is_empty() {
            "data".to_string()
        } else {
            config.migration_type.to_lowercase()
        };
        let paragraph = format!(
            "This Statement of Work describes the {migration_type} migration services {product} \
             will perform for {company}, covering {users} users and approximately {data} GB of \
             data over a period of {words} ({months}) months.",
            product = self.branding.product_name,
            users = config.number_of_users,
            data = config.data_size_gb,
            words = number_words(config.duration_months),
            months = config.duration_months,
        );
        let paragraph = sanitize_counted(&paragraph, report);

        let body_font = doc.font(BODY_FONT)?.clone();
        let lines = wrap_text(&paragraph, &body_font, l.body_size, intro.width);
        let line_pitch = l.body_size * 1.35;
        let mut baseline = intro.y + l.body_size * 1.2;
        for line in lines {
            if baseline > intro.y + intro.height {
                // Region is fixed; anything past it would repaint content
                // the patch promised to leave alone.
                log::debug!("intro paragraph clipped to its patch region");
                break;
            }
            doc.set_font(BODY_FONT, l.body_size)?;
            doc.set_text_color(Color::black());
            doc.insert_text(&line, page, intro.x, baseline, Align::Left)?;
            baseline += line_pitch;
        }

        // Pricing table region.
        let table = resolve_region(&l.patch.table, w, h);
        doc.fill_rect(page, table.x, table.y, table.width, table.height, Color::white())?;
        self.draw_pricing_table(doc, page, quote, l.patch.table.y + 0.012, w, h, report)?;

        Ok(())
    }

    fn draw_header_band(
        &self,
        doc: &mut PdfDocument,
        page: usize,
        w: f32,
        h: f32,
        report: &mut SanitizeReport,
    ) -> Result<()> {
        let l = self.layout;
        let band_h = l.y(l.header_height, h);
        let margin = l.x(l.margin_x, w);

        doc.fill_rect(page, 0.0, 0.0, w, band_h, band_color())?;

        let center_y = band_h * 0.5;
        let mut text_x = margin;

        if let Some(logo) = &self.branding.logo {
            let logo_h = band_h * 0.6;
            let logo_w = logo_h * 2.4;
            doc.insert_image(logo, page, margin, band_h * 0.2, logo_w, logo_h)?;
            text_x += logo_w + 8.0;
        } else {
            // Vector mark: accent square carrying the product initial.
            let mark = band_h * 0.5;
            doc.fill_rect(page, margin, band_h * 0.25, mark, mark, Color::white())?;
            let initial: String = self
                .branding
                .product_name
                .chars()
                .take(1)
                .collect::<String>()
                .to_uppercase();
            self.text(
                doc,
                page,
                &initial,
                BODY_BOLD_FONT,
                mark * 0.7,
                margin + mark * 0.28,
                band_h * 0.25 + mark * 0.78,
                Align::Left,
                band_color(),
                report,
            )?;
            text_x += mark + 8.0;
        }

        self.text(
            doc,
            page,
            &self.branding.product_name,
            BODY_BOLD_FONT,
            l.heading_size + 3.0,
            text_x,
            center_y + (l.heading_size + 3.0) * 0.35,
            Align::Left,
            Color::white(),
            report,
        )?;
        self.text(
            doc,
            page,
            &self.branding.partner_badge,
            BODY_FONT,
            l.small_size,
            w - margin,
            center_y + l.small_size * 0.35,
            Align::Right,
            Color::white(),
            report,
        )?;

        Ok(())
    }

    fn draw_billing_blocks(
        &self,
        doc: &mut PdfDocument,
        page: usize,
        quote: &Quote,
        w: f32,
        h: f32,
        report: &mut SanitizeReport,
    ) -> Result<()> {
        let l = self.layout;
        let margin = l.x(l.margin_x, w);
        let row = l.y(l.row_height, h);
        let top = l.y(l.billing_y, h);
        let from_x = l.x(0.55, w);

        self.text(
            doc, page, "BILL TO", BODY_BOLD_FONT, l.heading_size, margin, top,
            Align::Left, muted_color(), report,
        )?;
        let bill_lines = [
            quote.client_or_fallback().to_string(),
            quote.company_or_fallback().to_string(),
            quote.client_email.clone(),
        ];
        for (i, line) in bill_lines.iter().filter(|s| !s.is_empty()).enumerate() {
            self.text(
                doc, page, line, BODY_FONT, l.body_size, margin, top + row * (i as f32 + 1.2),
                Align::Left, Color::black(), report,
            )?;
        }

        self.text(
            doc, page, "FROM", BODY_BOLD_FONT, l.heading_size, from_x, top,
            Align::Left, muted_color(), report,
        )?;
        let from_lines = [
            self.branding.product_name.clone(),
            self.branding.contact_line.clone(),
        ];
        for (i, line) in from_lines.iter().filter(|s| !s.is_empty()).enumerate() {
            self.text(
                doc, page, line, BODY_FONT, l.body_size, from_x, top + row * (i as f32 + 1.2),
                Align::Left, Color::black(), report,
            )?;
        }

        Ok(())
    }

    fn draw_project_summary(
        &self,
        doc: &mut PdfDocument,
        page: usize,
        quote: &Quote,
        w: f32,
        h: f32,
        report: &mut SanitizeReport,
    ) -> Result<()> {
        let l = self.layout;
        let margin = l.x(l.margin_x, w);
        let value_x = l.x(0.32, w);
        let row = l.y(l.row_height, h);
        let top = l.y(l.summary_y, h);
        let config = &quote.configuration;

        self.text(
            doc, page, "Project Summary", BODY_BOLD_FONT, l.heading_size, margin, top,
            Align::Left, Color::black(), report,
        )?;
        doc.stroke_rule(page, margin, top + 4.0, w - margin, top + 4.0, 0.6, muted_color())?;

        let plan = if quote.pricing_tier.features.is_empty() {
            quote.pricing_tier.name.clone()
        } else {
            format!(
                "{} ({})",
                quote.pricing_tier.name,
                quote.pricing_tier.features.join(", ")
            )
        };

        let duration = format!(
            "{} months ({})",
            config.duration_months,
            number_words(config.duration_months)
        );

        let pairs: [(&str, String); 6] = [
            ("Migration type", config.migration_type.clone()),
            ("Plan", plan),
            ("Users", config.number_of_users.to_string()),
            ("Data size", format!("{} GB", config.data_size_gb)),
            ("Duration", duration),
            ("Total cost", format_currency(quote.calculation.total_cost)),
        ];

        for (i, (label, value)) in pairs.iter().enumerate() {
            let y = top + row * (i as f32 + 1.4);
            self.text(
                doc, page, label, BODY_FONT, l.body_size, margin, y,
                Align::Left, muted_color(), report,
            )?;
            let value_font = if *label == "Total cost" { BODY_BOLD_FONT } else { BODY_FONT };
            self.text(
                doc, page, value, value_font, l.body_size, value_x, y,
                Align::Left, Color::black(), report,
            )?;
        }

        Ok(())
    }

    /// The services-and-pricing table: heading row, one row per line item,
    /// and a totals row. A single loop over the layout's column table does
    /// all the positioning.
    fn draw_pricing_table(
        &self,
        doc: &mut PdfDocument,
        page: usize,
        quote: &Quote,
        top_frac: f32,
        w: f32,
        h: f32,
        report: &mut SanitizeReport,
    ) -> Result<()> {
        let l = self.layout;
        let margin = l.x(l.margin_x, w);
        let right = w - margin;
        let row = l.y(l.row_height, h);
        let top = l.y(top_frac, h);

        for col in &l.columns {
            self.text(
                doc, page, col.heading, BODY_BOLD_FONT, l.body_size, l.x(col.x, w), top,
                col.align, muted_color(), report,
            )?;
        }
        doc.stroke_rule(page, margin, top + 4.0, right, top + 4.0, 0.8, Color::black())?;

        let items = line_items(quote);
        for (i, item) in items.iter().enumerate() {
            let y = top + row * (i as f32 + 1.4);
            let cells = [&item.description, &item.qty, &item.unit, &item.amount];
            for (col, cell) in l.columns.iter().zip(cells) {
                self.text(
                    doc, page, cell, BODY_FONT, l.body_size, l.x(col.x, w), y,
                    col.align, Color::black(), report,
                )?;
            }
        }

        let totals_y = top + row * (items.len() as f32 + 1.8);
        doc.fill_rect(
            page,
            margin,
            totals_y - row * 0.8,
            right - margin,
            row * 1.2,
            tint_color(),
        )?;
        self.text(
            doc, page, "Total", BODY_BOLD_FONT, l.body_size, l.x(l.columns[2].x, w), totals_y,
            Align::Right, Color::black(), report,
        )?;
        self.text(
            doc,
            page,
            &format_currency(quote.calculation.total_cost),
            BODY_BOLD_FONT,
            l.body_size,
            l.x(l.columns[3].x, w),
            totals_y,
            Align::Right,
            Color::black(),
            report,
        )?;

        Ok(())
    }

    fn draw_signatures(
        &self,
        doc: &mut PdfDocument,
        page: usize,
        quote: &Quote,
        w: f32,
        h: f32,
        report: &mut SanitizeReport,
    ) -> Result<()> {
        let l = self.layout;
        let margin = l.x(l.margin_x, w);
        let row = l.y(l.row_height, h);
        let top = l.y(l.signature_y, h);
        let column_x = [margin, l.x(0.55, w)];
        let line_w = l.x(0.34, w);

        // Two parties at most; the data model allows more but the page
        // carries two signature columns.
        for (i, signature) in quote.signatures.iter().take(2).enumerate() {
            let x = column_x[i];

            if !signature.signature_text.is_empty() {
                self.text(
                    doc, page, &signature.signature_text, BODY_FONT, l.heading_size + 4.0,
                    x, top, Align::Left, Color::black(), report,
                )?;
            }
            doc.stroke_rule(page, x, top + 4.0, x + line_w, top + 4.0, 0.6, Color::black())?;

            let detail_lines = [
                signature.signer_name.clone(),
                signature.title.clone(),
                signature.formatted_date(),
            ];
            for (j, line) in detail_lines.iter().filter(|s| !s.is_empty()).enumerate() {
                self.text(
                    doc, page, line, BODY_FONT, l.small_size, x, top + row * (j as f32 + 1.0),
                    Align::Left, muted_color(), report,
                )?;
            }
        }

        Ok(())
    }

    fn draw_footer(
        &self,
        doc: &mut PdfDocument,
        page: usize,
        w: f32,
        h: f32,
        page_label: String,
        report: &mut SanitizeReport,
    ) -> Result<()> {
        let l = self.layout;
        let margin = l.x(l.margin_x, w);
        let y = l.y(l.footer_y, h);

        doc.stroke_rule(page, margin, y - 10.0, w - margin, y - 10.0, 0.5, muted_color())?;
        self.text(
            doc, page, &self.branding.contact_line, BODY_FONT, l.small_size, margin, y,
            Align::Left, muted_color(), report,
        )?;
        self.text(
            doc, page, &self.branding.classification, BODY_FONT, l.small_size, w * 0.5, y,
            Align::Center, muted_color(), report,
        )?;
        self.text(
            doc, page, &page_label, BODY_FONT, l.small_size, w - margin, y,
            Align::Right, muted_color(), report,
        )?;

        Ok(())
    }
}

fn doc_page_label(doc: &PdfDocument, page: usize) -> String {
    format!("Page {} of {}", page + 1, doc.page_count())
}

/// Resolved patch region in top-origin points.
struct ResolvedRegion {
    x: f32,
    y: f32,
    width: f32,
    height: f32,
}

fn resolve_region(region: &PatchRegion, w: f32, h: f32) -> ResolvedRegion {
    ResolvedRegion {
        x: region.x * w,
        y: region.y * h,
        width: region.width * w,
        height: region.height * h,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quote::{Calculation, Configuration, Quote};
    use pretty_assertions::assert_eq;

    fn quote_with_users(users: u32) -> Quote {
        Quote {
            company: "Acme Corp".to_string(),
            configuration: Configuration {
                migration_type: "Email".to_string(),
                number_of_users: users,
                instance_count: 2,
                duration_months: 12,
                ..Default::default()
            },
            calculation: Calculation {
                user_cost: 600.0,
                data_cost: 250.0,
                migration_cost: 200.0,
                instance_cost: 150.0,
                total_cost: 1200.0,
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_line_items_shape() {
        let items = line_items(&quote_with_users(100));
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].description, "Email migration service");
        assert_eq!(items[0].qty, "100 users");
        assert_eq!(items[0].amount, "$1,050");
        assert_eq!(items[1].qty, "2 instances");
        assert_eq!(items[1].amount, "$150");
    }

    #[test]
    fn test_zero_users_unit_is_na() {
        let items = line_items(&quote_with_users(0));
        assert_eq!(items[0].unit, "N/A");
        // The amount itself is still a currency value.
        assert_eq!(items[0].amount, "$1,050");
    }

    #[test]
    fn test_per_user_unit_divides() {
        let items = line_items(&quote_with_users(100));
        // (600 + 250 + 200) / 100 = 10.5 -> rounds to $11
        assert_eq!(items[0].unit, "$11");
    }

    #[test]
    fn test_zero_instances_unit_is_na() {
        let mut quote = quote_with_users(10);
        quote.configuration.instance_count = 0;
        let items = line_items(&quote);
        assert_eq!(items[1].unit, "N/A");
    }

    #[test]
    fn test_blank_migration_type_falls_back() {
        let mut quote = quote_with_users(10);
        quote.configuration.migration_type = "".to_string();
        let items = line_items(&quote);
        assert_eq!(items[0].description, "Data migration service");
    }
}
