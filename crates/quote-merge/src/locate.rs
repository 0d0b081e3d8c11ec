//! Token location over a document's positioned text runs
//!
//! Walks every page's text runs looking for exact literal matches of the
//! known placeholder spellings. Runs that sit on the same line (y within a
//! tolerance) are coalesced when their horizontal gap is small, so tokens
//! split across adjacent show-text operations still match. Absence of
//! tokens is a valid outcome, reported as [`TokenSearch::NotFound`], never
//! as an error.

use crate::placeholder::TokenSpec;
use crate::Result;
use pdf_core::{extract_text_runs, PdfDocument, TextRun};

/// Tolerances for line grouping and run coalescing.
#[derive(Debug, Clone, Copy)]
pub struct LocatorConfig {
    /// Maximum |y| difference for two runs to share a line, in points.
    pub line_tolerance: f32,
    /// Maximum horizontal gap between adjacent runs to coalesce, as a
    /// multiple of the font size.
    pub gap_factor: f32,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            line_tolerance: 2.0,
            gap_factor: 1.5,
        }
    }
}

/// A located placeholder occurrence.
///
/// Coordinates are PDF-space (origin bottom-left) at the text baseline of
/// the first matched character.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenMatch {
    pub page_index: usize,
    /// Canonical placeholder key (e.g. `{{Company Name}}`).
    pub token: String,
    /// The literal spelling that matched (key or alias).
    pub literal: String,
    pub x: f32,
    pub y: f32,
    pub font_size: f32,
    pub bold: bool,
}

/// Outcome of a token search. `NotFound` is a value, not an error: the
/// caller decides whether to fall back to heuristic placement.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenSearch {
    Found(Vec<TokenMatch>),
    NotFound,
}

impl TokenSearch {
    pub fn matches(&self) -> &[TokenMatch] {
        match self {
            TokenSearch::Found(matches) => matches,
            TokenSearch::NotFound => &[],
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, TokenSearch::Found(_))
    }
}

/// One character of an assembled line, with its estimated position.
#[derive(Debug, Clone, Copy)]
struct LineChar {
    c: char,
    x: f32,
    font_size: f32,
    bold: bool,
}

/// A coalesced stretch of same-line text.
#[derive(Debug, Clone)]
struct Segment {
    y: f32,
    chars: Vec<LineChar>,
}

/// Group runs into lines and coalesce adjacent runs into segments.
fn assemble_segments(runs: &[TextRun], config: &LocatorConfig) -> Vec<Segment> {
    // Lines keyed by representative y; runs land on the first line whose
    // y sits within the tolerance.
    let mut lines: Vec<(f32, Vec<&TextRun>)> = Vec::new();
    for run in runs {
        match lines
            .iter_mut()
            .find(|(y, _)| (*y - run.y).abs() <= config.line_tolerance)
        {
            Some((_, members)) => members.push(run),
            None => lines.push((run.y, vec![run])),
        }
    }

    let mut segments = Vec::new();
    for (y, mut members) in lines {
        members.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal));

        let mut current: Vec<LineChar> = Vec::new();
        let mut prev_end: f32 = 0.0;

        for run in members {
            let gap_limit = config.gap_factor * run.font_size.max(1.0);
            if !current.is_empty() && run.x - prev_end > gap_limit {
                segments.push(Segment {
                    y,
                    chars: std::mem::take(&mut current),
                });
            }

            // Per-character x uses the same half-em advance estimate as
            // run extraction; it only has to be good enough for masking.
            let step = run.font_size * 0.5;
            for (i, c) in run.text.chars().enumerate() {
                current.push(LineChar {
                    c,
                    x: run.x + i as f32 * step,
                    font_size: run.font_size,
                    bold: run.bold,
                });
            }
            prev_end = run.x + run.text.chars().count() as f32 * step;
        }

        if !current.is_empty() {
            segments.push(Segment { y, chars: current });
        }
    }

    segments
}

fn find_char_subsequence(haystack: &[LineChar], needle: &[char], from: usize) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    (from..=haystack.len() - needle.len())
        .find(|&start| needle.iter().enumerate().all(|(i, &c)| haystack[start + i].c == c))
}

/// Bare-word aliases (no brace/bracket delimiters) must not match inside
/// a longer word; `comp` is a real template marker but also a prefix of
/// "Company".
fn is_word_bounded(haystack: &[LineChar], start: usize, len: usize) -> bool {
    let before_ok = start == 0 || !haystack[start - 1].c.is_alphanumeric();
    let after = start + len;
    let after_ok = after >= haystack.len() || !haystack[after].c.is_alphanumeric();
    before_ok && after_ok
}

fn is_delimited_literal(literal: &str) -> bool {
    literal.starts_with("{{") || literal.starts_with('[')
}

/// Scan every page for the given token specs.
pub fn find_tokens(
    doc: &PdfDocument,
    specs: &[TokenSpec],
    config: &LocatorConfig,
) -> Result<TokenSearch> {
    let mut matches = Vec::new();

    for page_index in 0..doc.page_count() {
        let runs = extract_text_runs(doc, page_index)?;
        if runs.is_empty() {
            continue;
        }
        let segments = assemble_segments(&runs, config);

        for segment in &segments {
            // Spans already claimed by a higher-priority literal.
            let mut claimed: Vec<(usize, usize)> = Vec::new();

            for spec in specs {
                for literal in spec.literals() {
                    let needle: Vec<char> = literal.chars().collect();
                    let delimited = is_delimited_literal(literal);
                    let mut from = 0;

                    while let Some(start) = find_char_subsequence(&segment.chars, &needle, from) {
                        let end = start + needle.len();
                        from = start + 1;

                        if !delimited && !is_word_bounded(&segment.chars, start, needle.len()) {
                            continue;
                        }
                        if claimed.iter().any(|&(s, e)| start < e && s < end) {
                            continue;
                        }
                        claimed.push((start, end));

                        let anchor = segment.chars[start];
                        matches.push(TokenMatch {
                            page_index,
                            token: spec.key.clone(),
                            literal: literal.to_string(),
                            x: anchor.x,
                            y: segment.y,
                            font_size: anchor.font_size,
                            bold: anchor.bold,
                        });
                    }
                }
            }
        }
    }

    if matches.is_empty() {
        log::debug!("token search found no placeholder occurrences");
        Ok(TokenSearch::NotFound)
    } else {
        log::debug!("token search found {} placeholder occurrence(s)", matches.len());
        Ok(TokenSearch::Found(matches))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::placeholder::company_token_specs;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Object, Stream};
    use pretty_assertions::assert_eq;

    /// Build a one-page PDF whose content stream is the given operations.
    fn pdf_with_operations(operations: Vec<Operation>) -> PdfDocument {
        let mut doc = lopdf::Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });

        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("encode content"),
        ));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            },
            "Contents" => content_id,
        });

        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        };
        doc.objects.insert(pages_id, pages.into());

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).expect("save test pdf");
        PdfDocument::from_bytes(&bytes).expect("reload test pdf")
    }

    fn text_ops(parts: &[(&str, f32, f32)]) -> Vec<Operation> {
        let mut ops = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
        ];
        let mut cx = 0.0f32;
        let mut cy = 0.0f32;
        for (text, x, y) in parts {
            ops.push(Operation::new(
                "Td",
                vec![Object::Real(x - cx), Object::Real(y - cy)],
            ));
            cx = *x;
            cy = *y;
            ops.push(Operation::new("Tj", vec![Object::string_literal(*text)]));
        }
        ops.push(Operation::new("ET", vec![]));
        ops
    }

    #[test]
    fn test_finds_single_token() {
        let doc = pdf_with_operations(text_ops(&[("{{Company Name}}", 72.0, 700.0)]));
        let search = find_tokens(&doc, &company_token_specs(), &LocatorConfig::default()).unwrap();

        let matches = search.matches();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].token, "{{Company Name}}");
        assert_eq!(matches[0].page_index, 0);
        assert_eq!(matches[0].x, 72.0);
        assert_eq!(matches[0].y, 700.0);
    }

    #[test]
    fn test_finds_token_split_across_runs() {
        // "{{Comp" is 6 chars at 12pt -> estimated advance 36pt, so the
        // second run at x=108 reads as adjacent.
        let doc = pdf_with_operations(text_ops(&[
            ("{{Comp", 72.0, 700.0),
            ("any Name}}", 108.0, 700.0),
        ]));
        let search = find_tokens(&doc, &company_token_specs(), &LocatorConfig::default()).unwrap();

        let matches = search.matches();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].literal, "{{Company Name}}");
        assert_eq!(matches[0].x, 72.0);
    }

    #[test]
    fn test_distant_runs_do_not_coalesce() {
        let doc = pdf_with_operations(text_ops(&[
            ("{{Comp", 72.0, 700.0),
            ("any Name}}", 400.0, 700.0),
        ]));
        let search = find_tokens(&doc, &company_token_specs(), &LocatorConfig::default()).unwrap();
        assert_eq!(search, TokenSearch::NotFound);
    }

    #[test]
    fn test_alias_underscore_spelling() {
        let doc = pdf_with_operations(text_ops(&[("{{Company_Name}}", 72.0, 650.0)]));
        let search = find_tokens(&doc, &company_token_specs(), &LocatorConfig::default()).unwrap();

        let matches = search.matches();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].token, "{{Company Name}}");
        assert_eq!(matches[0].literal, "{{Company_Name}}");
    }

    #[test]
    fn test_bare_alias_requires_word_boundary() {
        // "Company" contains "comp" but must not match the bare alias.
        let doc = pdf_with_operations(text_ops(&[("Our Company Overview", 72.0, 700.0)]));
        let search = find_tokens(&doc, &company_token_specs(), &LocatorConfig::default()).unwrap();
        assert_eq!(search, TokenSearch::NotFound);

        let doc = pdf_with_operations(text_ops(&[("Statement of Work comp", 72.0, 700.0)]));
        let search = find_tokens(&doc, &company_token_specs(), &LocatorConfig::default()).unwrap();
        assert_eq!(search.matches().len(), 1);
        assert_eq!(search.matches()[0].literal, "comp");
    }

    #[test]
    fn test_absent_token_is_not_found() {
        let doc = pdf_with_operations(text_ops(&[("Nothing to see here", 72.0, 700.0)]));
        let search = find_tokens(&doc, &company_token_specs(), &LocatorConfig::default()).unwrap();
        assert_eq!(search, TokenSearch::NotFound);
        assert!(search.matches().is_empty());
    }

    #[test]
    fn test_multiple_occurrences_all_reported() {
        let doc = pdf_with_operations(text_ops(&[
            ("{{Company Name}}", 72.0, 700.0),
            ("{{Company Name}}", 72.0, 500.0),
        ]));
        let search = find_tokens(&doc, &company_token_specs(), &LocatorConfig::default()).unwrap();
        assert_eq!(search.matches().len(), 2);
    }
}
