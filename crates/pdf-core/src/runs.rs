//! Positioned text-run extraction from page content streams
//!
//! Walks a page's decoded content operations and reconstructs where each
//! shown string sits on the page. Positions track BT/ET, Tf, Td/TD, TL,
//! T*, Tm and the quote operators; shear or non-uniform scale in the text
//! matrix is not modeled, which is fine for template documents whose text
//! is overwhelmingly axis-aligned.
//!
//! Horizontal advance within a line is estimated at half an em per
//! character, since the template's own font metrics are not loaded. The
//! estimate only affects run-gap coalescing, never what the runs contain.

use crate::document::PdfDocument;
use crate::font::win_ansi_char;
use crate::{PdfError, Result};
use lopdf::content::Content;
use lopdf::Object;

/// A positioned string from a page content stream.
///
/// Coordinates are PDF-space (origin bottom-left) at the text baseline.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub font_size: f32,
    /// Font resource name active for this run (e.g. "F1")
    pub font_resource: String,
    /// Weight hint recovered from the resource's BaseFont name
    pub bold: bool,
}

/// Kerning adjustments this large (in thousandths of an em) read as a
/// word gap inside a TJ array.
const TJ_WORD_GAP: i64 = -100;

fn op_f32(obj: &Object) -> Option<f32> {
    obj.as_f32()
        .ok()
        .or_else(|| obj.as_i64().ok().map(|v| v as f32))
}

/// Decode a content-stream string operand to text.
///
/// Simple templates carry single-byte (WinAnsi/Latin-1-shaped) strings;
/// Identity-H templates carry UTF-16BE-looking payloads, which a zero
/// high-byte pattern identifies well enough for literal token search.
fn decode_string_operand(bytes: &[u8]) -> String {
    let looks_utf16 = bytes.len() >= 2
        && bytes.len() % 2 == 0
        && bytes.iter().step_by(2).all(|&b| b == 0);
    if looks_utf16 {
        return bytes
            .chunks_exact(2)
            .filter_map(|pair| {
                let code = u16::from_be_bytes([pair[0], pair[1]]);
                char::from_u32(code as u32)
            })
            .collect();
    }

    bytes.iter().map(|&b| win_ansi_char(b)).collect()
}

/// Extract every positioned text run from a page (0-based index).
pub fn extract_text_runs(doc: &PdfDocument, page: usize) -> Result<Vec<TextRun>> {
    let content_bytes = doc.page_content(page)?;
    let content = Content::decode(&content_bytes)
        .map_err(|e| PdfError::ParseError(format!("page {page}: content stream: {e}")))?;
    let base_fonts = doc.page_font_base_names(page)?;

    let mut runs = Vec::new();

    let mut in_text = false;
    let mut font_size: f32 = 0.0;
    let mut font_resource = String::new();
    let mut leading: f32 = 0.0;
    let mut scale: f32 = 1.0;
    let mut line_x: f32 = 0.0;
    let mut line_y: f32 = 0.0;
    let mut cursor_x: f32 = 0.0;

    let emit = |text: String,
                    x: f32,
                    y: f32,
                    size: f32,
                    resource: &str,
                    runs: &mut Vec<TextRun>|
     -> f32 {
        if text.is_empty() {
            return 0.0;
        }
        let bold = base_fonts
            .get(resource)
            .map(|base| base.to_ascii_lowercase().contains("bold"))
            .unwrap_or(false);
        let advance = text.chars().count() as f32 * size * 0.5;
        runs.push(TextRun {
            text,
            x,
            y,
            font_size: size,
            font_resource: resource.to_string(),
            bold,
        });
        advance
    };

    for op in &content.operations {
        match op.operator.as_ref() {
            "BT" => {
                in_text = true;
                line_x = 0.0;
                line_y = 0.0;
                cursor_x = 0.0;
                scale = 1.0;
            }
            "ET" => {
                in_text = false;
            }
            "Tf" => {
                if let (Some(name), Some(size)) = (op.operands.first(), op.operands.get(1)) {
                    if let Ok(name) = name.as_name_str() {
                        font_resource = name.to_string();
                    }
                    if let Some(size) = op_f32(size) {
                        font_size = size;
                    }
                }
            }
            "TL" => {
                if let Some(l) = op.operands.first().and_then(op_f32) {
                    leading = l;
                }
            }
            "Td" if in_text => {
                if let (Some(tx), Some(ty)) = (
                    op.operands.first().and_then(op_f32),
                    op.operands.get(1).and_then(op_f32),
                ) {
                    line_x += tx;
                    line_y += ty;
                    cursor_x = line_x;
                }
            }
            "TD" if in_text => {
                if let (Some(tx), Some(ty)) = (
                    op.operands.first().and_then(op_f32),
                    op.operands.get(1).and_then(op_f32),
                ) {
                    leading = -ty;
                    line_x += tx;
                    line_y += ty;
                    cursor_x = line_x;
                }
            }
            "Tm" if in_text => {
                if op.operands.len() >= 6 {
                    let d = op.operands.get(3).and_then(op_f32).unwrap_or(1.0);
                    let e = op.operands.get(4).and_then(op_f32).unwrap_or(0.0);
                    let f = op.operands.get(5).and_then(op_f32).unwrap_or(0.0);
                    scale = if d == 0.0 { 1.0 } else { d.abs() };
                    line_x = e;
                    line_y = f;
                    cursor_x = e;
                }
            }
            "T*" if in_text => {
                line_y -= leading;
                cursor_x = line_x;
            }
            "Tj" if in_text => {
                if let Some(Object::String(bytes, _)) = op.operands.first() {
                    let text = decode_string_operand(bytes);
                    cursor_x += emit(
                        text,
                        cursor_x,
                        line_y,
                        font_size * scale,
                        &font_resource,
                        &mut runs,
                    );
                }
            }
            "'" if in_text => {
                line_y -= leading;
                cursor_x = line_x;
                if let Some(Object::String(bytes, _)) = op.operands.first() {
                    let text = decode_string_operand(bytes);
                    cursor_x += emit(
                        text,
                        cursor_x,
                        line_y,
                        font_size * scale,
                        &font_resource,
                        &mut runs,
                    );
                }
            }
            "\"" if in_text => {
                line_y -= leading;
                cursor_x = line_x;
                if let Some(Object::String(bytes, _)) = op.operands.get(2) {
                    let text = decode_string_operand(bytes);
                    cursor_x += emit(
                        text,
                        cursor_x,
                        line_y,
                        font_size * scale,
                        &font_resource,
                        &mut runs,
                    );
                }
            }
            "TJ" if in_text => {
                if let Some(Object::Array(items)) = op.operands.first() {
                    // One TJ paints one visual run; kerning gaps large
                    // enough to read as word spaces become spaces.
                    let mut text = String::new();
                    for item in items {
                        match item {
                            Object::String(bytes, _) => {
                                text.push_str(&decode_string_operand(bytes));
                            }
                            Object::Integer(n) if *n < TJ_WORD_GAP => text.push(' '),
                            _ => {}
                        }
                    }
                    cursor_x += emit(
                        text,
                        cursor_x,
                        line_y,
                        font_size * scale,
                        &font_resource,
                        &mut runs,
                    );
                }
            }
            _ => {}
        }
    }

    Ok(runs)
}
