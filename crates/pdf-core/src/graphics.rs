//! Vector graphics and image placement operators

use crate::document::Color;

/// Generate PDF operators for a filled rectangle.
///
/// Coordinates are PDF-space (origin bottom-left); `x`/`y` name the
/// rectangle's lower-left corner. The fill is wrapped in q/Q so it never
/// leaks graphics state into surrounding content.
pub fn generate_rect_operators(x: f32, y: f32, width: f32, height: f32, color: Color) -> Vec<u8> {
    format!(
        "q\n{} {} {} rg\n{x} {y} {width} {height} re\nf\nQ\n",
        color.r, color.g, color.b
    )
    .into_bytes()
}

/// Generate PDF operators for a stroked horizontal/vertical rule.
pub fn generate_rule_operators(
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
    line_width: f32,
    color: Color,
) -> Vec<u8> {
    format!(
        "q\n{} {} {} RG\n{line_width} w\n{x1} {y1} m\n{x2} {y2} l\nS\nQ\n",
        color.r, color.g, color.b
    )
    .into_bytes()
}

/// Generate PDF operators for drawing an image XObject.
///
/// The CTM scales the unit square to `width` x `height` points at
/// (`x`, `y`), PDF-space lower-left corner.
pub fn generate_image_operators(
    resource_name: &str,
    x: f32,
    y: f32,
    width: f32,
    height: f32,
) -> Vec<u8> {
    format!("q\n{width} 0 0 {height} {x} {y} cm\n/{resource_name} Do\nQ\n").into_bytes()
}
