//! PDF Core - Low-level PDF manipulation
//!
//! This crate provides functionality for:
//! - Opening PDF documents from bytes with magic-header validation
//! - Deep-copying pages between documents without re-rendering
//! - Embedding fonts (built-in Helvetica metrics or TrueType files)
//! - Drawing text, rectangles, rules and images at specific coordinates
//! - Extracting positioned text runs from page content streams
//!
//! # Example
//!
//! ```ignore
//! use pdf_core::{Align, BuiltinFont, FontData, PdfDocument};
//!
//! let source = PdfDocument::from_bytes(&template_bytes)?;
//! let mut out = PdfDocument::new_output();
//! for i in 0..source.page_count() {
//!     out.append_page_from(&source, i)?;
//! }
//! out.add_font("body", FontData::builtin(BuiltinFont::Helvetica))?;
//! out.set_font("body", 12.0)?;
//! out.insert_text("Hello, World!", 0, 100.0, 700.0, Align::Left)?;
//! let bytes = out.to_bytes()?;
//! ```

mod document;
mod font;
mod graphics;
mod image;
mod runs;
mod text;

pub use document::{Color, PdfDocument};
pub use font::{win_ansi_byte, BuiltinFont, FontData};
pub use graphics::{generate_image_operators, generate_rect_operators, generate_rule_operators};
pub use runs::{extract_text_runs, TextRun};
pub use text::{encode_hex, generate_text_operators, wrap_text, TextRenderContext};

use thiserror::Error;

/// Leading magic marker every PDF byte stream must carry.
pub const PDF_MAGIC: &[u8] = b"%PDF-";

/// Errors that can occur during PDF operations
#[derive(Debug, Error)]
pub enum PdfError {
    #[error("not a PDF document: missing %PDF- header")]
    InvalidMagic,

    #[error("corrupt PDF document: {0}")]
    Corrupt(String),

    #[error("failed to save PDF: {0}")]
    SaveError(String),

    #[error("font not found: {0}")]
    FontNotFound(String),

    #[error("font already exists: {0}")]
    FontAlreadyExists(String),

    #[error("failed to parse font: {0}")]
    FontParseError(String),

    #[error("invalid page index: {0} (document has {1} pages)")]
    InvalidPage(usize, usize),

    #[error("image error: {0}")]
    ImageError(String),

    #[error("PDF structure error: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("lopdf error: {0}")]
    LopdfError(#[from] lopdf::Error),
}

/// Result type for PDF operations
pub type Result<T> = std::result::Result<T, PdfError>;

/// Text alignment options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}
