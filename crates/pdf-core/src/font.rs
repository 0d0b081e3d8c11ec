//! Font handling for PDF documents
//!
//! Two kinds of fonts are supported:
//! - Built-in Helvetica variants: never embedded, widths come from the
//!   standard AFM tables, so documents render without shipping font files.
//! - TrueType fonts supplied as bytes: embedded as single-byte
//!   WinAnsi-encoded font programs with a FlateDecode-compressed FontFile2.
//!
//! All drawn text is WinAnsi-encoded, which is why the drawing layer expects
//! callers to sanitize strings down to that repertoire first.

use crate::{PdfError, Result};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::{Dictionary, Object, Stream};
use std::io::Write;

/// Standard base-14 font variants available without embedding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinFont {
    Helvetica,
    HelveticaBold,
    HelveticaOblique,
}

impl BuiltinFont {
    /// PostScript base font name as it appears in the font dictionary.
    pub fn base_name(&self) -> &'static str {
        match self {
            BuiltinFont::Helvetica => "Helvetica",
            BuiltinFont::HelveticaBold => "Helvetica-Bold",
            BuiltinFont::HelveticaOblique => "Helvetica-Oblique",
        }
    }

    /// AFM advance widths (1/1000 em) for character codes 32..=126.
    fn widths(&self) -> &'static [u16; 95] {
        match self {
            // Oblique shares the regular metrics.
            BuiltinFont::Helvetica | BuiltinFont::HelveticaOblique => &HELVETICA_WIDTHS,
            BuiltinFont::HelveticaBold => &HELVETICA_BOLD_WIDTHS,
        }
    }
}

/// Helvetica AFM widths for codes 32..=126.
static HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, //
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, //
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, //
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, //
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, //
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

/// Helvetica-Bold AFM widths for codes 32..=126.
static HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, //
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611, //
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778, //
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556, //
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611, //
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

/// Fallback advance (1/1000 em) for characters outside the width tables.
const DEFAULT_WIDTH: u16 = 556;

/// Map a character to its WinAnsi (CP-1252) code, if it has one.
///
/// Covers ASCII, the printable Latin-1 supplement and the handful of
/// CP-1252 extras (euro sign, dashes, curly quotes) the 0x80..0x9F window
/// carries. Characters without a mapping have no glyph in these fonts.
pub fn win_ansi_byte(c: char) -> Option<u8> {
    match c {
        ' '..='~' => Some(c as u8),
        '\u{00A0}'..='\u{00FF}' => Some(c as u32 as u8),
        '\u{20AC}' => Some(0x80), // euro
        '\u{2018}' => Some(0x91),
        '\u{2019}' => Some(0x92),
        '\u{201C}' => Some(0x93),
        '\u{201D}' => Some(0x94),
        '\u{2022}' => Some(0x95), // bullet
        '\u{2013}' => Some(0x96), // en dash
        '\u{2014}' => Some(0x97), // em dash
        '\u{2122}' => Some(0x99), // trade mark
        _ => None,
    }
}

/// Reverse of [`win_ansi_byte`] for the 0x80..0x9F window; other codes map
/// straight through Latin-1.
pub fn win_ansi_char(b: u8) -> char {
    match b {
        0x80 => '\u{20AC}',
        0x91 => '\u{2018}',
        0x92 => '\u{2019}',
        0x93 => '\u{201C}',
        0x94 => '\u{201D}',
        0x95 => '\u{2022}',
        0x96 => '\u{2013}',
        0x97 => '\u{2014}',
        0x99 => '\u{2122}',
        _ => b as char,
    }
}

/// Encode text as WinAnsi bytes. Unmappable characters become `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| win_ansi_byte(c).unwrap_or(b'?'))
        .collect()
}

#[derive(Debug, Clone)]
enum FontKind {
    Builtin(BuiltinFont),
    TrueType {
        data: Vec<u8>,
        face: ttf_parser::Face<'static>,
    },
}

/// A font usable for measurement and drawing.
#[derive(Debug, Clone)]
pub struct FontData {
    /// Font identifier (used in `set_font`)
    pub name: String,
    kind: FontKind,
}

/// PDF objects generated for embedding a font into a document.
pub(crate) enum FontObjects {
    /// Built-in font: a single font dictionary, nothing embedded.
    Simple(Dictionary),
    /// Embedded TrueType font program.
    Embedded {
        font: Dictionary,
        descriptor: Dictionary,
        font_file: Stream,
    },
}

impl FontData {
    /// Create a built-in (non-embedded) standard font.
    pub fn builtin(font: BuiltinFont) -> Self {
        Self {
            name: font.base_name().to_ascii_lowercase(),
            kind: FontKind::Builtin(font),
        }
    }

    /// Create font data from TrueType bytes.
    ///
    /// # Arguments
    /// * `name` - Font identifier
    /// * `ttf_data` - TrueType font file bytes
    pub fn from_ttf(name: &str, ttf_data: &[u8]) -> Result<Self> {
        let data = ttf_data.to_vec();

        // The face borrows the font bytes for the document lifetime; fonts
        // are loaded once per merge call, so leaking a copy is acceptable.
        let static_data: &'static [u8] = Box::leak(data.clone().into_boxed_slice());

        let face = ttf_parser::Face::parse(static_data, 0)
            .map_err(|e| PdfError::FontParseError(format!("{e:?}")))?;

        Ok(Self {
            name: name.to_string(),
            kind: FontKind::TrueType { data, face },
        })
    }

    /// Whether this font carries an embedded font program.
    pub fn is_embedded(&self) -> bool {
        matches!(self.kind, FontKind::TrueType { .. })
    }

    /// Advance width of a character in 1/1000 em.
    pub fn char_width_units(&self, c: char) -> u16 {
        match &self.kind {
            FontKind::Builtin(base) => {
                let code = c as u32;
                if (0x20..=0x7E).contains(&code) {
                    base.widths()[(code - 0x20) as usize]
                } else if win_ansi_byte(c).is_some() {
                    DEFAULT_WIDTH
                } else {
                    0
                }
            }
            FontKind::TrueType { face, .. } => {
                let advance = face
                    .glyph_index(c)
                    .and_then(|id| face.glyph_hor_advance(id))
                    .unwrap_or(0);
                let upem = face.units_per_em() as u32;
                if upem == 0 {
                    return 0;
                }
                ((advance as u32 * 1000) / upem) as u16
            }
        }
    }

    /// Calculate text width in points for a given font size.
    pub fn text_width(&self, text: &str, font_size: f32) -> f32 {
        let units: u32 = text.chars().map(|c| self.char_width_units(c) as u32).sum();
        (units as f32 / 1000.0) * font_size
    }

    /// Ascent above the baseline in points at the given size.
    pub fn ascent(&self, font_size: f32) -> f32 {
        let units = match &self.kind {
            // Helvetica AFM ascender.
            FontKind::Builtin(_) => 718,
            FontKind::TrueType { face, .. } => {
                let upem = face.units_per_em() as i32;
                if upem == 0 {
                    718
                } else {
                    face.ascender() as i32 * 1000 / upem
                }
            }
        };
        (units as f32 / 1000.0) * font_size
    }

    /// Descent below the baseline in points at the given size
    /// (returned as a positive depth).
    pub fn descent(&self, font_size: f32) -> f32 {
        let units = match &self.kind {
            // Helvetica AFM descender magnitude.
            FontKind::Builtin(_) => 207,
            FontKind::TrueType { face, .. } => {
                let upem = face.units_per_em() as i32;
                if upem == 0 {
                    207
                } else {
                    (face.descender() as i32).unsigned_abs() as i32 * 1000 / upem
                }
            }
        };
        (units as f32 / 1000.0) * font_size
    }

    /// Generate the PDF objects needed to embed this font.
    pub(crate) fn to_font_objects(&self) -> Result<FontObjects> {
        match &self.kind {
            FontKind::Builtin(base) => {
                let font = Dictionary::from_iter(vec![
                    ("Type", Object::Name(b"Font".to_vec())),
                    ("Subtype", Object::Name(b"Type1".to_vec())),
                    ("BaseFont", Object::Name(base.base_name().as_bytes().to_vec())),
                    ("Encoding", Object::Name(b"WinAnsiEncoding".to_vec())),
                ]);
                Ok(FontObjects::Simple(font))
            }
            FontKind::TrueType { data, face } => {
                let ps_name = Object::Name(self.name.as_bytes().to_vec());

                // Compress the raw font program; Length1 records the
                // uncompressed length per the FontFile2 contract.
                let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
                encoder.write_all(data)?;
                let compressed = encoder
                    .finish()
                    .map_err(|e| PdfError::FontParseError(format!("deflate failed: {e}")))?;

                let font_file = Stream::new(
                    Dictionary::from_iter(vec![
                        ("Filter", Object::Name(b"FlateDecode".to_vec())),
                        ("Length1", Object::Integer(data.len() as i64)),
                    ]),
                    compressed,
                );

                let upem = face.units_per_em() as i32;
                let scale = |v: i32| -> i64 {
                    if upem == 0 {
                        v as i64
                    } else {
                        (v * 1000 / upem) as i64
                    }
                };
                let ascent = scale(face.ascender() as i32);
                let descent = scale(face.descender() as i32);

                let descriptor = Dictionary::from_iter(vec![
                    ("Type", Object::Name(b"FontDescriptor".to_vec())),
                    ("FontName", ps_name.clone()),
                    ("Flags", Object::Integer(32)), // nonsymbolic
                    (
                        "FontBBox",
                        Object::Array(vec![
                            Object::Integer(0),
                            Object::Integer(descent),
                            Object::Integer(1000),
                            Object::Integer(ascent),
                        ]),
                    ),
                    ("ItalicAngle", Object::Integer(0)),
                    ("Ascent", Object::Integer(ascent)),
                    ("Descent", Object::Integer(descent)),
                    ("CapHeight", Object::Integer(ascent)),
                    ("StemV", Object::Integer(80)),
                ]);

                // Widths for codes 32..=255 under WinAnsi decoding.
                let widths: Vec<Object> = (32u16..=255)
                    .map(|code| {
                        let c = win_ansi_char(code as u8);
                        Object::Integer(self.char_width_units(c) as i64)
                    })
                    .collect();

                let font = Dictionary::from_iter(vec![
                    ("Type", Object::Name(b"Font".to_vec())),
                    ("Subtype", Object::Name(b"TrueType".to_vec())),
                    ("BaseFont", ps_name),
                    ("FirstChar", Object::Integer(32)),
                    ("LastChar", Object::Integer(255)),
                    ("Widths", Object::Array(widths)),
                    ("Encoding", Object::Name(b"WinAnsiEncoding".to_vec())),
                ]);

                Ok(FontObjects::Embedded {
                    font,
                    descriptor,
                    font_file,
                })
            }
        }
    }
}
