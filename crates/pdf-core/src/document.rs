//! PDF Document wrapper

use crate::font::{encode_win_ansi, FontData, FontObjects};
use crate::graphics::{generate_image_operators, generate_rect_operators, generate_rule_operators};
use crate::image::ImageXObject;
use crate::text::{encode_hex, generate_text_operators, TextRenderContext};
use crate::{Align, PdfError, Result, PDF_MAGIC};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

/// RGB Color (values 0.0 - 1.0)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    /// Create a new RGB color (values 0.0 - 1.0)
    pub fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Create color from RGB values (0-255)
    pub fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
        }
    }

    pub fn black() -> Self {
        Self::rgb(0.0, 0.0, 0.0)
    }

    pub fn white() -> Self {
        Self::rgb(1.0, 1.0, 1.0)
    }

    pub fn red() -> Self {
        Self::rgb(1.0, 0.0, 0.0)
    }

    pub fn gray() -> Self {
        Self::rgb(0.5, 0.5, 0.5)
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::black()
    }
}

/// PDF Document wrapper providing high-level operations
///
/// Pages are addressed by 0-based index throughout.
pub struct PdfDocument {
    /// The underlying lopdf document
    inner: Document,
    /// Registered fonts
    fonts: HashMap<String, FontData>,
    /// Current font name
    current_font: Option<String>,
    /// Current font size
    current_font_size: f32,
    /// Current text color
    current_text_color: Color,
    /// Embedded fonts (font name -> PDF object ID)
    embedded_fonts: HashMap<String, ObjectId>,
    /// Page font resources (page index -> font name -> resource name)
    page_font_resources: HashMap<usize, HashMap<String, String>>,
    /// Next font resource number
    next_font_resource: u32,
    /// Embedded images (data hash -> PDF object ID)
    embedded_images: HashMap<u64, ObjectId>,
    /// Page image resources (page index -> resource name -> object ID)
    page_image_resources: HashMap<usize, HashMap<String, ObjectId>>,
    /// Next image resource number
    next_image_resource: u32,
    /// Buffered content operators per page (flushed once at save)
    page_content_buffer: HashMap<usize, Vec<u8>>,
}

impl PdfDocument {
    fn wrap(inner: Document) -> Self {
        Self {
            inner,
            fonts: HashMap::new(),
            current_font: None,
            current_font_size: 12.0,
            current_text_color: Color::default(),
            embedded_fonts: HashMap::new(),
            page_font_resources: HashMap::new(),
            next_font_resource: 1,
            embedded_images: HashMap::new(),
            page_image_resources: HashMap::new(),
            next_image_resource: 1,
            page_content_buffer: HashMap::new(),
        }
    }

    /// Open a PDF document from bytes.
    ///
    /// Fails with [`PdfError::InvalidMagic`] when the buffer does not start
    /// with the `%PDF-` marker, and with [`PdfError::Corrupt`] when lopdf
    /// cannot parse the structure past the header. The input bytes are
    /// never mutated.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if !data.starts_with(PDF_MAGIC) {
            return Err(PdfError::InvalidMagic);
        }

        let inner = Document::load_mem(data).map_err(|e| PdfError::Corrupt(e.to_string()))?;
        Ok(Self::wrap(inner))
    }

    /// Create a fresh output document with an empty page tree.
    ///
    /// Pages are added with [`PdfDocument::append_page_from`].
    pub fn new_output() -> Self {
        let mut inner = Document::with_version("1.5");

        let pages_id = inner.add_object(Object::Dictionary(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(vec![])),
            ("Count", Object::Integer(0)),
        ])));

        let catalog_id = inner.add_object(Object::Dictionary(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(pages_id)),
        ])));

        inner.trailer.set("Root", Object::Reference(catalog_id));

        Self::wrap(inner)
    }

    /// Get the number of pages in the document
    pub fn page_count(&self) -> usize {
        self.inner.get_pages().len()
    }

    /// Get the object ID for a 0-based page index
    fn page_id(&self, index: usize) -> Result<ObjectId> {
        let pages = self.inner.get_pages();
        pages
            .get(&((index + 1) as u32))
            .copied()
            .ok_or(PdfError::InvalidPage(index, pages.len()))
    }

    /// Page width and height in points for a 0-based page index.
    ///
    /// Follows MediaBox inheritance up the page tree; falls back to US
    /// Letter when the tree carries no box at all.
    pub fn page_size(&self, index: usize) -> Result<(f32, f32)> {
        let page_id = self.page_id(index)?;
        let media_box = self.inherited_media_box(page_id)?;
        Self::box_dimensions(&media_box)
    }

    /// Find MediaBox (or CropBox), following the Parent chain if needed
    fn inherited_media_box(&self, page_id: ObjectId) -> Result<Vec<Object>> {
        let mut current_id = page_id;

        // Parent chains are short; ten levels is a safety stop for
        // malformed trees.
        for _ in 0..10 {
            let obj = self.inner.get_object(current_id)?;
            let dict = obj
                .as_dict()
                .map_err(|_| PdfError::ParseError("page node is not a dictionary".to_string()))?;

            if let Ok(media_box) = dict.get(b"MediaBox").or_else(|_| dict.get(b"CropBox")) {
                let media_box_array = match media_box {
                    Object::Array(arr) => arr.clone(),
                    Object::Reference(ref_id) => {
                        let referred = self.inner.get_object(*ref_id)?;
                        referred
                            .as_array()
                            .map_err(|_| {
                                PdfError::ParseError("MediaBox reference is not an array".to_string())
                            })?
                            .clone()
                    }
                    _ => return Err(PdfError::ParseError("MediaBox is not an array".to_string())),
                };
                return Ok(media_box_array);
            }

            if let Ok(Object::Reference(parent_id)) = dict.get(b"Parent") {
                current_id = *parent_id;
                continue;
            }

            break;
        }

        // US Letter fallback
        Ok(vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Real(612.0),
            Object::Real(792.0),
        ])
    }

    fn box_dimensions(media_box: &[Object]) -> Result<(f32, f32)> {
        if media_box.len() < 4 {
            return Err(PdfError::ParseError("invalid MediaBox format".to_string()));
        }
        let coord = |obj: &Object| -> Result<f32> {
            obj.as_f32()
                .ok()
                .or_else(|| obj.as_i64().ok().map(|v| v as f32))
                .ok_or_else(|| PdfError::ParseError("invalid MediaBox coordinate".to_string()))
        };
        let x1 = coord(&media_box[0])?;
        let y1 = coord(&media_box[1])?;
        let x2 = coord(&media_box[2])?;
        let y2 = coord(&media_box[3])?;
        Ok((x2 - x1, y2 - y1))
    }

    /// Page height in points for a 0-based page index
    fn page_height(&self, index: usize) -> Result<f32> {
        self.page_size(index).map(|(_, h)| h)
    }

    /// Object ID of the root Pages node
    fn pages_root_id(&self) -> Result<ObjectId> {
        let root = self
            .inner
            .trailer
            .get(b"Root")
            .map_err(|_| PdfError::ParseError("document trailer missing Root entry".to_string()))?;
        let catalog_id = root
            .as_reference()
            .map_err(|_| PdfError::ParseError("Root is not a reference".to_string()))?;
        let catalog = self.inner.get_object(catalog_id)?;
        let catalog_dict = catalog
            .as_dict()
            .map_err(|_| PdfError::ParseError("catalog is not a dictionary".to_string()))?;
        let pages = catalog_dict
            .get(b"Pages")
            .map_err(|_| PdfError::ParseError("catalog missing Pages entry".to_string()))?;
        pages
            .as_reference()
            .map_err(|_| PdfError::ParseError("Pages is not a reference".to_string()))
    }

    /// Deep-copy one page from `source` and append it to this document.
    ///
    /// The copy is lossless: content streams are cloned byte-for-byte
    /// (compressed form preserved), the Resources object graph is copied
    /// recursively, and inheritable attributes (MediaBox, CropBox, Rotate,
    /// Resources) are resolved from the source page tree and written onto
    /// the copied page explicitly. Nothing is re-rendered or flattened, so
    /// the original text-positioning data survives the copy.
    pub fn append_page_from(&mut self, source: &PdfDocument, index: usize) -> Result<()> {
        let src_page_id = source.page_id(index)?;
        let src_page_obj = source.inner.get_object(src_page_id)?;
        let src_page_dict = src_page_obj
            .as_dict()
            .map_err(|_| PdfError::ParseError("page object is not a dictionary".to_string()))?;

        let pages_root = self.pages_root_id()?;
        let new_page_id = self.inner.new_object_id();

        // Seed the memo so back-references to the page (e.g. an
        // annotation's /P entry) resolve to the copy, not the source.
        let mut memo: HashMap<ObjectId, ObjectId> = HashMap::new();
        memo.insert(src_page_id, new_page_id);

        let mut new_page_dict = Dictionary::new();
        for (key, value) in src_page_dict.iter() {
            if key == b"Parent" {
                continue;
            }
            let copied = self.deep_copy_object(&source.inner, value, &mut memo)?;
            new_page_dict.set(key.to_vec(), copied);
        }

        // Make inherited attributes explicit on the copy; the source's
        // ancestors do not travel with it.
        if !new_page_dict.has(b"MediaBox") {
            let media_box = source.inherited_media_box(src_page_id)?;
            let copied: Result<Vec<Object>> = media_box
                .iter()
                .map(|obj| self.deep_copy_object(&source.inner, obj, &mut memo))
                .collect();
            new_page_dict.set("MediaBox", Object::Array(copied?));
        }
        if !new_page_dict.has(b"Resources") {
            if let Some(resources) = source.inherited_entry(src_page_id, b"Resources")? {
                let copied = self.deep_copy_object(&source.inner, &resources, &mut memo)?;
                new_page_dict.set("Resources", copied);
            } else {
                new_page_dict.set("Resources", Object::Dictionary(Dictionary::new()));
            }
        }
        if !new_page_dict.has(b"Rotate") {
            if let Some(rotate) = source.inherited_entry(src_page_id, b"Rotate")? {
                let copied = self.deep_copy_object(&source.inner, &rotate, &mut memo)?;
                new_page_dict.set("Rotate", copied);
            }
        }

        new_page_dict.set("Parent", Object::Reference(pages_root));
        self.inner
            .objects
            .insert(new_page_id, Object::Dictionary(new_page_dict));

        log::debug!(
            "copied page {index} ({} objects carried over)",
            memo.len()
        );

        self.register_page(pages_root, new_page_id)
    }

    /// Look up an inheritable page attribute along the Parent chain
    fn inherited_entry(&self, page_id: ObjectId, key: &[u8]) -> Result<Option<Object>> {
        let mut current_id = page_id;
        for _ in 0..10 {
            let obj = self.inner.get_object(current_id)?;
            let dict = match obj.as_dict() {
                Ok(d) => d,
                Err(_) => return Ok(None),
            };
            if let Ok(value) = dict.get(key) {
                return Ok(Some(value.clone()));
            }
            match dict.get(b"Parent") {
                Ok(Object::Reference(parent_id)) => current_id = *parent_id,
                _ => break,
            }
        }
        Ok(None)
    }

    /// Recursively copy an object graph from another document into this one.
    ///
    /// References are rewritten through a memo map, so shared objects are
    /// copied once and reference cycles terminate. `Parent` entries are
    /// dropped wherever they appear: they only ever point back up the
    /// source page tree, which must not be pulled into the copy.
    fn deep_copy_object(
        &mut self,
        src: &Document,
        obj: &Object,
        memo: &mut HashMap<ObjectId, ObjectId>,
    ) -> Result<Object> {
        match obj {
            Object::Reference(id) => {
                if let Some(new_id) = memo.get(id) {
                    return Ok(Object::Reference(*new_id));
                }
                let resolved = match src.get_object(*id) {
                    Ok(o) => o.clone(),
                    // Dangling reference in the source; preserve as null.
                    Err(_) => Object::Null,
                };
                let new_id = self.inner.new_object_id();
                memo.insert(*id, new_id);
                let copied = self.deep_copy_object(src, &resolved, memo)?;
                self.inner.objects.insert(new_id, copied);
                Ok(Object::Reference(new_id))
            }
            Object::Dictionary(dict) => {
                let mut new_dict = Dictionary::new();
                for (key, value) in dict.iter() {
                    if key == b"Parent" {
                        continue;
                    }
                    new_dict.set(key.to_vec(), self.deep_copy_object(src, value, memo)?);
                }
                Ok(Object::Dictionary(new_dict))
            }
            Object::Stream(stream) => {
                let mut new_dict = Dictionary::new();
                for (key, value) in stream.dict.iter() {
                    new_dict.set(key.to_vec(), self.deep_copy_object(src, value, memo)?);
                }
                // Raw bytes cloned verbatim; compressed form is preserved.
                let mut new_stream = Stream::new(new_dict, stream.content.clone());
                new_stream.allows_compression = stream.allows_compression;
                Ok(Object::Stream(new_stream))
            }
            Object::Array(arr) => {
                let copied: Result<Vec<Object>> = arr
                    .iter()
                    .map(|item| self.deep_copy_object(src, item, memo))
                    .collect();
                Ok(Object::Array(copied?))
            }
            other => Ok(other.clone()),
        }
    }

    /// Append a page object to the root Pages node (Kids + Count)
    fn register_page(&mut self, pages_root: ObjectId, page_id: ObjectId) -> Result<()> {
        let pages_obj = self.inner.get_object(pages_root)?;
        let pages_dict = pages_obj
            .as_dict()
            .map_err(|_| PdfError::ParseError("Pages object is not a dictionary".to_string()))?;

        let mut kids = pages_dict
            .get(b"Kids")
            .and_then(|k| k.as_array().map(|a| a.clone()))
            .map_err(|_| PdfError::ParseError("Pages object missing Kids array".to_string()))?;
        kids.push(Object::Reference(page_id));

        let count = pages_dict
            .get(b"Count")
            .and_then(|c| c.as_i64())
            .map_err(|_| PdfError::ParseError("Pages object missing Count".to_string()))?;

        let mut new_pages_dict = pages_dict.clone();
        new_pages_dict.set("Kids", Object::Array(kids));
        new_pages_dict.set("Count", Object::Integer(count + 1));
        self.inner.objects.insert(pages_root, new_pages_dict.into());

        Ok(())
    }

    /// Register a font under a name
    pub fn add_font(&mut self, name: &str, font: FontData) -> Result<()> {
        if self.fonts.contains_key(name) {
            return Err(PdfError::FontAlreadyExists(name.to_string()));
        }
        self.fonts.insert(name.to_string(), font);
        Ok(())
    }

    /// Set the current font and size
    pub fn set_font(&mut self, name: &str, size: f32) -> Result<()> {
        if !self.fonts.contains_key(name) {
            return Err(PdfError::FontNotFound(name.to_string()));
        }
        self.current_font = Some(name.to_string());
        self.current_font_size = size;
        Ok(())
    }

    /// Set only the font size (keeps the current font)
    pub fn set_font_size(&mut self, size: f32) -> Result<()> {
        if self.current_font.is_none() {
            return Err(PdfError::FontNotFound("no font set".to_string()));
        }
        self.current_font_size = size;
        Ok(())
    }

    /// Set the text color
    pub fn set_text_color(&mut self, color: Color) {
        self.current_text_color = color;
    }

    /// Look up a registered font by name
    pub fn font(&self, name: &str) -> Result<&FontData> {
        self.fonts
            .get(name)
            .ok_or_else(|| PdfError::FontNotFound(name.to_string()))
    }

    fn current_font_data(&self) -> Result<&FontData> {
        let name = self
            .current_font
            .as_ref()
            .ok_or_else(|| PdfError::FontNotFound("no font set".to_string()))?;
        self.font(name)
    }

    /// Width of `text` in points under the current font and size
    pub fn text_width(&self, text: &str) -> Result<f32> {
        let font = self.current_font_data()?;
        Ok(font.text_width(text, self.current_font_size))
    }

    /// Insert text at a specific position
    ///
    /// # Arguments
    /// * `text` - Text to insert (WinAnsi repertoire; sanitize upstream)
    /// * `page` - Page index (0-based)
    /// * `x` - X coordinate in points
    /// * `y` - Y coordinate in points (from top)
    /// * `align` - Text alignment
    pub fn insert_text(&mut self, text: &str, page: usize, x: f32, y: f32, align: Align) -> Result<()> {
        let page_count = self.page_count();
        if page >= page_count {
            return Err(PdfError::InvalidPage(page, page_count));
        }

        if text.is_empty() {
            return Ok(());
        }

        let font_name = self
            .current_font
            .as_ref()
            .ok_or_else(|| PdfError::FontNotFound("no font set".to_string()))?
            .clone();
        let text_width = self.text_width(text)?;

        let page_height = self.page_height(page)?;
        let pdf_y = page_height - y;

        let font_resource_name = self.get_or_create_font_ref(&font_name, page);

        let ctx = TextRenderContext {
            font_name: font_resource_name,
            font_size: self.current_font_size,
            text_width,
            color: self.current_text_color,
        };
        let text_hex = encode_hex(&encode_win_ansi(text));
        let operators = generate_text_operators(&text_hex, x, pdf_y, align, &ctx);

        self.buffer_content(page, &operators);
        Ok(())
    }

    /// Fill a rectangle
    ///
    /// # Arguments
    /// * `page` - Page index (0-based)
    /// * `x` - Left edge in points
    /// * `y` - Top edge in points (from top)
    /// * `width`/`height` - Extent in points
    /// * `color` - Fill color
    pub fn fill_rect(
        &mut self,
        page: usize,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        color: Color,
    ) -> Result<()> {
        let page_count = self.page_count();
        if page >= page_count {
            return Err(PdfError::InvalidPage(page, page_count));
        }

        let page_height = self.page_height(page)?;
        let pdf_y = page_height - y - height;
        let operators = generate_rect_operators(x, pdf_y, width, height, color);
        self.buffer_content(page, &operators);
        Ok(())
    }

    /// Stroke a straight rule between two points (y measured from top)
    pub fn stroke_rule(
        &mut self,
        page: usize,
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        line_width: f32,
        color: Color,
    ) -> Result<()> {
        let page_count = self.page_count();
        if page >= page_count {
            return Err(PdfError::InvalidPage(page, page_count));
        }

        let page_height = self.page_height(page)?;
        let operators = generate_rule_operators(
            x1,
            page_height - y1,
            x2,
            page_height - y2,
            line_width,
            color,
        );
        self.buffer_content(page, &operators);
        Ok(())
    }

    /// Insert an image at a specific position
    ///
    /// # Arguments
    /// * `data` - Image file bytes (JPEG or PNG)
    /// * `page` - Page index (0-based)
    /// * `x` - X coordinate in points
    /// * `y` - Y coordinate in points (from top)
    /// * `width`/`height` - Display size in points
    pub fn insert_image(
        &mut self,
        data: &[u8],
        page: usize,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    ) -> Result<()> {
        let page_count = self.page_count();
        if page >= page_count {
            return Err(PdfError::InvalidPage(page, page_count));
        }

        let resource_name = self.get_or_create_image_ref(data, page)?;

        let page_height = self.page_height(page)?;
        let pdf_y = page_height - y - height;

        let operators = generate_image_operators(&resource_name, x, pdf_y, width, height);
        self.buffer_content(page, &operators);
        Ok(())
    }

    /// Serialize the document to bytes
    ///
    /// Flushes buffered page content, embeds registered fonts and wires up
    /// page resources, then saves. Call once at the end of a build.
    pub fn to_bytes(&mut self) -> Result<Vec<u8>> {
        self.flush_content_buffers()?;
        self.embed_fonts()?;
        self.finalize_page_font_resources()?;

        let mut buffer = Vec::new();
        self.inner
            .save_to(&mut buffer)
            .map_err(|e| PdfError::SaveError(e.to_string()))?;
        Ok(buffer)
    }

    /// Decompressed, concatenated content stream bytes of a page
    pub fn page_content(&self, page: usize) -> Result<Vec<u8>> {
        let page_id = self.page_id(page)?;
        Ok(self.inner.get_page_content(page_id)?)
    }

    /// Map of font resource name -> BaseFont name for a page
    ///
    /// Used by text-run extraction to recover font weight hints from the
    /// page's own resources.
    pub fn page_font_base_names(&self, page: usize) -> Result<HashMap<String, String>> {
        let mut map = HashMap::new();
        let page_id = self.page_id(page)?;

        let resources = match self.inherited_entry(page_id, b"Resources")? {
            Some(r) => r,
            None => return Ok(map),
        };
        let resources_dict = match self.resolve_to_dict(&resources) {
            Some(d) => d,
            None => return Ok(map),
        };
        let font_dict_obj = match resources_dict.get(b"Font") {
            Ok(f) => f.clone(),
            Err(_) => return Ok(map),
        };
        let font_dict = match self.resolve_to_dict(&font_dict_obj) {
            Some(d) => d,
            None => return Ok(map),
        };

        for (name, value) in font_dict.iter() {
            let font_obj = match value {
                Object::Reference(id) => match self.inner.get_object(*id) {
                    Ok(o) => o.clone(),
                    Err(_) => continue,
                },
                other => other.clone(),
            };
            if let Ok(dict) = font_obj.as_dict() {
                if let Ok(base) = dict.get(b"BaseFont").and_then(|b| b.as_name_str()) {
                    map.insert(String::from_utf8_lossy(name).to_string(), base.to_string());
                }
            }
        }

        Ok(map)
    }

    fn resolve_to_dict(&self, obj: &Object) -> Option<Dictionary> {
        match obj {
            Object::Dictionary(d) => Some(d.clone()),
            Object::Reference(id) => match self.inner.get_object(*id) {
                Ok(Object::Dictionary(d)) => Some(d.clone()),
                _ => None,
            },
            _ => None,
        }
    }

    /// Get a reference to the underlying lopdf document
    pub fn inner(&self) -> &Document {
        &self.inner
    }

    /// Get a mutable reference to the underlying lopdf document
    pub fn inner_mut(&mut self) -> &mut Document {
        &mut self.inner
    }

    /// Get or create a font resource name (e.g., "F1") for a page
    fn get_or_create_font_ref(&mut self, font_name: &str, page: usize) -> String {
        let page_resources = self.page_font_resources.entry(page).or_default();
        if let Some(resource_name) = page_resources.get(font_name) {
            return resource_name.clone();
        }

        let resource_name = format!("F{}", self.next_font_resource);
        self.next_font_resource += 1;
        page_resources.insert(font_name.to_string(), resource_name.clone());
        resource_name
    }

    /// Embed all fonts that have been referenced by buffered text
    fn embed_fonts(&mut self) -> Result<()> {
        let mut font_names: Vec<String> = self
            .page_font_resources
            .values()
            .flat_map(|fonts| fonts.keys().cloned())
            .collect();
        font_names.sort();
        font_names.dedup();

        for font_name in font_names {
            if self.embedded_fonts.contains_key(&font_name) {
                continue;
            }
            let font = self.font(&font_name)?.clone();
            let font_id = match font.to_font_objects()? {
                FontObjects::Simple(dict) => self.inner.add_object(Object::Dictionary(dict)),
                FontObjects::Embedded {
                    font,
                    mut descriptor,
                    font_file,
                } => {
                    let font_file_id = self.inner.add_object(Object::Stream(font_file));
                    descriptor.set("FontFile2", Object::Reference(font_file_id));
                    let descriptor_id = self.inner.add_object(Object::Dictionary(descriptor));
                    let mut font_dict = font;
                    font_dict.set("FontDescriptor", Object::Reference(descriptor_id));
                    self.inner.add_object(Object::Dictionary(font_dict))
                }
            };
            self.embedded_fonts.insert(font_name, font_id);
        }

        Ok(())
    }

    /// Wire font references into each page's Resources dictionary
    fn finalize_page_font_resources(&mut self) -> Result<()> {
        let page_resources: Vec<(usize, Vec<(String, String)>)> = self
            .page_font_resources
            .iter()
            .map(|(&page, fonts)| {
                let font_list: Vec<_> = fonts
                    .iter()
                    .map(|(font_name, resource_name)| (font_name.clone(), resource_name.clone()))
                    .collect();
                (page, font_list)
            })
            .collect();

        for (page, fonts) in page_resources {
            if !fonts.is_empty() {
                self.add_fonts_to_page_resources(page, &fonts)?;
            }
        }

        Ok(())
    }

    /// Add font references to a page's Resources dictionary
    fn add_fonts_to_page_resources(&mut self, page: usize, fonts: &[(String, String)]) -> Result<()> {
        let page_id = self.page_id(page)?;

        let page_obj = self.inner.get_object(page_id)?;
        let page_dict = page_obj
            .as_dict()
            .map_err(|_| PdfError::SaveError("page object is not a dictionary".to_string()))?;

        // Resources may be inline or referenced; normalize to an inline
        // dictionary on the page so the update stays local to this page.
        let mut resources_dict = match page_dict.get(b"Resources") {
            Ok(resources) => self.resolve_to_dict(resources).unwrap_or_default(),
            Err(_) => Dictionary::new(),
        };

        let mut font_dict = match resources_dict.get(b"Font") {
            Ok(font) => self.resolve_to_dict(font).unwrap_or_default(),
            Err(_) => Dictionary::new(),
        };

        for (font_name, resource_name) in fonts {
            let font_ref = self
                .embedded_fonts
                .get(font_name)
                .ok_or_else(|| PdfError::FontNotFound(font_name.to_string()))?;
            font_dict.set(resource_name.as_bytes().to_vec(), Object::Reference(*font_ref));
        }

        resources_dict.set(b"Font", Object::Dictionary(font_dict));

        let mut new_page_dict = page_dict.clone();
        new_page_dict.set(b"Resources", Object::Dictionary(resources_dict));
        self.inner.objects.insert(page_id, new_page_dict.into());

        Ok(())
    }

    /// Get or create an image XObject resource for a page
    ///
    /// Images are deduplicated by a hash of their bytes.
    fn get_or_create_image_ref(&mut self, data: &[u8], page: usize) -> Result<String> {
        let mut hasher = DefaultHasher::new();
        data.hash(&mut hasher);
        let data_hash = hasher.finish();

        if !self.embedded_images.contains_key(&data_hash) {
            let xobject = ImageXObject::from_bytes(data)?;
            let stream = xobject.to_pdf_stream();
            let object_id = self.inner.add_object(stream);
            self.embedded_images.insert(data_hash, object_id);
        }

        let object_id = self.embedded_images[&data_hash];

        let page_resources = self.page_image_resources.entry(page).or_default();
        for (name, id) in page_resources.iter() {
            if *id == object_id {
                return Ok(name.clone());
            }
        }

        let resource_name = format!("Im{}", self.next_image_resource);
        self.next_image_resource += 1;
        page_resources.insert(resource_name.clone(), object_id);

        self.add_image_to_page_resources(page, &resource_name, object_id)?;

        Ok(resource_name)
    }

    /// Add an image reference to a page's Resources dictionary
    fn add_image_to_page_resources(
        &mut self,
        page: usize,
        resource_name: &str,
        object_id: ObjectId,
    ) -> Result<()> {
        let page_id = self.page_id(page)?;

        let page_obj = self.inner.get_object(page_id)?;
        let page_dict = page_obj
            .as_dict()
            .map_err(|_| PdfError::SaveError("page object is not a dictionary".to_string()))?;

        let mut resources_dict = match page_dict.get(b"Resources") {
            Ok(resources) => self.resolve_to_dict(resources).unwrap_or_default(),
            Err(_) => Dictionary::new(),
        };

        let mut xobject_dict = match resources_dict.get(b"XObject") {
            Ok(xobject) => self.resolve_to_dict(xobject).unwrap_or_default(),
            Err(_) => Dictionary::new(),
        };

        xobject_dict.set(resource_name.as_bytes().to_vec(), Object::Reference(object_id));
        resources_dict.set(b"XObject", Object::Dictionary(xobject_dict));

        let mut new_page_dict = page_dict.clone();
        new_page_dict.set(b"Resources", Object::Dictionary(resources_dict));
        self.inner.objects.insert(page_id, new_page_dict.into());

        Ok(())
    }

    /// Buffer content operators for a page (written once at save time)
    fn buffer_content(&mut self, page: usize, content: &[u8]) {
        self.page_content_buffer
            .entry(page)
            .or_default()
            .extend_from_slice(content);
    }

    /// Flush all buffered content to page streams
    fn flush_content_buffers(&mut self) -> Result<()> {
        let mut buffers: Vec<(usize, Vec<u8>)> = self.page_content_buffer.drain().collect();
        buffers.sort_by_key(|(page, _)| *page);

        for (page, content) in buffers {
            if !content.is_empty() {
                self.append_to_content_stream(page, &content)?;
            }
        }

        Ok(())
    }

    /// Append operators to a page's content stream
    ///
    /// The existing content is bracketed in q/Q before the appended
    /// operators, so an unbalanced graphics state left by the original
    /// stream cannot displace the overlay.
    fn append_to_content_stream(&mut self, page: usize, content: &[u8]) -> Result<()> {
        let page_id = self.page_id(page)?;

        let existing_content = self.inner.get_page_content(page_id)?;

        let mut new_content = Vec::with_capacity(existing_content.len() + content.len() + 8);
        new_content.extend_from_slice(b"q\n");
        new_content.extend_from_slice(&existing_content);
        new_content.extend_from_slice(b"\nQ\n");
        new_content.extend_from_slice(content);

        let new_stream = Stream::new(Dictionary::new(), new_content);
        let stream_id = self.inner.add_object(new_stream);

        let page_obj = self.inner.get_object(page_id)?;
        let page_dict = page_obj
            .as_dict()
            .map_err(|_| PdfError::ParseError("page object is not a dictionary".to_string()))?;
        let mut new_page_dict = page_dict.clone();
        new_page_dict.set(b"Contents", Object::Reference(stream_id));
        self.inner.objects.insert(page_id, new_page_dict.into());

        Ok(())
    }
}
