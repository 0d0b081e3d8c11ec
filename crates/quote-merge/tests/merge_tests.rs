//! End-to-end merge tests
//!
//! Exercises the full pipeline against small hand-built templates: page
//! count preservation, byte-identity of untouched pages, token search and
//! replacement, the degraded fallback path, and the overlay's edge cases.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Object, Stream};
use pdf_core::{extract_text_runs, PdfDocument};
use quote_merge::{
    find_tokens, replace_tokens, Calculation, Configuration, DocumentMeta, DocumentStore,
    LocatorConfig, MemoryStore, MergeEngine, MergeError, MergeFonts, PlaceholderMap, Quote,
    SanitizeReport, TemplateKind,
};

/// Build a template PDF; each entry is one page's worth of text lines
/// (text, x, y-baseline in PDF space).
fn build_template(pages: &[Vec<(&str, f32, f32)>]) -> Vec<u8> {
    let mut doc = lopdf::Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let mut page_ids = Vec::new();
    for lines in pages {
        let mut operations = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 18.into()]),
        ];
        let mut cx = 0.0f32;
        let mut cy = 0.0f32;
        for (text, x, y) in lines {
            operations.push(Operation::new(
                "Td",
                vec![Object::Real(x - cx), Object::Real(y - cy)],
            ));
            cx = *x;
            cy = *y;
            operations.push(Operation::new("Tj", vec![Object::string_literal(*text)]));
        }
        operations.push(Operation::new("ET", vec![]));

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
        page_ids.push(page_id);
    }

    let pages_dict = dictionary! {
        "Type" => "Pages",
        "Kids" => page_ids.iter().map(|&id| id.into()).collect::<Vec<Object>>(),
        "Count" => pages.len() as i32,
    };
    doc.objects.insert(pages_id, pages_dict.into());

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("save test template");
    bytes
}

fn acme_quote() -> Quote {
    Quote {
        client_name: "Acme Corp".to_string(),
        client_email: "ops@acme.example".to_string(),
        company: "Acme Corp".to_string(),
        configuration: Configuration {
            migration_type: "Email".to_string(),
            number_of_users: 120,
            data_size_gb: 500.0,
            instance_count: 2,
            instance_type: "Standard".to_string(),
            duration_months: 3,
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

fn engine() -> MergeEngine {
    MergeEngine::new(MergeFonts::builtin())
}

fn page_texts(doc: &PdfDocument, page: usize) -> Vec<String> {
    extract_text_runs(doc, page)
        .expect("extract runs")
        .into_iter()
        .map(|r| r.text)
        .collect()
}

// ── Scenario A: single-page generic template ────────────────────────────

#[test]
fn scenario_a_generic_single_page() {
    let template = build_template(&[vec![("Original template text", 72.0, 720.0)]]);
    let quote = acme_quote();

    let output = engine()
        .merge(&template, &quote, "Q-2041", TemplateKind::Generic)
        .expect("merge failed");

    assert_eq!(output.page_count, 1);
    assert!(!output.fallback_used);

    let doc = PdfDocument::from_bytes(&output.bytes).expect("reload output");
    assert_eq!(doc.page_count(), 1);

    let texts = page_texts(&doc, 0);
    assert!(
        texts.iter().any(|t| t.contains("Acme Corp")),
        "client/company name must be rendered: {texts:?}"
    );
    assert!(
        texts.iter().any(|t| t.contains("$1,200")),
        "currency-formatted total with no decimals must be rendered: {texts:?}"
    );
    assert!(
        !texts.iter().any(|t| t.contains("$1,200.")),
        "no decimal places on currency"
    );
    // The template's own content survives under the overlay.
    assert!(texts.iter().any(|t| t == "Original template text"));
}

// ── Page-count preservation for both strategies ─────────────────────────

#[test]
fn page_count_is_preserved_generic() {
    let pages: Vec<Vec<(&str, f32, f32)>> = (0..3)
        .map(|_| vec![("body text", 72.0, 700.0)])
        .collect();
    let template = build_template(&pages);

    let output = engine()
        .merge(&template, &acme_quote(), "Q-7", TemplateKind::Generic)
        .expect("merge failed");
    assert_eq!(output.page_count, 3);

    let doc = PdfDocument::from_bytes(&output.bytes).expect("reload output");
    assert_eq!(doc.page_count(), 3);
}

#[test]
fn generic_overlay_touches_only_page_zero() {
    let pages: Vec<Vec<(&str, f32, f32)>> = (0..4)
        .map(|_| vec![("page body", 72.0, 700.0)])
        .collect();
    let template = build_template(&pages);
    let source = PdfDocument::from_bytes(&template).expect("open template");

    let output = engine()
        .merge(&template, &acme_quote(), "Q-7", TemplateKind::Generic)
        .expect("merge failed");
    let merged = PdfDocument::from_bytes(&output.bytes).expect("reload output");

    for i in 1..4 {
        assert_eq!(
            source.page_content(i).expect("source content"),
            merged.page_content(i).expect("merged content"),
            "page {i} must be byte-identical to the template"
        );
    }
    assert_ne!(
        source.page_content(0).expect("source content"),
        merged.page_content(0).expect("merged content"),
        "page 0 carries the overlay"
    );
}

// ── Scenario B: 11-page agreement template, target page 0 ───────────────

#[test]
fn scenario_b_page_replace_eleven_pages() {
    let mut pages: Vec<Vec<(&str, f32, f32)>> =
        vec![vec![("Statement of Work comp", 72.0, 690.0)]];
    for _ in 1..11 {
        pages.push(vec![("terms and conditions", 72.0, 700.0)]);
    }
    let template = build_template(&pages);
    let source = PdfDocument::from_bytes(&template).expect("open template");

    let output = engine()
        .merge(&template, &acme_quote(), "Q-2041", TemplateKind::Agreement)
        .expect("merge failed");

    assert_eq!(output.page_count, 11);
    assert!(!output.fallback_used, "token `comp` is present and must be found");

    let merged = PdfDocument::from_bytes(&output.bytes).expect("reload output");
    assert_eq!(merged.page_count(), 11);

    for i in 1..11 {
        assert_eq!(
            source.page_content(i).expect("source content"),
            merged.page_content(i).expect("merged content"),
            "page {i} must be byte-identical to the template"
        );
    }

    let texts = page_texts(&merged, 0);
    assert!(
        texts.iter().any(|t| t.contains("Statement of Work for Acme Corp")),
        "substituted title must be present: {texts:?}"
    );
    assert!(
        texts.iter().any(|t| t.contains("$1,200")),
        "pricing table total must be present: {texts:?}"
    );
}

// ── Scenario C: exact token search and footprint-limited replacement ────

#[test]
fn scenario_c_token_replacement_is_surgical() {
    let template = build_template(&[vec![
        ("Agreement title", 72.0, 720.0),
        ("{{Company Name}}", 72.0, 640.0),
        ("Payment terms: net 30", 72.0, 560.0),
    ]]);
    let source = PdfDocument::from_bytes(&template).expect("open template");

    let specs = quote_merge::company_token_specs();
    let search = find_tokens(&source, &specs, &LocatorConfig::default()).expect("search failed");
    assert_eq!(search.matches().len(), 1, "exactly one match expected");

    let mut out = PdfDocument::new_output();
    out.append_page_from(&source, 0).expect("copy page");
    out.add_font("body", pdf_core::FontData::builtin(pdf_core::BuiltinFont::Helvetica))
        .expect("add font");
    out.add_font(
        "body-bold",
        pdf_core::FontData::builtin(pdf_core::BuiltinFont::HelveticaBold),
    )
    .expect("add font");

    let placeholders = PlaceholderMap::from_quote(&acme_quote(), "Q-2041");
    let mut report = SanitizeReport::default();
    let replaced = replace_tokens(&mut out, search.matches(), &placeholders, &mut report)
        .expect("replace failed");
    assert_eq!(replaced, 1);

    let saved = out.to_bytes().expect("save output");
    let merged = PdfDocument::from_bytes(&saved).expect("reload output");
    let runs = extract_text_runs(&merged, 0).expect("extract runs");

    let texts: Vec<&str> = runs.iter().map(|r| r.text.as_str()).collect();
    assert!(texts.contains(&"For Acme Corp"), "replacement text must appear");

    // Masked-diff: every run outside the token's footprint is unchanged.
    let original_runs = extract_text_runs(&source, 0).expect("extract source runs");
    for original in original_runs
        .iter()
        .filter(|r| r.text != "{{Company Name}}")
    {
        assert!(
            runs.iter().any(|r| r.text == original.text
                && (r.x - original.x).abs() < 0.01
                && (r.y - original.y).abs() < 0.01),
            "run {:?} outside the mask must survive unchanged",
            original.text
        );
    }

    // The replacement sits at the original token's baseline origin.
    let replacement = runs.iter().find(|r| r.text == "For Acme Corp").unwrap();
    assert!((replacement.x - 72.0).abs() < 0.01);
    assert!((replacement.y - 640.0).abs() < 0.01);
}

// ── Scenario D: zero users must not divide ──────────────────────────────

#[test]
fn scenario_d_zero_users_renders_na() {
    let template = build_template(&[vec![("quote sheet", 72.0, 720.0)]]);
    let mut quote = acme_quote();
    quote.configuration.number_of_users = 0;

    let output = engine()
        .merge(&template, &quote, "Q-9", TemplateKind::Generic)
        .expect("merge must not fail on zero users");

    let doc = PdfDocument::from_bytes(&output.bytes).expect("reload output");
    let texts = page_texts(&doc, 0);
    assert!(
        texts.iter().any(|t| t.contains("N/A")),
        "per-user cost must render N/A: {texts:?}"
    );
}

// ── Scenario E: missing token triggers the documented fallback ──────────

#[test]
fn scenario_e_missing_token_degrades_gracefully() {
    let pages: Vec<Vec<(&str, f32, f32)>> = vec![
        vec![("An agreement without any marker", 72.0, 690.0)],
        vec![("second page", 72.0, 700.0)],
    ];
    let template = build_template(&pages);
    let source = PdfDocument::from_bytes(&template).expect("open template");

    let search = find_tokens(
        &source,
        &quote_merge::company_token_specs(),
        &LocatorConfig::default(),
    )
    .expect("search failed");
    assert!(search.matches().is_empty(), "no token should be found");

    let output = engine()
        .merge(&template, &acme_quote(), "Q-5", TemplateKind::Agreement)
        .expect("degraded merge must still succeed");

    assert!(output.fallback_used, "result must be flagged as degraded");
    assert_eq!(output.page_count, 2);

    let merged = PdfDocument::from_bytes(&output.bytes).expect("reload output");
    assert_eq!(merged.page_count(), 2);

    let texts = page_texts(&merged, 0);
    assert!(
        texts.iter().any(|t| t.contains("For Acme Corp")),
        "fallback substitution must be drawn: {texts:?}"
    );
    assert_eq!(
        source.page_content(1).expect("source content"),
        merged.page_content(1).expect("merged content"),
        "untouched page must stay byte-identical in degraded mode too"
    );
}

// ── Misc pipeline properties ────────────────────────────────────────────

#[test]
fn quote_number_is_stamped() {
    let template = build_template(&[vec![("sheet", 72.0, 720.0)]]);
    let output = engine()
        .merge(&template, &acme_quote(), "Q-2041", TemplateKind::Generic)
        .expect("merge failed");

    let doc = PdfDocument::from_bytes(&output.bytes).expect("reload output");
    let texts = page_texts(&doc, 0);
    assert!(texts.iter().any(|t| t.contains("Q-2041")));
}

#[test]
fn duration_is_rendered_in_words() {
    let template = build_template(&[vec![("sheet", 72.0, 720.0)]]);
    let mut quote = acme_quote();
    quote.configuration.duration_months = 12;

    let output = engine()
        .merge(&template, &quote, "Q-3", TemplateKind::Generic)
        .expect("merge failed");

    let doc = PdfDocument::from_bytes(&output.bytes).expect("reload output");
    let texts = page_texts(&doc, 0);
    assert!(
        texts.iter().any(|t| t.contains("12 months (Twelve)")),
        "duration must appear numerically and in words: {texts:?}"
    );
}

#[test]
fn unsupported_characters_are_counted_not_fatal() {
    let template = build_template(&[vec![("sheet", 72.0, 720.0)]]);
    let mut quote = acme_quote();
    quote.company = "Acme \u{1F680} Corp".to_string();

    let output = engine()
        .merge(&template, &quote, "Q-4", TemplateKind::Generic)
        .expect("merge must tolerate unsupported characters");
    assert!(output.chars_dropped > 0);

    let doc = PdfDocument::from_bytes(&output.bytes).expect("reload output");
    let texts = page_texts(&doc, 0);
    assert!(texts.iter().any(|t| t.contains("Acme") && t.contains("Corp")));
}

#[test]
fn merged_bytes_flow_through_the_store_contract() {
    let template = build_template(&[vec![("sheet", 72.0, 720.0)]]);
    let output = engine()
        .merge(&template, &acme_quote(), "Q-6", TemplateKind::Generic)
        .expect("merge failed");

    let mut store = MemoryStore::new();
    let meta = DocumentMeta {
        file_name: "acme-agreement.pdf".to_string(),
        content_type: "application/pdf".to_string(),
        quote_number: Some("Q-6".to_string()),
    };
    let id = store.save(&output.bytes, &meta).expect("save failed");

    let fetched = store.fetch(&id).expect("fetch failed");
    assert_eq!(fetched, output.bytes);
    assert!(PdfDocument::from_bytes(&fetched).is_ok());

    store.delete(&id).expect("delete failed");
    assert!(store.is_empty());
}

#[test]
fn deal_reference_is_rendered_when_present() {
    let template = build_template(&[vec![("sheet", 72.0, 720.0)]]);
    let mut quote = acme_quote();
    quote.deal = Some(quote_merge::Deal {
        id: "D-88".to_string(),
        name: "Acme renewal".to_string(),
        amount: 1200.0,
        stage: "Proposal".to_string(),
    });

    let output = engine()
        .merge(&template, &quote, "Q-10", TemplateKind::Generic)
        .expect("merge failed");

    let doc = PdfDocument::from_bytes(&output.bytes).expect("reload output");
    let texts = page_texts(&doc, 0);
    assert!(
        texts.iter().any(|t| t.contains("Acme renewal") && t.contains("Proposal")),
        "deal reference must be rendered: {texts:?}"
    );
}

#[test]
fn signature_blocks_are_rendered() {
    let template = build_template(&[vec![("sheet", 72.0, 720.0)]]);
    let mut quote = acme_quote();
    quote.signatures = vec![
        quote_merge::SignatureBlock {
            signer_name: "Jo Day".to_string(),
            title: "CTO".to_string(),
            date: "2026-03-04".to_string(),
            style: "typed".to_string(),
            signature_text: "Jo Day".to_string(),
        },
        quote_merge::SignatureBlock {
            signer_name: "Sam Lee".to_string(),
            title: "Account Executive".to_string(),
            date: "2026-03-05".to_string(),
            style: "typed".to_string(),
            signature_text: "Sam Lee".to_string(),
        },
    ];

    let output = engine()
        .merge(&template, &quote, "Q-11", TemplateKind::Generic)
        .expect("merge failed");

    let doc = PdfDocument::from_bytes(&output.bytes).expect("reload output");
    let texts = page_texts(&doc, 0);
    assert!(texts.iter().any(|t| t.contains("Jo Day")));
    assert!(texts.iter().any(|t| t.contains("Sam Lee")));
    assert!(texts.iter().any(|t| t.contains("March 4, 2026")));
}

#[test]
fn empty_template_bytes_are_rejected() {
    let result = engine().merge(&[], &acme_quote(), "Q-8", TemplateKind::Generic);
    assert!(matches!(result, Err(MergeError::InvalidFormat)));
}
