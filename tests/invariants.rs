//! Contract Invariant Tests
//!
//! These tests verify the non-negotiable guarantees.

use chrono::{Datelike, NaiveDate};
use proptest::prelude::*;

use hiyes_docgen::{
    decode, discover, discover_ordered, encode, is_valid,
    document::{Paragraph, RichTextDocument, Run, Section, Table, TableCell, TableRow},
    pipeline::{BatchRequest, GenerateRequest, GeneratedDocument, GenerationPipeline},
    substitute, substitute_text,
    templates::{DocumentBody, DocumentKind, Template, TemplateRegistry},
    variables::{CompanyRecord, ContactRecord, ProjectRecord},
    CodecError, CounterError, CounterSource, GeneratorConfig, InMemoryLedger, PipelineError,
    ValueMap,
};

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn values(pairs: &[(&str, &str)]) -> ValueMap {
    pairs.iter().copied().collect()
}

fn create_quotation_template() -> Template {
    Template {
        id: "quotation".to_string(),
        name: "Quotation".to_string(),
        description: "Standard quotation".to_string(),
        template_version: "1.0.0".to_string(),
        engine_min_version: "1.0.0".to_string(),
        deprecated: false,
        superseded_by: None,
        kind: DocumentKind::Quotation,
        body: DocumentBody::Rich(RichTextDocument {
            paragraphs: vec![
                Paragraph::new(vec![Run::new("Quotation for {{proj"), Run::new("ect_name}}")]),
                Paragraph::plain("Valid for {{validity_days}} days"),
                Paragraph::plain("Terms and conditions apply."),
            ],
            tables: vec![Table {
                rows: vec![TableRow {
                    cells: vec![
                        TableCell { paragraphs: vec![Paragraph::plain("Total")] },
                        TableCell { paragraphs: vec![Paragraph::plain("NT$ {{price}}")] },
                    ],
                }],
            }],
            sections: vec![Section {
                header: vec![Paragraph::plain("No. {{quotation_number}}")],
                footer: vec![Paragraph::plain("{{company_name}} / {{roc_date}}")],
            }],
        }),
    }
}

fn create_contract_template() -> Template {
    Template {
        id: "contract".to_string(),
        name: "Contract".to_string(),
        description: "Service contract".to_string(),
        template_version: "2.1.0".to_string(),
        engine_min_version: "1.0.0".to_string(),
        deprecated: false,
        superseded_by: None,
        kind: DocumentKind::Contract,
        body: DocumentBody::Text("Contract {{contract_number}} between {{company_name}} and {{contact_info}}".to_string()),
    }
}

fn create_future_template() -> Template {
    Template {
        id: "invoice-v9".to_string(),
        engine_min_version: "99.0.0".to_string(),
        kind: DocumentKind::Invoice,
        ..create_contract_template()
    }
}

fn create_pipeline() -> GenerationPipeline {
    let mut registry = TemplateRegistry::new();
    registry.register(create_quotation_template());
    registry.register(create_contract_template());
    registry.register(create_future_template());
    GenerationPipeline::new(registry, GeneratorConfig::default())
}

fn create_request(template_id: &str) -> GenerateRequest {
    GenerateRequest {
        template_id: template_id.to_string(),
        project: ProjectRecord {
            project_name: "Office Fit-out".to_string(),
            date: "2025-10-27".to_string(),
            price: 105_000.0,
        },
        company: CompanyRecord {
            company_name: "Acme Ltd".to_string(),
            address: "1 Main St".to_string(),
        },
        contact: ContactRecord {
            contact_name: "Lin".to_string(),
            phone: "0912-345-678".to_string(),
            email: String::new(),
        },
        extra: ValueMap::new(),
    }
}

// --- Document number codec ---

#[test]
fn invariant_fixed_vectors() {
    assert_eq!(encode(ymd(2025, 1, 1), 1).unwrap(), "HIYES25AAA001");
    assert_eq!(encode(ymd(2025, 10, 27), 1).unwrap(), "HIYES25JBA001");
    assert_eq!(encode(ymd(2025, 12, 31), 10).unwrap(), "HIYES25LBE010");
    assert_eq!(encode(ymd(2024, 2, 29), 5).unwrap(), "HIYES24BBC005");
}

#[test]
fn invariant_structural_validation() {
    assert!(is_valid("HIYES25JBA001"));
    assert!(is_valid("HIYES24AAB100"));
    assert!(is_valid("HIYES25LAF999"));
    assert!(!is_valid("HIYES25MBA001"));
    assert!(!is_valid("HIYES25J1A001"));
    assert!(!is_valid("HIYES25JAAA01"));
    assert!(!is_valid("INVALID"));
    assert!(!is_valid("hiyes25jba001"));
    assert!(!is_valid(" HIYES25JBA001"));
}

#[test]
fn invariant_counter_range_enforced() {
    let date = ymd(2025, 6, 15);
    assert_eq!(encode(date, 0), Err(CodecError::InvalidCounter(0)));
    assert_eq!(encode(date, 1000), Err(CodecError::InvalidCounter(1000)));
    assert!(encode(date, 1).is_ok());
    assert_eq!(encode(date, 999).unwrap(), "HIYES25FAO999");
}

#[test]
fn invariant_decode_is_total() {
    for junk in ["", "HIYES", "HIYES25JBA0011", "HIYES25LBZ001", "HIYES25BBD001", "ØØØØØØØØØØØØØ"] {
        assert_eq!(decode(junk), None, "{junk}");
    }
}

proptest! {
    #[test]
    fn invariant_round_trip(days in 0i64..36_525, counter in 1u32..=999) {
        let date = ymd(2000, 1, 1) + chrono::Duration::days(days);
        let code = encode(date, counter).unwrap();
        prop_assert_eq!(code.len(), 13);
        prop_assert!(is_valid(&code));

        let decoded = decode(&code).unwrap();
        prop_assert_eq!(decoded.year, date.year());
        prop_assert_eq!(decoded.month, date.month());
        prop_assert_eq!(decoded.day, date.day());
        prop_assert_eq!(decoded.counter, counter);
        prop_assert_eq!(decoded.date, date);
    }
}

// --- Placeholder engine ---

#[test]
fn invariant_discovery_order_and_dedup() {
    let doc = RichTextDocument::from_plain_text("A {{x}} B {{y}} C {{x}}");
    assert_eq!(discover_ordered(&doc), ["x", "y"]);
    assert_eq!(discover(&doc).len(), 2);
}

#[test]
fn invariant_split_run_substitution() {
    let mut doc = RichTextDocument {
        paragraphs: vec![Paragraph::new(vec![Run::new("{{pr"), Run::new("oject_name"), Run::new("}}")])],
        ..Default::default()
    };
    substitute(&mut doc, &values(&[("project_name", "Acme")]));

    let runs = &doc.paragraphs[0].runs;
    assert_eq!(doc.paragraphs[0].text(), "Acme");
    assert_eq!(runs.len(), 3);
    assert_eq!(runs[0].text, "Acme");
    assert!(runs[1].text.is_empty() && runs[2].text.is_empty());
}

#[test]
fn invariant_unresolved_token_passthrough() {
    assert_eq!(substitute_text("Hello {{missing}}", &ValueMap::new()), "Hello {{missing}}");
}

#[test]
fn invariant_no_op_fast_path() {
    let untouched = Paragraph::new(vec![Run::new("No "), Run::new("placeholders "), Run::new("here")]);
    let mut doc = RichTextDocument {
        paragraphs: vec![untouched.clone(), Paragraph::plain("{{a}}")],
        ..Default::default()
    };
    substitute(&mut doc, &values(&[("a", "1"), ("b", "2")]));

    assert_eq!(doc.paragraphs[0], untouched);
    assert_eq!(doc.paragraphs[1].text(), "1");
}

// --- Pipeline ---

#[test]
fn invariant_generate_fills_whole_document() {
    let pipeline = create_pipeline();
    let mut request = create_request("quotation");
    request.extra.insert("validity_days", "30");

    let ledger = InMemoryLedger::new();
    let doc = pipeline.generate(&request, &ledger).unwrap();

    assert_eq!(doc.document_number.as_str(), "HIYES25JBA001");
    assert_eq!(doc.kind, DocumentKind::Quotation);
    assert!(doc.coverage.complete);
    assert_eq!(doc.content_hash.len(), 64);

    let DocumentBody::Rich(body) = &doc.body else {
        panic!("expected rich body");
    };
    assert_eq!(body.paragraphs[0].text(), "Quotation for Office Fit-out");
    assert_eq!(body.paragraphs[1].text(), "Valid for 30 days");
    assert_eq!(body.tables[0].rows[0].cells[1].paragraphs[0].text(), "NT$ 105,000.00");
    assert_eq!(body.sections[0].header[0].text(), "No. HIYES25JBA001");
    assert_eq!(body.sections[0].footer[0].text(), "Acme Ltd / 114/10/27");
}

#[test]
fn invariant_missing_values_do_not_abort() {
    let pipeline = create_pipeline();
    let request = create_request("quotation");

    let doc = pipeline.generate(&request, &InMemoryLedger::new()).unwrap();

    assert!(!doc.coverage.complete);
    assert_eq!(doc.coverage.missing(), ["validity_days"]);
    let DocumentBody::Rich(body) = &doc.body else {
        panic!("expected rich body");
    };
    assert_eq!(body.paragraphs[1].text(), "Valid for {{validity_days}} days");
}

#[test]
fn invariant_counter_follows_issued_count() {
    let pipeline = create_pipeline();
    let request = create_request("contract");
    let ledger = InMemoryLedger::with_issued(ymd(2025, 10, 27), 41);

    let doc = pipeline.generate(&request, &ledger).unwrap();
    assert_eq!(doc.document_number.as_str(), "HIYES25JBA042");
    assert_eq!(
        doc.body,
        DocumentBody::Text("Contract HIYES25JBA042 between Acme Ltd and Lin (0912-345-678)".to_string())
    );
}

#[test]
fn invariant_each_generation_gets_a_new_number() {
    let pipeline = create_pipeline();
    let request = create_request("contract");
    let ledger = InMemoryLedger::new();

    let first = pipeline.generate(&request, &ledger).unwrap();
    let second = pipeline.generate(&request, &ledger).unwrap();

    assert_eq!(first.document_number.as_str(), "HIYES25JBA001");
    assert_eq!(second.document_number.as_str(), "HIYES25JBA002");
    assert_eq!(ledger.issued_on(ymd(2025, 10, 27)), Ok(2));
}

#[test]
fn invariant_unknown_template_consumes_no_number() {
    let pipeline = create_pipeline();
    let ledger = InMemoryLedger::new();

    assert!(pipeline.generate(&create_request("nonexistent"), &ledger).is_err());
    let doc = pipeline.generate(&create_request("contract"), &ledger).unwrap();
    assert_eq!(doc.document_number.as_str(), "HIYES25JBA001");
}

#[test]
fn invariant_daily_limit_surfaces() {
    let pipeline = create_pipeline();
    let request = create_request("contract");
    let ledger = InMemoryLedger::with_issued(ymd(2025, 10, 27), 999);

    let err = pipeline.generate(&request, &ledger).unwrap_err();
    assert!(err.is_daily_limit());
    assert!(matches!(err, PipelineError::Counter(CounterError::DailyLimitReached { .. })));
    assert!(err.to_string().contains("daily document limit reached"));
}

#[test]
fn invariant_extra_values_override_standard() {
    let pipeline = create_pipeline();
    let mut request = create_request("contract");
    request.extra.insert("company_name", "Acme Holdings");

    let doc = pipeline.generate(&request, &InMemoryLedger::new()).unwrap();
    let DocumentBody::Text(text) = &doc.body else {
        panic!("expected text body");
    };
    assert!(text.contains("between Acme Holdings and"));
}

#[test]
fn invariant_template_not_found_error() {
    let pipeline = create_pipeline();
    let err = pipeline
        .generate(&create_request("nonexistent"), &InMemoryLedger::new())
        .unwrap_err();
    assert!(err.to_string().contains("Template not found"));
}

#[test]
fn invariant_engine_version_enforced() {
    let pipeline = create_pipeline();
    let err = pipeline
        .generate(&create_request("invoice-v9"), &InMemoryLedger::new())
        .unwrap_err();
    assert!(matches!(err, PipelineError::EngineVersionMismatch(..)));
}

#[test]
fn invariant_analyze_categorizes() {
    let pipeline = create_pipeline();
    let cats = pipeline.analyze_template("quotation").unwrap();

    assert_eq!(cats.extra, ["validity_days"]);
    assert_eq!(
        cats.standard,
        ["company_name", "price", "project_name", "quotation_number", "roc_date"]
    );
    assert_eq!(cats.all.len(), 6);
}

#[test]
fn invariant_batch_shares_number_and_collects_failures() {
    let pipeline = create_pipeline();
    let base = create_request("unused");
    let mut extra = std::collections::BTreeMap::new();
    extra.insert("quotation".to_string(), values(&[("validity_days", "14")]));

    let request = BatchRequest {
        project: base.project,
        company: base.company,
        contact: base.contact,
        template_ids: vec!["quotation".to_string(), "missing".to_string(), "contract".to_string()],
        extra,
    };

    let outcome = pipeline.generate_batch(&request, &InMemoryLedger::new()).unwrap();

    assert_eq!(outcome.document_number.as_str(), "HIYES25JBA001");
    assert_eq!(outcome.documents.len(), 2);
    assert!(outcome.documents.iter().all(|d| d.document_number == outcome.document_number));
    assert!(outcome.documents[0].coverage.complete);
    assert_eq!(outcome.failed.len(), 1);
    assert_eq!(outcome.failed[0].template_id, "missing");
}

#[test]
fn invariant_generate_request_from_json() {
    let request: GenerateRequest = serde_json::from_str(
        r#"{
            "project": {"project_name": "Fit-out", "date": "2025-01-01", "price": "2100"},
            "extra": {"validity_days": 30}
        }"#,
    )
    .unwrap();

    assert!(request.template_id.is_empty());
    assert_eq!(request.project.price, 2100.0);
    assert_eq!(request.extra.get("validity_days"), Some("30"));

    let request = GenerateRequest { template_id: "quotation".to_string(), ..request };
    let doc = create_pipeline().generate(&request, &InMemoryLedger::new()).unwrap();
    assert_eq!(doc.document_number.as_str(), "HIYES25AAA001");
    assert!(doc.coverage.complete);
}

// --- Regeneration ---

#[test]
fn invariant_generation_data_is_stored() {
    let pipeline = create_pipeline();
    let mut request = create_request("contract");
    request.extra.insert("company_name", "Acme Holdings");

    let doc = pipeline.generate(&request, &InMemoryLedger::new()).unwrap();

    assert_eq!(doc.generation_data.get("contract_number"), Some("HIYES25JBA001"));
    assert_eq!(doc.generation_data.get("company_name"), Some("Acme Holdings"));
    assert_eq!(doc.regenerated_at, None);
}

#[test]
fn invariant_regenerate_reproduces_document() {
    let pipeline = create_pipeline();
    let ledger = InMemoryLedger::new();
    let original = pipeline.generate(&create_request("contract"), &ledger).unwrap();

    let regenerated = pipeline.regenerate(&original).unwrap();

    assert!(!regenerated.content_changed);
    let doc = regenerated.document;
    assert_eq!(doc.id, original.id);
    assert_eq!(doc.document_number, original.document_number);
    assert_eq!(doc.created_at, original.created_at);
    assert!(doc.regenerated_at.is_some());
    assert_eq!(doc.body, original.body);
    assert_eq!(doc.content_hash, original.content_hash);
    assert_eq!(doc.generation_data, original.generation_data);
    // no counter is consumed
    assert_eq!(ledger.issued_on(ymd(2025, 10, 27)), Ok(1));
}

#[test]
fn invariant_regenerate_uses_current_template() {
    let original = create_pipeline()
        .generate(&create_request("contract"), &InMemoryLedger::new())
        .unwrap();

    let mut registry = TemplateRegistry::new();
    registry.register(Template {
        template_version: "2.2.0".to_string(),
        body: DocumentBody::Text("Contract {{contract_number}} for {{company_name}}".to_string()),
        ..create_contract_template()
    });
    let pipeline = GenerationPipeline::new(registry, GeneratorConfig::default());

    let regenerated = pipeline.regenerate(&original).unwrap();

    assert!(regenerated.content_changed);
    assert_ne!(regenerated.document.content_hash, original.content_hash);
    assert_eq!(regenerated.document.template_version, "2.2.0");
    assert_eq!(
        regenerated.document.body,
        DocumentBody::Text("Contract HIYES25JBA001 for Acme Ltd".to_string())
    );
}

#[test]
fn invariant_regenerate_missing_template_errors() {
    let original = create_pipeline()
        .generate(&create_request("contract"), &InMemoryLedger::new())
        .unwrap();

    let err = GenerationPipeline::default().regenerate(&original).unwrap_err();
    assert!(matches!(err, PipelineError::TemplateNotFound(_)));
}

#[test]
fn invariant_stored_document_regenerates_from_json() {
    let pipeline = create_pipeline();
    let mut request = create_request("quotation");
    request.extra.insert("validity_days", "30");
    let original = pipeline.generate(&request, &InMemoryLedger::new()).unwrap();

    let stored = serde_json::to_string(&original).unwrap();
    let restored: GeneratedDocument = serde_json::from_str(&stored).unwrap();

    let regenerated = pipeline.regenerate(&restored).unwrap();
    assert!(!regenerated.content_changed);
    assert_eq!(regenerated.document.body, original.body);
}
