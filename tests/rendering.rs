use lca_report::builder::{ReportBuilder, ReportError};
use lca_report::chart::RenderError;
use lca_report::model::{InputRecord, PredictionResult};
use lca_report::predict::{PredictionError, StaticPredictor};
use lca_report::RenderedReport;
use lopdf::content::Content;
use lopdf::{Document, Object};
use sha2::{Digest, Sha256};
use std::collections::HashSet;

const STEEL_PREDICTION: [f64; 7] = [6200.0, 1500.0, 300.0, 40.0, 45.0, 10.0, 60.0];

fn steel_input() -> InputRecord {
    InputRecord::new("steel", "primary", 10.0, 5.0, 200.0, "recycle")
}

fn render_steel_report() -> RenderedReport {
    ReportBuilder::new()
        .generate(&StaticPredictor::new(STEEL_PREDICTION), &steel_input())
        .expect("render steel report")
}

/// Returns the text of every `BT ... ET` section on every page, in content order.
fn extract_text_sections(bytes: &[u8]) -> Vec<String> {
    let document = Document::load_mem(bytes).expect("parse rendered pdf");
    let mut sections = Vec::new();

    for page_id in document.get_pages().values() {
        let raw = document.get_page_content(*page_id).expect("page content");
        let content = Content::decode(&raw).expect("decode content stream");

        let mut current: Option<String> = None;
        for operation in content.operations {
            match operation.operator.as_str() {
                "BT" => current = Some(String::new()),
                "ET" => sections.extend(current.take()),
                "Tj" | "TJ" => {
                    if let Some(text) = current.as_mut() {
                        for operand in &operation.operands {
                            push_string_operand(text, operand);
                        }
                    }
                }
                _ => {}
            }
        }
    }

    sections
}

fn push_string_operand(text: &mut String, operand: &Object) {
    match operand {
        Object::String(bytes, _) => text.push_str(&String::from_utf8_lossy(bytes)),
        Object::Array(items) => {
            for item in items {
                push_string_operand(text, item);
            }
        }
        _ => {}
    }
}

fn embedded_image_count(bytes: &[u8]) -> usize {
    let document = Document::load_mem(bytes).expect("parse rendered pdf");
    document
        .objects
        .values()
        .filter(|object| match object {
            Object::Stream(stream) => matches!(
                stream.dict.get(b"Subtype").and_then(Object::as_name),
                Ok(name) if name == b"Image"
            ),
            _ => false,
        })
        .count()
}

fn content_hash(bytes: &[u8]) -> [u8; 32] {
    let joined = extract_text_sections(bytes).join("\n");
    Sha256::digest(joined.as_bytes()).into()
}

#[test]
fn renders_well_formed_single_page_pdf() {
    let rendered = render_steel_report();
    assert!(rendered.bytes.starts_with(b"%PDF"));
    assert!(rendered.name.starts_with("lca_report_") && rendered.name.ends_with(".pdf"));
    assert_eq!(rendered.mime_type(), "application/pdf");

    let document = Document::load_mem(&rendered.bytes).expect("parse rendered pdf");
    assert_eq!(document.get_pages().len(), 1);
}

#[test]
fn steel_scenario_has_every_section() {
    let rendered = render_steel_report();
    let sections = extract_text_sections(&rendered.bytes);

    let position = |needle: &str| {
        sections
            .iter()
            .position(|section| section == needle)
            .unwrap_or_else(|| panic!("missing '{needle}' in {sections:?}"))
    };
    let input = position("Input Details");
    let output = position("Predicted Environmental & Circularity Indicators");
    let recommendations = position("Recommendations");

    let input_lines: Vec<_> = sections[input + 1..output]
        .iter()
        .filter(|line| line.contains(": "))
        .collect();
    assert_eq!(
        input_lines,
        [
            "Material: steel",
            "Route: primary",
            "Quantity: 10.0",
            "Energy Mwh: 5.0",
            "Transport Km: 200.0",
            "End Of Life: recycle",
        ]
    );

    let output_lines: Vec<_> = sections
        .iter()
        .filter(|line| line.contains(": ") && !input_lines.contains(line))
        .collect();
    assert_eq!(
        output_lines,
        [
            "CO2 Emissions (kg): 6200.00",
            "Water Consumption (L): 1500.00",
            "Waste Generated (kg): 300.00",
            "Recycled Content (%): 40.00",
            "Resource Efficiency: 45.00",
            "Extended Product Life (years): 10.00",
            "Reuse Potential (%): 60.00",
        ]
    );

    let advice: Vec<_> = sections[recommendations + 1..]
        .iter()
        .filter(|line| line.starts_with("- "))
        .collect();
    assert_eq!(advice.len(), 4);
    assert_eq!(advice[0], "- Increase recycled content to reduce emissions.");

    assert_eq!(embedded_image_count(&rendered.bytes), 2);
}

#[test]
fn charts_are_titled_and_labelled() {
    let sections = extract_text_sections(&render_steel_report().bytes);
    for expected in [
        "Environmental Indicators",
        "CO2",
        "Water",
        "Waste",
        "Recycled Content",
        "Recycled",
        "Non-Recycled",
        "40.0%",
        "60.0%",
    ] {
        assert!(
            sections.iter().any(|section| section == expected),
            "missing chart label '{expected}'"
        );
    }
}

#[test]
fn content_is_stable_across_builds() {
    let first = render_steel_report();
    let second = render_steel_report();

    assert_ne!(first.name, second.name, "artifact names must differ");
    assert_eq!(first.text_lines(), second.text_lines());
    assert_eq!(
        content_hash(&first.bytes),
        content_hash(&second.bytes),
        "extracted text must match across builds"
    );
}

#[test]
fn concurrent_builds_do_not_interfere() {
    let builder = ReportBuilder::new();
    let input = steel_input();
    let prediction = PredictionResult::from_values(&STEEL_PREDICTION).expect("valid prediction");

    let reports: Vec<RenderedReport> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| builder.build(&input, &prediction)))
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("build thread").expect("report"))
            .collect()
    });

    let names: HashSet<_> = reports.iter().map(|report| report.name.clone()).collect();
    assert_eq!(names.len(), reports.len());

    let expected = content_hash(&reports[0].bytes);
    for report in &reports {
        assert_eq!(content_hash(&report.bytes), expected);
        assert_eq!(embedded_image_count(&report.bytes), 2);
    }
}

#[test]
fn short_prediction_produces_no_artifact() {
    let result =
        ReportBuilder::new().generate(&StaticPredictor::new(vec![1.0; 5]), &steel_input());
    match result {
        Err(ReportError::Prediction(PredictionError::Arity { expected, actual })) => {
            assert_eq!((expected, actual), (7, 5));
        }
        other => panic!("expected a prediction error, got {other:?}"),
    }
}

#[test]
fn non_finite_indicator_fails_rendering() {
    let mut prediction =
        PredictionResult::from_values(&STEEL_PREDICTION).expect("valid prediction");
    prediction.water_l = f64::NAN;

    let err = ReportBuilder::new()
        .build(&steel_input(), &prediction)
        .unwrap_err();
    assert!(matches!(err, ReportError::Render(RenderError::NonFinite { .. })));
}

#[test]
fn rounding_is_applied_to_the_output_section() {
    let mut values = STEEL_PREDICTION;
    values[0] = 1234.5678;
    let rendered = ReportBuilder::new()
        .generate(&StaticPredictor::new(values), &steel_input())
        .expect("report");
    assert!(rendered
        .text_lines()
        .contains(&"CO2 Emissions (kg): 1234.57".to_string()));
}
