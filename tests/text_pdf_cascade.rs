//! A PDF with an embedded text layer never needs the external tools.

use lopdf::dictionary;
use lopdf::{Document, Object, Stream};
use routeai::config::ExtractionConfig;
use routeai::{ExtractionPipeline, RawDocument, Strategy};

fn text_pdf(lines: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });

    let mut ops = String::from("BT /F1 11 Tf 60 740 Td");
    for line in lines {
        ops.push_str(&format!(" ({}) Tj 0 -14 Td", line));
    }
    ops.push_str(" ET");

    let content_id = doc.add_object(Stream::new(dictionary! {}, ops.into_bytes()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        "Contents" => content_id,
        "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::from(page_id)],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

#[tokio::test]
async fn test_text_layer_accepted_by_direct_strategy() {
    let pdf = text_pdf(&[
        "SPECIAL TRANSPORT PERMIT 2291",
        "Origin: Depot North, 14 Kiln Road",
        "Route: Elm Street, Route 9, Harbor Road",
        "Destination: Harbor Gate Terminal",
    ]);

    let pipeline = ExtractionPipeline::from_config(&ExtractionConfig::default());
    let result = pipeline
        .extract(RawDocument::new(pdf, "application/pdf"))
        .await
        .unwrap();

    assert_eq!(result.strategy_used, Strategy::Direct);
    assert!(!result.empty);
    assert_eq!(result.page_count, Some(1));
    assert!(result.text.contains("Harbor Gate Terminal"));
    let origin = result.text.find("Depot North").unwrap();
    let destination = result.text.find("Harbor Gate").unwrap();
    assert!(origin < destination);
}
