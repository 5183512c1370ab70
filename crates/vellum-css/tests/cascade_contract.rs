//! Cross-module contract tests for the style engine: specificity
//! ordering, media exclusion, declaration round-trips, and the combined
//! document + cascade flow.

use vellum_css::{
    parse_stylesheet, EngineConfig, MediaList, Origin, ParseContext, StyleDeclaration,
    StyleResolver,
};
use vellum_dom::{Document, NodeId};

fn doc_with_rect() -> (Document, NodeId) {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let mut doc = Document::new();
    let svg = doc.create_element("svg").unwrap();
    doc.append_child(doc.document_node(), svg).unwrap();
    let rect = doc.create_element("rect").unwrap();
    doc.set_attribute(rect, "class", "a").unwrap();
    doc.set_attribute(rect, "id", "b").unwrap();
    doc.append_child(svg, rect).unwrap();
    (doc, rect)
}

#[test]
fn id_beats_class_regardless_of_source_order() {
    let (doc, rect) = doc_with_rect();
    for css in [
        ".a { color: red; } #b { color: blue; }",
        "#b { color: blue; } .a { color: red; }",
    ] {
        let mut resolver = StyleResolver::new(EngineConfig::default());
        resolver.add_stylesheet_text(css).unwrap();
        let style = resolver.compute_style(&doc, rect, "").unwrap();
        assert_eq!(style.get_property_value("color"), "blue", "css: {css}");
    }
}

#[test]
fn equal_specificity_is_won_by_the_later_rule() {
    let (doc, rect) = doc_with_rect();
    let mut resolver = StyleResolver::new(EngineConfig::default());
    resolver
        .add_stylesheet_text(".a { color: red; } .a { color: green; }")
        .unwrap();
    let style = resolver.compute_style(&doc, rect, "").unwrap();
    assert_eq!(style.get_property_value("color"), "green");
}

#[test]
fn print_sheet_is_excluded_from_a_screen_view() {
    let (doc, rect) = doc_with_rect();

    let mut config = EngineConfig::default();
    config.view_media = MediaList::from_names(["screen"]);
    let mut resolver = StyleResolver::new(config);
    let mut sheet = parse_stylesheet(".a { color: red; }", &ParseContext::new()).unwrap();
    sheet.media = MediaList::from_names(["print"]);
    resolver.add_stylesheet(sheet);
    let style = resolver.compute_style(&doc, rect, "").unwrap();
    assert_ne!(style.get_property_value("color"), "red");

    // An empty view media list includes everything
    let mut resolver = StyleResolver::new(EngineConfig::default());
    let mut sheet = parse_stylesheet(".a { color: red; }", &ParseContext::new()).unwrap();
    sheet.media = MediaList::from_names(["print"]);
    resolver.add_stylesheet(sheet);
    let style = resolver.compute_style(&doc, rect, "").unwrap();
    assert_eq!(style.get_property_value("color"), "red");
}

#[test]
fn set_css_text_round_trip_is_idempotent() {
    let mut decl = StyleDeclaration::new();
    decl.set_css_text("color: red; font-size: 12px !important; font-family: serif sans-serif")
        .unwrap();

    let text = decl.css_text();
    let mut reparsed = StyleDeclaration::new();
    reparsed.set_css_text(&text).unwrap();

    assert_eq!(reparsed.len(), decl.len());
    for slot in decl.iter() {
        assert_eq!(
            reparsed.get_property_value(&slot.name),
            slot.value.css_text(),
            "property {}",
            slot.name
        );
        assert_eq!(
            reparsed.get_property_priority(&slot.name) == "important",
            slot.important
        );
        assert_eq!(reparsed.get_origin(&slot.name), Some(Origin::Author));
    }
}

#[test]
fn failed_set_css_text_restores_previous_slots() {
    let mut decl = StyleDeclaration::new();
    decl.set_css_text("color: red").unwrap();
    assert!(decl.set_css_text("color red; &&&").is_err());
    assert_eq!(decl.get_property_value("color"), "red");
    assert_eq!(decl.len(), 1);
}

#[test]
fn attribute_mutation_reflows_into_computed_style() {
    let (mut doc, rect) = doc_with_rect();
    let mut resolver = StyleResolver::new(EngineConfig::default());
    resolver
        .add_stylesheet_text(".a { color: red; } .other { color: blue; }")
        .unwrap();

    let style = resolver.compute_style(&doc, rect, "").unwrap();
    assert_eq!(style.get_property_value("color"), "red");

    doc.set_attribute(rect, "class", "other").unwrap();
    let style = resolver.compute_style(&doc, rect, "").unwrap();
    assert_eq!(style.get_property_value("color"), "blue");
}

#[test]
fn inserting_rules_through_the_resolver_invalidates_the_cache() {
    let (doc, rect) = doc_with_rect();
    let mut resolver = StyleResolver::new(EngineConfig::default());
    resolver.add_stylesheet_text(".a { color: red; }").unwrap();

    let style = resolver.compute_style(&doc, rect, "").unwrap();
    assert_eq!(style.get_property_value("color"), "red");

    resolver
        .update_stylesheet(0, |sheet, ctx| {
            sheet.insert_rule("#b { color: blue; }", 1, ctx)
        })
        .unwrap()
        .unwrap();

    let style = resolver.compute_style(&doc, rect, "").unwrap();
    assert_eq!(style.get_property_value("color"), "blue");
}
