use markdown_composer_engine::{Document, MarkdownBridge, NodeKey, NodeType};
use pretty_assertions::assert_eq;
use rstest::rstest;

#[test]
fn fixture_headings_lists() {
    assert_fixture("roundtrip/headings_lists");
}

#[test]
fn fixture_nested_lists() {
    assert_fixture("roundtrip/nested_lists");
}

#[test]
fn fixture_inline_marks() {
    assert_fixture("roundtrip/inline_marks");
}

#[test]
fn fixture_quotes_code() {
    assert_fixture("roundtrip/quotes_code");
}

#[test]
fn fixture_escapes() {
    assert_fixture("roundtrip/escapes");
}

/// Import, export and import again: the two trees must match and the
/// second export must equal the first.
fn assert_fixture(name: &str) {
    let md = std::fs::read_to_string(format!(
        "{}/tests/fixtures/{name}.md",
        env!("CARGO_MANIFEST_DIR")
    ))
    .unwrap();
    let bridge = MarkdownBridge::default();

    let first = bridge.import_markdown(&md).unwrap();
    first.check_invariants().unwrap();
    let exported = bridge.export_markdown(&first);

    let second = bridge.import_markdown(&exported).unwrap();
    assert_eq!(second.outline(), first.outline(), "{name} exported as:\n{exported}");
    assert_eq!(bridge.export_markdown(&second), exported);
}

fn root_types(doc: &Document) -> Vec<NodeType> {
    doc.children(NodeKey::ROOT)
        .iter()
        .filter_map(|&k| doc.node_type(k))
        .collect()
}

#[rstest]
#[case("## H\n\ntext", vec![NodeType::Heading, NodeType::Paragraph])]
#[case("### deeper", vec![NodeType::Paragraph])]
#[case("- a\n\n> q", vec![NodeType::List, NodeType::Quote])]
#[case("```\ncode\n```\nafter", vec![NodeType::Code, NodeType::Paragraph])]
#[case("line one\nline two", vec![NodeType::Paragraph])]
fn test_block_structure(#[case] md: &str, #[case] expected: Vec<NodeType>) {
    let doc = MarkdownBridge::default().import_markdown(md).unwrap();
    assert_eq!(root_types(&doc), expected);
}

#[rstest]
#[case("**unclosed")]
#[case("[label](")]
#[case("`open code")]
#[case("[[]]")]
#[case("~~~")]
fn test_malformed_constructs_survive_as_text(#[case] md: &str) {
    let bridge = MarkdownBridge::default();
    let doc = bridge.import_markdown(md).unwrap();
    doc.check_invariants().unwrap();
    let again = bridge
        .import_markdown(&bridge.export_markdown(&doc))
        .unwrap();
    assert_eq!(again.outline(), doc.outline());
}

#[test]
fn test_export_has_no_trailing_newline() {
    let bridge = MarkdownBridge::default();
    let doc = bridge.import_markdown("## Title\n\n- a\n").unwrap();
    assert_eq!(bridge.export_markdown(&doc), "## Title\n\n- a");
}

#[rstest]
#[case("*a **b** c*")]
#[case("***a** b*")]
#[case("***a* b**")]
#[case("**bold *both* bold**")]
fn test_mixed_emphasis_exports_verbatim(#[case] md: &str) {
    let bridge = MarkdownBridge::default();
    let doc = bridge.import_markdown(md).unwrap();
    assert_eq!(bridge.export_markdown(&doc), md);
}
