//! Text form: walker output parsed back into trees

use arbor_dom::{Node, TagType};
use arbor_wire::{TextParseErrorKind, TextParser, parse_text};
use proptest::prelude::*;

fn assert_same_tree(a: &Node, b: &Node) {
    let mut stack = vec![(a.clone(), b.clone())];
    while let Some((x, y)) = stack.pop() {
        assert_eq!(x.name(), y.name());
        assert_eq!(x.attributes(), y.attributes());
        assert_eq!(x.leaf_text(), y.leaf_text());
        assert_eq!(
            x.content().as_element().map(|e| e.tag_type()),
            y.content().as_element().map(|e| e.tag_type())
        );
        let (xs, ys) = (x.children(), y.children());
        assert_eq!(xs.len(), ys.len());
        stack.extend(xs.into_iter().zip(ys));
    }
}

// ============================================================================
// SCENARIOS
// ============================================================================

#[test]
fn test_document_round_trip() {
    let root = Node::element("div", &[("id", "main"), ("hidden", "")]).unwrap();
    let p = Node::element("p", &[("title", "a \"b\" & <c>")]).unwrap();
    root.append_children(&[
        p.clone(),
        Node::element_with_type("br", TagType::NonClosing, &[]).unwrap(),
        Node::element_with_type("x-icon", TagType::SelfClosing, &[("src", "i.svg")]).unwrap(),
    ])
    .unwrap();
    p.append_child(&Node::text("1 < 2 & 3 > 0")).unwrap();

    let parsed = parse_text(&root.to_text()).unwrap();
    assert_same_tree(&root, &parsed);
    assert_eq!(parsed.to_text(), root.to_text());
}

#[test]
fn test_html_leaf_comes_back_as_markup() {
    let root = Node::element("p", &[]).unwrap();
    root.append_child(&Node::html("<b>bold</b>")).unwrap();

    let parsed = parse_text(&root.to_text()).unwrap();
    let b = parsed.first_child().unwrap();
    assert_eq!(b.name().as_deref(), Some("b"));
    assert_eq!(b.first_child().unwrap().leaf_text().as_deref(), Some("bold"));
    assert_eq!(parsed.to_text(), root.to_text());
}

#[test]
fn test_adjacent_text_leaves_merge() {
    let root = Node::element("p", &[]).unwrap();
    root.append_children(&[Node::text("a"), Node::text("b")]).unwrap();
    let parsed = parse_text(&root.to_text()).unwrap();
    assert_eq!(parsed.child_count(), 1);
    assert_eq!(parsed.first_child().unwrap().leaf_text().as_deref(), Some("ab"));
}

#[test]
fn test_deep_text_form() {
    const DEPTH: usize = 100_000;
    let input = format!("{}x{}", "<d>".repeat(DEPTH), "</d>".repeat(DEPTH));
    let parsed = TextParser::new().parse(&input).unwrap();
    assert_eq!(parsed.subtree_len(), DEPTH + 1);
    assert_eq!(parsed.to_text(), input);
}

#[test]
fn test_void_closing_tag_is_rejected() {
    let err = parse_text("<div><br></br></div>").unwrap_err();
    assert_eq!(err.kind, TextParseErrorKind::MismatchedClose {
        expected: "div".into(),
        found: "br".into(),
    });
    assert_eq!(err.offset, 9);
}

#[test]
fn test_invalid_names_surface_tree_errors() {
    let err = parse_text("<a b\"c=\"1\"></a>").unwrap_err();
    assert!(matches!(err.kind, TextParseErrorKind::Tree(_)));
}

// ============================================================================
// PROPERTIES
// ============================================================================

#[derive(Debug, Clone)]
enum Shape {
    Element(&'static str, TagType, Vec<(&'static str, String)>),
    Text(String),
}

fn shape_strategy() -> impl Strategy<Value = Shape> {
    let container = prop::sample::select(vec!["div", "span", "p", "li"]);
    let attrs = prop::collection::vec(
        (prop::sample::select(vec!["id", "class", "title"]), "[a-z&\"<>' ]{0,6}"),
        0..3,
    );
    prop_oneof![
        3 => (container, attrs.clone())
            .prop_map(|(n, a)| Shape::Element(n, TagType::OpeningClosing, a)),
        1 => (prop::sample::select(vec!["br", "hr", "img"]), attrs.clone())
            .prop_map(|(n, a)| Shape::Element(n, TagType::NonClosing, a)),
        1 => (prop::sample::select(vec!["x-a", "icon"]), attrs)
            .prop_map(|(n, a)| Shape::Element(n, TagType::SelfClosing, a)),
        2 => "[a-z&<>\" ]{1,8}".prop_map(Shape::Text),
    ]
}

/// Text leaves never land next to another text leaf
fn build(shapes: &[(Shape, usize)]) -> Node {
    let root = Node::element("root", &[]).unwrap();
    let mut containers = vec![root.clone()];
    for (shape, parent) in shapes {
        let parent = &containers[parent % containers.len()];
        let node = match shape {
            Shape::Element(name, tag_type, attrs) => {
                let attrs: Vec<(&str, &str)> = attrs.iter().map(|(n, v)| (*n, v.as_str())).collect();
                Node::element_with_type(name, *tag_type, &attrs).unwrap()
            }
            Shape::Text(text) => {
                if parent.children().last().is_some_and(|last| last.is_leaf()) {
                    continue;
                }
                Node::text(text.clone())
            }
        };
        parent.append_child(&node).unwrap();
        if node.content().as_element().is_some_and(|e| e.tag_type() == TagType::OpeningClosing) {
            containers.push(node);
        }
    }
    root
}

proptest! {
    #[test]
    fn parse_inverts_walk(shapes in prop::collection::vec((shape_strategy(), any::<usize>()), 0..50)) {
        let root = build(&shapes);
        let text = root.to_text();
        let parsed = parse_text(&text).unwrap();
        assert_same_tree(&root, &parsed);
        prop_assert_eq!(parsed.to_text(), text);
    }
}
