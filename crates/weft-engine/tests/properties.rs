use std::collections::HashSet;

use pretty_assertions::assert_eq;
use rstest::rstest;
use tempfile::TempDir;
use weft_engine::{
    Boundary, Config, EngineOptions, Error, Failure, Node, Result, Rule, Schema, Selection, State,
    Transform, marks,
};

/// A nested document: a heading, a list of two items and a paragraph with
/// mixed marks
fn sample() -> Node {
    Node::document(vec![
        Node::block("heading", vec![Node::text("Title").with_key("t-title")]).with_key("h"),
        Node::block(
            "list",
            vec![
                Node::block("item", vec![Node::text("first").with_key("t-first")])
                    .with_key("i1"),
                Node::block("item", vec![Node::text("second").with_key("t-second")])
                    .with_key("i2"),
            ],
        )
        .with_key("l"),
        Node::block(
            "paragraph",
            vec![
                Node::text("plain ").with_key("t-plain"),
                Node::text_with_marks("bold", &marks(["bold"])).with_key("t-bold"),
                Node::inline("link", vec![Node::text(" link").with_key("t-link")])
                    .with_key("a"),
            ],
        )
        .with_key("p"),
    ])
    .with_key("doc")
}

fn assert_unique_keys(doc: &Node) {
    let all = doc.filter_descendants(|_| true);
    let unique: HashSet<_> = all.iter().map(|n| n.key().clone()).collect();
    assert_eq!(all.len(), unique.len(), "duplicate keys in {doc:#?}");
    assert!(!unique.contains(doc.key()));
}

#[test]
fn keys_stay_unique_through_edits() {
    let mut tx = State::new(sample()).transform();

    tx.insert_node_by_key("l", 1, sample().nodes()[1].nodes()[0].clone())
        .unwrap();
    assert_unique_keys(tx.document());

    tx.split_node_by_key("l", 6).unwrap();
    assert_unique_keys(tx.document());

    let pasted = tx
        .document()
        .fragment_at_range(&Selection::new("t-title", 1, "t-bold", 2))
        .unwrap();
    tx.insert_fragment_at_range(&Selection::collapsed("t-link", 2), &pasted)
        .unwrap();
    assert_unique_keys(tx.document());

    tx.split_node_by_key("t-plain", 3).unwrap();
    tx.join_node_by_key("h", "l", true).unwrap();
    assert_unique_keys(tx.document());
}

#[rstest]
fn split_then_join_conserves_text(#[values(0, 1, 5, 9, 15)] offset: usize) {
    let doc = sample();
    let path = doc.path("p").unwrap();
    let split = doc.split_node(&path, offset).unwrap();
    let second = split.nodes()[path[0] + 1].key().clone();

    let joined = split.join_node("p", &second, true).unwrap();

    assert_eq!(joined.text_content(), doc.text_content());
    assert_eq!(joined.characters(), doc.characters());
    assert_eq!(joined, doc);
}

#[test]
fn offsets_round_trip_through_points() {
    let doc = sample();
    for offset in 0..=doc.len() {
        let (key, local) = doc.point_at_offset(offset).unwrap();
        assert_eq!(doc.offset(&key).unwrap() + local, offset, "offset {offset}");
    }
    assert!(doc.point_at_offset(doc.len() + 1).is_none());
}

#[test]
fn undo_and_redo_are_inverse() {
    let before = State::new(sample());
    let mut tx = before.transform();

    tx.select(Selection::new("t-first", 2, "t-bold", 1)).unwrap();
    tx.delete().unwrap();
    tx.split_block(1).unwrap();
    tx.insert_text("typed").unwrap();
    tx.delete_backward(Boundary::Word).unwrap();
    tx.add_mark(&"italic".into()).unwrap();
    tx.save(false);
    let after = tx.document().clone();
    let after_selection = tx.selection().clone();

    tx.undo().unwrap();
    assert_eq!(tx.document(), before.document());
    assert_eq!(tx.selection(), before.selection());

    tx.redo().unwrap();
    assert_eq!(tx.document(), &after);
    assert_eq!(tx.selection(), &after_selection);
}

#[test]
fn history_keeps_the_newest_hundred_batches() {
    let mut tx = State::new(sample()).transform();
    for i in 0..105 {
        tx.insert_text_by_key("t-title", 0, &i.to_string(), None).unwrap();
        tx.save(false);
    }

    assert_eq!(tx.history().undos().len(), 100);
    let oldest = &tx.history().undos()[0];
    assert_eq!(oldest.len(), 1);
    // batches 0 to 4 were dropped
    let inserted: String = match &oldest[0].apply {
        weft_engine::Edit::InsertText { characters, .. } => {
            weft_engine::characters_to_string(characters)
        }
        other => panic!("unexpected edit {other:?}"),
    };
    assert_eq!(inserted, "5");
}

#[test]
fn configured_history_limit() {
    let mut config = Config::default();
    config.history.max_undos = 2;
    let state = State::with_config(sample(), &config);
    assert_eq!(state.options(), &EngineOptions::from(&config));

    let mut tx = state.transform();
    for _ in 0..5 {
        tx.insert_text_by_key("t-title", 0, "x", None).unwrap();
        tx.save(false);
    }

    assert_eq!(tx.history().undos().len(), 2);
}

/// Headings want ever more texts
struct GrowingHeading;

impl Rule for GrowingHeading {
    fn validate(&self, node: &Node) -> Option<Failure> {
        (node.node_type() == Some("heading")).then_some(Failure::Index(0))
    }

    fn normalize(&self, tx: &mut Transform, node: &Node, _: Failure) -> Result<()> {
        tx.insert_node_by_key(node.key(), 0, Node::text("+")).map(|_| ())
    }
}

#[test]
fn limits_from_config_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("weft.toml").to_string_lossy().into_owned();
    std::fs::write(
        &path,
        "[history]\nmax_undos = 3\n\n[normalize]\nmax_iterations = 4\n",
    )
    .unwrap();

    let state = State::from_config_file(sample(), &path).unwrap();
    assert_eq!(state.options().max_undos, 3);
    assert_eq!(state.options().max_iterations, Some(4));

    let mut tx = state.transform();
    for _ in 0..6 {
        tx.insert_text_by_key("t-first", 0, "y", None).unwrap();
        tx.save(false);
    }
    assert_eq!(tx.history().undos().len(), 3);

    let err = tx
        .normalize(&Schema::new().with_rule(GrowingHeading))
        .unwrap_err();
    assert!(matches!(
        err,
        Error::NonConvergentNormalization { ref key, iterations: 4 } if key.as_str() == "h"
    ));
}

#[test]
fn missing_config_file_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.toml").to_string_lossy().into_owned();

    let state = State::from_config_file(sample(), &path).unwrap();

    assert_eq!(state.options(), &EngineOptions::default());
}

#[rstest]
#[case(Selection::new("t-bold", 99, "t-title", 2))]
#[case(Selection::collapsed("p", 8))]
#[case(Selection::new("i1", 0, "i2", 3))]
fn range_normalization_is_idempotent(#[case] range: Selection) {
    let doc = sample();
    let once = range.normalize(&doc).unwrap();

    assert_eq!(once.normalize(&doc).unwrap(), once);
}
