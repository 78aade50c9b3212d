use pretty_assertions::assert_eq;
use weft_engine::{
    Boundary, Failure, Mark, Node, Plain, Properties, Result, Rule, Schema, Selection, State,
    Transform, format_tree, marks,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Paragraphs may not be empty; an empty one is removed
struct DropEmptyParagraphs;

impl Rule for DropEmptyParagraphs {
    fn validate(&self, node: &Node) -> Option<Failure> {
        let empty: Vec<_> = node
            .nodes()
            .iter()
            .filter(|child| child.node_type() == Some("paragraph") && child.is_empty())
            .map(|child| child.key().clone())
            .collect();
        (!empty.is_empty() && empty.len() < node.nodes().len()).then_some(Failure::Keys(empty))
    }

    fn normalize(&self, tx: &mut Transform, _: &Node, failure: Failure) -> Result<()> {
        let Failure::Keys(keys) = failure else {
            return Ok(());
        };
        for key in keys {
            tx.remove_node_by_key(&key)?;
        }
        Ok(())
    }
}

#[test]
fn editing_session_across_states() {
    init_logging();
    let state = State::new(Plain::deserialize("Hello"));
    assert_eq!(state.version(), 0);

    let mut tx = state.transform();
    tx.collapse_to_end().unwrap();
    tx.select_all().unwrap();
    tx.collapse_to_end().unwrap();
    tx.insert_text(" there").unwrap();
    tx.split_block(1).unwrap();
    tx.insert_text("Second line").unwrap();
    tx.save(false);
    let state = tx.apply();

    assert_eq!(state.version(), 1);
    assert_eq!(Plain::serialize(state.document()), "Hello there\nSecond line");
    assert_eq!(state.history().undos().len(), 1);

    let mut tx = state.transform();
    tx.move_by(-4).unwrap();
    tx.extend_by(-7).unwrap();
    tx.add_mark(&Mark::new("bold")).unwrap();
    tx.save(false);
    let state = tx.apply();

    assert_eq!(state.version(), 2);
    assert_eq!(state.marks().unwrap(), marks(["bold"]));
    assert_marked_outline(&state);

    let mut tx = state.transform();
    tx.undo().unwrap();
    tx.undo().unwrap();
    let state = tx.apply();
    assert_eq!(Plain::serialize(state.document()), "Hello");
    assert_eq!(state.history().redos().len(), 2);
}

fn assert_marked_outline(state: &State) {
    insta::assert_snapshot!(format_tree(state.document()), @r#"
    document
      block "paragraph"
        text "Hello there"
      block "paragraph"
        text "Second line" [0..7: bold]
    "#);
}

#[test]
fn edits_never_touch_the_source_state() {
    let state = State::new(Plain::deserialize("one\ntwo"));
    let before = state.document().clone();

    let mut tx = state.transform();
    tx.select_all().unwrap();
    tx.delete().unwrap();
    assert_eq!(tx.document().text_content(), "");

    // dropping the transform discards it
    drop(tx);
    assert_eq!(state.document(), &before);
    assert_eq!(state.version(), 0);
}

#[test]
fn memoized_queries_reset_per_state() {
    let state = State::new(Plain::deserialize("a\nb\nc"));

    assert_eq!(state.texts().len(), 3);
    assert_eq!(state.texts().len(), 3);
    assert_eq!(state.blocks().len(), 3);
    let stats = state.cache_stats();
    assert_eq!((stats.hits, stats.misses), (1, 2));

    let mut tx = state.transform();
    tx.split_block(1).unwrap();
    let next = tx.apply();

    assert_eq!(next.cache_stats().misses, 0);
    assert_eq!(next.blocks().len(), 4);
}

#[test]
fn deleting_across_paragraphs_then_normalizing() {
    init_logging();
    let state = State::new(Plain::deserialize("alpha\n\nbeta\n\ngamma"));
    let schema = Schema::new().with_rule(DropEmptyParagraphs);

    let mut tx = state.transform();
    tx.normalize(&schema).unwrap();
    assert_eq!(Plain::serialize(tx.document()), "alpha\nbeta\ngamma");

    let beta = tx.document().nodes()[1].first_text().unwrap().key().clone();
    tx.collapse_to_start_of(&beta).unwrap();
    tx.delete_backward(Boundary::Char).unwrap();
    tx.set_block(Properties::with_type("heading")).unwrap();
    tx.normalize(&schema).unwrap();

    assert_eq!(Plain::serialize(tx.document()), "alphabeta\ngamma");
    assert_eq!(tx.document().blocks_by_type("heading").len(), 1);
    assert_eq!(tx.selection().anchor_offset, 5);
}

#[test]
fn copy_and_paste_a_fragment() {
    let state = State::new(Plain::deserialize("first line\nsecond line"));
    let doc = state.document();
    let first = doc.nodes()[0].first_text().unwrap().key().clone();
    let second = doc.nodes()[1].first_text().unwrap().key().clone();

    let copied = doc
        .fragment_at_range(&Selection::new(first.clone(), 6, second.clone(), 6))
        .unwrap();
    assert_eq!(Plain::serialize(&copied), "line\nsecond");

    let mut tx = state.transform();
    tx.collapse_to_end_of(&second).unwrap();
    tx.insert_fragment(&copied).unwrap();

    assert_eq!(
        Plain::serialize(tx.document()),
        "first line\nsecond lineline\nsecond"
    );
    let keys = tx.document().filter_descendants(|_| true);
    let unique: std::collections::HashSet<_> = keys.iter().map(|n| n.key()).collect();
    assert_eq!(keys.len(), unique.len());
}

#[test]
fn copy_from_the_end_of_a_text_and_paste() {
    let state = State::new(Node::document(vec![
        Node::block(
            "paragraph",
            vec![
                Node::text("one").with_key("t1"),
                Node::text_with_marks("two", &marks(["bold"])).with_key("t2"),
            ],
        ),
        Node::block("paragraph", vec![Node::text("three").with_key("t3")]),
    ]));
    let range = Selection::new("t1", 3, "t2", 2);

    let copied = state.document().fragment_at_range(&range).unwrap();
    let expected: String = state
        .document()
        .characters_at_range(&range)
        .unwrap()
        .iter()
        .map(|c| c.ch)
        .collect();
    assert_eq!(copied.text_content(), expected);
    assert_eq!(copied.marks(), marks(["bold"]));

    let mut tx = state.transform();
    tx.collapse_to_end_of("t3").unwrap();
    tx.insert_fragment(&copied).unwrap();

    assert_eq!(tx.document().text_content(), "onetwothreetw");
    let bold = tx
        .document()
        .texts()
        .iter()
        .flat_map(|t| t.characters())
        .filter(|c| !c.marks.is_empty())
        .count();
    assert_eq!(bold, 5);
    let keys = tx.document().filter_descendants(|_| true);
    let unique: std::collections::HashSet<_> = keys.iter().map(|n| n.key()).collect();
    assert_eq!(keys.len(), unique.len());
}

#[test]
fn selection_survives_removal_of_its_block() {
    let state = State::new(Plain::deserialize("keep\ndrop"));
    let drop_block = state.document().nodes()[1].key().clone();
    let drop_text = state.document().nodes()[1].first_text().unwrap().key().clone();

    let mut tx = state.transform();
    tx.select(Selection::collapsed(drop_text, 2)).unwrap();
    tx.remove_node_by_key(&drop_block).unwrap();

    let keep = tx.document().first_text().unwrap();
    assert_eq!(tx.selection(), &Selection::collapsed(keep.key().clone(), 4));
}
