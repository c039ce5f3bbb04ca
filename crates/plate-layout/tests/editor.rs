use gpui_plate_layout::{
    ApplyError, Document, Editor, EditorConfig, LayoutConfig, Node, Op, PluginRegistry, Position,
    QueryError, Selection, Transaction, ViewElement,
};
use serde_json::json;

fn editor_with(children: Vec<Node>) -> Editor {
    let config = EditorConfig::default();
    let registry = PluginRegistry::layout(&config.layout).unwrap();
    let selection = Selection::collapsed(Position::new(vec![0, 0]));
    Editor::new(Document::new(children), selection, registry, config)
}

#[test]
fn undo_redo_handles_multi_op_text_edits() {
    let mut editor = editor_with(vec![Node::paragraph("a")]);

    let tx = Transaction::new(vec![
        Op::InsertText {
            path: vec![0, 0],
            offset: 1,
            text: "b".to_string(),
        },
        Op::InsertText {
            path: vec![0, 0],
            offset: 2,
            text: "c".to_string(),
        },
    ])
    .source("test:multi_insert");

    editor.apply(tx).unwrap();
    assert_eq!(editor.doc().children, vec![Node::paragraph("abc")]);

    assert!(editor.undo());
    assert_eq!(editor.doc().children, vec![Node::paragraph("a")]);
    assert!(editor.can_redo());

    assert!(editor.redo());
    assert_eq!(editor.doc().children, vec![Node::paragraph("abc")]);
}

#[test]
fn adjacent_text_leaves_are_merged_on_apply() {
    let mut editor = editor_with(vec![Node::paragraph("a")]);

    editor
        .apply(Transaction::new(vec![Op::InsertNode {
            path: vec![0, 1],
            node: Node::text("b"),
        }]))
        .unwrap();
    assert_eq!(editor.doc().children, vec![Node::paragraph("ab")]);

    assert!(editor.undo());
    assert_eq!(editor.doc().children, vec![Node::paragraph("a")]);
}

#[test]
fn empty_document_gets_a_paragraph() {
    let editor = editor_with(Vec::new());
    assert_eq!(editor.doc().children, vec![Node::paragraph("")]);
    assert_eq!(editor.selection().focus, Position::new(vec![0, 0]));
}

#[test]
fn invalid_paths_are_reported() {
    let mut editor = editor_with(vec![Node::paragraph("a")]);
    let err = editor
        .apply(Transaction::new(vec![Op::RemoveNode { path: vec![5] }]))
        .unwrap_err();
    assert!(matches!(err, ApplyError::InvalidPath(_)));
}

#[test]
fn set_data_replaces_document_and_history() {
    let mut editor = Editor::with_layout_plugins().unwrap();
    editor
        .run_command("layout-column", Some(json!({ "columns": 2 })))
        .unwrap();
    assert!(editor.can_undo());

    editor.set_data(&ViewElement::root(vec![
        ViewElement::new("p").with_text("loaded").into(),
    ]));

    assert_eq!(editor.doc().children, vec![Node::paragraph("loaded")]);
    assert!(!editor.can_undo());
    assert_eq!(editor.selection().focus, Position::new(vec![0, 0]));

    editor.set_data(&ViewElement::root(Vec::new()));
    assert_eq!(editor.doc().children, vec![Node::paragraph("")]);
}

#[test]
fn undo_history_is_bounded_by_config() {
    let config = EditorConfig {
        max_undo: 2,
        ..EditorConfig::default()
    };
    let registry = PluginRegistry::layout(&LayoutConfig::default()).unwrap();
    let mut editor = Editor::new(
        Document::new(vec![Node::paragraph("")]),
        Selection::collapsed(Position::new(vec![0, 0])),
        registry,
        config,
    );

    for _ in 0..3 {
        editor
            .run_command("layout-column", Some(json!({ "columns": 1 })))
            .unwrap();
    }

    assert!(editor.undo());
    assert!(editor.undo());
    assert!(!editor.undo());
}

#[test]
fn unknown_query_is_an_error() {
    let editor = Editor::with_layout_plugins().unwrap();
    assert!(matches!(
        editor.run_query_json("layout.nothing", None),
        Err(QueryError::Unknown(_))
    ));
    assert!(matches!(
        editor.run_query::<String>("layout.is_active", None),
        Err(QueryError::Decode(_))
    ));
}
