use gpui_plate_layout::{
    downcast, is_widget, is_widget_editable, upcast, DowncastMode, Editor, ViewElement, ViewNode,
    COLUMNS_ATTR, LAYOUT_CLASS,
};
use serde_json::json;

fn column(children: Vec<ViewNode>) -> ViewNode {
    ViewElement::new("div").with_children(children).into()
}

fn paragraph(text: &str) -> ViewNode {
    ViewElement::new("p").with_text(text).into()
}

fn loaded(children: Vec<ViewNode>) -> Editor {
    let mut editor = Editor::with_layout_plugins().unwrap();
    editor.set_data(&ViewElement::root(children));
    editor
}

fn layout_view(columns: &str, children: Vec<ViewNode>) -> ViewNode {
    ViewElement::new("div")
        .with_class(LAYOUT_CLASS)
        .with_attr(COLUMNS_ATTR, columns)
        .with_children(children)
        .into()
}

#[test]
fn data_output_is_the_bare_container() {
    let editor = loaded(vec![layout_view(
        "2",
        vec![column(vec![paragraph("A")]), column(vec![paragraph("B")])],
    )]);

    insta::assert_snapshot!(
        editor.data_html(),
        @r#"<div class="ck-layout-columns" columns="2"><div><p>A</p></div><div><p>B</p></div></div>"#
    );
}

#[test]
fn editing_output_marks_the_container_as_a_widget() {
    let mut editor = Editor::with_layout_plugins().unwrap();
    editor
        .run_command("layout-column", Some(json!({ "columns": 2 })))
        .unwrap();

    insta::assert_snapshot!(
        editor.editing_view().inner_html(),
        @r#"<p></p><div class="ck-layout-columns ck-widget ck-widget_with-selection-handle" columns="2" contenteditable="false"><div class="ck-widget__selection-handle"></div><div class="ck-editor__editable ck-editor__nested-editable" contenteditable="true"></div><div class="ck-editor__editable ck-editor__nested-editable" contenteditable="true"></div></div>"#
    );

    let view = editor.editing_view();
    let ViewNode::Element(container) = &view.children[1] else {
        panic!("expected the layout container");
    };
    assert!(is_widget(container));
    let regions: Vec<&ViewElement> = container
        .children
        .iter()
        .filter_map(ViewNode::as_element)
        .collect();
    assert_eq!(regions.len(), 2);
    assert!(regions.iter().all(|r| is_widget_editable(r)));
}

#[test]
fn both_modes_render_the_same_container_attributes() {
    let mut editor = Editor::with_layout_plugins().unwrap();
    editor.trigger("layout-column-3").unwrap();

    let data = editor.data();
    let editing = editor.editing_view();
    let (Some(data_layout), Some(editing_layout)) =
        (data.children[1].as_element(), editing.children[1].as_element())
    else {
        panic!("expected layout containers");
    };

    assert_eq!(data_layout.name, editing_layout.name);
    assert_eq!(data_layout.attr(COLUMNS_ATTR), Some("3"));
    assert_eq!(editing_layout.attr(COLUMNS_ATTR), Some("3"));
    assert!(data_layout.has_class(LAYOUT_CLASS));
    assert!(editing_layout.has_class(LAYOUT_CLASS));
    assert!(!is_widget(data_layout));
}

#[test]
fn data_output_upcasts_back_to_the_same_model() {
    let editor = loaded(vec![
        paragraph("intro"),
        layout_view(
            "3",
            vec![
                column(vec![
                    ViewElement::new("p")
                        .with_text("plain ")
                        .with_child(ViewElement::new("strong").with_text("bold"))
                        .with_child(ViewElement::new("em").with_text("italic"))
                        .into(),
                ]),
                column(vec![layout_view("2", vec![column(vec![paragraph("nested")])])]),
            ],
        ),
    ]);

    let reloaded = upcast(&editor.data(), editor.registry());
    assert_eq!(&reloaded, editor.doc());
}

#[test]
fn editing_output_upcasts_back_to_the_same_model() {
    let mut editor = Editor::with_layout_plugins().unwrap();
    editor
        .run_command("layout-column", Some(json!({ "columns": 2 })))
        .unwrap();

    let reloaded = upcast(&editor.editing_view(), editor.registry());
    assert_eq!(&reloaded, editor.doc());
}

#[test]
fn split_paragraph_renders_around_the_layout() {
    let editor = loaded(vec![
        ViewElement::new("p")
            .with_text("foo")
            .with_child(layout_view("2", vec![column(vec![paragraph("x")])]))
            .with_text("bar")
            .into(),
    ]);

    insta::assert_snapshot!(
        editor.data_html(),
        @r#"<p>foo</p><div class="ck-layout-columns" columns="2"><div><p>x</p></div><div></div></div><p>bar</p>"#
    );
}

#[test]
fn downcast_without_layout_plugins_flattens_unknown_kinds() {
    let editor = loaded(vec![layout_view("1", vec![column(vec![paragraph("A")])])]);
    let bare = gpui_plate_layout::PluginRegistry::default();

    let view = downcast(editor.doc(), &bare, DowncastMode::Data);

    assert_eq!(view.inner_html(), "A");
}
