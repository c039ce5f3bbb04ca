use crate::view::{ViewElement, ViewNode};

pub const WIDGET_CLASS: &str = "ck-widget";
pub const WIDGET_WITH_HANDLE_CLASS: &str = "ck-widget_with-selection-handle";
pub const SELECTION_HANDLE_CLASS: &str = "ck-widget__selection-handle";
pub const EDITABLE_CLASSES: [&str; 2] = ["ck-editor__editable", "ck-editor__nested-editable"];

const WIDGET_PROPERTY: &str = "widget";
const WIDGET_LABEL_PROPERTY: &str = "widgetLabel";
const EDITABLE_PROPERTY: &str = "editable";

#[derive(Debug, Clone, Default)]
pub struct WidgetOptions {
    pub label: Option<String>,
    pub has_selection_handle: bool,
}

/// Turns a rendered container into a unit that is selected and dragged as a
/// whole and whose own text cannot be edited. Nested editables keep their
/// own `contenteditable`.
pub fn to_widget(mut element: ViewElement, options: WidgetOptions) -> ViewElement {
    element.add_class(WIDGET_CLASS);
    element.set_attr("contenteditable", "false");
    element
        .custom
        .insert(WIDGET_PROPERTY.to_string(), "true".to_string());

    if let Some(label) = options.label {
        element.custom.insert(WIDGET_LABEL_PROPERTY.to_string(), label);
    }

    if options.has_selection_handle {
        element.add_class(WIDGET_WITH_HANDLE_CLASS);
        element.children.insert(
            0,
            ViewNode::Ui(ViewElement::new("div").with_class(SELECTION_HANDLE_CLASS)),
        );
    }

    element
}

pub fn to_widget_editable(mut element: ViewElement) -> ViewElement {
    for class in EDITABLE_CLASSES {
        element.add_class(class);
    }
    element.set_attr("contenteditable", "true");
    element
        .custom
        .insert(EDITABLE_PROPERTY.to_string(), "true".to_string());
    element
}

pub fn is_widget(element: &ViewElement) -> bool {
    element.custom.contains_key(WIDGET_PROPERTY)
}

pub fn is_widget_editable(element: &ViewElement) -> bool {
    element.custom.contains_key(EDITABLE_PROPERTY)
}

pub fn widget_label(element: &ViewElement) -> Option<&str> {
    element.custom.get(WIDGET_LABEL_PROPERTY).map(String::as_str)
}
