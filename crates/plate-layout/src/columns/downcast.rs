use serde_json::Value;

use super::{COLUMNS_ATTR, COLUMN_CONTAINER_NAME, LAYOUT_CLASS, LAYOUT_KIND};
use crate::conversion::{DowncastMode, ElementDowncast};
use crate::model::ElementNode;
use crate::view::ViewElement;
use crate::widget::{to_widget, WidgetOptions};

const WIDGET_LABEL: &str = "column layout";

/// The container both modes render; only the editing mode decorates it.
pub fn layout_container(layout: &ElementNode) -> ViewElement {
    let mut container = ViewElement::new(COLUMN_CONTAINER_NAME).with_class(LAYOUT_CLASS);
    match layout.attrs.get(COLUMNS_ATTR) {
        Some(Value::String(s)) => container.set_attr(COLUMNS_ATTR, s.clone()),
        Some(Value::Null) | None => {}
        Some(other) => container.set_attr(COLUMNS_ATTR, other.to_string()),
    }
    container
}

pub struct LayoutDowncast(pub DowncastMode);

impl ElementDowncast for LayoutDowncast {
    fn model_kind(&self) -> &'static str {
        LAYOUT_KIND
    }

    fn mode(&self) -> DowncastMode {
        self.0
    }

    fn to_view(&self, element: &ElementNode) -> ViewElement {
        let container = layout_container(element);
        match self.0 {
            DowncastMode::Data => container,
            DowncastMode::Editing => to_widget(
                container,
                WidgetOptions {
                    label: Some(WIDGET_LABEL.to_string()),
                    has_selection_handle: true,
                },
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widget::{is_widget, widget_label};
    use serde_json::json;

    #[test]
    fn both_modes_share_the_container_and_only_editing_is_a_widget() {
        let layout = ElementNode::new(LAYOUT_KIND).with_attr(COLUMNS_ATTR, json!(2));

        let data = LayoutDowncast(DowncastMode::Data).to_view(&layout);
        let editing = LayoutDowncast(DowncastMode::Editing).to_view(&layout);

        assert_eq!(data, layout_container(&layout));
        assert!(!is_widget(&data));
        assert!(is_widget(&editing));
        assert_eq!(widget_label(&editing), Some(WIDGET_LABEL));
        assert_eq!(editing.attr(COLUMNS_ATTR), data.attr(COLUMNS_ATTR));
        assert!(editing.has_class(LAYOUT_CLASS));
    }

    #[test]
    fn count_renders_as_base_ten_string() {
        let layout = ElementNode::new(LAYOUT_KIND).with_attr(COLUMNS_ATTR, json!(12));
        assert_eq!(
            layout_container(&layout).to_html(),
            r#"<div class="ck-layout-columns" columns="12"></div>"#
        );
    }
}
