use std::num::NonZeroUsize;

use serde_json::json;

use super::{COLUMNS_ATTR, COLUMN_CONTAINER_NAME, LAYOUT_CLASS, LAYOUT_KIND};
use crate::conversion::{
    ConsumePattern, Consumables, ConversionData, UpcastContext, UpcastConverter, UpcastTarget,
    ViewItem,
};
use crate::editable::{editable_with, EDITABLE_KIND};
use crate::model::{ElementNode, ModelRange, Node, Position};

/// What a view element looks like to the layout converter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutMatch {
    Matched { columns: NonZeroUsize },
    /// Marked up as a layout block, but the count is not an integer in
    /// `1..=max_columns`.
    Invalid { raw: String },
    NotMatched,
}

fn layout_pattern() -> ConsumePattern {
    ConsumePattern::name()
        .attribute(COLUMNS_ATTR)
        .class(LAYOUT_CLASS)
}

/// A layout block is an unconsumed element carrying both the `columns`
/// attribute and the layout class.
pub fn recognize(
    item: &ViewItem<'_>,
    consumables: &Consumables,
    max_columns: usize,
) -> LayoutMatch {
    let Some(element) = item.element() else {
        return LayoutMatch::NotMatched;
    };
    if !consumables.test(&item.path, item.node, &layout_pattern()) {
        return LayoutMatch::NotMatched;
    }

    let raw = element.attr(COLUMNS_ATTR).unwrap_or_default();
    match raw
        .trim()
        .parse::<usize>()
        .ok()
        .filter(|&n| n <= max_columns)
        .and_then(NonZeroUsize::new)
    {
        Some(columns) => LayoutMatch::Matched { columns },
        None => LayoutMatch::Invalid {
            raw: raw.to_string(),
        },
    }
}

pub struct LayoutUpcast {
    pub max_columns: usize,
}

impl UpcastConverter for LayoutUpcast {
    fn id(&self) -> &'static str {
        "layout-column.upcast"
    }

    fn target(&self) -> UpcastTarget {
        UpcastTarget::Element(COLUMN_CONTAINER_NAME)
    }

    fn convert(&self, item: &ViewItem<'_>, data: &mut ConversionData, cx: &mut UpcastContext<'_>) {
        let columns = match recognize(item, cx.consumables(), self.max_columns) {
            LayoutMatch::Matched { columns } => columns,
            LayoutMatch::NotMatched => return,
            LayoutMatch::Invalid { raw } => {
                tracing::warn!(target: "plate_layout::upcast", columns = %raw, max = self.max_columns, "ignoring layout block with invalid column count");
                return;
            }
        };

        let Some(split) = cx.split_to_allowed_parent(LAYOUT_KIND, &data.model_cursor) else {
            tracing::warn!(target: "plate_layout::upcast", cursor = ?data.model_cursor.path, "no allowed position for layout block, dropping it");
            return;
        };

        // Tracked from here on: the insert may move it.
        let continue_in = split
            .cursor_parent
            .map(|path| cx.writer().track(path));
        let layout = ElementNode::new(LAYOUT_KIND).with_attr(COLUMNS_ATTR, json!(columns.get()));
        if let Err(err) = cx.insert_element(layout, &split.position) {
            tracing::warn!(target: "plate_layout::upcast", %err, "layout insertion failed");
            return;
        }
        let layout_path = split.position.path;
        cx.consumable().consume_name(&item.path, item.node);

        let mut regions = 0usize;
        let mut dropped = 0usize;
        for child in item.children() {
            // Every child is claimed, including the ones thrown away below.
            cx.consumable().consume_name(&child.path, child.node);
            let is_column = child
                .element()
                .is_some_and(|el| el.name == COLUMN_CONTAINER_NAME);
            if !is_column {
                continue;
            }
            if regions < columns.get() {
                let content = cx.convert_children_detached(&child, EDITABLE_KIND);
                append_region(cx, &layout_path, content);
                regions += 1;
            } else {
                dropped += 1;
            }
        }

        if dropped > 0 {
            tracing::debug!(target: "plate_layout::upcast", columns = columns.get(), dropped, "dropping excess columns");
        }
        if regions < columns.get() {
            tracing::debug!(target: "plate_layout::upcast", columns = columns.get(), missing = columns.get() - regions, "padding with empty columns");
        }
        for _ in regions..columns.get() {
            append_region(cx, &layout_path, Vec::new());
        }

        let range = ModelRange::new(Position::before(&layout_path), Position::after(&layout_path));
        data.model_cursor = match continue_in {
            Some(handle) => Position::at(cx.writer().tracked_path(handle), 0),
            None => range.end.clone(),
        };
        data.model_range = Some(range);
    }
}

fn append_region(cx: &mut UpcastContext<'_>, layout_path: &[usize], content: Vec<Node>) {
    if let Err(err) = cx.writer().append(editable_with(content), layout_path) {
        tracing::warn!(target: "plate_layout::upcast", %err, ?layout_path, "region insertion failed");
    }
}
