mod columns;
mod config;
mod content;
mod conversion;
mod editable;
mod editor;
mod error;
mod model;
mod ops;
mod plugin;
mod schema;
mod view;
mod widget;
mod writer;

pub use crate::columns::*;
pub use crate::config::*;
pub use crate::content::*;
pub use crate::conversion::*;
pub use crate::editable::*;
pub use crate::editor::*;
pub use crate::error::*;
pub use crate::model::*;
pub use crate::ops::*;
pub use crate::plugin::*;
pub use crate::schema::*;
pub use crate::view::*;
pub use crate::widget::*;
pub use crate::writer::*;
