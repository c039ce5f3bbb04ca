use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::columns::LayoutColumnPlugin;
use crate::config::LayoutConfig;
use crate::content::ContentPlugin;
use crate::conversion::{DowncastTable, ElementDowncast, UpcastConverter};
use crate::editable::EditablePlugin;
use crate::editor::Editor;
use crate::error::{CommandError, QueryError, RegistryError};
use crate::model::Document;
use crate::ops::Op;
use crate::schema::{NodeSpec, Schema};

pub type CommandHandler =
    Arc<dyn Fn(&mut Editor, Option<Value>) -> Result<(), CommandError> + Send + Sync>;

pub type QueryHandler = Arc<dyn Fn(&Editor, Option<Value>) -> Result<Value, QueryError> + Send + Sync>;

#[derive(Clone)]
pub struct CommandSpec {
    pub id: String,
    pub label: String,
    pub description: Option<String>,
    pub keywords: Vec<String>,
    pub args_example: Option<Value>,
    pub handler: CommandHandler,
}

impl CommandSpec {
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        handler: impl Fn(&mut Editor, Option<Value>) -> Result<(), CommandError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            description: None,
            keywords: Vec::new(),
            args_example: None,
            handler: Arc::new(handler),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn args_example(mut self, args_example: Value) -> Self {
        self.args_example = Some(args_example);
        self
    }
}

#[derive(Clone)]
pub struct QuerySpec {
    pub id: String,
    pub handler: QueryHandler,
}

impl QuerySpec {
    pub fn new(
        id: impl Into<String>,
        handler: impl Fn(&Editor, Option<Value>) -> Result<Value, QueryError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            handler: Arc::new(handler),
        }
    }
}

/// A named UI trigger that runs a command with fixed arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolbarItem {
    pub id: String,
    pub label: String,
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

pub trait NormalizePass: Send + Sync {
    fn id(&self) -> &'static str;
    fn run(&self, doc: &Document, registry: &PluginRegistry) -> Vec<Op>;
}

pub trait EditorPlugin: Send + Sync {
    fn id(&self) -> &'static str;
    fn node_specs(&self) -> Vec<NodeSpec> {
        Vec::new()
    }
    fn upcast_converters(&self) -> Vec<Box<dyn UpcastConverter>> {
        Vec::new()
    }
    fn downcasts(&self) -> Vec<Box<dyn ElementDowncast>> {
        Vec::new()
    }
    fn normalize_passes(&self) -> Vec<Box<dyn NormalizePass>> {
        Vec::new()
    }
    fn commands(&self) -> Vec<CommandSpec> {
        Vec::new()
    }
    fn queries(&self) -> Vec<QuerySpec> {
        Vec::new()
    }
    fn toolbar_items(&self) -> Vec<ToolbarItem> {
        Vec::new()
    }
}

#[derive(Default)]
pub struct PluginRegistry {
    schema: Schema,
    upcast_converters: Vec<Box<dyn UpcastConverter>>,
    downcasts: DowncastTable,
    normalize_passes: Vec<Box<dyn NormalizePass>>,
    commands: HashMap<String, CommandSpec>,
    queries: HashMap<String, QuerySpec>,
    toolbar_items: Vec<ToolbarItem>,
}

impl PluginRegistry {
    pub fn new(
        plugins: impl IntoIterator<Item = Box<dyn EditorPlugin>>,
    ) -> Result<Self, RegistryError> {
        let mut registry = Self::default();
        for plugin in plugins {
            registry.register_plugin(plugin)?;
        }
        Ok(registry)
    }

    /// Paragraph content, editable regions and the multi-column layout block.
    pub fn layout(config: &LayoutConfig) -> Result<Self, RegistryError> {
        let plugins: Vec<Box<dyn EditorPlugin>> = vec![
            Box::new(ContentPlugin),
            Box::new(EditablePlugin),
            Box::new(LayoutColumnPlugin::new(config)),
        ];
        Self::new(plugins)
    }

    pub fn register_plugin(&mut self, plugin: Box<dyn EditorPlugin>) -> Result<(), RegistryError> {
        tracing::trace!(target: "plate_layout::editor", plugin = plugin.id(), "registering plugin");

        for spec in plugin.node_specs() {
            self.schema.register(spec)?;
        }

        self.upcast_converters.extend(plugin.upcast_converters());

        for converter in plugin.downcasts() {
            self.downcasts.register(converter)?;
        }

        self.normalize_passes.extend(plugin.normalize_passes());

        for cmd in plugin.commands() {
            if self.commands.contains_key(&cmd.id) {
                return Err(RegistryError::DuplicateCommand(cmd.id));
            }
            self.commands.insert(cmd.id.clone(), cmd);
        }

        for query in plugin.queries() {
            if self.queries.contains_key(&query.id) {
                return Err(RegistryError::DuplicateQuery(query.id));
            }
            self.queries.insert(query.id.clone(), query);
        }

        for item in plugin.toolbar_items() {
            if self.toolbar_items.iter().any(|existing| existing.id == item.id) {
                return Err(RegistryError::DuplicateToolbarItem(item.id));
            }
            self.toolbar_items.push(item);
        }

        Ok(())
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn upcast_converters(&self) -> &[Box<dyn UpcastConverter>] {
        &self.upcast_converters
    }

    pub fn downcasts(&self) -> &DowncastTable {
        &self.downcasts
    }

    pub fn normalize_passes(&self) -> &[Box<dyn NormalizePass>] {
        &self.normalize_passes
    }

    pub fn commands(&self) -> &HashMap<String, CommandSpec> {
        &self.commands
    }

    pub fn command(&self, id: &str) -> Option<CommandSpec> {
        self.commands.get(id).cloned()
    }

    pub fn query(&self, id: &str) -> Option<QuerySpec> {
        self.queries.get(id).cloned()
    }

    pub fn toolbar_items(&self) -> &[ToolbarItem] {
        &self.toolbar_items
    }

    pub fn toolbar_item(&self, id: &str) -> Option<&ToolbarItem> {
        self.toolbar_items.iter().find(|item| item.id == id)
    }

    pub fn normalize(&self, doc: &Document) -> Vec<Op> {
        let mut ops: Vec<Op> = Vec::new();
        for pass in &self.normalize_passes {
            let pass_ops = pass.run(doc, self);
            if !pass_ops.is_empty() {
                tracing::trace!(target: "plate_layout::editor", pass = pass.id(), ops = pass_ops.len(), "normalize pass produced ops");
                // Later passes see a stale tree; the editor reruns until quiet.
                ops.extend(pass_ops);
                break;
            }
        }
        ops
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Twice;

    impl EditorPlugin for Twice {
        fn id(&self) -> &'static str {
            "twice"
        }

        fn toolbar_items(&self) -> Vec<ToolbarItem> {
            let item = ToolbarItem {
                id: "same".to_string(),
                label: "Same".to_string(),
                command: "noop".to_string(),
                args: None,
                group: None,
            };
            vec![item.clone(), item]
        }
    }

    #[test]
    fn duplicate_toolbar_items_are_rejected() {
        let plugins: Vec<Box<dyn EditorPlugin>> = vec![Box::new(Twice)];
        assert_eq!(
            PluginRegistry::new(plugins).err(),
            Some(RegistryError::DuplicateToolbarItem("same".to_string()))
        );
    }

    #[test]
    fn layout_registry_registers_every_plugin() {
        let registry = PluginRegistry::layout(&LayoutConfig::default()).unwrap();
        assert!(registry.schema().is_known_kind("layout-column"));
        assert!(registry.schema().is_known_kind("layout-editable"));
        assert!(registry.schema().is_known_kind("paragraph"));
        assert!(registry.command("layout-column").is_some());
        assert_eq!(registry.toolbar_items().len(), 2);
    }
}
