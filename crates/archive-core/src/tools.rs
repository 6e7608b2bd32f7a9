//! Tool schemas declared to the model at session creation.

use std::collections::HashMap;
use archive_types::tool::{ToolDefinition, ToolParameters, CREATE_FILE};
use serde_json::{json, Map};

/// Registry of capabilities the model may invoke
pub struct ToolRegistry {
    tools: HashMap<String, ToolDefinition>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            tools: HashMap::new(),
        };
        registry.register_builtins();
        registry
    }

    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.get(name)
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().cloned().collect()
    }

    fn register(&mut self, tool: ToolDefinition) {
        self.tools.insert(tool.name.clone(), tool);
    }

    fn register_builtins(&mut self) {
        self.register(Self::create_file_tool());
    }

    fn create_file_tool() -> ToolDefinition {
        let mut props = Map::new();
        props.insert("path".to_string(), json!({
            "type": "string",
            "description": "Absolute archive path starting with '/', e.g. /Notes/Meeting.md"
        }));
        props.insert("category".to_string(), json!({
            "type": "string",
            "description": "Category the document is grouped under, e.g. Notes"
        }));
        props.insert("content".to_string(), json!({
            "type": "string",
            "description": "Full markdown body of the document"
        }));

        ToolDefinition {
            name: CREATE_FILE.to_string(),
            description: "Create a new markdown document in the archive. \
                Fails if a document already exists at the path."
                .to_string(),
            parameters: ToolParameters {
                schema_type: "object".to_string(),
                properties: props,
                required: vec![
                    "path".to_string(),
                    "category".to_string(),
                    "content".to_string(),
                ],
            },
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
