use serde::{Deserialize, Serialize};

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    pub model: ModelConfig,
    pub storage: StorageConfig,
    /// Static role/behavior instructions prepended to the knowledge base
    pub instructions: String,
    /// Tool round-trips allowed within one turn
    pub max_tool_rounds: usize,
}

impl ArchiveConfig {
    /// Clamp values a hand-edited or older saved config may carry.
    pub fn normalized(mut self) -> Self {
        self.max_tool_rounds = self.max_tool_rounds.max(1);
        self
    }
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            model: ModelConfig::default(),
            storage: StorageConfig::default(),
            instructions: DEFAULT_INSTRUCTIONS.to_string(),
            max_tool_rounds: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub provider: ModelProvider,
    pub model: String,
    pub api_key: String,
    pub api_base: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: ModelProvider::Gemini,
            model: ModelProvider::Gemini.default_model().to_string(),
            api_key: String::new(),
            api_base: None,
            temperature: 0.7,
            max_tokens: 4096,
        }
    }
}

impl ModelConfig {
    pub fn base_url(&self) -> String {
        self.api_base
            .as_deref()
            .filter(|b| !b.trim().is_empty())
            .unwrap_or_else(|| self.provider.default_base_url())
            .trim_end_matches('/')
            .to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelProvider {
    Gemini,
    OpenAI,
    DeepSeek,
    Custom,
}

impl ModelProvider {
    pub fn default_base_url(&self) -> &str {
        match self {
            ModelProvider::Gemini => "https://generativelanguage.googleapis.com",
            ModelProvider::OpenAI => "https://api.openai.com",
            ModelProvider::DeepSeek => "https://api.deepseek.com",
            ModelProvider::Custom => "",
        }
    }

    pub fn default_model(&self) -> &str {
        match self {
            ModelProvider::Gemini => "gemini-2.5-flash",
            ModelProvider::OpenAI => "gpt-4o-mini",
            ModelProvider::DeepSeek => "deepseek-chat",
            ModelProvider::Custom => "",
        }
    }

    /// Speaks the OpenAI chat completions protocol
    pub fn is_openai_compatible(&self) -> bool {
        !matches!(self, ModelProvider::Gemini)
    }

    pub fn all() -> &'static [ModelProvider] {
        &[
            ModelProvider::Gemini,
            ModelProvider::OpenAI,
            ModelProvider::DeepSeek,
            ModelProvider::Custom,
        ]
    }

    pub fn label(&self) -> &str {
        match self {
            ModelProvider::Gemini => "Gemini",
            ModelProvider::OpenAI => "OpenAI",
            ModelProvider::DeepSeek => "DeepSeek",
            ModelProvider::Custom => "Custom (OpenAI-compatible)",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackendType,
    /// Key the document list is stored under
    pub archive_key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackendType::Auto,
            archive_key: DEFAULT_ARCHIVE_KEY.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageBackendType {
    /// Auto-detect best available backend
    Auto,
    Memory,
    LocalStorage,
}

pub const DEFAULT_ARCHIVE_KEY: &str = "archive:documents";
pub const CONFIG_STORAGE_KEY: &str = "archive:config";

pub const DEFAULT_INSTRUCTIONS: &str = r#"### ROLE & OBJECTIVE
You are the Archive, a personal knowledge assistant. Your purpose is to retrieve,
summarize and maintain the professional records stored in the knowledge base below.
You are efficient, precise and professional.

### CORE BEHAVIORS
1. **Brand Guardian:** Match the tone described in the positioning documents.
2. **Source Citation:** When stating facts, cite the source file (e.g. [Ref: /Bio/Main_Bio.md]).
3. **Constructive Gaps:** If a topic is not in the archive, say the record is missing and suggest where it should be added.
4. **Saving Notes:** When asked to save or file new material, call `create_file` with an absolute path (starting with `/`), a category and the full markdown body. If the call is rejected, explain why and propose a different path.
5. **Formatting:** Use Markdown. Bold key terms.

### PERSONALITY
- Be concise.
"#;
