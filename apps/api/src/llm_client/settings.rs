//! Provider/model settings: environment defaults plus a runtime override cell.
//!
//! The cell is the only place overrides live. Handlers call `active()` once per
//! request and pass the resulting `LlmSettings` value down explicitly.

use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    Ollama,
    #[serde(rename = "openai")]
    OpenAi,
}

impl Provider {
    /// Parses a provider name; unknown names fall back to Ollama with a warning.
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "openai" => Provider::OpenAi,
            "ollama" => Provider::Ollama,
            other => {
                warn!("Unknown LLM provider '{other}', falling back to Ollama");
                Provider::Ollama
            }
        }
    }
}

/// Fully resolved settings used to build one provider client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmSettings {
    pub provider: Provider,
    pub base_url: String,
    pub model: String,
    pub embed_model: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
}

/// Per-provider defaults loaded from the environment at startup.
#[derive(Debug, Clone)]
pub struct LlmDefaults {
    pub provider: Provider,
    pub openai_api_key: Option<String>,
    pub ollama_base_url: String,
    pub ollama_model: String,
    pub ollama_embed_model: String,
    pub openai_base_url: String,
    pub openai_model: String,
    pub openai_embed_model: String,
}

impl Default for LlmDefaults {
    fn default() -> Self {
        Self {
            provider: Provider::Ollama,
            openai_api_key: None,
            ollama_base_url: "http://localhost:11434".to_string(),
            ollama_model: "llama3.1".to_string(),
            ollama_embed_model: "nomic-embed-text".to_string(),
            openai_base_url: "https://api.openai.com/v1".to_string(),
            openai_model: "gpt-4o-mini".to_string(),
            openai_embed_model: "text-embedding-3-small".to_string(),
        }
    }
}

/// Session overrides. Unset fields fall back to the active provider's defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LlmOverrides {
    pub provider: Option<String>,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub embed_model: Option<String>,
}

impl LlmDefaults {
    /// Resolves overrides on top of these defaults.
    pub fn resolve(&self, overrides: Option<&LlmOverrides>) -> LlmSettings {
        let empty = LlmOverrides::default();
        let o = overrides.unwrap_or(&empty);

        let provider = o
            .provider
            .as_deref()
            .map(Provider::parse)
            .unwrap_or(self.provider);
        let (base_url, model, embed_model) = match provider {
            Provider::Ollama => (
                &self.ollama_base_url,
                &self.ollama_model,
                &self.ollama_embed_model,
            ),
            Provider::OpenAi => (
                &self.openai_base_url,
                &self.openai_model,
                &self.openai_embed_model,
            ),
        };

        LlmSettings {
            provider,
            base_url: o.base_url.clone().unwrap_or_else(|| base_url.clone()),
            model: o.model.clone().unwrap_or_else(|| model.clone()),
            embed_model: o.embed_model.clone().unwrap_or_else(|| embed_model.clone()),
            api_key: o
                .api_key
                .clone()
                .filter(|k| !k.is_empty())
                .or_else(|| self.openai_api_key.clone()),
        }
    }
}

/// Process-wide holder for runtime overrides, shared through `AppState`.
#[derive(Debug)]
pub struct LlmSettingsCell {
    defaults: LlmDefaults,
    overrides: RwLock<Option<LlmOverrides>>,
}

impl LlmSettingsCell {
    pub fn new(defaults: LlmDefaults) -> Self {
        Self {
            defaults,
            overrides: RwLock::new(None),
        }
    }

    pub fn set(&self, overrides: LlmOverrides) {
        let mut guard = self.overrides.write().unwrap_or_else(|e| e.into_inner());
        *guard = Some(overrides);
        info!("Runtime LLM settings overridden");
    }

    pub fn clear(&self) {
        let mut guard = self.overrides.write().unwrap_or_else(|e| e.into_inner());
        *guard = None;
        info!("Runtime LLM settings cleared");
    }

    /// The settings a new request should use right now.
    pub fn active(&self) -> LlmSettings {
        let guard = self.overrides.read().unwrap_or_else(|e| e.into_inner());
        self.defaults.resolve(guard.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_resolve_to_ollama() {
        let settings = LlmDefaults::default().resolve(None);
        assert_eq!(settings.provider, Provider::Ollama);
        assert_eq!(settings.base_url, "http://localhost:11434");
        assert_eq!(settings.model, "llama3.1");
        assert_eq!(settings.embed_model, "nomic-embed-text");
    }

    #[test]
    fn test_switching_provider_picks_provider_defaults() {
        let overrides = LlmOverrides {
            provider: Some("OpenAI".to_string()),
            ..Default::default()
        };
        let settings = LlmDefaults::default().resolve(Some(&overrides));
        assert_eq!(settings.provider, Provider::OpenAi);
        assert_eq!(settings.base_url, "https://api.openai.com/v1");
        assert_eq!(settings.model, "gpt-4o-mini");
        assert_eq!(settings.embed_model, "text-embedding-3-small");
    }

    #[test]
    fn test_unknown_provider_falls_back_to_ollama() {
        assert_eq!(Provider::parse("anthropic"), Provider::Ollama);
    }

    #[test]
    fn test_explicit_fields_win() {
        let overrides = LlmOverrides {
            model: Some("mistral".to_string()),
            base_url: Some("http://gpu-box:11434".to_string()),
            api_key: Some("sk-test".to_string()),
            ..Default::default()
        };
        let settings = LlmDefaults::default().resolve(Some(&overrides));
        assert_eq!(settings.model, "mistral");
        assert_eq!(settings.base_url, "http://gpu-box:11434");
        assert_eq!(settings.api_key.as_deref(), Some("sk-test"));
        assert_eq!(settings.embed_model, "nomic-embed-text");
    }

    #[test]
    fn test_cell_set_and_clear() {
        let cell = LlmSettingsCell::new(LlmDefaults::default());
        cell.set(LlmOverrides {
            provider: Some("openai".to_string()),
            ..Default::default()
        });
        assert_eq!(cell.active().provider, Provider::OpenAi);
        cell.clear();
        assert_eq!(cell.active().provider, Provider::Ollama);
    }

    #[test]
    fn test_api_key_not_serialized() {
        let settings = LlmSettings {
            api_key: Some("secret".to_string()),
            ..LlmDefaults::default().resolve(None)
        };
        let json = serde_json::to_string(&settings).unwrap();
        assert!(!json.contains("secret"));
    }
}
