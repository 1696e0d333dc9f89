// Model catalog: provider classification of chat model ids

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Provider {
    OpenAI,
    Anthropic,
    Google,
    Meta,
    Mistral,
    DeepSeek,
    XAi,
    Alibaba,
    Other,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::OpenAI => "OpenAI",
            Provider::Anthropic => "Anthropic",
            Provider::Google => "Google",
            Provider::Meta => "Meta",
            Provider::Mistral => "Mistral",
            Provider::DeepSeek => "DeepSeek",
            Provider::XAi => "xAI",
            Provider::Alibaba => "Alibaba",
            Provider::Other => "Other",
        }
    }

    /// Case-insensitive inverse of `as_str`
    pub fn parse(name: &str) -> Option<Self> {
        PATTERNS
            .iter()
            .map(|(provider, _)| *provider)
            .chain(std::iter::once(Provider::Other))
            .find(|p| p.as_str().eq_ignore_ascii_case(name.trim()))
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

// First match wins
static PATTERNS: Lazy<Vec<(Provider, Regex)>> = Lazy::new(|| {
    [
        (Provider::OpenAI, r"(?i)gpt|o1|o3|chatgpt"),
        (Provider::Anthropic, r"(?i)claude"),
        (Provider::Google, r"(?i)gemini|gemma"),
        (Provider::Meta, r"(?i)llama"),
        (Provider::Mistral, r"(?i)mistral|mixtral"),
        (Provider::DeepSeek, r"(?i)deepseek"),
        (Provider::XAi, r"(?i)grok"),
        (Provider::Alibaba, r"(?i)qwen"),
    ]
    .into_iter()
    .map(|(provider, pattern)| (provider, Regex::new(pattern).expect("static pattern")))
    .collect()
});

pub fn classify(model_id: &str) -> Provider {
    PATTERNS
        .iter()
        .find(|(_, pattern)| pattern.is_match(model_id))
        .map(|(provider, _)| *provider)
        .unwrap_or(Provider::Other)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelInfo {
    pub id: String,
    pub provider: Provider,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelCatalog {
    models: Vec<ModelInfo>,
}

impl ModelCatalog {
    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let models = ids
            .into_iter()
            .map(|id| {
                let id = id.into();
                ModelInfo {
                    provider: classify(&id),
                    id,
                }
            })
            .collect();
        Self { models }
    }

    pub fn models(&self) -> &[ModelInfo] {
        &self.models
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Providers present in the catalog, by name
    pub fn providers(&self) -> Vec<Provider> {
        let present: BTreeSet<&'static str> =
            self.models.iter().map(|m| m.provider.as_str()).collect();
        present.into_iter().filter_map(Provider::parse).collect()
    }

    /// Models of one provider, or all of them for `None`
    pub fn filter(&self, provider: Option<Provider>) -> Vec<&ModelInfo> {
        self.models
            .iter()
            .filter(|m| provider.map_or(true, |p| m.provider == p))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_classify_known_families() {
        let cases = [
            ("gpt-4o-mini", Provider::OpenAI),
            ("o3-mini", Provider::OpenAI),
            ("claude-3-5-sonnet", Provider::Anthropic),
            ("gemini-1.5-pro", Provider::Google),
            ("gemma-2-9b", Provider::Google),
            ("meta-llama/llama-3.1-70b", Provider::Meta),
            ("mixtral-8x7b", Provider::Mistral),
            ("deepseek-chat", Provider::DeepSeek),
            ("grok-beta", Provider::XAi),
            ("qwen-2.5-coder", Provider::Alibaba),
            ("phi-3", Provider::Other),
        ];
        for (id, expected) in cases {
            assert_eq!(classify(id), expected, "{}", id);
        }
    }

    #[test]
    fn test_catalog_providers_and_filter() {
        let catalog = ModelCatalog::from_ids(["gpt-4o", "claude-3-opus", "gpt-4o-mini", "phi-3"]);
        assert_eq!(
            catalog.providers(),
            vec![Provider::Anthropic, Provider::OpenAI, Provider::Other]
        );
        let openai: Vec<&str> = catalog
            .filter(Some(Provider::OpenAI))
            .iter()
            .map(|m| m.id.as_str())
            .collect();
        assert_eq!(openai, vec!["gpt-4o", "gpt-4o-mini"]);
        assert_eq!(catalog.filter(None).len(), 4);
    }

    #[test]
    fn test_provider_parse() {
        assert_eq!(Provider::parse("xai"), Some(Provider::XAi));
        assert_eq!(Provider::parse(" OpenAI "), Some(Provider::OpenAI));
        assert_eq!(Provider::parse("other"), Some(Provider::Other));
        assert_eq!(Provider::parse("acme"), None);
    }
}
