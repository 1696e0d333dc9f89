// Pipeline configuration

use forge_utils::activity::DEFAULT_ACTIVITY_CAPACITY;

/// Instruction sent ahead of every build prompt
pub const SYSTEM_PROMPT: &str = "You are an expert web developer. Create a COMPLETE single HTML file app.
RULES:
- Start with <!DOCTYPE html>
- ALL CSS in <style> tag, ALL JS in <script> tag
- Modern CSS: variables, flexbox/grid, animations, gradients
- Modern JS: ES6+, localStorage, event handling
- Responsive and polished UI
- NO external dependencies
- Return ONLY HTML code";

/// Knobs for the build/deploy pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Model used when a request does not name one
    pub default_model: String,

    /// Sites are served at `https://{subdomain}.{hosting_domain}`
    pub hosting_domain: String,

    /// File name of the generated document inside its directory
    pub index_file: String,

    /// Storage directories are named `{dir_prefix}{timestamp_ms}`
    pub dir_prefix: String,

    /// Characters of the prompt used as title when none is given
    pub title_fallback_chars: usize,

    /// Entries kept in the activity log
    pub activity_capacity: usize,

    pub system_prompt: String,
}

impl PipelineConfig {
    pub fn hosted_url(&self, subdomain: &str) -> String {
        format!("https://{}.{}", subdomain, self.hosting_domain)
    }

    pub fn index_path(&self, dir: &str) -> String {
        format!("{}/{}", dir, self.index_file)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            default_model: "gpt-4o-mini".to_string(),
            hosting_domain: "puter.site".to_string(),
            index_file: "index.html".to_string(),
            dir_prefix: "app_".to_string(),
            title_fallback_chars: 50,
            activity_capacity: DEFAULT_ACTIVITY_CAPACITY,
            system_prompt: SYSTEM_PROMPT.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_config_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.default_model, "gpt-4o-mini");
        assert_eq!(config.title_fallback_chars, 50);
        assert_eq!(config.activity_capacity, 16);
        assert_eq!(config.hosted_url("clock"), "https://clock.puter.site");
        assert_eq!(config.index_path("app_7"), "app_7/index.html");
        assert!(config.system_prompt.contains("NO external dependencies"));
    }
}
