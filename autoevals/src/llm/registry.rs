//! Prompt template documents and the registry that turns them into
//! classifiers.

use super::classifier::{ChoiceScores, LlmClassifier};
use crate::config::EvalConfig;
use autoevals_core::{ClientHandle, EvalError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// A packaged model-graded prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelGradedSpec {
    pub prompt: String,
    pub choice_scores: ChoiceScores,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_cot: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl ModelGradedSpec {
    pub fn from_yaml_str(source: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(source)?)
    }

    pub fn from_json_str(source: &str) -> Result<Self> {
        Ok(serde_json::from_str(source)?)
    }

    /// Load a `.yaml`, `.yml` or `.json` document.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&source),
            Some("yaml" | "yml") => Self::from_yaml_str(&source),
            _ => Err(EvalError::Config(format!("unsupported template file: {}", path.display()))),
        }
    }

    /// Classifier builder seeded from this document.
    pub fn classifier(&self, name: impl Into<String>) -> super::classifier::LlmClassifierBuilder {
        let mut builder = LlmClassifier::builder(name, self.prompt.clone(), self.choice_scores.clone());
        if let Some(model) = &self.model {
            builder = builder.model(model.clone());
        }
        if let Some(use_cot) = self.use_cot {
            builder = builder.use_cot(use_cot);
        }
        if let Some(temperature) = self.temperature {
            builder = builder.temperature(temperature);
        }
        if let Some(max_tokens) = self.max_tokens {
            builder = builder.max_tokens(max_tokens);
        }
        builder
    }
}

/// Per-classifier settings applied on top of a template document.
#[derive(Clone, Default)]
pub struct ClassifierOverrides {
    pub model: Option<String>,
    pub use_cot: Option<bool>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub client: Option<ClientHandle>,
    pub config: Option<Arc<EvalConfig>>,
}

/// `ClosedQA` → `closed_q_a`.
pub fn template_file_stem(name: &str) -> String {
    let mut stem = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                stem.push('_');
            }
            stem.extend(c.to_lowercase());
        } else {
            stem.push(c);
        }
    }
    stem
}

/// Template documents keyed by file stem, loaded once.
#[derive(Debug, Clone, Default)]
pub struct TemplateRegistry {
    templates: HashMap<String, ModelGradedSpec>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every `*.yaml`, `*.yml` and `*.json` file in `dir`.
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let mut registry = Self::new();
        for entry in std::fs::read_dir(dir.as_ref())? {
            let path = entry?.path();
            let supported = matches!(
                path.extension().and_then(|ext| ext.to_str()),
                Some("yaml" | "yml" | "json")
            );
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()).filter(|_| supported) else {
                continue;
            };
            let template = ModelGradedSpec::from_path(&path)
                .map_err(|e| EvalError::Config(format!("{}: {e}", path.display())))?;
            tracing::debug!(template = %stem, "loaded prompt template");
            registry.templates.insert(stem.to_string(), template);
        }
        Ok(registry)
    }

    pub fn insert(&mut self, stem: impl Into<String>, template: ModelGradedSpec) {
        self.templates.insert(stem.into(), template);
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Look up by file stem or by PascalCase classifier name.
    pub fn get(&self, name: &str) -> Option<&ModelGradedSpec> {
        self.templates.get(name).or_else(|| self.templates.get(&template_file_stem(name)))
    }

    /// Build the classifier `name` (e.g. `"ClosedQA"`).
    pub fn classifier(&self, name: &str, overrides: ClassifierOverrides) -> Result<LlmClassifier> {
        let template = self
            .get(name)
            .ok_or_else(|| EvalError::Config(format!("no prompt template named {name}")))?;

        let mut builder = template.classifier(name);
        if let Some(model) = overrides.model {
            builder = builder.model(model);
        }
        if let Some(use_cot) = overrides.use_cot {
            builder = builder.use_cot(use_cot);
        }
        if let Some(max_tokens) = overrides.max_tokens {
            builder = builder.max_tokens(max_tokens);
        }
        if let Some(temperature) = overrides.temperature {
            builder = builder.temperature(temperature);
        }
        if let Some(client) = overrides.client {
            builder = builder.client(client);
        }
        if let Some(config) = overrides.config {
            builder = builder.config(config);
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autoevals_core::Scorer;

    const CLOSED_QA: &str = r#"
prompt: |-
  Question: {{input}}
  Answer: {{output}}
  Is the answer correct?
choice_scores:
  "Y": 1.0
  "N": 0.0
model: gpt-4o-mini
use_cot: false
"#;

    #[test]
    fn test_file_stem_conversion() {
        assert_eq!(template_file_stem("ClosedQA"), "closed_q_a");
        assert_eq!(template_file_stem("Factuality"), "factuality");
        assert_eq!(template_file_stem("SQLJudge"), "s_q_l_judge");
    }

    #[test]
    fn test_yaml_document_keeps_choice_order() {
        let template = ModelGradedSpec::from_yaml_str(CLOSED_QA).unwrap();
        let labels: Vec<&str> = template.choice_scores.keys().map(String::as_str).collect();
        assert_eq!(labels, ["Y", "N"]);
        assert_eq!(template.use_cot, Some(false));
        assert!(template.temperature.is_none());
    }

    #[test]
    fn test_registry_builds_named_classifier() {
        let mut registry = TemplateRegistry::new();
        registry.insert("closed_q_a", ModelGradedSpec::from_yaml_str(CLOSED_QA).unwrap());

        let classifier = registry
            .classifier("ClosedQA", ClassifierOverrides { max_tokens: Some(64), ..Default::default() })
            .unwrap();
        assert_eq!(classifier.name(), "ClosedQA");

        let request = classifier
            .classifier()
            .build_request(&autoevals_core::ScorerArgs::new("4").with_arg("input", "2+2"), &EvalConfig::default())
            .unwrap();
        assert_eq!(request.model, "gpt-4o-mini");
        assert_eq!(request.max_tokens, Some(64));
        assert!(request.tools[0].function.parameters["properties"].get("reasons").is_none());

        assert!(matches!(registry.classifier("Missing", Default::default()), Err(EvalError::Config(_))));
    }
}
