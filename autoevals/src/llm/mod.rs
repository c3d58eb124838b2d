//! Model-graded scorers.

pub mod classifier;
pub mod registry;
pub mod render;
pub mod thread;
pub mod tools;

pub use classifier::{ChoiceScores, LlmClassifier, LlmClassifierBuilder, OpenAiClassifier};
pub use registry::{ClassifierOverrides, ModelGradedSpec, TemplateRegistry, template_file_stem};
pub use render::render_template;
pub use tools::{SELECT_CHOICE_TOOL, build_classification_tools};
