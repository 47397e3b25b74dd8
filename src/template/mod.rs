//! Prompt templates for dataset augmentation.
//!
//! A prompt config is selected either by symbolic name, resolved to
//! `<config-dir>/prompts/<name>.yaml` (or the copy bundled into the binary
//! when that file is absent), or by an explicit file path. The
//! template body is parsed once when the [`PromptTemplate`] is built and then
//! rendered for every dataset record.
//!
//! # Example
//!
//! ```ignore
//! use augment_forge::template::{PromptSelection, PromptTemplate};
//!
//! let selection = PromptSelection::from_parts(Some("question_and_answer".into()), None)?;
//! let template = PromptTemplate::load(&selection, "config".as_ref())?;
//! let prompt = template.render(&record, &overrides)?;
//! ```

pub mod schema;

pub use schema::{discover_placeholders, PromptDocument};

use std::collections::BTreeMap;
use std::error::Error as _;
use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use tera::{Context, Tera};

use crate::dataset::DatasetRecord;
use crate::error::{ConfigError, TemplateError};

/// Placeholder bound to the whole dataset record, encoded as compact JSON.
pub const DATASET_ENTRY_KEY: &str = "dataset_entry";

/// Name under which the template body is registered with Tera.
const TEMPLATE_NAME: &str = "prompt";

/// Prompt configs shipped with the binary, used when the config directory
/// has no file for a symbolic name.
const BUNDLED_PROMPTS: &[(&str, &str)] = &[
    (
        "question_and_answer",
        include_str!("../../config/prompts/question_and_answer.yaml"),
    ),
    ("summary", include_str!("../../config/prompts/summary.yaml")),
];

/// Returns the embedded YAML of a bundled prompt config.
pub fn bundled_prompt(name: &str) -> Option<&'static str> {
    BUNDLED_PROMPTS
        .iter()
        .find(|(bundled, _)| *bundled == name)
        .map(|(_, content)| *content)
}

/// Which prompt config to use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptSelection {
    /// Symbolic name resolved against the config directory.
    Name(String),
    /// Explicit path to a prompt document.
    Path(PathBuf),
}

impl PromptSelection {
    /// Builds a selection from the two mutually exclusive inputs.
    ///
    /// Exactly one of `name` and `path` must be given. Empty strings count as
    /// absent.
    pub fn from_parts(name: Option<String>, path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let name = name.filter(|n| !n.trim().is_empty());
        let path = path.filter(|p| !p.as_os_str().is_empty());

        match (name, path) {
            (Some(_), Some(_)) => Err(ConfigError::ConflictingPromptConfig),
            (None, None) => Err(ConfigError::MissingPromptConfig),
            (Some(name), None) => Ok(Self::Name(name)),
            (None, Some(path)) => Ok(Self::Path(path)),
        }
    }

    /// Resolves the selection to a file path.
    pub fn resolve_path(&self, config_dir: &Path) -> PathBuf {
        match self {
            Self::Name(name) => config_dir.join("prompts").join(format!("{}.yaml", name)),
            Self::Path(path) => path.clone(),
        }
    }

    /// Name used to derive output file names: the symbolic name, or the
    /// file stem of an explicit path.
    pub fn config_name(&self) -> String {
        match self {
            Self::Name(name) => name.clone(),
            Self::Path(path) => path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
        }
    }
}

/// A parsed prompt template ready to render records.
pub struct PromptTemplate {
    name: String,
    source: PathBuf,
    document: PromptDocument,
    placeholders: Vec<String>,
    tera: Tera,
}

impl PromptTemplate {
    /// Loads the prompt document for `selection`.
    ///
    /// A symbolic name with no file under `config_dir` falls back to the
    /// bundled prompt of that name, if there is one.
    pub fn load(selection: &PromptSelection, config_dir: &Path) -> Result<Self, TemplateError> {
        let path = selection.resolve_path(config_dir);
        if let PromptSelection::Name(name) = selection {
            if !path.exists() {
                if let Some(content) = bundled_prompt(name) {
                    tracing::debug!(
                        prompt = %name,
                        missing = %path.display(),
                        "Using bundled prompt config"
                    );
                    let label = format!("<bundled>/{}.yaml", name);
                    let document = PromptDocument::from_yaml(content, &label)?;
                    let source = PathBuf::from(label);
                    return Self::from_document(name.clone(), source, document);
                }
            }
        }

        let mut template = Self::from_file(&path)?;
        template.name = selection.config_name();
        Ok(template)
    }

    /// Loads a prompt document from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, TemplateError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(TemplateError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let path_str = path.display().to_string();
        let document = PromptDocument::from_yaml(&content, &path_str)?;
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| path_str.clone());

        Self::from_document(name, path.to_path_buf(), document)
    }

    /// Builds a template from an already parsed document.
    pub fn from_document(
        name: impl Into<String>,
        source: PathBuf,
        document: PromptDocument,
    ) -> Result<Self, TemplateError> {
        let mut tera = Tera::default();
        tera.add_raw_template(TEMPLATE_NAME, &document.template)
            .map_err(|e| TemplateError::InvalidSyntax {
                path: source.display().to_string(),
                message: error_chain(&e),
            })?;

        let placeholders = document.required_placeholders();
        tracing::debug!(
            source = %source.display(),
            placeholders = ?placeholders,
            "Loaded prompt template"
        );

        Ok(Self {
            name: name.into(),
            source,
            document,
            placeholders,
            tera,
        })
    }

    /// Builds a template directly from a template body.
    pub fn from_body(name: impl Into<String>, body: impl Into<String>) -> Result<Self, TemplateError> {
        let name = name.into();
        let document = PromptDocument {
            name: Some(name.clone()),
            description: None,
            expected_inputs: None,
            template: body.into(),
        };
        Self::from_document(name, PathBuf::from("<inline>"), document)
    }

    /// Name of the prompt config.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// File the template was loaded from.
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// The parsed prompt document.
    pub fn document(&self) -> &PromptDocument {
        &self.document
    }

    /// Placeholders that must resolve at render time.
    pub fn placeholders(&self) -> &[String] {
        &self.placeholders
    }

    /// Renders the template for one record.
    ///
    /// Record fields are bound first, then `dataset_entry`, then `overrides`,
    /// so overrides win on key collisions.
    pub fn render(
        &self,
        record: &DatasetRecord,
        overrides: &BTreeMap<String, String>,
    ) -> Result<String, TemplateError> {
        let mut context = Context::new();
        for (key, value) in record.fields() {
            context.insert(key.as_str(), value);
        }
        context.insert(DATASET_ENTRY_KEY, &record.to_json_string());
        for (key, value) in overrides {
            context.insert(key.as_str(), value);
        }

        if let Some(missing) = self
            .placeholders
            .iter()
            .find(|name| !context.contains_key(name.as_str()))
        {
            return Err(TemplateError::MissingPlaceholder {
                name: missing.clone(),
            });
        }

        self.tera
            .render(TEMPLATE_NAME, &context)
            .map_err(classify_render_error)
    }
}

impl std::fmt::Debug for PromptTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptTemplate")
            .field("name", &self.name)
            .field("source", &self.source)
            .field("placeholders", &self.placeholders)
            .finish_non_exhaustive()
    }
}

/// Maps a Tera failure to a missing placeholder when Tera reports an unknown
/// variable, and to a generic render failure otherwise.
fn classify_render_error(err: tera::Error) -> TemplateError {
    let message = error_chain(&err);
    let missing = Regex::new(r"Variable `([^`]+)` not found in context")
        .ok()
        .and_then(|re| re.captures(&message))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string());

    match missing {
        Some(name) => TemplateError::MissingPlaceholder { name },
        None => TemplateError::RenderFailed(message),
    }
}

/// Joins an error with all of its sources.
fn error_chain(err: &tera::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn record(value: serde_json::Value) -> DatasetRecord {
        DatasetRecord::try_from(value).expect("object")
    }

    #[test]
    fn test_selection_requires_exactly_one() {
        assert!(matches!(
            PromptSelection::from_parts(Some("qa".into()), Some(PathBuf::from("qa.yaml"))),
            Err(ConfigError::ConflictingPromptConfig)
        ));
        assert!(matches!(
            PromptSelection::from_parts(None, None),
            Err(ConfigError::MissingPromptConfig)
        ));
        assert!(matches!(
            PromptSelection::from_parts(Some("   ".into()), None),
            Err(ConfigError::MissingPromptConfig)
        ));
        assert_eq!(
            PromptSelection::from_parts(Some("qa".into()), None).expect("name"),
            PromptSelection::Name("qa".into())
        );
    }

    #[test]
    fn test_selection_resolution_and_name() {
        let by_name = PromptSelection::Name("qa".into());
        assert_eq!(
            by_name.resolve_path(Path::new("/etc/augment")),
            PathBuf::from("/etc/augment/prompts/qa.yaml")
        );
        assert_eq!(by_name.config_name(), "qa");

        let by_path = PromptSelection::Path(PathBuf::from("/tmp/prompts/summaries.yaml"));
        assert_eq!(
            by_path.resolve_path(Path::new("/ignored")),
            PathBuf::from("/tmp/prompts/summaries.yaml")
        );
        assert_eq!(by_path.config_name(), "summaries");
    }

    #[test]
    fn test_render_with_record_fields_and_overrides() {
        let template =
            PromptTemplate::from_body("qa", "Title: {{ title }}\n{{ user_supplied_suffix }}")
                .expect("valid template");
        let mut overrides = BTreeMap::new();
        overrides.insert("user_supplied_suffix".to_string(), "Be brief.".to_string());

        let rendered = template
            .render(&record(json!({"title": "Rust"})), &overrides)
            .expect("should render");
        assert_eq!(rendered, "Title: Rust\nBe brief.");
    }

    #[test]
    fn test_overrides_take_precedence_over_record() {
        let template = PromptTemplate::from_body("qa", "{{ topic }}").expect("valid template");
        let mut overrides = BTreeMap::new();
        overrides.insert("topic".to_string(), "override".to_string());

        let rendered = template
            .render(&record(json!({"topic": "from record"})), &overrides)
            .expect("should render");
        assert_eq!(rendered, "override");
    }

    #[test]
    fn test_dataset_entry_renders_whole_record() {
        let template =
            PromptTemplate::from_body("qa", "Context: {{ dataset_entry }}").expect("valid template");
        let rendered = template
            .render(&record(json!({"text": "hello"})), &BTreeMap::new())
            .expect("should render");
        assert_eq!(rendered, r#"Context: {"text":"hello"}"#);
    }

    #[test]
    fn test_missing_placeholder_fails() {
        let template =
            PromptTemplate::from_body("qa", "{{ text }} {{ absent }}").expect("valid template");
        let err = template
            .render(&record(json!({"text": "x"})), &BTreeMap::new())
            .expect_err("absent placeholder");
        match err {
            TemplateError::MissingPlaceholder { name } => assert_eq!(name, "absent"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_renderer_reports_undeclared_variable() {
        let document = PromptDocument {
            name: None,
            description: None,
            expected_inputs: Some(vec![]),
            template: "{{ nowhere }}".to_string(),
        };
        let template = PromptTemplate::from_document("qa", PathBuf::from("<inline>"), document)
            .expect("valid template");
        let err = template
            .render(&record(json!({})), &BTreeMap::new())
            .expect_err("undefined variable");
        assert!(matches!(err, TemplateError::MissingPlaceholder { ref name } if name == "nowhere"));
    }

    #[test]
    fn test_invalid_syntax_fails_at_construction() {
        let err = PromptTemplate::from_body("broken", "{{ unclosed").expect_err("bad syntax");
        assert!(matches!(err, TemplateError::InvalidSyntax { .. }));
    }

    #[test]
    fn test_load_by_name_from_config_dir() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let prompts = temp_dir.path().join("prompts");
        fs::create_dir_all(&prompts).expect("mkdir");
        fs::write(
            prompts.join("qa.yaml"),
            "name: qa\ntemplate: |\n  Q about {{ text }}\n",
        )
        .expect("write");

        let selection = PromptSelection::Name("qa".into());
        let template = PromptTemplate::load(&selection, temp_dir.path()).expect("should load");
        assert_eq!(template.name(), "qa");
        assert_eq!(template.placeholders(), ["text".to_string()]);

        let rendered = template
            .render(&record(json!({"text": "ducks"})), &BTreeMap::new())
            .expect("should render");
        assert_eq!(rendered.trim_end(), "Q about ducks");
    }

    #[test]
    fn test_load_missing_config() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let selection = PromptSelection::Name("nope".into());
        let err = PromptTemplate::load(&selection, temp_dir.path()).expect_err("missing");
        assert!(matches!(err, TemplateError::NotFound(_)));
    }

    #[test]
    fn test_bundled_prompt_loads_without_prompts_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let selection = PromptSelection::Name("question_and_answer".into());
        let template = PromptTemplate::load(&selection, temp_dir.path()).expect("embedded prompt");

        assert_eq!(template.name(), "question_and_answer");
        assert!(template
            .placeholders()
            .contains(&DATASET_ENTRY_KEY.to_string()));
        assert!(bundled_prompt("summary").is_some());
        assert!(bundled_prompt("nope").is_none());
    }

    #[test]
    fn test_config_dir_file_shadows_bundled_prompt() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let prompts = temp_dir.path().join("prompts");
        fs::create_dir_all(&prompts).expect("mkdir");
        fs::write(
            prompts.join("summary.yaml"),
            "template: \"Local {{ text }}\"\n",
        )
        .expect("write");

        let selection = PromptSelection::Name("summary".into());
        let template = PromptTemplate::load(&selection, temp_dir.path()).expect("should load");
        let rendered = template
            .render(&record(json!({"text": "copy"})), &BTreeMap::new())
            .expect("should render");
        assert_eq!(rendered, "Local copy");
    }

    #[test]
    fn test_bundled_question_and_answer_prompt() {
        let config_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("config");
        let selection = PromptSelection::Name("question_and_answer".into());
        let template = PromptTemplate::load(&selection, &config_dir).expect("bundled prompt");

        let mut overrides = BTreeMap::new();
        overrides.insert("user_supplied_suffix".to_string(), "SUFFIX".to_string());
        let rendered = template
            .render(&record(json!({"text": "Paris is in France."})), &overrides)
            .expect("should render");
        assert!(rendered.contains("Paris is in France."));
        assert!(rendered.contains("SUFFIX"));
    }

    #[test]
    fn test_bundled_summary_prompt_discovers_placeholders() {
        let config_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("config");
        let template = PromptTemplate::load(&PromptSelection::Name("summary".into()), &config_dir)
            .expect("bundled prompt");
        assert_eq!(template.placeholders(), ["text", "user_supplied_suffix"]);

        let err = template
            .render(&record(json!({"body": "no text field"})), &BTreeMap::new())
            .expect_err("text is required");
        assert!(matches!(err, TemplateError::MissingPlaceholder { ref name } if name == "text"));
    }
}
