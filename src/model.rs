use regex::Regex;
use serde::{Deserialize, Deserializer};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("duplicate field id: '{0}'")]
    DuplicateField(String),
    #[error("field at index {0} has an empty id")]
    EmptyFieldId(usize),
    #[error("reading schema {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing YAML schema: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("parsing JSON schema: {0}")]
    Json(#[from] serde_json::Error),
}

/// Control type a field is rendered with. Unrecognized tags fall back to `text`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Renderer {
    Select,
    Multiselect,
    Textarea,
    Checkbox,
    Number,
    Radio,
    File,
    Date,
    Switch,
    #[default]
    #[serde(other)]
    Text,
}

impl Renderer {
    /// Checkbox and switch carry their label inline.
    pub fn inline_label(self) -> bool {
        matches!(self, Renderer::Checkbox | Renderer::Switch)
    }
}

/// One selectable option. Accepts either a bare primitive or `{label, value}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawOption")]
pub struct OptionItem {
    pub label: String,
    pub value: JsonValue,
}

impl OptionItem {
    pub fn new(label: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawOption {
    Labeled { label: String, value: JsonValue },
    Plain(JsonValue),
}

impl From<RawOption> for OptionItem {
    fn from(raw: RawOption) -> Self {
        match raw {
            RawOption::Labeled { label, value } => OptionItem { label, value },
            RawOption::Plain(value) => {
                let label = match &value {
                    JsonValue::String(s) => s.clone(),
                    other => other.to_string(),
                };
                OptionItem { label, value }
            }
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldProps {
    // select / multiselect
    #[serde(default)]
    pub data: Vec<OptionItem>,
    // radio
    #[serde(default)]
    pub options: Vec<OptionItem>,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default)]
    pub step: Option<f64>,
    #[serde(default)]
    pub min_rows: Option<usize>,
    #[serde(default)]
    pub searchable: bool,
    #[serde(default)]
    pub accept: Option<String>,
    #[serde(default)]
    pub multiple: bool,
}

impl FieldProps {
    /// Option list for choice renderers; `data` wins over `options` when both are set.
    pub fn choices(&self) -> &[OptionItem] {
        if self.data.is_empty() {
            &self.options
        } else {
            &self.data
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VisibilityOp {
    Equals,
    In,
    NotEquals,
    NotIn,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VisibilityRule {
    pub field: String,
    pub op: VisibilityOp,
    #[serde(default)]
    pub value: JsonValue,
}

impl VisibilityRule {
    pub fn equals(field: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        Self {
            field: field.into(),
            op: VisibilityOp::Equals,
            value: value.into(),
        }
    }

    pub fn one_of<I, V>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<JsonValue>,
    {
        Self {
            field: field.into(),
            op: VisibilityOp::In,
            value: JsonValue::Array(values.into_iter().map(Into::into).collect()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum VisibleWhen {
    One(VisibilityRule),
    All(Vec<VisibilityRule>),
}

impl VisibleWhen {
    pub fn rules(&self) -> &[VisibilityRule] {
        match self {
            VisibleWhen::One(rule) => std::slice::from_ref(rule),
            VisibleWhen::All(rules) => rules,
        }
    }
}

/// `required: true` uses the default message, a string is the message itself.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Required {
    Flag(bool),
    Message(String),
}

pub const REQUIRED_MESSAGE: &str = "This field is required";

impl Required {
    pub fn message(&self) -> Option<&str> {
        match self {
            Required::Flag(true) => Some(REQUIRED_MESSAGE),
            Required::Flag(false) => None,
            Required::Message(m) => Some(m),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Limit<T> {
    pub value: T,
    #[serde(default)]
    pub message: Option<String>,
}

impl<T> Limit<T> {
    pub fn new(value: T, message: impl Into<String>) -> Self {
        Self {
            value,
            message: Some(message.into()),
        }
    }

    pub fn message_or(&self, fallback: impl FnOnce() -> String) -> String {
        self.message.clone().unwrap_or_else(fallback)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PatternRule {
    #[serde(deserialize_with = "deserialize_regex")]
    pub value: Regex,
    #[serde(default)]
    pub message: Option<String>,
}

fn deserialize_regex<'de, D>(d: D) -> Result<Regex, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(d)?;
    Regex::new(&s).map_err(serde::de::Error::custom)
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSet {
    #[serde(default)]
    pub required: Option<Required>,
    #[serde(default)]
    pub min_length: Option<Limit<usize>>,
    #[serde(default)]
    pub max_length: Option<Limit<usize>>,
    #[serde(default)]
    pub pattern: Option<PatternRule>,
    #[serde(default)]
    pub min: Option<Limit<f64>>,
    #[serde(default)]
    pub max: Option<Limit<f64>>,
    #[serde(default)]
    pub min_items: Option<Limit<usize>>,
    /// Name of a custom validator registered with the controller.
    #[serde(default)]
    pub validate: Option<String>,
}

impl RuleSet {
    pub fn is_required(&self) -> bool {
        self.required
            .as_ref()
            .and_then(Required::message)
            .is_some()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldNode {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub renderer: Renderer,
    #[serde(default)]
    pub input_type: Option<String>,
    #[serde(default)]
    pub placeholder: Option<String>,
    #[serde(default)]
    pub rules: Option<RuleSet>,
    #[serde(default)]
    pub props: FieldProps,
    #[serde(default)]
    pub default_value: Option<JsonValue>,
    #[serde(default)]
    pub visible_when: Option<VisibleWhen>,
}

impl FieldNode {
    pub fn new(id: impl Into<String>, label: impl Into<String>, renderer: Renderer) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            renderer,
            ..Default::default()
        }
    }

    pub fn with_rules(mut self, rules: RuleSet) -> Self {
        self.rules = Some(rules);
        self
    }

    pub fn with_options(mut self, options: Vec<OptionItem>) -> Self {
        self.props.data = options;
        self
    }

    pub fn with_default(mut self, value: impl Into<JsonValue>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn visible_when(mut self, rule: VisibilityRule) -> Self {
        self.visible_when = Some(VisibleWhen::One(rule));
        self
    }

    pub fn is_required(&self) -> bool {
        self.rules.as_ref().map(RuleSet::is_required).unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum LayoutNode {
    Field {
        #[serde(rename = "fieldId", alias = "field_id")]
        field_id: String,
    },
    Stack {
        #[serde(default)]
        spacing: Option<u16>,
        #[serde(default)]
        children: Vec<LayoutNode>,
    },
    Grid {
        #[serde(default)]
        cols: Option<u16>,
        #[serde(default)]
        spacing: Option<u16>,
        #[serde(default)]
        children: Vec<LayoutNode>,
    },
    Section {
        #[serde(default)]
        title: Option<String>,
        #[serde(default)]
        children: Vec<LayoutNode>,
    },
    #[serde(other)]
    Unknown,
}

impl LayoutNode {
    pub fn field(id: impl Into<String>) -> Self {
        LayoutNode::Field { field_id: id.into() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FormMeta {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub subtitle: Option<String>,
}

#[derive(Deserialize)]
struct RawSchema {
    #[serde(default)]
    id: String,
    #[serde(default)]
    meta: FormMeta,
    fields: Vec<FieldNode>,
    #[serde(default)]
    layout: Vec<LayoutNode>,
}

/// Declarative form description. Field ids are unique; an empty layout
/// renders every field in declaration order.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "RawSchema")]
pub struct FormSchema {
    pub id: String,
    pub meta: FormMeta,
    fields: Vec<FieldNode>,
    index: HashMap<String, usize>,
    layout: Vec<LayoutNode>,
}

impl TryFrom<RawSchema> for FormSchema {
    type Error = SchemaError;

    fn try_from(raw: RawSchema) -> Result<Self, Self::Error> {
        let mut schema = FormSchema::new(raw.id, raw.fields, raw.layout)?;
        schema.meta = raw.meta;
        Ok(schema)
    }
}

impl FormSchema {
    pub fn new(
        id: impl Into<String>,
        fields: Vec<FieldNode>,
        layout: Vec<LayoutNode>,
    ) -> Result<Self, SchemaError> {
        let mut index = HashMap::new();
        for (i, f) in fields.iter().enumerate() {
            if f.id.is_empty() {
                return Err(SchemaError::EmptyFieldId(i));
            }
            if index.insert(f.id.clone(), i).is_some() {
                return Err(SchemaError::DuplicateField(f.id.clone()));
            }
        }
        let layout = if layout.is_empty() {
            vec![LayoutNode::Stack {
                spacing: None,
                children: fields.iter().map(|f| LayoutNode::field(&f.id)).collect(),
            }]
        } else {
            layout
        };
        Ok(Self {
            id: id.into(),
            meta: FormMeta::default(),
            fields,
            index,
            layout,
        })
    }

    pub fn with_meta(mut self, meta: FormMeta) -> Self {
        self.meta = meta;
        self
    }

    pub fn from_yaml_str(s: &str) -> Result<Self, SchemaError> {
        Ok(serde_yaml::from_str(s)?)
    }

    pub fn from_json_str(s: &str) -> Result<Self, SchemaError> {
        Ok(serde_json::from_str(s)?)
    }

    /// Load a schema file; `.json` is parsed as JSON, anything else as YAML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path).map_err(|source| SchemaError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if is_json_path(path) {
            Self::from_json_str(&s)
        } else {
            Self::from_yaml_str(&s)
        }
    }

    pub fn field(&self, id: &str) -> Option<&FieldNode> {
        self.index.get(id).and_then(|i| self.fields.get(*i))
    }

    pub fn fields(&self) -> &[FieldNode] {
        &self.fields
    }

    pub fn layout(&self) -> &[LayoutNode] {
        &self.layout
    }

    pub fn title(&self) -> &str {
        self.meta.title.as_deref().unwrap_or(&self.id)
    }
}

pub fn is_json_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}
