//! The template document and its declarations

use std::fmt;
use std::marker::PhantomData;

use indexmap::IndexMap;
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use super::builder::TemplateBuilder;
use super::expr::Expr;
use crate::error::TemplateError;

/// Format version written when none is given
pub const DEFAULT_FORMAT_VERSION: &str = "2010-09-09";

/// Parameter attribute understood by the stack tooling but not by the provider
pub const USE_PREVIOUS_VALUE: &str = "UsePreviousValue";

/// Type of a template parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterType {
    String,
    Number,
    NumberList,
    CommaDelimitedList,
    /// Provider-specific types such as `AWS::EC2::VPC::Id`
    Other(String),
}

impl ParameterType {
    pub fn as_str(&self) -> &str {
        match self {
            ParameterType::String => "String",
            ParameterType::Number => "Number",
            ParameterType::NumberList => "List<Number>",
            ParameterType::CommaDelimitedList => "CommaDelimitedList",
            ParameterType::Other(other) => other,
        }
    }
}

impl From<&str> for ParameterType {
    fn from(value: &str) -> Self {
        match value {
            "String" => ParameterType::String,
            "Number" => ParameterType::Number,
            "List<Number>" => ParameterType::NumberList,
            "CommaDelimitedList" => ParameterType::CommaDelimitedList,
            other => ParameterType::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ParameterType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ParameterType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(ParameterType::from(raw.as_str()))
    }
}

/// Attributes of a template parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    #[serde(rename = "Description", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "Type")]
    pub param_type: ParameterType,
    #[serde(rename = "Default", default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(rename = "AllowedValues", default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_values: Vec<Value>,
    #[serde(rename = "NoEcho", default, skip_serializing_if = "is_false")]
    pub no_echo: bool,
    /// Keep the deployed value on update unless explicitly overridden
    #[serde(rename = "UsePreviousValue", default, skip_serializing_if = "is_false")]
    pub use_previous_value: bool,
    /// Constraints such as `MinLength` or `AllowedPattern`, kept verbatim
    #[serde(flatten)]
    pub attributes: IndexMap<String, Value>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl Parameter {
    pub fn new(param_type: ParameterType) -> Self {
        Self {
            description: None,
            param_type,
            default: None,
            allowed_values: Vec::new(),
            no_echo: false,
            use_previous_value: false,
            attributes: IndexMap::new(),
        }
    }

    /// A `String` parameter
    pub fn string() -> Self {
        Self::new(ParameterType::String)
    }

    /// A `Number` parameter
    pub fn number() -> Self {
        Self::new(ParameterType::Number)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_allowed_values<I, T>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        self.allowed_values = values.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_no_echo(mut self, no_echo: bool) -> Self {
        self.no_echo = no_echo;
        self
    }

    pub fn with_use_previous_value(mut self, use_previous: bool) -> Self {
        self.use_previous_value = use_previous;
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

/// Export block of an output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Export {
    #[serde(rename = "Name")]
    pub name: Expr,
}

/// A template output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Output {
    #[serde(rename = "Description", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "Value")]
    pub value: Expr,
    #[serde(rename = "Export", default, skip_serializing_if = "Option::is_none")]
    pub export: Option<Export>,
    /// `Condition` and anything else not modelled above
    #[serde(flatten)]
    pub attributes: IndexMap<String, Value>,
}

impl Output {
    pub fn new(value: impl Into<Expr>) -> Self {
        Self {
            description: None,
            value: value.into(),
            export: None,
            attributes: IndexMap::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_export(mut self, name: impl Into<Expr>) -> Self {
        self.export = Some(Export { name: name.into() });
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

/// A resource declaration: provider type tag plus opaque properties
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    #[serde(rename = "Type")]
    pub type_tag: String,
    #[serde(rename = "Properties", default, skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, Expr>,
    #[serde(
        rename = "DependsOn",
        default,
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "one_or_many"
    )]
    pub depends_on: Vec<String>,
    /// Resource attributes such as `DeletionPolicy`, `Condition` or
    /// `Metadata`, passed through untouched
    #[serde(flatten)]
    pub attributes: IndexMap<String, Value>,
}

impl Resource {
    pub fn new(type_tag: impl Into<String>) -> Self {
        Self {
            type_tag: type_tag.into(),
            properties: IndexMap::new(),
            depends_on: Vec::new(),
            attributes: IndexMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Expr>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn with_properties(mut self, properties: IndexMap<String, Expr>) -> Self {
        self.properties.extend(properties);
        self
    }

    pub fn with_dependency(mut self, name: impl Into<String>) -> Self {
        self.depends_on.push(name.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// `DeletionPolicy`: `Delete`, `Retain` or `Snapshot`
    pub fn with_deletion_policy(self, policy: impl Into<String>) -> Self {
        self.with_attribute("DeletionPolicy", policy.into())
    }
}

/// `DependsOn` accepts a single name or a list
fn one_or_many<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(name) => vec![name],
        OneOrMany::Many(names) => names,
    })
}

/// A finalized template.
///
/// Only [`TemplateBuilder::finalize`] produces one, so every reference in it
/// resolves and every logical name is unique. It cannot be mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Template {
    #[serde(rename = "AWSTemplateFormatVersion")]
    format_version: String,
    #[serde(rename = "Description", skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    /// `Metadata`, `Mappings`, `Conditions`, `Transform` and other sections
    #[serde(flatten)]
    sections: IndexMap<String, Value>,
    #[serde(rename = "Parameters", skip_serializing_if = "IndexMap::is_empty")]
    parameters: IndexMap<String, Parameter>,
    #[serde(rename = "Outputs", skip_serializing_if = "IndexMap::is_empty")]
    outputs: IndexMap<String, Output>,
    #[serde(rename = "Resources")]
    resources: IndexMap<String, Resource>,
}

impl Template {
    pub(crate) fn assemble(
        format_version: String,
        description: Option<String>,
        sections: IndexMap<String, Value>,
        parameters: IndexMap<String, Parameter>,
        outputs: IndexMap<String, Output>,
        resources: IndexMap<String, Resource>,
    ) -> Self {
        Self {
            format_version,
            description,
            sections,
            parameters,
            outputs,
            resources,
        }
    }

    /// Parse a template from JSON and run it through the builder checks
    pub fn from_json(source: &str) -> Result<Self, TemplateError> {
        let raw: RawTemplate = serde_json::from_str(source)?;

        let mut builder = TemplateBuilder::new().with_format_version(raw.format_version);
        if let Some(description) = raw.description {
            builder = builder.with_description(description);
        }
        for (name, section) in raw.sections {
            builder = builder.with_section(name, section);
        }
        for (name, parameter) in raw.parameters.0 {
            builder.declare_parameter(name, parameter)?;
        }
        for (name, resource) in raw.resources.0 {
            builder.declare_resource(name, resource)?;
        }
        for (name, output) in raw.outputs.0 {
            builder.declare_output(name, output)?;
        }
        builder.finalize()
    }

    pub fn format_version(&self) -> &str {
        &self.format_version
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Top-level sections other than parameters, outputs and resources
    pub fn sections(&self) -> &IndexMap<String, Value> {
        &self.sections
    }

    pub fn section(&self, name: &str) -> Option<&Value> {
        self.sections.get(name)
    }

    pub fn parameters(&self) -> &IndexMap<String, Parameter> {
        &self.parameters
    }

    pub fn outputs(&self) -> &IndexMap<String, Output> {
        &self.outputs
    }

    pub fn resources(&self) -> &IndexMap<String, Resource> {
        &self.resources
    }

    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.get(name)
    }

    pub fn output(&self, name: &str) -> Option<&Output> {
        self.outputs.get(name)
    }

    pub fn resource(&self, name: &str) -> Option<&Resource> {
        self.resources.get(name)
    }

    /// Whether creating this stack needs `CAPABILITY_IAM`
    pub fn requires_iam_capability(&self) -> bool {
        self.resources
            .values()
            .any(|r| r.type_tag.starts_with("AWS::IAM::"))
    }

    /// Serialize the full model, including stack-tooling attributes
    pub fn to_json(&self, pretty: bool) -> Result<String, serde_json::Error> {
        if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        }
    }

    /// The document as the provider expects it.
    ///
    /// `UsePreviousValue` is excised from parameters; it is honoured at
    /// update time instead.
    pub fn to_provider_value(&self) -> Result<Value, serde_json::Error> {
        let mut value = serde_json::to_value(self)?;
        if let Some(Value::Object(parameters)) = value.get_mut("Parameters") {
            for parameter in parameters.values_mut() {
                if let Value::Object(attributes) = parameter {
                    attributes.remove(USE_PREVIOUS_VALUE);
                }
            }
        }
        Ok(value)
    }

    pub fn to_provider_json(&self, pretty: bool) -> Result<String, serde_json::Error> {
        let value = self.to_provider_value()?;
        if pretty {
            serde_json::to_string_pretty(&value)
        } else {
            serde_json::to_string(&value)
        }
    }
}

/// Template JSON before validation
#[derive(Deserialize)]
struct RawTemplate {
    #[serde(rename = "AWSTemplateFormatVersion", default = "default_format_version")]
    format_version: String,
    #[serde(rename = "Description", default)]
    description: Option<String>,
    #[serde(rename = "Parameters", default)]
    parameters: Entries<Parameter>,
    #[serde(rename = "Outputs", default)]
    outputs: Entries<Output>,
    #[serde(rename = "Resources", default)]
    resources: Entries<Resource>,
    #[serde(flatten)]
    sections: IndexMap<String, Value>,
}

fn default_format_version() -> String {
    DEFAULT_FORMAT_VERSION.to_string()
}

/// Object entries in source order, keeping repeated keys so the builder can
/// reject them
struct Entries<T>(Vec<(String, T)>);

impl<T> Default for Entries<T> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Entries<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor<T>(PhantomData<T>);

        impl<'de, T: Deserialize<'de>> Visitor<'de> for EntriesVisitor<T> {
            type Value = Entries<T>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object of named declarations")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::new();
                while let Some((name, value)) = access.next_entry::<String, T>()? {
                    entries.push((name, value));
                }
                Ok(Entries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor(PhantomData))
    }
}
