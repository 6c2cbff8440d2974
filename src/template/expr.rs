//! Value expressions used in resource properties and outputs
//!
//! An [`Expr`] is either a literal JSON value or one of the CloudFormation
//! intrinsic functions that point at another declared entity. Expressions
//! serialize to the provider's JSON form (`{"Ref": ...}`,
//! `{"Fn::GetAtt": [...]}`, ...) and parse back from it.

use indexmap::IndexMap;
use serde::de::{self, Deserialize, Deserializer};
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Number, Value};
use thiserror::Error;

use super::sub;

/// Errors raised while reading an intrinsic function from JSON
#[derive(Debug, Error, PartialEq)]
pub enum ExprError {
    #[error("malformed {function}: {reason}")]
    InvalidIntrinsic {
        function: &'static str,
        reason: String,
    },
}

impl ExprError {
    fn invalid(function: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidIntrinsic {
            function,
            reason: reason.into(),
        }
    }
}

/// A property or output value
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    List(Vec<Expr>),
    Map(IndexMap<String, Expr>),
    /// `{"Ref": name}`
    Ref(String),
    /// `{"Fn::GetAtt": [resource, attribute]}`
    GetAtt { resource: String, attribute: String },
    /// `{"Fn::Sub": template}` or `{"Fn::Sub": [template, variables]}`
    Sub {
        template: String,
        variables: IndexMap<String, Expr>,
    },
    /// `{"Fn::Join": [delimiter, values]}`
    Join { delimiter: String, values: Box<Expr> },
    /// `{"Fn::Base64": value}`
    Base64(Box<Expr>),
}

/// A reference from an expression to a declared entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    Ref(String),
    GetAtt { resource: String, attribute: String },
}

impl Reference {
    /// The logical name this reference points at
    pub fn target(&self) -> &str {
        match self {
            Reference::Ref(name) => name,
            Reference::GetAtt { resource, .. } => resource,
        }
    }
}

impl Expr {
    pub fn reference(name: impl Into<String>) -> Self {
        Expr::Ref(name.into())
    }

    pub fn get_att(resource: impl Into<String>, attribute: impl Into<String>) -> Self {
        Expr::GetAtt {
            resource: resource.into(),
            attribute: attribute.into(),
        }
    }

    pub fn sub(template: impl Into<String>) -> Self {
        Expr::Sub {
            template: template.into(),
            variables: IndexMap::new(),
        }
    }

    pub fn sub_with(template: impl Into<String>, variables: IndexMap<String, Expr>) -> Self {
        Expr::Sub {
            template: template.into(),
            variables,
        }
    }

    pub fn join(delimiter: impl Into<String>, values: Vec<Expr>) -> Self {
        Expr::Join {
            delimiter: delimiter.into(),
            values: Box::new(Expr::List(values)),
        }
    }

    pub fn base64(value: impl Into<Expr>) -> Self {
        Expr::Base64(Box::new(value.into()))
    }

    /// Build a list from anything convertible into expressions
    pub fn list<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Expr>,
    {
        Expr::List(items.into_iter().map(Into::into).collect())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Expr::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Expr]> {
        match self {
            Expr::List(items) => Some(items),
            _ => None,
        }
    }

    /// Look up a key when this expression is a map
    pub fn get(&self, key: &str) -> Option<&Expr> {
        match self {
            Expr::Map(map) => map.get(key),
            _ => None,
        }
    }

    /// Collect every reference this expression makes, in document order
    pub fn references(&self) -> Vec<Reference> {
        let mut found = Vec::new();
        self.collect_references(&mut found);
        found
    }

    fn collect_references(&self, found: &mut Vec<Reference>) {
        match self {
            Expr::Null | Expr::Bool(_) | Expr::Number(_) | Expr::String(_) => {}
            Expr::List(items) => {
                for item in items {
                    item.collect_references(found);
                }
            }
            Expr::Map(map) => {
                for value in map.values() {
                    value.collect_references(found);
                }
            }
            Expr::Ref(name) => found.push(Reference::Ref(name.clone())),
            Expr::GetAtt {
                resource,
                attribute,
            } => found.push(Reference::GetAtt {
                resource: resource.clone(),
                attribute: attribute.clone(),
            }),
            Expr::Sub {
                template,
                variables,
            } => {
                for placeholder in sub::placeholders(template) {
                    // Names bound in the variable map are local to this Fn::Sub
                    if variables.contains_key(&placeholder.body()) {
                        continue;
                    }
                    found.push(match placeholder.attribute {
                        Some(attribute) => Reference::GetAtt {
                            resource: placeholder.name.to_string(),
                            attribute: attribute.to_string(),
                        },
                        None => Reference::Ref(placeholder.name.to_string()),
                    });
                }
                for value in variables.values() {
                    value.collect_references(found);
                }
            }
            Expr::Join { values, .. } => values.collect_references(found),
            Expr::Base64(inner) => inner.collect_references(found),
        }
    }
}

impl From<&str> for Expr {
    fn from(value: &str) -> Self {
        Expr::String(value.to_string())
    }
}

impl From<String> for Expr {
    fn from(value: String) -> Self {
        Expr::String(value)
    }
}

impl From<bool> for Expr {
    fn from(value: bool) -> Self {
        Expr::Bool(value)
    }
}

impl From<i64> for Expr {
    fn from(value: i64) -> Self {
        Expr::Number(value.into())
    }
}

impl<T: Into<Expr>> From<Vec<T>> for Expr {
    fn from(items: Vec<T>) -> Self {
        Expr::list(items)
    }
}

impl From<IndexMap<String, Expr>> for Expr {
    fn from(map: IndexMap<String, Expr>) -> Self {
        Expr::Map(map)
    }
}

impl Serialize for Expr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Expr::Null => serializer.serialize_unit(),
            Expr::Bool(b) => serializer.serialize_bool(*b),
            Expr::Number(n) => n.serialize(serializer),
            Expr::String(s) => serializer.serialize_str(s),
            Expr::List(items) => items.serialize(serializer),
            Expr::Map(map) => map.serialize(serializer),
            Expr::Ref(name) => single_entry(serializer, "Ref", name),
            Expr::GetAtt {
                resource,
                attribute,
            } => single_entry(serializer, "Fn::GetAtt", &[resource, attribute]),
            Expr::Sub {
                template,
                variables,
            } => {
                if variables.is_empty() {
                    single_entry(serializer, "Fn::Sub", template)
                } else {
                    single_entry(serializer, "Fn::Sub", &(template, variables))
                }
            }
            Expr::Join { delimiter, values } => {
                single_entry(serializer, "Fn::Join", &(delimiter, values))
            }
            Expr::Base64(inner) => single_entry(serializer, "Fn::Base64", inner),
        }
    }
}

fn single_entry<S, V>(serializer: S, key: &str, value: &V) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    V: Serialize + ?Sized,
{
    let mut map = serializer.serialize_map(Some(1))?;
    map.serialize_entry(key, value)?;
    map.end()
}

impl<'de> Deserialize<'de> for Expr {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Expr::try_from(value).map_err(de::Error::custom)
    }
}

impl TryFrom<Value> for Expr {
    type Error = ExprError;

    fn try_from(value: Value) -> Result<Self, ExprError> {
        Ok(match value {
            Value::Null => Expr::Null,
            Value::Bool(b) => Expr::Bool(b),
            Value::Number(n) => Expr::Number(n),
            Value::String(s) => Expr::String(s),
            Value::Array(items) => Expr::List(
                items
                    .into_iter()
                    .map(Expr::try_from)
                    .collect::<Result<_, _>>()?,
            ),
            Value::Object(map) => {
                let mut entries = map.into_iter();
                match (entries.next(), entries.next()) {
                    (Some((key, inner)), None) => from_single_entry(key, inner)?,
                    (first, second) => {
                        let mut out = IndexMap::new();
                        for (key, inner) in first.into_iter().chain(second).chain(entries) {
                            out.insert(key, Expr::try_from(inner)?);
                        }
                        Expr::Map(out)
                    }
                }
            }
        })
    }
}

fn from_single_entry(key: String, inner: Value) -> Result<Expr, ExprError> {
    match key.as_str() {
        "Ref" => match inner {
            Value::String(name) => Ok(Expr::Ref(name)),
            other => Err(ExprError::invalid(
                "Ref",
                format!("expected a logical name, found {other}"),
            )),
        },
        "Fn::GetAtt" => parse_get_att(inner),
        "Fn::Sub" => parse_sub(inner),
        "Fn::Join" => parse_join(inner),
        "Fn::Base64" => Ok(Expr::Base64(Box::new(Expr::try_from(inner)?))),
        _ => {
            let mut map = IndexMap::new();
            map.insert(key, Expr::try_from(inner)?);
            Ok(Expr::Map(map))
        }
    }
}

fn parse_get_att(inner: Value) -> Result<Expr, ExprError> {
    match inner {
        Value::String(dotted) => match dotted.split_once('.') {
            Some((resource, attribute)) => Ok(Expr::get_att(resource, attribute)),
            None => Err(ExprError::invalid(
                "Fn::GetAtt",
                format!("'{dotted}' is not of the form Resource.Attribute"),
            )),
        },
        Value::Array(items) => match items.as_slice() {
            [Value::String(resource), Value::String(attribute)] => {
                Ok(Expr::get_att(resource.as_str(), attribute.as_str()))
            }
            _ => Err(ExprError::invalid(
                "Fn::GetAtt",
                "expected [resource, attribute]",
            )),
        },
        other => Err(ExprError::invalid(
            "Fn::GetAtt",
            format!("expected a list or dotted string, found {other}"),
        )),
    }
}

fn parse_sub(inner: Value) -> Result<Expr, ExprError> {
    match inner {
        Value::String(template) => Ok(Expr::sub(template)),
        Value::Array(items) if items.len() == 2 => {
            let mut items = items.into_iter();
            match (items.next(), items.next()) {
                (Some(Value::String(template)), Some(Value::Object(variables))) => {
                    let mut bound = IndexMap::new();
                    for (name, value) in variables {
                        bound.insert(name, Expr::try_from(value)?);
                    }
                    Ok(Expr::sub_with(template, bound))
                }
                _ => Err(ExprError::invalid(
                    "Fn::Sub",
                    "expected [template, {variables}]",
                )),
            }
        }
        other => Err(ExprError::invalid(
            "Fn::Sub",
            format!("expected a string or [template, variables], found {other}"),
        )),
    }
}

fn parse_join(inner: Value) -> Result<Expr, ExprError> {
    match inner {
        Value::Array(items) if items.len() == 2 => {
            let mut items = items.into_iter();
            match (items.next(), items.next()) {
                (Some(Value::String(delimiter)), Some(values)) => Ok(Expr::Join {
                    delimiter,
                    values: Box::new(Expr::try_from(values)?),
                }),
                _ => Err(ExprError::invalid(
                    "Fn::Join",
                    "expected [delimiter, values]",
                )),
            }
        }
        _ => Err(ExprError::invalid(
            "Fn::Join",
            "expected [delimiter, values]",
        )),
    }
}
