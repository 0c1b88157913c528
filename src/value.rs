//! Loosely-typed records as they come back from the SOAP layer.

use magesoap_util::xml::Element;
use serde_json::{Map, Value as Json};
use thiserror::Error;

/// Key under which open (`xsd:any`) content is exposed, as the raw elements
/// the server sent.
pub const ANY_KEY: &str = "_any";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Null,
    Scalar(String),
    Sequence(Vec<Value>),
    Mapping(Mapping),
    Element(Element),
}

/// Ordered key/value pairs. Keys keep the order the server sent them in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mapping(Vec<(String, Value)>);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Shape {
    #[error("expected {expected}, found {found}")]
    Mismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("missing key `{0}`")]
    MissingKey(String),
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<K: Into<String>>(&mut self, key: K, value: Value) {
        self.0.push((key.into(), value));
    }

    /// First value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Mapping {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(key, value)| (key.into(), value)).collect())
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Scalar(value.to_owned())
    }
}

impl Value {
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Scalar(_) => "scalar",
            Value::Sequence(_) => "sequence",
            Value::Mapping(_) => "mapping",
            Value::Element(_) => "element",
        }
    }

    fn mismatch(&self, expected: &'static str) -> Shape {
        Shape::Mismatch {
            expected,
            found: self.kind(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_scalar(&self) -> Result<&str, Shape> {
        match self {
            Value::Scalar(value) => Ok(value),
            other => Err(other.mismatch("scalar")),
        }
    }

    pub fn as_sequence(&self) -> Result<&[Value], Shape> {
        match self {
            Value::Sequence(items) => Ok(items),
            other => Err(other.mismatch("sequence")),
        }
    }

    pub fn as_mapping(&self) -> Result<&Mapping, Shape> {
        match self {
            Value::Mapping(mapping) => Ok(mapping),
            other => Err(other.mismatch("mapping")),
        }
    }

    pub fn get(&self, key: &str) -> Result<&Value, Shape> {
        self.as_mapping()?
            .get(key)
            .ok_or_else(|| Shape::MissingKey(key.to_owned()))
    }

    /// Text of a scalar or raw element. Null reads as empty text.
    pub fn text(&self) -> Result<String, Shape> {
        match self {
            Value::Null => Ok(String::new()),
            Value::Scalar(value) => Ok(value.clone()),
            Value::Element(element) => Ok(element.text_content()),
            other => Err(other.mismatch("text")),
        }
    }

    /// Text stored under `key`, or empty text when it is absent or not text.
    pub fn field(&self, key: &str) -> String {
        self.get(key)
            .and_then(Value::text)
            .map(|text| text.trim().to_owned())
            .unwrap_or_default()
    }

    pub fn to_json(&self) -> Json {
        match self {
            Value::Null => Json::Null,
            Value::Scalar(value) => Json::String(value.clone()),
            Value::Sequence(items) => Json::Array(items.iter().map(Value::to_json).collect()),
            Value::Mapping(mapping) => Json::Object(
                mapping
                    .iter()
                    .map(|(key, value)| (key.to_owned(), value.to_json()))
                    .collect::<Map<_, _>>(),
            ),
            Value::Element(element) => {
                let mut object = Map::new();
                object.insert(
                    element.local_name().to_owned(),
                    Json::String(element.text_content()),
                );
                Json::Object(object)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> Value {
        Value::Mapping(Mapping::from_iter([
            ("code", Value::from("color")),
            ("required", Value::Null),
            ("options", Value::Sequence(vec![Value::from("red"), Value::from("blue")])),
        ]))
    }

    #[test]
    fn accessors_report_shape_mismatches() {
        let record = record();

        assert_eq!(record.get("code").unwrap().as_scalar(), Ok("color"));
        assert_eq!(record.get("options").unwrap().as_sequence().unwrap().len(), 2);
        assert_eq!(
            record.get("missing"),
            Err(Shape::MissingKey("missing".into()))
        );
        assert_eq!(
            record.get("options").unwrap().as_scalar(),
            Err(Shape::Mismatch {
                expected: "scalar",
                found: "sequence"
            })
        );
        assert!(Value::from("x").get("code").is_err());
    }

    #[test]
    fn fields_are_lenient() {
        let record = record();

        assert_eq!(record.field("code"), "color");
        assert_eq!(record.field("required"), "");
        assert_eq!(record.field("options"), "");
        assert_eq!(record.field("missing"), "");
    }

    #[test]
    fn raw_elements_read_as_their_text() {
        let element = Element::new("item")
            .with_child(Element::new("key").with_text("set_id"))
            .with_child(Element::new("value").with_text("4"));

        assert_eq!(Value::Element(element).text(), Ok("set_id4".to_owned()));
    }

    #[test]
    fn converts_to_json_in_order() {
        let json = record().to_json();
        assert_eq!(
            json.to_string(),
            r#"{"code":"color","required":null,"options":["red","blue"]}"#
        );
    }
}
