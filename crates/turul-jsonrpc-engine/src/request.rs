use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Parameters for a JSON-RPC request
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RequestParams {
    /// Positional parameters as an array
    Array(Vec<Value>),
    /// Named parameters as an object
    Object(Map<String, Value>),
}

impl From<Map<String, Value>> for RequestParams {
    fn from(map: Map<String, Value>) -> Self {
        RequestParams::Object(map)
    }
}

impl From<Vec<Value>> for RequestParams {
    fn from(vec: Vec<Value>) -> Self {
        RequestParams::Array(vec)
    }
}

/// An outgoing JSON-RPC request, as a client or a test would build it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub id: Option<String>,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub params: Option<RequestParams>,
}

impl JsonRpcRequest {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            jsonrpc: crate::JSONRPC_VERSION.to_string(),
            id: None,
            method: method.into(),
            params: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_params(mut self, params: impl Into<RequestParams>) -> Self {
        self.params = Some(params.into());
        self
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Lower-case JSON type name used in error messages
pub(crate) fn value_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// State of a string member of an incoming envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field<'a> {
    /// Absent, or not a JSON string
    Missing,
    Empty,
    Present(&'a str),
}

/// Read-only view over one incoming request object.
///
/// Nothing is copied or validated up front; the engine inspects members in the
/// order the protocol checks them.
#[derive(Debug, Clone, Copy)]
pub struct RequestEnvelope<'a> {
    object: &'a Map<String, Value>,
}

impl<'a> RequestEnvelope<'a> {
    pub fn new(object: &'a Map<String, Value>) -> Self {
        Self { object }
    }

    pub fn jsonrpc(&self) -> Field<'a> {
        self.string_field("jsonrpc")
    }

    pub fn method(&self) -> Field<'a> {
        self.string_field("method")
    }

    /// The `id` echoed in the response. Numbers are rendered as their decimal
    /// text; any other non-string value yields `None`.
    pub fn id(&self) -> Option<String> {
        match self.object.get("id")? {
            Value::String(id) => Some(id.clone()),
            Value::Number(number) => Some(number.to_string()),
            _ => None,
        }
    }

    pub fn params(&self) -> Option<&'a Value> {
        self.object.get("params")
    }

    fn string_field(&self, key: &str) -> Field<'a> {
        match self.object.get(key) {
            Some(Value::String(value)) if value.is_empty() => Field::Empty,
            Some(Value::String(value)) => Field::Present(value.as_str()),
            _ => Field::Missing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{from_str, json, to_string};

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    #[test]
    fn test_request_serialization() {
        let request = JsonRpcRequest::new("test2")
            .with_id("1")
            .with_params(vec![json!("first"), json!(222)]);

        let json = to_string(&request).unwrap();
        assert_eq!(
            json,
            r#"{"jsonrpc":"2.0","id":"1","method":"test2","params":["first",222]}"#
        );
        let parsed: JsonRpcRequest = from_str(&json).unwrap();
        assert_eq!(parsed, request);
        assert_eq!(
            parsed.params,
            Some(RequestParams::Array(vec![json!("first"), json!(222)]))
        );
    }

    #[test]
    fn test_request_without_optional_members() {
        let request = JsonRpcRequest::new("test1");
        assert_eq!(request.to_value(), json!({"jsonrpc": "2.0", "method": "test1"}));
    }

    #[test]
    fn test_envelope_fields() {
        let map = object(json!({"jsonrpc": "2.0", "method": "", "params": {"e1": 1}}));
        let envelope = RequestEnvelope::new(&map);

        assert_eq!(envelope.jsonrpc(), Field::Present("2.0"));
        assert_eq!(envelope.method(), Field::Empty);
        assert_eq!(envelope.params(), Some(&json!({"e1": 1})));
        assert_eq!(envelope.id(), None);
    }

    #[test]
    fn test_non_string_members_count_as_missing() {
        let map = object(json!({"jsonrpc": 2, "method": ["x"]}));
        let envelope = RequestEnvelope::new(&map);

        assert_eq!(envelope.jsonrpc(), Field::Missing);
        assert_eq!(envelope.method(), Field::Missing);
    }

    #[test]
    fn test_envelope_id_rendering() {
        let cases = [
            (json!({"id": "abc"}), Some("abc")),
            (json!({"id": 42}), Some("42")),
            (json!({"id": null}), None),
            (json!({"id": true}), None),
            (json!({}), None),
        ];
        for (value, expected) in cases {
            let map = object(value);
            assert_eq!(RequestEnvelope::new(&map).id().as_deref(), expected);
        }
    }
}
