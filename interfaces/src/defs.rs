use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Opaque pagination token handed out by a collection endpoint.
/// It is passed back verbatim and never inspected.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Cursor {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Cursor {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// `200` body of every collection endpoint.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CollectionResponse<T> {
    pub results: Vec<T>,
    #[serde(default)]
    pub next: Option<Cursor>,
    #[serde(default)]
    pub count: Option<u64>,
}

/// `4xx`/`5xx` body carrying a single message.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

/// Field name -> messages, as returned by validation endpoints.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
enum FieldMessages {
    One(String),
    Many(Vec<String>),
}

/// Either error shape a non-2xx response may carry.
#[derive(Clone, Debug)]
pub enum ErrorResponse {
    Detail(ErrorBody),
    Fields(FieldErrors),
}

impl ErrorResponse {
    /// Parses a non-2xx body. Anything unrecognised becomes a `Detail`
    /// holding the raw text so nothing the backend said is lost.
    pub fn parse(body: &str) -> Self {
        if let Ok(detail) = serde_json::from_str::<ErrorBody>(body) {
            return Self::Detail(detail);
        }
        if let Ok(fields) = serde_json::from_str::<BTreeMap<String, FieldMessages>>(body) {
            let errors = fields
                .into_iter()
                .map(|(field, messages)| match messages {
                    FieldMessages::One(message) => (field, vec![message]),
                    FieldMessages::Many(messages) => (field, messages),
                })
                .collect();
            return Self::Fields(errors);
        }
        Self::Detail(ErrorBody {
            detail: body.trim().to_string(),
        })
    }
}

/// Describes one collection endpoint: where it lives and which query
/// parameter names it documents for each recognised filter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionEndpointSpec {
    pub path: String,
    /// filter name -> query parameter name; unmapped filters use their own name.
    #[serde(default)]
    pub params: BTreeMap<String, String>,
    #[serde(default = "default_cursor_param")]
    pub cursor_param: String,
}

fn default_cursor_param() -> String {
    "cursor".to_owned()
}

impl CollectionEndpointSpec {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            params: BTreeMap::new(),
            cursor_param: default_cursor_param(),
        }
    }

    pub fn with_param(mut self, filter: impl Into<String>, param: impl Into<String>) -> Self {
        self.params.insert(filter.into(), param.into());
        self
    }

    pub fn with_cursor_param(mut self, param: impl Into<String>) -> Self {
        self.cursor_param = param.into();
        self
    }

    pub fn param_name<'a>(&'a self, filter: &'a str) -> &'a str {
        self.params.get(filter).map(String::as_str).unwrap_or(filter)
    }
}
