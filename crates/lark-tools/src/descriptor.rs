//! Tool descriptors: name, parameter list, and invocation function.

use crate::error::ToolError;
use futures::future::BoxFuture;
use futures::FutureExt;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Named arguments passed to a tool. A `null` value counts as absent.
pub type Arguments = Map<String, Value>;

/// The function a tool runs once its arguments are validated.
pub type InvokeFn =
    Arc<dyn Fn(Arguments) -> BoxFuture<'static, Result<String, ToolError>> + Send + Sync>;

/// JSON type of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
    /// No type constraint, as for `$ref`s and `serde_json::Value` fields.
    Any,
}

impl ParamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Integer => "integer",
            ParamType::Number => "number",
            ParamType::Boolean => "boolean",
            ParamType::Array => "array",
            ParamType::Object => "object",
            ParamType::Any => "any",
        }
    }

    /// Whether `value` is of this type.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            ParamType::String => value.is_string(),
            ParamType::Integer => value.is_i64() || value.is_u64(),
            ParamType::Number => value.is_number(),
            ParamType::Boolean => value.is_boolean(),
            ParamType::Array => value.is_array(),
            ParamType::Object => value.is_object(),
            ParamType::Any => true,
        }
    }

    fn from_schema_type(value: Option<&Value>) -> Self {
        let name = match value {
            Some(Value::String(name)) => Some(name.as_str()),
            // `Option<T>` fields render as ["T", "null"].
            Some(Value::Array(names)) => names
                .iter()
                .filter_map(Value::as_str)
                .find(|name| *name != "null"),
            _ => None,
        };
        match name {
            Some("string") => ParamType::String,
            Some("integer") => ParamType::Integer,
            Some("number") => ParamType::Number,
            Some("boolean") => ParamType::Boolean,
            Some("array") => ParamType::Array,
            Some("object") => ParamType::Object,
            _ => ParamType::Any,
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One named parameter of a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: ParamType,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required: bool,
    /// Value filled in when the argument is absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Allowed values; empty means unrestricted.
    #[serde(default, rename = "enum", skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<Value>,
}

impl Parameter {
    pub fn required(
        name: impl Into<String>,
        param_type: ParamType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            param_type,
            description: description.into(),
            required: true,
            default: None,
            enum_values: Vec::new(),
        }
    }

    pub fn optional(
        name: impl Into<String>,
        param_type: ParamType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            required: false,
            ..Self::required(name, param_type, description)
        }
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_enum<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.enum_values = values.into_iter().map(Into::into).collect();
        self
    }

    fn schema(&self) -> Value {
        let mut schema = json!({ "description": self.description });
        if self.param_type != ParamType::Any {
            schema["type"] = json!(self.param_type.as_str());
        }
        if let Some(default) = &self.default {
            schema["default"] = default.clone();
        }
        if !self.enum_values.is_empty() {
            schema["enum"] = Value::Array(self.enum_values.clone());
        }
        schema
    }
}

/// Where a tool comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    /// Shipped with lark.
    Builtin,
    /// Registered by the embedding application.
    Custom,
}

/// Everything needed to offer a tool to a model and run it.
#[derive(Clone)]
pub struct ToolDescriptor {
    name: String,
    description: String,
    kind: ToolKind,
    parameters: Vec<Parameter>,
    /// Full schema for typed tools; hand-built tools render theirs from
    /// `parameters`.
    schema: Option<Value>,
    invoke: InvokeFn,
}

impl ToolDescriptor {
    /// Create a tool from a parameter list and an async function over the
    /// validated arguments.
    pub fn new<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Vec<Parameter>,
        function: F,
    ) -> Self
    where
        F: Fn(Arguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String, ToolError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            kind: ToolKind::Custom,
            parameters,
            schema: None,
            invoke: Arc::new(move |args| function(args).boxed()),
        }
    }

    /// Create a tool whose parameters come from the `JsonSchema` of `P`.
    ///
    /// Arguments are deserialized into `P` before `function` runs, and its
    /// output is serialized as JSON (strings are returned as-is).
    pub fn typed<P, R, F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        function: F,
    ) -> Self
    where
        P: JsonSchema + DeserializeOwned + Send + 'static,
        R: Serialize + 'static,
        F: Fn(P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, ToolError>> + Send + 'static,
    {
        let schema = object_schema::<P>();
        let parameters = parameters_from_schema(&schema);
        let function = Arc::new(function);
        let invoke: InvokeFn = Arc::new(move |args: Arguments| {
            let function = function.clone();
            async move {
                let params: P = serde_json::from_value(Value::Object(args))
                    .map_err(|e| ToolError::InvalidParameters(e.to_string()))?;
                let output = function(params).await?;
                match serde_json::to_value(output) {
                    Ok(Value::String(text)) => Ok(text),
                    Ok(value) => Ok(value.to_string()),
                    Err(e) => Err(ToolError::ExecutionError(format!(
                        "Failed to serialize tool output: {e}"
                    ))),
                }
            }
            .boxed()
        });

        Self {
            name: name.into(),
            description: description.into(),
            kind: ToolKind::Custom,
            parameters,
            schema: Some(schema),
            invoke,
        }
    }

    pub fn with_kind(mut self, kind: ToolKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn kind(&self) -> ToolKind {
        self.kind
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// JSON Schema object describing the tool's parameters.
    pub fn parameters_schema(&self) -> Value {
        if let Some(schema) = &self.schema {
            return schema.clone();
        }
        let properties: Map<String, Value> = self
            .parameters
            .iter()
            .map(|p| (p.name.clone(), p.schema()))
            .collect();
        let required: Vec<&str> = self
            .parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Check the descriptor itself: a non-empty name and unique parameter names.
    pub fn validate(&self) -> Result<(), ToolError> {
        if self.name.trim().is_empty() {
            return Err(ToolError::InvalidParameters(
                "tool name must not be empty".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for parameter in &self.parameters {
            if !seen.insert(parameter.name.as_str()) {
                return Err(ToolError::InvalidParameters(format!(
                    "tool '{}' declares parameter '{}' twice",
                    self.name, parameter.name
                )));
            }
        }
        Ok(())
    }

    /// Fill defaults and check required parameters, types and enums.
    /// Arguments the descriptor does not declare are passed through.
    pub fn prepare_arguments(&self, mut args: Arguments) -> Result<Arguments, ToolError> {
        args.retain(|_, value| !value.is_null());

        for parameter in &self.parameters {
            let Some(value) = args.get(&parameter.name) else {
                if let Some(default) = &parameter.default {
                    args.insert(parameter.name.clone(), default.clone());
                } else if parameter.required {
                    return Err(ToolError::MissingParameter {
                        tool: self.name.clone(),
                        parameter: parameter.name.clone(),
                    });
                }
                continue;
            };

            if !parameter.param_type.matches(value) {
                return Err(ToolError::InvalidParameters(format!(
                    "parameter '{}' of tool '{}' must be of type {}",
                    parameter.name, self.name, parameter.param_type
                )));
            }
            if !parameter.enum_values.is_empty() && !parameter.enum_values.contains(value) {
                return Err(ToolError::InvalidParameters(format!(
                    "parameter '{}' of tool '{}' must be one of {}",
                    parameter.name,
                    self.name,
                    Value::Array(parameter.enum_values.clone())
                )));
            }
        }
        Ok(args)
    }

    /// Validate `args` and run the tool.
    pub async fn invoke(&self, args: Arguments) -> Result<String, ToolError> {
        let args = self.prepare_arguments(args)?;
        (self.invoke)(args).await
    }
}

impl fmt::Debug for ToolDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}

/// Root schema of `P` without the metadata models do not need.
fn object_schema<P: JsonSchema>() -> Value {
    let mut schema = serde_json::to_value(schemars::schema_for!(P)).unwrap_or_else(|_| json!({}));
    if let Value::Object(map) = &mut schema {
        map.remove("$schema");
        map.remove("title");
        map.entry("type").or_insert_with(|| json!("object"));
        map.entry("properties").or_insert_with(|| json!({}));
    }
    schema
}

fn parameters_from_schema(schema: &Value) -> Vec<Parameter> {
    let required: HashSet<&str> = schema["required"]
        .as_array()
        .map(|names| names.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    let Some(properties) = schema["properties"].as_object() else {
        return Vec::new();
    };
    properties
        .iter()
        .map(|(name, property)| Parameter {
            name: name.clone(),
            param_type: ParamType::from_schema_type(property.get("type")),
            description: property["description"].as_str().unwrap_or_default().to_string(),
            required: required.contains(name.as_str()),
            default: property.get("default").cloned(),
            enum_values: property["enum"].as_array().cloned().unwrap_or_default(),
        })
        .collect()
}
