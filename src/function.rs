// function.rs
use crate::error::{InvocationError, SetupError};
use crate::message::FunctionCall;
use cli_log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Executable body of a registered function: raw argument text in, result text out.
pub type FunctionHandler = Arc<dyn Fn(&str) -> Result<String, InvocationError> + Send + Sync>;

/// JSON type expected for a function parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterKind {
    String,
    Integer,
    Number,
    Boolean,
}

impl ParameterKind {
    /// JSON type name, as shown to models.
    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterKind::String => "string",
            ParameterKind::Integer => "integer",
            ParameterKind::Number => "number",
            ParameterKind::Boolean => "boolean",
        }
    }

    fn accepts(&self, value: &Value) -> bool {
        match self {
            ParameterKind::String => value.is_string(),
            ParameterKind::Integer => value.is_i64() || value.is_u64(),
            ParameterKind::Number => value.is_number(),
            ParameterKind::Boolean => value.is_boolean(),
        }
    }
}

impl fmt::Display for ParameterKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let kind = match self {
            ParameterKind::String => "a string",
            ParameterKind::Integer => "an integer",
            ParameterKind::Number => "a number",
            ParameterKind::Boolean => "a boolean",
        };
        write!(f, "{}", kind)
    }
}

/// One named argument of a function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub kind: ParameterKind,
    pub required: bool,
    #[serde(default)]
    pub description: String,
}

/// Name, description and argument shape of a callable function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Vec<Parameter>,
}

impl FunctionDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
        }
    }

    /// Adds a required parameter.
    pub fn param(
        mut self,
        name: impl Into<String>,
        kind: ParameterKind,
        description: impl Into<String>,
    ) -> Self {
        self.parameters.push(Parameter {
            name: name.into(),
            kind,
            required: true,
            description: description.into(),
        });
        self
    }

    /// Adds an optional parameter.
    pub fn optional_param(
        mut self,
        name: impl Into<String>,
        kind: ParameterKind,
        description: impl Into<String>,
    ) -> Self {
        self.parameters.push(Parameter {
            name: name.into(),
            kind,
            required: false,
            description: description.into(),
        });
        self
    }

    /// Checks raw argument text against the declared parameters.
    ///
    /// Empty text counts as an empty object. Undeclared keys are ignored.
    pub fn check_arguments(&self, text: &str) -> Result<Arguments, InvocationError> {
        let args = Arguments::parse(text)?;
        for parameter in &self.parameters {
            match args.values.get(&parameter.name) {
                None | Some(Value::Null) if parameter.required => {
                    return Err(InvocationError::MissingArgument(parameter.name.clone()));
                }
                Some(value) if !value.is_null() && !parameter.kind.accepts(value) => {
                    return Err(InvocationError::WrongArgumentType {
                        name: parameter.name.clone(),
                        expected: parameter.kind.to_string(),
                    });
                }
                _ => {}
            }
        }
        Ok(args)
    }
}

/// Parsed function arguments with typed accessors for handlers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    values: Map<String, Value>,
}

impl Arguments {
    /// Parses argument text into a JSON object.
    pub fn parse(text: &str) -> Result<Self, InvocationError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(values)) => Ok(Self { values }),
            Ok(other) => Err(InvocationError::MalformedArguments(format!(
                "expected a JSON object, got `{}`",
                other
            ))),
            Err(e) => Err(InvocationError::MalformedArguments(e.to_string())),
        }
    }

    pub fn str(&self, name: &str) -> Result<&str, InvocationError> {
        self.value(name)?
            .as_str()
            .ok_or_else(|| Self::wrong_type(name, ParameterKind::String))
    }

    pub fn i64(&self, name: &str) -> Result<i64, InvocationError> {
        self.value(name)?
            .as_i64()
            .ok_or_else(|| Self::wrong_type(name, ParameterKind::Integer))
    }

    pub fn f64(&self, name: &str) -> Result<f64, InvocationError> {
        self.value(name)?
            .as_f64()
            .ok_or_else(|| Self::wrong_type(name, ParameterKind::Number))
    }

    pub fn bool(&self, name: &str) -> Result<bool, InvocationError> {
        self.value(name)?
            .as_bool()
            .ok_or_else(|| Self::wrong_type(name, ParameterKind::Boolean))
    }

    fn value(&self, name: &str) -> Result<&Value, InvocationError> {
        self.values
            .get(name)
            .ok_or_else(|| InvocationError::MissingArgument(name.to_string()))
    }

    fn wrong_type(name: &str, kind: ParameterKind) -> InvocationError {
        InvocationError::WrongArgumentType {
            name: name.to_string(),
            expected: kind.to_string(),
        }
    }
}

#[derive(Clone)]
struct RegisteredFunction {
    definition: FunctionDefinition,
    handler: FunctionHandler,
}

/// Functions an agent exposes, keyed by name.
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, RegisteredFunction>,
    /// Registration order, for stable listings.
    order: Vec<String>,
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("functions", &self.order)
            .finish()
    }
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler under the definition's name.
    ///
    /// # Returns
    /// * `Err(SetupError::DuplicateFunction)` if the name is already taken.
    pub fn register<F>(&mut self, definition: FunctionDefinition, handler: F) -> Result<(), SetupError>
    where
        F: Fn(&str) -> Result<String, InvocationError> + Send + Sync + 'static,
    {
        let name = definition.name.clone();
        if self.functions.contains_key(&name) {
            return Err(SetupError::DuplicateFunction(name));
        }
        debug!("registered function {}", name);
        self.order.push(name.clone());
        self.functions.insert(
            name,
            RegisteredFunction {
                definition,
                handler: Arc::new(handler),
            },
        );
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Definitions in registration order.
    pub fn definitions(&self) -> Vec<&FunctionDefinition> {
        self.order
            .iter()
            .filter_map(|name| self.functions.get(name))
            .map(|function| &function.definition)
            .collect()
    }

    /// Runs the function named by `call` with its raw arguments.
    pub fn invoke(&self, call: &FunctionCall) -> Result<String, InvocationError> {
        let function = self
            .functions
            .get(&call.name)
            .ok_or_else(|| InvocationError::UnknownFunction(call.name.clone()))?;
        function.definition.check_arguments(&call.arguments)?;
        (function.handler)(&call.arguments)
    }
}
