//! Declarative description of one callable JSON-RPC method.
//!
//! A [`Registration`] is built once at wiring time and handed to
//! [`HandlerRegistry::register`](crate::registry::HandlerRegistry::register), which
//! compiles it into a ready-to-call handler. Parameter and return types are
//! captured as explicit shapes and type-erased codecs when the descriptors are
//! constructed, so nothing is inferred at call time.
//!
//! ```rust
//! use turul_jsonrpc_engine::kind::ILLEGAL_ARGUMENT;
//! use turul_jsonrpc_engine::registration::{Invocation, Parameter, Registration, ReturnType};
//!
//! let registration = Registration::builder("greet")
//!     .documentation("Says hello")
//!     .param(Parameter::of::<String>("name").required(true))
//!     .returns(ReturnType::of::<String>())
//!     .handles(&ILLEGAL_ARGUMENT, 2)
//!     .invoke(|mut args| match args.arg::<String>(0) {
//!         Ok(name) => Invocation::ready(format!("hello {name}")),
//!         Err(error) => Invocation::failed(error),
//!     })
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(registration.method(), "greet");
//! ```

use std::any::{Any, TypeId, type_name};
use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{HandlerError, JsonRpcException, RegistryError};
use crate::kind::ErrorKind;

/// A type-erased value flowing between the engine and a handler
pub type Output = Box<dyn Any + Send>;

/// Future produced by an asynchronous handler
pub type OutputFuture = BoxFuture<'static, Result<Output, HandlerError>>;

/// The callable behind a registration
pub type Invoker = Arc<dyn Fn(Arguments) -> Invocation + Send + Sync>;

type Decoder = Arc<dyn Fn(&Value) -> Result<Output, serde_json::Error> + Send + Sync>;
type ResultMapper = Arc<dyn Fn(Output) -> Result<Value, HandlerError> + Send + Sync>;

/// Result of calling an [`Invoker`]: either already complete or still running
pub enum Invocation {
    Ready(Result<Output, HandlerError>),
    Pending(OutputFuture),
}

impl Invocation {
    pub fn ready<T: Any + Send>(value: T) -> Self {
        Invocation::Ready(Ok(Box::new(value)))
    }

    pub fn failed(error: impl Into<HandlerError>) -> Self {
        Invocation::Ready(Err(error.into()))
    }

    pub fn from_result<T: Any + Send>(result: Result<T, HandlerError>) -> Self {
        Invocation::Ready(result.map(|value| Box::new(value) as Output))
    }

    pub fn pending<T, F>(future: F) -> Self
    where
        T: Any + Send,
        F: Future<Output = Result<T, HandlerError>> + Send + 'static,
    {
        Invocation::Pending(
            future
                .map(|result| result.map(|value| Box::new(value) as Output))
                .boxed(),
        )
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Invocation::Pending(_))
    }
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Invocation::Ready(Ok(_)) => f.write_str("Invocation::Ready(Ok(..))"),
            Invocation::Ready(Err(error)) => write!(f, "Invocation::Ready(Err({error:?}))"),
            Invocation::Pending(_) => f.write_str("Invocation::Pending(..)"),
        }
    }
}

/// Bound arguments handed to an [`Invoker`], one slot per declared parameter.
///
/// A slot is empty when the parameter was absent (or JSON `null`) and not
/// required. Optional-shaped parameters always fill their slot with an
/// `Option<T>`.
#[derive(Default)]
pub struct Arguments {
    values: Vec<Option<Output>>,
}

impl Arguments {
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn single(value: Option<Output>) -> Self {
        Self {
            values: vec![value],
        }
    }

    pub(crate) fn from_values(values: Vec<Option<Output>>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn is_present(&self, index: usize) -> bool {
        matches!(self.values.get(index), Some(Some(_)))
    }

    /// Take the value at `index`, failing if it is absent
    pub fn arg<T: Any>(&mut self, index: usize) -> Result<T, HandlerError> {
        self.opt_arg(index)?.ok_or_else(|| {
            HandlerError::illegal_argument(format!("Argument #{index} is absent"))
        })
    }

    /// Take the value at `index`; `None` when the slot is empty
    pub fn opt_arg<T: Any>(&mut self, index: usize) -> Result<Option<T>, HandlerError> {
        let Some(slot) = self.values.get_mut(index) else {
            return Err(HandlerError::illegal_argument(format!(
                "No argument #{index}, {} declared",
                self.values.len()
            )));
        };
        match slot.take() {
            None => Ok(None),
            Some(value) => value.downcast::<T>().map(|value| Some(*value)).map_err(|_| {
                HandlerError::illegal_state(format!(
                    "Argument #{index} is not a {}",
                    type_name::<T>()
                ))
            }),
        }
    }
}

impl fmt::Debug for Arguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arguments")
            .field("len", &self.values.len())
            .finish()
    }
}

/// Whether a parameter binds to `T` or to `Option<T>`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamShape {
    Plain,
    Optional,
}

/// One declared parameter of a registration
#[derive(Clone)]
pub struct Parameter {
    name: String,
    position: Option<usize>,
    required: bool,
    shape: ParamShape,
    type_name: &'static str,
    documentation: String,
    decoder: Decoder,
    empty: Option<fn() -> Output>,
}

fn empty_option<T: Send + 'static>() -> Output {
    Box::new(None::<T>)
}

impl Parameter {
    /// A parameter decoded into `T`
    pub fn of<T: DeserializeOwned + Send + 'static>(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            position: None,
            required: false,
            shape: ParamShape::Plain,
            type_name: type_name::<T>(),
            documentation: String::new(),
            decoder: Arc::new(|value: &Value| {
                T::deserialize(value).map(|decoded| Box::new(decoded) as Output)
            }),
            empty: None,
        }
    }

    /// A parameter decoded into `Option<T>`; absence binds `None` and `required` is ignored
    pub fn optional<T: DeserializeOwned + Send + 'static>(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            position: None,
            required: false,
            shape: ParamShape::Optional,
            type_name: type_name::<T>(),
            documentation: String::new(),
            decoder: Arc::new(|value: &Value| {
                Option::<T>::deserialize(value).map(|decoded| Box::new(decoded) as Output)
            }),
            empty: Some(empty_option::<T>),
        }
    }

    /// Explicit index in array-style params; defaults to declaration order
    pub fn at(mut self, position: usize) -> Self {
        self.position = Some(position);
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn documentation(mut self, documentation: impl Into<String>) -> Self {
        self.documentation = documentation.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolved position; set by [`RegistrationBuilder::param`] when not given explicitly
    pub fn position(&self) -> usize {
        self.position.unwrap_or_default()
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn shape(&self) -> ParamShape {
        self.shape
    }

    pub fn is_optional(&self) -> bool {
        self.shape == ParamShape::Optional
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn doc(&self) -> &str {
        &self.documentation
    }

    pub(crate) fn decode(&self, value: &Value) -> Result<Output, serde_json::Error> {
        (self.decoder)(value)
    }

    pub(crate) fn empty_value(&self) -> Option<Output> {
        self.empty.map(|empty| empty())
    }
}

impl fmt::Debug for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parameter")
            .field("name", &self.name)
            .field("position", &self.position)
            .field("required", &self.required)
            .field("shape", &self.shape)
            .field("type_name", &self.type_name)
            .finish()
    }
}

/// Whether a method returns `T` or `Option<T>`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnShape {
    Plain,
    Optional,
}

/// Declared result type of a registration and how to turn it into JSON
#[derive(Clone)]
pub struct ReturnType {
    shape: ReturnShape,
    asynchronous: bool,
    type_name: &'static str,
    mapper: ResultMapper,
}

#[derive(Debug, Clone, Copy)]
enum Leaf {
    Text,
    StaticText,
    Int32,
    Int64,
    Float,
    Serialized,
}

impl Leaf {
    fn of<T: 'static>() -> Self {
        let id = TypeId::of::<T>();
        if id == TypeId::of::<String>() {
            Leaf::Text
        } else if id == TypeId::of::<&'static str>() {
            Leaf::StaticText
        } else if id == TypeId::of::<i32>() {
            Leaf::Int32
        } else if id == TypeId::of::<i64>() {
            Leaf::Int64
        } else if id == TypeId::of::<f64>() {
            Leaf::Float
        } else {
            Leaf::Serialized
        }
    }

    fn to_json<T: Serialize + 'static>(self, value: &T) -> Result<Value, HandlerError> {
        let any = value as &dyn Any;
        let scalar = match self {
            Leaf::Text => any.downcast_ref::<String>().map(|text| Value::String(text.clone())),
            Leaf::StaticText => any.downcast_ref::<&'static str>().map(|text| Value::from(*text)),
            Leaf::Int32 => any.downcast_ref::<i32>().map(|number| Value::from(*number)),
            Leaf::Int64 => any.downcast_ref::<i64>().map(|number| Value::from(*number)),
            Leaf::Float => any.downcast_ref::<f64>().map(|number| Value::from(*number)),
            Leaf::Serialized => None,
        };
        match scalar {
            Some(value) => Ok(value),
            None => Ok(serde_json::to_value(value)?),
        }
    }
}

fn mismatch<T>(expected: &'static str) -> Result<T, HandlerError> {
    Err(JsonRpcException::internal_error(format!("Handler returned a value that is not a {expected}")).into())
}

impl ReturnType {
    /// A method returning `T`
    pub fn of<T: Serialize + Send + 'static>() -> Self {
        let leaf = Leaf::of::<T>();
        let expected = type_name::<T>();
        Self {
            shape: ReturnShape::Plain,
            asynchronous: false,
            type_name: expected,
            mapper: Arc::new(move |output: Output| match output.downcast::<T>() {
                Ok(value) => leaf.to_json(&*value),
                Err(_) => mismatch(expected),
            }),
        }
    }

    /// A method returning `Option<T>`; `None` maps to JSON `null`
    pub fn optional<T: Serialize + Send + 'static>() -> Self {
        let leaf = Leaf::of::<T>();
        let expected = type_name::<Option<T>>();
        Self {
            shape: ReturnShape::Optional,
            asynchronous: false,
            type_name: type_name::<T>(),
            mapper: Arc::new(move |output: Output| match output.downcast::<Option<T>>() {
                Ok(value) => match *value {
                    Some(inner) => leaf.to_json(&inner),
                    None => Ok(Value::Null),
                },
                Err(_) => mismatch(expected),
            }),
        }
    }

    /// A method returning nothing; always maps to JSON `null`
    pub fn void() -> Self {
        Self::of::<()>()
    }

    /// Mark the result as delivered through an asynchronous completion
    pub fn asynchronous(mut self) -> Self {
        self.asynchronous = true;
        self
    }

    pub fn shape(&self) -> ReturnShape {
        self.shape
    }

    pub fn is_asynchronous(&self) -> bool {
        self.asynchronous
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub(crate) fn map(&self, output: Output) -> Result<Value, HandlerError> {
        (self.mapper)(output)
    }
}

impl Default for ReturnType {
    fn default() -> Self {
        Self::of::<Value>()
    }
}

impl fmt::Debug for ReturnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReturnType")
            .field("shape", &self.shape)
            .field("asynchronous", &self.asynchronous)
            .field("type_name", &self.type_name)
            .finish()
    }
}

/// Associates a set of error kinds with a response code
#[derive(Debug, Clone)]
pub struct ExceptionMapping {
    kinds: Vec<&'static ErrorKind>,
    code: i64,
    documentation: String,
}

impl ExceptionMapping {
    pub fn new(kinds: Vec<&'static ErrorKind>, code: i64) -> Self {
        Self {
            kinds,
            code,
            documentation: String::new(),
        }
    }

    pub fn handled(kind: &'static ErrorKind, code: i64) -> Self {
        Self::new(vec![kind], code)
    }

    pub fn documentation(mut self, documentation: impl Into<String>) -> Self {
        self.documentation = documentation.into();
        self
    }

    pub fn kinds(&self) -> &[&'static ErrorKind] {
        &self.kinds
    }

    pub fn code(&self) -> i64 {
        self.code
    }

    pub fn doc(&self) -> &str {
        &self.documentation
    }
}

/// Immutable description of one JSON-RPC method
#[derive(Clone)]
pub struct Registration {
    method: String,
    documentation: String,
    returns: ReturnType,
    invoker: Invoker,
    parameters: Vec<Parameter>,
    exception_mappings: Vec<ExceptionMapping>,
}

impl Registration {
    pub fn builder(method: impl Into<String>) -> RegistrationBuilder {
        RegistrationBuilder::new(method)
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn documentation(&self) -> &str {
        &self.documentation
    }

    pub fn returns(&self) -> &ReturnType {
        &self.returns
    }

    pub fn invoker(&self) -> &Invoker {
        &self.invoker
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn exception_mappings(&self) -> &[ExceptionMapping] {
        &self.exception_mappings
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("method", &self.method)
            .field("returns", &self.returns)
            .field("parameters", &self.parameters)
            .field("exception_mappings", &self.exception_mappings)
            .finish()
    }
}

/// Builder for [`Registration`]
pub struct RegistrationBuilder {
    method: String,
    documentation: String,
    returns: ReturnType,
    invoker: Option<Invoker>,
    parameters: Vec<Parameter>,
    exception_mappings: Vec<ExceptionMapping>,
}

impl RegistrationBuilder {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            documentation: String::new(),
            returns: ReturnType::default(),
            invoker: None,
            parameters: Vec::new(),
            exception_mappings: Vec::new(),
        }
    }

    pub fn documentation(mut self, documentation: impl Into<String>) -> Self {
        self.documentation = documentation.into();
        self
    }

    pub fn returns(mut self, returns: ReturnType) -> Self {
        self.returns = returns;
        self
    }

    /// Append a parameter; its position defaults to its declaration index
    pub fn param(mut self, mut parameter: Parameter) -> Self {
        if parameter.position.is_none() {
            parameter.position = Some(self.parameters.len());
        }
        self.parameters.push(parameter);
        self
    }

    pub fn exception(mut self, mapping: ExceptionMapping) -> Self {
        self.exception_mappings.push(mapping);
        self
    }

    /// Shorthand for a single-kind [`ExceptionMapping`]
    pub fn handles(self, kind: &'static ErrorKind, code: i64) -> Self {
        self.exception(ExceptionMapping::handled(kind, code))
    }

    pub fn invoke<F>(mut self, invoker: F) -> Self
    where
        F: Fn(Arguments) -> Invocation + Send + Sync + 'static,
    {
        self.invoker = Some(Arc::new(invoker));
        self
    }

    pub fn invoker(mut self, invoker: Invoker) -> Self {
        self.invoker = Some(invoker);
        self
    }

    pub fn build(self) -> Result<Registration, RegistryError> {
        if self.method.is_empty() {
            return Err(RegistryError::InvalidRegistration(
                "JSON-RPC method can't be empty".to_string(),
            ));
        }
        let Some(invoker) = self.invoker else {
            return Err(RegistryError::InvalidRegistration(format!(
                "invoker can't be missing for '{}'",
                self.method
            )));
        };
        let mut names = HashSet::with_capacity(self.parameters.len());
        if let Some(duplicate) = self
            .parameters
            .iter()
            .find(|parameter| !names.insert(parameter.name.as_str()))
        {
            return Err(RegistryError::InvalidRegistration(format!(
                "parameter '{}' is declared twice on '{}'",
                duplicate.name, self.method
            )));
        }

        Ok(Registration {
            method: self.method,
            documentation: self.documentation,
            returns: self.returns,
            invoker,
            parameters: self.parameters,
            exception_mappings: self.exception_mappings,
        })
    }
}
