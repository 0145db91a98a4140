//! Concurrent method table.
//!
//! [`HandlerRegistry::register`] compiles a [`Registration`] once into a
//! [`Handler`]: argument binders for array and object style `params`, and an
//! exception mapper built from the declared [`ExceptionMapping`]s. Calls then
//! only pay for lookup and JSON decoding.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use futures::FutureExt;
use futures::future::{self, BoxFuture};
use parking_lot::RwLock;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{HandlerError, JsonRpcException, RegistryError};
use crate::error_codes;
use crate::kind::ErrorKind;
use crate::request::value_type;
use crate::registration::{Arguments, ExceptionMapping, Invocation, Output, Parameter, Registration};
use crate::specification::{MethodSpecification, Specification};

/// Completion of one handler call, already mapped to JSON
pub type HandlerFuture = BoxFuture<'static, Result<Value, HandlerError>>;

type Binder<P> = Box<dyn Fn(&P) -> Result<Arguments, HandlerError> + Send + Sync>;
type SlotBinder<P> = Box<dyn Fn(&P) -> Result<Option<Output>, HandlerError> + Send + Sync>;
type HandlerMap = RwLock<HashMap<String, Arc<Handler>>>;

const NO_PARAMS: &[Value] = &[];

/// Ordered kind → code association; first match wins
#[derive(Debug, Clone, Default)]
struct ExceptionMapper {
    associations: Vec<(&'static ErrorKind, i64)>,
}

impl ExceptionMapper {
    fn compile(mappings: &[ExceptionMapping]) -> Self {
        let mut associations: Vec<(&'static ErrorKind, i64)> = Vec::new();
        for mapping in mappings {
            for kind in mapping.kinds() {
                match associations.iter_mut().find(|(known, _)| *known == *kind) {
                    Some(existing) => existing.1 = mapping.code(),
                    None => associations.push((*kind, mapping.code())),
                }
            }
        }
        Self { associations }
    }

    fn map(&self, error: HandlerError) -> JsonRpcException {
        if let HandlerError::Rpc(exception) = error {
            return exception;
        }
        let code = error
            .kind()
            .and_then(|kind| {
                self.associations
                    .iter()
                    .find(|(handled, _)| kind.is_a(handled))
                    .map(|(_, code)| *code)
            })
            .unwrap_or(error_codes::INTERNAL_ERROR);
        JsonRpcException::new(code, error.to_string())
    }
}

/// A compiled, ready-to-call method
pub struct Handler {
    registration: Registration,
    array_binder: Binder<[Value]>,
    object_binder: Binder<Map<String, Value>>,
    exception_mapper: Arc<ExceptionMapper>,
}

impl Handler {
    fn compile(registration: Registration) -> Self {
        let array_binder = optimize(
            registration
                .parameters()
                .iter()
                .cloned()
                .map(array_slot)
                .collect(),
        );
        let object_binder = optimize(
            registration
                .parameters()
                .iter()
                .cloned()
                .map(object_slot)
                .collect(),
        );
        let exception_mapper = Arc::new(ExceptionMapper::compile(registration.exception_mappings()));

        Self {
            registration,
            array_binder,
            object_binder,
            exception_mapper,
        }
    }

    pub fn method(&self) -> &str {
        self.registration.method()
    }

    pub fn registration(&self) -> &Registration {
        &self.registration
    }

    /// Bind `params`, invoke, and map the outcome.
    ///
    /// Failures raised by the handler come back as [`HandlerError::Rpc`]. Binding
    /// failures are returned as produced: a missing required parameter is already
    /// an `Rpc` error while a decoding failure stays [`HandlerError::Json`].
    pub fn call(&self, params: Option<&Value>) -> HandlerFuture {
        let arguments = match self.bind(params) {
            Ok(arguments) => arguments,
            Err(error) => return future::ready(Err(error)).boxed(),
        };

        match (self.registration.invoker())(arguments) {
            Invocation::Ready(Ok(output)) => {
                future::ready(self.registration.returns().map(output)).boxed()
            }
            Invocation::Ready(Err(error)) => {
                future::ready(Err(self.exception_mapper.map(error).into())).boxed()
            }
            Invocation::Pending(pending) => {
                let returns = self.registration.returns().clone();
                let mapper = Arc::clone(&self.exception_mapper);
                async move {
                    match pending.await {
                        Ok(output) => returns.map(output),
                        Err(error) => Err(mapper.map(error.unwrap_once()).into()),
                    }
                }
                .boxed()
            }
        }
    }

    fn bind(&self, params: Option<&Value>) -> Result<Arguments, HandlerError> {
        match params {
            None | Some(Value::Null) => (self.array_binder)(NO_PARAMS),
            Some(Value::Array(values)) => (self.array_binder)(values.as_slice()),
            Some(Value::Object(values)) => (self.object_binder)(values),
            Some(other) => Err(JsonRpcException::method_not_found(format!(
                "Unsupported params type: {}",
                value_type(other)
            ))
            .into()),
        }
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("method", &self.method())
            .field("exception_mapper", &self.exception_mapper)
            .finish()
    }
}

fn bind(parameter: &Parameter, value: Option<&Value>, label: &str) -> Result<Option<Output>, HandlerError> {
    if parameter.is_optional() {
        return match value {
            Some(value) => Ok(Some(parameter.decode(value)?)),
            None => Ok(parameter.empty_value()),
        };
    }
    match value {
        None if parameter.is_required() => Err(JsonRpcException::method_not_found(format!(
            "Missing {label} parameter."
        ))
        .into()),
        None | Some(Value::Null) => Ok(None),
        Some(value) => Ok(Some(parameter.decode(value)?)),
    }
}

fn array_slot(parameter: Parameter) -> SlotBinder<[Value]> {
    let position = parameter.position();
    let label = format!("#{position}");
    Box::new(move |params: &[Value]| bind(&parameter, params.get(position), &label))
}

fn object_slot(parameter: Parameter) -> SlotBinder<Map<String, Value>> {
    let label = format!("'{}'", parameter.name());
    Box::new(move |params: &Map<String, Value>| bind(&parameter, params.get(parameter.name()), &label))
}

fn optimize<P: ?Sized + 'static>(mut slots: Vec<SlotBinder<P>>) -> Binder<P> {
    match slots.len() {
        0 => Box::new(|_: &P| Ok(Arguments::empty())),
        1 => {
            let slot = slots.remove(0);
            Box::new(move |params: &P| slot(params).map(Arguments::single))
        }
        _ => Box::new(move |params: &P| {
            slots
                .iter()
                .map(|slot| slot(params))
                .collect::<Result<Vec<_>, _>>()
                .map(Arguments::from_values)
        }),
    }
}

/// Name → handler table shared by the engine and the wiring layer
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: Arc<HandlerMap>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile and insert `registration`.
    ///
    /// Fails with [`RegistryError::DuplicateMethod`] when the name is taken; the
    /// existing handler is kept.
    pub fn register(&self, registration: Registration) -> Result<Unregisterable, RegistryError> {
        let method = registration.method().to_string();
        let handler = Arc::new(Handler::compile(registration));

        let mut handlers = self.handlers.write();
        match handlers.entry(method.clone()) {
            Entry::Occupied(_) => {
                warn!(method = %method, "Rejecting duplicate JSON-RPC method registration");
                Err(RegistryError::DuplicateMethod(method))
            }
            Entry::Vacant(slot) => {
                slot.insert(Arc::clone(&handler));
                debug!(method = %method, "Registered JSON-RPC method");
                Ok(Unregisterable {
                    handlers: Arc::downgrade(&self.handlers),
                    method,
                    handler: Arc::downgrade(&handler),
                    closed: AtomicBool::new(false),
                })
            }
        }
    }

    pub fn lookup(&self, method: &str) -> Option<Arc<Handler>> {
        self.handlers.read().get(method).cloned()
    }

    pub fn contains(&self, method: &str) -> bool {
        self.handlers.read().contains_key(method)
    }

    /// Registered method names, sorted
    pub fn methods(&self) -> Vec<String> {
        let mut methods: Vec<String> = self.handlers.read().keys().cloned().collect();
        methods.sort();
        methods
    }

    pub fn len(&self) -> usize {
        self.handlers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.read().is_empty()
    }

    pub fn specification(&self) -> Specification {
        let handlers = self.handlers.read();
        Specification {
            methods: handlers
                .iter()
                .map(|(method, handler)| {
                    (method.clone(), MethodSpecification::from(handler.registration()))
                })
                .collect(),
        }
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("methods", &self.methods())
            .finish()
    }
}

/// Handle returned by [`HandlerRegistry::register`].
///
/// Dropping it leaves the method registered; call [`Unregisterable::close`] to remove it.
#[derive(Debug)]
pub struct Unregisterable {
    handlers: Weak<HandlerMap>,
    method: String,
    handler: Weak<Handler>,
    closed: AtomicBool,
}

impl Unregisterable {
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Remove the registered handler; only the first call has an effect
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let Some(handlers) = self.handlers.upgrade() else {
            return;
        };
        let mut handlers = handlers.write();
        let owned = handlers
            .get(&self.method)
            .is_some_and(|current| Weak::ptr_eq(&Arc::downgrade(current), &self.handler));
        if owned {
            handlers.remove(&self.method);
            debug!(method = %self.method, "Unregistered JSON-RPC method");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}
