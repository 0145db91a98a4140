//! Self-description of the registered methods.
//!
//! A [`Specification`] is a read-only snapshot taken from the
//! [`HandlerRegistry`](crate::registry::HandlerRegistry); it does not track later
//! registrations.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::registration::{Registration, ReturnShape, ReturnType};

/// Snapshot of every registered method, sorted by name
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Specification {
    pub methods: BTreeMap<String, MethodSpecification>,
}

impl Specification {
    pub fn get(&self, method: &str) -> Option<&MethodSpecification> {
        self.methods.get(method)
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MethodSpecification {
    pub method: String,
    pub documentation: String,
    pub parameters: Vec<ParameterSpecification>,
    pub exceptions: Vec<ExceptionSpecification>,
    pub result_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterSpecification {
    pub name: String,
    pub position: usize,
    pub type_name: String,
    pub required: bool,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExceptionSpecification {
    pub code: i64,
    pub description: String,
}

fn describe_result(returns: &ReturnType) -> String {
    let inner = match returns.shape() {
        ReturnShape::Plain => returns.type_name().to_string(),
        ReturnShape::Optional => format!("Option<{}>", returns.type_name()),
    };
    if returns.is_asynchronous() {
        format!("async {inner}")
    } else {
        inner
    }
}

impl From<&Registration> for MethodSpecification {
    fn from(registration: &Registration) -> Self {
        Self {
            method: registration.method().to_string(),
            documentation: registration.documentation().to_string(),
            parameters: registration
                .parameters()
                .iter()
                .map(|parameter| ParameterSpecification {
                    name: parameter.name().to_string(),
                    position: parameter.position(),
                    type_name: if parameter.is_optional() {
                        format!("Option<{}>", parameter.type_name())
                    } else {
                        parameter.type_name().to_string()
                    },
                    // Optional-shaped parameters never fail binding
                    required: parameter.is_required() && !parameter.is_optional(),
                    description: parameter.doc().to_string(),
                })
                .collect(),
            exceptions: registration
                .exception_mappings()
                .iter()
                .map(|mapping| ExceptionSpecification {
                    code: mapping.code(),
                    description: mapping.doc().to_string(),
                })
                .collect(),
            result_type: describe_result(registration.returns()),
        }
    }
}
