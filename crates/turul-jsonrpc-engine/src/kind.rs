//! Error kind tags used to match handler failures against declared exception mappings.
//!
//! Kinds form a single-inheritance tree rooted at [`ANY`]. A failure raised with
//! kind `K` matches a mapping declared for kind `M` when `K` is `M` or one of its
//! descendants. Applications extend the tree with their own `static` kinds:
//!
//! ```rust
//! use turul_jsonrpc_engine::kind::{ErrorKind, ILLEGAL_ARGUMENT};
//!
//! pub static VALIDATION: ErrorKind = ErrorKind::new("Validation", &ILLEGAL_ARGUMENT);
//!
//! assert!(VALIDATION.is_a(&ILLEGAL_ARGUMENT));
//! ```

use std::fmt;

/// A named node in the error kind tree
#[derive(Debug)]
pub struct ErrorKind {
    name: &'static str,
    parent: Option<&'static ErrorKind>,
}

impl ErrorKind {
    /// Declare a kind below `parent`
    pub const fn new(name: &'static str, parent: &'static ErrorKind) -> Self {
        Self {
            name,
            parent: Some(parent),
        }
    }

    /// Declare a kind with no parent
    pub const fn root(name: &'static str) -> Self {
        Self { name, parent: None }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn parent(&self) -> Option<&'static ErrorKind> {
        self.parent
    }

    /// Whether `self` is `other` or descends from it.
    ///
    /// Kinds are compared by identity: two `static` kinds sharing a name are
    /// still distinct nodes.
    pub fn is_a(&self, other: &ErrorKind) -> bool {
        let mut current = Some(self);
        while let Some(kind) = current {
            if std::ptr::eq(kind, other) {
                return true;
            }
            current = kind.parent;
        }
        false
    }
}

impl PartialEq for ErrorKind {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other)
    }
}

impl Eq for ErrorKind {}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Root of every kind
pub static ANY: ErrorKind = ErrorKind::root("Any");
/// General failures raised by handler code
pub static RUNTIME: ErrorKind = ErrorKind::new("Runtime", &ANY);
pub static ILLEGAL_ARGUMENT: ErrorKind = ErrorKind::new("IllegalArgument", &RUNTIME);
pub static ILLEGAL_STATE: ErrorKind = ErrorKind::new("IllegalState", &RUNTIME);
pub static UNSUPPORTED_OPERATION: ErrorKind = ErrorKind::new("UnsupportedOperation", &RUNTIME);
pub static NOT_FOUND: ErrorKind = ErrorKind::new("NotFound", &RUNTIME);
pub static TIMEOUT: ErrorKind = ErrorKind::new("Timeout", &RUNTIME);
pub static IO: ErrorKind = ErrorKind::new("Io", &ANY);
/// JSON encoding or decoding failures raised from inside a handler
pub static JSON: ErrorKind = ErrorKind::new("Json", &RUNTIME);
/// An asynchronous failure wrapping another one
pub static COMPLETION: ErrorKind = ErrorKind::new("Completion", &RUNTIME);

#[cfg(test)]
mod tests {
    use super::*;

    static CUSTOM: ErrorKind = ErrorKind::new("Custom", &ILLEGAL_ARGUMENT);
    static SHADOW_RUNTIME: ErrorKind = ErrorKind::new("Runtime", &IO);

    #[test]
    fn test_kind_matches_itself_and_ancestors() {
        assert!(CUSTOM.is_a(&CUSTOM));
        assert!(CUSTOM.is_a(&ILLEGAL_ARGUMENT));
        assert!(CUSTOM.is_a(&RUNTIME));
        assert!(CUSTOM.is_a(&ANY));
    }

    #[test]
    fn test_kind_does_not_match_siblings_or_descendants() {
        assert!(!CUSTOM.is_a(&ILLEGAL_STATE));
        assert!(!RUNTIME.is_a(&ILLEGAL_ARGUMENT));
        assert!(!IO.is_a(&RUNTIME));
    }

    #[test]
    fn test_root_has_no_parent() {
        assert!(ANY.parent().is_none());
        assert_eq!(TIMEOUT.parent(), Some(&RUNTIME));
        assert_eq!(JSON.to_string(), "Json");
    }

    #[test]
    fn test_same_name_is_a_different_kind() {
        assert_eq!(SHADOW_RUNTIME.name(), RUNTIME.name());
        assert_ne!(SHADOW_RUNTIME, RUNTIME);
        assert!(!SHADOW_RUNTIME.is_a(&RUNTIME));
        assert!(!ILLEGAL_ARGUMENT.is_a(&SHADOW_RUNTIME));
        assert!(SHADOW_RUNTIME.is_a(&IO));
    }
}
