//! Boundary between the engine and whatever carries the bytes.
//!
//! A transport hands [`JsonRpcEngine::handle`](crate::engine::JsonRpcEngine::handle)
//! a reader, a [`ResponseSink`] and optionally a [`CompletionHook`]. The engine
//! calls the sink exactly once per request and then runs the hook, if any.

use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tracing::{debug, error};

use crate::response::ResponseBody;

/// Signals an asynchronous transport that the response has been written
pub type CompletionHook = Box<dyn FnOnce() + Send>;

/// Receives the single response for a request
pub trait ResponseSink: Send + Sync {
    fn send(&self, status: u16, body: BodyWriter);
}

impl<F> ResponseSink for F
where
    F: Fn(u16, BodyWriter) + Send + Sync,
{
    fn send(&self, status: u16, body: BodyWriter) {
        self(status, body)
    }
}

/// Deferred serialization of a response body
#[derive(Debug, Clone)]
pub struct BodyWriter {
    body: ResponseBody,
}

impl BodyWriter {
    pub fn new(body: ResponseBody) -> Self {
        Self { body }
    }

    pub fn body(&self) -> &ResponseBody {
        &self.body
    }

    pub fn into_body(self) -> ResponseBody {
        self.body
    }

    pub fn write_to<W: io::Write>(&self, writer: W) -> serde_json::Result<()> {
        serde_json::to_writer(writer, &self.body)
    }

    pub fn to_vec(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(&self.body)
    }
}

/// Single-fire gate shared by the completion and timeout paths
pub(crate) struct ResponseGuard {
    sink: Arc<dyn ResponseSink>,
    hook: Mutex<Option<CompletionHook>>,
    responded: AtomicBool,
}

impl ResponseGuard {
    pub(crate) fn new(sink: Arc<dyn ResponseSink>, hook: Option<CompletionHook>) -> Self {
        Self {
            sink,
            hook: Mutex::new(hook),
            responded: AtomicBool::new(false),
        }
    }

    /// Send `body` unless a response already went out; returns whether it was sent.
    ///
    /// The completion hook runs after the sink even if the sink panics; the panic
    /// is then propagated.
    pub(crate) fn respond(&self, status: u16, body: ResponseBody) -> bool {
        if self.responded.swap(true, Ordering::AcqRel) {
            debug!("Response already sent, dropping late result");
            return false;
        }

        let sent = panic::catch_unwind(AssertUnwindSafe(|| {
            self.sink.send(status, BodyWriter::new(body))
        }));
        let hook = self.hook.lock().take();
        if let Some(hook) = hook {
            hook();
        }
        if let Err(panic) = sent {
            error!("Response sink panicked");
            panic::resume_unwind(panic);
        }
        true
    }

    pub(crate) fn has_responded(&self) -> bool {
        self.responded.load(Ordering::Acquire)
    }
}
