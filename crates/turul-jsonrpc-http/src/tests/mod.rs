//! Test modules for turul-jsonrpc-http crate
