//! # JSON-RPC Echo Server
//!
//! Serves `echo`, `reverse` and a delayed `later` method over HTTP.
//!
//! ```bash
//! RUST_LOG=debug cargo run -p turul-jsonrpc-http --example echo_server
//! curl -s localhost:8000/jsonrpc -d '{"jsonrpc":"2.0","id":"1","method":"echo","params":["hi"]}'
//! ```

use std::time::Duration;

use turul_jsonrpc_http::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let server = JsonRpcHttpServer::builder()
        .engine_config(EngineConfig::from_env())
        .register(
            Registration::builder("echo")
                .documentation("Returns its argument")
                .param(Parameter::of::<String>("text").required(true))
                .returns(ReturnType::of::<String>())
                .invoke(|mut args| Invocation::from_result(args.arg::<String>(0)))
                .build()?,
        )?
        .register(
            Registration::builder("reverse")
                .param(Parameter::of::<String>("text").required(true))
                .returns(ReturnType::of::<String>())
                .handles(&kind::ILLEGAL_ARGUMENT, 1)
                .invoke(|mut args| match args.arg::<String>(0) {
                    Ok(text) if text.is_empty() => {
                        Invocation::failed(HandlerError::illegal_argument("Nothing to reverse"))
                    }
                    Ok(text) => Invocation::ready(text.chars().rev().collect::<String>()),
                    Err(error) => Invocation::failed(error),
                })
                .build()?,
        )?
        .register(
            Registration::builder("later")
                .param(Parameter::optional::<u64>("delay_ms"))
                .returns(ReturnType::of::<String>().asynchronous())
                .invoke(|mut args| {
                    let delay = match args.arg::<Option<u64>>(0) {
                        Ok(delay) => delay.unwrap_or(100),
                        Err(error) => return Invocation::failed(error),
                    };
                    Invocation::pending(async move {
                        tokio::time::sleep(Duration::from_millis(delay)).await;
                        Ok(format!("waited {delay} ms"))
                    })
                })
                .build()?,
        )?
        .build();

    server.run().await
}
