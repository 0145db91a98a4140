//! Calculator JSON-RPC Example
//!
//! Registers `add`, `divide` and `sum` and drives the engine directly with a
//! few single and batch payloads, printing each response.

use serde::Deserialize;
use turul_jsonrpc_engine::prelude::*;

static DIVISION_BY_ZERO: ErrorKind = ErrorKind::new("DivisionByZero", &kind::ILLEGAL_ARGUMENT);

#[derive(Debug, Deserialize)]
struct Operands {
    values: Vec<f64>,
}

fn register_methods(engine: &JsonRpcEngine) -> Result<(), RegistryError> {
    engine.register(
        Registration::builder("add")
            .documentation("Adds two numbers")
            .param(Parameter::of::<f64>("a").required(true))
            .param(Parameter::of::<f64>("b").required(true))
            .returns(ReturnType::of::<f64>())
            .invoke(|mut args| {
                let result = (|| -> Result<f64, HandlerError> { Ok(args.arg::<f64>(0)? + args.arg::<f64>(1)?) })();
                Invocation::from_result(result)
            })
            .build()?,
    )?;

    engine.register(
        Registration::builder("divide")
            .documentation("Divides `a` by `b`")
            .param(Parameter::of::<f64>("a").required(true))
            .param(Parameter::of::<f64>("b").required(true))
            .returns(ReturnType::of::<f64>())
            .exception(ExceptionMapping::handled(&DIVISION_BY_ZERO, 1).documentation("`b` is zero"))
            .invoke(|mut args| {
                let result = (|| -> Result<f64, HandlerError> {
                    let a = args.arg::<f64>(0)?;
                    let b = args.arg::<f64>(1)?;
                    if b == 0.0 {
                        return Err(HandlerError::raised(&DIVISION_BY_ZERO, "Division by zero"));
                    }
                    Ok(a / b)
                })();
                Invocation::from_result(result)
            })
            .build()?,
    )?;

    engine.register(
        Registration::builder("sum")
            .documentation("Sums a list of values after a short delay")
            .param(Parameter::of::<Operands>("operands").required(true))
            .returns(ReturnType::of::<f64>().asynchronous())
            .invoke(|mut args| match args.arg::<Operands>(0) {
                Ok(operands) => Invocation::pending(async move {
                    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                    Ok(operands.values.iter().sum::<f64>())
                }),
                Err(error) => Invocation::failed(error),
            })
            .build()?,
    )?;

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let engine = JsonRpcEngine::new(EngineConfig::from_env());
    register_methods(&engine)?;

    let payloads = [
        r#"{"jsonrpc":"2.0","id":"1","method":"add","params":[1.5, 2]}"#,
        r#"{"jsonrpc":"2.0","id":"2","method":"divide","params":{"a":1,"b":0}}"#,
        r#"{"jsonrpc":"2.0","id":"3","method":"add","params":[1]}"#,
        r#"[{"jsonrpc":"2.0","id":"4","method":"sum","params":[{"values":[1,2,3]}]},{"jsonrpc":"2.0","id":"5","method":"unknown"}]"#,
    ];

    for payload in payloads {
        let body = engine.handle_str(payload).await;
        println!("--> {}", payload);
        println!("<-- {}", body.to_json_string()?);
    }

    Ok(())
}
