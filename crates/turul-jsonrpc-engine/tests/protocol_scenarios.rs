//! End-to-end request/response scenarios through the transport entry point

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use turul_jsonrpc_engine::prelude::*;

#[derive(Debug, Serialize, Deserialize)]
struct SomeModel {
    data1: String,
    data2: i32,
}

fn some_model() -> SomeModel {
    SomeModel {
        data1: "set1".to_string(),
        data2: 1234,
    }
}

const BAD_ARGUMENT: &str = "Bad argument...even if there is no param here";

fn endpoints() -> JsonRpcEngine {
    let engine = JsonRpcEngine::default();
    let registrations = vec![
        Registration::builder("test1")
            .returns(ReturnType::of::<String>())
            .invoke(|_| Invocation::ready("done_1".to_string())),
        Registration::builder("test2")
            .param(Parameter::of::<String>("e1"))
            .param(Parameter::of::<i32>("e2"))
            .returns(ReturnType::of::<String>())
            .invoke(|mut args| {
                let result = (|| -> Result<String, HandlerError> {
                    let p1 = args.opt_arg::<String>(0)?.unwrap_or_default();
                    let v2 = args.opt_arg::<i32>(1)?.unwrap_or_default();
                    Ok(format!(">{p1},{v2}<"))
                })();
                Invocation::from_result(result)
            }),
        Registration::builder("test3")
            .param(Parameter::of::<SomeModel>("input"))
            .returns(ReturnType::of::<String>())
            .invoke(|mut args| match args.arg::<SomeModel>(0) {
                Ok(input) => Invocation::ready(format!(">>{},{}<<", input.data1, input.data2)),
                Err(error) => Invocation::failed(error),
            }),
        Registration::builder("test4")
            .returns(ReturnType::of::<SomeModel>())
            .invoke(|_| Invocation::ready(some_model())),
        Registration::builder("test5")
            .returns(ReturnType::of::<SomeModel>().asynchronous())
            .invoke(|_| Invocation::pending(async { Ok(some_model()) })),
        Registration::builder("test6")
            .returns(ReturnType::of::<SomeModel>())
            .handles(&kind::ILLEGAL_ARGUMENT, 2)
            .invoke(|_| Invocation::failed(HandlerError::illegal_argument(BAD_ARGUMENT))),
        Registration::builder("test7")
            .returns(ReturnType::of::<String>().asynchronous())
            .handles(&kind::ILLEGAL_ARGUMENT, 2)
            .invoke(|_| {
                Invocation::pending(async {
                    let failure = tokio::spawn(async {
                        HandlerError::illegal_argument(BAD_ARGUMENT).wrap()
                    })
                    .await
                    .map_err(|e| HandlerError::runtime(e.to_string()))?;
                    Err::<String, HandlerError>(failure)
                })
            }),
    ];
    for registration in registrations {
        engine.register(registration.build().unwrap()).unwrap();
    }
    engine
}

/// Records every sink call as `status\nbody`
#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<String>>>);

impl Captured {
    fn sink(&self) -> impl ResponseSink + 'static {
        let calls = Arc::clone(&self.0);
        move |status: u16, body: BodyWriter| {
            let text = String::from_utf8(body.to_vec().unwrap()).unwrap();
            calls.lock().push(format!("{status}\n{text}"));
        }
    }

    fn calls(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    fn single(&self) -> String {
        let calls = self.calls();
        assert_eq!(calls.len(), 1, "expected exactly one response: {calls:?}");
        calls[0].clone()
    }

    fn single_json(&self) -> Value {
        let call = self.single();
        let (_, body) = call.split_once('\n').unwrap();
        serde_json::from_str(body).unwrap()
    }
}

async fn handle_sync(engine: &JsonRpcEngine, input: &str) -> Captured {
    let captured = Captured::default();
    engine.handle(input.as_bytes(), captured.sink(), || None).await;
    captured
}

#[tokio::test]
async fn test_handle_scenarios() {
    let engine = endpoints();
    let cases = [
        (
            r#"{"jsonrpc":"2.0","method":"test1"}"#,
            r#"{"jsonrpc":"2.0","result":"done_1"}"#,
        ),
        (
            r#"{"jsonrpc":"2.0","method":"test2","params":["first",222]}"#,
            r#"{"jsonrpc":"2.0","result":">first,222<"}"#,
        ),
        (
            r#"{"jsonrpc":"2.0","method":"test2","params":{"e1":"first","e2":222}}"#,
            r#"{"jsonrpc":"2.0","result":">first,222<"}"#,
        ),
        (
            r#"{"jsonrpc":"2.0","method":"test3","params":[{"data1":"first","data2":222}]}"#,
            r#"{"jsonrpc":"2.0","result":">>first,222<<"}"#,
        ),
        (
            r#"{"jsonrpc":"2.0","method":"test4"}"#,
            r#"{"jsonrpc":"2.0","result":{"data1":"set1","data2":1234}}"#,
        ),
        (
            r#"{"jsonrpc":"2.0","method":"test5"}"#,
            r#"{"jsonrpc":"2.0","result":{"data1":"set1","data2":1234}}"#,
        ),
        (
            r#"{"jsonrpc":"2.0","method":"test6"}"#,
            r#"{"jsonrpc":"2.0","error":{"code":2,"message":"Bad argument...even if there is no param here"}}"#,
        ),
        (
            r#"{"jsonrpc":"2.0","method":"test7"}"#,
            r#"{"jsonrpc":"2.0","error":{"code":2,"message":"Bad argument...even if there is no param here"}}"#,
        ),
    ];

    for (input, output) in cases {
        let captured = handle_sync(&engine, input).await;
        assert_eq!(captured.single(), format!("200\n{output}"), "input: {input}");
    }
}

#[tokio::test]
async fn test_manual_registration() {
    let engine = endpoints();
    let custom = engine
        .register(
            Registration::builder("custom")
                .invoke(|_| Invocation::ready(json!({"message": "i am here"})))
                .build()
                .unwrap(),
        )
        .unwrap();

    let captured = handle_sync(&engine, r#"{"jsonrpc":"2.0","method":"custom"}"#).await;
    assert_eq!(
        captured.single(),
        "200\n{\"jsonrpc\":\"2.0\",\"result\":{\"message\":\"i am here\"}}"
    );

    custom.close();
    let captured = handle_sync(&engine, r#"{"jsonrpc":"2.0","method":"custom"}"#).await;
    assert_eq!(captured.single_json()["error"]["message"], "Unknown method");
}

#[tokio::test]
async fn test_batch_with_non_object_element() {
    let engine = endpoints();
    let captured = handle_sync(&engine, r#"[{"jsonrpc":"2.0","method":"test1"}, "oops"]"#).await;

    let body = captured.single_json();
    assert_eq!(
        body,
        json!([
            {"jsonrpc": "2.0", "result": "done_1"},
            {"jsonrpc": "2.0", "error": {"code": -32600, "message": "Batch requests must be JSON objects"}}
        ])
    );
}

#[tokio::test]
async fn test_parse_error_skips_completion_supplier() {
    let engine = endpoints();
    let captured = Captured::default();
    let consulted = Arc::new(Mutex::new(false));
    let flag = Arc::clone(&consulted);

    engine
        .handle("{\"jsonrpc\":".as_bytes(), captured.sink(), move || {
            *flag.lock() = true;
            None
        })
        .await;

    assert!(!*consulted.lock());
    let body = captured.single_json();
    assert_eq!(body["error"]["code"], -32700);
    assert!(body.get("id").is_none());
}

#[tokio::test]
async fn test_invalid_version_and_method_codes() {
    let engine = endpoints();
    for version in ["1.0", "2.00", "3"] {
        let input = json!({"jsonrpc": version, "method": "test1"}).to_string();
        let body = handle_sync(&engine, &input).await.single_json();
        assert_eq!(body["error"]["code"], -32600, "version {version}");
    }

    for request in [json!({"jsonrpc": "2.0"}), json!({"jsonrpc": "2.0", "method": ""})] {
        let body = handle_sync(&engine, &request.to_string()).await.single_json();
        assert_eq!(body["error"]["code"], -32601);
    }

    let body = handle_sync(&engine, r#"{"jsonrpc":"2.0","id":"x","method":"missing"}"#)
        .await
        .single_json();
    assert_eq!(
        body,
        json!({"jsonrpc": "2.0", "id": "x", "error": {"code": -32601, "message": "Unknown method"}})
    );
}

#[tokio::test]
async fn test_asynchronous_transport_gets_sink_then_hook_once() {
    let engine = endpoints();
    let events = Arc::new(Mutex::new(Vec::<String>::new()));
    let (done_tx, done_rx) = tokio::sync::oneshot::channel::<()>();

    let sink_events = Arc::clone(&events);
    let sink = move |status: u16, body: BodyWriter| {
        let text = String::from_utf8(body.to_vec().unwrap()).unwrap();
        sink_events.lock().push(format!("sink {status} {text}"));
    };
    let hook_events = Arc::clone(&events);
    engine
        .handle(
            r#"{"jsonrpc":"2.0","method":"test5"}"#.as_bytes(),
            sink,
            move || {
                let hook: CompletionHook = Box::new(move || {
                    hook_events.lock().push("hook".to_string());
                    let _ = done_tx.send(());
                });
                Some(hook)
            },
        )
        .await;

    done_rx.await.unwrap();
    let events = events.lock().clone();
    assert_eq!(
        events,
        vec![
            r#"sink 200 {"jsonrpc":"2.0","result":{"data1":"set1","data2":1234}}"#.to_string(),
            "hook".to_string()
        ]
    );
}

#[tokio::test]
async fn test_panicking_handler_still_gets_one_response() {
    let engine = endpoints();
    engine
        .register(
            Registration::builder("explode")
                .invoke(|_| -> Invocation { panic!("boom") })
                .build()
                .unwrap(),
        )
        .unwrap();

    let captured = Captured::default();
    let (done_tx, done_rx) = tokio::sync::oneshot::channel::<()>();
    engine
        .handle(
            r#"{"jsonrpc":"2.0","method":"explode"}"#.as_bytes(),
            captured.sink(),
            move || {
                let hook: CompletionHook = Box::new(move || {
                    let _ = done_tx.send(());
                });
                Some(hook)
            },
        )
        .await;

    done_rx.await.unwrap();
    let body = captured.single_json();
    assert_eq!(body["error"]["code"], -32603);
    assert_eq!(body["error"]["message"], "boom");
}

fn with_explode(engine: &JsonRpcEngine) {
    engine
        .register(
            Registration::builder("explode")
                .invoke(|_| -> Invocation { panic!("boom") })
                .build()
                .unwrap(),
        )
        .unwrap();
}

#[tokio::test]
async fn test_panicking_batch_element_keeps_siblings() {
    let engine = endpoints();
    with_explode(&engine);

    let batch = json!([
        JsonRpcRequest::new("test1").with_id("1").to_value(),
        JsonRpcRequest::new("explode").with_id("2").to_value(),
        JsonRpcRequest::new("test2")
            .with_id("3")
            .with_params(vec![json!("a"), json!(1)])
            .to_value(),
    ]);

    let captured = Captured::default();
    let (done_tx, done_rx) = tokio::sync::oneshot::channel::<()>();
    engine
        .handle(batch.to_string().as_bytes(), captured.sink(), move || {
            let hook: CompletionHook = Box::new(move || {
                let _ = done_tx.send(());
            });
            Some(hook)
        })
        .await;

    done_rx.await.unwrap();
    assert_eq!(
        captured.single_json(),
        json!([
            {"jsonrpc": "2.0", "id": "1", "result": "done_1"},
            {"jsonrpc": "2.0", "id": "2", "error": {"code": -32603, "message": "boom"}},
            {"jsonrpc": "2.0", "id": "3", "result": ">a,1<"}
        ])
    );
}

#[tokio::test]
async fn test_panicking_handler_without_hook_returns_normally() {
    let engine = endpoints();
    with_explode(&engine);

    let request = JsonRpcRequest::new("explode").with_id("7").to_value().to_string();
    let captured = handle_sync(&engine, &request).await;

    assert_eq!(
        captured.single_json(),
        json!({"jsonrpc": "2.0", "id": "7", "error": {"code": -32603, "message": "boom"}})
    );
}
