//! Protocol behaviour tests against the public dispatcher API

use mango_cipher::{Dispatcher, MANGO_CIPHER, Reply, Response};
use serde_json::{Value, json};

fn call_decode(id: Value, word: &str) -> Response {
    let request = json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "tools/call",
        "params": {"name": "decode", "arguments": {"word": word}}
    });
    Dispatcher::new()
        .process(&request)
        .expect("request with id must produce a response")
}

fn single(reply: Reply) -> Response {
    match reply {
        Reply::Single(response) => response,
        other => panic!("expected a single response, got {:?}", other),
    }
}

fn batch(reply: Reply) -> Vec<Response> {
    match reply {
        Reply::Batch(responses) => responses,
        other => panic!("expected a batch, got {:?}", other),
    }
}

// ============================================================================
// Decode tool
// ============================================================================

#[test]
fn test_every_word_decodes_in_any_case() {
    for (word, digit) in MANGO_CIPHER {
        for variant in [word.to_string(), word.to_uppercase()] {
            let response = call_decode(json!(1), &variant);
            let result = response.result.expect("known word must succeed");
            assert_eq!(
                result,
                json!({"content": [{"type": "text", "text": digit.to_string()}]}),
                "word {}",
                variant
            );
        }
    }
}

#[test]
fn test_mango_and_banana() {
    let mango = call_decode(json!(1), "mango").result.unwrap();
    assert_eq!(mango["content"][0]["text"], "0");

    let banana = call_decode(json!(2), "BANANA").result.unwrap();
    assert_eq!(banana["content"][0]["text"], "2");
}

#[test]
fn test_unknown_word() {
    let response = call_decode(json!("req-7"), "Kiwi");
    assert_eq!(response.id, json!("req-7"));
    let error = response.error.unwrap();
    assert_eq!(error.code, -32602);
    assert!(error.message.contains("kiwi"));
    assert!(error.message.contains("not in mango cipher"));
}

#[test]
fn test_unknown_tool_name() {
    let response = Dispatcher::new()
        .process(&json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "tools/call",
            "params": {"name": "encode", "arguments": {"word": "mango"}}
        }))
        .unwrap();
    let error = response.error.unwrap();
    assert_eq!(error.code, -32601);
    assert_eq!(error.message, "Unknown tool: encode");
}

// ============================================================================
// Envelope validation
// ============================================================================

#[test]
fn test_bad_protocol_tag_for_every_method() {
    let dispatcher = Dispatcher::new();
    for method in ["initialize", "tools/list", "tools/call", "bogus"] {
        for tag in [None, Some(json!("1.0")), Some(json!(2)), Some(Value::Null)] {
            let mut request = json!({"id": 5, "method": method});
            if let Some(tag) = tag {
                request["jsonrpc"] = tag;
            }
            let response = dispatcher.process(&request).unwrap();
            assert_eq!(response.error.unwrap().code, -32600, "method {}", method);
            assert_eq!(response.id, json!(5));
        }
    }
}

#[test]
fn test_invalid_notification_still_answered() {
    let response = Dispatcher::new()
        .process(&json!({"method": "initialize"}))
        .expect("validation errors are never suppressed");
    assert_eq!(response.error.unwrap().code, -32600);
    assert_eq!(response.id, Value::Null);
}

#[test]
fn test_initialize_descriptor_is_fixed() {
    let response = single(Dispatcher::new().handle_value(json!({
        "jsonrpc": "2.0",
        "id": 0,
        "method": "initialize",
        "params": {"protocolVersion": "2099-01-01"}
    })));
    let result = response.result.unwrap();
    assert_eq!(result["protocolVersion"], "2024-11-05");
    assert_eq!(result["serverInfo"]["name"], "mango-cipher");
    assert_eq!(result["serverInfo"]["version"], "1.0.0");
    assert_eq!(result["capabilities"], json!({"tools": {}}));
}

// ============================================================================
// Batches and notifications
// ============================================================================

#[test]
fn test_notification_only_batch_is_no_content() {
    let reply = Dispatcher::new().handle_value(json!([
        {"jsonrpc": "2.0", "method": "initialize"},
        {"jsonrpc": "2.0", "id": null, "method": "tools/list"}
    ]));
    assert_eq!(reply, Reply::NoContent);
}

#[test]
fn test_batch_order_without_placeholders() {
    let responses = batch(Dispatcher::new().handle_value(json!([
        {"jsonrpc": "2.0", "id": "a", "method": "tools/call",
         "params": {"name": "decode", "arguments": {"word": "melon"}}},
        {"jsonrpc": "2.0", "method": "tools/list"},
        {"jsonrpc": "1.0", "id": "c", "method": "initialize"},
        {"jsonrpc": "2.0", "method": "tools/call",
         "params": {"name": "decode", "arguments": {"word": "lychee"}}},
        {"jsonrpc": "2.0", "id": "e", "method": "tools/list"}
    ])));

    let ids: Vec<Value> = responses.iter().map(|r| r.id.clone()).collect();
    assert_eq!(ids, vec![json!("a"), json!("c"), Value::Null, json!("e")]);
    assert_eq!(responses[0].result.as_ref().unwrap()["content"][0]["text"], "9");
    assert_eq!(responses[1].error.as_ref().unwrap().code, -32600);
    assert_eq!(responses[2].error.as_ref().unwrap().code, -32602);
    assert!(responses[3].result.is_some());
}

#[test]
fn test_batch_never_grows() {
    let requests: Vec<Value> = (0..8)
        .map(|i| json!({"jsonrpc": "2.0", "id": i, "method": "tools/list"}))
        .collect();
    let responses = batch(Dispatcher::new().handle_value(Value::Array(requests)));
    assert_eq!(responses.len(), 8);
}

#[test]
fn test_parse_error_for_single_and_batch_intent() {
    let dispatcher = Dispatcher::new();
    for body in [
        &b"{\"jsonrpc\": \"2.0\","[..],
        &b"[{\"jsonrpc\": \"2.0\"}, "[..],
        &b"\xff\xfe"[..],
    ] {
        let response = single(dispatcher.handle_body(body));
        let error = response.error.unwrap();
        assert_eq!(error.code, -32700);
        assert_eq!(error.message, "Parse error");
        assert_eq!(response.id, Value::Null);
    }
}
