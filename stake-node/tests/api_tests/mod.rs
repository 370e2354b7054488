//! Integration tests for the API endpoints

use actix_web::{http::StatusCode, test, web, App};
use borsh::{BorshDeserialize, BorshSerialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing_actix_web::TracingLogger;

use stake_node::{
    api,
    keys,
    models::{consensus::tx_hash, stake::PubKey},
    services::{stake::KEY_PATH, METHODS},
    tx::{SignedTx, StakeTx},
};

mod helpers;
use helpers::{keystore_with_account, services, FakeConsensus, PASSWORD};

fn rpc(method: &str, params: Value) -> Value {
    json!({"jsonrpc": "2.0", "method": method, "params": params, "id": 1})
}

fn block(height: i64, txs: &[&[u8]]) -> stake_node::models::consensus::ResultBlock {
    let txs: Vec<String> = txs
        .iter()
        .map(|tx| base64::Engine::encode(&base64::engine::general_purpose::STANDARD, tx))
        .collect();
    serde_json::from_value(json!({
        "block_id": {"hash": "AA"},
        "block": {
            "header": {"chain_id": "local", "height": height.to_string(), "time": "2024-01-01T00:00:00Z"},
            "data": {"txs": txs}
        }
    }))
    .unwrap()
}

macro_rules! app {
    ($fake:expr, $keystore:expr) => {
        test::init_service(
            App::new()
                .wrap(TracingLogger::default())
                .app_data(web::Data::new(services($fake, $keystore)))
                .configure(api::configure),
        )
        .await
    };
}

#[actix_web::test]
async fn test_health_check() {
    let (keystore, _) = keystore_with_account();
    let app = app!(Arc::new(FakeConsensus::new("local")), &keystore);

    let req = test::TestRequest::post().uri("/api/v1/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["network"], "local");
    assert_eq!(body["latest_block"], 10);
    assert_eq!(body["catching_up"], false);
}

#[actix_web::test]
async fn test_net_methods() {
    let (keystore, _) = keystore_with_account();
    let app = app!(Arc::new(FakeConsensus::new("local")), &keystore);

    let req = test::TestRequest::post().uri("/").set_json(rpc("net_version", json!([]))).to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["jsonrpc"], "2.0");
    assert_eq!(body["id"], 1);
    assert_eq!(body["result"], "15");

    let req = test::TestRequest::post().uri("/").set_json(rpc("net_peerCount", Value::Null)).to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["result"], "0x0");

    let req = test::TestRequest::post().uri("/").set_json(rpc("net_listening", json!([]))).to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["result"], true);
}

#[actix_web::test]
async fn test_unknown_method() {
    let (keystore, _) = keystore_with_account();
    let app = app!(Arc::new(FakeConsensus::new("local")), &keystore);

    let req = test::TestRequest::post().uri("/").set_json(rpc("eth_sendTransaction", json!([]))).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["code"], -32601);
    assert_eq!(
        body["error"]["message"],
        "the method eth_sendTransaction does not exist/is not available"
    );
}

#[actix_web::test]
async fn test_invalid_jsonrpc_version() {
    let (keystore, _) = keystore_with_account();
    let app = app!(Arc::new(FakeConsensus::new("local")), &keystore);

    let req = test::TestRequest::post()
        .uri("/")
        .set_json(json!({"jsonrpc": "1.0", "method": "net_version", "id": 7}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["code"], -32600);
    assert_eq!(body["id"], 7);
}

#[actix_web::test]
async fn test_malformed_request_gets_jsonrpc_error() {
    let (keystore, _) = keystore_with_account();
    let app = app!(Arc::new(FakeConsensus::new("local")), &keystore);

    let req = test::TestRequest::post()
        .uri("/")
        .set_json(json!({"method": "net_version", "id": 1}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["jsonrpc"], "2.0");
    assert_eq!(body["error"]["code"], -32600);

    let req = test::TestRequest::post()
        .uri("/")
        .insert_header(("content-type", "application/json"))
        .set_payload("{not json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["code"], -32600);
}

#[actix_web::test]
async fn test_every_method_is_routed() {
    let (keystore, _) = keystore_with_account();
    let app = app!(Arc::new(FakeConsensus::new("local")), &keystore);

    for method in METHODS {
        let req = test::TestRequest::post().uri("/").set_json(rpc(method, Value::Null)).to_request();
        let resp = test::call_service(&app, req).await;
        let body: Value = test::read_body_json(resp).await;
        assert_ne!(body["error"]["code"], -32601, "{} is not routed", method);
    }
}

#[actix_web::test]
async fn test_get_transaction_from_block() {
    let tx: &[u8] = b"some stake tx";
    let hash = tx_hash(tx);
    let mut fake = FakeConsensus::new("local");
    fake.blocks.insert(5, block(5, &[tx]));
    fake.txs.insert(
        hash.clone(),
        serde_json::from_value(json!({
            "hash": hex::encode_upper(&hash),
            "height": "5",
            "index": 0,
            "tx": base64::Engine::encode(&base64::engine::general_purpose::STANDARD, tx)
        }))
        .unwrap(),
    );
    let (keystore, _) = keystore_with_account();
    let app = app!(Arc::new(fake), &keystore);

    let req = test::TestRequest::post()
        .uri("/")
        .set_json(rpc("cmt_getTransactionFromBlock", json!([5, 0])))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["result"]["hash"], hex::encode_upper(&hash));
    assert_eq!(body["result"]["height"], "5");
    assert_eq!(
        body["result"]["tx"],
        base64::Engine::encode(&base64::engine::general_purpose::STANDARD, tx)
    );

    let req = test::TestRequest::post()
        .uri("/")
        .set_json(rpc("cmt_getTransactionFromBlock", json!([5, 1])))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["code"], -32602);
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .ends_with("No transaction in block 5, index 1. "));
}

#[actix_web::test]
async fn test_get_block_latest() {
    let mut fake = FakeConsensus::new("local");
    fake.blocks.insert(10, block(10, &[]));
    let (keystore, _) = keystore_with_account();
    let app = app!(Arc::new(fake), &keystore);

    let req = test::TestRequest::post().uri("/").set_json(rpc("cmt_getBlock", json!([0]))).to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["result"]["block"]["header"]["height"], "10");
}

#[actix_web::test]
async fn test_query_validators() {
    let validators = vec![PubKey([1; 32]), PubKey([2; 32])];
    let mut stored = Vec::new();
    validators.serialize(&mut stored).unwrap();

    let mut fake = FakeConsensus::new("local");
    fake.store.insert(
        (
            KEY_PATH.to_string(),
            keys::prefixed_key(keys::STAKE_MODULE, &keys::candidates_pubkeys_key()),
        ),
        stored,
    );
    let (keystore, _) = keystore_with_account();
    let app = app!(Arc::new(fake), &keystore);

    let req = test::TestRequest::post().uri("/").set_json(rpc("cmt_queryValidators", json!([0]))).to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["result"]["height"], 10);
    assert_eq!(body["result"]["data"][0]["type"], "ed25519");
    assert_eq!(body["result"]["data"][1]["data"], PubKey([2; 32]).to_hex());
}

#[actix_web::test]
async fn test_query_slot_without_data() {
    let (keystore, _) = keystore_with_account();
    let app = app!(Arc::new(FakeConsensus::new("local")), &keystore);

    let req = test::TestRequest::post().uri("/").set_json(rpc("cmt_querySlot", json!(["s1", 0]))).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["message"], "No data returned for query");
}

#[actix_web::test]
async fn test_declare_candidacy_requires_unlock() {
    let (keystore, address) = keystore_with_account();
    let fake = Arc::new(FakeConsensus::new("local"));
    let app = app!(fake.clone(), &keystore);
    let declare = rpc(
        "cmt_declareCandidacy",
        json!([{"from": address.to_string(), "pubKey": PubKey([7; 32]).to_hex()}]),
    );

    let req = test::TestRequest::post().uri("/").set_json(declare.clone()).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert!(fake.broadcasts.lock().unwrap().is_empty());

    let req = test::TestRequest::post()
        .uri("/")
        .set_json(rpc("cmt_unlockAccount", json!([address.to_string(), PASSWORD])))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["result"], true);

    let req = test::TestRequest::post().uri("/").set_json(declare).to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["result"]["height"], "11");
    assert_eq!(body["result"]["deliver_tx"]["code"], 0);

    let broadcasts = fake.broadcasts.lock().unwrap();
    assert_eq!(broadcasts.len(), 1);
    let signed = SignedTx::try_from_slice(&broadcasts[0]).unwrap();
    assert_eq!(signed.tx.chain_id, "local");
    assert_eq!(signed.tx.tx.sequence, 1);
    assert_eq!(signed.tx.tx.tx, StakeTx::Declare { pub_key: PubKey([7; 32]) });
    let signature = signed.signature.unwrap();
    assert_eq!(signature.signer, <[u8; 20]>::from(address));
    assert_eq!(signature.signature.len(), 65);
}

#[actix_web::test]
async fn test_unlock_with_wrong_password() {
    let (keystore, address) = keystore_with_account();
    let app = app!(Arc::new(FakeConsensus::new("local")), &keystore);

    let req = test::TestRequest::post()
        .uri("/")
        .set_json(rpc("cmt_unlockAccount", json!([address.to_string(), "wrong"])))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["code"], -32000);
}
