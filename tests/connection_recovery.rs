//
// Copyright 2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Integration tests for connection failure and recovery.
//!
//! These cover the supervisor's guarantees: a drop with N outstanding
//! calls resolves all N with `ConnectionLost`, reconnection happens with
//! backoff until explicit close, and calls issued while disconnected fail
//! fast.

use kodi_control::protocol::{JsonStreamDecoder, Request};
use kodi_control::transport::{
    MemoryConnector, MemoryTransport, Transport, TransportReader, TransportWriter,
};
use kodi_control::{ClientConfig, ClientError, ConnectionState, KodiClient, RpcError};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

fn recovery_config() -> ClientConfig {
    ClientConfig::default()
        .with_call_timeout(Duration::from_secs(5))
        .with_reconnect_backoff(Duration::from_millis(10), Duration::from_millis(20))
}

/// Reads requests off a server-end transport; holds the connection open
/// for as long as it lives.
struct ServerEnd {
    reader: Box<dyn TransportReader>,
    writer: Box<dyn TransportWriter>,
    decoder: JsonStreamDecoder,
}

impl ServerEnd {
    fn new(server_end: MemoryTransport) -> Self {
        let (reader, writer) = Box::new(server_end).split();
        Self {
            reader,
            writer,
            decoder: JsonStreamDecoder::new(),
        }
    }

    async fn next_request(&mut self) -> Request {
        loop {
            let chunk = self
                .reader
                .recv()
                .await
                .expect("server read failed")
                .expect("client closed the stream");
            let mut messages = self.decoder.feed(&chunk).expect("bad stream");
            if let Some(message) = messages.pop() {
                return serde_json::from_slice(&message).expect("unparseable request");
            }
        }
    }

    async fn reply_result(&mut self, id: u64, result: Value) {
        let payload = json!({"jsonrpc": "2.0", "id": id, "result": result}).to_string();
        self.writer.send(payload.as_bytes()).await.unwrap();
    }
}

async fn wait_for_state(client: &KodiClient, wanted: ConnectionState) {
    let mut states = client.state_changes();
    states
        .wait_for(|state| *state == wanted)
        .await
        .expect("supervisor gone");
}

#[tokio::test]
async fn test_drop_with_outstanding_calls_fails_all_with_connection_lost() {
    let connector = MemoryConnector::new();
    let (client_end, server_end) = MemoryTransport::pair();
    connector.push(client_end);

    let client = Arc::new(
        KodiClient::with_connector(Box::new(connector), &recovery_config())
            .await
            .unwrap(),
    );
    let mut server = ServerEnd::new(server_end);

    let mut calls = Vec::new();
    for _ in 0..4 {
        let client = Arc::clone(&client);
        calls.push(tokio::spawn(async move {
            client.call("Player.GetItem", json!({})).await
        }));
    }
    // All four must be on the wire before the drop.
    for _ in 0..4 {
        server.next_request().await;
    }

    drop(server);

    for call in calls {
        assert!(matches!(
            call.await.unwrap().unwrap_err(),
            RpcError::ConnectionLost
        ));
    }
    // None remain pending.
    assert_eq!(client.pending_calls(), 0);
}

#[tokio::test]
async fn test_state_cycles_disconnected_then_connecting_after_drop() {
    let connector = MemoryConnector::new();
    let (client_end, server_end) = MemoryTransport::pair();
    connector.push(client_end);

    let client = KodiClient::with_connector(Box::new(connector), &recovery_config())
        .await
        .unwrap();
    assert_eq!(client.state(), ConnectionState::Connected);

    // Watch updates coalesce, so observe each phase via wait_for rather
    // than counting transitions.
    let mut states = client.state_changes();
    drop(server_end);
    states
        .wait_for(|state| *state == ConnectionState::Disconnected)
        .await
        .unwrap();
    states
        .wait_for(|state| *state == ConnectionState::Connecting)
        .await
        .unwrap();

    client.close().await;
}

#[tokio::test]
async fn test_reconnects_and_serves_calls_on_the_new_connection() {
    let connector = MemoryConnector::new();
    let (first, first_server) = MemoryTransport::pair();
    let (second, second_server) = MemoryTransport::pair();
    connector.push(first);
    connector.push(second);

    let client = KodiClient::with_connector(Box::new(connector.clone()), &recovery_config())
        .await
        .unwrap();

    drop(first_server);
    // The redial consumes the queued second transport.
    while connector.queued() > 0 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    wait_for_state(&client, ConnectionState::Connected).await;

    let mut server = ServerEnd::new(second_server);
    let call = tokio::spawn(async move { client.call("JSONRPC.Ping", Value::Null).await });
    let request = server.next_request().await;
    server.reply_result(request.id, json!("pong")).await;
    assert_eq!(call.await.unwrap().unwrap(), json!("pong"));
}

#[tokio::test]
async fn test_calls_fail_fast_while_disconnected() {
    let connector = MemoryConnector::new();
    let (client_end, server_end) = MemoryTransport::pair();
    connector.push(client_end);

    let client = KodiClient::with_connector(Box::new(connector), &recovery_config())
        .await
        .unwrap();

    drop(server_end);
    // With nothing left to dial the supervisor stays down; once the old
    // binding is gone, calls must not hang.
    let mut states = client.state_changes();
    states
        .wait_for(|state| *state != ConnectionState::Connected)
        .await
        .unwrap();

    let error = client.call("JSONRPC.Ping", Value::Null).await.unwrap_err();
    assert!(matches!(
        error,
        RpcError::NotConnected | RpcError::ConnectionLost
    ));
}

#[tokio::test]
async fn test_close_resolves_outstanding_and_suppresses_reconnect() {
    let connector = MemoryConnector::new();
    let (first, first_server) = MemoryTransport::pair();
    let (second, _second_server) = MemoryTransport::pair();
    connector.push(first);
    connector.push(second);

    let client = KodiClient::with_connector(Box::new(connector.clone()), &recovery_config())
        .await
        .unwrap();
    let mut server = ServerEnd::new(first_server);

    let client = Arc::new(client);
    let in_flight = {
        let client = Arc::clone(&client);
        tokio::spawn(async move { client.call("Player.GetItem", json!({})).await })
    };
    server.next_request().await;

    client.shutdown();
    assert!(matches!(
        in_flight.await.unwrap().unwrap_err(),
        RpcError::ConnectionLost
    ));

    // The call task has finished, so ours is the last handle.
    let client = Arc::try_unwrap(client).unwrap_or_else(|_| panic!("client still shared"));
    let states = client.state_changes();
    client.close().await;

    assert_eq!(*states.borrow(), ConnectionState::Disconnected);
    // The spare transport was never dialed.
    assert_eq!(connector.queued(), 1);
}

#[tokio::test]
async fn test_fail_fast_connect_surfaces_first_failure() {
    let connector = MemoryConnector::new(); // nothing queued: every dial refused

    let error = KodiClient::with_connector(Box::new(connector), &recovery_config())
        .await
        .unwrap_err();
    assert!(matches!(error, ClientError::ConnectFailed { .. }));
}

#[tokio::test]
async fn test_background_connect_comes_up_later() {
    let connector = MemoryConnector::new();
    let config = recovery_config().with_fail_fast_connect(false);

    let client = KodiClient::with_connector(Box::new(connector.clone()), &config)
        .await
        .unwrap();

    // Not up yet: calls fail fast rather than hanging.
    let error = client.call("JSONRPC.Ping", Value::Null).await.unwrap_err();
    assert!(matches!(error, RpcError::NotConnected));

    // The endpoint appears; the supervisor finds it on a later attempt.
    let (client_end, server_end) = MemoryTransport::pair();
    connector.push(client_end);
    wait_for_state(&client, ConnectionState::Connected).await;

    let mut server = ServerEnd::new(server_end);
    let call = tokio::spawn(async move { client.call("JSONRPC.Ping", Value::Null).await });
    let request = server.next_request().await;
    server.reply_result(request.id, json!("pong")).await;
    assert_eq!(call.await.unwrap().unwrap(), json!("pong"));
}
