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

//! Integration tests for server-pushed notification routing.
//!
//! These push notifications from a fake Kodi server over the in-memory
//! transport and verify subscription matching, payload delivery, handler
//! isolation, and that notification fan-out never blocks call
//! resolution.

use kodi_control::protocol::{JsonStreamDecoder, Request};
use kodi_control::transport::{
    MemoryConnector, MemoryTransport, Transport, TransportReader, TransportWriter,
};
use kodi_control::{ClientConfig, KodiClient};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

struct FakeKodi {
    reader: Box<dyn TransportReader>,
    writer: Box<dyn TransportWriter>,
    decoder: JsonStreamDecoder,
}

impl FakeKodi {
    fn new(server_end: MemoryTransport) -> Self {
        let (reader, writer) = Box::new(server_end).split();
        Self {
            reader,
            writer,
            decoder: JsonStreamDecoder::new(),
        }
    }

    async fn push_notification(&mut self, method: &str, params: Value) {
        let payload = json!({"jsonrpc": "2.0", "method": method, "params": params}).to_string();
        self.writer.send(payload.as_bytes()).await.unwrap();
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

async fn connect_client() -> (KodiClient, FakeKodi) {
    let connector = MemoryConnector::new();
    let (client_end, server_end) = MemoryTransport::pair();
    connector.push(client_end);

    let config = ClientConfig::default().with_call_timeout(Duration::from_secs(5));
    let client = KodiClient::with_connector(Box::new(connector), &config)
        .await
        .expect("connect failed");
    (client, FakeKodi::new(server_end))
}

async fn recv_with_deadline<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> T {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for notification")
        .expect("channel closed")
}

#[tokio::test]
async fn test_matching_notification_invokes_handler_exactly_once() {
    let (client, mut server) = connect_client().await;

    let (tx, mut rx) = mpsc::unbounded_channel();
    client.subscribe("Player.OnPlay", move |note| {
        tx.send(note.params.clone()).map_err(Into::into)
    });

    let payload = json!({"data": {"item": {"type": "movie"}}, "sender": "xbmc"});
    server.push_notification("Player.OnPlay", payload.clone()).await;

    assert_eq!(recv_with_deadline(&mut rx).await, payload);
    // Exactly once: nothing further is queued.
    assert!(rx.try_recv().is_err());

    client.close().await;
}

#[tokio::test]
async fn test_non_matching_notification_is_ignored() {
    let (client, mut server) = connect_client().await;

    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    client.subscribe("Player.OnStop", move |note| {
        tx.send(note.method.clone()).map_err(Into::into)
    });

    server.push_notification("Player.OnPlay", json!({})).await;
    server.push_notification("Player.OnStop", json!({})).await;

    // Only the matching one arrives; delivery is in push order, so the
    // first receive already proves OnPlay was skipped.
    assert_eq!(recv_with_deadline(&mut rx).await, "Player.OnStop");
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_prefix_and_wildcard_subscriptions() {
    let (client, mut server) = connect_client().await;

    let (player_tx, mut player_rx) = mpsc::unbounded_channel::<String>();
    client.subscribe("Player.*", move |note| {
        player_tx.send(note.method.clone()).map_err(Into::into)
    });

    let (all_tx, mut all_rx) = mpsc::unbounded_channel::<String>();
    client.subscribe("*", move |note| {
        all_tx.send(note.method.clone()).map_err(Into::into)
    });

    server.push_notification("Player.OnPause", json!({})).await;
    server.push_notification("System.OnQuit", json!({})).await;

    assert_eq!(recv_with_deadline(&mut player_rx).await, "Player.OnPause");
    assert_eq!(recv_with_deadline(&mut all_rx).await, "Player.OnPause");
    assert_eq!(recv_with_deadline(&mut all_rx).await, "System.OnQuit");
    assert!(player_rx.try_recv().is_err());
}

#[tokio::test]
async fn test_failing_handler_is_isolated_from_others() {
    let (client, mut server) = connect_client().await;

    client.subscribe("*", |_| Err("subscriber exploded".into()));

    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    client.subscribe("*", move |note| {
        tx.send(note.method.clone()).map_err(Into::into)
    });

    server.push_notification("Player.OnPlay", json!({})).await;
    assert_eq!(recv_with_deadline(&mut rx).await, "Player.OnPlay");
}

#[tokio::test]
async fn test_unsubscribe_stops_delivery() {
    let (client, mut server) = connect_client().await;

    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let sub = client.subscribe("Player.*", move |note| {
        tx.send(note.method.clone()).map_err(Into::into)
    });

    server.push_notification("Player.OnPlay", json!({})).await;
    assert_eq!(recv_with_deadline(&mut rx).await, "Player.OnPlay");

    assert!(client.unsubscribe(sub));
    assert!(!client.unsubscribe(sub));

    server.push_notification("Player.OnPause", json!({})).await;
    // The channel closes once the handler (and its sender) is dropped.
    assert!(rx.recv().await.is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_slow_subscriber_does_not_delay_call_resolution() {
    let (client, mut server) = connect_client().await;

    let handler_done = Arc::new(AtomicBool::new(false));
    let done_flag = Arc::clone(&handler_done);
    client.subscribe("Player.OnPlay", move |_| {
        // Deliberately stall the router's dispatch task.
        std::thread::sleep(Duration::from_millis(750));
        done_flag.store(true, Ordering::SeqCst);
        Ok(())
    });

    server.push_notification("Player.OnPlay", json!({})).await;

    // While the handler stalls, a call must still resolve.
    let call = tokio::spawn(async move { client.call("JSONRPC.Ping", Value::Null).await });
    let request = server.next_request().await;
    server.reply_result(request.id, json!("pong")).await;
    assert_eq!(call.await.unwrap().unwrap(), json!("pong"));
    assert!(
        !handler_done.load(Ordering::SeqCst),
        "call resolution waited on the notification handler"
    );
}

#[tokio::test]
async fn test_notifications_interleaved_with_responses() {
    let (client, mut server) = connect_client().await;

    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    client.subscribe("*", move |note| {
        tx.send(note.method.clone()).map_err(Into::into)
    });

    let call = tokio::spawn(async move { client.call("Player.GetProperties", json!({})).await });
    let request = server.next_request().await;

    // A notification arrives between the request and its response, in the
    // same stream.
    server.push_notification("Player.OnAVStart", json!({})).await;
    server.reply_result(request.id, json!({"speed": 1})).await;

    assert_eq!(call.await.unwrap().unwrap(), json!({"speed": 1}));
    assert_eq!(recv_with_deadline(&mut rx).await, "Player.OnAVStart");
}
