//! Session tests against in-memory and loopback transports

#[cfg(test)]
mod tests {
    use crate::{
        CloseReason, ConnectionState, Gateway, GatewayConfig, GatewayError, GatewayMessage,
        ProxyConfig, SessionFault,
    };
    use derailed_events::{EventBus, EventError};
    use futures::channel::mpsc;
    use futures::{SinkExt, StreamExt};
    use serde_json::{json, Value};
    use std::net::SocketAddr;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::sync::{mpsc as tokio_mpsc, oneshot};
    use tokio::task::JoinHandle;
    use tokio::time::timeout;
    use tokio_tungstenite::tungstenite::{Error as WsError, Message};

    const WAIT: Duration = Duration::from_secs(5);
    const QUIET: Duration = Duration::from_millis(100);

    /// Server side of an in-memory transport.
    struct MockPeer {
        inbound: mpsc::UnboundedSender<Result<Message, WsError>>,
        outbound: mpsc::UnboundedReceiver<Message>,
    }

    impl MockPeer {
        fn push(&self, frame: Value) {
            self.push_raw(&frame.to_string());
        }

        fn push_raw(&self, text: &str) {
            self.inbound
                .unbounded_send(Ok(Message::text(text.to_string())))
                .unwrap();
        }

        fn push_message(&self, message: Result<Message, WsError>) {
            self.inbound.unbounded_send(message).unwrap();
        }

        async fn next_sent(&mut self) -> Message {
            timeout(WAIT, self.outbound.next())
                .await
                .expect("timed out waiting for an outbound frame")
                .expect("outbound channel closed")
        }

        async fn next_sent_json(&mut self) -> Value {
            match self.next_sent().await {
                Message::Text(text) => serde_json::from_str(text.as_str()).unwrap(),
                other => panic!("expected a text frame, got {other:?}"),
            }
        }

        async fn assert_nothing_sent(&mut self) {
            if let Ok(frame) = timeout(QUIET, self.outbound.next()).await {
                assert!(frame.is_none(), "unexpected outbound frame: {frame:?}");
            }
        }
    }

    async fn attach_mock(gateway: &Gateway, token: &str) -> MockPeer {
        let (out_tx, out_rx) = mpsc::unbounded::<Message>();
        let (in_tx, in_rx) = mpsc::unbounded::<Result<Message, WsError>>();

        gateway
            .attach(out_tx.sink_map_err(|_| WsError::ConnectionClosed), in_rx, token)
            .await
            .unwrap();

        MockPeer {
            inbound: in_tx,
            outbound: out_rx,
        }
    }

    /// Collects emitted events; `SYNC` marks the end of a batch of frames.
    struct Recorder {
        rx: tokio_mpsc::UnboundedReceiver<(String, Value)>,
    }

    impl Recorder {
        async fn listen(events: &EventBus, names: &[&str]) -> Self {
            let (tx, rx) = tokio_mpsc::unbounded_channel();
            for name in names.iter().copied().chain(["SYNC"]) {
                let tx = tx.clone();
                let event_name = name.to_string();
                events
                    .subscribe(name, move |payload| {
                        let _ = tx.send((event_name.clone(), payload));
                        futures::future::ready(Ok(()))
                    })
                    .await
                    .unwrap();
            }
            Self { rx }
        }

        async fn next(&mut self) -> (String, Value) {
            timeout(WAIT, self.rx.recv())
                .await
                .expect("timed out waiting for an event")
                .expect("event channel closed")
        }

        /// Pushes a `SYNC` dispatch and returns everything emitted before it.
        async fn sync(&mut self, peer: &MockPeer) -> Vec<(String, Value)> {
            peer.push(json!({"op": 0, "t": "SYNC"}));
            let mut seen = Vec::new();
            loop {
                let (name, payload) = self.next().await;
                if name == "SYNC" {
                    return seen;
                }
                seen.push((name, payload));
            }
        }
    }

    fn mock_gateway() -> Gateway {
        Gateway::new(GatewayConfig::new("ws://127.0.0.1:1/gateway"))
    }

    async fn wait_for(gateway: &Gateway, state: ConnectionState) {
        timeout(WAIT, gateway.wait_for_state(state))
            .await
            .expect("timed out waiting for state")
            .unwrap();
    }

    #[tokio::test]
    async fn hello_sends_exactly_one_identify() {
        let gateway = mock_gateway();
        let mut recorder = Recorder::listen(gateway.events(), &[]).await;
        let mut peer = attach_mock(&gateway, "abc").await;
        assert_eq!(gateway.state(), ConnectionState::AwaitingHello);

        peer.push(json!({"op": 4, "d": {}, "s": 1}));

        let identify = peer.next_sent_json().await;
        assert_eq!(identify, json!({"op": 1, "d": {"token": "abc"}}));
        wait_for(&gateway, ConnectionState::AwaitingReady).await;

        recorder.sync(&peer).await;
        peer.assert_nothing_sent().await;
    }

    #[tokio::test]
    async fn identify_failure_is_reported_and_state_kept() {
        let gateway = mock_gateway();
        let mut faults = gateway.faults();
        let mut recorder = Recorder::listen(gateway.events(), &[]).await;
        let mut peer = attach_mock(&gateway, "abc").await;
        // Closing the receiving end makes every write to the sink fail
        peer.outbound.close();

        peer.push(json!({"op": 4, "s": 1}));
        recorder.sync(&peer).await;

        let fault = timeout(WAIT, faults.recv()).await.unwrap().unwrap();
        assert!(matches!(fault, SessionFault::Transport(_)));
        assert_eq!(gateway.state(), ConnectionState::AwaitingHello);
        assert_eq!(gateway.sequence().await, Some(1));
        assert!(gateway.is_running().await);
    }

    #[tokio::test]
    async fn ready_emits_once_and_completes_handshake() {
        let gateway = mock_gateway();
        let mut recorder = Recorder::listen(gateway.events(), &["READY"]).await;
        let mut peer = attach_mock(&gateway, "abc").await;

        peer.push(json!({"op": 4, "s": 1}));
        peer.next_sent_json().await;
        peer.push(json!({"op": 1, "d": {"user": "bob"}, "s": 2}));

        let seen = recorder.sync(&peer).await;
        assert_eq!(seen, vec![("READY".to_string(), json!({"user": "bob"}))]);
        assert_eq!(gateway.state(), ConnectionState::Ready);
    }

    #[tokio::test]
    async fn dispatch_is_delivered_in_any_state() {
        let gateway = mock_gateway();
        let mut recorder = Recorder::listen(gateway.events(), &["MESSAGE_CREATE"]).await;
        let peer = attach_mock(&gateway, "abc").await;

        peer.push_raw(r#"{"op":0,"t":"MESSAGE_CREATE","d":{"id":42},"s":7}"#);

        let seen = recorder.sync(&peer).await;
        assert_eq!(seen, vec![("MESSAGE_CREATE".to_string(), json!({"id": 42}))]);
        assert_eq!(gateway.sequence().await, Some(7));
        assert_eq!(gateway.state(), ConnectionState::AwaitingHello);
    }

    #[tokio::test]
    async fn sequence_is_last_write_wins() {
        let gateway = mock_gateway();
        let mut recorder = Recorder::listen(gateway.events(), &["PING"]).await;
        let peer = attach_mock(&gateway, "abc").await;

        peer.push(json!({"op": 0, "t": "PING", "d": {}, "s": 5}));
        peer.push(json!({"op": 0, "t": "PING", "d": {}, "s": 3}));

        assert_eq!(recorder.sync(&peer).await.len(), 2);
        assert_eq!(gateway.sequence().await, Some(3));
    }

    #[tokio::test]
    async fn send_without_transport_is_not_connected() {
        let gateway = mock_gateway();

        let result = gateway.send(&GatewayMessage::new(3, Value::Null)).await;
        assert!(matches!(result, Err(GatewayError::NotConnected)));
        assert!(matches!(gateway.identify().await, Err(GatewayError::NotConnected)));
        assert!(matches!(gateway.close(WAIT).await, Err(GatewayError::NotConnected)));
        assert_eq!(gateway.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn send_after_close_is_not_connected_and_silent() {
        let gateway = mock_gateway();
        let mut peer = attach_mock(&gateway, "abc").await;

        gateway.send(&GatewayMessage::new(3, json!({"n": 1}))).await.unwrap();
        assert_eq!(peer.next_sent_json().await, json!({"op": 3, "d": {"n": 1}}));

        let (end, ()) = tokio::join!(gateway.close(WAIT), async {
            assert!(matches!(peer.next_sent().await, Message::Close(None)));
            peer.push_message(Ok(Message::Close(None)));
        });
        let end = end.unwrap();
        assert!(matches!(end.reason, CloseReason::ClosedByPeer { code: None, .. }));
        assert_eq!(gateway.state(), ConnectionState::Disconnected);

        let result = gateway.send(&GatewayMessage::new(3, Value::Null)).await;
        assert!(matches!(result, Err(GatewayError::NotConnected)));
        // The writer was dropped, so the peer sees the channel end with nothing queued
        assert!(timeout(WAIT, peer.outbound.next()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn malformed_frame_is_reported_and_skipped() {
        let gateway = mock_gateway();
        let mut faults = gateway.faults();
        let mut recorder = Recorder::listen(gateway.events(), &["PING"]).await;
        let peer = attach_mock(&gateway, "abc").await;

        peer.push_raw("{not json");
        peer.push(json!({"op": 0, "t": "PING", "d": {}, "s": 1}));

        assert_eq!(recorder.sync(&peer).await.len(), 1);
        match timeout(WAIT, faults.recv()).await.unwrap().unwrap() {
            SessionFault::MalformedFrame { preview, .. } => assert_eq!(preview, "{not json"),
            other => panic!("unexpected fault {other:?}"),
        }
        assert!(gateway.is_running().await);
    }

    #[tokio::test]
    async fn handler_failure_reaches_fault_channel() {
        let gateway = mock_gateway();
        let mut faults = gateway.faults();
        gateway
            .events()
            .subscribe("MESSAGE_CREATE", |_| async { Err(EventError::handler("boom")) })
            .await
            .unwrap();
        let mut recorder = Recorder::listen(gateway.events(), &["MESSAGE_CREATE"]).await;
        let peer = attach_mock(&gateway, "abc").await;

        peer.push(json!({"op": 0, "t": "MESSAGE_CREATE", "d": {"id": 1}, "s": 1}));
        peer.push(json!({"op": 0, "t": "MESSAGE_CREATE", "d": {"id": 2}, "s": 2}));

        // The recorder subscribed after the failing handler and still sees both
        let seen = recorder.sync(&peer).await;
        assert_eq!(seen.len(), 2);

        match timeout(WAIT, faults.recv()).await.unwrap().unwrap() {
            SessionFault::Handler(failure) => {
                assert_eq!(failure.event_name, "MESSAGE_CREATE");
                assert!(failure.message.contains("boom"));
            }
            other => panic!("unexpected fault {other:?}"),
        }
        assert_eq!(gateway.sequence().await, Some(2));
    }

    #[tokio::test]
    async fn unknown_op_is_ignored() {
        let gateway = mock_gateway();
        let mut faults = gateway.faults();
        let mut recorder = Recorder::listen(gateway.events(), &[]).await;
        let mut peer = attach_mock(&gateway, "abc").await;

        peer.push(json!({"op": 9, "d": {"x": 1}, "s": 4}));

        assert!(recorder.sync(&peer).await.is_empty());
        assert_eq!(gateway.state(), ConnectionState::AwaitingHello);
        assert_eq!(gateway.sequence().await, Some(4));
        assert!(faults.try_recv().is_err());
        peer.assert_nothing_sent().await;
    }

    #[tokio::test]
    async fn negative_op_is_ignored_and_sequence_recorded() {
        let gateway = mock_gateway();
        let mut faults = gateway.faults();
        let mut recorder = Recorder::listen(gateway.events(), &[]).await;
        let mut peer = attach_mock(&gateway, "abc").await;

        peer.push_raw(r#"{"op":-1,"s":5}"#);

        assert!(recorder.sync(&peer).await.is_empty());
        assert_eq!(gateway.sequence().await, Some(5));
        assert_eq!(gateway.state(), ConnectionState::AwaitingHello);
        assert!(faults.try_recv().is_err());
        peer.assert_nothing_sent().await;
    }

    #[tokio::test]
    async fn ack_sets_flag_without_changing_state() {
        let gateway = mock_gateway();
        let mut recorder = Recorder::listen(gateway.events(), &[]).await;
        let peer = attach_mock(&gateway, "abc").await;
        assert!(!gateway.ack_received().await);

        peer.push(json!({"op": 3, "s": 2}));

        recorder.sync(&peer).await;
        assert!(gateway.ack_received().await);
        assert_eq!(gateway.state(), ConnectionState::AwaitingHello);
    }

    #[tokio::test]
    async fn repeated_hello_is_a_protocol_violation() {
        let gateway = mock_gateway();
        let mut faults = gateway.faults();
        let mut recorder = Recorder::listen(gateway.events(), &[]).await;
        let mut peer = attach_mock(&gateway, "abc").await;

        peer.push(json!({"op": 4, "s": 1}));
        peer.next_sent_json().await;
        peer.push(json!({"op": 4, "s": 2}));

        recorder.sync(&peer).await;
        peer.assert_nothing_sent().await;
        assert_eq!(gateway.state(), ConnectionState::AwaitingReady);
        assert_eq!(gateway.sequence().await, Some(2));
        assert_eq!(
            timeout(WAIT, faults.recv()).await.unwrap().unwrap(),
            SessionFault::ProtocolViolation {
                op: 4,
                state: ConnectionState::AwaitingReady,
                detail: "HELLO after the handshake started".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn ready_before_hello_is_not_emitted() {
        let gateway = mock_gateway();
        let mut faults = gateway.faults();
        let mut recorder = Recorder::listen(gateway.events(), &["READY"]).await;
        let peer = attach_mock(&gateway, "abc").await;

        peer.push(json!({"op": 1, "d": {"user": "bob"}, "s": 1}));

        assert!(recorder.sync(&peer).await.is_empty());
        assert_eq!(gateway.state(), ConnectionState::AwaitingHello);
        assert!(matches!(
            timeout(WAIT, faults.recv()).await.unwrap().unwrap(),
            SessionFault::ProtocolViolation { op: 1, .. }
        ));
    }

    #[tokio::test]
    async fn non_text_frames_are_ignored() {
        let gateway = mock_gateway();
        let mut recorder = Recorder::listen(gateway.events(), &[]).await;
        let peer = attach_mock(&gateway, "abc").await;

        peer.push_message(Ok(Message::binary(b"{\"op\":4}".to_vec())));
        peer.push_message(Ok(Message::Ping(Vec::new().into())));

        recorder.sync(&peer).await;
        assert_eq!(gateway.state(), ConnectionState::AwaitingHello);
    }

    #[tokio::test]
    async fn transport_error_ends_session() {
        let gateway = mock_gateway();
        let mut faults = gateway.faults();
        let peer = attach_mock(&gateway, "abc").await;

        peer.push(json!({"op": 0, "t": "PING", "d": {}, "s": 9}));
        peer.push_message(Err(WsError::ConnectionClosed));

        let end = timeout(WAIT, gateway.wait_until_closed()).await.unwrap().unwrap();
        assert!(matches!(end.reason, CloseReason::TransportError(_)));
        assert_eq!(end.last_sequence, Some(9));
        assert_eq!(end.frames_processed, 1);
        assert_eq!(gateway.state(), ConnectionState::Disconnected);
        assert!(matches!(
            faults.recv().await.unwrap(),
            SessionFault::Transport(_)
        ));
    }

    #[tokio::test]
    async fn dropped_stream_ends_session() {
        let gateway = mock_gateway();
        let peer = attach_mock(&gateway, "abc").await;
        drop(peer);

        let end = timeout(WAIT, gateway.wait_until_closed()).await.unwrap().unwrap();
        assert_eq!(end.reason, CloseReason::StreamEnded);
        assert_eq!(end.last_sequence, None);
        assert!(!gateway.is_running().await);
    }

    #[tokio::test]
    async fn wait_for_state_fails_once_session_has_ended() {
        let gateway = mock_gateway();
        let peer = attach_mock(&gateway, "abc").await;
        drop(peer);
        timeout(WAIT, gateway.wait_until_closed()).await.unwrap().unwrap();

        let result = timeout(WAIT, gateway.wait_for_state(ConnectionState::Ready))
            .await
            .expect("wait_for_state hung on an ended session");
        assert!(matches!(result, Err(GatewayError::NotConnected)));
        wait_for(&gateway, ConnectionState::Disconnected).await;
    }

    #[tokio::test]
    async fn wait_for_state_fails_when_session_ends_during_handshake() {
        let gateway = mock_gateway();
        let mut peer = attach_mock(&gateway, "abc").await;
        peer.push(json!({"op": 4, "s": 1}));
        peer.next_sent_json().await;

        let (result, ()) = tokio::join!(
            timeout(WAIT, gateway.wait_for_state(ConnectionState::Ready)),
            async move {
                tokio::time::sleep(QUIET).await;
                drop(peer);
            }
        );

        let result = result.expect("wait_for_state hung after the transport closed");
        assert!(matches!(result, Err(GatewayError::NotConnected)));
        assert_eq!(gateway.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn close_gives_up_on_a_silent_peer() {
        let gateway = mock_gateway();
        let mut peer = attach_mock(&gateway, "abc").await;

        let result = timeout(WAIT, gateway.close(QUIET))
            .await
            .expect("close ignored its grace period");
        assert!(matches!(result, Err(GatewayError::CloseTimeout(grace)) if grace == QUIET));
        assert!(matches!(peer.next_sent().await, Message::Close(None)));

        assert_eq!(gateway.state(), ConnectionState::Disconnected);
        assert!(!gateway.is_running().await);
        let send = gateway.send(&GatewayMessage::new(3, Value::Null)).await;
        assert!(matches!(send, Err(GatewayError::NotConnected)));
    }

    #[tokio::test]
    async fn reattaching_replaces_the_previous_session() {
        let gateway = mock_gateway();
        let mut recorder = Recorder::listen(gateway.events(), &[]).await;
        let mut first = attach_mock(&gateway, "first").await;
        first.push(json!({"op": 3, "s": 10}));
        recorder.sync(&first).await;
        let first_id = gateway.session_id().await;

        let mut second = attach_mock(&gateway, "second").await;

        assert_ne!(gateway.session_id().await, first_id);
        assert_eq!(gateway.sequence().await, None);
        assert!(!gateway.ack_received().await);
        assert_eq!(gateway.state(), ConnectionState::AwaitingHello);
        assert!(timeout(WAIT, first.outbound.next()).await.unwrap().is_none());

        second.push(json!({"op": 4, "s": 1}));
        assert_eq!(
            second.next_sent_json().await,
            json!({"op": 1, "d": {"token": "second"}})
        );
    }

    #[tokio::test]
    async fn empty_token_is_rejected() {
        let gateway = mock_gateway();
        let (out_tx, _out_rx) = mpsc::unbounded::<Message>();
        let (_in_tx, in_rx) = mpsc::unbounded::<Result<Message, WsError>>();

        let result = gateway
            .attach(out_tx.sink_map_err(|_| WsError::ConnectionClosed), in_rx, "")
            .await;
        assert!(matches!(result, Err(GatewayError::EmptyToken)));
        assert!(matches!(gateway.connect("").await, Err(GatewayError::EmptyToken)));
        assert_eq!(gateway.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn connect_rejects_non_websocket_uri() {
        let gateway = Gateway::new(GatewayConfig::new("http://127.0.0.1:1/gateway"));
        assert!(matches!(
            gateway.connect("abc").await,
            Err(GatewayError::InvalidUri(_))
        ));
    }

    /// Loopback gateway server: HELLO, expect identify, READY, PING, then
    /// close once told to. Resolves to the identify frame it received.
    async fn spawn_gateway_server() -> (SocketAddr, oneshot::Sender<()>, JoinHandle<Value>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (close_tx, close_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();

            ws.send(Message::text(json!({"op": 4, "d": {}, "s": 1}).to_string()))
                .await
                .unwrap();

            let identify = loop {
                match ws.next().await {
                    Some(Ok(Message::Text(text))) => {
                        break serde_json::from_str::<Value>(text.as_str()).unwrap()
                    }
                    Some(Ok(_)) => continue,
                    other => panic!("connection ended before identify: {other:?}"),
                }
            };

            ws.send(Message::text(json!({"op": 1, "d": {"user": "bob"}, "s": 2}).to_string()))
                .await
                .unwrap();
            ws.send(Message::text(json!({"op": 0, "t": "PING", "d": {}, "s": 3}).to_string()))
                .await
                .unwrap();

            let _ = close_rx.await;
            let _ = ws.close(None).await;
            while let Some(Ok(_)) = ws.next().await {}

            identify
        });

        (addr, close_tx, handle)
    }

    #[tokio::test]
    async fn end_to_end_handshake_over_websocket() {
        let (addr, close_tx, server) = spawn_gateway_server().await;
        let gateway = Gateway::new(GatewayConfig::new(format!("ws://{addr}/gateway")));
        let mut recorder = Recorder::listen(gateway.events(), &["READY", "PING"]).await;

        gateway.connect("abc").await.unwrap();

        assert_eq!(
            recorder.next().await,
            ("READY".to_string(), json!({"user": "bob"}))
        );
        wait_for(&gateway, ConnectionState::Ready).await;
        assert_eq!(recorder.next().await, ("PING".to_string(), json!({})));

        close_tx.send(()).unwrap();
        let end = timeout(WAIT, gateway.wait_until_closed()).await.unwrap().unwrap();
        assert!(matches!(end.reason, CloseReason::ClosedByPeer { .. }));
        assert_eq!(end.last_sequence, Some(3));
        assert_eq!(end.frames_processed, 3);
        assert_eq!(gateway.state(), ConnectionState::Disconnected);

        let identify = timeout(WAIT, server).await.unwrap().unwrap();
        assert_eq!(identify, json!({"op": 1, "d": {"token": "abc"}}));
    }

    /// Minimal HTTP CONNECT proxy that answers with `reply` and, on 200,
    /// splices the client to `upstream`. Resolves to the request head.
    async fn spawn_proxy(
        upstream: SocketAddr,
        reply: &'static str,
    ) -> (SocketAddr, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (head_tx, head_rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut client, _) = listener.accept().await.unwrap();

            let mut head = Vec::new();
            let mut byte = [0u8; 1];
            while !head.ends_with(b"\r\n\r\n") {
                client.read_exact(&mut byte).await.unwrap();
                head.push(byte[0]);
            }
            let _ = head_tx.send(String::from_utf8(head).unwrap());

            client.write_all(reply.as_bytes()).await.unwrap();
            if reply.starts_with("HTTP/1.1 200") {
                let mut server = TcpStream::connect(upstream).await.unwrap();
                let _ = tokio::io::copy_bidirectional(&mut client, &mut server).await;
            }
        });

        (addr, head_rx)
    }

    #[tokio::test]
    async fn connects_through_authenticated_proxy() {
        let (upstream, close_tx, server) = spawn_gateway_server().await;
        let (proxy_addr, head_rx) =
            spawn_proxy(upstream, "HTTP/1.1 200 Connection established\r\n\r\n").await;

        let config = GatewayConfig::new(format!("ws://{upstream}/gateway")).with_proxy(
            ProxyConfig::new(proxy_addr.ip().to_string(), proxy_addr.port())
                .with_credentials("user", "pass"),
        );
        let gateway = Gateway::new(config);

        gateway.connect("abc").await.unwrap();
        wait_for(&gateway, ConnectionState::Ready).await;

        let head = head_rx.await.unwrap();
        assert!(head.starts_with(&format!("CONNECT {upstream} HTTP/1.1\r\n")));
        assert!(head.contains("Proxy-Authorization: Basic dXNlcjpwYXNz\r\n"));

        close_tx.send(()).unwrap();
        timeout(WAIT, gateway.wait_until_closed()).await.unwrap().unwrap();
        let identify = timeout(WAIT, server).await.unwrap().unwrap();
        assert_eq!(identify["d"]["token"], "abc");
    }

    #[tokio::test]
    async fn proxy_refusal_is_reported() {
        let unused: SocketAddr = "127.0.0.1:9".parse().unwrap();
        let (proxy_addr, _head_rx) =
            spawn_proxy(unused, "HTTP/1.1 407 Proxy Authentication Required\r\n\r\n").await;

        let config = GatewayConfig::new("ws://127.0.0.1:9/gateway")
            .with_proxy(ProxyConfig::new(proxy_addr.ip().to_string(), proxy_addr.port()));
        let gateway = Gateway::new(config);

        match gateway.connect("abc").await {
            Err(GatewayError::Proxy(message)) => assert!(message.contains("407")),
            other => panic!("expected proxy error, got {other:?}"),
        }
        assert_eq!(gateway.state(), ConnectionState::Disconnected);
    }
}
