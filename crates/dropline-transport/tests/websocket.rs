//! Integration tests for the WebSocket transport.
//!
//! These spin up a real listener on an OS-assigned port and talk to it
//! with a `tokio-tungstenite` client.

#[cfg(feature = "websocket")]
mod websocket {
    use std::time::Duration;

    use dropline_transport::{
        Connection, Handshake, Transport, WebSocketConnection, WebSocketTransport,
    };
    use tokio::io::AsyncWriteExt;
    use futures_util::{SinkExt, StreamExt};
    use tokio_tungstenite::tungstenite::Message;

    type ClientWs = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;

    async fn connect_client(addr: &str) -> ClientWs {
        let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
            .await
            .expect("client should connect");
        ws
    }

    /// Binds on port 0 and returns the transport with its real address.
    async fn bind() -> (WebSocketTransport, String) {
        let transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport.local_addr().expect("local addr").to_string();
        (transport, addr)
    }

    async fn accept_upgraded(transport: &mut WebSocketTransport) -> WebSocketConnection {
        transport
            .accept()
            .await
            .expect("should accept")
            .upgrade()
            .await
            .expect("should upgrade")
    }

    #[tokio::test]
    async fn test_websocket_accept_and_send_receive() {
        let (mut transport, addr) = bind().await;
        let server_handle = tokio::spawn(async move {
            accept_upgraded(&mut transport).await
        });

        let mut client_ws = connect_client(&addr).await;
        let server_conn = server_handle.await.expect("task should complete");
        assert!(server_conn.id().into_inner() > 0);

        // Server sends text, client receives a text frame.
        server_conn
            .send(r#"{"type":"init"}"#)
            .await
            .expect("send should succeed");
        let msg = client_ws.next().await.unwrap().unwrap();
        assert!(msg.is_text());
        assert_eq!(msg.into_text().unwrap().as_str(), r#"{"type":"init"}"#);

        // Client sends text, server receives the bytes.
        client_ws
            .send(Message::text(r#"{"type":"play","column":3}"#))
            .await
            .unwrap();
        let received = server_conn
            .recv()
            .await
            .expect("recv should succeed")
            .expect("should have data");
        assert_eq!(received, br#"{"type":"play","column":3}"#);

        server_conn.close().await.expect("close should succeed");
    }

    #[tokio::test]
    async fn test_websocket_recv_returns_none_on_client_close() {
        let (mut transport, addr) = bind().await;
        let server_handle = tokio::spawn(async move {
            accept_upgraded(&mut transport).await
        });

        let mut client_ws = connect_client(&addr).await;
        let server_conn = server_handle.await.unwrap();

        client_ws.send(Message::Close(None)).await.unwrap();

        let result = server_conn.recv().await.expect("recv should not error");
        assert!(result.is_none(), "should return None on client close");
    }

    #[tokio::test]
    async fn test_websocket_send_not_blocked_by_parked_recv() {
        let (mut transport, addr) = bind().await;
        let server_handle = tokio::spawn(async move {
            accept_upgraded(&mut transport).await
        });

        let mut client_ws = connect_client(&addr).await;
        let server_conn =
            std::sync::Arc::new(server_handle.await.unwrap());

        // Park a reader that will not see any data for a while.
        let reader = std::sync::Arc::clone(&server_conn);
        let parked = tokio::spawn(async move { reader.recv().await });
        tokio::time::sleep(Duration::from_millis(20)).await;

        tokio::time::timeout(Duration::from_secs(2), server_conn.send("hi"))
            .await
            .expect("send must not wait for the reader")
            .expect("send should succeed");
        let msg = client_ws.next().await.unwrap().unwrap();
        assert_eq!(msg.into_text().unwrap().as_str(), "hi");

        client_ws.send(Message::Close(None)).await.unwrap();
        let result = parked.await.unwrap().expect("recv should not error");
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_websocket_connection_ids_are_unique() {
        let (mut transport, addr) = bind().await;
        let server_handle = tokio::spawn(async move {
            let a = accept_upgraded(&mut transport).await;
            let b = accept_upgraded(&mut transport).await;
            (a, b)
        });

        let _c1 = connect_client(&addr).await;
        let _c2 = connect_client(&addr).await;
        let (a, b) = server_handle.await.unwrap();
        assert_ne!(a.id(), b.id());
    }

    #[tokio::test]
    async fn test_websocket_accept_does_not_wait_for_stalled_handshake() {
        let (mut transport, addr) = bind().await;

        // A peer that opens TCP and sends only part of its upgrade request.
        let mut stalled = tokio::net::TcpStream::connect(&addr)
            .await
            .expect("tcp connect");
        stalled
            .write_all(b"GET / HTTP/1.1\r\nHost: ")
            .await
            .expect("partial write");
        let stalled_pending = tokio::time::timeout(
            Duration::from_secs(2),
            transport.accept(),
        )
        .await
        .expect("accept returns before any handshake")
        .expect("should accept");

        let healthy = tokio::spawn({
            let addr = addr.clone();
            async move { connect_client(&addr).await }
        });
        let pending = tokio::time::timeout(
            Duration::from_secs(2),
            transport.accept(),
        )
        .await
        .expect("second accept not held up")
        .expect("should accept");
        let pending_id = pending.id();
        assert_ne!(pending_id, stalled_pending.id());

        let conn = tokio::time::timeout(Duration::from_secs(2), pending.upgrade())
            .await
            .expect("healthy upgrade completes")
            .expect("should upgrade");
        let _client = healthy.await.expect("client task");
        assert_eq!(conn.id(), pending_id, "id is kept across the upgrade");
        drop(stalled_pending);
    }
}
