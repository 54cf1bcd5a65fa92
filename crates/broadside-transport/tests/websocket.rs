//! Integration tests for the WebSocket connector.
//!
//! Each test runs a real `tokio-tungstenite` server on an OS-assigned
//! port and drives the client side through the `Connector` /
//! `Connection` traits.

#[cfg(feature = "websocket")]
mod websocket {
    use broadside_transport::{
        CloseInfo, Connection, Connector, Frame, TransportError, WebSocketConnector,
    };
    use futures_util::{SinkExt, StreamExt};
    use tokio::net::TcpListener;
    use tokio_tungstenite::tungstenite::Message;
    use tokio_tungstenite::tungstenite::protocol::CloseFrame;
    use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

    type ServerWs = tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>;

    /// Binds a listener and returns it with the `ws://` URL pointing at it.
    async fn listen() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("should bind");
        let addr = listener.local_addr().expect("should have addr");
        (listener, format!("ws://{addr}/ws"))
    }

    async fn accept(listener: &TcpListener) -> ServerWs {
        let (stream, _) = listener.accept().await.expect("should accept");
        tokio_tungstenite::accept_async(stream)
            .await
            .expect("handshake should succeed")
    }

    #[tokio::test]
    async fn test_websocket_connect_and_exchange_text() {
        let (listener, url) = listen().await;
        let server = tokio::spawn(async move { accept(&listener).await });

        let conn = WebSocketConnector.connect(&url).await.expect("should connect");
        let mut server_ws = server.await.expect("task should complete");
        assert!(conn.id().into_inner() > 0);

        // Server → client.
        server_ws
            .send(Message::text(r#"{"type":"PONG"}"#))
            .await
            .unwrap();
        let frame = conn.recv().await.expect("recv should succeed");
        assert_eq!(frame, Frame::Text(r#"{"type":"PONG"}"#.into()));

        // Client → server.
        conn.send_text(r#"{"type":"PING"}"#).await.expect("send should succeed");
        let msg = server_ws.next().await.unwrap().unwrap();
        assert_eq!(msg.to_text().unwrap(), r#"{"type":"PING"}"#);
    }

    #[tokio::test]
    async fn test_websocket_recv_reports_server_close_code() {
        let (listener, url) = listen().await;
        let server = tokio::spawn(async move {
            let mut ws = accept(&listener).await;
            ws.close(Some(CloseFrame {
                code: CloseCode::Library(4001),
                reason: "room gone".into(),
            }))
            .await
            .unwrap();
            // Keep the socket alive until the client has read the frame.
            while let Some(Ok(_)) = ws.next().await {}
        });

        let conn = WebSocketConnector.connect(&url).await.unwrap();
        let frame = conn.recv().await.expect("recv should succeed");
        assert_eq!(frame, Frame::Closed(CloseInfo::new(4001, "room gone")));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_websocket_dropped_socket_is_abnormal() {
        let (listener, url) = listen().await;
        let server = tokio::spawn(async move {
            let ws = accept(&listener).await;
            drop(ws);
        });

        let conn = WebSocketConnector.connect(&url).await.unwrap();
        server.await.unwrap();

        // Depending on timing the stream either ends or errors; both
        // mean "no close handshake".
        match conn.recv().await {
            Ok(Frame::Closed(info)) => assert!(!info.is_normal()),
            Err(TransportError::ReceiveFailed(_)) => {}
            other => panic!("expected abnormal end, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_websocket_client_close_sends_normal_code() {
        let (listener, url) = listen().await;
        let server = tokio::spawn(async move {
            let mut ws = accept(&listener).await;
            loop {
                match ws.next().await {
                    Some(Ok(Message::Close(frame))) => return frame,
                    Some(Ok(_)) => continue,
                    _ => return None,
                }
            }
        });

        let conn = WebSocketConnector.connect(&url).await.unwrap();
        conn.close().await.expect("close should succeed");

        let frame = server.await.unwrap().expect("should carry a close frame");
        assert_eq!(u16::from(frame.code), CloseInfo::NORMAL);
    }

    #[tokio::test]
    async fn test_websocket_connect_refused_is_connect_failed() {
        let (listener, url) = listen().await;
        drop(listener);

        let err = WebSocketConnector.connect(&url).await.err().expect("should fail");
        assert!(matches!(err, TransportError::ConnectFailed { .. }));
    }
}
