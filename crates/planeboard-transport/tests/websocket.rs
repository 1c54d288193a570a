//! Integration tests for the WebSocket transport.
//!
//! These spin up a real listener on an OS-assigned port and talk to it
//! with a plain `tokio-tungstenite` client.

#[cfg(feature = "websocket")]
mod websocket {
    use futures_util::{SinkExt, StreamExt};
    use planeboard_transport::{
        Connection, Frame, Transport, TransportError, WebSocketTransport,
    };
    use tokio_tungstenite::tungstenite::Message;

    type ClientWs = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;

    async fn bind() -> (WebSocketTransport, String) {
        let transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind")
            .with_required_params(&["room"]);
        let addr = transport.local_addr().expect("local addr").to_string();
        (transport, addr)
    }

    async fn connect_client(url: String) -> ClientWs {
        let (ws, _) = tokio_tungstenite::connect_async(&url)
            .await
            .expect("client should connect");
        ws
    }

    #[tokio::test]
    async fn test_accept_captures_query_and_exchanges_frames() {
        let (mut transport, addr) = bind().await;
        let server = tokio::spawn(async move {
            transport.accept().await.expect("should accept")
        });

        let mut client =
            connect_client(format!("ws://{addr}/ws?room=R1&username=alice"))
                .await;
        let conn = server.await.expect("task should complete");

        assert_eq!(conn.query().get("room"), Some("R1"));
        assert_eq!(conn.query().get("username"), Some("alice"));

        client
            .send(Message::text(r#"{"type":"DRAW_CARD"}"#))
            .await
            .expect("client send");
        let frame = conn.recv().await.expect("recv").expect("frame");
        assert_eq!(frame, Frame::Data(br#"{"type":"DRAW_CARD"}"#.to_vec()));

        conn.send(br#"{"type":"TURN_PASSED","turn":"alice"}"#)
            .await
            .expect("server send");
        let msg = client.next().await.expect("message").expect("ok");
        assert!(msg.is_text());
        assert_eq!(
            msg.into_text().expect("text").as_str(),
            r#"{"type":"TURN_PASSED","turn":"alice"}"#
        );
    }

    #[tokio::test]
    async fn test_missing_room_is_rejected_before_upgrade() {
        let (mut transport, addr) = bind().await;
        let server = tokio::spawn(async move { transport.accept().await });

        let result =
            tokio_tungstenite::connect_async(format!("ws://{addr}/ws?username=bob"))
                .await;
        assert!(result.is_err(), "upgrade should be refused");

        let accepted = server.await.expect("task should complete");
        assert!(matches!(accepted, Err(TransportError::MissingParam("room"))));
    }

    #[tokio::test]
    async fn test_ping_is_answered_with_pong() {
        let (mut transport, addr) = bind().await;
        let server = tokio::spawn(async move {
            transport.accept().await.expect("should accept")
        });
        let mut client = connect_client(format!("ws://{addr}/?room=R2")).await;
        let conn = server.await.expect("task should complete");

        conn.ping().await.expect("ping");

        // Reading on the client side lets tungstenite queue the pong reply;
        // the pong is flushed together with the next outgoing client frame.
        let client_task = tokio::spawn(async move {
            let msg = client.next().await.expect("ping arrives").expect("ok");
            assert!(msg.is_ping());
            client.send(Message::text("{}")).await.expect("send");
            client
        });

        let frame = conn.recv().await.expect("recv").expect("frame");
        assert_eq!(frame, Frame::Pong);
        let _client = client_task.await.expect("client task");
    }

    #[tokio::test]
    async fn test_client_close_yields_none() {
        let (mut transport, addr) = bind().await;
        let server = tokio::spawn(async move {
            transport.accept().await.expect("should accept")
        });
        let mut client = connect_client(format!("ws://{addr}/?room=R3")).await;
        let conn = server.await.expect("task should complete");

        client.close(None).await.expect("close");
        assert_eq!(conn.recv().await.expect("recv"), None);
    }
}
