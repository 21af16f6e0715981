#![allow(
    clippy::unwrap_used,
    clippy::missing_panics_doc,
    reason = "Do not need additional syntax for setting up tests"
)]

mod common;

use std::time::Duration;

use common::{Action, MockWsServer, has_entry, pump_for, pump_until};
use socket_probe::ConnectionManager;
use socket_probe::session::{Protocol, Status};
use socket_probe::types::{BINARY_PLACEHOLDER, Direction, Level, MessageKind, PayloadKind};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message as Frame;

async fn connected(server: &MockWsServer) -> ConnectionManager {
    let mut manager = ConnectionManager::default();
    manager.connect(&server.url());
    pump_until(&mut manager, ConnectionManager::is_connected).await;
    manager
}

mod connect {
    use super::*;

    #[tokio::test]
    async fn greeting_scenario_produces_three_entries() {
        let server = MockWsServer::start_with_greeting(Some("hello")).await;
        let mut manager = ConnectionManager::default();

        manager.connect(&server.url());
        pump_until(&mut manager, |m| m.messages().len() >= 3).await;

        let messages = manager.messages();
        assert_eq!(messages.len(), 3);

        assert_eq!(messages[0].kind, MessageKind::Connection);
        assert_eq!(messages[0].level, Some(Level::Info));
        assert_eq!(messages[0].content, format!("Connecting to {}...", server.url()));

        assert_eq!(messages[1].level, Some(Level::Success));
        assert_eq!(messages[1].content, "Connection established successfully");

        assert_eq!(messages[2].direction, Direction::Received);
        assert_eq!(messages[2].kind, MessageKind::Text);
        assert_eq!(messages[2].content, "hello");
        assert!(messages[2].event.is_none());

        assert!(manager.is_connected());
        assert!(manager.error().is_none());
        assert_eq!(manager.protocol(), Some(Protocol::WebSocket));
    }

    #[tokio::test]
    async fn refused_connection_reports_error_then_abnormal_close() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };
        let mut manager = ConnectionManager::default();

        manager.connect(&format!("ws://127.0.0.1:{port}"));
        pump_until(&mut manager, |m| m.messages().len() >= 3).await;

        assert!(!manager.is_connected());
        assert!(manager.error().unwrap().starts_with("WebSocket error occurred:"));
        assert_eq!(manager.status(), Status::Disconnected);

        let levels: Vec<_> = manager.messages().iter().map(|m| m.level).collect();
        assert_eq!(
            levels,
            [Some(Level::Info), Some(Level::Error), Some(Level::Warning)]
        );
        assert_eq!(
            manager.messages()[2].content,
            "Connection closed with code 1006"
        );
    }

    #[tokio::test]
    async fn reconnect_clears_previous_error() {
        let server = MockWsServer::start().await;
        let mut manager = ConnectionManager::default();

        manager.send_message("too early", PayloadKind::Text, None);
        assert!(manager.error().is_some());

        manager.connect(&server.url());
        pump_until(&mut manager, ConnectionManager::is_connected).await;

        assert!(manager.error().is_none());
    }
}

mod traffic {
    use super::*;

    #[tokio::test]
    async fn text_is_sent_verbatim() {
        let mut server = MockWsServer::start().await;
        let mut manager = connected(&server).await;

        manager.send_message(r#"{"a":1}"#, PayloadKind::Text, Some("ignored"));

        let frame = server.recv().await.unwrap();
        assert_eq!(frame, Frame::Text(r#"{"a":1}"#.into()));

        let sent = manager.messages().last().unwrap();
        assert_eq!(sent.direction, Direction::Sent);
        assert_eq!(sent.kind, MessageKind::Text);
        assert_eq!(sent.content, r#"{"a":1}"#);
        assert!(sent.event.is_none());
    }

    #[tokio::test]
    async fn binary_is_sent_as_utf8_bytes() {
        let mut server = MockWsServer::start().await;
        let mut manager = connected(&server).await;

        manager.send_message("héllo", PayloadKind::Binary, None);

        let frame = server.recv().await.unwrap();
        assert_eq!(frame, Frame::Binary("héllo".as_bytes().to_vec().into()));

        let messages = manager.messages();
        let tail = &messages[messages.len() - 2..];
        assert_eq!(tail[0].content, "Sent binary message (6 bytes)");
        assert_eq!(tail[1].direction, Direction::Sent);
        assert_eq!(tail[1].kind, MessageKind::Binary);
        assert_eq!(tail[1].content, "héllo");
    }

    #[tokio::test]
    async fn binary_is_received_as_placeholder() {
        let server = MockWsServer::start().await;
        let mut manager = connected(&server).await;
        let before = manager.messages().len();

        server.act(Action::Send(Frame::Binary(vec![1_u8, 2, 3].into())));
        pump_until(&mut manager, |m| m.messages().len() >= before + 2).await;

        let messages = &manager.messages()[before..];
        assert_eq!(messages[0].level, Some(Level::Info));
        assert_eq!(messages[0].content, "Received binary message (3 bytes)");
        assert_eq!(messages[1].direction, Direction::Received);
        assert_eq!(messages[1].kind, MessageKind::Binary);
        assert_eq!(messages[1].content, BINARY_PLACEHOLDER);
    }

    #[tokio::test]
    async fn received_messages_keep_arrival_order() {
        let server = MockWsServer::start().await;
        let mut manager = connected(&server).await;

        for i in 0..5 {
            server.send_text(&format!("message {i}"));
        }
        pump_until(&mut manager, |m| {
            m.messages()
                .iter()
                .filter(|msg| msg.direction == Direction::Received)
                .count()
                == 5
        })
        .await;

        let received: Vec<_> = manager
            .messages()
            .iter()
            .filter(|m| m.direction == Direction::Received)
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(
            received,
            ["message 0", "message 1", "message 2", "message 3", "message 4"]
        );
    }
}

mod close {
    use super::*;

    #[tokio::test]
    async fn server_close_is_clean_with_code_and_reason() {
        let server = MockWsServer::start().await;
        let mut manager = connected(&server).await;

        server.act(Action::Close {
            code: 1000,
            reason: "bye".to_owned(),
        });
        pump_until(&mut manager, |m| m.status() == Status::Disconnected).await;

        assert!(has_entry(
            manager.messages(),
            Level::Info,
            "Connection closed cleanly with code 1000: bye"
        ));
        assert!(manager.error().is_none());
    }

    #[tokio::test]
    async fn dropped_socket_is_unclean() {
        let server = MockWsServer::start().await;
        let mut manager = connected(&server).await;

        server.act(Action::Drop);
        pump_until(&mut manager, |m| m.status() == Status::Disconnected).await;

        let last = manager.messages().last().unwrap();
        assert_eq!(last.level, Some(Level::Warning));
        assert!(last.content.starts_with("Connection closed with code 1006"));
        assert!(!manager.is_connected());
    }

    #[tokio::test]
    async fn disconnect_then_send_is_rejected() {
        let mut server = MockWsServer::start().await;
        let mut manager = connected(&server).await;

        manager.disconnect();
        assert_eq!(manager.status(), Status::Disconnected);
        assert_eq!(manager.messages().last().unwrap().content, "Disconnecting...");

        let before = manager.messages().len();
        manager.send_message("late", PayloadKind::Text, None);

        let messages = manager.messages();
        assert_eq!(messages.len(), before + 1);
        assert_eq!(
            messages[before].content,
            "Failed to send message: Not connected to server"
        );
        assert_eq!(manager.error(), Some("Not connected to server"));
        assert!(messages.iter().all(|m| m.direction != Direction::Sent));

        // The released handle reports nothing further.
        pump_for(&mut manager, Duration::from_millis(200)).await;
        assert_eq!(manager.messages().len(), before + 1);
        assert!(server.recv().await.is_none());
    }

    #[tokio::test]
    async fn new_connect_replaces_previous_handle() {
        let first = MockWsServer::start_with_greeting(Some("from first")).await;
        let second = MockWsServer::start_with_greeting(Some("from second")).await;
        let mut manager = ConnectionManager::default();

        manager.connect(&first.url());
        manager.connect(&second.url());
        pump_until(&mut manager, |m| {
            m.messages().iter().any(|msg| msg.content == "from second")
        })
        .await;
        pump_for(&mut manager, Duration::from_millis(200)).await;

        assert!(manager.is_connected());
        assert!(
            manager
                .messages()
                .iter()
                .all(|m| m.content != "from first")
        );
    }
}
