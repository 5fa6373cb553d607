//! Integration tests for connection registration and deduplication.

mod common;

use common::*;
use retrosock::{ConnectionRegistry, ConnectionState, NamespaceSocket};
use std::sync::Arc;

#[test]
fn distinct_namespaces_share_one_connection() {
    let server = MockServer::start(handshake_body("abc", 60, 60, "websocket"));
    let registry = ConnectionRegistry::new();
    let factory = MockTransportFactory::new();
    let (default_handler, default_events) = recording_handler();
    let (chat_handler, _chat_events) = recording_handler();

    let first = registry
        .register_with(
            &server.origin(),
            NamespaceSocket::new("", default_handler),
            mock_options(factory.clone()),
        )
        .unwrap();
    let second = registry
        .register_with(
            &server.origin(),
            NamespaceSocket::new("/chat", chat_handler),
            mock_options(factory.clone()),
        )
        .unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(registry.connection_count(&server.origin()), 1);

    // Joining an existing connection announces the namespace.
    wait_for_state(&default_events, ConnectionState::Ready);
    let transport = factory.wait_for_transport(0);
    transport.wait_for_frame("1::/chat");
}

#[test]
fn duplicate_namespace_gets_its_own_connection() {
    let server = MockServer::start(handshake_body("abc", 60, 60, "websocket"));
    let registry = ConnectionRegistry::new();
    let factory = MockTransportFactory::new();
    let (first_handler, _first_events) = recording_handler();
    let (second_handler, _second_events) = recording_handler();

    let first = registry
        .register_with(
            &server.origin(),
            NamespaceSocket::new("/chat", first_handler),
            mock_options(factory.clone()),
        )
        .unwrap();
    let second = registry
        .register_with(
            &server.origin(),
            NamespaceSocket::new("/chat", second_handler),
            mock_options(factory.clone()),
        )
        .unwrap();

    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(registry.connection_count(&server.origin()), 2);
}

#[test]
fn joining_sockets_inherit_the_connection_headers() {
    let server = MockServer::start(handshake_body("feedface", 60, 60, "websocket"));
    let registry = ConnectionRegistry::new();
    let factory = MockTransportFactory::new();
    let (default_handler, default_events) = recording_handler();
    let (late_handler, _late_events) = recording_handler();

    registry
        .register_with(
            &server.origin(),
            NamespaceSocket::new("", default_handler),
            mock_options(factory.clone()),
        )
        .unwrap();
    wait_for_state(&default_events, ConnectionState::Ready);

    let late_socket = NamespaceSocket::new("/late", late_handler);
    registry
        .register_with(&server.origin(), late_socket.clone(), mock_options(factory))
        .unwrap();

    // The joining socket sees the shared map, session id included.
    assert_eq!(
        late_socket
            .headers()
            .lock()
            .get("sessionId")
            .map(String::as_str),
        Some("feedface")
    );
}

#[test]
fn unregister_announces_and_fires_disconnect() {
    let server = MockServer::start(handshake_body("abc", 60, 60, "websocket"));
    let registry = ConnectionRegistry::new();
    let factory = MockTransportFactory::new();
    let (default_handler, default_events) = recording_handler();
    let (chat_handler, chat_events) = recording_handler();
    let default_socket = NamespaceSocket::new("", default_handler);
    let chat_socket = NamespaceSocket::new("/chat", chat_handler);

    let connection = registry
        .register_with(
            &server.origin(),
            default_socket.clone(),
            mock_options(factory.clone()),
        )
        .unwrap();
    assert!(connection.register(&chat_socket));
    wait_for_state(&default_events, ConnectionState::Ready);
    let transport = factory.wait_for_transport(0);

    connection.unregister(&chat_socket);
    transport.wait_for_frame("0::/chat");
    wait_for_event(&chat_events, |e| matches!(e, HandlerEvent::Disconnect));
    // The connection survives while a namespace remains.
    assert_eq!(registry.connection_count(&server.origin()), 1);
    assert_eq!(connection.state(), ConnectionState::Ready);

    connection.unregister(&default_socket);
    wait_for_event(&default_events, |e| matches!(e, HandlerEvent::Disconnect));
    assert_eq!(connection.state(), ConnectionState::Invalid);
    assert_eq!(registry.connection_count(&server.origin()), 0);
}

#[test]
fn register_on_a_dead_connection_is_refused() {
    let server = MockServer::start(handshake_body("abc", 60, 60, "websocket"));
    let registry = ConnectionRegistry::new();
    let factory = MockTransportFactory::new();
    let (handler, events) = recording_handler();
    let socket = NamespaceSocket::new("", handler);

    let connection = registry
        .register_with(&server.origin(), socket, mock_options(factory))
        .unwrap();
    wait_for_state(&events, ConnectionState::Ready);

    connection.transport_message("7:::gone+0");
    wait_for_state(&events, ConnectionState::Invalid);

    let (late_handler, _late_events) = recording_handler();
    assert!(!connection.register(&NamespaceSocket::new("/late", late_handler)));
}
