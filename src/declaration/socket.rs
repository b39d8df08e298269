//! Socket declarations: pub/sub namespace events (`Socket`) and raw
//! websocket upgrades (`Websocket`).

use crate::declaration::route::normalize_path;
use crate::declaration::{SocketDeclaration, WebsocketDeclaration, WebsocketScope, DEFAULT_NAMESPACE};
use crate::metadata::{AppKey, MetadataKey, MetadataStore, MetadataValue};

/// Append a namespace event handler to `target`'s SocketRoutes list.
pub fn add_socket(
    store: &mut MetadataStore,
    target: AppKey,
    event: &str,
    namespace: &str,
    handler: &str,
) {
    let mut sockets = store
        .get(target, MetadataKey::SocketRoutes)
        .and_then(MetadataValue::as_sockets)
        .map(<[_]>::to_vec)
        .unwrap_or_default();

    sockets.push(SocketDeclaration {
        event: event.to_string(),
        namespace: normalize_path(namespace),
        handler: handler.to_string(),
    });

    store.set(target, MetadataKey::SocketRoutes, MetadataValue::Sockets(sockets));
}

/// Append a raw websocket handler to `target`'s NativeSocketRoutes list.
///
/// Without a namespace the handler observes connections on "/".
pub fn add_websocket(
    store: &mut MetadataStore,
    target: AppKey,
    event: &str,
    namespace: Option<&str>,
    handler: &str,
    match_all: bool,
) {
    let mut websockets = store
        .get(target, MetadataKey::NativeSocketRoutes)
        .and_then(MetadataValue::as_websockets)
        .map(<[_]>::to_vec)
        .unwrap_or_default();

    let (namespace, scope) = match (namespace, match_all) {
        (_, true) => (DEFAULT_NAMESPACE.to_string(), WebsocketScope::All),
        (Some(namespace), false) => (normalize_path(namespace), WebsocketScope::Routed),
        (None, false) => (DEFAULT_NAMESPACE.to_string(), WebsocketScope::Observer),
    };

    websockets.push(WebsocketDeclaration {
        event: event.to_string(),
        namespace,
        handler: handler.to_string(),
        scope,
    });

    store.set(target, MetadataKey::NativeSocketRoutes, MetadataValue::Websockets(websockets));
}
