//! WebSocket JSON-RPC session
//!
//! Raw tokio-tungstenite connection to the node's ws endpoint. Speaks just
//! enough JSON-RPC for `eth_subscribe("newPendingTransactions")` and exposes
//! protocol-level ping/pong, which the provider-level transports hide.

use alloy::primitives::TxHash;
use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info};

use super::{Session, SessionConnector, SessionError, SessionEvent};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Grace period for the close handshake on terminate
const CLOSE_GRACE: Duration = Duration::from_secs(1);

#[derive(Debug, Default, Clone, Copy)]
pub struct WsConnector;

#[async_trait]
impl SessionConnector for WsConnector {
    type Session = WsSession;

    async fn open(&self, uri: &str) -> Result<WsSession, SessionError> {
        let (stream, _response) = connect_async(uri).await?;
        let (write, read) = stream.split();
        Ok(WsSession {
            write,
            read,
            next_id: 1,
            subscription: None,
        })
    }
}

pub struct WsSession {
    write: SplitSink<WsStream, Message>,
    read: SplitStream<WsStream>,
    next_id: u64,
    /// Subscription id once the node has confirmed eth_subscribe
    subscription: Option<String>,
}

#[async_trait]
impl Session for WsSession {
    async fn subscribe_pending(&mut self) -> Result<(), SessionError> {
        let request = serde_json::json!({
            "jsonrpc": "2.0",
            "id": self.next_id,
            "method": "eth_subscribe",
            "params": ["newPendingTransactions"],
        });
        self.next_id += 1;
        // The confirmation is picked up by next_event
        self.write.send(Message::Text(request.to_string())).await?;
        Ok(())
    }

    async fn ping(&mut self) -> Result<(), SessionError> {
        self.write.send(Message::Ping(Vec::new())).await?;
        Ok(())
    }

    async fn next_event(&mut self) -> SessionEvent {
        loop {
            let message = match self.read.next().await {
                Some(Ok(message)) => message,
                Some(Err(e)) => return SessionEvent::Error(e.into()),
                None => return SessionEvent::Closed(None),
            };

            match message {
                Message::Text(text) => match parse_frame(&text) {
                    Ok(Frame::PendingTx(hash)) => return SessionEvent::PendingTx(hash),
                    Ok(Frame::Subscribed(id)) => {
                        info!("Subscribed to pending transactions ({})", id);
                        self.subscription = Some(id);
                    }
                    Ok(Frame::RpcError(msg)) => {
                        return SessionEvent::Error(SessionError::Rpc(msg));
                    }
                    Ok(Frame::Other) => {}
                    Err(e) => debug!("Unparseable frame: {}", e),
                },
                Message::Pong(_) => return SessionEvent::Pong,
                Message::Close(frame) => {
                    return SessionEvent::Closed(frame.map(|f| f.reason.to_string()));
                }
                // Pings are answered by tungstenite itself
                _ => {}
            }
        }
    }

    async fn terminate(&mut self) {
        let teardown = async {
            if let Some(id) = self.subscription.take() {
                let request = unsubscribe_request(self.next_id, &id);
                let _ = self.write.send(Message::Text(request.to_string())).await;
            }
            let _ = self.write.close().await;
        };
        if tokio::time::timeout(CLOSE_GRACE, teardown).await.is_err() {
            debug!("Close handshake timed out, dropping socket");
        }
    }
}

fn unsubscribe_request(id: u64, subscription: &str) -> Value {
    serde_json::json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "eth_unsubscribe",
        "params": [subscription],
    })
}

/// Decoded text frame
#[derive(Debug, PartialEq, Eq)]
pub enum Frame {
    PendingTx(TxHash),
    /// eth_subscribe answer carrying the subscription id
    Subscribed(String),
    RpcError(String),
    Other,
}

#[derive(Debug, Deserialize)]
struct RpcFrame {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    params: Option<NotificationParams>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct NotificationParams {
    result: Value,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

/// Classify one JSON-RPC text frame.
///
/// Pending-tx notifications carry either the bare hash or, on nodes that
/// push full objects, a transaction with a `hash` field.
pub fn parse_frame(text: &str) -> Result<Frame, serde_json::Error> {
    let frame: RpcFrame = serde_json::from_str(text)?;

    if let Some(err) = frame.error {
        return Ok(Frame::RpcError(format!("{} (code {})", err.message, err.code)));
    }

    if frame.method.as_deref() == Some("eth_subscription") {
        let hash = frame.params.and_then(|p| match p.result {
            Value::String(s) => s.parse::<TxHash>().ok(),
            Value::Object(obj) => obj
                .get("hash")
                .and_then(Value::as_str)
                .and_then(|s| s.parse::<TxHash>().ok()),
            _ => None,
        });
        return Ok(hash.map(Frame::PendingTx).unwrap_or(Frame::Other));
    }

    if frame.id.is_some() {
        if let Some(Value::String(id)) = frame.result {
            return Ok(Frame::Subscribed(id));
        }
    }

    Ok(Frame::Other)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::B256;

    const HASH: &str = "0x5c504ed432cb51138bcf09aa5e8a410dd4a1e204ef84bfed1be16dfba1b22060";

    #[test]
    fn test_parse_hash_notification() {
        let text = format!(
            r#"{{"jsonrpc":"2.0","method":"eth_subscription","params":{{"subscription":"0xcd0c3e8af590364c09d0fa6a1210faf5","result":"{}"}}}}"#,
            HASH
        );
        let expected: B256 = HASH.parse().unwrap();
        assert_eq!(parse_frame(&text).unwrap(), Frame::PendingTx(expected));
    }

    #[test]
    fn test_parse_full_tx_notification() {
        let text = format!(
            r#"{{"jsonrpc":"2.0","method":"eth_subscription","params":{{"subscription":"0x1","result":{{"hash":"{}","nonce":"0x1"}}}}}}"#,
            HASH
        );
        let expected: B256 = HASH.parse().unwrap();
        assert_eq!(parse_frame(&text).unwrap(), Frame::PendingTx(expected));
    }

    #[test]
    fn test_parse_subscription_confirmation() {
        let text = r#"{"jsonrpc":"2.0","id":1,"result":"0xcd0c3e8af590364c09d0fa6a1210faf5"}"#;
        assert_eq!(
            parse_frame(text).unwrap(),
            Frame::Subscribed("0xcd0c3e8af590364c09d0fa6a1210faf5".to_string())
        );
    }

    #[test]
    fn test_parse_rpc_error() {
        let text = r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32601,"message":"the method eth_subscribe does not exist"}}"#;
        match parse_frame(text).unwrap() {
            Frame::RpcError(msg) => {
                assert!(msg.contains("does not exist"));
                assert!(msg.contains("-32601"));
            }
            other => panic!("expected rpc error, got {:?}", other),
        }
    }

    #[test]
    fn test_unsubscribe_request() {
        let request = unsubscribe_request(7, "0xcd0c3e8af590364c09d0fa6a1210faf5");
        assert_eq!(request["method"], "eth_unsubscribe");
        assert_eq!(request["id"], 7);
        assert_eq!(request["params"][0], "0xcd0c3e8af590364c09d0fa6a1210faf5");
    }

    #[test]
    fn test_parse_noise() {
        let bad_hash = r#"{"jsonrpc":"2.0","method":"eth_subscription","params":{"subscription":"0x1","result":"0x1234"}}"#;
        assert_eq!(parse_frame(bad_hash).unwrap(), Frame::Other);
        assert_eq!(parse_frame(r#"{"jsonrpc":"2.0"}"#).unwrap(), Frame::Other);
        assert!(parse_frame("not json").is_err());
    }
}
