//! WAMP caller over a WebSocket connection

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::SEC_WEBSOCKET_PROTOCOL;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info};

use super::wamp::{WampMessage, CLOSE_REALM, WAMP_SUBPROTOCOL};
use super::{RoutingRequest, RoutingRpc, RpcError};
use crate::config::RouterConfig;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const CALL_REQUEST_ID: u64 = 1;

/// Calls the routing setup procedure through a WAMP router.
///
/// Each `setup` opens a fresh session, performs one call and leaves.
#[derive(Debug, Clone)]
pub struct WampClient {
    router: String,
    realm: String,
    procedure: String,
    timeout: Duration,
}

impl WampClient {
    pub fn new(router: impl Into<String>, realm: impl Into<String>) -> Self {
        let defaults = RouterConfig::default();
        Self {
            router: router.into(),
            realm: realm.into(),
            procedure: defaults.procedure,
            timeout: defaults.timeout,
        }
    }

    pub fn from_config(config: &RouterConfig) -> Self {
        Self {
            router: config.url.clone(),
            realm: config.realm.clone(),
            procedure: config.procedure.clone(),
            timeout: config.timeout,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn call_once(&self, payload: String) -> Result<String, RpcError> {
        let mut ws = self.connect().await?;
        let session = self.join(&mut ws).await?;
        info!("Session {} attached to realm {}", session, self.realm);

        let outcome = self.call(&mut ws, payload).await;
        leave(&mut ws).await;
        outcome
    }

    async fn connect(&self) -> Result<WsStream, RpcError> {
        let connect_error = |message: String| RpcError::Connect {
            router: self.router.clone(),
            message,
        };

        let mut request = self
            .router
            .as_str()
            .into_client_request()
            .map_err(|e| connect_error(e.to_string()))?;
        request
            .headers_mut()
            .insert(SEC_WEBSOCKET_PROTOCOL, HeaderValue::from_static(WAMP_SUBPROTOCOL));

        debug!("Connecting to WAMP router {}", self.router);
        let (ws, _response) = connect_async(request)
            .await
            .map_err(|e| connect_error(e.to_string()))?;
        Ok(ws)
    }

    async fn join(&self, ws: &mut WsStream) -> Result<u64, RpcError> {
        send(ws, &WampMessage::hello(&self.realm)).await?;
        match recv(ws).await? {
            WampMessage::Welcome { session, .. } => Ok(session),
            WampMessage::Abort { reason, .. } => Err(RpcError::Aborted { reason }),
            other => Err(RpcError::protocol(format!(
                "expected WELCOME, got {}",
                other.to_json()
            ))),
        }
    }

    async fn call(&self, ws: &mut WsStream, payload: String) -> Result<String, RpcError> {
        debug!("Calling {}", self.procedure);
        send(
            ws,
            &WampMessage::call(CALL_REQUEST_ID, &self.procedure, vec![Value::String(payload)]),
        )
        .await?;

        loop {
            match recv(ws).await? {
                WampMessage::Result {
                    request_id, args, ..
                } if request_id == CALL_REQUEST_ID => return Ok(result_text(args)),
                WampMessage::Error {
                    request_id,
                    error,
                    args,
                    ..
                } if request_id == CALL_REQUEST_ID => {
                    let detail = args.first().map(|arg| match arg {
                        Value::String(text) => text.clone(),
                        other => other.to_string(),
                    });
                    return Err(RpcError::call_failed(error, detail));
                }
                WampMessage::Abort { reason, .. } | WampMessage::Goodbye { reason, .. } => {
                    return Err(RpcError::Aborted { reason })
                }
                other => debug!("Ignoring unexpected message {}", other.to_json()),
            }
        }
    }
}

#[async_trait]
impl RoutingRpc for WampClient {
    async fn setup(&self, request: &RoutingRequest) -> Result<String, RpcError> {
        let payload = request.to_json()?;
        tokio::time::timeout(self.timeout, self.call_once(payload))
            .await
            .map_err(|_| RpcError::Timeout(self.timeout))?
    }
}

/// Say GOODBYE and close; failures here cannot change the call's outcome
async fn leave(ws: &mut WsStream) {
    if let Err(e) = send(ws, &WampMessage::goodbye(CLOSE_REALM)).await {
        debug!("Failed to send GOODBYE: {}", e);
        return;
    }
    match recv(ws).await {
        Ok(WampMessage::Goodbye { .. }) => debug!("Session closed"),
        Ok(other) => debug!("Expected GOODBYE, got {}", other.to_json()),
        Err(e) => debug!("No GOODBYE from router: {}", e),
    }
    let _ = ws.close(None).await;
}

async fn send(ws: &mut WsStream, message: &WampMessage) -> Result<(), RpcError> {
    ws.send(Message::text(message.to_json().to_string()))
        .await
        .map_err(|e| RpcError::Transport(e.to_string()))
}

async fn recv(ws: &mut WsStream) -> Result<WampMessage, RpcError> {
    while let Some(frame) = ws.next().await {
        match frame.map_err(|e| RpcError::Transport(e.to_string()))? {
            Message::Text(text) => return WampMessage::parse(text.as_str()),
            Message::Binary(_) => {
                return Err(RpcError::protocol("binary frame on a JSON session"))
            }
            Message::Close(_) => {
                return Err(RpcError::Transport("router closed the connection".into()))
            }
            _ => continue,
        }
    }
    Err(RpcError::Transport("connection closed".into()))
}

/// The report is normally a single string argument
fn result_text(mut args: Vec<Value>) -> String {
    match args.len() {
        0 => String::new(),
        1 if args[0].is_string() => match args.remove(0) {
            Value::String(text) => text,
            other => other.to_string(),
        },
        _ => Value::Array(args).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::wamp::{CALL, GOODBYE_AND_OUT};
    use serde_json::json;
    use tokio::net::TcpListener;
    use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};

    /// One-shot router answering the CALL with `reply`
    async fn spawn_router(reply: fn(u64) -> Value) -> (String, tokio::task::JoinHandle<Value>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}/ws", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let callback = |_request: &Request,
                            mut response: Response|
             -> Result<Response, ErrorResponse> {
                response
                    .headers_mut()
                    .insert(SEC_WEBSOCKET_PROTOCOL, HeaderValue::from_static(WAMP_SUBPROTOCOL));
                Ok(response)
            };
            let mut ws = tokio_tungstenite::accept_hdr_async(stream, callback)
                .await
                .unwrap();

            let mut call = Value::Null;
            while let Some(Ok(frame)) = ws.next().await {
                let Message::Text(text) = frame else { continue };
                let message: Value = serde_json::from_str(text.as_str()).unwrap();
                let reply = match message[0].as_u64().unwrap() {
                    1 => json!([2, 4242, {"roles": {"dealer": {}}}]),
                    48 => {
                        call = message.clone();
                        reply(message[1].as_u64().unwrap())
                    }
                    6 => json!([6, {}, GOODBYE_AND_OUT]),
                    _ => continue,
                };
                ws.send(Message::text(reply.to_string())).await.unwrap();
                if message[0] == 6 {
                    break;
                }
            }
            call
        });

        (url, handle)
    }

    #[tokio::test]
    async fn test_setup_returns_result_text_and_sends_payload() {
        let (url, router) =
            spawn_router(|id| json!([50, id, {}, ["manifest ready: 4 vehicles"]])).await;
        let client = WampClient::new(url, "realm1");
        let request = RoutingRequest {
            dist_suffix: ".TA.".to_string(),
            ..Default::default()
        };

        let report = client.setup(&request).await.unwrap();
        assert_eq!(report, "manifest ready: 4 vehicles");

        let call = router.await.unwrap();
        assert_eq!(call[0], CALL);
        assert_eq!(call[3], "cbz.distro.setup");
        let payload: RoutingRequest =
            serde_json::from_str(call[4][0].as_str().unwrap()).unwrap();
        assert_eq!(payload, request);
    }

    #[tokio::test]
    async fn test_setup_surfaces_procedure_error() {
        let (url, _router) = spawn_router(|id| {
            json!([8, 48, id, {}, "wamp.error.runtime_error", ["no drivers available"]])
        })
        .await;
        let client = WampClient::new(url, "realm1");

        let err = client.setup(&RoutingRequest::default()).await.unwrap_err();
        match err {
            RpcError::CallFailed { error, detail } => {
                assert_eq!(error, "wamp.error.runtime_error");
                assert_eq!(detail.as_deref(), Some("no drivers available"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_setup_reports_unreachable_router() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}/ws", listener.local_addr().unwrap());
        drop(listener);

        let client = WampClient::new(url, "realm1").with_timeout(Duration::from_secs(5));
        let err = client.setup(&RoutingRequest::default()).await.unwrap_err();
        assert!(matches!(err, RpcError::Connect { .. }));
    }

    #[test]
    fn test_result_text_shapes() {
        assert_eq!(result_text(vec![]), "");
        assert_eq!(result_text(vec![json!("ok")]), "ok");
        assert_eq!(result_text(vec![json!(1), json!(2)]), "[1,2]");
    }
}
