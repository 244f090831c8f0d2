//! `GET /api/v1/watch`: a multiplexed watch streamed over a WebSocket.
//!
//! Each [`WatchResult`] is written as one JSON text frame. The call is
//! cancelled when the client closes the socket; when the watch ends the
//! server sends a close frame (normal on cancellation or backend closure,
//! error otherwise).

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade, close_code};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};

use crate::api::context::{CallerContext, parse_domain};
use crate::api::dto::WatchQuery;
use crate::app_state::AppState;
use crate::domain::{Namespace, RequestContext, WatchResult};
use crate::error::GatewayError;
use crate::service::{RegistryService, WatchEnd, WatchSink};

/// `GET /api/v1/watch`: Upgrade to a watch stream.
///
/// # Errors
///
/// Rejects the upgrade with 400 if the `domain` query parameter is not a
/// valid namespace.
pub async fn watch_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    CallerContext(ctx): CallerContext,
    Query(query): Query<WatchQuery>,
) -> Result<impl IntoResponse, GatewayError> {
    let explicit = parse_domain(query.domain.as_deref())?;
    let service = query.service.filter(|s| !s.trim().is_empty());
    let registry = state.registry_service;

    Ok(ws.on_upgrade(move |socket| async move {
        run_watch(socket, &registry, ctx, service, explicit).await;
    }))
}

struct WsWatchSink {
    tx: SplitSink<WebSocket, Message>,
}

#[async_trait::async_trait]
impl WatchSink for WsWatchSink {
    async fn send(&mut self, result: WatchResult) -> Result<(), GatewayError> {
        let json = serde_json::to_string(&result)
            .map_err(|e| GatewayError::Internal(format!("encode watch result: {e}")))?;
        self.tx
            .send(Message::text(json))
            .await
            .map_err(|e| GatewayError::Stream(e.to_string()))
    }
}

async fn run_watch(
    socket: WebSocket,
    registry: &RegistryService,
    ctx: RequestContext,
    service: Option<String>,
    explicit: Option<Namespace>,
) {
    let (tx, mut rx) = socket.split();
    let cancel = ctx.cancel.clone();

    // Inbound frames are ignored; the first close, error or EOF cancels.
    let reader = tokio::spawn(async move {
        loop {
            match rx.next().await {
                Some(Ok(Message::Close(_)) | Err(_)) | None => break,
                Some(Ok(_)) => {}
            }
        }
        cancel.cancel();
    });

    let mut sink = WsWatchSink { tx };
    let outcome = registry
        .watch(&ctx, service.as_deref(), explicit.as_ref(), &mut sink)
        .await;
    reader.abort();

    let frame = match outcome {
        Ok(end) => {
            tracing::debug!(?end, "watch finished");
            let reason = match end {
                WatchEnd::Cancelled => "cancelled",
                WatchEnd::BackendClosed => "registry closed the watch",
            };
            CloseFrame {
                code: close_code::NORMAL,
                reason: reason.into(),
            }
        }
        Err(err) => {
            tracing::warn!(error = %err, "watch failed");
            CloseFrame {
                code: close_code::ERROR,
                reason: err.to_string().into(),
            }
        }
    };
    let _ = sink.tx.send(Message::Close(Some(frame))).await;
}
