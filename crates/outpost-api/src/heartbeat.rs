//! `GET /monitor`: a never-ending line stream of status payloads.
//!
//! Each session owns one router subscription and one pump task:
//! ```text
//! select! {
//!     message      ─► "payload\n"            (last_sent = now)
//!     tick (5s)    ─► ":uhaha\n" if silent ≥ 4s (last_sent = now)
//!     client gone  ─► stop, subscription dropped
//! }
//! ```
//! The first tick fires immediately and a new session counts as silent, so
//! every client gets one keepalive at once.
use std::{convert::Infallible, sync::Arc};

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{HeaderValue, header},
    response::{IntoResponse, Response},
};
use outpost_core::{MessageRouter, SubscribeOptions, Subscription};
use tokio::{sync::mpsc, time::Instant};
use tokio_stream::{StreamExt, wrappers::ReceiverStream};
use tracing::debug;

use crate::{config::HeartbeatConfig, control::ControlState};

pub const KEEPALIVE: &[u8] = b":uhaha\n";

const BODY_BUFFER: usize = 16;

pub(crate) async fn monitor(State(state): State<Arc<ControlState>>) -> Response {
    let body = heartbeat_body(&state.router, &state.heartbeat);
    (
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8")),
            (header::CACHE_CONTROL, HeaderValue::from_static("no-cache")),
        ],
        body,
    )
        .into_response()
}

/// Subscribes to `router` and returns the streaming body of one heartbeat session.
///
/// Dropping the body ends the session and unsubscribes.
pub fn heartbeat_body(router: &MessageRouter, cfg: &HeartbeatConfig) -> Body {
    let opts = cfg
        .replay_latest
        .iter()
        .fold(SubscribeOptions::new(), |o, kind| o.notify_latest(kind.as_str()));
    let sub = router.attach(opts);
    let (tx, rx) = mpsc::channel(BODY_BUFFER);

    tokio::spawn(pump(sub, cfg.clone(), tx));
    Body::from_stream(ReceiverStream::new(rx).map(Ok::<_, Infallible>))
}

async fn pump(mut sub: Subscription, cfg: HeartbeatConfig, out: mpsc::Sender<Bytes>) {
    let session = sub.id();
    debug!(session, "heartbeat session started");

    let mut tick = tokio::time::interval(cfg.interval);
    let mut last_sent: Option<Instant> = None;

    loop {
        tokio::select! {
            msg = sub.recv() => {
                let Some(msg) = msg else {
                    debug!(session, "subscription closed by router");
                    break;
                };
                let mut line = msg.payload;
                line.push('\n');
                if out.send(Bytes::from(line)).await.is_err() {
                    break;
                }
                last_sent = Some(Instant::now());
            }
            _ = tick.tick() => {
                if last_sent.is_none_or(|t| t.elapsed() >= cfg.silence) {
                    if out.send(Bytes::from_static(KEEPALIVE)).await.is_err() {
                        break;
                    }
                    last_sent = Some(Instant::now());
                }
            }
            _ = out.closed() => break,
        }
    }
    debug!(session, "heartbeat session ended");
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use http_body_util::BodyExt;
    use outpost_model::Message;
    use tokio::time::timeout;

    use super::*;

    async fn next_chunk(body: &mut Body, within: Duration) -> Option<Bytes> {
        match timeout(within, body.frame()).await {
            Ok(Some(Ok(frame))) => frame.into_data().ok(),
            _ => None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn keepalive_cadence() {
        let router = MessageRouter::new();
        let mut body = heartbeat_body(&router, &HeartbeatConfig::default());

        let first = next_chunk(&mut body, Duration::from_millis(10)).await;
        assert_eq!(first.as_deref(), Some(KEEPALIVE));
        assert!(next_chunk(&mut body, Duration::from_millis(4500)).await.is_none());

        router.dispatch(Message::new("status", "ready"));
        let line = next_chunk(&mut body, Duration::from_secs(1)).await;
        assert_eq!(line.as_deref(), Some(&b"ready\n"[..]));

        // The 5s tick comes 0.5s after the message and stays quiet.
        assert!(next_chunk(&mut body, Duration::from_secs(5)).await.is_none());
        let ka = next_chunk(&mut body, Duration::from_secs(1)).await;
        assert_eq!(ka.as_deref(), Some(KEEPALIVE));
    }

    #[tokio::test(start_paused = true)]
    async fn messages_arrive_in_order() {
        let router = MessageRouter::new();
        let mut body = heartbeat_body(&router, &HeartbeatConfig::default());
        let _ = next_chunk(&mut body, Duration::from_millis(10)).await;

        for p in ["a", "b", "c"] {
            router.dispatch(Message::new("status", p));
        }
        let mut got = Vec::new();
        for _ in 0..3 {
            got.push(next_chunk(&mut body, Duration::from_secs(1)).await.unwrap());
        }
        assert_eq!(got, vec![Bytes::from("a\n"), Bytes::from("b\n"), Bytes::from("c\n")]);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_body_unsubscribes() {
        let router = MessageRouter::new();
        let body = heartbeat_body(&router, &HeartbeatConfig::default());
        assert_eq!(router.subscriber_count(), 1);

        drop(body);
        for _ in 0..10 {
            if router.subscriber_count() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(router.subscriber_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn replays_configured_latest() {
        let router = MessageRouter::new();
        router.dispatch(Message::new("status", "running"));
        let cfg = HeartbeatConfig {
            replay_latest: vec!["status".into()],
            ..Default::default()
        };
        let mut body = heartbeat_body(&router, &cfg);

        let mut chunks = Vec::new();
        while let Some(chunk) = next_chunk(&mut body, Duration::from_millis(10)).await {
            chunks.push(chunk);
        }
        assert!(chunks.contains(&Bytes::from("running\n")));
    }
}
