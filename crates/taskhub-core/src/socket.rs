use std::collections::VecDeque;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use taskhub_shared::TaskChange;
use tokio::net::TcpStream;
use tokio::time::{Instant, Interval, interval_at, timeout};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, error, info, warn};

use crate::backend::FeedSubscription;
use crate::error::BackendError;
use crate::realtime::{Channel, FeedFrame, FeedTopic, Frame, HEARTBEAT_INTERVAL};
use crate::rest::Endpoints;

const JOIN_TIMEOUT: Duration = Duration::from_secs(10);

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Joined realtime channel over a native websocket.
pub struct LiveSubscription {
    ws: Socket,
    channel: Channel,
    heartbeat: Interval,
    pending: VecDeque<TaskChange>,
}

#[tracing::instrument(skip_all, fields(channel = %topic.channel))]
pub async fn open(
    endpoints: &Endpoints,
    access_token: Option<&str>,
    topic: &FeedTopic,
) -> Result<LiveSubscription, BackendError> {
    let url = endpoints.realtime();
    debug!(host = ?url.host_str(), "connecting to realtime endpoint");

    let (ws, response) = timeout(JOIN_TIMEOUT, connect_async(url.as_str()))
        .await
        .map_err(|_| BackendError::transport("timed out connecting to realtime endpoint"))?
        .map_err(BackendError::transport)?;
    debug!(status = %response.status(), "realtime socket open");

    let mut sub = LiveSubscription {
        ws,
        channel: Channel::new(topic.clone()),
        heartbeat: interval_at(Instant::now() + HEARTBEAT_INTERVAL, HEARTBEAT_INTERVAL),
        pending: VecDeque::new(),
    };

    let join = sub.channel.join_frame(access_token);
    sub.send(&join).await?;

    timeout(JOIN_TIMEOUT, sub.await_join())
        .await
        .map_err(|_| BackendError::transport("timed out joining realtime channel"))??;
    info!(status = "SUBSCRIBED", "subscription status");
    Ok(sub)
}

impl LiveSubscription {
    async fn send(&mut self, frame: &Frame) -> Result<(), BackendError> {
        let text = Channel::encode(frame)?;
        self.ws
            .send(Message::Text(text.into()))
            .await
            .map_err(BackendError::transport)
    }

    async fn await_join(&mut self) -> Result<(), BackendError> {
        loop {
            let Some(message) = self.ws.next().await else {
                return Err(BackendError::transport("socket closed before join reply"));
            };
            let text = match message.map_err(BackendError::transport)? {
                Message::Text(text) => text,
                Message::Close(frame) => {
                    return Err(BackendError::transport(format!("socket closed before join reply: {frame:?}")));
                }
                _ => continue,
            };

            match self.channel.decode(text.as_str())? {
                FeedFrame::Joined => return Ok(()),
                FeedFrame::JoinRejected(reason) | FeedFrame::Closed(reason) => {
                    return Err(BackendError::transport(format!("channel join rejected: {reason}")));
                }
                FeedFrame::Change(change) => self.pending.push_back(change),
                FeedFrame::Ignored => {}
            }
        }
    }
}

impl FeedSubscription for LiveSubscription {
    async fn next_change(&mut self) -> Option<Result<TaskChange, BackendError>> {
        if let Some(change) = self.pending.pop_front() {
            return Some(Ok(change));
        }

        loop {
            tokio::select! {
                _ = self.heartbeat.tick() => {
                    let beat = self.channel.heartbeat_frame();
                    if let Err(err) = self.send(&beat).await {
                        warn!(error = %err, "heartbeat failed; change feed lost");
                        return None;
                    }
                }
                message = self.ws.next() => {
                    let text = match message {
                        None => {
                            warn!("realtime socket ended");
                            return None;
                        }
                        Some(Err(err)) => {
                            warn!(error = %err, "realtime socket failed");
                            return None;
                        }
                        Some(Ok(Message::Text(text))) => text,
                        Some(Ok(Message::Close(frame))) => {
                            warn!(frame = ?frame, "realtime socket closed by server");
                            return None;
                        }
                        Some(Ok(_)) => continue,
                    };

                    match self.channel.decode(text.as_str()) {
                        Ok(FeedFrame::Change(change)) => return Some(Ok(change)),
                        Ok(FeedFrame::Closed(reason)) => {
                            warn!(reason = %reason, "channel closed");
                            return None;
                        }
                        Ok(FeedFrame::JoinRejected(reason)) => {
                            error!(reason = %reason, "subscription error");
                            return None;
                        }
                        Ok(FeedFrame::Joined | FeedFrame::Ignored) => continue,
                        Err(err) => return Some(Err(err)),
                    }
                }
            }
        }
    }

    async fn unsubscribe(mut self) {
        let leave = self.channel.leave_frame();
        if let Err(err) = self.send(&leave).await {
            debug!(error = %err, "leave frame not delivered");
        }
        if let Err(err) = self.ws.close(None).await {
            debug!(error = %err, "socket close failed");
        }
    }
}
