use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use cs_async_util::retry_async;
use cs_client::Task;
use futures::{Sink, SinkExt, StreamExt};
use tokio::select;
use tokio_tungstenite::{connect_async, tungstenite};
use tokio_util::sync::CancellationToken;

use crate::{BusConfig, Emitter, Message};

/// How long to keep forwarding outbound messages after shutdown starts.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

/// What the bus task hands to its consumer.
#[derive(Debug, Clone, PartialEq)]
pub enum BusEvent {
    /// A connection to the bus was (re)established. Anything registered with
    /// the previous connection must be registered again.
    Connected,
    Message(Message),
}

pub fn create_task(config: BusConfig) -> anyhow::Result<BusTask> {
    if config.host.is_empty() {
        anyhow::bail!("bus host must not be empty");
    }

    let (out_tx, out_rx) = flume::unbounded();
    let (evt_tx, evt_rx) = flume::bounded(256);

    Ok(BusTask {
        url: config.url(),
        attempts: config.reconnect_attempts,
        interval: Duration::from_millis(config.reconnect_interval_ms),
        out_tx,
        out_rx,
        evt_tx,
        evt_rx,
    })
}

/// Owns the websocket connection to the bus.
pub struct BusTask {
    url: String,
    attempts: usize,
    interval: Duration,
    out_tx: flume::Sender<Message>,
    out_rx: flume::Receiver<Message>,
    evt_tx: flume::Sender<BusEvent>,
    evt_rx: flume::Receiver<BusEvent>,
}

impl BusTask {
    pub fn emitter(&self) -> Emitter {
        Emitter::new(self.out_tx.clone())
    }

    pub fn events(&self) -> flume::Receiver<BusEvent> {
        self.evt_rx.clone()
    }
}

/// Why a single connection ended.
enum SessionEnd {
    Shutdown,
    Disconnected,
    ConsumerGone,
}

/// Writes outbound messages to a connection. A message whose write failed
/// is held back and written first on the next connection.
#[derive(Default)]
struct Outbox {
    pending: Option<Message>,
}

impl Outbox {
    async fn resend<S>(&mut self, sink: &mut S) -> Result<(), tungstenite::Error>
    where
        S: Sink<tungstenite::Message, Error = tungstenite::Error> + Unpin,
    {
        match self.pending.take() {
            Some(msg) => {
                debug!("resending {} after reconnect", msg.msg_type);
                self.send(sink, msg).await
            }
            None => Ok(()),
        }
    }

    async fn send<S>(&mut self, sink: &mut S, msg: Message) -> Result<(), tungstenite::Error>
    where
        S: Sink<tungstenite::Message, Error = tungstenite::Error> + Unpin,
    {
        let text = match msg.to_json() {
            Ok(text) => text,
            Err(err) => {
                error!("could not serialize {}: {:?}", msg.msg_type, err);
                return Ok(());
            }
        };

        trace!("send {}", msg.msg_type);

        if let Err(err) = sink.send(tungstenite::Message::Text(text.into())).await {
            warn!("failed to send {} to bus: {}", msg.msg_type, err);
            self.pending = Some(msg);
            return Err(err);
        }

        Ok(())
    }
}

#[async_trait]
impl Task for BusTask {
    fn name(&self) -> &'static str {
        "bus"
    }

    async fn run(self: Box<Self>, cancel: CancellationToken) -> anyhow::Result<()> {
        let Self {
            url,
            attempts,
            interval,
            out_tx,
            out_rx,
            evt_tx,
            evt_rx,
        } = *self;

        // only other tasks' handles keep these channels open
        drop(out_tx);
        drop(evt_rx);

        let url = url.as_str();
        let mut outbox = Outbox::default();

        loop {
            debug!("connecting to bus at {}", url);

            let connect = retry_async(attempts, Some(interval), || async move {
                let res = connect_async(url).await;
                if let Err(err) = &res {
                    warn!("could not connect to bus: {}", err);
                }
                res
            });

            let ws = select! {
                _ = cancel.cancelled() => return Ok(()),
                res = connect => res.with_context(|| format!("failed to connect to bus at {}", url))?.0,
            };

            info!("connected to bus at {}", url);

            if evt_tx.send_async(BusEvent::Connected).await.is_err() {
                warn!("bus consumer is gone, exiting");
                return Ok(());
            }

            let (mut sink, mut stream) = ws.split();

            let end = 'session: {
                if outbox.resend(&mut sink).await.is_err() {
                    break 'session SessionEnd::Disconnected;
                }

                loop {
                    select! {
                        _ = cancel.cancelled() => break SessionEnd::Shutdown,

                        out = out_rx.recv_async() => {
                            // every emitter is gone, nothing more will be sent
                            let Ok(out) = out else { break SessionEnd::Shutdown };

                            if outbox.send(&mut sink, out).await.is_err() {
                                break SessionEnd::Disconnected;
                            }
                        }

                        frame = stream.next() => {
                            match frame {
                                Some(Ok(tungstenite::Message::Text(text))) => {
                                    let msg = match Message::from_json(&text) {
                                        Ok(msg) => msg,
                                        Err(err) => {
                                            warn!("skipping malformed bus message: {:?}", err);
                                            continue;
                                        }
                                    };

                                    trace!("recv {}", msg.msg_type);

                                    if evt_tx.send_async(BusEvent::Message(msg)).await.is_err() {
                                        break SessionEnd::ConsumerGone;
                                    }
                                }
                                Some(Ok(tungstenite::Message::Close(_))) | None => {
                                    warn!("bus closed the connection");
                                    break SessionEnd::Disconnected;
                                }
                                Some(Ok(_)) => {}
                                Some(Err(err)) => {
                                    warn!("bus connection failed: {}", err);
                                    break SessionEnd::Disconnected;
                                }
                            }
                        }
                    }
                }
            };

            match end {
                SessionEnd::Shutdown => {
                    // other tasks may still be saying goodbye; forward their
                    // messages until they let go of their emitters
                    let flush = async {
                        while let Ok(out) = out_rx.recv_async().await {
                            if outbox.send(&mut sink, out).await.is_err() {
                                break;
                            }
                        }
                    };
                    if tokio::time::timeout(SHUTDOWN_GRACE, flush).await.is_err() {
                        debug!("gave up flushing bus messages");
                    }

                    let _ = sink.send(tungstenite::Message::Close(None)).await;
                    return Ok(());
                }
                SessionEnd::ConsumerGone => {
                    warn!("bus consumer is gone, exiting");
                    let _ = sink.send(tungstenite::Message::Close(None)).await;
                    return Ok(());
                }
                SessionEnd::Disconnected => {
                    select! {
                        _ = cancel.cancelled() => return Ok(()),
                        _ = tokio::time::sleep(interval) => {}
                    }
                }
            }
        }
    }
}
