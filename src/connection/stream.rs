//! Drives one byte-stream connection: frames it with `RespCodec`, dispatches
//! each decoded command, and interleaves published pub/sub messages with
//! socket reads. Grounded in the teacher's `connection/handler.rs` main loop
//! and `core/pubsub/handler.rs`'s `select_all` over subscription receivers,
//! collapsed into a single loop since this crate has no replica handoff or
//! TLS detection to special-case.

use crate::connection::client::sync_client_info;
use crate::connection::session::SessionState;
use crate::dispatch::{self, NewSubscription};
use crate::error::Error;
use crate::protocol::{frame_to_args, RespCodec, RespFrame};
use crate::pubsub::PMessage;
use crate::server::{ClientInfo, ServerState};
use bytes::Bytes;
use futures::{future::BoxFuture, FutureExt, SinkExt, StreamExt};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::broadcast;
use tokio_util::codec::Framed;

enum SubscriptionReceiver {
    Channel(Bytes, broadcast::Receiver<Bytes>),
    Pattern(Bytes, broadcast::Receiver<PMessage>),
    Shard(Bytes, broadcast::Receiver<Bytes>),
}

impl SubscriptionReceiver {
    fn name(&self) -> &Bytes {
        match self {
            Self::Channel(n, _) | Self::Pattern(n, _) | Self::Shard(n, _) => n,
        }
    }
}

/// Waits on whichever subscription receiver produces a message first,
/// returning its index (so a `Lagged` error can resubscribe just that one)
/// and the rendered push frame. `None` only when the slice is empty, so
/// callers should guard the `select!` arm on that.
async fn recv_any(receivers: &mut [SubscriptionReceiver]) -> Option<(usize, Result<RespFrame, broadcast::error::RecvError>)> {
    if receivers.is_empty() {
        return None;
    }
    let polled = receivers.iter_mut().map(|r| -> BoxFuture<'_, Result<RespFrame, broadcast::error::RecvError>> {
        match r {
            SubscriptionReceiver::Channel(name, rx) => {
                let name = name.clone();
                async move {
                    rx.recv().await.map(|payload| {
                        RespFrame::Push(vec![
                            RespFrame::BulkString(Bytes::from_static(b"message")),
                            RespFrame::BulkString(name),
                            RespFrame::BulkString(payload),
                        ])
                    })
                }
                .boxed()
            }
            SubscriptionReceiver::Pattern(pattern, rx) => {
                let pattern = pattern.clone();
                async move {
                    rx.recv().await.map(|(_p, channel, payload)| {
                        RespFrame::Push(vec![
                            RespFrame::BulkString(Bytes::from_static(b"pmessage")),
                            RespFrame::BulkString(pattern),
                            RespFrame::BulkString(channel),
                            RespFrame::BulkString(payload),
                        ])
                    })
                }
                .boxed()
            }
            SubscriptionReceiver::Shard(name, rx) => {
                let name = name.clone();
                async move {
                    rx.recv().await.map(|payload| {
                        RespFrame::Push(vec![
                            RespFrame::BulkString(Bytes::from_static(b"smessage")),
                            RespFrame::BulkString(name),
                            RespFrame::BulkString(payload),
                        ])
                    })
                }
                .boxed()
            }
        }
    });
    let (result, index, _) = futures::future::select_all(polled).await;
    Some((index, result))
}

/// Runs the read-dispatch-write loop for one connection until the peer
/// disconnects, `QUIT` is issued, or a protocol error makes the stream
/// unrecoverable. `addr` is stored in `CLIENT LIST`/`INFO` output only.
pub async fn serve_connection<S>(server: Arc<ServerState>, stream: S, addr: String) -> Result<(), Error>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let id = server.allocate_client_id();
    let requires_auth = server.config.lock().requirepass.is_some();
    let mut session = SessionState::new(id, requires_auth);
    server.clients.insert(id, ClientInfo { id, name: None, db_index: session.db_index, addr });

    let mut framed = Framed::new(stream, RespCodec::new(session.protocol_version));
    let mut receivers: Vec<SubscriptionReceiver> = Vec::new();

    let outcome = 'conn: loop {
        tokio::select! {
            biased;
            frame = framed.next() => {
                match frame {
                    Some(Ok(frame)) => {
                        let args = match frame_to_args(frame) {
                            Ok(a) => a,
                            Err(e) => {
                                let _ = framed.send(RespFrame::Error(e.to_string())).await;
                                break 'conn Err(e);
                            }
                        };
                        if args.is_empty() {
                            continue;
                        }
                        let name = String::from_utf8_lossy(&args[0]).to_ascii_uppercase();
                        let command = match dispatch::parse(&name, args[1..].to_vec()) {
                            Ok(c) => c,
                            Err(e) => {
                                let _ = framed.send(RespFrame::Error(e.to_string())).await;
                                continue;
                            }
                        };
                        if !server.is_connected() {
                            let _ = framed.send(RespFrame::Error(Error::Connection.to_string())).await;
                            continue;
                        }
                        let dispatched = dispatch::dispatch(&server, &mut session, command).await;
                        framed.codec_mut().set_protocol_version(session.protocol_version);
                        sync_client_info(&server, &session);

                        for new_sub in dispatched.new_subscriptions {
                            match new_sub {
                                NewSubscription::Channel(c, rx) => receivers.push(SubscriptionReceiver::Channel(c, rx)),
                                NewSubscription::Pattern(p, rx) => receivers.push(SubscriptionReceiver::Pattern(p, rx)),
                                NewSubscription::Shard(c, rx) => receivers.push(SubscriptionReceiver::Shard(c, rx)),
                            }
                        }
                        receivers.retain(|r| match r {
                            SubscriptionReceiver::Channel(n, _) => session.subscribed_channels.contains(n),
                            SubscriptionReceiver::Pattern(n, _) => session.subscribed_patterns.contains(n),
                            SubscriptionReceiver::Shard(n, _) => session.subscribed_shard_channels.contains(n),
                        });

                        for reply in dispatched.replies {
                            if framed.send(reply.into()).await.is_err() {
                                break 'conn Ok(());
                            }
                        }
                        if dispatched.should_close {
                            break 'conn Ok(());
                        }
                    }
                    Some(Err(e)) => break 'conn Err(e),
                    None => break 'conn Ok(()),
                }
            }
            msg = recv_any(&mut receivers), if !receivers.is_empty() => {
                match msg {
                    Some((_, Ok(frame))) => {
                        if framed.send(frame).await.is_err() {
                            break 'conn Ok(());
                        }
                    }
                    Some((idx, Err(broadcast::error::RecvError::Lagged(_)))) => {
                        resubscribe_lagged(&server, &mut receivers[idx]);
                    }
                    Some((_, Err(broadcast::error::RecvError::Closed))) | None => {
                        receivers.clear();
                    }
                }
            }
        }
    };

    server.clients.remove(&id);
    server.blockers.remove_waiters_for_session(id);
    outcome
}

/// Re-subscribes a receiver that lagged, trading its missed backlog for a
/// fresh channel rather than leaving the connection permanently behind.
fn resubscribe_lagged(server: &ServerState, r: &mut SubscriptionReceiver) {
    let name = r.name().clone();
    *r = match r {
        SubscriptionReceiver::Channel(..) => SubscriptionReceiver::Channel(name.clone(), server.pubsub.subscribe(name)),
        SubscriptionReceiver::Pattern(..) => SubscriptionReceiver::Pattern(name.clone(), server.pubsub.subscribe_pattern(name)),
        SubscriptionReceiver::Shard(..) => SubscriptionReceiver::Shard(name.clone(), server.pubsub.subscribe_shard(name)),
    };
}
