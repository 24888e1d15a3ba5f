//! UDP transport: request/response correlation on top of datagrams.
//!
//! A [`Connection`] owns one broadcast-enabled socket shared by every request.
//! A background task receives all inbound datagrams and hands each one to
//! the request waiting on its `(source, sequence, target)`; datagrams nobody
//! waits for are traced and dropped. Requests are retransmitted with the same
//! sequence number according to their [`RetryPolicy`].

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};

use futures::channel::{mpsc, oneshot};
use futures::{FutureExt, StreamExt, pin_mut, select};
use log::{debug, error, trace};

use crate::config::LanConfig;
use crate::errors::Error;
use crate::header::Header;
use crate::history::{Direction, MessageHistory};
use crate::message::{Message, MessageType, RequestMessage, ResponseMessage, decode, encode};
use crate::retry::RetryPolicy;
use crate::runtime::{self, AsyncUdpSocket, Instant, Mutex, UdpSocket};
use crate::types::TargetAddress;

type Result<T> = std::result::Result<T, Error>;

/// Largest datagram a device sends (`StateDeviceChain`) with room to spare.
const RECEIVE_BUFFER: usize = 2048;

/// A decoded response matched to a pending request.
#[derive(Debug, Clone)]
pub struct Response {
    /// The device that sent the response.
    pub target: TargetAddress,
    /// Where the response came from.
    pub address: SocketAddr,
    pub header: Header,
    pub message: ResponseMessage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct Correlation {
    sequence: u8,
    target: TargetAddress,
}

type Waiters = Arc<StdMutex<HashMap<Correlation, mpsc::UnboundedSender<Response>>>>;

fn lock<T>(mutex: &StdMutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Removes a waiter when the request finishes or its future is dropped.
struct PendingGuard {
    waiters: Waiters,
    key: Correlation,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        lock(&self.waiters).remove(&self.key);
    }
}

/// A shared UDP endpoint with a background receive task.
pub struct Connection {
    socket: Arc<UdpSocket>,
    source: u32,
    sequence: AtomicU8,
    waiters: Waiters,
    history: Arc<Mutex<MessageHistory>>,
    local_addr: SocketAddr,
    // Dropping the sender stops the receive task.
    _shutdown: oneshot::Sender<()>,
}

impl Connection {
    /// Bind the socket and start receiving.
    ///
    /// `source` must be non-zero; devices treat source 0 as "reply by broadcast".
    pub async fn bind(config: &LanConfig, source: u32) -> Result<Connection> {
        if source == 0 {
            return Err(Error::InvalidArgument("source id must be non-zero".into()));
        }
        let socket = UdpSocket::bind(config.bind_address)
            .await
            .map_err(|e| Error::socket("bind", e))?;
        socket
            .set_broadcast(true)
            .map_err(|e| Error::socket("set_broadcast", e))?;
        let local_addr = socket
            .local_addr()
            .map_err(|e| Error::socket("local_addr", e))?;

        let socket = Arc::new(socket);
        let waiters: Waiters = Arc::default();
        let history = Arc::new(Mutex::new(MessageHistory::with_max_entries(
            config.history_size,
        )));
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        runtime::spawn(receive_loop(
            socket.clone(),
            source,
            waiters.clone(),
            history.clone(),
            shutdown_rx,
        ))
        .detach();

        debug!("connection bound to {local_addr} with source {source:#010x}");
        Ok(Connection {
            socket,
            source,
            sequence: AtomicU8::new(0),
            waiters,
            history,
            local_addr,
            _shutdown: shutdown_tx,
        })
    }

    pub fn source(&self) -> u32 {
        self.source
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub async fn history(&self) -> MessageHistory {
        self.history.lock().await.clone()
    }

    pub async fn clear_history(&self) {
        self.history.lock().await.clear();
    }

    /// Send `message` to `target` at `address` and collect its responses.
    ///
    /// Setters are sent with `ack_required`, getters with `res_required`.
    /// Returns as soon as `policy.expected_responses()` distinct responses of
    /// an expected type have arrived. If the attempts run out first, a
    /// bounded policy fails with [`Error::NoResponse`] and an unbounded one
    /// returns what it collected. Socket errors end the call immediately.
    pub async fn send(
        &self,
        address: SocketAddr,
        target: TargetAddress,
        message: &RequestMessage,
        policy: &RetryPolicy,
    ) -> Result<Vec<Response>> {
        let (tx, mut rx) = mpsc::unbounded();
        let guard = self.register(target, tx)?;
        let sequence = guard.key.sequence;

        let mut header = Header::for_target(self.source, target, sequence);
        if message.is_setter() {
            header.ack_required = true;
        } else {
            header.res_required = true;
        }
        let bytes = encode(&header, message)?;
        let message_type = message.message_type();
        let expected_types = message.response_types();
        let mut responses: Vec<Response> = Vec::new();

        if policy.expected_responses() == Some(0) {
            self.transmit(&bytes, address, message_type, target, sequence)
                .await?;
            return Ok(responses);
        }

        for attempt in 0..policy.attempts() {
            if attempt > 0 {
                debug!(
                    "retrying {message_type} to {target} (attempt {}/{})",
                    attempt + 1,
                    policy.attempts()
                );
            }
            self.transmit(&bytes, address, message_type, target, sequence)
                .await?;

            let timeout = policy.timeout(attempt);
            let started = Instant::now();
            loop {
                let remaining = timeout.saturating_sub(started.elapsed());
                if remaining.is_zero() {
                    break;
                }
                let response = match runtime::timeout(remaining, rx.next()).await {
                    Err(_) => break,
                    Ok(None) => return Err(Error::ConnectionClosed),
                    Ok(Some(response)) => response,
                };

                let response_type = response.message.message_type();
                if !expected_types.contains(&response_type) {
                    trace!("{message_type} to {target}: unexpected {response_type}, ignoring");
                    continue;
                }
                if responses
                    .iter()
                    .any(|r| r.target == response.target && r.message == response.message)
                {
                    continue;
                }

                policy.notify(&response);
                responses.push(response);
                if let Some(expected) = policy.expected_responses()
                    && responses.len() >= expected
                {
                    return Ok(responses);
                }
            }
        }

        match policy.expected_responses() {
            None => Ok(responses),
            Some(_) => {
                let err = Error::NoResponse {
                    target,
                    message_type,
                    attempts: policy.attempts(),
                    received: responses.len(),
                };
                self.history.lock().await.record_error(&err.to_string());
                Err(err)
            }
        }
    }

    /// Send `message` without asking for an acknowledgement or waiting.
    pub async fn fire(
        &self,
        address: SocketAddr,
        target: TargetAddress,
        message: &RequestMessage,
    ) -> Result<()> {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        let header = Header::for_target(self.source, target, sequence);
        let bytes = encode(&header, message)?;
        self.transmit(&bytes, address, message.message_type(), target, sequence)
            .await
    }

    /// Pick a sequence number that is not in flight for `target` and register
    /// the waiter under it.
    fn register(
        &self,
        target: TargetAddress,
        tx: mpsc::UnboundedSender<Response>,
    ) -> Result<PendingGuard> {
        let mut waiters = lock(&self.waiters);
        for _ in 0..=u8::MAX {
            let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
            let in_flight = if target.is_broadcast() {
                waiters.keys().any(|k| k.sequence == sequence)
            } else {
                waiters.contains_key(&Correlation { sequence, target })
                    || waiters.contains_key(&Correlation {
                        sequence,
                        target: TargetAddress::BROADCAST,
                    })
            };
            if !in_flight {
                let key = Correlation { sequence, target };
                waiters.insert(key, tx);
                return Ok(PendingGuard {
                    waiters: self.waiters.clone(),
                    key,
                });
            }
        }
        Err(Error::SequenceExhausted(target))
    }

    async fn transmit(
        &self,
        bytes: &[u8],
        address: SocketAddr,
        message_type: MessageType,
        target: TargetAddress,
        sequence: u8,
    ) -> Result<()> {
        trace!("SEND: {message_type} to {target} ({address}) seq {sequence}");
        if let Err(e) = self.socket.send_to(bytes, address).await {
            error!("failed to send {message_type} to {address}: {e}");
            let err = Error::socket("send_to", e);
            self.history.lock().await.record_error(&err.to_string());
            return Err(err);
        }
        self.history
            .lock()
            .await
            .record(Direction::Sent, message_type, target, sequence);
        Ok(())
    }
}

async fn receive_loop(
    socket: Arc<UdpSocket>,
    source: u32,
    waiters: Waiters,
    history: Arc<Mutex<MessageHistory>>,
    shutdown: oneshot::Receiver<()>,
) {
    let mut buf = vec![0u8; RECEIVE_BUFFER];
    let mut shutdown = shutdown.fuse();

    loop {
        let received = {
            let recv = socket.recv_from(&mut buf).fuse();
            pin_mut!(recv);
            select! {
                _ = shutdown => None,
                result = recv => Some(result),
            }
        };
        let Some(result) = received else {
            break;
        };

        match result {
            Ok((len, addr)) => dispatch(&buf[..len], addr, source, &waiters, &history).await,
            Err(e) => {
                error!("receive failed: {e}");
                history
                    .lock()
                    .await
                    .record_error(&Error::socket("recv_from", e).to_string());
            }
        }
    }
    debug!("receive loop for source {source:#010x} stopped");
}

async fn dispatch(
    bytes: &[u8],
    address: SocketAddr,
    source: u32,
    waiters: &Waiters,
    history: &Mutex<MessageHistory>,
) {
    let (header, message) = match decode::<ResponseMessage>(bytes) {
        Ok(decoded) => decoded,
        Err(e) => {
            debug!("discarding datagram from {address}: {e}");
            return;
        }
    };
    let message_type = message.message_type();
    let target = header.target;
    let sequence = header.sequence;

    let delivered = header.source == source && {
        let waiters = lock(waiters);
        let waiter = waiters.get(&Correlation { sequence, target }).or_else(|| {
            waiters.get(&Correlation {
                sequence,
                target: TargetAddress::BROADCAST,
            })
        });
        waiter.is_some_and(|tx| {
            tx.unbounded_send(Response {
                target,
                address,
                header,
                message,
            })
            .is_ok()
        })
    };

    if delivered {
        trace!("RECV: {message_type} from {target} ({address}) seq {sequence}");
    } else {
        trace!(
            "RECX: {message_type} from {target} ({address}) source {:#010x} seq {sequence}",
            header.source
        );
    }
    let direction = if delivered {
        Direction::Received
    } else {
        Direction::Ignored
    };
    history
        .lock()
        .await
        .record(direction, message_type, target, sequence);
}
