//! The software timer service (spec.md §4.3). Grounded on
//! `original_source/timer/api/timer_msgs.h`, `timer_client.h`, `timer_server.h`
//! and `src/main.c`. The original's `ActiveTimer`/`ScheduleEvent` abstraction in
//! the teacher's own `event.rs` ("the abstraction of *activated timer as a
//! resource*") is the conceptual model here: arming a timer hands the caller
//! nothing back (there's no Cnf in this catalog), but the `(id, sourcePort)`
//! pair it supplied becomes the handle it later cancels by.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::fabric::server::{HandlerOutcome, ServerHandler};
use crate::fabric::wire::{Frame, Received, ShortFrame};

/// Default port, named per spec.md §7 for tests/documentation; every binary
/// still takes its port as a CLI argument.
pub const DEFAULT_PORT: u16 = 5235;

crate::declare_catalog! {
    catalog = Timer, no_header, no_cnf, no_ind;
    TimerServerStartReq = 0, TimerServerStartReq { req {} };
    TimerServerStopReq = 1, TimerServerStopReq { req {} };
    TimerStartReq = 2, TimerStartReq {
        req {
            expiry_deci_seconds: u32,
            id: u8,
            source_port: i32,
            expiry_msg: ShortFrame
        }
    };
    TimerStopReq = 3, TimerStopReq {
        req { id: u8, source_port: i32 }
    };
}

/// `(TimerId, sourcePort)` — the original's compound key for timer identity
/// (spec.md §4.3: "uniquely identified by the pair").
type TimerKey = (u8, i32);

struct ArmedTimer {
    expiry: Instant,
    expiry_msg: ShortFrame,
}

/// Shared timer table plus a [`Notify`] the background expiry task waits on,
/// woken whenever arming or cancelling a timer could change the next
/// wake-up time. The table itself uses a plain [`std::sync::Mutex`] — every
/// critical section is a short, non-blocking map edit, so arming/cancelling
/// from the synchronous [`ServerHandler::handle`] never needs to cross an
/// `.await` while holding the lock.
#[derive(Clone)]
pub struct TimerService {
    timers: Arc<Mutex<BTreeMap<TimerKey, ArmedTimer>>>,
    wake: Arc<Notify>,
}

impl TimerService {
    pub fn new() -> Self {
        Self { timers: Arc::new(Mutex::new(BTreeMap::new())), wake: Arc::new(Notify::new()) }
    }

    /// Spawns the background task that fires expired timers by sending their
    /// stored expiry message back to the originating port, fire-and-forget
    /// (spec.md §4.3: "No response is awaited").
    pub fn spawn_expiry_task(&self) -> tokio::task::JoinHandle<()> {
        let timers = self.timers.clone();
        let wake = self.wake.clone();
        tokio::spawn(async move {
            loop {
                let next_wake = {
                    let table = timers.lock().unwrap();
                    table.values().map(|t| t.expiry).min()
                };
                match next_wake {
                    None => wake.notified().await,
                    Some(at) => {
                        tokio::select! {
                            _ = tokio::time::sleep_until(at) => {}
                            _ = wake.notified() => {}
                        }
                    }
                }
                fire_expired(&timers, &wake).await;
            }
        })
    }

    fn arm(&self, req: &TimerStartReq) {
        let expiry = Instant::now() + Duration::from_millis(req.expiry_deci_seconds as u64 * 100);
        let mut table = self.timers.lock().unwrap();
        table.insert((req.id, req.source_port), ArmedTimer { expiry, expiry_msg: req.expiry_msg.clone() });
        drop(table);
        self.wake.notify_one();
        debug!("armed timer id={} source_port={}", req.id, req.source_port);
    }

    fn cancel(&self, req: &TimerStopReq) {
        let mut table = self.timers.lock().unwrap();
        let removed = table.remove(&(req.id, req.source_port)).is_some();
        drop(table);
        if removed {
            self.wake.notify_one();
        }
        debug!("cancel timer id={} source_port={} removed={removed}", req.id, req.source_port);
    }
}

impl Default for TimerService {
    fn default() -> Self {
        Self::new()
    }
}

/// Pending deliveries are collected under the lock, then sent after it's
/// released — and re-armed deliveries that raced with a fresh `notify_one`
/// are picked up on the scheduler's next loop iteration.
async fn fire_expired(timers: &Mutex<BTreeMap<TimerKey, ArmedTimer>>, wake: &Notify) {
    let now = Instant::now();
    let due: Vec<(TimerKey, ArmedTimer)> = {
        let mut table = timers.lock().unwrap();
        let due_keys: Vec<TimerKey> =
            table.iter().filter(|(_, t)| t.expiry <= now).map(|(k, _)| *k).collect();
        due_keys.into_iter().map(|k| (k, table.remove(&k).unwrap())).collect()
    };
    if due.is_empty() {
        return;
    }
    for (key, timer) in due {
        let frame = timer.expiry_msg.into_frame();
        info!("timer id={} source_port={} expired, delivering", key.0, key.1);
        if let Err(err) =
            crate::fabric::client::send_fire_and_forget(port_from(key.1), "127.0.0.1", &frame).await
        {
            warn!("failed to deliver expiry for timer id={}: {err}", key.0);
        }
    }
    wake.notify_one();
}

fn port_from(source_port: i32) -> u16 {
    source_port as u16
}

/// The messaging-fabric handler for the timer server: arms/cancels timers on
/// `TIMER_START_REQ`/`TIMER_STOP_REQ`, shuts down on `TIMER_SERVER_STOP_REQ`
/// or the zero-length signal.
pub struct TimerHandler {
    service: TimerService,
}

impl TimerHandler {
    pub fn new(service: TimerService) -> Self {
        Self { service }
    }
}

impl ServerHandler for TimerHandler {
    fn handle(&mut self, received: Received) -> HandlerOutcome {
        let Some(frame) = received else {
            return HandlerOutcome::ExitNormally;
        };
        let Ok(msg_type) = TimerMsgType::from_code(frame.msg_type) else {
            warn!("unknown timer message type {}", frame.msg_type);
            return HandlerOutcome::KeepRunning(None);
        };
        let Ok(msg) = TimerReqMsg::decode_body(msg_type, &frame.body) else {
            warn!("malformed {} body", msg_type.name());
            return HandlerOutcome::KeepRunning(None);
        };

        match msg {
            TimerReqMsg::TimerServerStartReq(_) => {}
            TimerReqMsg::TimerServerStopReq(_) => return HandlerOutcome::ExitNormally,
            TimerReqMsg::TimerStartReq(req) => self.service.arm(&req),
            TimerReqMsg::TimerStopReq(req) => self.service.cancel(&req),
        }
        HandlerOutcome::KeepRunning(None)
    }
}

/// Encodes a [`TimerStartReq`] and sends it fire-and-forget to the timer
/// server — the client-side half of `sendStartTimer` in `timer_client.h`.
pub async fn send_start_timer(
    timer_server_port: u16,
    expiry_deci_seconds: u32,
    id: u8,
    source_port: i32,
    expiry_msg: ShortFrame,
) -> anyhow::Result<()> {
    let req = TimerStartReq { expiry_deci_seconds, id, source_port, expiry_msg };
    let frame: Frame = TimerReqMsg::TimerStartReq(req).to_frame();
    crate::fabric::client::send_fire_and_forget(timer_server_port, "127.0.0.1", &frame).await?;
    Ok(())
}

/// Encodes a [`TimerStopReq`] and sends it fire-and-forget to the timer
/// server — `sendStopTimer` in `timer_client.h`.
pub async fn send_stop_timer(timer_server_port: u16, id: u8, source_port: i32) -> anyhow::Result<()> {
    let req = TimerStopReq { id, source_port };
    let frame: Frame = TimerReqMsg::TimerStopReq(req).to_frame();
    crate::fabric::client::send_fire_and_forget(timer_server_port, "127.0.0.1", &frame).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    async fn bind_ephemeral() -> (TcpListener, u16) {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let port = listener.local_addr().unwrap().port();
        (listener, port)
    }

    #[tokio::test]
    async fn armed_timer_fires_and_delivers_expiry_to_source_port() {
        let (catcher_listener, catcher_port) = bind_ephemeral().await;
        let catcher = tokio::spawn(async move {
            let (mut stream, _) = catcher_listener.accept().await.unwrap();
            use tokio::io::AsyncReadExt;
            let len = stream.read_u8().await.unwrap() as usize;
            let mut body = vec![0u8; len];
            stream.read_exact(&mut body).await.unwrap();
            body
        });

        let service = TimerService::new();
        service.spawn_expiry_task();

        let expiry_msg = ShortFrame::new(42, vec![9, 9]).unwrap();
        service.arm(&TimerStartReq { expiry_deci_seconds: 1, id: 99, source_port: catcher_port as i32, expiry_msg });

        let delivered = tokio::time::timeout(Duration::from_secs(2), catcher).await.unwrap().unwrap();
        assert_eq!(delivered[0], 42);
        assert_eq!(&delivered[1..], &[9, 9]);
    }

    #[tokio::test]
    async fn cancelled_timer_never_fires() {
        let (catcher_listener, catcher_port) = bind_ephemeral().await;
        let service = TimerService::new();
        service.spawn_expiry_task();

        let expiry_msg = ShortFrame::new(1, vec![]).unwrap();
        service.arm(&TimerStartReq { expiry_deci_seconds: 5, id: 7, source_port: catcher_port as i32, expiry_msg });
        service.cancel(&TimerStopReq { id: 7, source_port: catcher_port as i32 });

        let accept = tokio::time::timeout(Duration::from_millis(800), catcher_listener.accept()).await;
        assert!(accept.is_err(), "cancelled timer must not deliver");
    }

    #[tokio::test]
    async fn handler_exits_normally_on_server_stop_req() {
        let service = TimerService::new();
        let mut handler = TimerHandler::new(service);
        let frame = TimerReqMsg::TimerServerStopReq(TimerServerStopReq { _filler: 0 }).to_frame();
        match handler.handle(Some(frame)) {
            HandlerOutcome::ExitNormally => {}
            _ => panic!("expected ExitNormally"),
        }
    }
}
