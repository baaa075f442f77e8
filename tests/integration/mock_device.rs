//! Scripted device for integration tests.
//!
//! Runs a transport thread against a [`LinkSession`], records the order
//! in which commands reached the "device", and answers each one through
//! a caller-supplied responder.

use pumplink::adapters::doorbell::SignalNotifier;
use pumplink::config::LinkConfig;
use pumplink::error::CommandError;
use pumplink::link::message::{MessagePriority, Prioritized};
use pumplink::link::session::LinkSession;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

pub type Msg = Prioritized<u32>;
pub type Session = LinkSession<Msg, SignalNotifier>;
pub type Responder = fn(u32) -> Result<u32, CommandError>;

pub fn msg(priority: MessagePriority, body: u32) -> Msg {
    Prioritized::new(priority, body)
}

pub fn new_session() -> Arc<Session> {
    Arc::new(LinkSession::new(&LinkConfig::default(), SignalNotifier::new()).unwrap())
}

/// Replies with ten times the request body.
pub fn times_ten(body: u32) -> Result<u32, CommandError> {
    Ok(body * 10)
}

/// Spin until `n` commands are pending, so tests can order their steps
/// against issuer threads.
pub fn wait_for_pending(session: &Session, n: usize) {
    while session.queue().pending_len() < n {
        thread::yield_now();
    }
}

// ── ScriptedDevice ────────────────────────────────────────────

pub struct ScriptedDevice {
    session: Arc<Session>,
    stop: Arc<AtomicBool>,
    handle: JoinHandle<Vec<u32>>,
}

impl ScriptedDevice {
    pub fn start(session: Arc<Session>, latency: Duration, responder: Responder) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let handle = {
            let session = Arc::clone(&session);
            let stop = Arc::clone(&stop);
            thread::spawn(move || {
                let mut seen = Vec::new();
                while !stop.load(Ordering::Acquire) {
                    while let Some(envelope) = session.next_to_send() {
                        let request = *envelope.request();
                        seen.push(request.body);
                        if !latency.is_zero() {
                            thread::sleep(latency);
                        }
                        match responder(request.body) {
                            Ok(body) => session.deliver_response(msg(request.priority, body)),
                            Err(e) => session.deliver_error(e),
                        };
                    }
                    session.notifier().wait();
                }
                seen
            })
        };
        Self {
            session,
            stop,
            handle,
        }
    }

    /// Stop the transport thread and return the bodies it transmitted,
    /// in transmission order.
    pub fn stop(self) -> Vec<u32> {
        self.stop.store(true, Ordering::Release);
        self.session.notifier().ring();
        self.handle.join().expect("device thread panicked")
    }
}
