//! Integration tests for link teardown and session restart.

use super::mock_device::{ScriptedDevice, msg, new_session, times_ten, wait_for_pending};

use pumplink::error::{CommandError, TransportError};
use pumplink::link::message::MessagePriority;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

const DISCONNECTED: CommandError = CommandError::Transport(TransportError::Disconnected);

#[test]
fn link_lost_wakes_every_untimed_waiter() {
    let session = new_session();
    let waiters: Vec<_> = (0..3u32)
        .map(|body| {
            let session = Arc::clone(&session);
            thread::spawn(move || session.request_untimed(msg(MessagePriority::Normal, body)))
        })
        .collect();
    wait_for_pending(&session, 3);

    session.link_lost(DISCONNECTED);

    for waiter in waiters {
        assert_eq!(waiter.join().unwrap().unwrap_err(), DISCONNECTED);
    }
    assert!(!session.has_pending());
}

#[test]
fn link_lost_fails_the_in_flight_command_too() {
    let session = new_session();
    let in_flight = session.submit(msg(MessagePriority::High, 1)).unwrap();
    let queued = session.submit(msg(MessagePriority::Low, 2)).unwrap();

    let sent = session.next_to_send().unwrap();
    assert!(Arc::ptr_eq(&sent, &in_flight));

    session.link_lost(DISCONNECTED);
    assert_eq!(in_flight.wait().unwrap_err(), DISCONNECTED);
    assert_eq!(queued.wait().unwrap_err(), DISCONNECTED);
    assert!(session.next_to_send().is_none());
}

#[test]
fn late_response_after_link_lost_is_ignored() {
    let session = new_session();
    let env = session.submit(msg(MessagePriority::Normal, 5)).unwrap();
    session.next_to_send();
    session.link_lost(DISCONNECTED);

    assert!(!session.deliver_response(msg(MessagePriority::Normal, 50)));
    assert_eq!(env.wait().unwrap_err(), DISCONNECTED);
}

#[test]
fn new_session_serves_fresh_traffic() {
    let session = new_session();
    let stale = session.submit(msg(MessagePriority::Normal, 1)).unwrap();

    session.begin_session();
    assert_eq!(stale.wait().unwrap_err(), CommandError::LinkLost);

    let device = ScriptedDevice::start(Arc::clone(&session), Duration::ZERO, times_ten);
    let reply = session.request(msg(MessagePriority::Normal, 2)).unwrap();
    assert_eq!(reply.body, 20);
    assert_eq!(device.stop(), [2], "stale command never transmitted");
}

#[test]
fn teardown_while_issuers_submit_resolves_every_command() {
    let session = new_session();
    let stop = Arc::new(AtomicBool::new(false));
    let issuers: Vec<_> = (0..4u32)
        .map(|id| {
            let session = Arc::clone(&session);
            let stop = Arc::clone(&stop);
            thread::spawn(move || {
                let mut submitted = Vec::new();
                let mut body = id;
                while !stop.load(Ordering::Acquire) {
                    submitted.push(session.submit(msg(MessagePriority::Normal, body)).unwrap());
                    body += 4;
                }
                submitted
            })
        })
        .collect();

    for round in 0..5_000 {
        session.next_to_send();
        if round % 2 == 0 {
            session.link_lost(DISCONNECTED);
        } else {
            session.begin_session();
        }
    }
    stop.store(true, Ordering::Release);
    let submitted: Vec<_> = issuers
        .into_iter()
        .flat_map(|issuer| issuer.join().unwrap())
        .collect();
    session.link_lost(DISCONNECTED);

    assert!(!submitted.is_empty());
    let orphaned = submitted.iter().filter(|e| !e.is_completed()).count();
    assert_eq!(orphaned, 0, "of {} submitted", submitted.len());
    for envelope in &submitted {
        let err = envelope.outcome().unwrap().unwrap_err();
        assert!(err == DISCONNECTED || err == CommandError::LinkLost, "{err}");
    }
    assert!(!session.has_pending());
}
