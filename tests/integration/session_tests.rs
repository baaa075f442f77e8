//! Integration tests for issuer threads ↔ LinkSession ↔ device thread.

use super::mock_device::{ScriptedDevice, msg, new_session, times_ten, wait_for_pending};

use pumplink::error::CommandError;
use pumplink::link::message::MessagePriority;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const PRIORITIES: [MessagePriority; 5] = [
    MessagePriority::Highest,
    MessagePriority::High,
    MessagePriority::Normal,
    MessagePriority::Low,
    MessagePriority::Lowest,
];

// ── Correlation under concurrency ─────────────────────────────

#[test]
fn concurrent_issuers_each_get_their_own_response() {
    let session = new_session();
    let device = ScriptedDevice::start(Arc::clone(&session), Duration::ZERO, times_ten);

    let issuers: Vec<_> = (0..8u32)
        .map(|t| {
            let session = Arc::clone(&session);
            thread::spawn(move || {
                for i in 0..25u32 {
                    let body = t * 1_000 + i;
                    let priority = PRIORITIES[(body % 5) as usize];
                    let reply = session
                        .request(msg(priority, body))
                        .expect("echo device always answers");
                    assert_eq!(reply.body, body * 10, "reply routed to the wrong issuer");
                }
            })
        })
        .collect();

    for issuer in issuers {
        issuer.join().unwrap();
    }

    let seen = device.stop();
    assert_eq!(seen.len(), 8 * 25, "every command transmitted exactly once");
    assert!(!session.has_pending());
}

// ── Ordering ──────────────────────────────────────────────────

#[test]
fn queued_commands_transmit_in_priority_then_arrival_order() {
    let session = new_session();
    let plan = [
        (MessagePriority::Low, 1),
        (MessagePriority::Normal, 2),
        (MessagePriority::Highest, 3),
        (MessagePriority::Normal, 4),
        (MessagePriority::Lowest, 5),
        (MessagePriority::Highest, 6),
    ];
    let envelopes: Vec<_> = plan
        .iter()
        .map(|&(p, body)| session.submit(msg(p, body)).unwrap())
        .collect();

    let device = ScriptedDevice::start(Arc::clone(&session), Duration::ZERO, times_ten);
    for env in &envelopes {
        assert_eq!(env.wait().unwrap().body, env.request().body * 10);
    }

    assert_eq!(device.stop(), [3, 6, 2, 4, 1, 5]);
}

// ── Failure routing ───────────────────────────────────────────

#[test]
fn device_errors_reach_only_the_failing_issuer() {
    fn reject_multiples_of_seven(body: u32) -> Result<u32, CommandError> {
        if body % 7 == 0 {
            Err(CommandError::Device(0x0700))
        } else {
            Ok(body)
        }
    }

    let session = new_session();
    let device =
        ScriptedDevice::start(Arc::clone(&session), Duration::ZERO, reject_multiples_of_seven);

    for body in 1..=21u32 {
        let outcome = session.request(msg(MessagePriority::Normal, body));
        if body % 7 == 0 {
            assert_eq!(outcome.unwrap_err(), CommandError::Device(0x0700));
        } else {
            assert_eq!(outcome.unwrap().body, body);
        }
    }
    device.stop();
}

// ── Timeout semantics ─────────────────────────────────────────

#[test]
fn timed_out_command_still_completes_later() {
    let session = new_session();
    let envelope = session.submit(msg(MessagePriority::Normal, 4)).unwrap();

    // No transport running yet: the first waiter gives up.
    let first = envelope.wait_timeout(Duration::from_millis(20));
    assert_eq!(first.unwrap_err(), CommandError::Timeout);
    assert!(session.has_pending(), "timeout leaves the command queued");

    // A transport comes up later and the command goes through after all.
    let device = ScriptedDevice::start(Arc::clone(&session), Duration::ZERO, times_ten);
    assert_eq!(envelope.wait().unwrap().body, 40);
    assert_eq!(device.stop(), [4]);
}

#[test]
fn slow_device_times_out_in_doubt_then_queue_moves_on() {
    let session = new_session();
    let device =
        ScriptedDevice::start(Arc::clone(&session), Duration::from_millis(150), times_ten);

    let slow = session.request_timeout(msg(MessagePriority::Normal, 1), Duration::from_millis(10));
    let err = slow.unwrap_err();
    assert!(err.is_in_doubt());

    // The next command is served once the slow one has been answered.
    let next = session.request_timeout(msg(MessagePriority::Normal, 2), Duration::from_secs(5));
    assert_eq!(next.unwrap().body, 20);
    assert_eq!(device.stop(), [1, 2]);
}

#[test]
fn untimed_waiters_block_until_served() {
    let session = new_session();
    let waiter = {
        let session = Arc::clone(&session);
        thread::spawn(move || session.request_untimed(msg(MessagePriority::High, 9)))
    };
    wait_for_pending(&session, 1);

    let device = ScriptedDevice::start(Arc::clone(&session), Duration::ZERO, times_ten);
    assert_eq!(waiter.join().unwrap().unwrap().body, 90);
    device.stop();
}
