//! PumpLink host demo.
//!
//! Runs a simulated pump behind a transport thread and drives it from
//! several issuer threads, then drops the link with commands still queued.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  issuer threads ──request()──▶ LinkSession ──▶ SignalNotifier │
//! │                                     │                │        │
//! │                                     ▼                ▼        │
//! │                              next_to_send ◀── transport thread│
//! │                                     │         (SimulatedPump) │
//! │                                     ▼                         │
//! │                          deliver_response / link_lost         │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Usage: `pumplink [config.json]`

#![deny(unused_must_use)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use log::{info, warn};

use pumplink::adapters::doorbell::SignalNotifier;
use pumplink::adapters::sim_pump::{PumpMessage, PumpOp, SimulatedPump};
use pumplink::config::LinkConfig;
use pumplink::link::session::LinkSession;

type Session = LinkSession<PumpMessage, SignalNotifier>;

fn load_config() -> Result<LinkConfig> {
    let Some(path) = std::env::args().nth(1) else {
        return Ok(LinkConfig::default());
    };
    let text = std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
    let config: LinkConfig =
        serde_json::from_str(&text).with_context(|| format!("parsing {path}"))?;
    config.validate().map_err(|e| anyhow!("{path}: {e}"))?;
    Ok(config)
}

fn spawn_transport(
    session: Arc<Session>,
    mut pump: SimulatedPump,
    stop: Arc<AtomicBool>,
) -> thread::JoinHandle<SimulatedPump> {
    thread::spawn(move || {
        pump.serve(&session, &stop);
        pump
    })
}

fn issue_batch(session: &Arc<Session>, ops: &[PumpOp]) -> Vec<thread::JoinHandle<()>> {
    ops.iter()
        .copied()
        .map(|op| {
            let session = Arc::clone(session);
            thread::spawn(move || match session.request(op.into_message()) {
                Ok(reply) => info!("{:?} -> {:?}", op, reply.body),
                Err(e) if e.is_in_doubt() => warn!("{:?} -> in doubt: {}", op, e),
                Err(e) => warn!("{:?} -> failed: {}", op, e),
            })
        })
        .collect()
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = load_config()?;
    info!("PumpLink demo starting with {:?}", config);

    // ── Session 1: normal traffic ─────────────────────────────
    let session = Arc::new(LinkSession::new(&config, SignalNotifier::new())?);
    let stop = Arc::new(AtomicBool::new(false));
    let transport = spawn_transport(
        Arc::clone(&session),
        SimulatedPump::new(Duration::from_millis(40)),
        Arc::clone(&stop),
    );

    let issuers = issue_batch(
        &session,
        &[
            PumpOp::ReadHistory { page: 0 },
            PumpOp::ReadStatus,
            PumpOp::StartBolus { centi_units: 250 },
            PumpOp::CancelBolus,
            PumpOp::StartBolus { centi_units: 50_000 },
        ],
    );
    for issuer in issuers {
        issuer.join().map_err(|_| anyhow!("issuer thread panicked"))?;
    }

    stop.store(true, Ordering::Release);
    session.notifier().ring();
    let pump = transport
        .join()
        .map_err(|_| anyhow!("transport thread panicked"))?;
    info!("Device saw, in order: {:?}", pump.transmitted());

    // ── Session 2: link drops with work queued ────────────────
    session.begin_session();
    stop.store(false, Ordering::Release);
    let queued = [
        PumpOp::ReadStatus,
        PumpOp::ReadHistory { page: 1 },
        PumpOp::ReadHistory { page: 2 },
    ]
    .into_iter()
    .map(|op| session.submit(op.into_message()).map(|env| (op, env)))
    .collect::<Result<Vec<_>, _>>()
    .map_err(|e| anyhow!("submit failed: {e}"))?;

    let mut flaky = SimulatedPump::new(Duration::from_millis(40));
    flaky.disconnect_after(1);
    let transport = spawn_transport(Arc::clone(&session), flaky, Arc::clone(&stop));
    transport
        .join()
        .map_err(|_| anyhow!("transport thread panicked"))?;

    for (op, envelope) in queued {
        match envelope.wait_timeout(session.command_timeout()) {
            Ok(reply) => info!("{:?} -> {:?}", op, reply.body),
            Err(e) => warn!("{:?} -> released: {}", op, e),
        }
    }

    info!("PumpLink demo finished, {} commands pending", session.queue().pending_len());
    Ok(())
}
