//! Simulated pump — the device side of the link, in process.
//!
//! Stands in for the BLE/serial transport plus pump firmware on hosts:
//! [`SimulatedPump::serve`] is a complete transport loop driving a
//! [`LinkSession`], answering one command at a time after a configurable
//! latency.  Failures and link loss can be injected.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use log::{debug, info};

use super::doorbell::SignalNotifier;
use crate::error::{CommandError, TransportError};
use crate::link::message::{MessagePriority, Prioritized};
use crate::link::session::LinkSession;

/// Requests and replies understood by the simulated pump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpOp {
    ReadStatus,
    StartBolus { centi_units: u16 },
    CancelBolus,
    ReadHistory { page: u16 },
    Status { reservoir_centi_units: u16, battery_percent: u8 },
    BolusStarted { centi_units: u16 },
    Ack,
    History { page: u16, entries: u8 },
}

impl PumpOp {
    pub const fn priority(self) -> MessagePriority {
        match self {
            Self::CancelBolus => MessagePriority::Highest,
            Self::StartBolus { .. } => MessagePriority::High,
            Self::ReadHistory { .. } => MessagePriority::Lowest,
            _ => MessagePriority::Normal,
        }
    }

    pub const fn into_message(self) -> PumpMessage {
        Prioritized::new(self.priority(), self)
    }
}

/// Wire message type for the simulated link.
pub type PumpMessage = Prioritized<PumpOp>;

/// Device error code for a bolus larger than the reservoir.
pub const ERR_INSUFFICIENT_RESERVOIR: u16 = 0x0a21;
/// Device error code for a message the pump does not accept as a request.
pub const ERR_NOT_A_REQUEST: u16 = 0x0f00;

/// In-process pump model.
pub struct SimulatedPump {
    latency: Duration,
    reservoir_centi_units: u16,
    battery_percent: u8,
    fail_next: Option<CommandError>,
    disconnect_after: Option<usize>,
    transmitted: Vec<PumpOp>,
}

impl SimulatedPump {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            reservoir_centi_units: 20_000,
            battery_percent: 87,
            fail_next: None,
            disconnect_after: None,
            transmitted: Vec::new(),
        }
    }

    /// Answer the next exchange with `error` instead of a reply.
    pub fn inject_failure(&mut self, error: CommandError) {
        self.fail_next = Some(error);
    }

    /// Drop the link once `exchanges` more commands have been answered.
    pub fn disconnect_after(&mut self, exchanges: usize) {
        self.disconnect_after = Some(exchanges);
    }

    /// Every request that reached the device, in transmission order.
    pub fn transmitted(&self) -> &[PumpOp] {
        &self.transmitted
    }

    /// Transmit one request and collect its reply.
    pub fn exchange(&mut self, request: &PumpMessage) -> Result<PumpMessage, CommandError> {
        if let Some(remaining) = self.disconnect_after.as_mut() {
            if *remaining == 0 {
                return Err(TransportError::Disconnected.into());
            }
            *remaining -= 1;
        }

        self.transmitted.push(request.body);
        if !self.latency.is_zero() {
            thread::sleep(self.latency);
        }
        if let Some(error) = self.fail_next.take() {
            return Err(error);
        }

        let reply = match request.body {
            PumpOp::ReadStatus => PumpOp::Status {
                reservoir_centi_units: self.reservoir_centi_units,
                battery_percent: self.battery_percent,
            },
            PumpOp::StartBolus { centi_units } => {
                if centi_units > self.reservoir_centi_units {
                    return Err(CommandError::Device(ERR_INSUFFICIENT_RESERVOIR));
                }
                self.reservoir_centi_units -= centi_units;
                PumpOp::BolusStarted { centi_units }
            }
            PumpOp::CancelBolus => PumpOp::Ack,
            PumpOp::ReadHistory { page } => PumpOp::History { page, entries: 16 },
            _ => return Err(CommandError::Device(ERR_NOT_A_REQUEST)),
        };
        Ok(reply.into_message())
    }

    /// Transport loop: transmit queued commands one at a time until `stop`
    /// is set or the link drops.
    ///
    /// Parks on the session's doorbell whenever the queue is drained.  Ring
    /// the doorbell after setting `stop` to make the loop observe it.
    pub fn serve(&mut self, session: &LinkSession<PumpMessage, SignalNotifier>, stop: &AtomicBool) {
        info!("SimPump: transport loop started");
        while !stop.load(Ordering::Acquire) {
            while let Some(envelope) = session.next_to_send() {
                debug!("SimPump: -> {:?}", envelope.request().body);
                match self.exchange(envelope.request()) {
                    Ok(reply) => {
                        session.deliver_response(reply);
                    }
                    Err(CommandError::Transport(TransportError::Disconnected)) => {
                        session.link_lost(TransportError::Disconnected.into());
                        info!("SimPump: link dropped, transport loop exiting");
                        return;
                    }
                    Err(error) => {
                        session.deliver_error(error);
                    }
                }
            }
            session.notifier().wait();
        }
        info!("SimPump: transport loop stopped");
    }
}
