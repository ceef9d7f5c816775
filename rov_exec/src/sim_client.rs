//! # Simulation Client
//!
//! The SimClient exchanges messages with the simulator bridge over a zmq `PAIR` socket. The
//! bridge connects to the rover, forwarding the simulator's telemetry and relaying the rover's
//! commands back.
//!
//! The client is accessed through the [`SimLink`] trait so that the driver loop does not depend
//! on the transport.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{debug, info};

use comms_if::{
    net::{MonitoredSocket, MonitoredSocketError, SocketOptions, zmq},
    sim::{SimCmd, SimMsg, SimTelemetry}
};

use crate::params::RovExecParams;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A link to the simulator.
pub trait SimLink {
    /// Wait a short time for the next event from the simulator.
    fn recv_event(&mut self) -> Result<SimEvent, SimClientError>;

    /// Send a command to the simulator.
    fn send(&mut self, cmd: &SimCmd) -> Result<(), SimClientError>;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct SimClient {
    socket: MonitoredSocket,
    inbox: Inbox,
}

/// Orders a peer's `Connected` event ahead of any message it sent.
#[derive(Debug, Default)]
struct Inbox {
    /// Event recieved together with a new peer, delivered after the `Connected` event
    pending: Option<SimEvent>,

    /// Whether a peer was connected at the last check
    peer_connected: bool,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// An event from the simulator.
#[derive(Debug, Clone, PartialEq)]
pub enum SimEvent {
    /// A (new) simulator session has connected
    Connected,

    /// Telemetry, `None` when the simulator is in manual mode
    Telemetry(Option<SimTelemetry>),

    /// A message which could not be read, answered as if it were bad telemetry
    MalformedTelemetry(String),

    /// Nothing happened within the recieve timeout
    Idle,

    /// The link has been shut down
    Closed,
}

#[derive(Debug, thiserror::Error)]
pub enum SimClientError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),

    #[error("Could not send a command to the simulator: {0}")]
    SendError(zmq::Error),

    #[error("Could not recieve a message from the simulator: {0}")]
    RecvError(zmq::Error),

    #[error("Recieved a message which is not valid UTF-8")]
    NonUtf8,

    #[error("Could not serialize the command: {0}")]
    SerializationError(serde_json::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SimClient {
    /// Create a new instance of the SimClient, bound to the simulator endpoint.
    ///
    /// Does not wait for the bridge to connect.
    pub fn new(ctx: &zmq::Context, params: &RovExecParams) -> Result<Self, SimClientError> {
        let socket_options = SocketOptions {
            bind: true,
            block_on_first_connect: false,
            linger: 1,
            recv_timeout: params.recv_timeout_ms,
            send_timeout: 1000,
            ..Default::default()
        };

        let socket = MonitoredSocket::new(
            ctx,
            zmq::PAIR,
            socket_options,
            &params.sim_endpoint
        ).map_err(SimClientError::SocketError)?;

        info!("Waiting for the simulator on {}", params.sim_endpoint);

        Ok(Self {
            socket,
            inbox: Inbox::default()
        })
    }
}

impl SimLink for SimClient {
    fn recv_event(&mut self) -> Result<SimEvent, SimClientError> {
        if let Some(event) = self.inbox.before_recv(self.socket.take_new_peer()) {
            return Ok(event)
        }

        let msg = match self.socket.recv_string(0) {
            Ok(Ok(s)) => s,
            Ok(Err(_)) => return Err(SimClientError::NonUtf8),
            Err(zmq::Error::EAGAIN) => {
                if self.inbox.lost_peer(self.socket.connected()) {
                    info!("Simulator disconnected, waiting for it to reconnect");
                }
                return Ok(SimEvent::Idle)
            },
            Err(zmq::Error::ETERM) => return Ok(SimEvent::Closed),
            Err(e) => return Err(SimClientError::RecvError(e))
        };

        Ok(self.inbox.after_recv(parse_event(&msg), self.socket.take_new_peer()))
    }

    fn send(&mut self, cmd: &SimCmd) -> Result<(), SimClientError> {
        let json = cmd.to_json()
            .map_err(SimClientError::SerializationError)?;

        self.socket.send(json.as_str(), 0)
            .map_err(SimClientError::SendError)
    }
}

impl Inbox {
    /// Event to deliver without recieving, given whether a new peer has connected.
    fn before_recv(&mut self, new_peer: bool) -> Option<SimEvent> {
        if new_peer {
            self.peer_connected = true;
            return Some(SimEvent::Connected)
        }

        self.pending.take()
    }

    /// Event to deliver for a recieved one, given whether a new peer connected during the
    /// recieve. Such a peer is parked before it is driven.
    fn after_recv(&mut self, event: SimEvent, new_peer: bool) -> SimEvent {
        if new_peer {
            self.peer_connected = true;
            self.pending = Some(event);
            SimEvent::Connected
        }
        else {
            event
        }
    }

    /// True once when the peer goes away.
    fn lost_peer(&mut self, connected: bool) -> bool {
        let lost = self.peer_connected && !connected;

        if lost {
            self.peer_connected = false;
        }

        lost
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Convert a message from the simulator into an event.
///
/// Telemetry is the only event the simulator sends which needs a reply, so any message which
/// cannot be read is treated as malformed telemetry and still gets one.
pub fn parse_event(msg: &str) -> SimEvent {
    match SimMsg::from_json(msg) {
        Ok(SimMsg::Telemetry(t)) => SimEvent::Telemetry(t),
        Ok(SimMsg::Other(event)) => {
            debug!("Ignoring \"{}\" event from the simulator", event);
            SimEvent::Idle
        },
        Err(e) => SimEvent::MalformedTelemetry(e.to_string())
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
