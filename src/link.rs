//! Synchronous link protocol to the arm's motion controller.
//!
//! Strictly blocking request/response over a byte channel: a command
//! frame goes out, the session waits for the fixed-size acknowledgment
//! before anything else may be sent. Inbound opponent moves arrive as
//! two sequential 2-byte square labels. The session owns its channel for
//! its whole lifetime; Rust's `&mut` threading enforces the
//! one-in-flight-request invariant at compile time.

use std::io;
use std::time::Duration;

use thiserror::Error;

use crate::LinkChannel;
use crate::codec::{self, ArmMove, CodecError, CommandFrame, LABEL_LEN};
use crate::hardware::SerialChannel;

/// Length of the acknowledgment frame; content is implementation-defined
/// and discarded.
pub const ACK_LEN: usize = 9;

/// Length of the motion-complete marker, sent separately from the ack
/// when physical motion outlasts command receipt.
pub const COMPLETION_LEN: usize = 9;

/// Channel configuration, owned by the caller and passed into
/// [`LinkSession::connect`]. The timeout applies to every subsequent
/// blocking read, not to connection establishment; physical motion can
/// take tens of seconds, so production values run up to 120 s.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    pub port: String,
    pub baud_rate: u32,
    pub read_timeout: Duration,
}

/// Where the session is in the request/response cycle.
///
/// The `Awaiting*` states are only observable while a call is blocked on
/// the channel; successful operations return the session to `Ready`.
/// `Faulted` and `Closed` are terminal: recovering from an I/O failure
/// requires a fresh session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Ready,
    AwaitingAck,
    AwaitingOpponentMove,
    AwaitingCompletion,
    Faulted,
    Closed,
}

/// Protocol and transport failures, surfaced with enough context to log
/// and decide on a retry at the orchestration layer. The core never
/// retries on its own.
#[derive(Debug, Error)]
pub enum LinkError {
    /// The serial device could not be opened.
    #[error("cannot open serial device '{port}'")]
    Unavailable {
        port: String,
        #[source]
        source: serialport::Error,
    },

    /// The acknowledgment did not arrive in full before the timeout.
    #[error("no acknowledgment within {timeout:?} ({received} of {ACK_LEN} bytes)")]
    AckTimeout { received: usize, timeout: Duration },

    /// The motion-complete marker did not arrive before the timeout.
    #[error("no completion signal within {timeout:?} ({received} of {COMPLETION_LEN} bytes)")]
    CompletionTimeout { received: usize, timeout: Duration },

    /// Inbound bytes did not form a valid square pair. Short and empty
    /// reads land here too: a timed-out read yields a short count, which
    /// is rejected before it ever reaches the decoder.
    #[error("malformed inbound frame {bytes:?}")]
    MalformedFrame {
        bytes: Vec<u8>,
        #[source]
        source: Option<CodecError>,
    },

    /// Transport failure; the session is faulted and must be replaced.
    #[error("link I/O failure")]
    Io(#[from] io::Error),

    /// Operation attempted on a session that can no longer accept one.
    #[error("session is {0:?} and cannot accept commands")]
    NotReady(LinkState),
}

/// An open link to one physical arm.
///
/// Exactly one session may be active per arm; the session is not meant
/// to be shared between logical callers, and every operation takes
/// `&mut self` so concurrent use cannot compile.
#[derive(Debug)]
pub struct LinkSession<C: LinkChannel> {
    channel: C,
    state: LinkState,
    read_timeout: Duration,
}

impl LinkSession<SerialChannel> {
    /// Open the serial device and establish a session.
    ///
    /// Fails with [`LinkError::Unavailable`] if the device cannot be
    /// opened (bad port name, device busy).
    pub fn connect(config: &LinkConfig) -> Result<Self, LinkError> {
        let channel = SerialChannel::open(config).map_err(|source| LinkError::Unavailable {
            port: config.port.clone(),
            source,
        })?;
        log::info!(
            "link established on {} at {} baud, read timeout {:?}",
            config.port,
            config.baud_rate,
            config.read_timeout
        );
        Ok(Self::over(channel, config.read_timeout))
    }
}

impl<C: LinkChannel> LinkSession<C> {
    /// Wrap an already-open channel. This is how tests drive the
    /// protocol against a scripted channel.
    pub fn over(channel: C, read_timeout: Duration) -> Self {
        Self {
            channel,
            state: LinkState::Ready,
            read_timeout,
        }
    }

    #[inline]
    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Borrow the underlying channel for inspection; the session keeps
    /// ownership.
    #[inline]
    pub fn channel_ref(&self) -> &C {
        &self.channel
    }

    /// Mutably borrow the underlying channel (scripting mock traffic).
    #[inline]
    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    /// Encode and transmit a move, then block for the acknowledgment.
    ///
    /// Does not return success until all [`ACK_LEN`] bytes have been
    /// consumed; a short read is an [`LinkError::AckTimeout`], never a
    /// truncated success. The session returns to `Ready` after a
    /// timeout (the caller decides whether to resend the whole move)
    /// but faults permanently on a transport error.
    pub fn send_move(&mut self, mv: &ArmMove) -> Result<(), LinkError> {
        self.ensure_ready()?;
        let frame = CommandFrame::encode(mv);
        log::debug!("sending command frame '{frame}'");
        self.state = LinkState::AwaitingAck;
        if let Err(err) = self.channel.write_frame(frame.as_bytes()) {
            return self.fault(err);
        }

        let mut ack = [0u8; ACK_LEN];
        let received = match self.channel.read_frame(&mut ack) {
            Ok(n) => n,
            Err(err) => return self.fault(err),
        };
        self.state = LinkState::Ready;
        if received < ACK_LEN {
            return Err(LinkError::AckTimeout {
                received,
                timeout: self.read_timeout,
            });
        }
        log::debug!("command '{frame}' acknowledged");
        Ok(())
    }

    /// Block for the opponent's move: two sequential 2-byte labels,
    /// origin then destination, in either case.
    ///
    /// The inbound frame carries no capture marker, so the returned move
    /// always has `capture = false`; the caller derives capture from its
    /// own board state.
    pub fn await_move(&mut self) -> Result<ArmMove, LinkError> {
        self.ensure_ready()?;
        self.state = LinkState::AwaitingOpponentMove;
        let origin = self.read_label()?;
        let destination = self.read_label()?;
        self.state = LinkState::Ready;

        let mv = ArmMove::new(origin, destination, false).map_err(|source| {
            let mut bytes = codec::wire_label(origin).to_vec();
            bytes.extend_from_slice(&codec::wire_label(destination));
            LinkError::MalformedFrame {
                bytes,
                source: Some(source),
            }
        })?;
        log::debug!("received opponent move {mv}");
        Ok(mv)
    }

    /// Block for the motion-complete marker.
    ///
    /// Used when the arm acknowledges receipt immediately but signals
    /// the end of physical motion separately.
    pub fn await_completion(&mut self) -> Result<(), LinkError> {
        self.ensure_ready()?;
        self.state = LinkState::AwaitingCompletion;
        let mut marker = [0u8; COMPLETION_LEN];
        let received = match self.channel.read_frame(&mut marker) {
            Ok(n) => n,
            Err(err) => return self.fault(err),
        };
        self.state = LinkState::Ready;
        if received < COMPLETION_LEN {
            return Err(LinkError::CompletionTimeout {
                received,
                timeout: self.read_timeout,
            });
        }
        log::debug!("motion complete");
        Ok(())
    }

    /// Release the session. Idempotent; the channel itself is freed when
    /// the session is dropped.
    pub fn close(&mut self) {
        if self.state != LinkState::Closed {
            self.state = LinkState::Closed;
            log::info!("link closed");
        }
    }

    fn ensure_ready(&self) -> Result<(), LinkError> {
        if self.state == LinkState::Ready {
            Ok(())
        } else {
            Err(LinkError::NotReady(self.state))
        }
    }

    fn fault<T>(&mut self, err: io::Error) -> Result<T, LinkError> {
        self.state = LinkState::Faulted;
        log::warn!("link faulted: {err}");
        Err(LinkError::Io(err))
    }

    /// Read and decode one 2-byte square label. A short read means the
    /// timeout expired mid-frame and is rejected as malformed rather
    /// than handed to the decoder.
    fn read_label(&mut self) -> Result<shakmaty::Square, LinkError> {
        let mut label = [0u8; LABEL_LEN];
        let received = match self.channel.read_frame(&mut label) {
            Ok(n) => n,
            Err(err) => return self.fault(err),
        };
        if received < LABEL_LEN {
            self.state = LinkState::Ready;
            return Err(LinkError::MalformedFrame {
                bytes: label[..received].to_vec(),
                source: None,
            });
        }
        codec::square_from_wire(&label).map_err(|source| {
            self.state = LinkState::Ready;
            LinkError::MalformedFrame {
                bytes: label.to_vec(),
                source: Some(source),
            }
        })
    }
}
