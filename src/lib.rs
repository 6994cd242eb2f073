//! Host-side subsystem for a chess-playing robotic arm.
//!
//! Two independent cores:
//!
//! - [`kinematics`] converts between Cartesian end-effector targets and
//!   joint angles for the 3-DOF arm (base yaw + two-link pitch chain).
//!   Pure geometry, no I/O.
//! - [`link`] speaks the synchronous command/acknowledgment protocol to
//!   the arm's motion controller over a serial channel, with the square
//!   and move wire encoding in [`codec`].
//!
//! [`game`] ties the link to a [`shakmaty`] position so the binary can
//! drive a full game; [`mock`] provides a scripted channel so everything
//! above the serial port is testable without hardware.

use std::io;

pub mod codec;
pub mod game;
pub mod hardware;
pub mod kinematics;
pub mod link;
pub mod mock;

/// Byte-oriented channel to the arm's motion controller.
///
/// Abstracts over the physical serial port ([`hardware::SerialChannel`])
/// and scripted transports ([`mock::ScriptedChannel`]), providing a
/// uniform seam for [`link::LinkSession`].
pub trait LinkChannel {
    /// Write a complete frame to the channel.
    fn write_frame(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Blocking read of up to `buf.len()` bytes.
    ///
    /// Blocks until the buffer is full or the channel's read timeout
    /// elapses. `Ok(n)` with `n < buf.len()` *is* the timeout outcome;
    /// callers must check the count rather than assume a full frame.
    /// `Err` is reserved for transport failures (device gone, port
    /// closed), which are fatal to the session.
    fn read_frame(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}
