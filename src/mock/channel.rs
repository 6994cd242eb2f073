use std::collections::VecDeque;
use std::io;

use crate::LinkChannel;

/// Scripted channel for tests and development without a physical arm.
///
/// Inbound traffic is queued as chunks. Each `read_frame` call consumes
/// at most one chunk, so a chunk shorter than the requested frame
/// simulates a read that timed out mid-frame, and an empty queue
/// simulates a silent channel (zero-byte timeout). A chunk longer than
/// the requested frame keeps its remainder queued, like bytes sitting in
/// a real serial buffer. Outbound frames are recorded for inspection.
#[derive(Debug, Clone, Default)]
pub struct ScriptedChannel {
    incoming: VecDeque<Vec<u8>>,
    sent: Vec<Vec<u8>>,
    fail_read: Option<io::ErrorKind>,
    fail_write: Option<io::ErrorKind>,
}

impl ScriptedChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue bytes the arm will "send" on a future read.
    pub fn push_incoming(&mut self, bytes: &[u8]) {
        self.incoming.push_back(bytes.to_vec());
    }

    /// Frames written to the channel so far, oldest first.
    pub fn sent(&self) -> &[Vec<u8>] {
        &self.sent
    }

    /// Make the next read fail with a transport error.
    pub fn fail_next_read(&mut self, kind: io::ErrorKind) {
        self.fail_read = Some(kind);
    }

    /// Make the next write fail with a transport error.
    pub fn fail_next_write(&mut self, kind: io::ErrorKind) {
        self.fail_write = Some(kind);
    }
}

impl LinkChannel for ScriptedChannel {
    fn write_frame(&mut self, bytes: &[u8]) -> io::Result<()> {
        if let Some(kind) = self.fail_write.take() {
            return Err(kind.into());
        }
        self.sent.push(bytes.to_vec());
        Ok(())
    }

    fn read_frame(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if let Some(kind) = self.fail_read.take() {
            return Err(kind.into());
        }
        let Some(chunk) = self.incoming.pop_front() else {
            return Ok(0); // nothing scripted: the timeout expires silently
        };
        let count = chunk.len().min(buf.len());
        buf[..count].copy_from_slice(&chunk[..count]);
        if chunk.len() > count {
            self.incoming.push_front(chunk[count..].to_vec());
        }
        Ok(count)
    }
}
