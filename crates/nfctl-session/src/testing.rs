//! Test support: a scripted in-memory channel.
//!
//! Lets framer and engine tests run the real poll loops against canned
//! byte streams, with no process spawned. The [`ScriptHandle`] shares
//! state with the channel so a test keeps feeding chunks and inspecting
//! writes after the channel has been moved into a session.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use nfctl_core::{Error, Result};

use crate::channel::ByteChannel;

#[derive(Debug, Default)]
struct ScriptState {
    /// Chunks readable right now, one per read call
    pending: VecDeque<Vec<u8>>,
    /// Replies queued up; each write moves the next one (all of its
    /// chunks, in order) into `pending`
    replies: VecDeque<Vec<Vec<u8>>>,
    /// Everything written to the channel
    writes: Vec<Vec<u8>>,
    /// Kill count
    kills: usize,
    alive: bool,
}

/// Channel that replays canned byte chunks.
///
/// Reads pop one pending chunk at a time (empty when none, like a
/// non-blocking PTY). Each write records the bytes and releases the next
/// queued reply for reading.
#[derive(Debug)]
pub struct ScriptedChannel {
    state: Arc<Mutex<ScriptState>>,
}

impl ScriptedChannel {
    /// Create an empty scripted channel.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(ScriptState {
                alive: true,
                ..Default::default()
            })),
        }
    }

    /// A handle sharing this channel's state.
    pub fn handle(&self) -> ScriptHandle {
        ScriptHandle {
            state: Arc::clone(&self.state),
        }
    }

    /// Make bytes readable before any write (connect banner + prompt).
    pub fn push_initial(&mut self, bytes: &[u8]) {
        self.state.lock().unwrap().pending.push_back(bytes.to_vec());
    }

    /// Queue a reply; the next unmatched write makes it readable.
    pub fn push_reply(&mut self, bytes: &[u8]) {
        self.state
            .lock()
            .unwrap()
            .replies
            .push_back(vec![bytes.to_vec()]);
    }

    /// Queue a reply split over several read chunks.
    pub fn push_reply_chunks(&mut self, chunks: Vec<Vec<u8>>) {
        self.state.lock().unwrap().replies.push_back(chunks);
    }
}

impl Default for ScriptedChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared-state view of a [`ScriptedChannel`] for use after the channel
/// has been moved into a session.
#[derive(Debug, Clone)]
pub struct ScriptHandle {
    state: Arc<Mutex<ScriptState>>,
}

impl ScriptHandle {
    /// Append chunks that become readable immediately, in order.
    pub fn queue_chunks(&self, chunks: Vec<Vec<u8>>) {
        let mut state = self.state.lock().unwrap();
        for chunk in chunks {
            state.pending.push_back(chunk);
        }
    }

    /// Queue a reply released by the next unmatched write.
    pub fn push_reply(&self, bytes: &[u8]) {
        self.state
            .lock()
            .unwrap()
            .replies
            .push_back(vec![bytes.to_vec()]);
    }

    /// Number of writes the channel has seen.
    pub fn writes_len(&self) -> usize {
        self.state.lock().unwrap().writes.len()
    }

    /// Each write as a string with the trailing newline removed.
    pub fn written_lines(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .writes
            .iter()
            .map(|w| {
                String::from_utf8_lossy(w)
                    .trim_end_matches('\n')
                    .to_string()
            })
            .collect()
    }

    /// How many times the channel was killed.
    pub fn kill_count(&self) -> usize {
        self.state.lock().unwrap().kills
    }

    /// Whether the channel is still alive.
    pub fn is_alive(&self) -> bool {
        self.state.lock().unwrap().alive
    }
}

impl ByteChannel for ScriptedChannel {
    fn read(&mut self) -> Result<Vec<u8>> {
        let mut state = self.state.lock().unwrap();
        Ok(state.pending.pop_front().unwrap_or_default())
    }

    fn write_all(&mut self, data: &[u8]) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if !state.alive {
            return Err(Error::Connect("channel killed".to_string()));
        }
        state.writes.push(data.to_vec());
        if let Some(chunks) = state.replies.pop_front() {
            for chunk in chunks {
                state.pending.push_back(chunk);
            }
        }
        Ok(())
    }

    fn is_alive(&mut self) -> bool {
        self.state.lock().unwrap().alive
    }

    fn kill(&mut self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.alive = false;
        state.kills += 1;
        state.pending.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_pops_one_chunk_per_call() {
        let mut channel = ScriptedChannel::new();
        channel.push_initial(b"one");
        channel.handle().queue_chunks(vec![b"two".to_vec()]);

        assert_eq!(channel.read().unwrap(), b"one");
        assert_eq!(channel.read().unwrap(), b"two");
        assert!(channel.read().unwrap().is_empty());
    }

    #[test]
    fn test_write_releases_next_reply() {
        let mut channel = ScriptedChannel::new();
        channel.push_reply(b"reply");

        assert!(channel.read().unwrap().is_empty());
        channel.write_all(b"cmd\n").unwrap();
        assert_eq!(channel.read().unwrap(), b"reply");
    }

    #[test]
    fn test_handle_observes_writes_and_kills() {
        let mut channel = ScriptedChannel::new();
        let handle = channel.handle();

        channel.write_all(b"show x\n").unwrap();
        channel.kill().unwrap();
        channel.kill().unwrap();

        assert_eq!(handle.written_lines(), vec!["show x"]);
        assert_eq!(handle.kill_count(), 2);
        assert!(!handle.is_alive());
    }

    #[test]
    fn test_write_after_kill_fails() {
        let mut channel = ScriptedChannel::new();
        channel.kill().unwrap();
        assert!(channel.write_all(b"cmd\n").is_err());
    }
}
