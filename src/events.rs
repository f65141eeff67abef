//! Device outcome events and the bounded channel that carries them.
//!
//! The companion link and modem workers publish [`SystemEvent`]s; the
//! dispatcher is the only consumer.
//!
//! ```text
//! ┌────────────────┐
//! │ Companion link │───┐    ┌─────────────────────┐     ┌────────────┐
//! └────────────────┘   ├───▶│ EventChannel (10)   │────▶│ Dispatcher │
//! ┌────────────────┐   │    │ blocking FIFO, MPSC │     └────────────┘
//! │ Modem          │───┘    └─────────────────────┘
//! └────────────────┘
//! ```
//!
//! A full channel blocks the producer until the dispatcher drains an item;
//! events are never dropped.

use core::fmt;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use futures_lite::future::block_on;

use crate::app::ports::EventPublisher;

/// Maximum number of pending events.
pub const EVENT_QUEUE_DEPTH: usize = 10;

/// Capacity of the companion message slot, including the NUL terminator.
pub const MESSAGE_CAPACITY: usize = 40;

/// Outcome notifications published by the device workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Modem started, configured and registered on the network.
    ModemInitOk,
    /// Modem answered but configuration or registration timed out.
    ModemConfigureFail,
    /// Modem never answered the start sequence.
    ModemNotDetected,
    /// Companion MCU never acknowledged a SCAN poll.
    CompanionNotDetected,
    /// Companion MCU acknowledged the first SCAN poll.
    CompanionOk,
    /// Companion MCU delivered an outbound text (payload attached).
    CompanionMessageReady,
    /// Modem confirmed the SMS was sent.
    ModemSendOk,
    /// Modem failed to send the SMS.
    ModemSendFail,
}

/// The companion link's single message slot: raw text bytes followed by a
/// NUL terminator.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct MessageBuffer {
    bytes: [u8; MESSAGE_CAPACITY],
    len: usize,
}

impl MessageBuffer {
    pub const fn new() -> Self {
        Self {
            bytes: [0; MESSAGE_CAPACITY],
            len: 0,
        }
    }

    /// Overwrite the slot with `text`, truncating to leave room for the
    /// terminator.
    pub fn store(&mut self, text: &[u8]) {
        let len = text.len().min(MESSAGE_CAPACITY - 1);
        self.bytes[..len].copy_from_slice(&text[..len]);
        self.bytes[len] = 0;
        self.len = len;
    }

    pub fn from_bytes(text: &[u8]) -> Self {
        let mut buf = Self::new();
        buf.store(text);
        buf
    }

    /// Payload without the terminator.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    /// Payload including the trailing NUL.
    pub fn as_bytes_with_nul(&self) -> &[u8] {
        &self.bytes[..=self.len]
    }

    /// Payload as text.  The companion sends ASCII; anything else is replaced
    /// by the longest valid UTF-8 prefix.
    pub fn as_str(&self) -> &str {
        match core::str::from_utf8(self.as_bytes()) {
            Ok(s) => s,
            Err(e) => {
                // Prefix up to the first invalid byte is valid by construction.
                core::str::from_utf8(&self.bytes[..e.valid_up_to()]).unwrap_or_default()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Default for MessageBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MessageBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MessageBuffer({:?})", self.as_str())
    }
}

/// A published event.  Immutable once sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemEvent {
    pub kind: EventKind,
    /// Set only for [`EventKind::CompanionMessageReady`].
    pub payload: Option<MessageBuffer>,
}

impl SystemEvent {
    /// An event without payload.
    pub const fn new(kind: EventKind) -> Self {
        Self {
            kind,
            payload: None,
        }
    }

    pub const fn message_ready(message: MessageBuffer) -> Self {
        Self {
            kind: EventKind::CompanionMessageReady,
            payload: Some(message),
        }
    }
}

impl From<EventKind> for SystemEvent {
    fn from(kind: EventKind) -> Self {
        Self::new(kind)
    }
}

// ── Channel ───────────────────────────────────────────────────

/// Bounded MPSC FIFO shared by the device workers and the dispatcher.
pub type EventChannel = Channel<CriticalSectionRawMutex, SystemEvent, EVENT_QUEUE_DEPTH>;

/// Producer half handed to each device worker.
#[derive(Clone, Copy)]
pub struct EventSender<'a> {
    channel: &'a EventChannel,
}

impl<'a> EventSender<'a> {
    pub fn new(channel: &'a EventChannel) -> Self {
        Self { channel }
    }
}

impl EventPublisher for EventSender<'_> {
    /// Blocks the calling worker while the channel is full.
    fn publish(&mut self, event: SystemEvent) {
        block_on(self.channel.send(event));
    }
}

/// Consumer half owned by the dispatcher.
pub struct EventReceiver<'a> {
    channel: &'a EventChannel,
}

impl<'a> EventReceiver<'a> {
    pub fn new(channel: &'a EventChannel) -> Self {
        Self { channel }
    }

    /// Block until an event is available.
    pub fn receive(&self) -> SystemEvent {
        block_on(self.channel.receive())
    }

    /// Non-blocking receive.
    pub fn try_receive(&self) -> Option<SystemEvent> {
        self.channel.try_receive().ok()
    }

    /// Number of pending events.
    pub fn pending(&self) -> usize {
        self.channel.len()
    }
}
