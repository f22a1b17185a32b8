//! Durable storage regions, record codecs, and the persistence protocol.
//!
//! The backing store is byte-addressed and non-atomic, so every record that
//! must survive a power cut is small, written in one call, and prefixed with
//! a version byte. The region offsets are fixed and deliberately sparse; they
//! match the layout already burned into deployed devices and must not move.

use serde::{Serialize, de::DeserializeOwned};

use crate::clock::ClockReading;
use crate::report::DiagEvent;
use crate::stats::NightStats;

/// Diagnostic event-code log region.
pub const DIAG_LOG_OFFSET: usize = 100;
/// Timestamp of the last unexpected restart.
pub const RESET_MARKER_OFFSET: usize = 200;
/// Live night statistics, rewritten every interval tick.
pub const NIGHT_STATS_OFFSET: usize = 800;

/// Version byte leading every durable record.
pub const RECORD_VERSION: u8 = 1;

/// Sentinel byte bracketing the diagnostic log region.
pub const DIAG_SENTINEL: u8 = 0x37;

/// Encoded size of a [`ClockReading`] body (fixed-width integers).
const CLOCK_READING_LEN: usize = 7;

/// Version byte plus distance plus two timestamps.
pub const NIGHT_STATS_RECORD_LEN: usize = 1 + 4 + 2 * CLOCK_READING_LEN;

/// Version byte plus one timestamp.
pub const RESET_MARKER_RECORD_LEN: usize = 1 + CLOCK_READING_LEN;

/// Byte-addressed durable storage collaborator.
///
/// Implementations provide no atomicity or wear management; callers keep
/// records single-write-sized and tolerate torn regions by versioning.
pub trait DurableStore {
    /// Transport-specific failure type.
    type Error: core::fmt::Debug;

    /// Reads `buf.len()` bytes starting at `offset`.
    fn read(&mut self, offset: usize, buf: &mut [u8]) -> Result<(), Self::Error>;

    /// Writes `data` starting at `offset`.
    fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), Self::Error>;
}

/// Error surfaced when a durable record cannot be moved in or out of the
/// store.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RecordError<E> {
    /// Underlying store read or write failed.
    Transport(E),
    /// Record body failed to encode or decode.
    Encoding,
    /// Record carries a version byte this firmware does not understand.
    UnknownVersion {
        /// The version byte found in the store.
        found: u8,
    },
}

impl<E> From<E> for RecordError<E> {
    fn from(value: E) -> Self {
        RecordError::Transport(value)
    }
}

fn save_record<S, T, const N: usize>(
    store: &mut S,
    offset: usize,
    value: &T,
) -> Result<(), RecordError<S::Error>>
where
    S: DurableStore,
    T: Serialize,
{
    let mut buf = [0u8; N];
    buf[0] = RECORD_VERSION;
    postcard::to_slice(value, &mut buf[1..]).map_err(|_| RecordError::Encoding)?;
    store.write(offset, &buf)?;
    Ok(())
}

fn load_record<S, T, const N: usize>(
    store: &mut S,
    offset: usize,
) -> Result<T, RecordError<S::Error>>
where
    S: DurableStore,
    T: DeserializeOwned,
{
    let mut buf = [0u8; N];
    store.read(offset, &mut buf)?;
    if buf[0] != RECORD_VERSION {
        return Err(RecordError::UnknownVersion { found: buf[0] });
    }
    postcard::from_bytes(&buf[1..]).map_err(|_| RecordError::Encoding)
}

/// Persists the live night statistics.
pub fn save_night_stats<S: DurableStore>(
    store: &mut S,
    stats: &NightStats,
) -> Result<(), RecordError<S::Error>> {
    save_record::<S, NightStats, NIGHT_STATS_RECORD_LEN>(store, NIGHT_STATS_OFFSET, stats)
}

/// Reads the durable night statistics back into a live copy.
pub fn load_night_stats<S: DurableStore>(
    store: &mut S,
) -> Result<NightStats, RecordError<S::Error>> {
    load_record::<S, NightStats, NIGHT_STATS_RECORD_LEN>(store, NIGHT_STATS_OFFSET)
}

/// Records the wall-clock time of an unexpected restart.
pub fn save_reset_marker<S: DurableStore>(
    store: &mut S,
    at: &ClockReading,
) -> Result<(), RecordError<S::Error>> {
    save_record::<S, ClockReading, RESET_MARKER_RECORD_LEN>(store, RESET_MARKER_OFFSET, at)
}

/// Reads back the last recorded unexpected-restart time, if any was written
/// since the region was last cleared.
pub fn load_reset_marker<S: DurableStore>(
    store: &mut S,
) -> Result<ClockReading, RecordError<S::Error>> {
    load_record::<S, ClockReading, RESET_MARKER_RECORD_LEN>(store, RESET_MARKER_OFFSET)
}

/// Zeroes the reset-marker region; done at every planned session start so a
/// later nonzero version byte always means an unplanned restart.
pub fn clear_reset_marker<S: DurableStore>(store: &mut S) -> Result<(), S::Error> {
    store.write(RESET_MARKER_OFFSET, &[0u8; RESET_MARKER_RECORD_LEN])
}

/// Re-initialises the diagnostic log: all event slots zeroed, sentinel bytes
/// written at the start- and end-marker slots.
pub fn init_diag_log<S: DurableStore>(store: &mut S) -> Result<(), S::Error> {
    let zeroes = [0u8; DiagEvent::SLOT_COUNT];
    store.write(DIAG_LOG_OFFSET, &zeroes)?;
    log_event(store, DiagEvent::StartMarker)?;
    log_event(store, DiagEvent::EndMarker)
}

/// Writes one diagnostic event into its slot.
///
/// Each event owns a fixed byte; writing the sentinel-valued code makes a
/// post-crash dump self-delimiting even when the reader has no record of
/// which firmware wrote it.
pub fn log_event<S: DurableStore>(store: &mut S, event: DiagEvent) -> Result<(), S::Error> {
    let value = match event {
        DiagEvent::StartMarker | DiagEvent::EndMarker => DIAG_SENTINEL,
        other => other.to_raw(),
    };
    store.write(DIAG_LOG_OFFSET + event.to_raw() as usize, &[value])
}

/// Reads one diagnostic event slot back, for post-crash inspection.
pub fn read_event_slot<S: DurableStore>(
    store: &mut S,
    event: DiagEvent,
) -> Result<u8, S::Error> {
    let mut slot = [0u8; 1];
    store.read(DIAG_LOG_OFFSET + event.to_raw() as usize, &mut slot)?;
    Ok(slot[0])
}

/// Array-backed [`DurableStore`] for the emulator and tests.
#[derive(Clone, Debug)]
pub struct MemoryStore<const N: usize = 1024> {
    bytes: [u8; N],
}

/// Failure surfaced by [`MemoryStore`] accesses.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MemoryStoreError {
    /// Access extends past the end of the backing array.
    OutOfRange,
}

impl<const N: usize> MemoryStore<N> {
    /// Zero-filled store.
    #[must_use]
    pub const fn new() -> Self {
        Self { bytes: [0; N] }
    }

    /// Raw view of the backing array.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn span(&self, offset: usize, len: usize) -> Result<core::ops::Range<usize>, MemoryStoreError> {
        let end = offset.checked_add(len).ok_or(MemoryStoreError::OutOfRange)?;
        if end > N {
            return Err(MemoryStoreError::OutOfRange);
        }
        Ok(offset..end)
    }
}

impl<const N: usize> Default for MemoryStore<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> DurableStore for MemoryStore<N> {
    type Error = MemoryStoreError;

    fn read(&mut self, offset: usize, buf: &mut [u8]) -> Result<(), Self::Error> {
        let span = self.span(offset, buf.len())?;
        buf.copy_from_slice(&self.bytes[span]);
        Ok(())
    }

    fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), Self::Error> {
        let span = self.span(offset, data.len())?;
        self.bytes[span].copy_from_slice(data);
        Ok(())
    }
}
