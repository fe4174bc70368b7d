use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::bit_mappings::CHANNEL_COUNT;

/// Latest converted reading for one scheduled channel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sample {
  pub channel: u8,
  pub millivolts: f32,
}

/// One slot per channel, overwritten in place on every completed
/// conversion. The tick thread is the only writer and a consumer thread may
/// read concurrently; each slot packs channel id and value into a single
/// atomic word so the reader can observe a stale sample but never a torn
/// one.
#[derive(Clone)]
pub struct SampleStore {
  slots: Arc<[AtomicU64; CHANNEL_COUNT]>,
}

fn pack(channel: u8, millivolts: f32) -> u64 {
  ((channel as u64) << 32) | millivolts.to_bits() as u64
}

fn unpack(word: u64) -> Sample {
  Sample {
    channel: (word >> 32) as u8,
    millivolts: f32::from_bits(word as u32),
  }
}

impl SampleStore {
  pub fn new() -> SampleStore {
    let slots: [AtomicU64; CHANNEL_COUNT] =
      std::array::from_fn(|channel| AtomicU64::new(pack(channel as u8, 0.0)));

    SampleStore {
      slots: Arc::new(slots),
    }
  }

  /// Replaces one channel's sample. Out-of-range channels are impossible by
  /// construction of the round-robin index.
  pub(crate) fn put(&self, channel: usize, millivolts: f32) {
    self.slots[channel].store(pack(channel as u8, millivolts), Ordering::Relaxed);
  }

  /// Copies the current samples into `out`, lowest channel first, without
  /// blocking the writer. Returns how many slots were copied, which is
  /// `out.len()` capped at [`CHANNEL_COUNT`].
  pub fn read_samples(&self, out: &mut [Sample]) -> usize {
    let count = out.len().min(CHANNEL_COUNT);
    for (slot, sample) in self.slots.iter().zip(out.iter_mut()) {
      *sample = unpack(slot.load(Ordering::Relaxed));
    }
    count
  }
}

impl Default for SampleStore {
  fn default() -> SampleStore {
    SampleStore::new()
  }
}
