use i2cdev::core::I2CDevice;
use i2cdev::linux::LinuxI2CDevice;
use jeflog::warn;
use std::{
  fmt,
  io,
  sync::{Arc, Mutex},
  time::{Duration, Instant},
};

use crate::bit_mappings::{
  decode_ready,
  decode_result,
  encode_config,
  next_channel,
  Gain,
  SampleRate,
  MUX_TABLE,
  REG_CONFIG,
  REG_CONVERSION,
};
use crate::store::{Sample, SampleStore};

/// Minimum wall-clock interval between polling attempts. The hosting thread
/// may tick much faster than this; the gate bounds how often this driver
/// competes for the shared bus.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Conversion rate written into every config word. At 250 SPS a conversion
/// finishes in 4 ms, comfortably inside one poll interval.
const SAMPLE_RATE: SampleRate = SampleRate::Sps250;

#[derive(Debug)]
pub enum AdcError {
  /// The configured PGA selector is not one of the 8 codes the device
  /// knows. Accepting it would silently mis-scale every sample.
  InvalidGainCode(u8),
  I2C(io::Error),
}

impl From<io::Error> for AdcError {
  fn from(err: io::Error) -> AdcError {
    AdcError::I2C(err)
  }
}

impl fmt::Display for AdcError {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self {
      AdcError::InvalidGainCode(code) => {
        write!(f, "invalid gain selector code {code:#04x}")
      }
      AdcError::I2C(err) => write!(f, "i2c transfer failed: {err}"),
    }
  }
}

impl std::error::Error for AdcError {}

/// Register-level access to the device, kept behind a trait so the state
/// machine can run against a scripted bus in tests. Transfers are
/// synchronous and assumed fast; any timeout belongs to the transport.
pub trait BusTransport {
  fn read_registers(&mut self, register: u8, buf: &mut [u8]) -> io::Result<()>;
  fn write_registers(&mut self, register: u8, bytes: &[u8]) -> io::Result<()>;
}

impl BusTransport for LinuxI2CDevice {
  fn read_registers(&mut self, register: u8, buf: &mut [u8]) -> io::Result<()> {
    let bytes = self
      .smbus_read_i2c_block_data(register, buf.len() as u8)
      .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;

    if bytes.len() != buf.len() {
      return Err(io::Error::new(
        io::ErrorKind::UnexpectedEof,
        "short register read",
      ));
    }

    buf.copy_from_slice(&bytes);
    Ok(())
  }

  fn write_registers(&mut self, register: u8, bytes: &[u8]) -> io::Result<()> {
    self
      .smbus_write_i2c_block_data(register, bytes)
      .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))
  }
}

/// Round-robin single-shot sampler for the six scheduled input pairs.
///
/// The driver never blocks: each tick either completes one step of the
/// acquire / check-ready / read / convert / advance / restart sequence or
/// bails out at a checkpoint (rate gate, bus contention, device not ready,
/// transfer failure) leaving the sequencing untouched for the next tick. At
/// most one conversion is in flight on the device at any time.
pub struct Ads1115<B: BusTransport> {
  bus: Arc<Mutex<B>>,
  gain: Gain,
  channel: usize,
  conversion_started: bool,
  last_poll: Option<Instant>,
  store: SampleStore,
}

impl<B: BusTransport> Ads1115<B> {
  /// Builds a driver over a shared bus handle. The gain selector is
  /// validated here, once, so a bad configuration surfaces as a
  /// construction failure instead of a fault mid-flight; it cannot change
  /// afterwards because a gain swapped under an in-flight conversion would
  /// mis-scale its result.
  pub fn new(bus: Arc<Mutex<B>>, gain_code: u8) -> Result<Ads1115<B>, AdcError> {
    Ok(Ads1115 {
      bus,
      gain: Gain::from_code(gain_code)?,
      channel: 0,
      conversion_started: false,
      last_poll: None,
      store: SampleStore::new(),
    })
  }

  /// Starts the first conversion, for channel 0. Unlike `tick` this waits
  /// for the bus; nothing else is running against the device yet.
  pub fn init(&mut self) -> Result<(), AdcError> {
    let mut bus = match self.bus.lock() {
      Ok(guard) => guard,
      Err(poisoned) => poisoned.into_inner(),
    };

    Self::start_conversion(&mut bus, self.gain, self.channel)?;
    self.conversion_started = true;
    Ok(())
  }

  /// A handle to the sample slots, for the consumer thread. Reading through
  /// it never blocks the tick thread.
  pub fn sample_store(&self) -> SampleStore {
    self.store.clone()
  }

  /// Copies the latest converted samples into `out`. See
  /// [`SampleStore::read_samples`].
  pub fn read_samples(&self, out: &mut [Sample]) -> usize {
    self.store.read_samples(out)
  }

  /// Drives the conversion state machine. Meant to be called periodically,
  /// at any frequency at or above the poll interval.
  pub fn tick(&mut self) {
    self.tick_at(Instant::now());
  }

  fn tick_at(&mut self, now: Instant) {
    if let Some(last) = self.last_poll {
      if now.duration_since(last) < POLL_INTERVAL {
        return;
      }
    }

    // The bus is shared with unrelated peripherals. Losing the race is
    // routine: the pending conversion is simply checked again next tick.
    let Ok(mut bus) = self.bus.try_lock() else {
      return;
    };

    if !self.conversion_started {
      // An earlier start-conversion write was lost, so there is nothing to
      // poll for; get a conversion going again instead.
      match Self::start_conversion(&mut bus, self.gain, self.channel) {
        Ok(()) => self.conversion_started = true,
        Err(e) => warn!("ADS1115 start-conversion retry failed: {e}"),
      }
      self.last_poll = Some(now);
      return;
    }

    let mut word = [0u8; 2];
    if let Err(e) = bus.read_registers(REG_CONFIG, &mut word) {
      warn!("ADS1115 config register read failed: {e}");
      return;
    }

    if !decode_ready(u16::from_be_bytes(word)) {
      // Still converting. No timestamp update: retry at tick cadence.
      return;
    }

    if let Err(e) = bus.read_registers(REG_CONVERSION, &mut word) {
      // This result is lost, but the channel does not advance, so the next
      // successful cycle harvests the same slot.
      warn!("ADS1115 conversion register read failed: {e}");
      return;
    }

    let millivolts = self.gain.to_millivolts(decode_result(word));
    self.store.put(self.channel, millivolts);

    self.channel = next_channel(self.channel);
    match Self::start_conversion(&mut bus, self.gain, self.channel) {
      Ok(()) => self.conversion_started = true,
      Err(e) => {
        // Not retried within this tick; the next eligible tick notices the
        // cleared flag and reissues the start.
        warn!("ADS1115 start-conversion write failed: {e}");
        self.conversion_started = false;
      }
    }

    self.last_poll = Some(now);
  }

  fn start_conversion(bus: &mut B, gain: Gain, channel: usize) -> io::Result<()> {
    let config = encode_config(gain, MUX_TABLE[channel], SAMPLE_RATE);
    bus.write_registers(REG_CONFIG, &config.to_be_bytes())
  }
}
