//! Wire-level constants for the ADS1115 and the pure transformations over
//! its 16-bit config word. Everything in here is side-effect free so it can
//! be tested without a device on the bus.

use crate::driver::AdcError;

// Slave address is set by strapping the ADDR pin.
pub const ADDR_PIN_GND: u16 = 0x48;
pub const ADDR_PIN_VDD: u16 = 0x49;
pub const ADDR_PIN_SDA: u16 = 0x4A;
pub const ADDR_PIN_SCL: u16 = 0x4B;
pub const DEFAULT_ADDRESS: u16 = ADDR_PIN_GND;

// Register addresses. Both threshold registers belong to the comparator,
// which this driver keeps disabled.
pub const REG_CONVERSION: u8 = 0x00;
pub const REG_CONFIG: u8 = 0x01;
pub const REG_LO_THRESH: u8 = 0x02;
pub const REG_HI_THRESH: u8 = 0x03;

// Config word field positions.
const OS_SHIFT: u8 = 15;
const MUX_SHIFT: u8 = 12;
const PGA_SHIFT: u8 = 9;
const MODE_SHIFT: u8 = 8;
const RATE_SHIFT: u8 = 5;

/// Writing this bit starts a single-shot conversion; reading it back set
/// means no conversion is in progress.
const OS_BIT: u16 = 1 << OS_SHIFT;
const MODE_SINGLE_SHOT: u16 = 1 << MODE_SHIFT;
const COMP_QUE_DISABLE: u16 = 0b11;

/// Input multiplexer selections. The discriminants are the wire codes for
/// bits 14-12 of the config word. Differential variants compare two input
/// pins; the `Gnd` variants measure one pin against ground.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputPair {
  P0N1 = 0b000,
  P0N3 = 0b001,
  P1N3 = 0b010,
  P2N3 = 0b011,
  P0Gnd = 0b100,
  P1Gnd = 0b101,
  P2Gnd = 0b110,
  P3Gnd = 0b111,
}

/// PGA full-scale range selections, bits 11-9 of the config word. The last
/// three codes are distinct on the wire but all select the 0.256 V range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Gain {
  Fs6V144 = 0b000,
  Fs4V096 = 0b001,
  Fs2V048 = 0b010,
  Fs1V024 = 0b011,
  Fs0V512 = 0b100,
  Fs0V256 = 0b101,
  Fs0V256B = 0b110,
  Fs0V256C = 0b111,
}

impl Gain {
  /// Maps a raw PGA selector code to a gain setting. Anything outside the
  /// 3-bit range is a configuration defect: continuing with it would
  /// silently mis-scale every sample, so construction is the last chance to
  /// refuse it.
  pub fn from_code(code: u8) -> Result<Gain, AdcError> {
    match code {
      0b000 => Ok(Gain::Fs6V144),
      0b001 => Ok(Gain::Fs4V096),
      0b010 => Ok(Gain::Fs2V048),
      0b011 => Ok(Gain::Fs1V024),
      0b100 => Ok(Gain::Fs0V512),
      0b101 => Ok(Gain::Fs0V256),
      0b110 => Ok(Gain::Fs0V256B),
      0b111 => Ok(Gain::Fs0V256C),
      _ => Err(AdcError::InvalidGainCode(code)),
    }
  }

  /// Millivolts represented by one LSB of the conversion result at this
  /// full-scale range.
  pub fn scale_factor(self) -> f32 {
    match self {
      Gain::Fs6V144 => 0.187500,
      Gain::Fs4V096 => 0.125000,
      Gain::Fs2V048 => 0.062500,
      Gain::Fs1V024 => 0.031250,
      Gain::Fs0V512 => 0.015625,
      Gain::Fs0V256 | Gain::Fs0V256B | Gain::Fs0V256C => 0.007813,
    }
  }

  /// Scales a raw conversion result to millivolts. Differential readings
  /// below the negative input come out negative.
  pub fn to_millivolts(self, raw: i16) -> f32 {
    raw as f32 * self.scale_factor()
  }
}

/// Conversions per second, bits 7-5 of the config word.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SampleRate {
  Sps8 = 0b000,
  Sps16 = 0b001,
  Sps32 = 0b010,
  Sps64 = 0b011,
  Sps128 = 0b100,
  Sps250 = 0b101,
  Sps475 = 0b110,
  Sps860 = 0b111,
}

/// Number of scheduled input configurations.
pub const CHANNEL_COUNT: usize = 6;

/// Round-robin order of the scheduled inputs: two differential pairs
/// against AIN3, then the four single-ended inputs. The two remaining mux
/// codes the hardware offers are not wired up on this board.
pub const MUX_TABLE: [InputPair; CHANNEL_COUNT] = [
  InputPair::P1N3,
  InputPair::P2N3,
  InputPair::P0Gnd,
  InputPair::P1Gnd,
  InputPair::P2Gnd,
  InputPair::P3Gnd,
];

/// Advances the round-robin channel index, wrapping after the last entry.
pub fn next_channel(index: usize) -> usize {
  (index + 1) % CHANNEL_COUNT
}

/// Builds the config word that kicks off one single-shot conversion:
/// start bit, input selection, full-scale range, single-shot mode, data
/// rate, comparator disabled.
pub fn encode_config(gain: Gain, pair: InputPair, rate: SampleRate) -> u16 {
  OS_BIT
    | ((pair as u16) << MUX_SHIFT)
    | ((gain as u16) << PGA_SHIFT)
    | MODE_SINGLE_SHOT
    | ((rate as u16) << RATE_SHIFT)
    | COMP_QUE_DISABLE
}

/// True when the OS bit reads back set, i.e. the requested conversion has
/// finished and the result register is valid.
pub fn decode_ready(config_word: u16) -> bool {
  config_word & OS_BIT != 0
}

/// Reassembles the conversion register, which arrives high byte first on
/// the wire, into a native signed integer.
pub fn decode_result(raw: [u8; 2]) -> i16 {
  i16::from_be_bytes(raw)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn encode_known_config_word() {
    // start | P1N3 mux | 4.096V | single-shot | 250 SPS | comparator off
    let word = encode_config(Gain::Fs4V096, InputPair::P1N3, SampleRate::Sps250);
    assert_eq!(word, 0xA3A3);
  }

  #[test]
  fn encode_varies_only_the_mux_field() {
    let a = encode_config(Gain::Fs2V048, InputPair::P0Gnd, SampleRate::Sps250);
    let b = encode_config(Gain::Fs2V048, InputPair::P3Gnd, SampleRate::Sps250);
    assert_eq!(a & !(0b111 << 12), b & !(0b111 << 12));
    assert_eq!((a >> 12) & 0b111, InputPair::P0Gnd as u16);
    assert_eq!((b >> 12) & 0b111, InputPair::P3Gnd as u16);
  }

  #[test]
  fn ready_bit_is_word_msb() {
    assert!(decode_ready(0x8000));
    assert!(decode_ready(0xA3A3));
    assert!(!decode_ready(0x7FFF));
    assert!(!decode_ready(0x0000));
  }

  #[test]
  fn result_is_big_endian_signed() {
    assert_eq!(decode_result([0x01, 0x00]), 256);
    assert_eq!(decode_result([0x00, 0x01]), 1);
    assert_eq!(decode_result([0xFF, 0xFF]), -1);
    assert_eq!(decode_result([0x80, 0x00]), i16::MIN);
    assert_eq!(decode_result([0x7F, 0xFF]), i16::MAX);
  }

  #[test]
  fn gain_codes_round_trip() {
    for code in 0..8u8 {
      let gain = Gain::from_code(code).unwrap();
      assert_eq!(gain as u8, code);
    }
    assert!(matches!(Gain::from_code(8), Err(AdcError::InvalidGainCode(8))));
    assert!(matches!(
      Gain::from_code(0xFF),
      Err(AdcError::InvalidGainCode(0xFF))
    ));
  }

  #[test]
  fn scale_factors_shrink_as_gain_grows() {
    let factors: Vec<f32> = (0..8u8)
      .map(|code| Gain::from_code(code).unwrap().scale_factor())
      .collect();
    for pair in factors.windows(2) {
      assert!(pair[0] >= pair[1]);
    }
    // The three 0.256V codes share one hardware range.
    assert_eq!(factors[5], factors[6]);
    assert_eq!(factors[6], factors[7]);
  }

  #[test]
  fn millivolt_conversion_is_linear() {
    let gain = Gain::Fs2V048;
    assert_eq!(gain.to_millivolts(0), 0.0);
    assert_eq!(gain.to_millivolts(400), 2.0 * gain.to_millivolts(200));
    assert_eq!(gain.to_millivolts(-100), -gain.to_millivolts(100));
    assert_eq!(Gain::Fs4V096.to_millivolts(256), 32.0);
  }

  #[test]
  fn round_robin_visits_every_channel_once() {
    let mut index = 0;
    let mut visited = [false; CHANNEL_COUNT];
    for _ in 0..CHANNEL_COUNT {
      assert!(!visited[index]);
      visited[index] = true;
      index = next_channel(index);
    }
    assert_eq!(index, 0);
    assert!(visited.iter().all(|&v| v));
  }
}
