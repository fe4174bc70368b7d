use ads1115::{Ads1115, Sample, CHANNEL_COUNT, POLL_INTERVAL};
use chrono::Local;
use clap::{Arg, Command};
use i2cdev::linux::LinuxI2CDevice;
use jeflog::{fail, pass};
use std::{
  num::ParseIntError,
  process,
  sync::{Arc, Mutex},
  thread,
  time::Duration,
};

/// How often the tick thread drives the state machine. Well under the
/// driver's own poll interval, so a missed bus grant or a slow conversion
/// is retried promptly once it becomes eligible.
const TICK_PERIOD: Duration = Duration::from_millis(10);

fn parse_address(arg: &str) -> Result<u16, ParseIntError> {
  match arg.strip_prefix("0x") {
    Some(hex) => u16::from_str_radix(hex, 16),
    None => arg.parse(),
  }
}

fn main() {
  let matches = Command::new("daq")
    .about("Round-robin sampler for the six ADS1115 analog inputs.")
    .arg(
      Arg::new("bus")
        .long("bus")
        .short('b')
        .default_value("/dev/i2c-2")
        .help("I2C bus device node"),
    )
    .arg(
      Arg::new("address")
        .long("address")
        .short('a')
        .default_value("0x48")
        .help("Slave address, decimal or 0x-prefixed hex"),
    )
    .arg(
      Arg::new("gain")
        .long("gain")
        .short('g')
        .default_value("1")
        .value_parser(clap::value_parser!(u8))
        .help("PGA selector code, 0 (6.144V full scale) through 7"),
    )
    .get_matches();

  let bus_path = matches.get_one::<String>("bus").unwrap().clone();

  let address = match parse_address(matches.get_one::<String>("address").unwrap()) {
    Ok(address) => address,
    Err(e) => {
      fail!("Could not parse slave address: {e}.");
      process::exit(1);
    }
  };

  let gain_code = *matches.get_one::<u8>("gain").unwrap();

  let device = match LinuxI2CDevice::new(&bus_path, address) {
    Ok(device) => device,
    Err(e) => {
      fail!("Could not open \x1b[1m{bus_path}\x1b[0m: {e}.");
      process::exit(1);
    }
  };

  // Other peripheral drivers on the same bus would share this handle; the
  // ADC only ever takes it non-blocking from its tick thread.
  let bus = Arc::new(Mutex::new(device));

  let mut adc = match Ads1115::new(bus, gain_code) {
    Ok(adc) => adc,
    Err(e) => {
      fail!("Could not configure the ADC: {e}.");
      process::exit(1);
    }
  };

  if let Err(e) = adc.init() {
    fail!("Could not start the first conversion: {e}.");
    process::exit(1);
  }

  let store = adc.sample_store();

  thread::spawn(move || loop {
    adc.tick();
    thread::sleep(TICK_PERIOD);
  });

  pass!(
    "Polling {CHANNEL_COUNT} channels on \x1b[1m{bus_path}\x1b[0m at address {address:#04x} every {POLL_INTERVAL:?}."
  );

  let mut samples = [Sample { channel: 0, millivolts: 0.0 }; CHANNEL_COUNT];
  loop {
    thread::sleep(Duration::from_secs(1));
    let count = store.read_samples(&mut samples);

    let readings = samples[..count]
      .iter()
      .map(|sample| format!("ch{}: {:9.3} mV", sample.channel, sample.millivolts))
      .collect::<Vec<String>>()
      .join("  ");

    println!("[{}] {readings}", Local::now().format("%H:%M:%S%.3f"));
  }
}
