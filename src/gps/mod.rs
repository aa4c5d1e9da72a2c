
use std::sync::OnceLock;

use log::trace;
use regex::Regex;
use serde::{Serialize, Deserialize};

pub mod gpsd;
pub mod nmea;

pub use self::gpsd::{is_gpsd_json, parse_gpsd_speed};
pub use self::nmea::{is_nmea0183, parse_nmea0183_speed};

pub const KMH_PER_KNOT:f64 = 1.852;
pub const KMH_PER_MPS:f64  = 3.6;

pub const DEFAULT_SERIAL_DEVICE:&str = "/dev/ttyUSB0";
pub const DEFAULT_SERIAL_BAUD_RATE:i32 = 4800;
pub const DEFAULT_GPSD_HOST:&str = "localhost";
pub const DEFAULT_GPSD_PORT:i32 = 2947;

// Symbols arrive as text, everything else as raw bytes
#[derive(Debug, Clone, PartialEq)]
pub enum GpsMessage {
	Text(String),
	Bytes(Vec<u8>),
}

impl GpsMessage {

	pub fn as_text(&self) -> Option<&str> {
		match self {
			Self::Text(s)  => Some(s.as_str()),
			Self::Bytes(b) => match std::str::from_utf8(b) {
				Ok(s)  => Some(s),
				Err(_) => {
					trace!("Ignoring GPS payload that isn't valid UTF-8 ({} bytes)", b.len());
					None
				}
			}
		}
	}

}

// Nothing here opens a device or a socket; it's stored so that whatever does own the connection
// can read it back
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GpsSourceConfig {
	pub source: String,
	pub serial_device: String,
	pub serial_baud_rate: i32,
	pub gpsd_host: String,
	pub gpsd_port: i32,
}

impl Default for GpsSourceConfig {

	fn default() -> Self {
		Self {
			source: "none".to_string(),
			serial_device: DEFAULT_SERIAL_DEVICE.to_string(),
			serial_baud_rate: DEFAULT_SERIAL_BAUD_RATE,
			gpsd_host: DEFAULT_GPSD_HOST.to_string(),
			gpsd_port: DEFAULT_GPSD_PORT,
		}
	}

}

// NMEA is tried first; a format only counts as a match if it produces a non-negative speed
pub fn parse_gps_speed(gps_data:&str) -> Option<f64> {
	if gps_data.is_empty() {
		return None;
	}

	if is_nmea0183(gps_data) {
		if let Some(speed) = parse_nmea0183_speed(gps_data).filter(|s| *s >= 0.0) {
			return Some(speed);
		}
	}

	if is_gpsd_json(gps_data) {
		if let Some(speed) = parse_gpsd_speed(gps_data).filter(|s| *s >= 0.0) {
			return Some(speed);
		}
	}

	None
}

// Reads the longest decimal number at the start of the field, ignoring leading whitespace and
// anything after the number, so "022.4" and "12.5abc" both parse.  Out of range values like
// "1e400" don't
pub(crate) fn leading_float(field:&str) -> Option<f64> {
	static LEADING_FLOAT:OnceLock<Regex> = OnceLock::new();
	let re = LEADING_FLOAT.get_or_init(|| {
		Regex::new(r"^\s*[+-]?(?:[0-9]+(?:\.[0-9]*)?|\.[0-9]+)(?:[eE][+-]?[0-9]+)?").expect("valid leading float regex")
	});

	re.find(field)
		.and_then(|m| m.as_str().trim_start().parse::<f64>().ok())
		.filter(|v| v.is_finite())
}
