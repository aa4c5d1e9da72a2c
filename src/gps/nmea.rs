
use super::{leading_float, KMH_PER_KNOT};

// Recommended minimum sentences carry speed over ground in knots, track made good sentences
// carry it in km/h.  Both put it in field 7 counting the sentence ID as field 0
pub const RMC_PREFIXES:[&str; 2] = ["$GPRMC", "$GNRMC"];
pub const VTG_PREFIXES:[&str; 2] = ["$GPVTG", "$GNVTG"];
pub const SPEED_FIELD_IDX:usize = 7;

// A '$' anywhere in the text is enough.  That's broader than real NMEA framing, but text that
// only looks like NMEA still falls through to the GPSD parser in parse_gps_speed
pub fn is_nmea0183(data:&str) -> bool {
	!data.is_empty() && (data.starts_with('$') || data.contains('$'))
}

// None if the sentence isn't RMC or VTG, or the speed field is missing or not a finite number
pub fn parse_nmea0183_speed(nmea_message:&str) -> Option<f64> {
	if !nmea_message.starts_with('$') {
		return None;
	}

	if RMC_PREFIXES.iter().any(|p| nmea_message.starts_with(p)) {
		if let Some(knots) = speed_field(nmea_message) {
			return Some(knots * KMH_PER_KNOT).filter(|kmh| kmh.is_finite());
		}
	}

	if VTG_PREFIXES.iter().any(|p| nmea_message.starts_with(p)) {
		if let Some(kmh) = speed_field(nmea_message) {
			return Some(kmh);
		}
	}

	None
}

fn speed_field(sentence:&str) -> Option<f64> {
	sentence.split(',').nth(SPEED_FIELD_IDX).and_then(leading_float)
}
