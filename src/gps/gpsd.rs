
use super::{leading_float, KMH_PER_MPS};

pub fn is_gpsd_json(data:&str) -> bool {
	if data.is_empty() {
		return false;
	}

	let trimmed = data.trim_start_matches(|c:char| c == ' ' || c == '\t' || c == '\n' || c == '\r');
	trimmed.starts_with('{') || trimmed.contains("\"class\"")
}

/// Speed in km/h from a GPSD report such as a TPV object.  This is a scan for the first "speed"
/// key, not a JSON parser: whatever follows the first colon after that key is read up to the next
/// delimiter and interpreted as m/s
pub fn parse_gpsd_speed(gpsd_json:&str) -> Option<f64> {
	let speed_pos = gpsd_json.find("\"speed\"")?;
	let colon_pos = speed_pos + gpsd_json[speed_pos..].find(':')?;

	let value = gpsd_json[(colon_pos + 1)..].trim_start_matches(|c:char| c == ' ' || c == '\t');
	let value_len = value.find(|c:char| c == ',' || c == '}' || c == ' ' || c == '\t' || c == '\n').unwrap_or(value.len());
	if value_len == 0 {
		return None;
	}

	leading_float(&value[..value_len])
		.map(|mps| mps * KMH_PER_MPS)
		.filter(|kmh| kmh.is_finite())
}

#[cfg(test)]
mod tests {

	use super::*;

	#[test]
	fn tpv_speed_is_converted_from_mps() {
		let tpv = "{\"class\":\"TPV\",\"device\":\"/dev/ttyUSB0\",\"time\":\"2024-01-01T12:00:00.000Z\",\
			\"lat\":48.123,\"lon\":11.456,\"speed\":12.5}";
		assert_eq!(parse_gpsd_speed(tpv), Some(45.0));
	}

	#[test]
	fn whitespace_around_the_value() {
		assert_eq!(parse_gpsd_speed("{\"speed\":  \t10.0 , \"track\":3}"), Some(36.0));
		assert_eq!(parse_gpsd_speed("{\"speed\" : 10.0\n}"), Some(36.0));
	}

	#[test]
	fn missing_or_empty_values() {
		assert_eq!(parse_gpsd_speed("{\"class\":\"TPV\"}"), None);
		assert_eq!(parse_gpsd_speed("{\"speed\"}"), None);
		assert_eq!(parse_gpsd_speed("{\"speed\":}"), None);
		assert_eq!(parse_gpsd_speed("{\"speed\":,\"x\":1}"), None);
		assert_eq!(parse_gpsd_speed("{\"speed\":null}"), None);
		assert_eq!(parse_gpsd_speed(""), None);
	}

	#[test]
	fn out_of_range_values() {
		assert_eq!(parse_gpsd_speed("{\"class\":\"TPV\",\"speed\":1e400}"), None);
		assert_eq!(parse_gpsd_speed("{\"class\":\"TPV\",\"speed\":-1e400}"), None);
		assert_eq!(parse_gpsd_speed("{\"class\":\"TPV\",\"speed\":1e308}"), None);
		assert!(parse_gpsd_speed("{\"class\":\"TPV\",\"speed\":1e300}").unwrap().is_finite());
	}

	#[test]
	fn only_the_first_speed_key_counts() {
		let text = "{\"class\":\"TPV\",\"prev\":{\"speed\":1.0},\"speed\":2.0}";
		assert_eq!(parse_gpsd_speed(text), Some(3.6));
	}

	#[test]
	fn classifier() {
		assert!(is_gpsd_json("  \n{\"class\":\"TPV\"}"));
		assert!(is_gpsd_json("prefix \"class\":\"TPV\""));
		assert!(!is_gpsd_json("$GPRMC"));
		assert!(!is_gpsd_json(""));
		assert!(!is_gpsd_json("   "));
	}

}
