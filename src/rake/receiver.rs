
use log::{debug, trace};
use num_complex::Complex;
use num_traits::Zero;

use crate::DigSigProcErr;
use crate::block::{BlockFunctionality, BlockResult};
use crate::gps::{self, GpsMessage, GpsSourceConfig};
use crate::rake::adaptive::{AdaptiveController, OperatingParams};
use crate::rake::combiner::{self, RakeCombiner};

// Gps carries the payloads that arrive on the "gps" message channel
#[derive(Debug, Clone, PartialEq)]
pub enum RakeControl {
	Gps(GpsMessage),
	SetDelays(Vec<usize>),
	SetGains(Vec<f64>),
	SetPattern(Vec<Complex<f64>>),
	SetNumFingers(usize),
	SetGpsSpeed(f64),
	SetAdaptiveMode(bool),
	SetOperatingParams(OperatingParams),
}

// Upper limit on history(), which is also the size of the look-back buffer kept between blocks
pub const MAX_HISTORY:usize = 1 << 20;

/// A RAKE combiner whose finger count and tracking parameters can follow the receiver's speed.
/// It owns the combiner, the adaptive controller, and the look-back samples needed to stream
/// blocks of input through the combiner
pub struct RakeReceiver {
	combiner: RakeCombiner,
	controller: AdaptiveController,
	history: usize,
	carry: Vec<Complex<f64>>,
	gps_source: GpsSourceConfig,
	gps_running: bool,
}

impl RakeReceiver {

	pub fn new(num_fingers:usize, delays:&[usize], gains:&[f64], pattern_length:usize) -> Result<Self, DigSigProcErr> {
		let combiner = RakeCombiner::new(num_fingers, delays, gains, pattern_length)?;
		check_history(delays, pattern_length)?;
		let controller = AdaptiveController::new(num_fingers);
		let history = combiner.history();
		let carry = vec![Complex::zero(); history - 1];

		Ok(Self { combiner, controller, history, carry, gps_source: GpsSourceConfig::default(), gps_running: false })
	}

	pub fn combiner(&self) -> &RakeCombiner { &self.combiner }
	pub fn controller(&self) -> &AdaptiveController { &self.controller }

	pub fn num_fingers(&self) -> usize { self.combiner.num_fingers() }
	pub fn delays(&self) -> &[usize] { self.combiner.delays() }
	pub fn gains(&self) -> &[f64] { self.combiner.gains() }
	pub fn pattern(&self) -> &[Complex<f64>] { self.combiner.pattern() }
	pub fn history(&self) -> usize { self.history }

	pub fn set_delays(&mut self, delays:&[usize]) -> Result<(), DigSigProcErr> {
		if delays.len() == self.combiner.num_fingers() {
			check_history(delays, self.combiner.pattern_length())?;
		}
		self.combiner.set_delays(delays)?;
		self.announce_history();
		Ok(())
	}

	pub fn set_gains(&mut self, gains:&[f64]) -> Result<(), DigSigProcErr> {
		self.combiner.set_gains(gains)
	}

	pub fn set_pattern(&mut self, pattern:&[Complex<f64>]) -> Result<(), DigSigProcErr> {
		self.combiner.set_pattern(pattern)
	}

	pub fn set_num_fingers(&mut self, num_fingers:usize) -> Result<(), DigSigProcErr> {
		combiner::check_num_fingers(num_fingers)?;
		self.controller.set_num_fingers(num_fingers);
		self.sync_fingers()
	}

	// Operating parameters

	pub fn operating_params(&self) -> &OperatingParams { self.controller.params() }
	pub fn gps_speed(&self) -> f64 { self.controller.gps_speed() }
	pub fn adaptive_mode(&self) -> bool { self.controller.adaptive_mode() }
	pub fn path_search_rate(&self) -> f64 { self.controller.path_search_rate() }
	pub fn tracking_bandwidth(&self) -> f64 { self.controller.tracking_bandwidth() }
	pub fn path_detection_threshold(&self) -> f64 { self.controller.path_detection_threshold() }
	pub fn lock_threshold(&self) -> f64 { self.controller.lock_threshold() }
	pub fn reassignment_period(&self) -> f64 { self.controller.reassignment_period() }

	pub fn set_path_search_rate(&mut self, rate_hz:f64) { self.controller.set_path_search_rate(rate_hz); }
	pub fn set_tracking_bandwidth(&mut self, bandwidth_hz:f64) { self.controller.set_tracking_bandwidth(bandwidth_hz); }
	pub fn set_path_detection_threshold(&mut self, threshold:f64) { self.controller.set_path_detection_threshold(threshold); }
	pub fn set_lock_threshold(&mut self, threshold:f64) { self.controller.set_lock_threshold(threshold); }
	pub fn set_reassignment_period(&mut self, period_s:f64) { self.controller.set_reassignment_period(period_s); }

	pub fn set_operating_params(&mut self, params:OperatingParams) -> Result<(), DigSigProcErr> {
		combiner::check_num_fingers(params.num_fingers)?;
		self.controller.set_params(params);
		self.sync_fingers()
	}

	pub fn set_gps_speed(&mut self, speed_kmh:f64) {
		self.controller.set_gps_speed(speed_kmh);
		self.sync_adapted_fingers();
	}

	pub fn set_adaptive_mode(&mut self, enable:bool) {
		self.controller.set_adaptive_mode(enable);
		self.sync_adapted_fingers();
	}

	// GPS input

	pub fn parse_gps_data(&mut self, gps_data:&str) -> bool {
		self.take_speed(gps::parse_gps_speed(gps_data))
	}

	pub fn parse_nmea0183(&mut self, nmea_message:&str) -> bool {
		self.take_speed(gps::parse_nmea0183_speed(nmea_message))
	}

	pub fn parse_gpsd(&mut self, gpsd_json:&str) -> bool {
		self.take_speed(gps::parse_gpsd_speed(gpsd_json))
	}

	// Anything that doesn't decode or doesn't contain a speed is dropped without touching the
	// receiver's state
	pub fn handle_gps_message(&mut self, msg:&GpsMessage) -> bool {
		match msg.as_text() {
			Some(text) => {
				let updated = self.parse_gps_data(text.trim_end_matches(|c:char| c == '\r' || c == '\n'));
				if !updated {
					trace!("No speed in GPS payload {:?}", text);
				}
				updated
			},
			None => false,
		}
	}

	fn take_speed(&mut self, speed_kmh:Option<f64>) -> bool {
		match speed_kmh.filter(|s| s.is_finite() && *s >= 0.0) {
			Some(s) => {
				self.set_gps_speed(s);
				true
			},
			None => false,
		}
	}

	// GPS source descriptor.  None of this opens anything

	pub fn gps_source_config(&self) -> &GpsSourceConfig { &self.gps_source }
	pub fn set_gps_source_config(&mut self, config:GpsSourceConfig) { self.gps_source = config; }

	pub fn gps_source(&self) -> &str { &self.gps_source.source }
	pub fn serial_device(&self) -> &str { &self.gps_source.serial_device }
	pub fn serial_baud_rate(&self) -> i32 { self.gps_source.serial_baud_rate }
	pub fn gpsd_host(&self) -> &str { &self.gps_source.gpsd_host }
	pub fn gpsd_port(&self) -> i32 { self.gps_source.gpsd_port }

	pub fn set_gps_source(&mut self, source_type:&str) { self.gps_source.source = source_type.to_string(); }
	pub fn set_serial_device(&mut self, device_path:&str) { self.gps_source.serial_device = device_path.to_string(); }
	pub fn set_serial_baud_rate(&mut self, baud_rate:i32) { self.gps_source.serial_baud_rate = baud_rate; }
	pub fn set_gpsd_host(&mut self, host:&str) { self.gps_source.gpsd_host = host.to_string(); }
	pub fn set_gpsd_port(&mut self, port:i32) { self.gps_source.gpsd_port = port; }

	pub fn gps_running(&self) -> bool { self.gps_running }

	pub fn start_gps(&mut self) -> bool {
		self.gps_running = self.gps_source.source != "none";
		self.gps_running
	}

	pub fn stop_gps(&mut self) { self.gps_running = false; }

	// Sample processing

	// The caller is expected to supply history() - 1 samples beyond the last output index
	pub fn work(&self, input:&[Complex<f64>], noutput_items:usize) -> Vec<Complex<f64>> {
		self.combiner.work(input, noutput_items)
	}

	/// Streams one block of new samples through the combiner, producing one output per input.  The
	/// last history() - 1 samples are kept for the next block, starting from zeros
	pub fn process_block(&mut self, samples:&[Complex<f64>]) -> Vec<Complex<f64>> {
		let mut input:Vec<Complex<f64>> = Vec::with_capacity(self.carry.len() + samples.len());
		input.extend_from_slice(&self.carry);
		input.extend_from_slice(samples);

		let output = self.combiner.work(&input, samples.len());

		let keep = self.history - 1;
		self.carry = input.split_off(input.len() - keep);
		output
	}

	// The finger count decided by the controller is authoritative; the combiner follows it
	fn sync_fingers(&mut self) -> Result<(), DigSigProcErr> {
		let num_fingers = self.controller.num_fingers();
		if num_fingers != self.combiner.num_fingers() {
			self.combiner.set_num_fingers(num_fingers)?;
			debug!("Active fingers now {}", num_fingers);
			self.announce_history();
		}
		Ok(())
	}

	fn sync_adapted_fingers(&mut self) {
		// The category table only holds counts from 1 to 5, so this can't fail
		if let Err(e) = self.sync_fingers() {
			debug!("Ignoring adapted finger count: {}", e);
		}
	}

	// Resizes the look-back buffer so the next block is processed with enough history for the
	// current delays.  Growing pads the oldest end with zeros, shrinking drops the oldest samples
	fn announce_history(&mut self) {
		let history = self.combiner.history();
		if history == self.history {
			return;
		}

		let keep = history - 1;
		if keep > self.carry.len() {
			let mut carry:Vec<Complex<f64>> = vec![Complex::zero(); keep - self.carry.len()];
			carry.extend_from_slice(&self.carry);
			self.carry = carry;
		} else {
			let drop = self.carry.len() - keep;
			self.carry.drain(..drop);
		}

		debug!("History changed from {} to {} samples", self.history, history);
		self.history = history;
	}

}

// Every slot delay is checked on the way in, so reactivated slots stay under the limit too
fn check_history(delays:&[usize], pattern_length:usize) -> Result<(), DigSigProcErr> {
	let too_long = delays.iter().any(|d| {
		match d.checked_add(pattern_length).and_then(|n| n.checked_add(1)) {
			Some(history) => history > MAX_HISTORY,
			None => true,
		}
	});

	if too_long {
		Err(DigSigProcErr::InvalidArgument("Finger delay plus pattern length exceeds the maximum history"))
	} else {
		Ok(())
	}
}

impl BlockFunctionality<RakeControl, (), Vec<Complex<f64>>, Vec<Complex<f64>>> for RakeReceiver {

	fn control(&mut self, control:&RakeControl) -> Result<(), &'static str> {
		let result = match control {
			RakeControl::Gps(msg)                => { self.handle_gps_message(msg); Ok(()) },
			RakeControl::SetDelays(delays)       => self.set_delays(delays),
			RakeControl::SetGains(gains)         => self.set_gains(gains),
			RakeControl::SetPattern(pattern)     => self.set_pattern(pattern),
			RakeControl::SetNumFingers(n)        => self.set_num_fingers(*n),
			RakeControl::SetGpsSpeed(speed_kmh)  => { self.set_gps_speed(*speed_kmh); Ok(()) },
			RakeControl::SetAdaptiveMode(enable) => { self.set_adaptive_mode(*enable); Ok(()) },
			RakeControl::SetOperatingParams(p)   => self.set_operating_params(*p),
		};

		result.map_err(|DigSigProcErr::InvalidArgument(msg)| msg)
	}

	fn apply(&mut self, input:&Vec<Complex<f64>>) -> BlockResult<Vec<Complex<f64>>> {
		if input.is_empty() {
			BlockResult::NotReady
		} else {
			BlockResult::Ready(self.process_block(input))
		}
	}

}
