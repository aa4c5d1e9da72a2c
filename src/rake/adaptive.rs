
use log::debug;
use serde::{Serialize, Deserialize};

pub const DEFAULT_PATH_SEARCH_RATE_HZ:f64 = 20.0;
pub const DEFAULT_TRACKING_BANDWIDTH_HZ:f64 = 120.0;
pub const DEFAULT_PATH_DETECTION_THRESHOLD:f64 = 0.5;
pub const DEFAULT_LOCK_THRESHOLD:f64 = 0.7;
pub const DEFAULT_REASSIGNMENT_PERIOD_S:f64 = 1.0;

// Speed used as a sentinel when no GPS fix is available
pub const UNKNOWN_SPEED_KMH:f64 = -1.0;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpeedCategory {
	Stationary,
	Pedestrian,
	LowSpeed,
	HighSpeed,
	VeryHigh,
}

// speed_kmh is where the category's parameters apply exactly; between two anchors they're interpolated
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CategoryParams {
	pub category: SpeedCategory,
	pub speed_kmh: f64,
	pub path_search_rate_hz: f64,
	pub tracking_bandwidth_hz: f64,
	pub reassignment_period_s: f64,
	pub num_fingers: usize,
}

pub const SPEED_CATEGORIES:[CategoryParams; 5] = [
	CategoryParams{ category: SpeedCategory::Stationary, speed_kmh:   5.0, path_search_rate_hz:   5.0, tracking_bandwidth_hz:  50.0, reassignment_period_s: 2.0,  num_fingers: 2 },
	CategoryParams{ category: SpeedCategory::Pedestrian, speed_kmh:  15.0, path_search_rate_hz:  10.0, tracking_bandwidth_hz: 100.0, reassignment_period_s: 1.0,  num_fingers: 3 },
	CategoryParams{ category: SpeedCategory::LowSpeed,   speed_kmh:  60.0, path_search_rate_hz:  20.0, tracking_bandwidth_hz: 120.0, reassignment_period_s: 1.0,  num_fingers: 4 },
	CategoryParams{ category: SpeedCategory::HighSpeed,  speed_kmh: 120.0, path_search_rate_hz:  50.0, tracking_bandwidth_hz: 200.0, reassignment_period_s: 0.5,  num_fingers: 4 },
	CategoryParams{ category: SpeedCategory::VeryHigh,   speed_kmh: 200.0, path_search_rate_hz: 100.0, tracking_bandwidth_hz: 300.0, reassignment_period_s: 0.25, num_fingers: 4 },
];

impl SpeedCategory {

	pub fn params(self) -> &'static CategoryParams {
		&SPEED_CATEGORIES[self as usize]
	}

	// Closest category at or below the given speed
	pub fn for_speed(speed_kmh:f64) -> Self {
		SPEED_CATEGORIES.iter().rev()
			.find(|c| speed_kmh >= c.speed_kmh)
			.map(|c| c.category)
			.unwrap_or(SpeedCategory::Stationary)
	}

}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatingParams {
	pub path_search_rate_hz: f64,
	pub tracking_bandwidth_hz: f64,
	pub path_detection_threshold: f64,
	pub lock_threshold: f64,
	pub reassignment_period_s: f64,
	pub num_fingers: usize,
}

impl OperatingParams {

	pub fn new(num_fingers:usize) -> Self {
		Self {
			path_search_rate_hz: DEFAULT_PATH_SEARCH_RATE_HZ,
			tracking_bandwidth_hz: DEFAULT_TRACKING_BANDWIDTH_HZ,
			path_detection_threshold: DEFAULT_PATH_DETECTION_THRESHOLD,
			lock_threshold: DEFAULT_LOCK_THRESHOLD,
			reassignment_period_s: DEFAULT_REASSIGNMENT_PERIOD_S,
			num_fingers,
		}
	}

	// Overwrites the speed-dependent fields and leaves the two thresholds alone
	fn take_category(&mut self, c:&CategoryParams) {
		self.path_search_rate_hz   = c.path_search_rate_hz;
		self.tracking_bandwidth_hz = c.tracking_bandwidth_hz;
		self.reassignment_period_s = c.reassignment_period_s;
		self.num_fingers           = c.num_fingers;
	}

}

#[derive(Debug, Clone)]
pub struct AdaptiveController {
	params: OperatingParams,
	adaptive_mode: bool,
	gps_speed_kmh: f64,
}

impl AdaptiveController {

	pub fn new(num_fingers:usize) -> Self {
		Self { params: OperatingParams::new(num_fingers), adaptive_mode: false, gps_speed_kmh: UNKNOWN_SPEED_KMH }
	}

	pub fn params(&self) -> &OperatingParams { &self.params }
	pub fn adaptive_mode(&self) -> bool { self.adaptive_mode }
	pub fn gps_speed(&self) -> f64 { self.gps_speed_kmh }

	pub fn path_search_rate(&self) -> f64 { self.params.path_search_rate_hz }
	pub fn tracking_bandwidth(&self) -> f64 { self.params.tracking_bandwidth_hz }
	pub fn path_detection_threshold(&self) -> f64 { self.params.path_detection_threshold }
	pub fn lock_threshold(&self) -> f64 { self.params.lock_threshold }
	pub fn reassignment_period(&self) -> f64 { self.params.reassignment_period_s }
	pub fn num_fingers(&self) -> usize { self.params.num_fingers }

	pub fn set_path_search_rate(&mut self, rate_hz:f64) { self.params.path_search_rate_hz = rate_hz; }
	pub fn set_tracking_bandwidth(&mut self, bandwidth_hz:f64) { self.params.tracking_bandwidth_hz = bandwidth_hz; }
	pub fn set_path_detection_threshold(&mut self, threshold:f64) { self.params.path_detection_threshold = threshold; }
	pub fn set_lock_threshold(&mut self, threshold:f64) { self.params.lock_threshold = threshold; }
	pub fn set_reassignment_period(&mut self, period_s:f64) { self.params.reassignment_period_s = period_s; }

	// The caller is responsible for range checking; see RakeReceiver::set_num_fingers
	pub fn set_num_fingers(&mut self, num_fingers:usize) { self.params.num_fingers = num_fingers; }

	pub fn set_params(&mut self, params:OperatingParams) { self.params = params; }

	pub fn set_gps_speed(&mut self, speed_kmh:f64) {
		self.gps_speed_kmh = speed_kmh;
		if self.adaptive_mode {
			self.update_adaptive_parameters();
		}
	}

	// Turning adaptive mode off keeps whatever was last computed
	pub fn set_adaptive_mode(&mut self, enable:bool) {
		self.adaptive_mode = enable;
		if enable && self.gps_speed_kmh >= 0.0 {
			self.update_adaptive_parameters();
		}
	}

	pub fn update_adaptive_parameters(&mut self) {
		if self.adaptive_mode && self.gps_speed_kmh >= 0.0 {
			self.apply(self.gps_speed_kmh);
			debug!("Adapted to {:.1} [km/h] ({:?}): {:?}", self.gps_speed_kmh, SpeedCategory::for_speed(self.gps_speed_kmh), self.params);
		}
	}

	/// Recomputes the speed-dependent parameters from the category table alone.  Negative speeds
	/// mean the speed is unknown and leave everything as it was
	pub fn apply(&mut self, speed_kmh:f64) {
		if !(speed_kmh >= 0.0) {
			return;
		}

		let [stationary, pedestrian, low, high, very_high] = &SPEED_CATEGORIES;

		let (lower, upper, snap_to_midpoint) = if speed_kmh <= stationary.speed_kmh {
			self.params.take_category(stationary);
			return;
		} else if speed_kmh <= pedestrian.speed_kmh {
			(stationary, pedestrian, true)
		} else if speed_kmh <= low.speed_kmh {
			(pedestrian, low, true)
		} else if speed_kmh <= high.speed_kmh {
			(low, high, false)
		} else {
			(high, very_high, false)
		};

		let alpha:f64 = ((speed_kmh.min(upper.speed_kmh) - lower.speed_kmh) / (upper.speed_kmh - lower.speed_kmh)).max(0.0).min(1.0);
		let lerp = |a:f64, b:f64| a + alpha*(b - a);

		self.params.path_search_rate_hz   = lerp(lower.path_search_rate_hz,   upper.path_search_rate_hz);
		self.params.tracking_bandwidth_hz = lerp(lower.tracking_bandwidth_hz, upper.tracking_bandwidth_hz);
		self.params.reassignment_period_s = lerp(lower.reassignment_period_s, upper.reassignment_period_s);

		// Finger count can't be interpolated, so it switches at the speed halfway between anchors
		self.params.num_fingers = if snap_to_midpoint {
			let midpoint_kmh = (lower.speed_kmh + upper.speed_kmh) / 2.0;
			if speed_kmh < midpoint_kmh { lower.num_fingers } else { upper.num_fingers }
		} else {
			lower.num_fingers
		};
	}

}
