
use num_complex::Complex;

pub mod block;

pub mod gps;
pub mod io;
pub mod rake;

#[derive(Debug, Clone)]
pub struct Sample {
	pub val: Complex<f64>,
	pub idx: usize,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum DigSigProcErr {
	InvalidArgument(&'static str),
}

impl std::fmt::Display for DigSigProcErr {

	fn fmt(&self, f:&mut std::fmt::Formatter) -> std::fmt::Result {
		match self {
			Self::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
		}
	}

}

impl std::error::Error for DigSigProcErr {}
