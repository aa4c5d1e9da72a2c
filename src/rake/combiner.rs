
use num_complex::Complex;
use num_traits::Zero;

use crate::DigSigProcErr;

pub const MAX_FINGERS:usize = 5;

// There are always MAX_FINGERS slots; the first num_fingers of them are active
#[derive(Debug, Clone)]
pub struct RakeCombiner {
	num_fingers: usize,
	pattern_length: usize,
	delays: [usize; MAX_FINGERS],
	gains: [f64; MAX_FINGERS],
	pattern: Vec<Complex<f64>>,
}

impl RakeCombiner {

	pub fn new(num_fingers:usize, delays:&[usize], gains:&[f64], pattern_length:usize) -> Result<Self, DigSigProcErr> {
		check_num_fingers(num_fingers)?;
		if delays.len() != num_fingers {
			return Err(DigSigProcErr::InvalidArgument("Number of delays must match number of fingers"));
		}
		if gains.len() != num_fingers {
			return Err(DigSigProcErr::InvalidArgument("Number of gains must match number of fingers"));
		}
		if pattern_length == 0 {
			return Err(DigSigProcErr::InvalidArgument("Pattern length must be at least one"));
		}
		check_delays(delays, pattern_length)?;

		// Inactive slots contribute nothing until they're configured
		let mut slot_delays = [0; MAX_FINGERS];
		let mut slot_gains  = [0.0; MAX_FINGERS];
		slot_delays[..num_fingers].copy_from_slice(delays);
		slot_gains[..num_fingers].copy_from_slice(gains);

		let pattern = vec![Complex{ re: 1.0, im: 0.0 }; pattern_length];

		Ok(Self { num_fingers, pattern_length, delays: slot_delays, gains: slot_gains, pattern })
	}

	pub fn num_fingers(&self) -> usize { self.num_fingers }
	pub fn pattern_length(&self) -> usize { self.pattern_length }
	pub fn delays(&self) -> &[usize] { &self.delays[..self.num_fingers] }
	pub fn gains(&self) -> &[f64] { &self.gains[..self.num_fingers] }
	pub fn pattern(&self) -> &[Complex<f64>] { &self.pattern }

	// Can't overflow since every delay was checked against pattern_length on the way in
	pub fn history(&self) -> usize {
		let max_delay:usize = self.delays().iter().cloned().max().unwrap_or(0);
		max_delay + self.pattern_length + 1
	}

	pub fn set_delays(&mut self, delays:&[usize]) -> Result<(), DigSigProcErr> {
		if delays.len() != self.num_fingers {
			return Err(DigSigProcErr::InvalidArgument("Number of delays must match number of fingers"));
		}
		check_delays(delays, self.pattern_length)?;
		self.delays[..self.num_fingers].copy_from_slice(delays);
		Ok(())
	}

	pub fn set_gains(&mut self, gains:&[f64]) -> Result<(), DigSigProcErr> {
		if gains.len() != self.num_fingers {
			return Err(DigSigProcErr::InvalidArgument("Number of gains must match number of fingers"));
		}
		self.gains[..self.num_fingers].copy_from_slice(gains);
		Ok(())
	}

	pub fn set_pattern(&mut self, pattern:&[Complex<f64>]) -> Result<(), DigSigProcErr> {
		if pattern.len() != self.pattern_length {
			return Err(DigSigProcErr::InvalidArgument("Pattern length must match pattern_length parameter"));
		}
		self.pattern = pattern.to_vec();
		Ok(())
	}

	// Slots that go inactive keep their delay and gain so they come back the same way
	pub fn set_num_fingers(&mut self, num_fingers:usize) -> Result<(), DigSigProcErr> {
		check_num_fingers(num_fingers)?;
		self.num_fingers = num_fingers;
		Ok(())
	}

	// Output i correlates input[i+delay..i+delay+L] for each active finger; a finger whose window
	// runs past the end of the input contributes zero
	pub fn work(&self, input:&[Complex<f64>], noutput_items:usize) -> Vec<Complex<f64>> {
		let mut output:Vec<Complex<f64>> = vec![Complex::zero(); noutput_items];
		self.work_into(input, &mut output);
		output
	}

	pub fn work_into(&self, input:&[Complex<f64>], output:&mut [Complex<f64>]) -> usize {
		for (i, out) in output.iter_mut().enumerate() {
			let mut combined:Complex<f64> = Complex::zero();

			for (delay, gain) in self.delays().iter().zip(self.gains().iter()) {
				let start:usize = match i.checked_add(*delay) {
					Some(start) => start,
					None => continue,
				};
				let end:usize = match start.checked_add(self.pattern_length) {
					Some(end) if end <= input.len() => end,
					_ => continue,
				};

				let finger_output:Complex<f64> = input[start..end].iter()
					.zip(self.pattern.iter())
					.map(|(x, p)| x * p.conj())
					.sum();

				combined += finger_output * *gain;
			}

			*out = combined;
		}

		output.len()
	}

}

pub fn check_num_fingers(num_fingers:usize) -> Result<(), DigSigProcErr> {
	if num_fingers < 1 || num_fingers > MAX_FINGERS {
		Err(DigSigProcErr::InvalidArgument("Number of fingers must be between 1 and 5"))
	} else {
		Ok(())
	}
}

fn check_delays(delays:&[usize], pattern_length:usize) -> Result<(), DigSigProcErr> {
	let reach = pattern_length.checked_add(1).ok_or(DigSigProcErr::InvalidArgument("Pattern length is too large"))?;
	if delays.iter().any(|d| d.checked_add(reach).is_none()) {
		Err(DigSigProcErr::InvalidArgument("Finger delay is too large"))
	} else {
		Ok(())
	}
}

#[cfg(test)]
mod tests {

	use num_complex::Complex;
	use rand::Rng;
	use rand_distr::StandardNormal;

	use super::*;

	fn c(re:f64, im:f64) -> Complex<f64> { Complex{ re, im } }

	#[test]
	fn construction_checks_lengths() {
		for n in 1..=MAX_FINGERS {
			let delays:Vec<usize> = (0..n).map(|k| 10*k).collect();
			let gains:Vec<f64> = (0..n).map(|k| 1.0 - 0.2*(k as f64)).collect();
			let rake = RakeCombiner::new(n, &delays, &gains, 16).unwrap();
			assert_eq!(rake.num_fingers(), n);
			assert_eq!(rake.delays(), &delays[..]);
			assert_eq!(rake.gains(), &gains[..]);
			assert_eq!(rake.pattern().len(), 16);

			assert!(RakeCombiner::new(n, &delays[1..], &gains, 16).is_err());
			assert!(RakeCombiner::new(n, &delays, &gains[1..], 16).is_err());
		}

		assert_eq!(RakeCombiner::new(0, &[], &[], 16).unwrap_err(),
			DigSigProcErr::InvalidArgument("Number of fingers must be between 1 and 5"));
		assert!(RakeCombiner::new(6, &[0; 6], &[1.0; 6], 16).is_err());
		assert!(RakeCombiner::new(1, &[0], &[1.0], 0).is_err());
	}

	#[test]
	fn rejected_changes_leave_state_alone() {
		let mut rake = RakeCombiner::new(2, &[0, 10], &[1.0, 0.8], 4).unwrap();
		let pattern = vec![c(1.0, 1.0), c(-1.0, 0.0), c(0.0, 1.0), c(1.0, 0.0)];
		rake.set_pattern(&pattern).unwrap();

		assert!(rake.set_delays(&[1, 2, 3]).is_err());
		assert!(rake.set_gains(&[0.5]).is_err());
		assert!(rake.set_pattern(&[c(0.0, 0.0); 5]).is_err());
		assert!(rake.set_num_fingers(6).is_err());

		assert_eq!(rake.delays(), &[0, 10]);
		assert_eq!(rake.gains(), &[1.0, 0.8]);
		assert_eq!(rake.pattern(), &pattern[..]);
		assert_eq!(rake.num_fingers(), 2);

		rake.set_delays(&[5, 15]).unwrap();
		rake.set_gains(&[0.9, 0.7]).unwrap();
		assert_eq!(rake.delays(), &[5, 15]);
		assert_eq!(rake.gains(), &[0.9, 0.7]);
	}

	#[test]
	fn history_follows_the_active_delays() {
		let mut rake = RakeCombiner::new(3, &[0, 10, 20], &[1.0, 0.8, 0.6], 16).unwrap();
		assert_eq!(rake.history(), 37);

		rake.set_delays(&[3, 2, 1]).unwrap();
		assert_eq!(rake.history(), 20);

		rake.set_delays(&[0, 40, 1]).unwrap();
		rake.set_num_fingers(1).unwrap();
		assert_eq!(rake.history(), 17);

		// Reactivated slots come back with the values they had
		rake.set_num_fingers(3).unwrap();
		assert_eq!(rake.delays(), &[0, 40, 1]);
		assert_eq!(rake.history(), 57);

		// Slots that were never configured have zero delay and gain
		rake.set_num_fingers(5).unwrap();
		assert_eq!(rake.delays(), &[0, 40, 1, 0, 0]);
		assert_eq!(rake.gains(), &[1.0, 0.8, 0.6, 0.0, 0.0]);
	}

	#[test]
	fn correlates_against_the_conjugate_pattern() {
		let mut rake = RakeCombiner::new(1, &[0], &[2.0], 2).unwrap();
		rake.set_pattern(&[c(0.0, 1.0), c(1.0, 0.0)]).unwrap();

		let input = vec![c(0.0, 1.0), c(3.0, 0.0), c(1.0, 1.0)];
		let output = rake.work(&input, 2);

		// (j)(-j) + 3(1) = 4, then the gain of 2
		assert_eq!(output[0], c(8.0, 0.0));
		// 3(-j) + (1+j)(1) = 1 - 2j, then the gain of 2
		assert_eq!(output[1], c(2.0, -4.0));
	}

	#[test]
	fn fingers_are_summed_with_their_gains() {
		let rake = RakeCombiner::new(2, &[0, 5], &[1.0, 0.8], 8).unwrap();
		let input = vec![c(1.0, 0.0); 100];
		let output = rake.work(&input, 50);

		assert_eq!(output.len(), 50);
		for y in output.iter() {
			assert!((y - c(8.0*1.8, 0.0)).norm() < 1.0e-12);
		}
	}

	#[test]
	fn fingers_past_the_end_of_the_input_contribute_zero() {
		let rake = RakeCombiner::new(2, &[0, 4], &[1.0, 10.0], 3).unwrap();
		let input = vec![c(1.0, 0.0); 8];
		let output = rake.work(&input, 6);

		// Both windows fit for i = 0 and 1
		assert_eq!(output[0], c(33.0, 0.0));
		assert_eq!(output[1], c(33.0, 0.0));
		// Only the undelayed finger fits from i = 2 until i + 3 runs past the input too
		for i in 2..6 {
			assert_eq!(output[i], c(3.0, 0.0));
		}
		assert_eq!(rake.work(&input, 7)[6], c(0.0, 0.0));
		assert_eq!(rake.work(&[], 3), vec![c(0.0, 0.0); 3]);
	}

	#[test]
	fn delays_that_overflow_the_history_are_rejected() {
		let mut rake = RakeCombiner::new(1, &[0], &[1.0], 4).unwrap();
		assert_eq!(rake.set_delays(&[usize::MAX - 2]).unwrap_err(),
			DigSigProcErr::InvalidArgument("Finger delay is too large"));
		assert_eq!(rake.delays(), &[0]);
		assert_eq!(rake.history(), 5);

		assert!(RakeCombiner::new(1, &[usize::MAX - 2], &[1.0], 4).is_err());
		assert!(RakeCombiner::new(2, &[0, usize::MAX], &[1.0, 1.0], 1).is_err());

		// The largest delay that still fits is accepted, and it just never reaches into the input
		let mut rake = RakeCombiner::new(2, &[0, usize::MAX - 5], &[1.0, 1.0], 4).unwrap();
		assert_eq!(rake.history(), usize::MAX);
		let output = rake.work(&[c(1.0, 0.0); 8], 6);
		assert_eq!(&output[..5], &[c(4.0, 0.0); 5]);
		assert_eq!(output[5], c(0.0, 0.0));

		rake.set_delays(&[usize::MAX - 5, usize::MAX - 5]).unwrap();
		assert_eq!(rake.work(&[c(1.0, 0.0); 8], 4), vec![c(0.0, 0.0); 4]);
	}

	#[test]
	fn no_normalization_by_pattern_energy() {
		let mut rake = RakeCombiner::new(1, &[0], &[1.0], 4).unwrap();
		rake.set_pattern(&[c(2.0, 0.0); 4]).unwrap();
		let output = rake.work(&[c(3.0, 0.0); 4], 1);
		assert_eq!(output[0], c(24.0, 0.0));
	}

	#[test]
	fn combining_is_deterministic() {
		let mut rng = rand::thread_rng();
		let input:Vec<Complex<f64>> = (0..512).map(|_| c(rng.sample(StandardNormal), rng.sample(StandardNormal))).collect();
		let pattern:Vec<Complex<f64>> = (0..31).map(|_| c(rng.sample(StandardNormal), rng.sample(StandardNormal))).collect();

		let mut rake = RakeCombiner::new(4, &[0, 3, 17, 40], &[1.0, 0.7, 0.4, 0.2], 31).unwrap();
		rake.set_pattern(&pattern).unwrap();

		let a = rake.work(&input, 440);
		let b = rake.work(&input, 440);
		assert_eq!(a, b);

		let mut c_out = vec![Complex::zero(); 440];
		assert_eq!(rake.work_into(&input, &mut c_out), 440);
		assert_eq!(a, c_out);
	}

}
