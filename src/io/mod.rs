
use std::io::{ErrorKind, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use num_complex::Complex;
use num_traits::Zero;

use crate::Sample;

pub const BUFFER_SIZE:usize = 2048;

// Interleaved little-endian i16 I/Q pairs
pub struct BufferedSource<S: Read> {
	src: S,
	idx: usize,
	buffer: Vec<Complex<f64>>,
	buffer_idx: usize,
	buffer_valid_len: usize,
	err: Option<&'static str>,
}

impl<S: Read> BufferedSource<S> {

	pub fn new(src:S) -> Self {
		Self { src, idx: 0, buffer: vec![Complex::zero(); BUFFER_SIZE], buffer_idx: 0, buffer_valid_len: 0, err: None }
	}

	// The iterator ends on the first read error as well as at the end of the source; this tells
	// the two apart
	pub fn error(&self) -> Option<&'static str> { self.err }

	// Fills as much of the buffer as the source allows.  A partial sample at the end of the
	// source is dropped
	fn buffer_samples(&mut self) -> Result<(), &'static str> {
		self.buffer_valid_len = 0;
		self.buffer_idx = 0;

		while self.buffer_valid_len < BUFFER_SIZE {
			let re = match read_component(&mut self.src)? { Some(x) => x, None => break };
			let im = match read_component(&mut self.src)? { Some(x) => x, None => break };
			self.buffer[self.buffer_valid_len] = Complex{ re: re as f64, im: im as f64 };
			self.buffer_valid_len += 1;
		}

		Ok(())
	}

}

impl<S: Read> Iterator for BufferedSource<S> {
	type Item = Sample;

	fn next(&mut self) -> Option<Sample> {
		if self.buffer_idx >= self.buffer_valid_len {
			if self.err.is_some() {
				return None;
			}

			// If we've run out of buffer, then buffer new samples; reading zero new samples means we're done.
			// Samples read before an error are still handed out
			if let Err(e) = self.buffer_samples() {
				self.err = Some(e);
			}
			if self.buffer_valid_len == 0 {
				return None;
			}
		}

		let ans = Sample{ val: self.buffer[self.buffer_idx], idx: self.idx };
		self.idx += 1;
		self.buffer_idx += 1;
		Some(ans)
	}
}

fn read_component<S: Read>(src:&mut S) -> Result<Option<i16>, &'static str> {
	match src.read_i16::<LittleEndian>() {
		Ok(x) => Ok(Some(x)),
		Err(e) if e.kind() == ErrorKind::UnexpectedEof => Ok(None),
		Err(_) => Err("Unable to read from file"),
	}
}

// Interleaved little-endian f32 I/Q pairs
pub fn write_samples<W: Write>(dst:&mut W, samples:&[Complex<f64>]) -> Result<(), &'static str> {
	for s in samples {
		dst.write_f32::<LittleEndian>(s.re as f32).map_err(|_| "Unable to write sample")?;
		dst.write_f32::<LittleEndian>(s.im as f32).map_err(|_| "Unable to write sample")?;
	}
	Ok(())
}

#[cfg(test)]
mod tests {

	use std::io::{self, Cursor, Read};

	use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
	use num_complex::Complex;

	use super::{BufferedSource, BUFFER_SIZE, write_samples};

	#[test]
	fn reads_iq_pairs_across_buffer_boundaries() {
		let n = BUFFER_SIZE + 10;
		let mut bytes:Vec<u8> = vec![];
		for k in 0..n {
			bytes.write_i16::<LittleEndian>(k as i16).unwrap();
			bytes.write_i16::<LittleEndian>(-(k as i16)).unwrap();
		}
		// Half a sample at the end is ignored
		bytes.write_i16::<LittleEndian>(7).unwrap();

		let mut src = BufferedSource::new(Cursor::new(bytes));
		let samples:Vec<_> = src.by_ref().collect();
		assert_eq!(src.error(), None);
		assert_eq!(samples.len(), n);
		for (k, s) in samples.iter().enumerate() {
			assert_eq!(s.idx, k);
			assert_eq!(s.val, Complex{ re: k as f64, im: -(k as f64) });
		}
	}

	// Hands out its bytes, then fails instead of reporting the end of the data
	struct FailingReader {
		bytes: Cursor<Vec<u8>>,
	}

	impl Read for FailingReader {
		fn read(&mut self, buf:&mut [u8]) -> io::Result<usize> {
			match self.bytes.read(buf)? {
				0 => Err(io::Error::new(io::ErrorKind::Other, "device went away")),
				n => Ok(n),
			}
		}
	}

	#[test]
	fn read_errors_are_not_the_end_of_the_source() {
		let mut bytes:Vec<u8> = vec![];
		for k in 0..3 {
			bytes.write_i16::<LittleEndian>(k).unwrap();
			bytes.write_i16::<LittleEndian>(10*k).unwrap();
		}

		let mut src = BufferedSource::new(FailingReader{ bytes: Cursor::new(bytes) });
		let samples:Vec<_> = src.by_ref().map(|s| s.val).collect();
		assert_eq!(samples, vec![Complex{ re: 0.0, im: 0.0 }, Complex{ re: 1.0, im: 10.0 }, Complex{ re: 2.0, im: 20.0 }]);
		assert_eq!(src.error(), Some("Unable to read from file"));

		// It stays finished rather than reading from the failed source again
		assert!(src.next().is_none());
	}

	#[test]
	fn writes_f32_pairs() {
		let mut out:Vec<u8> = vec![];
		write_samples(&mut out, &[Complex{ re: 1.5, im: -2.0 }, Complex{ re: 0.25, im: 8.0 }]).unwrap();
		assert_eq!(out.len(), 16);

		let mut rdr = Cursor::new(out);
		let vals:Vec<f32> = (0..4).map(|_| rdr.read_f32::<LittleEndian>().unwrap()).collect();
		assert_eq!(vals, vec![1.5, -2.0, 0.25, 8.0]);
	}

}
