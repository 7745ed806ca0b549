//! Fault-tracking adapters over `std::io` that the archive reader and writer drive
//!
//! Both adapters never return `io::Error`s directly; instead a failing call records the error as
//! the stream's fault and reports a short count or `false`. The owner decides when to inspect the
//! fault with `has_any_error` and when to acknowledge it with `handle_any_error`.

use crate::header::raw::BLOCK_LEN;
use std::{
	cmp::min,
	io::{
		self, BufRead, Read, Write,
		ErrorKind::{ Interrupted, UnexpectedEof, WriteZero }
	}
};


/// A byte source with a sticky fault slot
#[derive(Debug)]
pub struct InputStream<R> {
	inner: R,
	fault: Option<io::Error>
}
impl<R: BufRead> InputStream<R> {
	/// Wraps `inner`
	pub fn new(inner: R) -> Self {
		Self { inner, fault: None }
	}

	/// Performs a single read into `buf` and returns the amount of bytes transferred
	pub fn read(&mut self, buf: &mut[u8]) -> usize {
		loop {
			match self.inner.read(buf) {
				Err(ref e) if e.kind() == Interrupted => continue,
				Err(e) => {
					self.fault = Some(e);
					return 0
				},
				Ok(len) => return len
			}
		}
	}
	/// Reads until `buf` is full or the source is exhausted and returns the amount of bytes
	/// transferred
	///
	/// _Note: an exhausted source before `buf` is full is recorded as an `UnexpectedEof` fault_
	pub fn fill(&mut self, buf: &mut[u8]) -> usize {
		let mut filled = 0;
		'read_loop: while filled < buf.len() {
			match self.read(&mut buf[filled..]) {
				0 => break 'read_loop,
				len => filled += len
			}
		}

		// Record the shortfall unless the source already reported a fault
		if filled < buf.len() && self.fault.is_none() {
			self.fault = Some(io::Error::from(UnexpectedEof));
		}
		filled
	}
	/// Fills `buf` completely or reports `false`
	pub fn read_or_error(&mut self, buf: &mut[u8]) -> bool {
		self.fill(buf) == buf.len()
	}
	/// Skips exactly `count` bytes or reports `false`
	pub fn discard_or_error(&mut self, count: u64) -> bool {
		match io::copy(&mut self.inner.by_ref().take(count), &mut io::sink()) {
			Ok(discarded) if discarded == count => true,
			Ok(_) => {
				self.fault = Some(io::Error::from(UnexpectedEof));
				false
			},
			Err(e) => {
				self.fault = Some(e);
				false
			}
		}
	}
	/// Whether the source currently has no more buffered or readable bytes
	///
	/// _Note: a source that fails while probing is treated as exhausted and the failure is recorded
	/// as fault_
	pub fn unreliable_eof(&mut self) -> bool {
		loop {
			match self.inner.fill_buf() {
				Err(ref e) if e.kind() == Interrupted => continue,
				Err(e) => {
					self.fault = Some(e);
					return true
				},
				Ok(buf) => return buf.is_empty()
			}
		}
	}

	/// Whether a fault has been recorded and not yet handled
	pub fn has_any_error(&self) -> bool {
		self.fault.is_some()
	}
	/// Takes the recorded fault (if any) and clears it
	pub fn handle_any_error(&mut self) -> Option<io::Error> {
		self.fault.take()
	}

	/// Returns the wrapped source
	pub fn into_inner(self) -> R {
		self.inner
	}
}


/// A byte sink with a sticky fault slot
#[derive(Debug)]
pub struct OutputStream<W> {
	inner: W,
	fault: Option<io::Error>
}
impl<W: Write> OutputStream<W> {
	/// Wraps `inner`
	pub fn new(inner: W) -> Self {
		Self { inner, fault: None }
	}

	/// Performs a single write of `data` and returns the amount of bytes transferred
	pub fn write(&mut self, data: &[u8]) -> usize {
		loop {
			match self.inner.write(data) {
				Err(ref e) if e.kind() == Interrupted => continue,
				Err(e) => {
					self.fault = Some(e);
					return 0
				},
				Ok(len) => return len
			}
		}
	}
	/// Writes `data` completely or reports `false`
	pub fn write_or_error(&mut self, mut data: &[u8]) -> bool {
		'write_loop: while !data.is_empty() {
			match self.write(data) {
				0 => break 'write_loop,
				len => data = &data[len..]
			}
		}

		// Record the shortfall unless the sink already reported a fault
		if !data.is_empty() && self.fault.is_none() {
			self.fault = Some(io::Error::from(WriteZero));
		}
		data.is_empty()
	}
	/// Writes `len` zero bytes or reports `false`
	pub fn fill_or_error(&mut self, mut len: usize) -> bool {
		const ZEROS: [u8; BLOCK_LEN] = [0; BLOCK_LEN];
		while len > 0 {
			let chunk = min(len, BLOCK_LEN);
			if !self.write_or_error(&ZEROS[..chunk]) {
				return false;
			}
			len -= chunk;
		}
		true
	}
	/// Flushes the sink or reports `false`
	pub fn flush_or_error(&mut self) -> bool {
		match self.inner.flush() {
			Ok(()) => true,
			Err(e) => {
				self.fault = Some(e);
				false
			}
		}
	}

	/// Whether a fault has been recorded and not yet handled
	pub fn has_any_error(&self) -> bool {
		self.fault.is_some()
	}
	/// Takes the recorded fault (if any) and clears it
	pub fn handle_any_error(&mut self) -> Option<io::Error> {
		self.fault.take()
	}

	/// Returns the wrapped sink
	pub fn into_inner(self) -> W {
		self.inner
	}
}
