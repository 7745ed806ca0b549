use crate::{
	TarStreamError,
	header::{ EntryType, Format, HeaderRecord, raw::BLOCK_LEN },
	helpers::U64Ext,
	stream::OutputStream
};
use std::{
	cmp::min,
	io::{ self, Read, Write }
};


/// A forward-only writer that serializes entries into a tar archive
///
/// Every `add_*` call writes one complete entry (header, content and padding); [`ArchiveWriter::finish`]
/// terminates the archive. Calling any method after `finish` panics, and so does calling any method
/// after an entry failed halfway, since the archive then ends inside that entry's content.
#[derive(Debug)]
pub struct ArchiveWriter<W: Write> {
	stream: OutputStream<W>,
	format: Format,
	finished: bool,
	poisoned: bool
}
impl<W: Write> ArchiveWriter<W> {
	/// Wraps `stream` and writes GNU headers
	pub fn new(stream: W) -> Self {
		Self::with_format(stream, Format::Gnu)
	}
	/// Wraps `stream` and writes headers in `format`
	pub fn with_format(stream: W, format: Format) -> Self {
		Self { stream: OutputStream::new(stream), format, finished: false, poisoned: false }
	}

	/// Adds a directory entry; the stored path always ends with a `/`
	pub fn add_directory(&mut self, path: &str, mode: u32) -> Result<(), TarStreamError> {
		assert!(!self.finished, "Attempted to add a directory to a finished archive");
		self.assert_intact();

		// Old tar implementations recognize directories by the trailing separator
		let path = match path.ends_with('/') {
			true => path.to_string(),
			false => format!("{}/", path)
		};
		let header = self.header(&path, mode, EntryType::Directory, 0, None)?;
		self.write_header(&header)
	}

	/// Adds a regular file entry with `content`
	pub fn add_file(&mut self, path: &str, mode: u32, content: &[u8]) -> Result<(), TarStreamError> {
		self.add_file_from(path, mode, content.len() as u64, content)
	}

	/// Adds a regular file entry of `size` bytes that are copied from `content`
	///
	/// _Note: if `content` cannot provide `size` bytes, the error is returned and the writer refuses
	/// any further entries_
	pub fn add_file_from(&mut self, path: &str, mode: u32, size: u64, mut content: impl Read)
		-> Result<(), TarStreamError>
	{
		assert!(!self.finished, "Attempted to add a file to a finished archive");
		self.assert_intact();
		let header = self.header(path, mode, EntryType::NormalFile, size, None)?;
		self.write_header(&header)?;

		// Copy the content block by block
		let mut chunk = [0; BLOCK_LEN];
		let mut written = 0;
		while written < size {
			let len = min(size - written, BLOCK_LEN as u64) as usize;
			if let Err(e) = content.read_exact(&mut chunk[..len]) {
				self.poisoned = true;
				Err(e)?
			}
			self.write_all(&chunk[..len])?;
			written += len as u64;
		}

		// Pad the last partial block
		self.write_zeros(written.block_padding() as usize)
	}

	/// Adds a symlink entry that points to `target`
	pub fn add_link(&mut self, path: &str, mode: u32, target: &str) -> Result<(), TarStreamError> {
		assert!(!self.finished, "Attempted to add a link to a finished archive");
		self.assert_intact();
		let header = self.header(path, mode, EntryType::SymLink, 0, Some(target))?;
		self.write_header(&header)
	}

	/// Writes the end-of-archive marker (two zero blocks) and flushes the stream
	pub fn finish(&mut self) -> Result<(), TarStreamError> {
		assert!(!self.finished, "Attempted to finish an already finished archive");
		self.assert_intact();
		self.finished = true;
		self.write_zeros(2 * BLOCK_LEN)?;
		match self.stream.flush_or_error() {
			true => Ok(()),
			false => Err(self.fault().into())
		}
	}

	/// Whether an entry failed after parts of it were written
	pub fn is_poisoned(&self) -> bool {
		self.poisoned
	}

	/// Returns the wrapped stream
	pub fn into_inner(self) -> W {
		self.stream.into_inner()
	}

	/// Builds a checksummed header
	fn header(&self, path: &str, mode: u32, entry_type: EntryType, size: u64, target: Option<&str>)
		-> Result<HeaderRecord, TarStreamError>
	{
		let mut header = HeaderRecord::new(self.format);
		header.set_path(path)?;
		header.set_entry_type(entry_type);
		header.set_mode(mode)?;
		header.set_uid(0)?;
		header.set_gid(0)?;
		header.set_mtime(0)?;
		header.set_size(size)?;
		if let Some(target) = target {
			header.set_link_target(target)?;
		}
		header.write_checksum();

		log::trace!("Writing entry {:?}", header);
		Ok(header)
	}
	/// Writes a header; it fills a whole block so no padding follows
	fn write_header(&mut self, header: &HeaderRecord) -> Result<(), TarStreamError> {
		self.write_all(header.as_bytes())
	}
	fn write_all(&mut self, data: &[u8]) -> Result<(), TarStreamError> {
		match self.stream.write_or_error(data) {
			true => Ok(()),
			false => Err(self.fault().into())
		}
	}
	fn write_zeros(&mut self, len: usize) -> Result<(), TarStreamError> {
		match self.stream.fill_or_error(len) {
			true => Ok(()),
			false => Err(self.fault().into())
		}
	}
	fn assert_intact(&self) {
		assert!(!self.poisoned, "Attempted to write to an archive left incomplete by a failed entry");
	}
	/// Takes the stream fault and refuses further writes
	fn fault(&mut self) -> io::Error {
		self.poisoned = true;
		self.stream.handle_any_error()
			.unwrap_or_else(|| io::Error::from(io::ErrorKind::WriteZero))
	}
}
