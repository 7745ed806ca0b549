use crate::{
	TarStreamError,
	header::HeaderRecord,
	helpers::U64Ext,
	stream::InputStream
};
use std::{
	cell::{ RefCell, RefMut },
	cmp::min,
	io::{ self, BufRead, Read },
	rc::Rc
};


/// The cursor state shared between an archive reader and its entry readers
#[derive(Debug)]
struct Cursor<R> {
	stream: InputStream<R>,
	header: HeaderRecord,
	/// The amount of content bytes of the current entry that have already been consumed
	offset: u64,
	finished: bool,
	generation: u64
}
impl<R: BufRead> Cursor<R> {
	/// Reads the next header block into `self.header`
	fn read_header(&mut self) -> Result<(), TarStreamError> {
		let read = self.stream.fill(self.header.as_mut_bytes());
		if read < self.header.as_bytes().len() {
			// Acknowledge the fault so it is reported exactly once
			let source = self.stream.handle_any_error()
				.unwrap_or_else(|| io::Error::from(io::ErrorKind::UnexpectedEof));
			Err(TarStreamError::HeaderRead { read, source })?
		}
		Ok(())
	}

	/// The amount of content bytes left in the current entry
	fn remaining(&self) -> Result<u64, TarStreamError> {
		self.header.size()?.checked_sub(self.offset)
			.ok_or(TarStreamError::InvalidData("Entry offset exceeds the declared size"))
	}
}


/// A forward-only reader over the entries of a tar archive
///
/// The reader always points at one entry (or is finished). Content is read through an
/// [`EntryReader`] obtained from [`ArchiveReader::file_contents`]; every call to
/// [`ArchiveReader::advance`] invalidates all entry readers handed out before.
#[derive(Debug)]
pub struct ArchiveReader<R> {
	cursor: Rc<RefCell<Cursor<R>>>
}
impl<R: BufRead> ArchiveReader<R> {
	/// Wraps `stream` and reads the first header
	///
	/// _Note: a stream that cannot provide a complete and valid first header yields an already
	/// finished reader_
	pub fn new(stream: R) -> Self {
		let mut cursor = Cursor {
			stream: InputStream::new(stream), header: HeaderRecord::zeroed(),
			offset: 0, finished: false, generation: 0
		};
		match cursor.read_header() {
			Err(TarStreamError::HeaderRead { read: 0, .. }) => {
				log::debug!("Archive stream is empty");
				cursor.finished = true;
			},
			Err(e) => {
				log::warn!("Archive stream ended inside the first header: {}", e);
				cursor.finished = true;
			},
			Ok(()) if !cursor.header.is_valid() => {
				log::debug!("Archive stream contains no entries");
				cursor.finished = true;
			},
			Ok(()) => ()
		}
		Self { cursor: Rc::new(RefCell::new(cursor)) }
	}

	/// The header of the current entry or `None` if the reader is finished
	pub fn current_header(&self) -> Option<HeaderRecord> {
		let cursor = self.cursor.borrow();
		match cursor.finished {
			true => None,
			false => Some(cursor.header.clone())
		}
	}
	/// Whether the current header has a recognized format and a matching checksum
	pub fn is_valid(&self) -> bool {
		self.cursor.borrow().header.is_valid()
	}
	/// Whether the end of the archive has been reached (or the stream failed)
	pub fn is_finished(&self) -> bool {
		self.cursor.borrow().finished
	}
	/// The cursor generation, incremented on every `advance`
	pub fn generation(&self) -> u64 {
		self.cursor.borrow().generation
	}

	/// Moves to the next entry, skipping the unread content and padding of the current one
	///
	/// Reaching an invalid header (e.g. the terminating zero blocks) finishes the reader and is
	/// not an error; check [`ArchiveReader::is_finished`] afterwards.
	pub fn advance(&mut self) -> Result<(), TarStreamError> {
		let mut cursor = self.cursor.borrow_mut();
		if cursor.finished {
			Err(TarStreamError::Finished)?
		}
		cursor.generation += 1;

		// Skip the rest of the content and the padding
		let size = cursor.header.size().map_err(|e| {
			log::warn!("Cannot advance past entry with undecodable size: {}", e);
			e
		})?;
		let skip = size.block_ceiling()
			.and_then(|ceiling| ceiling.checked_sub(cursor.offset))
			.ok_or(TarStreamError::InvalidData("Entry size is out of range"))?;
		if !cursor.stream.discard_or_error(skip) {
			cursor.finished = true;
			let fault = cursor.stream.handle_any_error()
				.unwrap_or_else(|| io::Error::from(io::ErrorKind::UnexpectedEof));
			log::warn!("Archive stream ended inside entry content: {}", fault);
			Err(fault)?
		}
		cursor.offset = 0;

		// Read the next header
		if let Err(e) = cursor.read_header() {
			cursor.finished = true;
			return Err(e);
		}
		if !cursor.header.is_valid() {
			log::debug!("Reached end of archive after {} entries", cursor.generation);
			cursor.finished = true;
			return Ok(());
		}
		log::debug!("Advanced to entry {:?}", cursor.header);
		Ok(())
	}

	/// Returns a reader over the content of the current entry
	///
	/// # Panics
	/// Panics if the reader is already finished
	pub fn file_contents(&self) -> EntryReader<R> {
		let cursor = self.cursor.borrow();
		assert!(!cursor.finished, "Requested entry content from a finished archive stream");
		EntryReader { cursor: self.cursor.clone(), generation: cursor.generation, fatal: false }
	}

	/// Returns an iterator that yields the current entry and every following one
	pub fn entries(&mut self) -> Entries<'_, R> {
		Entries { reader: self, started: false, done: false }
	}
}


/// A bounded view over the content of one entry
///
/// The view is bound to the cursor generation it was created in. Once its archive reader
/// advances, every further use panics.
#[derive(Debug)]
pub struct EntryReader<R> {
	cursor: Rc<RefCell<Cursor<R>>>,
	generation: u64,
	fatal: bool
}
impl<R: BufRead> EntryReader<R> {
	/// Verifies that the archive reader has not advanced since this reader was created
	fn assert_current(&self) {
		let generation = self.cursor.borrow().generation;
		assert_eq!(generation, self.generation, "Entry reader used after its archive advanced");
	}
	/// Borrows the shared cursor after checking the generation
	fn cursor(&self) -> RefMut<'_, Cursor<R>> {
		self.assert_current();
		self.cursor.borrow_mut()
	}

	/// The amount of content bytes left in the entry (`0` if the size is undecodable)
	pub fn remaining(&self) -> u64 {
		self.cursor().remaining().unwrap_or(0)
	}

	/// Fills `buf` completely or fails; a shortfall marks this reader as failed for good
	pub fn read_or_error(&mut self, buf: &mut[u8]) -> Result<(), TarStreamError> {
		self.assert_current();

		let mut filled = 0;
		'read_loop: while filled < buf.len() {
			match self.read(&mut buf[filled..]) {
				Ok(0) => break 'read_loop,
				Ok(len) => filled += len,
				Err(e) => {
					self.fatal = true;
					Err(e)?
				}
			}
		}
		if filled < buf.len() {
			self.fatal = true;
			Err(TarStreamError::ShortRead { expected: buf.len(), read: filled })?
		}
		Ok(())
	}

	/// Skips exactly `count` content bytes
	///
	/// Fails without consuming anything if `count` exceeds the remaining content.
	pub fn discard_or_error(&mut self, count: u64) -> Result<(), TarStreamError> {
		let mut cursor = self.cursor();
		let remaining = cursor.remaining()?;
		if count > remaining {
			Err(TarStreamError::OutOfBounds { requested: count, remaining })?
		}

		cursor.offset += count;
		match cursor.stream.discard_or_error(count) {
			true => Ok(()),
			false => {
				let fault = cursor.stream.handle_any_error()
					.unwrap_or_else(|| io::Error::from(io::ErrorKind::UnexpectedEof));
				Err(fault.into())
			}
		}
	}

	/// Whether the entry content is exhausted
	///
	/// This is a hint for read loops: it is also `true` if the underlying stream has no more bytes,
	/// even though the entry claims otherwise.
	pub fn unreliable_eof(&self) -> bool {
		let mut cursor = self.cursor();
		match cursor.remaining() {
			Ok(remaining) => remaining == 0 || cursor.stream.unreliable_eof(),
			Err(_) => true
		}
	}
}
impl<R: BufRead> Read for EntryReader<R> {
	fn read(&mut self, buf: &mut[u8]) -> io::Result<usize> {
		let mut cursor = self.cursor();
		if self.fatal {
			return Ok(0);
		}
		let remaining = match cursor.remaining() {
			Ok(remaining) => remaining,
			Err(_) => return Ok(0)
		};

		// Never read past the end of the entry
		let len = usize::try_from(remaining).map_or(buf.len(), |remaining| min(remaining, buf.len()));
		let read = cursor.stream.read(&mut buf[..len]);
		cursor.offset += read as u64;
		match cursor.stream.handle_any_error() {
			Some(fault) if read == 0 => Err(fault),
			_ => Ok(read)
		}
	}
}


/// An entry yielded by [`Entries`]
#[derive(Debug)]
pub struct Entry<R> {
	/// The entry's header
	pub header: HeaderRecord,
	/// The entry's content, valid until the iterator yields the next entry
	pub contents: EntryReader<R>
}


/// An iterator over the remaining entries of an [`ArchiveReader`]
///
/// Each call to `next` advances the reader, so the previously yielded [`EntryReader`] becomes
/// unusable. The iterator stops after the first error.
#[derive(Debug)]
pub struct Entries<'a, R> {
	reader: &'a mut ArchiveReader<R>,
	started: bool,
	done: bool
}
impl<'a, R: BufRead> Iterator for Entries<'a, R> {
	type Item = Result<Entry<R>, TarStreamError>;

	fn next(&mut self) -> Option<Self::Item> {
		if self.done {
			return None;
		}

		// The first item is the entry the reader already points at
		if self.started && !self.reader.is_finished() {
			if let Err(e) = self.reader.advance() {
				self.done = true;
				return Some(Err(e));
			}
		}
		self.started = true;

		match self.reader.current_header() {
			Some(header) => Some(Ok(Entry { header, contents: self.reader.file_contents() })),
			None => {
				self.done = true;
				None
			}
		}
	}
}
