//! ## About
//! This crate provides a forward-only streaming reader and writer for tar archives. Neither side
//! buffers more than a single 512-byte block, so archives of any size can be unpacked or built
//! from any `BufRead`/`Write` stream.
//!
//! _Note: It is not intended as an high-level allround (un-)packer – there is no filesystem
//! traversal, no compression and no PAX extension support. For a high-level solution, take a look
//! at_ [`tar`](https://crates.io/crates/tar)
//!
//! ## How to read a stream
//! An [`ArchiveReader`] always points at one entry. You inspect its header, optionally read the
//! content through an [`EntryReader`] and then `advance` to the next entry. Advancing skips any
//! unread content and padding and invalidates every outstanding `EntryReader`.
//!
//! ### Example:
//! ```
//! # use std::{ error::Error, io::Read };
//! use tar_stream::{ ArchiveReader, ArchiveWriter };
//!
//! # fn main() -> Result<(), Box<dyn Error + 'static>> {
//! # let mut writer = ArchiveWriter::new(Vec::new());
//! # writer.add_file("a.txt", 0o644, b"hi")?;
//! # writer.finish()?;
//! # let archive = writer.into_inner();
//! let mut reader = ArchiveReader::new(archive.as_slice());
//! while let Some(header) = reader.current_header() {
//! 	// Read the whole content of the current entry
//! 	let mut content = Vec::new();
//! 	reader.file_contents().read_to_end(&mut content)?;
//! 	println!("{}: {} bytes", header.path()?, content.len());
//!
//! 	reader.advance()?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## How to write a stream
//! An [`ArchiveWriter`] serializes one complete entry per call and terminates the archive with two
//! zero blocks on `finish`.
//!
//! ### Example:
//! ```
//! # use std::error::Error;
//! use tar_stream::ArchiveWriter;
//!
//! # fn main() -> Result<(), Box<dyn Error + 'static>> {
//! let mut writer = ArchiveWriter::new(Vec::new());
//! writer.add_directory("docs", 0o755)?;
//! writer.add_file("docs/a.txt", 0o644, b"hi")?;
//! writer.add_link("latest", 0o777, "docs/a.txt")?;
//! writer.finish()?;
//!
//! assert_eq!(writer.into_inner().len(), 6 * 512);
//! # Ok(())
//! # }
//! ```

mod header;
mod helpers;
mod reader;
mod stream;
mod writer;

use std::io;
pub use crate::{
	header::{ EntryType, Format, HeaderRecord, raw },
	helpers::U64Ext,
	reader::{ ArchiveReader, Entries, Entry, EntryReader },
	stream::{ InputStream, OutputStream },
	writer::ArchiveWriter
};


/// A `tar_stream`-related error
#[derive(Debug, thiserror::Error)]
pub enum TarStreamError {
	/// The archive reader already reached the end of the archive
	#[error("Attempted to advance a finished archive stream")]
	Finished,
	/// The next header block could not be read completely
	///
	/// `read` is the amount of header bytes that were available; `0` means the stream ended exactly
	/// at a block boundary while anything else means the header itself is truncated
	#[error("Failed to read the header ({read} of 512 bytes available)")]
	HeaderRead {
		read: usize,
		#[source] source: io::Error
	},
	/// The tar header contains invalid data
	#[error("Invalid header data: {0}")]
	InvalidData(&'static str),
	/// The tar header field might be valid but contains an unsupported value
	#[error("Unsupported header value: {0}")]
	Unsupported(&'static str),
	/// Fewer content bytes were available than requested
	#[error("Short entry read ({read} of {expected} bytes)")]
	ShortRead {
		expected: usize,
		read: usize
	},
	/// The requested amount of bytes exceeds the remaining entry content
	#[error("Cannot discard {requested} bytes, only {remaining} remain in the entry")]
	OutOfBounds {
		requested: u64,
		remaining: u64
	},
	/// The underlying stream failed
	#[error(transparent)]
	Io(#[from] io::Error)
}
