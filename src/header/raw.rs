//! The raw representation of the tar header block and its field encodings

use crate::TarStreamError;
use std::mem;
use zerocopy::{ FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned };


/// The length of a tar block
pub const BLOCK_LEN: usize = 512;


/// The 1:1-byte representation of a USTAR/GNU tar header block
#[repr(C)]
#[derive(Copy, Clone, Eq, PartialEq, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct Header {
	pub name: [u8; 100],
	pub mode: [u8; 8],
	pub uid: [u8; 8],
	pub gid: [u8; 8],
	pub size: [u8; 12],
	pub mtime: [u8; 12],
	pub checksum: [u8; 8],
	pub typeflag: [u8; 1],
	pub linkname: [u8; 100],
	pub magic: [u8; 6],
	pub version: [u8; 2],
	pub uname: [u8; 32],
	pub gname: [u8; 32],
	pub devmajor: [u8; 8],
	pub devminor: [u8; 8],
	pub prefix: [u8; 155],
	pub _pad: [u8; 12]
}
const _: () = assert!(mem::size_of::<Header>() == BLOCK_LEN);


/// The type flags which indicate the record type
pub struct TypeFlag;
impl TypeFlag {
	/// The type flag for a regular file
	pub const REGULAR: u8 = b'0';
	/// The pre-POSIX type flag for a regular file
	pub const REGULAR_OLD: u8 = 0;
	/// The type flag for a hardlink
	pub const HARDLINK: u8 = b'1';
	/// The type flag for a symlink
	pub const SYMLINK: u8 = b'2';
	/// The type flag for a character device
	pub const CHAR_DEV: u8 = b'3';
	/// The type flag for a block device
	pub const BLOCK_DEV: u8 = b'4';
	/// The type flag for a directory
	pub const DIRECTORY: u8 = b'5';
	/// The type flag for a FIFO-node (named pipe)
	pub const FIFO_NODE: u8 = b'6';
	/// The type flag for a contiguous file
	pub const CONTIGUOUS: u8 = b'7';
	/// The type flag for a pax interchange record that only affects the next file
	pub const PAX_SINGLE: u8 = b'x';
	/// The type flag for a pax interchange record that affects all subsequent files
	pub const PAX_GLOBAL: u8 = b'g';
	/// The type flag for a GNU record carrying the long name of the next file
	pub const GNU_LONG_NAME: u8 = b'L';
	/// The type flag for a GNU record carrying the long link target of the next file
	pub const GNU_LONG_LINK: u8 = b'K';
}


/// Header checksum computation
pub struct Checksum;
impl Checksum {
	/// The offset of the checksum field within the header block
	const OFFSET: usize = 148;

	/// Sums all header bytes with the checksum field itself counted as spaces
	pub fn compute(tar: &Header) -> u64 {
		let raw = tar.as_bytes();
		let checksum = &raw[Self::OFFSET..Self::OFFSET + 8];
		raw.iter().map(|b| *b as u64).sum::<u64>()
			- checksum.iter().map(|b| *b as u64).sum::<u64>()
			+ 8 * b' ' as u64
	}
	/// Whether the stored checksum field is the canonical encoding of the computed checksum
	///
	/// Only the GNU form (six digits, NUL, space) and the POSIX form (seven digits, NUL) are
	/// accepted. Two encodings of the same value never differ in a single byte, so any single-byte
	/// change to a header is detected.
	pub fn matches(tar: &Header) -> bool {
		let checksum = Self::compute(tar);
		[format!("{:06o}\0 ", checksum), format!("{:07o}\0", checksum)].iter()
			.any(|canonical| canonical.as_bytes() == tar.checksum)
	}
	/// Computes the checksum and stores it as six octal digits, NUL and space
	pub fn write(tar: &mut Header) {
		// The checksum of 512 bytes is at most 0o377000 which always fits six digits
		let digits = format!("{:06o}", Self::compute(tar));
		tar.checksum[..6].copy_from_slice(digits.as_bytes());
		tar.checksum[6] = 0;
		tar.checksum[7] = b' ';
	}
}


/// Decodes a numeric header field
///
/// Accepts leading spaces, octal digits and then only NUL or space terminators; an empty field
/// decodes to `0`. If the high bit of the first byte is set, the field is read as GNU base-256.
pub fn from_numeric_field(field: &[u8]) -> Result<u64, TarStreamError> {
	if let Some(first) = field.first().filter(|b| *b & 0x80 != 0) {
		return from_base256_field(*first, &field[1..]);
	}

	// Skip leading spaces and split digits from terminators
	let start = field.iter().position(|b| *b != b' ').unwrap_or(field.len());
	let field = &field[start..];
	let end = field.iter().position(|b| !(b'0'..=b'7').contains(b)).unwrap_or(field.len());
	let (digits, terminator) = field.split_at(end);

	if !terminator.iter().all(|b| *b == 0 || *b == b' ') {
		Err(TarStreamError::InvalidData("Invalid octal number"))?
	}
	digits.iter().try_fold(0u64, |num, digit| {
		num.checked_mul(8)
			.and_then(|num| num.checked_add((digit - b'0') as u64))
			.ok_or(TarStreamError::Unsupported("Octal number is too large"))
	})
}
fn from_base256_field(first: u8, rest: &[u8]) -> Result<u64, TarStreamError> {
	// Negative values are not meaningful for any field we decode
	if first & 0x40 != 0 {
		Err(TarStreamError::Unsupported("Negative base-256 number"))?
	}
	rest.iter().try_fold((first & 0x3f) as u64, |num, byte| {
		num.checked_mul(256)
			.map(|num| num | *byte as u64)
			.ok_or(TarStreamError::Unsupported("Base-256 number is too large"))
	})
}

/// Encodes `num` as zero-padded octal digits followed by a NUL byte
pub fn into_octal_field(num: u64, field: &mut[u8]) -> Result<(), TarStreamError> {
	let digits = field.len().checked_sub(1)
		.ok_or(TarStreamError::Unsupported("Numeric field is empty"))?;
	let octal = format!("{:0width$o}", num, width = digits);
	if octal.len() > digits {
		Err(TarStreamError::Unsupported("Value is too large for the numeric field"))?
	}

	field[..digits].copy_from_slice(octal.as_bytes());
	field[digits] = 0;
	Ok(())
}
/// Encodes `num` as GNU base-256 number
pub fn into_base256_field(mut num: u64, field: &mut[u8]) {
	for byte in field.iter_mut().rev() {
		*byte = num as u8;
		num >>= 8;
	}
	field[0] = 0x80;
}

/// Returns the bytes of a (potentially NUL-terminated) text field
pub fn from_text_field(field: &[u8]) -> &[u8] {
	let nul = field.iter().position(|b| *b == 0).unwrap_or(field.len());
	&field[..nul]
}
/// Returns the text field as UTF-8 string or `None` if it is empty
pub fn from_string_field(field: &[u8]) -> Result<Option<String>, TarStreamError> {
	match from_text_field(field) {
		[] => Ok(None),
		data => String::from_utf8(data.to_vec())
			.map(Some)
			.map_err(|_| TarStreamError::Unsupported("Header field is not UTF-8"))
	}
}
/// Writes `value` to `field` and NUL-pads the remainder
pub fn into_text_field(value: &[u8], field: &mut[u8]) -> Result<(), TarStreamError> {
	if value.len() > field.len() {
		Err(TarStreamError::Unsupported("Value is too long for the text field"))?
	}
	field[..value.len()].copy_from_slice(value);
	field[value.len()..].iter_mut().for_each(|b| *b = 0);
	Ok(())
}
