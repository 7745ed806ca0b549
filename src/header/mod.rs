pub mod raw;

use crate::{
	TarStreamError,
	header::raw::{ BLOCK_LEN, Checksum, TypeFlag }
};
use std::fmt::{ self, Debug, Formatter };
use zerocopy::{ FromZeros, IntoBytes };


/// The recognized header formats, identified by their (magic, version) pair
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Format {
	/// POSIX.1-1988 headers carry neither magic nor version
	Posix1,
	/// POSIX.1-2001 USTAR headers (`"ustar\0"`, `"00"`)
	Ustar,
	/// GNU tar headers (`"ustar "`, `" \0"`)
	Gnu
}
impl Format {
	/// The magic as NUL-terminated string
	pub const fn magic(self) -> &'static [u8] {
		match self {
			Self::Posix1 => b"",
			Self::Ustar => b"ustar",
			Self::Gnu => b"ustar "
		}
	}
	/// The version as NUL-terminated string
	pub const fn version(self) -> &'static [u8] {
		match self {
			Self::Posix1 => b"",
			Self::Ustar => b"00",
			Self::Gnu => b" "
		}
	}

	/// Detects the format from the raw magic and version fields
	pub fn detect(magic: &[u8], version: &[u8]) -> Option<Self> {
		let (magic, version) = (raw::from_text_field(magic), raw::from_text_field(version));
		[Self::Posix1, Self::Ustar, Self::Gnu].into_iter()
			.find(|format| format.magic() == magic && format.version() == version)
	}
}


/// The type of an archive entry
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum EntryType {
	NormalFile,
	HardLink,
	SymLink,
	CharacterDevice,
	BlockDevice,
	Directory,
	Fifo,
	Contiguous,
	ExtendedHeader,
	GlobalExtendedHeader,
	GnuLongName,
	GnuLongLink,
	/// Any type flag without a dedicated variant
	Other(u8)
}
impl EntryType {
	/// Maps a raw type flag to the entry type
	pub const fn from_flag(flag: u8) -> Self {
		match flag {
			TypeFlag::REGULAR | TypeFlag::REGULAR_OLD => Self::NormalFile,
			TypeFlag::HARDLINK => Self::HardLink,
			TypeFlag::SYMLINK => Self::SymLink,
			TypeFlag::CHAR_DEV => Self::CharacterDevice,
			TypeFlag::BLOCK_DEV => Self::BlockDevice,
			TypeFlag::DIRECTORY => Self::Directory,
			TypeFlag::FIFO_NODE => Self::Fifo,
			TypeFlag::CONTIGUOUS => Self::Contiguous,
			TypeFlag::PAX_SINGLE => Self::ExtendedHeader,
			TypeFlag::PAX_GLOBAL => Self::GlobalExtendedHeader,
			TypeFlag::GNU_LONG_NAME => Self::GnuLongName,
			TypeFlag::GNU_LONG_LINK => Self::GnuLongLink,
			other => Self::Other(other)
		}
	}
	/// The raw type flag for the entry type
	pub const fn flag(self) -> u8 {
		match self {
			Self::NormalFile => TypeFlag::REGULAR,
			Self::HardLink => TypeFlag::HARDLINK,
			Self::SymLink => TypeFlag::SYMLINK,
			Self::CharacterDevice => TypeFlag::CHAR_DEV,
			Self::BlockDevice => TypeFlag::BLOCK_DEV,
			Self::Directory => TypeFlag::DIRECTORY,
			Self::Fifo => TypeFlag::FIFO_NODE,
			Self::Contiguous => TypeFlag::CONTIGUOUS,
			Self::ExtendedHeader => TypeFlag::PAX_SINGLE,
			Self::GlobalExtendedHeader => TypeFlag::PAX_GLOBAL,
			Self::GnuLongName => TypeFlag::GNU_LONG_NAME,
			Self::GnuLongLink => TypeFlag::GNU_LONG_LINK,
			Self::Other(flag) => flag
		}
	}
}


/// A single 512-byte header block
///
/// The record is a thin typed view over the raw block: getters decode on demand and never fail
/// for fields that are not requested, so an undecodable size does not prevent inspecting the
/// checksum or the path.
#[derive(Clone, Eq, PartialEq)]
pub struct HeaderRecord {
	raw: raw::Header
}
impl HeaderRecord {
	/// Creates an all-zero record with the magic and version of `format`
	pub fn new(format: Format) -> Self {
		let mut record = Self::zeroed();
		record.set_format(format);
		record
	}
	/// Creates an all-zero record
	pub(crate) fn zeroed() -> Self {
		Self { raw: raw::Header::new_zeroed() }
	}
	/// Creates a record from a raw block
	pub fn from_bytes(block: [u8; BLOCK_LEN]) -> Self {
		let mut record = Self::zeroed();
		record.as_mut_bytes().copy_from_slice(&block);
		record
	}

	/// The raw block
	pub fn as_bytes(&self) -> &[u8] {
		self.raw.as_bytes()
	}
	/// The raw block
	pub(crate) fn as_mut_bytes(&mut self) -> &mut[u8] {
		self.raw.as_mut_bytes()
	}

	/// The header format or `None` if the magic/version pair is not recognized
	pub fn format(&self) -> Option<Format> {
		Format::detect(&self.raw.magic, &self.raw.version)
	}
	/// The declared size of the entry content
	pub fn size(&self) -> Result<u64, TarStreamError> {
		raw::from_numeric_field(&self.raw.size)
	}
	/// The checksum computed over the block
	pub fn checksum(&self) -> u64 {
		Checksum::compute(&self.raw)
	}
	/// The checksum as stored in the block
	pub fn expected_checksum(&self) -> Result<u64, TarStreamError> {
		raw::from_numeric_field(&self.raw.checksum)
	}
	/// Whether the format is recognized and the stored checksum matches the block
	///
	/// POSIX.1-1988 headers carry no magic, so the checksum is what tells them apart from zero
	/// blocks and garbage. The checksum field must be in canonical form; see [`Checksum::matches`].
	pub fn is_valid(&self) -> bool {
		self.format().is_some() && Checksum::matches(&self.raw)
	}

	/// The raw type flag
	pub fn type_flag(&self) -> u8 {
		self.raw.typeflag[0]
	}
	/// The entry type
	pub fn entry_type(&self) -> EntryType {
		EntryType::from_flag(self.type_flag())
	}
	/// The entry path; USTAR headers join the prefix field with the name field
	pub fn path(&self) -> Result<String, TarStreamError> {
		let name = raw::from_string_field(&self.raw.name)?.unwrap_or_default();
		let prefix = match self.format() {
			Some(Format::Ustar) => raw::from_string_field(&self.raw.prefix)?,
			_ => None
		};
		match prefix {
			Some(prefix) => Ok(format!("{}/{}", prefix, name)),
			None => Ok(name)
		}
	}
	/// The link target if any
	pub fn link_target(&self) -> Result<Option<String>, TarStreamError> {
		raw::from_string_field(&self.raw.linkname)
	}
	/// The access mode bits (e.g. `0o755`)
	pub fn mode(&self) -> Result<u32, TarStreamError> {
		let mode = raw::from_numeric_field(&self.raw.mode)?;
		u32::try_from(mode).map_err(|_| TarStreamError::InvalidData("Mode is out of range"))
	}
	/// The owner's UID
	pub fn uid(&self) -> Result<u64, TarStreamError> {
		raw::from_numeric_field(&self.raw.uid)
	}
	/// The owner's GID
	pub fn gid(&self) -> Result<u64, TarStreamError> {
		raw::from_numeric_field(&self.raw.gid)
	}
	/// The modification time in seconds since the UNIX epoch
	pub fn mtime(&self) -> Result<u64, TarStreamError> {
		raw::from_numeric_field(&self.raw.mtime)
	}
	/// The owner's user name if any
	pub fn user_name(&self) -> Result<Option<String>, TarStreamError> {
		raw::from_string_field(&self.raw.uname)
	}
	/// The owner's group name if any
	pub fn group_name(&self) -> Result<Option<String>, TarStreamError> {
		raw::from_string_field(&self.raw.gname)
	}

	/// Sets the magic and version of `format`
	pub fn set_format(&mut self, format: Format) {
		let (magic, version) = (format.magic(), format.version());
		self.raw.magic = [0; 6];
		self.raw.magic[..magic.len()].copy_from_slice(magic);
		self.raw.version = [0; 2];
		self.raw.version[..version.len()].copy_from_slice(version);
	}
	/// Sets the entry path
	///
	/// _Note: only USTAR headers can hold paths longer than 100 bytes; they are split at a `/`
	/// into prefix and name_
	pub fn set_path(&mut self, path: &str) -> Result<(), TarStreamError> {
		let path = path.as_bytes();
		if path.len() <= self.raw.name.len() {
			raw::into_text_field(b"", &mut self.raw.prefix)?;
			return raw::into_text_field(path, &mut self.raw.name);
		}
		if self.format() != Some(Format::Ustar) {
			Err(TarStreamError::Unsupported("Path is too long for the header format"))?
		}

		// Find the first separator that leaves a short enough name; a trailing separator stays in
		// the name so directories keep it there
		let min_split = path.len() - self.raw.name.len() - 1;
		let split = path.iter().enumerate().take(path.len() - 1).skip(min_split)
			.find(|(_, b)| **b == b'/')
			.map(|(split, _)| split)
			.filter(|split| *split > 0 && *split <= self.raw.prefix.len())
			.ok_or(TarStreamError::Unsupported("Path cannot be split into prefix and name"))?;
		raw::into_text_field(&path[..split], &mut self.raw.prefix)?;
		raw::into_text_field(&path[split + 1..], &mut self.raw.name)
	}
	/// Sets the link target
	pub fn set_link_target(&mut self, target: &str) -> Result<(), TarStreamError> {
		raw::into_text_field(target.as_bytes(), &mut self.raw.linkname)
	}
	/// Sets the access mode bits
	pub fn set_mode(&mut self, mode: u32) -> Result<(), TarStreamError> {
		raw::into_octal_field(mode as u64, &mut self.raw.mode)
	}
	/// Sets the owner's UID
	pub fn set_uid(&mut self, uid: u64) -> Result<(), TarStreamError> {
		raw::into_octal_field(uid, &mut self.raw.uid)
	}
	/// Sets the owner's GID
	pub fn set_gid(&mut self, gid: u64) -> Result<(), TarStreamError> {
		raw::into_octal_field(gid, &mut self.raw.gid)
	}
	/// Sets the modification time
	pub fn set_mtime(&mut self, mtime: u64) -> Result<(), TarStreamError> {
		raw::into_octal_field(mtime, &mut self.raw.mtime)
	}
	/// Sets the declared content size; GNU headers fall back to base-256 for large sizes
	pub fn set_size(&mut self, size: u64) -> Result<(), TarStreamError> {
		match raw::into_octal_field(size, &mut self.raw.size) {
			Err(_) if self.format() == Some(Format::Gnu) => {
				raw::into_base256_field(size, &mut self.raw.size);
				Ok(())
			},
			result => result
		}
	}
	/// Sets the entry type
	pub fn set_entry_type(&mut self, entry_type: EntryType) {
		self.raw.typeflag[0] = entry_type.flag();
	}
	/// Computes the checksum and stores it in the block
	pub fn write_checksum(&mut self) {
		Checksum::write(&mut self.raw)
	}
}
impl Debug for HeaderRecord {
	fn fmt(&self, f: &mut Formatter) -> fmt::Result {
		f.debug_struct("HeaderRecord")
			.field("format", &self.format())
			.field("entry_type", &self.entry_type())
			.field("path", &String::from_utf8_lossy(raw::from_text_field(&self.raw.name)))
			.field("size", &self.size().ok())
			.field("valid", &self.is_valid())
			.finish()
	}
}
