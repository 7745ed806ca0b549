//! Archive fixtures built and parsed byte by byte, independent of the crate under test
#![allow(dead_code)]

pub const BLOCK_LEN: usize = 512;


/// Builds a header block by hand
pub struct RawHeader {
	pub name: &'static str,
	pub size: u64,
	pub typeflag: u8,
	pub magic: &'static [u8],
	pub version: &'static [u8],
	pub prefix: &'static str
}
impl RawHeader {
	/// A USTAR regular file header
	pub fn ustar(name: &'static str, size: u64) -> Self {
		Self { name, size, typeflag: b'0', magic: b"ustar\0", version: b"00", prefix: "" }
	}
	/// A POSIX.1-1988 regular file header without magic
	pub fn posix1(name: &'static str, size: u64) -> Self {
		Self { name, size, typeflag: b'0', magic: &[0; 6], version: &[0; 2], prefix: "" }
	}

	/// Serializes the header and computes a valid checksum
	pub fn block(&self) -> [u8; BLOCK_LEN] {
		let mut block = [0; BLOCK_LEN];
		block[..self.name.len()].copy_from_slice(self.name.as_bytes());
		block[100..108].copy_from_slice(b"0000644\0");
		block[108..116].copy_from_slice(b"0001750\0");
		block[116..124].copy_from_slice(b"0001750\0");
		block[124..136].copy_from_slice(format!("{:011o}\0", self.size).as_bytes());
		block[136..148].copy_from_slice(b"14210756016\0");
		block[156] = self.typeflag;
		block[257..263].copy_from_slice(self.magic);
		block[263..265].copy_from_slice(self.version);
		block[345..345 + self.prefix.len()].copy_from_slice(self.prefix.as_bytes());

		let checksum = checksum(&block);
		block[148..156].copy_from_slice(format!("{:06o}\0 ", checksum).as_bytes());
		block
	}
}


/// Computes the tar checksum with the checksum field counted as spaces
pub fn checksum(block: &[u8]) -> u64 {
	block.iter().enumerate()
		.map(|(i, b)| match i {
			148..=155 => b' ' as u64,
			_ => *b as u64
		})
		.sum()
}

/// Concatenates header blocks and padded contents and appends the end-of-archive marker
pub fn archive(entries: &[(&RawHeader, &[u8])]) -> Vec<u8> {
	let mut archive = Vec::new();
	for (header, content) in entries {
		archive.extend_from_slice(&header.block());
		archive.extend_from_slice(content);
		archive.resize(archive.len() + padding(content.len()), 0);
	}
	archive.resize(archive.len() + 2 * BLOCK_LEN, 0);
	archive
}

/// The amount of zero bytes that pad `len` to a block boundary
pub fn padding(len: usize) -> usize {
	(BLOCK_LEN - len % BLOCK_LEN) % BLOCK_LEN
}

/// Walks the archive and returns every header block up to the first all-zero block
pub fn header_blocks(archive: &[u8]) -> Vec<&[u8]> {
	let mut headers = Vec::new();
	let mut offset = 0;
	while offset + BLOCK_LEN <= archive.len() {
		let block = &archive[offset..offset + BLOCK_LEN];
		if block.iter().all(|b| *b == 0) {
			break;
		}

		// Decode the size field by hand
		let size = block[124..136].iter()
			.take_while(|b| (b'0'..=b'7').contains(*b))
			.fold(0usize, |size, b| size * 8 + (b - b'0') as usize);
		headers.push(block);
		offset += BLOCK_LEN + size + padding(size);
	}
	headers
}
