mod archive;

use archive::{ BLOCK_LEN, RawHeader };
use proptest::prelude::*;
use std::io::Read;
use tar_stream::{ ArchiveReader, ArchiveWriter, EntryType, Format, HeaderRecord, TarStreamError };


/// An archive with one file entry `"file"` of `content` followed by `"next"`
fn two_files(content: &[u8]) -> Vec<u8> {
	archive::archive(&[
		(&RawHeader::ustar("file", content.len() as u64), content),
		(&RawHeader::ustar("next", 3), b"abc")
	])
}


#[test]
fn hand_built_ustar_archive() {
	let archive = two_files(b"hello");
	let mut reader = ArchiveReader::new(archive.as_slice());

	let header = reader.current_header().unwrap();
	assert_eq!(header.format(), Some(Format::Ustar));
	assert_eq!(header.uid().unwrap(), 0o1750);
	assert_eq!(header.mtime().unwrap(), 0o14210756016);
	assert_eq!(header.checksum(), header.expected_checksum().unwrap());

	let mut content = String::new();
	reader.file_contents().read_to_string(&mut content).unwrap();
	assert_eq!(content, "hello");

	reader.advance().unwrap();
	assert_eq!(reader.generation(), 1);
	assert_eq!(reader.current_header().unwrap().path().unwrap(), "next");
}

#[test]
fn posix1_headers_are_accepted() {
	let archive = archive::archive(&[(&RawHeader::posix1("old", 4), b"data")]);
	let mut reader = ArchiveReader::new(archive.as_slice());

	assert!(reader.is_valid());
	let header = reader.current_header().unwrap();
	assert_eq!(header.format(), Some(Format::Posix1));
	assert_eq!(header.entry_type(), EntryType::NormalFile);

	reader.advance().unwrap();
	assert!(reader.is_finished());
}

#[test]
fn ustar_prefix_is_joined() {
	let header = RawHeader { prefix: "some/long/prefix", ..RawHeader::ustar("name.txt", 0) };
	let archive = archive::archive(&[(&header, b"")]);
	let reader = ArchiveReader::new(archive.as_slice());
	assert_eq!(reader.current_header().unwrap().path().unwrap(), "some/long/prefix/name.txt");
}

#[test]
fn empty_stream_is_finished() {
	let mut reader = ArchiveReader::new(&b""[..]);
	assert!(reader.is_finished());
	assert!(reader.current_header().is_none());
	assert!(matches!(reader.advance(), Err(TarStreamError::Finished)));
}

#[test]
fn truncated_first_header_is_finished() {
	let archive = two_files(b"x");
	let reader = ArchiveReader::new(&archive[..100]);
	assert!(reader.is_finished());
}

#[test]
fn missing_end_marker_reports_header_read() {
	let archive = two_files(b"abc");
	let without_marker = &archive[..archive.len() - 2 * BLOCK_LEN];

	let mut reader = ArchiveReader::new(without_marker);
	reader.advance().unwrap();
	match reader.advance() {
		Err(TarStreamError::HeaderRead { read: 0, .. }) => (),
		result => panic!("Unexpected result: {:?}", result)
	}
	assert!(reader.is_finished());
}

#[test]
fn truncated_header_reports_partial_read() {
	let archive = two_files(b"abc");
	let truncated = &archive[..2 * BLOCK_LEN + 100];

	let mut reader = ArchiveReader::new(truncated);
	match reader.advance() {
		Err(TarStreamError::HeaderRead { read: 100, .. }) => (),
		result => panic!("Unexpected result: {:?}", result)
	}
	assert!(reader.is_finished());
}

#[test]
fn truncated_content_finishes_reader() {
	let archive = two_files(&[9; 600]);
	let mut reader = ArchiveReader::new(&archive[..BLOCK_LEN + 300]);
	assert!(matches!(reader.advance(), Err(TarStreamError::Io(_))));
	assert!(reader.is_finished());
}

#[test]
fn undecodable_size_keeps_reader_open() {
	let mut archive = two_files(b"abc");

	// Corrupt the size digits and fix the checksum again
	archive[124..136].copy_from_slice(b"0000000009x\0");
	let checksum = archive::checksum(&archive[..BLOCK_LEN]);
	archive[148..156].copy_from_slice(format!("{:06o}\0 ", checksum).as_bytes());

	let mut reader = ArchiveReader::new(archive.as_slice());
	assert!(reader.is_valid());
	assert!(reader.current_header().unwrap().size().is_err());

	// Content reads fail closed
	let mut contents = reader.file_contents();
	assert_eq!(contents.read(&mut [0; 16]).unwrap(), 0);
	assert!(contents.unreliable_eof());

	assert!(matches!(reader.advance(), Err(TarStreamError::InvalidData(_))));
	assert!(!reader.is_finished());
	assert_eq!(reader.generation(), 1);
}

#[test]
fn discard_exactly_remaining() {
	let archive = two_files(&[5; 100]);
	let reader = ArchiveReader::new(archive.as_slice());

	let mut contents = reader.file_contents();
	contents.discard_or_error(60).unwrap();
	assert!(!contents.unreliable_eof());
	contents.discard_or_error(40).unwrap();
	assert!(contents.unreliable_eof());
	assert_eq!(contents.remaining(), 0);
}

#[test]
fn discard_past_end_consumes_nothing() {
	let archive = two_files(&[5; 100]);
	let reader = ArchiveReader::new(archive.as_slice());

	let mut contents = reader.file_contents();
	match contents.discard_or_error(101) {
		Err(TarStreamError::OutOfBounds { requested: 101, remaining: 100 }) => (),
		result => panic!("Unexpected result: {:?}", result)
	}

	// Nothing was consumed
	let mut content = Vec::new();
	contents.read_to_end(&mut content).unwrap();
	assert_eq!(content, [5; 100]);
}

#[test]
fn reads_stop_at_entry_end() {
	let archive = two_files(b"12345");
	let reader = ArchiveReader::new(archive.as_slice());

	let mut contents = reader.file_contents();
	let mut buf = [0; 64];
	assert_eq!(contents.read(&mut buf).unwrap(), 5);
	assert_eq!(&buf[..5], b"12345");
	assert_eq!(contents.read(&mut buf).unwrap(), 0);
	assert!(contents.unreliable_eof());
}

#[test]
fn short_read_or_error_is_sticky() {
	let archive = two_files(b"12345");
	let reader = ArchiveReader::new(archive.as_slice());

	let mut contents = reader.file_contents();
	match contents.read_or_error(&mut [0; 8]) {
		Err(TarStreamError::ShortRead { expected: 8, read: 5 }) => (),
		result => panic!("Unexpected result: {:?}", result)
	}
	assert!(contents.read_or_error(&mut []).is_ok());
	assert!(contents.read_or_error(&mut [0; 1]).is_err());
}

#[test]
fn fresh_reader_after_advance_is_usable() {
	let archive = two_files(b"first");
	let mut reader = ArchiveReader::new(archive.as_slice());
	let _stale = reader.file_contents();
	reader.advance().unwrap();

	let mut content = Vec::new();
	reader.file_contents().read_to_end(&mut content).unwrap();
	assert_eq!(content, b"abc");
}

#[test]
#[should_panic(expected = "Entry reader used after its archive advanced")]
fn stale_reader_read_panics() {
	let archive = two_files(b"first");
	let mut reader = ArchiveReader::new(archive.as_slice());
	let mut contents = reader.file_contents();
	reader.advance().unwrap();

	let _ = contents.read(&mut [0; 4]);
}

#[test]
#[should_panic(expected = "Entry reader used after its archive advanced")]
fn stale_reader_discard_panics() {
	let archive = two_files(b"first");
	let mut reader = ArchiveReader::new(archive.as_slice());
	let mut contents = reader.file_contents();
	reader.advance().unwrap();

	let _ = contents.discard_or_error(1);
}

#[test]
#[should_panic(expected = "Entry reader used after its archive advanced")]
fn stale_reader_eof_panics() {
	let archive = two_files(b"first");
	let mut reader = ArchiveReader::new(archive.as_slice());
	let contents = reader.file_contents();
	reader.advance().unwrap();

	contents.unreliable_eof();
}

#[test]
#[should_panic(expected = "Entry reader used after its archive advanced")]
fn reader_is_stale_after_failed_advance() {
	let archive = two_files(b"abc");
	let mut reader = ArchiveReader::new(&archive[..2 * BLOCK_LEN + 100]);
	let contents = reader.file_contents();
	assert!(reader.advance().is_err());

	contents.remaining();
}

#[test]
#[should_panic(expected = "Requested entry content from a finished archive stream")]
fn content_of_finished_archive_panics() {
	let reader = ArchiveReader::new(&[0; 2 * BLOCK_LEN][..]);
	assert!(reader.is_finished());
	reader.file_contents();
}


#[test]
fn lenient_checksum_spellings_are_invalid() {
	// Leading space, NUL and space swapped, or both terminators NUL
	for (index, value) in [(148, b' '), (154, b' '), (155, 0)] {
		let mut block = written_header();
		block[index] = value;
		assert!(!HeaderRecord::from_bytes(block).is_valid(), "byte {} set to {}", index, value);
	}
}

#[test]
fn posix_checksum_form_is_valid() {
	let mut block = written_header();
	let checksum = archive::checksum(&block);
	block[148..156].copy_from_slice(format!("{:07o}\0", checksum).as_bytes());
	assert!(HeaderRecord::from_bytes(block).is_valid());
}


/// A single valid GNU header as written by the archive writer
fn written_header() -> [u8; BLOCK_LEN] {
	let mut writer = ArchiveWriter::new(Vec::new());
	writer.add_link("some/link", 0o777, "target").unwrap();
	let mut block = [0; BLOCK_LEN];
	block.copy_from_slice(&writer.into_inner());
	block
}

proptest! {
	#[test]
	fn changed_header_byte_is_invalid(index in 0..BLOCK_LEN, value in any::<u8>()) {
		let mut block = written_header();
		prop_assert!(HeaderRecord::from_bytes(block).is_valid());
		prop_assume!(block[index] != value);

		block[index] = value;
		prop_assert!(!HeaderRecord::from_bytes(block).is_valid());

		// The reader treats the flipped header as end of the archive
		let mut archive = block.to_vec();
		archive.resize(3 * BLOCK_LEN, 0);
		let reader = ArchiveReader::new(archive.as_slice());
		prop_assert!(!reader.is_valid());
		prop_assert!(reader.is_finished());
	}
}
