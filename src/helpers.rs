use crate::header::raw::BLOCK_LEN;


/// Block arithmetic for byte counts inside a tar stream
pub trait U64Ext: Sized {
	/// Ceils `self` to the next integer multiple of the block size or returns `None` on overflow
	fn block_ceiling(&self) -> Option<Self>;
	/// The amount of zero bytes needed to pad `self` to the next block boundary
	fn block_padding(&self) -> Self;
}
impl U64Ext for u64 {
	fn block_ceiling(&self) -> Option<Self> {
		match *self % BLOCK_LEN as u64 {
			0 => Some(*self),
			r => self.checked_add(BLOCK_LEN as u64 - r)
		}
	}
	fn block_padding(&self) -> Self {
		match *self % BLOCK_LEN as u64 {
			0 => 0,
			r => BLOCK_LEN as u64 - r
		}
	}
}
