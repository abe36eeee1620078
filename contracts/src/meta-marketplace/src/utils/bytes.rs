//! Minimal big-endian parsing helpers for the opaque signature blob.

use alloy_primitives::U256;

/// Borrow the next `len` bytes, advancing `i`.
pub fn read_slice<'a>(bytes: &'a [u8], i: &mut usize, len: usize) -> Result<&'a [u8], ()> {
    let end = i.checked_add(len).ok_or(())?;
    if bytes.len() < end {
        return Err(());
    }
    let out = &bytes[*i..end];
    *i = end;
    Ok(out)
}

pub fn read_u256_be(bytes: &[u8], i: &mut usize) -> Result<U256, ()> {
    read_slice(bytes, i, 32).map(U256::from_be_slice)
}

/// Bytes not yet consumed.
pub fn remaining(bytes: &[u8], i: usize) -> usize {
    bytes.len().saturating_sub(i)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_advance_cursor() {
        let mut bytes = vec![0xaa, 0xbb];
        bytes.extend_from_slice(&U256::from(7u8).to_be_bytes::<32>());

        let mut i = 0;
        assert_eq!(read_slice(&bytes, &mut i, 2), Ok(&[0xaa, 0xbb][..]));
        assert_eq!(read_u256_be(&bytes, &mut i), Ok(U256::from(7u8)));
        assert_eq!(remaining(&bytes, i), 0);
    }

    #[test]
    fn short_reads_leave_cursor() {
        let bytes = [0u8; 31];
        let mut i = 0;
        assert!(read_u256_be(&bytes, &mut i).is_err());
        assert_eq!(i, 0);
        assert!(read_slice(&bytes, &mut i, usize::MAX).is_err());
    }
}
