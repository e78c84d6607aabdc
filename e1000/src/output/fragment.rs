//! Payload chunking.

use crate::regs::MAX_FRAME_SIZE;

/// Split `payload` into consecutive frames of at most [`MAX_FRAME_SIZE`]
/// bytes. Only the last chunk may be shorter; an empty payload yields
/// nothing.
pub fn fragments(payload: &[u8]) -> core::slice::Chunks<'_, u8> {
    payload.chunks(MAX_FRAME_SIZE)
}

/// Number of frames [`fragments`] produces for `len` bytes.
pub const fn fragment_count(len: usize) -> usize {
    (len + MAX_FRAME_SIZE - 1) / MAX_FRAME_SIZE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_and_a_half_frames() {
        let payload = [0u8; MAX_FRAME_SIZE * 5 / 2];
        let lens: std::vec::Vec<usize> = fragments(&payload).map(<[u8]>::len).collect();
        assert_eq!(lens, [MAX_FRAME_SIZE, MAX_FRAME_SIZE, MAX_FRAME_SIZE / 2]);
        assert_eq!(fragment_count(payload.len()), 3);
    }

    #[test]
    fn test_boundaries() {
        assert_eq!(fragments(&[]).count(), 0);
        assert_eq!(fragment_count(0), 0);
        assert_eq!(fragment_count(1), 1);
        assert_eq!(fragment_count(MAX_FRAME_SIZE), 1);
        assert_eq!(fragment_count(MAX_FRAME_SIZE + 1), 2);

        let payload: std::vec::Vec<u8> = (0..=255u8).cycle().take(MAX_FRAME_SIZE + 1).collect();
        let chunks: std::vec::Vec<&[u8]> = fragments(&payload).collect();
        assert_eq!(chunks[1], &payload[MAX_FRAME_SIZE..]);
        assert_eq!(chunks.concat(), payload);
    }
}
