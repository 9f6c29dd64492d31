//! Reassembles secure frames from CAN chunks.

use tracing::{trace, warn};

use crate::frame::FRAME_LEN;

/// Largest data field of a classic CAN frame.
pub const MAX_CHUNK: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assembly {
    /// More chunks needed; carries the buffered length.
    Pending(usize),
    Complete([u8; FRAME_LEN]),
    /// The buffer ran past one frame and was discarded.
    Overflow,
}

#[derive(Debug, Default)]
pub struct ChunkAssembler {
    buffer: Vec<u8>,
}

impl ChunkAssembler {
    pub fn push(&mut self, chunk: &[u8]) -> Assembly {
        if chunk.len() > MAX_CHUNK {
            warn!(len = chunk.len(), "Oversized CAN chunk, resetting buffer");
            self.buffer.clear();
            return Assembly::Overflow;
        }

        self.buffer.extend_from_slice(chunk);
        trace!(buffered = self.buffer.len(), "Chunk buffered");

        match self.buffer.len() {
            n if n < FRAME_LEN => Assembly::Pending(n),
            FRAME_LEN => {
                let mut frame = [0u8; FRAME_LEN];
                frame.copy_from_slice(&self.buffer);
                self.buffer.clear();
                Assembly::Complete(frame)
            }
            n => {
                warn!(buffered = n, "Extra bytes detected, resetting buffer");
                self.buffer.clear();
                Assembly::Overflow
            }
        }
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }
}

/// Splits a frame into CAN-sized chunks.
pub fn chunk_frame(frame: &[u8; FRAME_LEN]) -> impl Iterator<Item = &[u8]> {
    frame.chunks(MAX_CHUNK)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn five_full_chunks_make_a_frame() {
        let mut assembler = ChunkAssembler::default();
        let frame: [u8; FRAME_LEN] = std::array::from_fn(|i| i as u8);

        let mut results: Vec<_> = chunk_frame(&frame).map(|c| assembler.push(c)).collect();
        assert_eq!(results.pop(), Some(Assembly::Complete(frame)));
        assert_eq!(results.last(), Some(&Assembly::Pending(32)));
        assert_eq!(assembler.buffered(), 0);
    }

    #[test]
    fn overshoot_resets() {
        let mut assembler = ChunkAssembler::default();
        for _ in 0..4 {
            assembler.push(&[0; 8]);
        }
        assert_eq!(assembler.push(&[0; 3]), Assembly::Pending(35));
        assert_eq!(assembler.push(&[0; 8]), Assembly::Overflow);
        assert_eq!(assembler.buffered(), 0);
    }

    #[test]
    fn oversized_chunk_resets() {
        let mut assembler = ChunkAssembler::default();
        assembler.push(&[0; 8]);
        assert_eq!(assembler.push(&[0; 9]), Assembly::Overflow);
        assert_eq!(assembler.buffered(), 0);
    }

    proptest! {
        #[test]
        fn any_chunking_of_exactly_forty_bytes_completes(
            sizes in proptest::collection::vec(1usize..=8, 1..40)
        ) {
            let mut assembler = ChunkAssembler::default();
            let mut total = 0;
            for size in sizes {
                let size = size.min(FRAME_LEN - total);
                if size == 0 {
                    break;
                }
                total += size;
                let result = assembler.push(&vec![0xAB; size]);
                if total == FRAME_LEN {
                    prop_assert!(matches!(result, Assembly::Complete(_)));
                } else {
                    prop_assert_eq!(result, Assembly::Pending(total));
                }
            }
        }
    }
}
