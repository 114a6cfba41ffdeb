//! FIS-B block interleaving. The six RS blocks are spread byte-column-major
//! over the transmission so burst errors land across blocks: interleaved
//! byte `k` belongs to block `k mod 6` at index `k div 6`.

use crate::{FISB_BLOCKS, FISB_BLOCK_BYTES, FISB_INTERLEAVED_BYTES};

pub fn deinterleave(interleaved: &[u8]) -> [[u8; FISB_BLOCK_BYTES]; FISB_BLOCKS] {
    debug_assert_eq!(interleaved.len(), FISB_INTERLEAVED_BYTES);
    let mut blocks = [[0u8; FISB_BLOCK_BYTES]; FISB_BLOCKS];
    for (k, &byte) in interleaved.iter().enumerate() {
        blocks[k % FISB_BLOCKS][k / FISB_BLOCKS] = byte;
    }
    blocks
}

pub fn interleave(blocks: &[[u8; FISB_BLOCK_BYTES]; FISB_BLOCKS]) -> Vec<u8> {
    let mut interleaved = vec![0u8; FISB_INTERLEAVED_BYTES];
    for (k, byte) in interleaved.iter_mut().enumerate() {
        *byte = blocks[k % FISB_BLOCKS][k / FISB_BLOCKS];
    }
    interleaved
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let mut blocks = [[0u8; FISB_BLOCK_BYTES]; FISB_BLOCKS];
        for (i, block) in blocks.iter_mut().enumerate() {
            for (j, byte) in block.iter_mut().enumerate() {
                *byte = (i * 92 + j) as u8;
            }
        }
        assert_eq!(deinterleave(&interleave(&blocks)), blocks);
    }

    #[test]
    fn test_column_major_placement() {
        let mut interleaved = vec![0u8; FISB_INTERLEAVED_BYTES];
        interleaved[0] = 0xa0;
        interleaved[5] = 0xa5;
        interleaved[6] = 0xb0;
        interleaved[551] = 0xff;
        let blocks = deinterleave(&interleaved);
        assert_eq!(blocks[0][0], 0xa0);
        assert_eq!(blocks[5][0], 0xa5);
        assert_eq!(blocks[0][1], 0xb0);
        assert_eq!(blocks[5][91], 0xff);
    }
}
