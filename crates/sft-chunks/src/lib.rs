//! sft-chunks: fixed-size chunking and ordered reassembly
//!
//! Files are split into fixed 16 MiB blocks in read order (the final block
//! may be shorter); each block is sealed and uploaded independently. The
//! server assigns opaque chunk ids with no positional meaning, so the client
//! alone records order — by position in the file's chunk list — and must
//! honor it on reassembly. Each block authenticates only its own content,
//! not its position: reordered chunks still pass per-chunk authentication
//! and corrupt the output silently. That residual property is inherent to
//! the format and deliberately not papered over here.

use std::io::Read;

use sft_core::SftResult;

/// Fixed chunk size: 16 MiB
pub const CHUNK_SIZE: usize = 16 * 1024 * 1024;

/// Iterator over fixed-size blocks of a reader, in read order.
///
/// Yields full `chunk_size` blocks until the reader is exhausted; the final
/// block may be shorter. An empty reader yields no blocks at all.
pub struct FixedChunker<R> {
    reader: R,
    chunk_size: usize,
    done: bool,
}

impl<R: Read> FixedChunker<R> {
    pub fn new(reader: R) -> Self {
        Self::with_chunk_size(reader, CHUNK_SIZE)
    }

    /// Explicit chunk size, for tests.
    pub fn with_chunk_size(reader: R, chunk_size: usize) -> Self {
        assert!(chunk_size > 0, "chunk size must be non-zero");
        Self {
            reader,
            chunk_size,
            done: false,
        }
    }

    /// Read until the block is full or the reader hits EOF. Short reads
    /// from the underlying reader must not produce short chunks.
    fn fill_block(&mut self) -> std::io::Result<Vec<u8>> {
        let mut block = vec![0u8; self.chunk_size];
        let mut filled = 0;
        while filled < self.chunk_size {
            match self.reader.read(&mut block[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        block.truncate(filled);
        Ok(block)
    }
}

impl<R: Read> Iterator for FixedChunker<R> {
    type Item = SftResult<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.fill_block() {
            Ok(block) if block.is_empty() => {
                self.done = true;
                None
            }
            Ok(block) => {
                if block.len() < self.chunk_size {
                    self.done = true;
                }
                Some(Ok(block))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e.into()))
            }
        }
    }
}

/// Number of chunks a file of `size` bytes splits into.
pub fn chunk_count(size: u64, chunk_size: usize) -> u64 {
    size.div_ceil(chunk_size as u64)
}

/// Concatenate opened blocks strictly in stored order.
///
/// Order is the caller's contract: it is not recoverable from the blocks
/// themselves.
pub fn reassemble<I>(blocks: I) -> Vec<u8>
where
    I: IntoIterator<Item = Vec<u8>>,
{
    let mut out = Vec::new();
    for block in blocks {
        out.extend_from_slice(&block);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Cursor;

    fn collect_chunks(data: &[u8], chunk_size: usize) -> Vec<Vec<u8>> {
        FixedChunker::with_chunk_size(Cursor::new(data.to_vec()), chunk_size)
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    }

    #[test]
    fn empty_input_yields_no_chunks() {
        assert!(collect_chunks(&[], 4).is_empty());
    }

    #[test]
    fn single_byte_yields_one_chunk() {
        let chunks = collect_chunks(&[0x42], CHUNK_SIZE);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], vec![0x42]);
    }

    #[test]
    fn final_chunk_may_be_short() {
        let chunks = collect_chunks(&[1, 2, 3, 4, 5, 6, 7, 8, 9], 4);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0], vec![1, 2, 3, 4]);
        assert_eq!(chunks[1], vec![5, 6, 7, 8]);
        assert_eq!(chunks[2], vec![9]);
    }

    #[test]
    fn exact_multiple_has_no_empty_tail() {
        let chunks = collect_chunks(&[0u8; 8], 4);
        assert_eq!(chunks.len(), 2);
        assert!(chunks.iter().all(|c| c.len() == 4));
    }

    /// A reader that trickles one byte per read call.
    struct TrickleReader {
        data: Vec<u8>,
        position: usize,
    }

    impl std::io::Read for TrickleReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.position >= self.data.len() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.data[self.position];
            self.position += 1;
            Ok(1)
        }
    }

    #[test]
    fn short_reads_do_not_produce_short_chunks() {
        let reader = TrickleReader {
            data: (0u8..10).collect(),
            position: 0,
        };
        let chunks: Vec<_> = FixedChunker::with_chunk_size(reader, 4)
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0], vec![0, 1, 2, 3]);
        assert_eq!(chunks[2], vec![8, 9]);
    }

    #[test]
    fn chunk_count_matches_iteration() {
        for size in [0u64, 1, 3, 4, 5, 8, 9] {
            let data = vec![0u8; size as usize];
            let chunks = collect_chunks(&data, 4);
            assert_eq!(chunks.len() as u64, chunk_count(size, 4), "size {size}");
        }
    }

    proptest! {
        #[test]
        fn chunks_reassemble_to_input(
            data in proptest::collection::vec(any::<u8>(), 0..8192),
            chunk_size in 1usize..512,
        ) {
            let chunks = collect_chunks(&data, chunk_size);
            prop_assert_eq!(reassemble(chunks), data);
        }

        #[test]
        fn only_final_chunk_is_short(
            data in proptest::collection::vec(any::<u8>(), 1..4096),
            chunk_size in 1usize..256,
        ) {
            let chunks = collect_chunks(&data, chunk_size);
            for chunk in &chunks[..chunks.len() - 1] {
                prop_assert_eq!(chunk.len(), chunk_size);
            }
            prop_assert!(chunks.last().unwrap().len() <= chunk_size);
            prop_assert!(!chunks.last().unwrap().is_empty());
        }
    }
}
