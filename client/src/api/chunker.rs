//! Splitting an upload source into sequential byte ranges.

use crate::error::ApiError;
use bytes::Bytes;
use eyre::Context;
use std::ops::Range;
use tokio::io::{AsyncRead, AsyncReadExt};

/// One contiguous slice of an upload source, ready to be sent as a single request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadChunk {
    /// Index of the first byte in this chunk.
    pub offset: u64,
    /// Index one past the last byte in this chunk.
    pub end: u64,
    /// Length of the whole source, identical for every chunk of one upload.
    pub total_length: u64,
    /// The source bytes for `offset..end`.
    pub bytes: Bytes,
}

impl UploadChunk {
    pub fn len(&self) -> u64 {
        self.end - self.offset
    }

    pub fn is_empty(&self) -> bool {
        self.offset == self.end
    }

    pub fn is_last(&self) -> bool {
        self.end == self.total_length
    }

    /// The `Content-Range` header value describing this chunk, or `None` if it is empty.
    pub fn content_range(&self) -> Option<String> {
        content_range(self.offset..self.end, self.total_length)
    }
}

/// Formats `range` (end-exclusive) as a `Content-Range` value, which is end-inclusive.
///
/// An empty range has no inclusive form, so it yields `None`.
pub(crate) fn content_range(range: Range<u64>, total_length: u64) -> Option<String> {
    let last = range.end.checked_sub(1).filter(|&last| last >= range.start)?;
    Some(format!("bytes {}-{last}/{total_length}", range.start))
}

/// The consecutive ranges a source is split into, see [`byte_ranges`].
#[derive(Debug, Clone)]
pub(crate) struct ByteRanges {
    next_offset: u64,
    total_length: u64,
    chunk_size: u64,
}

impl ByteRanges {
    /// How many ranges the source is split into in total, including those already produced.
    pub(crate) fn count_total(&self) -> u64 {
        self.total_length.div_ceil(self.chunk_size)
    }

    /// Produces no further ranges.
    fn finish(&mut self) {
        self.next_offset = self.total_length;
    }
}

impl Iterator for ByteRanges {
    type Item = Range<u64>;

    fn next(&mut self) -> Option<Range<u64>> {
        if self.next_offset >= self.total_length {
            return None;
        }
        let start = self.next_offset;
        let end = self.total_length.min(start.saturating_add(self.chunk_size));
        self.next_offset = end;
        Some(start..end)
    }
}

/// The ranges a source of `total_length` bytes is split into for a given `chunk_size`.
///
/// # Panics
///
/// If `chunk_size` is zero.
pub(crate) fn byte_ranges(total_length: u64, chunk_size: u64) -> ByteRanges {
    assert!(chunk_size > 0, "chunk size must be positive");
    ByteRanges {
        next_offset: 0,
        total_length,
        chunk_size,
    }
}

/// Reads an upload source one chunk at a time.
///
/// The chunker never reads past the end of the chunk it is currently producing, so the
/// underlying reader's cursor always sits at the start of the next chunk. Once the last chunk
/// (or a read error) has been produced, it only ever yields `None`.
#[derive(Debug)]
pub struct ByteRangeChunker<R> {
    reader: R,
    source_name: String,
    total_length: u64,
    ranges: ByteRanges,
}

impl<R> ByteRangeChunker<R>
where
    R: AsyncRead + Unpin,
{
    pub fn new(reader: R, total_length: u64, chunk_size: u64) -> Result<Self, ApiError> {
        if total_length == 0 {
            return Err(ApiError::InvalidSource(
                "source length must be positive".into(),
            ));
        }
        if chunk_size == 0 {
            return Err(ApiError::InvalidSource(
                "chunk size must be positive".into(),
            ));
        }
        Ok(Self {
            reader,
            source_name: "upload stream".into(),
            total_length,
            ranges: byte_ranges(total_length, chunk_size),
        })
    }

    /// Names the source in read errors.
    pub fn with_source_name(mut self, name: impl Into<String>) -> Self {
        self.source_name = name.into();
        self
    }

    pub fn total_length(&self) -> u64 {
        self.total_length
    }

    /// How many chunks the source is split into in total.
    pub fn chunk_count(&self) -> u64 {
        self.ranges.count_total()
    }

    /// Reads and returns the next chunk, or `None` once the whole source has been produced.
    pub async fn next_chunk(&mut self) -> eyre::Result<Option<UploadChunk>> {
        let Some(Range { start, end }) = self.ranges.next() else {
            return Ok(None);
        };
        let len = usize::try_from(end - start)
            .with_context(|| format!("chunk of {} bytes does not fit in memory", end - start))?;

        let mut buf = vec![0; len];
        if let Err(e) = self.reader.read_exact(&mut buf).await {
            // the reader is in an unknown position now, so there's no sensible next chunk
            self.ranges.finish();
            return Err(ApiError::SourceUnreadable {
                name: self.source_name.clone(),
                source: e,
            })
            .with_context(|| format!("read bytes {start}..{end} of {}", self.source_name));
        }

        Ok(Some(UploadChunk {
            offset: start,
            end,
            total_length: self.total_length,
            bytes: Bytes::from(buf),
        }))
    }
}
