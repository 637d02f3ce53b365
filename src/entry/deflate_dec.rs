use std::cmp;

use miniz_oxide::inflate::{
    core::{
        decompress,
        inflate_flags::{TINFL_FLAG_HAS_MORE_INPUT, TINFL_FLAG_IGNORE_ADLER32},
        DecompressorOxide,
    },
    TINFLStatus,
};
use tracing::trace;

use super::{DecompressOutcome, HasMoreInput};

/// Raw DEFLATE decoder. Decompressed data is kept in an internal buffer and
/// handed out as slices of it.
pub(crate) struct DeflateDec {
    /// 64 KiB circular internal buffer. From miniz_oxide docs:
    ///
    /// > The decompression function normally needs access to 32KiB of the
    /// > previously decompressed data (or to the beginning of the decompressed
    /// > data if less than 32KiB has been decompressed.)
    internal_buffer: Vec<u8>,

    /// The position in the internal buffer where the next output starts.
    /// Wraps around to zero when it reaches the end.
    out_pos: usize,

    /// Decompressed bytes after [Self::out_pos] that haven't been handed out
    /// yet. miniz_oxide is only called again once this reaches zero.
    remain_in_internal_buffer: usize,

    /// The miniz_oxide decompressor state
    state: DecompressorOxide,
}

impl Default for DeflateDec {
    fn default() -> Self {
        Self {
            internal_buffer: vec![0u8; Self::INTERNAL_BUFFER_LENGTH],
            out_pos: 0,
            state: DecompressorOxide::new(),
            remain_in_internal_buffer: 0,
        }
    }
}

impl DeflateDec {
    const INTERNAL_BUFFER_LENGTH: usize = 64 * 1024;

    /// Number of decompressed bytes waiting to be handed out
    #[inline]
    pub(crate) fn pending(&self) -> usize {
        self.remain_in_internal_buffer
    }

    /// Hands out up to `max` pending bytes. The slice is contiguous, so it may
    /// be shorter than what's pending when the output wraps around.
    pub(crate) fn take(&mut self, max: usize) -> &[u8] {
        let len = cmp::min(self.remain_in_internal_buffer, max);
        let len = cmp::min(len, self.internal_buffer.len() - self.out_pos);
        let start = self.out_pos;

        self.out_pos += len;
        self.remain_in_internal_buffer -= len;
        if self.out_pos == self.internal_buffer.len() {
            self.out_pos = 0;
        }

        &self.internal_buffer[start..start + len]
    }

    /// Feeds `in_buf` to miniz_oxide. Must only be called when nothing is
    /// pending.
    pub(crate) fn decompress(
        &mut self,
        in_buf: &[u8],
        has_more_input: HasMoreInput,
    ) -> Result<DecompressOutcome, String> {
        debug_assert_eq!(self.remain_in_internal_buffer, 0);
        trace!(
            in_buf_len = in_buf.len(),
            out_pos = self.out_pos,
            "DeflateDec::decompress",
        );

        let mut flags = TINFL_FLAG_IGNORE_ADLER32;
        if matches!(has_more_input, HasMoreInput::Yes) {
            flags |= TINFL_FLAG_HAS_MORE_INPUT;
        }

        let (status, bytes_read, bytes_written) = decompress(
            &mut self.state,
            in_buf,
            &mut self.internal_buffer,
            self.out_pos,
            flags,
        );
        self.remain_in_internal_buffer += bytes_written;

        let done = match status {
            TINFLStatus::FailedCannotMakeProgress => {
                return Err(concat!(
                    "more input data was expected, but the compressed data ended, ",
                    "so the deflate stream is likely truncated"
                )
                .to_string())
            }
            TINFLStatus::BadParam => {
                return Err("the output buffer is an invalid size".to_string())
            }
            TINFLStatus::Adler32Mismatch => {
                return Err("the adler32 checksum did not match".to_string())
            }
            TINFLStatus::Failed => {
                return Err("invalid deflate data".to_string())
            }
            TINFLStatus::Done => true,
            // we'll get more input next time
            TINFLStatus::NeedsMoreInput => false,
            // the caller will take what's pending, then call us again
            TINFLStatus::HasMoreOutput => false,
        };

        Ok(DecompressOutcome {
            bytes_read,
            bytes_written,
            done,
        })
    }
}
