use parking_lot::RwLock;

use crate::models::format::{ByteOrder, FormatDescriptor, BYTES_PER_SAMPLE};
use crate::processing::pcm;

/// Fixed-length block of normalized samples for one channel.
///
/// Overwritten wholesale on every capture iteration; it is the last
/// complete frame, never a queue.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelBuffer {
    samples: Vec<f32>,
}

impl ChannelBuffer {
    pub fn new(len: usize) -> Self {
        Self {
            samples: vec![0.0; len],
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Decode `byte_length / stride` signed 16-bit samples from `raw`.
    ///
    /// Sample `i` is read at `byte_offset + i * stride`. Samples beyond the
    /// buffer length, or past the end of `raw`, are ignored.
    pub fn put_samples(
        &mut self,
        raw: &[u8],
        byte_offset: usize,
        byte_length: usize,
        stride: usize,
        order: ByteOrder,
    ) {
        if stride == 0 {
            return;
        }
        let count = (byte_length / stride).min(self.samples.len());
        for (i, sample) in self.samples.iter_mut().take(count).enumerate() {
            let Some(index) = i.checked_mul(stride).and_then(|o| o.checked_add(byte_offset)) else {
                break;
            };
            let Some(bytes) = index
                .checked_add(BYTES_PER_SAMPLE)
                .and_then(|end| raw.get(index..end))
            else {
                break;
            };
            *sample = pcm::decode_sample([bytes[0], bytes[1]], order);
        }
    }

    /// Overwrite this buffer with the elementwise average of `a` and `b`.
    pub fn compute_mix(&mut self, a: &ChannelBuffer, b: &ChannelBuffer) {
        for ((out, &l), &r) in self.samples.iter_mut().zip(&a.samples).zip(&b.samples) {
            *out = (l + r) * 0.5;
        }
    }

    /// RMS level of the buffer (0.0–1.0 for normalized audio).
    pub fn rms_level(&self) -> f32 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let sum_sq: f32 = self.samples.iter().map(|s| s * s).sum();
        (sum_sq / self.samples.len() as f32).sqrt()
    }

    /// Peak absolute level of the buffer.
    pub fn peak_level(&self) -> f32 {
        self.samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max)
    }
}

/// Left, right and mix buffers of the most recent complete capture chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct BufferFrame {
    pub left: ChannelBuffer,
    pub right: ChannelBuffer,
    /// Mono capture writes here directly; stereo capture averages left and right.
    pub mix: ChannelBuffer,
    /// Number of chunks published so far.
    pub sequence: u64,
}

impl BufferFrame {
    fn new(len: usize) -> Self {
        Self {
            left: ChannelBuffer::new(len),
            right: ChannelBuffer::new(len),
            mix: ChannelBuffer::new(len),
            sequence: 0,
        }
    }
}

/// Channel buffers shared between the capture thread (sole writer) and
/// downstream consumers, who poll them once per rendering tick.
#[derive(Debug)]
pub struct InputBuffers {
    frame: RwLock<BufferFrame>,
}

impl InputBuffers {
    pub fn new(buffer_length: usize) -> Self {
        Self {
            frame: RwLock::new(BufferFrame::new(buffer_length)),
        }
    }

    pub fn buffer_length(&self) -> usize {
        self.frame.read().mix.len()
    }

    /// Sequence number of the last published chunk (0 before the first).
    pub fn sequence(&self) -> u64 {
        self.frame.read().sequence
    }

    /// Copy of the last complete frame.
    pub fn snapshot(&self) -> BufferFrame {
        self.frame.read().clone()
    }

    /// Borrow the last complete frame without copying.
    pub fn with_frame<R>(&self, f: impl FnOnce(&BufferFrame) -> R) -> R {
        f(&self.frame.read())
    }

    /// Decode one raw chunk laid out per `format` and publish it.
    ///
    /// Stereo chunks are de-interleaved into left/right before the mix is
    /// recomputed; mono chunks go straight into the mix buffer.
    pub(crate) fn publish(&self, raw: &[u8], format: &FormatDescriptor) {
        let stride = format.frame_size_bytes();
        let byte_length = format.chunk_size_bytes().min(raw.len());
        let order = format.byte_order;

        let mut frame = self.frame.write();
        if format.is_stereo() {
            let BufferFrame { left, right, mix, .. } = &mut *frame;
            left.put_samples(raw, 0, byte_length, stride, order);
            right.put_samples(raw, BYTES_PER_SAMPLE, byte_length, stride, order);
            mix.compute_mix(left, right);
        } else {
            frame.mix.put_samples(raw, 0, byte_length, stride, order);
        }
        frame.sequence += 1;
    }

    /// Discard the published frame and reallocate at `buffer_length`.
    /// Only called while no capture thread is alive.
    pub(crate) fn reset(&self, buffer_length: usize) {
        *self.frame.write() = BufferFrame::new(buffer_length);
    }
}
