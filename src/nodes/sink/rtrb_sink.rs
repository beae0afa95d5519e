//! Ring buffer sink for custom output paths

use std::thread::sleep;
use std::time::Duration;

use rtrb::{Consumer, Producer, RingBuffer};

use crate::error::{EngineError, Result};

use super::Sink;

/// A sink that pushes interleaved samples into an rtrb ring buffer
///
/// Useful for:
/// - Handing audio to another thread (a custom device callback, an encoder)
/// - Recording/analysis
/// - Tests
///
/// A full buffer stalls the writer until the consumer frees room, the same
/// way a device would.
pub struct RtrbSink {
    producer: Producer<i16>,
    poll_interval: Duration,
}

impl RtrbSink {
    /// Create a sink that writes to the given producer
    pub fn new(producer: Producer<i16>) -> Self {
        Self {
            producer,
            poll_interval: Duration::from_micros(500),
        }
    }

    /// Create a sink and the consumer reading from it
    pub fn with_capacity(capacity: usize) -> (Self, Consumer<i16>) {
        let (producer, consumer) = RingBuffer::new(capacity.max(1));
        (Self::new(producer), consumer)
    }

    /// Returns how many sample slots are available
    #[inline]
    pub fn available(&self) -> usize {
        self.producer.slots()
    }
}

impl Sink for RtrbSink {
    fn write(&mut self, samples: &[i16]) -> Result<()> {
        let mut remaining = samples;
        while !remaining.is_empty() {
            let slots = self.producer.slots();
            if slots == 0 {
                if self.producer.is_abandoned() {
                    return Err(EngineError::SinkWrite("ring buffer consumer dropped".into()));
                }
                sleep(self.poll_interval);
                continue;
            }

            let n = slots.min(remaining.len());
            for &s in &remaining[..n] {
                // room checked above
                let _ = self.producer.push(s);
            }
            remaining = &remaining[n..];
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn writes_land_in_order() {
        let (mut sink, mut consumer) = RtrbSink::with_capacity(8);
        sink.write(&[1, 2, 3]).unwrap();
        sink.write(&[4]).unwrap();
        let out: Vec<i16> = core::iter::from_fn(|| consumer.pop().ok()).collect();
        assert_eq!(out, vec![1, 2, 3, 4]);
    }

    #[test]
    fn full_buffer_blocks_until_drained() {
        let (mut sink, mut consumer) = RtrbSink::with_capacity(4);
        let reader = thread::spawn(move || {
            let mut got = Vec::new();
            while got.len() < 64 {
                match consumer.pop() {
                    Ok(s) => got.push(s),
                    Err(_) => thread::yield_now(),
                }
            }
            got
        });

        let block: Vec<i16> = (0..64).collect();
        sink.write(&block).unwrap();
        assert_eq!(reader.join().unwrap(), block);
    }

    #[test]
    fn dropped_consumer_fails_the_write() {
        let (mut sink, consumer) = RtrbSink::with_capacity(2);
        drop(consumer);
        assert!(matches!(sink.write(&[1, 2, 3]), Err(EngineError::SinkWrite(_))));
    }
}
