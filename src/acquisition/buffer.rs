// src/acquisition/buffer.rs
//! Fixed-capacity sample storage

use crate::error::{EcgError, EcgResult};
use std::ops::Deref;

/// Ordered samples of one session
///
/// Capacity is the target sample count and is reserved up front; the buffer
/// never grows past it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleBuffer {
    samples: Vec<i32>,
    capacity: usize,
}

impl SampleBuffer {
    /// Reserve storage for exactly `capacity` samples
    pub fn with_capacity(capacity: usize) -> EcgResult<Self> {
        if capacity == 0 {
            return Err(EcgError::invalid_parameter(
                "sample_count",
                "at least one sample must be requested",
            ));
        }

        let mut samples = Vec::new();
        samples
            .try_reserve_exact(capacity)
            .map_err(|source| EcgError::AllocationFailure {
                requested: capacity,
                source,
            })?;

        Ok(Self { samples, capacity })
    }

    /// Placeholder for reports of sessions that never allocated
    pub(crate) fn empty() -> Self {
        Self {
            samples: Vec::new(),
            capacity: 0,
        }
    }

    /// Append a sample; hands it back when the buffer is full
    pub fn push(&mut self, sample: i32) -> Result<(), i32> {
        if self.is_full() {
            return Err(sample);
        }
        self.samples.push(sample);
        Ok(())
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.samples.len() >= self.capacity
    }

    pub fn remaining(&self) -> usize {
        self.capacity - self.samples.len()
    }

    pub fn as_slice(&self) -> &[i32] {
        &self.samples
    }

    pub fn into_vec(self) -> Vec<i32> {
        self.samples
    }
}

impl Deref for SampleBuffer {
    type Target = [i32];

    fn deref(&self) -> &[i32] {
        &self.samples
    }
}

impl<'a> IntoIterator for &'a SampleBuffer {
    type Item = &'a i32;
    type IntoIter = std::slice::Iter<'a, i32>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(matches!(
            SampleBuffer::with_capacity(0),
            Err(EcgError::InvalidParameter { parameter: "sample_count", .. })
        ));
    }

    #[test]
    fn test_huge_capacity_reports_allocation_failure() {
        match SampleBuffer::with_capacity(usize::MAX) {
            Err(EcgError::AllocationFailure { requested, .. }) => assert_eq!(requested, usize::MAX),
            other => panic!("Expected allocation failure, got {:?}", other),
        }
    }

    #[test]
    fn test_push_until_full() {
        let mut buffer = SampleBuffer::with_capacity(2).unwrap();
        assert_eq!(buffer.remaining(), 2);
        buffer.push(10).unwrap();
        buffer.push(-3).unwrap();

        assert!(buffer.is_full());
        assert_eq!(buffer.push(7), Err(7));
        assert_eq!(buffer.as_slice(), &[10, -3]);
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn test_capacity_is_reserved_up_front() {
        let buffer = SampleBuffer::with_capacity(1024).unwrap();
        assert!(buffer.is_empty());
        assert_eq!(buffer.capacity(), 1024);
        assert!(buffer.samples.capacity() >= 1024);
    }
}
