// src/acquisition/mod.rs
//! Sample acquisition: buffer and polling session

pub mod buffer;
pub mod session;

pub use buffer::SampleBuffer;
pub use session::{AcquisitionReport, AcquisitionSession, SessionFailure, SessionState};
