//! Error types for key schedule and block I/O validation.
//!
//! Encryption and decryption themselves are total; errors only arise from
//! caller-supplied lengths.

use thiserror::Error;

/// Errors produced when building a cipher context or using the slice API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NxtError {
    /// Key length must be a positive multiple of 8 bits, at most 256 bits,
    /// and the key buffer must hold at least that many bits.
    #[error("invalid key length: {bits} bits (want a positive multiple of 8, <= 256)")]
    InvalidKeyLength { bits: u16 },

    /// Slice-based block I/O with a buffer that is not exactly one block.
    #[error("invalid block length: got {got} bytes, expected {expected}")]
    InvalidBlockLength { expected: usize, got: usize },
}
