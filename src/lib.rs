//! IDEA NXT (FOX) block cipher family.
//!
//! Implements the two published instantiations of the Lai-Massey design by
//! Junod and Vaudenay: NXT64 (64-bit block) and NXT128 (128-bit block), both
//! taking keys of any multiple of 8 bits up to 256, with the full non-linear
//! key schedule (LFSR diversification plus the NL64/NL64h/NL128 derivations).
//!
//! The substitution/diffusion tables are folded together at compile time, so
//! there is no runtime table initialization and contexts are freely shared
//! across threads once built. Round keys are wiped when a context is dropped.
//!
//! ```
//! use idea_nxt::Nxt64;
//!
//! let key = [0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77];
//! let ctx = Nxt64::new(&key, 64).unwrap();
//! let ct = ctx.encrypt_block(*b"\x01\x23\x45\x67\x89\xab\xcd\xef");
//! assert_eq!(ctx.decrypt_block(ct), *b"\x01\x23\x45\x67\x89\xab\xcd\xef");
//! ```
//!
//! This is a table-driven implementation and is **not** constant-time; do not
//! use it where cache-timing adversaries are a concern.

#[cfg(not(any(feature = "nxt64", feature = "nxt128")))]
compile_error!("enable at least one of the `nxt64` / `nxt128` features");

mod common;
mod error;
#[cfg(feature = "nxt128")]
mod nxt128;
#[cfg(feature = "nxt64")]
mod nxt64;

pub use error::NxtError;
#[cfg(feature = "nxt128")]
pub use nxt128::{Nxt128, NXT128_BLOCK_SIZE, NXT128_TOTAL_ROUNDS};
#[cfg(feature = "nxt64")]
pub use nxt64::{Nxt64, NXT64_BLOCK_SIZE, NXT64_TOTAL_ROUNDS};

/// Largest accepted key size in bytes, for either variant.
pub const NXT_MAX_KEY_BYTES: usize = 32;
