//! NXT64: the 64-bit-block member of the IDEA NXT family.
//!
//! 16 Lai-Massey rounds over two 32-bit words. Every full round computes the
//! 32-bit round function `f32`, XORs it into both words and sends the first
//! through the orthomorphism; the terminal round skips the orthomorphism.
//! Keys up to 128 bits run the NL64 round-key derivation against a 128-bit
//! equivalent key, longer keys run NL64h against a 256-bit one.

use tracing::trace;
use zeroize::Zeroize;

use crate::common::{
    alpha_div, alpha_mul, check_block, check_key_len, diversify, mask_key, mix4, mix8, ortho,
    ortho_inv, pack32, pad_key, sigma, KsLfsr, PAD, SBOX,
};
use crate::error::NxtError;

/// Number of rounds. Compile-time parameter; the published test vectors
/// assume 16.
pub const NXT64_TOTAL_ROUNDS: usize = 16;

/// Block size in bytes.
pub const NXT64_BLOCK_SIZE: usize = 8;

const _: () = assert!(NXT64_TOTAL_ROUNDS >= 2 && NXT64_TOTAL_ROUNDS <= 255);

/// mu4-composed diffusion tables: entry `i` is `sbox[i]` multiplied through
/// one column of the 4x4 MDS matrix, pre-shifted into its four byte lanes.
static TBSM64: [[u32; 256]; 4] = build_mu4_tables();

const fn build_mu4_tables() -> [[u32; 256]; 4] {
    let mut t = [[0u32; 256]; 4];
    let mut i = 0;
    while i < 256 {
        let s = SBOX[i];
        let a = alpha_mul(s) as u32; // alpha * s
        let n = (alpha_div(s) ^ s) as u32; // (alpha^-1 + 1) * s
        let s = s as u32;
        t[0][i] = (s << 24) ^ (s << 16) ^ (n << 8) ^ a;
        t[1][i] = (s << 24) ^ (n << 16) ^ (a << 8) ^ s;
        t[2][i] = (s << 24) ^ (a << 16) ^ (s << 8) ^ n;
        t[3][i] = (a << 24) ^ (s << 16) ^ (s << 8) ^ s;
        i += 1;
    }
    t
}

/// S-box plus mu4 diffusion of one word.
#[inline]
fn sigma_mu4(x: u32) -> u32 {
    TBSM64[0][(x >> 24) as usize]
        ^ TBSM64[1][(x >> 16 & 0xff) as usize]
        ^ TBSM64[2][(x >> 8 & 0xff) as usize]
        ^ TBSM64[3][(x & 0xff) as usize]
}

/// The 32-bit round function.
#[inline]
fn f32(rk0: u32, rk1: u32, x0: u32, x1: u32) -> u32 {
    let f = x0 ^ x1 ^ rk0;
    let f = rk1 ^ sigma_mu4(f);
    rk0 ^ sigma(f)
}

/// NXT64 cipher context: pre-expanded round keys, two words per round.
/// Read-only once built; wiped on drop.
pub struct Nxt64 {
    rk: [u32; NXT64_TOTAL_ROUNDS * 2],
}

impl Nxt64 {
    /// Run the key schedule. `key_bits` must be a positive multiple of 8, at
    /// most 256, and `key` must hold at least that many bits.
    pub fn new(key: &[u8], key_bits: u16) -> Result<Self, NxtError> {
        check_key_len(key, key_bits)?;
        let mut rk = [0u32; NXT64_TOTAL_ROUNDS * 2];
        if key_bits <= 128 {
            ks64(key, key_bits, &mut rk);
        } else {
            ks64h(key, key_bits, &mut rk);
        }
        trace!(key_bits, "expanded NXT64 round keys");
        Ok(Self { rk })
    }

    /// Encrypt one block.
    pub fn encrypt_block(&self, block: [u8; NXT64_BLOCK_SIZE]) -> [u8; NXT64_BLOCK_SIZE] {
        let mut x0 = pack32(&block[..4]);
        let mut x1 = pack32(&block[4..]);
        let mut off = 0;
        for _ in 0..NXT64_TOTAL_ROUNDS - 1 {
            let f = f32(self.rk[off], self.rk[off + 1], x0, x1);
            x0 = ortho(x0 ^ f);
            x1 ^= f;
            off += 2;
        }
        let f = f32(self.rk[off], self.rk[off + 1], x0, x1);
        x0 ^= f;
        x1 ^= f;
        let mut out = [0u8; NXT64_BLOCK_SIZE];
        out[..4].copy_from_slice(&x0.to_be_bytes());
        out[4..].copy_from_slice(&x1.to_be_bytes());
        out
    }

    /// Decrypt one block: inverse rounds with the round-key cursor retreating
    /// from the last round.
    pub fn decrypt_block(&self, block: [u8; NXT64_BLOCK_SIZE]) -> [u8; NXT64_BLOCK_SIZE] {
        let mut x0 = pack32(&block[..4]);
        let mut x1 = pack32(&block[4..]);
        let mut off = 2 * (NXT64_TOTAL_ROUNDS - 1);
        for _ in 0..NXT64_TOTAL_ROUNDS - 1 {
            let f = f32(self.rk[off], self.rk[off + 1], x0, x1);
            x0 = ortho_inv(x0 ^ f);
            x1 ^= f;
            off -= 2;
        }
        let f = f32(self.rk[off], self.rk[off + 1], x0, x1);
        x0 ^= f;
        x1 ^= f;
        let mut out = [0u8; NXT64_BLOCK_SIZE];
        out[..4].copy_from_slice(&x0.to_be_bytes());
        out[4..].copy_from_slice(&x1.to_be_bytes());
        out
    }

    /// Encrypt a block in place. Errors if `block` is not exactly 8 bytes.
    pub fn encrypt(&self, block: &mut [u8]) -> Result<(), NxtError> {
        let mut b = [0u8; NXT64_BLOCK_SIZE];
        b.copy_from_slice(check_block(block, NXT64_BLOCK_SIZE)?);
        block.copy_from_slice(&self.encrypt_block(b));
        Ok(())
    }

    /// Decrypt a block in place. Errors if `block` is not exactly 8 bytes.
    pub fn decrypt(&self, block: &mut [u8]) -> Result<(), NxtError> {
        let mut b = [0u8; NXT64_BLOCK_SIZE];
        b.copy_from_slice(check_block(block, NXT64_BLOCK_SIZE)?);
        block.copy_from_slice(&self.decrypt_block(b));
        Ok(())
    }
}

impl Drop for Nxt64 {
    fn drop(&mut self) {
        self.rk.zeroize();
    }
}

/// Key schedule against the 128-bit equivalent key (NL64 derivation).
fn ks64(key: &[u8], key_bits: u16, rk: &mut [u32; NXT64_TOTAL_ROUNDS * 2]) {
    const EK_BITS: u16 = 128;
    let mut lfsr = KsLfsr::new(NXT64_TOTAL_ROUNDS);
    let eq = key_bits == EK_BITS;
    let mut mk = [0u8; 16];
    if key_bits < EK_BITS {
        let mut pk: [u8; 16] = pad_key(key, key_bits as usize / 8);
        mk = mask_key(&pk);
        pk.zeroize();
    } else {
        mk.copy_from_slice(&key[..16]);
    }
    for r in 0..NXT64_TOTAL_ROUNDS {
        let (k0, k1) = nl64(&mk, &mut lfsr, eq);
        rk[2 * r] = k0;
        rk[2 * r + 1] = k1;
    }
    mk.zeroize();
}

/// Key schedule against the 256-bit equivalent key (NL64h derivation).
fn ks64h(key: &[u8], key_bits: u16, rk: &mut [u32; NXT64_TOTAL_ROUNDS * 2]) {
    const EK_BITS: u16 = 256;
    let mut lfsr = KsLfsr::new(NXT64_TOTAL_ROUNDS);
    let eq = key_bits == EK_BITS;
    let mut mk = [0u8; 32];
    if key_bits < EK_BITS {
        let mut pk: [u8; 32] = pad_key(key, key_bits as usize / 8);
        mk = mask_key(&pk);
        pk.zeroize();
    } else {
        mk.copy_from_slice(&key[..32]);
    }
    for r in 0..NXT64_TOTAL_ROUNDS {
        let (k0, k1) = nl64h(&mk, &mut lfsr, eq);
        rk[2 * r] = k0;
        rk[2 * r + 1] = k1;
    }
    mk.zeroize();
}

/// One NL64 derivation: D-part, substitution-diffusion, linear mix, and two
/// scratch Lai-Massey rounds keyed from the diversified key itself.
fn nl64(mkey: &[u8; 16], lfsr: &mut KsLfsr, eq: bool) -> (u32, u32) {
    let mut dkey = diversify(mkey, lfsr);
    let mut dk = [0u32; 4];
    let mut i = 0;
    for w in dk.iter_mut() {
        *w = pack32(&dkey[i..]);
        i += 4;
    }

    let mut t = [sigma_mu4(dk[0]), sigma_mu4(dk[1]), sigma_mu4(dk[2]), sigma_mu4(dk[3])];
    let mut m = mix4(&t);
    for (j, w) in m.iter_mut().enumerate() {
        *w ^= pack32(&PAD[4 * j..]);
        if eq {
            *w = !*w;
        }
    }

    let mut x0 = sigma(m[0]) ^ sigma(m[2]);
    let mut x1 = sigma(m[1]) ^ sigma(m[3]);

    // One full and one terminal round, round keys drawn from dk.
    let f = f32(dk[0], dk[1], x0, x1);
    x0 = ortho(x0 ^ f);
    x1 ^= f;
    let f = f32(dk[2], dk[3], x0, x1);
    x0 ^= f;
    x1 ^= f;

    dkey.zeroize();
    dk.zeroize();
    t.zeroize();
    m.zeroize();
    (x0, x1)
}

/// One NL64h derivation: like NL64 but against a 32-byte master key, with the
/// eight-word mixing layer and three full scratch rounds before the terminal
/// one.
fn nl64h(mkey: &[u8; 32], lfsr: &mut KsLfsr, eq: bool) -> (u32, u32) {
    let mut dkey = diversify(mkey, lfsr);
    let mut dk = [0u32; 8];
    let mut i = 0;
    for w in dk.iter_mut() {
        *w = pack32(&dkey[i..]);
        i += 4;
    }

    let mut t = [0u32; 8];
    for (w, &d) in t.iter_mut().zip(dk.iter()) {
        *w = sigma_mu4(d);
    }
    let mut m = mix8(&t);
    for (j, w) in m.iter_mut().enumerate() {
        *w ^= pack32(&PAD[4 * j..]);
        if eq {
            *w = !*w;
        }
    }

    let mut x0 = sigma(m[0]) ^ sigma(m[1]) ^ sigma(m[4]) ^ sigma(m[5]);
    let mut x1 = sigma(m[2]) ^ sigma(m[3]) ^ sigma(m[6]) ^ sigma(m[7]);

    for r in 0..3 {
        let f = f32(dk[2 * r], dk[2 * r + 1], x0, x1);
        x0 = ortho(x0 ^ f);
        x1 ^= f;
    }
    let f = f32(dk[6], dk[7], x0, x1);
    x0 ^= f;
    x1 ^= f;

    dkey.zeroize();
    dk.zeroize();
    t.zeroize();
    m.zeroize();
    (x0, x1)
}
