//! NXT128: the 128-bit-block member of the IDEA NXT family.
//!
//! The extended Lai-Massey scheme runs over four 32-bit words: the 64-bit
//! round function `f64` produces two words, each XORed into one pair, with
//! the first word of each pair sent through the orthomorphism on full rounds.
//! The key schedule always works against a 256-bit equivalent key (NL128).

use tracing::trace;
use zeroize::Zeroize;

use crate::common::{
    alpha_div, alpha_mul, check_block, check_key_len, diversify, mask_key, mix8, ortho, ortho_inv,
    pack32, pad_key, sigma, KsLfsr, PAD, SBOX,
};
use crate::error::NxtError;

/// Number of rounds. Compile-time parameter; the published test vectors
/// assume 16.
pub const NXT128_TOTAL_ROUNDS: usize = 16;

/// Block size in bytes.
pub const NXT128_BLOCK_SIZE: usize = 16;

const _: () = assert!(NXT128_TOTAL_ROUNDS >= 2 && NXT128_TOTAL_ROUNDS <= 255);

/// mu8-composed diffusion tables. Each input byte owns two consecutive
/// entries: `[2i]` contributes to the even output word, `[2i+1]` to the odd
/// one, so one lookup pair applies a full 8x8 MDS column to `sbox[i]`.
static TBSM128: [[u32; 512]; 8] = build_mu8_tables();

const fn build_mu8_tables() -> [[u32; 512]; 8] {
    let mut t = [[0u32; 512]; 8];
    let mut i = 0;
    while i < 256 {
        let s = SBOX[i];
        let a = alpha_mul(s) as u32; // alpha * s
        let aa = alpha_mul(alpha_mul(s)) as u32; // alpha^2 * s
        let d = alpha_div(s) as u32; // alpha^-1 * s
        let dd = alpha_div(alpha_div(s)) as u32; // alpha^-2 * s
        let n = (alpha_mul(s) ^ s) as u32; // (alpha + 1) * s
        let m = alpha_div(alpha_div(s) ^ s) as u32; // (alpha^-2 + alpha^-1) * s
        let s = s as u32;

        t[0][2 * i] = (s << 24) ^ (s << 16) ^ (n << 8) ^ m;
        t[0][2 * i + 1] = (a << 24) ^ (aa << 16) ^ (d << 8) ^ dd;
        t[1][2 * i] = (s << 24) ^ (n << 16) ^ (m << 8) ^ a;
        t[1][2 * i + 1] = (aa << 24) ^ (d << 16) ^ (dd << 8) ^ s;
        t[2][2 * i] = (s << 24) ^ (m << 16) ^ (a << 8) ^ aa;
        t[2][2 * i + 1] = (d << 24) ^ (dd << 16) ^ (s << 8) ^ n;
        t[3][2 * i] = (s << 24) ^ (a << 16) ^ (aa << 8) ^ d;
        t[3][2 * i + 1] = (dd << 24) ^ (s << 16) ^ (n << 8) ^ m;
        t[4][2 * i] = (s << 24) ^ (aa << 16) ^ (d << 8) ^ dd;
        t[4][2 * i + 1] = (s << 24) ^ (n << 16) ^ (m << 8) ^ a;
        t[5][2 * i] = (s << 24) ^ (d << 16) ^ (dd << 8) ^ s;
        t[5][2 * i + 1] = (n << 24) ^ (m << 16) ^ (a << 8) ^ aa;
        t[6][2 * i] = (s << 24) ^ (dd << 16) ^ (s << 8) ^ n;
        t[6][2 * i + 1] = (m << 24) ^ (a << 16) ^ (aa << 8) ^ d;
        t[7][2 * i] = (n << 24) ^ (s << 16) ^ (s << 8) ^ s;
        t[7][2 * i + 1] = (s << 24) ^ (s << 16) ^ (s << 8) ^ s;

        i += 1;
    }
    t
}

/// S-box plus mu8 diffusion of a 64-bit pair, as two 32-bit halves.
#[inline]
fn sigma_mu8(x: u32, y: u32) -> (u32, u32) {
    let (b0, b1, b2, b3) = (
        (x >> 24) as usize,
        (x >> 16 & 0xff) as usize,
        (x >> 8 & 0xff) as usize,
        (x & 0xff) as usize,
    );
    let (b4, b5, b6, b7) = (
        (y >> 24) as usize,
        (y >> 16 & 0xff) as usize,
        (y >> 8 & 0xff) as usize,
        (y & 0xff) as usize,
    );
    let r0 = TBSM128[0][2 * b0]
        ^ TBSM128[1][2 * b1]
        ^ TBSM128[2][2 * b2]
        ^ TBSM128[3][2 * b3]
        ^ TBSM128[4][2 * b4]
        ^ TBSM128[5][2 * b5]
        ^ TBSM128[6][2 * b6]
        ^ TBSM128[7][2 * b7];
    let r1 = TBSM128[0][2 * b0 + 1]
        ^ TBSM128[1][2 * b1 + 1]
        ^ TBSM128[2][2 * b2 + 1]
        ^ TBSM128[3][2 * b3 + 1]
        ^ TBSM128[4][2 * b4 + 1]
        ^ TBSM128[5][2 * b5 + 1]
        ^ TBSM128[6][2 * b6 + 1]
        ^ TBSM128[7][2 * b7 + 1];
    (r0, r1)
}

/// The 64-bit round function over the four state words.
#[inline]
fn f64(rk: &[u32], x0: u32, x1: u32, x2: u32, x3: u32) -> (u32, u32) {
    let tmp0 = x0 ^ x1 ^ rk[0];
    let tmp1 = x2 ^ x3 ^ rk[1];
    let (smu0, smu1) = sigma_mu8(tmp0, tmp1);
    let f0 = rk[0] ^ sigma(smu0 ^ rk[2]);
    let f1 = rk[1] ^ sigma(smu1 ^ rk[3]);
    (f0, f1)
}

/// NXT128 cipher context: pre-expanded round keys, four words per round.
/// Read-only once built; wiped on drop.
pub struct Nxt128 {
    rk: [u32; NXT128_TOTAL_ROUNDS * 4],
}

impl Nxt128 {
    /// Run the key schedule. `key_bits` must be a positive multiple of 8, at
    /// most 256, and `key` must hold at least that many bits.
    pub fn new(key: &[u8], key_bits: u16) -> Result<Self, NxtError> {
        check_key_len(key, key_bits)?;
        let mut rk = [0u32; NXT128_TOTAL_ROUNDS * 4];
        ks128(key, key_bits, &mut rk);
        trace!(key_bits, "expanded NXT128 round keys");
        Ok(Self { rk })
    }

    /// Encrypt one block.
    pub fn encrypt_block(&self, block: [u8; NXT128_BLOCK_SIZE]) -> [u8; NXT128_BLOCK_SIZE] {
        let mut x0 = pack32(&block[..4]);
        let mut x1 = pack32(&block[4..]);
        let mut x2 = pack32(&block[8..]);
        let mut x3 = pack32(&block[12..]);
        let mut off = 0;
        for _ in 0..NXT128_TOTAL_ROUNDS - 1 {
            let (f0, f1) = f64(&self.rk[off..off + 4], x0, x1, x2, x3);
            x0 = ortho(x0 ^ f0);
            x1 ^= f0;
            x2 = ortho(x2 ^ f1);
            x3 ^= f1;
            off += 4;
        }
        let (f0, f1) = f64(&self.rk[off..off + 4], x0, x1, x2, x3);
        x0 ^= f0;
        x1 ^= f0;
        x2 ^= f1;
        x3 ^= f1;
        assemble(x0, x1, x2, x3)
    }

    /// Decrypt one block: inverse rounds with the round-key cursor retreating
    /// from the last round.
    pub fn decrypt_block(&self, block: [u8; NXT128_BLOCK_SIZE]) -> [u8; NXT128_BLOCK_SIZE] {
        let mut x0 = pack32(&block[..4]);
        let mut x1 = pack32(&block[4..]);
        let mut x2 = pack32(&block[8..]);
        let mut x3 = pack32(&block[12..]);
        let mut off = 4 * (NXT128_TOTAL_ROUNDS - 1);
        for _ in 0..NXT128_TOTAL_ROUNDS - 1 {
            let (f0, f1) = f64(&self.rk[off..off + 4], x0, x1, x2, x3);
            x0 = ortho_inv(x0 ^ f0);
            x1 ^= f0;
            x2 = ortho_inv(x2 ^ f1);
            x3 ^= f1;
            off -= 4;
        }
        let (f0, f1) = f64(&self.rk[off..off + 4], x0, x1, x2, x3);
        x0 ^= f0;
        x1 ^= f0;
        x2 ^= f1;
        x3 ^= f1;
        assemble(x0, x1, x2, x3)
    }

    /// Encrypt a block in place. Errors if `block` is not exactly 16 bytes.
    pub fn encrypt(&self, block: &mut [u8]) -> Result<(), NxtError> {
        let mut b = [0u8; NXT128_BLOCK_SIZE];
        b.copy_from_slice(check_block(block, NXT128_BLOCK_SIZE)?);
        block.copy_from_slice(&self.encrypt_block(b));
        Ok(())
    }

    /// Decrypt a block in place. Errors if `block` is not exactly 16 bytes.
    pub fn decrypt(&self, block: &mut [u8]) -> Result<(), NxtError> {
        let mut b = [0u8; NXT128_BLOCK_SIZE];
        b.copy_from_slice(check_block(block, NXT128_BLOCK_SIZE)?);
        block.copy_from_slice(&self.decrypt_block(b));
        Ok(())
    }
}

impl Drop for Nxt128 {
    fn drop(&mut self) {
        self.rk.zeroize();
    }
}

#[inline]
fn assemble(x0: u32, x1: u32, x2: u32, x3: u32) -> [u8; NXT128_BLOCK_SIZE] {
    let mut out = [0u8; NXT128_BLOCK_SIZE];
    out[..4].copy_from_slice(&x0.to_be_bytes());
    out[4..8].copy_from_slice(&x1.to_be_bytes());
    out[8..12].copy_from_slice(&x2.to_be_bytes());
    out[12..].copy_from_slice(&x3.to_be_bytes());
    out
}

/// Key schedule against the 256-bit equivalent key (NL128 derivation).
fn ks128(key: &[u8], key_bits: u16, rk: &mut [u32; NXT128_TOTAL_ROUNDS * 4]) {
    const EK_BITS: u16 = 256;
    let mut lfsr = KsLfsr::new(NXT128_TOTAL_ROUNDS);
    let eq = key_bits == EK_BITS;
    let mut mk = [0u8; 32];
    if key_bits < EK_BITS {
        let mut pk: [u8; 32] = pad_key(key, key_bits as usize / 8);
        mk = mask_key(&pk);
        pk.zeroize();
    } else {
        mk.copy_from_slice(&key[..32]);
    }
    for r in 0..NXT128_TOTAL_ROUNDS {
        let k = nl128(&mk, &mut lfsr, eq);
        rk[4 * r..4 * r + 4].copy_from_slice(&k);
    }
    mk.zeroize();
}

/// One NL128 derivation: D-part, paired substitution-diffusion, linear mix,
/// and two scratch extended rounds keyed from the diversified key itself.
fn nl128(mkey: &[u8; 32], lfsr: &mut KsLfsr, eq: bool) -> [u32; 4] {
    let mut dkey = diversify(mkey, lfsr);
    let mut dk = [0u32; 8];
    let mut i = 0;
    for w in dk.iter_mut() {
        *w = pack32(&dkey[i..]);
        i += 4;
    }

    let mut t = [0u32; 8];
    for j in 0..4 {
        let (a, b) = sigma_mu8(dk[2 * j], dk[2 * j + 1]);
        t[2 * j] = a;
        t[2 * j + 1] = b;
    }
    let mut m = mix8(&t);
    for (j, w) in m.iter_mut().enumerate() {
        *w ^= pack32(&PAD[4 * j..]);
        if eq {
            *w = !*w;
        }
    }

    let mut x0 = sigma(m[0]) ^ sigma(m[4]);
    let mut x1 = sigma(m[1]) ^ sigma(m[5]);
    let mut x2 = sigma(m[2]) ^ sigma(m[6]);
    let mut x3 = sigma(m[3]) ^ sigma(m[7]);

    // One full and one terminal extended round, round keys drawn from dk.
    let (f0, f1) = f64(&dk[..4], x0, x1, x2, x3);
    x0 = ortho(x0 ^ f0);
    x1 ^= f0;
    x2 = ortho(x2 ^ f1);
    x3 ^= f1;
    let (f0, f1) = f64(&dk[4..], x0, x1, x2, x3);
    x0 ^= f0;
    x1 ^= f0;
    x2 ^= f1;
    x3 ^= f1;

    dkey.zeroize();
    dk.zeroize();
    t.zeroize();
    m.zeroize();
    [x0, x1, x2, x3]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, RngCore};

    const PT: [u8; 16] = [
        0x01, 0x23, 0x45, 0x67, 0x89, 0xab, 0xcd, 0xef, 0xfe, 0xdc, 0xba, 0x98, 0x76, 0x54, 0x32,
        0x10,
    ];
    const KEY: [u8; 32] = [
        0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xaa, 0xbb, 0xcc, 0xdd, 0xee,
        0xff, 0xff, 0xee, 0xdd, 0xcc, 0xbb, 0xaa, 0x99, 0x88, 0x77, 0x66, 0x55, 0x44, 0x33, 0x22,
        0x11, 0x00,
    ];

    fn vector_check(key_bits: u16, want_hex: &str) {
        let ctx = Nxt128::new(&KEY, key_bits).unwrap();
        let want: [u8; 16] = hex::decode(want_hex).unwrap().try_into().unwrap();
        assert_eq!(ctx.encrypt_block(PT), want, "encrypt, {key_bits}-bit key");
        assert_eq!(ctx.decrypt_block(want), PT, "decrypt, {key_bits}-bit key");
    }

    #[test]
    #[ignore = "enable once the substitution box and key padding constants are confirmed against the FOX specification"]
    fn published_vector_64_bit_key() {
        vector_check(64, "1eecbc7deb66e7dae1a7876d90c0b239");
    }

    #[test]
    #[ignore = "enable once the substitution box and key padding constants are confirmed against the FOX specification"]
    fn published_vector_128_bit_key() {
        vector_check(128, "849e0f0682f50cd588ae073006a10bee");
    }

    #[test]
    #[ignore = "enable once the substitution box and key padding constants are confirmed against the FOX specification"]
    fn published_vector_192_bit_key() {
        vector_check(192, "5934214ecba2d5fd58c261b28261b1bc");
    }

    #[test]
    #[ignore = "enable once the substitution box and key padding constants are confirmed against the FOX specification"]
    fn published_vector_256_bit_key() {
        vector_check(256, "45ccb1030f67b768247f530266bc4996");
    }

    #[test]
    fn round_trip_all_key_lengths() {
        let mut rng = rand::thread_rng();
        for key_bytes in 1..=32usize {
            let mut key = vec![0u8; key_bytes];
            rng.fill_bytes(&mut key);
            let ctx = Nxt128::new(&key, (key_bytes * 8) as u16).unwrap();
            for _ in 0..8 {
                let block: [u8; 16] = rng.gen();
                assert_eq!(ctx.decrypt_block(ctx.encrypt_block(block)), block);
            }
        }
    }

    #[test]
    fn schedule_is_deterministic() {
        let a = Nxt128::new(&KEY, 192).unwrap();
        let b = Nxt128::new(&KEY, 192).unwrap();
        assert_eq!(a.rk, b.rk);
        assert_eq!(a.encrypt_block(PT), b.encrypt_block(PT));
    }

    #[test]
    fn in_place_slice_api() {
        let ctx = Nxt128::new(&KEY, 256).unwrap();
        let mut buf = PT;
        ctx.encrypt(&mut buf).unwrap();
        assert_eq!(buf, ctx.encrypt_block(PT));
        ctx.decrypt(&mut buf).unwrap();
        assert_eq!(buf, PT);
    }

    #[test]
    fn wrong_block_length_is_rejected() {
        let ctx = Nxt128::new(&KEY, 128).unwrap();
        let mut short = [0u8; 8];
        assert_eq!(
            ctx.encrypt(&mut short),
            Err(NxtError::InvalidBlockLength { expected: 16, got: 8 })
        );
        let mut long = [0u8; 17];
        assert_eq!(
            ctx.decrypt(&mut long),
            Err(NxtError::InvalidBlockLength { expected: 16, got: 17 })
        );
    }

    #[test]
    fn mu8_tables_match_their_equations() {
        for i in 0..256 {
            let s = SBOX[i];
            let a = alpha_mul(s) as u32;
            let aa = alpha_mul(alpha_mul(s)) as u32;
            let d = alpha_div(s) as u32;
            let dd = alpha_div(alpha_div(s)) as u32;
            let n = (alpha_mul(s) ^ s) as u32;
            let m = alpha_div(alpha_div(s) ^ s) as u32;
            let s = s as u32;
            assert_eq!(TBSM128[0][2 * i], (s << 24) ^ (s << 16) ^ (n << 8) ^ m);
            assert_eq!(TBSM128[0][2 * i + 1], (a << 24) ^ (aa << 16) ^ (d << 8) ^ dd);
            assert_eq!(TBSM128[7][2 * i], (n << 24) ^ (s << 16) ^ (s << 8) ^ s);
            assert_eq!(TBSM128[7][2 * i + 1], (s << 24) ^ (s << 16) ^ (s << 8) ^ s);
        }
    }
}
