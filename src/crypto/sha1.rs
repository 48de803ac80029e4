//! SHA-1 message digest (FIPS 180-1), implemented from first principles.
//!
//! SHA-1 is broken for collision resistance; it survives here because the
//! websocket handshake (RFC 6455 §1.3) requires it, not for security.

use std::fmt;

const BLOCK_SIZE: usize = 64;

/// Fixed initialisation vector (FIPS 180-1 §7).
const INITIAL_STATE: [u32; 5] = [0x67452301, 0xEFCDAB89, 0x98BADCFE, 0x10325476, 0xC3D2E1F0];

/// 160 bit digest value. No identity beyond its bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Digest([u8; 20]);

impl Digest {
    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub const fn into_bytes(self) -> [u8; 20] {
        self.0
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Hashes a message of any length. Total function; no failure mode.
pub fn hash(message: &[u8]) -> Digest {
    let mut state = INITIAL_STATE;
    for block in pad(message).chunks_exact(BLOCK_SIZE) {
        compress(&mut state, block);
    }

    let mut digest = [0u8; 20];
    for (word, out) in state.iter().zip(digest.chunks_exact_mut(4)) {
        out.copy_from_slice(&word.to_be_bytes());
    }
    Digest(digest)
}

/// Appends the `1` bit, aligns to 56 mod 64 with zeros and closes with the
/// big-endian bit length. A block-aligned message gains one full extra
/// block; lengths of 56..=63 mod 64 gain two.
fn pad(message: &[u8]) -> Vec<u8> {
    let bit_length = (message.len() as u64) * 8;
    let mut padded = Vec::with_capacity(message.len() + 2 * BLOCK_SIZE);
    padded.extend_from_slice(message);
    padded.push(0x80);
    while padded.len() % BLOCK_SIZE != 56 {
        padded.push(0);
    }
    padded.extend_from_slice(&bit_length.to_be_bytes());
    padded
}

fn compress(state: &mut [u32; 5], block: &[u8]) {
    let mut schedule = [0u32; 80];
    for (word, bytes) in schedule.iter_mut().zip(block.chunks_exact(4)) {
        *word = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    }
    for index in 16..80 {
        schedule[index] =
            (schedule[index - 3] ^ schedule[index - 8] ^ schedule[index - 14] ^ schedule[index - 16]).rotate_left(1);
    }

    let [mut a, mut b, mut c, mut d, mut e] = *state;
    for (index, &word) in schedule.iter().enumerate() {
        let (f, k) = match index {
            0..=19 => ((b & c) | (!b & d), 0x5A827999),
            20..=39 => (b ^ c ^ d, 0x6ED9EBA1),
            40..=59 => ((b & c) | (b & d) | (c & d), 0x8F1BBCDC),
            _ => (b ^ c ^ d, 0xCA62C1D6),
        };
        let rotated = a
            .rotate_left(5)
            .wrapping_add(f)
            .wrapping_add(e)
            .wrapping_add(k)
            .wrapping_add(word);
        e = d;
        d = c;
        c = b.rotate_left(30);
        b = a;
        a = rotated;
    }

    state[0] = state[0].wrapping_add(a);
    state[1] = state[1].wrapping_add(b);
    state[2] = state[2].wrapping_add(c);
    state[3] = state[3].wrapping_add(d);
    state[4] = state[4].wrapping_add(e);
}
