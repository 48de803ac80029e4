//! Base64 codec over the standard alphabet (RFC 4648 §4).
//!
//! Only the standard alphabet with `=` padding is supported, which is all
//! the websocket handshake needs.

use thiserror::Error;

/// Base64 index table: maps each 6 bit group to its output character.
const CHAR_TABLE: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// Inverse of [`CHAR_TABLE`] over the 7 bit ASCII range; -1 marks bytes with
/// no base64 value. Padding is stripped positionally before lookup, so `=`
/// maps to -1 here as well.
static VALUE_TABLE: [i8; 128] = build_value_table();

const fn build_value_table() -> [i8; 128] {
    let mut table = [-1i8; 128];
    let mut index = 0;
    while index < 64 {
        table[CHAR_TABLE[index] as usize] = index as i8;
        index += 1;
    }
    table
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum Error {
    /// Input byte outside the alphabet or outside the 7 bit ASCII range.
    #[error("byte {0:#04x} is not a base64 character")]
    InvalidCharacter(u8),
    /// Input does not divide into valid 4 character groups.
    #[error("truncated base64 group of {0} character(s)")]
    InvalidLength(usize),
}

/// Encodes bytes with the standard alphabet and `=` padding.
pub fn encode(input: &[u8]) -> String {
    let mut output = String::with_capacity(input.len().div_ceil(3) * 4);
    for chunk in input.chunks(3) {
        let b0 = chunk[0] as u32;
        let b1 = chunk.get(1).copied().unwrap_or(0) as u32;
        let b2 = chunk.get(2).copied().unwrap_or(0) as u32;
        let triple = (b0 << 16) | (b1 << 8) | b2;

        output.push(CHAR_TABLE[(triple >> 18) as usize] as char);
        output.push(CHAR_TABLE[(triple >> 12) as usize & 0x3f] as char);
        if chunk.len() > 1 {
            output.push(CHAR_TABLE[(triple >> 6) as usize & 0x3f] as char);
        } else {
            output.push('=');
        }
        if chunk.len() > 2 {
            output.push(CHAR_TABLE[triple as usize & 0x3f] as char);
        } else {
            output.push('=');
        }
    }
    output
}

/// Decodes standard base64 with trailing `=` padding.
///
/// Trailing padding (0, 1 or 2 characters) shortens the final group's output
/// by the matching byte count. `=` anywhere else is invalid, as is any byte
/// outside the alphabet; bytes above 0x7f are rejected before the value
/// table is indexed.
pub fn decode(input: &str) -> Result<Vec<u8>, Error> {
    let bytes = input.as_bytes();
    let padding = bytes.iter().rev().take(2).take_while(|&&b| b == b'=').count();
    let data = &bytes[..bytes.len() - padding];

    let mut output = Vec::with_capacity(bytes.len() / 4 * 3);
    for group in data.chunks(4) {
        if group.len() == 1 {
            return Err(Error::InvalidLength(1));
        }
        let mut quantum = 0u32;
        for (position, &byte) in group.iter().enumerate() {
            if byte >= 0x80 {
                return Err(Error::InvalidCharacter(byte));
            }
            let value = VALUE_TABLE[byte as usize];
            if value < 0 {
                return Err(Error::InvalidCharacter(byte));
            }
            quantum |= (value as u32) << (6 * (3 - position));
        }
        for position in 0..group.len() - 1 {
            output.push((quantum >> (16 - 8 * position)) as u8);
        }
    }
    Ok(output)
}
