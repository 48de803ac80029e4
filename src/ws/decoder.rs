use std::io;
use std::io::Read;

use crate::buffer::ReadBuffer;
use crate::ws::frame::{Frame, Opcode};
use crate::ws::{protocol, Error};

/// Decodes one complete frame from a byte slice.
///
/// The input must hold at least as many bytes as the frame header declares;
/// anything less is a [`Error::TruncatedFrame`]. Bytes past the frame are
/// ignored. Unknown opcode nibbles are carried through verbatim, never
/// rejected here.
pub fn decode(input: &[u8]) -> Result<Frame, Error> {
    ensure(input, 2)?;
    let control = input[0];
    let fin = control & protocol::FIN_MASK != 0;
    let rsv1 = control & protocol::RSV1_MASK != 0;
    let rsv2 = control & protocol::RSV2_MASK != 0;
    let rsv3 = control & protocol::RSV3_MASK != 0;
    let opcode = Opcode::from_bits(control & protocol::OP_CODE_MASK);

    let masked = input[1] & protocol::MASK_MASK != 0;
    let indicator = input[1] & protocol::PAYLOAD_LENGTH_MASK;

    let mut cursor = 2;
    let payload_length = match indicator {
        protocol::EXTENDED_LENGTH_16 => {
            ensure(input, cursor + 2)?;
            cursor += 2;
            u16::from_be_bytes([input[2], input[3]]) as usize
        }
        protocol::EXTENDED_LENGTH_64 => {
            ensure(input, cursor + 8)?;
            cursor += 8;
            u64::from_be_bytes([
                input[2], input[3], input[4], input[5], input[6], input[7], input[8], input[9],
            ]) as usize
        }
        inline => inline as usize,
    };

    let mask_key = if masked {
        ensure(input, cursor + 4)?;
        let key = u32::from_be_bytes([input[cursor], input[cursor + 1], input[cursor + 2], input[cursor + 3]]);
        cursor += 4;
        key
    } else {
        0
    };

    ensure(input, cursor + payload_length)?;
    let mut payload = input[cursor..cursor + payload_length].to_vec();
    if masked {
        protocol::apply_mask(&mut payload, mask_key);
    }

    Ok(Frame {
        fin,
        rsv1,
        rsv2,
        rsv3,
        opcode,
        masked,
        mask_key,
        payload,
        wire_length: cursor + payload_length,
    })
}

/// Reads exactly one frame from a blocking stream.
///
/// The fixed 2 byte header is read first, the remaining extended length,
/// mask and payload byte count is computed from it and read in full, then
/// the assembled bytes are decoded. End of file mid-frame surfaces as
/// [`Error::TruncatedFrame`].
pub fn read_frame<S: Read>(stream: &mut S, buffer: &mut ReadBuffer) -> Result<Frame, Error> {
    fill(stream, buffer, 2)?;
    let indicator = buffer.view()[1] & protocol::PAYLOAD_LENGTH_MASK;
    let masked = buffer.view()[1] & protocol::MASK_MASK != 0;

    let extended = match indicator {
        protocol::EXTENDED_LENGTH_16 => 2,
        protocol::EXTENDED_LENGTH_64 => 8,
        _ => 0,
    };
    let mask = if masked { 4 } else { 0 };
    fill(stream, buffer, 2 + extended + mask)?;

    let view = buffer.view();
    let payload_length = match indicator {
        protocol::EXTENDED_LENGTH_16 => u16::from_be_bytes([view[2], view[3]]) as usize,
        protocol::EXTENDED_LENGTH_64 => {
            u64::from_be_bytes([view[2], view[3], view[4], view[5], view[6], view[7], view[8], view[9]]) as usize
        }
        inline => inline as usize,
    };

    let total = 2 + extended + mask + payload_length;
    fill(stream, buffer, total)?;
    decode(buffer.consume_next(total))
}

fn fill<S: Read>(stream: &mut S, buffer: &mut ReadBuffer, len: usize) -> Result<(), Error> {
    buffer.fill(stream, len).map_err(|err| match err.kind() {
        io::ErrorKind::UnexpectedEof => Error::TruncatedFrame {
            expected: len,
            available: buffer.available(),
        },
        _ => Error::Io(err),
    })
}

fn ensure(input: &[u8], expected: usize) -> Result<(), Error> {
    if input.len() < expected {
        return Err(Error::TruncatedFrame {
            expected,
            available: input.len(),
        });
    }
    Ok(())
}
