use std::io;
use std::io::Write;

use crate::ws::frame::Frame;
use crate::ws::protocol;

/// Serialises a frame to its wire form.
///
/// The length field form is chosen by payload size: inline up to 125 bytes,
/// 16 bit extended up to 65535, 64 bit extended beyond. Sets
/// `frame.wire_length` so the caller knows how many bytes hit the wire.
pub fn encode(frame: &mut Frame) -> Vec<u8> {
    let mut wire = Vec::with_capacity(protocol::MAX_HEADER_LENGTH + frame.payload.len());

    let mut control = frame.opcode.to_bits();
    if frame.fin {
        control |= protocol::FIN_MASK;
    }
    if frame.rsv1 {
        control |= protocol::RSV1_MASK;
    }
    if frame.rsv2 {
        control |= protocol::RSV2_MASK;
    }
    if frame.rsv3 {
        control |= protocol::RSV3_MASK;
    }
    wire.push(control);

    let mask_bit = if frame.masked { protocol::MASK_MASK } else { 0 };
    match frame.payload.len() {
        len @ 0..=protocol::MAX_INLINE_PAYLOAD => wire.push(mask_bit | len as u8),
        len @ 126..=65535 => {
            wire.push(mask_bit | protocol::EXTENDED_LENGTH_16);
            wire.extend_from_slice(&(len as u16).to_be_bytes());
        }
        len => {
            wire.push(mask_bit | protocol::EXTENDED_LENGTH_64);
            wire.extend_from_slice(&(len as u64).to_be_bytes());
        }
    }

    if frame.masked {
        wire.extend_from_slice(&frame.mask_key.to_be_bytes());
    }
    let payload_start = wire.len();
    wire.extend_from_slice(&frame.payload);
    if frame.masked {
        protocol::apply_mask(&mut wire[payload_start..], frame.mask_key);
    }

    frame.wire_length = wire.len();
    wire
}

/// Encodes the frame and writes it to the stream in full.
pub fn write_frame<S: Write>(stream: &mut S, frame: &mut Frame) -> io::Result<()> {
    let wire = encode(frame);
    stream.write_all(&wire)?;
    stream.flush()
}
