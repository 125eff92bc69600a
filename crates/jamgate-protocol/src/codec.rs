//! The delimiter codec: byte stream in, whole frames out.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

/// The reserved byte that terminates every message on the wire.
pub const DELIMITER: u8 = 0x00;

/// Splits an inbound byte stream on [`DELIMITER`] and terminates
/// outbound frames with it.
///
/// Decoding keeps an accumulation buffer across chunks (`FramedRead`
/// owns it): every complete segment up to a delimiter is emitted as one
/// frame, in delimiter order; trailing bytes wait for the next chunk.
/// Two adjacent delimiters are a legal empty frame and are emitted as
/// such — the upstream protocol distinguishes an empty message from no
/// message.
///
/// Decoding cannot fail: any byte sequence is valid input. The error
/// type is `io::Error` only because the `Decoder` contract requires one.
///
/// No maximum frame size is enforced here; a transport-level cap is the
/// place to police hostile peers.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameCodec;

impl Decoder for FrameCodec {
    type Item = Bytes;
    type Error = std::io::Error;

    fn decode(
        &mut self,
        src: &mut BytesMut,
    ) -> Result<Option<Bytes>, Self::Error> {
        match src.iter().position(|&b| b == DELIMITER) {
            Some(at) => {
                let frame = src.split_to(at).freeze();
                src.advance(1); // consume the delimiter itself
                Ok(Some(frame))
            }
            None => Ok(None),
        }
    }

    fn decode_eof(
        &mut self,
        src: &mut BytesMut,
    ) -> Result<Option<Bytes>, Self::Error> {
        // On stream close, complete frames still buffered are emitted;
        // an unterminated tail is discarded, never surfaced as a frame.
        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            None => {
                src.clear();
                Ok(None)
            }
        }
    }
}

impl Encoder<Bytes> for FrameCodec {
    type Error = std::io::Error;

    fn encode(
        &mut self,
        frame: Bytes,
        dst: &mut BytesMut,
    ) -> Result<(), Self::Error> {
        dst.reserve(frame.len() + 1);
        dst.put_slice(&frame);
        if frame.last() != Some(&DELIMITER) {
            dst.put_u8(DELIMITER);
        }
        Ok(())
    }
}

// =========================================================================
// Tests
// =========================================================================
