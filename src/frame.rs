use heapless::Vec;

use crate::constants::*;

/// Payload bytes of a single frame.
pub type Payload = Vec<u8, MAX_PAYLOAD_LEN>;

/// A fully encoded wire frame.
pub type FrameBytes = Vec<u8, MAX_FRAME_LEN>;

/// One protocol frame: a command on the way out, a response on the way in.
///
/// Wire layout: `HEAD(2) control command length(2, big-endian) payload
/// checksum(1) TAIL(2)`. The checksum is the low 8 bits of the sum of every
/// byte from the first head byte through the last payload byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub control: u8,
    pub command: u8,
    pub payload: Payload,
}

impl Frame {
    /// Builds a frame with an explicit payload. Payloads longer than
    /// [`MAX_PAYLOAD_LEN`] are not representable on this protocol and are
    /// replaced by an empty payload.
    pub fn new(control: u8, command: u8, payload: &[u8]) -> Frame {
        Frame {
            control,
            command,
            payload: Payload::from_slice(payload).unwrap_or_default(),
        }
    }

    /// Builds a register query: a one-byte payload holding the sensor's
    /// "don't care" filler byte.
    pub fn query(control: u8, command: u8) -> Frame {
        Frame::new(control, command, &[QUERY_FILLER])
    }

    /// Serializes the frame into its wire form.
    pub fn encode(&self) -> FrameBytes {
        let mut out = FrameBytes::new();
        let len = self.payload.len() as u16;

        // Capacity cannot be exceeded: MAX_FRAME_LEN covers the longest
        // representable payload plus all framing bytes.
        out.extend_from_slice(&FRAME_HEAD).ok();
        out.push(self.control).ok();
        out.push(self.command).ok();
        out.push((len >> 8) as u8).ok();
        out.push((len & 0xFF) as u8).ok();
        out.extend_from_slice(&self.payload).ok();

        let sum: u16 = out.iter().map(|&b| u16::from(b)).sum();
        out.push((sum & 0xFF) as u8).ok();
        out.extend_from_slice(&FRAME_TAIL).ok();
        out
    }
}

/// Why a captured frame was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidReason {
    /// The declared payload length exceeds what the protocol ever carries.
    LengthOverflow { declared: usize },
    /// The received checksum byte does not match the recomputed sum.
    Checksum { expected: u8, received: u8 },
    /// A tail marker byte was absent where the declared length put it.
    BadTail { received: u8 },
}

/// Outcome of feeding one byte to the [`Decoder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// More bytes are needed before the frame closes.
    Incomplete,
    /// The bytes captured so far do not form a valid frame; they have been
    /// discarded and the decoder is scanning for the next head marker.
    Invalid(InvalidReason),
    /// A complete, checksum-valid frame.
    Frame(Frame),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecodeState {
    Head1,
    Head2,
    Control,
    Command,
    LenHigh,
    LenLow,
    Payload,
    Checksum,
    Tail1,
    Tail2,
}

/// Incremental response-frame decoder.
///
/// Framing is driven by the declared length field and the checksum, never by
/// scanning for the tail marker: tail-valued bytes can legitimately occur
/// inside a payload. Any rejection resets the decoder so the caller can keep
/// feeding bytes and resynchronize on the next head marker.
#[derive(Debug)]
pub struct Decoder {
    state: DecodeState,
    control: u8,
    command: u8,
    declared_len: usize,
    len_high: u8,
    payload: Payload,
    sum: u16,
}

impl Decoder {
    pub fn new() -> Decoder {
        Decoder {
            state: DecodeState::Head1,
            control: 0,
            command: 0,
            declared_len: 0,
            len_high: 0,
            payload: Payload::new(),
            sum: 0,
        }
    }

    /// Discards any partial capture and restarts the head-marker scan.
    pub fn reset(&mut self) {
        self.state = DecodeState::Head1;
        self.payload.clear();
        self.sum = 0;
    }

    // A byte that invalidated a capture may itself be the first head
    // marker of the next frame; re-examine it instead of dropping it.
    fn resync_on(&mut self, byte: u8) {
        if byte == FRAME_HEAD[0] {
            self.sum = u16::from(byte);
            self.state = DecodeState::Head2;
        }
    }

    /// Consumes one received byte.
    pub fn feed(&mut self, byte: u8) -> Decoded {
        match self.state {
            DecodeState::Head1 => {
                if byte == FRAME_HEAD[0] {
                    self.sum = u16::from(byte);
                    self.state = DecodeState::Head2;
                }
                Decoded::Incomplete
            }
            DecodeState::Head2 => {
                if byte == FRAME_HEAD[1] {
                    self.sum = self.sum.wrapping_add(u16::from(byte));
                    self.state = DecodeState::Control;
                } else if byte == FRAME_HEAD[0] {
                    // Repeated first head byte: stay here, the marker may
                    // still be starting.
                    self.sum = u16::from(byte);
                } else {
                    self.state = DecodeState::Head1;
                }
                Decoded::Incomplete
            }
            DecodeState::Control => {
                self.control = byte;
                self.sum = self.sum.wrapping_add(u16::from(byte));
                self.state = DecodeState::Command;
                Decoded::Incomplete
            }
            DecodeState::Command => {
                self.command = byte;
                self.sum = self.sum.wrapping_add(u16::from(byte));
                self.state = DecodeState::LenHigh;
                Decoded::Incomplete
            }
            DecodeState::LenHigh => {
                self.len_high = byte;
                self.sum = self.sum.wrapping_add(u16::from(byte));
                self.state = DecodeState::LenLow;
                Decoded::Incomplete
            }
            DecodeState::LenLow => {
                self.sum = self.sum.wrapping_add(u16::from(byte));
                let declared = (usize::from(self.len_high) << 8) | usize::from(byte);
                if declared > MAX_PAYLOAD_LEN {
                    self.reset();
                    self.resync_on(byte);
                    return Decoded::Invalid(InvalidReason::LengthOverflow { declared });
                }
                self.declared_len = declared;
                self.payload.clear();
                self.state = if declared == 0 {
                    DecodeState::Checksum
                } else {
                    DecodeState::Payload
                };
                Decoded::Incomplete
            }
            DecodeState::Payload => {
                // Cannot overflow: declared_len was bounded at LenLow.
                self.payload.push(byte).ok();
                self.sum = self.sum.wrapping_add(u16::from(byte));
                if self.payload.len() == self.declared_len {
                    self.state = DecodeState::Checksum;
                }
                Decoded::Incomplete
            }
            DecodeState::Checksum => {
                let expected = (self.sum & 0xFF) as u8;
                if byte == expected {
                    self.state = DecodeState::Tail1;
                    Decoded::Incomplete
                } else {
                    self.reset();
                    self.resync_on(byte);
                    Decoded::Invalid(InvalidReason::Checksum {
                        expected,
                        received: byte,
                    })
                }
            }
            DecodeState::Tail1 => {
                if byte == FRAME_TAIL[0] {
                    self.state = DecodeState::Tail2;
                    Decoded::Incomplete
                } else {
                    self.reset();
                    self.resync_on(byte);
                    Decoded::Invalid(InvalidReason::BadTail { received: byte })
                }
            }
            DecodeState::Tail2 => {
                if byte == FRAME_TAIL[1] {
                    let frame = Frame {
                        control: self.control,
                        command: self.command,
                        payload: core::mem::take(&mut self.payload),
                    };
                    self.reset();
                    Decoded::Frame(frame)
                } else {
                    self.reset();
                    self.resync_on(byte);
                    Decoded::Invalid(InvalidReason::BadTail { received: byte })
                }
            }
        }
    }
}

impl Default for Decoder {
    fn default() -> Decoder {
        Decoder::new()
    }
}
