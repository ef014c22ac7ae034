//! Telnet option filter.
//!
//! Device consoles reached over raw TCP may open with telnet option
//! negotiation. The filter refuses every option (`DO` gets `WONT`, `WILL`
//! gets `DONT`), drops subnegotiation blocks and unescapes `IAC IAC`, so
//! the session only ever sees shell text.

use bytes::{BufMut, Bytes, BytesMut};
use memchr::memchr;

pub const IAC: u8 = 255;
pub const DONT: u8 = 254;
pub const DO: u8 = 253;
pub const WONT: u8 = 252;
pub const WILL: u8 = 251;
pub const SB: u8 = 250;
pub const SE: u8 = 240;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum State {
    #[default]
    Data,
    Iac,
    Option(u8),
    Subnegotiation,
    SubnegotiationIac,
}

/// Incremental telnet command stripper.
///
/// State is kept between calls, so a command split across two reads is
/// still recognised.
#[derive(Debug, Default)]
pub struct TelnetFilter {
    state: State,
}

impl TelnetFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Split `input` into shell data and negotiation replies.
    pub fn feed(&mut self, mut input: &[u8], data: &mut BytesMut, replies: &mut BytesMut) {
        while !input.is_empty() {
            match self.state {
                State::Data => match memchr(IAC, input) {
                    Some(pos) => {
                        data.extend_from_slice(&input[..pos]);
                        self.state = State::Iac;
                        input = &input[pos + 1..];
                    }
                    None => {
                        data.extend_from_slice(input);
                        return;
                    }
                },
                State::Iac => {
                    let byte = input[0];
                    input = &input[1..];
                    self.state = match byte {
                        IAC => {
                            data.put_u8(IAC);
                            State::Data
                        }
                        DO | DONT | WILL | WONT => State::Option(byte),
                        SB => State::Subnegotiation,
                        // NOP, GA, AYT and friends carry no option byte
                        _ => State::Data,
                    };
                }
                State::Option(command) => {
                    let option = input[0];
                    input = &input[1..];
                    match command {
                        DO => replies.extend_from_slice(&[IAC, WONT, option]),
                        WILL => replies.extend_from_slice(&[IAC, DONT, option]),
                        _ => {}
                    }
                    self.state = State::Data;
                }
                State::Subnegotiation => match memchr(IAC, input) {
                    Some(pos) => {
                        self.state = State::SubnegotiationIac;
                        input = &input[pos + 1..];
                    }
                    None => return,
                },
                State::SubnegotiationIac => {
                    self.state = if input[0] == SE {
                        State::Data
                    } else {
                        State::Subnegotiation
                    };
                    input = &input[1..];
                }
            }
        }
    }
}

/// Double every `IAC` byte in outgoing data.
pub fn escape(data: &[u8]) -> Bytes {
    if memchr(IAC, data).is_none() {
        return Bytes::copy_from_slice(data);
    }
    let mut out = BytesMut::with_capacity(data.len() + 4);
    for &b in data {
        if b == IAC {
            out.put_u8(IAC);
        }
        out.put_u8(b);
    }
    out.freeze()
}
