// Copyright (c) 2021 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

use std::convert::TryFrom;

use crate::byte_array::ByteArray;
use crate::error::{DecodeError, EncodeError};
use crate::{DecodePacket, EncodePacket};

/// Server's reply to a CONNECT. A non-zero return code means the server
/// MUST close the network connection after sending this packet.
#[repr(u8)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConnectReturnCode {
    #[default]
    Accepted = 0,
    UnacceptableProtocol = 1,
    IdentifierRejected = 2,
    ServerUnavailable = 3,
    BadUserCredentials = 4,
    Unauthorized = 5,
}

impl TryFrom<u8> for ConnectReturnCode {
    type Error = DecodeError;

    /// # Errors
    ///
    /// Returns `DecodeError::InvalidReturnCode` for any value `>= 6`.
    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(Self::Accepted),
            1 => Ok(Self::UnacceptableProtocol),
            2 => Ok(Self::IdentifierRejected),
            3 => Ok(Self::ServerUnavailable),
            4 => Ok(Self::BadUserCredentials),
            5 => Ok(Self::Unauthorized),
            _ => Err(DecodeError::InvalidReturnCode),
        }
    }
}

/// CONNACK variable header: 1 byte ack-flags (only bit 0 may be set,
/// indicating session-present), 1 byte return code.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VariablesConnack {
    pub session_present: bool,
    pub return_code: ConnectReturnCode,
}

impl VariablesConnack {
    #[must_use]
    pub const fn size(&self) -> usize {
        2
    }
}

impl DecodePacket for VariablesConnack {
    /// # Errors
    ///
    /// Returns `DecodeError::InvalidConnectFlags` if a reserved ack-flags
    /// bit is set, or `DecodeError::InvalidReturnCode` for a return code
    /// `>= 6`.
    fn decode(ba: &mut ByteArray) -> Result<Self, DecodeError> {
        let ack_flags = ba.read_byte()?;
        if ack_flags & 0b1111_1110 != 0 {
            return Err(DecodeError::InvalidConnectFlags);
        }
        let session_present = ack_flags & 0b0000_0001 != 0;
        let return_code = ConnectReturnCode::try_from(ba.read_byte()?)?;
        Ok(Self {
            session_present,
            return_code,
        })
    }
}

impl EncodePacket for VariablesConnack {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<usize, EncodeError> {
        let ack_flags = if self.session_present { 0b0000_0001 } else { 0 };
        buf.push(ack_flags);
        buf.push(self.return_code as u8);
        Ok(2)
    }
}
