// Copyright (c) 2021 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

use std::convert::TryFrom;
use std::io::Write;

use byteorder::{BigEndian, WriteBytesExt};

use crate::byte_array::ByteArray;
use crate::connect_flags::ConnectFlags;
use crate::error::{DecodeError, EncodeError};
use crate::protocol_level::ProtocolLevel;
use crate::qos::QoS;
use crate::utils;
use crate::EncodePacket;

/// Will message carried by an optional CONNECT Will flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Will<'d> {
    pub topic: &'d str,
    pub message: &'d [u8],
    pub qos: QoS,
    pub retain: bool,
}

/// CONNECT variable header and payload. Borrows every string/byte field
/// from the decoder's loaded packet buffer; callers that need a field past
/// the dispatching callback must copy it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariablesConnect<'d> {
    pub protocol_level: ProtocolLevel,
    pub keep_alive: u16,
    pub clean_session: bool,
    pub client_id: &'d str,
    pub username: Option<&'d str>,
    pub password: Option<&'d [u8]>,
    pub will: Option<Will<'d>>,
}

impl<'d> VariablesConnect<'d> {
    /// Decode the CONNECT variable header and payload out of `ba`.
    ///
    /// # Errors
    ///
    /// Returns `DecodeError::InvalidProtocolName` if the protocol name is
    /// not `"MQTT"`, `DecodeError::InvalidProtocolLevel` for an
    /// unsupported level, `DecodeError::InvalidConnectFlags` for malformed
    /// flag combinations, or `DecodeError::InvalidClientId` if `ClientID`
    /// is empty while `CleanSession` is false.
    pub fn decode(ba: &mut ByteArray<'d>) -> Result<Self, DecodeError> {
        let name_len = ba.read_u16()? as usize;
        let protocol_name = ba.read_string(name_len)?;
        if protocol_name != "MQTT" {
            return Err(DecodeError::InvalidProtocolName);
        }

        let protocol_level = ProtocolLevel::try_from(ba.read_byte()?)?;
        let flags = ConnectFlags::decode(ba)?;
        let keep_alive = ba.read_u16()?;

        let client_id_len = ba.read_u16()? as usize;
        let client_id = ba.read_string(client_id_len)?;
        if client_id.is_empty() && !flags.clean_session {
            return Err(DecodeError::InvalidClientId);
        }

        let will = if flags.will {
            let topic_len = ba.read_u16()? as usize;
            let topic = ba.read_string(topic_len)?;
            let message_len = ba.read_u16()? as usize;
            let message = ba.read_bytes(message_len)?;
            Some(Will {
                topic,
                message,
                qos: flags.will_qos,
                retain: flags.will_retain,
            })
        } else {
            None
        };

        let username = if flags.has_username {
            let len = ba.read_u16()? as usize;
            Some(ba.read_string(len)?)
        } else {
            None
        };

        let password = if flags.has_password {
            let len = ba.read_u16()? as usize;
            Some(ba.read_bytes(len)?)
        } else {
            None
        };

        Ok(Self {
            protocol_level,
            keep_alive,
            clean_session: flags.clean_session,
            client_id,
            username,
            password,
            will,
        })
    }

    /// Number of bytes this value occupies on the wire, excluding the
    /// fixed header.
    #[must_use]
    pub fn size(&self) -> usize {
        let mut n = 2 + 4 // protocol name
            + ProtocolLevel::bytes()
            + ConnectFlags::bytes()
            + 2 // keep alive
            + 2 + self.client_id.len();
        if let Some(will) = &self.will {
            n += 2 + will.topic.len();
            n += 2 + will.message.len();
        }
        if let Some(username) = self.username {
            n += 2 + username.len();
        }
        if let Some(password) = self.password {
            n += 2 + password.len();
        }
        n
    }

    fn connect_flags(&self) -> ConnectFlags {
        ConnectFlags {
            has_username: self.username.is_some(),
            has_password: self.password.is_some(),
            will_retain: self.will.map_or(false, |w| w.retain),
            will_qos: self.will.map_or(QoS::AtMostOnce, |w| w.qos),
            will: self.will.is_some(),
            clean_session: self.clean_session,
        }
    }

    /// Encode this value's variable header and payload into `buf`,
    /// returning the byte count written.
    ///
    /// # Errors
    ///
    /// Propagates any `std::io::Error` converted via `EncodeError`.
    pub fn encode(&self, buf: &mut Vec<u8>) -> Result<usize, EncodeError> {
        let old_len = buf.len();
        buf.write_u16::<BigEndian>(4)?;
        buf.write_all(b"MQTT")?;
        self.protocol_level.encode(buf)?;
        self.connect_flags().encode(buf)?;
        buf.write_u16::<BigEndian>(self.keep_alive)?;

        utils::validate_two_bytes_data(self.client_id.len()).map_err(|_e| EncodeError::TooManyData)?;
        buf.write_u16::<BigEndian>(self.client_id.len() as u16)?;
        buf.write_all(self.client_id.as_bytes())?;

        if let Some(will) = &self.will {
            buf.write_u16::<BigEndian>(will.topic.len() as u16)?;
            buf.write_all(will.topic.as_bytes())?;
            buf.write_u16::<BigEndian>(will.message.len() as u16)?;
            buf.write_all(will.message)?;
        }
        if let Some(username) = self.username {
            buf.write_u16::<BigEndian>(username.len() as u16)?;
            buf.write_all(username.as_bytes())?;
        }
        if let Some(password) = self.password {
            buf.write_u16::<BigEndian>(password.len() as u16)?;
            buf.write_all(password)?;
        }

        Ok(buf.len() - old_len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // CONNECT scenario from §8: ClientID="0w", WillTopic="Bw", WillMessage="Aw",
    // Username="Cw", Password="Dw", WillQoS=1, WillRetain=true, CleanSession=false,
    // KeepAlive=60.
    const WIRE: [u8; 30] = [
        0x00, 0x04, 0x4D, 0x51, 0x54, 0x54, 0x04, 0xEC, 0x00, 0x3C, 0x00, 0x02, 0x30, 0x77, 0x00,
        0x02, 0x42, 0x77, 0x00, 0x02, 0x41, 0x77, 0x00, 0x02, 0x43, 0x77, 0x00, 0x02, 0x44, 0x77,
    ];

    #[test]
    fn test_decode_scenario() {
        let mut ba = ByteArray::new(&WIRE);
        let vars = VariablesConnect::decode(&mut ba).unwrap();
        assert_eq!(vars.client_id, "0w");
        assert_eq!(vars.keep_alive, 60);
        assert!(!vars.clean_session);
        let will = vars.will.unwrap();
        assert_eq!(will.topic, "Bw");
        assert_eq!(will.message, b"Aw");
        assert_eq!(will.qos, QoS::AtLeastOnce);
        assert!(will.retain);
        assert_eq!(vars.username, Some("Cw"));
        assert_eq!(vars.password, Some(&b"Dw"[..]));
    }

    #[test]
    fn test_decode_rejects_bad_protocol_name() {
        let buf = [0x00, 0x03, b'M', b'Q', b'X'];
        let mut ba = ByteArray::new(&buf);
        assert_eq!(
            VariablesConnect::decode(&mut ba).unwrap_err(),
            DecodeError::InvalidProtocolName
        );
    }

    #[test]
    fn test_round_trip_minimal() {
        let vars = VariablesConnect {
            protocol_level: ProtocolLevel::V311,
            keep_alive: 30,
            clean_session: true,
            client_id: "abc",
            username: None,
            password: None,
            will: None,
        };
        let mut buf = Vec::new();
        let n = vars.encode(&mut buf).unwrap();
        assert_eq!(n, vars.size());
        let mut ba = ByteArray::new(&buf);
        let decoded = VariablesConnect::decode(&mut ba).unwrap();
        assert_eq!(decoded, vars);
    }
}
