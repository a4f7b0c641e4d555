// Copyright (c) 2021 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

use std::convert::TryFrom;

use byteorder::{BigEndian, WriteBytesExt};

use crate::byte_array::ByteArray;
use crate::error::{DecodeError, EncodeError};
use crate::header::FixedHeader;
use crate::qos::SubscribeReturnCode;

/// SUBACK variable header and payload: packet id plus one return code per
/// filter in the originating SUBSCRIBE, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariablesSuback {
    pub packet_id: u16,
    pub return_codes: Vec<SubscribeReturnCode>,
}

impl VariablesSuback {
    /// # Errors
    ///
    /// Returns `DecodeError::InvalidReturnCode` if a return-code byte is
    /// not one of `{0, 1, 2, 0x80}`, or `DecodeError::EmptyTopics` if the
    /// return-code list is empty.
    pub fn decode(ba: &mut ByteArray, header: &FixedHeader) -> Result<Self, DecodeError> {
        let packet_id = ba.read_u16()?;

        let mut return_codes = Vec::new();
        let mut consumed: u32 = 2;
        while consumed < header.remaining_length() {
            let code = SubscribeReturnCode::try_from(ba.read_byte()?)?;
            consumed += 1;
            return_codes.push(code);
        }

        if return_codes.is_empty() {
            return Err(DecodeError::EmptyTopics);
        }

        Ok(Self {
            packet_id,
            return_codes,
        })
    }

    #[must_use]
    pub fn size(&self) -> usize {
        2 + self.return_codes.len()
    }

    /// # Errors
    ///
    /// Propagates any `std::io::Error` converted via `EncodeError`.
    pub fn encode(&self, buf: &mut Vec<u8>) -> Result<usize, EncodeError> {
        let old_len = buf.len();
        buf.write_u16::<BigEndian>(self.packet_id)?;
        for code in &self.return_codes {
            buf.push((*code).into());
        }
        Ok(buf.len() - old_len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qos::QoS;

    // SUBACK scenario from §8: codes [0,1,0,2,0x80,1].
    #[test]
    fn test_decode_scenario() {
        let buf = [0xFF, 0xFF, 0x00, 0x01, 0x00, 0x02, 0x80, 0x01];
        let header = FixedHeader::new(crate::header::PacketType::SubscribeAck, buf.len() as u32).unwrap();
        let mut ba = ByteArray::new(&buf);
        let vars = VariablesSuback::decode(&mut ba, &header).unwrap();
        assert_eq!(vars.packet_id, 0xFFFF);
        assert_eq!(
            vars.return_codes,
            vec![
                SubscribeReturnCode::Granted(QoS::AtMostOnce),
                SubscribeReturnCode::Granted(QoS::AtLeastOnce),
                SubscribeReturnCode::Granted(QoS::AtMostOnce),
                SubscribeReturnCode::Granted(QoS::ExactOnce),
                SubscribeReturnCode::Subfail,
                SubscribeReturnCode::Granted(QoS::AtLeastOnce),
            ]
        );
    }

    #[test]
    fn test_decode_rejects_empty_return_codes() {
        let buf = [0x00, 0x01];
        let header = FixedHeader::new(crate::header::PacketType::SubscribeAck, buf.len() as u32).unwrap();
        let mut ba = ByteArray::new(&buf);
        assert_eq!(
            VariablesSuback::decode(&mut ba, &header).unwrap_err(),
            DecodeError::EmptyTopics
        );
    }

    #[test]
    fn test_round_trip() {
        let vars = VariablesSuback {
            packet_id: 5,
            return_codes: vec![SubscribeReturnCode::Subfail, SubscribeReturnCode::Granted(QoS::ExactOnce)],
        };
        let mut buf = Vec::new();
        let n = vars.encode(&mut buf).unwrap();
        assert_eq!(n, vars.size());
        let header = FixedHeader::new(crate::header::PacketType::SubscribeAck, buf.len() as u32).unwrap();
        let mut ba = ByteArray::new(&buf);
        assert_eq!(VariablesSuback::decode(&mut ba, &header).unwrap(), vars);
    }
}
