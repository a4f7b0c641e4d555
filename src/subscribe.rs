// Copyright (c) 2021 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

use std::convert::TryFrom;
use std::io::Write;

use byteorder::{BigEndian, WriteBytesExt};

use crate::byte_array::ByteArray;
use crate::error::{DecodeError, EncodeError};
use crate::header::FixedHeader;
use crate::qos::QoS;

/// One (topic-filter, requested QoS) pair from a SUBSCRIBE payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscribeTopic<'d> {
    pub filter: &'d str,
    pub qos: QoS,
}

/// SUBSCRIBE variable header and payload: packet id plus an ordered,
/// non-empty list of topic filter/QoS pairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariablesSubscribe<'d> {
    pub packet_id: u16,
    pub topics: Vec<SubscribeTopic<'d>>,
}

impl<'d> VariablesSubscribe<'d> {
    /// Decode using `header.remaining_length()` to know where the topic
    /// list ends.
    ///
    /// # Errors
    ///
    /// Returns `DecodeError::InvalidPacketId` if the packet id is zero,
    /// `DecodeError::InvalidQoS` if a requested QoS byte has its reserved
    /// upper bits set or encodes `3`, or `DecodeError::EmptyTopics` if the
    /// filter list is empty.
    pub fn decode(ba: &mut ByteArray<'d>, header: &FixedHeader) -> Result<Self, DecodeError> {
        let packet_id = ba.read_u16()?;
        if packet_id == 0 {
            return Err(DecodeError::InvalidPacketId);
        }

        let mut topics = Vec::new();
        let mut consumed: u32 = 2;
        while consumed < header.remaining_length() {
            let filter_len = ba.read_u16()? as usize;
            consumed += 2;
            let filter = ba.read_string(filter_len)?;
            consumed += filter_len as u32;

            let qos_byte = ba.read_byte()?;
            consumed += 1;
            if qos_byte & 0b1111_1100 != 0 {
                return Err(DecodeError::InvalidQoS);
            }
            let qos = QoS::try_from(qos_byte)?;

            topics.push(SubscribeTopic { filter, qos });
        }

        if topics.is_empty() {
            return Err(DecodeError::EmptyTopics);
        }

        Ok(Self { packet_id, topics })
    }

    #[must_use]
    pub fn size(&self) -> usize {
        2 + self
            .topics
            .iter()
            .map(|t| 2 + t.filter.len() + 1)
            .sum::<usize>()
    }

    /// # Errors
    ///
    /// Propagates any `std::io::Error` converted via `EncodeError`.
    pub fn encode(&self, buf: &mut Vec<u8>) -> Result<usize, EncodeError> {
        let old_len = buf.len();
        buf.write_u16::<BigEndian>(self.packet_id)?;
        for topic in &self.topics {
            buf.write_u16::<BigEndian>(topic.filter.len() as u16)?;
            buf.write_all(topic.filter.as_bytes())?;
            buf.push(topic.qos.into());
        }
        Ok(buf.len() - old_len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // SUBSCRIBE scenario from §8: 4 filters all QoS2.
    const WIRE: [u8; 52] = [
        0xFF, 0xFF, 0x00, 0x09, b'f', b'a', b'v', b'o', b'r', b'i', b't', b'e', b's', 0x02, 0x00,
        0x09, b't', b'h', b'e', b'-', b'c', b'l', b'a', b's', b'h', 0x02, 0x00, 0x0F, b'a', b'l',
        b'w', b'a', b'y', b's', b'-', b'w', b'a', b't', b'c', b'h', b'i', b'n', b'g', 0x02, 0x00,
        0x05, b'k', b'-', b'p', b'o', b'p', 0x02,
    ];

    #[test]
    fn test_decode_scenario() {
        let header = FixedHeader::new(
            crate::header::PacketType::Subscribe,
            WIRE.len() as u32,
        )
        .unwrap();
        let mut ba = ByteArray::new(&WIRE);
        let vars = VariablesSubscribe::decode(&mut ba, &header).unwrap();
        assert_eq!(vars.packet_id, 0xFFFF);
        assert_eq!(vars.topics.len(), 4);
        assert_eq!(vars.topics[0].filter, "favorites");
        assert!(vars.topics.iter().all(|t| t.qos == QoS::ExactOnce));
    }

    #[test]
    fn test_decode_rejects_zero_packet_id() {
        let buf = [0x00, 0x00, 0x00, 0x01, b'a', 0x00];
        let header = FixedHeader::new(crate::header::PacketType::Subscribe, buf.len() as u32).unwrap();
        let mut ba = ByteArray::new(&buf);
        assert_eq!(
            VariablesSubscribe::decode(&mut ba, &header).unwrap_err(),
            DecodeError::InvalidPacketId
        );
    }

    #[test]
    fn test_decode_rejects_reserved_qos_bits() {
        let buf = [0x00, 0x01, 0x00, 0x01, b'a', 0b0000_0011];
        let header = FixedHeader::new(crate::header::PacketType::Subscribe, buf.len() as u32).unwrap();
        let mut ba = ByteArray::new(&buf);
        assert_eq!(
            VariablesSubscribe::decode(&mut ba, &header).unwrap_err(),
            DecodeError::InvalidQoS
        );
    }

    #[test]
    fn test_round_trip() {
        let vars = VariablesSubscribe {
            packet_id: 9,
            topics: vec![SubscribeTopic {
                filter: "a/b",
                qos: QoS::AtLeastOnce,
            }],
        };
        let mut buf = Vec::new();
        let n = vars.encode(&mut buf).unwrap();
        assert_eq!(n, vars.size());
        let header = FixedHeader::new(crate::header::PacketType::Subscribe, buf.len() as u32).unwrap();
        let mut ba = ByteArray::new(&buf);
        assert_eq!(VariablesSubscribe::decode(&mut ba, &header).unwrap(), vars);
    }
}
