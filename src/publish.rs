// Copyright (c) 2021 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

use std::io::Write;

use byteorder::{BigEndian, WriteBytesExt};

use crate::byte_array::ByteArray;
use crate::error::{DecodeError, EncodeError};
use crate::qos::QoS;
use crate::utils;

/// PUBLISH variable header. Payload bytes are not part of this value; `Rx`
/// exposes them separately as a bounded reader (see [`crate::rx::Rx`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariablesPublish<'d> {
    pub topic: &'d str,
    pub packet_id: Option<u16>,
}

pub(crate) fn validate_topic(topic: &str) -> Result<(), DecodeError> {
    if topic.is_empty() || topic.contains(['+', '#']) {
        Err(DecodeError::InvalidString)
    } else {
        Ok(())
    }
}

impl<'d> VariablesPublish<'d> {
    /// Decode topic name and, for QoS 1/2, packet identifier out of `ba`.
    ///
    /// # Errors
    ///
    /// Returns `DecodeError::InvalidString` if the topic is empty or
    /// contains a wildcard character, or `DecodeError::InvalidPacketId` if
    /// QoS is >= 1 and the packet id is zero.
    pub fn decode(ba: &mut ByteArray<'d>, qos: QoS) -> Result<Self, DecodeError> {
        let topic_len = ba.read_u16()? as usize;
        Self::decode_body(ba, topic_len, qos)
    }

    /// Decode the topic name and, for QoS 1/2, packet identifier out of `ba`,
    /// given a topic length already read off the wire. Lets `Rx` read the
    /// length prefix directly from the transport (it must, to know how many
    /// bytes to load into the decoder) without duplicating the rest of this
    /// parsing.
    ///
    /// # Errors
    ///
    /// Same as [`Self::decode`].
    pub(crate) fn decode_body(ba: &mut ByteArray<'d>, topic_len: usize, qos: QoS) -> Result<Self, DecodeError> {
        let topic = ba.read_string(topic_len)?;
        validate_topic(topic)?;

        let packet_id = if qos == QoS::AtMostOnce {
            None
        } else {
            let id = ba.read_u16()?;
            if id == 0 {
                return Err(DecodeError::InvalidPacketId);
            }
            Some(id)
        };

        Ok(Self { topic, packet_id })
    }

    /// Byte length of the variable header only (excludes payload).
    #[must_use]
    pub fn size(&self) -> usize {
        2 + self.topic.len() + self.packet_id.map_or(0, |_| 2)
    }

    /// # Errors
    ///
    /// Propagates any `std::io::Error` converted via `EncodeError`, or
    /// `EncodeError::TooManyData` if the topic does not fit a u16 length
    /// prefix.
    pub fn encode(&self, buf: &mut Vec<u8>) -> Result<usize, EncodeError> {
        let old_len = buf.len();
        utils::validate_two_bytes_data(self.topic.len()).map_err(|_e| EncodeError::TooManyData)?;
        buf.write_u16::<BigEndian>(self.topic.len() as u16)?;
        buf.write_all(self.topic.as_bytes())?;
        if let Some(packet_id) = self.packet_id {
            buf.write_u16::<BigEndian>(packet_id)?;
        }
        Ok(buf.len() - old_len)
    }
}
