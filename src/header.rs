// Copyright (c) 2021 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

use std::convert::TryFrom;

use crate::byte_array::ByteArray;
use crate::error::{DecodeError, EncodeError};
use crate::qos::QoS;
use crate::varint::VarInt;
use crate::{DecodePacket, EncodePacket};

/// Control packet type together with its fixed-header flag bits. `Publish`
/// carries its DUP/QoS/RETAIN bits inline since they are only meaningful,
/// and only validated, for that one type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PacketType {
    Connect,
    ConnectAck,
    Publish { dup: bool, qos: QoS, retain: bool },
    PublishAck,
    PublishReceived,
    PublishRelease,
    PublishComplete,
    Subscribe,
    SubscribeAck,
    Unsubscribe,
    UnsubscribeAck,
    PingRequest,
    PingResponse,
    Disconnect,
}

impl PacketType {
    /// Byte length of the type+flags portion of the fixed header: always 1.
    #[must_use]
    pub const fn bytes() -> usize {
        1
    }

    /// True for the packet types that carry a packet identifier in their
    /// variable header (`Publish` only when QoS is 1 or 2).
    #[must_use]
    pub const fn has_packet_id(&self) -> bool {
        matches!(
            self,
            Self::Publish {
                qos: QoS::AtLeastOnce | QoS::ExactOnce,
                ..
            } | Self::PublishAck
                | Self::PublishReceived
                | Self::PublishRelease
                | Self::PublishComplete
                | Self::Subscribe
                | Self::SubscribeAck
                | Self::Unsubscribe
                | Self::UnsubscribeAck
        )
    }
}

impl From<PacketType> for u8 {
    fn from(packet_type: PacketType) -> Self {
        let type_bits: u8 = match packet_type {
            PacketType::Connect => 1,
            PacketType::ConnectAck => 2,
            PacketType::Publish { .. } => 3,
            PacketType::PublishAck => 4,
            PacketType::PublishReceived => 5,
            PacketType::PublishRelease => 6,
            PacketType::PublishComplete => 7,
            PacketType::Subscribe => 8,
            PacketType::SubscribeAck => 9,
            PacketType::Unsubscribe => 10,
            PacketType::UnsubscribeAck => 11,
            PacketType::PingRequest => 12,
            PacketType::PingResponse => 13,
            PacketType::Disconnect => 14,
        };

        let flag_bits: u8 = match packet_type {
            PacketType::Publish { dup, qos, retain } => {
                let dup = if dup { 0b0000_1000 } else { 0 };
                let qos: u8 = qos.into();
                let retain = if retain { 0b0000_0001 } else { 0 };
                dup | (qos << 1) | retain
            }
            PacketType::PublishRelease | PacketType::Subscribe | PacketType::Unsubscribe => {
                0b0000_0010
            }
            _ => 0,
        };

        (type_bits << 4) | flag_bits
    }
}

impl TryFrom<u8> for PacketType {
    type Error = DecodeError;

    /// Parse the type+flags byte, validating the per-type flag-bit
    /// constraints in one place. Packet types `0` and `15` are forbidden by
    /// the wire format.
    ///
    /// # Errors
    ///
    /// Returns `DecodeError::InvalidPacketType` for types `0`/`15`, or
    /// `DecodeError::InvalidPacketFlags` when a type's reserved flag bits
    /// carry an unexpected value.
    fn try_from(v: u8) -> Result<Self, Self::Error> {
        let type_bits = (v & 0b1111_0000) >> 4;
        let flags = v & 0b0000_1111;

        match type_bits {
            1 if flags == 0 => Ok(Self::Connect),
            2 if flags == 0 => Ok(Self::ConnectAck),
            3 => {
                let dup = (flags & 0b0000_1000) != 0;
                let retain = (flags & 0b0000_0001) != 0;
                let qos = QoS::try_from((flags & 0b0000_0110) >> 1)?;
                Ok(Self::Publish { dup, qos, retain })
            }
            4 if flags == 0 => Ok(Self::PublishAck),
            5 if flags == 0 => Ok(Self::PublishReceived),
            6 if flags == 0b0010 => Ok(Self::PublishRelease),
            7 if flags == 0 => Ok(Self::PublishComplete),
            8 if flags == 0b0010 => Ok(Self::Subscribe),
            9 if flags == 0 => Ok(Self::SubscribeAck),
            10 if flags == 0b0010 => Ok(Self::Unsubscribe),
            11 if flags == 0 => Ok(Self::UnsubscribeAck),
            12 if flags == 0 => Ok(Self::PingRequest),
            13 if flags == 0 => Ok(Self::PingResponse),
            14 if flags == 0 => Ok(Self::Disconnect),
            1..=14 => {
                log::error!("header: invalid flag bits {flags:#06b} for packet type {type_bits}");
                Err(DecodeError::InvalidPacketFlags)
            }
            _ => {
                log::error!("header: forbidden packet type {type_bits:#06b}");
                Err(DecodeError::InvalidPacketType)
            }
        }
    }
}

/// Fixed header: the 2-5 byte framing prefix present on every MQTT packet.
///
/// ```txt
///  7 6 5 4 3 2 1 0
/// +-------+-------+
/// | Type  | Flags |
/// +-------+-------+
/// | Remaining Len |
/// +-------+-------+
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixedHeader {
    packet_type: PacketType,
    remaining_length: VarInt,
}

impl FixedHeader {
    /// Construct a new fixed header.
    ///
    /// # Errors
    ///
    /// Returns `EncodeError::InvalidVarInt` if `remaining_length` exceeds
    /// `0x0FFF_FFFF`.
    pub fn new(packet_type: PacketType, remaining_length: u32) -> Result<Self, EncodeError> {
        Ok(Self {
            packet_type,
            remaining_length: VarInt::from_u32(remaining_length)?,
        })
    }

    #[must_use]
    pub const fn packet_type(&self) -> PacketType {
        self.packet_type
    }

    #[must_use]
    pub const fn remaining_length(&self) -> u32 {
        self.remaining_length.value()
    }

    /// Total byte length of this header once encoded (1 + varint length).
    #[must_use]
    pub const fn bytes(&self) -> usize {
        PacketType::bytes() + self.remaining_length.bytes()
    }

    /// Returns true for the packet types that carry a packet identifier.
    #[must_use]
    pub const fn has_packet_id(&self) -> bool {
        self.packet_type.has_packet_id()
    }
}

impl DecodePacket for FixedHeader {
    /// Decode a fixed header from `ba`.
    ///
    /// # Errors
    ///
    /// Returns `DecodeError::InvalidPacketType`/`InvalidPacketFlags` for a
    /// malformed type+flags byte, or `DecodeError::InvalidVarInt` for a
    /// malformed remaining-length varint.
    fn decode(ba: &mut ByteArray) -> Result<Self, DecodeError> {
        let flag = ba.read_byte()?;
        let packet_type = PacketType::try_from(flag)?;
        let remaining_length = VarInt::decode(ba)?;
        Ok(Self {
            packet_type,
            remaining_length,
        })
    }
}

impl EncodePacket for FixedHeader {
    /// Encode this fixed header into `buf`, returning the byte count
    /// written.
    ///
    /// # Errors
    ///
    /// Propagates any `EncodeError` from the inner varint encode (never
    /// actually fails since `remaining_length` is already range-checked).
    fn encode(&self, buf: &mut Vec<u8>) -> Result<usize, EncodeError> {
        let byte: u8 = self.packet_type.into();
        buf.push(byte);
        let len = self.remaining_length.encode(buf)?;
        Ok(PacketType::bytes() + len)
    }
}
