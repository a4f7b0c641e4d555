// Copyright (c) 2021 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

//! Transmit half of an MQTT connection: encodes one packet per call and
//! writes it to a [`Transport`] in a single `write_all`. A write failure
//! poisons the shared transport slot, mirroring [`crate::rx::Rx`].

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use crate::connect::VariablesConnect;
use crate::connect_ack::VariablesConnack;
use crate::error::{EncodeError, Error};
use crate::event::EventHandler;
use crate::header::{FixedHeader, PacketType};
use crate::publish::VariablesPublish;
use crate::qos::QoS;
use crate::subscribe::VariablesSubscribe;
use crate::subscribe_ack::VariablesSuback;
use crate::transport::Transport;
use crate::unsubscribe::VariablesUnsubscribe;
use crate::{EncodePacket, PacketId};

/// Transmit half of an MQTT connection. See [`crate::rxtx::RxTx`] for the
/// common way to obtain one sharing a transport with a [`crate::rx::Rx`].
pub struct Tx<T: Transport, H: EventHandler> {
    transport: Rc<RefCell<Option<T>>>,
    handler: Rc<RefCell<H>>,
}

impl<T: Transport, H: EventHandler> Tx<T, H> {
    pub(crate) fn new(transport: Rc<RefCell<Option<T>>>, handler: Rc<RefCell<H>>) -> Self {
        Self { transport, handler }
    }

    fn poison(&mut self, err: &Error) {
        self.handler.borrow_mut().on_tx_error(err);
        if let Some(mut transport) = self.transport.borrow_mut().take() {
            let _ = transport.close();
        }
    }

    fn write_all(&mut self, buf: &[u8]) -> Result<(), Error> {
        let result = (|| -> Result<(), Error> {
            let mut guard = self.transport.borrow_mut();
            let transport = guard
                .as_mut()
                .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotConnected, "transport closed"))?;
            transport.write_all(buf)?;
            Ok(())
        })();
        if let Err(e) = &result {
            self.poison(e);
        }
        result
    }

    /// Encode `header` followed by whatever `body` already wrote into `buf`
    /// and send it as a single write.
    fn send(&mut self, packet_type: PacketType, remaining_length: usize, buf: Vec<u8>) -> Result<(), Error> {
        let header = FixedHeader::new(packet_type, remaining_length as u32)
            .map_err(|_e| Error::from_variable_header(crate::error::DecodeError::InvalidVarInt))?;
        let mut out = Vec::with_capacity(header.bytes() + buf.len());
        header.encode(&mut out).map_err(encode_err)?;
        out.extend_from_slice(&buf);
        self.write_all(&out)
    }

    /// # Errors
    ///
    /// Returns a transport error if the write fails.
    pub fn write_connect(&mut self, vars: &VariablesConnect) -> Result<(), Error> {
        let mut buf = Vec::new();
        vars.encode(&mut buf).map_err(encode_err)?;
        self.send(PacketType::Connect, vars.size(), buf)
    }

    /// # Errors
    ///
    /// Returns a transport error if the write fails.
    pub fn write_connack(&mut self, vars: &VariablesConnack) -> Result<(), Error> {
        let mut buf = Vec::new();
        vars.encode(&mut buf).map_err(encode_err)?;
        self.send(PacketType::ConnectAck, vars.size(), buf)
    }

    /// Write a PUBLISH whose payload is already in memory.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the write fails, or
    /// `Error::MalformedVariableHeader` if `qos` and `vars.packet_id`
    /// disagree on whether a packet id is present.
    pub fn write_publish(
        &mut self,
        vars: &VariablesPublish,
        payload: &[u8],
        qos: QoS,
        dup: bool,
        retain: bool,
    ) -> Result<(), Error> {
        if vars.packet_id.is_some() != (qos != QoS::AtMostOnce) {
            return Err(Error::from_variable_header(crate::error::DecodeError::InvalidPacketId));
        }
        let mut buf = Vec::new();
        vars.encode(&mut buf).map_err(encode_err)?;
        buf.extend_from_slice(payload);
        self.send(PacketType::Publish { dup, qos, retain }, vars.size() + payload.len(), buf)
    }

    /// # Errors
    ///
    /// Returns a transport error if the write fails.
    pub fn write_subscribe(&mut self, vars: &VariablesSubscribe) -> Result<(), Error> {
        let mut buf = Vec::new();
        vars.encode(&mut buf).map_err(encode_err)?;
        self.send(PacketType::Subscribe, vars.size(), buf)
    }

    /// # Errors
    ///
    /// Returns a transport error if the write fails.
    pub fn write_suback(&mut self, vars: &VariablesSuback) -> Result<(), Error> {
        let mut buf = Vec::new();
        vars.encode(&mut buf).map_err(encode_err)?;
        self.send(PacketType::SubscribeAck, vars.size(), buf)
    }

    /// # Errors
    ///
    /// Returns a transport error if the write fails.
    pub fn write_unsubscribe(&mut self, vars: &VariablesUnsubscribe) -> Result<(), Error> {
        let mut buf = Vec::new();
        vars.encode(&mut buf).map_err(encode_err)?;
        self.send(PacketType::Unsubscribe, vars.size(), buf)
    }

    /// Write a PUBACK/PUBREC/PUBREL/PUBCOMP/UNSUBACK: a 2-byte packet id and
    /// nothing else.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the write fails, or
    /// `Error::MalformedVariableHeader` if `packet_type` is not one of the
    /// identified types.
    pub fn write_identified(&mut self, packet_type: PacketType, packet_id: PacketId) -> Result<(), Error> {
        if !matches!(
            packet_type,
            PacketType::PublishAck
                | PacketType::PublishReceived
                | PacketType::PublishRelease
                | PacketType::PublishComplete
                | PacketType::UnsubscribeAck
        ) {
            return Err(Error::from_variable_header(crate::error::DecodeError::InvalidPacketType));
        }
        self.send(packet_type, 2, packet_id.to_be_bytes().to_vec())
    }

    /// Write a PINGREQ, PINGRESP, or DISCONNECT: no variable header at all.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the write fails.
    pub fn write_simple(&mut self, packet_type: PacketType) -> Result<(), Error> {
        debug_assert!(matches!(
            packet_type,
            PacketType::PingRequest | PacketType::PingResponse | PacketType::Disconnect
        ));
        self.send(packet_type, 0, Vec::new())
    }
}

fn encode_err(_e: EncodeError) -> Error {
    Error::TransportError(std::io::Error::new(std::io::ErrorKind::InvalidData, "encode failed"))
}
