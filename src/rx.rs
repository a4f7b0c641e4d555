// Copyright (c) 2021 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

//! Receive half of an MQTT connection: reads one packet at a time off a
//! [`Transport`], decodes it, and dispatches the result to an
//! [`EventHandler`]. A decode or transport failure poisons the shared
//! transport slot; every subsequent call observes the same error.

use std::cell::RefCell;
use std::io::Read;
use std::rc::Rc;

use crate::byte_array::ByteArray;
use crate::connect::VariablesConnect;
use crate::connect_ack::VariablesConnack;
use crate::decoder::{Decoder, LoadError};
use crate::error::{DecodeError, Error};
use crate::event::EventHandler;
use crate::header::{FixedHeader, PacketType};
use crate::publish::VariablesPublish;
use crate::qos::QoS;
use crate::subscribe::VariablesSubscribe;
use crate::subscribe_ack::VariablesSuback;
use crate::transport::Transport;
use crate::unsubscribe::VariablesUnsubscribe;
use crate::{DecodePacket, PacketId};

struct SharedReader<'t, T> {
    transport: &'t Rc<RefCell<Option<T>>>,
}

impl<'t, T: Transport> Read for SharedReader<'t, T> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let mut guard = self.transport.borrow_mut();
        let transport = guard
            .as_mut()
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotConnected, "transport closed"))?;
        transport.read(buf)
    }
}

/// Bounded view over a PUBLISH packet's payload, handed to
/// [`EventHandler::on_publish`] as `&mut dyn Read`. Reads past the payload's
/// declared length return EOF rather than consuming the next packet.
struct PublishReader<'t, T> {
    inner: SharedReader<'t, T>,
    remaining: u64,
}

impl<'t, T: Transport> Read for PublishReader<'t, T> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if self.remaining == 0 {
            return Ok(0);
        }
        let max = (buf.len() as u64).min(self.remaining) as usize;
        let n = self.inner.read(&mut buf[..max])?;
        self.remaining -= n as u64;
        Ok(n)
    }
}

fn read_u16(ba: &mut ByteArray) -> Result<u16, Error> {
    ba.read_u16().map_err(DecodeError::from).map_err(Error::from_variable_header)
}

/// `Decoder::load` keeps buffer-exhaustion and transport I/O failures
/// distinct; fold them into the right classified `Error` variant rather
/// than flattening both into a decode error (a transport hiccup is not a
/// malformed packet).
fn map_load_err(e: LoadError) -> Error {
    match e {
        LoadError::BufferExceeded => Error::BufferExceeded,
        LoadError::Io(e) => Error::TransportError(e),
    }
}

/// Receive half of an MQTT connection. See [`crate::rxtx::RxTx`] for the
/// common way to obtain one sharing a transport with a [`crate::tx::Tx`].
pub struct Rx<T: Transport, D: Decoder, H: EventHandler> {
    transport: Rc<RefCell<Option<T>>>,
    decoder: D,
    handler: Rc<RefCell<H>>,
    last_received_header: Option<FixedHeader>,
}

impl<T: Transport, D: Decoder, H: EventHandler> Rx<T, D, H> {
    pub(crate) fn new(transport: Rc<RefCell<Option<T>>>, decoder: D, handler: Rc<RefCell<H>>) -> Self {
        Self {
            transport,
            decoder,
            handler,
            last_received_header: None,
        }
    }

    /// The fixed header of the most recently read packet, if any.
    #[must_use]
    pub const fn last_received_header(&self) -> Option<FixedHeader> {
        self.last_received_header
    }

    fn poison(&mut self, err: &Error) {
        log::warn!("rx: poisoning transport after error: {err}");
        self.handler.borrow_mut().on_rx_error(err);
        if let Some(mut transport) = self.transport.borrow_mut().take() {
            let _ = transport.close();
        }
    }

    fn read_fixed_header(&self) -> Result<FixedHeader, Error> {
        let mut reader = SharedReader {
            transport: &self.transport,
        };
        let mut buf = [0u8; 5];
        reader.read_exact(&mut buf[..1])?;
        let mut len = 1;
        loop {
            reader.read_exact(&mut buf[len..=len])?;
            let continues = buf[len] & 0x80 != 0;
            len += 1;
            if !continues || len == 5 {
                break;
            }
        }
        let mut ba = ByteArray::new(&buf[..len]);
        FixedHeader::decode(&mut ba).map_err(Error::from_fixed_header)
    }

    /// Read and dispatch exactly one packet.
    ///
    /// # Errors
    ///
    /// Returns any transport, decode, or callback error. The shared
    /// transport slot is cleared before this method returns an error.
    pub fn read_next_packet(&mut self) -> Result<(), Error> {
        match self.read_next_packet_inner() {
            Ok(()) => Ok(()),
            Err(e) => {
                // A callback error raised from `on_other` for a PINGRESP is
                // surfaced but does not poison the connection: keep-alive
                // bookkeeping errors shouldn't tear down the transport.
                let is_pingresp_callback_error = matches!(e, Error::CallbackError(_))
                    && matches!(
                        self.last_received_header.map(|h| h.packet_type()),
                        Some(PacketType::PingResponse)
                    );
                if is_pingresp_callback_error {
                    self.handler.borrow_mut().on_rx_error(&e);
                } else {
                    self.poison(&e);
                }
                Err(e)
            }
        }
    }

    fn read_next_packet_inner(&mut self) -> Result<(), Error> {
        let header = self.read_fixed_header()?;
        self.last_received_header = Some(header);
        let remaining_length = header.remaining_length() as usize;

        let result = self.dispatch(header, remaining_length);
        if result.is_ok() {
            log::trace!(
                "rx: dispatched {:?}, remaining_length={remaining_length}",
                header.packet_type()
            );
        }
        result
    }

    fn dispatch(&mut self, header: FixedHeader, remaining_length: usize) -> Result<(), Error> {
        match header.packet_type() {
            PacketType::Connect => {
                let mut reader = SharedReader {
                    transport: &self.transport,
                };
                self.decoder
                    .load(&mut reader, remaining_length)
                    .map_err(map_load_err)?;
                let mut ba = ByteArray::new(self.decoder.as_slice());
                let vars = VariablesConnect::decode(&mut ba).map_err(Error::from_variable_header)?;
                if ba.remaining_bytes() != 0 {
                    return Err(Error::RemainingLengthMismatch);
                }
                self.handler.borrow_mut().on_connect(&vars).map_err(Error::CallbackError)
            }
            PacketType::ConnectAck => {
                if header.remaining_length() != 2 {
                    return Err(Error::RemainingLengthMismatch);
                }
                let mut reader = SharedReader {
                    transport: &self.transport,
                };
                self.decoder.load(&mut reader, 2).map_err(map_load_err)?;
                let mut ba = ByteArray::new(self.decoder.as_slice());
                let vars = VariablesConnack::decode(&mut ba).map_err(Error::from_variable_header)?;
                self.handler.borrow_mut().on_connack(vars).map_err(Error::CallbackError)
            }
            PacketType::Publish { qos, .. } => self.read_publish(remaining_length, qos),
            PacketType::Subscribe => {
                let mut reader = SharedReader {
                    transport: &self.transport,
                };
                self.decoder
                    .load(&mut reader, remaining_length)
                    .map_err(map_load_err)?;
                let mut ba = ByteArray::new(self.decoder.as_slice());
                let vars = VariablesSubscribe::decode(&mut ba, &header).map_err(Error::from_variable_header)?;
                self.handler.borrow_mut().on_subscribe(&vars).map_err(Error::CallbackError)
            }
            PacketType::SubscribeAck => {
                let mut reader = SharedReader {
                    transport: &self.transport,
                };
                self.decoder
                    .load(&mut reader, remaining_length)
                    .map_err(map_load_err)?;
                let mut ba = ByteArray::new(self.decoder.as_slice());
                let vars = VariablesSuback::decode(&mut ba, &header).map_err(Error::from_variable_header)?;
                self.handler.borrow_mut().on_suback(&vars).map_err(Error::CallbackError)
            }
            PacketType::Unsubscribe => {
                let mut reader = SharedReader {
                    transport: &self.transport,
                };
                self.decoder
                    .load(&mut reader, remaining_length)
                    .map_err(map_load_err)?;
                let mut ba = ByteArray::new(self.decoder.as_slice());
                let vars = VariablesUnsubscribe::decode(&mut ba, &header).map_err(Error::from_variable_header)?;
                self.handler.borrow_mut().on_unsubscribe(&vars).map_err(Error::CallbackError)
            }
            PacketType::PublishAck
            | PacketType::PublishReceived
            | PacketType::PublishRelease
            | PacketType::PublishComplete
            | PacketType::UnsubscribeAck => {
                if header.remaining_length() != 2 {
                    return Err(Error::RemainingLengthMismatch);
                }
                let mut reader = SharedReader {
                    transport: &self.transport,
                };
                self.decoder.load(&mut reader, 2).map_err(map_load_err)?;
                let mut ba = ByteArray::new(self.decoder.as_slice());
                let packet_id = read_u16(&mut ba)?;
                self.handler.borrow_mut().on_other(header.packet_type(), packet_id).map_err(Error::CallbackError)
            }
            PacketType::PingRequest | PacketType::PingResponse | PacketType::Disconnect => {
                if header.remaining_length() != 0 {
                    return Err(Error::RemainingLengthMismatch);
                }
                self.handler.borrow_mut().on_other(header.packet_type(), 0).map_err(Error::CallbackError)
            }
        }
    }

    fn read_publish(&mut self, remaining_length: usize, qos: QoS) -> Result<(), Error> {
        let mut len_buf = [0u8; 2];
        {
            let mut reader = SharedReader {
                transport: &self.transport,
            };
            reader.read_exact(&mut len_buf)?;
        }
        let topic_len = u16::from_be_bytes(len_buf) as usize;
        let id_len = if qos == QoS::AtMostOnce { 0 } else { 2 };
        let consumed = 2 + topic_len + id_len;
        if consumed > remaining_length {
            return Err(Error::RemainingLengthMismatch);
        }

        {
            let mut reader = SharedReader {
                transport: &self.transport,
            };
            self.decoder
                .load(&mut reader, topic_len + id_len)
                .map_err(map_load_err)?;
        }
        let mut ba = ByteArray::new(self.decoder.as_slice());
        let vars = VariablesPublish::decode_body(&mut ba, topic_len, qos).map_err(Error::from_variable_header)?;

        let payload_len = (remaining_length - consumed) as u64;

        let mut reader = PublishReader {
            inner: SharedReader {
                transport: &self.transport,
            },
            remaining: payload_len,
        };
        let callback_result = self
            .handler
            .borrow_mut()
            .on_publish(&vars, &mut reader)
            .map_err(Error::CallbackError);
        let drain_result = std::io::copy(&mut reader, &mut std::io::sink());
        callback_result?;
        drain_result?;
        Ok(())
    }
}
