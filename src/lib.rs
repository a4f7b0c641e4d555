// Copyright (c) 2021 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

//! MQTT v3.1.1 packet codec and a cooperative, single-threaded Rx/Tx
//! transport handler.
//!
//! Packets are decoded field-by-field through [`ByteArray`], a borrowing
//! cursor over a buffer a [`Decoder`] has already loaded off a [`Transport`].
//! [`Rx`] drives that loop end to end, dispatching each decoded packet to an
//! [`EventHandler`]; [`Tx`] encodes and writes packets the other way.
//! [`RxTx`] composes one of each over a shared transport slot so either half
//! poisoning the connection is visible to the other.

mod base;
mod byte_array;
mod connect;
mod connect_ack;
mod connect_flags;
mod decoder;
mod error;
mod event;
mod header;
mod protocol_level;
mod publish;
mod qos;
mod rx;
mod rxtx;
mod subscribe;
mod subscribe_ack;
mod transport;
mod tx;
mod unsubscribe;
pub mod utils;
mod varint;

pub use base::{DecodePacket, EncodePacket, PacketId};
pub use byte_array::{ByteArray, ByteArrayError};
pub use connect::{VariablesConnect, Will};
pub use connect_ack::{ConnectReturnCode, VariablesConnack};
pub use connect_flags::ConnectFlags;
pub use decoder::{AllocDecoder, Decoder, LoadError, NoAllocDecoder};
pub use error::{DecodeError, EncodeError, Error};
pub use event::{CallbackResult, EventHandler, NullEventHandler};
pub use header::{FixedHeader, PacketType};
pub use protocol_level::ProtocolLevel;
pub use publish::VariablesPublish;
pub use qos::{QoS, SubscribeReturnCode};
pub use rx::Rx;
pub use rxtx::RxTx;
pub use subscribe::{SubscribeTopic, VariablesSubscribe};
pub use subscribe_ack::VariablesSuback;
pub use transport::{LoopbackTransport, Transport};
pub use tx::Tx;
pub use unsubscribe::VariablesUnsubscribe;
pub use varint::{VarInt, MAX_REMAINING_LENGTH};
