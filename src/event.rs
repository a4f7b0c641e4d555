// Copyright (c) 2021 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

//! Visitor invoked by [`crate::rx::Rx`]/[`crate::tx::Tx`] as packets arrive or
//! fail. Every method has a default no-op (PUBLISH's default drains the
//! payload reader to completion), so implementors only override the events
//! they care about.

use std::io::Read;

use crate::connect::VariablesConnect;
use crate::connect_ack::VariablesConnack;
use crate::publish::VariablesPublish;
use crate::subscribe::VariablesSubscribe;
use crate::subscribe_ack::VariablesSuback;
use crate::unsubscribe::VariablesUnsubscribe;
use crate::PacketId;

/// Error type a callback may return; boxed into [`crate::error::Error::CallbackError`]
/// by whichever of `Rx`/`Tx` invoked it.
pub type CallbackResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

pub trait EventHandler {
    /// A CONNECT packet was received.
    ///
    /// # Errors
    ///
    /// Any error returned is wrapped in [`crate::error::Error::CallbackError`]
    /// and poisons the owning `Rx`.
    fn on_connect(&mut self, _vars: &VariablesConnect) -> CallbackResult {
        Ok(())
    }

    /// A CONNACK packet was received.
    fn on_connack(&mut self, _vars: VariablesConnack) -> CallbackResult {
        Ok(())
    }

    /// A PUBLISH packet was received. `payload` yields exactly the
    /// remaining-length bytes that follow the variable header; the default
    /// implementation drains it silently, and `Rx` drains whatever is left
    /// unread once this call returns (success or failure).
    ///
    /// # Errors
    ///
    /// Any error returned is wrapped in [`crate::error::Error::CallbackError`]
    /// and poisons the owning `Rx`.
    fn on_publish(&mut self, _vars: &VariablesPublish, payload: &mut dyn Read) -> CallbackResult {
        std::io::copy(payload, &mut std::io::sink())?;
        Ok(())
    }

    /// A SUBSCRIBE packet was received.
    fn on_subscribe(&mut self, _vars: &VariablesSubscribe) -> CallbackResult {
        Ok(())
    }

    /// A SUBACK packet was received.
    fn on_suback(&mut self, _vars: &VariablesSuback) -> CallbackResult {
        Ok(())
    }

    /// An UNSUBSCRIBE packet was received.
    fn on_unsubscribe(&mut self, _vars: &VariablesUnsubscribe) -> CallbackResult {
        Ok(())
    }

    /// Any other identified packet (PUBACK, PUBREC, PUBREL, PUBCOMP,
    /// UNSUBACK) or zero-arg packet (PINGREQ, PINGRESP, DISCONNECT).
    /// `packet_id` is `0` for the zero-arg packets.
    ///
    /// An error returned here for a PINGRESP is special-cased by `Rx`: it is
    /// surfaced to the caller but does not poison the transport, since a
    /// PINGRESP is a keep-alive acknowledgement the connection should
    /// survive a handler hiccup on.
    fn on_other(&mut self, _packet_type: crate::header::PacketType, _packet_id: PacketId) -> CallbackResult {
        Ok(())
    }

    /// A packet could not be decoded, or the transport failed while reading
    /// one. `Rx` is poisoned (its transport slot cleared) immediately after
    /// this call, except for a `CallbackError` raised from `on_other` on a
    /// PINGRESP (see `on_other`).
    fn on_rx_error(&mut self, _err: &crate::error::Error) {}

    /// A write to the transport failed. `Tx` is poisoned immediately after
    /// this call.
    fn on_tx_error(&mut self, _err: &crate::error::Error) {}
}

/// An [`EventHandler`] that does nothing and discards every error.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullEventHandler;

impl EventHandler for NullEventHandler {}
