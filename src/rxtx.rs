// Copyright (c) 2021 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

//! Composes a [`crate::rx::Rx`] and [`crate::tx::Tx`] over one shared
//! transport slot, so either half observes the other poisoning the
//! connection.

use std::cell::RefCell;
use std::rc::Rc;

use crate::decoder::Decoder;
use crate::event::EventHandler;
use crate::rx::Rx;
use crate::transport::Transport;
use crate::tx::Tx;

pub struct RxTx<T: Transport, D: Decoder, H: EventHandler> {
    transport: Rc<RefCell<Option<T>>>,
    handler: Rc<RefCell<H>>,
    rx: Rx<T, D, H>,
    tx: Tx<T, H>,
}

impl<T: Transport, D: Decoder, H: EventHandler> RxTx<T, D, H> {
    pub fn new(transport: T, decoder: D, handler: H) -> Self {
        let transport = Rc::new(RefCell::new(Some(transport)));
        let handler = Rc::new(RefCell::new(handler));
        let rx = Rx::new(transport.clone(), decoder, handler.clone());
        let tx = Tx::new(transport.clone(), handler.clone());
        Self { transport, handler, rx, tx }
    }

    pub fn rx(&mut self) -> &mut Rx<T, D, H> {
        &mut self.rx
    }

    pub fn tx(&mut self) -> &mut Tx<T, H> {
        &mut self.tx
    }

    /// Split into independent `Rx`/`Tx` halves, still sharing the
    /// transport slot.
    pub fn into_parts(self) -> (Rx<T, D, H>, Tx<T, H>) {
        (self.rx, self.tx)
    }

    /// Install a new transport, e.g. after reconnecting. The previous
    /// transport (if any) is dropped without an explicit close; callers
    /// that need a graceful close should call [`RxTx::close`] first.
    pub fn set_transport(&mut self, transport: T) {
        *self.transport.borrow_mut() = Some(transport);
    }

    /// Close and clear the shared transport slot.
    pub fn close(&mut self) {
        if let Some(mut transport) = self.transport.borrow_mut().take() {
            let _ = transport.close();
        }
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.transport.borrow().is_some()
    }
}

impl<T: Transport, D: Decoder + Default, H: EventHandler> RxTx<T, D, H> {
    /// A second `Rx` handle sharing this connection's transport slot, with
    /// its own fresh decoder and a clone of the event handler. Useful for
    /// handing an independent receive loop to another thread-of-control
    /// while keeping this `RxTx`'s `Tx` half on the caller's side.
    #[must_use]
    pub fn shallow_copy(&self) -> Rx<T, D, H>
    where
        H: Clone,
    {
        let handler = self.handler.borrow().clone();
        Rx::new(self.transport.clone(), D::default(), Rc::new(RefCell::new(handler)))
    }
}
