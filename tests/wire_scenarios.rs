// Copyright (c) 2021 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

//! End-to-end exercises of `RxTx` over `LoopbackTransport`, built from the
//! literal packet byte sequences an MQTT v3.1.1 broker/client pair would
//! actually exchange.

use std::cell::RefCell;
use std::io::Read;
use std::rc::Rc;

use mqtt_codec::{
    AllocDecoder, ConnectReturnCode, EventHandler, LoopbackTransport, NullEventHandler, PacketId,
    PacketType, QoS, RxTx, SubscribeReturnCode, VariablesConnack, VariablesConnect,
    VariablesPublish, VariablesSuback, VariablesSubscribe, VariablesUnsubscribe,
};

// CONNECT: ClientID="0w", WillTopic="Bw", WillMessage="Aw", Username="Cw",
// Password="Dw", WillQoS=1, WillRetain=true, CleanSession=false, KeepAlive=60.
const CONNECT: [u8; 32] = [
    0x10, 0x1e, 0x00, 0x04, 0x4D, 0x51, 0x54, 0x54, 0x04, 0xEC, 0x00, 0x3C, 0x00, 0x02, 0x30,
    0x77, 0x00, 0x02, 0x42, 0x77, 0x00, 0x02, 0x41, 0x77, 0x00, 0x02, 0x43, 0x77, 0x00, 0x02,
    0x44, 0x77,
];

// CONNACK: session_present=true, return_code=Accepted.
const CONNACK: [u8; 4] = [0x20, 0x02, 0x01, 0x00];

// PUBLISH QoS1: topic="TOP", packet_id=0xFFFF, payload=b"hi".
const PUBLISH: [u8; 11] = [0x32, 0x09, 0x00, 0x03, b'T', b'O', b'P', 0xFF, 0xFF, b'h', b'i'];

// SUBSCRIBE: packet_id=0xFFFF, 4 filters all QoS2.
const SUBSCRIBE: [u8; 54] = [
    0x82, 0x34, 0xFF, 0xFF, 0x00, 0x09, b'f', b'a', b'v', b'o', b'r', b'i', b't', b'e', b's',
    0x02, 0x00, 0x09, b't', b'h', b'e', b'-', b'c', b'l', b'a', b's', b'h', 0x02, 0x00, 0x0F,
    b'a', b'l', b'w', b'a', b'y', b's', b'-', b'w', b'a', b't', b'c', b'h', b'i', b'n', b'g',
    0x02, 0x00, 0x05, b'k', b'-', b'p', b'o', b'p', 0x02,
];

// SUBACK: packet_id=0xFFFF, return codes [0,1,0,2,0x80,1].
const SUBACK: [u8; 10] = [0x90, 0x08, 0xFF, 0xFF, 0x00, 0x01, 0x00, 0x02, 0x80, 0x01];

// UNSUBSCRIBE: packet_id=42, one filter "a/b".
const UNSUBSCRIBE: [u8; 9] = [0xa2, 0x07, 0x00, 0x2a, 0x00, 0x03, b'a', b'/', b'b'];

// PUBREL: packet_id=7.
const PUBREL: [u8; 4] = [0x62, 0x02, 0x00, 0x07];

const PINGREQ: [u8; 2] = [0xc0, 0x00];

#[derive(Default, Clone)]
struct Recorder {
    connects: Rc<RefCell<Vec<String>>>,
    connacks: Rc<RefCell<Vec<VariablesConnack>>>,
    publishes: Rc<RefCell<Vec<(String, Vec<u8>)>>>,
    subscribes: Rc<RefCell<Vec<usize>>>,
    subacks: Rc<RefCell<Vec<Vec<SubscribeReturnCode>>>>,
    unsubscribes: Rc<RefCell<Vec<(u16, usize)>>>,
    others: Rc<RefCell<Vec<(PacketType, PacketId)>>>,
}

impl EventHandler for Recorder {
    fn on_connect(&mut self, vars: &VariablesConnect) -> mqtt_codec::CallbackResult {
        self.connects.borrow_mut().push(vars.client_id.to_string());
        Ok(())
    }

    fn on_connack(&mut self, vars: VariablesConnack) -> mqtt_codec::CallbackResult {
        self.connacks.borrow_mut().push(vars);
        Ok(())
    }

    fn on_publish(&mut self, vars: &VariablesPublish, payload: &mut dyn Read) -> mqtt_codec::CallbackResult {
        let mut bytes = Vec::new();
        payload.read_to_end(&mut bytes)?;
        self.publishes.borrow_mut().push((vars.topic.to_string(), bytes));
        Ok(())
    }

    fn on_subscribe(&mut self, vars: &VariablesSubscribe) -> mqtt_codec::CallbackResult {
        self.subscribes.borrow_mut().push(vars.topics.len());
        Ok(())
    }

    fn on_suback(&mut self, vars: &VariablesSuback) -> mqtt_codec::CallbackResult {
        self.subacks.borrow_mut().push(vars.return_codes.clone());
        Ok(())
    }

    fn on_unsubscribe(&mut self, vars: &VariablesUnsubscribe) -> mqtt_codec::CallbackResult {
        self.unsubscribes.borrow_mut().push((vars.packet_id, vars.topics.len()));
        Ok(())
    }

    fn on_other(&mut self, packet_type: PacketType, packet_id: PacketId) -> mqtt_codec::CallbackResult {
        self.others.borrow_mut().push((packet_type, packet_id));
        Ok(())
    }
}

#[test]
fn test_full_wire_scenarios() {
    let mut transport = LoopbackTransport::new();
    transport.feed(&CONNECT);
    transport.feed(&CONNACK);
    transport.feed(&PUBLISH);
    transport.feed(&SUBSCRIBE);
    transport.feed(&SUBACK);
    transport.feed(&UNSUBSCRIBE);
    transport.feed(&PUBREL);
    transport.feed(&PINGREQ);

    let recorder = Recorder::default();
    let mut rxtx = RxTx::new(transport, AllocDecoder::new(), recorder.clone());

    for _ in 0..8 {
        rxtx.rx().read_next_packet().unwrap();
    }

    assert_eq!(recorder.connects.borrow().as_slice(), ["0w"]);
    assert_eq!(recorder.connacks.borrow()[0].return_code, ConnectReturnCode::Accepted);
    assert!(recorder.connacks.borrow()[0].session_present);
    assert_eq!(recorder.publishes.borrow().as_slice(), [("TOP".to_string(), b"hi".to_vec())]);
    assert_eq!(recorder.subscribes.borrow().as_slice(), [4]);
    assert_eq!(recorder.subacks.borrow()[0].len(), 6);
    assert_eq!(recorder.unsubscribes.borrow().as_slice(), [(42, 1)]);
    assert_eq!(
        recorder.others.borrow().as_slice(),
        [(PacketType::PublishRelease, 7), (PacketType::PingRequest, 0)]
    );
}

#[test]
fn test_poison_then_resume_via_set_transport() {
    let mut bad = LoopbackTransport::new();
    bad.feed(&[0x00, 0x00]); // forbidden packet type
    let mut rxtx = RxTx::new(bad, AllocDecoder::new(), NullEventHandler);

    assert!(rxtx.rx().read_next_packet().is_err());
    assert!(!rxtx.is_connected());
    assert!(rxtx.tx().write_simple(PacketType::PingRequest).is_err());

    let mut good = LoopbackTransport::new();
    good.feed(&PINGREQ);
    rxtx.set_transport(good);
    assert!(rxtx.is_connected());
    rxtx.rx().read_next_packet().unwrap();
    assert_eq!(rxtx.rx().last_received_header().unwrap().packet_type(), PacketType::PingRequest);
}

#[test]
fn test_default_publish_handler_drains_and_leaves_cursor_at_next_packet() {
    let mut transport = LoopbackTransport::new();
    transport.feed(&PUBLISH);
    transport.feed(&PINGREQ);
    let mut rxtx = RxTx::new(transport, AllocDecoder::new(), NullEventHandler);

    rxtx.rx().read_next_packet().unwrap();
    assert_eq!(
        rxtx.rx().last_received_header().unwrap().packet_type(),
        PacketType::Publish { dup: false, qos: QoS::AtLeastOnce, retain: false }
    );

    rxtx.rx().read_next_packet().unwrap();
    assert_eq!(rxtx.rx().last_received_header().unwrap().packet_type(), PacketType::PingRequest);
}

#[derive(Default, Clone)]
struct ShortReadHandler {
    seen: Rc<RefCell<Vec<Vec<u8>>>>,
}

impl EventHandler for ShortReadHandler {
    fn on_publish(&mut self, _vars: &VariablesPublish, payload: &mut dyn Read) -> mqtt_codec::CallbackResult {
        // Attempt to read well past the declared payload length; the bounded
        // reader must stop exactly at the payload boundary and return EOF
        // rather than bleeding into the next packet's bytes.
        let mut bytes = Vec::new();
        payload.read_to_end(&mut bytes)?;
        self.seen.borrow_mut().push(bytes);
        Ok(())
    }
}

#[test]
fn test_publish_payload_is_bounded_exactly() {
    let mut transport = LoopbackTransport::new();
    transport.feed(&PUBLISH);
    transport.feed(&PINGREQ);
    let handler = ShortReadHandler::default();
    let mut rxtx = RxTx::new(transport, AllocDecoder::new(), handler.clone());

    rxtx.rx().read_next_packet().unwrap();
    assert_eq!(handler.seen.borrow().as_slice(), [b"hi".to_vec()]);

    // The PINGREQ that follows must still be intact.
    rxtx.rx().read_next_packet().unwrap();
    assert_eq!(rxtx.rx().last_received_header().unwrap().packet_type(), PacketType::PingRequest);
}
