// Copyright (c) 2021 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

//! Encodes a CONNECT by hand, feeds the bytes into a loopback transport, and
//! reads it back out through `Rx`, printing each step.

use mqtt_codec::{
    AllocDecoder, EncodePacket, EventHandler, FixedHeader, LoopbackTransport, PacketType,
    ProtocolLevel, RxTx, VariablesConnect,
};

#[derive(Default)]
struct PrintingHandler;

impl EventHandler for PrintingHandler {
    fn on_connect(&mut self, vars: &VariablesConnect) -> mqtt_codec::CallbackResult {
        println!(
            "received CONNECT: client_id={:?} keep_alive={}",
            vars.client_id, vars.keep_alive
        );
        Ok(())
    }
}

fn main() {
    let vars = VariablesConnect {
        protocol_level: ProtocolLevel::V311,
        keep_alive: 30,
        clean_session: true,
        client_id: "demo-client",
        username: None,
        password: None,
        will: None,
    };

    let mut body = Vec::new();
    vars.encode(&mut body).expect("encode variable header");
    let header = FixedHeader::new(PacketType::Connect, body.len() as u32).expect("fixed header");
    let mut wire = Vec::new();
    header.encode(&mut wire).expect("encode fixed header");
    wire.extend_from_slice(&body);
    println!("encoded {} bytes", wire.len());

    let mut transport = LoopbackTransport::new();
    transport.feed(&wire);

    let mut rxtx = RxTx::new(transport, AllocDecoder::new(), PrintingHandler);
    rxtx.rx().read_next_packet().expect("read_next_packet");
}
