// Copyright (c) 2021 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

use std::mem::size_of;

fn print_basic_types() {
    use mqtt_codec::{ByteArray, ConnectFlags, FixedHeader, PacketId, PacketType, ProtocolLevel, QoS, VarInt};

    println!("ByteArray: {}", size_of::<ByteArray<'_>>());
    println!("ConnectFlags: {}", size_of::<ConnectFlags>());
    println!("FixedHeader: {}", size_of::<FixedHeader>());
    println!("PacketId: {}", size_of::<PacketId>());
    println!("PacketType: {}", size_of::<PacketType>());
    println!("ProtocolLevel: {}", size_of::<ProtocolLevel>());
    println!("QoS: {}", size_of::<QoS>());
    println!("VarInt: {}", size_of::<VarInt>());
}

fn print_variable_headers() {
    use mqtt_codec::{VariablesConnack, VariablesConnect, VariablesPublish, VariablesSuback, VariablesSubscribe, VariablesUnsubscribe};

    println!("==== variable headers ====");
    println!("VariablesConnect: {}", size_of::<VariablesConnect<'_>>());
    println!("VariablesConnack: {}", size_of::<VariablesConnack>());
    println!("VariablesPublish: {}", size_of::<VariablesPublish<'_>>());
    println!("VariablesSubscribe: {}", size_of::<VariablesSubscribe<'_>>());
    println!("VariablesSuback: {}", size_of::<VariablesSuback>());
    println!("VariablesUnsubscribe: {}", size_of::<VariablesUnsubscribe<'_>>());
}

fn main() {
    print_basic_types();
    print_variable_headers();
}
