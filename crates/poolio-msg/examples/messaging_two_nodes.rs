//! ---
//! poolio_section: "02-messaging-envelope"
//! poolio_subsection: "module"
//! poolio_type: "source"
//! poolio_scope: "code"
//! poolio_description: "Message envelope, payload schema, and validation primitives."
//! poolio_version: "v0.1.0"
//! poolio_owner: "tbd"
//! ---
use std::collections::VecDeque;

use poolio_msg::{
    Battery, InboundPipeline, MessagingError, Payload, PoolStatus, Temperature, WaterLevel,
};

fn main() -> anyhow::Result<()> {
    // A plain queue stands in for the pub/sub feed between the two nodes.
    let mut feed: VecDeque<String> = VecDeque::new();

    // Pool node reports its sensors.
    let report: Payload = PoolStatus {
        water_level: WaterLevel {
            float_switch: true,
            confidence: 0.95,
        },
        temperature: Temperature::fahrenheit(78.5),
        battery: Battery {
            voltage: 3.85,
            percentage: 72,
        },
        reporting_interval: 300,
    }
    .into();
    feed.push_back(report.encode("pool-node-001", None)?);
    feed.push_back(r#"{"version":2,"type":"bogus_type"}"#.to_owned());

    // Display node screens and decodes whatever arrives.
    let display = InboundPipeline::default();
    while let Some(json) = feed.pop_front() {
        match display.accept(&json) {
            Ok(received) => println!(
                "display accepted {} from {}",
                received.payload.message_type(),
                received.header.device_id()
            ),
            Err(MessagingError::Rejected(errors)) => {
                println!("display dropped message:");
                for error in errors {
                    println!("  {error}");
                }
            }
            Err(err) => println!("display failed to decode message: {err}"),
        }
    }
    println!("{:?}", display.stats());
    Ok(())
}
