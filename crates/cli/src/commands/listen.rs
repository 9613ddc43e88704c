//! The `listen` command - waits for frames and prints them.

use super::{format_timestamp, parse_ether_type};
use clap::Args;
use rawether::{EthernetSocket, HandleSet, MAX_FRAME_LEN, MacAddress, Received, SocketConfig};
use smoltcp::wire::EthernetFrame;

#[derive(Args)]
pub struct ListenArgs {
    /// Interface to listen on
    interface: String,

    /// EtherType to capture
    #[arg(long, default_value = "0x88b8", value_parser = parse_ether_type)]
    ether_type: u16,

    /// Stop after this long without a frame, in milliseconds
    #[arg(long, default_value = "5000")]
    timeout_ms: u32,

    /// Stop after this many frames
    #[arg(long)]
    count: Option<u64>,
}

/// One-line summary of a received frame.
pub fn describe_frame(buf: &[u8], received: &Received) -> String {
    let ts = format_timestamp(received.timestamp);
    match EthernetFrame::new_checked(&buf[..received.len]) {
        Ok(frame) => format!(
            "{} > {} type {:#06x} len {} rx {}",
            MacAddress(frame.src_addr().0),
            MacAddress(frame.dst_addr().0),
            u16::from(frame.ethertype()),
            received.len,
            ts
        ),
        Err(_) => format!("runt frame len {} rx {}", received.len, ts),
    }
}

pub fn run(args: ListenArgs, config: &SocketConfig) -> anyhow::Result<()> {
    let mut socket = EthernetSocket::with_config(&args.interface, None, config)?;
    socket.set_protocol_filter(args.ether_type);
    if !socket.is_bound() {
        anyhow::bail!(
            "could not bind to ethertype {:#06x} on {}",
            args.ether_type,
            args.interface
        );
    }

    let mut set = HandleSet::new();
    set.add(&socket);

    let mut buf = [0u8; MAX_FRAME_LEN];
    let mut seen = 0u64;

    loop {
        if set.wait_ready(args.timeout_ms)? == 0 {
            eprintln!("No frame within {}ms, stopping", args.timeout_ms);
            break;
        }

        loop {
            let received = socket.receive(&mut buf)?;
            if received.is_empty() {
                break;
            }
            println!("{}", describe_frame(&buf, &received));
            seen += 1;
            if args.count.is_some_and(|count| seen >= count) {
                return Ok(());
            }
        }
    }

    Ok(())
}
