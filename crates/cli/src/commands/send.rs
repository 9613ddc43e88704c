//! The `send` command - transmits frames and reports transmit timestamps.

use super::{format_timestamp, parse_ether_type, parse_mac};
use clap::Args;
use rawether::{EthernetSocket, MacAddress, SocketConfig};
use smoltcp::wire::{EthernetAddress, EthernetFrame, EthernetProtocol};
use std::time::Duration;

const HEADER_LEN: usize = 14;
/// Minimum Ethernet frame length without FCS.
const MIN_FRAME_LEN: usize = 60;
const MAX_PAYLOAD_LEN: usize = 1500;

#[derive(Args)]
pub struct SendArgs {
    /// Interface to send on
    interface: String,

    /// Destination MAC address (aa:bb:cc:dd:ee:ff)
    #[arg(long, short, value_parser = parse_mac)]
    dest: MacAddress,

    /// EtherType written into the header and used as the socket filter
    #[arg(long, default_value = "0x88b8", value_parser = parse_ether_type)]
    ether_type: u16,

    /// Number of frames to send
    #[arg(long, default_value = "1")]
    count: u32,

    /// Payload length in bytes (0-1500, padded to the 60-byte minimum frame)
    #[arg(long, default_value = "46", value_parser = parse_payload_len)]
    payload_len: usize,

    /// Delay between frames in milliseconds
    #[arg(long, default_value = "0")]
    interval_ms: u64,

    /// Hand frames to the kernel without waiting for transmit timestamps
    #[arg(long)]
    no_timestamp: bool,
}

fn parse_payload_len(s: &str) -> Result<usize, String> {
    let len: usize = s
        .parse()
        .map_err(|_| format!("invalid payload length '{s}'"))?;
    if len > MAX_PAYLOAD_LEN {
        return Err(format!("payload length must be at most {MAX_PAYLOAD_LEN}"));
    }
    Ok(len)
}

/// Build one frame whose payload starts with the big-endian sequence number.
pub fn build_frame(
    dst: MacAddress,
    src: MacAddress,
    ether_type: u16,
    payload_len: usize,
    seq: u32,
) -> Vec<u8> {
    let len = (HEADER_LEN + payload_len).max(MIN_FRAME_LEN);
    let mut buf = vec![0u8; len];

    let mut frame = EthernetFrame::new_unchecked(&mut buf[..]);
    frame.set_dst_addr(EthernetAddress(dst.octets()));
    frame.set_src_addr(EthernetAddress(src.octets()));
    frame.set_ethertype(EthernetProtocol::from(ether_type));

    let payload = frame.payload_mut();
    let seq = seq.to_be_bytes();
    let n = seq.len().min(payload_len);
    payload[..n].copy_from_slice(&seq[..n]);

    buf
}

pub fn run(args: SendArgs, config: &SocketConfig) -> anyhow::Result<()> {
    let src = rawether::mac_address(&args.interface)?;
    let mut socket = EthernetSocket::with_config(&args.interface, Some(args.dest), config)?;
    socket.set_protocol_filter(args.ether_type);
    if !socket.is_bound() {
        tracing::warn!("Socket is not bound; frames may not leave {}", args.interface);
    }

    for seq in 0..args.count {
        let frame = build_frame(args.dest, src, args.ether_type, args.payload_len, seq);

        if args.no_timestamp {
            let n = socket.transmit(&frame)?;
            println!("frame {seq}: {n} bytes");
        } else {
            let ts = socket.send(&frame)?;
            println!(
                "frame {seq}: {} bytes, tx {}",
                frame.len(),
                format_timestamp(ts)
            );
        }

        if args.interval_ms > 0 && seq + 1 < args.count {
            std::thread::sleep(Duration::from_millis(args.interval_ms));
        }
    }

    Ok(())
}
