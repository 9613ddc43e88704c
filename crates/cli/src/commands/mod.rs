pub mod listen;
pub mod mac;
pub mod send;

use rawether::{MacAddress, Timestamp};

/// Parse an EtherType given as `0x88b8` or as a decimal number.
pub fn parse_ether_type(s: &str) -> Result<u16, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => s.parse::<u16>(),
    };
    parsed.map_err(|_| format!("invalid EtherType '{s}', expected e.g. 0x88b8"))
}

pub fn parse_mac(s: &str) -> Result<MacAddress, String> {
    s.parse::<MacAddress>().map_err(|e| e.to_string())
}

pub fn format_timestamp(ts: Option<Timestamp>) -> String {
    ts.map_or_else(|| "none".to_string(), |ts| ts.to_string())
}
