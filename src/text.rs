//! Bounded text helpers shared by the transports, presenter and WiFi adapter.

use heapless::String;

/// Returns true if every byte is printable ASCII (0x20..=0x7E).
pub fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

/// Copy `s` into a fixed-capacity string, cutting at the last char
/// boundary that fits.
pub fn truncated<const N: usize>(s: &str) -> String<N> {
    let mut out = String::new();
    for ch in s.chars() {
        if out.push(ch).is_err() {
            break;
        }
    }
    out
}
