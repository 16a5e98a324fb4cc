// Netmask normalization for route and network statement masks
//
// Every converter returns an empty string when the input is neither a
// `/<prefix>` nor a dotted mask.

use super::CanonicalCidr;

/// Convert `/24` or `255.255.255.0` into a `/<prefix>` suffix.
///
/// The prefix length of a dotted mask is the number of set bits across its
/// four octets. Discontiguous masks are not rejected; they yield the naive
/// bit count and should be treated as best-effort.
pub fn convert_netmask_to_prefix_length(mask_or_prefix: &str) -> String {
    if let Some(prefix) = parse_prefix(mask_or_prefix) {
        return format!("/{}", prefix);
    }
    match dotted_mask_bits(mask_or_prefix) {
        Some(bits) => format!("/{}", bits),
        None => String::new(),
    }
}

/// Convert a wildcard mask (`0.0.0.255`) as used by routing protocol
/// `network` statements into a `/<prefix>` suffix.
pub fn wildcard_to_prefix_length(mask_or_prefix: &str) -> String {
    if let Some(prefix) = parse_prefix(mask_or_prefix) {
        return format!("/{}", prefix);
    }
    match dotted_mask_bits(mask_or_prefix) {
        Some(bits) => format!("/{}", 32 - bits),
        None => String::new(),
    }
}

/// Join an address and a mask into the canonical `A.B.C.D/len` key.
///
/// Returns `None` when the mask could not be determined.
pub fn canonical_subnet(address: &str, mask_or_prefix: &str) -> Option<CanonicalCidr> {
    let suffix = convert_netmask_to_prefix_length(mask_or_prefix);
    if suffix.is_empty() {
        None
    } else {
        Some(format!("{}{}", address, suffix))
    }
}

fn parse_prefix(value: &str) -> Option<u32> {
    let digits = value.strip_prefix('/')?;
    if digits.is_empty() || digits.len() > 2 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let prefix: u32 = digits.parse().ok()?;
    (prefix <= 32).then_some(prefix)
}

fn dotted_mask_bits(value: &str) -> Option<u32> {
    let octets: Vec<&str> = value.split('.').collect();
    if octets.len() != 4 {
        return None;
    }

    let mut bits = 0;
    for octet in octets {
        if octet.is_empty() || octet.len() > 3 || !octet.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let value: u8 = octet.parse().ok()?;
        bits += value.count_ones();
    }
    Some(bits)
}
