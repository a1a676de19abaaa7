//! Shared proptest generators.

use std::net::{Ipv4Addr, Ipv6Addr};

use proptest::prelude::*;

/// Generate IPv4 address strings.
pub fn ipv4_strategy() -> impl Strategy<Value = String> {
    any::<[u8; 4]>().prop_map(|octets| Ipv4Addr::from(octets).to_string())
}

/// Generate bracketed IPv6 address strings, as they appear with a port.
pub fn bracketed_ipv6_strategy() -> impl Strategy<Value = String> {
    any::<[u16; 8]>().prop_map(|segments| {
        let [a, b, c, d, e, f, g, h] = segments;
        format!("[{}]", Ipv6Addr::new(a, b, c, d, e, f, g, h))
    })
}

/// Generate port numbers.
pub fn port_strategy() -> impl Strategy<Value = u16> {
    1..=u16::MAX
}

/// Generate valid HTTP status codes.
pub fn status_code_strategy() -> impl Strategy<Value = u16> {
    100u16..=599
}

/// Generate status codes outside the defined classes.
pub fn unclassified_status_strategy() -> impl Strategy<Value = u16> {
    prop_oneof![0u16..100, 600u16..=999]
}

/// Generate lowercase query keys.
pub fn query_key_strategy() -> impl Strategy<Value = String> {
    "[a-z]{1,8}"
}

/// Generate query values, including characters that need escaping.
pub fn query_value_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 &=%+]{0,12}"
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn ipv4_parses(ip in ipv4_strategy()) {
            prop_assert!(ip.parse::<Ipv4Addr>().is_ok());
        }

        #[test]
        fn ipv6_is_bracketed(ip in bracketed_ipv6_strategy()) {
            prop_assert!(ip.starts_with('[') && ip.ends_with(']'));
        }

        #[test]
        fn status_in_range(code in status_code_strategy()) {
            prop_assert!((100..600).contains(&code));
        }
    }
}
