use joblib::types::Owner;
use std::net::{IpAddr, SocketAddr};

/// Derive the job owner from a connection's peer address.
///
/// Only the host portion counts, so every connection from one machine shares
/// a fairness group. IPv4 peers reaching a dual-stack listener are reported
/// as mapped IPv6 addresses; those are folded back to plain IPv4.
pub fn owner_of(peer: &SocketAddr) -> Owner {
    let ip = match peer.ip() {
        IpAddr::V6(v6) => v6.to_ipv4_mapped().map(IpAddr::V4).unwrap_or(IpAddr::V6(v6)),
        v4 => v4,
    };
    ip.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_is_not_part_of_the_owner() {
        let a: SocketAddr = "10.1.2.3:40000".parse().unwrap();
        let b: SocketAddr = "10.1.2.3:40001".parse().unwrap();
        assert_eq!(owner_of(&a), "10.1.2.3");
        assert_eq!(owner_of(&a), owner_of(&b));
    }

    #[test]
    fn mapped_ipv4_is_unwrapped() {
        let mapped: SocketAddr = "[::ffff:10.1.2.3]:5000".parse().unwrap();
        assert_eq!(owner_of(&mapped), "10.1.2.3");

        let v6: SocketAddr = "[::1]:5000".parse().unwrap();
        assert_eq!(owner_of(&v6), "::1");
    }
}
