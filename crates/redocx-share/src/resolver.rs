//! Advertise address discovery.

use std::net::{IpAddr, Ipv4Addr};

use crate::ShareError;

/// Source of the address that share links point at.
pub trait AddressResolver: Send + Sync {
    /// Resolve the IPv4 address to advertise.
    fn resolve(&self) -> Result<Ipv4Addr, ShareError>;
}

/// Resolves the first non-loopback IPv4 address of one named interface.
///
/// There is no fallback to other interfaces: an absent interface is an error.
#[derive(Debug, Clone)]
pub struct InterfaceResolver {
    interface: String,
}

impl InterfaceResolver {
    pub fn new(interface: impl Into<String>) -> Self {
        Self {
            interface: interface.into(),
        }
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }
}

impl AddressResolver for InterfaceResolver {
    fn resolve(&self) -> Result<Ipv4Addr, ShareError> {
        let interfaces =
            if_addrs::get_if_addrs().map_err(|e| ShareError::InterfaceQuery(e.to_string()))?;

        first_ipv4(
            &self.interface,
            interfaces.iter().map(|iface| (iface.name.as_str(), iface.ip())),
        )
    }
}

/// Pick the first non-loopback IPv4 address listed for `name`.
fn first_ipv4<'a>(
    name: &str,
    addresses: impl IntoIterator<Item = (&'a str, IpAddr)>,
) -> Result<Ipv4Addr, ShareError> {
    let mut seen = false;

    for (iface, ip) in addresses {
        if iface != name {
            continue;
        }
        seen = true;

        if let IpAddr::V4(v4) = ip {
            if !v4.is_loopback() {
                return Ok(v4);
            }
        }
    }

    if seen {
        Err(ShareError::NoIpv4Address(name.to_string()))
    } else {
        Err(ShareError::InterfaceNotFound(name.to_string()))
    }
}
