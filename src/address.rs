use std::fmt;
use std::net::SocketAddr;

/// An opaque network endpoint identity.
///
/// Thin wrapper around `SocketAddr` so the rest of the crate can treat
/// addresses as an equality-comparable, hashable key without committing
/// callers to any particular transport's addressing scheme.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address(pub SocketAddr);

impl Address {
    pub fn new(addr: SocketAddr) -> Address {
        Address(addr)
    }

    pub fn socket_addr(&self) -> SocketAddr {
        self.0
    }
}

impl From<SocketAddr> for Address {
    fn from(addr: SocketAddr) -> Address {
        Address(addr)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Address({})", self.0)
    }
}
