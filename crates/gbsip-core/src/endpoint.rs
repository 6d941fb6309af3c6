use std::net::SocketAddr;

/// Transport protocol carrying SIP messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TransportKind {
    #[default]
    Udp,
    Tcp,
}

impl TransportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportKind::Udp => "udp",
            TransportKind::Tcp => "tcp",
        }
    }
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A SIP network endpoint: protocol plus socket address.
///
/// The transport layer resolves these; the registrar only records and
/// echoes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SipEndpoint {
    pub protocol: TransportKind,
    pub addr: SocketAddr,
}

impl SipEndpoint {
    pub fn new(protocol: TransportKind, addr: SocketAddr) -> Self {
        Self { protocol, addr }
    }

    pub fn ip(&self) -> std::net::IpAddr {
        self.addr.ip()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }
}

impl std::fmt::Display for SipEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.protocol, self.addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_protocol() {
        let endpoint = SipEndpoint::new(TransportKind::Udp, "192.168.1.10:5060".parse().unwrap());
        assert_eq!(endpoint.to_string(), "udp:192.168.1.10:5060");
        assert_eq!(endpoint.port(), 5060);
    }
}
