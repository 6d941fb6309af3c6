// gbsip-rs - GB28181 SIP services for Rust
// SPDX-License-Identifier: Apache-2.0 OR MIT

use smol_str::SmolStr;

/// Errors produced while parsing a SIP URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UriError {
    UnsupportedScheme,
    EmptyHost,
    InvalidPort(String),
}

impl std::fmt::Display for UriError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedScheme => write!(f, "URI scheme must be sip or sips"),
            Self::EmptyHost => write!(f, "URI host part is empty"),
            Self::InvalidPort(port) => write!(f, "invalid URI port: {}", port),
        }
    }
}

impl std::error::Error for UriError {}

/// A SIP or SIPS URI of the shape `scheme:[user@]host[:port][;params]`.
///
/// GB28181 device and platform identifiers (for example
/// `sip:34020000001320000001@3402000000`) are ordinary SIP user parts, so
/// no special casing is needed beyond RFC 3261 syntax.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SipUri {
    secure: bool,
    user: Option<SmolStr>,
    host: SmolStr,
    port: Option<u16>,
    params: Vec<(SmolStr, Option<SmolStr>)>,
}

impl SipUri {
    /// Parses a `sip:` or `sips:` URI.
    ///
    /// Angle brackets are not consumed here; callers strip name-addr
    /// decoration before handing the URI over.
    pub fn parse(input: &str) -> Result<Self, UriError> {
        let input = input.trim();
        let (secure, rest) = if let Some(rest) = strip_scheme(input, "sips:") {
            (true, rest)
        } else if let Some(rest) = strip_scheme(input, "sip:") {
            (false, rest)
        } else {
            return Err(UriError::UnsupportedScheme);
        };

        let (addr, params_section) = match rest.split_once(';') {
            Some((addr, params)) => (addr, Some(params)),
            None => (rest, None),
        };

        let (user, host_port) = match addr.rsplit_once('@') {
            Some((user, host_port)) if !user.is_empty() => {
                (Some(SmolStr::new(user)), host_port)
            }
            Some((_, host_port)) => (None, host_port),
            None => (None, addr),
        };

        let (host, port) = split_host_port(host_port)?;
        if host.is_empty() {
            return Err(UriError::EmptyHost);
        }

        let mut params = Vec::new();
        if let Some(section) = params_section {
            for param in section.split(';') {
                let param = param.trim();
                if param.is_empty() {
                    continue;
                }
                match param.split_once('=') {
                    Some((key, value)) => {
                        params.push((SmolStr::new(key), Some(SmolStr::new(value))))
                    }
                    None => params.push((SmolStr::new(param), None)),
                }
            }
        }

        Ok(Self {
            secure,
            user,
            host: SmolStr::new(host),
            port,
            params,
        })
    }

    /// Returns true for `sips:` URIs.
    pub fn is_sips(&self) -> bool {
        self.secure
    }

    /// Returns the user part, if any.
    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    /// Returns the host part.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the explicit port, if any.
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// Returns the value of a URI parameter, if present with a value.
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .and_then(|(_, value)| value.as_deref())
    }
}

impl std::fmt::Display for SipUri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:", if self.secure { "sips" } else { "sip" })?;
        if let Some(user) = &self.user {
            write!(f, "{}@", user)?;
        }
        f.write_str(&self.host)?;
        if let Some(port) = self.port {
            write!(f, ":{}", port)?;
        }
        for (key, value) in &self.params {
            match value {
                Some(value) => write!(f, ";{}={}", key, value)?,
                None => write!(f, ";{}", key)?,
            }
        }
        Ok(())
    }
}

fn strip_scheme<'a>(input: &'a str, scheme: &str) -> Option<&'a str> {
    if input.len() >= scheme.len() && input[..scheme.len()].eq_ignore_ascii_case(scheme) {
        Some(&input[scheme.len()..])
    } else {
        None
    }
}

fn split_host_port(host_port: &str) -> Result<(&str, Option<u16>), UriError> {
    // Bracketed IPv6 literals keep their colons.
    if let Some(rest) = host_port.strip_prefix('[') {
        return match rest.split_once(']') {
            Some((host, remainder)) => match remainder.strip_prefix(':') {
                Some(port) => Ok((host, Some(parse_port(port)?))),
                None => Ok((host, None)),
            },
            None => Err(UriError::EmptyHost),
        };
    }

    match host_port.split_once(':') {
        Some((host, port)) => Ok((host, Some(parse_port(port)?))),
        None => Ok((host_port, None)),
    }
}

fn parse_port(port: &str) -> Result<u16, UriError> {
    port.parse::<u16>()
        .map_err(|_| UriError::InvalidPort(port.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_device_uri() {
        let uri = SipUri::parse("sip:34020000001320000001@3402000000").unwrap();
        assert_eq!(uri.user(), Some("34020000001320000001"));
        assert_eq!(uri.host(), "3402000000");
        assert_eq!(uri.port(), None);
        assert!(!uri.is_sips());
    }

    #[test]
    fn parses_host_port_and_params() {
        let uri = SipUri::parse("sip:alice@example.com:5070;transport=tcp;lr").unwrap();
        assert_eq!(uri.user(), Some("alice"));
        assert_eq!(uri.host(), "example.com");
        assert_eq!(uri.port(), Some(5070));
        assert_eq!(uri.parameter("transport"), Some("tcp"));
        assert_eq!(uri.parameter("lr"), None);
    }

    #[test]
    fn parses_userless_uri() {
        let uri = SipUri::parse("sip:registrar.example.com").unwrap();
        assert_eq!(uri.user(), None);
        assert_eq!(uri.host(), "registrar.example.com");
    }

    #[test]
    fn parses_bracketed_ipv6() {
        let uri = SipUri::parse("sip:cam@[2001:db8::1]:5060").unwrap();
        assert_eq!(uri.host(), "2001:db8::1");
        assert_eq!(uri.port(), Some(5060));
    }

    #[test]
    fn rejects_foreign_schemes() {
        assert_eq!(
            SipUri::parse("mailto:alice@example.com"),
            Err(UriError::UnsupportedScheme)
        );
    }

    #[test]
    fn rejects_bad_port() {
        assert!(matches!(
            SipUri::parse("sip:host:70000"),
            Err(UriError::InvalidPort(_))
        ));
    }

    #[test]
    fn display_round_trips() {
        let text = "sips:alice@example.com:5061;transport=tls";
        assert_eq!(SipUri::parse(text).unwrap().to_string(), text);
    }
}
