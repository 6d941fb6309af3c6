use smol_str::SmolStr;

/// SIP request methods a GB28181 signalling server deals with.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    Register,
    Message,
    Invite,
    Ack,
    Bye,
    Subscribe,
    Notify,
    Unknown(SmolStr),
}

impl Method {
    /// Returns the canonical uppercase string representation for this method.
    pub fn as_str(&self) -> &str {
        match self {
            Method::Register => "REGISTER",
            Method::Message => "MESSAGE",
            Method::Invite => "INVITE",
            Method::Ack => "ACK",
            Method::Bye => "BYE",
            Method::Subscribe => "SUBSCRIBE",
            Method::Notify => "NOTIFY",
            Method::Unknown(token) => token.as_str(),
        }
    }

    /// Parses a method token, returning Unknown for extension methods.
    pub fn from_token(token: &str) -> Self {
        if token.eq_ignore_ascii_case("REGISTER") {
            Method::Register
        } else if token.eq_ignore_ascii_case("MESSAGE") {
            Method::Message
        } else if token.eq_ignore_ascii_case("INVITE") {
            Method::Invite
        } else if token.eq_ignore_ascii_case("ACK") {
            Method::Ack
        } else if token.eq_ignore_ascii_case("BYE") {
            Method::Bye
        } else if token.eq_ignore_ascii_case("SUBSCRIBE") {
            Method::Subscribe
        } else if token.eq_ignore_ascii_case("NOTIFY") {
            Method::Notify
        } else {
            Method::Unknown(SmolStr::new(token.to_owned()))
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_known_methods() {
        for token in ["REGISTER", "MESSAGE", "INVITE", "ACK", "BYE", "SUBSCRIBE", "NOTIFY"] {
            assert_eq!(Method::from_token(token).as_str(), token);
        }
    }

    #[test]
    fn parsing_is_case_insensitive() {
        assert_eq!(Method::from_token("register"), Method::Register);
        assert_eq!(Method::from_token("Register"), Method::Register);
    }

    #[test]
    fn extension_methods_keep_their_token() {
        let method = Method::from_token("DO");
        assert_eq!(method, Method::Unknown(SmolStr::new("DO")));
        assert_eq!(method.as_str(), "DO");
    }
}
