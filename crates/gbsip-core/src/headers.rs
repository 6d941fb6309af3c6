use smol_str::SmolStr;

/// Header fields of a SIP message, kept in wire order.
///
/// REGISTER traffic from cameras carries a dozen headers at most, and the
/// registrar re-reads a small fixed set of them (Via, To, Contact, CSeq),
/// so the fields live in a flat list and lookups scan linearly. Names
/// compare case-insensitively per RFC 3261 §7.3.1; multi-valued headers
/// such as Via and Contact are repeated fields, not comma-joined.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    fields: Vec<(SmolStr, SmolStr)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a field, preserving the order the transport saw.
    pub fn push(&mut self, name: impl Into<SmolStr>, value: impl Into<SmolStr>) {
        self.fields.push((name.into(), value.into()));
    }

    /// Value of the first field with this name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(field, _)| field.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Values of every field with this name, in wire order.
    pub fn all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.fields
            .iter()
            .filter(move |(field, _)| field.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// True when at least one field with this name is present.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Every field as a (name, value) pair, for serialization.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.fields
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
