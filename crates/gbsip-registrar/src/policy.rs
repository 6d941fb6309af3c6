// gbsip-rs - GB28181 SIP services for Rust
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-user-agent registration policy.
//!
//! Camera firmware disagrees about expiry negotiation and about whether a
//! 200 OK may echo the full binding list, so deployments carry a quirk
//! table keyed by User-Agent patterns. The table is parsed once at
//! startup and immutable afterwards.

use quick_xml::de::from_str;
use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use tracing::warn;

use crate::config::DEFAULT_MAX_EXPIRY;

#[derive(Debug, Deserialize)]
#[serde(rename = "useragentconfigs")]
struct UserAgentConfigsXml {
    #[serde(rename = "useragent", default)]
    entries: Vec<UserAgentEntryXml>,
}

#[derive(Debug, Deserialize)]
struct UserAgentEntryXml {
    #[serde(rename = "@agent")]
    agent: String,
    #[serde(rename = "@expiry")]
    expiry: Option<u32>,
    #[serde(rename = "@contactlists")]
    contactlists: Option<bool>,
}

struct PolicyEntry {
    pattern: Regex,
    max_expiry: u32,
    contact_lists_supported: bool,
}

/// Ordered first-match-wins policy table over User-Agent strings.
///
/// Matching is case-insensitive substring regex; evaluation order is
/// document order, which is part of the contract.
pub struct UserAgentPolicy {
    entries: Vec<PolicyEntry>,
}

impl UserAgentPolicy {
    /// An empty table: every lookup returns the defaults.
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Parses a `<useragentconfigs>` XML document.
    ///
    /// Entries whose pattern does not compile are skipped with a warning
    /// rather than failing the whole table.
    pub fn from_xml(xml: &str) -> anyhow::Result<Self> {
        let parsed: UserAgentConfigsXml = from_str(xml)?;
        let mut entries = Vec::with_capacity(parsed.entries.len());

        for entry in parsed.entries {
            let pattern = match RegexBuilder::new(&entry.agent)
                .case_insensitive(true)
                .build()
            {
                Ok(pattern) => pattern,
                Err(error) => {
                    warn!(agent = %entry.agent, %error, "skipping unparsable user-agent pattern");
                    continue;
                }
            };
            entries.push(PolicyEntry {
                pattern,
                max_expiry: entry.expiry.unwrap_or(DEFAULT_MAX_EXPIRY),
                contact_lists_supported: entry.contactlists.unwrap_or(true),
            });
        }

        Ok(Self { entries })
    }

    /// Maximum REGISTER expiry permitted for this user agent.
    pub fn max_expiry_for(&self, user_agent: &str) -> u32 {
        self.first_match(user_agent)
            .map(|entry| entry.max_expiry)
            .unwrap_or(DEFAULT_MAX_EXPIRY)
    }

    /// Whether a 200 OK to this user agent may list every current binding
    /// rather than just the Contact it sent.
    pub fn contact_list_supported_for(&self, user_agent: &str) -> bool {
        self.first_match(user_agent)
            .map(|entry| entry.contact_lists_supported)
            .unwrap_or(true)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn first_match(&self, user_agent: &str) -> Option<&PolicyEntry> {
        self.entries
            .iter()
            .find(|entry| entry.pattern.is_match(user_agent))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_entry_attributes() {
        let policy = UserAgentPolicy::from_xml(
            "<useragentconfigs>\
               <useragent expiry='3600' contactlists='false' agent='fring'/>\
             </useragentconfigs>",
        )
        .unwrap();

        assert_eq!(policy.len(), 1);
        assert_eq!(policy.max_expiry_for("fring"), 3600);
        assert!(!policy.contact_list_supported_for("fring"));
    }

    #[test]
    fn matching_is_case_insensitive_substring() {
        let policy = UserAgentPolicy::from_xml(
            "<useragentconfigs>\
               <useragent expiry='113' agent='cisco'/>\
             </useragentconfigs>",
        )
        .unwrap();

        assert_eq!(policy.max_expiry_for("Cisco-CP7960G/8.0"), 113);
        assert_eq!(policy.max_expiry_for("CISCO ATA"), 113);
        assert_eq!(policy.max_expiry_for("linksys"), DEFAULT_MAX_EXPIRY);
    }

    #[test]
    fn first_match_wins_in_document_order() {
        let policy = UserAgentPolicy::from_xml(
            "<useragentconfigs>\
               <useragent expiry='60' agent='ata.*'/>\
               <useragent expiry='600' agent='ata186'/>\
             </useragentconfigs>",
        )
        .unwrap();

        assert_eq!(policy.max_expiry_for("ata186"), 60);
    }

    #[test]
    fn contactlists_defaults_to_true_when_omitted() {
        let policy = UserAgentPolicy::from_xml(
            "<useragentconfigs>\
               <useragent expiry='900' agent='hikvision'/>\
             </useragentconfigs>",
        )
        .unwrap();

        assert!(policy.contact_list_supported_for("Hikvision IPC"));
    }

    #[test]
    fn no_match_returns_defaults() {
        let policy = UserAgentPolicy::empty();
        assert_eq!(policy.max_expiry_for("anything"), DEFAULT_MAX_EXPIRY);
        assert!(policy.contact_list_supported_for("anything"));
    }

    #[test]
    fn unparsable_pattern_is_skipped() {
        let policy = UserAgentPolicy::from_xml(
            "<useragentconfigs>\
               <useragent expiry='60' agent='('/>\
               <useragent expiry='120' agent='dahua'/>\
             </useragentconfigs>",
        )
        .unwrap();

        assert_eq!(policy.len(), 1);
        assert_eq!(policy.max_expiry_for("Dahua DH-IPC"), 120);
    }

    #[test]
    fn empty_document_parses() {
        let policy = UserAgentPolicy::from_xml("<useragentconfigs></useragentconfigs>").unwrap();
        assert!(policy.is_empty());
    }
}
