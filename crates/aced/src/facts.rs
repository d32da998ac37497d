//! Trusted facts derived from a device certname.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const AUTHENTICATED_REMOTE: &str = "remote";

/// Facts the compiler trusts because they come from the service rather than
/// from the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustedFacts {
    /// Always `remote` for agentless devices.
    pub authenticated: String,
    /// Certificate extensions; empty for remote devices.
    pub extensions: Map<String, Value>,
    /// The full certname.
    pub certname: String,
    /// Text before the first `.` of the certname.
    pub hostname: String,
    /// Text after the first `.`, absent when the certname has no `.`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
}

impl TrustedFacts {
    /// Derives the facts for `certname`.
    #[must_use]
    pub fn for_certname(certname: &str) -> Self {
        let (hostname, domain) = match certname.split_once('.') {
            Some((host, domain)) => (host, Some(domain.to_owned())),
            None => (certname, None),
        };
        Self {
            authenticated: AUTHENTICATED_REMOTE.to_owned(),
            extensions: Map::new(),
            certname: certname.to_owned(),
            hostname: hostname.to_owned(),
            domain,
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::TrustedFacts;

    #[test]
    fn dotted_certname_splits_into_hostname_and_domain() {
        let facts = serde_json::to_value(TrustedFacts::for_certname("host.example.com"))
            .expect("facts serialise");
        assert_eq!(
            facts,
            json!({
                "authenticated": "remote",
                "extensions": {},
                "certname": "host.example.com",
                "hostname": "host",
                "domain": "example.com",
            })
        );
    }

    #[test]
    fn single_word_certname_has_no_domain_key() {
        let facts =
            serde_json::to_value(TrustedFacts::for_certname("singleword")).expect("facts serialise");
        let object = facts.as_object().expect("facts are an object");
        assert!(!object.contains_key("domain"));
        assert_eq!(object.get("hostname"), Some(&json!("singleword")));
    }

    #[rstest]
    #[case("a.b.c", "a", "b.c")]
    #[case("fw.", "fw", "")]
    fn domain_is_everything_after_the_first_dot(
        #[case] certname: &str,
        #[case] hostname: &str,
        #[case] domain: &str,
    ) {
        let facts = TrustedFacts::for_certname(certname);
        assert_eq!(facts.hostname, hostname);
        assert_eq!(facts.domain.as_deref(), Some(domain));
    }
}
