//! LDAP URL parsing: `ldap://host[:port]` or `ldaps://host[:port]`, with a
//! conservative hostname grammar. Malformed endpoints are rejected before any
//! I/O is attempted.

use crate::error::LdapError;

pub const DEFAULT_LDAP_PORT: u16 = 389;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Ldap,
    Ldaps,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub scheme: Scheme,
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    /// True when the URL asks for an encrypted session (`ldaps://`), which
    /// this client establishes via the StartTLS upgrade after connecting.
    pub fn use_tls(&self) -> bool {
        self.scheme == Scheme::Ldaps
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn parse(url: &str) -> Result<Self, LdapError> {
        let (scheme, rest) = if let Some(rest) = url.strip_prefix("ldaps://") {
            (Scheme::Ldaps, rest)
        } else if let Some(rest) = url.strip_prefix("ldap://") {
            (Scheme::Ldap, rest)
        } else {
            return Err(LdapError::InvalidUrl(format!(
                "expected ldap:// or ldaps:// scheme: {}",
                url
            )));
        };

        // Tolerate a trailing slash (or DN part), which we do not interpret.
        let rest = rest.split('/').next().unwrap_or("");

        let (host, port) = match rest.rsplit_once(':') {
            Some((host, port_str)) => {
                let port: u16 = port_str
                    .parse()
                    .map_err(|_| LdapError::InvalidUrl(format!("invalid port: {}", port_str)))?;
                (host, port)
            }
            None => (rest, DEFAULT_LDAP_PORT),
        };

        validate_hostname(host)?;

        Ok(Endpoint {
            scheme,
            host: host.to_string(),
            port,
        })
    }
}

/// Conservative hostname grammar: 1..=253 characters drawn from lowercase
/// ASCII letters, digits, `-` and `.`. Deliberately stricter than RFC 1035;
/// anything else is rejected rather than passed to the resolver.
fn validate_hostname(host: &str) -> Result<(), LdapError> {
    if host.is_empty() || host.len() > 253 {
        return Err(LdapError::InvalidUrl(format!(
            "hostname must be 1..=253 characters: {:?}",
            host
        )));
    }
    if let Some(bad) = host
        .chars()
        .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-' || *c == '.'))
    {
        return Err(LdapError::InvalidUrl(format!(
            "invalid character {:?} in hostname {:?}",
            bad, host
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_plain_with_port() {
        let ep = Endpoint::parse("ldap://example.org:1389").unwrap();
        assert_eq!(ep.scheme, Scheme::Ldap);
        assert_eq!(ep.host, "example.org");
        assert_eq!(ep.port, 1389);
        assert!(!ep.use_tls());
        assert_eq!(ep.addr(), "example.org:1389");
    }

    #[test]
    fn parse_default_port() {
        let ep = Endpoint::parse("ldap://example.org").unwrap();
        assert_eq!(ep.port, DEFAULT_LDAP_PORT);
    }

    #[test]
    fn parse_ldaps_requests_tls() {
        let ep = Endpoint::parse("ldaps://ldap.example.org:636").unwrap();
        assert_eq!(ep.scheme, Scheme::Ldaps);
        assert!(ep.use_tls());
    }

    #[test]
    fn parse_trailing_slash() {
        let ep = Endpoint::parse("ldap://example.org:389/").unwrap();
        assert_eq!(ep.host, "example.org");
        assert_eq!(ep.port, 389);
    }

    #[test]
    fn parse_ip_host() {
        let ep = Endpoint::parse("ldap://127.0.0.1:1389").unwrap();
        assert_eq!(ep.host, "127.0.0.1");
    }

    #[test]
    fn reject_bad_scheme() {
        assert!(matches!(
            Endpoint::parse("http://example.org"),
            Err(LdapError::InvalidUrl(_))
        ));
    }

    #[test]
    fn reject_bad_port() {
        assert!(matches!(
            Endpoint::parse("ldap://example.org:notaport"),
            Err(LdapError::InvalidUrl(_))
        ));
        assert!(matches!(
            Endpoint::parse("ldap://example.org:99999"),
            Err(LdapError::InvalidUrl(_))
        ));
    }

    #[test]
    fn reject_bad_hostname() {
        assert!(Endpoint::parse("ldap://Example.org").is_err());
        assert!(Endpoint::parse("ldap://exa mple.org:389").is_err());
        assert!(Endpoint::parse("ldap://:389").is_err());
        let long = format!("ldap://{}", "a".repeat(254));
        assert!(Endpoint::parse(&long).is_err());
    }
}
