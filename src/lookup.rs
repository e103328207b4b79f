//! External lookup collaborators behind a narrow, failure-tolerant contract.
//!
//! Every method is best-effort: a network error, a timeout, or a malformed
//! response means "no data", never a panic or an error bubbling into the
//! enrichment pipeline.

use std::io::{Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::Resolver;

const LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

/// Best-effort WHOIS facts for a domain.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WhoisInfo {
    pub registrar: Option<String>,
    pub created: Option<String>,
    pub expires: Option<String>,
    pub name_servers: Vec<String>,
}

/// A/MX/TXT record sets for a domain; missing record types are empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DnsRecords {
    pub a: Vec<String>,
    pub mx: Vec<String>,
    pub txt: Vec<String>,
}

/// The contract the enrichment pipeline consumes. Implementations must
/// signal "unavailable" through `None` / empty collections / `false`.
pub trait LookupProvider {
    fn whois(&self, domain: &str) -> Option<WhoisInfo>;
    fn dns(&self, domain: &str) -> DnsRecords;
    fn url_reachable(&self, url: &str) -> bool;
}

/// Real network-backed lookups: WHOIS over TCP/43 with IANA referral, DNS
/// via the system-independent default resolver, HTTP via a short-timeout
/// blocking client.
pub struct NetLookup {
    resolver: Resolver,
    http: reqwest::blocking::Client,
}

impl NetLookup {
    pub fn new() -> Result<Self, String> {
        let mut opts = ResolverOpts::default();
        opts.timeout = LOOKUP_TIMEOUT;
        let resolver = Resolver::new(ResolverConfig::default(), opts)
            .map_err(|e| format!("Failed to build DNS resolver: {}", e))?;
        let http = reqwest::blocking::Client::builder()
            .timeout(LOOKUP_TIMEOUT)
            .user_agent("caseboard/0.3")
            .build()
            .map_err(|e| format!("Failed to build HTTP client: {}", e))?;
        Ok(NetLookup { resolver, http })
    }
}

impl LookupProvider for NetLookup {
    fn whois(&self, domain: &str) -> Option<WhoisInfo> {
        // IANA tells us the authoritative server for the TLD, then we query it.
        let referral = whois_query("whois.iana.org", domain)?;
        let server = parse_whois_field(&referral, "refer")?;
        let response = whois_query(&server, domain)?;
        let info = parse_whois_response(&response);
        if info == WhoisInfo::default() {
            None
        } else {
            Some(info)
        }
    }

    fn dns(&self, domain: &str) -> DnsRecords {
        let mut records = DnsRecords::default();
        // Strictly A records; lookup_ip would mix in AAAA results.
        if let Ok(lookup) = self.resolver.ipv4_lookup(domain) {
            records.a = lookup.iter().map(|a| a.to_string()).collect();
        }
        if let Ok(lookup) = self.resolver.mx_lookup(domain) {
            records.mx = lookup.iter().map(|mx| mx.exchange().to_string()).collect();
        }
        if let Ok(lookup) = self.resolver.txt_lookup(domain) {
            records.txt = lookup.iter().map(|txt| txt.to_string()).collect();
        }
        records
    }

    fn url_reachable(&self, url: &str) -> bool {
        match self.http.get(url).send() {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }
}

/// Send a WHOIS query and read the full response. None on any failure.
fn whois_query(server: &str, query: &str) -> Option<String> {
    let mut stream = TcpStream::connect((server, 43)).ok()?;
    stream.set_read_timeout(Some(LOOKUP_TIMEOUT)).ok()?;
    stream.set_write_timeout(Some(LOOKUP_TIMEOUT)).ok()?;
    stream.write_all(format!("{}\r\n", query).as_bytes()).ok()?;
    let mut response = String::new();
    stream.read_to_string(&mut response).ok()?;
    Some(response)
}

/// Pull the first `key: value` line out of a WHOIS response, key matched
/// case-insensitively.
fn parse_whois_field(response: &str, key: &str) -> Option<String> {
    for line in response.lines() {
        let line = line.trim();
        if let Some((k, v)) = line.split_once(':') {
            if k.trim().eq_ignore_ascii_case(key) && !v.trim().is_empty() {
                return Some(v.trim().to_string());
            }
        }
    }
    None
}

fn parse_whois_response(response: &str) -> WhoisInfo {
    let mut name_servers = Vec::new();
    for line in response.lines() {
        if let Some((k, v)) = line.trim().split_once(':') {
            let v = v.trim();
            if k.trim().eq_ignore_ascii_case("name server") && !v.is_empty() {
                let ns = v.to_string();
                if !name_servers.contains(&ns) {
                    name_servers.push(ns);
                }
            }
        }
    }
    WhoisInfo {
        registrar: parse_whois_field(response, "registrar"),
        created: parse_whois_field(response, "creation date"),
        expires: parse_whois_field(response, "registry expiry date"),
        name_servers,
    }
}

/// Reduce a URL or hostname to its registrable domain (domain + public
/// suffix). Falls back to the bare host when the suffix list has no match.
pub fn registrable_domain(input: &str) -> Option<String> {
    let host = host_of(input)?;
    match psl::domain_str(&host) {
        Some(domain) => Some(domain.to_string()),
        None => Some(host),
    }
}

fn host_of(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    let parsed = url::Url::parse(trimmed)
        .or_else(|_| url::Url::parse(&format!("http://{}", trimmed)))
        .ok()?;
    parsed.host_str().map(|h| h.to_lowercase())
}

/// Syntactic URL validation for user-entered attachments.
pub fn is_valid_url(input: &str) -> bool {
    match url::Url::parse(input) {
        Ok(parsed) => match parsed.scheme() {
            "http" | "https" => parsed.host_str().is_some(),
            "file" => true,
            _ => false,
        },
        Err(_) => false,
    }
}
