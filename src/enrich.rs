//! Best-effort node enrichment.
//!
//! The pipeline reads the node, gathers candidate facts from the lookup
//! providers, and returns them as a delta. Nothing touches the node until
//! the delta is applied in one batch, so a caller never observes a
//! partially-enriched node and the node stays untouched while lookups run.
//! Running the pipeline twice against unchanged external data is a no-op.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::lookup::{registrable_domain, LookupProvider};
use crate::model::{Attachment, Group, Node, Status};

// Same shape the rest of the OSINT world matches: local part, dotted
// domain, TLD of at least two letters.
fn email_re() -> &'static Regex {
    static EMAIL_RE: OnceLock<Regex> = OnceLock::new();
    EMAIL_RE.get_or_init(|| {
        Regex::new(r"(?i)[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,}").unwrap()
    })
}

/// Facts gathered for one node, not yet applied.
#[derive(Debug, Clone, Default)]
pub struct Enrichment {
    pub tags: Vec<String>,
    pub attachments: Vec<Attachment>,
    /// Promote status unknown -> suspected (set when emails were found).
    pub promote_status: bool,
    /// Raise confidence to at least this value; never lowers it.
    pub min_confidence: Option<u8>,
}

impl Enrichment {
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
            && self.attachments.is_empty()
            && !self.promote_status
            && self.min_confidence.is_none()
    }

    fn add_tag(&mut self, node: &Node, tag: String) {
        if !node.tags.contains(&tag) && !self.tags.contains(&tag) {
            self.tags.push(tag);
        }
    }

    fn add_attachment(&mut self, node: &Node, attachment: Attachment) {
        let seen = node.attachments.iter().any(|a| a.url == attachment.url)
            || self.attachments.iter().any(|a| a.url == attachment.url);
        if !seen {
            self.attachments.push(attachment);
        }
    }

    /// Apply the whole delta to the node as a single batch. Returns the
    /// number of tags and attachments actually added. Dedup is re-checked
    /// on apply, so applying the same delta twice is still a no-op.
    pub fn apply_to(&self, node: &mut Node) -> usize {
        let mut added = 0;
        for tag in &self.tags {
            if node.add_tag(tag.clone()) {
                added += 1;
            }
        }
        for attachment in &self.attachments {
            if node.add_attachment(attachment.clone()) {
                added += 1;
            }
        }
        if self.promote_status && node.status == Status::Unknown {
            node.status = Status::Suspected;
        }
        if let Some(floor) = self.min_confidence {
            node.confidence = node.confidence.max(floor);
        }
        added
    }
}

/// Fixed lookup attachments for a person, keyed by the node label.
fn person_attachments(label: &str) -> Vec<Attachment> {
    let q = urlencoding::encode(label);
    vec![
        Attachment::new("Google", format!("https://www.google.com/search?q={}", q)),
        Attachment::new(
            "LinkedIn",
            format!("https://www.linkedin.com/search/results/all/?keywords={}", q),
        ),
        Attachment::new("HaveIBeenPwned", "https://haveibeenpwned.com/"),
    ]
}

/// Fixed lookup attachments for an IP address.
fn ip_attachments(ip: &str) -> Vec<Attachment> {
    vec![
        Attachment::new("Shodan", format!("https://www.shodan.io/host/{}", ip)),
        Attachment::new("AbuseIPDB", format!("https://www.abuseipdb.com/check/{}", ip)),
    ]
}

/// Scan label, notes and attachment label+url for email addresses.
/// Matches are unique and sorted.
pub fn extract_emails(node: &Node) -> Vec<String> {
    let mut found: BTreeSet<String> = BTreeSet::new();
    let mut scan = |text: &str| {
        for m in email_re().find_iter(text) {
            found.insert(m.as_str().to_string());
        }
    };
    scan(&node.label);
    scan(&node.notes);
    for a in &node.attachments {
        scan(&a.label);
        scan(&a.url);
    }
    found.into_iter().collect()
}

/// Compute the enrichment delta for a node. Only reads; lookup failures
/// surface as absent facts and never abort the remaining steps.
pub fn enrich_node(node: &Node, lookups: &dyn LookupProvider) -> Enrichment {
    let mut delta = Enrichment::default();

    match node.group {
        Group::Person if !node.label.is_empty() => {
            for attachment in person_attachments(&node.label) {
                delta.add_attachment(node, attachment);
            }
        }
        Group::Domain | Group::Url => {
            let target = if node.group == Group::Url {
                registrable_domain(&node.label).unwrap_or_else(|| node.label.clone())
            } else {
                node.label.clone()
            };
            if !target.is_empty() {
                enrich_domain(node, &target, lookups, &mut delta);
            }
        }
        Group::Ip if !node.label.is_empty() => {
            for attachment in ip_attachments(&node.label) {
                delta.add_attachment(node, attachment);
            }
        }
        _ => {}
    }

    let emails = extract_emails(node);
    if !emails.is_empty() {
        for email in &emails {
            delta.add_tag(node, format!("email:{}", email));
        }
        delta.promote_status = node.status == Status::Unknown;
        delta.min_confidence = Some(60);
    }

    delta
}

fn enrich_domain(node: &Node, target: &str, lookups: &dyn LookupProvider, delta: &mut Enrichment) {
    if let Some(whois) = lookups.whois(target) {
        if let Some(registrar) = whois.registrar {
            delta.add_tag(node, format!("registrar:{}", registrar));
        }
        for ns in whois.name_servers {
            delta.add_tag(node, format!("ns:{}", ns));
        }
    }

    let records = lookups.dns(target);
    for v in records.a {
        delta.add_tag(node, format!("dns:A:{}", v));
    }
    for v in records.mx {
        delta.add_tag(node, format!("dns:MX:{}", v));
    }
    for v in records.txt {
        delta.add_tag(node, format!("dns:TXT:{}", v));
    }

    let favicon = format!("https://{}/favicon.ico", target);
    if lookups.url_reachable(&favicon) {
        delta.add_attachment(node, Attachment::new("favicon", favicon));
    }
}
