//! Header extraction for authentication results and raw `.eml` messages.
//!
//! `Authentication-Results` values are scanned for the property tokens that
//! name the authenticated domains:
//! - `header.d=` for DKIM
//! - `smtp.mailfrom=`, falling back to `smtp.helo=`, for SPF
//!
//! HELO-derived domains are reported in the SPF slot; nothing downstream
//! distinguishes them yet.

use chrono::{DateTime, Utc};
use mail_parser::{Addr, MessageParser};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::records::MailRecord;

const NO_SUBJECT: &str = "(No Subject)";
const UNKNOWN: &str = "Unknown";

static SMTP_MAILFROM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)smtp\.mailfrom=([^;\s]*)").expect("valid mailfrom regex"));
static SMTP_HELO: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)smtp\.helo=([^;\s]*)").expect("valid helo regex"));
static HEADER_D: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)header\.d=([^;\s]*)").expect("valid header.d regex"));

/// SPF domain from an Authentication-Results value.
pub fn extract_spf_domain(header: &str) -> Option<String> {
    capture_value(&SMTP_MAILFROM, header)
        .or_else(|| capture_value(&SMTP_HELO, header))
        .map(|v| match v.rsplit_once('@') {
            Some((_, domain)) if !domain.is_empty() => domain.to_string(),
            _ => v,
        })
}

/// DKIM signing domain from an Authentication-Results value.
pub fn extract_dkim_domain(header: &str) -> Option<String> {
    capture_value(&HEADER_D, header)
}

/// First occurrence of the property only; an empty value there is `None`.
fn capture_value(re: &Regex, text: &str) -> Option<String> {
    let value = re.captures(text)?.get(1)?.as_str().trim_matches('"');
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Fill the SPF/DKIM slots from a sequence of Authentication-Results values;
/// the first value found for each field wins.
pub fn authentication_domains<'a>(
    values: impl IntoIterator<Item = &'a str>,
) -> (Option<String>, Option<String>) {
    let mut spf = None;
    let mut dkim = None;
    for value in values {
        if spf.is_none() {
            spf = extract_spf_domain(value);
        }
        if dkim.is_none() {
            dkim = extract_dkim_domain(value);
        }
        if spf.is_some() && dkim.is_some() {
            break;
        }
    }
    (spf, dkim)
}

/// Build a `MailRecord` from raw message content.
///
/// `From`, `Subject` and `Date` go through `mail-parser`, which handles
/// quoted display names and RFC 2047 encoded-words. Never fails: missing
/// headers fall back to the same defaults the Graph mapping uses.
pub fn parse_eml(content: &str) -> MailRecord {
    let message = MessageParser::default().parse(content.as_bytes());

    let subject = message
        .as_ref()
        .and_then(|m| m.subject())
        .and_then(non_empty)
        .unwrap_or(NO_SUBJECT)
        .to_string();

    let sender: Option<&Addr<'_>> = message
        .as_ref()
        .and_then(|m| m.from())
        .and_then(|from| from.first());
    let sender_name = sender
        .and_then(|a| a.name())
        .and_then(non_empty)
        .unwrap_or(UNKNOWN)
        .to_string();
    let sender_address = sender
        .and_then(|a| a.address())
        .and_then(non_empty)
        .unwrap_or(UNKNOWN)
        .to_string();

    let received_date = message
        .as_ref()
        .and_then(|m| m.date())
        .and_then(|d| DateTime::<Utc>::from_timestamp(d.to_timestamp(), 0));

    let (spf_domain, dkim_domain) = authentication_results(content);

    MailRecord {
        subject,
        sender_name,
        sender_address,
        spf_domain,
        dkim_domain,
        received_date,
    }
}

fn non_empty(value: &str) -> Option<&str> {
    let value = value.trim();
    (!value.is_empty()).then_some(value)
}

/// SPF/DKIM domains from every `Authentication-Results` header of a raw message.
fn authentication_results(content: &str) -> (Option<String>, Option<String>) {
    let content = content.replace("\r\n", "\n");
    let header_end = content.find("\n\n").unwrap_or(content.len());
    let unfolded = unfold_headers(&content[..header_end]);
    authentication_domains(
        unfolded
            .lines()
            .filter_map(|line| line.split_once(':'))
            .filter(|(name, _)| name.trim().eq_ignore_ascii_case("authentication-results"))
            .map(|(_, value)| value.trim()),
    )
}

/// Unfold headers: join continuation lines.
fn unfold_headers(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for line in raw.lines() {
        if line.starts_with(' ') || line.starts_with('\t') {
            out.push(' ');
            out.push_str(line.trim_start());
        } else {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(line.trim_end());
        }
    }
    out
}
