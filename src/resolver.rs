//! Origin resolution: pick one (domain, source type) pair per record.
//!
//! Authenticated header fields win over the visible sender address. The
//! policy only decides which of DKIM and SPF is tried first; the sender
//! address is always the last resort, so resolution never fails.

use crate::records::{AggregationPolicy, MailRecord, SourceType};

/// Resolved origin of a record, before root normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    /// Lower-cased origin domain (or sender address when it has no domain part).
    pub domain: String,
    pub source_type: SourceType,
}

/// Resolve the origin domain of `record` under `policy`.
pub fn resolve_origin(record: &MailRecord, policy: AggregationPolicy) -> Origin {
    let dkim = record.dkim().map(|d| (d, SourceType::Dkim));
    let spf = record.spf().map(|d| (d, SourceType::Spf));

    let preferred = match policy {
        AggregationPolicy::DkimPriority => dkim.or(spf),
        AggregationPolicy::SpfPriority => spf.or(dkim),
    };

    match preferred {
        Some((domain, source_type)) => Origin {
            domain: domain.to_lowercase(),
            source_type,
        },
        None => Origin {
            domain: sender_domain(&record.sender_address),
            source_type: SourceType::Sender,
        },
    }
}

/// Domain part of a sender address, or the whole address when there is none.
fn sender_domain(address: &str) -> String {
    match address.split('@').nth(1) {
        Some(domain) if !domain.is_empty() => domain.to_lowercase(),
        _ => address.to_lowercase(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn both() -> MailRecord {
        MailRecord::new("promo@visible.example")
            .with_dkim("Mail.SpamCo.net")
            .with_spf("bounce.Relay.org")
    }

    #[test]
    fn dkim_priority_prefers_dkim() {
        let origin = resolve_origin(&both(), AggregationPolicy::DkimPriority);
        assert_eq!(origin.domain, "mail.spamco.net");
        assert_eq!(origin.source_type, SourceType::Dkim);
    }

    #[test]
    fn spf_priority_prefers_spf() {
        let origin = resolve_origin(&both(), AggregationPolicy::SpfPriority);
        assert_eq!(origin.domain, "bounce.relay.org");
        assert_eq!(origin.source_type, SourceType::Spf);
    }

    #[test]
    fn missing_preferred_field_falls_to_the_other() {
        let spf_only = MailRecord::new("a@b.com").with_spf("relay.org");
        let origin = resolve_origin(&spf_only, AggregationPolicy::DkimPriority);
        assert_eq!(origin.source_type, SourceType::Spf);

        let dkim_only = MailRecord::new("a@b.com").with_dkim("signer.net");
        let origin = resolve_origin(&dkim_only, AggregationPolicy::SpfPriority);
        assert_eq!(origin.source_type, SourceType::Dkim);
        assert_eq!(origin.domain, "signer.net");
    }

    #[test]
    fn none_literal_is_treated_as_absent() {
        let record = MailRecord::new("x@evil.biz")
            .with_dkim("mail.spamco.net")
            .with_spf("none");
        let origin = resolve_origin(&record, AggregationPolicy::SpfPriority);
        assert_eq!(origin.source_type, SourceType::Dkim);
        assert_eq!(origin.domain, "mail.spamco.net");

        let record = MailRecord::new("x@Evil.BIZ").with_dkim("NONE").with_spf("None");
        for policy in [AggregationPolicy::DkimPriority, AggregationPolicy::SpfPriority] {
            let origin = resolve_origin(&record, policy);
            assert_eq!(origin.source_type, SourceType::Sender);
            assert_eq!(origin.domain, "evil.biz");
        }
    }

    #[test]
    fn sender_fallback_without_at_uses_whole_address() {
        let record = MailRecord::new("Mailer-Daemon");
        let origin = resolve_origin(&record, AggregationPolicy::DkimPriority);
        assert_eq!(origin.domain, "mailer-daemon");
        assert_eq!(origin.source_type, SourceType::Sender);
    }

    #[test]
    fn sender_fallback_with_empty_domain_uses_whole_address() {
        let record = MailRecord::new("someone@");
        let origin = resolve_origin(&record, AggregationPolicy::DkimPriority);
        assert_eq!(origin.domain, "someone@");
    }

    #[test]
    fn sender_fallback_takes_first_domain_part() {
        let record = MailRecord::new("a@b.com@c.org");
        let origin = resolve_origin(&record, AggregationPolicy::DkimPriority);
        assert_eq!(origin.domain, "b.com");
    }

    #[test]
    fn helo_is_never_emitted() {
        let records = [
            both(),
            MailRecord::new("a@b.com").with_spf("helo.example.net"),
            MailRecord::new("a@b.com"),
        ];
        for record in &records {
            for policy in [AggregationPolicy::DkimPriority, AggregationPolicy::SpfPriority] {
                assert_ne!(resolve_origin(record, policy).source_type, SourceType::Helo);
            }
        }
    }
}
