//! Tenant-scoped cache keys.
//!
//! The key insight is that `CacheKey`'s private inner struct makes a key
//! without a company UNCONSTRUCTIBLE. Every cached result is addressed by
//! exactly one tenant, and keys of different tenants are never equal.

use std::fmt;

use estate_core::{validate_key_component, CompanyId, ValidationError, KEY_DELIMITER};

use super::domain::CacheDomain;

/// A cache key scoped to a single company.
///
/// # Design
///
/// Keys are tagged tuples `(domain, company_id, subtype)`. Equality and
/// hashing work on the components, so bulk invalidation matches tenants
/// exactly instead of scanning for substrings.
///
/// # Rendered Format
///
/// `<domain>:<subresource>:<companyId>[:<subtype>]`, colon-delimited ASCII,
/// e.g. `payments:list:acme-corp` or `analytics:report:acme-corp:revenue`.
/// Company ids and subtypes cannot contain the delimiter, so the rendering is
/// unambiguous and [`CacheKey::parse`] is its exact inverse.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    /// Private inner data - cannot be constructed externally
    inner: CacheKeyInner,
}

/// Private inner struct - prevents external construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct CacheKeyInner {
    domain: CacheDomain,
    company_id: CompanyId,
    subtype: Option<String>,
}

impl CacheKey {
    /// Create the single key of `domain` for `company_id`.
    pub fn new(domain: CacheDomain, company_id: &CompanyId) -> Self {
        Self {
            inner: CacheKeyInner {
                domain,
                company_id: company_id.clone(),
                subtype: None,
            },
        }
    }

    /// Create a key discriminated by an extra parameter (e.g. analytics type).
    pub fn with_subtype(
        domain: CacheDomain,
        company_id: &CompanyId,
        subtype: &str,
    ) -> Result<Self, ValidationError> {
        validate_key_component("subtype", subtype)?;
        Ok(Self {
            inner: CacheKeyInner {
                domain,
                company_id: company_id.clone(),
                subtype: Some(subtype.to_string()),
            },
        })
    }

    /// Get the domain of this key.
    pub fn domain(&self) -> CacheDomain {
        self.inner.domain
    }

    /// Get the company this key is scoped to.
    pub fn company_id(&self) -> &CompanyId {
        &self.inner.company_id
    }

    /// Get the discriminating subtype, if any.
    pub fn subtype(&self) -> Option<&str> {
        self.inner.subtype.as_deref()
    }

    /// Get the subresource segment.
    pub fn subresource(&self) -> &'static str {
        self.inner.domain.subresource()
    }

    /// Encode to bytes for byte-keyed stores.
    pub fn encode(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }

    /// Decode bytes produced by [`CacheKey::encode`].
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        std::str::from_utf8(bytes).ok().and_then(Self::parse)
    }

    /// Parse a rendered key.
    ///
    /// Returns `None` if:
    /// - There are not 3 or 4 components
    /// - The domain is unknown or the subresource does not belong to it
    /// - The company id or subtype is not a valid key component
    pub fn parse(rendered: &str) -> Option<Self> {
        let parts: Vec<&str> = rendered.split(KEY_DELIMITER).collect();
        if parts.len() != 3 && parts.len() != 4 {
            return None;
        }

        let domain = CacheDomain::from_name(parts[0])?;
        if parts[1] != domain.subresource() {
            return None;
        }

        let company_id = CompanyId::new(parts[2]).ok()?;

        match parts.get(3) {
            Some(subtype) => Self::with_subtype(domain, &company_id, subtype).ok(),
            None => Some(Self::new(domain, &company_id)),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{d}{}{d}{}",
            self.inner.domain.name(),
            self.inner.domain.subresource(),
            self.inner.company_id,
            d = KEY_DELIMITER
        )?;
        if let Some(subtype) = &self.inner.subtype {
            write!(f, "{}{}", KEY_DELIMITER, subtype)?;
        }
        Ok(())
    }
}

/// Selector for bulk invalidation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyPattern {
    /// Every key of one company, across all domains.
    Company(CompanyId),
    /// Every company's keys of one domain.
    Domain(CacheDomain),
    /// One company's keys of one domain (all subtypes).
    CompanyDomain(CompanyId, CacheDomain),
    /// Raw substring scan over rendered keys.
    ///
    /// Prefer the structured variants: `"12"` also matches tenant `"123"`.
    Substring(String),
}

impl KeyPattern {
    /// Whether `key` is selected by this pattern.
    pub fn matches(&self, key: &CacheKey) -> bool {
        match self {
            Self::Company(company_id) => key.company_id() == company_id,
            Self::Domain(domain) => key.domain() == *domain,
            Self::CompanyDomain(company_id, domain) => {
                key.company_id() == company_id && key.domain() == *domain
            }
            Self::Substring(needle) => key.to_string().contains(needle.as_str()),
        }
    }
}

impl fmt::Display for KeyPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Company(company_id) => write!(f, "company={}", company_id),
            Self::Domain(domain) => write!(f, "domain={}", domain),
            Self::CompanyDomain(company_id, domain) => {
                write!(f, "company={},domain={}", company_id, domain)
            }
            Self::Substring(needle) => write!(f, "substring={}", needle),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn company(id: &str) -> CompanyId {
        CompanyId::new(id).expect("valid company id")
    }

    #[test]
    fn test_render_convention() {
        let acme = company("acme-corp");
        assert_eq!(
            CacheKey::new(CacheDomain::Payments, &acme).to_string(),
            "payments:list:acme-corp"
        );
        assert_eq!(
            CacheKey::new(CacheDomain::Dashboard, &acme).to_string(),
            "dashboard:stats:acme-corp"
        );
        assert_eq!(
            CacheKey::new(CacheDomain::Buildings, &acme).to_string(),
            "buildings:metrics:acme-corp"
        );
        let analytics =
            CacheKey::with_subtype(CacheDomain::Analytics, &acme, "revenue").expect("valid");
        assert_eq!(analytics.to_string(), "analytics:report:acme-corp:revenue");
    }

    #[test]
    fn test_getters() {
        let acme = company("acme");
        let key = CacheKey::with_subtype(CacheDomain::Analytics, &acme, "occupancy")
            .expect("valid subtype");
        assert_eq!(key.domain(), CacheDomain::Analytics);
        assert_eq!(key.company_id(), &acme);
        assert_eq!(key.subtype(), Some("occupancy"));
        assert_eq!(key.subresource(), "report");
    }

    #[test]
    fn test_parse_inverse_of_display() {
        let acme = company("acme");
        for domain in CacheDomain::ALL {
            let key = CacheKey::new(domain, &acme);
            assert_eq!(CacheKey::parse(&key.to_string()), Some(key.clone()));
            assert_eq!(CacheKey::decode(&key.encode()), Some(key));
        }
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(CacheKey::parse("").is_none());
        assert!(CacheKey::parse("payments:list").is_none());
        assert!(CacheKey::parse("payments:stats:acme").is_none());
        assert!(CacheKey::parse("invoices:list:acme").is_none());
        assert!(CacheKey::parse("payments:list::x").is_none());
        assert!(CacheKey::parse("a:b:c:d:e").is_none());
        assert!(CacheKey::decode(&[0xFF, 0xFE]).is_none());
    }

    #[test]
    fn test_subtype_validation() {
        let acme = company("acme");
        assert!(CacheKey::with_subtype(CacheDomain::Analytics, &acme, "").is_err());
        assert!(CacheKey::with_subtype(CacheDomain::Analytics, &acme, "a:b").is_err());
    }

    #[test]
    fn test_different_tenants_different_keys() {
        let a = CacheKey::new(CacheDomain::Buildings, &company("acme"));
        let b = CacheKey::new(CacheDomain::Buildings, &company("globex"));
        assert_ne!(a, b);
        assert_ne!(a.encode(), b.encode());
    }

    #[test]
    fn test_company_pattern_is_exact() {
        let short = CacheKey::new(CacheDomain::Units, &company("12"));
        let long = CacheKey::new(CacheDomain::Units, &company("123"));

        let pattern = KeyPattern::Company(company("12"));
        assert!(pattern.matches(&short));
        assert!(!pattern.matches(&long));

        // The substring variant keeps the collision of plain string scans.
        let substring = KeyPattern::Substring("12".to_string());
        assert!(substring.matches(&short));
        assert!(substring.matches(&long));
    }

    #[test]
    fn test_company_domain_pattern() {
        let acme = company("acme");
        let revenue = CacheKey::with_subtype(CacheDomain::Analytics, &acme, "revenue")
            .expect("valid subtype");
        let expenses = CacheKey::with_subtype(CacheDomain::Analytics, &acme, "expenses")
            .expect("valid subtype");
        let units = CacheKey::new(CacheDomain::Units, &acme);

        let pattern = KeyPattern::CompanyDomain(acme.clone(), CacheDomain::Analytics);
        assert!(pattern.matches(&revenue));
        assert!(pattern.matches(&expenses));
        assert!(!pattern.matches(&units));

        assert!(KeyPattern::Domain(CacheDomain::Units).matches(&units));
        assert!(!KeyPattern::Domain(CacheDomain::Units).matches(&revenue));
    }
}
