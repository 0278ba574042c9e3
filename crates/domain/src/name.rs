use crate::errors::RelayError;
use std::fmt;

/// A fully-qualified, lower-cased, dot-terminated domain name.
///
/// Every name stored or compared by the resolver goes through this type, so
/// case-insensitive matching and trailing-dot handling happen exactly once,
/// at construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CanonicalName(String);

const MAX_NAME_LEN: usize = 253;
const MAX_LABEL_LEN: usize = 63;

impl CanonicalName {
    /// Canonicalise user or wire input: lower-case, append the root dot if
    /// absent, validate label shape.
    pub fn from_user(input: &str) -> Result<Self, RelayError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(RelayError::InvalidName("empty name".to_string()));
        }
        if trimmed == "." {
            return Ok(Self::root());
        }

        let mut name = trimmed.to_ascii_lowercase();
        if !name.ends_with('.') {
            name.push('.');
        }

        if name.len() > MAX_NAME_LEN + 1 {
            return Err(RelayError::InvalidName(format!("name too long: {input}")));
        }
        for label in name[..name.len() - 1].split('.') {
            if label.is_empty() {
                return Err(RelayError::InvalidName(format!("empty label in: {input}")));
            }
            if label.len() > MAX_LABEL_LEN {
                return Err(RelayError::InvalidName(format!("label too long in: {input}")));
            }
        }

        Ok(Self(name))
    }

    pub fn root() -> Self {
        Self(".".to_string())
    }

    pub fn is_root(&self) -> bool {
        self.0 == "."
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of labels, the root excluded: `"db.svc.local."` has 3.
    pub fn label_count(&self) -> usize {
        if self.is_root() {
            0
        } else {
            self.0[..self.0.len() - 1].split('.').count()
        }
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        let body = if self.is_root() {
            ""
        } else {
            &self.0[..self.0.len() - 1]
        };
        body.split('.').filter(|l| !l.is_empty())
    }

    /// True when `self` equals `zone` or sits below it. The root zone
    /// matches every name.
    pub fn is_within(&self, zone: &CanonicalName) -> bool {
        if zone.is_root() {
            return true;
        }
        if self == zone {
            return true;
        }
        self.0.len() > zone.0.len() && self.0.ends_with(&format!(".{}", zone.0))
    }

    /// Replace the `from` suffix with `to`, keeping the leading labels.
    /// `foo.corp.local.` with `corp.local.` → `corp.example.` gives
    /// `foo.corp.example.`. Returns `None` when `self` is not within `from`.
    pub fn replace_suffix(&self, from: &CanonicalName, to: &CanonicalName) -> Option<CanonicalName> {
        if !self.is_within(from) {
            return None;
        }
        if self == from {
            return Some(to.clone());
        }
        let prefix = &self.0[..self.0.len() - from.0.len()];
        Some(CanonicalName(format!("{prefix}{}", to.0)))
    }

    /// Append a search domain: `db.` joined with `svc.local.` is
    /// `db.svc.local.`.
    pub fn with_search_domain(&self, domain: &CanonicalName) -> CanonicalName {
        if self.is_root() {
            return domain.clone();
        }
        if domain.is_root() {
            return self.clone();
        }
        CanonicalName(format!("{}{}", self.0, domain.0))
    }
}

impl fmt::Display for CanonicalName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_appends_root() {
        let name = CanonicalName::from_user("Example.COM").unwrap();
        assert_eq!(name.as_str(), "example.com.");

        let already = CanonicalName::from_user("example.com.").unwrap();
        assert_eq!(name, already);
    }

    #[test]
    fn label_count_excludes_root() {
        assert_eq!(CanonicalName::from_user("db").unwrap().label_count(), 1);
        assert_eq!(
            CanonicalName::from_user("db.svc.local.").unwrap().label_count(),
            3
        );
        assert_eq!(CanonicalName::root().label_count(), 0);
    }

    #[test]
    fn rejects_bad_labels() {
        assert!(CanonicalName::from_user("").is_err());
        assert!(CanonicalName::from_user("foo..bar").is_err());
        let long = "a".repeat(64);
        assert!(CanonicalName::from_user(&long).is_err());
    }

    #[test]
    fn zone_membership_is_label_aligned() {
        let zone = CanonicalName::from_user("corp.example").unwrap();
        let inside = CanonicalName::from_user("host.corp.example").unwrap();
        let equal = CanonicalName::from_user("corp.example.").unwrap();
        let lookalike = CanonicalName::from_user("evilcorp.example").unwrap();

        assert!(inside.is_within(&zone));
        assert!(equal.is_within(&zone));
        assert!(!lookalike.is_within(&zone));
        assert!(inside.is_within(&CanonicalName::root()));
    }

    #[test]
    fn suffix_replacement_keeps_leading_labels() {
        let from = CanonicalName::from_user("mydomain.local").unwrap();
        let to = CanonicalName::from_user("realdomain.com").unwrap();

        let exact = CanonicalName::from_user("mydomain.local").unwrap();
        assert_eq!(exact.replace_suffix(&from, &to).unwrap(), to);

        let sub = CanonicalName::from_user("db.mydomain.local").unwrap();
        assert_eq!(
            sub.replace_suffix(&from, &to).unwrap().as_str(),
            "db.realdomain.com."
        );

        let outside = CanonicalName::from_user("db.other.local").unwrap();
        assert!(outside.replace_suffix(&from, &to).is_none());
    }

    #[test]
    fn search_domain_join() {
        let name = CanonicalName::from_user("db").unwrap();
        let search = CanonicalName::from_user("svc.local").unwrap();
        assert_eq!(name.with_search_domain(&search).as_str(), "db.svc.local.");
    }
}
