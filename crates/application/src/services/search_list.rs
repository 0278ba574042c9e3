use relay_dns_domain::CanonicalName;

/// Search-domain expansion, mirroring stub-resolver behaviour.
///
/// Names with at least `ndots` labels are tried as-is first; shorter names
/// walk the search list before falling back to the bare name, so a lookup
/// for `db` with search `[svc.local., local.]` tries `db.svc.local.`,
/// `db.local.`, then `db.`.
#[derive(Debug, Clone)]
pub struct SearchList {
    domains: Vec<CanonicalName>,
    ndots: usize,
    append: bool,
}

impl SearchList {
    pub fn new(domains: Vec<CanonicalName>, ndots: usize, append: bool) -> Self {
        Self {
            domains,
            ndots,
            append,
        }
    }

    /// Candidate names in the order they are attempted. Always non-empty.
    pub fn candidates(&self, name: &CanonicalName) -> Vec<CanonicalName> {
        if !self.append || self.domains.is_empty() {
            return vec![name.clone()];
        }

        let expansions = self
            .domains
            .iter()
            .map(|domain| name.with_search_domain(domain));

        if name.label_count() >= self.ndots {
            std::iter::once(name.clone()).chain(expansions).collect()
        } else {
            expansions.chain(std::iter::once(name.clone())).collect()
        }
    }
}
