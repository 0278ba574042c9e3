use crate::ports::{ForwardPlan, HostsAnswer, HostsStore};
use hickory_proto::rr::RecordType;
use relay_dns_domain::{CanonicalName, Endpoint};
use tracing::debug;

/// What to do with one candidate name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    /// Answer locally from the hosts database.
    Hosts(HostsAnswer),

    /// Forward to the given upstream set.
    Forward(ForwardPlan),

    /// Recursion is disabled and nothing local matched.
    Refuse,
}

/// A routed candidate: the name actually used (after at most one alias
/// rewrite) and the decision for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTarget {
    pub name: CanonicalName,
    pub aliased: bool,
    pub decision: RouteDecision,
}

/// The routing table: hosts match → local answer; alias match → rewrite and
/// re-route once; stub-zone match → zone upstreams (longest zone wins,
/// insertion order breaks ties); otherwise the default upstream list.
pub struct Router {
    aliases: Vec<(CanonicalName, CanonicalName)>,
    stubs: Vec<(CanonicalName, Vec<Endpoint>)>,
    default_upstreams: Vec<Endpoint>,
    no_rec: bool,
}

impl Router {
    pub fn new(
        aliases: Vec<(CanonicalName, CanonicalName)>,
        stubs: Vec<(CanonicalName, Vec<Endpoint>)>,
        default_upstreams: Vec<Endpoint>,
        no_rec: bool,
    ) -> Self {
        Self {
            aliases,
            stubs,
            default_upstreams,
            no_rec,
        }
    }

    pub fn route(
        &self,
        name: &CanonicalName,
        record_type: RecordType,
        hosts: &dyn HostsStore,
    ) -> RouteTarget {
        self.route_inner(name.clone(), record_type, hosts, false)
    }

    fn route_inner(
        &self,
        name: CanonicalName,
        record_type: RecordType,
        hosts: &dyn HostsStore,
        rewritten: bool,
    ) -> RouteTarget {
        let answer = hosts.lookup(&name, record_type);
        if !answer.is_miss() {
            return RouteTarget {
                name,
                aliased: rewritten,
                decision: RouteDecision::Hosts(answer),
            };
        }

        // One alias hop at most: a rewritten name is never re-aliased.
        if !rewritten {
            if let Some(target) = self.alias_rewrite(&name) {
                debug!(from = %name, to = %target, "Alias rewrite");
                return self.route_inner(target, record_type, hosts, true);
            }
        }

        if let Some(endpoints) = self.stub_match(&name) {
            return RouteTarget {
                name,
                aliased: rewritten,
                decision: RouteDecision::Forward(ForwardPlan {
                    endpoints: endpoints.to_vec(),
                    is_default: false,
                }),
            };
        }

        if self.no_rec {
            return RouteTarget {
                name,
                aliased: rewritten,
                decision: RouteDecision::Refuse,
            };
        }

        RouteTarget {
            name,
            aliased: rewritten,
            decision: RouteDecision::Forward(ForwardPlan {
                endpoints: self.default_upstreams.clone(),
                is_default: true,
            }),
        }
    }

    /// Longest matching alias key; the matched suffix is replaced by the
    /// alias target.
    fn alias_rewrite(&self, name: &CanonicalName) -> Option<CanonicalName> {
        self.aliases
            .iter()
            .filter(|(source, _)| name.is_within(source))
            .max_by_key(|(source, _)| source.label_count())
            .and_then(|(source, target)| name.replace_suffix(source, target))
    }

    /// Most specific stub zone covering `name`. Strictly-greater comparison
    /// keeps the first-inserted zone on equal label counts.
    fn stub_match(&self, name: &CanonicalName) -> Option<&[Endpoint]> {
        let mut best: Option<(&CanonicalName, &[Endpoint])> = None;
        for (zone, endpoints) in &self.stubs {
            if !name.is_within(zone) {
                continue;
            }
            let better = match best {
                Some((best_zone, _)) => zone.label_count() > best_zone.label_count(),
                None => true,
            };
            if better {
                best = Some((zone, endpoints));
            }
        }
        best.map(|(_, endpoints)| endpoints)
    }
}
