use relay_dns_application::ports::{DnsExchanger, HostsStore, NoHosts};
use relay_dns_application::services::{Router, SearchList};
use relay_dns_application::ResolveQueryUseCase;
use relay_dns_domain::Config;
use relay_dns_infrastructure::dns::{
    CachedExchanger, DnsServerHandler, Forwarder, HostsDb, HostsWatcher, ResponseCache,
    ServerMetrics,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

pub struct DnsServices {
    pub handler: Arc<DnsServerHandler>,
    pub metrics: Arc<ServerMetrics>,
    pub hosts_watcher: Option<JoinHandle<()>>,
}

/// Build the resolver stack from a validated config: hosts database (with
/// optional watcher), forwarder, caching layer, routing, pipeline, wire
/// handler.
pub fn build(config: &Config) -> anyhow::Result<DnsServices> {
    let metrics = Arc::new(ServerMetrics::default());

    let mut hosts_watcher = None;
    let hosts: Arc<dyn HostsStore> = match &config.dns.hostsfile {
        Some(path) => {
            let db = Arc::new(HostsDb::from_file(
                path,
                config.dns.round_robin,
                Arc::clone(&metrics),
            )?);
            if config.dns.hostsfile_poll > 0 {
                let watcher = HostsWatcher::new(
                    Arc::clone(&db),
                    path,
                    Duration::from_secs(config.dns.hostsfile_poll),
                    Arc::clone(&metrics),
                );
                hosts_watcher = Some(watcher.spawn());
            }
            db
        }
        None => Arc::new(NoHosts),
    };

    let forwarder = Arc::new(Forwarder::new(
        Duration::from_millis(config.dns.read_timeout_ms),
        Arc::clone(&metrics),
    ));
    let cache = Arc::new(ResponseCache::new(
        config.dns.rcache,
        Duration::from_secs(config.dns.rcache_ttl),
        Arc::clone(&metrics),
    ));
    let exchanger: Arc<dyn DnsExchanger> = Arc::new(CachedExchanger::new(
        forwarder,
        cache,
        Arc::clone(&metrics),
    ));

    let router = Router::new(
        config.alias_table()?,
        config.stub_table()?,
        config.upstream_endpoints()?,
        config.dns.no_rec,
    );
    let search = SearchList::new(
        config.search_list()?,
        config.dns.ndots,
        config.dns.append_search_domains,
    );

    // Hosts records advertise the cache TTL; with the cache disabled they
    // advertise 0 so intermediate resolvers do not hold on to them.
    let hosts_ttl = if config.dns.rcache > 0 {
        config.dns.rcache_ttl as u32
    } else {
        0
    };

    let use_case = Arc::new(ResolveQueryUseCase::new(
        hosts,
        exchanger,
        router,
        search,
        config.dns.no_rec,
        config.dns.fwd_ndots,
        hosts_ttl,
    ));

    Ok(DnsServices {
        handler: Arc::new(DnsServerHandler::new(use_case, Arc::clone(&metrics))),
        metrics,
        hosts_watcher,
    })
}
