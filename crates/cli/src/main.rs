use clap::Parser;
use relay_dns_domain::CliOverrides;
use tracing::info;

mod bootstrap;
mod di;
mod server;

#[derive(Parser)]
#[command(name = "relay-dns")]
#[command(version)]
#[command(about = "Lightweight caching DNS forwarder")]
struct Cli {
    /// Configuration file path
    #[arg(short = 'c', long, value_name = "FILE", env = "RELAY_DNS_CONFIG")]
    config: Option<String>,

    /// Address to listen on, host[:port]
    #[arg(short = 'l', long, env = "RELAY_DNS_LISTEN")]
    listen: Option<String>,

    /// Comma-delimited list of upstream nameservers, host[:port]
    #[arg(short = 'n', long, env = "RELAY_DNS_SERVERS")]
    nameservers: Option<String>,

    /// Use different nameservers for specific domains,
    /// zone[,zone]/host[:port][,host[:port]]; repeatable
    #[arg(short = 'z', long = "stubzone", env = "RELAY_DNS_STUB")]
    stubzones: Vec<String>,

    /// Path to a hostsfile, e.g. /etc/hosts
    #[arg(short = 'f', long, env = "RELAY_DNS_HOSTSFILE")]
    hostsfile: Option<String>,

    /// How often to poll the hostsfile for changes (seconds, 0 to disable)
    #[arg(short = 'p', long, env = "RELAY_DNS_POLL")]
    hostsfile_poll: Option<u64>,

    /// Comma-delimited list of search domains
    #[arg(short = 's', long, env = "RELAY_DNS_SEARCH")]
    search_domains: Option<String>,

    /// Resolve queries using the search domains
    #[arg(short = 'a', long, env = "RELAY_DNS_APPEND")]
    append_search_domains: bool,

    /// Capacity of the response cache (0 disables the cache)
    #[arg(short = 'r', long, env = "RELAY_DNS_RCACHE")]
    rcache: Option<usize>,

    /// TTL for entries in the response cache (seconds)
    #[arg(long, env = "RELAY_DNS_RCACHE_TTL")]
    rcache_ttl: Option<u64>,

    /// Disable recursion
    #[arg(long, env = "RELAY_DNS_NOREC")]
    no_rec: bool,

    /// Minimum number of dots a name must have before the query is forwarded
    #[arg(long, env = "RELAY_DNS_FWD_NDOTS")]
    fwd_ndots: Option<usize>,

    /// Number of dots a name must have before an initial absolute query is made
    #[arg(long, env = "RELAY_DNS_NDOTS")]
    ndots: Option<usize>,

    /// Alias one zone onto another, source/target; repeatable
    #[arg(long = "alias", env = "RELAY_DNS_ALIAS")]
    aliases: Vec<String>,

    /// Enable round robin of A/AAAA records from the hostsfile
    #[arg(long, env = "RELAY_DNS_RR")]
    round_robin: bool,

    /// Per-upstream read timeout in milliseconds
    #[arg(long, env = "RELAY_DNS_READ_TIMEOUT_MS")]
    read_timeout_ms: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RELAY_DNS_LOG_LEVEL")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let overrides = CliOverrides {
        listen: cli.listen,
        nameservers: cli.nameservers,
        stubzones: cli.stubzones,
        hostsfile: cli.hostsfile,
        hostsfile_poll: cli.hostsfile_poll,
        search_domains: cli.search_domains,
        append_search_domains: cli.append_search_domains,
        rcache: cli.rcache,
        rcache_ttl: cli.rcache_ttl,
        no_rec: cli.no_rec,
        fwd_ndots: cli.fwd_ndots,
        ndots: cli.ndots,
        aliases: cli.aliases,
        round_robin: cli.round_robin,
        read_timeout_ms: cli.read_timeout_ms,
        log_level: cli.log_level,
    };

    let config = bootstrap::load_config(cli.config.as_deref(), overrides)?;
    bootstrap::init_logging(&config);

    info!("Starting relay-dns v{}", env!("CARGO_PKG_VERSION"));
    config.validate()?;

    let listen_addr = config.listen_addr()?;
    let services = di::build(&config)?;

    info!(upstreams = ?config.dns.nameservers, "Upstream nameservers");
    if config.dns.append_search_domains {
        info!(search = ?config.dns.search_domains, "Search domains");
    }

    let result = server::run_dns_server(listen_addr, services.handler.clone()).await;

    if let Some(watcher) = services.hosts_watcher {
        watcher.abort();
    }

    let stats = services.metrics.snapshot();
    info!(
        queries = stats.queries_received,
        hosts_hits = stats.hosts_hits,
        cache_hits = stats.cache_hits,
        upstream_attempts = stats.upstream_attempts,
        upstream_failures = stats.upstream_failures,
        servfail = stats.servfail_returned,
        nxdomain = stats.nxdomain_returned,
        "Final counters"
    );
    info!("Server shutdown complete");

    result
}
