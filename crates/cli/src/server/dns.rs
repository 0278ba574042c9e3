use relay_dns_infrastructure::dns::transport::{read_framed, write_framed};
use relay_dns_infrastructure::dns::DnsServerHandler;
use socket2::{Domain, Protocol, Socket, Type};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// How long finished accept loops wait for in-flight queries on shutdown.
const DRAIN_GRACE: Duration = Duration::from_secs(5);

/// Idle limit for a TCP client connection between queries.
const TCP_IDLE_TIMEOUT: Duration = Duration::from_secs(10);

const MAX_UDP_DATAGRAM: usize = 4096;

/// Run the UDP and TCP listeners until a shutdown signal arrives, then
/// drain in-flight queries for a grace period.
pub async fn run_dns_server(
    bind_addr: SocketAddr,
    handler: Arc<DnsServerHandler>,
) -> anyhow::Result<()> {
    let udp_socket = Arc::new(create_udp_socket(bind_addr)?);
    let tcp_listener = create_tcp_listener(bind_addr)?;

    info!(listen = %bind_addr, "DNS server ready on udp+tcp");

    let mut tasks: JoinSet<()> = JoinSet::new();
    let mut recv_buf = [0u8; MAX_UDP_DATAGRAM];
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutdown requested by signal");
                break;
            }

            received = udp_socket.recv_from(&mut recv_buf) => {
                let (n, peer) = match received {
                    Ok(x) => x,
                    Err(e) => {
                        error!(error = %e, "UDP recv error");
                        continue;
                    }
                };
                let query = recv_buf[..n].to_vec();
                let handler = Arc::clone(&handler);
                let socket = Arc::clone(&udp_socket);
                tasks.spawn(async move {
                    if let Some(response) = handler.handle_udp(&query).await {
                        if let Err(e) = socket.send_to(&response, peer).await {
                            debug!(peer = %peer, error = %e, "UDP send failed");
                        }
                    }
                });
            }

            accepted = tcp_listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(x) => x,
                    Err(e) => {
                        error!(error = %e, "TCP accept error");
                        continue;
                    }
                };
                let handler = Arc::clone(&handler);
                tasks.spawn(async move {
                    if let Err(e) = serve_tcp_client(stream, handler).await {
                        debug!(peer = %peer, error = %e, "TCP connection closed");
                    }
                });
            }

            // Keep the set from accumulating finished tasks.
            Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
        }
    }

    drain(tasks).await;
    Ok(())
}

/// Serve queries from one TCP client: length-prefixed messages, answered in
/// order, until the peer closes or idles out.
async fn serve_tcp_client(
    mut stream: TcpStream,
    handler: Arc<DnsServerHandler>,
) -> std::io::Result<()> {
    loop {
        let query = match tokio::time::timeout(TCP_IDLE_TIMEOUT, read_framed(&mut stream)).await {
            Ok(Ok(bytes)) => bytes,
            // EOF and idle timeout both end the conversation quietly.
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(()),
            Ok(Err(e)) => return Err(e),
            Err(_) => return Ok(()),
        };

        if let Some(response) = handler.handle_tcp(&query).await {
            write_framed(&mut stream, &response).await?;
        }
    }
}

async fn drain(mut tasks: JoinSet<()>) {
    if tasks.is_empty() {
        return;
    }
    info!(in_flight = tasks.len(), "Draining in-flight queries");
    let deadline = tokio::time::timeout(DRAIN_GRACE, async {
        while tasks.join_next().await.is_some() {}
    })
    .await;
    if deadline.is_err() {
        warn!("Drain grace period elapsed, aborting remaining queries");
        tasks.abort_all();
    }
}

async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt =
        signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");
    let mut terminate =
        signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    let mut quit = signal(SignalKind::quit()).expect("failed to install SIGQUIT handler");

    tokio::select! {
        _ = interrupt.recv() => {}
        _ = terminate.recv() => {}
        _ = quit.recv() => {}
    }
}

fn create_udp_socket(bind_addr: SocketAddr) -> anyhow::Result<UdpSocket> {
    let domain = if bind_addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };
    let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    socket.set_recv_buffer_size(1024 * 1024)?;
    socket.set_send_buffer_size(1024 * 1024)?;
    socket.bind(&bind_addr.into())?;
    socket.set_nonblocking(true)?;
    let std_socket: std::net::UdpSocket = socket.into();
    Ok(UdpSocket::from_std(std_socket)?)
}

fn create_tcp_listener(bind_addr: SocketAddr) -> anyhow::Result<TcpListener> {
    let domain = if bind_addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };
    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    socket.bind(&bind_addr.into())?;
    socket.listen(1024)?;
    socket.set_nonblocking(true)?;
    let std_listener: std::net::TcpListener = socket.into();
    Ok(TcpListener::from_std(std_listener)?)
}
