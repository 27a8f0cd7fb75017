//! Accept loop and worker supervision

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use shared_protocol::SessionId;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::{JoinError, JoinSet};
use tokio::time::timeout;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::handler::{SessionOutcome, serve_session};
use crate::{DaemonConfig, ServiceResult};

/// Pause after a failed accept before trying again
const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

/// Daemon counters, written by the supervisor only
#[derive(Debug, Default)]
pub struct DaemonStats {
    active_workers: AtomicUsize,
    sessions_replied: AtomicU64,
    sessions_rejected: AtomicU64,
    sessions_failed: AtomicU64,
}

impl DaemonStats {
    pub fn active_workers(&self) -> usize {
        self.active_workers.load(Ordering::SeqCst)
    }

    pub fn sessions_replied(&self) -> u64 {
        self.sessions_replied.load(Ordering::SeqCst)
    }

    pub fn sessions_rejected(&self) -> u64 {
        self.sessions_rejected.load(Ordering::SeqCst)
    }

    pub fn sessions_failed(&self) -> u64 {
        self.sessions_failed.load(Ordering::SeqCst)
    }

    fn worker_started(&self) {
        self.active_workers.fetch_add(1, Ordering::SeqCst);
    }

    /// Account for one finished worker
    fn worker_finished(&self, joined: Result<SessionOutcome, JoinError>) {
        self.active_workers.fetch_sub(1, Ordering::SeqCst);

        let counter = match joined {
            Ok(SessionOutcome::Replied { .. }) => &self.sessions_replied,
            Ok(SessionOutcome::Rejected) => &self.sessions_rejected,
            Ok(SessionOutcome::Failed) => &self.sessions_failed,
            Err(e) if e.is_panic() => {
                error!("Worker panicked: {}", e);
                &self.sessions_failed
            }
            Err(e) => {
                warn!("Worker cancelled: {}", e);
                &self.sessions_failed
            }
        };
        counter.fetch_add(1, Ordering::SeqCst);
    }
}

/// Encryption daemon: one listener, one worker task per connection
pub struct Daemon {
    listener: TcpListener,
    config: Arc<DaemonConfig>,
    stats: Arc<DaemonStats>,
}

impl Daemon {
    /// Bind the listening socket
    pub async fn bind(config: DaemonConfig) -> ServiceResult<Self> {
        let listener = TcpListener::bind(config.bind_addr).await?;
        info!("Listening on {}", listener.local_addr()?);

        Ok(Self {
            listener,
            config: Arc::new(config),
            stats: Arc::new(DaemonStats::default()),
        })
    }

    pub fn local_addr(&self) -> ServiceResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn stats(&self) -> Arc<DaemonStats> {
        Arc::clone(&self.stats)
    }

    /// Serve until the process ends
    pub async fn run(self) -> ServiceResult<()> {
        self.run_until(std::future::pending()).await
    }

    /// Serve until `shutdown` completes, then drain running workers
    pub async fn run_until<F>(self, shutdown: F) -> ServiceResult<()>
    where
        F: Future<Output = ()>,
    {
        let Self {
            listener,
            config,
            stats,
        } = self;
        let mut workers = JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            reap(&mut workers, &stats);

            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested, no longer accepting");
                    break;
                }
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        dispatch(&mut workers, &stats, stream, peer, &config);
                        reap(&mut workers, &stats);
                    }
                    Err(e) => {
                        error!("Accept error: {}", e);
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                    }
                },
                Some(joined) = workers.join_next(), if !workers.is_empty() => {
                    stats.worker_finished(joined);
                }
            }
        }

        drop(listener);
        if !workers.is_empty() {
            info!(
                "Waiting up to {:?} for {} running sessions",
                config.shutdown_grace(),
                workers.len()
            );
        }
        let drained = timeout(config.shutdown_grace(), async {
            while let Some(joined) = workers.join_next().await {
                stats.worker_finished(joined);
            }
        })
        .await;

        // Stalled peers would otherwise hold shutdown forever
        if drained.is_err() {
            warn!("Cancelling {} sessions still running", workers.len());
            workers.abort_all();
            while let Some(joined) = workers.join_next().await {
                stats.worker_finished(joined);
            }
        }

        info!(
            replied = stats.sessions_replied(),
            rejected = stats.sessions_rejected(),
            failed = stats.sessions_failed(),
            "Daemon stopped"
        );
        Ok(())
    }
}

fn dispatch(
    workers: &mut JoinSet<SessionOutcome>,
    stats: &DaemonStats,
    stream: TcpStream,
    peer: SocketAddr,
    config: &Arc<DaemonConfig>,
) {
    let session_id = SessionId::new();
    let span = info_span!("session", session_id = %session_id, peer = %peer);
    let config = Arc::clone(config);

    workers.spawn(
        async move {
            debug!("Connection accepted");
            serve_session(stream, &config).await
        }
        .instrument(span),
    );
    stats.worker_started();
}

/// Collect finished workers without waiting
fn reap(workers: &mut JoinSet<SessionOutcome>, stats: &DaemonStats) {
    while let Some(joined) = workers.try_join_next() {
        stats.worker_finished(joined);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ClientConfig, EncryptClient, ServiceError};
    use futures::future::join_all;
    use net_transport::TransportConfig;
    use pad_cipher::{PadKey, encode};
    use shared_protocol::{AlphaText, RoleTag};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::sync::oneshot;
    use tokio::task::JoinHandle;

    struct Running {
        addr: SocketAddr,
        stats: Arc<DaemonStats>,
        stop: oneshot::Sender<()>,
        handle: JoinHandle<ServiceResult<()>>,
    }

    async fn start_daemon() -> Running {
        start_daemon_with(DaemonConfig::default()).await
    }

    async fn start_daemon_with(config: DaemonConfig) -> Running {
        let config = DaemonConfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            ..config
        };
        let daemon = Daemon::bind(config).await.unwrap();
        let addr = daemon.local_addr().unwrap();
        let stats = daemon.stats();
        let (stop, stopped) = oneshot::channel::<()>();
        let handle = tokio::spawn(daemon.run_until(async move {
            let _ = stopped.await;
        }));

        Running {
            addr,
            stats,
            stop,
            handle,
        }
    }

    fn client_for(addr: SocketAddr) -> EncryptClient {
        EncryptClient::new(ClientConfig {
            server_addr: addr.to_string(),
            transport: TransportConfig {
                ack_interval_ms: 100,
                ..Default::default()
            },
            ..Default::default()
        })
    }

    async fn wait_for_idle(stats: &DaemonStats) {
        for _ in 0..200 {
            if stats.active_workers() == 0 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("workers still active: {}", stats.active_workers());
    }

    #[tokio::test]
    async fn test_end_to_end_hello_world() {
        let daemon = start_daemon().await;
        let plaintext = AlphaText::new("HELLO WORLD").unwrap();
        let key = PadKey::generate(64);

        let ciphertext = client_for(daemon.addr)
            .encrypt(&plaintext, &key)
            .await
            .unwrap();

        assert_eq!(ciphertext.len(), 11);
        assert_eq!(ciphertext, encode(&plaintext, &key).unwrap());

        wait_for_idle(&daemon.stats).await;
        assert_eq!(daemon.stats.sessions_replied(), 1);

        daemon.stop.send(()).unwrap();
        daemon.handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_wrong_role_is_never_acknowledged() {
        let daemon = start_daemon().await;
        let mut client = EncryptClient::new(ClientConfig {
            server_addr: daemon.addr.to_string(),
            role_tag: RoleTag::new("DEC").unwrap(),
            transport: TransportConfig {
                ack_interval_ms: 50,
                ..Default::default()
            },
        });

        let err = client
            .encrypt(&AlphaText::new("SECRET").unwrap(), &PadKey::generate(6))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::AckTimeout { .. }));

        wait_for_idle(&daemon.stats).await;
        assert_eq!(daemon.stats.sessions_rejected(), 1);
        assert_eq!(daemon.stats.sessions_replied(), 0);

        daemon.stop.send(()).unwrap();
        daemon.handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_clients_get_their_own_replies() {
        let daemon = start_daemon().await;

        let jobs: Vec<(AlphaText, PadKey)> = (0..16)
            .map(|i| {
                let plaintext =
                    AlphaText::from_bytes(PadKey::generate(100 + i * 37).as_bytes()).unwrap();
                let key = PadKey::generate(plaintext.len() + i);
                (plaintext, key)
            })
            .collect();

        let replies = join_all(jobs.iter().map(|(plaintext, key)| {
            let mut client = client_for(daemon.addr);
            async move { client.encrypt(plaintext, key).await }
        }))
        .await;

        for ((plaintext, key), reply) in jobs.iter().zip(replies) {
            assert_eq!(reply.unwrap(), encode(plaintext, key).unwrap());
        }

        wait_for_idle(&daemon.stats).await;
        assert_eq!(daemon.stats.sessions_replied(), 16);

        daemon.stop.send(()).unwrap();
        daemon.handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_silent_peer_does_not_block_others() {
        let daemon = start_daemon().await;
        let silent = TcpStream::connect(daemon.addr).await.unwrap();

        let plaintext = AlphaText::new("STILL SERVED").unwrap();
        let key = PadKey::generate(12);
        let ciphertext = client_for(daemon.addr)
            .encrypt(&plaintext, &key)
            .await
            .unwrap();
        assert_eq!(ciphertext, encode(&plaintext, &key).unwrap());

        drop(silent);
        wait_for_idle(&daemon.stats).await;
        assert_eq!(daemon.stats.sessions_replied(), 1);
        assert_eq!(daemon.stats.sessions_failed(), 1);

        daemon.stop.send(()).unwrap();
        daemon.handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_drains_running_sessions() {
        let daemon = start_daemon().await;
        let stalled = TcpStream::connect(daemon.addr).await.unwrap();

        // Worker is parked on the control code read
        for _ in 0..200 {
            if daemon.stats.active_workers() == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(daemon.stats.active_workers(), 1);

        daemon.stop.send(()).unwrap();
        drop(stalled);
        daemon.handle.await.unwrap().unwrap();

        assert_eq!(daemon.stats.active_workers(), 0);
        assert_eq!(daemon.stats.sessions_failed(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_cancels_sessions_past_grace_period() {
        let daemon = start_daemon_with(DaemonConfig {
            shutdown_grace_ms: 100,
            ..Default::default()
        })
        .await;

        // Announces a payload, gets the ack, then never sends it
        let mut stalled = TcpStream::connect(daemon.addr).await.unwrap();
        stalled.write_all(b"ENC40").await.unwrap();
        let mut ack = [0u8; 3];
        stalled.read_exact(&mut ack).await.unwrap();
        assert_eq!(&ack, b"ACK");

        daemon.stop.send(()).unwrap();
        let stopped = timeout(Duration::from_secs(3), daemon.handle)
            .await
            .expect("shutdown must not wait on a stalled peer");
        stopped.unwrap().unwrap();

        assert_eq!(daemon.stats.active_workers(), 0);
        assert_eq!(daemon.stats.sessions_failed(), 1);
        assert_eq!(daemon.stats.sessions_replied(), 0);
        drop(stalled);
    }
}
