// Kept in its own test binary: it raises real signals at the test process.

use nix::sys::signal::{raise, Signal};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use watchdog::shutdown::{self, Phase};
use watchdog::{ShutdownCoordinator, Shutdowner};

#[derive(Default)]
struct CountingShutdown {
    calls: AtomicUsize,
}

#[async_trait::async_trait]
impl Shutdowner for CountingShutdown {
    async fn shutdown(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn os_signals_trigger_exactly_one_shutdown() {
    let target = Arc::new(CountingShutdown::default());
    let coord = ShutdownCoordinator::new(target.clone());
    let listener = shutdown::install(coord.clone()).expect("signal handlers installed");

    raise(Signal::SIGTERM).unwrap();
    timeout(Duration::from_secs(5), coord.wait())
        .await
        .expect("SIGTERM was not handled");

    raise(Signal::SIGINT).unwrap();
    raise(Signal::SIGQUIT).unwrap();
    sleep(Duration::from_millis(200)).await;

    assert_eq!(coord.phase(), Phase::Stopped);
    assert_eq!(target.calls.load(Ordering::SeqCst), 1);
    listener.close().await;
}
