use crate::runtime::ServiceState;
use nix::sys::signal::{killpg, Signal};
use tokio::time::{timeout, Duration};
use tracing::{debug, error, info, warn};

/// How long to wait for the monitor to observe the exit after SIGKILL.
const KILL_WAIT: Duration = Duration::from_secs(1);

/*
    @@@
    @stop_service();
    . Sends SIGTERM to the service's process group.
    . Waits up to the service's term_timeout for the process to exit.
    . Escalates to SIGKILL when the grace period runs out.
    . Does nothing if the service has no running process.
*/
pub async fn stop_service(svc: &ServiceState) {
    let name = svc.spec.name.as_str();
    let mut running = svc.running.subscribe();

    // 1) Send graceful stop
    let Some(pid) = *svc.pid.lock().await else {
        debug!(service = %name, "not running, nothing to stop");
        return;
    };
    info!(service = %name, pid = pid.as_raw(), signal = ?Signal::SIGTERM, "sending stop signal");
    if let Err(e) = killpg(pid, Signal::SIGTERM) {
        error!(service = %name, error = %e, "failed to send SIGTERM");
    }

    // 2) Wait up to term_timeout
    let grace = svc.spec.term_timeout;
    if timeout(grace, running.wait_for(|r| !*r)).await.is_ok() {
        info!(service = %name, "exited cleanly");
        return;
    }

    // 3) Force-kill
    if let Err(e) = killpg(pid, Signal::SIGKILL) {
        error!(service = %name, error = %e, "failed to SIGKILL");
    } else {
        warn!(service = %name, timeout = ?grace, "sent SIGKILL after timeout");
    }
    if timeout(KILL_WAIT, running.wait_for(|r| !*r)).await.is_err() {
        error!(service = %name, pid = pid.as_raw(), "still running after SIGKILL");
    }
}

#[cfg(test)]
mod tests {
    use crate::registry::Registry;
    use crate::runtime::Watchdog;
    use std::time::{Duration, Instant};

    fn single(name: &str, binary: &str, args: &str, term_timeout: Duration) -> Watchdog {
        let mut reg = Registry::new();
        let mut svc = reg.add_service(name, binary).unwrap();
        svc.add_args(args);
        svc.set_term_timeout(term_timeout);
        Watchdog::new(reg).unwrap()
    }

    #[tokio::test]
    async fn test_sigterm_is_enough() {
        let fido = single("sleeper", "sleep", "30", Duration::from_secs(10));
        fido.walk().await;

        let started = Instant::now();
        fido.stop_all().await;
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(!fido.is_running("sleeper"));
    }

    #[tokio::test]
    async fn test_escalates_to_sigkill() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("stubborn.sh");
        std::fs::write(&script, "trap '' TERM\nwhile :; do sleep 1; done\n").unwrap();

        let fido = single(
            "stubborn",
            "sh",
            script.to_str().unwrap(),
            Duration::from_millis(300),
        );
        fido.walk().await;
        // let the shell install its trap
        tokio::time::sleep(Duration::from_millis(300)).await;

        let started = Instant::now();
        fido.stop_all().await;
        assert!(started.elapsed() >= Duration::from_millis(300));
        assert!(!fido.is_running("stubborn"));
    }
}
