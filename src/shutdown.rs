//! Signal-driven shutdown.
//!
//! SIGINT, SIGQUIT and SIGTERM are forwarded from a `signal-hook-tokio`
//! stream into a small bounded queue. The first of them moves the
//! coordinator from `Running` to `ShuttingDown` and starts the target's
//! shutdown on its own task; every later signal is only logged.

use futures::StreamExt;
use signal_hook::consts::signal::{SIGINT, SIGQUIT, SIGTERM};
use signal_hook_tokio::{Handle, Signals};
use std::borrow::Cow;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, Instrument};

/// Pending signals held between the OS listener and the coordinator.
/// The forwarder waits when it is full, and signal-hook coalesces repeats
/// meanwhile, so a full queue delays signals instead of dropping them.
pub const SIGNAL_QUEUE_DEPTH: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchedSignal {
    Interrupt,
    Quit,
    Terminate,
}

impl WatchedSignal {
    pub const ALL: [WatchedSignal; 3] = [
        WatchedSignal::Interrupt,
        WatchedSignal::Quit,
        WatchedSignal::Terminate,
    ];

    pub fn from_raw(signal: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.raw() == signal)
    }

    pub fn raw(self) -> i32 {
        match self {
            WatchedSignal::Interrupt => SIGINT,
            WatchedSignal::Quit => SIGQUIT,
            WatchedSignal::Terminate => SIGTERM,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            WatchedSignal::Interrupt => "SIGINT",
            WatchedSignal::Quit => "SIGQUIT",
            WatchedSignal::Terminate => "SIGTERM",
        }
    }
}

/// Human-readable name for a raw signal number, "SIG <n>" when unknown.
pub fn signal_name(signal: i32) -> Cow<'static, str> {
    match WatchedSignal::from_raw(signal) {
        Some(s) => Cow::Borrowed(s.name()),
        None => Cow::Owned(format!("SIG {}", signal)),
    }
}

/// Something that can stop everything it started.
#[async_trait::async_trait]
pub trait Shutdowner: Send + Sync {
    async fn shutdown(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Running,
    ShuttingDown,
    Stopped,
}

pub struct ShutdownCoordinator {
    target: Arc<dyn Shutdowner>,
    phase: watch::Sender<Phase>,
}

impl ShutdownCoordinator {
    pub fn new(target: Arc<dyn Shutdowner>) -> Arc<Self> {
        let (phase, _) = watch::channel(Phase::Running);
        Arc::new(ShutdownCoordinator { target, phase })
    }

    pub fn phase(&self) -> Phase {
        *self.phase.borrow()
    }

    /*
        @@@
        @handle_signal();
        . Logs the signal by name.
        . Signals outside the watched set are ignored.
        . The first watched signal flips Running to ShuttingDown in one step and spawns the shutdown;
          the returned handle resolves once the target has finished.
        . Any later signal finds the phase already moved on and returns None.
    */
    pub fn handle_signal(self: &Arc<Self>, signal: i32) -> Option<JoinHandle<()>> {
        let name = signal_name(signal);
        if WatchedSignal::from_raw(signal).is_none() {
            info!(signal, "Received {}, ignoring", name);
            return None;
        }

        let first = self.phase.send_if_modified(|phase| {
            if *phase == Phase::Running {
                *phase = Phase::ShuttingDown;
                true
            } else {
                false
            }
        });
        if !first {
            info!(signal, "Received {}, shutdown already in progress", name);
            return None;
        }

        info!(signal, "Received {}, initiating shutdown...", name);
        let this = Arc::clone(self);
        Some(tokio::spawn(
            async move {
                this.target.shutdown().await;
                this.phase.send_replace(Phase::Stopped);
                info!("shutdown complete");
            }
            .in_current_span(),
        ))
    }

    /// Handles queued signals in delivery order until the queue closes.
    pub async fn listen(self: Arc<Self>, mut queue: mpsc::Receiver<i32>) {
        while let Some(signal) = queue.recv().await {
            self.handle_signal(signal);
        }
        debug!("signal queue closed");
    }

    /// Resolves once a shutdown has run to completion.
    pub async fn wait(&self) {
        let mut phase = self.phase.subscribe();
        let _ = phase.wait_for(|p| *p == Phase::Stopped).await;
    }
}

/// The running OS signal listener. Dropping it leaves the tasks running.
pub struct SignalListener {
    handle: Handle,
    forwarder: JoinHandle<()>,
    coordinator: JoinHandle<()>,
}

impl SignalListener {
    /// Unregisters the signal handlers and waits for both tasks to finish.
    pub async fn close(self) {
        self.handle.close();
        let _ = self.forwarder.await;
        let _ = self.coordinator.await;
    }
}

/*
    @@@
    @install();
    . Registers SIGINT, SIGQUIT and SIGTERM with signal-hook-tokio.
    . One task forwards each delivered signal into a bounded queue of SIGNAL_QUEUE_DEPTH.
    . A second task drains that queue through the coordinator.
*/
pub fn install(coordinator: Arc<ShutdownCoordinator>) -> std::io::Result<SignalListener> {
    let signals = Signals::new(WatchedSignal::ALL.map(WatchedSignal::raw))?;
    let handle = signals.handle();
    let (tx, rx) = mpsc::channel(SIGNAL_QUEUE_DEPTH);

    let forwarder = tokio::spawn(async move {
        let mut signals = signals.fuse();
        while let Some(signal) = signals.next().await {
            if tx.send(signal).await.is_err() {
                break;
            }
        }
    });
    let coordinator = tokio::spawn(coordinator.listen(rx));

    Ok(SignalListener {
        handle,
        forwarder,
        coordinator,
    })
}
