use crate::control::stop_service;
use crate::error::{EngineError, RegistryError};
use crate::plan::startup_order;
use crate::registry::Registry;
use crate::service::ServiceSpec;
use crate::shutdown::Shutdowner;
use nix::unistd::{setsid, Pid};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::process::{Child, Command};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};
use tracing::{error, info, warn};

/// Pause before a crashed service is started again.
pub const RESTART_DELAY: Duration = Duration::from_secs(2);

/// How often walk reports a dependency that still has no running process.
pub const DEPENDENCY_STALL_REPORT: Duration = Duration::from_secs(10);

// Runtime data for one service.
// pid is only written while holding its lock, after checking the stopping flag.
pub struct ServiceState {
    pub spec: ServiceSpec,
    pub(crate) pid: Mutex<Option<Pid>>,
    pub(crate) running: watch::Sender<bool>,
}

impl ServiceState {
    fn new(spec: ServiceSpec) -> Self {
        let (running, _) = watch::channel(false);
        ServiceState {
            spec,
            pid: Mutex::new(None),
            running,
        }
    }
}

pub struct Watchdog {
    services: Vec<Arc<ServiceState>>,
    order: Vec<usize>,
    dependency: Vec<Option<usize>>,
    stopping: watch::Sender<bool>,
    walked: AtomicBool,
    monitors: Mutex<Vec<JoinHandle<()>>>,
}

impl Watchdog {
    /// Takes over a registry and plans the startup order. Fails on unknown
    /// dependencies and dependency cycles, before anything is started.
    pub fn new(registry: Registry) -> Result<Self, EngineError> {
        registry.validate().map_err(RegistryError::from)?;
        let specs = registry.into_services();
        let order = startup_order(&specs)?;
        let dependency = specs
            .iter()
            .map(|s| {
                s.dependency
                    .as_deref()
                    .and_then(|d| specs.iter().position(|o| o.name == d))
            })
            .collect();
        let (stopping, _) = watch::channel(false);

        Ok(Watchdog {
            services: specs.into_iter().map(|s| Arc::new(ServiceState::new(s))).collect(),
            order,
            dependency,
            stopping,
            walked: AtomicBool::new(false),
            monitors: Mutex::new(Vec::new()),
        })
    }

    /// Service names in the order walk() starts them.
    pub fn startup_plan(&self) -> Vec<&str> {
        self.order
            .iter()
            .map(|&i| self.services[i].spec.name.as_str())
            .collect()
    }

    pub fn service(&self, name: &str) -> Option<&ServiceState> {
        self.services
            .iter()
            .find(|s| s.spec.name == name)
            .map(|s| s.as_ref())
    }

    pub fn is_running(&self, name: &str) -> bool {
        self.service(name).is_some_and(|s| *s.running.borrow())
    }

    pub async fn pid(&self, name: &str) -> Option<i32> {
        let svc = self.service(name)?;
        let pid = *svc.pid.lock().await;
        pid.map(Pid::as_raw)
    }

    pub fn is_stopping(&self) -> bool {
        *self.stopping.borrow()
    }

    /*
        @@@
        @walk();
        . Starts every service in plan order, each under its own monitor task.
        . A service with a dependency is only started once the dependency has a running process.
        . Returns when every service is running, or as soon as shutdown begins.
        . Only the first call does anything.
    */
    pub async fn walk(&self) {
        if self.walked.swap(true, Ordering::SeqCst) {
            warn!("walk already performed");
            return;
        }

        for &i in &self.order {
            let svc = &self.services[i];
            if let Some(dep) = self.dependency[i] {
                let dep_name = &self.services[dep].spec.name;
                info!(service = %svc.spec.name, dependency = %dep_name, "waiting for dependency");
                if !self.wait_for_dependency(i, dep).await {
                    info!("shutdown started, walk abandoned");
                    return;
                }
            }
            if self.is_stopping() {
                return;
            }

            let handle = tokio::spawn(supervise(svc.clone(), self.stopping.subscribe()));
            self.monitors.lock().await.push(handle);
        }

        for &i in &self.order {
            if !self.wait_until_running(i).await {
                return;
            }
        }
        info!(services = self.services.len(), "all services started");
    }

    // Like wait_until_running, but logs an error every DEPENDENCY_STALL_REPORT
    // while the dependency is still down.
    async fn wait_for_dependency(&self, idx: usize, dep: usize) -> bool {
        let name = &self.services[idx].spec.name;
        let dep_name = &self.services[dep].spec.name;
        let mut waited = Duration::ZERO;
        loop {
            tokio::select! {
                started = self.wait_until_running(dep) => return started,
                _ = sleep(DEPENDENCY_STALL_REPORT) => {
                    waited += DEPENDENCY_STALL_REPORT;
                    error!(
                        service = %name,
                        dependency = %dep_name,
                        waited = ?waited,
                        "walk blocked: dependency is not running"
                    );
                }
            }
        }
    }

    // false if shutdown began first
    async fn wait_until_running(&self, idx: usize) -> bool {
        let mut running = self.services[idx].running.subscribe();
        let mut stopping = self.stopping.subscribe();
        tokio::select! {
            res = running.wait_for(|r| *r) => res.is_ok() && !self.is_stopping(),
            _ = stopping.wait_for(|s| *s) => false,
        }
    }

    /*
        @@@
        @stop_all();
        . Flags the watchdog as stopping so no monitor starts or restarts a process.
        . Stops services in reverse plan order, dependents before what they depend on.
        . Waits for the monitor tasks to finish. A second call returns immediately.
    */
    pub async fn stop_all(&self) {
        if self.stopping.send_replace(true) {
            return;
        }
        info!("stopping all services");

        for &i in self.order.iter().rev() {
            stop_service(&self.services[i]).await;
        }

        let monitors = std::mem::take(&mut *self.monitors.lock().await);
        for handle in monitors {
            if let Err(e) = handle.await {
                error!(error = %e, "monitor task failed");
            }
        }
        info!("all services stopped");
    }
}

#[async_trait::async_trait]
impl Shutdowner for Watchdog {
    async fn shutdown(&self) {
        self.stop_all().await;
    }
}

/*
    @@@
    @spawn_service();
    . Starts the binary with its arguments in a new session (setsid()), so signals reach the whole group.
    . stdin is /dev/null, stdout/stderr are inherited from the watchdog.
    . Switches uid/gid when a user is configured.
*/
pub fn spawn_service(spec: &ServiceSpec) -> Result<Child, EngineError> {
    let mut cmd = Command::new(&spec.binary);
    cmd.args(&spec.args)
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());

    if let Some(user) = &spec.user {
        cmd.gid(user.gid).uid(user.uid);
    }

    // SAFETY: setsid is async-signal-safe and touches no parent state.
    unsafe {
        cmd.pre_exec(|| setsid().map(|_| ()).map_err(std::io::Error::from));
    }

    cmd.spawn().map_err(|source| EngineError::Spawn {
        service: spec.name.clone(),
        source,
    })
}

/*
    @@@
    @supervise();
    . Runs one service for the lifetime of the watchdog: spawn, wait for exit, restart after RESTART_DELAY.
    . The stopping flag is checked under the pid lock, so stop_service never misses a freshly spawned pid.
    . Exits once the watchdog is stopping.
*/
async fn supervise(svc: Arc<ServiceState>, mut stopping: watch::Receiver<bool>) {
    let name = svc.spec.name.as_str();
    loop {
        let spawned = {
            let mut pid = svc.pid.lock().await;
            if *stopping.borrow() {
                break;
            }
            match spawn_service(&svc.spec) {
                Ok(child) => {
                    *pid = child.id().map(|id| Pid::from_raw(id as i32));
                    info!(service = %name, pid = ?child.id(), "service started");
                    svc.running.send_replace(true);
                    Some(child)
                }
                Err(e) => {
                    error!(service = %name, error = %e, "failed to start service");
                    None
                }
            }
        };

        if let Some(mut child) = spawned {
            let status = child.wait().await;
            *svc.pid.lock().await = None;
            svc.running.send_replace(false);

            let stopping_now = *stopping.borrow();
            match status {
                Ok(status) if stopping_now => {
                    info!(service = %name, exit_code = ?status.code(), "service exited")
                }
                Ok(status) => {
                    warn!(service = %name, exit_code = ?status.code(), "service exited unexpectedly")
                }
                Err(e) => error!(service = %name, error = %e, "failed to wait for service"),
            }
            if stopping_now {
                break;
            }
        }

        info!(service = %name, delay = ?RESTART_DELAY, "restarting service");
        tokio::select! {
            _ = sleep(RESTART_DELAY) => {}
            _ = stopping.wait_for(|s| *s) => break,
        }
    }
}
