//! In-memory runtime, container, task and host doubles

#![allow(dead_code)]

use async_trait::async_trait;
use ctask_foundation::{Error, Result};
use ctask_task::{
    Console, Container, ContainerRef, ExitNotifier, ExitStatus, ExitWaiter, Host, IoAttach,
    IoConfig, ProcessSpec, ResizeEvents, Runtime, Signal, SignalEvents, Task, TaskOptions,
    TaskRef, WindowSize,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, Notify};

// ============================================================================
// Task
// ============================================================================

#[derive(Default)]
struct TaskState {
    notifier: Option<ExitNotifier>,
    started: bool,
    /// An exit happened while nobody was registered
    missed: bool,
}

pub struct FakeTask {
    id: String,
    pid: u32,
    state: Mutex<TaskState>,
    exit_on_start: Option<u32>,
    start_error: Option<String>,
    wait_error: Option<String>,
    fail_resize: bool,
    fail_kill: bool,
    started: Notify,
    pub wait_calls: AtomicUsize,
    pub start_calls: AtomicUsize,
    pub resizes: Mutex<Vec<WindowSize>>,
    pub kills: Mutex<Vec<Signal>>,
}

impl FakeTask {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            pid: 4242,
            state: Mutex::new(TaskState::default()),
            exit_on_start: None,
            start_error: None,
            wait_error: None,
            fail_resize: false,
            fail_kill: false,
            started: Notify::new(),
            wait_calls: AtomicUsize::new(0),
            start_calls: AtomicUsize::new(0),
            resizes: Mutex::new(Vec::new()),
            kills: Mutex::new(Vec::new()),
        }
    }

    /// The process exits with `code` as soon as it is started
    pub fn exiting_on_start(mut self, code: u32) -> Self {
        self.exit_on_start = Some(code);
        self
    }

    pub fn failing_start(mut self, message: &str) -> Self {
        self.start_error = Some(message.to_string());
        self
    }

    pub fn failing_wait(mut self, message: &str) -> Self {
        self.wait_error = Some(message.to_string());
        self
    }

    /// Resize requests are recorded, then rejected
    pub fn failing_resize(mut self) -> Self {
        self.fail_resize = true;
        self
    }

    /// Signal requests are recorded, then rejected
    pub fn failing_kill(mut self) -> Self {
        self.fail_kill = true;
        self
    }

    pub fn starts(&self) -> usize {
        self.start_calls.load(Ordering::SeqCst)
    }

    pub fn with_pid(mut self, pid: u32) -> Self {
        self.pid = pid;
        self
    }

    /// Deliver an exit to whoever registered
    pub fn exit(&self, code: u32) {
        self.deliver(ExitStatus::new(code));
    }

    pub fn exit_with_error(&self, message: &str) {
        self.deliver(ExitStatus::failed(message));
    }

    fn deliver(&self, status: ExitStatus) {
        let mut state = self.state.lock().unwrap();
        match state.notifier.take() {
            Some(notifier) => {
                notifier.notify(status);
            }
            None => state.missed = true,
        }
    }

    pub fn missed_exit(&self) -> bool {
        self.state.lock().unwrap().missed
    }

    pub fn is_started(&self) -> bool {
        self.state.lock().unwrap().started
    }

    pub async fn wait_started(&self) {
        let notified = self.started.notified();
        if self.is_started() {
            return;
        }
        notified.await;
    }

    pub fn resize_count(&self) -> usize {
        self.resizes.lock().unwrap().len()
    }

    pub fn kill_count(&self) -> usize {
        self.kills.lock().unwrap().len()
    }
}

#[async_trait]
impl Task for FakeTask {
    fn id(&self) -> &str {
        &self.id
    }

    async fn pid(&self) -> Result<u32> {
        Ok(self.pid)
    }

    async fn wait(&self) -> Result<ExitWaiter> {
        self.wait_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.wait_error {
            return Err(Error::runtime(message.clone()));
        }
        let (notifier, waiter) = ExitWaiter::channel();
        self.state.lock().unwrap().notifier = Some(notifier);
        Ok(waiter)
    }

    async fn start(&self) -> Result<()> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.start_error {
            return Err(Error::TaskStart(message.clone()));
        }
        self.state.lock().unwrap().started = true;
        self.started.notify_waiters();
        if let Some(code) = self.exit_on_start {
            self.exit(code);
        }
        Ok(())
    }

    async fn resize(&self, size: WindowSize) -> Result<()> {
        self.resizes.lock().unwrap().push(size);
        if self.fail_resize {
            return Err(Error::runtime("tty gone"));
        }
        Ok(())
    }

    async fn kill(&self, signal: Signal) -> Result<()> {
        self.kills.lock().unwrap().push(signal);
        if self.fail_kill {
            return Err(Error::runtime("no such process"));
        }
        Ok(())
    }
}

// ============================================================================
// Container
// ============================================================================

pub struct FakeContainer {
    id: String,
    spec: ProcessSpec,
    task: Arc<FakeTask>,
    /// A task is already running and can be attached to
    running: bool,
    /// Attach fails with a backend fault rather than "no task"
    attach_error: Option<String>,
    create_error: Option<String>,
    pub attach_calls: AtomicUsize,
    pub create_calls: AtomicUsize,
    pub created_io: Mutex<Option<IoConfig>>,
    pub created_options: Mutex<Option<TaskOptions>>,
}

impl FakeContainer {
    pub fn new(id: &str, terminal: bool, task: Arc<FakeTask>) -> Self {
        Self {
            id: id.to_string(),
            spec: ProcessSpec {
                terminal,
                open_stdin: terminal,
                args: vec!["sh".to_string()],
            },
            task,
            running: false,
            attach_error: None,
            create_error: None,
            attach_calls: AtomicUsize::new(0),
            create_calls: AtomicUsize::new(0),
            created_io: Mutex::new(None),
            created_options: Mutex::new(None),
        }
    }

    pub fn running(mut self) -> Self {
        self.running = true;
        self
    }

    pub fn failing_attach(mut self, message: &str) -> Self {
        self.attach_error = Some(message.to_string());
        self
    }

    pub fn failing_create(mut self, message: &str) -> Self {
        self.create_error = Some(message.to_string());
        self
    }

    pub fn attaches(&self) -> usize {
        self.attach_calls.load(Ordering::SeqCst)
    }

    pub fn creates(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Container for FakeContainer {
    fn id(&self) -> &str {
        &self.id
    }

    async fn spec(&self) -> Result<ProcessSpec> {
        Ok(self.spec.clone())
    }

    async fn attach_task(&self, _attach: IoAttach) -> Result<TaskRef> {
        self.attach_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.attach_error {
            return Err(Error::runtime(message.clone()));
        }
        if self.running {
            Ok(self.task.clone())
        } else {
            Err(Error::TaskNotFound(self.id.clone()))
        }
    }

    async fn create_task(&self, io: IoConfig, options: &TaskOptions) -> Result<TaskRef> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.create_error {
            return Err(Error::runtime(message.clone()));
        }
        *self.created_io.lock().unwrap() = Some(io);
        *self.created_options.lock().unwrap() = Some(options.clone());
        Ok(self.task.clone())
    }
}

// ============================================================================
// Runtime
// ============================================================================

#[derive(Default)]
pub struct FakeRuntime {
    containers: HashMap<String, Arc<FakeContainer>>,
    pub load_calls: AtomicUsize,
}

impl FakeRuntime {
    pub fn with_container(mut self, container: Arc<FakeContainer>) -> Self {
        self.containers.insert(container.id.clone(), container);
        self
    }

    pub fn loads(&self) -> usize {
        self.load_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Runtime for FakeRuntime {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn load_container(&self, id: &str) -> Result<ContainerRef> {
        self.load_calls.fetch_add(1, Ordering::SeqCst);
        match self.containers.get(id) {
            Some(container) => Ok(container.clone() as ContainerRef),
            None => Err(Error::ContainerNotFound(id.to_string())),
        }
    }
}

// ============================================================================
// Host
// ============================================================================

#[derive(Clone, Default)]
pub struct ConsoleCounters {
    pub raw: Arc<AtomicUsize>,
    pub reset: Arc<AtomicUsize>,
}

impl ConsoleCounters {
    pub fn raws(&self) -> usize {
        self.raw.load(Ordering::SeqCst)
    }

    pub fn resets(&self) -> usize {
        self.reset.load(Ordering::SeqCst)
    }
}

pub struct FakeConsole {
    counters: ConsoleCounters,
}

impl Console for FakeConsole {
    fn set_raw(&mut self) -> Result<()> {
        self.counters.raw.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn reset(&mut self) -> Result<()> {
        self.counters.reset.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn size(&self) -> Result<WindowSize> {
        Ok(WindowSize::new(24, 80))
    }
}

/// Host whose console and event sources are driven by the test
pub struct FakeHost {
    pub console: ConsoleCounters,
    resizes: Option<ResizeEvents>,
    signals: Option<SignalEvents>,
    pub signal_requests: Arc<AtomicUsize>,
}

pub struct HostHandles {
    pub console: ConsoleCounters,
    pub resizes: mpsc::Sender<WindowSize>,
    pub signals: mpsc::Sender<Signal>,
    pub signal_requests: Arc<AtomicUsize>,
}

impl FakeHost {
    pub fn new() -> (Self, HostHandles) {
        let console = ConsoleCounters::default();
        let (resize_tx, resizes) = ResizeEvents::channel(8);
        let (signal_tx, signals) = SignalEvents::channel(8);
        let signal_requests = Arc::new(AtomicUsize::new(0));

        let host = Self {
            console: console.clone(),
            resizes: Some(resizes),
            signals: Some(signals),
            signal_requests: signal_requests.clone(),
        };
        let handles = HostHandles {
            console,
            resizes: resize_tx,
            signals: signal_tx,
            signal_requests,
        };
        (host, handles)
    }
}

impl Host for FakeHost {
    fn console(&mut self) -> Result<Box<dyn Console>> {
        Ok(Box::new(FakeConsole {
            counters: self.console.clone(),
        }))
    }

    fn resize_events(&mut self) -> Result<ResizeEvents> {
        self.resizes
            .take()
            .ok_or_else(|| Error::console("resize events already taken"))
    }

    fn signal_events(&mut self) -> Result<SignalEvents> {
        self.signal_requests.fetch_add(1, Ordering::SeqCst);
        self.signals
            .take()
            .ok_or_else(|| Error::runtime("signal events already taken"))
    }
}

/// Poll `cond` until it holds
pub async fn eventually(mut cond: impl FnMut() -> bool) {
    while !cond() {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
