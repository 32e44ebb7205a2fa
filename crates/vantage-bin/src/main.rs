//! Vantage: a year-at-a-glance calendar in the terminal.
use anyhow::{Result, bail};
use chrono::{Datelike, Local, NaiveDate};
use clap::Parser;
use core_config::{Config, ConfigContext, load_from};
use core_events::{
    CHANNEL_SEND_FAILURES, EVENT_CHANNEL_CAP, Event, EventSourceRegistry,
    InputEvent, KeyEvent, MouseEvent, POINTER_EVENTS, SYNC_EVENTS_SENT, SyncEvent,
    TickEventSource,
};
use core_input::{GestureMachine, MouseTranslator};
use core_model::EventPatch;
use core_render::status::{StatusContext, build_status_line};
use core_render::writer::Writer;
use core_render::{
    Cell, CellFlags, Frame, GridGeometry, GridHitTest, LayoutContext, Painter, YearLayout,
};
use core_state::Coordinator;
use core_store::{IdentityProvider, JsonFileStore, RemoteStore, StaticIdentity};
use core_terminal::{CrosstermBackend, TerminalBackend};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::sync::{Arc, Once};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{Instrument, debug, error, info, trace, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

mod ui;

use ui::{Ui, UiCommand};

const LOG_FILE_NAME: &str = "vantage.log";
const TICK_INTERVAL: Duration = Duration::from_millis(250);

/// CLI arguments.
#[derive(Parser, Debug)]
#[command(name = "vantage", version, about = "Year-at-a-glance calendar")]
struct Args {
    /// Year to open (defaults to `[calendar] year`, then the current year).
    #[arg(long)]
    year: Option<i32>,
    /// Configuration file path (overrides discovery of `vantage.toml`).
    #[arg(long = "config")]
    config: Option<PathBuf>,
    /// Store file path (overrides `[store] path`).
    #[arg(long = "store")]
    store: Option<PathBuf>,
    /// Print the year's coverage as plain text and exit.
    #[arg(long)]
    print: bool,
}

struct AppStartup {
    backend: CrosstermBackend,
    log_guard: Option<WorkerGuard>,
}

/// Everything the runtime needs that does not depend on the terminal.
struct Bootstrap {
    config: Config,
    store: Arc<dyn RemoteStore>,
    identity: Arc<dyn IdentityProvider>,
    year: i32,
    today: NaiveDate,
}

struct RuntimeContext<'a> {
    bootstrap: Bootstrap,
    terminal_guard: core_terminal::TerminalGuard<'a>,
}

impl AppStartup {
    fn new() -> Self {
        Self {
            backend: CrosstermBackend::new(),
            log_guard: None,
        }
    }

    /// Load config, start logging and open the store. No terminal changes.
    async fn prepare(&mut self, args: &Args) -> Result<Bootstrap> {
        let config = load_from(args.config.clone())?;
        self.configure_logging(config.log_filter());
        Self::install_panic_hook();
        info!(target: "runtime", "startup");

        let store_path = args.store.clone().unwrap_or_else(|| config.store_path());
        let store = JsonFileStore::open(&store_path).await?;
        let identity = StaticIdentity::user(config.user());
        let today = Local::now().date_naive();
        let year = resolve_year(args.year, config.file.calendar.year, today);

        info!(
            target: "runtime.startup",
            store = store.name(),
            path = %store_path.display(),
            year,
            config_override = args.config.is_some(),
            effective_fraction = config.effective_event_fraction,
            "bootstrap_complete"
        );

        Ok(Bootstrap {
            config,
            store: Arc::new(store),
            identity: Arc::new(identity),
            year,
            today,
        })
    }

    fn enter(&mut self, bootstrap: Bootstrap) -> Result<RuntimeContext<'_>> {
        self.backend.set_title("Vantage")?;
        let guard = self.backend.enter_guard()?;
        Ok(RuntimeContext {
            bootstrap,
            terminal_guard: guard,
        })
    }

    fn configure_logging(&mut self, fallback_filter: &str) {
        let log_dir = Path::new(".");
        let log_path = log_dir.join(LOG_FILE_NAME);
        if log_path.exists() {
            let _ = std::fs::remove_file(&log_path);
        }

        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback_filter));
        let file_appender = tracing_appender::rolling::never(log_dir, LOG_FILE_NAME);
        let (nb_writer, guard) = tracing_appender::non_blocking(file_appender);
        if tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(nb_writer)
            .with_ansi(false)
            .try_init()
            .is_ok()
        {
            self.log_guard = Some(guard);
        }
    }

    fn install_panic_hook() {
        static HOOK: Once = Once::new();
        HOOK.call_once(|| {
            let default_panic = std::panic::take_hook();
            std::panic::set_hook(Box::new(move |info| {
                tracing::error!(target: "runtime.panic", ?info, "panic");
                default_panic(info);
            }));
        });
    }
}

/// CLI flag, then config, then the current year.
fn resolve_year(flag: Option<i32>, configured: Option<i32>, today: NaiveDate) -> i32 {
    flag.or(configured).unwrap_or_else(|| today.year())
}

enum LoopControl {
    Continue { redraw: bool },
    Break { reason: ShutdownReason },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShutdownReason {
    CtrlC,
    KeyQuit,
    ChannelClosed,
}

impl ShutdownReason {
    fn as_str(&self) -> &'static str {
        match self {
            ShutdownReason::CtrlC => "ctrl_c",
            ShutdownReason::KeyQuit => "key_quit",
            ShutdownReason::ChannelClosed => "channel_closed",
        }
    }
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn log_shutdown_stage(reason: ShutdownReason, stage: &'static str) {
    info!(
        target: "runtime.shutdown",
        reason = reason.as_str(),
        stage = stage,
        "shutdown_stage"
    );
}

struct CalendarRuntime<'a> {
    config: Config,
    coordinator: Coordinator,
    gesture: GestureMachine,
    mouse: MouseTranslator,
    ui: Ui,
    today: NaiveDate,
    viewport: (u16, u16),
    rx: mpsc::Receiver<Event>,
    tx: Option<mpsc::Sender<Event>>,
    source_handles: Vec<tokio::task::JoinHandle<()>>,
    input_task: Option<tokio::task::JoinHandle<()>>,
    input_shutdown: Option<core_input::AsyncInputShutdown>,
    _terminal_guard: core_terminal::TerminalGuard<'a>,
}

impl<'a> CalendarRuntime<'a> {
    fn new(
        context: RuntimeContext<'a>,
        tx: mpsc::Sender<Event>,
        rx: mpsc::Receiver<Event>,
        input_task: tokio::task::JoinHandle<()>,
        input_shutdown: core_input::AsyncInputShutdown,
        source_handles: Vec<tokio::task::JoinHandle<()>>,
    ) -> Self {
        let RuntimeContext {
            bootstrap,
            terminal_guard,
        } = context;
        let Bootstrap {
            mut config,
            store,
            identity,
            year,
            today,
        } = bootstrap;
        let viewport = core_terminal::size().unwrap_or((80, 24));
        config.apply_context(viewport_context(viewport));
        let gesture = GestureMachine::new(config.click_tolerance());
        let coordinator = Coordinator::new(store, identity, tx.clone(), year);
        Self {
            config,
            coordinator,
            gesture,
            mouse: MouseTranslator::new(),
            ui: Ui::new(),
            today,
            viewport,
            rx,
            tx: Some(tx),
            source_handles,
            input_task: Some(input_task),
            input_shutdown: Some(input_shutdown),
            _terminal_guard: terminal_guard,
        }
    }

    async fn run(&mut self) -> Result<()> {
        let year = self.coordinator.year();
        if let Err(err) = self.coordinator.set_year(year) {
            warn!(target: "runtime", %err, "initial_fetch_refused");
            self.coordinator.notify(err.to_string());
        }
        self.render();

        let mut shutdown_reason = ShutdownReason::ChannelClosed;
        while let Some(event) = self.rx.recv().await {
            let control = match event {
                Event::Input(input) => self.handle_input_event(input),
                Event::Sync(sync) => self.handle_sync(sync),
                Event::Tick => self.handle_tick(),
            };

            match control {
                LoopControl::Break { reason } => {
                    shutdown_reason = reason;
                    break;
                }
                LoopControl::Continue { redraw } => {
                    if redraw {
                        self.render();
                    }
                }
            }
        }

        self.rx.close();
        self.finalize_shutdown(shutdown_reason).await;
        Ok(())
    }

    async fn finalize_shutdown(&mut self, reason: ShutdownReason) {
        log_shutdown_stage(reason, "begin");
        if let Some(tx) = self.tx.take() {
            trace!(
                target: "runtime.shutdown",
                reason = reason.as_str(),
                "dropping_runtime_sender"
            );
            drop(tx);
        }

        let unsynced = self.coordinator.ledger().in_flight();
        if unsynced > 0 {
            warn!(
                target: "runtime.shutdown",
                reason = reason.as_str(),
                in_flight = unsynced,
                "exiting_with_unconfirmed_writes"
            );
        }

        while let Some(handle) = self.source_handles.pop() {
            match tokio::time::timeout(Duration::from_millis(200), handle).await {
                Ok(Ok(_)) => trace!(
                    target: "runtime.shutdown",
                    reason = reason.as_str(),
                    "event_source_task_stopped"
                ),
                Ok(Err(err)) if err.is_cancelled() => trace!(
                    target: "runtime.shutdown",
                    reason = reason.as_str(),
                    "event_source_task_cancelled"
                ),
                Ok(Err(err)) => error!(
                    target: "runtime.shutdown",
                    reason = reason.as_str(),
                    ?err,
                    "event_source_task_error"
                ),
                Err(_) => warn!(
                    target: "runtime.shutdown",
                    reason = reason.as_str(),
                    "event_source_task_timeout"
                ),
            }
        }

        if let Some(shutdown) = self.input_shutdown.take() {
            trace!(
                target: "runtime.shutdown",
                reason = reason.as_str(),
                "input_task_shutdown_signal"
            );
            shutdown.signal();
        }

        if let Some(handle) = self.input_task.take() {
            match handle.await {
                Ok(_) => trace!(
                    target: "runtime.shutdown",
                    reason = reason.as_str(),
                    "input_task_joined"
                ),
                Err(err) if err.is_cancelled() => trace!(
                    target: "runtime.shutdown",
                    reason = reason.as_str(),
                    "input_task_cancelled"
                ),
                Err(err) => error!(
                    target: "runtime.shutdown",
                    reason = reason.as_str(),
                    ?err,
                    "input_task_join_failed"
                ),
            }
        }

        info!(
            target: "runtime.shutdown",
            reason = reason.as_str(),
            pointer_events = POINTER_EVENTS.load(Ordering::Relaxed),
            sync_events = SYNC_EVENTS_SENT.load(Ordering::Relaxed),
            send_failures = CHANNEL_SEND_FAILURES.load(Ordering::Relaxed),
            "event_counters"
        );
        log_shutdown_stage(reason, "complete");
    }

    fn handle_input_event(&mut self, input: InputEvent) -> LoopControl {
        match input {
            InputEvent::CtrlC => LoopControl::Break {
                reason: ShutdownReason::CtrlC,
            },
            InputEvent::Key(key) => self.handle_key(&key),
            InputEvent::Mouse(mouse) => self.handle_mouse(&mouse),
            InputEvent::Resize(width, height) => self.handle_resize(width, height),
            InputEvent::FocusLost => {
                let leave = self.mouse.focus_lost();
                let was_active = self.gesture.is_active();
                self.gesture.handle(&leave);
                LoopControl::Continue { redraw: was_active }
            }
            InputEvent::FocusGained => LoopControl::Continue { redraw: false },
        }
    }

    fn handle_key(&mut self, key: &KeyEvent) -> LoopControl {
        let command = self.ui.handle_key(key, self.coordinator.snapshot());
        self.execute(command)
    }

    /// Run one prompt outcome against the coordinator. Rejections become a
    /// status notice; nothing was mutated in that case.
    fn execute(&mut self, command: UiCommand) -> LoopControl {
        let outcome = match command {
            UiCommand::Ignore => return LoopControl::Continue { redraw: false },
            UiCommand::Redraw => Ok(()),
            UiCommand::Quit => {
                return LoopControl::Break {
                    reason: ShutdownReason::KeyQuit,
                };
            }
            UiCommand::CreateEvent {
                title,
                start,
                end,
                category,
            } => self
                .coordinator
                .create_event(&title, start, end, &category)
                .map(drop),
            UiCommand::RenameEvent { id, title } => {
                self.coordinator.update_event(&id, EventPatch::title(title))
            }
            UiCommand::DeleteEvent(id) => self.coordinator.delete_event(&id),
            UiCommand::CreateCategory { name, color } => {
                self.coordinator.create_category(&name, color).map(drop)
            }
            UiCommand::DeleteCategory(id) => self.coordinator.delete_category(&id),
            UiCommand::ShiftYear(delta) => {
                self.gesture.cancel();
                let year = self.coordinator.year().saturating_add(delta);
                self.coordinator.set_year(year)
            }
            UiCommand::RetryFailed => match self.coordinator.retry_failed() {
                Ok(0) => {
                    self.coordinator.notify("nothing to retry");
                    Ok(())
                }
                Ok(count) => {
                    self.coordinator.notify(format!("retrying {count} write(s)"));
                    Ok(())
                }
                Err(err) => Err(err),
            },
        };
        if let Err(err) = outcome {
            warn!(target: "runtime", %err, "command_rejected");
            self.coordinator.notify(err.to_string());
        }
        LoopControl::Continue { redraw: true }
    }

    fn handle_mouse(&mut self, mouse: &MouseEvent) -> LoopControl {
        if self.ui.is_modal() {
            return LoopControl::Continue { redraw: false };
        }
        let geometry = GridGeometry::fit(self.viewport.0, self.viewport.1);
        let ctx = LayoutContext {
            today: Some(self.today),
            preview: self.gesture.preview(),
        };
        let pointer = {
            let layout = match YearLayout::build(self.coordinator.snapshot(), ctx) {
                Ok(layout) => layout,
                Err(err) => {
                    warn!(target: "layout", %err, "layout_failed");
                    return LoopControl::Continue { redraw: false };
                }
            };
            let hit = GridHitTest {
                geometry,
                layout: &layout,
                max_event_fraction: self.config.effective_event_fraction,
            };
            self.mouse.translate(mouse, &hit)
        };
        if pointer.is_empty() {
            return LoopControl::Continue { redraw: false };
        }

        let selections: Vec<_> = pointer
            .iter()
            .filter_map(|event| self.gesture.handle(event))
            .collect();
        for selection in selections {
            if let Some(notice) = self.ui.open_for_selection(selection, self.coordinator.snapshot()) {
                self.coordinator.notify(notice);
            }
        }
        LoopControl::Continue { redraw: true }
    }

    fn handle_resize(&mut self, width: u16, height: u16) -> LoopControl {
        self.viewport = (width, height);
        if let Some(fraction) = self
            .config
            .recompute_with_context(viewport_context(self.viewport))
        {
            debug!(target: "runtime", fraction, "event_fraction_recomputed");
        }
        LoopControl::Continue { redraw: true }
    }

    fn handle_sync(&mut self, sync: SyncEvent) -> LoopControl {
        self.coordinator.apply_sync(sync);
        LoopControl::Continue { redraw: true }
    }

    fn handle_tick(&mut self) -> LoopControl {
        let mut redraw = self.coordinator.tick();
        let today = Local::now().date_naive();
        if today != self.today {
            info!(target: "runtime", %today, "day_rolled_over");
            self.today = today;
            redraw = true;
        }
        LoopControl::Continue { redraw }
    }

    fn render(&self) {
        let ctx = LayoutContext {
            today: Some(self.today),
            preview: self.gesture.preview(),
        };
        let frame = compose_frame(&self.coordinator, &self.ui, &self.config, ctx, self.viewport);
        if let Err(err) = Writer::from_frame(&frame).flush() {
            error!(target: "runtime", ?err, "render_flush_failed");
        }
    }
}

fn viewport_context((width, height): (u16, u16)) -> ConfigContext {
    let geometry = GridGeometry::fit(width, height);
    ConfigContext::new(width, height, geometry.cell_width)
}

/// Title row, grid, prompt row and status row for one frame.
fn compose_frame(
    coordinator: &Coordinator,
    ui: &Ui,
    config: &Config,
    ctx: LayoutContext,
    (width, height): (u16, u16),
) -> Frame {
    let mut frame = Frame::new(width, height);
    let snapshot = coordinator.snapshot();
    let plain = Cell::default();
    let bold = Cell::styled(' ', None, None, CellFlags::BOLD);

    frame.put_str(
        0,
        0,
        &format!(
            "Vantage {}   drag: new event  click: open  c: category  [ ]: year  q: quit",
            snapshot.year
        ),
        bold,
    );

    let geometry = GridGeometry::fit(width, height);
    match YearLayout::build(snapshot, ctx) {
        Ok(layout) => {
            Painter::new(config.effective_event_fraction, config.fallback_color())
                .compose(&mut frame, &geometry, &layout, snapshot);
        }
        Err(err) => warn!(target: "layout", %err, "layout_failed"),
    }

    if let Some(prompt) = ui.prompt_line(snapshot) {
        frame.put_str(0, height.saturating_sub(2), &prompt, bold);
    }
    let ledger = coordinator.ledger();
    let status = build_status_line(&StatusContext {
        year: snapshot.year,
        loading: coordinator.is_loading(),
        in_flight: ledger.in_flight(),
        failed: ledger.failed(),
        category: ui.active_category(snapshot).map(|c| c.name.as_str()),
        message: coordinator.notice(),
    });
    frame.put_str(
        0,
        height.saturating_sub(1),
        &status,
        Cell {
            flags: CellFlags::REVERSE,
            ..plain
        },
    );
    frame
}

/// Fetch `bootstrap.year` once and render its coverage as text.
async fn print_year(bootstrap: Bootstrap) -> Result<String> {
    let (tx, mut rx) = mpsc::channel::<Event>(EVENT_CHANNEL_CAP);
    let mut coordinator = Coordinator::new(bootstrap.store, bootstrap.identity, tx, bootstrap.year);
    coordinator.set_year(bootstrap.year)?;
    while coordinator.is_loading() {
        match rx.recv().await {
            Some(Event::Sync(sync)) => {
                if let SyncEvent::Fetched {
                    result: Err(err), ..
                } = &sync
                {
                    bail!("loading {} failed: {err}", bootstrap.year);
                }
                coordinator.apply_sync(sync);
            }
            Some(_) => {}
            None => bail!("event channel closed while loading"),
        }
    }
    let layout = YearLayout::build(
        coordinator.snapshot(),
        LayoutContext {
            today: Some(bootstrap.today),
            preview: None,
        },
    )?;
    Ok(layout.to_plain())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut startup = AppStartup::new();
    let bootstrap = startup.prepare(&args).await?;
    if args.print {
        print!("{}", print_year(bootstrap).await?);
        return Ok(());
    }

    let context = startup.enter(bootstrap)?;
    let (tx, rx) = mpsc::channel::<Event>(EVENT_CHANNEL_CAP);
    let (input_task, input_shutdown) = core_input::spawn_async_input(tx.clone());
    let mut registry = EventSourceRegistry::new();
    registry.register(TickEventSource::new(TICK_INTERVAL));
    let source_handles = registry.spawn_all(&tx);

    let mut runtime =
        CalendarRuntime::new(context, tx, rx, input_task, input_shutdown, source_handles);
    runtime
        .run()
        .instrument(tracing::debug_span!(target: "runtime", "event_loop"))
        .await
}
