use crate::{map_key_code, map_mods, map_mouse};
use core_events::{
    ASYNC_INPUT_STARTS, ASYNC_INPUT_STOP_CHANNEL, ASYNC_INPUT_STOP_ERROR, ASYNC_INPUT_STOP_SIGNAL,
    ASYNC_INPUT_STOP_STREAM, CHANNEL_SEND_FAILURES, Event, InputEvent, KeyCode, KeyEvent,
    KeyModifiers,
};
use crossterm::event::{Event as CEvent, EventStream, KeyEvent as CKeyEvent, KeyEventKind as CKind};
use std::io;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tokio::sync::{Notify, mpsc::Sender};
use tokio::task;
use tokio_stream::StreamExt;
use tracing::{Instrument, info, trace, warn};

#[derive(Clone, Debug)]
pub struct AsyncInputShutdown {
    notify: Arc<Notify>,
}

impl AsyncInputShutdown {
    pub fn signal(&self) {
        self.notify.notify_one();
    }
}

#[derive(Clone, Debug)]
struct ShutdownListener {
    notify: Arc<Notify>,
}

impl ShutdownListener {
    fn new_pair() -> (AsyncInputShutdown, Self) {
        let notify = Arc::new(Notify::new());
        (
            AsyncInputShutdown {
                notify: notify.clone(),
            },
            ShutdownListener { notify },
        )
    }

    async fn wait(&self) {
        self.notify.notified().await;
    }
}

/// Spawn a Tokio task forwarding `crossterm::EventStream` reports to the loop.
pub(crate) fn spawn_async_event_task(
    sender: Sender<Event>,
) -> (task::JoinHandle<()>, AsyncInputShutdown) {
    let (shutdown, listener) = ShutdownListener::new_pair();
    let span = tracing::debug_span!(target: "input.thread", "input_async_task");
    let handle = task::spawn(
        async move {
            let stream = EventStream::new();
            AsyncEventStreamTask::new(sender, stream, listener)
                .run()
                .await;
        }
        .instrument(span),
    );

    (handle, shutdown)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExitReason {
    Running,
    ShutdownSignal,
    ChannelClosed,
    StreamEnded,
    StreamError,
}

impl ExitReason {
    fn as_str(self) -> &'static str {
        match self {
            ExitReason::Running => "running",
            ExitReason::ShutdownSignal => "shutdown_signal",
            ExitReason::ChannelClosed => "channel_closed",
            ExitReason::StreamEnded => "stream_ended",
            ExitReason::StreamError => "stream_error",
        }
    }
}

struct AsyncEventStreamTask<S>
where
    S: tokio_stream::Stream<Item = io::Result<CEvent>> + Send + Unpin + 'static,
{
    sender: Sender<Event>,
    stream: S,
    shutdown: ShutdownListener,
    exit_reason: ExitReason,
    stream_error: Option<io::ErrorKind>,
}

impl<S> AsyncEventStreamTask<S>
where
    S: tokio_stream::Stream<Item = io::Result<CEvent>> + Send + Unpin + 'static,
{
    fn new(sender: Sender<Event>, stream: S, shutdown: ShutdownListener) -> Self {
        Self {
            sender,
            stream,
            shutdown,
            exit_reason: ExitReason::Running,
            stream_error: None,
        }
    }

    async fn run(mut self) {
        info!(target: "input.thread", "async_input_task_started");
        ASYNC_INPUT_STARTS.fetch_add(1, Ordering::Relaxed);
        loop {
            let maybe_result = tokio::select! {
                biased;
                _ = self.shutdown.wait() => {
                    self.exit_reason = ExitReason::ShutdownSignal;
                    break;
                }
                result = self.stream.next() => result,
            };

            let Some(result) = maybe_result else {
                break;
            };

            let forwarded = match result {
                Ok(event) => self.handle_event(event).await,
                Err(err) => {
                    self.exit_reason = ExitReason::StreamError;
                    self.stream_error = Some(err.kind());
                    false
                }
            };
            if !forwarded {
                break;
            }
        }

        let reason = match self.exit_reason {
            ExitReason::Running => ExitReason::StreamEnded,
            other => other,
        };

        match reason {
            ExitReason::ShutdownSignal => {
                ASYNC_INPUT_STOP_SIGNAL.fetch_add(1, Ordering::Relaxed);
            }
            ExitReason::ChannelClosed => {
                ASYNC_INPUT_STOP_CHANNEL.fetch_add(1, Ordering::Relaxed);
            }
            ExitReason::StreamEnded => {
                ASYNC_INPUT_STOP_STREAM.fetch_add(1, Ordering::Relaxed);
            }
            ExitReason::StreamError => {
                ASYNC_INPUT_STOP_ERROR.fetch_add(1, Ordering::Relaxed);
                warn!(target: "input.thread", error_kind = ?self.stream_error, "async_input_task_stream_error");
            }
            ExitReason::Running => {}
        }

        info!(target: "input.thread", reason = reason.as_str(), "async_input_task_stopped");
    }

    /// Returns false when the loop should stop.
    async fn handle_event(&mut self, event: CEvent) -> bool {
        let mapped = match event {
            CEvent::Key(key) => self.map_key(key),
            CEvent::Mouse(mouse) => {
                let mapped = map_mouse(mouse);
                trace!(target: "input.mouse", kind = ?mapped.kind, col = mapped.column, row = mapped.row, "mouse");
                Some(InputEvent::Mouse(mapped))
            }
            CEvent::Resize(w, h) => {
                trace!(target: "input.event", w, h, "resize");
                Some(InputEvent::Resize(w, h))
            }
            CEvent::FocusGained => Some(InputEvent::FocusGained),
            CEvent::FocusLost => Some(InputEvent::FocusLost),
            CEvent::Paste(_) => None,
        };
        match mapped {
            Some(input) => self.send_event(Event::Input(input)).await,
            None => true,
        }
    }

    fn map_key(&self, key: CKeyEvent) -> Option<InputEvent> {
        if !matches!(key.kind, CKind::Press | CKind::Repeat) {
            return None;
        }
        let mods = map_mods(key.modifiers);
        let code = map_key_code(key.code)?;
        if code == KeyCode::Char('c') && mods.contains(KeyModifiers::CTRL) {
            return Some(InputEvent::CtrlC);
        }
        trace!(target: "input.event", key = ?code, "key");
        Some(InputEvent::Key(KeyEvent { code, mods }))
    }

    async fn send_event(&mut self, event: Event) -> bool {
        match self.sender.send(event).await {
            Ok(()) => true,
            Err(_) => {
                CHANNEL_SEND_FAILURES.fetch_add(1, Ordering::Relaxed);
                if self.exit_reason != ExitReason::ShutdownSignal {
                    self.exit_reason = ExitReason::ChannelClosed;
                }
                false
            }
        }
    }
}
