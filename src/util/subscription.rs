use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::future::BoxFuture;
use futures::stream::{BoxStream, Stream};
use futures::task::AtomicWaker;
use futures::{FutureExt, StreamExt};

/// Future returned by a subscription opener: resolves to the live event stream.
pub type OpenFuture<T, E> = BoxFuture<'static, Result<BoxStream<'static, Result<T, E>>, E>>;

type Opener<T, E> = Arc<dyn Fn() -> OpenFuture<T, E> + Send + Sync + 'static>;

#[derive(Default)]
struct CancelState {
    cancelled: AtomicBool,
    waker: AtomicWaker,
}

/// Cloneable handle that cancels a [`Subscription`] from anywhere.
///
/// Cancelling wakes a task currently parked on the subscription so it observes
/// the end of the stream immediately.
#[derive(Clone, Default)]
pub struct CancelHandle {
    state: Arc<CancelState>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.state.cancelled.store(true, Ordering::SeqCst);
        self.state.waker.wake();
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.state.cancelled.store(false, Ordering::SeqCst);
    }
}

impl fmt::Debug for CancelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelHandle")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

enum State<T, E> {
    Idle,
    Opening(OpenFuture<T, E>),
    Open(BoxStream<'static, Result<T, E>>),
    Closed,
}

/// A lazy, cancellable and restartable stream of events.
///
/// Nothing is registered with the backend until the first poll. The stream
/// stays open for as long as the backend keeps producing events; [`cancel`]
/// ends it and [`restart`] re-registers the listener on the next poll.
///
/// When opening fails the error is yielded once and the next poll tries
/// again.
///
/// [`cancel`]: Subscription::cancel
/// [`restart`]: Subscription::restart
pub struct Subscription<T, E> {
    label: String,
    opener: Opener<T, E>,
    state: State<T, E>,
    cancel: CancelHandle,
    opened: usize,
}

impl<T, E> Subscription<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Creates a subscription whose listener is produced by `opener`.
    ///
    /// `label` only shows up in debug logs.
    pub fn new<F, Fut>(label: impl Into<String>, opener: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<BoxStream<'static, Result<T, E>>, E>> + Send + 'static,
    {
        Self {
            label: label.into(),
            opener: Arc::new(move || opener().boxed()),
            state: State::Idle,
            cancel: CancelHandle::default(),
            opened: 0,
        }
    }
}

impl<T, E> Subscription<T, E> {
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns a handle that can cancel this subscription from another task.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Stops delivery and releases the backend listener.
    pub fn cancel(&mut self) {
        log::debug!("cancelling subscription {}", self.label);
        self.cancel.cancel();
        self.state = State::Closed;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Drops the current listener; the next poll registers a fresh one.
    ///
    /// Also revives a cancelled or exhausted subscription.
    pub fn restart(&mut self) {
        log::debug!("restarting subscription {}", self.label);
        self.cancel.reset();
        self.state = State::Idle;
    }

    /// Whether a backend listener is currently registered.
    pub fn is_open(&self) -> bool {
        matches!(self.state, State::Open(_))
    }

    /// Number of times the backend listener has been opened.
    pub fn open_count(&self) -> usize {
        self.opened
    }
}

impl<T, E> Stream for Subscription<T, E> {
    type Item = Result<T, E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        this.cancel.state.waker.register(cx.waker());

        loop {
            if this.cancel.is_cancelled() {
                this.state = State::Closed;
                return Poll::Ready(None);
            }

            match &mut this.state {
                State::Idle => {
                    log::debug!("opening subscription {}", this.label);
                    this.state = State::Opening((this.opener)());
                }
                State::Opening(future) => match future.poll_unpin(cx) {
                    Poll::Ready(Ok(stream)) => {
                        this.opened += 1;
                        this.state = State::Open(stream);
                    }
                    Poll::Ready(Err(err)) => {
                        this.state = State::Idle;
                        return Poll::Ready(Some(Err(err)));
                    }
                    Poll::Pending => return Poll::Pending,
                },
                State::Open(stream) => match stream.poll_next_unpin(cx) {
                    Poll::Ready(None) => {
                        this.state = State::Closed;
                        return Poll::Ready(None);
                    }
                    other => return other,
                },
                State::Closed => return Poll::Ready(None),
            }
        }
    }
}

impl<T, E> fmt::Debug for Subscription<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.state {
            State::Idle => "idle",
            State::Opening(_) => "opening",
            State::Open(_) => "open",
            State::Closed => "closed",
        };
        f.debug_struct("Subscription")
            .field("label", &self.label)
            .field("state", &state)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
