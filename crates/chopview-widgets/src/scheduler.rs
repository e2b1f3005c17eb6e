//! Cooperative frame scheduling
//!
//! The engine never spins its own loop: it asks a `FrameScheduler` for one
//! frame at a time and the host delivers the wakeup through whatever it has
//! (vsync callback, timer, iced subscription). Redraw requests made while a
//! frame is already pending coalesce into it at the engine level, so a
//! scheduler only ever sees at most one outstanding request.

use std::any::TypeId;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::{Arc, Mutex};

use iced::advanced::subscription::{self, EventStream, Hasher, Recipe};
use iced::futures::stream::BoxStream;
use iced::Subscription;

/// Token for one requested frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHandle(pub u64);

/// Wakeup delivered to the host when a requested frame should fire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameWake {
    pub handle: FrameHandle,
}

/// "Schedule next frame" primitive supplied by the host platform
pub trait FrameScheduler {
    /// Request a single future frame; returns a handle for cancellation
    fn request_frame(&mut self) -> FrameHandle;

    /// Cancel a previously requested frame; stale handles are ignored
    fn cancel_frame(&mut self, handle: FrameHandle);
}

// =============================================================================
// Channel-backed scheduler
// =============================================================================

/// Scheduler that delivers wakeups through an mpsc channel
///
/// The receiving end is typically bridged into the host's event loop with
/// [`poll_subscription`]. Cancellation is cooperative: a cancelled wake may
/// already sit in the channel, so receivers check [`ChannelScheduler::is_live`]
/// (the engine additionally ignores wakes it no longer expects).
pub struct ChannelScheduler {
    sender: Sender<FrameWake>,
    next_id: u64,
    /// Id of the one live request, 0 when none
    live: Arc<AtomicU64>,
}

impl ChannelScheduler {
    /// Create a scheduler and the receiver the host should drain
    pub fn new() -> (Self, Receiver<FrameWake>) {
        let (sender, receiver) = std::sync::mpsc::channel();
        (
            Self {
                sender,
                next_id: 1,
                live: Arc::new(AtomicU64::new(0)),
            },
            receiver,
        )
    }

    /// Whether a delivered wake still corresponds to a live request
    pub fn is_live(&self, wake: FrameWake) -> bool {
        self.live.load(Ordering::Acquire) == wake.handle.0
    }
}

impl FrameScheduler for ChannelScheduler {
    fn request_frame(&mut self) -> FrameHandle {
        let handle = FrameHandle(self.next_id);
        self.next_id += 1;
        self.live.store(handle.0, Ordering::Release);
        if self.sender.send(FrameWake { handle }).is_err() {
            log::warn!("ChannelScheduler: wake receiver is gone");
        }
        handle
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        let _ = self
            .live
            .compare_exchange(handle.0, 0, Ordering::AcqRel, Ordering::Relaxed);
    }
}

// =============================================================================
// Manual scheduler (test harnesses)
// =============================================================================

/// Scheduler driven by hand, for tests and headless hosts
#[derive(Debug, Default)]
pub struct ManualScheduler {
    next_id: u64,
    pending: Vec<FrameHandle>,
    cancelled: Vec<FrameHandle>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames requested and not yet fired or cancelled
    pub fn pending(&self) -> &[FrameHandle] {
        &self.pending
    }

    pub fn cancelled(&self) -> &[FrameHandle] {
        &self.cancelled
    }

    /// Fire all pending frames, returning their wakes
    pub fn fire(&mut self) -> Vec<FrameWake> {
        self.pending
            .drain(..)
            .map(|handle| FrameWake { handle })
            .collect()
    }
}

impl FrameScheduler for ManualScheduler {
    fn request_frame(&mut self) -> FrameHandle {
        self.next_id += 1;
        let handle = FrameHandle(self.next_id);
        self.pending.push(handle);
        handle
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        if let Some(pos) = self.pending.iter().position(|h| *h == handle) {
            self.pending.remove(pos);
            self.cancelled.push(handle);
        }
    }
}

// =============================================================================
// Subscription bridge
// =============================================================================

/// Recipe for polling an mpsc receiver as an iced subscription
///
/// Bridges the scheduler's wake channel (or the viewport change channel)
/// into iced's message loop with a 1ms polling sleep.
struct PollRecipe<T> {
    id: u64,
    receiver: Arc<Mutex<Receiver<T>>>,
}

impl<T: Send + 'static> Recipe for PollRecipe<T> {
    type Output = T;

    fn hash(&self, state: &mut Hasher) {
        TypeId::of::<Self>().hash(state);
        self.id.hash(state);
    }

    fn stream(self: Box<Self>, _input: EventStream) -> BoxStream<'static, Self::Output> {
        let receiver = self.receiver;

        Box::pin(iced::futures::stream::unfold(receiver, |rx| async move {
            loop {
                if let Some(item) = rx.lock().ok().and_then(|r| r.try_recv().ok()) {
                    return Some((item, rx));
                }
                // 1ms keeps latency below a frame while staying CPU-friendly
                tokio::time::sleep(std::time::Duration::from_millis(1)).await;
            }
        }))
    }
}

/// Subscribe to an mpsc receiver from the iced side
///
/// Use with the receiver halves of [`ChannelScheduler::new`] and the
/// viewport change channel; map the yielded values to host messages.
pub fn poll_subscription<T>(receiver: Arc<Mutex<Receiver<T>>>) -> Subscription<T>
where
    T: Send + 'static,
{
    let id = Arc::as_ptr(&receiver) as u64;
    subscription::from_recipe(PollRecipe { id, receiver })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_scheduler_delivers_wake() {
        let (mut scheduler, receiver) = ChannelScheduler::new();
        let handle = scheduler.request_frame();
        let wake = receiver.try_recv().expect("Wake should be queued");
        assert_eq!(wake.handle, handle);
        assert!(scheduler.is_live(wake));
    }

    #[test]
    fn test_channel_scheduler_cancel_invalidates_wake() {
        let (mut scheduler, receiver) = ChannelScheduler::new();
        let handle = scheduler.request_frame();
        scheduler.cancel_frame(handle);
        let wake = receiver.try_recv().expect("Wake was already queued");
        assert!(!scheduler.is_live(wake), "Cancelled wake must read as dead");
    }

    #[test]
    fn test_manual_scheduler_tracks_pending_and_cancelled() {
        let mut scheduler = ManualScheduler::new();
        let a = scheduler.request_frame();
        let b = scheduler.request_frame();
        assert_eq!(scheduler.pending().len(), 2);

        scheduler.cancel_frame(a);
        assert_eq!(scheduler.pending(), &[b]);
        assert_eq!(scheduler.cancelled(), &[a]);

        let wakes = scheduler.fire();
        assert_eq!(wakes.len(), 1);
        assert_eq!(wakes[0].handle, b);
        assert!(scheduler.pending().is_empty());
    }

    #[test]
    fn test_cancel_of_stale_handle_is_ignored() {
        let mut scheduler = ManualScheduler::new();
        let a = scheduler.request_frame();
        scheduler.cancel_frame(a);
        scheduler.cancel_frame(a);
        assert_eq!(scheduler.cancelled().len(), 1);
    }
}
