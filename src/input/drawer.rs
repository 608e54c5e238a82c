//! Swipeable drawer - drag response state machine
//!
//! One gesture runs `Idle -> AwaitingClassification -> {Dragging | Abandoned} -> Idle`:
//! - Pressing a closed drawer schedules a peek (a small reveal of its edge)
//! - The first moves decide whether the user is swiping the panel at all
//! - Swipes drag the panel, tracking a smoothed speed
//! - Release commits open/closed by fling speed or hysteresis
//!
//! All side effects (toggle, scroll lock, timers, listener capture) go through
//! [`DrawerHost`] so the state machine can run inside any event loop.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::gestures::{smoothed_speed, Point, SwipeClassifier, SwipeIntent};
use crate::config::DrawerConfig;

/// Input device family that started a gesture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerKind {
    Mouse,
    #[default]
    Touch,
}

/// Handle to a scheduled peek reveal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeekTimer(pub u64);

/// Move/up listener registration for one gesture.
///
/// Not `Clone`: the only way to get rid of it is handing it back to
/// [`DrawerHost::release_pointer`].
#[derive(Debug, PartialEq, Eq)]
pub struct PointerCapture {
    kind: PointerKind,
    id: u64,
}

impl PointerCapture {
    pub fn new(kind: PointerKind, id: u64) -> Self {
        Self { kind, id }
    }

    pub fn kind(&self) -> PointerKind {
        self.kind
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

/// Background scroll lock held while the drawer is open
#[derive(Debug, PartialEq, Eq)]
pub struct ScrollLock(pub u64);

/// Side effects the drawer needs from its surroundings
pub trait DrawerHost {
    /// Ask the owner to flip the committed open state.
    ///
    /// The owner answers with [`SwipeDrawer::set_open`].
    fn toggle(&mut self);

    /// Called whenever the panel offset changes
    fn offset_changed(&mut self, _offset: f64) {}

    fn lock_scroll(&mut self) -> ScrollLock;
    fn unlock_scroll(&mut self, lock: ScrollLock);

    /// Schedule [`SwipeDrawer::on_peek_timer`] after `delay`
    fn schedule_peek(&mut self, delay: Duration) -> PeekTimer;
    fn cancel_peek(&mut self, timer: PeekTimer);

    /// Start routing move/up events of `kind` to the drawer
    fn capture_pointer(&mut self, kind: PointerKind) -> PointerCapture;
    fn release_pointer(&mut self, capture: PointerCapture);
}

/// Where the current gesture is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GesturePhase {
    Idle,
    AwaitingClassification,
    Dragging,
}

/// State of one press, from pointer down to release
#[derive(Debug)]
pub struct DragSession {
    pub start: Point,
    pub last_x: f64,
    pub last_move: Instant,
    /// px/ms, smoothed
    pub speed: f64,
    pub intent: SwipeIntent,
    peek: Option<PeekTimer>,
    capture: Option<PointerCapture>,
}

/// How a release was resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Release {
    /// Fast enough toward the other state, toggled regardless of distance
    Fling,
    /// Past the hysteresis threshold while closed, toggled open
    CommitOpen,
    /// Short of the threshold while open, toggled closed
    CommitClosed,
    /// Snapped back to the committed state
    Settle,
}

pub struct SwipeDrawer {
    config: DrawerConfig,
    classifier: SwipeClassifier,
    is_open: bool,
    offset: f64,
    session: Option<DragSession>,
    scroll_lock: Option<ScrollLock>,
}

impl SwipeDrawer {
    /// Closed drawer
    pub fn new(config: DrawerConfig) -> Self {
        let classifier = config.classifier();
        Self {
            config,
            classifier,
            is_open: false,
            offset: 0.0,
            session: None,
            scroll_lock: None,
        }
    }

    pub fn config(&self) -> &DrawerConfig {
        &self.config
    }

    /// Committed open state
    pub fn is_open(&self) -> bool {
        self.is_open
    }

    /// Current displacement, always in `[0, panel_width]`
    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// A press is in progress without its release
    pub fn is_down_captured(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<&DragSession> {
        self.session.as_ref()
    }

    pub fn intent(&self) -> SwipeIntent {
        self.session.as_ref().map_or(SwipeIntent::Unknown, |s| s.intent)
    }

    pub fn phase(&self) -> GesturePhase {
        match &self.session {
            None => GesturePhase::Idle,
            Some(s) if s.intent == SwipeIntent::Swipe => GesturePhase::Dragging,
            Some(_) => GesturePhase::AwaitingClassification,
        }
    }

    /// Backdrop dimmer opacity (0 - 1)
    pub fn scrim_opacity(&self) -> f64 {
        self.offset / self.config.panel_width
    }

    /// Horizontal translation of the panel, negative for right-anchored panels
    pub fn translate_x(&self) -> f64 {
        self.config.anchor.opening_delta(self.offset)
    }

    /// The panel only takes clicks once it's pulled past the hysteresis threshold
    pub fn accepts_panel_input(&self) -> bool {
        self.offset > self.config.hysteresis_threshold()
    }

    fn is_resting(&self) -> bool {
        self.offset == 0.0 || self.offset == self.config.panel_width
    }

    /// Pointer pressed on the panel or its swipe handle.
    ///
    /// Returns false if the press was ignored (a press already in progress,
    /// or the panel is mid-animation).
    pub fn on_pointer_down(
        &mut self,
        kind: PointerKind,
        pos: Point,
        now: Instant,
        host: &mut impl DrawerHost,
    ) -> bool {
        if self.session.is_some() {
            debug!("Ignoring pointer down, gesture already in progress");
            return false;
        }
        if !self.is_resting() {
            debug!(offset = self.offset, "Ignoring pointer down while panel is moving");
            return false;
        }
        if !pos.is_finite() {
            warn!("Ignoring pointer down with non-finite position {:?}", pos);
            return false;
        }

        let capture = host.capture_pointer(kind);
        // closed and pressed without moving: probably sneaking a peek
        let peek = if self.offset == 0.0 {
            Some(host.schedule_peek(self.config.peek_delay))
        } else {
            None
        };

        debug!(x = pos.x, y = pos.y, ?kind, "Pointer down, awaiting classification");
        self.session = Some(DragSession {
            start: pos,
            last_x: pos.x,
            last_move: now,
            speed: 0.0,
            intent: SwipeIntent::Unknown,
            peek,
            capture: Some(capture),
        });
        true
    }

    pub fn on_pointer_move(&mut self, pos: Point, now: Instant, host: &mut impl DrawerHost) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if !pos.is_finite() {
            warn!("Ignoring pointer move with non-finite position {:?}", pos);
            return;
        }

        if session.intent == SwipeIntent::Unknown {
            // they don't want a peek
            if let Some(timer) = session.peek.take() {
                host.cancel_peek(timer);
            }
            let required = self.config.anchor.required_direction(self.is_open);
            session.intent = self.classifier.classify(session.start, pos, required);
            match session.intent {
                SwipeIntent::Unknown => return,
                SwipeIntent::NotASwipe => {
                    debug!(x = pos.x, y = pos.y, "Not a swipe, abandoning gesture");
                    self.on_pointer_up(host);
                    return;
                }
                SwipeIntent::Swipe => {
                    debug!(x = pos.x, y = pos.y, ?required, "Swipe recognized");
                }
            }
        }

        let dx = pos.x - session.last_x;
        let elapsed_ms = now.saturating_duration_since(session.last_move).as_secs_f64() * 1000.0;
        session.speed = smoothed_speed(session.speed, dx, elapsed_ms);
        session.last_x = pos.x;
        session.last_move = now;

        let min = if self.is_open { 0.0 } else { self.config.peek_width };
        let next = (self.offset + self.config.anchor.opening_delta(dx))
            .max(min)
            .min(self.config.panel_width);
        self.set_offset(next, host);
    }

    /// Pointer released. Returns how the release was resolved, or `None`
    /// when no press was in progress.
    pub fn on_pointer_up(&mut self, host: &mut impl DrawerHost) -> Option<Release> {
        let session = self.end_session(host)?;

        let movement = self.config.anchor.opening_delta(session.last_x - session.start.x);
        // moving toward the state we're not in
        let toward_toggle = (movement > 0.0) != self.is_open;
        let is_fling = session.speed >= self.config.min_fling_speed && toward_toggle;

        let release = if is_fling {
            info!(speed = session.speed, movement, "Fling, toggling drawer");
            host.toggle();
            Release::Fling
        } else if self.offset > self.config.hysteresis_threshold() {
            if !self.is_open {
                info!(offset = self.offset, "Pulled past threshold, opening drawer");
                host.toggle();
                Release::CommitOpen
            } else {
                self.show(host);
                Release::Settle
            }
        } else if self.is_open {
            info!(offset = self.offset, "Released short of threshold, closing drawer");
            host.toggle();
            Release::CommitClosed
        } else {
            self.hide(host);
            Release::Settle
        };
        Some(release)
    }

    /// Pointer lost (touch cancelled, window blurred); resolved like a release
    pub fn on_pointer_cancel(&mut self, host: &mut impl DrawerHost) -> Option<Release> {
        debug!("Pointer cancelled");
        self.on_pointer_up(host)
    }

    /// Peek delay elapsed. Stale timers are ignored.
    pub fn on_peek_timer(&mut self, timer: PeekTimer, host: &mut impl DrawerHost) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.peek != Some(timer) {
            return;
        }
        session.peek = None;
        debug!("Peeking drawer");
        self.set_offset(self.config.peek_width, host);
    }

    /// Owner-driven open state (after a toggle, or programmatically).
    /// Setting the current state again does nothing.
    pub fn set_open(&mut self, is_open: bool, host: &mut impl DrawerHost) {
        if is_open == self.is_open {
            return;
        }
        self.is_open = is_open;
        if is_open {
            self.show(host);
        } else {
            self.hide(host);
        }
    }

    /// Click on the backdrop dimmer. The dimmer is only hit-testable while
    /// some of the panel is showing.
    pub fn on_scrim_click(&mut self, host: &mut impl DrawerHost) -> bool {
        if self.offset > 0.0 {
            host.toggle();
            true
        } else {
            false
        }
    }

    /// Drawer is going away: drop any pending peek and capture, restore scroll
    pub fn teardown(&mut self, host: &mut impl DrawerHost) {
        self.end_session(host);
        self.hide(host);
    }

    /// The only exit from a gesture
    fn end_session(&mut self, host: &mut impl DrawerHost) -> Option<DragSession> {
        let mut session = self.session.take()?;
        if let Some(timer) = session.peek.take() {
            host.cancel_peek(timer);
        }
        if let Some(capture) = session.capture.take() {
            host.release_pointer(capture);
        }
        Some(session)
    }

    fn show(&mut self, host: &mut impl DrawerHost) {
        self.set_offset(self.config.panel_width, host);
        if self.scroll_lock.is_none() {
            self.scroll_lock = Some(host.lock_scroll());
        }
    }

    fn hide(&mut self, host: &mut impl DrawerHost) {
        self.set_offset(0.0, host);
        if let Some(lock) = self.scroll_lock.take() {
            host.unlock_scroll(lock);
        }
    }

    fn set_offset(&mut self, offset: f64, host: &mut impl DrawerHost) {
        if offset == self.offset {
            return;
        }
        debug!(offset, "Drawer offset");
        self.offset = offset;
        host.offset_changed(offset);
    }
}
