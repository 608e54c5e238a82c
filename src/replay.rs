//! Gesture script replay
//!
//! Feeds a timed pointer script through a [`SwipeDrawer`] on a calloop event
//! loop. Every script event and every peek reveal is a calloop timer, so peek
//! cancellation behaves the way it does under a live input source.
//!
//! ```toml
//! [drawer]
//! panel_width = 280.0
//!
//! [[event]]
//! at_ms = 0
//! kind = "down"
//! x = 0.0
//! y = 0.0
//!
//! [[event]]
//! at_ms = 40
//! kind = "move"
//! x = 60.0
//! y = 4.0
//!
//! [[event]]
//! at_ms = 60
//! kind = "up"
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

use calloop::timer::{TimeoutAction, Timer};
use calloop::{EventLoop, LoopHandle, RegistrationToken};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{ConfigError, DrawerConfig};
use crate::input::{
    DrawerHost, PeekTimer, Point, PointerCapture, PointerKind, ScrollLock, SwipeDrawer,
};

/// Time left after the last event for pending timers to run out
const SETTLE_MARGIN: Duration = Duration::from_millis(50);

#[derive(Error, Debug)]
pub enum ReplayError {
    #[error("failed to read script: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse script: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid script: {0}")]
    Invalid(String),

    #[error("event loop error: {0}")]
    EventLoop(#[from] calloop::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Down,
    Move,
    Up,
    Cancel,
    /// Click on the backdrop dimmer
    Scrim,
    /// Owner sets the open state directly
    SetOpen,
}

/// One timed input in a script
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptEvent {
    /// Milliseconds after replay start
    pub at_ms: u64,
    pub kind: EventKind,
    #[serde(default)]
    pub x: Option<f64>,
    #[serde(default)]
    pub y: Option<f64>,
    #[serde(default)]
    pub pointer: PointerKind,
    #[serde(default)]
    pub open: Option<bool>,
}

impl ScriptEvent {
    fn position(&self) -> Option<Point> {
        Some(Point::new(self.x?, self.y?))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Script {
    /// Drawer config embedded in the script
    #[serde(default)]
    pub drawer: Option<DrawerConfig>,
    #[serde(default, rename = "event")]
    pub events: Vec<ScriptEvent>,
}

impl Script {
    pub fn from_toml_str(contents: &str) -> Result<Self, ReplayError> {
        let mut script: Self = toml::from_str(contents)?;
        if let Some(config) = &script.drawer {
            config.validate()?;
        }
        for (i, event) in script.events.iter().enumerate() {
            match event.kind {
                EventKind::Down | EventKind::Move if event.position().is_none() => {
                    return Err(ReplayError::Invalid(format!(
                        "event {} ({:?}) needs x and y",
                        i, event.kind
                    )));
                }
                EventKind::SetOpen if event.open.is_none() => {
                    return Err(ReplayError::Invalid(format!("event {} (set_open) needs open", i)));
                }
                _ => {}
            }
        }
        // stable: events sharing a timestamp keep file order
        script.events.sort_by_key(|e| e.at_ms);
        Ok(script)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ReplayError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let script = Self::from_toml_str(&contents)?;
        info!("Loaded {} events from {:?}", script.events.len(), path);
        Ok(script)
    }

    fn duration(&self) -> Duration {
        Duration::from_millis(self.events.last().map_or(0, |e| e.at_ms))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OffsetSample {
    pub at_ms: u64,
    pub offset: f64,
}

/// Outcome of a replay
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReplayReport {
    pub toggles: u32,
    pub is_open: bool,
    pub offset: f64,
    /// Background scroll still locked when the script ended
    pub scroll_locked: bool,
    /// Peek timers removed from the loop before they fired
    pub cancelled_peeks: u32,
    /// Events no listener was attached for, or presses the drawer refused
    pub ignored_events: u32,
    pub samples: Vec<OffsetSample>,
}

/// Host side of the drawer during a replay
pub struct ReplayHost {
    handle: LoopHandle<'static, Replay>,
    started: Instant,
    now: Instant,
    next_id: u64,
    peeks: HashMap<u64, RegistrationToken>,
    cancelled_peeks: u32,
    capture: Option<PointerKind>,
    scroll_locked: bool,
    pending_toggles: u32,
    samples: Vec<OffsetSample>,
}

impl ReplayHost {
    fn new(handle: LoopHandle<'static, Replay>, started: Instant) -> Self {
        Self {
            handle,
            started,
            now: started,
            next_id: 0,
            peeks: HashMap::new(),
            cancelled_peeks: 0,
            capture: None,
            scroll_locked: false,
            pending_toggles: 0,
            samples: Vec::new(),
        }
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn elapsed_ms(&self) -> u64 {
        self.now.saturating_duration_since(self.started).as_millis() as u64
    }
}

impl DrawerHost for ReplayHost {
    fn toggle(&mut self) {
        self.pending_toggles += 1;
    }

    fn offset_changed(&mut self, offset: f64) {
        self.samples.push(OffsetSample {
            at_ms: self.elapsed_ms(),
            offset,
        });
    }

    fn lock_scroll(&mut self) -> ScrollLock {
        debug!("Locking background scroll");
        self.scroll_locked = true;
        ScrollLock(self.next_id())
    }

    fn unlock_scroll(&mut self, _lock: ScrollLock) {
        debug!("Restoring background scroll");
        self.scroll_locked = false;
    }

    fn schedule_peek(&mut self, delay: Duration) -> PeekTimer {
        let timer = PeekTimer(self.next_id());
        let result = self.handle.insert_source(
            Timer::from_deadline(self.now + delay),
            move |deadline, _, replay: &mut Replay| {
                replay.host.peeks.remove(&timer.0);
                replay.host.now = deadline;
                replay.drawer.on_peek_timer(timer, &mut replay.host);
                replay.answer_toggles();
                TimeoutAction::Drop
            },
        );
        match result {
            Ok(token) => {
                self.peeks.insert(timer.0, token);
            }
            Err(e) => warn!("Failed to schedule peek timer: {}", e.error),
        }
        timer
    }

    fn cancel_peek(&mut self, timer: PeekTimer) {
        if let Some(token) = self.peeks.remove(&timer.0) {
            self.handle.remove(token);
            self.cancelled_peeks += 1;
        }
    }

    fn capture_pointer(&mut self, kind: PointerKind) -> PointerCapture {
        self.capture = Some(kind);
        PointerCapture::new(kind, self.next_id())
    }

    fn release_pointer(&mut self, capture: PointerCapture) {
        if self.capture == Some(capture.kind()) {
            self.capture = None;
        }
    }
}

/// Event loop data for a replay
pub struct Replay {
    pub drawer: SwipeDrawer,
    pub host: ReplayHost,
    toggles: u32,
    ignored_events: u32,
    done: bool,
}

impl Replay {
    fn apply(&mut self, event: &ScriptEvent, now: Instant) {
        self.host.now = now;
        match event.kind {
            EventKind::Down => {
                let Some(pos) = event.position() else {
                    return;
                };
                if !self.drawer.on_pointer_down(event.pointer, pos, now, &mut self.host) {
                    self.ignored_events += 1;
                }
            }
            EventKind::Move | EventKind::Up | EventKind::Cancel
                if self.host.capture != Some(event.pointer) =>
            {
                debug!(kind = ?event.kind, "No listener for event");
                self.ignored_events += 1;
            }
            EventKind::Move => {
                if let Some(pos) = event.position() {
                    self.drawer.on_pointer_move(pos, now, &mut self.host);
                }
            }
            EventKind::Up => {
                self.drawer.on_pointer_up(&mut self.host);
            }
            EventKind::Cancel => {
                self.drawer.on_pointer_cancel(&mut self.host);
            }
            EventKind::Scrim => {
                if !self.drawer.on_scrim_click(&mut self.host) {
                    self.ignored_events += 1;
                }
            }
            EventKind::SetOpen => {
                if let Some(open) = event.open {
                    self.drawer.set_open(open, &mut self.host);
                }
            }
        }
        self.answer_toggles();
    }

    /// Play the owner: every toggle flips the committed state
    fn answer_toggles(&mut self) {
        while self.host.pending_toggles > 0 {
            self.host.pending_toggles -= 1;
            self.toggles += 1;
            let open = !self.drawer.is_open();
            info!(open, "Drawer toggled");
            self.drawer.set_open(open, &mut self.host);
        }
    }

    fn report(&self) -> ReplayReport {
        ReplayReport {
            toggles: self.toggles,
            is_open: self.drawer.is_open(),
            offset: self.drawer.offset(),
            scroll_locked: self.host.scroll_locked,
            cancelled_peeks: self.host.cancelled_peeks,
            ignored_events: self.ignored_events,
            samples: self.host.samples.clone(),
        }
    }
}

/// Replay a script. `config` overrides the script's own `[drawer]` table.
pub fn run(script: &Script, config: Option<DrawerConfig>) -> Result<ReplayReport, ReplayError> {
    let config = config
        .or_else(|| script.drawer.clone())
        .unwrap_or_default();
    config.validate()?;

    let mut event_loop: EventLoop<'static, Replay> = EventLoop::try_new()?;
    let handle = event_loop.handle();
    let started = Instant::now();

    let settle = config.peek_delay + SETTLE_MARGIN;
    let mut replay = Replay {
        drawer: SwipeDrawer::new(config),
        host: ReplayHost::new(handle.clone(), started),
        toggles: 0,
        ignored_events: 0,
        done: false,
    };

    for event in script.events.iter().cloned() {
        let deadline = started + Duration::from_millis(event.at_ms);
        handle
            .insert_source(Timer::from_deadline(deadline), move |now, _, replay: &mut Replay| {
                replay.apply(&event, now);
                TimeoutAction::Drop
            })
            .map_err(|e| e.error)?;
    }
    handle
        .insert_source(
            Timer::from_deadline(started + script.duration() + settle),
            |_, _, replay: &mut Replay| {
                replay.done = true;
                TimeoutAction::Drop
            },
        )
        .map_err(|e| e.error)?;

    info!(events = script.events.len(), "Replaying gesture script");
    while !replay.done {
        event_loop.dispatch(None, &mut replay)?;
    }

    let report = replay.report();
    replay.drawer.teardown(&mut replay.host);
    info!(
        toggles = report.toggles,
        open = report.is_open,
        offset = report.offset,
        "Replay finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> DrawerConfig {
        DrawerConfig {
            panel_width: 280.0,
            peek_delay: Duration::from_millis(30),
            ..DrawerConfig::default()
        }
    }

    fn replay(contents: &str) -> ReplayReport {
        let script = Script::from_toml_str(contents).unwrap();
        run(&script, Some(config())).unwrap()
    }

    #[test]
    fn test_long_drag_opens() {
        let report = replay(
            r#"
            [[event]]
            at_ms = 0
            kind = "down"
            x = 0.0
            y = 0.0

            [[event]]
            at_ms = 20
            kind = "move"
            x = 100.0
            y = 5.0

            [[event]]
            at_ms = 60
            kind = "move"
            x = 200.0
            y = 5.0

            [[event]]
            at_ms = 70
            kind = "up"
            "#,
        );
        assert_eq!(report.toggles, 1);
        assert!(report.is_open);
        assert!((report.offset - 280.0).abs() < 0.001);
        assert!(report.scroll_locked);
        assert_eq!(report.cancelled_peeks, 1);
    }

    #[test]
    fn test_peek_and_release() {
        let report = replay(
            r#"
            [[event]]
            at_ms = 0
            kind = "down"
            x = 5.0
            y = 300.0

            [[event]]
            at_ms = 90
            kind = "up"
            "#,
        );
        assert_eq!(report.toggles, 0);
        // the peek fired, nothing left to cancel
        assert_eq!(report.cancelled_peeks, 0);
        assert!(!report.is_open);
        let offsets: Vec<f64> = report.samples.iter().map(|s| s.offset).collect();
        assert_eq!(offsets, vec![20.0, 0.0]);
    }

    #[test]
    fn test_vertical_scroll_is_abandoned() {
        let report = replay(
            r#"
            [[event]]
            at_ms = 0
            kind = "down"
            x = 5.0
            y = 100.0

            [[event]]
            at_ms = 10
            kind = "move"
            x = 7.0
            y = 160.0

            [[event]]
            at_ms = 20
            kind = "up"
            "#,
        );
        assert_eq!(report.toggles, 0);
        assert_eq!(report.offset, 0.0);
        assert_eq!(report.cancelled_peeks, 1);
        // the abandoned gesture already released its listeners
        assert_eq!(report.ignored_events, 1);
        // the move cancelled the peek before it fired
        assert!(report.samples.is_empty());
    }

    #[test]
    fn test_mouse_move_ignored_during_touch() {
        let report = replay(
            r#"
            [[event]]
            at_ms = 0
            kind = "down"
            pointer = "touch"
            x = 0.0
            y = 0.0

            [[event]]
            at_ms = 5
            kind = "move"
            pointer = "mouse"
            x = 200.0
            y = 0.0

            [[event]]
            at_ms = 10
            kind = "up"
            pointer = "touch"
            "#,
        );
        assert_eq!(report.ignored_events, 1);
        // released before the peek was due
        assert_eq!(report.cancelled_peeks, 1);
        assert_eq!(report.toggles, 0);
        assert!(!report.is_open);
    }

    #[test]
    fn test_set_open_then_scrim_closes() {
        let report = replay(
            r#"
            [[event]]
            at_ms = 0
            kind = "set_open"
            open = true

            [[event]]
            at_ms = 20
            kind = "scrim"
            "#,
        );
        assert_eq!(report.toggles, 1);
        assert!(!report.is_open);
        let offsets: Vec<f64> = report.samples.iter().map(|s| s.offset).collect();
        assert_eq!(offsets, vec![280.0, 0.0]);
        assert!(!report.scroll_locked);
    }

    #[test]
    fn test_script_validation() {
        let missing_position = r#"
            [[event]]
            at_ms = 0
            kind = "down"
        "#;
        assert!(matches!(
            Script::from_toml_str(missing_position),
            Err(ReplayError::Invalid(_))
        ));

        let bad_config = r#"
            [drawer]
            hysteresis_fraction = 2.0
        "#;
        assert!(matches!(
            Script::from_toml_str(bad_config),
            Err(ReplayError::Config(_))
        ));
    }

    #[test]
    fn test_events_sorted_by_time() {
        let script = Script::from_toml_str(
            r#"
            [[event]]
            at_ms = 30
            kind = "up"

            [[event]]
            at_ms = 0
            kind = "down"
            x = 1.0
            y = 1.0
            "#,
        )
        .unwrap();
        assert_eq!(script.events[0].kind, EventKind::Down);
        assert_eq!(script.duration(), Duration::from_millis(30));
    }
}
