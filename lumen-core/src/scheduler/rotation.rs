//! Widget rotation
//!
//! Keeps exactly one widget current, hands the panel to it every tick and
//! decides at expiry whether it is destroyed, parked or rotated.
//!
//! # Expiry rules
//!
//! | Flags of the current widget | At expiry |
//! |-----------------------------|-----------|
//! | `AUTO_REMOVE` | stopped, and destroyed once stopped |
//! | `EXTERNAL_MANAGED` (running) | stopped and parked in the current slot |
//! | neither, others queued | stopped and re-queued at the tail |
//! | neither, queue empty | keeps running for another display time |
//!
//! `STATUS` and `INTERNAL_ENABLED` do not change scheduling. A widget
//! carrying `MARKED_FOR_REMOVE` is destroyed on the next tick wherever it is.

use alloc::boxed::Box;
use alloc::collections::VecDeque;
use core::fmt;

use embassy_time::{Duration, Instant};
use lumen_display::DisplayBackend;

use super::names::{all_suffixes, suffixed, SuffixGenerator};
use crate::time::Clock;
use crate::widget::{ActionFlags, DisplayBinding, Widget, WidgetName, WidgetState};

/// Random suffix draws before falling back to an ordered scan
const RENAME_ATTEMPTS: usize = 32;

/// A widget the scheduler refused, handed back to the caller
pub struct Rejected(pub Box<dyn Widget>);

impl Rejected {
    /// Name of the refused widget
    pub fn name(&self) -> &str {
        self.0.name()
    }

    /// Take the widget back
    pub fn into_inner(self) -> Box<dyn Widget> {
        self.0
    }
}

impl fmt::Debug for Rejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Rejected").field(&self.0.name()).finish()
    }
}

/// Single-active widget scheduler
pub struct WidgetScheduler<D, C> {
    display: D,
    clock: C,
    queue: VecDeque<Box<dyn Widget>>,
    current: Option<Box<dyn Widget>>,
    /// When the current widget's display time runs out
    expiry: Option<Instant>,
    /// `start()` was called; an empty current slot gets refilled
    armed: bool,
    suffixes: SuffixGenerator,
}

impl<D, C> WidgetScheduler<D, C>
where
    D: DisplayBackend,
    C: Clock,
{
    /// Create an idle scheduler drawing into `display`
    pub fn new(display: D, clock: C) -> Self {
        let seed = clock.now().as_ticks() as u32;
        Self {
            display,
            clock,
            queue: VecDeque::new(),
            current: None,
            expiry: None,
            armed: false,
            suffixes: SuffixGenerator::new(seed),
        }
    }

    /// Adopt a widget: bind it to the display, run its setup and queue it
    ///
    /// A name already in use gets a random `_<digit><letter>` suffix.
    /// Widgets are refused (and handed back) while the display is not ready.
    pub fn add_widget(&mut self, mut widget: Box<dyn Widget>) -> Result<(), Rejected> {
        if !self.display.is_ready() {
            warn!("display not ready, refusing widget {=str}", widget.name());
            return Err(Rejected(widget));
        }

        if self.name_taken(widget.name()) {
            let unique = self.unique_name(widget.name());
            info!("renaming widget {=str} to {=str}", widget.name(), unique.as_str());
            widget.set_name(&unique);
        }

        widget.set_display(DisplayBinding::of(&self.display));
        widget.setup(&mut self.display);
        debug!("queued widget {=str}", widget.name());
        self.queue.push_back(widget);
        Ok(())
    }

    /// Select the first queued widget if none is current
    ///
    /// Also arms the scheduler: from now on an empty current slot is refilled
    /// from the queue on every tick.
    pub fn start(&mut self) -> bool {
        self.armed = true;
        if self.current.is_some() {
            return false;
        }
        let now = self.clock.now();
        self.promote_next(now)
    }

    /// Run one scheduling step
    pub fn tick(&mut self) {
        let now = self.clock.now();

        self.purge_marked();

        if self.expiry.is_some_and(|expiry| now >= expiry) {
            self.handle_expiry(now);
        }

        if self.current.is_none() && self.armed {
            self.promote_next(now);
        }

        if let Some(current) = self.current.as_mut() {
            current.tick(&mut self.display);
        }

        if let Err(e) = self.display.housekeeping(now) {
            warn!("display housekeeping failed: {}", e);
        }
    }

    /// Stop and destroy the current widget, and disarm rotation
    ///
    /// Rotation resumes on the next [`WidgetScheduler::start`].
    pub fn stop_current(&mut self) -> bool {
        self.armed = false;
        self.expiry = None;
        match self.current.take() {
            Some(mut widget) => {
                widget.stop();
                info!("stopped widget {=str}", widget.name());
                true
            }
            None => false,
        }
    }

    /// Pause the current widget on behalf of an external owner
    pub fn pause_current(&mut self) -> bool {
        match self.current.as_mut() {
            Some(widget) if widget.state() == WidgetState::Running => {
                widget.pause();
                widget.state() == WidgetState::Paused
            }
            _ => false,
        }
    }

    /// Bring the current widget back to running on behalf of an external owner
    ///
    /// Resumes a paused widget or restarts one parked at expiry (without
    /// running setup again), then grants it a fresh display time.
    pub fn resume_current(&mut self) -> bool {
        let now = self.clock.now();
        let Some(widget) = self.current.as_mut() else {
            return false;
        };

        match widget.state() {
            WidgetState::Paused => widget.resume(),
            WidgetState::Stopped => widget.start(),
            WidgetState::Running => return false,
        }

        let resumed = widget.state() == WidgetState::Running;
        if resumed {
            self.expiry = deadline(now, widget.display_time());
        }
        resumed
    }

    /// First widget named `name`, current or queued
    pub fn lookup(&self, name: &str) -> Option<&dyn Widget> {
        self.widgets().find(|w| w.name() == name)
    }

    /// Mutable access to the widget named `name`
    pub fn lookup_mut(&mut self, name: &str) -> Option<&mut (dyn Widget + 'static)> {
        if let Some(current) = self.current.as_deref_mut() {
            if current.name() == name {
                return Some(current);
            }
        }
        self.queue
            .iter_mut()
            .find(|w| w.name() == name)
            .map(|w| &mut **w)
    }

    /// Current widget followed by the queue, in rotation order
    pub fn widgets(&self) -> impl Iterator<Item = &dyn Widget> {
        self.current
            .as_deref()
            .into_iter()
            .chain(self.queue.iter().map(|w| &**w))
    }

    /// The widget holding the panel
    pub fn current(&self) -> Option<&dyn Widget> {
        self.current.as_deref()
    }

    /// Mutable access to the widget holding the panel
    pub fn current_mut(&mut self) -> Option<&mut (dyn Widget + 'static)> {
        self.current.as_deref_mut()
    }

    /// When the current widget will be reconsidered
    pub fn expiry(&self) -> Option<Instant> {
        self.expiry
    }

    /// Widgets owned, current included
    pub fn len(&self) -> usize {
        self.queue.len() + usize::from(self.current.is_some())
    }

    /// No widget owned at all
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// No widget is current
    pub fn is_idle(&self) -> bool {
        self.current.is_none()
    }

    /// The display
    pub fn display(&self) -> &D {
        &self.display
    }

    /// Mutable access to the display, e.g. for contrast changes
    pub fn display_mut(&mut self) -> &mut D {
        &mut self.display
    }

    /// The clock
    pub fn clock(&self) -> &C {
        &self.clock
    }

    fn handle_expiry(&mut self, now: Instant) {
        let Some(mut current) = self.current.take() else {
            self.expiry = None;
            return;
        };
        let action = current.action();

        if action.contains(ActionFlags::AUTO_REMOVE) {
            current.stop();
            if current.state() == WidgetState::Stopped {
                info!("widget {=str} expired, removing", current.name());
                self.expiry = None;
                return;
            }
            self.current = Some(current);
            return;
        }

        if action.contains(ActionFlags::EXTERNAL_MANAGED) {
            if current.state() == WidgetState::Running {
                current.stop();
                debug!("widget {=str} parked for its owner", current.name());
            }
            self.current = Some(current);
            return;
        }

        if self.queue.is_empty() {
            self.expiry = deadline(now, current.display_time());
            self.current = Some(current);
            return;
        }

        current.stop();
        if current.state() != WidgetState::Stopped {
            // Refused to stop; rotating it would leave two running
            self.current = Some(current);
            return;
        }
        trace!("rotating widget {=str} to the tail", current.name());
        self.queue.push_back(current);
        self.expiry = None;
    }

    fn promote_next(&mut self, now: Instant) -> bool {
        let Some(mut next) = self.queue.pop_front() else {
            return false;
        };

        next.start();
        self.expiry = deadline(now, next.display_time());
        info!("showing widget {=str}", next.name());
        self.current = Some(next);
        true
    }

    fn purge_marked(&mut self) {
        let marked = |w: &dyn Widget| w.action().contains(ActionFlags::MARKED_FOR_REMOVE);

        if self.current.as_deref().is_some_and(marked) {
            if let Some(mut widget) = self.current.take() {
                widget.stop();
                info!("removing marked widget {=str}", widget.name());
            }
            self.expiry = None;
        }

        self.queue.retain(|w| !marked(&**w));
    }

    fn name_taken(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    fn unique_name(&mut self, base: &str) -> WidgetName {
        for _ in 0..RENAME_ATTEMPTS {
            let (digit, letter) = self.suffixes.next_suffix();
            let candidate = suffixed(base, digit, letter);
            if !self.name_taken(&candidate) {
                return candidate;
            }
        }

        // Every suffix taken: keep the last one, lookups then find the older widget
        all_suffixes()
            .map(|(digit, letter)| suffixed(base, digit, letter))
            .find(|candidate| !self.name_taken(candidate))
            .unwrap_or_else(|| suffixed(base, '9', 'z'))
    }
}

/// Expiry for a widget granted `display_time` at `now`
///
/// A display time past the end of the clock never expires.
fn deadline(now: Instant, display_time: Duration) -> Option<Instant> {
    now.checked_add(display_time)
}

#[cfg(test)]
mod tests {
    use std::vec::Vec;

    use proptest::prelude::*;

    use super::*;
    use crate::time::ManualClock;
    use crate::widget::testing::{FakeDisplay, ProbeWidget};

    type TestScheduler<'a> = WidgetScheduler<FakeDisplay, &'a ManualClock>;

    fn scheduler(clock: &ManualClock) -> TestScheduler<'_> {
        WidgetScheduler::new(FakeDisplay::new(), clock)
    }

    fn running_count(sched: &TestScheduler<'_>) -> usize {
        sched
            .widgets()
            .filter(|w| w.state() == WidgetState::Running)
            .count()
    }

    fn current_name<'a>(sched: &'a TestScheduler<'_>) -> Option<&'a str> {
        sched.current().map(|w| w.name())
    }

    #[test]
    fn test_add_runs_setup_once_and_binds_display() {
        let clock = ManualClock::default();
        let mut sched = scheduler(&clock);
        let (w, probe) = ProbeWidget::boxed("A", 100, ActionFlags::NONE);

        sched.add_widget(w).unwrap();
        assert_eq!(probe.setups.get(), 1);
        assert_eq!(sched.len(), 1);

        let binding = sched.lookup("A").and_then(|w| w.display());
        assert_eq!(
            binding,
            Some(DisplayBinding {
                width: 32,
                height: 16
            })
        );
        assert_eq!(
            sched.lookup("A").map(|w| w.state()),
            Some(WidgetState::Stopped)
        );
    }

    #[test]
    fn test_add_rejected_when_display_not_ready() {
        let clock = ManualClock::default();
        let mut display = FakeDisplay::new();
        display.ready = false;
        let mut sched = WidgetScheduler::new(display, &clock);
        let (w, probe) = ProbeWidget::boxed("A", 100, ActionFlags::NONE);

        let rejected = sched.add_widget(w).unwrap_err();
        assert_eq!(rejected.name(), "A");
        assert_eq!(probe.setups.get(), 0);
        assert!(sched.is_empty());
    }

    #[test]
    fn test_rename_on_collision() {
        let clock = ManualClock::starting_at(1234);
        let mut sched = scheduler(&clock);
        let (first, _) = ProbeWidget::boxed("Clock", 100, ActionFlags::NONE);
        let (second, _) = ProbeWidget::boxed("Clock", 100, ActionFlags::NONE);
        let (third, _) = ProbeWidget::boxed("Clock", 100, ActionFlags::NONE);

        sched.add_widget(first).unwrap();
        sched.add_widget(second).unwrap();
        sched.add_widget(third).unwrap();

        let names: Vec<&str> = sched.widgets().map(|w| w.name()).collect();
        assert_eq!(names[0], "Clock");
        assert!(names[1].starts_with("Clock_"));
        assert!(names[2].starts_with("Clock_"));
        assert_ne!(names[1], names[2]);
        assert_eq!(names[1].len(), "Clock_".len() + 2);
    }

    #[test]
    fn test_start_selects_head() {
        let clock = ManualClock::default();
        let mut sched = scheduler(&clock);
        assert!(!sched.start());

        let (a, _) = ProbeWidget::boxed("A", 1000, ActionFlags::NONE);
        let (b, _) = ProbeWidget::boxed("B", 500, ActionFlags::NONE);
        sched.add_widget(a).unwrap();
        sched.add_widget(b).unwrap();

        assert!(sched.start());
        assert_eq!(current_name(&sched), Some("A"));
        assert_eq!(sched.expiry(), Some(Instant::from_millis(1000)));
        assert!(!sched.start());
        assert_eq!(running_count(&sched), 1);
    }

    #[test]
    fn test_rotation_order_with_auto_remove() {
        let clock = ManualClock::default();
        let mut sched = scheduler(&clock);
        let (a, _) = ProbeWidget::boxed("A", 1000, ActionFlags::NONE);
        let (b, b_probe) = ProbeWidget::boxed("B", 500, ActionFlags::AUTO_REMOVE);
        sched.add_widget(a).unwrap();
        sched.add_widget(b).unwrap();
        sched.start();

        clock.set_millis(999);
        sched.tick();
        assert_eq!(current_name(&sched), Some("A"));

        // A expires without flags and rotates behind B
        clock.set_millis(1000);
        sched.tick();
        assert_eq!(current_name(&sched), Some("B"));
        assert_eq!(sched.expiry(), Some(Instant::from_millis(1500)));
        assert_eq!(
            sched.lookup("A").map(|w| w.state()),
            Some(WidgetState::Stopped)
        );

        // B runs out and is destroyed exactly once
        clock.set_millis(1500);
        sched.tick();
        assert_eq!(b_probe.drops.get(), 1);
        assert!(sched.lookup("B").is_none());
        assert_eq!(current_name(&sched), Some("A"));

        for t in 0..10 {
            clock.set_millis(2000 + t * 700);
            sched.tick();
            assert!(sched.lookup("B").is_none());
        }
        assert_eq!(b_probe.drops.get(), 1);
    }

    #[test]
    fn test_lone_widget_keeps_running() {
        let clock = ManualClock::default();
        let mut sched = scheduler(&clock);
        let (a, probe) = ProbeWidget::boxed("A", 100, ActionFlags::STATUS);
        sched.add_widget(a).unwrap();
        sched.start();

        clock.set_millis(100);
        sched.tick();
        assert_eq!(current_name(&sched), Some("A"));
        assert_eq!(sched.current().map(|w| w.state()), Some(WidgetState::Running));
        assert_eq!(sched.expiry(), Some(Instant::from_millis(200)));
        assert_eq!(probe.ticks.get(), 1);
    }

    #[test]
    fn test_unbounded_display_time_never_expires() {
        let clock = ManualClock::default();
        let mut sched = scheduler(&clock);
        let (mut a, _) = ProbeWidget::boxed("A", 100, ActionFlags::EXTERNAL_MANAGED);
        a.set_display_time(Duration::MAX);
        sched.add_widget(a).unwrap();

        assert!(sched.start());
        assert_eq!(sched.expiry(), None);

        clock.set_millis(1_000_000_000);
        sched.tick();
        assert_eq!(current_name(&sched), Some("A"));
        assert_eq!(sched.current().map(|w| w.state()), Some(WidgetState::Running));

        assert!(sched.pause_current());
        assert!(sched.resume_current());
        assert_eq!(sched.expiry(), None);
        assert_eq!(running_count(&sched), 1);
    }

    #[test]
    fn test_lone_widget_rearm_saturates() {
        let clock = ManualClock::default();
        let mut sched = scheduler(&clock);
        let (a, _) = ProbeWidget::boxed("A", 100, ActionFlags::NONE);
        sched.add_widget(a).unwrap();
        sched.start();

        if let Some(w) = sched.current_mut() {
            w.set_display_time(Duration::MAX);
        }
        clock.set_millis(100);
        sched.tick();
        assert_eq!(current_name(&sched), Some("A"));
        assert_eq!(sched.expiry(), None);
    }

    #[test]
    fn test_external_managed_is_parked() {
        let clock = ManualClock::default();
        let mut sched = scheduler(&clock);
        let (ext, probe) = ProbeWidget::boxed("Ext", 300, ActionFlags::EXTERNAL_MANAGED);
        let (other, _) = ProbeWidget::boxed("Other", 300, ActionFlags::NONE);
        sched.add_widget(ext).unwrap();
        sched.add_widget(other).unwrap();
        sched.start();

        clock.set_millis(300);
        sched.tick();
        assert_eq!(current_name(&sched), Some("Ext"));
        assert_eq!(sched.current().map(|w| w.state()), Some(WidgetState::Stopped));
        assert_eq!(probe.drops.get(), 0);

        // Still parked on later ticks
        clock.set_millis(900);
        sched.tick();
        assert_eq!(current_name(&sched), Some("Ext"));

        // The owner brings it back without another setup
        assert!(sched.resume_current());
        assert_eq!(sched.current().map(|w| w.state()), Some(WidgetState::Running));
        assert_eq!(probe.setups.get(), 1);
        assert_eq!(sched.expiry(), Some(Instant::from_millis(1200)));
    }

    #[test]
    fn test_external_pause_resume() {
        let clock = ManualClock::default();
        let mut sched = scheduler(&clock);
        let (ext, _) = ProbeWidget::boxed("Ext", 300, ActionFlags::EXTERNAL_MANAGED);
        sched.add_widget(ext).unwrap();
        sched.start();

        assert!(sched.pause_current());
        assert!(!sched.pause_current());

        // A paused external widget is left alone at expiry
        clock.set_millis(400);
        sched.tick();
        assert_eq!(sched.current().map(|w| w.state()), Some(WidgetState::Paused));

        // Direct transitions on the widget are tolerated too
        if let Some(w) = sched.current_mut() {
            w.resume();
        }
        assert_eq!(running_count(&sched), 1);
        assert!(!sched.resume_current());
    }

    #[test]
    fn test_paused_plain_widget_is_stopped_when_rotated() {
        let clock = ManualClock::default();
        let mut sched = scheduler(&clock);
        let (a, _) = ProbeWidget::boxed("A", 100, ActionFlags::NONE);
        let (b, _) = ProbeWidget::boxed("B", 100, ActionFlags::NONE);
        sched.add_widget(a).unwrap();
        sched.add_widget(b).unwrap();
        sched.start();
        sched.pause_current();

        clock.set_millis(100);
        sched.tick();
        assert_eq!(current_name(&sched), Some("B"));
        assert_eq!(
            sched.lookup("A").map(|w| w.state()),
            Some(WidgetState::Stopped)
        );
    }

    #[test]
    fn test_stop_current_destroys_and_disarms() {
        let clock = ManualClock::default();
        let mut sched = scheduler(&clock);
        let (a, a_probe) = ProbeWidget::boxed("A", 100, ActionFlags::NONE);
        let (b, _) = ProbeWidget::boxed("B", 100, ActionFlags::NONE);
        sched.add_widget(a).unwrap();
        sched.add_widget(b).unwrap();
        sched.start();

        assert!(sched.stop_current());
        assert_eq!(a_probe.drops.get(), 1);
        assert!(sched.is_idle());

        sched.tick();
        assert!(sched.is_idle());
        assert!(!sched.stop_current());

        sched.start();
        assert_eq!(current_name(&sched), Some("B"));
    }

    #[test]
    fn test_idle_until_widget_added() {
        let clock = ManualClock::default();
        let mut sched = scheduler(&clock);
        let (a, a_probe) = ProbeWidget::boxed("A", 100, ActionFlags::AUTO_REMOVE);
        sched.add_widget(a).unwrap();
        sched.start();

        clock.set_millis(100);
        sched.tick();
        assert!(sched.is_idle());
        assert_eq!(a_probe.drops.get(), 1);

        // Idle ticks still reach the display's housekeeping
        sched.tick();
        assert_eq!(sched.display().housekeeping, 2);

        let (b, b_probe) = ProbeWidget::boxed("B", 100, ActionFlags::NONE);
        sched.add_widget(b).unwrap();
        sched.tick();
        assert_eq!(current_name(&sched), Some("B"));
        assert_eq!(b_probe.ticks.get(), 1);
    }

    #[test]
    fn test_marked_widgets_are_purged() {
        let clock = ManualClock::default();
        let mut sched = scheduler(&clock);
        let (a, a_probe) = ProbeWidget::boxed("A", 1000, ActionFlags::NONE);
        let (b, b_probe) = ProbeWidget::boxed("B", 1000, ActionFlags::NONE);
        let (c, _) = ProbeWidget::boxed("C", 1000, ActionFlags::NONE);
        sched.add_widget(a).unwrap();
        sched.add_widget(b).unwrap();
        sched.add_widget(c).unwrap();
        sched.start();

        if let Some(w) = sched.lookup_mut("B") {
            w.add_action(ActionFlags::MARKED_FOR_REMOVE);
        }
        sched.tick();
        assert_eq!(b_probe.drops.get(), 1);
        assert!(sched.lookup("B").is_none());

        // Marking the current widget ends it before its time
        if let Some(w) = sched.current_mut() {
            w.add_action(ActionFlags::MARKED_FOR_REMOVE);
        }
        sched.tick();
        assert_eq!(a_probe.drops.get(), 1);
        assert_eq!(current_name(&sched), Some("C"));
    }

    #[test]
    fn test_ticks_forward_to_widget_and_display() {
        let clock = ManualClock::default();
        let mut sched = scheduler(&clock);
        let (a, probe) = ProbeWidget::boxed("A", 1000, ActionFlags::NONE);
        sched.add_widget(a).unwrap();

        // Not started: nothing is current
        sched.tick();
        assert_eq!(probe.ticks.get(), 0);

        sched.start();
        sched.tick();
        sched.tick();
        assert_eq!(probe.ticks.get(), 2);
        assert_eq!(sched.display().flushes, 2);
        assert_eq!(sched.display().housekeeping, 3);
    }

    #[test]
    fn test_drop_releases_every_widget() {
        let clock = ManualClock::default();
        let mut sched = scheduler(&clock);
        let (a, a_probe) = ProbeWidget::boxed("A", 1000, ActionFlags::NONE);
        let (b, b_probe) = ProbeWidget::boxed("B", 1000, ActionFlags::NONE);
        sched.add_widget(a).unwrap();
        sched.add_widget(b).unwrap();
        sched.start();

        drop(sched);
        assert_eq!(a_probe.drops.get(), 1);
        assert_eq!(b_probe.drops.get(), 1);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Advance(u64),
        Pause,
        Resume,
        Stop,
        Start,
        Mark(usize),
    }

    fn flags() -> impl Strategy<Value = ActionFlags> {
        (any::<bool>(), any::<bool>(), any::<bool>()).prop_map(|(auto, ext, status)| {
            let mut flags = ActionFlags::NONE;
            if auto {
                flags |= ActionFlags::AUTO_REMOVE;
            }
            if ext {
                flags |= ActionFlags::EXTERNAL_MANAGED;
            }
            if status {
                flags |= ActionFlags::STATUS;
            }
            flags
        })
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            4 => (1u64..400).prop_map(Op::Advance),
            1 => Just(Op::Pause),
            1 => Just(Op::Resume),
            1 => Just(Op::Stop),
            1 => Just(Op::Start),
            1 => (0usize..6).prop_map(Op::Mark),
        ]
    }

    proptest! {
        #[test]
        fn prop_at_most_one_running(
            widgets in proptest::collection::vec((1u64..300, flags()), 1..6),
            ops in proptest::collection::vec(op(), 1..60),
        ) {
            let clock = ManualClock::default();
            let mut sched = scheduler(&clock);
            let mut probes = Vec::new();
            for (i, (ms, flags)) in widgets.iter().enumerate() {
                let (w, probe) = ProbeWidget::boxed(&format!("w{}", i), *ms, *flags);
                sched.add_widget(w).unwrap();
                probes.push(probe);
            }
            sched.start();

            for op in ops {
                match op {
                    Op::Advance(ms) => clock.advance(Duration::from_millis(ms)),
                    Op::Pause => { sched.pause_current(); }
                    Op::Resume => { sched.resume_current(); }
                    Op::Stop => { sched.stop_current(); }
                    Op::Start => { sched.start(); }
                    Op::Mark(i) => {
                        if let Some(w) = sched.lookup_mut(&format!("w{}", i)) {
                            w.add_action(ActionFlags::MARKED_FOR_REMOVE);
                        }
                    }
                }
                sched.tick();

                prop_assert!(running_count(&sched) <= 1);
                // Anything waiting in the queue is stopped
                let queued_active = sched
                    .widgets()
                    .skip(usize::from(!sched.is_idle()))
                    .any(|w| w.state() != WidgetState::Stopped);
                prop_assert!(!queued_active);
            }

            // Every widget is destroyed at most once, and exactly once overall
            let alive = sched.len();
            drop(sched);
            let destroyed: u32 = probes.iter().map(|p| p.drops.get()).sum();
            prop_assert_eq!(destroyed as usize, probes.len());
            prop_assert!(alive <= probes.len());
            prop_assert!(probes.iter().all(|p| p.drops.get() == 1));
        }
    }
}
