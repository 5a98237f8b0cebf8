//! Idle-motion learning and replay.
//!
//! While the agent is toggled off, the learner samples the avatar's real
//! movement into an in-progress pattern; toggling the agent on commits the
//! pattern (if long enough) into the [`PatternLibrary`].  Replay picks a
//! random committed pattern, cuts a random contiguous segment out of it and
//! hands the segment to a deferred task that re-applies it step by step with
//! noise, so the mimicry never repeats exactly.

use std::time::{Duration, Instant};

use rand::rngs::SmallRng;
use rand::{Rng, RngCore, SeedableRng};
use tracing::debug;
use vigil_memory::PatternLibrary;
use vigil_types::{MovementPattern, MovementStep, Orientation, Vec3};
use vigil_world::WorldLink;

use crate::tasks::{DeferredTask, TaskOutcome, TaskQueue};

/// Minimum spacing between motion samples.
const SAMPLE_INTERVAL: Duration = Duration::from_millis(100);
/// Squared displacement below which a sample is not worth a step.
const MIN_DISPLACEMENT_SQ: f64 = 0.001;
/// Patterns shorter than this are discarded instead of committed.
pub const MIN_PATTERN_STEPS: usize = 5;

/// Replay segment length is 5..15 steps.
const SEGMENT_BASE_LEN: usize = 5;
const SEGMENT_EXTRA_LEN: usize = 10;

// ────────────────────────────────────────────────────────────────────────────
// MovementLearner
// ────────────────────────────────────────────────────────────────────────────

/// Records idle motion and schedules pattern replay.
pub struct MovementLearner {
    rng: SmallRng,
    recording: bool,
    last_position: Vec3,
    last_sample: Option<Instant>,
    current: Option<MovementPattern>,
}

impl MovementLearner {
    pub fn new(rng: SmallRng) -> Self {
        Self {
            rng,
            recording: false,
            last_position: Vec3::ZERO,
            last_sample: None,
            current: None,
        }
    }

    // ── Recording ────────────────────────────────────────────────────────────

    /// Begin recording a fresh pattern from the avatar's current position.
    pub fn start_recording(&mut self, link: &dyn WorldLink) {
        if !link.connected() {
            return;
        }
        self.recording = true;
        self.last_position = link.position();
        self.last_sample = Some(Instant::now());
        self.current = Some(MovementPattern::new());
        debug!("movement recording started");
    }

    /// Stop recording; commit the pattern when it has at least
    /// [`MIN_PATTERN_STEPS`] steps, discard it otherwise.
    pub fn stop_recording(&mut self, library: &mut PatternLibrary) {
        if self.recording {
            if let Some(pattern) = self.current.take() {
                if pattern.len() >= MIN_PATTERN_STEPS {
                    library.commit(pattern);
                } else {
                    debug!(steps = pattern.len(), "discarding short pattern");
                }
            }
        }
        self.recording = false;
        self.current = None;
    }

    /// Sample the avatar's motion; called every cycle while the agent is off.
    pub fn record_sample(&mut self, link: &dyn WorldLink) {
        self.record_sample_at(link, Instant::now());
    }

    fn record_sample_at(&mut self, link: &dyn WorldLink, now: Instant) {
        if !self.recording || !link.connected() {
            return;
        }
        let Some(current) = self.current.as_mut() else {
            return;
        };
        let since = match self.last_sample {
            Some(t) => now.duration_since(t),
            None => SAMPLE_INTERVAL,
        };
        if since < SAMPLE_INTERVAL {
            return;
        }

        let position = link.position();
        let delta = position.sub(self.last_position);
        if delta.length_squared() > MIN_DISPLACEMENT_SQ {
            let orientation = link.orientation();
            current.push_step(MovementStep {
                delta,
                yaw: orientation.yaw,
                pitch: orientation.pitch,
                airborne: !link.on_ground(),
                sprinting: link.sprinting(),
                time_delta_ms: since.as_millis() as u64,
            });
        }
        self.last_position = position;
        self.last_sample = Some(now);
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Steps captured so far in the in-progress pattern.
    pub fn pending_steps(&self) -> usize {
        self.current.as_ref().map_or(0, MovementPattern::len)
    }

    // ── Replay ───────────────────────────────────────────────────────────────

    /// Cut a random segment from a random committed pattern (or a synthesized
    /// default) and schedule its replay as background work.  The segment is
    /// not cancellable once scheduled.
    pub fn schedule_replay(&mut self, library: &PatternLibrary, queue: &mut TaskQueue) {
        let pattern = match library.random(&mut self.rng) {
            Some(p) => p.clone(),
            None => self.default_pattern(),
        };
        if pattern.is_empty() {
            return;
        }
        let len = pattern.len();
        let start_bound = len.saturating_sub(10).max(1);
        let start = self.rng.gen_range(0..start_bound);
        let segment = SEGMENT_BASE_LEN + self.rng.gen_range(0..SEGMENT_EXTRA_LEN);
        let end = (start + segment).min(len);

        let steps = pattern.steps[start..end].to_vec();
        debug!(start, end, "scheduling pattern replay");
        queue.schedule(
            Duration::ZERO,
            Box::new(PlaybackTask::new(steps, self.rng.next_u64())),
        );
    }

    /// Fallback pattern for an empty library: a short aimless shuffle.
    fn default_pattern(&mut self) -> MovementPattern {
        let mut pattern = MovementPattern::new();
        for _ in 0..10 {
            pattern.push_step(MovementStep {
                delta: Vec3::new(
                    self.rng.gen_range(-0.05..0.05),
                    0.0,
                    self.rng.gen_range(-0.05..0.05),
                ),
                yaw: self.rng.gen_range(0.0..360.0),
                pitch: self.rng.gen_range(-15.0..15.0),
                airborne: self.rng.gen_bool(0.1),
                sprinting: self.rng.gen_bool(0.3),
                time_delta_ms: self.rng.gen_range(200..500),
            });
        }
        pattern
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Playback task
// ────────────────────────────────────────────────────────────────────────────

const REPLAY_VELOCITY_SCALE: f64 = 5.0;
const REPLAY_NOISE: f64 = 0.05;
const REPLAY_SPRINT_BOOST: f64 = 1.3;
const REPLAY_SPRINT_CHANCE: f64 = 0.8;
const REPLAY_JUMP_CHANCE: f64 = 0.7;
const REPLAY_ROTATION_FACTOR: f32 = 0.3;
const REPLAY_PAUSE_MIN_MS: u64 = 50;
const REPLAY_PAUSE_MAX_MS: u64 = 500;

/// Re-applies one recorded segment step by step.
pub(crate) struct PlaybackTask {
    steps: Vec<MovementStep>,
    index: usize,
    rng: SmallRng,
}

impl PlaybackTask {
    pub(crate) fn new(steps: Vec<MovementStep>, seed: u64) -> Self {
        Self {
            steps,
            index: 0,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    fn apply_step(&mut self, link: &mut dyn WorldLink, step: MovementStep) {
        let mut velocity = Vec3::new(
            step.delta.x * REPLAY_VELOCITY_SCALE + self.rng.gen_range(-REPLAY_NOISE..REPLAY_NOISE),
            0.0,
            step.delta.z * REPLAY_VELOCITY_SCALE + self.rng.gen_range(-REPLAY_NOISE..REPLAY_NOISE),
        );
        if step.sprinting && self.rng.gen_bool(REPLAY_SPRINT_CHANCE) {
            velocity = velocity.scale(REPLAY_SPRINT_BOOST);
        }
        link.set_velocity(velocity);

        let wanted = Orientation::new(
            step.yaw + self.rng.gen_range(-5.0..5.0),
            step.pitch + self.rng.gen_range(-2.5..2.5),
        );
        let next = link.orientation().approach(wanted, REPLAY_ROTATION_FACTOR);
        link.set_orientation(next);

        if step.airborne && link.on_ground() && self.rng.gen_bool(REPLAY_JUMP_CHANCE) {
            link.jump();
        }
    }
}

impl DeferredTask for PlaybackTask {
    fn label(&self) -> &'static str {
        "pattern-playback"
    }

    fn run(&mut self, link: &mut dyn WorldLink) -> TaskOutcome {
        if !link.connected() {
            return TaskOutcome::Done;
        }
        let Some(step) = self.steps.get(self.index).copied() else {
            return TaskOutcome::Done;
        };
        self.apply_step(link, step);
        self.index += 1;
        if self.index >= self.steps.len() {
            TaskOutcome::Done
        } else {
            let pause = step
                .time_delta_ms
                .clamp(REPLAY_PAUSE_MIN_MS, REPLAY_PAUSE_MAX_MS);
            TaskOutcome::Reschedule(Duration::from_millis(pause))
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_world::SimLink;
    use vigil_world::sim::ActionRecord;

    fn learner() -> MovementLearner {
        MovementLearner::new(SmallRng::seed_from_u64(5))
    }

    /// Record `n` well-spaced, well-displaced samples.
    fn record_steps(learner: &mut MovementLearner, link: &mut SimLink, n: usize) {
        let start = Instant::now();
        for i in 0..n {
            link.teleport(Vec3::new((i + 1) as f64, 0.0, 0.0));
            let t = start + Duration::from_millis(((i + 1) as u64) * 150);
            learner.record_sample_at(link, t);
        }
    }

    #[test]
    fn four_steps_discard_five_commit() {
        let mut library = PatternLibrary::in_memory();

        let mut link = SimLink::default();
        let mut l = learner();
        l.start_recording(&link);
        record_steps(&mut l, &mut link, 4);
        l.stop_recording(&mut library);
        assert_eq!(library.len(), 0, "4-step pattern must be discarded");

        let mut link = SimLink::default();
        l.start_recording(&link);
        record_steps(&mut l, &mut link, 5);
        l.stop_recording(&mut library);
        assert_eq!(library.len(), 1, "5-step pattern must commit");
    }

    #[test]
    fn samples_inside_the_interval_are_skipped() {
        let mut link = SimLink::default();
        let mut l = learner();
        l.start_recording(&link);
        let start = Instant::now();
        link.teleport(Vec3::new(1.0, 0.0, 0.0));
        l.record_sample_at(&link, start + Duration::from_millis(150));
        link.teleport(Vec3::new(2.0, 0.0, 0.0));
        // Only 50 ms later: below the 100 ms sampling interval.
        l.record_sample_at(&link, start + Duration::from_millis(200));
        assert_eq!(l.pending_steps(), 1);
    }

    #[test]
    fn negligible_displacement_is_not_recorded() {
        let mut link = SimLink::default();
        let mut l = learner();
        l.start_recording(&link);
        link.teleport(Vec3::new(0.01, 0.0, 0.0));
        l.record_sample_at(&link, Instant::now() + Duration::from_millis(200));
        assert_eq!(l.pending_steps(), 0);
    }

    #[test]
    fn recording_captures_flags_and_timing() {
        let mut link = SimLink::default();
        link.set_sprinting(true);
        link.set_on_ground(false);
        let mut l = learner();
        l.start_recording(&link);
        let start = Instant::now();
        for i in 0..5_u64 {
            link.teleport(Vec3::new((i + 1) as f64, 0.0, 0.0));
            l.record_sample_at(&link, start + Duration::from_millis((i + 1) * 250));
        }
        let mut library = PatternLibrary::in_memory();
        l.stop_recording(&mut library);
        let step = library.oldest().unwrap().steps[0];
        assert!(step.sprinting);
        assert!(step.airborne);
        assert!(step.time_delta_ms >= 100);
    }

    #[test]
    fn replay_schedules_a_task_even_with_an_empty_library() {
        let library = PatternLibrary::in_memory();
        let mut queue = TaskQueue::new();
        learner().schedule_replay(&library, &mut queue);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn playback_applies_steps_and_finishes() {
        let steps = vec![
            MovementStep {
                delta: Vec3::new(0.1, 0.0, 0.0),
                yaw: 45.0,
                pitch: 0.0,
                airborne: false,
                sprinting: false,
                time_delta_ms: 120,
            };
            3
        ];
        let mut link = SimLink::default();
        let mut queue = TaskQueue::new();
        let now = Instant::now();
        queue.schedule(Duration::ZERO, Box::new(PlaybackTask::new(steps, 2)));
        for i in 1..=5 {
            queue.drain_due_at(now + Duration::from_secs(i), &mut link);
        }
        assert!(queue.is_empty(), "playback never finished");
        let velocity_updates = link
            .actions()
            .iter()
            .filter(|a| matches!(a, ActionRecord::SetVelocity(_)))
            .count();
        assert_eq!(velocity_updates, 3);
        // Velocity is the recorded delta scaled up (±noise).
        let Some(ActionRecord::SetVelocity(v)) = link
            .actions()
            .iter()
            .find(|a| matches!(a, ActionRecord::SetVelocity(_)))
        else {
            unreachable!()
        };
        assert!((v.x - 0.5).abs() < 0.1);
    }

    #[test]
    fn playback_jumps_only_for_airborne_steps_on_ground() {
        let mut grounded_step = MovementStep {
            delta: Vec3::new(0.1, 0.0, 0.0),
            yaw: 0.0,
            pitch: 0.0,
            airborne: false,
            sprinting: false,
            time_delta_ms: 100,
        };
        let mut link = SimLink::default();
        let mut task = PlaybackTask::new(vec![grounded_step], 3);
        let _ = task.run(&mut link);
        assert!(!link.actions().contains(&ActionRecord::Jump));

        // Airborne steps replayed while grounded hop most of the time.
        grounded_step.airborne = true;
        let mut jumped = false;
        for seed in 0..20 {
            let mut link = SimLink::default();
            let mut task = PlaybackTask::new(vec![grounded_step], seed);
            let _ = task.run(&mut link);
            if link.actions().contains(&ActionRecord::Jump) {
                jumped = true;
                break;
            }
        }
        assert!(jumped, "0.7 jump gate never passed across 20 seeds");
    }

    #[test]
    fn playback_stops_when_disconnected() {
        let mut link = SimLink::default();
        link.set_connected(false);
        let steps = vec![
            MovementStep {
                delta: Vec3::ZERO,
                yaw: 0.0,
                pitch: 0.0,
                airborne: false,
                sprinting: false,
                time_delta_ms: 100,
            };
            5
        ];
        let mut task = PlaybackTask::new(steps, 4);
        assert!(matches!(task.run(&mut link), TaskOutcome::Done));
        assert!(link.actions().is_empty());
    }
}
