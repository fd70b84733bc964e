use super::test_rigs::{RigBuilder, assert_approx};
use crate::{
    Animation, AnimationState, AnimationStateData, AnimationStateListener, Error, Event,
    EventData, EventTimeline, RotateTimeline, Skeleton, SkeletonData, Timeline,
};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

const IDLE: usize = 0;
const WAVE: usize = 1;

#[derive(Clone)]
struct Recorder {
    tag: &'static str,
    log: Rc<RefCell<Vec<String>>>,
}

impl Recorder {
    fn new(tag: &'static str, log: &Rc<RefCell<Vec<String>>>) -> Self {
        Self {
            tag,
            log: Rc::clone(log),
        }
    }

    fn push(&self, line: String) {
        self.log.borrow_mut().push(format!("{}{line}", self.tag));
    }
}

impl AnimationStateListener for Recorder {
    fn start(&mut self, track_index: usize) {
        self.push(format!("start {track_index}"));
    }

    fn end(&mut self, track_index: usize) {
        self.push(format!("end {track_index}"));
    }

    fn complete(&mut self, track_index: usize, loop_count: i32) {
        self.push(format!("complete {track_index} {loop_count}"));
    }

    fn event(&mut self, track_index: usize, event: &Event) {
        self.push(format!(
            "event {track_index} {} {}",
            event.name, event.int_value
        ));
    }
}

fn hold_rotation(name: &str, degrees: f32) -> Animation {
    let mut rotate = RotateTimeline::new(2, 0);
    rotate.set_frame(0, 0.0, degrees);
    rotate.set_frame(1, 1.0, degrees);
    Animation::new(name, vec![Timeline::Rotate(rotate)], 1.0)
}

fn rig() -> Arc<SkeletonData> {
    let land = EventData {
        name: "land".to_string(),
        int_value: 7,
        ..EventData::default()
    };
    let mut events = EventTimeline::new(1);
    events.set_frame(0, Event::new(0.5, &land));

    RigBuilder::new()
        .bone("root", None, |_| {})
        .animation(hold_rotation("idle", 0.0))
        .animation(hold_rotation("wave", 90.0))
        .animation(Animation::new("jump", vec![Timeline::Event(events)], 1.0))
        .build()
}

fn setup() -> (Skeleton, AnimationState, Rc<RefCell<Vec<String>>>) {
    let data = rig();
    let skeleton = Skeleton::new(Arc::clone(&data));
    let mut state = AnimationState::new(AnimationStateData::new(data));
    let log = Rc::new(RefCell::new(Vec::new()));
    state.add_listener(Recorder::new("", &log));
    (skeleton, state, log)
}

fn step(state: &mut AnimationState, skeleton: &mut Skeleton, delta: f32) {
    state.update(delta);
    state.apply(skeleton);
}

#[test]
fn set_animation_rejects_unknown_names() {
    let (_, mut state, log) = setup();
    let err = state.set_animation(0, "missing", true).unwrap_err();
    assert!(matches!(err, Error::UnknownAnimation { ref name } if name == "missing"));
    assert!(log.borrow().is_empty());
    assert!(state.current(0).is_none());
}

#[test]
fn non_looping_track_completes_then_clears() {
    let (mut skeleton, mut state, log) = setup();
    state.set_animation(0, "wave", false).unwrap();

    step(&mut state, &mut skeleton, 0.6);
    step(&mut state, &mut skeleton, 0.6);
    assert!(state.current(0).is_some_and(|entry| entry.is_complete()));
    state.update(0.1);

    assert!(state.current(0).is_none());
    assert_eq!(*log.borrow(), ["start 0", "complete 0 1", "end 0"]);
}

#[test]
fn looping_track_counts_completed_loops() {
    let (mut skeleton, mut state, log) = setup();
    state.set_animation(0, "idle", true).unwrap();

    for _ in 0..4 {
        step(&mut state, &mut skeleton, 0.5);
    }

    assert_eq!(
        *log.borrow(),
        ["start 0", "complete 0 1", "complete 0 2"]
    );
    assert!(state.current(0).is_some());
}

#[test]
fn looping_track_reports_every_loop_crossed_in_one_update() {
    let (mut skeleton, mut state, log) = setup();
    state.set_animation(0, "idle", true).unwrap();
    step(&mut state, &mut skeleton, 0.0);
    assert_eq!(*log.borrow(), ["start 0"]);

    // Lands at 0.5 into the fourth loop, past where the last apply left off.
    step(&mut state, &mut skeleton, 3.5);
    assert_eq!(*log.borrow(), ["start 0", "complete 0 3"]);

    step(&mut state, &mut skeleton, 0.25);
    assert_eq!(log.borrow().len(), 2);
}

#[test]
fn crossfade_blends_from_the_previous_animation() {
    let (mut skeleton, mut state, log) = setup();
    state.data_mut().set_mix("idle", "wave", 0.2).unwrap();

    state.set_animation(0, "idle", true).unwrap();
    step(&mut state, &mut skeleton, 0.1);
    assert_approx(skeleton.bones[0].rotation, 0.0);

    let entry = state.set_animation(0, "wave", true).unwrap();
    assert_approx(entry.mix_duration, 0.2);
    assert!(entry.previous().is_some());

    step(&mut state, &mut skeleton, 0.1);
    assert_approx(skeleton.bones[0].rotation, 45.0);
    assert!(state.current(0).and_then(|e| e.previous()).is_some());

    step(&mut state, &mut skeleton, 0.1);
    assert_approx(skeleton.bones[0].rotation, 90.0);
    assert!(state.current(0).and_then(|e| e.previous()).is_none());

    assert_eq!(*log.borrow(), ["start 0", "end 0", "start 0"]);
}

#[test]
fn queued_animation_starts_when_the_previous_one_ends() {
    let (mut skeleton, mut state, log) = setup();
    state.set_animation(0, "wave", false).unwrap();
    let queued = state.add_animation(0, "idle", true, 0.0).unwrap();
    assert_approx(queued.delay, 1.0);
    assert!(state.current(0).and_then(|e| e.next()).is_some());

    step(&mut state, &mut skeleton, 0.5);
    step(&mut state, &mut skeleton, 0.6);
    assert_eq!(state.current(0).map(|e| e.animation_index), Some(WAVE));

    state.update(0.1);
    let current = state.current(0).unwrap();
    assert_eq!(current.animation_index, IDLE);
    assert_approx(current.time, 0.2);
    assert_eq!(
        *log.borrow(),
        ["start 0", "complete 0 1", "end 0", "start 0"]
    );
}

#[test]
fn queued_animation_crossfades_in_before_the_previous_one_ends() {
    let (mut skeleton, mut state, log) = setup();
    state.data_mut().set_mix("idle", "wave", 0.2).unwrap();
    state.set_animation_with(0, IDLE, true).unwrap();
    let queued = state.add_animation_with(0, WAVE, false, 0.0).unwrap();
    assert_approx(queued.delay, 0.8);

    step(&mut state, &mut skeleton, 0.9);
    let current = state.current(0).unwrap();
    assert_eq!(current.animation_index, IDLE);
    assert_eq!(current.next().map(|e| e.animation_index), Some(WAVE));
    assert!(current.previous().is_none());

    step(&mut state, &mut skeleton, 0.1);
    let current = state.current(0).unwrap();
    assert_eq!(current.animation_index, WAVE);
    assert_eq!(current.previous().map(|e| e.animation_index), Some(IDLE));
    assert_approx(current.mix_duration, 0.2);
    assert!(current.mix_time < current.mix_duration);
    assert_approx(skeleton.bones[0].rotation, 45.0);

    step(&mut state, &mut skeleton, 0.1);
    let current = state.current(0).unwrap();
    assert!(current.previous().is_none());
    assert_approx(skeleton.bones[0].rotation, 90.0);
    assert_eq!(*log.borrow(), ["start 0", "end 0", "start 0"]);
}

#[test]
fn add_animation_on_an_empty_track_plays_without_start() {
    let (mut skeleton, mut state, log) = setup();
    state.add_animation(1, "wave", false, 0.0).unwrap();
    assert_eq!(state.tracks_len(), 2);
    assert!(state.current(0).is_none());

    step(&mut state, &mut skeleton, 0.5);
    assert_approx(skeleton.bones[0].rotation, 90.0);
    assert!(log.borrow().is_empty());
}

#[test]
fn events_reach_listeners() {
    let (mut skeleton, mut state, log) = setup();
    state.set_animation(0, "jump", false).unwrap();
    step(&mut state, &mut skeleton, 0.4);
    assert_eq!(*log.borrow(), ["start 0"]);

    step(&mut state, &mut skeleton, 0.2);
    assert_eq!(*log.borrow(), ["start 0", "event 0 land 7"]);
}

#[test]
fn entry_listener_runs_before_global_listeners() {
    let (_, mut state, log) = setup();
    state
        .set_animation(0, "idle", true)
        .unwrap()
        .set_listener(Recorder::new("entry:", &log));
    log.borrow_mut().clear();

    state.clear_track(0);
    assert_eq!(*log.borrow(), ["entry:end 0", "end 0"]);
}

#[test]
fn removed_listeners_stop_receiving_callbacks() {
    let data = rig();
    let mut state = AnimationState::new(AnimationStateData::new(data));
    let log = Rc::new(RefCell::new(Vec::new()));
    let id = state.add_listener(Recorder::new("", &log));

    assert!(state.remove_listener(id));
    assert!(!state.remove_listener(id));
    state.set_animation(0, "idle", true).unwrap();
    assert!(log.borrow().is_empty());
}

#[test]
fn clear_tracks_ends_every_track() {
    let (_, mut state, log) = setup();
    state.set_animation(0, "idle", true).unwrap();
    state.set_animation(2, "wave", true).unwrap();
    log.borrow_mut().clear();

    state.clear_tracks();
    assert_eq!(*log.borrow(), ["end 0", "end 2"]);
    assert_eq!(state.tracks_len(), 0);
}

#[test]
fn higher_tracks_apply_over_lower_tracks() {
    let (mut skeleton, mut state, _) = setup();
    state.set_animation(0, "idle", true).unwrap();
    state.set_animation(1, "wave", true).unwrap();
    step(&mut state, &mut skeleton, 0.25);
    assert_approx(skeleton.bones[0].rotation, 90.0);

    state.current_mut(1).unwrap().mix = 0.5;
    step(&mut state, &mut skeleton, 0.25);
    assert_approx(skeleton.bones[0].rotation, 45.0);
}

#[test]
fn time_scales_multiply() {
    let (_, mut state, _) = setup();
    state.time_scale = 2.0;
    state.set_animation(0, "idle", true).unwrap().time_scale = 0.5;
    state.update(0.25);
    assert_approx(state.current(0).unwrap().time, 0.25);
}

#[test]
fn mix_durations_fall_back_to_the_default() {
    let mut data = AnimationStateData::new(rig());
    data.default_mix = 0.3;
    data.set_mix("idle", "wave", 0.1).unwrap();

    assert_approx(data.mix(IDLE, WAVE), 0.1);
    assert_approx(data.mix(WAVE, IDLE), 0.3);
    assert!(matches!(
        data.set_mix("idle", "missing", 0.1),
        Err(Error::UnknownAnimation { .. })
    ));
    assert!(matches!(
        data.set_mix("idle", "wave", -1.0),
        Err(Error::InvalidValue { .. })
    ));
}
