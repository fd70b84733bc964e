use crate::math::to_int;
use crate::{Error, Event, Skeleton, SkeletonData};
use std::collections::HashMap;
use std::sync::Arc;

/// Crossfade durations between pairs of animations, keyed by animation index.
#[derive(Clone, Debug)]
pub struct AnimationStateData {
    pub skeleton_data: Arc<SkeletonData>,
    pub default_mix: f32,
    mixes: HashMap<(usize, usize), f32>,
}

impl AnimationStateData {
    pub fn new(skeleton_data: Arc<SkeletonData>) -> Self {
        Self {
            skeleton_data,
            default_mix: 0.0,
            mixes: HashMap::new(),
        }
    }

    pub fn set_mix(&mut self, from: &str, to: &str, duration: f32) -> Result<(), Error> {
        if duration.is_nan() || duration < 0.0 {
            return Err(Error::InvalidValue {
                message: "mix duration must be finite and >= 0".to_string(),
            });
        }
        let Some((from_index, _)) = self.skeleton_data.find_animation(from) else {
            return Err(Error::UnknownAnimation {
                name: from.to_string(),
            });
        };
        let Some((to_index, _)) = self.skeleton_data.find_animation(to) else {
            return Err(Error::UnknownAnimation {
                name: to.to_string(),
            });
        };
        self.mixes.insert((from_index, to_index), duration);
        Ok(())
    }

    /// Mix duration from one animation to another, or `default_mix` when no pair was set.
    pub fn mix(&self, from_index: usize, to_index: usize) -> f32 {
        self.mixes
            .get(&(from_index, to_index))
            .copied()
            .unwrap_or(self.default_mix)
    }
}

/// Receives track lifecycle callbacks. Every method defaults to a no-op.
pub trait AnimationStateListener {
    fn start(&mut self, _track_index: usize) {}
    fn end(&mut self, _track_index: usize) {}
    /// `loop_count` is the number of whole passes through the animation so far.
    fn complete(&mut self, _track_index: usize, _loop_count: i32) {}
    fn event(&mut self, _track_index: usize, _event: &Event) {}
}

type BoxedListener = Box<dyn AnimationStateListener>;

/// Handle returned by [`AnimationState::add_listener`] for later removal.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct ListenerId(usize);

/// One queued or playing animation on a track.
pub struct TrackEntry {
    pub animation_index: usize,
    pub looped: bool,
    /// Seconds after the start of the previous entry before this one begins.
    pub delay: f32,
    pub time: f32,
    pub last_time: f32,
    pub end_time: f32,
    pub time_scale: f32,
    pub mix_time: f32,
    pub mix_duration: f32,
    /// Weight of this entry over lower tracks, also scaling the crossfade.
    pub mix: f32,
    next: Option<Box<TrackEntry>>,
    previous: Option<Box<TrackEntry>>,
    listener: Option<BoxedListener>,
}

impl std::fmt::Debug for TrackEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackEntry")
            .field("animation_index", &self.animation_index)
            .field("looped", &self.looped)
            .field("delay", &self.delay)
            .field("time", &self.time)
            .field("last_time", &self.last_time)
            .field("end_time", &self.end_time)
            .field("time_scale", &self.time_scale)
            .field("mix_time", &self.mix_time)
            .field("mix_duration", &self.mix_duration)
            .field("mix", &self.mix)
            .field("next", &self.next)
            .field("previous", &self.previous)
            .field("has_listener", &self.listener.is_some())
            .finish()
    }
}

impl TrackEntry {
    fn new(animation_index: usize, duration: f32, looped: bool) -> Self {
        Self {
            animation_index,
            looped,
            delay: 0.0,
            time: 0.0,
            // Negative so events keyed at time zero fire on the first apply.
            last_time: -1.0,
            end_time: duration,
            time_scale: 1.0,
            mix_time: 0.0,
            mix_duration: 0.0,
            mix: 1.0,
            next: None,
            previous: None,
            listener: None,
        }
    }

    /// The entry queued to play after this one.
    pub fn next(&self) -> Option<&TrackEntry> {
        self.next.as_deref()
    }

    pub fn next_mut(&mut self) -> Option<&mut TrackEntry> {
        self.next.as_deref_mut()
    }

    /// The entry being crossfaded out, if a mix is in progress.
    pub fn previous(&self) -> Option<&TrackEntry> {
        self.previous.as_deref()
    }

    /// Sets a listener that only receives callbacks for this entry. It is called before the
    /// state's global listeners.
    pub fn set_listener<L: AnimationStateListener + 'static>(&mut self, listener: L) {
        self.listener = Some(Box::new(listener));
    }

    pub fn clear_listener(&mut self) {
        self.listener = None;
    }

    /// True once `time` reaches `end_time`, whether or not the entry loops.
    pub fn is_complete(&self) -> bool {
        self.time >= self.end_time
    }
}

fn last_entry(entry: &TrackEntry) -> &TrackEntry {
    match entry.next {
        Some(ref next) => last_entry(next),
        None => entry,
    }
}

fn last_entry_mut(entry: &mut TrackEntry) -> &mut TrackEntry {
    match entry.next {
        Some(ref mut next) => last_entry_mut(next),
        None => entry,
    }
}

/// Calls `f` on the entry's own listener, then on each global listener in registration order.
fn notify(
    entry_listener: &mut Option<BoxedListener>,
    listeners: &mut [(ListenerId, BoxedListener)],
    mut f: impl FnMut(&mut BoxedListener),
) {
    if let Some(listener) = entry_listener.as_mut() {
        f(listener);
    }
    for (_, listener) in listeners.iter_mut() {
        f(listener);
    }
}

/// Plays animations on independent tracks, crossfading between entries on the same track.
pub struct AnimationState {
    data: AnimationStateData,
    tracks: Vec<Option<Box<TrackEntry>>>,
    events: Vec<Event>,
    listeners: Vec<(ListenerId, BoxedListener)>,
    next_listener_id: usize,
    pub time_scale: f32,
}

impl AnimationState {
    pub fn new(data: AnimationStateData) -> Self {
        Self {
            data,
            tracks: Vec::new(),
            events: Vec::new(),
            listeners: Vec::new(),
            next_listener_id: 0,
            time_scale: 1.0,
        }
    }

    pub fn data(&self) -> &AnimationStateData {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut AnimationStateData {
        &mut self.data
    }

    pub fn tracks_len(&self) -> usize {
        self.tracks.len()
    }

    /// Adds a listener that receives callbacks for every track.
    pub fn add_listener<L: AnimationStateListener + 'static>(&mut self, listener: L) -> ListenerId {
        let id = ListenerId(self.next_listener_id);
        self.next_listener_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Returns `false` when no listener has the given id.
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let Some(index) = self.listeners.iter().position(|(l, _)| *l == id) else {
            return false;
        };
        self.listeners.remove(index);
        true
    }

    pub fn clear_listeners(&mut self) {
        self.listeners.clear();
    }

    /// Advances every track by `delta` seconds, scaled by `time_scale` and each entry's own
    /// time scale. Promotes queued entries whose delay has elapsed and clears finished
    /// non-looping tracks.
    pub fn update(&mut self, delta: f32) {
        let delta = delta * self.time_scale;
        for i in 0..self.tracks.len() {
            let Some(current) = self.tracks[i].as_deref_mut() else {
                continue;
            };

            let last_time = current.last_time;
            let mut promoted_delta = None;
            if let Some(mut next) = current.next.take_if(|next| last_time - next.delay >= 0.0) {
                let next_delta = delta * next.time_scale;
                // Start and end listeners see the advanced times.
                next.time = last_time - next.delay + next_delta;
                current.time += delta * current.time_scale;
                promoted_delta = Some(next_delta);
                self.set_current(i, next);
            } else if current.next.is_none() && !current.looped && last_time >= current.end_time {
                self.clear_track(i);
                continue;
            }

            let Some(current) = self.tracks[i].as_deref_mut() else {
                continue;
            };
            if let Some(next_delta) = promoted_delta {
                current.time -= next_delta;
            }
            current.time += delta * current.time_scale;
            if let Some(previous) = current.previous.as_deref_mut() {
                let previous_delta = delta * previous.time_scale;
                previous.time += previous_delta;
                current.mix_time += previous_delta;
            }
        }
    }

    /// Poses the skeleton with every track's current entry, in track order. Fires event and
    /// complete callbacks for the time elapsed since the last apply.
    pub fn apply(&mut self, skeleton: &mut Skeleton) {
        let data = Arc::clone(&self.data.skeleton_data);
        let mut events = std::mem::take(&mut self.events);
        for i in 0..self.tracks.len() {
            let Some(current) = self.tracks[i].as_deref_mut() else {
                continue;
            };
            events.clear();

            let last_time = current.last_time;
            let end_time = current.end_time;
            let looped = current.looped;
            let mut time = current.time;
            if !looped && time > end_time {
                time = end_time;
            }

            let Some(animation) = data.animations.get(current.animation_index) else {
                log::warn!(
                    "track {i} references missing animation {}",
                    current.animation_index
                );
                current.last_time = current.time;
                continue;
            };

            let previous_pose = current.previous.as_deref().map(|previous| {
                let mut previous_time = previous.time;
                if !previous.looped && previous_time > previous.end_time {
                    previous_time = previous.end_time;
                }
                (previous.animation_index, previous_time, previous.looped)
            });
            match previous_pose {
                None => animation.mix(skeleton, last_time, time, looped, Some(&mut events), current.mix),
                Some((previous_index, previous_time, previous_looped)) => {
                    if let Some(previous) = data.animations.get(previous_index) {
                        previous.apply(skeleton, previous_time, previous_time, previous_looped, None);
                    }
                    let mut alpha = current.mix_time / current.mix_duration * current.mix;
                    if alpha >= 1.0 {
                        alpha = 1.0;
                        current.previous = None;
                    }
                    animation.mix(skeleton, last_time, time, looped, Some(&mut events), alpha);
                }
            }

            for event in &events {
                notify(&mut current.listener, &mut self.listeners, |l| l.event(i, event));
            }

            // Completed the animation, or a loop iteration.
            let completed = if looped {
                end_time > 0.0 && to_int(last_time.max(0.0) / end_time) < to_int(time / end_time)
            } else {
                last_time < end_time && time >= end_time
            };
            if completed {
                let count = to_int(time / end_time);
                notify(&mut current.listener, &mut self.listeners, |l| l.complete(i, count));
            }

            current.last_time = current.time;
        }
        self.events = events;
    }

    pub fn clear_tracks(&mut self) {
        for i in 0..self.tracks.len() {
            self.clear_track(i);
        }
        self.tracks.clear();
    }

    /// Removes the track's entries, firing `end` for the current one.
    pub fn clear_track(&mut self, track_index: usize) {
        let Some(mut current) = self.tracks.get_mut(track_index).and_then(Option::take) else {
            return;
        };
        notify(&mut current.listener, &mut self.listeners, |l| l.end(track_index));
    }

    fn expand_to_index(&mut self, index: usize) {
        if index >= self.tracks.len() {
            self.tracks.resize_with(index + 1, || None);
        }
    }

    fn set_current(&mut self, index: usize, mut entry: Box<TrackEntry>) {
        self.expand_to_index(index);
        if let Some(mut current) = self.tracks[index].take() {
            let previous = current.previous.take();
            notify(&mut current.listener, &mut self.listeners, |l| l.end(index));

            entry.mix_duration = self.data.mix(current.animation_index, entry.animation_index);
            if entry.mix_duration > 0.0 {
                entry.mix_time = 0.0;
                // Mid-crossfade, mix from whichever entry is closer to fully shown.
                entry.previous = match previous {
                    Some(previous) if current.mix_time / current.mix_duration < 0.5 => {
                        Some(previous)
                    }
                    _ => Some(current),
                };
            }
        }

        let entry = self.tracks[index].insert(entry);
        notify(&mut entry.listener, &mut self.listeners, |l| l.start(index));
    }

    /// Plays the named animation immediately, replacing the track's queue.
    pub fn set_animation(
        &mut self,
        track_index: usize,
        animation_name: &str,
        looped: bool,
    ) -> Result<&mut TrackEntry, Error> {
        let (animation_index, _) = self
            .data
            .skeleton_data
            .find_animation(animation_name)
            .ok_or_else(|| Error::UnknownAnimation {
                name: animation_name.to_string(),
            })?;
        self.set_animation_with(track_index, animation_index, looped)
    }

    pub fn set_animation_with(
        &mut self,
        track_index: usize,
        animation_index: usize,
        looped: bool,
    ) -> Result<&mut TrackEntry, Error> {
        let duration = self.animation_duration(animation_index)?;
        self.expand_to_index(track_index);
        if let Some(current) = self.tracks[track_index].as_deref_mut() {
            current.next = None;
        }
        self.set_current(
            track_index,
            Box::new(TrackEntry::new(animation_index, duration, looped)),
        );
        self.tracks[track_index]
            .as_deref_mut()
            .ok_or(Error::InvalidTrackIndex { index: track_index })
    }

    /// Queues the named animation after the last entry on the track.
    ///
    /// A `delay <= 0` is relative to the end of the previous entry minus the mix duration, so
    /// `0` starts the crossfade just in time to finish when the previous animation ends.
    pub fn add_animation(
        &mut self,
        track_index: usize,
        animation_name: &str,
        looped: bool,
        delay: f32,
    ) -> Result<&mut TrackEntry, Error> {
        let (animation_index, _) = self
            .data
            .skeleton_data
            .find_animation(animation_name)
            .ok_or_else(|| Error::UnknownAnimation {
                name: animation_name.to_string(),
            })?;
        self.add_animation_with(track_index, animation_index, looped, delay)
    }

    pub fn add_animation_with(
        &mut self,
        track_index: usize,
        animation_index: usize,
        looped: bool,
        mut delay: f32,
    ) -> Result<&mut TrackEntry, Error> {
        let duration = self.animation_duration(animation_index)?;
        let mut entry = Box::new(TrackEntry::new(animation_index, duration, looped));
        self.expand_to_index(track_index);

        if delay <= 0.0 {
            delay = match self.tracks[track_index].as_deref().map(last_entry) {
                Some(last) => {
                    delay + last.end_time - self.data.mix(last.animation_index, animation_index)
                }
                None => 0.0,
            };
        }
        entry.delay = delay;

        if self.tracks[track_index].is_none() {
            return Ok(&mut **self.tracks[track_index].insert(entry));
        }
        match self.tracks[track_index].as_deref_mut() {
            Some(current) => Ok(&mut **last_entry_mut(current).next.insert(entry)),
            None => Err(Error::InvalidTrackIndex { index: track_index }),
        }
    }

    fn animation_duration(&self, animation_index: usize) -> Result<f32, Error> {
        self.data
            .skeleton_data
            .animations
            .get(animation_index)
            .map(|a| a.duration)
            .ok_or_else(|| Error::InvalidValue {
                message: format!("animation index {animation_index} out of range"),
            })
    }

    pub fn current(&self, track_index: usize) -> Option<&TrackEntry> {
        self.tracks.get(track_index)?.as_deref()
    }

    pub fn current_mut(&mut self, track_index: usize) -> Option<&mut TrackEntry> {
        self.tracks.get_mut(track_index)?.as_deref_mut()
    }
}
