use crate::{Event, Skeleton, Timeline};

#[derive(Clone, Debug, Default)]
pub struct Animation {
    pub name: String,
    pub timelines: Vec<Timeline>,
    pub duration: f32,
}

impl Animation {
    pub fn new(name: impl Into<String>, timelines: Vec<Timeline>, duration: f32) -> Self {
        Self {
            name: name.into(),
            timelines,
            duration,
        }
    }

    /// Poses the skeleton at `time`, replacing the current values of every keyed property.
    /// Events fired between `last_time` (exclusive) and `time` (inclusive) are appended to
    /// `events` when given.
    pub fn apply(
        &self,
        skeleton: &mut Skeleton,
        last_time: f32,
        time: f32,
        looped: bool,
        events: Option<&mut Vec<Event>>,
    ) {
        self.mix(skeleton, last_time, time, looped, events, 1.0);
    }

    /// Like [`Animation::apply`], but blends each keyed property toward its animated value by
    /// `alpha`.
    pub fn mix(
        &self,
        skeleton: &mut Skeleton,
        last_time: f32,
        time: f32,
        looped: bool,
        mut events: Option<&mut Vec<Event>>,
        alpha: f32,
    ) {
        let (last_time, time) = self.local_times(last_time, time, looped);
        for timeline in &self.timelines {
            timeline.apply(skeleton, last_time, time, events.as_deref_mut(), alpha);
        }
    }

    fn local_times(&self, mut last_time: f32, mut time: f32, looped: bool) -> (f32, f32) {
        if looped && self.duration != 0.0 {
            time %= self.duration;
            if last_time > 0.0 {
                last_time %= self.duration;
            }
        }
        (last_time, time)
    }
}

/// Returns the record index of the first key whose time is greater than `target`.
///
/// `values` holds records of `step` floats with the key time first. The caller guarantees
/// `values[0] <= target < values[len - step]`, so there are at least two records and the result
/// is never the first record.
pub fn binary_search(values: &[f32], target: f32, step: usize) -> usize {
    let records = values.len() / step;
    if records <= 2 {
        return step;
    }
    let mut low = 0;
    let mut high = records - 2;
    let mut current = high >> 1;
    loop {
        if values[(current + 1) * step] <= target {
            low = current + 1;
        } else {
            high = current;
        }
        if low == high {
            return (low + 1) * step;
        }
        current = (low + high) >> 1;
    }
}

/// Returns the first record index whose time is greater than `target`, or `None`.
pub fn linear_search(values: &[f32], target: f32, step: usize) -> Option<usize> {
    (0..values.len())
        .step_by(step.max(1))
        .take_while(|&i| i + step <= values.len())
        .find(|&i| values[i] > target)
}
