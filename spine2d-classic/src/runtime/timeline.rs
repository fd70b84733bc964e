use crate::math::wrap_degrees;
use crate::{AttachmentId, Event, Skeleton, binary_search};

pub const BEZIER_SIZE: usize = 10 * 2 - 1;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CurveType {
    Linear,
    Stepped,
    Bezier,
}

const LINEAR: f32 = 0.0;
const STEPPED: f32 = 1.0;
const BEZIER: f32 = 2.0;

/// Per-frame easing shared by all interpolated timelines.
///
/// Each transition between two keys owns `BEZIER_SIZE` floats: a type tag followed by nine
/// precomputed (x, y) points of the cubic Bezier, so sampling is a short linear scan.
#[derive(Clone, Debug)]
pub struct CurveTimeline {
    curves: Vec<f32>,
}

impl CurveTimeline {
    pub fn new(frame_count: usize) -> Self {
        Self {
            curves: vec![LINEAR; frame_count.saturating_sub(1) * BEZIER_SIZE],
        }
    }

    pub fn frame_count(&self) -> usize {
        self.curves.len() / BEZIER_SIZE + 1
    }

    pub fn set_linear(&mut self, frame_index: usize) {
        if let Some(tag) = self.curves.get_mut(frame_index * BEZIER_SIZE) {
            *tag = LINEAR;
        }
    }

    pub fn set_stepped(&mut self, frame_index: usize) {
        if let Some(tag) = self.curves.get_mut(frame_index * BEZIER_SIZE) {
            *tag = STEPPED;
        }
    }

    pub fn curve_type(&self, frame_index: usize) -> CurveType {
        match self.curves.get(frame_index * BEZIER_SIZE).copied() {
            None => CurveType::Linear,
            Some(tag) if tag == LINEAR => CurveType::Linear,
            Some(tag) if tag == STEPPED => CurveType::Stepped,
            Some(_) => CurveType::Bezier,
        }
    }

    /// Sets the control handles of the Bezier used between `frame_index` and the next key.
    /// `cx1`/`cx2` are fractions of the time between the keys, `cy1`/`cy2` fractions of the
    /// value difference.
    pub fn set_curve(&mut self, frame_index: usize, cx1: f32, cy1: f32, cx2: f32, cy2: f32) {
        let start = frame_index * BEZIER_SIZE;
        let Some(curve) = self.curves.get_mut(start..start + BEZIER_SIZE) else {
            return;
        };

        let tmpx = (-cx1 * 2.0 + cx2) * 0.03;
        let tmpy = (-cy1 * 2.0 + cy2) * 0.03;
        let dddfx = ((cx1 - cx2) * 3.0 + 1.0) * 0.006;
        let dddfy = ((cy1 - cy2) * 3.0 + 1.0) * 0.006;
        let mut ddfx = tmpx * 2.0 + dddfx;
        let mut ddfy = tmpy * 2.0 + dddfy;
        let mut dfx = cx1 * 0.3 + tmpx + dddfx * 0.16666667;
        let mut dfy = cy1 * 0.3 + tmpy + dddfy * 0.16666667;

        curve[0] = BEZIER;
        let mut x = dfx;
        let mut y = dfy;
        for point in curve[1..].chunks_exact_mut(2) {
            point[0] = x;
            point[1] = y;
            dfx += ddfx;
            dfy += ddfy;
            ddfx += dddfx;
            ddfy += dddfy;
            x += dfx;
            y += dfy;
        }
    }

    pub fn curve_percent(&self, frame_index: usize, percent: f32) -> f32 {
        let percent = crate::math::clamp(percent, 0.0, 1.0);
        let start = frame_index * BEZIER_SIZE;
        let Some(curve) = self.curves.get(start..start + BEZIER_SIZE) else {
            return percent;
        };
        if curve[0] == LINEAR {
            return percent;
        }
        if curve[0] == STEPPED {
            return 0.0;
        }

        let points = &curve[1..];
        let mut x = 0.0;
        let mut i = 0;
        while i < points.len() {
            x = points[i];
            if x >= percent {
                let (prev_x, prev_y) = if i == 0 {
                    (0.0, 0.0)
                } else {
                    (points[i - 2], points[i - 1])
                };
                return prev_y + (points[i + 1] - prev_y) * (percent - prev_x) / (x - prev_x);
            }
            i += 2;
        }
        // The curve ends at (1, 1).
        let y = points[points.len() - 1];
        y + (1.0 - y) * (percent - x) / (1.0 - x)
    }
}

/// Finds the key pair enclosing `time` and the eased interpolation percent between them.
/// Returns the index of the later key's record.
fn interpolate(curves: &CurveTimeline, frames: &[f32], entries: usize, time: f32) -> (usize, f32) {
    let frame = binary_search(frames, time, entries);
    let frame_time = frames[frame];
    let prev_time = frames[frame - entries];
    let percent = curves.curve_percent(
        frame / entries - 1,
        1.0 - (time - frame_time) / (prev_time - frame_time),
    );
    (frame, percent)
}

#[derive(Clone, Debug)]
pub struct RotateTimeline {
    pub bone_index: usize,
    /// time, degrees, ...
    pub frames: Vec<f32>,
    pub curves: CurveTimeline,
}

impl RotateTimeline {
    pub const ENTRIES: usize = 2;

    pub fn new(frame_count: usize, bone_index: usize) -> Self {
        Self {
            bone_index,
            frames: vec![0.0; frame_count * Self::ENTRIES],
            curves: CurveTimeline::new(frame_count),
        }
    }

    pub fn set_frame(&mut self, frame_index: usize, time: f32, degrees: f32) {
        let i = frame_index * Self::ENTRIES;
        self.frames[i] = time;
        self.frames[i + 1] = degrees;
    }

    pub fn apply(&self, skeleton: &mut Skeleton, time: f32, alpha: f32) {
        let frames = &self.frames;
        if frames.is_empty() || time < frames[0] {
            return;
        }
        let Some(setup) = skeleton.data.bones.get(self.bone_index).map(|b| b.rotation) else {
            return;
        };
        let bone = &mut skeleton.bones[self.bone_index];

        let n = frames.len();
        if time >= frames[n - Self::ENTRIES] {
            let amount = wrap_degrees(setup + frames[n - 1] - bone.rotation);
            bone.rotation += amount * alpha;
            return;
        }

        let (frame, percent) = interpolate(&self.curves, frames, Self::ENTRIES, time);
        let prev_rotation = frames[frame - 1];
        let amount = wrap_degrees(frames[frame + 1] - prev_rotation);
        let amount = wrap_degrees(setup + (prev_rotation + amount * percent) - bone.rotation);
        bone.rotation += amount * alpha;
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TranslateKind {
    Translate,
    Scale,
    Shear,
}

/// Two-value bone timeline. Translate and shear key offsets from the setup pose, scale keys a
/// multiplier of it.
#[derive(Clone, Debug)]
pub struct TranslateTimeline {
    pub kind: TranslateKind,
    pub bone_index: usize,
    /// time, x, y, ...
    pub frames: Vec<f32>,
    pub curves: CurveTimeline,
}

pub type ScaleTimeline = TranslateTimeline;
pub type ShearTimeline = TranslateTimeline;

impl TranslateTimeline {
    pub const ENTRIES: usize = 3;

    pub fn new(kind: TranslateKind, frame_count: usize, bone_index: usize) -> Self {
        Self {
            kind,
            bone_index,
            frames: vec![0.0; frame_count * Self::ENTRIES],
            curves: CurveTimeline::new(frame_count),
        }
    }

    pub fn set_frame(&mut self, frame_index: usize, time: f32, x: f32, y: f32) {
        let i = frame_index * Self::ENTRIES;
        self.frames[i] = time;
        self.frames[i + 1] = x;
        self.frames[i + 2] = y;
    }

    pub fn apply(&self, skeleton: &mut Skeleton, time: f32, alpha: f32) {
        let frames = &self.frames;
        if frames.is_empty() || time < frames[0] {
            return;
        }
        let Some(data) = skeleton.data.bones.get(self.bone_index) else {
            return;
        };
        let (x, y) = if time >= frames[frames.len() - Self::ENTRIES] {
            let n = frames.len();
            (frames[n - 2], frames[n - 1])
        } else {
            let (frame, percent) = interpolate(&self.curves, frames, Self::ENTRIES, time);
            let prev_x = frames[frame - 2];
            let prev_y = frames[frame - 1];
            (
                prev_x + (frames[frame + 1] - prev_x) * percent,
                prev_y + (frames[frame + 2] - prev_y) * percent,
            )
        };

        let bone = &mut skeleton.bones[self.bone_index];
        match self.kind {
            TranslateKind::Translate => {
                bone.x += (data.x + x - bone.x) * alpha;
                bone.y += (data.y + y - bone.y) * alpha;
            }
            TranslateKind::Scale => {
                bone.scale_x += (data.scale_x * x - bone.scale_x) * alpha;
                bone.scale_y += (data.scale_y * y - bone.scale_y) * alpha;
            }
            TranslateKind::Shear => {
                bone.shear_x += (data.shear_x + x - bone.shear_x) * alpha;
                bone.shear_y += (data.shear_y + y - bone.shear_y) * alpha;
            }
        }
    }
}

#[derive(Clone, Debug)]
pub struct ColorTimeline {
    pub slot_index: usize,
    /// time, r, g, b, a, ...
    pub frames: Vec<f32>,
    pub curves: CurveTimeline,
}

impl ColorTimeline {
    pub const ENTRIES: usize = 5;

    pub fn new(frame_count: usize, slot_index: usize) -> Self {
        Self {
            slot_index,
            frames: vec![0.0; frame_count * Self::ENTRIES],
            curves: CurveTimeline::new(frame_count),
        }
    }

    pub fn set_frame(&mut self, frame_index: usize, time: f32, r: f32, g: f32, b: f32, a: f32) {
        let i = frame_index * Self::ENTRIES;
        self.frames[i..i + Self::ENTRIES].copy_from_slice(&[time, r, g, b, a]);
    }

    pub fn apply(&self, skeleton: &mut Skeleton, time: f32, alpha: f32) {
        let frames = &self.frames;
        if frames.is_empty() || time < frames[0] {
            return;
        }
        let [r, g, b, a] = if time >= frames[frames.len() - Self::ENTRIES] {
            let n = frames.len();
            [frames[n - 4], frames[n - 3], frames[n - 2], frames[n - 1]]
        } else {
            let (frame, percent) = interpolate(&self.curves, frames, Self::ENTRIES, time);
            let mut out = [0.0; 4];
            for (c, value) in out.iter_mut().enumerate() {
                let prev = frames[frame - 4 + c];
                *value = prev + (frames[frame + 1 + c] - prev) * percent;
            }
            out
        };

        let Some(slot) = skeleton.slots.get_mut(self.slot_index) else {
            return;
        };
        let color = &mut slot.color;
        if alpha < 1.0 {
            color.add(
                (r - color.r) * alpha,
                (g - color.g) * alpha,
                (b - color.b) * alpha,
                (a - color.a) * alpha,
            );
        } else {
            color.set(r, g, b, a);
        }
    }
}

#[derive(Clone, Debug)]
pub struct AttachmentTimeline {
    pub slot_index: usize,
    pub frames: Vec<f32>,
    pub attachment_names: Vec<Option<String>>,
}

impl AttachmentTimeline {
    pub fn new(frame_count: usize, slot_index: usize) -> Self {
        Self {
            slot_index,
            frames: vec![0.0; frame_count],
            attachment_names: vec![None; frame_count],
        }
    }

    pub fn set_frame(&mut self, frame_index: usize, time: f32, attachment_name: Option<String>) {
        self.frames[frame_index] = time;
        self.attachment_names[frame_index] = attachment_name;
    }

    pub fn apply(&self, skeleton: &mut Skeleton, time: f32) {
        let frames = &self.frames;
        if frames.is_empty() || time < frames[0] {
            return;
        }
        let frame_index = if time >= frames[frames.len() - 1] {
            frames.len() - 1
        } else {
            binary_search(frames, time, 1) - 1
        };

        let attachment = self.attachment_names[frame_index]
            .as_deref()
            .and_then(|name| skeleton.attachment(self.slot_index, name));
        skeleton.set_slot_attachment(self.slot_index, attachment);
    }
}

/// Keys per-vertex offsets of one vertex attachment. Values are in deform layout: one x/y pair per
/// vertex, or per bone influence for weighted vertices.
#[derive(Clone, Debug)]
pub struct DeformTimeline {
    pub slot_index: usize,
    pub attachment: AttachmentId,
    pub frames: Vec<f32>,
    pub frame_vertices: Vec<Vec<f32>>,
    pub curves: CurveTimeline,
}

impl DeformTimeline {
    pub fn new(frame_count: usize, slot_index: usize, attachment: AttachmentId) -> Self {
        Self {
            slot_index,
            attachment,
            frames: vec![0.0; frame_count],
            frame_vertices: vec![Vec::new(); frame_count],
            curves: CurveTimeline::new(frame_count),
        }
    }

    pub fn set_frame(&mut self, frame_index: usize, time: f32, vertices: Vec<f32>) {
        self.frames[frame_index] = time;
        self.frame_vertices[frame_index] = vertices;
    }

    pub fn apply(&self, skeleton: &mut Skeleton, time: f32, mut alpha: f32) {
        let Some(slot) = skeleton.slots.get(self.slot_index) else {
            return;
        };
        let Some(current) = slot.attachment() else {
            return;
        };
        let Some(attachment) = skeleton.data.attachment(current) else {
            return;
        };
        if attachment.vertices().is_none() {
            if current == self.attachment {
                log::warn!(
                    "deform timeline on slot {} targets attachment '{}', which has no vertices",
                    self.slot_index,
                    attachment.name()
                );
            }
            return;
        }
        if !attachment.applies_deform(current, self.attachment) {
            return;
        }

        let frames = &self.frames;
        if frames.is_empty() || time < frames[0] {
            return;
        }

        let vertex_count = self.frame_vertices[0].len();
        let vertices = &mut skeleton.slots[self.slot_index].attachment_vertices;
        if vertices.len() != vertex_count {
            // Uninitialized slot vertices can't be mixed from.
            alpha = 1.0;
        }
        vertices.resize(vertex_count, 0.0);

        if time >= frames[frames.len() - 1] {
            let last = &self.frame_vertices[frames.len() - 1];
            if alpha < 1.0 {
                for (v, &target) in vertices.iter_mut().zip(last) {
                    *v += (target - *v) * alpha;
                }
            } else {
                vertices.copy_from_slice(&last[..vertex_count]);
            }
            return;
        }

        let frame = binary_search(frames, time, 1);
        let prev_vertices = &self.frame_vertices[frame - 1];
        let next_vertices = &self.frame_vertices[frame];
        let frame_time = frames[frame];
        let percent = self.curves.curve_percent(
            frame - 1,
            1.0 - (time - frame_time) / (frames[frame - 1] - frame_time),
        );

        for (i, v) in vertices.iter_mut().enumerate() {
            let prev = prev_vertices[i];
            let value = prev + (next_vertices[i] - prev) * percent;
            if alpha < 1.0 {
                *v += (value - *v) * alpha;
            } else {
                *v = value;
            }
        }
    }
}

#[derive(Clone, Debug)]
pub struct DrawOrderTimeline {
    pub frames: Vec<f32>,
    /// Per key, the slot index drawn at each position. `None` restores setup order.
    pub draw_orders: Vec<Option<Vec<usize>>>,
}

impl DrawOrderTimeline {
    pub fn new(frame_count: usize) -> Self {
        Self {
            frames: vec![0.0; frame_count],
            draw_orders: vec![None; frame_count],
        }
    }

    pub fn set_frame(&mut self, frame_index: usize, time: f32, draw_order: Option<Vec<usize>>) {
        self.frames[frame_index] = time;
        self.draw_orders[frame_index] = draw_order;
    }

    pub fn apply(&self, skeleton: &mut Skeleton, time: f32) {
        let frames = &self.frames;
        if frames.is_empty() || time < frames[0] {
            return;
        }
        let frame = if time >= frames[frames.len() - 1] {
            frames.len() - 1
        } else {
            binary_search(frames, time, 1) - 1
        };

        match &self.draw_orders[frame] {
            None => {
                for (i, slot) in skeleton.draw_order.iter_mut().enumerate() {
                    *slot = i;
                }
            }
            Some(order) => {
                for (dst, &src) in skeleton.draw_order.iter_mut().zip(order) {
                    *dst = src;
                }
            }
        }
    }
}

#[derive(Clone, Debug)]
pub struct EventTimeline {
    pub frames: Vec<f32>,
    pub events: Vec<Event>,
}

impl EventTimeline {
    pub fn new(frame_count: usize) -> Self {
        Self {
            frames: vec![0.0; frame_count],
            events: Vec::with_capacity(frame_count),
        }
    }

    /// Keys are expected in time order; `event.time` is the key time.
    pub fn set_frame(&mut self, frame_index: usize, event: Event) {
        self.frames[frame_index] = event.time;
        if frame_index < self.events.len() {
            self.events[frame_index] = event;
        } else {
            self.events.push(event);
        }
    }

    /// Collects every event with `last_time < event.time <= time`, wrapping once when
    /// `last_time > time` (a looped animation crossed its end).
    pub fn apply(&self, last_time: f32, time: f32, fired: &mut Vec<Event>) {
        let frames = &self.frames;
        let frame_count = frames.len();
        if frame_count == 0 {
            return;
        }

        let mut last_time = last_time;
        if last_time > time {
            self.apply(last_time, f32::MAX, fired);
            last_time = -1.0;
        } else if last_time >= frames[frame_count - 1] {
            return;
        }
        if time < frames[0] {
            return;
        }

        let mut frame = if last_time < frames[0] {
            0
        } else {
            let mut frame = binary_search(frames, last_time, 1);
            let frame_time = frames[frame];
            // Fire every event sharing the same key time.
            while frame > 0 && frames[frame - 1] == frame_time {
                frame -= 1;
            }
            frame
        };
        while frame < frame_count && time >= frames[frame] {
            fired.push(self.events[frame].clone());
            frame += 1;
        }
    }
}

#[derive(Clone, Debug)]
pub struct IkConstraintTimeline {
    pub ik_constraint_index: usize,
    /// time, mix, bend direction, ...
    pub frames: Vec<f32>,
    pub curves: CurveTimeline,
}

impl IkConstraintTimeline {
    pub const ENTRIES: usize = 3;

    pub fn new(frame_count: usize, ik_constraint_index: usize) -> Self {
        Self {
            ik_constraint_index,
            frames: vec![0.0; frame_count * Self::ENTRIES],
            curves: CurveTimeline::new(frame_count),
        }
    }

    pub fn set_frame(&mut self, frame_index: usize, time: f32, mix: f32, bend_direction: i32) {
        let i = frame_index * Self::ENTRIES;
        self.frames[i] = time;
        self.frames[i + 1] = mix;
        self.frames[i + 2] = bend_direction as f32;
    }

    pub fn apply(&self, skeleton: &mut Skeleton, time: f32, alpha: f32) {
        let frames = &self.frames;
        if frames.is_empty() || time < frames[0] {
            return;
        }
        let Some(constraint) = skeleton.ik_constraints.get_mut(self.ik_constraint_index) else {
            return;
        };

        let n = frames.len();
        if time >= frames[n - Self::ENTRIES] {
            constraint.mix += (frames[n - 2] - constraint.mix) * alpha;
            constraint.bend_direction = frames[n - 1].floor() as i32;
            return;
        }

        let (frame, percent) = interpolate(&self.curves, frames, Self::ENTRIES, time);
        let mix = frames[frame - 2];
        constraint.mix += (mix + (frames[frame + 1] - mix) * percent - constraint.mix) * alpha;
        // Bend direction is not interpolated; it holds the previous key's value.
        constraint.bend_direction = frames[frame - 1].floor() as i32;
    }
}

#[derive(Clone, Debug)]
pub struct TransformConstraintTimeline {
    pub transform_constraint_index: usize,
    /// time, rotate mix, translate mix, scale mix, shear mix, ...
    pub frames: Vec<f32>,
    pub curves: CurveTimeline,
}

impl TransformConstraintTimeline {
    pub const ENTRIES: usize = 5;

    pub fn new(frame_count: usize, transform_constraint_index: usize) -> Self {
        Self {
            transform_constraint_index,
            frames: vec![0.0; frame_count * Self::ENTRIES],
            curves: CurveTimeline::new(frame_count),
        }
    }

    pub fn set_frame(
        &mut self,
        frame_index: usize,
        time: f32,
        rotate_mix: f32,
        translate_mix: f32,
        scale_mix: f32,
        shear_mix: f32,
    ) {
        let i = frame_index * Self::ENTRIES;
        self.frames[i..i + Self::ENTRIES]
            .copy_from_slice(&[time, rotate_mix, translate_mix, scale_mix, shear_mix]);
    }

    pub fn apply(&self, skeleton: &mut Skeleton, time: f32, alpha: f32) {
        let frames = &self.frames;
        if frames.is_empty() || time < frames[0] {
            return;
        }
        let mixes = if time >= frames[frames.len() - Self::ENTRIES] {
            let n = frames.len();
            [frames[n - 4], frames[n - 3], frames[n - 2], frames[n - 1]]
        } else {
            let (frame, percent) = interpolate(&self.curves, frames, Self::ENTRIES, time);
            let mut out = [0.0; 4];
            for (m, value) in out.iter_mut().enumerate() {
                let prev = frames[frame - 4 + m];
                *value = prev + (frames[frame + 1 + m] - prev) * percent;
            }
            out
        };

        let Some(constraint) = skeleton
            .transform_constraints
            .get_mut(self.transform_constraint_index)
        else {
            return;
        };
        constraint.rotate_mix += (mixes[0] - constraint.rotate_mix) * alpha;
        constraint.translate_mix += (mixes[1] - constraint.translate_mix) * alpha;
        constraint.scale_mix += (mixes[2] - constraint.scale_mix) * alpha;
        constraint.shear_mix += (mixes[3] - constraint.shear_mix) * alpha;
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PathConstraintProperty {
    Position,
    Spacing,
}

/// Keys either the position or the spacing of a path constraint.
#[derive(Clone, Debug)]
pub struct PathConstraintPositionTimeline {
    pub property: PathConstraintProperty,
    pub path_constraint_index: usize,
    /// time, value, ...
    pub frames: Vec<f32>,
    pub curves: CurveTimeline,
}

pub type PathConstraintSpacingTimeline = PathConstraintPositionTimeline;

impl PathConstraintPositionTimeline {
    pub const ENTRIES: usize = 2;

    pub fn new(
        property: PathConstraintProperty,
        frame_count: usize,
        path_constraint_index: usize,
    ) -> Self {
        Self {
            property,
            path_constraint_index,
            frames: vec![0.0; frame_count * Self::ENTRIES],
            curves: CurveTimeline::new(frame_count),
        }
    }

    pub fn set_frame(&mut self, frame_index: usize, time: f32, value: f32) {
        let i = frame_index * Self::ENTRIES;
        self.frames[i] = time;
        self.frames[i + 1] = value;
    }

    pub fn apply(&self, skeleton: &mut Skeleton, time: f32, alpha: f32) {
        let frames = &self.frames;
        if frames.is_empty() || time < frames[0] {
            return;
        }
        let value = if time >= frames[frames.len() - Self::ENTRIES] {
            frames[frames.len() - 1]
        } else {
            let (frame, percent) = interpolate(&self.curves, frames, Self::ENTRIES, time);
            let prev = frames[frame - 1];
            prev + (frames[frame + 1] - prev) * percent
        };

        let Some(constraint) = skeleton.path_constraints.get_mut(self.path_constraint_index) else {
            return;
        };
        let target = match self.property {
            PathConstraintProperty::Position => &mut constraint.position,
            PathConstraintProperty::Spacing => &mut constraint.spacing,
        };
        *target += (value - *target) * alpha;
    }
}

#[derive(Clone, Debug)]
pub struct PathConstraintMixTimeline {
    pub path_constraint_index: usize,
    /// time, rotate mix, translate mix, ...
    pub frames: Vec<f32>,
    pub curves: CurveTimeline,
}

impl PathConstraintMixTimeline {
    pub const ENTRIES: usize = 3;

    pub fn new(frame_count: usize, path_constraint_index: usize) -> Self {
        Self {
            path_constraint_index,
            frames: vec![0.0; frame_count * Self::ENTRIES],
            curves: CurveTimeline::new(frame_count),
        }
    }

    pub fn set_frame(&mut self, frame_index: usize, time: f32, rotate_mix: f32, translate_mix: f32) {
        let i = frame_index * Self::ENTRIES;
        self.frames[i] = time;
        self.frames[i + 1] = rotate_mix;
        self.frames[i + 2] = translate_mix;
    }

    pub fn apply(&self, skeleton: &mut Skeleton, time: f32, alpha: f32) {
        let frames = &self.frames;
        if frames.is_empty() || time < frames[0] {
            return;
        }
        let (rotate, translate) = if time >= frames[frames.len() - Self::ENTRIES] {
            let n = frames.len();
            (frames[n - 2], frames[n - 1])
        } else {
            let (frame, percent) = interpolate(&self.curves, frames, Self::ENTRIES, time);
            let rotate = frames[frame - 2];
            let translate = frames[frame - 1];
            (
                rotate + (frames[frame + 1] - rotate) * percent,
                translate + (frames[frame + 2] - translate) * percent,
            )
        };

        let Some(constraint) = skeleton.path_constraints.get_mut(self.path_constraint_index) else {
            return;
        };
        constraint.rotate_mix += (rotate - constraint.rotate_mix) * alpha;
        constraint.translate_mix += (translate - constraint.translate_mix) * alpha;
    }
}

#[derive(Clone, Debug)]
pub enum Timeline {
    Rotate(RotateTimeline),
    Translate(TranslateTimeline),
    Color(ColorTimeline),
    Attachment(AttachmentTimeline),
    Deform(DeformTimeline),
    DrawOrder(DrawOrderTimeline),
    Event(EventTimeline),
    IkConstraint(IkConstraintTimeline),
    TransformConstraint(TransformConstraintTimeline),
    PathConstraintPosition(PathConstraintPositionTimeline),
    PathConstraintMix(PathConstraintMixTimeline),
}

impl Timeline {
    /// Applies the timeline at `time`, blending the keyed value over the current pose by `alpha`.
    /// Event timelines push into `events` when given; other discrete timelines ignore `alpha`.
    pub fn apply(
        &self,
        skeleton: &mut Skeleton,
        last_time: f32,
        time: f32,
        events: Option<&mut Vec<Event>>,
        alpha: f32,
    ) {
        match self {
            Timeline::Rotate(t) => t.apply(skeleton, time, alpha),
            Timeline::Translate(t) => t.apply(skeleton, time, alpha),
            Timeline::Color(t) => t.apply(skeleton, time, alpha),
            Timeline::Attachment(t) => t.apply(skeleton, time),
            Timeline::Deform(t) => t.apply(skeleton, time, alpha),
            Timeline::DrawOrder(t) => t.apply(skeleton, time),
            Timeline::Event(t) => {
                if let Some(events) = events {
                    t.apply(last_time, time, events);
                }
            }
            Timeline::IkConstraint(t) => t.apply(skeleton, time, alpha),
            Timeline::TransformConstraint(t) => t.apply(skeleton, time, alpha),
            Timeline::PathConstraintPosition(t) => t.apply(skeleton, time, alpha),
            Timeline::PathConstraintMix(t) => t.apply(skeleton, time, alpha),
        }
    }

    pub fn frames(&self) -> &[f32] {
        match self {
            Timeline::Rotate(t) => &t.frames,
            Timeline::Translate(t) => &t.frames,
            Timeline::Color(t) => &t.frames,
            Timeline::Attachment(t) => &t.frames,
            Timeline::Deform(t) => &t.frames,
            Timeline::DrawOrder(t) => &t.frames,
            Timeline::Event(t) => &t.frames,
            Timeline::IkConstraint(t) => &t.frames,
            Timeline::TransformConstraint(t) => &t.frames,
            Timeline::PathConstraintPosition(t) => &t.frames,
            Timeline::PathConstraintMix(t) => &t.frames,
        }
    }

    fn entries(&self) -> usize {
        match self {
            Timeline::Rotate(_) => RotateTimeline::ENTRIES,
            Timeline::Translate(_) => TranslateTimeline::ENTRIES,
            Timeline::Color(_) => ColorTimeline::ENTRIES,
            Timeline::IkConstraint(_) => IkConstraintTimeline::ENTRIES,
            Timeline::TransformConstraint(_) => TransformConstraintTimeline::ENTRIES,
            Timeline::PathConstraintPosition(_) => PathConstraintPositionTimeline::ENTRIES,
            Timeline::PathConstraintMix(_) => PathConstraintMixTimeline::ENTRIES,
            Timeline::Attachment(_)
            | Timeline::Deform(_)
            | Timeline::DrawOrder(_)
            | Timeline::Event(_) => 1,
        }
    }

    pub fn frame_count(&self) -> usize {
        self.frames().len() / self.entries()
    }

    /// Time of the last key, or 0 for an empty timeline.
    pub fn duration(&self) -> f32 {
        let frames = self.frames();
        let entries = self.entries();
        if frames.len() < entries {
            return 0.0;
        }
        frames[frames.len() - entries]
    }
}
