use crate::math::{DEG_RAD, PI, RAD_DEG, wrap_degrees, wrap_radians};
use crate::{
    AttachmentData, IkConstraintData, LocalTransform, PathAttachmentData, PathConstraintData,
    PositionMode, RotateMode, Skeleton, SpacingMode, TransformConstraintData, Vector2,
};
use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct IkConstraint {
    data_index: usize,
    pub bones: Vec<usize>,
    pub target: usize,
    pub mix: f32,
    /// `1` or `-1`.
    pub bend_direction: i32,
}

impl IkConstraint {
    pub(crate) fn new(data_index: usize, data: &IkConstraintData) -> Self {
        Self {
            data_index,
            bones: data.bones.clone(),
            target: data.target,
            mix: data.mix,
            bend_direction: data.bend_direction,
        }
    }

    pub fn data_index(&self) -> usize {
        self.data_index
    }
}

#[derive(Clone, Debug)]
pub struct TransformConstraint {
    data_index: usize,
    pub bones: Vec<usize>,
    pub target: usize,
    pub rotate_mix: f32,
    pub translate_mix: f32,
    pub scale_mix: f32,
    pub shear_mix: f32,
}

impl TransformConstraint {
    pub(crate) fn new(data_index: usize, data: &TransformConstraintData) -> Self {
        Self {
            data_index,
            bones: data.bones.clone(),
            target: data.target,
            rotate_mix: data.rotate_mix,
            translate_mix: data.translate_mix,
            scale_mix: data.scale_mix,
            shear_mix: data.shear_mix,
        }
    }

    pub fn data_index(&self) -> usize {
        self.data_index
    }
}

#[derive(Clone, Debug, Default)]
struct PathScratch {
    spaces: Vec<f32>,
    positions: Vec<f32>,
    world: Vec<f32>,
    curves: Vec<f32>,
    lengths: Vec<f32>,
    segments: [f32; 10],
}

#[derive(Clone, Debug)]
pub struct PathConstraint {
    data_index: usize,
    pub bones: Vec<usize>,
    pub target: usize, // slot index
    pub position: f32,
    pub spacing: f32,
    pub rotate_mix: f32,
    pub translate_mix: f32,
    scratch: PathScratch,
}

impl PathConstraint {
    pub(crate) fn new(data_index: usize, data: &PathConstraintData) -> Self {
        Self {
            data_index,
            bones: data.bones.clone(),
            target: data.target,
            position: data.position,
            spacing: data.spacing,
            rotate_mix: data.rotate_mix,
            translate_mix: data.translate_mix,
            scratch: PathScratch::default(),
        }
    }

    pub fn data_index(&self) -> usize {
        self.data_index
    }
}

/// World matrix and origin of a bone's parent, or identity at the origin for the root.
fn parent_world(skeleton: &Skeleton, bone: usize) -> (f32, f32, f32, f32, f32, f32) {
    match skeleton.bones[bone].parent_index() {
        Some(p) => {
            let pp = &skeleton.bones[p];
            (pp.a, pp.b, pp.c, pp.d, pp.world_x, pp.world_y)
        }
        None => (1.0, 0.0, 0.0, 1.0, 0.0, 0.0),
    }
}

const IK_EPSILON: f32 = 0.0001;

pub(crate) fn apply_ik_constraint(skeleton: &mut Skeleton, index: usize) {
    let Some(constraint) = skeleton.ik_constraints.get(index) else {
        return;
    };
    let Some(target) = skeleton.bones.get(constraint.target) else {
        return;
    };
    let (target_x, target_y) = (target.world_x, target.world_y);
    let mix = constraint.mix;
    let bend = constraint.bend_direction;
    let bones = constraint.bones.clone();
    match *bones.as_slice() {
        [bone] => apply_ik_one(skeleton, bone, target_x, target_y, mix),
        [parent, child] => apply_ik_two(skeleton, parent, child, target_x, target_y, bend, mix),
        _ => log::warn!("ik constraint {index} has {} bones; expected 1 or 2", bones.len()),
    }
}

/// Rotates `bone` so it points at the target, blended by `alpha`.
pub fn apply_ik_one(skeleton: &mut Skeleton, bone: usize, target_x: f32, target_y: f32, alpha: f32) {
    let (a, b, c, d, pwx, pwy) = parent_world(skeleton, bone);
    let local = skeleton.bones[bone].local_transform();
    let det = a * d - b * c;
    if det.abs() < IK_EPSILON {
        // A collapsed parent has no inverse to aim through.
        skeleton.update_bone_world_transform(bone);
        return;
    }
    let id = 1.0 / det;
    let x = target_x - pwx;
    let y = target_y - pwy;
    let tx = (x * d - y * b) * id - local.x;
    let ty = (y * a - x * c) * id - local.y;
    let mut rotation_ik = ty.atan2(tx) * RAD_DEG - local.shear_x - local.rotation;
    if local.scale_x < 0.0 {
        rotation_ik += 180.0;
    }
    let rotation_ik = wrap_degrees(rotation_ik);
    skeleton.update_bone_world_transform_with(
        bone,
        LocalTransform {
            rotation: local.rotation + rotation_ik * alpha,
            ..local
        },
    );
}

/// Bends a parent and its direct child so the child's tip reaches the target, blended by `alpha`.
/// `bend_direction` picks which of the two solutions to use.
pub fn apply_ik_two(
    skeleton: &mut Skeleton,
    parent: usize,
    child: usize,
    target_x: f32,
    target_y: f32,
    bend_direction: i32,
    alpha: f32,
) {
    if alpha == 0.0 {
        skeleton.update_bone_world_transform(child);
        return;
    }
    let bend_dir = bend_direction as f32;
    let parent_local = skeleton.bones[parent].local_transform();
    let child_local = skeleton.bones[child].local_transform();
    let (px, py) = (parent_local.x, parent_local.y);
    let mut psx = parent_local.scale_x;
    let mut psy = parent_local.scale_y;
    let mut csx = child_local.scale_x;

    let (os1, mut s2) = if psx < 0.0 {
        psx = -psx;
        (180.0, -1.0)
    } else {
        (0.0, 1.0)
    };
    if psy < 0.0 {
        psy = -psy;
        s2 = -s2;
    }
    let os2 = if csx < 0.0 {
        csx = -csx;
        180.0
    } else {
        0.0
    };

    let pb = &skeleton.bones[parent];
    let cx = child_local.x;
    let uniform = (psx - psy).abs() <= 0.0001;
    let (cy, cwx, cwy) = if uniform {
        let cy = child_local.y;
        (cy, pb.a * cx + pb.b * cy + pb.world_x, pb.c * cx + pb.d * cy + pb.world_y)
    } else {
        (0.0, pb.a * cx + pb.world_x, pb.c * cx + pb.world_y)
    };

    let (a, b, c, d, ppx, ppy) = parent_world(skeleton, parent);
    let det = a * d - b * c;
    if det.abs() < IK_EPSILON {
        skeleton.update_bone_world_transform(parent);
        skeleton.update_bone_world_transform(child);
        return;
    }
    let id = 1.0 / det;
    let x = target_x - ppx;
    let y = target_y - ppy;
    let tx = (x * d - y * b) * id - px;
    let ty = (y * a - x * c) * id - py;
    let x = cwx - ppx;
    let y = cwy - ppy;
    let dx = (x * d - y * b) * id - px;
    let dy = (y * a - x * c) * id - py;
    let l1 = (dx * dx + dy * dy).sqrt();
    let child_length = skeleton
        .data
        .bones
        .get(skeleton.bones[child].data_index())
        .map(|b| b.length)
        .unwrap_or(0.0);
    let mut l2 = child_length * csx;
    if l1 < IK_EPSILON || l2 < IK_EPSILON {
        // No triangle to solve: aim the parent and let the child follow.
        apply_ik_one(skeleton, parent, target_x, target_y, alpha);
        skeleton.update_bone_world_transform(child);
        return;
    }

    let (a1, a2) = if uniform {
        l2 *= psx;
        let cos = ((tx * tx + ty * ty - l1 * l1 - l2 * l2) / (2.0 * l1 * l2)).clamp(-1.0, 1.0);
        let a2 = cos.acos() * bend_dir;
        let a = l1 + l2 * cos;
        let b = l2 * a2.sin();
        ((ty * a - tx * b).atan2(tx * a + ty * b), a2)
    } else {
        solve_non_uniform(psx, psy, l1, l2, tx, ty, bend_dir)
    };
    if !a1.is_finite() || !a2.is_finite() {
        skeleton.update_bone_world_transform(parent);
        skeleton.update_bone_world_transform(child);
        return;
    }

    let os = cy.atan2(cx) * s2;
    let rotation = parent_local.rotation;
    let a1 = wrap_degrees((a1 - os) * RAD_DEG + os1 - rotation);
    skeleton.update_bone_world_transform_with(
        parent,
        LocalTransform {
            rotation: rotation + a1 * alpha,
            shear_x: 0.0,
            shear_y: 0.0,
            ..parent_local
        },
    );

    let rotation = child_local.rotation;
    let a2 = wrap_degrees(((a2 + os) * RAD_DEG - child_local.shear_x) * s2 + os2 - rotation);
    skeleton.update_bone_world_transform_with(
        child,
        LocalTransform {
            x: cx,
            y: cy,
            rotation: rotation + a2 * alpha,
            ..child_local
        },
    );
}

/// Two-bone solve when the parent is scaled non-uniformly: intersects the target circle with the
/// child's ellipse, falling back to the nearest or farthest reachable point.
fn solve_non_uniform(
    psx: f32,
    psy: f32,
    l1: f32,
    l2: f32,
    tx: f32,
    ty: f32,
    bend_dir: f32,
) -> (f32, f32) {
    let a = psx * l2;
    let b = psy * l2;
    let aa = a * a;
    let bb = b * b;
    let dd = tx * tx + ty * ty;
    let ta = ty.atan2(tx);
    let c = bb * l1 * l1 + aa * dd - aa * bb;
    let c1 = -2.0 * bb * l1;
    let c2 = bb - aa;
    let d = c1 * c1 - 4.0 * c2 * c;
    if d >= 0.0 {
        let mut q = d.sqrt();
        if c1 < 0.0 {
            q = -q;
        }
        q = -(c1 + q) * 0.5;
        let r0 = q / c2;
        let r1 = c / q;
        let r = if r0.abs() < r1.abs() { r0 } else { r1 };
        if r * r <= dd {
            let y = (dd - r * r).sqrt() * bend_dir;
            return (ta - y.atan2(r), (y / psy).atan2((r - l1) / psx));
        }
    }

    let mut min_angle = 0.0;
    let mut min_dist = f32::MAX;
    let mut min_x = 0.0;
    let mut min_y = 0.0;
    let mut max_angle = 0.0;
    let mut max_dist = 0.0;
    let mut max_x = 0.0;
    let mut max_y = 0.0;

    let x = l1 + a;
    let d = x * x;
    if d > max_dist {
        max_angle = 0.0;
        max_dist = d;
        max_x = x;
    }
    let x = l1 - a;
    let d = x * x;
    if d < min_dist {
        min_angle = PI;
        min_dist = d;
        min_x = x;
    }
    let angle = (-a * l1 / (aa - bb)).acos();
    let x = a * angle.cos() + l1;
    let y = b * angle.sin();
    let d = x * x + y * y;
    if d < min_dist {
        min_angle = angle;
        min_dist = d;
        min_x = x;
        min_y = y;
    }
    if d > max_dist {
        max_angle = angle;
        max_dist = d;
        max_x = x;
        max_y = y;
    }
    if dd <= (min_dist + max_dist) * 0.5 {
        (ta - (min_y * bend_dir).atan2(min_x), min_angle * bend_dir)
    } else {
        (ta - (max_y * bend_dir).atan2(max_x), max_angle * bend_dir)
    }
}

pub(crate) fn apply_transform_constraint(skeleton: &mut Skeleton, index: usize) {
    let data = Arc::clone(&skeleton.data);
    let Some(constraint) = skeleton.transform_constraints.get(index) else {
        return;
    };
    let Some(constraint_data) = data.transform_constraints.get(constraint.data_index) else {
        return;
    };
    let Some(target) = skeleton.bones.get(constraint.target).cloned() else {
        return;
    };
    let rotate_mix = constraint.rotate_mix;
    let translate_mix = constraint.translate_mix;
    let scale_mix = constraint.scale_mix;
    let shear_mix = constraint.shear_mix;
    let bones = constraint.bones.clone();
    let (ta, tb, tc, td) = (target.a, target.b, target.c, target.d);

    for bone_index in bones {
        let Some(bone) = skeleton.bones.get_mut(bone_index) else {
            continue;
        };

        if rotate_mix > 0.0 {
            let (a, b, c, d) = (bone.a, bone.b, bone.c, bone.d);
            let r = wrap_radians(
                tc.atan2(ta) - c.atan2(a) + constraint_data.offset_rotation * DEG_RAD,
            ) * rotate_mix;
            let (sin, cos) = r.sin_cos();
            bone.a = cos * a - sin * c;
            bone.b = cos * b - sin * d;
            bone.c = sin * a + cos * c;
            bone.d = sin * b + cos * d;
        }

        if translate_mix > 0.0 {
            let offset = target.local_to_world(Vector2::new(
                constraint_data.offset_x,
                constraint_data.offset_y,
            ));
            bone.world_x += (offset.x - bone.world_x) * translate_mix;
            bone.world_y += (offset.y - bone.world_y) * translate_mix;
        }

        if scale_mix > 0.0 {
            let bs = (bone.a * bone.a + bone.c * bone.c).sqrt();
            let ts = (ta * ta + tc * tc).sqrt();
            let s = if bs > 0.00001 {
                (bs + (ts - bs + constraint_data.offset_scale_x) * scale_mix) / bs
            } else {
                0.0
            };
            bone.a *= s;
            bone.c *= s;
            let bs = (bone.b * bone.b + bone.d * bone.d).sqrt();
            let ts = (tb * tb + td * td).sqrt();
            let s = if bs > 0.00001 {
                (bs + (ts - bs + constraint_data.offset_scale_y) * scale_mix) / bs
            } else {
                0.0
            };
            bone.b *= s;
            bone.d *= s;
        }

        if shear_mix > 0.0 {
            let (b, d) = (bone.b, bone.d);
            let by = d.atan2(b);
            let r = wrap_radians(td.atan2(tb) - tc.atan2(ta) - (by - bone.c.atan2(bone.a)));
            let r = by + (r + constraint_data.offset_shear_y * DEG_RAD) * shear_mix;
            let s = (b * b + d * d).sqrt();
            bone.b = r.cos() * s;
            bone.d = r.sin() * s;
        }
    }
}

const NONE: isize = -1;
const BEFORE: isize = -2;
const AFTER: isize = -3;

pub(crate) fn apply_path_constraint(skeleton: &mut Skeleton, index: usize) {
    let data = Arc::clone(&skeleton.data);
    let Some(constraint) = skeleton.path_constraints.get(index) else {
        return;
    };
    let Some(constraint_data) = data.path_constraints.get(constraint.data_index) else {
        return;
    };
    let attachment = skeleton
        .slots
        .get(constraint.target)
        .and_then(|slot| slot.attachment())
        .and_then(|id| data.attachment(id));
    let Some(AttachmentData::Path(path)) = attachment else {
        return;
    };
    let rotate_mix = constraint.rotate_mix;
    let translate_mix = constraint.translate_mix;
    let translate = translate_mix > 0.0;
    let rotate = rotate_mix > 0.0;
    if !translate && !rotate {
        return;
    }

    let mut scratch = std::mem::take(&mut skeleton.path_constraints[index].scratch);
    let bones = skeleton.path_constraints[index].bones.clone();

    let spacing_mode = constraint_data.spacing_mode;
    let length_spacing = spacing_mode == SpacingMode::Length;
    let rotate_mode = constraint_data.rotate_mode;
    let tangents = rotate_mode == RotateMode::Tangent;
    let scale = rotate_mode == RotateMode::ChainScale;
    let bone_count = bones.len();
    let spaces_count = if tangents { bone_count } else { bone_count + 1 };
    let spacing = skeleton.path_constraints[index].spacing;

    scratch.spaces.clear();
    scratch.spaces.resize(spaces_count, 0.0);
    if scale {
        scratch.lengths.clear();
        scratch.lengths.resize(bone_count, 0.0);
    }
    if scale || length_spacing {
        for i in 0..spaces_count.saturating_sub(1) {
            let bone = &skeleton.bones[bones[i]];
            let setup_length = data
                .bones
                .get(bone.data_index())
                .map(|b| b.length)
                .unwrap_or(0.0);
            let x = setup_length * bone.a;
            let y = setup_length * bone.c;
            let length = (x * x + y * y).sqrt();
            if scale {
                scratch.lengths[i] = length;
            }
            scratch.spaces[i + 1] = if length_spacing {
                (length + spacing).max(0.0)
            } else {
                spacing
            };
        }
    } else {
        for space in scratch.spaces.iter_mut().skip(1) {
            *space = spacing;
        }
    }

    compute_world_positions(
        skeleton,
        index,
        path,
        &mut scratch,
        spaces_count,
        tangents,
        constraint_data.position_mode == PositionMode::Percent,
        spacing_mode == SpacingMode::Percent,
    );

    let positions = &scratch.positions;
    let skeleton_x = skeleton.x;
    let skeleton_y = skeleton.y;
    let mut bone_x = positions[0];
    let mut bone_y = positions[1];
    let offset_rotation = constraint_data.offset_rotation;
    let tip = rotate_mode == RotateMode::Chain && offset_rotation == 0.0;
    let mut p = 3;
    for (i, &bone_index) in bones.iter().enumerate() {
        let setup_length = data
            .bones
            .get(skeleton.bones[bone_index].data_index())
            .map(|b| b.length)
            .unwrap_or(0.0);
        let bone = &mut skeleton.bones[bone_index];
        bone.world_x += (bone_x - skeleton_x - bone.world_x) * translate_mix;
        bone.world_y += (bone_y - skeleton_y - bone.world_y) * translate_mix;
        let x = positions[p];
        let y = positions[p + 1];
        let dx = x - bone_x;
        let dy = y - bone_y;
        if scale {
            let length = scratch.lengths[i];
            if length > 0.0 {
                let s = ((dx * dx + dy * dy).sqrt() / length - 1.0) * rotate_mix + 1.0;
                bone.a *= s;
                bone.c *= s;
            }
        }
        bone_x = x;
        bone_y = y;
        if rotate {
            let (a, b, c, d) = (bone.a, bone.b, bone.c, bone.d);
            let mut r = if tangents {
                positions[p - 1]
            } else if scratch.spaces[i + 1] == 0.0 {
                positions[p + 2]
            } else {
                dy.atan2(dx)
            };
            r -= c.atan2(a) - offset_rotation * DEG_RAD;
            if tip {
                let (sin, cos) = r.sin_cos();
                bone_x += (setup_length * (cos * a - sin * c) - dx) * rotate_mix;
                bone_y += (setup_length * (sin * a + cos * c) - dy) * rotate_mix;
            }
            let r = wrap_radians(r) * rotate_mix;
            let (sin, cos) = r.sin_cos();
            bone.a = cos * a - sin * c;
            bone.b = cos * b - sin * d;
            bone.c = sin * a + cos * c;
            bone.d = sin * b + cos * d;
        }
        p += 3;
    }

    skeleton.path_constraints[index].scratch = scratch;
}

/// Fills `scratch.positions` with `spaces_count` (x, y, rotation) samples along the path, plus a
/// trailing point for chain modes.
#[allow(clippy::too_many_arguments)]
fn compute_world_positions(
    skeleton: &Skeleton,
    index: usize,
    path: &PathAttachmentData,
    scratch: &mut PathScratch,
    spaces_count: usize,
    tangents: bool,
    percent_position: bool,
    percent_spacing: bool,
) {
    let constraint = &skeleton.path_constraints[index];
    let slot = constraint.target;
    let mut position = constraint.position;
    let out = &mut scratch.positions;
    out.clear();
    out.resize(spaces_count * 3 + 2, 0.0);
    let spaces = &mut scratch.spaces;
    let world = &mut scratch.world;
    let closed = path.closed;
    let mut vertices_length = path.vertices.world_vertices_length();
    let mut curve_count = (vertices_length / 6) as isize;
    let mut prev_curve = NONE;

    if !path.constant_speed {
        let lengths = &path.lengths;
        curve_count -= if closed { 1 } else { 2 };
        let Some(&path_length) = usize::try_from(curve_count)
            .ok()
            .and_then(|c| lengths.get(c))
        else {
            return;
        };
        if percent_position {
            position *= path_length;
        }
        if percent_spacing {
            for space in spaces.iter_mut() {
                *space *= path_length;
            }
        }
        world.clear();
        world.resize(8, 0.0);
        let mut curve = 0usize;
        for i in 0..spaces_count {
            let o = i * 3;
            let space = spaces[i];
            position += space;
            let mut p = position;

            if closed {
                p %= path_length;
                if p < 0.0 {
                    p += path_length;
                }
                curve = 0;
            } else if p < 0.0 {
                if prev_curve != BEFORE {
                    prev_curve = BEFORE;
                    skeleton.compute_world_vertices(slot, &path.vertices, 2, 4, world, 0);
                }
                add_before_position(p, world, 0, out, o);
                continue;
            } else if p > path_length {
                if prev_curve != AFTER {
                    prev_curve = AFTER;
                    skeleton.compute_world_vertices(
                        slot,
                        &path.vertices,
                        vertices_length - 6,
                        4,
                        world,
                        0,
                    );
                }
                add_after_position(p - path_length, world, 0, out, o);
                continue;
            }

            while curve + 1 < lengths.len() && p > lengths[curve] {
                curve += 1;
            }
            let length = lengths[curve];
            if curve == 0 {
                p /= length;
            } else {
                let prev = lengths[curve - 1];
                p = (p - prev) / (length - prev);
            }

            if curve as isize != prev_curve {
                prev_curve = curve as isize;
                if closed && curve as isize == curve_count {
                    skeleton.compute_world_vertices(
                        slot,
                        &path.vertices,
                        vertices_length - 4,
                        4,
                        world,
                        0,
                    );
                    skeleton.compute_world_vertices(slot, &path.vertices, 0, 4, world, 4);
                } else {
                    skeleton.compute_world_vertices(
                        slot,
                        &path.vertices,
                        curve * 6 + 2,
                        8,
                        world,
                        0,
                    );
                }
            }
            add_curve_position(
                p,
                world[..8].try_into().unwrap_or([0.0; 8]),
                out,
                o,
                tangents || (i > 0 && space == 0.0),
            );
        }
        return;
    }

    // World vertices.
    if closed {
        vertices_length += 2;
        world.clear();
        world.resize(vertices_length, 0.0);
        skeleton.compute_world_vertices(slot, &path.vertices, 2, vertices_length - 4, world, 0);
        skeleton.compute_world_vertices(slot, &path.vertices, 0, 2, world, vertices_length - 4);
        world[vertices_length - 2] = world[0];
        world[vertices_length - 1] = world[1];
    } else {
        curve_count -= 1;
        vertices_length = vertices_length.saturating_sub(4);
        world.clear();
        world.resize(vertices_length, 0.0);
        skeleton.compute_world_vertices(slot, &path.vertices, 2, vertices_length, world, 0);
    }
    if world.len() < 2 {
        return;
    }
    let curve_count = curve_count.max(0) as usize;

    // Curve lengths.
    let curves = &mut scratch.curves;
    curves.clear();
    curves.resize(curve_count, 0.0);
    let mut path_length = 0.0;
    let mut x1 = world[0];
    let mut y1 = world[1];
    let mut w = 2;
    for curve in curves.iter_mut() {
        let (cx1, cy1, cx2, cy2, x2, y2) = (
            world[w],
            world[w + 1],
            world[w + 2],
            world[w + 3],
            world[w + 4],
            world[w + 5],
        );
        let tmpx = (x1 - cx1 * 2.0 + cx2) * 0.1875;
        let tmpy = (y1 - cy1 * 2.0 + cy2) * 0.1875;
        let dddfx = ((cx1 - cx2) * 3.0 - x1 + x2) * 0.09375;
        let dddfy = ((cy1 - cy2) * 3.0 - y1 + y2) * 0.09375;
        let mut ddfx = tmpx * 2.0 + dddfx;
        let mut ddfy = tmpy * 2.0 + dddfy;
        let mut dfx = (cx1 - x1) * 0.75 + tmpx + dddfx * 0.16666667;
        let mut dfy = (cy1 - y1) * 0.75 + tmpy + dddfy * 0.16666667;
        path_length += (dfx * dfx + dfy * dfy).sqrt();
        dfx += ddfx;
        dfy += ddfy;
        ddfx += dddfx;
        ddfy += dddfy;
        path_length += (dfx * dfx + dfy * dfy).sqrt();
        dfx += ddfx;
        dfy += ddfy;
        path_length += (dfx * dfx + dfy * dfy).sqrt();
        dfx += ddfx + dddfx;
        dfy += ddfy + dddfy;
        path_length += (dfx * dfx + dfy * dfy).sqrt();
        *curve = path_length;
        x1 = x2;
        y1 = y2;
        w += 6;
    }
    if curves.is_empty() {
        return;
    }

    if percent_position {
        position *= path_length;
    }
    if percent_spacing {
        for space in spaces.iter_mut() {
            *space *= path_length;
        }
    }

    let segments = &mut scratch.segments;
    let mut points = [0.0f32; 8];
    let mut curve_length = 0.0;
    let mut curve = 0usize;
    let mut segment = 0usize;
    for i in 0..spaces_count {
        let o = i * 3;
        let space = spaces[i];
        position += space;
        let mut p = position;

        if closed {
            p %= path_length;
            if p < 0.0 {
                p += path_length;
            }
            curve = 0;
        } else if p < 0.0 {
            add_before_position(p, world, 0, out, o);
            continue;
        } else if p > path_length {
            add_after_position(p - path_length, world, vertices_length - 4, out, o);
            continue;
        }

        while curve + 1 < curves.len() && p > curves[curve] {
            curve += 1;
        }
        let length = curves[curve];
        if curve == 0 {
            p /= length;
        } else {
            let prev = curves[curve - 1];
            p = (p - prev) / (length - prev);
        }

        // Curve segment lengths.
        if curve as isize != prev_curve {
            prev_curve = curve as isize;
            points.copy_from_slice(&world[curve * 6..curve * 6 + 8]);
            let [x1, y1, cx1, cy1, cx2, cy2, x2, y2] = points;
            let tmpx = (x1 - cx1 * 2.0 + cx2) * 0.03;
            let tmpy = (y1 - cy1 * 2.0 + cy2) * 0.03;
            let dddfx = ((cx1 - cx2) * 3.0 - x1 + x2) * 0.006;
            let dddfy = ((cy1 - cy2) * 3.0 - y1 + y2) * 0.006;
            let mut ddfx = tmpx * 2.0 + dddfx;
            let mut ddfy = tmpy * 2.0 + dddfy;
            let mut dfx = (cx1 - x1) * 0.3 + tmpx + dddfx * 0.16666667;
            let mut dfy = (cy1 - y1) * 0.3 + tmpy + dddfy * 0.16666667;
            curve_length = (dfx * dfx + dfy * dfy).sqrt();
            segments[0] = curve_length;
            for segment_length in segments.iter_mut().take(8).skip(1) {
                dfx += ddfx;
                dfy += ddfy;
                ddfx += dddfx;
                ddfy += dddfy;
                curve_length += (dfx * dfx + dfy * dfy).sqrt();
                *segment_length = curve_length;
            }
            dfx += ddfx;
            dfy += ddfy;
            curve_length += (dfx * dfx + dfy * dfy).sqrt();
            segments[8] = curve_length;
            dfx += ddfx + dddfx;
            dfy += ddfy + dddfy;
            curve_length += (dfx * dfx + dfy * dfy).sqrt();
            segments[9] = curve_length;
            segment = 0;
        }

        // Weight by segment length.
        p *= curve_length;
        while segment + 1 < segments.len() && p > segments[segment] {
            segment += 1;
        }
        let length = segments[segment];
        if segment == 0 {
            p /= length;
        } else {
            let prev = segments[segment - 1];
            p = segment as f32 + (p - prev) / (length - prev);
        }
        add_curve_position(
            p * 0.1,
            points,
            out,
            o,
            tangents || (i > 0 && space == 0.0),
        );
    }
}

fn add_before_position(p: f32, temp: &[f32], i: usize, out: &mut [f32], o: usize) {
    let x1 = temp[i];
    let y1 = temp[i + 1];
    let dx = temp[i + 2] - x1;
    let dy = temp[i + 3] - y1;
    let r = dy.atan2(dx);
    out[o] = x1 + p * r.cos();
    out[o + 1] = y1 + p * r.sin();
    out[o + 2] = r;
}

fn add_after_position(p: f32, temp: &[f32], i: usize, out: &mut [f32], o: usize) {
    let x1 = temp[i + 2];
    let y1 = temp[i + 3];
    let dx = x1 - temp[i];
    let dy = y1 - temp[i + 1];
    let r = dy.atan2(dx);
    out[o] = x1 + p * r.cos();
    out[o + 1] = y1 + p * r.sin();
    out[o + 2] = r;
}

/// Samples the cubic Bezier `[x1, y1, cx1, cy1, cx2, cy2, x2, y2]` at `p`.
fn add_curve_position(mut p: f32, points: [f32; 8], out: &mut [f32], o: usize, tangents: bool) {
    let [x1, y1, cx1, cy1, cx2, cy2, x2, y2] = points;
    if p == 0.0 {
        p = 0.0001;
    }
    let tt = p * p;
    let ttt = tt * p;
    let u = 1.0 - p;
    let uu = u * u;
    let uuu = uu * u;
    let ut = u * p;
    let ut3 = ut * 3.0;
    let uut3 = u * ut3;
    let utt3 = ut3 * p;
    let x = x1 * uuu + cx1 * uut3 + cx2 * utt3 + x2 * ttt;
    let y = y1 * uuu + cy1 * uut3 + cy2 * utt3 + y2 * ttt;
    out[o] = x;
    out[o + 1] = y;
    if tangents {
        out[o + 2] = (y - (y1 * uu + cy1 * ut * 2.0 + cy2 * tt))
            .atan2(x - (x1 * uu + cx1 * ut * 2.0 + cx2 * tt));
    }
}
