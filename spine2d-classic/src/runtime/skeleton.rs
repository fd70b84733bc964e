use crate::math::{RAD_DEG, cos_deg, signum, sin_deg};
use crate::{
    AttachmentData, AttachmentId, BoneData, Color, Error, IkConstraint, MeshAttachmentData,
    MeshVertices, PathConstraint, RegionAttachmentData, SkeletonData, SkinData,
    TransformConstraint, Vector2, apply_ik_constraint, apply_path_constraint,
    apply_transform_constraint,
};
use std::sync::Arc;

/// Floats per vertex in region and mesh world-vertex buffers: x, y, r, g, b, a, u, v.
pub const VERTEX_SIZE: usize = 8;

/// A bone's local transform relative to its parent.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct LocalTransform {
    pub x: f32,
    pub y: f32,
    pub rotation: f32,
    pub scale_x: f32,
    pub scale_y: f32,
    pub shear_x: f32,
    pub shear_y: f32,
}

#[derive(Clone, Debug)]
pub struct Bone {
    data_index: usize,
    parent: Option<usize>,

    pub x: f32,
    pub y: f32,
    pub rotation: f32,
    pub scale_x: f32,
    pub scale_y: f32,
    pub shear_x: f32,
    pub shear_y: f32,
    /// Rotation used by the last world transform, which may differ from `rotation` when a
    /// constraint posed the bone.
    pub applied_rotation: f32,

    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub world_x: f32,
    pub world_y: f32,
    pub world_sign_x: f32,
    pub world_sign_y: f32,
}

impl Bone {
    fn new(data_index: usize, data: &BoneData) -> Self {
        let mut bone = Self {
            data_index,
            parent: data.parent,
            x: 0.0,
            y: 0.0,
            rotation: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            shear_x: 0.0,
            shear_y: 0.0,
            applied_rotation: 0.0,
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            world_x: 0.0,
            world_y: 0.0,
            world_sign_x: 1.0,
            world_sign_y: 1.0,
        };
        bone.set_to_setup_pose(data);
        bone
    }

    pub fn data_index(&self) -> usize {
        self.data_index
    }

    pub fn parent_index(&self) -> Option<usize> {
        self.parent
    }

    pub fn local_transform(&self) -> LocalTransform {
        LocalTransform {
            x: self.x,
            y: self.y,
            rotation: self.rotation,
            scale_x: self.scale_x,
            scale_y: self.scale_y,
            shear_x: self.shear_x,
            shear_y: self.shear_y,
        }
    }

    pub fn set_to_setup_pose(&mut self, data: &BoneData) {
        self.x = data.x;
        self.y = data.y;
        self.rotation = data.rotation;
        self.scale_x = data.scale_x;
        self.scale_y = data.scale_y;
        self.shear_x = data.shear_x;
        self.shear_y = data.shear_y;
    }

    pub fn world_rotation_x(&self) -> f32 {
        self.c.atan2(self.a) * RAD_DEG
    }

    pub fn world_rotation_y(&self) -> f32 {
        self.d.atan2(self.b) * RAD_DEG
    }

    pub fn world_scale_x(&self) -> f32 {
        (self.a * self.a + self.b * self.b).sqrt() * self.world_sign_x
    }

    pub fn world_scale_y(&self) -> f32 {
        (self.c * self.c + self.d * self.d).sqrt() * self.world_sign_y
    }

    /// Local rotation of the world X axis, given this bone's parent.
    pub fn world_to_local_rotation_x(&self, parent: Option<&Bone>) -> f32 {
        let Some(p) = parent else {
            return self.rotation;
        };
        (p.a * self.c - p.c * self.a).atan2(p.d * self.a - p.b * self.c) * RAD_DEG
    }

    pub fn world_to_local_rotation_y(&self, parent: Option<&Bone>) -> f32 {
        let Some(p) = parent else {
            return self.rotation;
        };
        (p.a * self.d - p.c * self.b).atan2(p.d * self.b - p.b * self.d) * RAD_DEG
    }

    /// Rotates the world transform in place. The local transform is not touched.
    pub fn rotate_world(&mut self, degrees: f32) {
        let (a, b, c, d) = (self.a, self.b, self.c, self.d);
        let cos = cos_deg(degrees);
        let sin = sin_deg(degrees);
        self.a = cos * a - sin * c;
        self.b = cos * b - sin * d;
        self.c = sin * a + cos * c;
        self.d = sin * b + cos * d;
    }

    pub fn world_to_local(&self, world: Vector2) -> Vector2 {
        let inv_det = 1.0 / (self.a * self.d - self.b * self.c);
        let x = world.x - self.world_x;
        let y = world.y - self.world_y;
        Vector2::new(
            x * self.d * inv_det - y * self.b * inv_det,
            y * self.a * inv_det - x * self.c * inv_det,
        )
    }

    pub fn local_to_world(&self, local: Vector2) -> Vector2 {
        Vector2::new(
            local.x * self.a + local.y * self.b + self.world_x,
            local.x * self.c + local.y * self.d + self.world_y,
        )
    }
}

#[derive(Clone, Debug)]
pub struct Slot {
    data_index: usize,
    pub bone: usize,
    pub color: Color,
    attachment: Option<AttachmentId>,
    attachment_time: f32,
    /// Deform offsets for the current vertex attachment, in deform layout. Empty when the
    /// attachment is not deformed.
    pub attachment_vertices: Vec<f32>,
}

impl Slot {
    pub fn data_index(&self) -> usize {
        self.data_index
    }

    pub fn attachment(&self) -> Option<AttachmentId> {
        self.attachment
    }

    fn set_attachment(&mut self, attachment: Option<AttachmentId>, skeleton_time: f32) {
        if self.attachment == attachment {
            return;
        }
        self.attachment = attachment;
        self.attachment_time = skeleton_time;
        self.attachment_vertices.clear();
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum UpdateCacheItem {
    Bone(usize),
    IkConstraint(usize),
    TransformConstraint(usize),
    PathConstraint(usize),
}

#[derive(Clone, Debug)]
pub struct Skeleton {
    pub data: Arc<SkeletonData>,
    pub bones: Vec<Bone>,
    bone_children: Vec<Vec<usize>>,
    pub slots: Vec<Slot>,
    /// Slot indices in draw order.
    pub draw_order: Vec<usize>,
    pub ik_constraints: Vec<IkConstraint>,
    pub transform_constraints: Vec<TransformConstraint>,
    pub path_constraints: Vec<PathConstraint>,
    skin: Option<usize>,
    pub color: Color,
    time: f32,
    pub flip_x: bool,
    pub flip_y: bool,
    pub x: f32,
    pub y: f32,
    update_cache: Vec<UpdateCacheItem>,
}

impl Skeleton {
    pub fn new(data: Arc<SkeletonData>) -> Self {
        let bones = data
            .bones
            .iter()
            .enumerate()
            .map(|(data_index, bone)| Bone::new(data_index, bone))
            .collect::<Vec<_>>();

        let mut bone_children = vec![Vec::new(); bones.len()];
        for (i, bone) in bones.iter().enumerate() {
            if let Some(parent) = bone.parent.filter(|&p| p < bones.len()) {
                bone_children[parent].push(i);
            }
        }

        let slots = data
            .slots
            .iter()
            .enumerate()
            .map(|(data_index, slot)| Slot {
                data_index,
                bone: slot.bone,
                color: slot.color,
                attachment: None,
                attachment_time: 0.0,
                attachment_vertices: Vec::new(),
            })
            .collect::<Vec<_>>();
        let draw_order = (0..slots.len()).collect();

        let ik_constraints = data
            .ik_constraints
            .iter()
            .enumerate()
            .map(|(i, c)| IkConstraint::new(i, c))
            .collect();
        let transform_constraints = data
            .transform_constraints
            .iter()
            .enumerate()
            .map(|(i, c)| TransformConstraint::new(i, c))
            .collect();
        let path_constraints = data
            .path_constraints
            .iter()
            .enumerate()
            .map(|(i, c)| PathConstraint::new(i, c))
            .collect();

        let mut skeleton = Self {
            data,
            bones,
            bone_children,
            slots,
            draw_order,
            ik_constraints,
            transform_constraints,
            path_constraints,
            skin: None,
            color: Color::WHITE,
            time: 0.0,
            flip_x: false,
            flip_y: false,
            x: 0.0,
            y: 0.0,
            update_cache: Vec::new(),
        };
        skeleton.set_slots_to_setup_pose();
        skeleton.update_cache();
        skeleton
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn set_time(&mut self, time: f32) {
        self.time = time;
    }

    pub fn update(&mut self, delta: f32) {
        self.time += delta;
    }

    /// Current update order. Rebuilt by [`Skeleton::update_cache`].
    pub fn update_cache_items(&self) -> &[UpdateCacheItem] {
        &self.update_cache
    }

    /// Rebuilds the update order so every bone is computed after its parent and constraint
    /// inputs are computed before the constraint. Must be called after the skin or the set of
    /// constraints changes.
    pub fn update_cache(&mut self) {
        let mut sorter = CacheSorter {
            bones: &self.bones,
            children: &self.bone_children,
            sorted: vec![false; self.bones.len()],
            cache: Vec::with_capacity(self.bones.len() + self.ik_constraints.len()),
        };

        // IK first, shallowest constrained parent first. Equal depths keep declaration order.
        let mut ik_order = self
            .ik_constraints
            .iter()
            .enumerate()
            .map(|(i, ik)| {
                let mut level = 0;
                let mut parent = ik
                    .bones
                    .first()
                    .and_then(|&b| self.bones.get(b))
                    .and_then(Bone::parent_index);
                while let Some(p) = parent {
                    level += 1;
                    parent = self.bones[p].parent;
                }
                (i, level)
            })
            .collect::<Vec<_>>();
        ik_order.sort_by_key(|&(_, level)| level);

        for &(index, _) in &ik_order {
            let ik = &self.ik_constraints[index];
            let (Some(&first), Some(&last)) = (ik.bones.first(), ik.bones.last()) else {
                continue;
            };
            sorter.sort_bone(ik.target);
            sorter.sort_bone(first);
            sorter.cache.push(UpdateCacheItem::IkConstraint(index));
            sorter.sort_reset_children(first);
            sorter.sorted[last] = true;
        }

        for (index, constraint) in self.path_constraints.iter().enumerate() {
            let slot_index = constraint.target;
            let Some(slot) = self.slots.get(slot_index) else {
                continue;
            };
            let slot_bone = slot.bone;

            let skin = self.skin.and_then(|s| self.data.skins.get(s));
            if let Some(skin) = skin {
                sort_path_skin(&mut sorter, &self.data, skin, slot_index, slot_bone);
            }
            if let Some(default_skin) = self.data.default_skin.filter(|&d| Some(d) != self.skin) {
                if let Some(skin) = self.data.skins.get(default_skin) {
                    sort_path_skin(&mut sorter, &self.data, skin, slot_index, slot_bone);
                }
            }
            for skin in &self.data.skins {
                sort_path_skin(&mut sorter, &self.data, skin, slot_index, slot_bone);
            }
            if let Some(attachment) = slot.attachment.and_then(|id| self.data.attachment(id)) {
                sort_path_attachment(&mut sorter, attachment, slot_bone);
            }

            for &bone in &constraint.bones {
                sorter.sort_bone(bone);
            }
            sorter.cache.push(UpdateCacheItem::PathConstraint(index));
            for &bone in &constraint.bones {
                sorter.sort_reset_children(bone);
            }
            for &bone in &constraint.bones {
                sorter.sorted[bone] = true;
            }
        }

        for (index, constraint) in self.transform_constraints.iter().enumerate() {
            sorter.sort_bone(constraint.target);
            for &bone in &constraint.bones {
                sorter.sort_bone(bone);
            }
            sorter.cache.push(UpdateCacheItem::TransformConstraint(index));
            for &bone in &constraint.bones {
                sorter.sort_reset_children(bone);
            }
            for &bone in &constraint.bones {
                sorter.sorted[bone] = true;
            }
        }

        for bone in 0..self.bones.len() {
            sorter.sort_bone(bone);
        }

        let cache = sorter.cache;
        log::trace!("rebuilt update cache: {} entries", cache.len());
        self.update_cache = cache;
    }

    /// Computes world transforms for every bone and applies constraints, in update-cache order.
    pub fn update_world_transform(&mut self) {
        for i in 0..self.update_cache.len() {
            match self.update_cache[i] {
                UpdateCacheItem::Bone(bone) => {
                    let local = self.bones[bone].local_transform();
                    self.update_bone_world_transform_with(bone, local);
                }
                UpdateCacheItem::IkConstraint(c) => apply_ik_constraint(self, c),
                UpdateCacheItem::TransformConstraint(c) => apply_transform_constraint(self, c),
                UpdateCacheItem::PathConstraint(c) => apply_path_constraint(self, c),
            }
        }
    }

    pub fn update_bone_world_transform(&mut self, bone_index: usize) {
        let local = self.bones[bone_index].local_transform();
        self.update_bone_world_transform_with(bone_index, local);
    }

    /// Computes the world transform of one bone from the given local values and the parent's
    /// current world transform. The bone's own local fields are left unchanged.
    pub fn update_bone_world_transform_with(&mut self, bone_index: usize, local: LocalTransform) {
        let flip_x = self.flip_x;
        let flip_y = self.flip_y;
        compute_bone_world_transform(
            &mut self.bones,
            &self.data.bones,
            bone_index,
            local,
            flip_x,
            flip_y,
        );
    }

    /// Derives the local transform from the current world transform.
    pub fn update_bone_local_transform(&mut self, bone_index: usize) {
        let parent = self.bones[bone_index]
            .parent
            .map(|p| (self.bones[p].a, self.bones[p].b, self.bones[p].c, self.bones[p].d, self.bones[p].world_x, self.bones[p].world_y));
        let bone = &mut self.bones[bone_index];
        let Some((pa, pb, pc, pd, pwx, pwy)) = parent else {
            bone.x = bone.world_x;
            bone.y = bone.world_y;
            bone.rotation = bone.c.atan2(bone.a) * RAD_DEG;
            bone.scale_x = (bone.a * bone.a + bone.c * bone.c).sqrt();
            bone.scale_y = (bone.b * bone.b + bone.d * bone.d).sqrt();
            let det = bone.a * bone.d - bone.b * bone.c;
            bone.shear_x = 0.0;
            bone.shear_y = (bone.a * bone.b + bone.c * bone.d).atan2(det) * RAD_DEG;
            return;
        };

        let pid = 1.0 / (pa * pd - pb * pc);
        let dx = bone.world_x - pwx;
        let dy = bone.world_y - pwy;
        bone.x = dx * pd * pid - dy * pb * pid;
        bone.y = dy * pa * pid - dx * pc * pid;
        let ia = pid * pd;
        let id = pid * pa;
        let ib = pid * pb;
        let ic = pid * pc;
        let ra = ia * bone.a - ib * bone.c;
        let rb = ia * bone.b - ib * bone.d;
        let rc = id * bone.c - ic * bone.a;
        let rd = id * bone.d - ic * bone.b;
        bone.shear_x = 0.0;
        bone.scale_x = (ra * ra + rc * rc).sqrt();
        if bone.scale_x > 0.0001 {
            let det = ra * rd - rb * rc;
            bone.scale_y = det / bone.scale_x;
            bone.shear_y = (ra * rb + rc * rd).atan2(det) * RAD_DEG;
            bone.rotation = rc.atan2(ra) * RAD_DEG;
        } else {
            bone.scale_x = 0.0;
            bone.scale_y = (rb * rb + rd * rd).sqrt();
            bone.shear_y = 0.0;
            bone.rotation = 90.0 - rd.atan2(rb) * RAD_DEG;
        }
        bone.applied_rotation = bone.rotation;
    }

    pub fn set_to_setup_pose(&mut self) {
        self.set_bones_to_setup_pose();
        self.set_slots_to_setup_pose();
    }

    /// Resets bone local transforms and constraint parameters.
    pub fn set_bones_to_setup_pose(&mut self) {
        for bone in &mut self.bones {
            if let Some(data) = self.data.bones.get(bone.data_index) {
                bone.set_to_setup_pose(data);
            }
        }
        for c in &mut self.ik_constraints {
            if let Some(data) = self.data.ik_constraints.get(c.data_index()) {
                c.bend_direction = data.bend_direction;
                c.mix = data.mix;
            }
        }
        for c in &mut self.transform_constraints {
            if let Some(data) = self.data.transform_constraints.get(c.data_index()) {
                c.rotate_mix = data.rotate_mix;
                c.translate_mix = data.translate_mix;
                c.scale_mix = data.scale_mix;
                c.shear_mix = data.shear_mix;
            }
        }
        for c in &mut self.path_constraints {
            if let Some(data) = self.data.path_constraints.get(c.data_index()) {
                c.position = data.position;
                c.spacing = data.spacing;
                c.rotate_mix = data.rotate_mix;
                c.translate_mix = data.translate_mix;
            }
        }
    }

    /// Resets slot colors, setup attachments and draw order.
    pub fn set_slots_to_setup_pose(&mut self) {
        for (i, order) in self.draw_order.iter_mut().enumerate() {
            *order = i;
        }
        for i in 0..self.slots.len() {
            let Some(data) = self.data.slots.get(self.slots[i].data_index) else {
                continue;
            };
            let color = data.color;
            let attachment = data
                .attachment
                .as_deref()
                .and_then(|name| self.attachment(i, name));
            let time = self.time;
            let slot = &mut self.slots[i];
            slot.color = color;
            slot.attachment = None;
            slot.set_attachment(attachment, time);
        }
    }

    pub fn root_bone(&self) -> Option<&Bone> {
        self.bones.first()
    }

    pub fn find_bone(&self, name: &str) -> Option<&Bone> {
        self.find_bone_index(name).map(|i| &self.bones[i])
    }

    pub fn find_bone_index(&self, name: &str) -> Option<usize> {
        self.bones
            .iter()
            .position(|b| self.data.bones.get(b.data_index).is_some_and(|d| d.name == name))
    }

    pub fn find_slot(&self, name: &str) -> Option<&Slot> {
        self.find_slot_index(name).map(|i| &self.slots[i])
    }

    pub fn find_slot_index(&self, name: &str) -> Option<usize> {
        self.slots
            .iter()
            .position(|s| self.data.slots.get(s.data_index).is_some_and(|d| d.name == name))
    }

    pub fn find_ik_constraint(&self, name: &str) -> Option<&IkConstraint> {
        self.data
            .find_ik_constraint(name)
            .and_then(|i| self.ik_constraints.get(i))
    }

    pub fn find_transform_constraint(&self, name: &str) -> Option<&TransformConstraint> {
        self.data
            .find_transform_constraint(name)
            .and_then(|i| self.transform_constraints.get(i))
    }

    pub fn find_path_constraint(&self, name: &str) -> Option<&PathConstraint> {
        self.data
            .find_path_constraint(name)
            .and_then(|i| self.path_constraints.get(i))
    }

    pub fn skin(&self) -> Option<&SkinData> {
        self.skin.and_then(|i| self.data.skins.get(i))
    }

    pub fn skin_index(&self) -> Option<usize> {
        self.skin
    }

    /// Sets the skin by name, or clears it with `None`.
    pub fn set_skin(&mut self, skin_name: Option<&str>) -> Result<(), Error> {
        let index = match skin_name {
            None => None,
            Some(name) => Some(self.data.find_skin_index(name).ok_or_else(|| {
                Error::UnknownSkin {
                    name: name.to_string(),
                }
            })?),
        };
        self.set_skin_index(index);
        Ok(())
    }

    pub fn set_skin_by_name(&mut self, skin_name: &str) -> Result<(), Error> {
        self.set_skin(Some(skin_name))
    }

    /// Sets the skin used before the default skin when resolving attachments.
    ///
    /// With a previous skin, each slot showing an attachment from it switches to the new skin's
    /// attachment under the same name, if any. Without one, each slot's setup attachment is
    /// looked up in the new skin.
    pub fn set_skin_index(&mut self, skin: Option<usize>) {
        if let Some(new_index) = skin {
            let data = Arc::clone(&self.data);
            let Some(new_skin) = data.skins.get(new_index) else {
                return;
            };
            match self.skin.and_then(|old| data.skins.get(old)) {
                Some(old_skin) => self.attach_all(new_skin, old_skin),
                None => {
                    for i in 0..self.slots.len() {
                        let Some(name) = data
                            .slots
                            .get(self.slots[i].data_index)
                            .and_then(|s| s.attachment.as_deref())
                        else {
                            continue;
                        };
                        if let Some(attachment) = new_skin.attachment(i, name) {
                            self.set_slot_attachment(i, Some(attachment));
                        }
                    }
                }
            }
        }
        self.skin = skin;
    }

    fn attach_all(&mut self, new_skin: &SkinData, old_skin: &SkinData) {
        for i in 0..self.slots.len() {
            let Some(current) = self.slots[i].attachment else {
                continue;
            };
            let Some((name, _)) = old_skin.slot_entries(i).find(|&(_, id)| id == current) else {
                continue;
            };
            if let Some(attachment) = new_skin.attachment(i, name) {
                self.set_slot_attachment(i, Some(attachment));
            }
        }
    }

    /// Looks up an attachment in the current skin, then the default skin.
    pub fn attachment(&self, slot_index: usize, name: &str) -> Option<AttachmentId> {
        self.skin()
            .and_then(|skin| skin.attachment(slot_index, name))
            .or_else(|| {
                self.data
                    .default_skin()
                    .and_then(|skin| skin.attachment(slot_index, name))
            })
    }

    pub fn attachment_by_name(&self, slot_name: &str, name: &str) -> Option<AttachmentId> {
        self.data
            .find_slot_index(slot_name)
            .and_then(|slot| self.attachment(slot, name))
    }

    /// Shows the named attachment on the slot, or hides the slot's attachment with `None`.
    pub fn set_attachment(
        &mut self,
        slot_name: &str,
        attachment_name: Option<&str>,
    ) -> Result<(), Error> {
        let slot_index = self.find_slot_index(slot_name).ok_or_else(|| Error::UnknownSlot {
            name: slot_name.to_string(),
        })?;
        let attachment = match attachment_name {
            None => None,
            Some(name) => Some(self.attachment(slot_index, name).ok_or_else(|| {
                Error::UnknownAttachment {
                    slot: slot_name.to_string(),
                    attachment: name.to_string(),
                }
            })?),
        };
        self.set_slot_attachment(slot_index, attachment);
        Ok(())
    }

    /// Changes the slot's attachment. Resets the attachment time and deform when it differs from
    /// the current one.
    pub fn set_slot_attachment(&mut self, slot_index: usize, attachment: Option<AttachmentId>) {
        let time = self.time;
        if let Some(slot) = self.slots.get_mut(slot_index) {
            slot.set_attachment(attachment, time);
        }
    }

    /// Seconds since the slot's attachment was set.
    pub fn slot_attachment_time(&self, slot_index: usize) -> f32 {
        self.slots
            .get(slot_index)
            .map(|s| self.time - s.attachment_time)
            .unwrap_or(0.0)
    }

    pub fn set_slot_attachment_time(&mut self, slot_index: usize, time: f32) {
        let now = self.time;
        if let Some(slot) = self.slots.get_mut(slot_index) {
            slot.attachment_time = now - time;
        }
    }

    pub fn slot_attachment_data(&self, slot_index: usize) -> Option<&AttachmentData> {
        self.slots
            .get(slot_index)
            .and_then(|s| s.attachment)
            .and_then(|id| self.data.attachment(id))
    }

    /// Transforms `count` floats of local vertices, starting at float `start`, into world space
    /// for the given slot. Applies the slot's deform when present.
    pub fn compute_world_vertices(
        &self,
        slot_index: usize,
        vertices: &MeshVertices,
        start: usize,
        count: usize,
        world: &mut [f32],
        offset: usize,
    ) {
        let Some(slot) = self.slots.get(slot_index) else {
            return;
        };
        let deform = slot.attachment_vertices.as_slice();
        let end = offset + count;

        match vertices {
            MeshVertices::Unweighted(local) => {
                let bone = &self.bones[slot.bone];
                let x = self.x + bone.world_x;
                let y = self.y + bone.world_y;
                let mut v = start / 2;
                let mut w = offset;
                while w < end {
                    let (vx, vy) = if deform.is_empty() {
                        (local[v][0], local[v][1])
                    } else {
                        (deform[v * 2], deform[v * 2 + 1])
                    };
                    world[w] = vx * bone.a + vy * bone.b + x;
                    world[w + 1] = vx * bone.c + vy * bone.d + y;
                    v += 1;
                    w += 2;
                }
            }
            MeshVertices::Weighted(weighted) => {
                let first = start / 2;
                let mut f = weighted[..first].iter().map(Vec::len).sum::<usize>() * 2;
                let mut w = offset;
                for weights in &weighted[first..] {
                    if w >= end {
                        break;
                    }
                    let mut wx = self.x;
                    let mut wy = self.y;
                    for vw in weights {
                        let bone = &self.bones[vw.bone];
                        let (mut vx, mut vy) = (vw.x, vw.y);
                        if !deform.is_empty() {
                            vx += deform[f];
                            vy += deform[f + 1];
                        }
                        wx += (vx * bone.a + vy * bone.b + bone.world_x) * vw.weight;
                        wy += (vx * bone.c + vy * bone.d + bone.world_y) * vw.weight;
                        f += 2;
                    }
                    world[w] = wx;
                    world[w + 1] = wy;
                    w += 2;
                }
            }
        }
    }

    /// World positions of a vertex attachment on the slot, two floats per vertex.
    pub fn vertex_attachment_world_vertices(&self, slot_index: usize) -> Option<Vec<f32>> {
        let vertices = self.slot_attachment_data(slot_index)?.vertices()?;
        let len = vertices.world_vertices_length();
        let mut world = vec![0.0; len];
        self.compute_world_vertices(slot_index, vertices, 0, len, &mut world, 0);
        Some(world)
    }

    fn tint(&self, slot_index: usize, attachment_color: Color, premultiplied_alpha: bool) -> Color {
        let skeleton = self.color;
        let slot = self
            .slots
            .get(slot_index)
            .map(|s| s.color)
            .unwrap_or(Color::WHITE);
        let alpha = skeleton.a * slot.a * attachment_color.a;
        let multiplier = if premultiplied_alpha { alpha } else { 1.0 };
        Color::new(
            skeleton.r * slot.r * attachment_color.r * multiplier,
            skeleton.g * slot.g * attachment_color.g * multiplier,
            skeleton.b * slot.b * attachment_color.b * multiplier,
            alpha,
        )
    }

    /// The four corners of a region attachment on the slot, in `VERTEX_SIZE` layout.
    pub fn region_world_vertices(
        &self,
        slot_index: usize,
        region: &RegionAttachmentData,
        premultiplied_alpha: bool,
    ) -> [f32; 4 * VERTEX_SIZE] {
        let mut out = [0.0; 4 * VERTEX_SIZE];
        let Some(slot) = self.slots.get(slot_index) else {
            return out;
        };
        let color = self.tint(slot_index, region.color, premultiplied_alpha);
        let bone = &self.bones[slot.bone];
        let x = self.x + bone.world_x;
        let y = self.y + bone.world_y;
        for (corner, vertex) in out.chunks_exact_mut(VERTEX_SIZE).enumerate() {
            let ox = region.offset[corner * 2];
            let oy = region.offset[corner * 2 + 1];
            vertex[0] = ox * bone.a + oy * bone.b + x;
            vertex[1] = ox * bone.c + oy * bone.d + y;
            vertex[2..6].copy_from_slice(&color.to_array());
            vertex[6] = region.uvs[corner * 2];
            vertex[7] = region.uvs[corner * 2 + 1];
        }
        out
    }

    /// Every vertex of a mesh attachment on the slot, in `VERTEX_SIZE` layout.
    pub fn mesh_world_vertices(
        &self,
        slot_index: usize,
        mesh: &MeshAttachmentData,
        premultiplied_alpha: bool,
    ) -> Vec<f32> {
        let len = mesh.vertices.world_vertices_length();
        let mut positions = vec![0.0; len];
        self.compute_world_vertices(slot_index, &mesh.vertices, 0, len, &mut positions, 0);

        let color = self.tint(slot_index, mesh.color, premultiplied_alpha).to_array();
        let mut out = Vec::with_capacity(len / 2 * VERTEX_SIZE);
        for (i, xy) in positions.chunks_exact(2).enumerate() {
            out.extend_from_slice(xy);
            out.extend_from_slice(&color);
            out.push(mesh.uvs.get(i * 2).copied().unwrap_or(0.0));
            out.push(mesh.uvs.get(i * 2 + 1).copied().unwrap_or(0.0));
        }
        out
    }

    /// Axis-aligned bounds of all region and mesh attachments, as `(offset, size)`.
    pub fn bounds(&self) -> (Vector2, Vector2) {
        let mut min_x = f32::INFINITY;
        let mut min_y = f32::INFINITY;
        let mut max_x = f32::NEG_INFINITY;
        let mut max_y = f32::NEG_INFINITY;
        let mut include = |vertices: &[f32]| {
            for v in vertices.chunks_exact(VERTEX_SIZE) {
                min_x = min_x.min(v[0]);
                min_y = min_y.min(v[1]);
                max_x = max_x.max(v[0]);
                max_y = max_y.max(v[1]);
            }
        };
        for &slot_index in &self.draw_order {
            match self.slot_attachment_data(slot_index) {
                Some(AttachmentData::Region(region)) => {
                    include(&self.region_world_vertices(slot_index, region, false));
                }
                Some(AttachmentData::Mesh(mesh)) => {
                    include(&self.mesh_world_vertices(slot_index, mesh, true));
                }
                _ => {}
            }
        }
        (
            Vector2::new(min_x, min_y),
            Vector2::new(max_x - min_x, max_y - min_y),
        )
    }
}

struct CacheSorter<'a> {
    bones: &'a [Bone],
    children: &'a [Vec<usize>],
    sorted: Vec<bool>,
    cache: Vec<UpdateCacheItem>,
}

impl CacheSorter<'_> {
    fn sort_bone(&mut self, bone: usize) {
        if bone >= self.bones.len() || self.sorted[bone] {
            return;
        }
        if let Some(parent) = self.bones[bone].parent {
            self.sort_bone(parent);
        }
        self.sorted[bone] = true;
        self.cache.push(UpdateCacheItem::Bone(bone));
    }

    fn sort_reset_children(&mut self, bone: usize) {
        let Some(children) = self.children.get(bone) else {
            return;
        };
        for &child in children {
            if self.sorted[child] {
                self.sort_reset_children(child);
            }
            self.sorted[child] = false;
        }
    }
}

fn sort_path_skin(
    sorter: &mut CacheSorter<'_>,
    data: &SkeletonData,
    skin: &SkinData,
    slot_index: usize,
    slot_bone: usize,
) {
    for (_, id) in skin.slot_entries(slot_index) {
        if let Some(attachment) = data.attachment(id) {
            sort_path_attachment(sorter, attachment, slot_bone);
        }
    }
}

fn sort_path_attachment(sorter: &mut CacheSorter<'_>, attachment: &AttachmentData, slot_bone: usize) {
    let AttachmentData::Path(path) = attachment else {
        return;
    };
    match &path.vertices {
        MeshVertices::Unweighted(_) => sorter.sort_bone(slot_bone),
        MeshVertices::Weighted(weighted) => {
            for vw in weighted.iter().flatten() {
                sorter.sort_bone(vw.bone);
            }
        }
    }
}

fn compute_bone_world_transform(
    bones: &mut [Bone],
    data: &[BoneData],
    index: usize,
    local: LocalTransform,
    flip_x: bool,
    flip_y: bool,
) {
    let rotation_y = local.rotation + 90.0 + local.shear_y;
    let mut la = cos_deg(local.rotation + local.shear_x) * local.scale_x;
    let mut lb = cos_deg(rotation_y) * local.scale_y;
    let mut lc = sin_deg(local.rotation + local.shear_x) * local.scale_x;
    let mut ld = sin_deg(rotation_y) * local.scale_y;

    let Some(parent_index) = bones[index].parent else {
        let (mut x, mut y) = (local.x, local.y);
        if flip_x {
            x = -x;
            la = -la;
            lb = -lb;
        }
        if flip_y {
            y = -y;
            lc = -lc;
            ld = -ld;
        }
        let bone = &mut bones[index];
        bone.applied_rotation = local.rotation;
        bone.a = la;
        bone.b = lb;
        bone.c = lc;
        bone.d = ld;
        bone.world_x = x;
        bone.world_y = y;
        bone.world_sign_x = signum(local.scale_x);
        bone.world_sign_y = signum(local.scale_y);
        return;
    };

    let parent = &bones[parent_index];
    let (mut pa, mut pb, mut pc, mut pd) = (parent.a, parent.b, parent.c, parent.d);
    let world_x = pa * local.x + pb * local.y + parent.world_x;
    let world_y = pc * local.x + pd * local.y + parent.world_y;
    let world_sign_x = parent.world_sign_x * signum(local.scale_x);
    let world_sign_y = parent.world_sign_y * signum(local.scale_y);

    let (inherit_rotation, inherit_scale) = data
        .get(bones[index].data_index)
        .map(|d| (d.inherit_rotation, d.inherit_scale))
        .unwrap_or((true, true));
    let inherits = |i: usize, f: fn(&BoneData) -> bool| data.get(bones[i].data_index).is_none_or(f);

    let (mut a, mut b, mut c, mut d);
    if inherit_rotation && inherit_scale {
        a = pa * la + pb * lc;
        b = pa * lb + pb * ld;
        c = pc * la + pd * lc;
        d = pc * lb + pd * ld;
    } else {
        if inherit_rotation {
            // Rotation only: rebuild the parent chain's rotation without its scale.
            (pa, pb, pc, pd) = (1.0, 0.0, 0.0, 1.0);
            let mut current = Some(parent_index);
            while let Some(p) = current {
                let cos = cos_deg(bones[p].applied_rotation);
                let sin = sin_deg(bones[p].applied_rotation);
                let temp = pa * cos + pb * sin;
                pb = pb * cos - pa * sin;
                pa = temp;
                let temp = pc * cos + pd * sin;
                pd = pd * cos - pc * sin;
                pc = temp;
                if !inherits(p, |d| d.inherit_rotation) {
                    break;
                }
                current = bones[p].parent;
            }
            a = pa * la + pb * lc;
            b = pa * lb + pb * ld;
            c = pc * la + pd * lc;
            d = pc * lb + pd * ld;
        } else if inherit_scale {
            // Scale only: apply each ancestor's scale in its rotated frame, then undo the rotation.
            (pa, pb, pc, pd) = (1.0, 0.0, 0.0, 1.0);
            let mut current = Some(parent_index);
            while let Some(p) = current {
                let cos = cos_deg(bones[p].applied_rotation);
                let mut sin = sin_deg(bones[p].applied_rotation);
                let psx = bones[p].scale_x;
                let psy = bones[p].scale_y;
                let za = cos * psx;
                let zb = sin * psy;
                let zc = sin * psx;
                let zd = cos * psy;
                let temp = pa * za + pb * zc;
                pb = pb * zd - pa * zb;
                pa = temp;
                let temp = pc * za + pd * zc;
                pd = pd * zd - pc * zb;
                pc = temp;

                if psx >= 0.0 {
                    sin = -sin;
                }
                let temp = pa * cos + pb * sin;
                pb = pb * cos - pa * sin;
                pa = temp;
                let temp = pc * cos + pd * sin;
                pd = pd * cos - pc * sin;
                pc = temp;

                if !inherits(p, |d| d.inherit_scale) {
                    break;
                }
                current = bones[p].parent;
            }
            a = pa * la + pb * lc;
            b = pa * lb + pb * ld;
            c = pc * la + pd * lc;
            d = pc * lb + pd * ld;
        } else {
            (a, b, c, d) = (la, lb, lc, ld);
        }
        if flip_x {
            a = -a;
            b = -b;
        }
        if flip_y {
            c = -c;
            d = -d;
        }
    }

    let bone = &mut bones[index];
    bone.applied_rotation = local.rotation;
    bone.a = a;
    bone.b = b;
    bone.c = c;
    bone.d = d;
    bone.world_x = world_x;
    bone.world_y = world_y;
    bone.world_sign_x = world_sign_x;
    bone.world_sign_y = world_sign_y;
}
