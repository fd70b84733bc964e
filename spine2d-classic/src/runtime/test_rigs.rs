use crate::{
    Animation, AttachmentData, AttachmentId, BoneData, BoundingBoxAttachmentData,
    IkConstraintData, MeshAttachmentData, MeshVertices, RegionAttachmentData, SkeletonData,
    SkinData, SlotData, TextureRegion, TransformConstraintData,
};
use std::sync::Arc;

pub(crate) fn assert_approx(actual: f32, expected: f32) {
    assert_near(actual, expected, 1.0e-3);
}

pub(crate) fn assert_near(actual: f32, expected: f32, eps: f32) {
    let diff = (actual - expected).abs();
    assert!(
        diff <= eps,
        "expected {expected}, got {actual} (diff {diff})"
    );
}

/// Builds skeleton data in code for tests that do not go through the JSON loader.
#[derive(Default)]
pub(crate) struct RigBuilder {
    data: SkeletonData,
}

impl RigBuilder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn bone(
        mut self,
        name: &str,
        parent: Option<&str>,
        setup: impl FnOnce(&mut BoneData),
    ) -> Self {
        let parent = parent.map(|p| self.bone_index(p));
        let mut bone = BoneData::new(self.data.bones.len(), name, parent);
        setup(&mut bone);
        self.data.bones.push(bone);
        self
    }

    pub(crate) fn slot(mut self, name: &str, bone: &str, attachment: Option<&str>) -> Self {
        let bone = self.bone_index(bone);
        let mut slot = SlotData::new(self.data.slots.len(), name, bone);
        slot.attachment = attachment.map(str::to_string);
        self.data.slots.push(slot);
        self
    }

    /// Adds an attachment to the named skin, creating the skin on first use. A skin named
    /// "default" becomes the default skin.
    pub(crate) fn attachment(mut self, skin: &str, slot: &str, attachment: AttachmentData) -> Self {
        let slot_index = self.slot_index(slot);
        let key = attachment.name().to_string();
        let id = self.data.push_attachment(attachment);
        let skin_index = match self.data.find_skin_index(skin) {
            Some(index) => index,
            None => {
                self.data.skins.push(SkinData::new(skin));
                if skin == "default" {
                    self.data.default_skin = Some(self.data.skins.len() - 1);
                }
                self.data.skins.len() - 1
            }
        };
        self.data.skins[skin_index].add_attachment(slot_index, key, id);
        self
    }

    pub(crate) fn ik(mut self, name: &str, bones: &[&str], target: &str, bend: i32) -> Self {
        let bones = bones.iter().map(|b| self.bone_index(b)).collect();
        let target = self.bone_index(target);
        self.data.ik_constraints.push(IkConstraintData {
            name: name.to_string(),
            bones,
            target,
            bend_direction: bend,
            mix: 1.0,
        });
        self
    }

    pub(crate) fn transform(
        mut self,
        name: &str,
        bones: &[&str],
        target: &str,
        setup: impl FnOnce(&mut TransformConstraintData),
    ) -> Self {
        let bones = bones.iter().map(|b| self.bone_index(b)).collect();
        let target = self.bone_index(target);
        let mut constraint = TransformConstraintData {
            name: name.to_string(),
            bones,
            target,
            rotate_mix: 1.0,
            translate_mix: 1.0,
            scale_mix: 1.0,
            shear_mix: 1.0,
            offset_rotation: 0.0,
            offset_x: 0.0,
            offset_y: 0.0,
            offset_scale_x: 0.0,
            offset_scale_y: 0.0,
            offset_shear_y: 0.0,
        };
        setup(&mut constraint);
        self.data.transform_constraints.push(constraint);
        self
    }

    pub(crate) fn animation(mut self, animation: Animation) -> Self {
        self.data.animations.push(animation);
        self
    }

    pub(crate) fn bone_index(&self, name: &str) -> usize {
        self.data
            .find_bone_index(name)
            .unwrap_or_else(|| panic!("unknown bone {name}"))
    }

    pub(crate) fn slot_index(&self, name: &str) -> usize {
        self.data
            .find_slot_index(name)
            .unwrap_or_else(|| panic!("unknown slot {name}"))
    }

    /// Id the next added attachment will get.
    pub(crate) fn next_attachment_id(&self) -> AttachmentId {
        AttachmentId(self.data.attachments.len())
    }

    pub(crate) fn build(self) -> Arc<SkeletonData> {
        Arc::new(self.data)
    }
}

pub(crate) fn region(name: &str, width: f32, height: f32) -> AttachmentData {
    let mut region = RegionAttachmentData::new(name, name);
    region.width = width;
    region.height = height;
    region.set_region(TextureRegion::full(width, height));
    region.update_offset();
    AttachmentData::Region(region)
}

pub(crate) fn bounding_box(name: &str, points: &[[f32; 2]]) -> AttachmentData {
    AttachmentData::BoundingBox(BoundingBoxAttachmentData {
        name: name.to_string(),
        vertices: MeshVertices::Unweighted(points.to_vec()),
    })
}

/// A unit-UV quad mesh over the given corners.
pub(crate) fn quad_mesh(name: &str, corners: [[f32; 2]; 4]) -> AttachmentData {
    let mut mesh = MeshAttachmentData::new(name, name);
    mesh.vertices = MeshVertices::Unweighted(corners.to_vec());
    mesh.region_uvs = vec![0.0, 1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0];
    mesh.triangles = vec![0, 1, 2, 2, 3, 0];
    mesh.hull_length = 8;
    mesh.region = TextureRegion::full(1.0, 1.0);
    mesh.update_uvs();
    AttachmentData::Mesh(mesh)
}

/// Root bone with a two-bone arm: `upper` (length 5) and `lower` (length 5, at the tip of
/// `upper`).
pub(crate) fn arm() -> RigBuilder {
    RigBuilder::new()
        .bone("root", None, |_| {})
        .bone("upper", Some("root"), |b| b.length = 5.0)
        .bone("lower", Some("upper"), |b| {
            b.x = 5.0;
            b.length = 5.0;
        })
}
