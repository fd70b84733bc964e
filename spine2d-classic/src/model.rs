use crate::{Animation, AttachmentId, Color, TextureRegion};
use std::collections::HashMap;

#[derive(Clone, Debug)]
pub struct BoneData {
    pub index: usize,
    pub name: String,
    pub parent: Option<usize>,
    pub length: f32,
    pub x: f32,
    pub y: f32,
    pub rotation: f32,
    pub scale_x: f32,
    pub scale_y: f32,
    pub shear_x: f32,
    pub shear_y: f32,
    pub inherit_rotation: bool,
    pub inherit_scale: bool,
}

impl BoneData {
    pub fn new(index: usize, name: impl Into<String>, parent: Option<usize>) -> Self {
        Self {
            index,
            name: name.into(),
            parent,
            length: 0.0,
            x: 0.0,
            y: 0.0,
            rotation: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            shear_x: 0.0,
            shear_y: 0.0,
            inherit_rotation: true,
            inherit_scale: true,
        }
    }
}

#[derive(Clone, Debug)]
pub struct SlotData {
    pub index: usize,
    pub name: String,
    pub bone: usize,
    pub color: Color,
    pub attachment: Option<String>,
    pub blend: BlendMode,
}

impl SlotData {
    pub fn new(index: usize, name: impl Into<String>, bone: usize) -> Self {
        Self {
            index,
            name: name.into(),
            bone,
            color: Color::WHITE,
            attachment: None,
            blend: BlendMode::Normal,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum BlendMode {
    #[default]
    Normal,
    Additive,
    Multiply,
    Screen,
}

#[derive(Clone, Debug)]
pub struct IkConstraintData {
    pub name: String,
    pub bones: Vec<usize>,
    pub target: usize,
    pub bend_direction: i32,
    pub mix: f32,
}

#[derive(Clone, Debug)]
pub struct TransformConstraintData {
    pub name: String,
    pub bones: Vec<usize>,
    pub target: usize,
    pub rotate_mix: f32,
    pub translate_mix: f32,
    pub scale_mix: f32,
    pub shear_mix: f32,
    pub offset_rotation: f32,
    pub offset_x: f32,
    pub offset_y: f32,
    pub offset_scale_x: f32,
    pub offset_scale_y: f32,
    pub offset_shear_y: f32,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum PositionMode {
    Fixed,
    #[default]
    Percent,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum SpacingMode {
    #[default]
    Length,
    Fixed,
    Percent,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum RotateMode {
    #[default]
    Tangent,
    Chain,
    ChainScale,
}

#[derive(Clone, Debug)]
pub struct PathConstraintData {
    pub name: String,
    pub bones: Vec<usize>,
    /// Slot whose path attachment drives the constraint.
    pub target: usize,
    pub position_mode: PositionMode,
    pub spacing_mode: SpacingMode,
    pub rotate_mode: RotateMode,
    pub offset_rotation: f32,
    pub position: f32,
    pub spacing: f32,
    pub rotate_mix: f32,
    pub translate_mix: f32,
}

#[derive(Clone, Debug)]
pub struct VertexWeight {
    pub bone: usize,
    pub x: f32,
    pub y: f32,
    pub weight: f32,
}

/// Local vertices of a vertex attachment. Unweighted vertices are relative to the slot's bone;
/// weighted vertices carry one bone-local position per influencing bone.
#[derive(Clone, Debug)]
pub enum MeshVertices {
    Unweighted(Vec<[f32; 2]>),
    Weighted(Vec<Vec<VertexWeight>>),
}

impl Default for MeshVertices {
    fn default() -> Self {
        MeshVertices::Unweighted(Vec::new())
    }
}

impl MeshVertices {
    pub fn vertex_count(&self) -> usize {
        match self {
            MeshVertices::Unweighted(v) => v.len(),
            MeshVertices::Weighted(v) => v.len(),
        }
    }

    /// Number of floats produced by a full world-vertex computation.
    pub fn world_vertices_length(&self) -> usize {
        self.vertex_count() * 2
    }

    /// Number of floats in a deform buffer for these vertices: one x/y pair per vertex when
    /// unweighted, one per bone influence when weighted.
    pub fn deform_length(&self) -> usize {
        match self {
            MeshVertices::Unweighted(v) => v.len() * 2,
            MeshVertices::Weighted(v) => v.iter().map(Vec::len).sum::<usize>() * 2,
        }
    }

    pub fn is_weighted(&self) -> bool {
        matches!(self, MeshVertices::Weighted(_))
    }

    /// Flattened setup positions in deform layout.
    pub fn setup_deform(&self) -> Vec<f32> {
        match self {
            MeshVertices::Unweighted(v) => v.iter().flat_map(|p| [p[0], p[1]]).collect(),
            MeshVertices::Weighted(v) => v
                .iter()
                .flat_map(|weights| weights.iter().flat_map(|w| [w.x, w.y]))
                .collect(),
        }
    }
}

pub const REGION_OX1: usize = 0;
pub const REGION_OY1: usize = 1;
pub const REGION_OX2: usize = 2;
pub const REGION_OY2: usize = 3;
pub const REGION_OX3: usize = 4;
pub const REGION_OY3: usize = 5;
pub const REGION_OX4: usize = 6;
pub const REGION_OY4: usize = 7;

#[derive(Clone, Debug)]
pub struct RegionAttachmentData {
    pub name: String,
    pub path: String,
    pub x: f32,
    pub y: f32,
    pub scale_x: f32,
    pub scale_y: f32,
    pub rotation: f32,
    pub width: f32,
    pub height: f32,
    pub color: Color,
    pub region: TextureRegion,
    /// Local corner positions, in the order bottom-left, top-left, top-right, bottom-right.
    pub offset: [f32; 8],
    /// Corner texture coordinates, matching `offset`.
    pub uvs: [f32; 8],
}

impl RegionAttachmentData {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            x: 0.0,
            y: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            rotation: 0.0,
            width: 0.0,
            height: 0.0,
            color: Color::WHITE,
            region: TextureRegion::full(0.0, 0.0),
            offset: [0.0; 8],
            uvs: [0.0; 8],
        }
    }

    pub fn set_region(&mut self, region: TextureRegion) {
        let r = &region;
        self.uvs = if r.rotate {
            [r.u2, r.v2, r.u, r.v2, r.u, r.v, r.u2, r.v]
        } else {
            [r.u, r.v2, r.u, r.v, r.u2, r.v, r.u2, r.v2]
        };
        self.region = region;
    }

    pub fn update_offset(&mut self) {
        let region = &self.region;
        let original_width = if region.original_width != 0.0 {
            region.original_width
        } else {
            1.0
        };
        let original_height = if region.original_height != 0.0 {
            region.original_height
        } else {
            1.0
        };
        let region_scale_x = self.width / original_width * self.scale_x;
        let region_scale_y = self.height / original_height * self.scale_y;
        let local_x = -self.width / 2.0 * self.scale_x + region.offset_x * region_scale_x;
        let local_y = -self.height / 2.0 * self.scale_y + region.offset_y * region_scale_y;
        let local_x2 = local_x + region.width * region_scale_x;
        let local_y2 = local_y + region.height * region_scale_y;

        let radians = self.rotation.to_radians();
        let cos = radians.cos();
        let sin = radians.sin();
        let local_x_cos = local_x * cos + self.x;
        let local_x_sin = local_x * sin;
        let local_y_cos = local_y * cos + self.y;
        let local_y_sin = local_y * sin;
        let local_x2_cos = local_x2 * cos + self.x;
        let local_x2_sin = local_x2 * sin;
        let local_y2_cos = local_y2 * cos + self.y;
        let local_y2_sin = local_y2 * sin;

        let offset = &mut self.offset;
        offset[REGION_OX1] = local_x_cos - local_y_sin;
        offset[REGION_OY1] = local_y_cos + local_x_sin;
        offset[REGION_OX2] = local_x_cos - local_y2_sin;
        offset[REGION_OY2] = local_y2_cos + local_x_sin;
        offset[REGION_OX3] = local_x2_cos - local_y2_sin;
        offset[REGION_OY3] = local_y2_cos + local_x2_sin;
        offset[REGION_OX4] = local_x2_cos - local_y_sin;
        offset[REGION_OY4] = local_y_cos + local_x2_sin;
    }
}

#[derive(Clone, Debug)]
pub struct MeshAttachmentData {
    pub name: String,
    pub path: String,
    pub color: Color,
    pub region: TextureRegion,
    pub vertices: MeshVertices,
    /// Texture coordinates normalized to the region, two floats per vertex.
    pub region_uvs: Vec<f32>,
    /// Texture coordinates mapped into the atlas page, two floats per vertex.
    pub uvs: Vec<f32>,
    pub triangles: Vec<u16>,
    pub hull_length: usize,
    pub edges: Vec<u16>,
    pub width: f32,
    pub height: f32,
    pub inherit_deform: bool,
    /// Set for linked meshes; the parent provides vertices, uvs and triangles.
    pub parent_mesh: Option<AttachmentId>,
}

impl MeshAttachmentData {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            color: Color::WHITE,
            region: TextureRegion::full(1.0, 1.0),
            vertices: MeshVertices::default(),
            region_uvs: Vec::new(),
            uvs: Vec::new(),
            triangles: Vec::new(),
            hull_length: 0,
            edges: Vec::new(),
            width: 0.0,
            height: 0.0,
            inherit_deform: true,
            parent_mesh: None,
        }
    }

    pub fn update_uvs(&mut self) {
        let r = &self.region;
        let (u, v) = (r.u, r.v);
        let width = r.u2 - u;
        let height = r.v2 - v;
        self.uvs.clear();
        self.uvs.reserve(self.region_uvs.len());
        for uv in self.region_uvs.chunks_exact(2) {
            if r.rotate {
                self.uvs.push(u + uv[1] * width);
                self.uvs.push(v + height - uv[0] * height);
            } else {
                self.uvs.push(u + uv[0] * width);
                self.uvs.push(v + uv[1] * height);
            }
        }
    }

    /// Copies topology from `parent` (the linked-mesh relationship).
    pub fn set_parent_mesh(&mut self, parent_id: AttachmentId, parent: &MeshAttachmentData) {
        self.parent_mesh = Some(parent_id);
        self.vertices = parent.vertices.clone();
        self.region_uvs = parent.region_uvs.clone();
        self.triangles = parent.triangles.clone();
        self.hull_length = parent.hull_length;
        self.edges = parent.edges.clone();
        self.update_uvs();
    }
}

#[derive(Clone, Debug)]
pub struct BoundingBoxAttachmentData {
    pub name: String,
    pub vertices: MeshVertices,
}

#[derive(Clone, Debug)]
pub struct PathAttachmentData {
    pub name: String,
    pub vertices: MeshVertices,
    /// Cumulative length at the end of each curve.
    pub lengths: Vec<f32>,
    pub closed: bool,
    pub constant_speed: bool,
}

#[derive(Clone, Debug)]
pub enum AttachmentData {
    Region(RegionAttachmentData),
    Mesh(MeshAttachmentData),
    BoundingBox(BoundingBoxAttachmentData),
    Path(PathAttachmentData),
}

impl AttachmentData {
    pub fn name(&self) -> &str {
        match self {
            AttachmentData::Region(a) => a.name.as_str(),
            AttachmentData::Mesh(a) => a.name.as_str(),
            AttachmentData::BoundingBox(a) => a.name.as_str(),
            AttachmentData::Path(a) => a.name.as_str(),
        }
    }

    /// Local vertices for vertex attachments (everything but regions).
    pub fn vertices(&self) -> Option<&MeshVertices> {
        match self {
            AttachmentData::Region(_) => None,
            AttachmentData::Mesh(a) => Some(&a.vertices),
            AttachmentData::BoundingBox(a) => Some(&a.vertices),
            AttachmentData::Path(a) => Some(&a.vertices),
        }
    }

    /// Whether a deform keyed for `source` should be applied when this attachment (`own_id`) is
    /// active: the same attachment, or a linked mesh inheriting deform from it.
    pub fn applies_deform(&self, own_id: AttachmentId, source: AttachmentId) -> bool {
        if own_id == source {
            return true;
        }
        match self {
            AttachmentData::Mesh(mesh) => mesh.inherit_deform && mesh.parent_mesh == Some(source),
            _ => false,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct SkinData {
    pub name: String,
    attachments: Vec<HashMap<String, AttachmentId>>,
}

impl SkinData {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attachments: Vec::new(),
        }
    }

    pub fn add_attachment(&mut self, slot_index: usize, name: impl Into<String>, id: AttachmentId) {
        if self.attachments.len() <= slot_index {
            self.attachments.resize_with(slot_index + 1, HashMap::new);
        }
        self.attachments[slot_index].insert(name.into(), id);
    }

    pub fn attachment(&self, slot_index: usize, name: &str) -> Option<AttachmentId> {
        self.attachments
            .get(slot_index)
            .and_then(|slot_map| slot_map.get(name))
            .copied()
    }

    /// All `(slot_index, name, attachment)` entries.
    pub fn entries(&self) -> impl Iterator<Item = (usize, &str, AttachmentId)> + '_ {
        self.attachments
            .iter()
            .enumerate()
            .flat_map(|(slot, map)| map.iter().map(move |(k, &id)| (slot, k.as_str(), id)))
    }

    pub fn slot_entries(&self, slot_index: usize) -> impl Iterator<Item = (&str, AttachmentId)> + '_ {
        self.attachments
            .get(slot_index)
            .into_iter()
            .flat_map(|map| map.iter().map(|(k, &id)| (k.as_str(), id)))
    }
}

#[derive(Clone, Debug, Default)]
pub struct EventData {
    pub name: String,
    pub int_value: i32,
    pub float_value: f32,
    pub string: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    pub name: String,
    pub time: f32,
    pub int_value: i32,
    pub float_value: f32,
    pub string: String,
}

impl Event {
    pub fn new(time: f32, data: &EventData) -> Self {
        Self {
            name: data.name.clone(),
            time,
            int_value: data.int_value,
            float_value: data.float_value,
            string: data.string.clone(),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct SkeletonData {
    pub name: Option<String>,
    pub hash: Option<String>,
    pub version: Option<String>,
    pub width: f32,
    pub height: f32,
    pub images_path: Option<String>,
    pub bones: Vec<BoneData>,
    pub slots: Vec<SlotData>,
    pub skins: Vec<SkinData>,
    pub default_skin: Option<usize>,
    pub attachments: Vec<AttachmentData>,
    pub events: Vec<EventData>,
    pub animations: Vec<Animation>,
    pub ik_constraints: Vec<IkConstraintData>,
    pub transform_constraints: Vec<TransformConstraintData>,
    pub path_constraints: Vec<PathConstraintData>,
}

impl SkeletonData {
    pub fn find_bone(&self, name: &str) -> Option<&BoneData> {
        self.bones.iter().find(|b| b.name == name)
    }

    pub fn find_bone_index(&self, name: &str) -> Option<usize> {
        self.bones.iter().position(|b| b.name == name)
    }

    pub fn find_slot(&self, name: &str) -> Option<&SlotData> {
        self.slots.iter().find(|s| s.name == name)
    }

    pub fn find_slot_index(&self, name: &str) -> Option<usize> {
        self.slots.iter().position(|s| s.name == name)
    }

    pub fn find_skin(&self, name: &str) -> Option<&SkinData> {
        self.skins.iter().find(|s| s.name == name)
    }

    pub fn find_skin_index(&self, name: &str) -> Option<usize> {
        self.skins.iter().position(|s| s.name == name)
    }

    pub fn find_event(&self, name: &str) -> Option<&EventData> {
        self.events.iter().find(|e| e.name == name)
    }

    pub fn find_animation(&self, name: &str) -> Option<(usize, &Animation)> {
        self.animations
            .iter()
            .enumerate()
            .find(|(_, a)| a.name == name)
    }

    pub fn find_ik_constraint(&self, name: &str) -> Option<usize> {
        self.ik_constraints.iter().position(|c| c.name == name)
    }

    pub fn find_transform_constraint(&self, name: &str) -> Option<usize> {
        self.transform_constraints
            .iter()
            .position(|c| c.name == name)
    }

    pub fn find_path_constraint(&self, name: &str) -> Option<usize> {
        self.path_constraints.iter().position(|c| c.name == name)
    }

    pub fn attachment(&self, id: AttachmentId) -> Option<&AttachmentData> {
        self.attachments.get(id.index())
    }

    pub fn default_skin(&self) -> Option<&SkinData> {
        self.default_skin.and_then(|i| self.skins.get(i))
    }

    /// Adds an attachment to the arena and returns its id.
    pub fn push_attachment(&mut self, attachment: AttachmentData) -> AttachmentId {
        self.attachments.push(attachment);
        AttachmentId(self.attachments.len() - 1)
    }
}
