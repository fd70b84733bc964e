use crate::{
    Animation, Atlas, AttachmentData, AttachmentId, AttachmentTimeline, BlendMode, BoneData,
    BoundingBoxAttachmentData, Color, ColorTimeline, CurveTimeline, DeformTimeline,
    DrawOrderTimeline, Error, Event, EventData, EventTimeline, IkConstraintData,
    IkConstraintTimeline, MeshAttachmentData, MeshVertices, PathAttachmentData,
    PathConstraintData, PathConstraintMixTimeline, PathConstraintPositionTimeline,
    PathConstraintProperty, PositionMode, RegionAttachmentData, RotateMode, RotateTimeline,
    SkeletonData, SkinData, SlotData, SpacingMode, TextureRegion, Timeline,
    TransformConstraintData, TransformConstraintTimeline, TranslateKind, TranslateTimeline,
    VertexWeight,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct Root {
    skeleton: Option<SkeletonHeader>,
    bones: Option<Vec<BoneDef>>,
    slots: Option<Vec<SlotDef>>,
    ik: Option<Vec<IkConstraintDef>>,
    transform: Option<Vec<TransformConstraintDef>>,
    path: Option<Vec<PathConstraintDef>>,
    skins: Option<BTreeMap<String, BTreeMap<String, BTreeMap<String, AttachmentDef>>>>,
    events: Option<BTreeMap<String, EventDef>>,
    animations: Option<BTreeMap<String, AnimationDef>>,
}

#[derive(Debug, Deserialize)]
struct SkeletonHeader {
    #[serde(default)]
    hash: Option<String>,
    #[serde(default)]
    spine: Option<String>,
    #[serde(default)]
    width: f32,
    #[serde(default)]
    height: f32,
    #[serde(default)]
    images: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BoneDef {
    name: String,
    #[serde(default)]
    parent: Option<String>,
    #[serde(default)]
    length: f32,
    #[serde(default)]
    x: f32,
    #[serde(default)]
    y: f32,
    #[serde(default)]
    rotation: f32,
    #[serde(default = "default_one", rename = "scaleX")]
    scale_x: f32,
    #[serde(default = "default_one", rename = "scaleY")]
    scale_y: f32,
    #[serde(default, rename = "shearX")]
    shear_x: f32,
    #[serde(default, rename = "shearY")]
    shear_y: f32,
    #[serde(default = "default_true", rename = "inheritRotation")]
    inherit_rotation: bool,
    #[serde(default = "default_true", rename = "inheritScale")]
    inherit_scale: bool,
}

#[derive(Debug, Deserialize)]
struct SlotDef {
    name: String,
    bone: String,
    #[serde(default)]
    attachment: Option<String>,
    #[serde(default)]
    color: Option<String>,
    #[serde(default)]
    blend: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IkConstraintDef {
    name: String,
    bones: Vec<String>,
    target: String,
    #[serde(default = "default_one")]
    mix: f32,
    #[serde(default = "default_true", rename = "bendPositive")]
    bend_positive: bool,
}

#[derive(Debug, Deserialize)]
struct TransformConstraintDef {
    name: String,
    bones: Vec<String>,
    target: String,
    #[serde(default)]
    rotation: f32,
    #[serde(default)]
    x: f32,
    #[serde(default)]
    y: f32,
    #[serde(default, rename = "scaleX")]
    scale_x: f32,
    #[serde(default, rename = "scaleY")]
    scale_y: f32,
    #[serde(default, rename = "shearY")]
    shear_y: f32,
    #[serde(default = "default_one", rename = "rotateMix")]
    rotate_mix: f32,
    #[serde(default = "default_one", rename = "translateMix")]
    translate_mix: f32,
    #[serde(default = "default_one", rename = "scaleMix")]
    scale_mix: f32,
    #[serde(default = "default_one", rename = "shearMix")]
    shear_mix: f32,
}

#[derive(Debug, Deserialize)]
struct PathConstraintDef {
    name: String,
    bones: Vec<String>,
    target: String,
    #[serde(default, rename = "positionMode")]
    position_mode: Option<String>,
    #[serde(default, rename = "spacingMode")]
    spacing_mode: Option<String>,
    #[serde(default, rename = "rotateMode")]
    rotate_mode: Option<String>,
    #[serde(default)]
    rotation: f32,
    #[serde(default)]
    position: f32,
    #[serde(default)]
    spacing: f32,
    #[serde(default = "default_one", rename = "rotateMix")]
    rotate_mix: f32,
    #[serde(default = "default_one", rename = "translateMix")]
    translate_mix: f32,
}

/// Every attachment type shares one flat definition; fields a type does not use are ignored.
#[derive(Debug, Deserialize)]
struct AttachmentDef {
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    x: f32,
    #[serde(default)]
    y: f32,
    #[serde(default = "default_one", rename = "scaleX")]
    scale_x: f32,
    #[serde(default = "default_one", rename = "scaleY")]
    scale_y: f32,
    #[serde(default)]
    rotation: f32,
    #[serde(default)]
    width: f32,
    #[serde(default)]
    height: f32,
    #[serde(default)]
    color: Option<String>,
    #[serde(default, rename = "vertexCount")]
    vertex_count: usize,
    #[serde(default)]
    vertices: Option<Vec<f32>>,
    #[serde(default)]
    uvs: Option<Vec<f32>>,
    #[serde(default)]
    triangles: Option<Vec<u16>>,
    #[serde(default)]
    hull: usize,
    #[serde(default)]
    edges: Option<Vec<u16>>,
    #[serde(default)]
    parent: Option<String>,
    #[serde(default)]
    skin: Option<String>,
    #[serde(default = "default_true")]
    deform: bool,
    #[serde(default)]
    closed: bool,
    #[serde(default = "default_true", rename = "constantSpeed")]
    constant_speed: bool,
    #[serde(default)]
    lengths: Option<Vec<f32>>,
}

#[derive(Debug, Deserialize, Default)]
struct EventDef {
    #[serde(default, rename = "int")]
    int_value: i32,
    #[serde(default, rename = "float")]
    float_value: f32,
    #[serde(default, rename = "string")]
    string_value: String,
}

#[derive(Debug, Deserialize, Default)]
struct AnimationDef {
    #[serde(default)]
    slots: BTreeMap<String, BTreeMap<String, Vec<KeyDef>>>,
    #[serde(default)]
    bones: BTreeMap<String, BTreeMap<String, Vec<KeyDef>>>,
    #[serde(default)]
    ik: BTreeMap<String, Vec<KeyDef>>,
    #[serde(default)]
    transform: BTreeMap<String, Vec<KeyDef>>,
    #[serde(default)]
    paths: BTreeMap<String, BTreeMap<String, Vec<KeyDef>>>,
    #[serde(default)]
    deform: BTreeMap<String, BTreeMap<String, BTreeMap<String, Vec<KeyDef>>>>,
    #[serde(default, rename = "drawOrder", alias = "draworder")]
    draw_order: Option<Vec<DrawOrderKeyDef>>,
    #[serde(default)]
    events: Vec<EventKeyDef>,
}

/// One key of any curve timeline.
#[derive(Debug, Deserialize)]
struct KeyDef {
    #[serde(default)]
    time: f32,
    #[serde(default)]
    curve: Option<serde_json::Value>,
    #[serde(default)]
    angle: f32,
    #[serde(default)]
    x: f32,
    #[serde(default)]
    y: f32,
    #[serde(default)]
    color: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default = "default_one")]
    mix: f32,
    #[serde(default = "default_true", rename = "bendPositive")]
    bend_positive: bool,
    #[serde(default = "default_one", rename = "rotateMix")]
    rotate_mix: f32,
    #[serde(default = "default_one", rename = "translateMix")]
    translate_mix: f32,
    #[serde(default = "default_one", rename = "scaleMix")]
    scale_mix: f32,
    #[serde(default = "default_one", rename = "shearMix")]
    shear_mix: f32,
    #[serde(default)]
    position: f32,
    #[serde(default)]
    spacing: f32,
    #[serde(default)]
    offset: usize,
    #[serde(default)]
    vertices: Option<Vec<f32>>,
}

#[derive(Debug, Deserialize)]
struct DrawOrderKeyDef {
    #[serde(default)]
    time: f32,
    #[serde(default)]
    offsets: Option<Vec<DrawOrderOffset>>,
}

#[derive(Debug, Deserialize)]
struct DrawOrderOffset {
    slot: String,
    offset: i32,
}

#[derive(Debug, Deserialize)]
struct EventKeyDef {
    #[serde(default)]
    time: f32,
    name: String,
    #[serde(default, rename = "int")]
    int_value: Option<i32>,
    #[serde(default, rename = "float")]
    float_value: Option<f32>,
    #[serde(default, rename = "string")]
    string_value: Option<String>,
}

/// A linked mesh waiting for its parent; parents may live in skins read later.
struct PendingLinkedMesh {
    id: AttachmentId,
    slot_index: usize,
    name: String,
    skin: Option<String>,
    parent: String,
}

/// Loads skeleton data from Spine JSON.
///
/// `scale` multiplies every positional value (bone translation and length, attachment geometry,
/// constraint offsets, translate/deform keys and path position/spacing in absolute modes).
/// When `atlas` is set, region and mesh attachments resolve their texture region by `path`;
/// otherwise each attachment maps the full texture.
#[derive(Copy, Clone, Debug)]
pub struct SkeletonJson<'a> {
    pub scale: f32,
    pub atlas: Option<&'a Atlas>,
}

impl Default for SkeletonJson<'_> {
    fn default() -> Self {
        Self {
            scale: 1.0,
            atlas: None,
        }
    }
}

impl<'a> SkeletonJson<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_atlas(atlas: &'a Atlas) -> Self {
        Self {
            scale: 1.0,
            atlas: Some(atlas),
        }
    }

    pub fn read_skeleton_data(&self, input: &str) -> Result<Arc<SkeletonData>, Error> {
        let root: Root = serde_json::from_str(input).map_err(|e| Error::JsonParse {
            message: e.to_string(),
        })?;
        let scale = if self.scale.is_finite() { self.scale } else { 1.0 };

        let mut data = SkeletonData::default();
        if let Some(header) = root.skeleton {
            if let Some(version) = header.spine.as_deref() {
                if !version.starts_with("3.") {
                    log::warn!("skeleton was exported by Spine {version}; expected a 3.x export");
                }
            }
            data.hash = header.hash;
            data.version = header.spine;
            data.width = header.width;
            data.height = header.height;
            data.images_path = header.images;
        }

        for (index, bone) in root.bones.unwrap_or_default().into_iter().enumerate() {
            let parent = match bone.parent.as_deref() {
                None => None,
                Some(parent_name) => Some(data.find_bone_index(parent_name).ok_or_else(|| {
                    Error::JsonUnknownBoneParent {
                        bone: bone.name.clone(),
                        parent: parent_name.to_string(),
                    }
                })?),
            };
            let mut bone_data = BoneData::new(index, bone.name, parent);
            bone_data.length = bone.length * scale;
            bone_data.x = bone.x * scale;
            bone_data.y = bone.y * scale;
            bone_data.rotation = bone.rotation;
            bone_data.scale_x = bone.scale_x;
            bone_data.scale_y = bone.scale_y;
            bone_data.shear_x = bone.shear_x;
            bone_data.shear_y = bone.shear_y;
            bone_data.inherit_rotation = bone.inherit_rotation;
            bone_data.inherit_scale = bone.inherit_scale;
            data.bones.push(bone_data);
        }

        for (index, slot) in root.slots.unwrap_or_default().into_iter().enumerate() {
            let bone = data
                .find_bone_index(&slot.bone)
                .ok_or_else(|| Error::JsonUnknownSlotBone {
                    slot: slot.name.clone(),
                    bone: slot.bone.clone(),
                })?;
            let mut slot_data = SlotData::new(index, slot.name.clone(), bone);
            if let Some(color) = slot.color.as_deref() {
                slot_data.color = parse_color(color, &format!("slot '{}'", slot.name))?;
            }
            slot_data.attachment = slot.attachment;
            slot_data.blend = parse_blend_mode(slot.blend.as_deref(), &slot.name)?;
            data.slots.push(slot_data);
        }

        for ik in root.ik.unwrap_or_default() {
            let bones = ik
                .bones
                .iter()
                .map(|name| {
                    data.find_bone_index(name)
                        .ok_or_else(|| Error::JsonUnknownIkConstraintBone {
                            constraint: ik.name.clone(),
                            bone: name.clone(),
                        })
                })
                .collect::<Result<Vec<_>, _>>()?;
            let target = data.find_bone_index(&ik.target).ok_or_else(|| {
                Error::JsonUnknownIkConstraintTarget {
                    constraint: ik.name.clone(),
                    bone: ik.target.clone(),
                }
            })?;
            data.ik_constraints.push(IkConstraintData {
                name: ik.name,
                bones,
                target,
                bend_direction: if ik.bend_positive { 1 } else { -1 },
                mix: ik.mix,
            });
        }

        for constraint in root.transform.unwrap_or_default() {
            let bones = constraint
                .bones
                .iter()
                .map(|name| {
                    data.find_bone_index(name).ok_or_else(|| {
                        Error::JsonUnknownTransformConstraintBone {
                            constraint: constraint.name.clone(),
                            bone: name.clone(),
                        }
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            let target = data.find_bone_index(&constraint.target).ok_or_else(|| {
                Error::JsonUnknownTransformConstraintTarget {
                    constraint: constraint.name.clone(),
                    bone: constraint.target.clone(),
                }
            })?;
            data.transform_constraints.push(TransformConstraintData {
                name: constraint.name,
                bones,
                target,
                rotate_mix: constraint.rotate_mix,
                translate_mix: constraint.translate_mix,
                scale_mix: constraint.scale_mix,
                shear_mix: constraint.shear_mix,
                offset_rotation: constraint.rotation,
                offset_x: constraint.x * scale,
                offset_y: constraint.y * scale,
                offset_scale_x: constraint.scale_x,
                offset_scale_y: constraint.scale_y,
                offset_shear_y: constraint.shear_y,
            });
        }

        for constraint in root.path.unwrap_or_default() {
            let bones = constraint
                .bones
                .iter()
                .map(|name| {
                    data.find_bone_index(name)
                        .ok_or_else(|| Error::JsonUnknownPathConstraintBone {
                            constraint: constraint.name.clone(),
                            bone: name.clone(),
                        })
                })
                .collect::<Result<Vec<_>, _>>()?;
            let target = data.find_slot_index(&constraint.target).ok_or_else(|| {
                Error::JsonUnknownPathConstraintTargetSlot {
                    constraint: constraint.name.clone(),
                    slot: constraint.target.clone(),
                }
            })?;
            let position_mode =
                parse_position_mode(constraint.position_mode.as_deref(), &constraint.name)?;
            let spacing_mode =
                parse_spacing_mode(constraint.spacing_mode.as_deref(), &constraint.name)?;
            let rotate_mode =
                parse_rotate_mode(constraint.rotate_mode.as_deref(), &constraint.name)?;
            let position = if position_mode == PositionMode::Fixed {
                constraint.position * scale
            } else {
                constraint.position
            };
            let spacing = if matches!(spacing_mode, SpacingMode::Length | SpacingMode::Fixed) {
                constraint.spacing * scale
            } else {
                constraint.spacing
            };
            data.path_constraints.push(PathConstraintData {
                name: constraint.name,
                bones,
                target,
                position_mode,
                spacing_mode,
                rotate_mode,
                offset_rotation: constraint.rotation,
                position,
                spacing,
                rotate_mix: constraint.rotate_mix,
                translate_mix: constraint.translate_mix,
            });
        }

        let mut linked_meshes = Vec::new();
        for (skin_name, slots) in root.skins.unwrap_or_default() {
            let mut skin = SkinData::new(skin_name.clone());
            for (slot_name, attachments) in slots {
                let slot_index =
                    data.find_slot_index(&slot_name)
                        .ok_or_else(|| Error::JsonUnknownSkinSlot {
                            skin: skin_name.clone(),
                            slot: slot_name.clone(),
                        })?;
                for (key, def) in attachments {
                    let ctx = AttachmentContext {
                        skin: &skin_name,
                        slot: &slot_name,
                        key: &key,
                    };
                    let attachment = self.read_attachment(&ctx, def, data.bones.len(), scale)?;
                    let linked = attachment.linked;
                    let id = data.push_attachment(attachment.data);
                    if let Some((skin, parent)) = linked {
                        linked_meshes.push(PendingLinkedMesh {
                            id,
                            slot_index,
                            name: key.clone(),
                            skin,
                            parent,
                        });
                    }
                    skin.add_attachment(slot_index, key, id);
                }
            }
            if skin_name == "default" {
                data.default_skin = Some(data.skins.len());
            }
            data.skins.push(skin);
        }

        for linked in linked_meshes {
            resolve_linked_mesh(&mut data, linked)?;
        }

        for (name, event) in root.events.unwrap_or_default() {
            data.events.push(EventData {
                name,
                int_value: event.int_value,
                float_value: event.float_value,
                string: event.string_value,
            });
        }

        for (name, animation) in root.animations.unwrap_or_default() {
            let animation = read_animation(&data, name, animation, scale)?;
            data.animations.push(animation);
        }

        log::debug!(
            "loaded skeleton: {} bones, {} slots, {} skins, {} attachments, {} animations",
            data.bones.len(),
            data.slots.len(),
            data.skins.len(),
            data.attachments.len(),
            data.animations.len()
        );
        Ok(Arc::new(data))
    }

    fn resolve_region(
        &self,
        attachment: &str,
        path: &str,
        width: f32,
        height: f32,
    ) -> Result<TextureRegion, Error> {
        match self.atlas {
            Some(atlas) => atlas
                .find_region(path)
                .map(|region| region.region.clone())
                .ok_or_else(|| Error::JsonUnknownRegion {
                    attachment: attachment.to_string(),
                    path: path.to_string(),
                }),
            None => Ok(TextureRegion::full(width, height)),
        }
    }

    fn read_attachment(
        &self,
        ctx: &AttachmentContext<'_>,
        def: AttachmentDef,
        bone_count: usize,
        scale: f32,
    ) -> Result<ReadAttachment, Error> {
        let name = def.name.clone().unwrap_or_else(|| ctx.key.to_string());
        let kind = def
            .kind
            .as_deref()
            .unwrap_or("region")
            .to_ascii_lowercase();
        let color = match def.color.as_deref() {
            Some(hex) => parse_color(hex, &format!("attachment '{name}'"))?,
            None => Color::WHITE,
        };

        let data = match kind.as_str() {
            "region" => {
                let path = def.path.clone().unwrap_or_else(|| name.clone());
                let width = def.width * scale;
                let height = def.height * scale;
                let region = self.resolve_region(&name, &path, width, height)?;
                let mut region_data = RegionAttachmentData::new(name, path);
                region_data.x = def.x * scale;
                region_data.y = def.y * scale;
                region_data.scale_x = def.scale_x;
                region_data.scale_y = def.scale_y;
                region_data.rotation = def.rotation;
                region_data.width = width;
                region_data.height = height;
                region_data.color = color;
                region_data.set_region(region);
                region_data.update_offset();
                AttachmentData::Region(region_data)
            }
            "boundingbox" => {
                let vertices = read_vertices(
                    def.vertices.as_deref().unwrap_or_default(),
                    def.vertex_count * 2,
                    bone_count,
                    scale,
                )
                .map_err(|message| ctx.invalid_mesh(message))?;
                AttachmentData::BoundingBox(BoundingBoxAttachmentData { name, vertices })
            }
            "mesh" | "linkedmesh" => {
                let path = def.path.clone().unwrap_or_else(|| name.clone());
                let width = def.width * scale;
                let height = def.height * scale;
                let mut mesh = MeshAttachmentData::new(name.clone(), path.clone());
                mesh.region = self.resolve_region(&name, &path, width, height)?;
                mesh.color = color;
                mesh.width = width;
                mesh.height = height;

                if let Some(parent) = def.parent {
                    mesh.inherit_deform = def.deform;
                    return Ok(ReadAttachment {
                        data: AttachmentData::Mesh(mesh),
                        linked: Some((def.skin, parent)),
                    });
                }

                let uvs = def.uvs.unwrap_or_default();
                if uvs.len() % 2 != 0 {
                    return Err(ctx.invalid_mesh(format!("odd uv count {}", uvs.len())));
                }
                mesh.vertices = read_vertices(
                    def.vertices.as_deref().unwrap_or_default(),
                    uvs.len(),
                    bone_count,
                    scale,
                )
                .map_err(|message| ctx.invalid_mesh(message))?;
                let triangles = def.triangles.unwrap_or_default();
                let vertex_count = uvs.len() / 2;
                if let Some(bad) = triangles.iter().find(|&&t| usize::from(t) >= vertex_count) {
                    return Err(ctx.invalid_mesh(format!(
                        "triangle index {bad} out of range for {vertex_count} vertices"
                    )));
                }
                mesh.triangles = triangles;
                mesh.hull_length = def.hull * 2;
                mesh.edges = def.edges.unwrap_or_default();
                mesh.region_uvs = uvs;
                mesh.update_uvs();
                AttachmentData::Mesh(mesh)
            }
            "path" => {
                let vertices = read_vertices(
                    def.vertices.as_deref().unwrap_or_default(),
                    def.vertex_count * 2,
                    bone_count,
                    scale,
                )
                .map_err(|message| ctx.invalid_mesh(message))?;
                let curve_count = def.vertex_count / 3;
                let lengths = def.lengths.unwrap_or_default();
                if lengths.len() < curve_count {
                    return Err(ctx.invalid_mesh(format!(
                        "expected {curve_count} path lengths, got {}",
                        lengths.len()
                    )));
                }
                AttachmentData::Path(PathAttachmentData {
                    name,
                    vertices,
                    lengths: lengths[..curve_count].iter().map(|l| l * scale).collect(),
                    closed: def.closed,
                    constant_speed: def.constant_speed,
                })
            }
            _ => {
                return Err(Error::JsonUnsupportedAttachmentType {
                    skin: ctx.skin.to_string(),
                    slot: ctx.slot.to_string(),
                    attachment: ctx.key.to_string(),
                    attachment_type: def.kind.unwrap_or_default(),
                });
            }
        };
        Ok(ReadAttachment { data, linked: None })
    }
}

struct AttachmentContext<'a> {
    skin: &'a str,
    slot: &'a str,
    key: &'a str,
}

impl AttachmentContext<'_> {
    fn invalid_mesh(&self, message: String) -> Error {
        Error::JsonInvalidMeshData {
            skin: self.skin.to_string(),
            slot: self.slot.to_string(),
            attachment: self.key.to_string(),
            message,
        }
    }
}

struct ReadAttachment {
    data: AttachmentData,
    /// `(skin, parent)` for linked meshes.
    linked: Option<(Option<String>, String)>,
}

impl SkeletonData {
    pub fn from_json_str(input: &str) -> Result<Arc<Self>, Error> {
        SkeletonJson::default().read_skeleton_data(input)
    }

    pub fn from_json_str_with_scale(input: &str, scale: f32) -> Result<Arc<Self>, Error> {
        SkeletonJson {
            scale,
            ..SkeletonJson::default()
        }
        .read_skeleton_data(input)
    }

    pub fn from_json_str_with_atlas(input: &str, atlas: &Atlas) -> Result<Arc<Self>, Error> {
        SkeletonJson::with_atlas(atlas).read_skeleton_data(input)
    }
}

fn resolve_linked_mesh(data: &mut SkeletonData, linked: PendingLinkedMesh) -> Result<(), Error> {
    let skin_index = match linked.skin.as_deref() {
        Some(name) => data.find_skin_index(name),
        None => data.default_skin,
    }
    .ok_or_else(|| Error::JsonUnknownLinkedMeshSkin {
        attachment: linked.name.clone(),
        skin: linked.skin.clone().unwrap_or_else(|| "default".to_string()),
    })?;

    let unknown_parent = || Error::JsonUnknownLinkedMeshParent {
        attachment: linked.name.clone(),
        parent: linked.parent.clone(),
    };
    let parent_id = data.skins[skin_index]
        .attachment(linked.slot_index, &linked.parent)
        .ok_or_else(unknown_parent)?;
    let parent = match data.attachment(parent_id) {
        Some(AttachmentData::Mesh(parent)) => parent.clone(),
        _ => return Err(unknown_parent()),
    };
    if let Some(AttachmentData::Mesh(mesh)) = data.attachments.get_mut(linked.id.index()) {
        mesh.set_parent_mesh(parent_id, &parent);
    }
    Ok(())
}

/// Decodes attachment vertices. A list of exactly `vertices_length` floats holds plain x/y
/// pairs; anything else is the weighted form `[bone_count, (bone, x, y, weight) * bone_count]`
/// repeated per vertex.
fn read_vertices(
    values: &[f32],
    vertices_length: usize,
    bone_count: usize,
    scale: f32,
) -> Result<MeshVertices, String> {
    if values.len() == vertices_length {
        if vertices_length % 2 != 0 {
            return Err(format!("odd vertex float count {vertices_length}"));
        }
        return Ok(MeshVertices::Unweighted(
            values
                .chunks_exact(2)
                .map(|p| [p[0] * scale, p[1] * scale])
                .collect(),
        ));
    }

    fn expect_index(value: f32) -> Option<usize> {
        (value >= 0.0 && value.fract() == 0.0).then_some(value as usize)
    }

    let mut weighted = Vec::with_capacity(vertices_length / 2);
    let mut i = 0;
    while i < values.len() {
        let influences = expect_index(values[i])
            .ok_or_else(|| format!("invalid bone count {} at {i}", values[i]))?;
        i += 1;
        if i + influences * 4 > values.len() {
            return Err(format!("truncated weighted vertex at {i}"));
        }
        let mut weights = Vec::with_capacity(influences);
        for _ in 0..influences {
            let bone = expect_index(values[i])
                .filter(|&b| b < bone_count)
                .ok_or_else(|| format!("invalid bone index {} at {i}", values[i]))?;
            weights.push(VertexWeight {
                bone,
                x: values[i + 1] * scale,
                y: values[i + 2] * scale,
                weight: values[i + 3],
            });
            i += 4;
        }
        weighted.push(weights);
    }
    if weighted.len() * 2 != vertices_length {
        return Err(format!(
            "expected {} weighted vertices, got {}",
            vertices_length / 2,
            weighted.len()
        ));
    }
    Ok(MeshVertices::Weighted(weighted))
}

fn read_animation(
    data: &SkeletonData,
    name: String,
    def: AnimationDef,
    scale: f32,
) -> Result<Animation, Error> {
    let mut timelines = Vec::new();

    for (slot_name, slot_map) in &def.slots {
        let slot_index =
            data.find_slot_index(slot_name)
                .ok_or_else(|| Error::JsonUnknownSlotTimelineSlot {
                    animation: name.clone(),
                    slot: slot_name.clone(),
                })?;
        for (timeline_name, keys) in slot_map {
            if keys.is_empty() {
                continue;
            }
            let context = format!("{name}/slots/{slot_name}/{timeline_name}");
            match timeline_name.as_str() {
                "color" => {
                    let mut timeline = ColorTimeline::new(keys.len(), slot_index);
                    for (i, key) in keys.iter().enumerate() {
                        let color = match key.color.as_deref() {
                            Some(hex) => parse_color(hex, &context)?,
                            None => Color::WHITE,
                        };
                        timeline.set_frame(i, key.time, color.r, color.g, color.b, color.a);
                        read_curve(&mut timeline.curves, i, key.curve.as_ref(), &context)?;
                    }
                    timelines.push(Timeline::Color(timeline));
                }
                "attachment" => {
                    let mut timeline = AttachmentTimeline::new(keys.len(), slot_index);
                    for (i, key) in keys.iter().enumerate() {
                        timeline.set_frame(i, key.time, key.name.clone());
                    }
                    timelines.push(Timeline::Attachment(timeline));
                }
                other => {
                    return Err(Error::JsonUnsupportedTimeline {
                        animation: name.clone(),
                        kind: "slot".to_string(),
                        timeline: other.to_string(),
                    });
                }
            }
        }
    }

    for (bone_name, bone_map) in &def.bones {
        let bone_index =
            data.find_bone_index(bone_name)
                .ok_or_else(|| Error::JsonUnknownAnimationBone {
                    animation: name.clone(),
                    bone: bone_name.clone(),
                })?;
        for (timeline_name, keys) in bone_map {
            if keys.is_empty() {
                continue;
            }
            let context = format!("{name}/bones/{bone_name}/{timeline_name}");
            let kind = match timeline_name.as_str() {
                "rotate" => {
                    let mut timeline = RotateTimeline::new(keys.len(), bone_index);
                    for (i, key) in keys.iter().enumerate() {
                        timeline.set_frame(i, key.time, key.angle);
                        read_curve(&mut timeline.curves, i, key.curve.as_ref(), &context)?;
                    }
                    timelines.push(Timeline::Rotate(timeline));
                    continue;
                }
                "translate" => TranslateKind::Translate,
                "scale" => TranslateKind::Scale,
                "shear" => TranslateKind::Shear,
                other => {
                    return Err(Error::JsonUnsupportedTimeline {
                        animation: name.clone(),
                        kind: "bone".to_string(),
                        timeline: other.to_string(),
                    });
                }
            };
            let timeline_scale = if kind == TranslateKind::Translate {
                scale
            } else {
                1.0
            };
            let mut timeline = TranslateTimeline::new(kind, keys.len(), bone_index);
            for (i, key) in keys.iter().enumerate() {
                timeline.set_frame(
                    i,
                    key.time,
                    key.x * timeline_scale,
                    key.y * timeline_scale,
                );
                read_curve(&mut timeline.curves, i, key.curve.as_ref(), &context)?;
            }
            timelines.push(Timeline::Translate(timeline));
        }
    }

    for (constraint_name, keys) in &def.ik {
        let index = data.find_ik_constraint(constraint_name).ok_or_else(|| {
            Error::JsonUnknownIkConstraintTimeline {
                animation: name.clone(),
                constraint: constraint_name.clone(),
            }
        })?;
        if keys.is_empty() {
            continue;
        }
        let context = format!("{name}/ik/{constraint_name}");
        let mut timeline = IkConstraintTimeline::new(keys.len(), index);
        for (i, key) in keys.iter().enumerate() {
            let bend = if key.bend_positive { 1 } else { -1 };
            timeline.set_frame(i, key.time, key.mix, bend);
            read_curve(&mut timeline.curves, i, key.curve.as_ref(), &context)?;
        }
        timelines.push(Timeline::IkConstraint(timeline));
    }

    for (constraint_name, keys) in &def.transform {
        let index = data
            .find_transform_constraint(constraint_name)
            .ok_or_else(|| Error::JsonUnknownTransformConstraintTimeline {
                animation: name.clone(),
                constraint: constraint_name.clone(),
            })?;
        if keys.is_empty() {
            continue;
        }
        let context = format!("{name}/transform/{constraint_name}");
        let mut timeline = TransformConstraintTimeline::new(keys.len(), index);
        for (i, key) in keys.iter().enumerate() {
            timeline.set_frame(
                i,
                key.time,
                key.rotate_mix,
                key.translate_mix,
                key.scale_mix,
                key.shear_mix,
            );
            read_curve(&mut timeline.curves, i, key.curve.as_ref(), &context)?;
        }
        timelines.push(Timeline::TransformConstraint(timeline));
    }

    for (constraint_name, constraint_map) in &def.paths {
        let index = data.find_path_constraint(constraint_name).ok_or_else(|| {
            Error::JsonUnknownPathConstraintTimeline {
                animation: name.clone(),
                constraint: constraint_name.clone(),
            }
        })?;
        let constraint = &data.path_constraints[index];
        for (timeline_name, keys) in constraint_map {
            if keys.is_empty() {
                continue;
            }
            let context = format!("{name}/paths/{constraint_name}/{timeline_name}");
            match timeline_name.as_str() {
                "position" | "spacing" => {
                    let (property, timeline_scale) = if timeline_name == "spacing" {
                        let absolute = matches!(
                            constraint.spacing_mode,
                            SpacingMode::Length | SpacingMode::Fixed
                        );
                        (
                            PathConstraintProperty::Spacing,
                            if absolute { scale } else { 1.0 },
                        )
                    } else {
                        let absolute = constraint.position_mode == PositionMode::Fixed;
                        (
                            PathConstraintProperty::Position,
                            if absolute { scale } else { 1.0 },
                        )
                    };
                    let mut timeline =
                        PathConstraintPositionTimeline::new(property, keys.len(), index);
                    for (i, key) in keys.iter().enumerate() {
                        let value = match property {
                            PathConstraintProperty::Position => key.position,
                            PathConstraintProperty::Spacing => key.spacing,
                        };
                        timeline.set_frame(i, key.time, value * timeline_scale);
                        read_curve(&mut timeline.curves, i, key.curve.as_ref(), &context)?;
                    }
                    timelines.push(Timeline::PathConstraintPosition(timeline));
                }
                "mix" => {
                    let mut timeline = PathConstraintMixTimeline::new(keys.len(), index);
                    for (i, key) in keys.iter().enumerate() {
                        timeline.set_frame(i, key.time, key.rotate_mix, key.translate_mix);
                        read_curve(&mut timeline.curves, i, key.curve.as_ref(), &context)?;
                    }
                    timelines.push(Timeline::PathConstraintMix(timeline));
                }
                other => {
                    return Err(Error::JsonUnsupportedTimeline {
                        animation: name.clone(),
                        kind: "path".to_string(),
                        timeline: other.to_string(),
                    });
                }
            }
        }
    }

    for (skin_name, slots) in &def.deform {
        let skin = data
            .find_skin(skin_name)
            .ok_or_else(|| Error::JsonUnknownDeformSkin {
                animation: name.clone(),
                skin: skin_name.clone(),
            })?;
        for (slot_name, attachments) in slots {
            let slot_index =
                data.find_slot_index(slot_name)
                    .ok_or_else(|| Error::JsonUnknownDeformSlot {
                        animation: name.clone(),
                        skin: skin_name.clone(),
                        slot: slot_name.clone(),
                    })?;
            for (attachment_name, keys) in attachments {
                let unknown_attachment = || Error::JsonUnknownDeformAttachment {
                    animation: name.clone(),
                    skin: skin_name.clone(),
                    slot: slot_name.clone(),
                    attachment: attachment_name.clone(),
                };
                let id = skin
                    .attachment(slot_index, attachment_name)
                    .ok_or_else(unknown_attachment)?;
                let vertices = data
                    .attachment(id)
                    .and_then(AttachmentData::vertices)
                    .ok_or_else(unknown_attachment)?;
                if keys.is_empty() {
                    continue;
                }

                let weighted = vertices.is_weighted();
                let deform_length = vertices.deform_length();
                let setup = vertices.setup_deform();
                let context = format!("{name}/deform/{skin_name}/{slot_name}/{attachment_name}");

                let mut timeline = DeformTimeline::new(keys.len(), slot_index, id);
                for (i, key) in keys.iter().enumerate() {
                    let deform = match key.vertices.as_deref() {
                        None if weighted => vec![0.0; deform_length],
                        None => setup.clone(),
                        Some(values) => {
                            let start = key.offset;
                            if start + values.len() > deform_length {
                                return Err(Error::JsonInvalidMeshData {
                                    skin: skin_name.clone(),
                                    slot: slot_name.clone(),
                                    attachment: attachment_name.clone(),
                                    message: format!(
                                        "deform key at {} writes past {deform_length} floats",
                                        key.time
                                    ),
                                });
                            }
                            let mut deform = vec![0.0; deform_length];
                            for (dst, value) in deform[start..].iter_mut().zip(values) {
                                *dst = value * scale;
                            }
                            if !weighted {
                                for (dst, base) in deform.iter_mut().zip(&setup) {
                                    *dst += base;
                                }
                            }
                            deform
                        }
                    };
                    timeline.set_frame(i, key.time, deform);
                    read_curve(&mut timeline.curves, i, key.curve.as_ref(), &context)?;
                }
                timelines.push(Timeline::Deform(timeline));
            }
        }
    }

    if let Some(keys) = def.draw_order.as_deref().filter(|keys| !keys.is_empty()) {
        let mut timeline = DrawOrderTimeline::new(keys.len());
        for (i, key) in keys.iter().enumerate() {
            let draw_order = match key.offsets.as_deref() {
                None => None,
                Some(offsets) => Some(build_draw_order(offsets, data, &name)?),
            };
            timeline.set_frame(i, key.time, draw_order);
        }
        timelines.push(Timeline::DrawOrder(timeline));
    }

    if !def.events.is_empty() {
        let mut timeline = EventTimeline::new(def.events.len());
        for (i, key) in def.events.iter().enumerate() {
            let event_data = data
                .find_event(&key.name)
                .ok_or_else(|| Error::JsonUnknownEvent {
                    animation: name.clone(),
                    event: key.name.clone(),
                })?;
            let mut event = Event::new(key.time, event_data);
            if let Some(value) = key.int_value {
                event.int_value = value;
            }
            if let Some(value) = key.float_value {
                event.float_value = value;
            }
            if let Some(value) = key.string_value.as_ref() {
                event.string = value.clone();
            }
            timeline.set_frame(i, event);
        }
        timelines.push(Timeline::Event(timeline));
    }

    let mut duration = 0.0f32;
    for timeline in &timelines {
        let last = timeline.duration();
        if last.is_nan() {
            return Err(Error::JsonInvalidDuration { animation: name });
        }
        duration = duration.max(last);
    }

    Ok(Animation::new(name, timelines, duration))
}

/// Expands draw-order offsets into a full setup-index permutation. Slots without an offset keep
/// their relative order and fill the positions the moved slots left free.
fn build_draw_order(
    offsets: &[DrawOrderOffset],
    data: &SkeletonData,
    animation: &str,
) -> Result<Vec<usize>, Error> {
    let slot_count = data.slots.len();
    let mut draw_order = vec![usize::MAX; slot_count];
    let mut unchanged = Vec::with_capacity(slot_count.saturating_sub(offsets.len()));
    let mut original_index = 0usize;

    for offset in offsets {
        let slot_index =
            data.find_slot_index(&offset.slot)
                .ok_or_else(|| Error::JsonInvalidDrawOrder {
                    animation: animation.to_string(),
                    message: format!("unknown slot '{}' in drawOrder offsets", offset.slot),
                })?;
        if slot_index < original_index {
            return Err(Error::JsonInvalidDrawOrder {
                animation: animation.to_string(),
                message: format!("drawOrder offsets are not in slot order at '{}'", offset.slot),
            });
        }
        while original_index != slot_index {
            unchanged.push(original_index);
            original_index += 1;
        }

        let target = original_index as i64 + i64::from(offset.offset);
        if target < 0 || target >= slot_count as i64 {
            return Err(Error::JsonInvalidDrawOrder {
                animation: animation.to_string(),
                message: format!(
                    "drawOrder offset out of range for slot '{}' (offset {})",
                    offset.slot, offset.offset
                ),
            });
        }
        let target = target as usize;
        if draw_order[target] != usize::MAX {
            return Err(Error::JsonInvalidDrawOrder {
                animation: animation.to_string(),
                message: "drawOrder produced duplicate target indices".to_string(),
            });
        }
        draw_order[target] = original_index;
        original_index += 1;
    }

    while original_index < slot_count {
        unchanged.push(original_index);
        original_index += 1;
    }

    for slot in draw_order.iter_mut().rev() {
        if *slot == usize::MAX {
            *slot = unchanged.pop().ok_or_else(|| Error::JsonInvalidDrawOrder {
                animation: animation.to_string(),
                message: "drawOrder failed to fill unchanged indices".to_string(),
            })?;
        }
    }

    Ok(draw_order)
}

fn read_curve(
    curves: &mut CurveTimeline,
    frame_index: usize,
    value: Option<&serde_json::Value>,
    context: &str,
) -> Result<(), Error> {
    let Some(value) = value else {
        return Ok(());
    };
    if let Some(name) = value.as_str() {
        if name == "stepped" {
            curves.set_stepped(frame_index);
        }
        return Ok(());
    }
    let Some(points) = value.as_array() else {
        return Ok(());
    };
    if points.len() != 4 {
        return Err(Error::JsonInvalidCurve {
            context: context.to_string(),
            message: format!("expected 4 numbers, got {}", points.len()),
        });
    }
    let mut handles = [0.0f32; 4];
    for (i, (dst, point)) in handles.iter_mut().zip(points).enumerate() {
        *dst = point.as_f64().ok_or_else(|| Error::JsonInvalidCurve {
            context: context.to_string(),
            message: format!("curve[{i}] must be a number"),
        })? as f32;
    }
    let [cx1, cy1, cx2, cy2] = handles;
    curves.set_curve(frame_index, cx1, cy1, cx2, cy2);
    Ok(())
}

fn default_one() -> f32 {
    1.0
}

fn default_true() -> bool {
    true
}

fn parse_color(value: &str, context: &str) -> Result<Color, Error> {
    Color::from_hex(value).map_err(|_| Error::JsonInvalidColor {
        context: context.to_string(),
        value: value.to_string(),
    })
}

fn parse_blend_mode(value: Option<&str>, slot_name: &str) -> Result<BlendMode, Error> {
    let Some(value) = value else {
        return Ok(BlendMode::Normal);
    };
    match value.to_ascii_lowercase().as_str() {
        "normal" => Ok(BlendMode::Normal),
        "additive" => Ok(BlendMode::Additive),
        "multiply" => Ok(BlendMode::Multiply),
        "screen" => Ok(BlendMode::Screen),
        _ => Err(Error::JsonUnsupportedBlendMode {
            slot: slot_name.to_string(),
            value: value.to_string(),
        }),
    }
}

fn unsupported_mode(constraint: &str, field: &str, value: &str) -> Error {
    Error::JsonUnsupportedPathConstraintMode {
        constraint: constraint.to_string(),
        field: field.to_string(),
        value: value.to_string(),
    }
}

fn parse_position_mode(value: Option<&str>, constraint: &str) -> Result<PositionMode, Error> {
    match value.map(str::to_ascii_lowercase).as_deref() {
        None | Some("percent") => Ok(PositionMode::Percent),
        Some("fixed") => Ok(PositionMode::Fixed),
        Some(_) => Err(unsupported_mode(
            constraint,
            "positionMode",
            value.unwrap_or_default(),
        )),
    }
}

fn parse_spacing_mode(value: Option<&str>, constraint: &str) -> Result<SpacingMode, Error> {
    match value.map(str::to_ascii_lowercase).as_deref() {
        None | Some("length") => Ok(SpacingMode::Length),
        Some("fixed") => Ok(SpacingMode::Fixed),
        Some("percent") => Ok(SpacingMode::Percent),
        Some(_) => Err(unsupported_mode(
            constraint,
            "spacingMode",
            value.unwrap_or_default(),
        )),
    }
}

fn parse_rotate_mode(value: Option<&str>, constraint: &str) -> Result<RotateMode, Error> {
    match value.map(str::to_ascii_lowercase).as_deref() {
        None | Some("tangent") => Ok(RotateMode::Tangent),
        Some("chain") => Ok(RotateMode::Chain),
        Some("chainscale") => Ok(RotateMode::ChainScale),
        Some(_) => Err(unsupported_mode(
            constraint,
            "rotateMode",
            value.unwrap_or_default(),
        )),
    }
}
