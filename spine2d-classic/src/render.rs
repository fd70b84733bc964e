use crate::{Atlas, AttachmentData, BlendMode, Skeleton, TextureHandle, VERTEX_SIZE};

pub const QUAD_TRIANGLES: [u16; 6] = [0, 1, 2, 2, 3, 0];

/// One textured triangle batch for a single slot.
#[derive(Clone, Debug, PartialEq)]
pub struct Draw {
    pub slot_index: usize,
    pub blend: BlendMode,
    /// Atlas page of the attachment's region, when it came from an atlas.
    pub page: Option<usize>,
    pub texture: Option<TextureHandle>,
    pub premultiplied_alpha: bool,
    /// Interleaved `x, y, r, g, b, a, u, v` per vertex.
    pub vertices: Vec<f32>,
    pub triangles: Vec<u16>,
}

impl Draw {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / VERTEX_SIZE
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct DrawList {
    pub draws: Vec<Draw>,
}

impl DrawList {
    pub fn clear(&mut self) {
        self.draws.clear();
    }

    pub fn vertex_count(&self) -> usize {
        self.draws.iter().map(Draw::vertex_count).sum()
    }
}

/// Draws for every region and mesh attachment, in the skeleton's draw order, with straight
/// alpha. The skeleton's world transform must be current.
pub fn build_draw_list(skeleton: &Skeleton) -> DrawList {
    let mut out = DrawList::default();
    append_draw_list(&mut out, skeleton);
    out
}

pub fn append_draw_list(out: &mut DrawList, skeleton: &Skeleton) {
    append_draw_list_internal(out, skeleton, None, false);
}

/// Like [`build_draw_list`], also resolving each draw's texture from the atlas pages.
pub fn build_draw_list_with_atlas(
    skeleton: &Skeleton,
    atlas: &Atlas,
    premultiplied_alpha: bool,
) -> DrawList {
    let mut out = DrawList::default();
    append_draw_list_with_atlas(&mut out, skeleton, atlas, premultiplied_alpha);
    out
}

pub fn append_draw_list_with_atlas(
    out: &mut DrawList,
    skeleton: &Skeleton,
    atlas: &Atlas,
    premultiplied_alpha: bool,
) {
    append_draw_list_internal(out, skeleton, Some(atlas), premultiplied_alpha);
}

fn append_draw_list_internal(
    out: &mut DrawList,
    skeleton: &Skeleton,
    atlas: Option<&Atlas>,
    premultiplied_alpha: bool,
) {
    for &slot_index in &skeleton.draw_order {
        let Some(attachment) = skeleton.slot_attachment_data(slot_index) else {
            continue;
        };
        let (page, vertices, triangles) = match attachment {
            AttachmentData::Region(region) => (
                region.region.page,
                skeleton
                    .region_world_vertices(slot_index, region, premultiplied_alpha)
                    .to_vec(),
                QUAD_TRIANGLES.to_vec(),
            ),
            AttachmentData::Mesh(mesh) => (
                mesh.region.page,
                skeleton.mesh_world_vertices(slot_index, mesh, premultiplied_alpha),
                mesh.triangles.clone(),
            ),
            AttachmentData::BoundingBox(_) | AttachmentData::Path(_) => continue,
        };
        let blend = skeleton
            .data
            .slots
            .get(skeleton.slots[slot_index].data_index())
            .map(|data| data.blend)
            .unwrap_or_default();
        let texture = atlas
            .zip(page)
            .and_then(|(atlas, page)| atlas.page(page))
            .and_then(|page| page.texture);

        out.draws.push(Draw {
            slot_index,
            blend,
            page,
            texture,
            premultiplied_alpha,
            vertices,
            triangles,
        });
    }
}
