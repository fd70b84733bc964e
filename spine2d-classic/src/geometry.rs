use crate::{AttachmentData, AttachmentId, Pool, Skeleton};

/// World-space polygons of the bounding-box attachments currently shown by a skeleton, with an
/// axis-aligned box around all of them for cheap rejection tests.
#[derive(Debug)]
pub struct SkeletonBounds {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
    bounding_boxes: Vec<AttachmentId>,
    polygons: Vec<Vec<f32>>,
    polygon_pool: Pool<Vec<f32>>,
}

impl Default for SkeletonBounds {
    fn default() -> Self {
        Self::new()
    }
}

impl SkeletonBounds {
    pub fn new() -> Self {
        Self {
            min_x: 0.0,
            min_y: 0.0,
            max_x: 0.0,
            max_y: 0.0,
            bounding_boxes: Vec::new(),
            polygons: Vec::new(),
            polygon_pool: Pool::new(Vec::new),
        }
    }

    /// Recollects polygons from every slot holding a bounding box. The skeleton's world
    /// transform must be current.
    pub fn update(&mut self, skeleton: &Skeleton, update_aabb: bool) {
        self.bounding_boxes.clear();
        self.polygon_pool.free_all(self.polygons.drain(..));

        for (slot_index, slot) in skeleton.slots.iter().enumerate() {
            let Some(id) = slot.attachment() else {
                continue;
            };
            let Some(AttachmentData::BoundingBox(bounding_box)) = skeleton.data.attachment(id)
            else {
                continue;
            };
            let len = bounding_box.vertices.world_vertices_length();
            let mut polygon = self.polygon_pool.obtain();
            polygon.clear();
            polygon.resize(len, 0.0);
            skeleton.compute_world_vertices(
                slot_index,
                &bounding_box.vertices,
                0,
                len,
                &mut polygon,
                0,
            );
            self.bounding_boxes.push(id);
            self.polygons.push(polygon);
        }

        if update_aabb {
            self.aabb_compute();
        }
    }

    pub fn aabb_compute(&mut self) {
        let mut min_x = f32::INFINITY;
        let mut min_y = f32::INFINITY;
        let mut max_x = f32::NEG_INFINITY;
        let mut max_y = f32::NEG_INFINITY;
        for polygon in &self.polygons {
            for point in polygon.chunks_exact(2) {
                min_x = min_x.min(point[0]);
                min_y = min_y.min(point[1]);
                max_x = max_x.max(point[0]);
                max_y = max_y.max(point[1]);
            }
        }
        self.min_x = min_x;
        self.min_y = min_y;
        self.max_x = max_x;
        self.max_y = max_y;
    }

    pub fn aabb_contains_point(&self, x: f32, y: f32) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    pub fn aabb_intersects_segment(&self, x1: f32, y1: f32, x2: f32, y2: f32) -> bool {
        let (min_x, min_y, max_x, max_y) = (self.min_x, self.min_y, self.max_x, self.max_y);
        if (x1 <= min_x && x2 <= min_x)
            || (y1 <= min_y && y2 <= min_y)
            || (x1 >= max_x && x2 >= max_x)
            || (y1 >= max_y && y2 >= max_y)
        {
            return false;
        }
        let m = (y2 - y1) / (x2 - x1);
        let y = m * (min_x - x1) + y1;
        if y > min_y && y < max_y {
            return true;
        }
        let y = m * (max_x - x1) + y1;
        if y > min_y && y < max_y {
            return true;
        }
        let x = (min_y - y1) / m + x1;
        if x > min_x && x < max_x {
            return true;
        }
        let x = (max_y - y1) / m + x1;
        x > min_x && x < max_x
    }

    pub fn aabb_intersects_skeleton(&self, other: &SkeletonBounds) -> bool {
        self.min_x < other.max_x
            && self.max_x > other.min_x
            && self.min_y < other.max_y
            && self.max_y > other.min_y
    }

    /// First bounding box whose polygon contains the point.
    pub fn contains_point(&self, x: f32, y: f32) -> Option<AttachmentId> {
        self.polygons
            .iter()
            .position(|polygon| polygon_contains_point(polygon, x, y))
            .map(|i| self.bounding_boxes[i])
    }

    /// First bounding box whose polygon touches the segment. Usually worth gating behind
    /// [`Self::aabb_intersects_segment`].
    pub fn intersects_segment(&self, x1: f32, y1: f32, x2: f32, y2: f32) -> Option<AttachmentId> {
        self.polygons
            .iter()
            .position(|polygon| polygon_intersects_segment(polygon, x1, y1, x2, y2))
            .map(|i| self.bounding_boxes[i])
    }

    pub fn polygon(&self, bounding_box: AttachmentId) -> Option<&[f32]> {
        self.bounding_boxes
            .iter()
            .position(|&id| id == bounding_box)
            .map(|i| self.polygons[i].as_slice())
    }

    pub fn bounding_boxes(&self) -> &[AttachmentId] {
        &self.bounding_boxes
    }

    pub fn polygons(&self) -> &[Vec<f32>] {
        &self.polygons
    }

    pub fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f32 {
        self.max_y - self.min_y
    }
}

/// Even-odd test of a flat `x, y, x, y, ...` polygon.
pub fn polygon_contains_point(polygon: &[f32], x: f32, y: f32) -> bool {
    let nn = polygon.len() & !1;
    if nn < 2 {
        return false;
    }
    let mut prev = nn - 2;
    let mut inside = false;
    for ii in (0..nn).step_by(2) {
        let vertex_y = polygon[ii + 1];
        let prev_y = polygon[prev + 1];
        if (vertex_y < y && prev_y >= y) || (prev_y < y && vertex_y >= y) {
            let vertex_x = polygon[ii];
            if vertex_x + (y - vertex_y) / (prev_y - vertex_y) * (polygon[prev] - vertex_x) < x {
                inside = !inside;
            }
        }
        prev = ii;
    }
    inside
}

pub fn polygon_intersects_segment(polygon: &[f32], x1: f32, y1: f32, x2: f32, y2: f32) -> bool {
    let nn = polygon.len() & !1;
    if nn < 2 {
        return false;
    }
    let width12 = x1 - x2;
    let height12 = y1 - y2;
    let det1 = x1 * y2 - y1 * x2;
    let mut x3 = polygon[nn - 2];
    let mut y3 = polygon[nn - 1];
    for ii in (0..nn).step_by(2) {
        let x4 = polygon[ii];
        let y4 = polygon[ii + 1];
        let det2 = x3 * y4 - y3 * x4;
        let width34 = x3 - x4;
        let height34 = y3 - y4;
        let det3 = width12 * height34 - height12 * width34;
        let x = (det1 * width34 - width12 * det2) / det3;
        if ((x >= x3 && x <= x4) || (x >= x4 && x <= x3))
            && ((x >= x1 && x <= x2) || (x >= x2 && x <= x1))
        {
            let y = (det1 * height34 - height12 * det2) / det3;
            if ((y >= y3 && y <= y4) || (y >= y4 && y <= y3))
                && ((y >= y1 && y <= y2) || (y >= y2 && y <= y1))
            {
                return true;
            }
        }
        x3 = x4;
        y3 = y4;
    }
    false
}
