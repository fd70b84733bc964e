/// Index of an attachment in [`crate::SkeletonData::attachments`].
///
/// Skins, slots, linked meshes and deform timelines refer to attachments through this id, so
/// "same attachment" is a plain integer comparison.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct AttachmentId(pub usize);

impl AttachmentId {
    pub fn index(self) -> usize {
        self.0
    }
}
