use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown animation: {name}")]
    UnknownAnimation { name: String },

    #[error("unknown skin: {name}")]
    UnknownSkin { name: String },

    #[error("unknown slot: {name}")]
    UnknownSlot { name: String },

    #[error("unknown attachment '{attachment}' for slot '{slot}'")]
    UnknownAttachment { slot: String, attachment: String },

    #[error("invalid track index: {index}")]
    InvalidTrackIndex { index: usize },

    #[error("invalid value: {message}")]
    InvalidValue { message: String },

    #[error("failed to parse Spine atlas: {message}")]
    AtlasParse { message: String },

    #[error("unknown texture filter '{value}' in atlas")]
    AtlasUnknownFilter { value: String },

    #[cfg(feature = "json")]
    #[error("failed to parse Spine JSON: {message}")]
    JsonParse { message: String },

    #[cfg(feature = "json")]
    #[error("invalid color '{value}' for {context}")]
    JsonInvalidColor { context: String, value: String },

    #[cfg(feature = "json")]
    #[error("invalid curve for {context}: {message}")]
    JsonInvalidCurve { context: String, message: String },

    #[cfg(feature = "json")]
    #[error("unknown parent bone '{parent}' for bone '{bone}'")]
    JsonUnknownBoneParent { bone: String, parent: String },

    #[cfg(feature = "json")]
    #[error("unknown bone '{bone}' referenced by slot '{slot}'")]
    JsonUnknownSlotBone { slot: String, bone: String },

    #[cfg(feature = "json")]
    #[error("unsupported blend mode '{value}' for slot '{slot}'")]
    JsonUnsupportedBlendMode { slot: String, value: String },

    #[cfg(feature = "json")]
    #[error("unknown bone '{bone}' referenced by IK constraint '{constraint}'")]
    JsonUnknownIkConstraintBone { constraint: String, bone: String },

    #[cfg(feature = "json")]
    #[error("unknown target bone '{bone}' referenced by IK constraint '{constraint}'")]
    JsonUnknownIkConstraintTarget { constraint: String, bone: String },

    #[cfg(feature = "json")]
    #[error("unknown bone '{bone}' referenced by transform constraint '{constraint}'")]
    JsonUnknownTransformConstraintBone { constraint: String, bone: String },

    #[cfg(feature = "json")]
    #[error("unknown target bone '{bone}' referenced by transform constraint '{constraint}'")]
    JsonUnknownTransformConstraintTarget { constraint: String, bone: String },

    #[cfg(feature = "json")]
    #[error("unknown path constraint bone '{bone}' referenced by path constraint '{constraint}'")]
    JsonUnknownPathConstraintBone { constraint: String, bone: String },

    #[cfg(feature = "json")]
    #[error("unknown target slot '{slot}' referenced by path constraint '{constraint}'")]
    JsonUnknownPathConstraintTargetSlot { constraint: String, slot: String },

    #[cfg(feature = "json")]
    #[error("unsupported path constraint {field} '{value}' for constraint '{constraint}'")]
    JsonUnsupportedPathConstraintMode {
        constraint: String,
        field: String,
        value: String,
    },

    #[cfg(feature = "json")]
    #[error("unknown slot '{slot}' referenced by skin '{skin}'")]
    JsonUnknownSkinSlot { skin: String, slot: String },

    #[cfg(feature = "json")]
    #[error(
        "unsupported attachment type '{attachment_type}' for skin '{skin}', slot '{slot}', attachment '{attachment}'"
    )]
    JsonUnsupportedAttachmentType {
        skin: String,
        slot: String,
        attachment: String,
        attachment_type: String,
    },

    #[cfg(feature = "json")]
    #[error("region '{path}' not found in atlas for attachment '{attachment}'")]
    JsonUnknownRegion { attachment: String, path: String },

    #[cfg(feature = "json")]
    #[error(
        "invalid mesh data for skin '{skin}', slot '{slot}', attachment '{attachment}': {message}"
    )]
    JsonInvalidMeshData {
        skin: String,
        slot: String,
        attachment: String,
        message: String,
    },

    #[cfg(feature = "json")]
    #[error("unknown parent mesh '{parent}' for linked mesh '{attachment}'")]
    JsonUnknownLinkedMeshParent { attachment: String, parent: String },

    #[cfg(feature = "json")]
    #[error("unknown skin '{skin}' referenced by linked mesh '{attachment}'")]
    JsonUnknownLinkedMeshSkin { attachment: String, skin: String },

    #[cfg(feature = "json")]
    #[error("unknown bone '{bone}' referenced by animation '{animation}'")]
    JsonUnknownAnimationBone { animation: String, bone: String },

    #[cfg(feature = "json")]
    #[error("unknown slot '{slot}' referenced by slot timeline in animation '{animation}'")]
    JsonUnknownSlotTimelineSlot { animation: String, slot: String },

    #[cfg(feature = "json")]
    #[error("unsupported {kind} timeline '{timeline}' in animation '{animation}'")]
    JsonUnsupportedTimeline {
        animation: String,
        kind: String,
        timeline: String,
    },

    #[cfg(feature = "json")]
    #[error("unknown skin '{skin}' referenced by deform timeline in animation '{animation}'")]
    JsonUnknownDeformSkin { animation: String, skin: String },

    #[cfg(feature = "json")]
    #[error(
        "unknown slot '{slot}' referenced by deform timeline in animation '{animation}', skin '{skin}'"
    )]
    JsonUnknownDeformSlot {
        animation: String,
        skin: String,
        slot: String,
    },

    #[cfg(feature = "json")]
    #[error(
        "unknown attachment '{attachment}' referenced by deform timeline in animation '{animation}', skin '{skin}', slot '{slot}'"
    )]
    JsonUnknownDeformAttachment {
        animation: String,
        skin: String,
        slot: String,
        attachment: String,
    },

    #[cfg(feature = "json")]
    #[error("unknown event '{event}' referenced by animation '{animation}'")]
    JsonUnknownEvent { animation: String, event: String },

    #[cfg(feature = "json")]
    #[error("invalid drawOrder data for animation '{animation}': {message}")]
    JsonInvalidDrawOrder { animation: String, message: String },

    #[cfg(feature = "json")]
    #[error(
        "unknown IK constraint '{constraint}' referenced by IK timeline in animation '{animation}'"
    )]
    JsonUnknownIkConstraintTimeline {
        animation: String,
        constraint: String,
    },

    #[cfg(feature = "json")]
    #[error(
        "unknown transform constraint '{constraint}' referenced by transform timeline in animation '{animation}'"
    )]
    JsonUnknownTransformConstraintTimeline {
        animation: String,
        constraint: String,
    },

    #[cfg(feature = "json")]
    #[error(
        "unknown path constraint '{constraint}' referenced by path timeline in animation '{animation}'"
    )]
    JsonUnknownPathConstraintTimeline {
        animation: String,
        constraint: String,
    },

    #[cfg(feature = "json")]
    #[error("invalid duration for animation '{animation}'")]
    JsonInvalidDuration { animation: String },
}
