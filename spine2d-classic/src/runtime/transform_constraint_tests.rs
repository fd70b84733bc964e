use super::test_rigs::{RigBuilder, assert_approx};
use crate::{Skeleton, TransformConstraintData, UpdateCacheItem};

fn rig(setup: impl FnOnce(&mut TransformConstraintData)) -> Skeleton {
    let data = RigBuilder::new()
        .bone("root", None, |_| {})
        .bone("target", Some("root"), |b| {
            b.x = 10.0;
            b.y = 5.0;
            b.rotation = 90.0;
        })
        .bone("driven", Some("root"), |_| {})
        .bone("tip", Some("driven"), |b| b.x = 3.0)
        .transform("follow", &["driven"], "target", setup)
        .build();
    Skeleton::new(data)
}

fn posed(setup: impl FnOnce(&mut TransformConstraintData)) -> Skeleton {
    let mut skeleton = rig(setup);
    skeleton.update_world_transform();
    skeleton
}

#[test]
fn full_mix_copies_the_target_world_transform() {
    let skeleton = posed(|_| {});
    let driven = &skeleton.bones[2];
    assert_approx(driven.world_rotation_x(), 90.0);
    assert_approx(driven.world_x, 10.0);
    assert_approx(driven.world_y, 5.0);
    assert_approx(driven.rotation, 0.0);
}

#[test]
fn children_follow_the_constrained_bone() {
    let skeleton = posed(|_| {});
    assert_eq!(
        skeleton.update_cache_items(),
        [
            UpdateCacheItem::Bone(0),
            UpdateCacheItem::Bone(1),
            UpdateCacheItem::Bone(2),
            UpdateCacheItem::TransformConstraint(0),
            UpdateCacheItem::Bone(3),
        ]
    );
    let tip = &skeleton.bones[3];
    assert_approx(tip.world_x, 10.0);
    assert_approx(tip.world_y, 8.0);
}

#[test]
fn rotate_mix_blends_rotation_only() {
    let skeleton = posed(|c| {
        c.rotate_mix = 0.5;
        c.translate_mix = 0.0;
        c.scale_mix = 0.0;
        c.shear_mix = 0.0;
    });
    let driven = &skeleton.bones[2];
    assert_approx(driven.world_rotation_x(), 45.0);
    assert_approx(driven.world_x, 0.0);
    assert_approx(driven.world_y, 0.0);
}

#[test]
fn offsets_are_applied_in_target_space() {
    let skeleton = posed(|c| {
        c.offset_x = 2.0;
        c.offset_rotation = 30.0;
    });
    let driven = &skeleton.bones[2];
    assert_approx(driven.world_x, 10.0);
    assert_approx(driven.world_y, 7.0);
    assert_approx(driven.world_rotation_x(), 120.0);
}

#[test]
fn scale_mix_blends_world_scale() {
    let mut skeleton = rig(|c| {
        c.rotate_mix = 0.0;
        c.translate_mix = 0.0;
        c.shear_mix = 0.0;
    });
    skeleton.bones[1].rotation = 0.0;
    skeleton.bones[1].scale_x = 2.0;
    skeleton.update_world_transform();
    assert_approx(skeleton.bones[2].world_scale_x(), 2.0);
    assert_approx(skeleton.bones[2].world_scale_y(), 1.0);

    skeleton.transform_constraints[0].scale_mix = 0.5;
    skeleton.update_world_transform();
    assert_approx(skeleton.bones[2].world_scale_x(), 1.5);
}

#[test]
fn scale_offset_adds_to_the_target_scale() {
    let mut skeleton = rig(|c| {
        c.rotate_mix = 0.0;
        c.translate_mix = 0.0;
        c.shear_mix = 0.0;
        c.offset_scale_x = 1.0;
    });
    skeleton.bones[1].rotation = 0.0;
    skeleton.bones[1].scale_x = 2.0;
    skeleton.update_world_transform();
    assert_approx(skeleton.bones[2].world_scale_x(), 3.0);
}

#[test]
fn shear_mix_copies_the_target_shear() {
    let mut skeleton = rig(|c| {
        c.rotate_mix = 0.0;
        c.translate_mix = 0.0;
        c.scale_mix = 0.0;
    });
    skeleton.bones[1].rotation = 0.0;
    skeleton.bones[1].shear_y = 20.0;
    skeleton.update_world_transform();
    let driven = &skeleton.bones[2];
    assert_approx(driven.world_rotation_x(), 0.0);
    assert_approx(driven.world_rotation_y(), 110.0);
}

#[test]
fn zero_mixes_leave_the_local_pose() {
    let skeleton = posed(|c| {
        c.rotate_mix = 0.0;
        c.translate_mix = 0.0;
        c.scale_mix = 0.0;
        c.shear_mix = 0.0;
    });
    let driven = &skeleton.bones[2];
    assert_approx(driven.world_rotation_x(), 0.0);
    assert_approx(driven.world_x, 0.0);
    assert_approx(skeleton.bones[3].world_x, 3.0);
}

#[test]
fn chained_constraints_see_earlier_results() {
    let data = RigBuilder::new()
        .bone("root", None, |_| {})
        .bone("target", Some("root"), |b| {
            b.x = 10.0;
            b.y = 5.0;
            b.rotation = 90.0;
        })
        .bone("driven", Some("root"), |_| {})
        .bone("follower", Some("root"), |b| b.x = -4.0)
        .transform("first", &["driven"], "target", |_| {})
        .transform("second", &["follower"], "driven", |_| {})
        .build();
    let mut skeleton = Skeleton::new(data);
    skeleton.update_world_transform();

    assert_eq!(
        skeleton.update_cache_items(),
        [
            UpdateCacheItem::Bone(0),
            UpdateCacheItem::Bone(1),
            UpdateCacheItem::Bone(2),
            UpdateCacheItem::TransformConstraint(0),
            UpdateCacheItem::Bone(3),
            UpdateCacheItem::TransformConstraint(1),
        ]
    );
    let follower = &skeleton.bones[3];
    assert_approx(follower.world_x, 10.0);
    assert_approx(follower.world_y, 5.0);
    assert_approx(follower.world_rotation_x(), 90.0);
}
