use super::test_rigs::{RigBuilder, arm, assert_approx, assert_near, quad_mesh, region};
use crate::{
    AttachmentTimeline, Color, ColorTimeline, CurveTimeline, CurveType, DeformTimeline,
    DrawOrderTimeline, Event, EventData, EventTimeline, IkConstraintTimeline, RotateTimeline,
    Skeleton, Timeline, TransformConstraintTimeline, TranslateKind, TranslateTimeline,
};

fn single_bone(setup: impl FnOnce(&mut crate::BoneData)) -> Skeleton {
    Skeleton::new(RigBuilder::new().bone("root", None, setup).build())
}

fn event(name: &str, time: f32) -> Event {
    Event::new(
        time,
        &EventData {
            name: name.to_string(),
            ..EventData::default()
        },
    )
}

fn names(events: &[Event]) -> Vec<&str> {
    events.iter().map(|e| e.name.as_str()).collect()
}

#[test]
fn curve_percent_by_curve_type() {
    let mut curves = CurveTimeline::new(3);
    assert_eq!(curves.frame_count(), 3);
    assert_eq!(curves.curve_type(0), CurveType::Linear);
    assert_approx(curves.curve_percent(0, 0.25), 0.25);

    curves.set_stepped(0);
    assert_eq!(curves.curve_type(0), CurveType::Stepped);
    assert_approx(curves.curve_percent(0, 0.9), 0.0);

    curves.set_curve(1, 0.25, 0.0, 0.75, 1.0);
    assert_eq!(curves.curve_type(1), CurveType::Bezier);
    assert_near(curves.curve_percent(1, 0.5), 0.5, 0.02);
    assert!(curves.curve_percent(1, 0.1) < 0.1);
    assert!(curves.curve_percent(1, 0.9) > 0.9);
    assert_approx(curves.curve_percent(1, 1.0), 1.0);

    curves.set_linear(0);
    assert_eq!(curves.curve_type(0), CurveType::Linear);
}

#[test]
fn rotate_timeline_takes_the_shortest_way_around() {
    let mut skeleton = single_bone(|_| {});
    let mut timeline = RotateTimeline::new(2, 0);
    timeline.set_frame(0, 0.0, 350.0);
    timeline.set_frame(1, 1.0, 10.0);

    timeline.apply(&mut skeleton, 0.5, 1.0);
    assert_approx(skeleton.bones[0].rotation, 0.0);

    timeline.apply(&mut skeleton, 0.25, 1.0);
    assert_approx(skeleton.bones[0].rotation, -5.0);
}

#[test]
fn rotate_timeline_is_relative_to_setup_and_mixes_by_alpha() {
    let mut skeleton = single_bone(|b| b.rotation = 30.0);
    let mut timeline = RotateTimeline::new(1, 0);
    timeline.set_frame(0, 0.0, 90.0);

    timeline.apply(&mut skeleton, 2.0, 0.5);
    assert_approx(skeleton.bones[0].rotation, 75.0);

    timeline.apply(&mut skeleton, 2.0, 1.0);
    assert_approx(skeleton.bones[0].rotation, 120.0);
}

#[test]
fn timelines_do_nothing_before_the_first_key() {
    let mut skeleton = single_bone(|_| {});
    skeleton.bones[0].rotation = 12.0;
    skeleton.bones[0].x = 3.0;

    let mut rotate = RotateTimeline::new(2, 0);
    rotate.set_frame(0, 1.0, 90.0);
    rotate.set_frame(1, 2.0, 0.0);
    rotate.apply(&mut skeleton, 0.5, 1.0);

    let mut translate = TranslateTimeline::new(TranslateKind::Translate, 1, 0);
    translate.set_frame(0, 1.0, 50.0, 50.0);
    translate.apply(&mut skeleton, 0.5, 1.0);

    assert_approx(skeleton.bones[0].rotation, 12.0);
    assert_approx(skeleton.bones[0].x, 3.0);
}

#[test]
fn translate_timeline_offsets_setup_position() {
    let mut skeleton = single_bone(|b| b.x = 10.0);
    let mut timeline = TranslateTimeline::new(TranslateKind::Translate, 2, 0);
    timeline.set_frame(0, 0.0, 5.0, 0.0);
    timeline.set_frame(1, 1.0, 15.0, 10.0);

    timeline.apply(&mut skeleton, 0.5, 1.0);
    assert_approx(skeleton.bones[0].x, 20.0);
    assert_approx(skeleton.bones[0].y, 5.0);

    timeline.apply(&mut skeleton, 5.0, 1.0);
    assert_approx(skeleton.bones[0].x, 25.0);
    assert_approx(skeleton.bones[0].y, 10.0);
}

#[test]
fn scale_timeline_multiplies_setup_and_shear_adds() {
    let mut skeleton = single_bone(|b| {
        b.scale_x = 2.0;
        b.shear_y = 5.0;
    });
    let mut scale = TranslateTimeline::new(TranslateKind::Scale, 1, 0);
    scale.set_frame(0, 0.0, 3.0, 0.5);
    scale.apply(&mut skeleton, 0.0, 1.0);
    assert_approx(skeleton.bones[0].scale_x, 6.0);
    assert_approx(skeleton.bones[0].scale_y, 0.5);

    let mut shear = TranslateTimeline::new(TranslateKind::Shear, 1, 0);
    shear.set_frame(0, 0.0, 10.0, 10.0);
    shear.apply(&mut skeleton, 0.0, 1.0);
    assert_approx(skeleton.bones[0].shear_x, 10.0);
    assert_approx(skeleton.bones[0].shear_y, 15.0);
}

#[test]
fn color_timeline_mixes_from_current_color() {
    let data = RigBuilder::new()
        .bone("root", None, |_| {})
        .slot("body", "root", None)
        .build();
    let mut skeleton = Skeleton::new(data);

    let mut timeline = ColorTimeline::new(2, 0);
    timeline.set_frame(0, 0.0, 0.0, 0.0, 0.0, 1.0);
    timeline.set_frame(1, 1.0, 0.0, 0.0, 0.0, 1.0);
    timeline.apply(&mut skeleton, 0.5, 0.5);

    let color = skeleton.slots[0].color;
    assert_approx(color.r, 0.5);
    assert_approx(color.g, 0.5);
    assert_approx(color.b, 0.5);
    assert_approx(color.a, 1.0);
}

#[test]
fn stepped_color_holds_the_previous_key() {
    let data = RigBuilder::new()
        .bone("root", None, |_| {})
        .slot("body", "root", None)
        .build();
    let mut skeleton = Skeleton::new(data);

    let mut timeline = ColorTimeline::new(2, 0);
    timeline.set_frame(0, 0.0, 1.0, 0.0, 0.0, 1.0);
    timeline.set_frame(1, 1.0, 0.0, 0.0, 1.0, 1.0);
    timeline.curves.set_stepped(0);

    timeline.apply(&mut skeleton, 0.9, 1.0);
    assert_eq!(skeleton.slots[0].color, Color::new(1.0, 0.0, 0.0, 1.0));
    timeline.apply(&mut skeleton, 1.0, 1.0);
    assert_eq!(skeleton.slots[0].color, Color::new(0.0, 0.0, 1.0, 1.0));
}

#[test]
fn attachment_timeline_switches_and_hides() {
    let rig = RigBuilder::new()
        .bone("root", None, |_| {})
        .slot("hand", "root", Some("open"))
        .attachment("default", "hand", region("open", 2.0, 2.0));
    let fist = rig.next_attachment_id();
    let data = rig
        .attachment("default", "hand", region("fist", 2.0, 2.0))
        .build();
    let mut skeleton = Skeleton::new(data);

    let mut timeline = AttachmentTimeline::new(2, 0);
    timeline.set_frame(0, 0.0, Some("fist".to_string()));
    timeline.set_frame(1, 1.0, None);

    timeline.apply(&mut skeleton, 0.5);
    assert_eq!(skeleton.slots[0].attachment(), Some(fist));
    timeline.apply(&mut skeleton, 1.5);
    assert_eq!(skeleton.slots[0].attachment(), None);
}

#[test]
fn draw_order_timeline_applies_and_restores_setup_order() {
    let data = RigBuilder::new()
        .bone("root", None, |_| {})
        .slot("a", "root", None)
        .slot("b", "root", None)
        .slot("c", "root", None)
        .build();
    let mut skeleton = Skeleton::new(data);

    let mut timeline = DrawOrderTimeline::new(2);
    timeline.set_frame(0, 0.0, Some(vec![2, 0, 1]));
    timeline.set_frame(1, 1.0, None);

    timeline.apply(&mut skeleton, 0.5);
    assert_eq!(skeleton.draw_order, vec![2, 0, 1]);
    timeline.apply(&mut skeleton, 1.0);
    assert_eq!(skeleton.draw_order, vec![0, 1, 2]);
}

#[test]
fn event_timeline_fires_in_half_open_intervals() {
    let mut timeline = EventTimeline::new(4);
    timeline.set_frame(0, event("start", 0.0));
    timeline.set_frame(1, event("left", 0.5));
    timeline.set_frame(2, event("right", 0.5));
    timeline.set_frame(3, event("end", 1.0));

    let mut fired = Vec::new();
    timeline.apply(-1.0, 0.0, &mut fired);
    assert_eq!(names(&fired), ["start"]);

    fired.clear();
    timeline.apply(0.0, 0.5, &mut fired);
    assert_eq!(names(&fired), ["left", "right"]);

    fired.clear();
    timeline.apply(0.5, 0.75, &mut fired);
    assert!(fired.is_empty());

    fired.clear();
    timeline.apply(1.0, 1.0, &mut fired);
    assert!(fired.is_empty());
}

#[test]
fn event_timeline_wraps_when_time_goes_backwards() {
    let mut timeline = EventTimeline::new(3);
    timeline.set_frame(0, event("start", 0.0));
    timeline.set_frame(1, event("middle", 0.5));
    timeline.set_frame(2, event("end", 1.0));

    let mut fired = Vec::new();
    timeline.apply(0.75, 0.25, &mut fired);
    assert_eq!(names(&fired), ["end", "start"]);
    assert_approx(fired[0].time, 1.0);
}

#[test]
fn deform_timeline_interpolates_absolute_vertices() {
    let rig = RigBuilder::new()
        .bone("root", None, |_| {})
        .slot("cloth", "root", Some("quad"));
    let quad = rig.next_attachment_id();
    let data = rig
        .attachment(
            "default",
            "cloth",
            quad_mesh("quad", [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]),
        )
        .build();
    let mut skeleton = Skeleton::new(data);

    let mut timeline = DeformTimeline::new(2, 0, quad);
    timeline.set_frame(0, 0.0, vec![0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0]);
    timeline.set_frame(1, 1.0, vec![2.0, 0.0, 3.0, 0.0, 3.0, 1.0, 2.0, 1.0]);

    timeline.apply(&mut skeleton, 0.5, 1.0);
    assert_eq!(skeleton.slots[0].attachment_vertices.len(), 8);
    assert_approx(skeleton.slots[0].attachment_vertices[0], 1.0);
    assert_approx(skeleton.slots[0].attachment_vertices[2], 2.0);

    skeleton.update_world_transform();
    let world = skeleton.vertex_attachment_world_vertices(0).unwrap();
    assert_approx(world[0], 1.0);
    assert_approx(world[4], 2.0);
    assert_approx(world[5], 1.0);
}

#[test]
fn deform_timeline_ignores_other_attachments() {
    let rig = RigBuilder::new()
        .bone("root", None, |_| {})
        .slot("cloth", "root", Some("plain"))
        .attachment("default", "cloth", region("plain", 1.0, 1.0));
    let quad = rig.next_attachment_id();
    let data = rig
        .attachment(
            "default",
            "cloth",
            quad_mesh("quad", [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]),
        )
        .build();
    let mut skeleton = Skeleton::new(data);

    let mut timeline = DeformTimeline::new(1, 0, quad);
    timeline.set_frame(0, 0.0, vec![5.0; 8]);
    timeline.apply(&mut skeleton, 0.0, 1.0);
    assert!(skeleton.slots[0].attachment_vertices.is_empty());
}

#[test]
fn deform_timeline_skips_attachments_without_vertices() {
    let rig = RigBuilder::new()
        .bone("root", None, |_| {})
        .slot("cloth", "root", Some("plain"));
    let plain = rig.next_attachment_id();
    let data = rig
        .attachment("default", "cloth", region("plain", 1.0, 1.0))
        .build();
    let mut skeleton = Skeleton::new(data);
    assert_eq!(skeleton.slots[0].attachment(), Some(plain));

    let mut timeline = DeformTimeline::new(1, 0, plain);
    timeline.set_frame(0, 0.0, vec![5.0; 8]);
    timeline.apply(&mut skeleton, 0.0, 1.0);
    assert!(skeleton.slots[0].attachment_vertices.is_empty());
}

#[test]
fn ik_timeline_interpolates_mix_and_holds_bend() {
    let data = arm()
        .bone("target", Some("root"), |_| {})
        .ik("reach", &["upper", "lower"], "target", 1)
        .build();
    let mut skeleton = Skeleton::new(data);

    let mut timeline = IkConstraintTimeline::new(2, 0);
    timeline.set_frame(0, 0.0, 1.0, -1);
    timeline.set_frame(1, 1.0, 0.0, 1);

    timeline.apply(&mut skeleton, 0.5, 1.0);
    assert_approx(skeleton.ik_constraints[0].mix, 0.5);
    assert_eq!(skeleton.ik_constraints[0].bend_direction, -1);

    timeline.apply(&mut skeleton, 1.0, 1.0);
    assert_approx(skeleton.ik_constraints[0].mix, 0.0);
    assert_eq!(skeleton.ik_constraints[0].bend_direction, 1);
}

#[test]
fn transform_constraint_timeline_sets_all_mixes() {
    let data = RigBuilder::new()
        .bone("root", None, |_| {})
        .bone("target", Some("root"), |_| {})
        .bone("driven", Some("root"), |_| {})
        .transform("follow", &["driven"], "target", |_| {})
        .build();
    let mut skeleton = Skeleton::new(data);

    let mut timeline = TransformConstraintTimeline::new(1, 0);
    timeline.set_frame(0, 0.0, 0.5, 0.25, 0.0, 0.75);
    timeline.apply(&mut skeleton, 0.0, 1.0);

    let constraint = &skeleton.transform_constraints[0];
    assert_approx(constraint.rotate_mix, 0.5);
    assert_approx(constraint.translate_mix, 0.25);
    assert_approx(constraint.scale_mix, 0.0);
    assert_approx(constraint.shear_mix, 0.75);
}

#[test]
fn timeline_duration_is_the_last_key_time() {
    let mut rotate = RotateTimeline::new(3, 0);
    rotate.set_frame(0, 0.0, 0.0);
    rotate.set_frame(1, 0.4, 0.0);
    rotate.set_frame(2, 1.25, 0.0);
    let timeline = Timeline::Rotate(rotate);
    assert_eq!(timeline.frame_count(), 3);
    assert_approx(timeline.duration(), 1.25);

    assert_approx(Timeline::DrawOrder(DrawOrderTimeline::new(0)).duration(), 0.0);
}
