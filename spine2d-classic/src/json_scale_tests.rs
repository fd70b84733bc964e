use crate::{AttachmentData, MeshVertices, Skeleton, SkeletonData, SkeletonJson, Timeline};

const JSON: &str = r#"
{
  "skeleton": { "spine": "3.5.51" },
  "bones": [
    { "name": "root", "x": 1, "y": 2, "length": 3, "rotation": 30, "scaleX": 1.5 },
    { "name": "target", "parent": "root" }
  ],
  "slots": [
    { "name": "pathSlot", "bone": "root", "attachment": "p" },
    { "name": "image", "bone": "root", "attachment": "r" }
  ],
  "skins": {
    "default": {
      "image": {
        "r": { "x": 1, "y": -1, "width": 4, "height": 2 },
        "w": {
          "type": "mesh",
          "uvs": [0, 0, 1, 0, 1, 1],
          "vertices": [1, 0, 1, 2, 1, 1, 0, 3, 1, 1, 1, 0, 4, 0, 1],
          "triangles": [0, 1, 2],
          "hull": 3
        }
      },
      "pathSlot": {
        "p": {
          "type": "path",
          "vertexCount": 6,
          "vertices": [ 0, 0, 0, 0, 3.3333333, 0, 6.6666665, 0, 10, 0, 10, 0 ],
          "lengths": [ 10, 10 ],
          "closed": false,
          "constantSpeed": true
        }
      }
    }
  },
  "transform": [
    { "name": "tc", "bones": ["root"], "target": "target", "x": 5, "y": 6, "scaleX": 0.5 }
  ],
  "path": [
    {
      "name": "pc_fixed",
      "bones": ["root"],
      "target": "pathSlot",
      "positionMode": "fixed",
      "spacingMode": "length",
      "position": 2,
      "spacing": 3
    },
    {
      "name": "pc_percent",
      "bones": ["root"],
      "target": "pathSlot",
      "positionMode": "percent",
      "spacingMode": "percent",
      "position": 0.25,
      "spacing": 0.1
    }
  ],
  "animations": {
    "anim": {
      "bones": {
        "root": {
          "translate": [ { "time": 0, "x": 1, "y": 2 } ],
          "scale": [ { "time": 0, "x": 2, "y": 3 } ]
        }
      },
      "paths": {
        "pc_fixed": {
          "position": [
            { "time": 0.0, "position": 2.0 },
            { "time": 1.0, "position": 4.0 }
          ],
          "spacing": [
            { "time": 0.0, "spacing": 3.0 },
            { "time": 1.0, "spacing": 5.0 }
          ]
        },
        "pc_percent": {
          "position": [
            { "time": 0.0, "position": 0.25 },
            { "time": 1.0, "position": 0.50 }
          ],
          "spacing": [
            { "time": 0.0, "spacing": 0.1 },
            { "time": 1.0, "spacing": 0.2 }
          ]
        }
      },
      "deform": {
        "default": {
          "image": {
            "w": [ { "time": 0, "vertices": [1, 1] } ]
          }
        }
      }
    }
  }
}
"#;

fn assert_approx(actual: f32, expected: f32) {
    let diff = (actual - expected).abs();
    assert!(
        diff <= 1.0e-3,
        "expected {expected}, got {actual} (diff {diff})"
    );
}

#[test]
fn scale_applies_to_bone_positions_and_lengths_only() {
    let data = SkeletonData::from_json_str_with_scale(JSON, 2.0).unwrap();
    let root = &data.bones[0];
    assert_approx(root.x, 2.0);
    assert_approx(root.y, 4.0);
    assert_approx(root.length, 6.0);
    assert_approx(root.rotation, 30.0);
    assert_approx(root.scale_x, 1.5);
}

#[test]
fn scale_applies_to_attachment_geometry() {
    let data = SkeletonData::from_json_str_with_scale(JSON, 2.0).unwrap();
    let skin = &data.skins[0];

    let Some(AttachmentData::Region(region)) =
        skin.attachment(1, "r").and_then(|id| data.attachment(id))
    else {
        panic!("expected a region attachment");
    };
    assert_approx(region.x, 2.0);
    assert_approx(region.y, -2.0);
    assert_approx(region.width, 8.0);
    assert_approx(region.height, 4.0);

    let Some(AttachmentData::Mesh(mesh)) =
        skin.attachment(1, "w").and_then(|id| data.attachment(id))
    else {
        panic!("expected a mesh attachment");
    };
    let MeshVertices::Weighted(weighted) = &mesh.vertices else {
        panic!("expected weighted vertices");
    };
    assert_approx(weighted[1][0].x, 6.0);
    assert_approx(weighted[1][0].y, 2.0);
    assert_approx(weighted[1][0].weight, 1.0);

    let Some(AttachmentData::Path(path)) =
        skin.attachment(0, "p").and_then(|id| data.attachment(id))
    else {
        panic!("expected a path attachment");
    };
    assert_eq!(path.lengths, vec![20.0, 20.0]);
    assert!(path.constant_speed);
    assert!(!path.closed);
}

#[test]
fn scale_applies_to_constraint_offsets() {
    let data = SkeletonData::from_json_str_with_scale(JSON, 2.0).unwrap();

    let transform = &data.transform_constraints[0];
    assert_approx(transform.offset_x, 10.0);
    assert_approx(transform.offset_y, 12.0);
    assert_approx(transform.offset_scale_x, 0.5);

    let fixed = &data.path_constraints[0];
    assert_approx(fixed.position, 4.0);
    assert_approx(fixed.spacing, 6.0);

    let percent = &data.path_constraints[1];
    assert_approx(percent.position, 0.25);
    assert_approx(percent.spacing, 0.1);
}

#[test]
fn scale_applies_to_translate_and_absolute_path_keys() {
    let data = SkeletonJson {
        scale: 2.0,
        ..SkeletonJson::default()
    }
    .read_skeleton_data(JSON)
    .unwrap();
    let (_, anim) = data.find_animation("anim").unwrap();
    let mut skeleton = Skeleton::new(data.clone());
    anim.apply(&mut skeleton, 0.0, 1.0, false, None);

    // Translate keys are offsets from the scaled setup position.
    assert_approx(skeleton.bones[0].x, 4.0);
    assert_approx(skeleton.bones[0].y, 8.0);
    // Scale keys are factors and stay unscaled.
    assert_approx(skeleton.bones[0].scale_x, 3.0);
    assert_approx(skeleton.bones[0].scale_y, 3.0);

    assert_approx(skeleton.path_constraints[0].position, 8.0);
    assert_approx(skeleton.path_constraints[0].spacing, 10.0);
    assert_approx(skeleton.path_constraints[1].position, 0.50);
    assert_approx(skeleton.path_constraints[1].spacing, 0.2);
}

#[test]
fn scale_applies_to_deform_keys() {
    let data = SkeletonData::from_json_str_with_scale(JSON, 2.0).unwrap();
    let (_, anim) = data.find_animation("anim").unwrap();
    let Some(Timeline::Deform(deform)) = anim
        .timelines
        .iter()
        .find(|t| matches!(t, Timeline::Deform(_)))
    else {
        panic!("expected a deform timeline");
    };
    // Weighted deforms are offsets, one pair per bone influence.
    assert_eq!(deform.frame_vertices[0], vec![2.0, 2.0, 0.0, 0.0, 0.0, 0.0]);
}

#[test]
fn non_finite_scale_falls_back_to_one() {
    let data = SkeletonData::from_json_str_with_scale(JSON, f32::NAN).unwrap();
    assert_approx(data.bones[0].x, 1.0);
    assert_approx(data.bones[0].length, 3.0);
}
