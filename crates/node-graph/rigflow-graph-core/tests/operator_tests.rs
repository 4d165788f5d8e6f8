//! Operators wired into scene hierarchies and driven through the scheduler.

use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};

use rigflow_graph_core::{Graph, GraphConfig, GraphError, JointAxis, Quat, Vec3, Vertex, Xfo};
use rigflow_track_core::{Keyframe, Track};

fn at(x: f32, y: f32, z: f32) -> Xfo {
    Xfo::from_translation(Vec3::new(x, y, z))
}

fn assert_near(actual: Vec3, expected: Vec3) {
    assert!(
        actual.abs_diff_eq(expected, 1e-3),
        "expected {expected:?}, got {actual:?}"
    );
}

// --- Iterative IK ---

#[test]
fn single_joint_reaches_and_clamps() {
    let mut g = Graph::new();
    let joint = g.add_node(None, "NAUO1", Xfo::IDENTITY).unwrap();
    let (s, c) = FRAC_PI_4.sin_cos();
    let target = g.add_param("target", Vec3::new(c, s, 0.0)).unwrap();
    let ik = g.add_ik_solver("IKSolver");
    g.ik_add_joint(ik, joint, JointAxis::Z, [-90.0, 90.0]).unwrap();
    g.ik_set_effector_offset(ik, Vec3::X).unwrap();
    g.connect_input(ik, "Target", target).unwrap();

    g.evaluate();
    let angle = g.ik_solver(ik).unwrap().joint_angles()[0];
    assert!((angle - FRAC_PI_4).abs() < 1e-4, "angle {angle}");
    let global = g.global_transform(joint).unwrap();
    assert_near(global.transform_point(Vec3::X), Vec3::new(c, s, 0.0));

    let (s, c) = (3.0 * FRAC_PI_4).sin_cos();
    g.set_value(target, Vec3::new(c, s, 0.0)).unwrap();
    g.evaluate();
    let angle = g.ik_solver(ik).unwrap().joint_angles()[0];
    assert!((angle - FRAC_PI_2).abs() < 1e-5, "angle {angle}");
}

#[test]
fn two_joint_chain_carries_children() {
    let mut g = Graph::new();
    let shoulder = g.add_node(None, "shoulder", Xfo::IDENTITY).unwrap();
    let elbow = g.add_node(Some(shoulder), "elbow", at(1.0, 0.0, 0.0)).unwrap();
    let gripper = g.add_node(Some(elbow), "gripper", at(1.0, 0.0, 0.0)).unwrap();
    let target = g.add_param("target", Vec3::new(1.0, 1.0, 0.0)).unwrap();

    let ik = g.add_ik_solver("arm");
    g.ik_add_joint(ik, shoulder, JointAxis::Z, [-180.0, 180.0]).unwrap();
    g.ik_add_joint(ik, elbow, JointAxis::Z, [-180.0, 180.0]).unwrap();
    g.ik_set_effector_offset(ik, Vec3::X).unwrap();
    g.connect_input(ik, "Target", target).unwrap();

    let report = g.evaluate();
    assert_eq!(report.operators_evaluated, 1);
    assert!(g.ik_solver(ik).unwrap().last_error() < 1e-3);
    assert_near(g.global_transform(gripper).unwrap().tr, Vec3::new(1.0, 1.0, 0.0));
    // link length is preserved by the solve
    let e = g.global_transform(elbow).unwrap().tr;
    assert!((e.length() - 1.0).abs() < 1e-4);
}

#[test]
fn chain_must_run_root_to_tip() {
    let mut g = Graph::new();
    let root = g.add_node(None, "root", Xfo::IDENTITY).unwrap();
    let tip = g.add_node(Some(root), "tip", at(1.0, 0.0, 0.0)).unwrap();
    let ik = g.add_ik_solver("ik");
    g.ik_add_joint(ik, tip, JointAxis::Z, [-90.0, 90.0]).unwrap();

    assert!(matches!(
        g.ik_add_joint(ik, root, JointAxis::Z, [-90.0, 90.0]),
        Err(GraphError::InvalidChainOrder { .. })
    ));
    assert!(matches!(
        g.ik_add_joint(ik, tip, JointAxis::Z, [-90.0, 90.0]),
        Err(GraphError::InvalidChainOrder { .. })
    ));
    assert_eq!(g.ik_solver(ik).unwrap().joints().len(), 1);
}

#[test]
fn inverted_limits_are_rejected() {
    let mut g = Graph::new();
    let joint = g.add_node(None, "joint", Xfo::IDENTITY).unwrap();
    let ik = g.add_ik_solver("ik");
    let err = g.ik_add_joint(ik, joint, JointAxis::Y, [30.0, -30.0]).unwrap_err();
    assert!(matches!(err, GraphError::InvalidJointLimits { .. }));
    assert!(err.is_structural());
    assert!(g.ik_solver(ik).unwrap().joints().is_empty());
}

#[test]
fn solver_without_target_holds_pose() {
    let mut g = Graph::new();
    let joint = g.add_node(None, "joint", at(0.0, 2.0, 0.0)).unwrap();
    let ik = g.add_ik_solver("ik");
    g.ik_add_joint(ik, joint, JointAxis::Z, [-90.0, 90.0]).unwrap();
    let report = g.evaluate();
    assert_eq!(report.operators_held, 1);
    assert_near(g.global_transform(joint).unwrap().tr, Vec3::new(0.0, 2.0, 0.0));
}

#[test]
fn ik_iterations_come_from_config() {
    let config = GraphConfig {
        ik_iterations: 3,
        ..GraphConfig::default()
    };
    let mut g = Graph::with_config(config);
    let ik = g.add_ik_solver("ik");
    assert_eq!(g.ik_solver(ik).unwrap().iterations, 3);
}

// --- Triangle IK ---

#[test]
fn triangle_keeps_link_lengths() {
    let mut g = Graph::new();
    let upper = g.add_node(None, "upper", Xfo::IDENTITY).unwrap();
    let lower = g.add_node(Some(upper), "lower", at(1.0, 0.0, 0.0)).unwrap();
    let target = g.add_param("target", Vec3::new(1.0, 1.0, 0.0)).unwrap();
    let op = g.add_triangle_ik("leg", upper, lower).unwrap();
    g.connect_input(op, "Target", target).unwrap();

    g.evaluate();
    let [l0, l1] = g.triangle_ik(op).unwrap().lengths().unwrap();
    assert!((l0 - 1.0).abs() < 1e-5 && (l1 - 1.0).abs() < 1e-5);
    assert_near(g.global_transform(lower).unwrap().tr, Vec3::new(1.0, 0.0, 0.0));

    let goal = Vec3::new(0.3, 1.2, 0.0);
    g.set_value(target, goal).unwrap();
    g.evaluate();
    let elbow = g.global_transform(lower).unwrap().tr;
    assert!((elbow.length() - 1.0).abs() < 1e-4);
    assert!((elbow.distance(goal) - 1.0).abs() < 1e-4);
}

#[test]
fn triangle_clamps_unreachable_target() {
    let mut g = Graph::new();
    let upper = g.add_node(None, "upper", Xfo::IDENTITY).unwrap();
    let lower = g.add_node(Some(upper), "lower", at(1.0, 0.0, 0.0)).unwrap();
    let target = g.add_param("target", Vec3::new(1.0, 1.0, 0.0)).unwrap();
    let op = g.add_triangle_ik("leg", upper, lower).unwrap();
    g.connect_input(op, "Target", target).unwrap();
    g.evaluate();

    g.set_value(target, Vec3::new(0.0, 5.0, 0.0)).unwrap();
    g.evaluate();
    assert_near(g.global_transform(lower).unwrap().tr, Vec3::new(0.0, 1.0, 0.0));
}

#[test]
fn triangle_follows_parent_moved_before_first_frame() {
    let mut g = Graph::new();
    let carrier = g.add_node(None, "NAUO1", Xfo::IDENTITY).unwrap();
    let upper = g.add_node(Some(carrier), "upper", Xfo::IDENTITY).unwrap();
    let lower = g.add_node(Some(upper), "lower", at(1.0, 0.0, 0.0)).unwrap();
    let target = g.add_param("target", Vec3::new(1.0, 1.0, 0.0)).unwrap();
    let op = g.add_triangle_ik("counterweight", upper, lower).unwrap();
    g.connect_input(op, "Target", target).unwrap();

    g.set_local_transform(carrier, at(5.0, 0.0, 0.0)).unwrap();
    g.set_value(target, Vec3::new(6.0, 1.0, 0.0)).unwrap();
    g.evaluate();

    assert_near(g.global_transform(upper).unwrap().tr, Vec3::new(5.0, 0.0, 0.0));
    assert_near(g.global_transform(lower).unwrap().tr, Vec3::new(6.0, 0.0, 0.0));
    let [l0, l1] = g.triangle_ik(op).unwrap().lengths().unwrap();
    assert!((l0 - 1.0).abs() < 1e-5 && (l1 - 1.0).abs() < 1e-5);
}

// --- Ram and piston ---

#[test]
fn piston_follows_ram_along_axis() {
    let mut g = Graph::new();
    let cylinder = g.add_node(None, "cylinder", Xfo::IDENTITY).unwrap();
    let ram = g.add_node(Some(cylinder), "ram", at(1.0, 0.0, 0.0)).unwrap();
    let piston = g.add_node(None, "piston", at(3.0, 0.5, 0.0)).unwrap();
    let op = g.add_ram_and_piston("linkage", Vec3::X, ram, piston).unwrap();

    g.evaluate();
    let separation = g.ram_and_piston(op).unwrap().rest_separation().unwrap();
    assert!((separation - 2.0).abs() < 1e-5);
    assert_near(g.global_transform(piston).unwrap().tr, Vec3::new(3.0, 0.5, 0.0));

    let d = 0.75;
    g.set_local_transform(cylinder, at(d, 0.0, 0.0)).unwrap();
    g.evaluate();
    assert_near(g.global_transform(ram).unwrap().tr, Vec3::new(1.0 + d, 0.0, 0.0));
    assert_near(g.global_transform(piston).unwrap().tr, Vec3::new(3.0 + d, 0.5, 0.0));
}

#[test]
fn rotated_ram_turns_the_slide_axis() {
    let mut g = Graph::new();
    let ram = g.add_node(None, "ram", Xfo::IDENTITY).unwrap();
    let piston = g.add_node(None, "piston", at(2.0, 0.0, 0.0)).unwrap();
    g.add_ram_and_piston("linkage", Vec3::X, ram, piston).unwrap();
    g.evaluate();

    g.set_local_transform(ram, Xfo::from_rotation(Quat::from_axis_angle(Vec3::Z, FRAC_PI_2)))
        .unwrap();
    g.evaluate();
    // the piston keeps its own offset across the axis
    assert_near(g.global_transform(piston).unwrap().tr, Vec3::new(2.0, 2.0, 0.0));
}

// --- Time-windowed attachment ---

#[test]
fn plate_switches_holders_over_time() {
    let mut g = Graph::new();
    let time = g.add_ranged_param("time", 0.0, 0.0, 7000.0).unwrap();
    let world = g.add_node(None, "world", Xfo::IDENTITY).unwrap();
    let head = g.add_node(Some(world), "robotHead", at(1.0, 2.0, 0.0)).unwrap();
    let stamper = g.add_node(Some(world), "stamper", at(5.0, 0.0, 0.0)).unwrap();
    let plate = g.add_node(Some(world), "plate", at(0.0, 0.0, 3.0)).unwrap();

    let op = g.add_attachment_constraint("plateAttach", time).unwrap();
    let head_global = g.node(head).unwrap().global_param();
    let stamper_global = g.node(stamper).unwrap().global_param();
    let plate_global = g.node(plate).unwrap().global_param();
    g.attachment_add_target(op, head_global, 2600.0, Xfo::IDENTITY).unwrap();
    g.attachment_add_target(op, stamper_global, 5400.0, Xfo::IDENTITY).unwrap();
    g.bind_output(op, "Attached", plate_global).unwrap();

    for (t, expected) in [
        (0.0, Vec3::new(0.0, 0.0, 3.0)),
        (3000.0, Vec3::new(1.0, 2.0, 0.0)),
        (6000.0, Vec3::new(5.0, 0.0, 0.0)),
        (2600.0, Vec3::new(1.0, 2.0, 0.0)),
    ] {
        g.set_value(time, t).unwrap();
        g.evaluate();
        assert_near(g.global_transform(plate).unwrap().tr, expected);
    }
}

#[test]
fn attached_body_tracks_moving_holder() {
    let mut g = Graph::new();
    let time = g.add_param("time", 3000.0).unwrap();
    let head = g.add_node(None, "head", at(1.0, 0.0, 0.0)).unwrap();
    let plate = g.add_node(None, "plate", Xfo::IDENTITY).unwrap();
    let op = g.add_attachment_constraint("attach", time).unwrap();
    let head_global = g.node(head).unwrap().global_param();
    let plate_global = g.node(plate).unwrap().global_param();
    g.attachment_add_target(op, head_global, 0.0, at(0.0, -1.0, 0.0)).unwrap();
    g.bind_output(op, "Attached", plate_global).unwrap();
    g.evaluate();
    assert_near(g.global_transform(plate).unwrap().tr, Vec3::new(1.0, -1.0, 0.0));

    g.set_local_transform(head, at(4.0, 0.0, 0.0)).unwrap();
    assert_near(g.global_transform(plate).unwrap().tr, Vec3::new(4.0, -1.0, 0.0));
}

// --- Track sampling ---

fn slide_track() -> Track {
    Track::from_keys(
        "slide",
        vec![
            Keyframe::new(0.0, Xfo::IDENTITY),
            Keyframe::new(1000.0, at(10.0, 0.0, 0.0)),
        ],
    )
    .unwrap()
}

#[test]
fn sampled_track_drives_node() {
    let mut g = Graph::new();
    let time = g.add_param("time", 500.0).unwrap();
    let node = g.add_node(None, "slider", Xfo::IDENTITY).unwrap();
    let track = g.add_track(slide_track());
    let op = g.add_track_sampler("sampler", track, time).unwrap();
    let global = g.node(node).unwrap().global_param();
    g.bind_output(op, "Output", global).unwrap();

    g.evaluate();
    assert_near(g.global_transform(node).unwrap().tr, Vec3::new(5.0, 0.0, 0.0));

    g.add_track_key(track, 500.0, at(0.0, 7.0, 0.0)).unwrap();
    assert!(g.is_dirty(Vertex::Operator(op)));
    g.evaluate();
    assert_near(g.global_transform(node).unwrap().tr, Vec3::new(0.0, 7.0, 0.0));

    g.undo_track_edit(track).unwrap();
    assert_near(g.global_transform(node).unwrap().tr, Vec3::new(5.0, 0.0, 0.0));
    g.redo_track_edit(track).unwrap();
    assert_near(g.global_transform(node).unwrap().tr, Vec3::new(0.0, 7.0, 0.0));
}

#[test]
fn track_json_reload_resamples() {
    let mut g = Graph::new();
    let time = g.add_param("time", 1000.0).unwrap();
    let node = g.add_node(None, "slider", Xfo::IDENTITY).unwrap();
    let track = g.add_track(slide_track());
    let op = g.add_track_sampler("sampler", track, time).unwrap();
    let global = g.node(node).unwrap().global_param();
    g.bind_output(op, "Output", global).unwrap();
    g.evaluate();

    let saved = g.save_track_json(track).unwrap();
    let other = g.add_track(Track::new("empty"));
    g.load_track_json(other, &saved).unwrap();
    assert_eq!(g.track(other).unwrap().keys(), g.track(track).unwrap().keys());

    g.add_track_key(track, 1000.0, at(0.0, 0.0, 1.0)).unwrap();
    assert_near(g.global_transform(node).unwrap().tr, Vec3::new(0.0, 0.0, 1.0));
    g.load_track_json(track, &saved).unwrap();
    assert!(!g.track_history(track).unwrap().can_undo());
    assert_near(g.global_transform(node).unwrap().tr, Vec3::new(10.0, 0.0, 0.0));
}

#[test]
fn empty_track_holds_output() {
    let mut g = Graph::new();
    let time = g.add_param("time", 0.0).unwrap();
    let node = g.add_node(None, "slider", at(2.0, 0.0, 0.0)).unwrap();
    let track = g.add_track(Track::new("empty"));
    let op = g.add_track_sampler("sampler", track, time).unwrap();
    let global = g.node(node).unwrap().global_param();
    g.bind_output(op, "Output", global).unwrap();
    let report = g.evaluate();
    assert_eq!(report.operators_held, 1);
    assert_near(g.global_transform(node).unwrap().tr, Vec3::new(2.0, 0.0, 0.0));
    assert!(g.load_track_json(track, "{ not json").is_err());
    assert!(g.track(track).unwrap().is_empty());
}
