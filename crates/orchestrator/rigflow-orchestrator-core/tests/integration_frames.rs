use rigflow_api_core::{Vec3, Xfo};
use rigflow_graph_core::{Graph, NodeHierarchy, NodeId, ValueMap};
use rigflow_orchestrator::{LoopMode, Orchestrator, OrchestratorConfig, RecordedView};
use rigflow_track_core::{Keyframe, Track};
use serde_json::json;

fn at(x: f32, y: f32, z: f32) -> Xfo {
    Xfo::from_translation(Vec3::new(x, y, z))
}

fn config(loop_mode: LoopMode, autoplay: bool) -> OrchestratorConfig {
    OrchestratorConfig {
        loop_mode,
        autoplay,
        ..OrchestratorConfig::default()
    }
}

fn assert_near(actual: Option<&Xfo>, expected: Vec3) {
    let actual = actual.expect("node present in frame");
    assert!(
        actual.tr.abs_diff_eq(expected, 1e-3),
        "expected {expected:?}, got {:?}",
        actual.tr
    );
}

/// Track-driven target plus a plate that attaches to the robot head at 2600.
fn stamping_cell(orch: &mut Orchestrator) -> [NodeId; 3] {
    let time = orch.time_param();
    let g = &mut orch.graph;
    let target = g.add_node(None, "target", Xfo::IDENTITY).unwrap();
    let head = g.add_node(None, "robotHead", at(1.0, 2.0, 0.0)).unwrap();
    let plate = g.add_node(None, "plate", at(2.9, -1.0, 0.5)).unwrap();

    let track = g.add_track(
        Track::from_keys(
            "XfoTrack",
            vec![
                Keyframe::new(0.0, Xfo::IDENTITY),
                Keyframe::new(7000.0, at(7.0, 0.0, 0.0)),
            ],
        )
        .unwrap(),
    );
    let sampler = g.add_track_sampler("XfoTrack", track, time).unwrap();
    let target_global = g.node(target).unwrap().global_param();
    g.bind_output(sampler, "Output", target_global).unwrap();

    let attach = g.add_attachment_constraint("PlateAttach", time).unwrap();
    let head_global = g.node(head).unwrap().global_param();
    let plate_global = g.node(plate).unwrap().global_param();
    g.attachment_add_target(attach, head_global, 2600.0, Xfo::IDENTITY)
        .unwrap();
    g.bind_output(attach, "Attached", plate_global).unwrap();
    [target, head, plate]
}

#[test]
fn clock_drives_sampler_and_attachment() {
    let mut orch = Orchestrator::new(config(LoopMode::Once, true)).unwrap();
    stamping_cell(&mut orch);

    let frame = orch.step(1.0).expect("step ok");
    assert_eq!(frame.epoch, 1);
    assert_eq!(frame.time, 1000.0);
    assert_near(frame.node("target"), Vec3::new(1.0, 0.0, 0.0));
    assert_near(frame.node("plate"), Vec3::new(2.9, -1.0, 0.5));
    assert_eq!(frame.operators_evaluated, 1);
    assert_eq!(frame.operators_held, 1);

    let frame = orch.step(2.0).expect("step ok");
    assert_eq!(frame.time, 3000.0);
    assert_near(frame.node("target"), Vec3::new(3.0, 0.0, 0.0));
    assert_near(frame.node("plate"), Vec3::new(1.0, 2.0, 0.0));

    let frame = orch.step(10.0).expect("step ok");
    assert_eq!(frame.time, 7000.0);
    assert!(!orch.clock.is_playing());
    assert_near(frame.node("target"), Vec3::new(7.0, 0.0, 0.0));
}

#[test]
fn paused_frames_do_no_work() {
    let mut orch = Orchestrator::new(config(LoopMode::Loop, false)).unwrap();
    stamping_cell(&mut orch);
    orch.step(0.016).unwrap();
    let frame = orch.step(0.016).unwrap();
    assert_eq!(frame.time, 0.0);
    assert_eq!(frame.vertices_evaluated, 0);
}

#[test]
fn host_input_moves_time_and_clock() {
    let mut orch = Orchestrator::new(config(LoopMode::Once, false)).unwrap();
    stamping_cell(&mut orch);

    orch.set_input("time", json!(2600)).unwrap();
    assert_eq!(orch.clock.time(), 2600.0);
    let frame = orch.step(0.1).unwrap();
    assert_eq!(frame.time, 2600.0);
    assert_near(frame.node("plate"), Vec3::new(1.0, 2.0, 0.0));

    orch.set_input("time", json!(9000)).unwrap();
    assert_eq!(orch.clock.time(), 7000.0);

    assert!(orch.set_input("speed", json!(1)).is_err());
    assert!(orch.set_input("time", json!(true)).is_err());
}

#[test]
fn driven_input_is_rejected() {
    let mut orch = Orchestrator::new(OrchestratorConfig::default()).unwrap();
    let source = orch.graph.add_param("source", 1.0).unwrap();
    let gain = orch.graph.add_param("gain", 0.0).unwrap();
    orch.graph.bind(source, gain, ValueMap::Scale(2.0)).unwrap();
    let err = orch.set_input("gain", json!(3.0)).unwrap_err();
    assert!(err.to_string().contains("gain"));
    orch.set_input("source", json!(3.0)).unwrap();
    assert_eq!(orch.graph.get_float(gain).unwrap(), 6.0);
}

#[test]
fn hidden_nodes_are_not_presented() {
    let mut orch = Orchestrator::new(config(LoopMode::Once, true)).unwrap();
    let [target, _, _] = stamping_cell(&mut orch);
    orch.graph.set_visible(target, false).unwrap();

    let mut view = RecordedView::default();
    let frame = orch.step_and_present(0.5, &mut view).unwrap();
    assert_eq!(view.epoch, frame.epoch);
    let names: Vec<_> = view.draws.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, ["robotHead", "plate"]);
    assert!(frame.node("target").is_none());
}

#[test]
fn ping_pong_plays_back_and_forth() {
    let mut orch = Orchestrator::new(config(LoopMode::PingPong, true)).unwrap();
    stamping_cell(&mut orch);
    assert_eq!(orch.step(6.5).unwrap().time, 6500.0);
    let frame = orch.step(1.0).unwrap();
    assert_eq!(frame.time, 6500.0);
    assert!(orch.clock.is_playing());
    assert_near(frame.node("target"), Vec3::new(6.5, 0.0, 0.0));
}

#[test]
fn adopted_graph_keeps_its_time_parameter() {
    let mut graph = Graph::new();
    let time = graph.add_param("time", 9000.0).unwrap();
    let orch = Orchestrator::with_graph(graph, OrchestratorConfig::default()).unwrap();
    assert_eq!(orch.time_param(), time);
    assert_eq!(orch.clock.time(), 7000.0);
}

#[test]
fn driven_time_parameter_does_not_stop_frames() {
    let mut graph = Graph::new();
    let source = graph.add_param("source", 1200.0).unwrap();
    let time = graph.add_param("time", 0.0).unwrap();
    graph.bind(source, time, ValueMap::Identity).unwrap();
    graph.add_node(None, "base", at(1.0, 0.0, 0.0)).unwrap();
    let mut orch = Orchestrator::with_graph(graph, config(LoopMode::Loop, true)).unwrap();

    let frame = orch.step(0.5).expect("frame runs despite the rejected clock write");
    assert_eq!(frame.epoch, 1);
    assert_eq!(frame.time, 1200.0);
    assert_near(frame.node("base"), Vec3::new(1.0, 0.0, 0.0));

    orch.set_input("source", json!(2000.0)).unwrap();
    assert_eq!(orch.step(0.5).unwrap().time, 2000.0);
}

#[test]
fn loads_apply_between_frames() {
    let mut orch = Orchestrator::new(OrchestratorConfig::default()).unwrap();
    let ticket = orch.loads.request("cell.json", |g, h: NodeHierarchy| {
        g.instantiate_hierarchy(None, &h)?;
        Ok(())
    });
    assert!(orch.step(0.016).unwrap().nodes.is_empty());

    let failed = orch.loads.request("missing.json", |g, h: NodeHierarchy| {
        g.instantiate_hierarchy(None, &h)?;
        Ok(())
    });
    assert!(orch.complete_load(failed, Err("404".into())).is_err());

    let cell = NodeHierarchy::new("cell", at(0.0, 0.0, 1.0))
        .with_child(NodeHierarchy::new("stamper", at(0.0, 2.5, 0.0)));
    orch.complete_load(ticket, Ok(cell)).unwrap();
    let frame = orch.step(0.016).unwrap();
    assert_eq!(frame.nodes.len(), 2);
    assert_near(frame.node("stamper"), Vec3::new(0.0, 2.5, 1.0));
}
