use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rigflow_graph_core::{Graph, JointAxis, Vec3, Xfo};

/// A single chain of `depth` nodes, each offset one unit along X.
fn node_chain(depth: usize) -> (Graph, rigflow_graph_core::NodeId) {
    let mut g = Graph::new();
    let root = g.add_node(None, "n0", Xfo::IDENTITY).expect("root");
    let mut parent = root;
    for i in 1..depth {
        parent = g
            .add_node(Some(parent), format!("n{i}"), Xfo::from_translation(Vec3::X))
            .expect("node");
    }
    (g, root)
}

fn bench_hierarchy(c: &mut Criterion) {
    let mut group = c.benchmark_group("hierarchy_recompose");
    for depth in [16usize, 128, 1024] {
        let (mut g, root) = node_chain(depth);
        g.evaluate();
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, _| {
            let mut x = 0.0f32;
            b.iter(|| {
                x += 0.001;
                g.set_local_transform(root, Xfo::from_translation(Vec3::new(x, 0.0, 0.0)))
                    .expect("set root");
                black_box(g.evaluate());
            });
        });
    }
    group.finish();
}

fn bench_ik_chain(c: &mut Criterion) {
    let (mut g, root) = node_chain(6);
    let target = g.add_param("target", Vec3::new(2.0, 3.0, 0.0)).expect("target");
    let ik = g.add_ik_solver("arm");
    let mut node = Some(root);
    while let Some(id) = node {
        g.ik_add_joint(ik, id, JointAxis::Z, [-120.0, 120.0]).expect("joint");
        node = g.node(id).expect("node").children().first().copied();
    }
    g.ik_set_effector_offset(ik, Vec3::X).expect("offset");
    g.connect_input(ik, "Target", target).expect("target input");

    c.bench_function("ik_six_joints", |b| {
        let mut angle = 0.0f32;
        b.iter(|| {
            angle += 0.01;
            let (s, co) = angle.sin_cos();
            g.set_value(target, Vec3::new(3.0 * co, 3.0 * s, 0.0))
                .expect("move target");
            black_box(g.evaluate());
        });
    });
}

criterion_group!(benches, bench_hierarchy, bench_ik_chain);
criterion_main!(benches);
