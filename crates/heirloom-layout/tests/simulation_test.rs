use heirloom_layout::hierarchy::SYNTHETIC_ROOT_ID;
use heirloom_layout::{
    EntityKind, GraphNode, LayoutResult, NodeKey, Pin, RadialConfig, Simulation, SimulationConfig,
    StepResult, build_hierarchy, compute_radial_layout, derive_edges, footprint,
    run_force_simulation,
};

fn node(id: &str, kind: EntityKind, level: u32, parents: &[&str]) -> GraphNode {
    GraphNode {
        id: id.to_string(),
        label: id.to_string(),
        kind,
        level,
        parent_ids: parents.iter().map(|p| p.to_string()).collect(),
        ..Default::default()
    }
}

fn family() -> Vec<GraphNode> {
    vec![
        node("root", EntityKind::Root, 0, &[]),
        node("personA", EntityKind::Person, 1, &["root"]),
        node("personB", EntityKind::Person, 1, &["root"]),
        node("catA1", EntityKind::Folder, 2, &["personA"]),
        node("catA2", EntityKind::Folder, 2, &["personA"]),
        node("catB1", EntityKind::Folder, 2, &["personB"]),
        node("docA1a", EntityKind::Document, 3, &["catA1"]),
        node("docA1b", EntityKind::Document, 3, &["catA1"]),
        node("docA2a", EntityKind::Document, 3, &["catA2"]),
        node("docB1a", EntityKind::Document, 3, &["catB1"]),
    ]
}

fn seed(nodes: &[GraphNode], radial: &RadialConfig) -> LayoutResult {
    let edges = derive_edges(nodes);
    let h = build_hierarchy(nodes, &edges).unwrap();
    compute_radial_layout(&h, radial)
}

#[test]
fn batch_run_resolves_overlaps() {
    let nodes = family();
    let radial = RadialConfig::default();
    let config = SimulationConfig::default();
    let edges = derive_edges(&nodes);
    let result = run_force_simulation(&nodes, &edges, &seed(&nodes, &radial), &config, &radial);

    assert_eq!(result.len(), 10);
    let by_id: std::collections::HashMap<&str, &GraphNode> =
        nodes.iter().map(|n| (n.id.as_str(), n)).collect();
    let pad = config.collision_padding;
    let entries: Vec<_> = result.positions.iter().collect();
    for (i, (ka, pa)) in entries.iter().enumerate() {
        for (kb, pb) in entries.iter().skip(i + 1) {
            let fa = footprint(pa.depth, by_id[ka.original_id()].kind);
            let fb = footprint(pb.depth, by_id[kb.original_id()].kind);
            let overlap_x = (fa.width + fb.width) / 2.0 + pad - (pa.x - pb.x).abs();
            let overlap_y = (fa.height + fb.height) / 2.0 + pad - (pa.y - pb.y).abs();
            // Padded boxes must be separated on at least one axis.
            assert!(
                overlap_x <= 0.0 || overlap_y <= 0.0,
                "{ka} and {kb} overlap by {overlap_x:.2}x{overlap_y:.2}"
            );
        }
    }
}

#[test]
fn every_position_is_finite() {
    let nodes = family();
    let radial = RadialConfig::default();
    let edges = derive_edges(&nodes);
    let result = run_force_simulation(
        &nodes,
        &edges,
        &seed(&nodes, &radial),
        &SimulationConfig::default(),
        &radial,
    );
    for (key, p) in &result.positions {
        assert!(p.x.is_finite() && p.y.is_finite(), "{key}");
        assert!(p.angle.is_finite() && p.radius.is_finite(), "{key}");
    }
}

#[test]
fn identical_seeds_give_identical_layouts() {
    let nodes = family();
    let radial = RadialConfig::default();
    let config = SimulationConfig::default();
    let edges = derive_edges(&nodes);
    let positions = seed(&nodes, &radial);

    let a = run_force_simulation(&nodes, &edges, &positions, &config, &radial);
    let b = run_force_simulation(&nodes, &edges, &positions, &config, &radial);
    assert_eq!(a, b);
}

#[test]
fn step_settles_once_and_stays_settled() {
    let nodes = family();
    let radial = RadialConfig::default();
    let config = SimulationConfig::default();
    let edges = derive_edges(&nodes);
    let mut sim = Simulation::new(&nodes, &edges, &seed(&nodes, &radial), &config, &radial);

    let mut running_ticks = 0usize;
    let iterations = loop {
        match sim.step() {
            StepResult::Running { alpha } => {
                assert!(alpha > 0.0);
                running_ticks += 1;
                assert!(running_ticks <= config.max_iterations);
            }
            StepResult::Settled { iterations } => break iterations,
        }
    };

    assert_eq!(iterations, running_ticks + 1);
    assert!(sim.is_settled());
    assert_eq!(sim.step(), StepResult::Settled { iterations });
    assert_eq!(sim.iterations(), iterations);
}

#[test]
fn stepped_and_batch_runs_agree() {
    let nodes = family();
    let radial = RadialConfig::default();
    let config = SimulationConfig::default();
    let edges = derive_edges(&nodes);
    let positions = seed(&nodes, &radial);

    let mut batch = Simulation::new(&nodes, &edges, &positions, &config, &radial);
    let batch_result = batch.run();

    let mut stepped = Simulation::new(&nodes, &edges, &positions, &config, &radial);
    while !stepped.is_settled() {
        stepped.step();
    }
    assert_eq!(batch_result, stepped.snapshot());
}

#[test]
fn pinned_node_keeps_its_exact_coordinate() {
    let mut nodes = family();
    nodes[1].pinned = Some(Pin { x: 480.0, y: -260.0 });
    let radial = RadialConfig::default();
    let edges = derive_edges(&nodes);
    let result = run_force_simulation(
        &nodes,
        &edges,
        &seed(&nodes, &radial),
        &SimulationConfig::default(),
        &radial,
    );

    let pinned = result.get(&NodeKey::node("personA")).unwrap();
    assert_eq!((pinned.x, pinned.y), (480.0, -260.0));

    // The root is fixed at its seeded spot, the center.
    let root = result.get(&NodeKey::node("root")).unwrap();
    assert_eq!((root.x, root.y), (0.0, 0.0));
}

#[test]
fn pin_fixes_only_the_primary_copy_of_a_shared_node() {
    let mut nodes = family();
    let mut shared = node("docShared", EntityKind::Document, 2, &["personA", "personB"]);
    shared.pinned = Some(Pin { x: 420.0, y: -180.0 });
    nodes.push(shared);
    let radial = RadialConfig::default();
    let edges = derive_edges(&nodes);
    let result = run_force_simulation(
        &nodes,
        &edges,
        &seed(&nodes, &radial),
        &SimulationConfig::default(),
        &radial,
    );

    let primary = result.get(&NodeKey::shadow("docShared", "personA")).unwrap();
    assert_eq!((primary.x, primary.y), (420.0, -180.0));

    // The personB copy refines around its own parent instead of stacking on
    // the pin.
    let secondary = result.get(&NodeKey::shadow("docShared", "personB")).unwrap();
    let dist = ((secondary.x - 420.0).powi(2) + (secondary.y + 180.0).powi(2)).sqrt();
    assert!(dist > 40.0, "secondary copy sits on the pin ({dist:.1} away)");
}

#[test]
fn injected_root_keeps_its_seed_placement() {
    let nodes = vec![
        node("personA", EntityKind::Person, 0, &[]),
        node("personB", EntityKind::Person, 0, &[]),
        node("catA1", EntityKind::Folder, 1, &["personA"]),
    ];
    let radial = RadialConfig::default();
    let edges = derive_edges(&nodes);
    let result = run_force_simulation(
        &nodes,
        &edges,
        &seed(&nodes, &radial),
        &SimulationConfig::default(),
        &radial,
    );

    // Three rendered nodes plus the root the hierarchy injected.
    assert_eq!(result.len(), 4);
    let root = result.get(&NodeKey::node(SYNTHETIC_ROOT_ID)).unwrap();
    assert_eq!((root.x, root.y), (0.0, 0.0));
    assert_eq!(root.depth, 0);
}

#[test]
fn divergence_is_clamped_and_counted() {
    let nodes = family();
    let radial = RadialConfig::default();
    let config = SimulationConfig {
        divergence_bound: 10.0,
        ..Default::default()
    };
    let edges = derive_edges(&nodes);
    let mut sim = Simulation::new(&nodes, &edges, &seed(&nodes, &radial), &config, &radial);
    let result = sim.run();

    assert!(sim.divergence_clamps() > 0);
    for (key, p) in &result.positions {
        assert!(p.radius <= 10.0 + 1e-6, "{key} escaped to {}", p.radius);
    }
}

#[test]
fn missing_seed_entries_fall_back_to_the_spiral() {
    let nodes = family();
    let radial = RadialConfig::default();
    let edges = derive_edges(&nodes);
    let result = run_force_simulation(
        &nodes,
        &edges,
        &LayoutResult::default(),
        &SimulationConfig::default(),
        &radial,
    );

    assert_eq!(result.len(), 10);
    for (key, p) in &result.positions {
        assert!(p.x.is_finite() && p.y.is_finite(), "{key}");
    }
    // Without a seed, depths come from the dataset levels.
    assert_eq!(result.get(&NodeKey::node("docA1a")).unwrap().depth, 3);
}

#[test]
fn empty_dataset_settles_immediately() {
    let radial = RadialConfig::default();
    let config = SimulationConfig::default();
    let mut sim = Simulation::new(&[], &[], &LayoutResult::default(), &config, &radial);
    assert_eq!(sim.step(), StepResult::Settled { iterations: 0 });
    assert!(sim.snapshot().is_empty());
}
