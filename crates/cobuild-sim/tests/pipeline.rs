use cobuild_chunker::{start_scaled, ChunkingConfig, RobotParameters};
use cobuild_kernel_math::Point3;
use cobuild_kernel_mesh::shapes::cuboid;
use cobuild_sim::{simulate, SimSettings, Simulation};
use cobuild_slicer::{slice_chunks, SliceSettings};

#[test]
fn test_small_slab_end_to_end() {
    let model = cuboid(Point3::new(-20.0, -20.0, 0.0), Point3::new(20.0, 20.0, 1.0));
    let robot = RobotParameters {
        speed: 1000.0,
        ..RobotParameters::default()
    };
    let mut plan = start_scaled(&model, &robot, &ChunkingConfig::xy_reference(), 2).unwrap();
    let chunk_count = plan.chunk_count();

    slice_chunks(
        plan.robots.iter_mut().flat_map(|r| r.chunks.iter_mut()),
        &SliceSettings::default(),
    )
    .unwrap();
    let trace = simulate(&mut plan.robots, &SimSettings::default()).unwrap();

    let mut done = trace.finished_chunks.clone();
    done.sort_unstable();
    assert_eq!(done, (0..chunk_count).collect::<Vec<_>>());
    assert!(trace.frames.iter().any(|f| !f.materials.is_empty()));

    // A chunk never finishes before its dependencies.
    for chunk in plan.robots.iter().flat_map(|r| r.chunks.iter()) {
        let at = |n: usize| trace.finished_chunks.iter().position(|&c| c == n).unwrap();
        for &dep in &chunk.dependencies {
            assert!(at(dep) < at(chunk.number), "{} before {dep}", chunk.number);
        }
    }

    let sim = Simulation::from_trace(&trace);
    assert_eq!(sim.robot_count(), 2);
    assert_eq!(sim.frame_count(), trace.frame_count());
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sim.json");
    sim.save(&path, false).unwrap();
    assert_eq!(Simulation::load(&path).unwrap(), sim);
}
