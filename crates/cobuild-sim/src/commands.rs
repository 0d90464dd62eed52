//! Robot programs: one command list per chunk.

use cobuild_chunker::{Command, Robot};
use cobuild_kernel_math::{Point3, Vec3};

use crate::SimSettings;

/// Fill `chunk.commands` for every chunk of `robot`.
///
/// Every non-empty path is printed as a move to its first point, `ToolOn`,
/// a move through each point and `ToolOff`. Once a chunk is done, the first
/// path of the next chunk is reached by lifting the tool `travel_lift`,
/// crossing over at that height and descending. Returns the number of
/// commands generated.
pub fn generate_commands(robot: &mut Robot, settings: &SimSettings) -> usize {
    let speed = robot.speed();
    let scale = settings.model_scale;
    let lift = Vec3::new(0.0, 0.0, settings.travel_lift);
    let mv = |to: Point3| Command::move_to(to, speed, scale);

    let mut last = robot.last_location;
    let mut transitioning = false;
    let mut total = 0;

    for chunk in &mut robot.chunks {
        let mut commands = vec![Command::ToolOff];
        for slice in &chunk.slices {
            for path in slice.paths.iter().filter(|p| !p.is_empty()) {
                let first = path.points[0];
                if transitioning {
                    let up = last + lift;
                    commands.push(mv(up));
                    commands.push(mv(Point3::new(first.x, first.y, up.z)));
                    commands.push(mv(first));
                    transitioning = false;
                }
                commands.push(mv(first));
                last = first;
                commands.push(Command::ToolOn);
                for &p in &path.points {
                    commands.push(mv(p));
                    last = p;
                }
                commands.push(Command::ToolOff);
            }
            commands.push(Command::NewLayer);
            commands.push(Command::ToolOff);
        }
        transitioning = true;
        commands.push(Command::ToolOff);

        tracing::debug!(
            robot = robot.params.number,
            chunk = chunk.number,
            commands = commands.len(),
            "generated commands"
        );
        total += commands.len();
        chunk.commands = commands;
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use cobuild_chunker::{Chunk, ChunkGeometry, Path, RobotParameters, Slice};

    fn chunk_with_paths(number: usize, paths: Vec<Path>) -> Chunk {
        let mut chunk = Chunk::new(number, ChunkGeometry::Placeholder(Point3::origin()));
        chunk.slices = vec![Slice { z: 0.0, paths }];
        chunk
    }

    fn line(x0: f64, x1: f64) -> Path {
        Path::new(vec![Point3::new(x0, 0.0, 0.0), Point3::new(x1, 0.0, 0.0)])
    }

    fn moves(commands: &[Command]) -> Vec<Point3> {
        commands
            .iter()
            .filter_map(|c| match c {
                Command::Move { to, .. } => Some(*to),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_single_path_program() {
        let mut robot = Robot::new(RobotParameters::default());
        robot.chunks.push(chunk_with_paths(0, vec![line(0.0, 1.0)]));
        let n = generate_commands(&mut robot, &SimSettings::default());

        let cmds = &robot.chunks[0].commands;
        assert_eq!(n, cmds.len());
        assert_eq!(cmds[0], Command::ToolOff);
        assert!(matches!(cmds[1], Command::Move { .. }));
        assert_eq!(cmds[2], Command::ToolOn);
        // The first point is visited twice: once to get there, once printed.
        assert_eq!(moves(cmds).len(), 3);
        assert_eq!(
            &cmds[cmds.len() - 4..],
            &[
                Command::ToolOff,
                Command::NewLayer,
                Command::ToolOff,
                Command::ToolOff
            ]
        );
    }

    #[test]
    fn test_empty_paths_are_skipped() {
        let mut robot = Robot::new(RobotParameters::default());
        robot
            .chunks
            .push(chunk_with_paths(0, vec![Path::default(), line(0.0, 1.0)]));
        generate_commands(&mut robot, &SimSettings::default());
        let on = robot.chunks[0]
            .commands
            .iter()
            .filter(|c| **c == Command::ToolOn)
            .count();
        assert_eq!(on, 1);
    }

    #[test]
    fn test_travel_between_chunks() {
        let mut robot = Robot::new(RobotParameters::default());
        robot.chunks.push(chunk_with_paths(0, vec![line(0.0, 1.0)]));
        robot.chunks.push(chunk_with_paths(1, vec![line(5.0, 6.0)]));
        generate_commands(&mut robot, &SimSettings::default());

        let second = moves(&robot.chunks[1].commands);
        // Lift above the last printed point, cross, descend, then print.
        assert_relative_eq!(second[0].x, 1.0);
        assert_relative_eq!(second[0].z, 0.05);
        assert_relative_eq!(second[1].x, 5.0);
        assert_relative_eq!(second[1].z, 0.05);
        assert_eq!(second[2], Point3::new(5.0, 0.0, 0.0));
        assert_eq!(second.len(), 6);
    }

    #[test]
    fn test_moves_are_scaled() {
        let mut robot = Robot::new(RobotParameters::default());
        robot.chunks.push(chunk_with_paths(0, vec![line(1.0, 2.0)]));
        let settings = SimSettings {
            model_scale: 10.0,
            ..SimSettings::default()
        };
        generate_commands(&mut robot, &settings);
        let last = *moves(&robot.chunks[0].commands).last().unwrap();
        assert_relative_eq!(last.x, 20.0);
    }
}
