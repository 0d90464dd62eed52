//! Time-slicing robot programs into frames.
//!
//! A frame lasts `1 / frames_per_second` seconds. Commands are executed in
//! order; a move that does not fit in what is left of the current frame is
//! cut at the frame boundary by linear interpolation, the frame is closed,
//! and the rest of the move continues in the next frame.

use cobuild_chunker::{ChunkFrame, Command, Material, Robot};
use cobuild_kernel_math::{lerp, Point3};

use crate::error::{Result, SimError};
use crate::SimSettings;

/// Extrusion state while walking one chunk's commands.
struct Extruder {
    tool_on: bool,
    path: Vec<Point3>,
    finished: Vec<Material>,
    color: [u8; 3],
}

impl Extruder {
    fn new(color: [u8; 3]) -> Self {
        Self {
            tool_on: false,
            path: Vec::new(),
            finished: Vec::new(),
            color,
        }
    }

    fn extend(&mut self, p: Point3) {
        if self.path.last() != Some(&p) {
            self.path.push(p);
        }
    }

    /// Close the current polyline. Anything shorter than a segment is dropped.
    fn close(&mut self, restart_at: Option<Point3>) {
        let points = std::mem::replace(&mut self.path, restart_at.into_iter().collect());
        if points.len() >= 2 {
            self.finished.push(Material {
                points,
                color: self.color,
            });
        }
    }
}

/// Fill `chunk.frame_data` for every chunk of `robot` from its commands.
///
/// Frame 0 of a chunk is where the robot stands when the chunk begins: its
/// home for the first chunk, the end of the previous chunk otherwise.
/// Returns the total number of frames.
pub fn generate_frames(robot: &mut Robot, settings: &SimSettings) -> Result<usize> {
    settings.validate()?;
    if !(robot.speed() > 0.0) {
        return Err(SimError::InvalidSettings(format!(
            "robot {} has non-positive speed {}",
            robot.number(),
            robot.speed()
        )));
    }
    let step = 1.0 / settings.frames_per_second;
    let mut last = robot.home();
    let mut total = 0;

    for chunk in &mut robot.chunks {
        let mut frames = vec![ChunkFrame::at(last)];
        let mut extruder = Extruder::new(chunk.color);
        let mut elapsed = 0.0;
        let mut i = 0;

        while let Some(command) = chunk.commands.get(i) {
            match *command {
                Command::ToolOn => {
                    if !extruder.tool_on {
                        extruder.tool_on = true;
                        extruder.path = vec![last];
                    }
                }
                Command::ToolOff => {
                    if extruder.tool_on {
                        extruder.tool_on = false;
                        extruder.extend(last);
                        extruder.close(None);
                    }
                }
                Command::NewLayer => {}
                Command::Move { to, .. } => {
                    let needed = command.duration(&last);
                    if elapsed + needed < step {
                        elapsed += needed;
                        if extruder.tool_on {
                            extruder.extend(to);
                        }
                        last = to;
                    } else {
                        let cut = lerp(&last, &to, (step - elapsed) / needed);
                        elapsed = 0.0;
                        if extruder.tool_on {
                            extruder.extend(cut);
                        }
                        last = cut;
                        extruder.close(Some(last));
                        frames.push(ChunkFrame {
                            location: last,
                            materials: std::mem::take(&mut extruder.finished),
                        });
                        // The rest of the move goes into the next frame.
                        continue;
                    }
                }
            }
            i += 1;
        }
        if !extruder.finished.is_empty() {
            frames.push(ChunkFrame {
                location: last,
                materials: extruder.finished,
            });
        }

        tracing::debug!(
            robot = robot.params.number,
            chunk = chunk.number,
            frames = frames.len(),
            "generated frames"
        );
        total += frames.len();
        chunk.frame_data = frames;
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use cobuild_chunker::{Chunk, ChunkGeometry, Path, RobotParameters, Slice};

    use crate::commands::generate_commands;

    fn robot_with(paths: Vec<Vec<Path>>) -> Robot {
        let mut robot = Robot::new(RobotParameters::default());
        for (n, chunk_paths) in paths.into_iter().enumerate() {
            let mut chunk = Chunk::new(n, ChunkGeometry::Placeholder(Point3::origin()));
            chunk.color = [10, 20, 30];
            chunk.slices = vec![Slice {
                z: 0.0,
                paths: chunk_paths,
            }];
            robot.chunks.push(chunk);
        }
        robot
    }

    fn straight(len: f64) -> Path {
        Path::new(vec![Point3::origin(), Point3::new(len, 0.0, 0.0)])
    }

    #[test]
    fn test_frame_count_follows_path_time() {
        // 20 mm at 10 mm/s and 4 fps is 8 frames.
        let mut robot = robot_with(vec![vec![straight(20.0)]]);
        let settings = SimSettings::default();
        generate_commands(&mut robot, &settings);
        generate_frames(&mut robot, &settings).unwrap();

        let frames = &robot.chunks[0].frame_data;
        assert_eq!(frames[0].location, Point3::origin());
        assert_eq!(frames.len(), 1 + 8);
        assert_relative_eq!(frames[1].location.x, 2.5, epsilon = 1e-9);
        assert_relative_eq!(frames[8].location.x, 20.0, epsilon = 1e-9);
    }

    #[test]
    fn test_interpolated_points_lie_on_the_move() {
        let mut robot = robot_with(vec![vec![Path::new(vec![
            Point3::origin(),
            Point3::new(3.0, 4.0, 0.0),
        ])]]);
        let settings = SimSettings {
            frames_per_second: 3.0,
            ..SimSettings::default()
        };
        generate_commands(&mut robot, &settings);
        generate_frames(&mut robot, &settings).unwrap();
        for frame in &robot.chunks[0].frame_data {
            let p = frame.location;
            assert_relative_eq!(p.y, p.x * 4.0 / 3.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_materials_carry_color_and_cover_the_path() {
        let mut robot = robot_with(vec![vec![straight(20.0)]]);
        let settings = SimSettings::default();
        generate_commands(&mut robot, &settings);
        generate_frames(&mut robot, &settings).unwrap();

        let materials: Vec<&Material> = robot.chunks[0]
            .frame_data
            .iter()
            .flat_map(|f| f.materials.iter())
            .collect();
        assert_eq!(materials.len(), 8);
        assert!(materials.iter().all(|m| m.color == [10, 20, 30]));
        assert!(materials.iter().all(|m| m.points.len() >= 2));
        let printed: f64 = materials
            .iter()
            .map(|m| Path::new(m.points.clone()).length())
            .sum();
        assert_relative_eq!(printed, 20.0, epsilon = 1e-9);
    }

    #[test]
    fn test_second_chunk_starts_where_first_ended() {
        let mut robot = robot_with(vec![vec![straight(5.0)], vec![straight(1.0)]]);
        let settings = SimSettings::default();
        generate_commands(&mut robot, &settings);
        generate_frames(&mut robot, &settings).unwrap();
        let end = robot.chunks[0].frame_data.last().unwrap().location;
        assert_eq!(robot.chunks[1].frame_data[0].location, end);
    }

    #[test]
    fn test_single_point_path_only_moves() {
        let mut robot = robot_with(vec![vec![Path::single(Point3::new(5.0, 0.0, 0.0))]]);
        let settings = SimSettings::default();
        generate_commands(&mut robot, &settings);
        generate_frames(&mut robot, &settings).unwrap();
        let frames = &robot.chunks[0].frame_data;
        assert!(frames.iter().all(|f| !f.has_material()));
        assert_relative_eq!(frames.last().unwrap().location.x, 5.0, epsilon = 1e-9);
    }

    #[test]
    fn test_rejects_zero_speed() {
        let mut robot = robot_with(vec![vec![straight(1.0)]]);
        robot.params.speed = 0.0;
        assert!(matches!(
            generate_frames(&mut robot, &SimSettings::default()),
            Err(SimError::InvalidSettings(_))
        ));
    }
}
