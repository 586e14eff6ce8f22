//! Static animation and geometry tables
//!
//! Loaded once before play begins and only read afterwards. Authored data
//! refers to bones by name; loading resolves names to indices and rejects
//! anything malformed instead of letting it corrupt later frames.

use std::path::Path;

use glam::{Affine3A, Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::AssetError;

/// A bone in bind pose, relative to its parent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bone {
    pub name: String,
    /// Index of the parent bone; parents always precede children
    pub parent: Option<usize>,
    pub translation: Vec3,
    #[serde(default)]
    pub rotation: Quat,
}

impl Bone {
    pub fn bind(&self) -> Affine3A {
        Affine3A::from_rotation_translation(self.rotation, self.translation)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Skeleton {
    pub bones: Vec<Bone>,
}

impl Skeleton {
    pub fn new(bones: Vec<Bone>) -> Result<Self, AssetError> {
        if bones.is_empty() {
            return Err(AssetError::EmptyTable("skeleton"));
        }
        for (i, bone) in bones.iter().enumerate() {
            if let Some(parent) = bone.parent {
                if parent >= i {
                    return Err(AssetError::BadParent { bone: i, parent });
                }
            }
        }
        Ok(Self { bones })
    }

    pub fn find(&self, name: &str) -> Result<usize, AssetError> {
        self.bones
            .iter()
            .position(|b| b.name == name)
            .ok_or_else(|| AssetError::MissingBone(name.to_string()))
    }

    /// Bind transform of a bone in model space
    pub fn model_bind(&self, index: usize) -> Affine3A {
        let bone = &self.bones[index];
        match bone.parent {
            Some(parent) => self.model_bind(parent) * bone.bind(),
            None => bone.bind(),
        }
    }
}

/// Authored track: one angle per keyframe for a named bone
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoseTrackDef {
    pub bone: String,
    pub angles: Vec<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoseTableDef {
    pub times: Vec<f32>,
    pub tracks: Vec<PoseTrackDef>,
}

#[derive(Debug, Clone)]
pub struct PoseTrack {
    pub bone: usize,
    pub angles: Vec<f32>,
}

/// Bone angle produced by sampling a pose table
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BonePose {
    pub bone: usize,
    pub angle: f32,
}

/// Looping keyframed pose table (wing flap, eye look)
#[derive(Debug, Clone)]
pub struct PoseTable {
    pub times: Vec<f32>,
    pub tracks: Vec<PoseTrack>,
}

impl PoseTable {
    fn resolve(name: &'static str, def: &PoseTableDef, skeleton: &Skeleton) -> Result<Self, AssetError> {
        if def.times.len() < 2 {
            return Err(AssetError::EmptyTable(name));
        }
        if def.times.windows(2).any(|w| w[1] <= w[0]) {
            return Err(AssetError::UnsortedKeyframes(name));
        }
        let tracks = def
            .tracks
            .iter()
            .map(|track| {
                if track.angles.len() != def.times.len() {
                    return Err(AssetError::TrackLength {
                        bone: track.bone.clone(),
                        got: track.angles.len(),
                        expected: def.times.len(),
                    });
                }
                Ok(PoseTrack {
                    bone: skeleton.find(&track.bone)?,
                    angles: track.angles.clone(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            times: def.times.clone(),
            tracks,
        })
    }

    /// Length of one loop in the table's time units
    pub fn duration(&self) -> f32 {
        self.times[self.times.len() - 1] - self.times[0]
    }

    /// Sample every track at a loop phase (any real; wrapped into [0, 1))
    pub fn sample(&self, phase: f32) -> Vec<BonePose> {
        let t = self.times[0] + phase.rem_euclid(1.0) * self.duration();
        let next = self.times.partition_point(|&k| k <= t).clamp(1, self.times.len() - 1);
        let prev = next - 1;
        let span = self.times[next] - self.times[prev];
        let f = ((t - self.times[prev]) / span).clamp(0.0, 1.0);
        self.tracks
            .iter()
            .map(|track| BonePose {
                bone: track.bone,
                angle: crate::lerp(track.angles[prev], track.angles[next], f),
            })
            .collect()
    }
}

/// One frame of the scripted death fall
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FallFrame {
    /// Distance dropped below the start position
    pub drop: f32,
    /// Distance pushed back along the recoil direction
    pub recoil: f32,
    /// Rotation about the fall's spin axis
    pub angle: f32,
}

/// Tongue IK chain rest lengths
#[derive(Debug, Clone)]
pub struct TongueRig {
    pub lengths: Vec<f32>,
}

/// Pipe collision and placement metrics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PipeMetrics {
    /// Collision radius of a pipe
    pub radius: f32,
    /// Horizontal distance between obstacle slots
    pub spacing: f32,
}

/// Authored form of the asset table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetFile {
    pub skeleton: Vec<Bone>,
    pub wing_poses: PoseTableDef,
    pub eye_poses: PoseTableDef,
    pub fall: Vec<FallFrame>,
    /// Tongue bones, root first; each length is its bind offset from its parent
    pub tongue: Vec<String>,
    pub pipe: PipeMetrics,
}

/// Resolved, validated tables
#[derive(Debug, Clone)]
pub struct AssetTable {
    pub skeleton: Skeleton,
    pub wing_poses: PoseTable,
    pub eye_poses: PoseTable,
    pub fall: Vec<FallFrame>,
    pub tongue: TongueRig,
    pub pipe: PipeMetrics,
}

impl AssetTable {
    pub fn from_file(file: AssetFile) -> Result<Self, AssetError> {
        let skeleton = Skeleton::new(file.skeleton)?;
        let wing_poses = PoseTable::resolve("wing", &file.wing_poses, &skeleton)?;
        let eye_poses = PoseTable::resolve("eye", &file.eye_poses, &skeleton)?;

        if file.fall.len() < 2 {
            return Err(AssetError::EmptyTable("fall"));
        }

        let mut lengths = Vec::with_capacity(file.tongue.len());
        for (index, name) in file.tongue.iter().enumerate() {
            let bone = skeleton.find(name)?;
            let length = skeleton.bones[bone].translation.length();
            if length < 1e-5 {
                return Err(AssetError::DegenerateSegment { index });
            }
            lengths.push(length);
        }
        if lengths.is_empty() {
            return Err(AssetError::EmptyTable("tongue"));
        }

        if !(file.pipe.radius > 0.0 && file.pipe.spacing > 2.0 * file.pipe.radius) {
            return Err(AssetError::PipeMetrics(format!(
                "radius {} spacing {}",
                file.pipe.radius, file.pipe.spacing
            )));
        }

        Ok(Self {
            skeleton,
            wing_poses,
            eye_poses,
            fall: file.fall,
            tongue: TongueRig { lengths },
            pipe: file.pipe,
        })
    }

    pub fn from_json(json: &str) -> Result<Self, AssetError> {
        Self::from_file(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, AssetError> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let table = Self::from_json(&json)?;
        log::info!(
            "Loaded assets from {} ({} bones, {} fall frames)",
            path.as_ref().display(),
            table.skeleton.bones.len(),
            table.fall.len()
        );
        Ok(table)
    }

    /// The shipped bird rig and tables
    pub fn builtin() -> Result<Self, AssetError> {
        Self::from_file(AssetFile::builtin())
    }

    /// Index of the last fall frame
    pub fn fall_last_frame(&self) -> f32 {
        (self.fall.len() - 1) as f32
    }

    /// Fall table at a fractional frame, clamped to the table
    pub fn fall_frame(&self, frame: f32) -> FallFrame {
        let frame = frame.clamp(0.0, self.fall_last_frame());
        let i = (frame.floor() as usize).min(self.fall.len() - 2);
        let t = frame - i as f32;
        let (a, b) = (self.fall[i], self.fall[i + 1]);
        FallFrame {
            drop: crate::lerp(a.drop, b.drop, t),
            recoil: crate::lerp(a.recoil, b.recoil, t),
            angle: crate::lerp(a.angle, b.angle, t),
        }
    }
}

impl AssetFile {
    pub fn builtin() -> Self {
        fn bone(name: &str, parent: Option<usize>, translation: Vec3) -> Bone {
            Bone {
                name: name.to_string(),
                parent,
                translation,
                rotation: Quat::IDENTITY,
            }
        }

        let skeleton = vec![
            bone("root", None, Vec3::ZERO),
            bone("body", Some(0), Vec3::new(0.0, 0.0, 0.05)),
            bone("head", Some(1), Vec3::new(0.22, 0.0, 0.18)),
            bone("eye_l", Some(2), Vec3::new(0.12, 0.09, 0.08)),
            bone("eye_r", Some(2), Vec3::new(0.12, -0.09, 0.08)),
            bone("wing_l", Some(1), Vec3::new(-0.05, 0.3, 0.1)),
            bone("wing_r", Some(1), Vec3::new(-0.05, -0.3, 0.1)),
            bone("tongue_0", Some(2), Vec3::new(0.2, 0.0, -0.04)),
            bone("tongue_1", Some(7), Vec3::new(0.1, 0.0, 0.0)),
            bone("tongue_2", Some(8), Vec3::new(0.09, 0.0, 0.0)),
            bone("tongue_3", Some(9), Vec3::new(0.08, 0.0, 0.0)),
        ];

        let wing_poses = PoseTableDef {
            times: vec![0.0, 0.25, 0.5, 0.75, 1.0],
            tracks: vec![
                PoseTrackDef {
                    bone: "wing_l".into(),
                    angles: vec![0.0, 0.9, 0.0, -0.6, 0.0],
                },
                PoseTrackDef {
                    bone: "wing_r".into(),
                    angles: vec![0.0, -0.9, 0.0, 0.6, 0.0],
                },
            ],
        };

        let eye_poses = PoseTableDef {
            times: vec![0.0, 0.4, 0.5, 0.9, 1.0],
            tracks: vec![
                PoseTrackDef {
                    bone: "eye_l".into(),
                    angles: vec![0.0, 0.0, 0.35, 0.35, 0.0],
                },
                PoseTrackDef {
                    bone: "eye_r".into(),
                    angles: vec![0.0, 0.0, 0.35, 0.35, 0.0],
                },
            ],
        };

        // Quick recoil, then an accelerating drop while tumbling
        let frames = 45;
        let fall = (0..=frames)
            .map(|i| {
                let t = i as f32 / frames as f32;
                let recoil_ease = 1.0 - (1.0 - t) * (1.0 - t);
                FallFrame {
                    drop: 2.2 * t * t,
                    recoil: 1.2 * recoil_ease,
                    angle: 2.6 * recoil_ease,
                }
            })
            .collect();

        Self {
            skeleton,
            wing_poses,
            eye_poses,
            fall,
            tongue: vec![
                "tongue_1".into(),
                "tongue_2".into(),
                "tongue_3".into(),
            ],
            pipe: PipeMetrics {
                radius: 1.1,
                spacing: 7.0,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_is_valid() {
        let table = AssetTable::builtin().unwrap();
        assert_eq!(table.tongue.lengths.len(), 3);
        assert!((table.wing_poses.duration() - 1.0).abs() < 1e-6);
        assert!(table.fall_last_frame() >= 1.0);
    }

    #[test]
    fn test_missing_bone_aborts() {
        let mut file = AssetFile::builtin();
        file.wing_poses.tracks[0].bone = "wing_missing".into();
        let err = AssetTable::from_file(file).unwrap_err();
        assert!(matches!(err, AssetError::MissingBone(name) if name == "wing_missing"));
    }

    #[test]
    fn test_zero_length_tongue_segment_aborts() {
        let mut file = AssetFile::builtin();
        file.skeleton[9].translation = Vec3::ZERO;
        let err = AssetTable::from_file(file).unwrap_err();
        assert!(matches!(err, AssetError::DegenerateSegment { index: 1 }));
    }

    #[test]
    fn test_bad_parent_aborts() {
        let mut file = AssetFile::builtin();
        file.skeleton[1].parent = Some(5);
        assert!(matches!(
            AssetTable::from_file(file),
            Err(AssetError::BadParent { bone: 1, parent: 5 })
        ));
    }

    #[test]
    fn test_pose_sample_interpolates_and_wraps() {
        let table = AssetTable::builtin().unwrap();
        let wing_l = table.skeleton.find("wing_l").unwrap();

        let at_peak = table.wing_poses.sample(0.25);
        let pose = at_peak.iter().find(|p| p.bone == wing_l).unwrap();
        assert!((pose.angle - 0.9).abs() < 1e-5);

        let halfway = table.wing_poses.sample(0.125);
        let pose = halfway.iter().find(|p| p.bone == wing_l).unwrap();
        assert!((pose.angle - 0.45).abs() < 1e-5);

        let wrapped = table.wing_poses.sample(1.25);
        let pose = wrapped.iter().find(|p| p.bone == wing_l).unwrap();
        assert!((pose.angle - 0.9).abs() < 1e-4);
    }

    #[test]
    fn test_json_round_trip_of_authored_file() {
        let json = serde_json::to_string(&AssetFile::builtin()).unwrap();
        let table = AssetTable::from_json(&json).unwrap();
        assert_eq!(table.skeleton.bones.len(), 11);
    }

    #[test]
    fn test_model_bind_composes_parents() {
        let table = AssetTable::builtin().unwrap();
        let eye = table.skeleton.find("eye_l").unwrap();
        let pos = table.skeleton.model_bind(eye).translation;
        assert!((pos.x - 0.34).abs() < 1e-5);
        assert!((pos.z - 0.31).abs() < 1e-5);
    }

    #[test]
    fn test_fall_frame_interpolates_and_clamps() {
        let table = AssetTable::builtin().unwrap();
        let a = table.fall[10];
        let b = table.fall[11];
        let mid = table.fall_frame(10.5);
        assert!((mid.drop - (a.drop + b.drop) * 0.5).abs() < 1e-5);
        let end = table.fall_frame(1000.0);
        let last = table.fall.last().unwrap();
        assert!((end.drop - last.drop).abs() < 1e-5);
        assert!((end.angle - last.angle).abs() < 1e-5);
        assert_eq!(table.fall_frame(-3.0), table.fall[0]);
    }
}
