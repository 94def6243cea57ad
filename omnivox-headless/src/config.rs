//! The JSON file describing what to render.

use std::path::Path;

use anyhow::Context as _;

use omnivox_render::{CompositorOptions, SceneOptions};

/// Contents of a configuration file. Every field may be omitted.
#[derive(Clone, Debug, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct HeadlessConfig {
    pub compositor: CompositorOptions,
    /// Scenes to show in turn; the first is shown from the first frame.
    pub scenes: Vec<SceneOptions>,
    /// Number of frames to show each scene before switching to the next.
    pub frames_per_scene: usize,
    /// Total number of frames to render.
    pub frames: usize,
    /// Seconds of animation per frame.
    pub dt: f64,
}

impl Default for HeadlessConfig {
    fn default() -> Self {
        Self {
            compositor: CompositorOptions::default(),
            scenes: vec![SceneOptions::default()],
            frames_per_scene: 60,
            frames: 120,
            dt: 1.0 / 30.0,
        }
    }
}

impl HeadlessConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn read(path: &Path) -> Result<Self, anyhow::Error> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_json(&json)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    /// The scene that should be shown starting at `frame`, if a switch happens then.
    pub fn scene_starting_at(&self, frame: usize) -> Option<&SceneOptions> {
        if self.scenes.is_empty() {
            return None;
        }
        let per_scene = self.frames_per_scene.max(1);
        if frame % per_scene != 0 {
            return None;
        }
        self.scenes.get((frame / per_scene) % self.scenes.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use omnivox_render::{FogOptions, ShadowOptions};
    use pretty_assertions::assert_eq;

    #[test]
    fn partial_config() {
        let config = HeadlessConfig::from_json(
            r#"{
                "compositor": {"grid_size": 16},
                "scenes": [{"kind": "fog", "fog_scattering": 0.25}, {"kind": "shadow"}],
                "frames": 10
            }"#,
        )
        .unwrap();
        assert_eq!(config.compositor.grid_size.edge(), 16);
        assert_eq!(config.compositor.crossfade_time, 1.0);
        assert_eq!(config.frames, 10);
        assert_eq!(config.frames_per_scene, 60);
        assert_eq!(
            config.scenes[1],
            SceneOptions::from(ShadowOptions::default())
        );
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(HeadlessConfig::from_json(r#"{"frame": 3}"#).is_err());
    }

    #[test]
    fn scene_schedule_cycles() {
        let config = HeadlessConfig {
            scenes: vec![ShadowOptions::default().into(), FogOptions::default().into()],
            frames_per_scene: 2,
            ..HeadlessConfig::default()
        };
        let starts: Vec<Option<&str>> = (0..6)
            .map(|frame| config.scene_starting_at(frame).map(SceneOptions::kind))
            .collect();
        assert_eq!(
            starts,
            [Some("shadow"), None, Some("fog"), None, Some("shadow"), None]
        );
    }

    #[test]
    fn no_scenes() {
        let config = HeadlessConfig {
            scenes: vec![],
            ..HeadlessConfig::default()
        };
        assert_eq!(config.scene_starting_at(0), None);
    }
}
