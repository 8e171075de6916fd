//! Scene scripts
//!
//! A scene declares source pictures and windows, then lists the draw
//! operations the VM would issue, in order:
//!
//! ```toml
//! [[picture]]
//! id = 1
//! width = 32
//! height = 32
//! color = "#ff0000"
//!
//! [[window]]
//! id = 1
//! x = 10
//! y = 10
//! width = 320
//! height = 240
//! background = "#ffffff"
//!
//! [[op]]
//! kind = "bake"
//! window = 1
//! picture = 1
//! x = 4
//! y = 4
//! src = [0, 0, 16, 16]
//!
//! [[op]]
//! kind = "cast"
//! window = 1
//! cast = 7
//! picture = 1
//! x = 40
//! y = 40
//! ```
//!
//! A failing operation is logged and skipped; the rest of the scene still runs.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use rustc_hash::FxHashMap;
use serde::Deserialize;
use tracing::{debug, warn};
use vellum_compositor::{CastSource, Desktop};
use vellum_core::{Color, LayerId, Point, Rect};
use vellum_image::Bitmap;

#[derive(Debug, Default, Deserialize)]
pub struct Scene {
    #[serde(default, rename = "picture")]
    pub pictures: Vec<PictureDecl>,
    #[serde(default, rename = "window")]
    pub windows: Vec<WindowDecl>,
    #[serde(default, rename = "op")]
    pub ops: Vec<Op>,
}

/// A solid-color source bitmap
#[derive(Debug, Deserialize)]
pub struct PictureDecl {
    pub id: u32,
    pub width: i32,
    pub height: i32,
    pub color: String,
}

#[derive(Debug, Deserialize)]
pub struct WindowDecl {
    pub id: u32,
    #[serde(default)]
    pub x: i32,
    #[serde(default)]
    pub y: i32,
    pub width: i32,
    pub height: i32,
    #[serde(default)]
    pub background: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Op {
    /// Copy a picture region into a window
    Bake {
        window: u32,
        picture: u32,
        #[serde(default)]
        x: i32,
        #[serde(default)]
        y: i32,
        /// `[x, y, width, height]`; the whole picture when omitted
        #[serde(default)]
        src: Option<[i32; 4]>,
    },
    /// Show a picture as a cast layer, addressed later by `cast`
    Cast {
        window: u32,
        cast: u32,
        picture: u32,
        #[serde(default)]
        x: i32,
        #[serde(default)]
        y: i32,
        #[serde(default)]
        transparent: Option<String>,
    },
    MoveCast {
        window: u32,
        cast: u32,
        x: i32,
        y: i32,
    },
    /// A block standing in for rasterized text
    Text {
        window: u32,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        color: String,
    },
    Front {
        window: u32,
    },
    Back {
        window: u32,
    },
    Close {
        window: u32,
    },
    Hide {
        window: u32,
    },
    Show {
        window: u32,
    },
}

/// Counts from one replay
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Replay {
    pub applied: usize,
    pub skipped: usize,
}

impl Scene {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read scene {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse scene {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Invalid scene file")
    }

    /// Build the source pictures, rejecting bad declarations up front
    pub fn pictures(&self) -> Result<FxHashMap<u32, Arc<Bitmap>>> {
        let mut pictures = FxHashMap::default();
        for decl in &self.pictures {
            let color = parse_color(&decl.color)
                .with_context(|| format!("picture {}", decl.id))?;
            let bitmap = Bitmap::filled(decl.width, decl.height, color)
                .with_context(|| format!("picture {}", decl.id))?;
            pictures.insert(decl.id, Arc::new(bitmap));
        }
        Ok(pictures)
    }

    /// Open the declared windows and apply every operation
    pub fn replay(&self, desktop: &mut Desktop) -> Result<Replay> {
        let pictures = self.pictures()?;
        let mut player = Player {
            desktop,
            pictures,
            casts: FxHashMap::default(),
            replay: Replay::default(),
        };

        for window in &self.windows {
            let result = player.open(window);
            player.record("window", result);
        }
        for op in &self.ops {
            let result = player.apply(op);
            player.record("op", result);
        }
        Ok(player.replay)
    }
}

struct Player<'a> {
    desktop: &'a mut Desktop,
    pictures: FxHashMap<u32, Arc<Bitmap>>,
    /// `(window, cast)` to the layer showing it
    casts: FxHashMap<(u32, u32), LayerId>,
    replay: Replay,
}

impl Player<'_> {
    fn record(&mut self, what: &str, result: Result<()>) {
        match result {
            Ok(()) => self.replay.applied += 1,
            Err(err) => {
                warn!("{what} skipped: {err:#}");
                self.replay.skipped += 1;
            }
        }
    }

    fn picture(&self, id: u32) -> Result<Arc<Bitmap>> {
        self.pictures
            .get(&id)
            .cloned()
            .with_context(|| format!("unknown picture {id}"))
    }

    fn open(&mut self, decl: &WindowDecl) -> Result<()> {
        let background = decl.background.as_deref().map(parse_color).transpose()?;
        let rect = Rect::new(decl.x, decl.y, decl.width, decl.height);
        self.desktop.open_window(decl.id, rect, background)?;
        Ok(())
    }

    fn apply(&mut self, op: &Op) -> Result<()> {
        debug!(?op, "apply");
        match *op {
            Op::Bake {
                window,
                picture,
                x,
                y,
                src,
            } => {
                let image = self.picture(picture)?;
                let src_rect = match src {
                    Some([sx, sy, w, h]) => Rect::new(sx, sy, w, h),
                    None => image.bounds(),
                };
                self.desktop.bake(window, Point::new(x, y), &image, src_rect)?;
            }
            Op::Cast {
                window,
                cast,
                picture,
                x,
                y,
                ref transparent,
            } => {
                let image = self.picture(picture)?;
                let transparent = transparent.as_deref().map(parse_color).transpose()?;
                let source = CastSource {
                    src_rect: image.bounds(),
                    image,
                    transparent,
                };
                let layer = self
                    .desktop
                    .with_window_set(window, |set| set.add_cast_layer(source, Point::new(x, y)))??;
                self.casts.insert((window, cast), layer);
            }
            Op::MoveCast { window, cast, x, y } => {
                let layer = *self
                    .casts
                    .get(&(window, cast))
                    .with_context(|| format!("unknown cast {cast} in window {window}"))?;
                self.desktop
                    .with_window_set(window, |set| set.move_layer(layer, Point::new(x, y)))??;
            }
            Op::Text {
                window,
                x,
                y,
                width,
                height,
                ref color,
            } => {
                let color = parse_color(color)?;
                let block = Bitmap::filled(width, height, color)?;
                self.desktop
                    .with_window_set(window, |set| set.add_text_layer(block, Point::new(x, y)))?;
            }
            Op::Front { window } => self.desktop.bring_window_to_front(window)?,
            Op::Back { window } => self.desktop.send_window_to_back(window)?,
            Op::Close { window } => {
                self.desktop.close_window(window)?;
                self.casts.retain(|&(w, _), _| w != window);
            }
            Op::Hide { window } => {
                self.desktop.set_window_visible(window, false)?;
            }
            Op::Show { window } => {
                self.desktop.set_window_visible(window, true)?;
            }
        }
        Ok(())
    }
}

fn parse_color(value: &str) -> Result<Color> {
    Color::parse_hex(value).with_context(|| format!("invalid color {value:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use vellum_compositor::CompositorConfig;

    const SCENE: &str = r##"
[[picture]]
id = 1
width = 16
height = 16
color = "#ff0000"

[[picture]]
id = 2
width = 4
height = 4
color = "#00ff00"

[[window]]
id = 1
x = 0
y = 0
width = 40
height = 40
background = "#ffffff"

[[window]]
id = 2
x = 50
y = 0
width = 10
height = 10
background = "#0000ff"

[[op]]
kind = "bake"
window = 1
picture = 1
x = 2
y = 2
src = [0, 0, 8, 8]

[[op]]
kind = "cast"
window = 1
cast = 7
picture = 2
x = 20
y = 20

[[op]]
kind = "move_cast"
window = 1
cast = 7
x = 30
y = 30

[[op]]
kind = "text"
window = 1
x = 0
y = 35
width = 5
height = 2
color = "#000000"

[[op]]
kind = "hide"
window = 2
"##;

    fn desktop() -> Desktop {
        let config = CompositorConfig {
            screen_width: 64,
            screen_height: 48,
            ..CompositorConfig::default()
        };
        Desktop::new(config).unwrap()
    }

    #[test]
    fn test_replay_scene() {
        let scene = Scene::from_toml_str(SCENE).unwrap();
        assert_eq!(scene.pictures.len(), 2);
        assert_eq!(scene.windows.len(), 2);
        assert_eq!(scene.ops.len(), 5);

        let mut desktop = desktop();
        let replay = scene.replay(&mut desktop).unwrap();
        assert_eq!(replay, Replay { applied: 7, skipped: 0 });

        let frame = desktop.render().unwrap();
        assert_eq!(frame.pixel(3, 3), Some(Color::RED));
        assert_eq!(frame.pixel(12, 12), Some(Color::WHITE));
        assert_eq!(frame.pixel(21, 21), Some(Color::WHITE));
        assert_eq!(frame.pixel(31, 31), Some(Color::GREEN));
        assert_eq!(frame.pixel(1, 36), Some(Color::BLACK));
        // Window 2 is hidden.
        assert_eq!(frame.pixel(52, 2), Some(Color::BLACK));
    }

    #[test]
    fn test_failing_ops_are_skipped() {
        let scene = Scene::from_toml_str(
            r#"
[[window]]
id = 1
width = 10
height = 10

[[op]]
kind = "bake"
window = 1
picture = 99

[[op]]
kind = "front"
window = 5

[[op]]
kind = "move_cast"
window = 1
cast = 1
x = 0
y = 0

[[op]]
kind = "close"
window = 1
"#,
        )
        .unwrap();

        let mut desktop = desktop();
        let replay = scene.replay(&mut desktop).unwrap();
        assert_eq!(replay, Replay { applied: 2, skipped: 3 });
        assert!(!desktop.is_open(1));
    }

    #[test]
    fn test_invalid_window_is_skipped() {
        let scene = Scene::from_toml_str(
            r#"
[[window]]
id = 1
width = 0
height = 10
"#,
        )
        .unwrap();
        let mut desktop = desktop();
        let replay = scene.replay(&mut desktop).unwrap();
        assert_eq!(replay.skipped, 1);
        assert!(!desktop.is_open(1));
    }

    #[test]
    fn test_bad_picture_is_an_error() {
        let scene = Scene::from_toml_str(
            r#"
[[picture]]
id = 1
width = 4
height = 4
color = "red"
"#,
        )
        .unwrap();
        assert!(scene.pictures().is_err());
    }

    #[test]
    fn test_unknown_op_kind_fails_to_parse() {
        let result = Scene::from_toml_str(
            r#"
[[op]]
kind = "explode"
window = 1
"#,
        );
        assert!(result.is_err());
    }
}
