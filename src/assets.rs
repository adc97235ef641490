//! Asset loading and caching.
//!
//! Paths are resolved against the provider's root directory and cached by the
//! resolved path. Textures never fail: a missing or undecodable image yields
//! the shared checkerboard placeholder. Models and audio return errors.
//!
//! Assets can also be queued with [`AssetProvider::preload`] and loaded a few
//! at a time by [`AssetProvider::pump`], which the engine calls every tick.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use kira::sound::FromFileError;
use kira::sound::static_sound::StaticSoundData;

use crate::geometry::{GeometryError, Model};
use crate::texture::Texture;

/// Errors raised when loading models or audio.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("failed to load model '{path}': {source}")]
    Model {
        path: PathBuf,
        #[source]
        source: GeometryError,
    },
    #[error("failed to load audio '{path}': {source}")]
    Audio {
        path: PathBuf,
        #[source]
        source: FromFileError,
    },
}

/// What kind of asset a path holds, judged by its extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssetKind {
    Texture,
    Model,
    Audio,
}

impl AssetKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "png" | "jpg" | "jpeg" | "bmp" | "gif" | "webp" => Some(Self::Texture),
            "stl" => Some(Self::Model),
            "ogg" | "mp3" | "wav" | "flac" => Some(Self::Audio),
            _ => None,
        }
    }
}

/// Loads and caches textures, models and audio.
pub struct AssetProvider {
    root: PathBuf,
    placeholder: Arc<Texture>,
    textures: HashMap<PathBuf, Arc<Texture>>,
    models: HashMap<PathBuf, Arc<Model>>,
    audio: HashMap<PathBuf, StaticSoundData>,
    queue: VecDeque<(AssetKind, PathBuf)>,
    queued_total: usize,
    failed: usize,
}

impl AssetProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            placeholder: Arc::new(Texture::placeholder()),
            textures: HashMap::new(),
            models: HashMap::new(),
            audio: HashMap::new(),
            queue: VecDeque::new(),
            queued_total: 0,
            failed: 0,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    /// The texture shown in place of images that failed to load.
    pub fn placeholder(&self) -> Arc<Texture> {
        Arc::clone(&self.placeholder)
    }

    /// Load a texture, falling back to the placeholder.
    pub fn load_texture(&mut self, path: impl AsRef<Path>) -> Arc<Texture> {
        let path = self.resolve(path);
        if let Some(texture) = self.textures.get(&path) {
            return Arc::clone(texture);
        }

        let texture = match Texture::from_file(&path) {
            Ok(texture) => {
                log::debug!("loaded texture {}", path.display());
                Arc::new(texture)
            }
            Err(err) => {
                log::warn!("texture {} unavailable, using placeholder: {}", path.display(), err);
                Arc::clone(&self.placeholder)
            }
        };
        self.textures.insert(path, Arc::clone(&texture));
        texture
    }

    /// Load an STL model.
    pub fn load_model(&mut self, path: impl AsRef<Path>) -> Result<Arc<Model>, AssetError> {
        let path = self.resolve(path);
        if let Some(model) = self.models.get(&path) {
            return Ok(Arc::clone(model));
        }

        let model = Model::from_file(&path).map_err(|source| AssetError::Model {
            path: path.clone(),
            source,
        })?;
        log::debug!(
            "loaded model {} ({} triangles)",
            path.display(),
            model.indices.len() / 3
        );
        let model = Arc::new(model);
        self.models.insert(path, Arc::clone(&model));
        Ok(model)
    }

    /// Decode an audio file.
    pub fn load_audio(&mut self, path: impl AsRef<Path>) -> Result<StaticSoundData, AssetError> {
        let path = self.resolve(path);
        if let Some(data) = self.audio.get(&path) {
            return Ok(data.clone());
        }

        let data = StaticSoundData::from_file(&path).map_err(|source| AssetError::Audio {
            path: path.clone(),
            source,
        })?;
        log::debug!("loaded audio {}", path.display());
        self.audio.insert(path, data.clone());
        Ok(data)
    }

    /// Queue assets for background loading. Paths with unknown extensions are skipped.
    pub fn preload<I, P>(&mut self, paths: I)
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        for path in paths {
            let path = path.as_ref();
            match AssetKind::from_path(path) {
                Some(kind) => {
                    self.queue.push_back((kind, path.to_path_buf()));
                    self.queued_total += 1;
                }
                None => log::warn!("not preloading {}: unknown asset type", path.display()),
            }
        }
    }

    /// Load up to `budget` queued assets. Returns how many settled.
    pub fn pump(&mut self, budget: usize) -> usize {
        let mut settled = 0;
        while settled < budget {
            let Some((kind, path)) = self.queue.pop_front() else {
                break;
            };
            let ok = match kind {
                AssetKind::Texture => {
                    let texture = self.load_texture(&path);
                    !Arc::ptr_eq(&texture, &self.placeholder)
                }
                AssetKind::Model => self
                    .load_model(&path)
                    .map_err(|err| log::warn!("{}", err))
                    .is_ok(),
                AssetKind::Audio => self
                    .load_audio(&path)
                    .map_err(|err| log::warn!("{}", err))
                    .is_ok(),
            };
            if !ok {
                self.failed += 1;
            }
            settled += 1;
        }

        if settled > 0 && self.queue.is_empty() {
            log::info!(
                "preload finished: {} assets, {} failed",
                self.queued_total,
                self.failed
            );
        }
        settled
    }

    /// True once every queued load has settled, loaded or failed.
    pub fn is_everything_loaded(&self) -> bool {
        self.queue.is_empty()
    }

    /// `(settled, queued)` over everything ever queued.
    pub fn progress(&self) -> (usize, usize) {
        (self.queued_total - self.queue.len(), self.queued_total)
    }

    /// Queued loads that failed.
    pub fn failed(&self) -> usize {
        self.failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgba, RgbaImage};

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("tableau-assets-{}-{}", name, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn missing_textures_fall_back_to_placeholder() {
        let mut assets = AssetProvider::new(scratch_dir("missing"));
        let a = assets.load_texture("nope.png");
        let b = assets.load_texture("nope.png");
        assert!(Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&a, &assets.placeholder()));
    }

    #[test]
    fn textures_are_cached() {
        let dir = scratch_dir("cached");
        let image: RgbaImage = ImageBuffer::from_pixel(2, 2, Rgba([10, 20, 30, 255]));
        image.save(dir.join("tile.png")).unwrap();

        let mut assets = AssetProvider::new(&dir);
        let a = assets.load_texture("tile.png");
        let b = assets.load_texture(dir.join("tile.png"));
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.width(), 2);
        assert!(!Arc::ptr_eq(&a, &assets.placeholder()));
    }

    #[test]
    fn missing_models_are_errors() {
        let mut assets = AssetProvider::new(scratch_dir("models"));
        assert!(matches!(
            assets.load_model("statue.stl"),
            Err(AssetError::Model { .. })
        ));
    }

    #[test]
    fn preload_settles_loaded_and_failed() {
        let dir = scratch_dir("preload");
        let image: RgbaImage = ImageBuffer::from_pixel(1, 1, Rgba([0, 0, 0, 255]));
        image.save(dir.join("bg.png")).unwrap();

        let mut assets = AssetProvider::new(&dir);
        assets.preload(["bg.png", "gone.stl", "notes.txt"]);
        assert!(!assets.is_everything_loaded());
        assert_eq!(assets.progress(), (0, 2));

        assert_eq!(assets.pump(1), 1);
        assert!(!assets.is_everything_loaded());

        assert_eq!(assets.pump(8), 1);
        assert!(assets.is_everything_loaded());
        assert_eq!(assets.progress(), (2, 2));
        assert_eq!(assets.failed(), 1);
    }

    #[test]
    fn kinds_follow_extensions() {
        assert_eq!(AssetKind::from_path(Path::new("a/B.PNG")), Some(AssetKind::Texture));
        assert_eq!(AssetKind::from_path(Path::new("a/b.stl")), Some(AssetKind::Model));
        assert_eq!(AssetKind::from_path(Path::new("a/b.ogg")), Some(AssetKind::Audio));
        assert_eq!(AssetKind::from_path(Path::new("a/b")), None);
    }
}
