//! Named sound playback.
//!
//! The engine only needs the [`Sounds`] trait: fire-and-forget effects (the
//! click acknowledgment) and looping background beds. [`SoundManager`] plays
//! them through kira; [`SilentSounds`] swallows them for headless runs.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use kira::sound::FromFileError;
use kira::sound::static_sound::{StaticSoundData, StaticSoundHandle};
use kira::{AudioManager, AudioManagerSettings, Decibels, DefaultBackend, Tween};
use rand::Rng;

/// Errors raised while loading or playing sounds.
#[derive(Debug, thiserror::Error)]
pub enum SoundError {
    #[error("failed to start audio backend: {0}")]
    Backend(String),
    #[error("failed to load sound from '{path}': {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: FromFileError,
    },
    #[error("unknown sound '{0}'")]
    Unknown(String),
    #[error("failed to play '{name}': {message}")]
    Play { name: String, message: String },
}

/// Something that can play named sounds.
pub trait Sounds {
    /// Load a sound file and register it under `name`.
    fn load_sound(&mut self, name: &str, path: &Path, looping: bool) -> Result<(), SoundError>;

    /// Play a one-shot (or the sound's own loop, if it was loaded looping).
    fn play_sound(&mut self, name: &str, volume: f32) -> Result<(), SoundError>;

    /// Play a looping background sound starting at a random point in the clip.
    fn play_background(&mut self, name: &str, volume: f32) -> Result<(), SoundError>;

    fn stop_all_background(&mut self);
}

/// Convert a linear amplitude (1.0 = unchanged) to decibels.
pub fn amplitude_to_decibels(volume: f32) -> Decibels {
    if volume <= 0.0 {
        Decibels::SILENCE
    } else {
        Decibels(20.0 * volume.log10())
    }
}

/// Random start offset in seconds within a clip of `duration` seconds.
pub fn random_offset(rng: &mut impl Rng, duration: f64) -> f64 {
    if duration > 0.0 {
        rng.gen_range(0.0..duration)
    } else {
        0.0
    }
}

struct LoadedSound {
    data: StaticSoundData,
    looping: bool,
}

/// kira-backed sound registry.
pub struct SoundManager {
    manager: AudioManager<DefaultBackend>,
    sounds: HashMap<String, LoadedSound>,
    background: Vec<StaticSoundHandle>,
}

impl SoundManager {
    pub fn new() -> Result<Self, SoundError> {
        let manager = AudioManager::<DefaultBackend>::new(AudioManagerSettings::default())
            .map_err(|e| SoundError::Backend(e.to_string()))?;
        Ok(Self {
            manager,
            sounds: HashMap::new(),
            background: Vec::new(),
        })
    }

    /// Register already decoded sound data under `name`.
    pub fn insert_sound(&mut self, name: impl Into<String>, data: StaticSoundData, looping: bool) {
        let name = name.into();
        if self
            .sounds
            .insert(name.clone(), LoadedSound { data, looping })
            .is_some()
        {
            log::warn!("sound '{}' replaced", name);
        }
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.sounds.contains_key(name)
    }

    fn sound(&self, name: &str) -> Result<&LoadedSound, SoundError> {
        self.sounds
            .get(name)
            .ok_or_else(|| SoundError::Unknown(name.to_string()))
    }
}

impl Sounds for SoundManager {
    fn load_sound(&mut self, name: &str, path: &Path, looping: bool) -> Result<(), SoundError> {
        let data = StaticSoundData::from_file(path).map_err(|source| SoundError::Load {
            path: path.to_path_buf(),
            source,
        })?;
        self.insert_sound(name, data, looping);
        Ok(())
    }

    fn play_sound(&mut self, name: &str, volume: f32) -> Result<(), SoundError> {
        let sound = self.sound(name)?;
        let mut data = sound.data.clone().volume(amplitude_to_decibels(volume));
        if sound.looping {
            data = data.loop_region(0.0..);
        }
        self.manager.play(data).map_err(|e| SoundError::Play {
            name: name.to_string(),
            message: format!("{:?}", e),
        })?;
        Ok(())
    }

    fn play_background(&mut self, name: &str, volume: f32) -> Result<(), SoundError> {
        let sound = self.sound(name)?;
        let offset = random_offset(&mut rand::thread_rng(), sound.data.duration().as_secs_f64());
        let data = sound
            .data
            .clone()
            .volume(amplitude_to_decibels(volume))
            .loop_region(0.0..)
            .start_position(offset);
        let handle = self.manager.play(data).map_err(|e| SoundError::Play {
            name: name.to_string(),
            message: format!("{:?}", e),
        })?;
        log::debug!("background '{}' started at {:.2}s", name, offset);
        self.background.push(handle);
        Ok(())
    }

    fn stop_all_background(&mut self) {
        for mut handle in self.background.drain(..) {
            handle.stop(Tween::default());
        }
    }
}

/// Sounds implementation that plays nothing.
#[derive(Debug, Default)]
pub struct SilentSounds;

impl Sounds for SilentSounds {
    fn load_sound(&mut self, _name: &str, _path: &Path, _looping: bool) -> Result<(), SoundError> {
        Ok(())
    }

    fn play_sound(&mut self, _name: &str, _volume: f32) -> Result<(), SoundError> {
        Ok(())
    }

    fn play_background(&mut self, _name: &str, _volume: f32) -> Result<(), SoundError> {
        Ok(())
    }

    fn stop_all_background(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn unit_volume_is_zero_decibels() {
        assert_eq!(amplitude_to_decibels(1.0), Decibels(0.0));
        assert_eq!(amplitude_to_decibels(0.0), Decibels::SILENCE);
        assert!((amplitude_to_decibels(0.1).0 + 20.0).abs() < 1e-4);
    }

    #[test]
    fn offsets_stay_inside_the_clip() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let offset = random_offset(&mut rng, 12.5);
            assert!((0.0..12.5).contains(&offset));
        }
        assert_eq!(random_offset(&mut rng, 0.0), 0.0);
    }
}
