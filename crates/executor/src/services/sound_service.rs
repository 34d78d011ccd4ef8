use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use async_trait::async_trait;
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

const SOUND_EXTENSIONS: [&str; 4] = ["mp3", "wav", "flac", "ogg"];

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SoundPlayer: Send + Sync {
    /// Plays `sound`, or the default sound when it is `None` or missing.
    async fn play(&self, sound: Option<PathBuf>) -> anyhow::Result<()>;
}

pub struct MpvPlayer {
    default_sound: PathBuf,
}

impl MpvPlayer {
    pub fn new(default_sound: PathBuf) -> Self {
        Self { default_sound }
    }

    fn resolve(&self, sound: Option<PathBuf>) -> anyhow::Result<PathBuf> {
        if let Some(path) = sound {
            if path.is_file() {
                return Ok(path);
            }
            warn!(
                "Alert sound {} not found, falling back to default",
                path.display()
            );
        }

        if !self.default_sound.is_file() {
            bail!(
                "Default alert sound {} not found",
                self.default_sound.display()
            );
        }
        Ok(self.default_sound.clone())
    }
}

#[async_trait]
impl SoundPlayer for MpvPlayer {
    async fn play(&self, sound: Option<PathBuf>) -> anyhow::Result<()> {
        let path = self.resolve(sound)?;
        debug!("Playing {}", path.display());

        let status = Command::new("mpv")
            .args(["--no-video", "--really-quiet"])
            .arg(&path)
            .status()
            .await
            .context("Failed to run mpv")?;

        if !status.success() {
            bail!("mpv exited with {} for {}", status, path.display());
        }
        Ok(())
    }
}

/// Fire-and-forget playback. Errors end at the task boundary.
pub fn spawn_playback(player: Arc<dyn SoundPlayer>, sound: Option<PathBuf>) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = player.play(sound).await {
            warn!("Error playing sound: {:#}", e);
        }
    })
}

/// Audio files directly inside `dir`, sorted by name.
pub fn list_sound_files(dir: &Path) -> Vec<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Cannot read sound folder {}: {}", dir.display(), e);
            return Vec::new();
        }
    };

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && is_sound_file(path))
        .collect();
    files.sort();
    files
}

fn is_sound_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| SOUND_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("sounds_{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn lists_only_audio_files_sorted() {
        let dir = temp_dir();
        for name in ["b.WAV", "a.mp3", "notes.txt", "c.ogg"] {
            fs::write(dir.join(name), b"").unwrap();
        }
        fs::create_dir(dir.join("d.mp3")).unwrap();

        let names: Vec<String> = list_sound_files(&dir)
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.mp3", "b.WAV", "c.ogg"]);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_folder_lists_nothing() {
        assert!(list_sound_files(Path::new("/definitely/not/here")).is_empty());
    }

    #[test]
    fn missing_custom_sound_falls_back_to_default() {
        let dir = temp_dir();
        let default_sound = dir.join("alertcoin.mp3");
        fs::write(&default_sound, b"").unwrap();
        let player = MpvPlayer::new(default_sound.clone());

        let resolved = player.resolve(Some(dir.join("gone.mp3"))).unwrap();
        assert_eq!(resolved, default_sound);
        assert_eq!(player.resolve(None).unwrap(), default_sound);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_default_sound_is_an_error() {
        let player = MpvPlayer::new(PathBuf::from("/definitely/not/here.mp3"));
        assert!(player.resolve(None).is_err());
    }

    #[tokio::test]
    async fn playback_failure_stays_inside_the_task() {
        let mut player = MockSoundPlayer::new();
        player
            .expect_play()
            .times(1)
            .returning(|_| Err(anyhow::anyhow!("no audio device")));

        let handle = spawn_playback(Arc::new(player), None);
        assert!(handle.await.is_ok());
    }
}
