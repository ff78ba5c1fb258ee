//! Session context: the single current media file and the single active
//! encode job, passed explicitly instead of living in globals.

use std::path::Path;

use anyhow::Context;

use crate::config::Config;
use crate::engine::cropdetect;
use crate::engine::error::{MediaReadError, ValidationError};
use crate::engine::supervisor::{EncodeJob, JobState, ProcessSupervisor};
use crate::engine::{MediaInfo, OptionModel, build, validate};

/// One interactive session. At most one job is Running at a time; the
/// previous job handle is kept until replaced so its outcome stays
/// inspectable.
pub struct Session {
    config: Config,
    supervisor: ProcessSupervisor,
    current_media: Option<MediaInfo>,
    active_job: Option<EncodeJob>,
}

impl Session {
    pub fn new(config: Config) -> Self {
        let supervisor = ProcessSupervisor::new(config.encoder.cancel_grace());
        Self {
            config,
            supervisor,
            current_media: None,
            active_job: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn current_media(&self) -> Option<&MediaInfo> {
        self.current_media.as_ref()
    }

    pub fn active_job(&self) -> Option<&EncodeJob> {
        self.active_job.as_ref()
    }

    /// Probe a newly selected file. On failure the previous MediaInfo is
    /// left unchanged so the display keeps showing the last good file.
    pub fn select_file(&mut self, path: &Path) -> Result<&MediaInfo, MediaReadError> {
        let info = crate::engine::inspect(&self.config.encoder.ffprobe, path)?;
        Ok(&*self.current_media.insert(info))
    }

    /// Detect black bars on the currently selected file and return the
    /// crop expression the cropdetect filter reported most often.
    pub fn detect_crop(&self) -> anyhow::Result<String> {
        let media = self
            .current_media
            .as_ref()
            .context("no media file selected")?;
        let crop = cropdetect::detect(
            &self.supervisor,
            &self.config.encoder.binary,
            &media.path,
            media.duration_seconds,
        )?;
        Ok(crop)
    }

    /// Compile the model into a command without touching the filesystem.
    pub fn build_command(&self, model: &OptionModel) -> Vec<String> {
        build(model, &self.config.encoder.binary)
    }

    /// Validate, compile and launch one encode. Refused while another
    /// job is Running; the form stays disabled until it finishes.
    pub fn start_encode(&mut self, model: &OptionModel) -> anyhow::Result<EncodeJob> {
        if let Some(job) = &self.active_job {
            if job.state() == JobState::Running {
                anyhow::bail!("an encode is already running; cancel it or wait");
            }
        }

        validate(model).map_err(|e: ValidationError| anyhow::anyhow!(e))?;
        let command = self.build_command(model);
        let job = self.supervisor.start(command)?;
        self.active_job = Some(job.clone());
        Ok(job)
    }

    /// Cancel the active job, if any. Idempotent.
    pub fn cancel_active(&self) {
        if let Some(job) = &self.active_job {
            self.supervisor.cancel(job);
        }
    }

    pub fn supervisor(&self) -> &ProcessSupervisor {
        &self.supervisor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_probe_failure_keeps_previous_media() {
        let mut session = Session::new(Config::default());
        assert!(session.current_media().is_none());

        let err = session.select_file(Path::new("/nonexistent/a.mp4"));
        assert!(err.is_err());
        assert!(session.current_media().is_none());
    }

    #[test]
    fn test_start_encode_rejects_invalid_model() {
        let mut session = Session::new(Config::default());
        let model = OptionModel::new(
            PathBuf::from("/nonexistent/in.mp4"),
            PathBuf::from("/tmp/out.mkv"),
        );
        assert!(session.start_encode(&model).is_err());
        assert!(session.active_job().is_none());
    }
}
