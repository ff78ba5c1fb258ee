// Core encoding engine - independent of the presentation layer

pub mod command;
pub mod cropdetect;
pub mod error;
pub mod options;
pub mod probe;
pub mod progress;
pub mod supervisor;

pub use command::{build, format_command};
pub use error::{CropDetectError, EncodeFailure, LaunchError, MediaReadError, ValidationError};
pub use options::{OptionModel, Preset, RateControl, validate};
pub use probe::{MediaInfo, inspect};
pub use progress::StatsParser;
pub use supervisor::{EncodeJob, JobState, LogStream, ProcessSupervisor};
