use std::{path::PathBuf, time::Duration};

use argh::FromArgs;

use crate::{
    detector::{self, SubprocessDetector},
    error::ConfigError,
    gemini::{self, GeminiModel},
};

// defaults for the server
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_PUBLIC_DIR: &str = "public";
pub const DEFAULT_PYTHON: &str = "python";
pub const DEFAULT_DETECTOR_SCRIPT: &str = "detector.py";

/// Environment variable holding the Gemini API key.
pub const API_KEY_VAR: &str = "GEMINI_API_KEY";

#[derive(FromArgs, Debug)]
/// Serves camera challenges: detects what is in a frame and roasts it.
pub struct ServerArgs {
    /// the host to run the server on
    #[argh(option, short = 'h', default = "DEFAULT_HOST.to_string()")]
    pub host: String,

    /// the port to run the server on
    #[argh(option, short = 'p', default = "DEFAULT_PORT")]
    pub port: u16,

    /// directory with the capture client's static files
    #[argh(option, default = "PathBuf::from(DEFAULT_PUBLIC_DIR)")]
    pub public_dir: PathBuf,

    /// interpreter used to run the detector script
    #[argh(option, default = "DEFAULT_PYTHON.to_string()")]
    pub python: String,

    /// path of the detector script
    #[argh(option, default = "PathBuf::from(DEFAULT_DETECTOR_SCRIPT)")]
    pub detector_script: PathBuf,

    /// directory for staged images (defaults to the system temp dir)
    #[argh(option)]
    pub temp_dir: Option<PathBuf>,

    /// seconds before a detection run is killed
    #[argh(option, default = "detector::DEFAULT_TIMEOUT.as_secs()")]
    pub detect_timeout_secs: u64,

    /// gemini model name
    #[argh(option, default = "gemini::DEFAULT_MODEL.to_string()")]
    pub model: String,

    /// seconds before a model call is abandoned
    #[argh(option, default = "gemini::DEFAULT_TIMEOUT.as_secs()")]
    pub model_timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: String,
    pub public_dir: PathBuf,
    pub detector_program: String,
    pub detector_args: Vec<String>,
    pub temp_dir: PathBuf,
    pub detect_timeout: Duration,
    pub model: String,
    pub model_timeout: Duration,
    pub api_key: String,
}

impl ServerConfig {
    /// Combines parsed arguments with the API key from the environment.
    pub fn from_args(args: ServerArgs, api_key: Option<String>) -> Result<Self, ConfigError> {
        let api_key = api_key
            .filter(|key| !key.is_empty())
            .ok_or(ConfigError::MissingApiKey(API_KEY_VAR))?;

        Ok(Self {
            addr: format!("{}:{}", args.host, args.port),
            public_dir: args.public_dir,
            detector_program: args.python,
            detector_args: vec![args.detector_script.to_string_lossy().into_owned()],
            temp_dir: args.temp_dir.unwrap_or_else(std::env::temp_dir),
            detect_timeout: Duration::from_secs(args.detect_timeout_secs),
            model: args.model,
            model_timeout: Duration::from_secs(args.model_timeout_secs),
            api_key,
        })
    }

    pub fn from_env(args: ServerArgs) -> Result<Self, ConfigError> {
        Self::from_args(args, std::env::var(API_KEY_VAR).ok())
    }

    pub fn detector(&self) -> SubprocessDetector {
        SubprocessDetector::new(&self.detector_program, self.detector_args.clone())
            .with_temp_dir(&self.temp_dir)
            .with_timeout(self.detect_timeout)
    }

    pub fn model(&self) -> GeminiModel {
        GeminiModel::with_options(self.api_key.clone(), &self.model, self.model_timeout)
    }
}
