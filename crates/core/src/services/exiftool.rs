use crate::deadline::with_deadline;
use crate::error::IngestError;
use crate::traits::MetadataReader;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

pub const DEFAULT_EXIFTOOL_TIMEOUT: Duration = Duration::from_secs(30);

pub struct ExifToolReader {
    program: OsString,
    leading_args: Vec<OsString>,
    timeout: Duration,
}

impl ExifToolReader {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
            timeout: DEFAULT_EXIFTOOL_TIMEOUT,
        }
    }

    pub fn from_command_line(command: &str) -> Option<Self> {
        let mut parts = command.split_whitespace();
        let program = parts.next()?;
        Some(Self::new(program).with_leading_args(parts))
    }

    pub fn with_leading_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.leading_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl MetadataReader for ExifToolReader {
    async fn read_metadata(&self, path: &Path) -> Result<Map<String, Value>, IngestError> {
        with_deadline("exiftool", self.timeout, async {
            let output = Command::new(&self.program)
                .args(&self.leading_args)
                .arg("-json")
                .arg(path)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::null())
                .kill_on_drop(true)
                .output()
                .await?;

            if !output.status.success() {
                return Err(IngestError::Subprocess(format!(
                    "{} exited with {}",
                    self.program.to_string_lossy(),
                    output.status
                )));
            }

            parse_metadata(&output.stdout)
        })
        .await
    }
}

pub fn parse_metadata(stdout: &[u8]) -> Result<Map<String, Value>, IngestError> {
    let objects: Vec<Map<String, Value>> = serde_json::from_slice(stdout)
        .map_err(|error| IngestError::InvalidMetadata(error.to_string()))?;

    objects
        .into_iter()
        .next()
        .ok_or_else(|| IngestError::InvalidMetadata("metadata array was empty".to_string()))
}
