//! Recognition through the `tesseract` command-line engine.
//!
//! The preprocessed image is piped as PNG on stdin and the text read back
//! from stdout, so no temporary files and no native bindings are involved.

use image::{ImageFormat, RgbaImage};
use std::io::{Cursor, Write};
use std::process::{Command, Stdio};

use super::{preprocess, RecognitionAdapter, RecognitionError};
use crate::settings::RunConfig;

#[derive(Debug, Clone)]
pub struct TesseractCli {
    binary: String,
    args: Vec<String>,
    lang: Option<String>,
}

impl TesseractCli {
    pub fn new(binary: impl Into<String>, args: Vec<String>, lang: Option<String>) -> Self {
        Self {
            binary: binary.into(),
            args,
            lang,
        }
    }

    pub fn from_config(config: &RunConfig) -> Self {
        Self::new(
            config.tesseract_path.clone(),
            config.engine_args(),
            config.tesseract_lang.clone(),
        )
    }

    /// Check the engine once so a missing install shows up at startup
    /// rather than as an empty result on every capture.
    pub fn warm_up(&self) {
        match Command::new(&self.binary).arg("--version").output() {
            Ok(output) if output.status.success() => {
                let banner = String::from_utf8_lossy(&output.stdout);
                let first_line = banner.lines().next().unwrap_or("").trim().to_string();
                log::info!("[OCR] Using {}", first_line);
            }
            Ok(output) => {
                log::warn!("[OCR] `{} --version` exited with {}", self.binary, output.status)
            }
            Err(e) => log::warn!("[OCR] Recognition engine `{}` not found: {}", self.binary, e),
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("stdin").arg("stdout");
        if let Some(lang) = &self.lang {
            cmd.arg("-l").arg(lang);
        }
        cmd.args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }
}

impl RecognitionAdapter for TesseractCli {
    fn recognize(&self, image: &RgbaImage) -> Result<String, RecognitionError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(RecognitionError::EmptyImage);
        }

        let processed = preprocess(image);
        let mut png_bytes: Vec<u8> = Vec::new();
        processed
            .write_to(&mut Cursor::new(&mut png_bytes), ImageFormat::Png)
            .map_err(|e| RecognitionError::Encoding(e.to_string()))?;

        let mut child = self
            .command()
            .spawn()
            .map_err(|e| RecognitionError::EngineUnavailable(format!("{}: {}", self.binary, e)))?;

        // The engine reads the whole image before writing anything, so
        // writing stdin to completion first can't deadlock.
        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(&png_bytes)
                .map_err(|e| {
                    RecognitionError::EngineUnavailable(format!("stdin write failed: {}", e))
                })?;
        }

        let output = child
            .wait_with_output()
            .map_err(|e| RecognitionError::EngineUnavailable(e.to_string()))?;

        if !output.status.success() {
            return Err(RecognitionError::EngineFailed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}
