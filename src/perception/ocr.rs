// Text extraction through the tesseract command-line engine.
use std::io::Cursor;
use std::process::Stdio;

use async_trait::async_trait;
use image::{ImageFormat, RgbImage};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::config::PerceptionConfig;
use crate::errors::{DeskPilotError, DeskPilotResult};
use crate::perception::traits::TextExtractor;

/// Pipes a PNG-encoded crop through `tesseract stdin stdout` and returns
/// whatever the engine prints.
pub struct TesseractExtractor {
    command: String,
    language: String,
    psm: u32,
}

impl TesseractExtractor {
    pub fn new(command: impl Into<String>, language: impl Into<String>, psm: u32) -> Self {
        Self {
            command: command.into(),
            language: language.into(),
            psm,
        }
    }

    pub fn from_config(cfg: &PerceptionConfig) -> Self {
        Self::new(&cfg.ocr_command, &cfg.ocr_language, cfg.ocr_psm)
    }

    fn args(&self) -> Vec<String> {
        vec![
            "stdin".to_string(),
            "stdout".to_string(),
            "-l".to_string(),
            self.language.clone(),
            "--psm".to_string(),
            self.psm.to_string(),
        ]
    }
}

fn encode_png(image: &RgbImage) -> DeskPilotResult<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    image
        .write_to(&mut buf, ImageFormat::Png)
        .map_err(|e| DeskPilotError::TextExtraction(format!("PNG encode failed: {e}")))?;
    Ok(buf.into_inner())
}

#[async_trait]
impl TextExtractor for TesseractExtractor {
    async fn extract_text(&self, image: &RgbImage) -> DeskPilotResult<String> {
        if image.width() == 0 || image.height() == 0 {
            return Ok(String::new());
        }
        let png = encode_png(image)?;

        let mut child = Command::new(&self.command)
            .args(self.args())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                DeskPilotError::TextExtraction(format!("failed to start '{}': {e}", self.command))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(&png).await?;
            // Dropping stdin closes the pipe so the engine sees EOF.
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DeskPilotError::TextExtraction(format!(
                "'{}' exited with {}: {}",
                self.command,
                output.status,
                stderr.trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
