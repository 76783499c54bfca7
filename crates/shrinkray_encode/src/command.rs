//! Encoder backed by external optimizer programs.

use std::collections::HashMap;
use std::io::Write;
use std::process::{Command, Stdio};

use shrinkray_common::ImageFormat;
use shrinkray_config::EncodersConfig;

use crate::error::EncodeError;
use crate::Encoder;

/// Runs one external program per output format.
///
/// The source bytes are written to the program's stdin and the encoded image
/// is read from its stdout. A non-zero exit status, or an empty stdout, is an
/// error.
#[derive(Debug, Clone, Default)]
pub struct CommandEncoder {
    commands: HashMap<ImageFormat, Vec<String>>,
}

impl CommandEncoder {
    /// Creates an encoder with no commands configured.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an encoder from the `[encoders]` configuration section.
    pub fn from_config(config: &EncodersConfig) -> Self {
        let mut encoder = Self::new();
        for format in [
            ImageFormat::Jpeg,
            ImageFormat::Png,
            ImageFormat::Svg,
            ImageFormat::WebP,
        ] {
            if let Some(argv) = config.command(format) {
                encoder = encoder.with_command(format, argv.to_vec());
            }
        }
        encoder
    }

    /// Sets the command line used to produce `format`.
    pub fn with_command(mut self, format: ImageFormat, argv: Vec<String>) -> Self {
        self.commands.insert(format, argv);
        self
    }
}

impl Encoder for CommandEncoder {
    fn encode(&self, source: &[u8], target: ImageFormat) -> Result<Vec<u8>, EncodeError> {
        let (program, args) = self
            .commands
            .get(&target)
            .and_then(|argv| argv.split_first())
            .ok_or(EncodeError::Unconfigured { format: target })?;

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| EncodeError::Spawn {
                program: program.clone(),
                format: target,
                source: e,
            })?;
        let mut stdin = child.stdin.take();

        // stdin is fed from a second thread so a program that writes
        // before it finishes reading cannot deadlock against us.
        let (output, written) = std::thread::scope(|scope| {
            let writer = scope.spawn(move || match stdin.as_mut() {
                Some(pipe) => pipe.write_all(source),
                None => Ok(()),
            });
            let output = child.wait_with_output();
            (output, writer.join())
        });

        let output = output.map_err(|e| EncodeError::Io {
            program: program.clone(),
            source: e,
        })?;
        if !output.status.success() {
            return Err(EncodeError::Failed {
                program: program.clone(),
                format: target,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        if output.stdout.is_empty() {
            return Err(EncodeError::EmptyOutput {
                program: program.clone(),
                format: target,
            });
        }
        match written {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                return Err(EncodeError::Io {
                    program: program.clone(),
                    source: e,
                })
            }
            Err(_) => {
                return Err(EncodeError::Io {
                    program: program.clone(),
                    source: std::io::Error::other("stdin writer panicked"),
                })
            }
        }

        tracing::debug!(
            program = %program,
            format = %target,
            input_bytes = source.len(),
            output_bytes = output.stdout.len(),
            "encoded"
        );
        Ok(output.stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> Vec<String> {
        vec!["sh".to_string(), "-c".to_string(), script.to_string()]
    }

    #[test]
    fn unconfigured_format_errors() {
        let enc = CommandEncoder::new();
        let err = enc.encode(b"x", ImageFormat::Jpeg).unwrap_err();
        assert!(matches!(err, EncodeError::Unconfigured { format: ImageFormat::Jpeg }));
    }

    #[test]
    fn empty_argv_is_unconfigured() {
        let enc = CommandEncoder::new().with_command(ImageFormat::Png, vec![]);
        assert!(matches!(
            enc.encode(b"x", ImageFormat::Png),
            Err(EncodeError::Unconfigured { .. })
        ));
    }

    #[test]
    fn missing_program_is_spawn_error() {
        let enc = CommandEncoder::new().with_command(
            ImageFormat::Svg,
            vec!["shrinkray-no-such-encoder-binary".to_string()],
        );
        assert!(matches!(
            enc.encode(b"<svg/>", ImageFormat::Svg),
            Err(EncodeError::Spawn { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn pipes_bytes_through_program() {
        let enc = CommandEncoder::new().with_command(ImageFormat::WebP, vec!["cat".to_string()]);
        let input: Vec<u8> = (0..=255u8).cycle().take(1 << 20).collect();
        let out = enc.encode(&input, ImageFormat::WebP).unwrap();
        assert_eq!(out, input);
    }

    #[cfg(unix)]
    #[test]
    fn arguments_are_passed() {
        let enc = CommandEncoder::new().with_command(
            ImageFormat::Jpeg,
            vec![
                "sh".to_string(),
                "-c".to_string(),
                "cat >/dev/null; printf \"q=$1\"".to_string(),
                "sh".to_string(),
                "80".to_string(),
            ],
        );
        assert_eq!(enc.encode(b"jpeg", ImageFormat::Jpeg).unwrap(), b"q=80");
    }

    #[cfg(unix)]
    #[test]
    fn nonzero_exit_reports_stderr() {
        let enc = CommandEncoder::new()
            .with_command(ImageFormat::Png, sh("cat >/dev/null; echo 'bad png' >&2; exit 3"));
        match enc.encode(b"png", ImageFormat::Png) {
            Err(EncodeError::Failed { stderr, format, .. }) => {
                assert_eq!(stderr, "bad png");
                assert_eq!(format, ImageFormat::Png);
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn empty_stdout_is_an_error() {
        let enc = CommandEncoder::new().with_command(ImageFormat::Svg, vec!["true".to_string()]);
        assert!(matches!(
            enc.encode(b"<svg/>", ImageFormat::Svg),
            Err(EncodeError::EmptyOutput { .. })
        ));
    }

    #[test]
    fn from_config_registers_defaults() {
        let enc = CommandEncoder::from_config(&EncodersConfig::default());
        assert_eq!(enc.commands[&ImageFormat::Jpeg][0], "cjpeg");
        assert_eq!(enc.commands[&ImageFormat::WebP][0], "cwebp");
        assert!(!enc.commands.contains_key(&ImageFormat::Gif));
    }
}
