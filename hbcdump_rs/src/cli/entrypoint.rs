//! Session startup: load inputs, then run the section walker or the shell.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use super::config::DumpConfig;
use super::repl::CommandLoop;
use crate::bytecode::sections::SectionWalker;
use crate::bytecode::{BytecodeModule, LoadError};
use crate::disasm::Disassembler;
use crate::profile::{ProfileAnalyzer, ProfileError, ProfileTrace};
use crate::sourcemap::{SourceMap, SourceMapError};

/// Failure before or while running the session; maps to a process exit code.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("fail to open file: {}: {source}", path.display())]
    OpenInput { path: PathBuf, source: io::Error },

    #[error("fail to deserialize bytecode: {0}")]
    Deserialize(#[from] LoadError),

    #[error("fail to open file {}: {source}", path.display())]
    OpenOutput { path: PathBuf, source: io::Error },

    #[error("fail to open file: {}: {source}", path.display())]
    OpenSourceMap { path: PathBuf, source: io::Error },

    #[error("loading source map {}: {source}", path.display())]
    SourceMap {
        path: PathBuf,
        source: SourceMapError,
    },

    #[error("fail to open file: {}: {source}", path.display())]
    OpenProfile { path: PathBuf, source: io::Error },

    #[error("loading profile {}: {source}", path.display())]
    Profile { path: PathBuf, source: ProfileError },

    #[error("{0}")]
    Session(#[source] io::Error),
}

impl StartupError {
    pub fn exit_code(&self) -> i32 {
        match self {
            StartupError::OpenInput { .. } => -1,
            StartupError::Deserialize(_) => 1,
            StartupError::OpenOutput { .. } => -2,
            StartupError::OpenSourceMap { .. }
            | StartupError::SourceMap { .. }
            | StartupError::Profile { .. } => -3,
            StartupError::OpenProfile { .. } => -4,
            // Downstream closed the pipe (e.g. `| head`): not a failure.
            StartupError::Session(err) if err.kind() == io::ErrorKind::BrokenPipe => 0,
            StartupError::Session(_) => 3,
        }
    }
}

fn read_file<E>(path: &Path, wrap: impl FnOnce(PathBuf, io::Error) -> E) -> Result<Vec<u8>, E> {
    fs::read(path).map_err(|source| wrap(path.to_path_buf(), source))
}

/// Run one session described by `config`.
pub fn run(config: &DumpConfig) -> Result<(), StartupError> {
    let bytes = read_file(&config.input, |path, source| StartupError::OpenInput {
        path,
        source,
    })?;
    let module = BytecodeModule::from_bytes(bytes)?;
    info!(
        path = %config.input.display(),
        functions = module.function_count(),
        strings = module.string_count(),
        "loaded bytecode module"
    );

    let mut sink: Box<dyn Write> = match &config.output {
        Some(path) => {
            let file = File::create(path).map_err(|source| StartupError::OpenOutput {
                path: path.clone(),
                source,
            })?;
            Box::new(BufWriter::new(file))
        }
        None => Box::new(io::stdout().lock()),
    };

    let source_map = match &config.source_map {
        Some(path) => {
            let raw = read_file(path, |path, source| StartupError::OpenSourceMap {
                path,
                source,
            })?;
            let map = SourceMap::parse(&raw).map_err(|source| StartupError::SourceMap {
                path: path.clone(),
                source,
            })?;
            info!(sources = map.sources().len(), "loaded source map");
            Some(map)
        }
        None => None,
    };

    if config.show_section_ranges {
        if config.profile_file.is_some() || !config.startup_commands.is_empty() {
            warn!("--show-section-ranges given; profile and commands are ignored");
        }
        SectionWalker::new(&module)
            .print_section_ranges(&mut sink, config.human)
            .and_then(|()| sink.flush())
            .map_err(StartupError::Session)?;
        return Ok(());
    }

    let profile = match &config.profile_file {
        Some(path) => {
            let raw = read_file(path, |path, source| StartupError::OpenProfile {
                path,
                source,
            })?;
            let invalid = |source| StartupError::Profile {
                path: path.clone(),
                source,
            };
            let trace = ProfileTrace::from_slice(&raw).map_err(invalid)?;
            trace.validate(&module).map_err(invalid)?;
            info!(
                blocks = trace.blocks.len(),
                trace = trace.trace.len(),
                "loaded profile"
            );
            Some(trace)
        }
        None => None,
    };

    let mut disassembler = Disassembler::new(&module);
    let analyzer = ProfileAnalyzer::new(&module, profile, source_map);
    let mut shell = CommandLoop::new(&mut disassembler, &analyzer, config.format);
    let mut input = io::stdin().lock();
    let end = shell
        .run(&config.startup_commands, &mut input, &mut sink)
        .and_then(|end| sink.flush().map(|()| end))
        .map_err(StartupError::Session)?;
    debug!(?end, "command loop finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disasm::DisassemblyFormat;
    use crate::testing::{SAMPLE_PROFILE_JSON, sample_module_bytes};

    fn base_config(dir: &Path) -> DumpConfig {
        let input = dir.join("app.hbc");
        fs::write(&input, sample_module_bytes()).unwrap();
        DumpConfig {
            input,
            output: Some(dir.join("out.txt")),
            source_map: None,
            profile_file: None,
            format: DisassemblyFormat::Pretty,
            startup_commands: vec!["quit".into()],
            show_section_ranges: false,
            human: false,
        }
    }

    #[test]
    fn exit_codes_per_failure() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");

        let mut cfg = base_config(dir.path());
        cfg.input = missing.clone();
        assert_eq!(run(&cfg).unwrap_err().exit_code(), -1);

        let cfg = base_config(dir.path());
        fs::write(&cfg.input, b"not bytecode at all, clearly not").unwrap();
        assert_eq!(run(&cfg).unwrap_err().exit_code(), 1);

        let mut cfg = base_config(dir.path());
        cfg.output = Some(missing.join("nested").join("out.txt"));
        assert_eq!(run(&cfg).unwrap_err().exit_code(), -2);

        let mut cfg = base_config(dir.path());
        cfg.source_map = Some(missing.clone());
        assert_eq!(run(&cfg).unwrap_err().exit_code(), -3);

        let mut cfg = base_config(dir.path());
        let bad_map = dir.path().join("bad.map");
        fs::write(&bad_map, "{").unwrap();
        cfg.source_map = Some(bad_map);
        assert_eq!(run(&cfg).unwrap_err().exit_code(), -3);

        let mut cfg = base_config(dir.path());
        cfg.profile_file = Some(missing);
        assert_eq!(run(&cfg).unwrap_err().exit_code(), -4);

        let mut cfg = base_config(dir.path());
        let bad_profile = dir.path().join("bad.json");
        fs::write(&bad_profile, r#"{"blocks":[{"function":9,"offset":0,"count":1}]}"#).unwrap();
        cfg.profile_file = Some(bad_profile);
        assert_eq!(run(&cfg).unwrap_err().exit_code(), -3);
    }

    #[test]
    fn startup_script_writes_to_output_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = base_config(dir.path());
        let profile = dir.path().join("profile.json");
        fs::write(&profile, SAMPLE_PROFILE_JSON).unwrap();
        cfg.profile_file = Some(profile);
        cfg.startup_commands = vec!["fun -used".into(), "quit".into()];

        run(&cfg).unwrap();
        let written = fs::read_to_string(dir.path().join("out.txt")).unwrap();
        assert_eq!(written, "0\n2\n\n");
    }

    #[test]
    fn section_ranges_skip_the_shell() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = base_config(dir.path());
        cfg.show_section_ranges = true;
        cfg.startup_commands = vec!["summary".into()];

        run(&cfg).unwrap();
        let written = fs::read_to_string(dir.path().join("out.txt")).unwrap();
        assert!(written.starts_with("header 0 32\n"));
        assert!(!written.contains("Summary:"));
    }

    #[test]
    fn broken_pipe_is_not_a_failure() {
        let err = StartupError::Session(io::ErrorKind::BrokenPipe.into());
        assert_eq!(err.exit_code(), 0);
        let err = StartupError::Session(io::ErrorKind::Other.into());
        assert_eq!(err.exit_code(), 3);
    }
}
