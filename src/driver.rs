//! File discovery, unit ordering and output naming around the translator.

use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::bootstrap::{bootstrap, ENTRY_FUNCTION};
use crate::error::Error;
use crate::labels::LabelAllocator;
use crate::translator::Translator;

const SOURCE_EXTENSION: &str = "vm";
const OUTPUT_EXTENSION: &str = "asm";

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("{unit}: {source}")]
    Translate {
        unit: String,
        #[source]
        source: Error,
    },
    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("no .vm files found in {}", path.display())]
    NoSources { path: PathBuf },
    #[error("{} is not a .vm file or a directory", path.display())]
    InvalidPath { path: PathBuf },
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> DriverError + '_ {
    move |source| DriverError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BootstrapMode {
    /// Bootstrap directories (whole programs) but not single files.
    #[default]
    Auto,
    Always,
    Never,
}

impl BootstrapMode {
    fn enabled(self, whole_program: bool) -> bool {
        match self {
            BootstrapMode::Auto => whole_program,
            BootstrapMode::Always => true,
            BootstrapMode::Never => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub bootstrap: BootstrapMode,
    pub entry: String,
    pub annotate: bool,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            bootstrap: BootstrapMode::default(),
            entry: ENTRY_FUNCTION.to_string(),
            annotate: true,
        }
    }
}

/// One translation unit: its static base name and VM source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    pub name: String,
    pub source: String,
}

/// Units discovered from an input path, in translation order.
#[derive(Debug)]
pub struct Program {
    pub units: Vec<Unit>,
    pub output: PathBuf,
    /// Whether the input was a directory.
    pub whole_program: bool,
}

fn is_source(path: &Path) -> bool {
    path.is_file() && path.extension() == Some(OsStr::new(SOURCE_EXTENSION))
}

fn read_unit(path: &Path) -> Result<Unit, DriverError> {
    let name = path
        .file_stem()
        .and_then(OsStr::to_str)
        .ok_or_else(|| DriverError::InvalidPath {
            path: path.to_path_buf(),
        })?;
    let source = fs::read_to_string(path).map_err(io_error(path))?;
    Ok(Unit {
        name: name.to_string(),
        source,
    })
}

/// Collects the units behind `input`: the file itself, or every `.vm` file
/// directly inside a directory, ordered by file name.
pub fn load(input: &Path) -> Result<Program, DriverError> {
    if is_source(input) {
        return Ok(Program {
            units: vec![read_unit(input)?],
            output: input.with_extension(OUTPUT_EXTENSION),
            whole_program: false,
        });
    }
    if !input.is_dir() {
        return Err(DriverError::InvalidPath {
            path: input.to_path_buf(),
        });
    }

    let dir = fs::canonicalize(input).map_err(io_error(input))?;
    let mut paths = Vec::new();
    for entry in fs::read_dir(&dir).map_err(io_error(&dir))? {
        let path = entry.map_err(io_error(&dir))?.path();
        if is_source(&path) {
            paths.push(path);
        }
    }
    if paths.is_empty() {
        return Err(DriverError::NoSources { path: dir });
    }
    paths.sort();

    let units = paths
        .iter()
        .map(|path| read_unit(path))
        .collect::<Result<Vec<_>, _>>()?;
    let dir_name = dir
        .file_name()
        .and_then(OsStr::to_str)
        .ok_or_else(|| DriverError::InvalidPath { path: dir.clone() })?;
    let output = dir.join(format!("{}.{}", dir_name, OUTPUT_EXTENSION));

    Ok(Program {
        units,
        output,
        whole_program: true,
    })
}

/// Translates `units` in order into one assembly listing, optionally
/// preceded by the bootstrap. All units share one label allocator.
pub fn translate_units(
    units: &[Unit],
    with_bootstrap: bool,
    options: &Options,
) -> Result<String, DriverError> {
    let labels = LabelAllocator::new();
    let mut instructions = Vec::new();

    if with_bootstrap {
        let asm = bootstrap(&options.entry, &labels).map_err(|source| DriverError::Translate {
            unit: "bootstrap".to_string(),
            source,
        })?;
        instructions.extend(asm);
    }

    for unit in units {
        let translated = Translator::new(&unit.name, labels.clone())
            .with_annotations(options.annotate)
            .translate_source(&unit.source)
            .map_err(|source| DriverError::Translate {
                unit: unit.name.clone(),
                source,
            })?;
        info!(unit = %unit.name, instructions = translated.len(), "translated unit");
        instructions.extend(translated);
    }

    let mut asm = instructions.join("\n");
    asm.push('\n');
    Ok(asm)
}

/// Translates `input` and writes the result, returning the output path.
pub fn run(input: &Path, output: Option<&Path>, options: &Options) -> Result<PathBuf, DriverError> {
    let program = load(input)?;
    let with_bootstrap = options.bootstrap.enabled(program.whole_program);
    let asm = translate_units(&program.units, with_bootstrap, options)?;

    let output = output.map(Path::to_path_buf).unwrap_or(program.output);
    fs::write(&output, asm).map_err(io_error(&output))?;
    info!(output = %output.display(), units = program.units.len(), "wrote assembly");
    Ok(output)
}
