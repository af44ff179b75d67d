//! Compiler driver
//!
//! [`Compiler`] runs the whole chain: program source to allocated program (through the
//! cache when enabled), catalog source to allocated catalog with the same allocator, then
//! the tree builder. [`Compiler::compile_sources`] works on in-memory text;
//! [`Compiler::compile_files`] reads the sources with `tokio::fs` and attributes errors to
//! the file they came from. [`Compiler::write_outputs`] writes the tree document and both
//! string tables.

use crate::trig::allocation::{Allocator, StringTable};
use crate::trig::ast::{Allocated, Catalog, Program};
use crate::trig::building::{TreeBuilder, TreeNode};
use crate::trig::cache::{CachedProgram, ProgramCache};
use crate::trig::error::{format_source_context, CompileError};
use crate::trig::formats::{FormatError, TreeFormat};
use crate::trig::token::Token;
use crate::trig::transforms::standard::{CATALOG_TO_AST, PROGRAM_LEXING, PROGRAM_TO_AST};
use std::fmt;
use std::path::{Path, PathBuf};

/// Result of one compile run.
#[derive(Debug, Clone, PartialEq)]
pub struct CompileOutput {
    pub tree: TreeNode,
    pub labels: StringTable,
    pub values: StringTable,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompilerOptions {
    /// Cache file extension; `None` disables the cache
    pub cache_extension: Option<String>,
    /// Rows written at the top of the value table, before generated rows
    pub value_preamble: Vec<(String, String)>,
}

#[derive(Debug)]
pub enum PipelineError {
    Io {
        path: PathBuf,
        message: String,
    },
    Compile {
        path: PathBuf,
        source: String,
        error: CompileError,
    },
    Format(FormatError),
}

impl PipelineError {
    fn io(path: &Path, err: std::io::Error) -> Self {
        PipelineError::Io {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }

    fn compile(path: &Path, source: &str, error: CompileError) -> Self {
        PipelineError::Compile {
            path: path.to_path_buf(),
            source: source.to_string(),
            error,
        }
    }

    /// The error message followed by the offending source lines, when the error has an
    /// offset.
    pub fn report(&self) -> String {
        match self {
            PipelineError::Compile { source, error, .. } => match error.offset() {
                Some(offset) => format!("{}\n{}", self, format_source_context(source, offset)),
                None => self.to_string(),
            },
            _ => self.to_string(),
        }
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Io { path, message } => write!(f, "{}: {}", path.display(), message),
            PipelineError::Compile { path, error, .. } => {
                write!(f, "{}: {}", path.display(), error)
            }
            PipelineError::Format(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for PipelineError {}

impl From<FormatError> for PipelineError {
    fn from(err: FormatError) -> Self {
        PipelineError::Format(err)
    }
}

/// Where [`Compiler::write_outputs`] puts the three output files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub directory: PathBuf,
    pub tree: String,
    pub labels: String,
    pub values: String,
}

impl Default for OutputPaths {
    fn default() -> Self {
        OutputPaths {
            directory: PathBuf::from("out"),
            tree: "Triggers".to_string(),
            labels: "TriggerStrings.txt".to_string(),
            values: "GameStrings.txt".to_string(),
        }
    }
}

impl OutputPaths {
    pub fn tree_path(&self) -> PathBuf {
        self.directory.join(&self.tree)
    }

    pub fn labels_path(&self) -> PathBuf {
        self.directory.join(&self.labels)
    }

    pub fn values_path(&self) -> PathBuf {
        self.directory.join(&self.values)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Compiler {
    options: CompilerOptions,
}

impl Compiler {
    pub fn new(options: CompilerOptions) -> Self {
        Compiler { options }
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    /// Compile in-memory sources. The cache is never consulted.
    pub fn compile_sources(
        &self,
        program: &str,
        catalog: &str,
    ) -> Result<CompileOutput, CompileError> {
        let mut allocator = Allocator::new();
        let program = allocator.allocate_program(PROGRAM_TO_AST.run(program.to_string())?);
        let catalog = CATALOG_TO_AST.run(catalog.to_string())?;
        self.assemble(&program, allocator, catalog)
    }

    pub async fn compile_files(
        &self,
        program_path: &Path,
        catalog_path: &Path,
    ) -> Result<CompileOutput, PipelineError> {
        let program_text = read_source(program_path).await?;
        let catalog_text = read_source(catalog_path).await?;

        let (program, allocator) = self
            .load_program(program_path, &program_text)
            .await
            .map_err(|err| PipelineError::compile(program_path, &program_text, err))?;
        let catalog = CATALOG_TO_AST
            .run(catalog_text.clone())
            .map_err(|err| PipelineError::compile(catalog_path, &catalog_text, err))?;
        self.assemble(&program, allocator, catalog)
            .map_err(|err| PipelineError::compile(program_path, &program_text, err))
    }

    /// Tokens of a program source file.
    pub async fn tokenize_file(&self, path: &Path) -> Result<Vec<Token>, PipelineError> {
        let text = read_source(path).await?;
        PROGRAM_LEXING
            .run(text.clone())
            .map(|lexed| lexed.tokens)
            .map_err(|err| PipelineError::compile(path, &text, err))
    }

    /// The allocated tree of a program source file. Always parsed fresh.
    pub async fn allocate_file(&self, path: &Path) -> Result<Allocated<Program>, PipelineError> {
        let text = read_source(path).await?;
        let program = PROGRAM_TO_AST
            .run(text.clone())
            .map_err(|err| PipelineError::compile(path, &text, err))?;
        Ok(Allocator::new().allocate_program(program))
    }

    /// The allocated program and the allocator state right after allocating it, from the
    /// cache when it is enabled and fresh.
    async fn load_program(
        &self,
        path: &Path,
        text: &str,
    ) -> Result<(Allocated<Program>, Allocator), CompileError> {
        let cache = self
            .options
            .cache_extension
            .as_deref()
            .map(|extension| ProgramCache::for_source(path, extension));

        if let Some(cache) = &cache {
            if let Some(cached) = cache.load_fresh().await {
                return Ok(cached.into_parts());
            }
        }

        let mut allocator = Allocator::new();
        let program = allocator.allocate_program(PROGRAM_TO_AST.run(text.to_string())?);
        if let Some(cache) = &cache {
            cache
                .store(&CachedProgram::new(program.clone(), &allocator))
                .await;
        }
        Ok((program, allocator))
    }

    fn assemble(
        &self,
        program: &Allocated<Program>,
        mut allocator: Allocator,
        catalog: Catalog,
    ) -> Result<CompileOutput, CompileError> {
        let catalog = allocator.allocate_catalog(catalog);
        let tree = TreeBuilder::new(program, &catalog).build()?;
        let (_, labels, generated) = allocator.into_parts();

        let mut values: StringTable = self.options.value_preamble.iter().cloned().collect();
        values.extend(&generated);
        Ok(CompileOutput {
            tree,
            labels,
            values,
        })
    }

    pub async fn write_outputs(
        &self,
        output: &CompileOutput,
        paths: &OutputPaths,
        format: &dyn TreeFormat,
    ) -> Result<(), PipelineError> {
        tokio::fs::create_dir_all(&paths.directory)
            .await
            .map_err(|err| PipelineError::io(&paths.directory, err))?;

        let document = format.serialize(&output.tree)?;
        write_file(&paths.tree_path(), document).await?;
        write_file(&paths.labels_path(), output.labels.render()).await?;
        write_file(&paths.values_path(), output.values.render()).await?;

        tracing::debug!(directory = %paths.directory.display(), "wrote outputs");
        Ok(())
    }
}

async fn read_source(path: &Path) -> Result<String, PipelineError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|err| PipelineError::io(path, err))?;
    tracing::info!(path = %path.display(), bytes = text.len(), "loaded source");
    Ok(text)
}

async fn write_file(path: &Path, contents: String) -> Result<(), PipelineError> {
    tokio::fs::write(path, contents)
        .await
        .map_err(|err| PipelineError::io(path, err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trig::testing::{build, samples};

    #[test]
    fn test_compile_sources_matches_stage_by_stage_build() {
        let output = Compiler::default()
            .compile_sources(samples::FULL_PROGRAM, samples::FULL_CATALOG)
            .unwrap();
        let (tree, allocator) = build(samples::FULL_PROGRAM, samples::FULL_CATALOG).unwrap();
        assert_eq!(output.tree, tree);
        assert_eq!(&output.labels, allocator.labels());
        assert_eq!(&output.values, allocator.values());
    }

    #[test]
    fn test_preamble_rows_come_first() {
        let compiler = Compiler::new(CompilerOptions {
            cache_extension: None,
            value_preamble: vec![("DocInfo/Name".to_string(), "Triggers".to_string())],
        });
        let output = compiler
            .compile_sources(samples::FULL_PROGRAM, samples::FULL_CATALOG)
            .unwrap();
        let keys: Vec<&str> = output.values.iter().map(|(key, _)| key).collect();
        assert_eq!(keys[0], "DocInfo/Name");
        assert_eq!(keys.len(), 3);
    }

    #[test]
    fn test_preset_string_tables() {
        let output = Compiler::default()
            .compile_sources(samples::PRESET_PROGRAM, samples::PRESET_CATALOG)
            .unwrap();
        insta::assert_snapshot!(output.labels.render(), @r"
        Preset/Name/10000001=Colors
        PresetValue/Name/10000002=Red
        PresetValue/Name/10000003=Green
        ");
        assert!(output.values.is_empty());
    }

    #[test]
    fn test_report_includes_source_context() {
        let source = "library \"0\" {\n    int x = ;\n}\n";
        let error = Compiler::default().compile_sources(source, "").unwrap_err();
        let report = PipelineError::compile(Path::new("main.trig"), source, error).report();
        assert!(report.starts_with("main.trig: Parse failed at offset"));
        assert!(report.contains(">>   2 |     int x = ;"));
    }
}
