//! Source loading for Tern
//!
//! Reads and parses source files into one [`Forest`], assigning each file
//! its id.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use crate::frontend::ast::Forest;
use crate::frontend::lexer::Lexer;
use crate::frontend::parser::Parser;
use crate::utils::{Error, FileId, Result};

/// Parse `source` and append it to the forest
pub fn parse_source(forest: &mut Forest, path: &str, source: &str) -> Result<FileId> {
    let file_id = forest.next_file_id();
    let lexer = Lexer::new(source, file_id);
    let mut parser = Parser::new(lexer, file_id);
    let file = parser.parse_file(path)?;
    debug!("parsed {} (package {})", path, file.package);
    Ok(forest.push(file))
}

/// Loads each source file once
#[derive(Debug, Default)]
pub struct SourceLoader {
    /// Loaded files by path
    loaded: HashMap<PathBuf, FileId>,
    /// Source text by file id, kept for diagnostics
    sources: HashMap<FileId, String>,
}

impl SourceLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read and parse a file; loading the same path again returns the first id
    pub fn load_file(&mut self, forest: &mut Forest, path: &Path) -> Result<FileId> {
        if let Some(&id) = self.loaded.get(path) {
            return Ok(id);
        }
        let source = fs::read_to_string(path)
            .map_err(|e| Error::Io(format!("Failed to read {}: {}", path.display(), e)))?;

        // kept even when parsing fails so the diagnostic can quote it
        let id = forest.next_file_id();
        let text = self.sources.entry(id).or_default();
        *text = source;
        let parsed = parse_source(forest, &path.display().to_string(), text)?;
        self.loaded.insert(path.to_path_buf(), parsed);
        Ok(parsed)
    }

    /// Source text of a loaded file
    pub fn source(&self, id: FileId) -> Option<&str> {
        self.sources.get(&id).map(String::as_str)
    }

    pub fn is_loaded(&self, path: &Path) -> bool {
        self.loaded.contains_key(path)
    }
}
