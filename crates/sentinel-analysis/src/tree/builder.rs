//! Tree builder: one immutable syntax snapshot per file, parsed with a
//! thread_local tree-sitter parser per dialect.

use std::cell::RefCell;
use std::collections::hash_map::Entry;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use rustc_hash::FxHashMap;
use sentinel_core::errors::ParseError;
use tree_sitter::{Node, Parser, Tree};

use super::error_tolerant::count_errors;
use super::query;
use super::semantic::{SemanticContext, SemanticIndex};

/// Grammar a file is parsed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    TypeScript,
    /// TSX grammar, also used for plain JavaScript and JSX.
    Tsx,
}

impl Dialect {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "ts" | "mts" | "cts" => Some(Self::TypeScript),
            "tsx" | "js" | "jsx" | "mjs" | "cjs" => Some(Self::Tsx),
            _ => None,
        }
    }

    fn language(self) -> tree_sitter::Language {
        match self {
            Self::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Self::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TypeScript => write!(f, "typescript"),
            Self::Tsx => write!(f, "tsx"),
        }
    }
}

thread_local! {
    static PARSERS: RefCell<FxHashMap<Dialect, Parser>> = RefCell::new(FxHashMap::default());
}

fn parse_with_dialect(source: &str, path: &Path, dialect: Dialect) -> Result<Tree, ParseError> {
    PARSERS.with(|cell| {
        let mut parsers = cell.borrow_mut();
        let parser = match parsers.entry(dialect) {
            Entry::Occupied(e) => e.into_mut(),
            Entry::Vacant(v) => {
                let mut parser = Parser::new();
                parser
                    .set_language(&dialect.language())
                    .map_err(|e| ParseError::Grammar {
                        message: e.to_string(),
                    })?;
                v.insert(parser)
            }
        };
        parser.parse(source, None).ok_or_else(|| ParseError::NoTree {
            path: path.to_path_buf(),
        })
    })
}

/// Immutable analysis snapshot of one file. Dropped after the guard pass.
pub struct SourceTree {
    path: PathBuf,
    source: String,
    tree: Tree,
    semantic: Arc<SemanticContext>,
    dialect: Dialect,
    content_hash: u64,
}

impl SourceTree {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn bytes(&self) -> &[u8] {
        self.source.as_bytes()
    }

    /// The compilation unit (`program` node).
    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    pub fn semantic(&self) -> &SemanticContext {
        &self.semantic
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn content_hash(&self) -> u64 {
        self.content_hash
    }

    pub fn text(&self, node: Node) -> &str {
        node.utf8_text(self.source.as_bytes()).unwrap_or("")
    }

    pub fn position(&self, node: Node) -> (u32, u32) {
        query::position(node)
    }
}

impl fmt::Debug for SourceTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceTree")
            .field("path", &self.path)
            .field("dialect", &self.dialect)
            .field("content_hash", &self.content_hash)
            .finish_non_exhaustive()
    }
}

/// Builds `SourceTree`s and owns the shared semantic index.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    index: SemanticIndex,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn index(&self) -> &SemanticIndex {
        &self.index
    }

    /// Read and parse `path`.
    pub fn build(&self, path: &Path) -> Result<SourceTree, ParseError> {
        let dialect = Dialect::from_path(path).ok_or_else(|| ParseError::UnsupportedExtension {
            path: path.to_path_buf(),
        })?;
        let source = std::fs::read_to_string(path).map_err(|source| ParseError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.parse(path, dialect, source)
    }

    /// Parse in-memory text as if it were the content of `path`.
    pub fn build_from_source(
        &self,
        path: &Path,
        source: impl Into<String>,
    ) -> Result<SourceTree, ParseError> {
        let dialect = Dialect::from_path(path).ok_or_else(|| ParseError::UnsupportedExtension {
            path: path.to_path_buf(),
        })?;
        self.parse(path, dialect, source.into())
    }

    /// Drop the semantic entry of a deleted file.
    pub fn evict(&self, path: &Path) -> bool {
        self.index.remove(path)
    }

    fn parse(&self, path: &Path, dialect: Dialect, source: String) -> Result<SourceTree, ParseError> {
        let start = Instant::now();
        let tree = parse_with_dialect(&source, path, dialect)?;

        let root = tree.root_node();
        if root.has_error() {
            let (count, first) = count_errors(root);
            let (line, column) = first.unwrap_or_else(|| query::position(root));
            return Err(ParseError::Syntax {
                path: path.to_path_buf(),
                line,
                column,
                count: count.max(1),
            });
        }

        let content_hash = xxhash_rust::xxh3::xxh3_64(source.as_bytes());
        let semantic = self
            .index
            .resolve(path, content_hash, || SemanticContext::build(root, source.as_bytes()));

        tracing::debug!(
            file = %path.display(),
            %dialect,
            parse_time_us = start.elapsed().as_micros() as u64,
            "parsed"
        );

        Ok(SourceTree {
            path: path.to_path_buf(),
            source,
            tree,
            semantic,
            dialect,
            content_hash,
        })
    }
}
