use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use thiserror::Error;
use walkdir::WalkDir;

use talescript_core::error::ParseError;
use talescript_core::node::NodeData;
use talescript_core::parser::NodeParser;
use talescript_core::value::VariableStore;

const SCRIPT_EXT: &str = "dlg";

/// Why a node lookup failed. Lookup failures are fatal for the call that
/// made them; the runtime logs and halts rather than guessing.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("node `{0}` not found under the script root")]
    NodeNotFound(String),
    #[error("script {path:?}: {source}")]
    Parse { path: PathBuf, source: ParseError },
    #[error("failed to read script {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Finds nodes in the `.dlg` files under a script root.
///
/// There is no node index and no cache: every lookup walks the files again,
/// in file-name order for determinism, and stops at the first file that
/// contains the node. `var` declarations from every file scanned on the way
/// are applied to the store before the node is returned, so variables a
/// node relies on exist by the time it runs.
pub struct ScriptManager {
    root: PathBuf,
}

impl ScriptManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn find_node(
        &self,
        name: &str,
        vars: &mut VariableStore,
    ) -> Result<NodeData, LoadError> {
        let mut scanned = 0usize;

        for entry in WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !path.is_file() || path.extension().map_or(true, |e| e != SCRIPT_EXT) {
                continue;
            }

            let content = fs::read_to_string(path).map_err(|e| LoadError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();

            let outcome = NodeParser::new(name, &stem)
                .scan(&content)
                .map_err(|e| LoadError::Parse {
                    path: path.to_path_buf(),
                    source: e,
                })?;
            scanned += 1;

            vars.load_all(outcome.vars);

            if let Some(node) = outcome.node {
                debug!(
                    "Found node '{}' in {:?} ({} file(s) scanned)",
                    name, path, scanned
                );
                return Ok(node);
            }
        }

        Err(LoadError::NodeNotFound(name.to_string()))
    }
}
