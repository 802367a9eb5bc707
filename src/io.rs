//! Graph files in the JSON exchange format.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::Result;
use crate::graph::Graph;

pub fn load_graph(path: impl AsRef<Path>) -> Result<Graph> {
    let graph: Graph = read_json(path.as_ref())?;
    debug!(
        path = %path.as_ref().display(),
        vertices = graph.vertex_count(),
        edges = graph.edge_count(),
        "loaded graph"
    );
    Ok(graph)
}

pub fn save_graph(path: impl AsRef<Path>, graph: &Graph) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path.as_ref())?);
    serde_json::to_writer(&mut writer, graph)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Reads any JSON request or document from disk.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("network.json");
        let g = Graph::from_edges(5, true, &[(0, 1), (1, 2), (4, 3)]).unwrap();
        save_graph(&path, &g).unwrap();
        assert_eq!(load_graph(&path).unwrap(), g);
    }

    #[test]
    fn test_load_rejects_invalid_edges() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, r#"{"vertices":2,"directed":false,"edges":[[0,5]]}"#).unwrap();
        assert!(matches!(load_graph(&path), Err(Error::Json(_))));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_graph(dir.path().join("absent.json")),
            Err(Error::Io(_))
        ));
    }
}
