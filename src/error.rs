use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("cannot read shapefile dataset {}", path.display())]
    DataSource {
        path: PathBuf,
        #[source]
        source: shapefile::Error,
    },
    #[error("feature {id} has no (((...))) ring in its geometry text")]
    GeometryFormat { id: String },
    #[error("cannot write JSON document to {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("no shapefile selected for export")]
    NoSourceSelected,
}

impl ExportError {
    pub(crate) fn data_source(path: impl Into<PathBuf>, source: shapefile::Error) -> Self {
        ExportError::DataSource {
            path: path.into(),
            source,
        }
    }
}
