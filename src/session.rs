use std::path::{Path, PathBuf};

use crate::error::ExportError;
use crate::exporter::{convert_with, write_document_with, ExportOptions};

/// Caller-held export state: the selected shapefile, if any, and the
/// options applied to every export started from it.
#[derive(Debug, Clone, Default)]
pub struct ExportSession {
    source: Option<PathBuf>,
    options: ExportOptions,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportSummary {
    pub records: usize,
    pub destination: PathBuf,
}

impl ExportSession {
    pub fn new(options: ExportOptions) -> Self {
        ExportSession {
            source: None,
            options,
        }
    }

    pub fn select_source(&mut self, path: impl Into<PathBuf>) {
        self.source = Some(path.into());
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// The selected shapefile's path with a `.json` extension.
    pub fn default_destination(&self) -> Option<PathBuf> {
        self.source.as_ref().map(|path| path.with_extension("json"))
    }

    pub fn export_to(&self, destination: impl AsRef<Path>) -> Result<ExportSummary, ExportError> {
        let source = self.source.as_ref().ok_or(ExportError::NoSourceSelected)?;
        let destination = destination.as_ref();

        let document = convert_with(source, &self.options)?;
        write_document_with(&document, destination, self.options.pretty)?;
        Ok(ExportSummary {
            records: document.len(),
            destination: destination.to_path_buf(),
        })
    }
}
