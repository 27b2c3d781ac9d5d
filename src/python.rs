//! Python bindings, built with `--features python`

use crate::batch::convert_directory as run_directory;
use crate::config::ConverterConfig;
use crate::convert::convert_kmz as run_single;
use crate::types::ConversionOutcome;
use pyo3::prelude::*;
use pyo3::types::PyDict;
use std::path::Path;

fn runtime_error(e: impl std::fmt::Display) -> PyErr {
    PyErr::new::<pyo3::exceptions::PyRuntimeError, _>(format!("{}", e))
}

/// Python module definition
#[pymodule]
fn _core(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(convert_kmz, m)?)?;
    m.add_function(wrap_pyfunction!(convert_directory, m)?)?;
    Ok(())
}

/// Convert one KMZ; returns "converted" or "skipped", raises RuntimeError on failure
#[pyfunction]
fn convert_kmz(kmz_path: String, output_dir: String) -> PyResult<String> {
    let archive = Path::new(&kmz_path);
    let input_dir = archive.parent().unwrap_or_else(|| Path::new("."));
    let config = ConverterConfig::new(input_dir).with_output_dir(&output_dir);

    match run_single(archive, &config).map_err(runtime_error)? {
        ConversionOutcome::Converted(_) => Ok("converted".to_string()),
        ConversionOutcome::Skipped(_) => Ok("skipped".to_string()),
    }
}

/// Convert every KMZ in a directory; returns a dict of successful/skipped/failed names
#[pyfunction]
#[pyo3(signature = (input_dir, output_dir=None, jobs=1))]
fn convert_directory(
    py: Python<'_>,
    input_dir: String,
    output_dir: Option<String>,
    jobs: usize,
) -> PyResult<PyObject> {
    let mut config = ConverterConfig::new(&input_dir);
    if let Some(dir) = output_dir {
        config = config.with_output_dir(dir);
    }
    config.jobs = jobs;

    let result = py.allow_threads(|| run_directory(config)).map_err(runtime_error)?;

    let dict = PyDict::new(py);
    dict.set_item("successful", result.successful)?;
    dict.set_item("skipped", result.skipped)?;
    dict.set_item("failed", result.failed)?;
    dict.set_item("cancelled", result.cancelled)?;
    Ok(dict.into())
}
