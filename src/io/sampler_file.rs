//! Persist a finished sampler state (bincode) and load it back.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use log::info;

use crate::error::AppError;
use crate::fit::SamplerState;

/// File-name suffix of a saved (bincode) sampler state.
pub const SAMPLER_SUFFIX: &str = "_sampler.bin";

/// `<output_dir>/<label>_sampler.bin`.
pub fn sampler_path(output_dir: &Path, label: &str) -> PathBuf {
    output_dir.join(format!("{label}{SAMPLER_SUFFIX}"))
}

/// The run label encoded in a sampler file name, if it follows
/// [`sampler_path`].
pub fn label_from_sampler_path(path: &Path) -> Option<&str> {
    path.file_name()?
        .to_str()?
        .strip_suffix(SAMPLER_SUFFIX)
        .filter(|label| !label.is_empty())
}

/// Detach the worker pool and write the state to `path`.
pub fn save_sampler(path: &Path, state: &mut SamplerState) -> Result<(), AppError> {
    state.detach_pool();
    let file = File::create(path)
        .map_err(|e| AppError::output(format!("Failed to create sampler file '{}': {e}", path.display())))?;
    let mut writer = BufWriter::new(file);
    bincode::serialize_into(&mut writer, state)
        .map_err(|e| AppError::output(format!("Failed to write sampler state: {e}")))?;
    writer
        .flush()
        .map_err(|e| AppError::output(format!("Failed to write sampler state: {e}")))?;
    info!("Saved sampler state to {}", path.display());
    Ok(())
}

pub fn load_sampler(path: &Path) -> Result<SamplerState, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::input(format!("Failed to open sampler file '{}': {e}", path.display())))?;
    bincode::deserialize_from(BufReader::new(file))
        .map_err(|e| AppError::input(format!("Invalid sampler file '{}': {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::toy_state;

    #[test]
    fn round_trip_keeps_chain_and_blobs() {
        let dir = tempfile::tempdir().unwrap();
        let path = sampler_path(dir.path(), "toy");
        assert!(path.ends_with("toy_sampler.bin"));

        let mut state = toy_state(4);
        save_sampler(&path, &mut state).unwrap();
        assert!(!state.has_pool());

        let back = load_sampler(&path).unwrap();
        assert_eq!(back.chain, state.chain);
        assert_eq!(back.labels, state.labels);
        assert_eq!(back.info, state.info);
        assert_eq!(back.data, state.data);
        assert_eq!(back.n_accepted, state.n_accepted);
        assert_eq!(back.chain.flat_blobs(), state.chain.flat_blobs());
    }

    #[test]
    fn label_comes_back_from_the_file_name() {
        let path = sampler_path(Path::new("out"), "CrabNebula_SynIC");
        assert_eq!(label_from_sampler_path(&path), Some("CrabNebula_SynIC"));
        assert_eq!(label_from_sampler_path(Path::new("run.pickle")), None);
        assert_eq!(label_from_sampler_path(Path::new("dir/_sampler.bin")), None);
    }

    #[test]
    fn garbage_and_missing_files_are_input_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("junk.bin");
        std::fs::write(&path, b"not a sampler").unwrap();
        assert_eq!(load_sampler(&path).unwrap_err().exit_code(), 2);
        assert_eq!(load_sampler(&dir.path().join("nope.bin")).unwrap_err().exit_code(), 2);
    }

    #[test]
    fn unwritable_path_is_an_output_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing_dir").join("x_sampler.bin");
        let mut state = toy_state(1);
        assert_eq!(save_sampler(&path, &mut state).unwrap_err().exit_code(), 5);
    }
}
