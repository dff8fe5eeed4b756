use std::path::{Path, PathBuf};
use std::{env, fs};

use crate::error::{Error, Result};

/// Reads a whole UTF-8 file into memory.
pub(crate) fn read_text<P: AsRef<Path>>(path: P) -> Result<String> {
	let path = path.as_ref();
	fs::read_to_string(path).map_err(|source| Error::Io { path: path.to_path_buf(), source })
}

/// Reads a whole file as raw bytes.
pub(crate) fn read_bytes<P: AsRef<Path>>(path: P) -> Result<Vec<u8>> {
	let path = path.as_ref();
	fs::read(path).map_err(|source| Error::Io { path: path.to_path_buf(), source })
}

/// Writes `bytes` to `path`, replacing any existing file.
pub(crate) fn write_bytes<P: AsRef<Path>>(path: P, bytes: &[u8]) -> Result<()> {
	let path = path.as_ref();
	fs::write(path, bytes).map_err(|source| Error::Io { path: path.to_path_buf(), source })
}

/// Normalize a folder path.
///
/// - `"."` or `"./"` resolves to the current working directory
/// - Other paths are returned as-is (not canonicalized)
pub fn normalize_folder<P: AsRef<Path>>(input: P) -> PathBuf {
	let input = input.as_ref();
	if input == Path::new(".") || input == Path::new("./") {
		env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
	} else {
		input.to_path_buf()
	}
}

/// File name used in error messages for a path.
pub(crate) fn display_name<P: AsRef<Path>>(path: P) -> String {
	path.as_ref()
		.file_name()
		.map(|name| name.to_string_lossy().to_string())
		.unwrap_or_else(|| path.as_ref().display().to_string())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn dot_resolves_to_current_dir() {
		let cwd = env::current_dir().unwrap();
		assert_eq!(normalize_folder("."), cwd);
		assert_eq!(normalize_folder("./"), cwd);
		assert_eq!(normalize_folder("data"), PathBuf::from("data"));
	}

	#[test]
	fn missing_file_reports_its_path() {
		let err = read_text("definitely/not/here.json").unwrap_err();
		match err {
			Error::Io { path, .. } => assert_eq!(path, PathBuf::from("definitely/not/here.json")),
			other => panic!("unexpected error: {other}"),
		}
	}

	#[test]
	fn display_name_uses_file_name() {
		assert_eq!(display_name("data/names.json"), "names.json");
	}
}
