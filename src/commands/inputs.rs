use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use slidepress_lib::{ConvertError, SourceFile};

const MARKDOWN_EXTENSIONS: &[&str] = &["md", "markdown"];

fn is_markdown(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| MARKDOWN_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

/// Markdown files under `dir`, sorted.
pub fn markdown_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0 || !entry.file_name().to_string_lossy().starts_with('.')
        })
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| is_markdown(path))
        .collect();
    files.sort();
    files
}

/// Expands CLI inputs into source files, preserving order.
///
/// `-` reads stdin; directories contribute their markdown files. With no
/// inputs, `input_dir` is scanned.
pub fn collect_inputs(
    inputs: &[PathBuf],
    input_dir: Option<&Path>,
) -> Result<Vec<SourceFile>, ConvertError> {
    if inputs.is_empty() {
        let Some(dir) = input_dir else {
            return Err(ConvertError::Config(
                "No input files given. Pass markdown files, '-' for stdin, or --input-dir"
                    .to_string(),
            ));
        };
        if !dir.is_dir() {
            return Err(ConvertError::Config(format!(
                "Input directory does not exist: {}",
                dir.display()
            )));
        }
        return Ok(markdown_files(dir).into_iter().map(SourceFile::new).collect());
    }

    let mut files = Vec::new();
    for input in inputs {
        if input.as_os_str() == "-" {
            files.push(SourceFile::stdin());
            continue;
        }
        let path = match input_dir {
            Some(dir) if input.is_relative() && !input.exists() => dir.join(input),
            _ => input.clone(),
        };
        if path.is_dir() {
            files.extend(markdown_files(&path).into_iter().map(SourceFile::new));
        } else {
            files.push(SourceFile::new(path));
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use slidepress_lib::FileKind;
    use tempfile::TempDir;

    #[test]
    fn scans_input_dir_when_no_inputs() {
        let dir = TempDir::new().expect("tempdir");
        std::fs::create_dir_all(dir.path().join("talks/.drafts")).unwrap();
        std::fs::write(dir.path().join("b.md"), "# B").unwrap();
        std::fs::write(dir.path().join("talks/a.markdown"), "# A").unwrap();
        std::fs::write(dir.path().join("talks/.drafts/x.md"), "# X").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "skip").unwrap();

        let files = collect_inputs(&[], Some(dir.path())).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|f| f.path().strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            names,
            vec![PathBuf::from("b.md"), PathBuf::from("talks/a.markdown")]
        );
    }

    #[test]
    fn dash_means_stdin_and_order_is_kept() {
        let files = collect_inputs(
            &[PathBuf::from("z.md"), PathBuf::from("-"), PathBuf::from("a.md")],
            None,
        )
        .unwrap();
        assert_eq!(files.len(), 3);
        assert_eq!(files[0].path(), Path::new("z.md"));
        assert_eq!(files[1].kind(), FileKind::StandardIo);
        assert_eq!(files[2].path(), Path::new("a.md"));
    }

    #[test]
    fn no_inputs_is_a_config_error() {
        assert!(matches!(
            collect_inputs(&[], None),
            Err(ConvertError::Config(_))
        ));
    }
}
