//! Exercise corpus loading: directory scan, per-extension loaders and
//! fixed-size chunking. Everything downstream sees only `Document` chunks.

use std::fs;
use std::path::Path;

use ignore::WalkBuilder;

use crate::{CoreError, Document};

/// Extensions the loader understands, lowercase.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["pdf", "txt", "md", "py"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Loader {
    Pdf,
    Text,
}

fn loader_for(path: &Path) -> Result<Loader, CoreError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();
    match extension.as_str() {
        "pdf" => Ok(Loader::Pdf),
        "txt" | "md" | "py" => Ok(Loader::Text),
        _ => Err(CoreError::UnsupportedExtension { extension }),
    }
}

pub fn is_supported(path: &Path) -> bool {
    loader_for(path).is_ok()
}

/// Fixed-size character windows with overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextSplitter {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for TextSplitter {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

impl TextSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            chunk_overlap,
        }
    }

    pub fn split(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        let size = self.chunk_size.max(1);
        let stride = size.saturating_sub(self.chunk_overlap).max(1);

        let mut chunks = Vec::new();
        let mut start = 0;
        while start < chars.len() {
            let end = (start + size).min(chars.len());
            let chunk: String = chars[start..end].iter().collect();
            if !chunk.trim().is_empty() {
                chunks.push(chunk);
            }
            if end == chars.len() {
                break;
            }
            start += stride;
        }
        chunks
    }

    /// Split one source text into numbered chunks.
    pub fn split_document(&self, text: &str, source: &str) -> Vec<Document> {
        self.split(text)
            .into_iter()
            .enumerate()
            .map(|(chunk, content)| Document {
                content,
                source: source.to_string(),
                chunk,
            })
            .collect()
    }
}

fn read_text(path: &Path, loader: Loader) -> Result<String, CoreError> {
    match loader {
        Loader::Text => fs::read_to_string(path).map_err(|e| CoreError::io(path, e)),
        Loader::Pdf => pdf_extract::extract_text(path).map_err(|e| CoreError::Pdf {
            path: path.to_path_buf(),
            reason: e.to_string(),
        }),
    }
}

/// Load and chunk a single file.
pub fn load_file(path: &Path, splitter: &TextSplitter) -> Result<Vec<Document>, CoreError> {
    let loader = loader_for(path)?;
    let text = read_text(path, loader)?;
    Ok(splitter.split_document(&text, &path.display().to_string()))
}

/// Load every supported file under `dir`, recursively. The directory is
/// created when missing. A file that fails to load is logged and skipped.
pub fn load_directory(dir: &Path, splitter: &TextSplitter) -> Result<Vec<Document>, CoreError> {
    fs::create_dir_all(dir).map_err(|e| CoreError::io(dir, e))?;

    let mut documents = Vec::new();
    for entry in WalkBuilder::new(dir).build() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable corpus entry");
                continue;
            }
        };
        if !entry.file_type().is_some_and(|t| t.is_file()) || !is_supported(entry.path()) {
            continue;
        }

        match load_file(entry.path(), splitter) {
            Ok(chunks) => {
                tracing::info!(path = %entry.path().display(), chunks = chunks.len(), "loaded");
                documents.extend(chunks);
            }
            Err(e) => {
                tracing::warn!(path = %entry.path().display(), error = %e, "failed to load");
            }
        }
    }
    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_windows_overlap() {
        let splitter = TextSplitter::new(4, 2);
        assert_eq!(splitter.split("abcdefgh"), vec!["abcd", "cdef", "efgh"]);
    }

    #[test]
    fn split_short_text_is_one_chunk() {
        let splitter = TextSplitter::default();
        assert_eq!(splitter.split("hello"), vec!["hello"]);
        assert!(splitter.split("").is_empty());
        assert!(splitter.split("   \n").is_empty());
    }

    #[test]
    fn overlap_not_smaller_than_size_still_advances() {
        let splitter = TextSplitter::new(3, 5);
        assert_eq!(splitter.split("abcde"), vec!["abc", "bcd", "cde"]);
    }

    #[test]
    fn split_handles_multibyte_text() {
        let splitter = TextSplitter::new(3, 0);
        let text = "これは文です。";
        assert_eq!(splitter.split(text), vec!["これは", "文です", "。"]);
    }

    #[test]
    fn extension_match_is_case_insensitive() {
        assert!(is_supported(Path::new("notes/Lesson.MD")));
        assert!(is_supported(Path::new("a/b/solution.py")));
        assert!(!is_supported(Path::new("image.png")));
        assert!(!is_supported(Path::new("Makefile")));
    }

    #[test]
    fn load_directory_skips_unsupported_and_numbers_chunks() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("intro.txt"), "abcdefgh").unwrap();
        fs::create_dir(dir.path().join("week2")).unwrap();
        fs::write(dir.path().join("week2").join("loops.md"), "for loops").unwrap();
        fs::write(dir.path().join("diagram.png"), [0u8, 1, 2]).unwrap();

        let splitter = TextSplitter::new(4, 0);
        let mut docs = load_directory(dir.path(), &splitter).unwrap();
        docs.sort_by(|a, b| (&a.source, a.chunk).cmp(&(&b.source, b.chunk)));

        let intro: Vec<_> = docs.iter().filter(|d| d.source.ends_with("intro.txt")).collect();
        assert_eq!(intro.len(), 2);
        assert_eq!(intro[0].chunk, 0);
        assert_eq!(intro[1].content, "efgh");
        assert!(docs.iter().any(|d| d.source.ends_with("loops.md")));
        assert!(!docs.iter().any(|d| d.source.ends_with("diagram.png")));
    }

    #[test]
    fn broken_file_does_not_abort_scan() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("broken.txt"), [0xffu8, 0xfe, 0x00]).unwrap();
        fs::write(dir.path().join("ok.txt"), "still loaded").unwrap();

        let docs = load_directory(dir.path(), &TextSplitter::default()).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].content, "still loaded");
    }

    #[test]
    fn missing_directory_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("exercises");
        let docs = load_directory(&target, &TextSplitter::default()).unwrap();
        assert!(docs.is_empty());
        assert!(target.is_dir());
    }

    #[test]
    fn load_file_rejects_unknown_extension() {
        let err = load_file(Path::new("data.csv"), &TextSplitter::default()).unwrap_err();
        assert!(matches!(err, CoreError::UnsupportedExtension { .. }));
    }
}
