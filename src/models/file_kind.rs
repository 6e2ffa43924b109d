//! Static classification of object names by file extension.

use std::{collections::HashMap, sync::LazyLock};

/// Coarse content category used for icons and thumbnail eligibility.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FileKind {
    Image,
    Audio,
    Video,
    Document,
    Archive,
    Code,
    Spreadsheet,
    Presentation,
    Other,
}

const EXTENSIONS: &[(&str, FileKind)] = &[
    ("jpg", FileKind::Image),
    ("jpeg", FileKind::Image),
    ("png", FileKind::Image),
    ("gif", FileKind::Image),
    ("bmp", FileKind::Image),
    ("webp", FileKind::Image),
    ("svg", FileKind::Image),
    ("mp3", FileKind::Audio),
    ("wav", FileKind::Audio),
    ("ogg", FileKind::Audio),
    ("flac", FileKind::Audio),
    ("m4a", FileKind::Audio),
    ("aac", FileKind::Audio),
    ("mp4", FileKind::Video),
    ("webm", FileKind::Video),
    ("avi", FileKind::Video),
    ("mov", FileKind::Video),
    ("wmv", FileKind::Video),
    ("flv", FileKind::Video),
    ("mkv", FileKind::Video),
    ("pdf", FileKind::Document),
    ("doc", FileKind::Document),
    ("docx", FileKind::Document),
    ("txt", FileKind::Document),
    ("md", FileKind::Document),
    ("rtf", FileKind::Document),
    ("zip", FileKind::Archive),
    ("rar", FileKind::Archive),
    ("7z", FileKind::Archive),
    ("tar", FileKind::Archive),
    ("gz", FileKind::Archive),
    ("py", FileKind::Code),
    ("js", FileKind::Code),
    ("html", FileKind::Code),
    ("css", FileKind::Code),
    ("java", FileKind::Code),
    ("cpp", FileKind::Code),
    ("c", FileKind::Code),
    ("php", FileKind::Code),
    ("rs", FileKind::Code),
    ("xls", FileKind::Spreadsheet),
    ("xlsx", FileKind::Spreadsheet),
    ("csv", FileKind::Spreadsheet),
    ("ppt", FileKind::Presentation),
    ("pptx", FileKind::Presentation),
];

/// Raster formats the thumbnail decoder is built with.
const DECODABLE_IMAGES: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "webp"];

static BY_EXTENSION: LazyLock<HashMap<&'static str, FileKind>> =
    LazyLock::new(|| EXTENSIONS.iter().copied().collect());

impl FileKind {
    /// Classify by the lowercase text after the last `.`; no extension means `Other`.
    pub fn from_name(name: &str) -> Self {
        extension(name)
            .and_then(|ext| BY_EXTENSION.get(ext.as_str()).copied())
            .unwrap_or(FileKind::Other)
    }

    /// Font Awesome class rendered next to the entry.
    pub fn icon_class(self) -> &'static str {
        match self {
            FileKind::Image => "fas fa-image",
            FileKind::Audio => "fas fa-music",
            FileKind::Video => "fas fa-video",
            FileKind::Document => "fas fa-file-alt",
            FileKind::Archive => "fas fa-file-archive",
            FileKind::Code => "fas fa-file-code",
            FileKind::Spreadsheet => "fas fa-file-excel",
            FileKind::Presentation => "fas fa-file-powerpoint",
            FileKind::Other => "fas fa-file",
        }
    }
}

/// True when `/thumb` can produce a real preview for this name.
pub fn is_thumbnailable(name: &str) -> bool {
    extension(name).is_some_and(|ext| DECODABLE_IMAGES.contains(&ext.as_str()))
}

fn extension(name: &str) -> Option<String> {
    name.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase())
}
