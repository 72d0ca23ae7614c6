//! Text buffers backing a lab instance and the import path that fills them.
//!
//! Types:
//!
//! - `SourceKind` names the three buffers and their file extensions.
//! - `SourceSet` is the raw text triple read at recompute time.
//! - `SourceBuffers` tracks which buffer is displayed and keeps the edits of
//!   the displayed buffer separate until the user switches away.
//! - `ImportedFile` / `ImportReport` describe one import batch.
use std::fmt;

/// Which of the three editable buffers a piece of text belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Vertex,
    Fragment,
    Pipeline,
}

impl SourceKind {
    pub const ALL: [SourceKind; 3] = [SourceKind::Fragment, SourceKind::Vertex, SourceKind::Pipeline];

    pub fn extension(self) -> &'static str {
        match self {
            SourceKind::Vertex => "vsh",
            SourceKind::Fragment => "fsh",
            SourceKind::Pipeline => "json",
        }
    }

    /// Maps a file name onto a buffer by its extension, ignoring case.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| lower.ends_with(&format!(".{}", kind.extension())))
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Vertex => f.write_str("vertex"),
            SourceKind::Fragment => f.write_str("fragment"),
            SourceKind::Pipeline => f.write_str("pipeline"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceSet {
    pub vertex: String,
    pub fragment: String,
    pub descriptor: String,
}

impl SourceSet {
    pub fn new(
        vertex: impl Into<String>,
        fragment: impl Into<String>,
        descriptor: impl Into<String>,
    ) -> Self {
        Self {
            vertex: vertex.into(),
            fragment: fragment.into(),
            descriptor: descriptor.into(),
        }
    }

    pub fn get(&self, kind: SourceKind) -> &str {
        match kind {
            SourceKind::Vertex => &self.vertex,
            SourceKind::Fragment => &self.fragment,
            SourceKind::Pipeline => &self.descriptor,
        }
    }

    pub fn set(&mut self, kind: SourceKind, text: String) {
        match kind {
            SourceKind::Vertex => self.vertex = text,
            SourceKind::Fragment => self.fragment = text,
            SourceKind::Pipeline => self.descriptor = text,
        }
    }
}

/// A file handed over by a picker, drag-and-drop or the command line.
#[derive(Debug, Clone)]
pub struct ImportedFile {
    pub name: String,
    pub media_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl ImportedFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let name = name.into();
        let media_type = guess_media_type(&name).map(str::to_string);
        Self {
            name,
            media_type,
            bytes,
        }
    }

    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }
}

/// Best-effort media type for a file name, mirroring what a browser reports.
pub fn guess_media_type(name: &str) -> Option<&'static str> {
    let ext = name.rsplit_once('.')?.1.to_ascii_lowercase();
    let media = match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "webp" => "image/webp",
        "json" => "application/json",
        "vsh" | "fsh" | "glsl" | "txt" => "text/plain",
        _ => return None,
    };
    Some(media)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub applied: Vec<(SourceKind, String)>,
    pub ignored: Vec<String>,
}

impl ImportReport {
    pub fn is_empty(&self) -> bool {
        self.applied.is_empty()
    }
}

/// The buffer manager: three texts plus the one currently shown for editing.
#[derive(Debug, Clone)]
pub struct SourceBuffers {
    sources: SourceSet,
    active: SourceKind,
    displayed: String,
}

impl SourceBuffers {
    pub fn new(sources: SourceSet) -> Self {
        let displayed = sources.fragment.clone();
        Self {
            sources,
            active: SourceKind::Fragment,
            displayed,
        }
    }

    pub fn active_kind(&self) -> SourceKind {
        self.active
    }

    pub fn active_buffer(&self) -> &str {
        &self.displayed
    }

    /// Replaces the text the user is currently editing.
    pub fn edit(&mut self, text: impl Into<String>) {
        self.displayed = text.into();
    }

    pub fn set_active_buffer(&mut self, kind: SourceKind, text: impl Into<String>) {
        let text = text.into();
        if kind == self.active {
            self.displayed = text.clone();
        }
        self.sources.set(kind, text);
    }

    /// Saves the displayed edits, then shows `kind`.
    pub fn switch_to(&mut self, kind: SourceKind) {
        self.sync();
        self.active = kind;
        self.displayed = self.sources.get(kind).to_string();
    }

    /// Replaces every buffer, keeping the fragment buffer on display.
    pub fn replace_all(&mut self, sources: SourceSet) {
        self.sources = sources;
        self.active = SourceKind::Fragment;
        self.displayed = self.sources.fragment.clone();
    }

    /// Flushes the displayed text and returns a copy of all three buffers.
    pub fn snapshot(&mut self) -> SourceSet {
        self.sync();
        self.sources.clone()
    }

    pub fn sources(&self) -> &SourceSet {
        &self.sources
    }

    pub fn import_files<I>(&mut self, files: I) -> ImportReport
    where
        I: IntoIterator<Item = ImportedFile>,
    {
        self.sync();
        let mut report = ImportReport::default();
        for file in files {
            let Some(kind) = SourceKind::from_file_name(&file.name) else {
                tracing::debug!(file = %file.name, "ignoring import with unrecognised extension");
                report.ignored.push(file.name);
                continue;
            };
            let text = String::from_utf8_lossy(&file.bytes).into_owned();
            self.sources.set(kind, text);
            report.applied.push((kind, file.name));
        }
        self.displayed = self.sources.get(self.active).to_string();
        report
    }

    fn sync(&mut self) {
        self.sources.set(self.active, self.displayed.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffers() -> SourceBuffers {
        SourceBuffers::new(SourceSet::new("vs", "fs", "{}"))
    }

    #[test]
    fn switching_saves_displayed_edits() {
        let mut buffers = buffers();
        buffers.edit("fs edited");
        buffers.switch_to(SourceKind::Vertex);
        assert_eq!(buffers.active_buffer(), "vs");
        assert_eq!(buffers.sources().fragment, "fs edited");

        buffers.switch_to(SourceKind::Fragment);
        assert_eq!(buffers.active_buffer(), "fs edited");
    }

    #[test]
    fn set_active_buffer_updates_display_only_for_shown_kind() {
        let mut buffers = buffers();
        buffers.set_active_buffer(SourceKind::Pipeline, "{\"blend\":null}");
        assert_eq!(buffers.active_buffer(), "fs");
        buffers.set_active_buffer(SourceKind::Fragment, "");
        assert_eq!(buffers.active_buffer(), "");
        assert_eq!(buffers.snapshot().descriptor, "{\"blend\":null}");
    }

    #[test]
    fn import_is_last_writer_wins_per_kind() {
        let mut buffers = buffers();
        let report = buffers.import_files(vec![
            ImportedFile::new("a.fsh", b"first".to_vec()),
            ImportedFile::new("notes.md", b"ignored".to_vec()),
            ImportedFile::new("B.FSH", b"second".to_vec()),
        ]);

        assert_eq!(buffers.sources().fragment, "second");
        assert_eq!(buffers.active_buffer(), "second");
        assert_eq!(report.applied.len(), 2);
        assert_eq!(report.ignored, vec!["notes.md".to_string()]);
    }

    #[test]
    fn import_keeps_unsaved_edits_of_other_kinds() {
        let mut buffers = buffers();
        buffers.edit("typed");
        buffers.import_files(vec![ImportedFile::new("x.vsh", b"new vs".to_vec())]);
        let snapshot = buffers.snapshot();
        assert_eq!(snapshot.fragment, "typed");
        assert_eq!(snapshot.vertex, "new vs");
    }

    #[test]
    fn media_type_follows_extension() {
        assert_eq!(guess_media_type("tex.PNG"), Some("image/png"));
        assert_eq!(guess_media_type("shader.fsh"), Some("text/plain"));
        assert_eq!(guess_media_type("noext"), None);
    }
}
