use crate::error::{PomupError, Result};
use crate::maven::RemoteRepository;
use crate::repository::Coordinate;
use quick_xml::Reader;
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::Event;
use std::collections::HashMap;
use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};

/// Element text plus the byte range it occupies in the source, trimmed of
/// surrounding whitespace. An empty element's range is its insertion point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSpan {
    pub text: String,
    pub range: Range<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclarationKind {
    /// `<project><dependencies>`
    Direct,
    /// `<project><dependencyManagement><dependencies>`
    Managed,
}

/// One `<dependency>` entry as written.
#[derive(Debug, Clone)]
pub struct PomDeclaration {
    pub coordinate: Coordinate,
    pub version: Option<TextSpan>,
    pub scope: Option<String>,
    pub kind: DeclarationKind,
}

impl PomDeclaration {
    pub fn raw_version(&self) -> Option<&str> {
        self.version
            .as_ref()
            .map(|span| span.text.as_str())
            .filter(|text| !text.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParentRef {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,
    pub relative_path: Option<String>,
}

/// The parts of a `pom.xml` this tool reads and rewrites.
#[derive(Debug, Clone, Default)]
pub struct PomFile {
    pub path: PathBuf,
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,
    pub parent: Option<ParentRef>,
    /// `<properties>` entries in document order.
    pub properties: Vec<(String, TextSpan)>,
    pub dependencies: Vec<PomDeclaration>,
    pub managed: Vec<PomDeclaration>,
    pub modules: Vec<String>,
    pub repositories: Vec<RemoteRepository>,
}

impl PomFile {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            PomupError::PomParsing(format!("Failed to read {}: {e}", path.display()))
        })?;
        Self::parse(path, &content)
    }

    pub fn parse(path: &Path, content: &str) -> Result<Self> {
        PomReader::new(path, content).read()
    }

    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties
            .iter()
            .rev()
            .find(|(key, _)| key == name)
            .map(|(_, span)| span.text.as_str())
    }

    pub fn property_map(&self) -> HashMap<String, String> {
        self.properties
            .iter()
            .map(|(key, span)| (key.clone(), span.text.clone()))
            .collect()
    }

    /// `groupId`, inherited from the parent when omitted.
    pub fn effective_group_id(&self) -> Option<&str> {
        self.group_id
            .as_deref()
            .or_else(|| self.parent.as_ref().and_then(|p| p.group_id.as_deref()))
    }

    /// `version`, inherited from the parent when omitted.
    pub fn effective_version(&self) -> Option<&str> {
        self.version
            .as_deref()
            .or_else(|| self.parent.as_ref().and_then(|p| p.version.as_deref()))
    }

    pub fn display_name(&self) -> String {
        match (self.effective_group_id(), self.artifact_id.as_deref()) {
            (Some(group), Some(artifact)) => format!("{group}:{artifact}"),
            (None, Some(artifact)) => artifact.to_string(),
            _ => self.path.display().to_string(),
        }
    }

    pub fn directory(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }
}

struct Frame {
    name: String,
    content_start: usize,
    text: String,
}

#[derive(Default)]
struct DeclarationBuilder {
    group_id: Option<String>,
    artifact_id: Option<String>,
    version: Option<TextSpan>,
    scope: Option<String>,
}

impl DeclarationBuilder {
    fn build(self, kind: DeclarationKind) -> Option<PomDeclaration> {
        let group = self.group_id.filter(|g| !g.is_empty())?;
        let artifact = self.artifact_id.filter(|a| !a.is_empty())?;
        Some(PomDeclaration {
            coordinate: Coordinate::new(group, artifact),
            version: self.version,
            scope: self.scope.filter(|s| !s.is_empty()),
            kind,
        })
    }
}

#[derive(Default)]
struct RepositoryBuilder {
    id: Option<String>,
    url: Option<String>,
}

struct PomReader<'a> {
    path: &'a Path,
    content: &'a str,
    stack: Vec<Frame>,
    pom: PomFile,
    declaration: DeclarationBuilder,
    repository: RepositoryBuilder,
}

impl<'a> PomReader<'a> {
    fn new(path: &'a Path, content: &'a str) -> Self {
        Self {
            path,
            content,
            stack: Vec::new(),
            pom: PomFile {
                path: path.to_path_buf(),
                ..PomFile::default()
            },
            declaration: DeclarationBuilder::default(),
            repository: RepositoryBuilder::default(),
        }
    }

    fn read(mut self) -> Result<PomFile> {
        let mut reader = Reader::from_str(self.content);
        let mut saw_project = false;

        loop {
            let before = position(&reader);
            let event = reader.read_event().map_err(|e| {
                PomupError::PomParsing(format!(
                    "{} at byte {}: {e}",
                    self.path.display(),
                    position(&reader)
                ))
            })?;

            match event {
                Event::Start(e) => {
                    let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                    if self.stack.is_empty() {
                        if name != "project" {
                            return Err(PomupError::PomParsing(format!(
                                "{}: root element is <{name}>, expected <project>",
                                self.path.display()
                            )));
                        }
                        saw_project = true;
                    }
                    self.stack.push(Frame {
                        name,
                        content_start: position(&reader),
                        text: String::new(),
                    });
                }
                // Self-closing: no content, so nothing to splice.
                Event::Empty(e) => {
                    let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                    if self.stack.is_empty() {
                        saw_project |= name == "project";
                        continue;
                    }
                    let span = TextSpan {
                        text: String::new(),
                        range: before..before,
                    };
                    self.close(&name, span);
                }
                Event::End(_) => {
                    let Some(frame) = self.stack.pop() else {
                        continue;
                    };
                    let span = self.span(frame.content_start, before, frame.text);
                    self.close(&frame.name, span);
                }
                Event::Text(e) => {
                    if let Some(frame) = self.stack.last_mut() {
                        frame.text.push_str(&String::from_utf8_lossy(&e));
                    }
                }
                Event::GeneralRef(e) => {
                    if let Some(frame) = self.stack.last_mut() {
                        let resolved = match e.resolve_char_ref() {
                            Ok(Some(ch)) => ch.to_string(),
                            _ => {
                                let name = String::from_utf8_lossy(&e).into_owned();
                                resolve_predefined_entity(&name)
                                    .map(str::to_string)
                                    .unwrap_or_else(|| format!("&{name};"))
                            }
                        };
                        frame.text.push_str(&resolved);
                    }
                }
                Event::CData(e) => {
                    if let Some(frame) = self.stack.last_mut() {
                        frame.text.push_str(&String::from_utf8_lossy(&e));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !saw_project {
            return Err(PomupError::PomParsing(format!(
                "{}: no <project> element",
                self.path.display()
            )));
        }

        Ok(self.pom)
    }

    fn span(&self, start: usize, end: usize, text: String) -> TextSpan {
        let raw = self.content.get(start..end).unwrap_or_default();
        let leading = raw.len() - raw.trim_start().len();
        let trailing = raw.len() - raw.trim_end().len();
        let range = if raw.trim().is_empty() {
            start..start
        } else {
            (start + leading)..(end - trailing)
        };
        TextSpan {
            text: text.trim().to_string(),
            range,
        }
    }

    fn close(&mut self, name: &str, span: TextSpan) {
        let parents: Vec<&str> = self.stack.iter().map(|f| f.name.as_str()).collect();
        let value = span.text.clone();

        match (parents.as_slice(), name) {
            (["project"], "groupId") => self.pom.group_id = Some(value),
            (["project"], "artifactId") => self.pom.artifact_id = Some(value),
            (["project"], "version") => self.pom.version = Some(value),

            (["project", "parent"], field) => {
                let parent = self.pom.parent.get_or_insert_with(ParentRef::default);
                match field {
                    "groupId" => parent.group_id = Some(value),
                    "artifactId" => parent.artifact_id = Some(value),
                    "version" => parent.version = Some(value),
                    "relativePath" => parent.relative_path = Some(value),
                    _ => {}
                }
            }
            (["project"], "parent") => {
                self.pom.parent.get_or_insert_with(ParentRef::default);
            }

            (["project", "properties"], key) => {
                self.pom.properties.push((key.to_string(), span));
            }

            (["project", "modules"], "module") if !value.is_empty() => {
                self.pom.modules.push(value);
            }

            (["project", "dependencies", "dependency"], field)
            | (["project", "dependencyManagement", "dependencies", "dependency"], field) => {
                match field {
                    "groupId" => self.declaration.group_id = Some(value),
                    "artifactId" => self.declaration.artifact_id = Some(value),
                    "version" => self.declaration.version = Some(span),
                    "scope" => self.declaration.scope = Some(value),
                    _ => {}
                }
            }
            (["project", "dependencies"], "dependency") => {
                let builder = std::mem::take(&mut self.declaration);
                if let Some(declaration) = builder.build(DeclarationKind::Direct) {
                    self.pom.dependencies.push(declaration);
                }
            }
            (["project", "dependencyManagement", "dependencies"], "dependency") => {
                let builder = std::mem::take(&mut self.declaration);
                if let Some(declaration) = builder.build(DeclarationKind::Managed) {
                    self.pom.managed.push(declaration);
                }
            }

            (["project", "repositories", "repository"], field) => match field {
                "id" => self.repository.id = Some(value),
                "url" => self.repository.url = Some(value),
                _ => {}
            },
            (["project", "repositories"], "repository") => {
                let builder = std::mem::take(&mut self.repository);
                if let Some(url) = builder.url.filter(|u| !u.is_empty()) {
                    let id = builder.id.unwrap_or_else(|| url.clone());
                    self.pom.repositories.push(RemoteRepository::new(id, url));
                }
            }

            _ => {}
        }
    }
}

fn position(reader: &Reader<&[u8]>) -> usize {
    usize::try_from(reader.buffer_position()).unwrap_or(usize::MAX)
}
