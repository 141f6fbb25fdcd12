//! In-memory collaborators for unit tests.

use super::*;
use std::path::PathBuf;

pub enum FakeConverter {
    Returns(String),
    Fails,
    Panics,
}

impl MarkdownConverter for FakeConverter {
    fn convert(&self, _path: &Path) -> Result<String, ExtractError> {
        match self {
            FakeConverter::Returns(md) => Ok(md.clone()),
            FakeConverter::Fails => Err(ExtractError::ConversionFailed("JPX decode error".into())),
            FakeConverter::Panics => panic!("converter blew up"),
        }
    }
}

/// One entry per page: (markdown result, text result).
#[derive(Clone, Default)]
pub struct FakeDocument {
    pub pages: Vec<(Option<String>, Option<String>)>,
    pub unopenable: bool,
}

impl FakeDocument {
    pub fn pages(pages: &[(Option<&str>, Option<&str>)]) -> Self {
        Self {
            pages: pages
                .iter()
                .map(|(m, t)| (m.map(str::to_string), t.map(str::to_string)))
                .collect(),
            unopenable: false,
        }
    }

    pub fn unopenable() -> Self {
        Self {
            pages: Vec::new(),
            unopenable: true,
        }
    }
}

impl PageSource for FakeDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_markdown(&self, index: usize) -> Result<String, ExtractError> {
        self.pages[index].0.clone().ok_or(ExtractError::PageFailed {
            page: index + 1,
            detail: "no markdown".into(),
        })
    }

    fn page_text(&self, index: usize) -> Result<String, ExtractError> {
        self.pages[index].1.clone().ok_or(ExtractError::PageFailed {
            page: index + 1,
            detail: "no text".into(),
        })
    }
}

impl DocumentOpener for FakeDocument {
    fn with_document(
        &self,
        path: &Path,
        visit: &mut dyn FnMut(&dyn PageSource) -> Result<String, ExtractError>,
    ) -> Result<String, ExtractError> {
        if self.unopenable {
            return Err(ExtractError::OpenFailed {
                path: PathBuf::from(path),
                detail: "not a PDF".into(),
            });
        }
        visit(self)
    }
}

/// Reports the same tables from every tier.
#[derive(Clone, Default)]
pub struct FakeTables(pub Vec<RawTable>);

impl TableDetector for FakeTables {
    fn detect(
        &self,
        _path: &Path,
        _pages: &PageSelection,
        _flavor: TableFlavor,
    ) -> Result<Vec<RawTable>, ExtractError> {
        Ok(self.0.clone())
    }
}

impl PageTableScanner for FakeTables {
    fn scan(
        &self,
        _path: &Path,
        wanted: &dyn Fn(usize) -> bool,
    ) -> Result<Vec<RawTable>, ExtractError> {
        Ok(self.0.iter().filter(|t| wanted(t.page)).cloned().collect())
    }
}

pub fn collaborators(
    converter: FakeConverter,
    document: FakeDocument,
    tables: FakeTables,
) -> Collaborators {
    let tables = Arc::new(tables);
    Collaborators {
        converter: Arc::new(converter),
        documents: Arc::new(document),
        detector: tables.clone(),
        scanner: tables,
    }
}
