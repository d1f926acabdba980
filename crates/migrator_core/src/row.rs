use std::sync::Arc;

/// Position of a row in the source dataset, assigned once at load time.
pub type RowIndex = usize;

/// Logical article fields recognised by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Status,
    Name,
    PlainContent,
    RichBody,
    HeroImageUrl,
    PreviewImageUrl,
    PreviewImageMediumUrl,
    AllImages,
}

impl Field {
    pub const ALL: [Field; 8] = [
        Field::Status,
        Field::Name,
        Field::PlainContent,
        Field::RichBody,
        Field::HeroImageUrl,
        Field::PreviewImageUrl,
        Field::PreviewImageMediumUrl,
        Field::AllImages,
    ];

    fn slot(self) -> usize {
        self as usize
    }
}

/// Maps each logical field to the column header that carries it in the export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMapping {
    headers: [String; 8],
}

impl Default for FieldMapping {
    fn default() -> Self {
        Self {
            headers: [
                "status".to_string(),
                "name".to_string(),
                "content output  (non-html format: content body)".to_string(),
                "body (html code without cms links)".to_string(),
                "articledetailsheroimage (extracted main image from cms)".to_string(),
                "articlepreviewimage (extracted main image from cms)".to_string(),
                "articlepreviewimagemedium (extracted main image from cms)".to_string(),
                "all images".to_string(),
            ],
        }
    }
}

impl FieldMapping {
    pub fn header_for(&self, field: Field) -> &str {
        &self.headers[field.slot()]
    }

    /// Override the header used for `field`. The value is normalized the same
    /// way column headers are.
    pub fn with_header(mut self, field: Field, header: impl AsRef<str>) -> Self {
        self.headers[field.slot()] = normalize_header(header.as_ref());
        self
    }
}

/// Column headers are compared trimmed and lowercased.
pub fn normalize_header(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Column layout of a dataset, resolved once against a [`FieldMapping`].
///
/// Known fields are located by position; every other column is carried through
/// untouched as an extra column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowSchema {
    headers: Vec<String>,
    positions: [Option<usize>; 8],
}

impl RowSchema {
    pub fn resolve<I, S>(headers: I, mapping: &FieldMapping) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let headers: Vec<String> = headers
            .into_iter()
            .map(|h| normalize_header(h.as_ref()))
            .collect();
        let mut positions = [None; 8];
        for field in Field::ALL {
            let wanted = normalize_header(mapping.header_for(field));
            positions[field.slot()] = headers.iter().position(|h| *h == wanted);
        }
        Self { headers, positions }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    pub fn has(&self, field: Field) -> bool {
        self.positions[field.slot()].is_some()
    }

    pub fn position(&self, field: Field) -> Option<usize> {
        self.positions[field.slot()]
    }

    /// Schema with the columns of `dropped` removed, preserving column order.
    pub fn without(&self, dropped: &[Field]) -> RowSchema {
        let removed: Vec<usize> = dropped.iter().filter_map(|f| self.position(*f)).collect();
        let headers = self
            .headers
            .iter()
            .enumerate()
            .filter(|(pos, _)| !removed.contains(pos))
            .map(|(_, h)| h.clone())
            .collect();
        let mut positions = [None; 8];
        for field in Field::ALL {
            if dropped.contains(&field) {
                continue;
            }
            positions[field.slot()] = self
                .position(field)
                .map(|pos| pos - removed.iter().filter(|r| **r < pos).count());
        }
        RowSchema { headers, positions }
    }
}

/// One article record. Rows are immutable snapshots: transforms build new rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    original_index: RowIndex,
    schema: Arc<RowSchema>,
    cells: Vec<Option<String>>,
}

impl Row {
    pub fn new(original_index: RowIndex, schema: Arc<RowSchema>, cells: Vec<Option<String>>) -> Self {
        Self {
            original_index,
            schema,
            cells,
        }
    }

    pub fn original_index(&self) -> RowIndex {
        self.original_index
    }

    pub fn schema(&self) -> &Arc<RowSchema> {
        &self.schema
    }

    pub fn cells(&self) -> &[Option<String>] {
        &self.cells
    }

    /// A row is well formed when it has exactly one cell per schema column.
    pub fn is_well_formed(&self) -> bool {
        self.cells.len() == self.schema.len()
    }

    /// Value of `field`, or `None` when the column is absent or the cell is null.
    pub fn get(&self, field: Field) -> Option<&str> {
        self.schema
            .position(field)
            .and_then(|pos| self.cells.get(pos))
            .and_then(|cell| cell.as_deref())
    }

    /// Replace the value of `field`. Returns false when the schema lacks the column.
    pub fn set(&mut self, field: Field, value: Option<String>) -> bool {
        match self.schema.position(field) {
            Some(pos) if pos < self.cells.len() => {
                self.cells[pos] = value;
                true
            }
            _ => false,
        }
    }

    /// Mutable access to every cell, used by whole-row passes.
    pub fn cells_mut(&mut self) -> impl Iterator<Item = &mut Option<String>> {
        self.cells.iter_mut()
    }

    /// Project this row onto `target`, a schema derived from this row's schema
    /// via [`RowSchema::without`].
    pub fn project(&self, target: Arc<RowSchema>) -> Row {
        let cells = target
            .headers()
            .iter()
            .map(|header| {
                self.schema
                    .headers()
                    .iter()
                    .position(|h| h == header)
                    .and_then(|pos| self.cells.get(pos).cloned())
                    .flatten()
            })
            .collect();
        Row {
            original_index: self.original_index,
            schema: target,
            cells,
        }
    }
}
