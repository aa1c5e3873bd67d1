//! Tables of aggregated data, which can be rendered to HTML or serialized to
//! JSON.
//!
//! A [`Table`] is a list of headers plus rows of [`TableCell`]s, one cell per
//! header. Views build a table once and then either render it or return it
//! from a JSON endpoint.

use std::cmp::Ordering;

use hypertext::prelude::*;
use serde::Serialize;

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct TableHeader {
    pub key: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<String>,
}

impl TableHeader {
    pub fn new(key: &str, text: &str) -> Self {
        Self {
            key: key.to_string(),
            text: text.to_string(),
            tooltip: None,
        }
    }

    pub fn tooltip(mut self, tooltip: &str) -> Self {
        self.tooltip = Some(tooltip.to_string());
        self
    }
}

/// The value a column is sorted by. Numbers sort before text.
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum SortValue {
    Number(f64),
    Text(String),
}

impl SortValue {
    fn compare(&self, other: &SortValue) -> Ordering {
        match (self, other) {
            (SortValue::Number(a), SortValue::Number(b)) => a.total_cmp(b),
            (SortValue::Text(a), SortValue::Text(b)) => a.cmp(b),
            (SortValue::Number(_), SortValue::Text(_)) => Ordering::Less,
            (SortValue::Text(_), SortValue::Number(_)) => Ordering::Greater,
        }
    }
}

impl From<f64> for SortValue {
    fn from(value: f64) -> Self {
        SortValue::Number(value)
    }
}

impl From<i64> for SortValue {
    fn from(value: i64) -> Self {
        SortValue::Number(value as f64)
    }
}

impl From<usize> for SortValue {
    fn from(value: usize) -> Self {
        SortValue::Number(value as f64)
    }
}

impl From<bool> for SortValue {
    fn from(value: bool) -> Self {
        SortValue::Number(if value { 1.0 } else { 0.0 })
    }
}

/// Interactive content for a cell, in place of its text.
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CellWidget {
    /// A checkbox which posts `name=true` (or nothing, when unticked) in the
    /// background, along with the hidden values.
    Toggle {
        action: String,
        name: String,
        checked: bool,
        hidden: Vec<(String, String)>,
    },
    /// A one-field form.
    Input {
        action: String,
        name: String,
        value: String,
        hidden: Vec<(String, String)>,
    },
}

#[derive(Serialize, Clone, Debug, Default, PartialEq)]
pub struct TableCell {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub widget: Option<CellWidget>,
    /// Structured data for JSON consumers (it is not rendered).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl TableCell {
    pub fn text(text: impl ToString) -> Self {
        Self {
            text: text.to_string(),
            ..Default::default()
        }
    }

    pub fn sort(mut self, sort: impl Into<SortValue>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    pub fn link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    pub fn class(mut self, class: &str) -> Self {
        self.class = Some(class.to_string());
        self
    }

    pub fn tooltip(mut self, tooltip: &str) -> Self {
        self.tooltip = Some(tooltip.to_string());
        self
    }

    pub fn widget(mut self, widget: CellWidget) -> Self {
        self.widget = Some(widget);
        self
    }

    pub fn data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    fn sort_value(&self) -> SortValue {
        self.sort
            .clone()
            .unwrap_or_else(|| SortValue::Text(self.text.clone()))
    }
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct Table {
    pub title: Option<String>,
    pub headers: Vec<TableHeader>,
    pub rows: Vec<Vec<TableCell>>,
}

impl Table {
    pub fn new(title: Option<&str>, headers: Vec<TableHeader>) -> Self {
        Self {
            title: title.map(ToString::to_string),
            headers,
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<TableCell>) {
        debug_assert_eq!(row.len(), self.headers.len());
        self.rows.push(row);
    }

    /// Sorts the rows by the column with the given key (descending if
    /// `descending` is set). Unknown keys leave the order unchanged.
    pub fn sort_by_key(&mut self, key: &str, descending: bool) {
        let Some(index) = self.headers.iter().position(|h| h.key == key)
        else {
            return;
        };

        self.rows.sort_by(|a, b| {
            let ordering = match (a.get(index), b.get(index)) {
                (Some(a), Some(b)) => a.sort_value().compare(&b.sort_value()),
                _ => Ordering::Equal,
            };
            if descending {
                ordering.reverse()
            } else {
                ordering
            }
        });
    }
}

impl Renderable for Table {
    fn render_to(
        &self,
        buffer: &mut hypertext::Buffer<hypertext::context::Node>,
    ) {
        maud! {
            @if let Some(title) = &self.title {
                h3 class="mt-4" { (title) }
            }
            div class="table-responsive" {
                table class="table table-striped table-sm" {
                    thead {
                        tr {
                            @for header in &self.headers {
                                th scope="col" title=(header.tooltip.as_deref().unwrap_or("")) {
                                    (header.text)
                                }
                            }
                        }
                    }
                    tbody {
                        @for row in &self.rows {
                            tr {
                                @for cell in row {
                                    td class=(cell.class.as_deref().unwrap_or("")) title=(cell.tooltip.as_deref().unwrap_or("")) {
                                        CellContents cell=(cell);
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
        .render_to(buffer);
    }
}

struct CellContents<'r> {
    cell: &'r TableCell,
}

impl Renderable for CellContents<'_> {
    fn render_to(
        &self,
        buffer: &mut hypertext::Buffer<hypertext::context::Node>,
    ) {
        maud! {
            @match &self.cell.widget {
                Some(CellWidget::Toggle { action, name, checked, hidden }) => {
                    form hx-post=(action) hx-trigger="change" hx-swap="none" {
                        @for (key, value) in hidden {
                            input type="hidden" name=(key) value=(value);
                        }
                        input type="checkbox" class="form-check-input" name=(name) value="true" checked[*checked];
                    }
                }
                Some(CellWidget::Input { action, name, value, hidden }) => {
                    form method="post" action=(action) class="d-flex gap-1" {
                        @for (key, value) in hidden {
                            input type="hidden" name=(key) value=(value);
                        }
                        input type="text" class="form-control form-control-sm" name=(name) value=(value);
                        button type="submit" class="btn btn-sm btn-outline-primary" { "Save" }
                    }
                }
                None => {
                    @if let Some(link) = &self.cell.link {
                        a href=(link) { (self.cell.text) }
                    } @else {
                        (self.cell.text)
                    }
                }
            }
        }
        .render_to(buffer);
    }
}
