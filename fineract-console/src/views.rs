//! Generic page model rendered by `page.html`.
//!
//! Most screens are a title, a row of actions and a stack of blocks
//! (facts, tables, forms), so handlers assemble a [`Page`] instead of
//! writing one template each.

use std::fmt::Display;

use chrono::NaiveDate;

use crate::forms::FormView;

#[derive(Debug, Clone)]
pub struct Link {
    pub label: String,
    pub href: String,
    /// Rendered as a one-button form that POSTs to `href`.
    pub post: bool,
    pub danger: bool,
}

impl Link {
    pub fn get(label: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            href: href.into(),
            post: false,
            danger: false,
        }
    }

    pub fn post(label: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            post: true,
            ..Self::get(label, href)
        }
    }

    pub fn danger(mut self) -> Self {
        self.danger = true;
        self
    }

    pub fn css_class(&self) -> &'static str {
        if self.danger {
            "button button-danger"
        } else {
            "button"
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Cell {
    pub text: String,
    pub href: Option<String>,
}

impl Cell {
    pub fn link(text: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            href: Some(href.into()),
        }
    }
}

impl From<String> for Cell {
    fn from(text: String) -> Self {
        Self { text, href: None }
    }
}

impl From<&str> for Cell {
    fn from(text: &str) -> Self {
        text.to_string().into()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Row {
    pub cells: Vec<Cell>,
    pub actions: Vec<Link>,
}

impl Row {
    pub fn new(cells: Vec<Cell>) -> Self {
        Self {
            cells,
            actions: Vec::new(),
        }
    }

    pub fn action(mut self, link: Link) -> Self {
        self.actions.push(link);
        self
    }
}

#[derive(Debug, Clone)]
pub struct Pager {
    pub summary: String,
    pub prev: Option<String>,
    pub next: Option<String>,
}

impl Pager {
    /// Offset paging; `base` must already end in `?` or `&`.
    pub fn new(base: &str, offset: u32, limit: u32, shown: usize, total: u64) -> Self {
        let limit = limit.max(1);
        let last = offset as u64 + shown as u64;
        let summary = if shown == 0 {
            format!("0 of {total}")
        } else {
            format!("{}-{} of {}", offset + 1, last, total)
        };
        let prev = (offset > 0).then(|| format!("{base}offset={}", offset.saturating_sub(limit)));
        let next = (last < total).then(|| format!("{base}offset={}", offset + limit));
        Self { summary, prev, next }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Table {
    pub heading: Option<String>,
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    pub empty: String,
    pub pager: Option<Pager>,
}

impl Table {
    pub fn new(columns: &[&str]) -> Self {
        Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            empty: "Nothing to show".to_string(),
            ..Self::default()
        }
    }

    pub fn heading(mut self, heading: impl Into<String>) -> Self {
        self.heading = Some(heading.into());
        self
    }

    pub fn empty(mut self, message: impl Into<String>) -> Self {
        self.empty = message.into();
        self
    }

    pub fn rows(mut self, rows: impl IntoIterator<Item = Row>) -> Self {
        self.rows.extend(rows);
        self
    }

    pub fn pager(mut self, pager: Pager) -> Self {
        self.pager = Some(pager);
        self
    }

    pub fn has_actions(&self) -> bool {
        self.rows.iter().any(|r| !r.actions.is_empty())
    }
}

#[derive(Debug, Clone, Default)]
pub struct Facts {
    pub heading: Option<String>,
    pub items: Vec<(String, String)>,
}

impl Facts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn heading(mut self, heading: impl Into<String>) -> Self {
        self.heading = Some(heading.into());
        self
    }

    pub fn item(mut self, label: &str, value: impl Into<String>) -> Self {
        self.items.push((label.to_string(), value.into()));
        self
    }
}

#[derive(Debug, Clone)]
pub enum Block {
    Facts(Facts),
    Table(Table),
    Form(FormView),
    Text(String),
    Actions(Vec<Link>),
}

#[derive(Debug, Clone)]
pub struct Page {
    pub title: String,
    /// Key of the highlighted navigation entry.
    pub section: &'static str,
    pub actions: Vec<Link>,
    pub blocks: Vec<Block>,
}

impl Page {
    pub fn new(section: &'static str, title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            section,
            actions: Vec::new(),
            blocks: Vec::new(),
        }
    }

    pub fn action(mut self, link: Link) -> Self {
        self.actions.push(link);
        self
    }

    pub fn block(mut self, block: Block) -> Self {
        self.blocks.push(block);
        self
    }

    pub fn facts(self, facts: Facts) -> Self {
        self.block(Block::Facts(facts))
    }

    pub fn table(self, table: Table) -> Self {
        self.block(Block::Table(table))
    }

    pub fn form(self, form: FormView) -> Self {
        self.block(Block::Form(form))
    }

    pub fn text(self, text: impl Into<String>) -> Self {
        self.block(Block::Text(text.into()))
    }
}

/// Empty string for `None`.
pub fn opt<T: Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

pub fn date(value: Option<NaiveDate>) -> String {
    value.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default()
}

pub fn yes_no(value: bool) -> &'static str {
    if value {
        "Yes"
    } else {
        "No"
    }
}

/// `(value, label)` pairs for a select.
pub fn options<T, I, L>(items: I, mut f: L) -> Vec<(String, String)>
where
    I: IntoIterator<Item = T>,
    L: FnMut(T) -> (i64, String),
{
    items
        .into_iter()
        .map(|item| {
            let (id, label) = f(item);
            (id.to_string(), label)
        })
        .collect()
}

/// Options with a leading blank choice.
pub fn optional(mut options: Vec<(String, String)>) -> Vec<(String, String)> {
    options.insert(0, (String::new(), "(none)".to_string()));
    options
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pager_links_prev_and_next() {
        let pager = Pager::new("/clients?", 20, 20, 20, 45);
        assert_eq!(pager.summary, "21-40 of 45");
        assert_eq!(pager.prev.as_deref(), Some("/clients?offset=0"));
        assert_eq!(pager.next.as_deref(), Some("/clients?offset=40"));

        let last = Pager::new("/clients?q=ada&", 40, 20, 5, 45);
        assert_eq!(last.next, None);
        assert_eq!(last.prev.as_deref(), Some("/clients?q=ada&offset=20"));
    }

    #[test]
    fn empty_pages_have_no_links() {
        let pager = Pager::new("/loans?", 0, 20, 0, 0);
        assert_eq!(pager.summary, "0 of 0");
        assert!(pager.prev.is_none() && pager.next.is_none());
    }

    #[test]
    fn optional_options_start_blank() {
        let opts = optional(options(vec![(3, "Ops")], |(id, name)| (id, name.to_string())));
        assert_eq!(opts[0].0, "");
        assert_eq!(opts[1], ("3".to_string(), "Ops".to_string()));
    }
}
