//! Emission Tree
//!
//! Emitters describe WHAT to write as a tree of statements and blocks; one
//! printer decides HOW it nests. Indentation is never tracked by emitters.

const INDENT: &str = "    ";

/// One node of generated Python
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Code {
    /// A single statement line
    Line(String),
    /// An empty line
    Blank,
    /// `header:` followed by an indented body; an empty body prints `...`
    Block { header: String, body: Vec<Code> },
    /// `open` + one item per line (each followed by a comma) + `close`
    Group {
        open: String,
        items: Vec<String>,
        close: String,
    },
    /// Printed as-is, without indentation (e.g. the body of a raw string)
    Verbatim(String),
}

impl Code {
    pub fn line(text: impl Into<String>) -> Self {
        Code::Line(text.into())
    }

    pub fn block(header: impl Into<String>, body: Vec<Code>) -> Self {
        Code::Block {
            header: header.into(),
            body,
        }
    }

    pub fn group(open: impl Into<String>, items: Vec<String>, close: impl Into<String>) -> Self {
        Code::Group {
            open: open.into(),
            items,
            close: close.into(),
        }
    }
}

/// Render a sequence of top-level nodes
pub fn render(nodes: &[Code]) -> String {
    let mut out = String::new();
    for node in nodes {
        write_node(&mut out, node, 0);
    }
    out
}

fn write_node(out: &mut String, node: &Code, depth: usize) {
    match node {
        Code::Line(text) => write_line(out, text, depth),
        Code::Blank => out.push('\n'),
        Code::Block { header, body } => {
            write_line(out, &format!("{}:", header), depth);
            if body.iter().all(|n| matches!(n, Code::Blank)) {
                write_line(out, "...", depth + 1);
            } else {
                for child in body {
                    write_node(out, child, depth + 1);
                }
            }
        }
        Code::Group { open, items, close } => {
            if items.is_empty() {
                write_line(out, &format!("{}{}", open, close), depth);
                return;
            }
            write_line(out, open, depth);
            for item in items {
                write_line(out, &format!("{},", item), depth + 1);
            }
            write_line(out, close, depth);
        }
        Code::Verbatim(text) => {
            out.push_str(text);
            if !text.ends_with('\n') {
                out.push('\n');
            }
        }
    }
}

fn write_line(out: &mut String, text: &str, depth: usize) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
    out.push_str(text);
    out.push('\n');
}
