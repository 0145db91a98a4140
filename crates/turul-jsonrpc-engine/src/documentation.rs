//! Asciidoc rendering of a [`Specification`].

use std::io;

use crate::specification::{MethodSpecification, Specification};

/// Renders registered methods as an Asciidoc document
#[derive(Debug, Clone, Default)]
pub struct AsciidocGenerator {
    title: Option<String>,
}

impl AsciidocGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into()).filter(|title: &String| !title.is_empty());
        self
    }

    pub fn render(&self, specification: &Specification) -> String {
        let mut out = String::new();
        if let Some(title) = &self.title {
            out.push_str(&format!("= {title}\n\n"));
        }
        out.push_str("== JSON-RPC Methods\n\n");
        let methods: Vec<String> = specification
            .methods
            .values()
            .map(render_method)
            .collect();
        out.push_str(&methods.join("\n"));
        out.push('\n');
        out
    }

    pub fn write<W: io::Write>(&self, specification: &Specification, mut output: W) -> io::Result<()> {
        output.write_all(self.render(specification).as_bytes())?;
        output.flush()
    }
}

fn or_dash(text: &str) -> &str {
    if text.is_empty() { "-" } else { text }
}

fn render_method(method: &MethodSpecification) -> String {
    let mut out = format!("=== {}\n\n", method.method);
    if !method.documentation.is_empty() {
        out.push_str(&method.documentation);
        out.push_str("\n\n");
    }

    if !method.parameters.is_empty() {
        out.push_str("==== Parameters\n\n[cols=\"headers\"]\n|===\n|Name|Position|Type|Required|Documentation\n");
        let rows: Vec<String> = method
            .parameters
            .iter()
            .map(|p| {
                format!(
                    "|{}|{}|{}|{}|{}",
                    p.name,
                    p.position,
                    short_type_name(&p.type_name),
                    p.required,
                    or_dash(&p.description)
                )
            })
            .collect();
        out.push_str(&rows.join("\n"));
        out.push_str("\n|===\n\n");
    }

    if !method.exceptions.is_empty() {
        out.push_str("==== Exceptions\n\n[cols=\"headers\"]\n|===\n|Code|Documentation\n");
        let rows: Vec<String> = method
            .exceptions
            .iter()
            .map(|e| format!("|{}|{}", e.code, or_dash(&e.description)))
            .collect();
        out.push_str(&rows.join("\n"));
        out.push_str("\n|===\n\n");
    }

    out.push_str(&format!(
        "==== Result type\n\n`{}`\n\n",
        short_type_name(&method.result_type)
    ));
    out
}

/// Drop module paths: `core::option::Option<alloc::string::String>` becomes `Option<String>`
pub fn short_type_name(type_name: &str) -> String {
    let mut out = String::with_capacity(type_name.len());
    let mut segment = String::new();
    for c in type_name.chars() {
        if c.is_alphanumeric() || c == '_' || c == ':' {
            segment.push(c);
        } else {
            out.push_str(last_path_segment(&segment));
            segment.clear();
            out.push(c);
        }
    }
    out.push_str(last_path_segment(&segment));
    out
}

fn last_path_segment(path: &str) -> &str {
    path.rsplit("::").next().unwrap_or(path)
}
