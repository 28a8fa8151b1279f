//! Thin layer over tree-sitter: parsing a [`SourceFile`] and pulling literal
//! text back out of syntax nodes.

use crate::error::{AnalyzerError, Result};
use crate::source::SourceFile;
use tree_sitter::{Node, Parser, Tree};

pub const IMPORT_STATEMENT: &str = "import_statement";
pub const IMPORT_FROM_STATEMENT: &str = "import_from_statement";

/// Owns a tree-sitter parser configured for Python.
pub struct SyntaxExtractor {
    parser: Parser,
}

impl SyntaxExtractor {
    pub fn new() -> Result<Self> {
        let mut parser = Parser::new();
        parser.set_language(&tree_sitter_python::LANGUAGE.into())?;
        Ok(Self { parser })
    }

    pub fn parse(&mut self, file: &SourceFile) -> Result<Tree> {
        self.parser
            .parse(file.text.as_bytes(), None)
            .ok_or_else(|| AnalyzerError::Parse(file.id.clone()))
    }
}

pub fn is_import(node: &Node) -> bool {
    matches!(node.kind(), IMPORT_STATEMENT | IMPORT_FROM_STATEMENT)
}

/// Returns the source text covered by `node`, which may span several lines.
pub fn extract_text(node: &Node, lines: &[String]) -> Option<String> {
    let start = node.start_position();
    let end = node.end_position();

    if start.row == end.row {
        return lines.get(start.row)?.get(start.column..end.column).map(str::to_string);
    }

    let mut text = String::new();
    text.push_str(lines.get(start.row)?.get(start.column..)?);
    for row in start.row + 1..end.row {
        text.push('\n');
        text.push_str(lines.get(row)?);
    }
    text.push('\n');
    text.push_str(lines.get(end.row)?.get(..end.column)?);
    Some(text)
}

/// Reconstructs a dotted name, leading relative dots included, by joining
/// the spans of its tokens in order.
///
/// Accepts `dotted_name`, `relative_import` and `import_prefix` nodes. Each
/// identifier token must sit on a single line.
pub fn extract_dotted_name(node: &Node, file: &SourceFile) -> Result<String> {
    let mut name = String::new();
    push_dotted_tokens(node, file, &mut name)?;
    Ok(name)
}

fn push_dotted_tokens(node: &Node, file: &SourceFile, out: &mut String) -> Result<()> {
    if node.kind() == "." {
        out.push('.');
        return Ok(());
    }

    if node.child_count() == 0 {
        let start = node.start_position();
        if start.row != node.end_position().row {
            return Err(AnalyzerError::MalformedIdentifier {
                file: file.id.clone(),
                line: start.row + 1,
            });
        }
        let text = extract_text(node, &file.lines).ok_or_else(|| {
            AnalyzerError::MalformedIdentifier {
                file: file.id.clone(),
                line: start.row + 1,
            }
        })?;
        out.push_str(&text);
        return Ok(());
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        push_dotted_tokens(&child, file, out)?;
    }
    Ok(())
}
