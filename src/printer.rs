//! Stylesheet serialization
//!
//! Pretty output indents nested blocks by two spaces and prints one
//! declaration per line, with its comments on the lines before it. Compact
//! output drops comments and all optional whitespace.

use crate::ast::*;

const INDENT: &str = "  ";

pub struct Printer {
    pretty: bool,
    output: String,
}

impl Printer {
    pub fn new(pretty: bool) -> Self {
        Self {
            pretty,
            output: String::new(),
        }
    }

    pub fn print(mut self, sheet: &Stylesheet) -> String {
        self.print_items(&sheet.items, 0);
        if self.pretty && !self.output.is_empty() && !self.output.ends_with('\n') {
            self.output.push('\n');
        }
        self.output
    }

    fn print_items(&mut self, items: &[Node], depth: usize) {
        let mut after_declaration = false;
        for node in items {
            if !self.pretty && matches!(node, Node::Comment(_)) {
                continue;
            }
            // Compact output separates declarations only, the last one needs no `;`.
            if !self.pretty && after_declaration {
                self.output.push(';');
            }
            self.print_node(node, depth);
            after_declaration = node.is_declaration();
        }
    }

    fn print_node(&mut self, node: &Node, depth: usize) {
        match node {
            Node::Declaration(declaration) => self.print_declaration(declaration, depth),
            Node::Ruleset(ruleset) => {
                let separator = if self.pretty { ", " } else { "," };
                let header = ruleset.selectors.join(separator);
                self.print_block(&header, &ruleset.block, depth);
            }
            Node::MixinDefinition(mixin) => {
                let header = format!("@defmixin {}({})", mixin.name, mixin.parameters);
                self.print_block(&header, &mixin.block, depth);
            }
            Node::AtRule(rule) => {
                let header = if rule.prelude.is_empty() {
                    format!("@{}", rule.name)
                } else {
                    format!("@{} {}", rule.name, rule.prelude)
                };
                match &rule.block {
                    Some(block) => self.print_block(&header, block, depth),
                    None => {
                        self.indent(depth);
                        self.output.push_str(&header);
                        self.output.push(';');
                        self.newline();
                    }
                }
            }
            Node::Comment(comment) => {
                self.indent(depth);
                self.output.push_str(comment.text());
                self.newline();
            }
        }
    }

    fn print_block(&mut self, header: &str, block: &Block, depth: usize) {
        self.indent(depth);
        self.output.push_str(header);
        if self.pretty {
            self.output.push_str(" {\n");
        } else {
            self.output.push('{');
        }

        self.print_items(&block.items, depth + 1);

        self.indent(depth);
        self.output.push('}');
        self.newline();
    }

    fn print_declaration(&mut self, declaration: &Declaration, depth: usize) {
        if self.pretty {
            for comment in &declaration.comments {
                self.indent(depth);
                self.output.push_str(comment.text());
                self.output.push('\n');
            }
            self.indent(depth);
            self.output
                .push_str(&format!("{}: {};\n", declaration.property, declaration.value));
        } else {
            self.output
                .push_str(&format!("{}:{}", declaration.property, compact_value(&declaration.value)));
        }
    }

    fn indent(&mut self, depth: usize) {
        if self.pretty {
            self.output.push_str(&INDENT.repeat(depth));
        }
    }

    fn newline(&mut self) {
        if self.pretty {
            self.output.push('\n');
        }
    }
}

/// Joins value nodes without the space after commas. Strings and function
/// arguments are left as written.
fn compact_value(value: &PropertyValue) -> String {
    let mut text = String::new();
    let mut after_comma = false;
    for (i, node) in value.nodes.iter().enumerate() {
        let is_comma = matches!(node, ValueNode::Literal(literal) if literal == ",");
        if i > 0 && !is_comma && !after_comma {
            text.push(' ');
        }
        text.push_str(&node.to_string());
        after_comma = is_comma;
    }
    text
}

pub fn print_stylesheet(sheet: &Stylesheet, pretty: bool) -> String {
    Printer::new(pretty).print(sheet)
}
