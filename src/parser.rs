//! Recursive descent parser for the stylesheet dialect

use crate::ast::*;
use crate::error::{CompilerError, Result};
use crate::lexer::{Lexer, Token, TokenType};
use regex::Regex;

pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    filename: String,
    property_regex: Regex,
}

impl Parser {
    pub fn new(tokens: Vec<Token>, filename: impl Into<String>) -> Self {
        Self {
            tokens,
            current: 0,
            filename: filename.into(),
            property_regex: Regex::new(r"^(--|-|\*)?[A-Za-z_][-A-Za-z0-9_]*$").unwrap(),
        }
    }

    pub fn parse(&mut self) -> Result<Stylesheet> {
        let items = self.parse_items(true)?;
        Ok(Stylesheet { items })
    }

    fn parse_items(&mut self, top_level: bool) -> Result<Vec<Node>> {
        let mut items = Vec::new();
        let mut pending_comments = Vec::new();

        loop {
            let token_type = self.peek().token_type.clone();
            match token_type {
                TokenType::Eof => {
                    if !top_level {
                        return Err(self.error("Expected '}' before end of input"));
                    }
                    break;
                }
                TokenType::RightBrace => {
                    if top_level {
                        return Err(self.error("Unexpected '}'"));
                    }
                    break;
                }
                TokenType::Comment(text) => {
                    pending_comments.push(Comment::new(text));
                    self.advance();
                }
                TokenType::Semicolon => {
                    self.advance();
                }
                TokenType::AtKeyword(_) => {
                    flush_comments(&mut items, &mut pending_comments);
                    items.push(self.parse_at_rule()?);
                }
                _ => {
                    if self.starts_block() {
                        flush_comments(&mut items, &mut pending_comments);
                        items.push(Node::Ruleset(self.parse_ruleset()?));
                    } else if top_level {
                        return Err(self.error(format!(
                            "Declaration outside of a block: {}",
                            self.peek().token_type
                        )));
                    } else {
                        let comments = std::mem::take(&mut pending_comments);
                        let declaration = self.parse_declaration(comments)?;
                        items.push(Node::Declaration(declaration));
                    }
                }
            }
        }

        flush_comments(&mut items, &mut pending_comments);
        Ok(items)
    }

    /// True if a `{` comes before the next `;` or `}`.
    fn starts_block(&self) -> bool {
        for token in &self.tokens[self.current..] {
            match token.token_type {
                TokenType::LeftBrace => return true,
                TokenType::Semicolon | TokenType::RightBrace | TokenType::Eof => return false,
                _ => {}
            }
        }
        false
    }

    fn parse_block(&mut self) -> Result<Block> {
        self.consume(TokenType::LeftBrace, "Expected '{'")?;
        let items = self.parse_items(false)?;
        self.consume(TokenType::RightBrace, "Expected '}'")?;
        Ok(Block::new(items))
    }

    fn parse_ruleset(&mut self) -> Result<Ruleset> {
        let location = self.location();
        let mut selectors = Vec::new();
        let mut current_selector: Vec<Token> = Vec::new();

        while !self.check(&TokenType::LeftBrace) {
            let token = self.advance().clone();
            match token.token_type {
                TokenType::Comma => {
                    selectors.push(join_tokens(&current_selector));
                    current_selector.clear();
                }
                TokenType::Comment(_) => {}
                _ => current_selector.push(token),
            }
        }
        selectors.push(join_tokens(&current_selector));

        if selectors.iter().any(|s| s.is_empty()) {
            return Err(CompilerError::parse(
                self.filename.clone(),
                location.line,
                location.column,
                "Empty selector",
            ));
        }

        let block = self.parse_block()?;
        Ok(Ruleset {
            selectors,
            block,
            location,
        })
    }

    fn parse_at_rule(&mut self) -> Result<Node> {
        let location = self.location();
        let name = match self.advance().token_type.clone() {
            TokenType::AtKeyword(name) => name,
            _ => return Err(self.error("Expected at-rule")),
        };

        let mut prelude_tokens = Vec::new();
        loop {
            let token = self.peek().clone();
            match token.token_type {
                TokenType::LeftBrace | TokenType::Semicolon => break,
                TokenType::RightBrace | TokenType::Eof => {
                    return Err(self.error(format!("Unterminated @{} rule", name)));
                }
                TokenType::Comment(_) => {
                    self.advance();
                }
                _ => {
                    self.advance();
                    prelude_tokens.push(token);
                }
            }
        }

        if name == "defmixin" {
            let (mixin_name, parameters) = match prelude_tokens.as_slice() {
                [Token {
                    token_type: TokenType::Function { name, arguments },
                    ..
                }] => (name.clone(), arguments.clone()),
                _ => return Err(self.error("Expected '@defmixin NAME(PARAMETERS)'")),
            };
            let block = self.parse_block()?;
            return Ok(Node::MixinDefinition(MixinDefinition {
                name: mixin_name,
                parameters,
                block,
                location,
            }));
        }

        let prelude = join_tokens(&prelude_tokens);
        let block = if self.check(&TokenType::LeftBrace) {
            Some(self.parse_block()?)
        } else {
            self.consume(TokenType::Semicolon, "Expected ';' after at-rule")?;
            None
        };

        Ok(Node::AtRule(AtRule {
            name,
            prelude,
            block,
            location,
        }))
    }

    fn parse_declaration(&mut self, comments: Vec<Comment>) -> Result<Declaration> {
        let location = self.location();
        let property = match self.advance().token_type.clone() {
            TokenType::Word(word) if self.property_regex.is_match(&word) => word,
            other => {
                return Err(CompilerError::parse(
                    self.filename.clone(),
                    location.line,
                    location.column,
                    format!("Expected property name, found '{}'", other),
                ))
            }
        };

        self.consume(TokenType::Colon, "Expected ':' after property name")?;

        let mut value = PropertyValue::default();
        loop {
            let token = self.peek().clone();
            match token.token_type {
                TokenType::Semicolon => {
                    self.advance();
                    break;
                }
                TokenType::RightBrace | TokenType::Eof => break,
                TokenType::LeftBrace | TokenType::AtKeyword(_) => {
                    return Err(self.error(format!(
                        "Unexpected '{}' in value of '{}'",
                        token.token_type, property
                    )));
                }
                TokenType::Comment(_) => {}
                TokenType::Important => value.push(ValueNode::Priority("!important".to_string())),
                TokenType::Function { name, arguments } => {
                    push_function(&mut value, name, arguments, token.preceded_by_space)
                }
                TokenType::Comma => value.push(ValueNode::Literal(",".to_string())),
                TokenType::Word(text) => push_literal(&mut value, text, token.preceded_by_space),
                TokenType::Colon => push_literal(&mut value, ":".to_string(), token.preceded_by_space),
                TokenType::Parenthesized(inner) => value.push(ValueNode::Literal(format!("({})", inner))),
            }
            self.advance();
        }

        if value.without_priority().is_empty() {
            return Err(CompilerError::parse(
                self.filename.clone(),
                location.line,
                location.column,
                format!("Missing value for property '{}'", property),
            ));
        }

        Ok(Declaration::new(property, value, location).with_comments(comments))
    }

    fn location(&self) -> SourceLocation {
        let token = self.peek();
        SourceLocation::new(token.line, token.column)
    }

    fn error(&self, message: impl Into<String>) -> CompilerError {
        let token = self.peek();
        CompilerError::parse(self.filename.clone(), token.line, token.column, message)
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        &self.tokens[self.current - 1]
    }

    fn is_at_end(&self) -> bool {
        self.peek().token_type == TokenType::Eof
    }

    fn check(&self, token_type: &TokenType) -> bool {
        &self.peek().token_type == token_type
    }

    fn consume(&mut self, token_type: TokenType, message: &str) -> Result<&Token> {
        if self.check(&token_type) {
            Ok(self.advance())
        } else {
            Err(self.error(format!("{}, found '{}'", message, self.peek().token_type)))
        }
    }
}

fn flush_comments(items: &mut Vec<Node>, comments: &mut Vec<Comment>) {
    items.extend(comments.drain(..).map(Node::Comment));
}

/// Literals written without whitespace between them (`a:b`) stay one literal.
fn push_literal(value: &mut PropertyValue, text: String, preceded_by_space: bool) {
    if !preceded_by_space {
        if let Some(ValueNode::Literal(previous)) = value.nodes.last_mut() {
            if previous != "," {
                previous.push_str(&text);
                return;
            }
        }
    }
    value.push(ValueNode::Literal(text));
}

/// A call glued to a literal (`progid:Foo.bar(...)`) is kept as part of it.
fn push_function(value: &mut PropertyValue, name: String, arguments: String, preceded_by_space: bool) {
    if !preceded_by_space && matches!(value.nodes.last(), Some(ValueNode::Literal(previous)) if previous != ",") {
        push_literal(value, format!("{}({})", name, arguments), false);
    } else {
        value.push(ValueNode::Function { name, arguments });
    }
}

fn join_tokens(tokens: &[Token]) -> String {
    let mut text = String::new();
    for (i, token) in tokens.iter().enumerate() {
        if i > 0 && token.preceded_by_space {
            text.push(' ');
        }
        text.push_str(&token.token_type.to_string());
    }
    text
}

/// Tokenize and parse a stylesheet in one step.
pub fn parse_stylesheet(source: &str, filename: &str) -> Result<Stylesheet> {
    let mut lexer = Lexer::new(source, filename);
    let tokens = lexer.tokenize()?;
    let mut parser = Parser::new(tokens, filename);
    parser.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_ruleset(sheet: &Stylesheet) -> &Ruleset {
        match &sheet.items[0] {
            Node::Ruleset(ruleset) => ruleset,
            other => panic!("Expected ruleset, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_simple_ruleset() {
        let sheet = parse_stylesheet(".a, .b > c:hover { display: flex; color: red }", "test.css").unwrap();
        let ruleset = first_ruleset(&sheet);
        assert_eq!(ruleset.selectors, vec![".a".to_string(), ".b > c:hover".to_string()]);

        let declarations: Vec<_> = ruleset.block.declarations().collect();
        assert_eq!(declarations.len(), 2);
        assert_eq!(declarations[0].property, "display");
        assert_eq!(declarations[0].value_text(), "flex");
        assert_eq!(declarations[1].property, "color");
        assert_eq!(declarations[0].provenance, Provenance::Original);
    }

    #[test]
    fn test_parse_function_and_priority() {
        let sheet = parse_stylesheet(
            "a { background-image: linear-gradient(red, blue) !important; }",
            "test.css",
        )
        .unwrap();
        let declaration = first_ruleset(&sheet).block.declarations().next().unwrap();
        assert_eq!(
            declaration.value.nodes,
            vec![
                ValueNode::function("linear-gradient", "red, blue"),
                ValueNode::Priority("!important".to_string()),
            ]
        );
    }

    #[test]
    fn test_comments_attach_to_declaration() {
        let sheet = parse_stylesheet("a { /* keep */ order: 1; }", "test.css").unwrap();
        let declaration = first_ruleset(&sheet).block.declarations().next().unwrap();
        assert_eq!(declaration.comments, vec![Comment::new("/* keep */")]);
    }

    #[test]
    fn test_parse_mixin_definition_and_at_rules() {
        let source = r#"
            @import url(base.css);
            @defmixin flexbox(DIR) { display: flex; flex-direction: DIR; }
            @media (max-width: 600px) { .a { order: 2; } }
        "#;
        let sheet = parse_stylesheet(source, "test.css").unwrap();
        assert_eq!(sheet.items.len(), 3);

        match &sheet.items[0] {
            Node::AtRule(rule) => {
                assert_eq!(rule.name, "import");
                assert_eq!(rule.prelude, "url(base.css)");
                assert!(rule.block.is_none());
            }
            other => panic!("Expected at-rule, got {:?}", other),
        }
        match &sheet.items[1] {
            Node::MixinDefinition(mixin) => {
                assert_eq!(mixin.name, "flexbox");
                assert_eq!(mixin.parameters, "DIR");
                assert_eq!(mixin.block.declarations().count(), 2);
            }
            other => panic!("Expected mixin definition, got {:?}", other),
        }
        match &sheet.items[2] {
            Node::AtRule(rule) => {
                assert_eq!(rule.name, "media");
                assert_eq!(rule.prelude, "(max-width: 600px)");
                assert!(matches!(rule.block.as_ref().unwrap().items[0], Node::Ruleset(_)));
            }
            other => panic!("Expected media rule, got {:?}", other),
        }
    }

    #[test]
    fn test_declaration_location() {
        let sheet = parse_stylesheet("a {\n  display: grid;\n}", "test.css").unwrap();
        let declaration = first_ruleset(&sheet).block.declarations().next().unwrap();
        assert_eq!(declaration.location, SourceLocation::new(2, 3));
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_stylesheet("a { display: flex;", "test.css").is_err());
        assert!(parse_stylesheet("display: flex;", "test.css").is_err());
        assert!(parse_stylesheet("a { display: ; }", "test.css").is_err());
        assert!(parse_stylesheet("a { 12px: red; }", "test.css").is_err());

        match parse_stylesheet("a {\n  color red; }", "broken.css") {
            Err(CompilerError::Parse { file, line, .. }) => {
                assert_eq!(file, "broken.css");
                assert_eq!(line, 2);
            }
            other => panic!("Expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_comment_between_values_keeps_them_apart() {
        let sheet = parse_stylesheet("a { border: 1px/**/solid red; }", "test.css").unwrap();
        let declaration = first_ruleset(&sheet).block.declarations().next().unwrap();
        assert_eq!(
            declaration.value.nodes,
            vec![
                ValueNode::Literal("1px".to_string()),
                ValueNode::Literal("solid".to_string()),
                ValueNode::Literal("red".to_string()),
            ]
        );
        assert_eq!(declaration.value_text(), "1px solid red");
    }

    #[test]
    fn test_function_glued_to_literal() {
        let sheet = parse_stylesheet(
            "a { filter: progid:DXImageTransform.Microsoft.gradient(startColorstr='#80000000'); }",
            "test.css",
        )
        .unwrap();
        let declaration = first_ruleset(&sheet).block.declarations().next().unwrap();
        assert_eq!(
            declaration.value.nodes,
            vec![ValueNode::Literal(
                "progid:DXImageTransform.Microsoft.gradient(startColorstr='#80000000')".to_string()
            )]
        );

        let sheet = parse_stylesheet("a { width: calc(1px + 2px); }", "test.css").unwrap();
        let declaration = first_ruleset(&sheet).block.declarations().next().unwrap();
        assert_eq!(declaration.value.nodes, vec![ValueNode::function("calc", "1px + 2px")]);
    }
}
