//! Schema Parser
//!
//! Minimal recursive-descent parser for the protobuf IDL subset the compiler
//! understands, plus the `.wire` profile format. Parsing is pure: the same
//! text and location always produce the same unlinked file.
//!
//! Declared types get their fully qualified [`ProtoType`] here; references
//! stay as written and are resolved by the linker.

mod lexer;

use std::fmt;

use thiserror::Error;

use crate::location::Location;
use crate::profile::{ProfileFileElement, TypeConfig};
use crate::schema::{
    EnumConstant, EnumType, Extend, Field, Label, MessageType, OneOf, OptionElement,
    OptionValue, ProtoFile, ProtoType, Rpc, Service, Type,
};
use lexer::{Token, TokenKind};

/// A syntax error with its position
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{location}:{line}:{column}: {message}")]
pub struct ParseError {
    pub location: Location,
    pub line: usize,
    pub column: usize,
    pub message: String,
}

/// Parse a `.proto` file
pub fn parse(location: &Location, source: &str) -> Result<ProtoFile, ParseError> {
    let tokens = lexer::tokenize(location, source)?;
    let mut parser = Parser::new(location, tokens);
    let mut file = parser.parse_file()?;
    let package = file.package_name.clone();
    for ty in &mut file.types {
        qualify(ty, package.as_deref());
    }
    for service in &mut file.services {
        service.ty = ProtoType::named(package.as_deref(), &service.ty.to_string());
    }
    Ok(file)
}

/// Parse a `<backend>.wire` profile file
pub fn parse_profile(location: &Location, source: &str) -> Result<ProfileFileElement, ParseError> {
    let tokens = lexer::tokenize(location, source)?;
    Parser::new(location, tokens).parse_profile_file()
}

/// Prefix a parsed type tree (named relative to the file) with its package
fn qualify(ty: &mut Type, package: Option<&str>) {
    let qualified = ProtoType::named(package, &ty.ty().to_string());
    *ty.ty_mut() = qualified;
    for nested in ty.nested_types_mut() {
        qualify(nested, package);
    }
}

// =============================================================================
// Parser
// =============================================================================

struct Parser<'a> {
    location: &'a Location,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(location: &'a Location, tokens: Vec<Token>) -> Self {
        Self {
            location,
            tokens,
            pos: 0,
        }
    }

    // --- token helpers ---

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> Option<&TokenKind> {
        self.peek().map(|token| &token.kind)
    }

    fn next(&mut self) -> Result<Token, ParseError> {
        let token = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or_else(|| self.error_at_end("unexpected end of file"))?;
        self.pos += 1;
        Ok(token)
    }

    fn line(&self) -> usize {
        self.peek()
            .or_else(|| self.tokens.last())
            .map(|token| token.line)
            .unwrap_or(1)
    }

    fn error(&self, token: &Token, message: impl fmt::Display) -> ParseError {
        ParseError {
            location: self.location.clone(),
            line: token.line,
            column: token.column,
            message: message.to_string(),
        }
    }

    fn error_at_end(&self, message: &str) -> ParseError {
        let (line, column) = self
            .tokens
            .last()
            .map(|token| (token.line, token.column))
            .unwrap_or((1, 1));
        ParseError {
            location: self.location.clone(),
            line,
            column,
            message: message.to_string(),
        }
    }

    fn is_symbol(&self, symbol: char) -> bool {
        self.peek_kind() == Some(&TokenKind::Symbol(symbol))
    }

    fn is_word(&self, word: &str) -> bool {
        matches!(self.peek_kind(), Some(TokenKind::Ident(ident)) if ident == word)
    }

    fn eat_symbol(&mut self, symbol: char) -> bool {
        if self.is_symbol(symbol) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_word(&mut self, word: &str) -> bool {
        if self.is_word(word) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_symbol(&mut self, symbol: char) -> Result<(), ParseError> {
        let token = self.next()?;
        if token.kind == TokenKind::Symbol(symbol) {
            Ok(())
        } else {
            Err(self.error(&token, format!("expected '{}'", symbol)))
        }
    }

    fn expect_word(&mut self, word: &str) -> Result<(), ParseError> {
        let token = self.next()?;
        match &token.kind {
            TokenKind::Ident(ident) if ident == word => Ok(()),
            _ => Err(self.error(&token, format!("expected '{}'", word))),
        }
    }

    fn ident(&mut self) -> Result<String, ParseError> {
        let token = self.next()?;
        match token.kind {
            TokenKind::Ident(ident) => Ok(ident),
            _ => Err(self.error(&token, "expected an identifier")),
        }
    }

    /// Dotted name with an optional leading `.`
    fn name(&mut self) -> Result<String, ParseError> {
        let mut name = String::new();
        if self.eat_symbol('.') {
            name.push('.');
        }
        name.push_str(&self.ident()?);
        while self.is_symbol('.') {
            self.pos += 1;
            name.push('.');
            name.push_str(&self.ident()?);
        }
        Ok(name)
    }

    fn string(&mut self) -> Result<String, ParseError> {
        let token = self.next()?;
        match token.kind {
            TokenKind::Str(mut value) => {
                // Adjacent literals concatenate.
                while let Some(TokenKind::Str(more)) = self.peek_kind() {
                    value.push_str(more);
                    self.pos += 1;
                }
                Ok(value)
            }
            _ => Err(self.error(&token, "expected a string literal")),
        }
    }

    fn number<T: std::str::FromStr>(&mut self) -> Result<T, ParseError> {
        let token = self.next()?;
        let parsed = match &token.kind {
            TokenKind::Number(text) => parse_integer(text),
            _ => None,
        };
        parsed
            .and_then(|value| T::from_str(&value.to_string()).ok())
            .ok_or_else(|| self.error(&token, "expected an integer"))
    }

    /// Documentation attached to the upcoming token
    fn documentation(&self) -> String {
        self.peek().map(|token| token.documentation.clone()).unwrap_or_default()
    }

    /// Raw text up to (not including) the terminating `;`, consumed
    fn raw_until_semicolon(&mut self) -> Result<String, ParseError> {
        let mut parts = Vec::new();
        while !self.is_symbol(';') {
            parts.push(render_token(&self.next()?.kind));
        }
        self.expect_symbol(';')?;
        Ok(join_raw(&parts))
    }

    // --- file ---

    fn parse_file(&mut self) -> Result<ProtoFile, ParseError> {
        let mut file = ProtoFile::empty(self.location.clone());
        while let Some(token) = self.peek().cloned() {
            let TokenKind::Ident(keyword) = &token.kind else {
                if self.eat_symbol(';') {
                    continue;
                }
                return Err(self.error(&token, "expected a declaration"));
            };
            match keyword.as_str() {
                "syntax" | "edition" => {
                    self.pos += 1;
                    self.expect_symbol('=')?;
                    file.syntax = Some(self.string()?);
                    self.expect_symbol(';')?;
                }
                "package" => {
                    self.pos += 1;
                    if file.package_name.is_some() {
                        return Err(self.error(&token, "too many package names"));
                    }
                    file.package_name = Some(self.name()?);
                    self.expect_symbol(';')?;
                }
                "import" => {
                    self.pos += 1;
                    let public = self.eat_word("public");
                    if !public {
                        // Weak imports load like regular ones.
                        self.eat_word("weak");
                    }
                    let path = self.string()?;
                    self.expect_symbol(';')?;
                    if public {
                        file.public_imports.push(path);
                    } else {
                        file.imports.push(path);
                    }
                }
                "option" => {
                    self.pos += 1;
                    file.options.push(self.option_body()?);
                    self.expect_symbol(';')?;
                }
                "message" => file.types.push(Type::Message(self.message(None)?)),
                "enum" => file.types.push(Type::Enum(self.enum_type(None)?)),
                "service" => file.services.push(self.service()?),
                "extend" => file.extend_list.push(self.extend()?),
                other => return Err(self.error(&token, format!("unexpected '{}'", other))),
            }
        }
        Ok(file)
    }

    // --- options ---

    /// `name = value` where name may be `(custom.ext).field`
    fn option_body(&mut self) -> Result<OptionElement, ParseError> {
        let mut name = String::new();
        while !self.is_symbol('=') {
            let token = self.next()?;
            match token.kind {
                TokenKind::Ident(ident) => name.push_str(&ident),
                TokenKind::Symbol(c @ ('(' | ')' | '.')) => name.push(c),
                _ => return Err(self.error(&token, "expected an option name")),
            }
        }
        self.expect_symbol('=')?;
        let value = self.option_value()?;
        Ok(OptionElement { name, value })
    }

    fn option_value(&mut self) -> Result<OptionValue, ParseError> {
        match self.peek_kind() {
            Some(TokenKind::Str(_)) => Ok(OptionValue::String(self.string()?)),
            Some(TokenKind::Symbol('{')) => {
                let mut depth = 0usize;
                let mut parts = Vec::new();
                loop {
                    let token = self.next()?;
                    match token.kind {
                        TokenKind::Symbol('{') => depth += 1,
                        TokenKind::Symbol('}') => depth -= 1,
                        _ => {}
                    }
                    parts.push(render_token(&token.kind));
                    if depth == 0 {
                        break;
                    }
                }
                Ok(OptionValue::Raw(join_raw(&parts)))
            }
            Some(TokenKind::Symbol('.')) | Some(TokenKind::Ident(_)) => Ok(OptionValue::Raw(self.name()?)),
            _ => {
                let token = self.next()?;
                match token.kind {
                    TokenKind::Number(number) => Ok(OptionValue::Raw(number)),
                    TokenKind::Symbol('-') => Ok(OptionValue::Raw(format!("-{}", self.ident()?))),
                    _ => Err(self.error(&token, "expected an option value")),
                }
            }
        }
    }

    /// Optional `[a = b, c = d]` after a field or enum constant
    fn field_options(&mut self) -> Result<Vec<OptionElement>, ParseError> {
        let mut options = Vec::new();
        if self.eat_symbol('[') {
            loop {
                options.push(self.option_body()?);
                if !self.eat_symbol(',') {
                    break;
                }
            }
            self.expect_symbol(']')?;
        }
        Ok(options)
    }

    // --- messages ---

    fn message(&mut self, enclosing: Option<&str>) -> Result<MessageType, ParseError> {
        let documentation = self.documentation();
        let line = self.line();
        self.expect_word("message")?;
        let name = self.ident()?;
        let relative = nested_name(enclosing, &name);
        self.expect_symbol('{')?;

        let mut message = MessageType {
            ty: ProtoType::Named(relative.clone()),
            location: self.location.clone(),
            line,
            documentation,
            fields: Vec::new(),
            one_ofs: Vec::new(),
            nested_types: Vec::new(),
            nested_extends: Vec::new(),
            options: Vec::new(),
            reserved: Vec::new(),
            extensions: Vec::new(),
        };

        while !self.eat_symbol('}') {
            if self.eat_symbol(';') {
                continue;
            }
            let token = self
                .peek()
                .cloned()
                .ok_or_else(|| self.error_at_end("unterminated message"))?;
            let keyword = match &token.kind {
                TokenKind::Ident(ident) => ident.clone(),
                _ => return Err(self.error(&token, "expected a field or declaration")),
            };
            match keyword.as_str() {
                "message" => message
                    .nested_types
                    .push(Type::Message(self.message(Some(&relative))?)),
                "enum" => message
                    .nested_types
                    .push(Type::Enum(self.enum_type(Some(&relative))?)),
                "extend" => message.nested_extends.push(self.extend()?),
                "oneof" => message.one_ofs.push(self.one_of()?),
                "option" => {
                    self.pos += 1;
                    message.options.push(self.option_body()?);
                    self.expect_symbol(';')?;
                }
                "reserved" => {
                    self.pos += 1;
                    message.reserved.push(self.raw_until_semicolon()?);
                }
                "extensions" => {
                    self.pos += 1;
                    message.extensions.push(self.raw_until_semicolon()?);
                }
                "group" => return Err(self.error(&token, "groups are not supported")),
                _ => message.fields.push(self.field(true)?),
            }
        }
        Ok(message)
    }

    fn field(&mut self, allow_label: bool) -> Result<Field, ParseError> {
        let documentation = self.documentation();
        let line = self.line();
        let label = if !allow_label {
            None
        } else if self.eat_word("optional") {
            Some(Label::Optional)
        } else if self.eat_word("required") {
            Some(Label::Required)
        } else if self.eat_word("repeated") {
            Some(Label::Repeated)
        } else {
            None
        };
        let element_type = self.field_type()?;
        let name = self.ident()?;
        self.expect_symbol('=')?;
        let tag = self.number::<u32>()?;
        let options = self.field_options()?;
        self.expect_symbol(';')?;
        Ok(Field {
            location: self.location.clone(),
            line,
            documentation,
            label,
            name,
            tag,
            element_type,
            ty: None,
            options,
        })
    }

    fn field_type(&mut self) -> Result<String, ParseError> {
        let is_map = self.is_word("map")
            && matches!(
                self.tokens.get(self.pos + 1).map(|token| &token.kind),
                Some(TokenKind::Symbol('<'))
            );
        if !is_map {
            return self.name();
        }
        self.pos += 2;
        let key = self.name()?;
        self.expect_symbol(',')?;
        let value = self.name()?;
        self.expect_symbol('>')?;
        Ok(format!("map<{}, {}>", key, value))
    }

    fn one_of(&mut self) -> Result<OneOf, ParseError> {
        let documentation = self.documentation();
        self.expect_word("oneof")?;
        let name = self.ident()?;
        self.expect_symbol('{')?;
        let mut fields = Vec::new();
        while !self.eat_symbol('}') {
            if self.eat_symbol(';') {
                continue;
            }
            if self.eat_word("option") {
                self.option_body()?;
                self.expect_symbol(';')?;
                continue;
            }
            fields.push(self.field(false)?);
        }
        Ok(OneOf {
            name,
            documentation,
            fields,
        })
    }

    // --- enums ---

    fn enum_type(&mut self, enclosing: Option<&str>) -> Result<EnumType, ParseError> {
        let documentation = self.documentation();
        let line = self.line();
        self.expect_word("enum")?;
        let name = self.ident()?;
        self.expect_symbol('{')?;

        let mut enum_type = EnumType {
            ty: ProtoType::Named(nested_name(enclosing, &name)),
            location: self.location.clone(),
            line,
            documentation,
            constants: Vec::new(),
            options: Vec::new(),
            reserved: Vec::new(),
        };

        while !self.eat_symbol('}') {
            if self.eat_symbol(';') {
                continue;
            }
            if self.eat_word("option") {
                enum_type.options.push(self.option_body()?);
                self.expect_symbol(';')?;
                continue;
            }
            if self.eat_word("reserved") {
                enum_type.reserved.push(self.raw_until_semicolon()?);
                continue;
            }
            let documentation = self.documentation();
            let line = self.line();
            let name = self.ident()?;
            self.expect_symbol('=')?;
            let tag = self.number::<i32>()?;
            let options = self.field_options()?;
            self.expect_symbol(';')?;
            enum_type.constants.push(EnumConstant {
                name,
                tag,
                line,
                documentation,
                options,
            });
        }
        Ok(enum_type)
    }

    // --- services ---

    fn service(&mut self) -> Result<Service, ParseError> {
        let documentation = self.documentation();
        let line = self.line();
        self.expect_word("service")?;
        let name = self.ident()?;
        self.expect_symbol('{')?;

        let mut service = Service {
            ty: ProtoType::Named(name),
            location: self.location.clone(),
            line,
            documentation,
            rpcs: Vec::new(),
            options: Vec::new(),
        };

        while !self.eat_symbol('}') {
            if self.eat_symbol(';') {
                continue;
            }
            if self.eat_word("option") {
                service.options.push(self.option_body()?);
                self.expect_symbol(';')?;
                continue;
            }
            service.rpcs.push(self.rpc()?);
        }
        Ok(service)
    }

    fn rpc(&mut self) -> Result<Rpc, ParseError> {
        let documentation = self.documentation();
        let line = self.line();
        self.expect_word("rpc")?;
        let name = self.ident()?;

        self.expect_symbol('(')?;
        let request_streaming = self.stream_keyword();
        let request_element = self.name()?;
        self.expect_symbol(')')?;

        self.expect_word("returns")?;

        self.expect_symbol('(')?;
        let response_streaming = self.stream_keyword();
        let response_element = self.name()?;
        self.expect_symbol(')')?;

        let mut options = Vec::new();
        if self.eat_symbol('{') {
            while !self.eat_symbol('}') {
                if self.eat_symbol(';') {
                    continue;
                }
                self.expect_word("option")?;
                options.push(self.option_body()?);
                self.expect_symbol(';')?;
            }
            self.eat_symbol(';');
        } else {
            self.expect_symbol(';')?;
        }

        Ok(Rpc {
            name,
            line,
            documentation,
            request_element,
            response_element,
            request_streaming,
            response_streaming,
            request_type: None,
            response_type: None,
            options,
        })
    }

    /// `stream` is a keyword only when a type name follows it
    fn stream_keyword(&mut self) -> bool {
        let followed_by_name = matches!(
            self.tokens.get(self.pos + 1).map(|token| &token.kind),
            Some(TokenKind::Ident(_)) | Some(TokenKind::Symbol('.'))
        );
        if self.is_word("stream") && followed_by_name {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    // --- extensions ---

    fn extend(&mut self) -> Result<Extend, ParseError> {
        let documentation = self.documentation();
        let line = self.line();
        self.expect_word("extend")?;
        let element_type = self.name()?;
        self.expect_symbol('{')?;
        let mut fields = Vec::new();
        while !self.eat_symbol('}') {
            if self.eat_symbol(';') {
                continue;
            }
            fields.push(self.field(true)?);
        }
        Ok(Extend {
            location: self.location.clone(),
            line,
            documentation,
            element_type,
            ty: None,
            fields,
        })
    }

    // --- profiles ---

    fn parse_profile_file(&mut self) -> Result<ProfileFileElement, ParseError> {
        let mut profile = ProfileFileElement {
            location: self.location.clone(),
            package_name: None,
            imports: Vec::new(),
            type_configs: Vec::new(),
        };
        while let Some(token) = self.peek().cloned() {
            if self.eat_symbol(';') {
                continue;
            }
            let keyword = match &token.kind {
                TokenKind::Ident(ident) => ident.clone(),
                _ => return Err(self.error(&token, "expected a profile declaration")),
            };
            self.pos += 1;
            match keyword.as_str() {
                "syntax" => {
                    self.expect_symbol('=')?;
                    let syntax = self.string()?;
                    if syntax != "wire2" {
                        return Err(self.error(&token, format!("expected syntax \"wire2\", was \"{}\"", syntax)));
                    }
                    self.expect_symbol(';')?;
                }
                "package" => {
                    profile.package_name = Some(self.name()?);
                    self.expect_symbol(';')?;
                }
                "import" => {
                    profile.imports.push(self.string()?);
                    self.expect_symbol(';')?;
                }
                "type" => profile.type_configs.push(self.type_config(&token)?),
                other => return Err(self.error(&token, format!("unexpected '{}'", other))),
            }
        }
        Ok(profile)
    }

    /// `type a.B { target X using Y; with Z; }` (the `type` keyword already consumed)
    fn type_config(&mut self, start: &Token) -> Result<TypeConfig, ParseError> {
        let ty = self.field_type()?;
        self.expect_symbol('{')?;
        let mut config = TypeConfig {
            location: self.location.clone(),
            line: start.line,
            documentation: start.documentation.clone(),
            ty,
            target: None,
            adapter: None,
            annotations: Vec::new(),
        };
        while !self.eat_symbol('}') {
            if self.eat_symbol(';') {
                continue;
            }
            let token = self.next()?;
            match &token.kind {
                TokenKind::Ident(word) if word == "target" => {
                    config.target = Some(self.java_name()?);
                    if self.eat_word("using") {
                        config.adapter = Some(self.java_name()?);
                    }
                    self.expect_symbol(';')?;
                }
                TokenKind::Ident(word) if word == "with" => {
                    config.annotations.push(self.raw_until_semicolon()?);
                }
                _ => return Err(self.error(&token, "expected 'target' or 'with'")),
            }
        }
        Ok(config)
    }

    /// Target-language name: dotted, with optional `#MEMBER` and generics
    fn java_name(&mut self) -> Result<String, ParseError> {
        let mut parts = Vec::new();
        while !self.is_symbol(';') && !self.is_word("using") {
            parts.push(render_token(&self.next()?.kind));
        }
        if parts.is_empty() {
            let token = self.next()?;
            return Err(self.error(&token, "expected a type name"));
        }
        Ok(parts.concat())
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn nested_name(enclosing: Option<&str>, name: &str) -> String {
    match enclosing {
        Some(enclosing) => format!("{}.{}", enclosing, name),
        None => name.to_string(),
    }
}

fn parse_integer(text: &str) -> Option<i64> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let value = if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).ok()?
    } else if digits.len() > 1 && digits.starts_with('0') {
        i64::from_str_radix(&digits[1..], 8).ok()?
    } else {
        digits.parse::<i64>().ok()?
    };
    Some(if negative { -value } else { value })
}

fn render_token(kind: &TokenKind) -> String {
    match kind {
        TokenKind::Ident(text) | TokenKind::Number(text) => text.clone(),
        TokenKind::Str(text) => format!("{:?}", text),
        TokenKind::Symbol(c) => c.to_string(),
    }
}

/// Join raw tokens with single spaces, except around `.` and `#` and after `@`
fn join_raw(parts: &[String]) -> String {
    let mut out = String::new();
    for (index, part) in parts.iter().enumerate() {
        let previous = if index > 0 { parts[index - 1].as_str() } else { "" };
        let glue = index > 0
            && !matches!(part.as_str(), "." | "," | ":" | "#")
            && !matches!(previous, "." | "#" | "@");
        if glue {
            out.push(' ');
        }
        out.push_str(part);
    }
    out
}
