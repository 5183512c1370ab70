//! Grammar Glue
//!
//! The tokenizer and rule grammar are consumed as `cssparser` callbacks;
//! this module implements those callbacks and builds the rule/sheet model
//! from them. It never tokenizes text itself. `@import` targets are
//! fetched through the context's loader and parsed eagerly, here.

use std::rc::Rc;

use cssparser::{
    AtRuleParser, BasicParseErrorKind, CowRcStr, DeclarationParser, ParseError, Parser,
    ParserInput, ParserState, QualifiedRuleParser, RuleBodyItemParser, RuleBodyParser,
    StyleSheetParser, Token,
};

use crate::declaration::{Origin, StyleDeclaration};
use crate::error::{CssError, CssResult};
use crate::media::MediaList;
use crate::rule::{CssRule, ImportRule, MediaRule, StyleRule, StyleSheet};
use crate::selector::{
    AttrOp, Combinator, ComplexSelector, CompoundSelector, PseudoClass, Selector, SelectorList,
    SimpleSelector,
};
use crate::value::{CssValue, Rgba, Unit};

/// Resolves an `@import` URI to stylesheet text.
pub type ImportLoader = dyn Fn(&str) -> CssResult<String>;

const MAX_IMPORT_DEPTH: usize = 8;

/// Per-session parser configuration.
#[derive(Clone, Default)]
pub struct ParseContext {
    pub loader: Option<Rc<ImportLoader>>,
    depth: usize,
}

impl ParseContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_loader(loader: Rc<ImportLoader>) -> Self {
        Self {
            loader: Some(loader),
            depth: 0,
        }
    }

    fn nested(&self) -> Self {
        Self {
            loader: self.loader.clone(),
            depth: self.depth + 1,
        }
    }
}

// ---- public entry points ----------------------------------------------

/// Parse a full stylesheet. Invalid rules are skipped (and logged); a
/// failed `@import` aborts with a Syntax error naming the URI.
pub fn parse_stylesheet(css: &str, ctx: &ParseContext) -> CssResult<StyleSheet> {
    let mut input = ParserInput::new(css);
    let mut parser = Parser::new(&mut input);
    let mut rule_parser = RuleParser::new(ctx);
    let mut sheet = StyleSheet::new();
    {
        let mut iter = StyleSheetParser::new(&mut parser, &mut rule_parser);
        while let Some(result) = iter.next() {
            match result {
                Ok(rule) => sheet.rules.push(rule),
                Err((error, slice)) => {
                    tracing::debug!(?error, rule = slice, "skipping invalid rule");
                }
            }
        }
    }
    if let Some(error) = rule_parser.import_error.take() {
        return Err(error);
    }
    Ok(sheet)
}

/// Parse exactly one rule through a transient parser session.
pub fn parse_rule(text: &str, ctx: &ParseContext) -> CssResult<CssRule> {
    let mut input = ParserInput::new(text);
    let mut parser = Parser::new(&mut input);
    let mut rule_parser = RuleParser::new(ctx);
    let mut rules = Vec::new();
    let mut failed = false;
    {
        let mut iter = StyleSheetParser::new(&mut parser, &mut rule_parser);
        while let Some(result) = iter.next() {
            match result {
                Ok(rule) => rules.push(rule),
                Err(_) => failed = true,
            }
        }
    }
    if let Some(error) = rule_parser.import_error.take() {
        return Err(error);
    }
    if failed || rules.len() != 1 {
        return Err(CssError::syntax(text, "expected exactly one rule"));
    }
    rules
        .into_iter()
        .next()
        .ok_or_else(|| CssError::syntax(text, "expected exactly one rule"))
}

/// Parse a declaration list. Strict mode fails on the first invalid
/// declaration; lenient mode skips it, which is the behavior for inline
/// style attributes.
pub fn parse_declaration_list(text: &str, strict: bool) -> CssResult<StyleDeclaration> {
    let mut input = ParserInput::new(text);
    let mut parser = Parser::new(&mut input);
    let mut declaration = StyleDeclaration::new();
    let mut decl_parser = DeclParser;
    let mut iter = RuleBodyParser::new(&mut parser, &mut decl_parser);
    while let Some(result) = iter.next() {
        match result {
            Ok(prop) => declaration.set_property_with_origin(
                &prop.name,
                prop.value,
                prop.important,
                Origin::Author,
            ),
            Err((_, slice)) => {
                if strict {
                    return Err(CssError::syntax(slice, "invalid declaration"));
                }
                tracing::debug!(declaration = slice, "skipping invalid declaration");
            }
        }
    }
    Ok(declaration)
}

/// Parse a single value.
pub fn parse_value(text: &str) -> CssResult<CssValue> {
    let mut input = ParserInput::new(text);
    let mut parser = Parser::new(&mut input);
    let (value, _important) = parse_value_with_priority(&mut parser)
        .map_err(|_| CssError::syntax(text, "invalid value"))?;
    Ok(value)
}

/// Parse a comma-separated selector list.
pub fn parse_selector_list(text: &str) -> CssResult<SelectorList> {
    let mut input = ParserInput::new(text);
    let mut parser = Parser::new(&mut input);
    parse_selector_list_tokens(&mut parser).map_err(|_| CssError::syntax(text, "invalid selector"))
}

/// Parse a media list of comma-separated names.
pub fn parse_media_list(text: &str) -> MediaList {
    let mut input = ParserInput::new(text);
    let mut parser = Parser::new(&mut input);
    parse_media_tokens(&mut parser)
}

// ---- rule parser callbacks --------------------------------------------

struct RuleParser<'c> {
    ctx: &'c ParseContext,
    import_error: Option<CssError>,
}

impl<'c> RuleParser<'c> {
    fn new(ctx: &'c ParseContext) -> Self {
        Self {
            ctx,
            import_error: None,
        }
    }

    /// Fetch and parse an import target, eagerly, at parse time.
    fn load_import(&self, uri: &str) -> CssResult<StyleSheet> {
        if self.ctx.depth >= MAX_IMPORT_DEPTH {
            return Err(CssError::syntax(uri, "import nesting too deep"));
        }
        let loader = self
            .ctx
            .loader
            .as_ref()
            .ok_or_else(|| CssError::syntax(uri, "no import loader configured"))?;
        let css = loader(uri).map_err(|e| CssError::syntax(uri, e.to_string()))?;
        let mut sheet = parse_stylesheet(&css, &self.ctx.nested())?;
        sheet.href = Some(uri.to_owned());
        Ok(sheet)
    }
}

enum AtPrelude {
    Media(MediaList),
    Import(ImportRule),
}

impl<'i> AtRuleParser<'i> for RuleParser<'_> {
    type Prelude = AtPrelude;
    type AtRule = CssRule;
    type Error = ();

    fn parse_prelude<'t>(
        &mut self,
        name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::Prelude, ParseError<'i, Self::Error>> {
        if name.eq_ignore_ascii_case("media") {
            Ok(AtPrelude::Media(parse_media_tokens(input)))
        } else if name.eq_ignore_ascii_case("import") {
            let uri = input.expect_url_or_string()?.as_ref().to_owned();
            let media = parse_media_tokens(input);
            match self.load_import(&uri) {
                Ok(mut sheet) => {
                    sheet.media = media.clone();
                    Ok(AtPrelude::Import(ImportRule { uri, media, sheet }))
                }
                Err(error) => {
                    self.import_error = Some(error);
                    Err(input.new_error(BasicParseErrorKind::AtRuleInvalid(name)))
                }
            }
        } else {
            tracing::debug!(rule = %name, "skipping unknown at-rule");
            Err(input.new_error(BasicParseErrorKind::AtRuleInvalid(name)))
        }
    }

    fn parse_block<'t>(
        &mut self,
        prelude: Self::Prelude,
        _start: &ParserState,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::AtRule, ParseError<'i, Self::Error>> {
        match prelude {
            AtPrelude::Media(media) => {
                let mut rules = Vec::new();
                {
                    let mut iter = RuleBodyParser::new(input, self);
                    while let Some(result) = iter.next() {
                        match result {
                            Ok(rule) => rules.push(rule),
                            Err((error, slice)) => {
                                tracing::debug!(
                                    ?error,
                                    rule = slice,
                                    "skipping invalid rule in media block"
                                );
                            }
                        }
                    }
                }
                Ok(CssRule::Media(MediaRule { media, rules }))
            }
            AtPrelude::Import(_) => Err(input.new_error(BasicParseErrorKind::AtRuleBodyInvalid)),
        }
    }

    fn rule_without_block(
        &mut self,
        prelude: Self::Prelude,
        _start: &ParserState,
    ) -> Result<Self::AtRule, Self::Error> {
        match prelude {
            AtPrelude::Import(rule) => Ok(CssRule::Import(rule)),
            AtPrelude::Media(_) => Err(()),
        }
    }
}

impl<'i> QualifiedRuleParser<'i> for RuleParser<'_> {
    type Prelude = SelectorList;
    type QualifiedRule = CssRule;
    type Error = ();

    fn parse_prelude<'t>(
        &mut self,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::Prelude, ParseError<'i, Self::Error>> {
        parse_selector_list_tokens(input)
    }

    fn parse_block<'t>(
        &mut self,
        prelude: Self::Prelude,
        _start: &ParserState,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::QualifiedRule, ParseError<'i, Self::Error>> {
        let declaration = parse_declarations_from_block(input);
        Ok(CssRule::Style(StyleRule {
            selectors: prelude,
            declaration,
        }))
    }
}

// Media blocks hold rules, not declarations; this parser never produces
// a declaration but the body-parser plumbing requires the impl.
impl<'i> DeclarationParser<'i> for RuleParser<'_> {
    type Declaration = CssRule;
    type Error = ();

    fn parse_value<'t>(
        &mut self,
        _name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
        _decl_start: &ParserState,
    ) -> Result<Self::Declaration, ParseError<'i, Self::Error>> {
        Err(input.new_error(BasicParseErrorKind::QualifiedRuleInvalid))
    }
}

impl<'i> RuleBodyItemParser<'i, CssRule, ()> for RuleParser<'_> {
    fn parse_declarations(&self) -> bool {
        false
    }
    fn parse_qualified(&self) -> bool {
        true
    }
}

// ---- declaration parser callbacks -------------------------------------

struct ParsedProperty {
    name: String,
    value: CssValue,
    important: bool,
}

struct DeclParser;

impl<'i> DeclarationParser<'i> for DeclParser {
    type Declaration = ParsedProperty;
    type Error = ();

    fn parse_value<'t>(
        &mut self,
        name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
        _decl_start: &ParserState,
    ) -> Result<Self::Declaration, ParseError<'i, Self::Error>> {
        let (value, important) = parse_value_with_priority(input)?;
        Ok(ParsedProperty {
            name: name.to_ascii_lowercase(),
            value,
            important,
        })
    }
}

impl<'i> AtRuleParser<'i> for DeclParser {
    type Prelude = ();
    type AtRule = ParsedProperty;
    type Error = ();

    fn parse_prelude<'t>(
        &mut self,
        _name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::Prelude, ParseError<'i, Self::Error>> {
        Err(input.new_error(BasicParseErrorKind::AtRuleBodyInvalid))
    }

    fn parse_block<'t>(
        &mut self,
        _prelude: Self::Prelude,
        _start: &ParserState,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::AtRule, ParseError<'i, Self::Error>> {
        Err(input.new_error(BasicParseErrorKind::AtRuleBodyInvalid))
    }

    fn rule_without_block(
        &mut self,
        _prelude: Self::Prelude,
        _start: &ParserState,
    ) -> Result<Self::AtRule, Self::Error> {
        Err(())
    }
}

impl<'i> QualifiedRuleParser<'i> for DeclParser {
    type Prelude = ();
    type QualifiedRule = ParsedProperty;
    type Error = ();

    fn parse_prelude<'t>(
        &mut self,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::Prelude, ParseError<'i, Self::Error>> {
        Err(input.new_error(BasicParseErrorKind::QualifiedRuleInvalid))
    }

    fn parse_block<'t>(
        &mut self,
        _prelude: Self::Prelude,
        _start: &ParserState,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::QualifiedRule, ParseError<'i, Self::Error>> {
        Err(input.new_error(BasicParseErrorKind::QualifiedRuleInvalid))
    }
}

impl<'i> RuleBodyItemParser<'i, ParsedProperty, ()> for DeclParser {
    fn parse_declarations(&self) -> bool {
        true
    }
    fn parse_qualified(&self) -> bool {
        false
    }
}

fn parse_declarations_from_block<'i>(input: &mut Parser<'i, '_>) -> StyleDeclaration {
    let mut declaration = StyleDeclaration::new();
    let mut decl_parser = DeclParser;
    let mut iter = RuleBodyParser::new(input, &mut decl_parser);
    while let Some(result) = iter.next() {
        match result {
            Ok(prop) => declaration.set_property_with_origin(
                &prop.name,
                prop.value,
                prop.important,
                Origin::Author,
            ),
            Err((error, slice)) => {
                tracing::debug!(?error, declaration = slice, "skipping invalid declaration");
            }
        }
    }
    declaration
}

// ---- value grammar -----------------------------------------------------

fn parse_value_with_priority<'i>(
    input: &mut Parser<'i, '_>,
) -> Result<(CssValue, bool), ParseError<'i, ()>> {
    let mut components = Vec::new();
    let mut important = false;
    loop {
        let token = match input.next() {
            Ok(t) => t.clone(),
            Err(_) => break,
        };
        if let Token::Delim('!') = token {
            let ident = input.expect_ident()?.clone();
            if ident.eq_ignore_ascii_case("important") && input.is_exhausted() {
                important = true;
                break;
            }
            return Err(input.new_error(BasicParseErrorKind::QualifiedRuleInvalid));
        }
        if let Some(value) = component_value(token, input)? {
            components.push(value);
        }
    }
    let value = match components.len() {
        0 => return Err(input.new_error(BasicParseErrorKind::QualifiedRuleInvalid)),
        1 => components.remove(0),
        _ => CssValue::List(components),
    };
    Ok((value, important))
}

fn component_value<'i>(
    token: Token<'i>,
    input: &mut Parser<'i, '_>,
) -> Result<Option<CssValue>, ParseError<'i, ()>> {
    let value = match token {
        Token::Ident(name) => {
            if name.eq_ignore_ascii_case("inherit") {
                Some(CssValue::Inherit)
            } else {
                Some(CssValue::Ident(name.as_ref().to_owned()))
            }
        }
        Token::QuotedString(s) => Some(CssValue::String(s.as_ref().to_owned())),
        Token::UnquotedUrl(u) => Some(CssValue::Uri(u.as_ref().to_owned())),
        Token::Number { value, .. } => Some(CssValue::Number(value)),
        Token::Percentage { unit_value, .. } => Some(CssValue::Percentage(unit_value * 100.0)),
        Token::Dimension { value, unit, .. } => {
            let unit = Unit::parse(unit.as_ref())
                .ok_or_else(|| input.new_error(BasicParseErrorKind::QualifiedRuleInvalid))?;
            Some(CssValue::Dimension(value, unit))
        }
        Token::Hash(hex) | Token::IDHash(hex) => {
            let color = hex_color(hex.as_ref())
                .ok_or_else(|| input.new_error(BasicParseErrorKind::QualifiedRuleInvalid))?;
            Some(CssValue::Color(color))
        }
        Token::Function(name) => {
            if name.eq_ignore_ascii_case("rgb") || name.eq_ignore_ascii_case("rgba") {
                let color = input.parse_nested_block(parse_rgb_args)?;
                Some(CssValue::Color(color))
            } else if name.eq_ignore_ascii_case("url") {
                let uri =
                    input.parse_nested_block(|p| Ok(p.expect_string()?.as_ref().to_owned()))?;
                Some(CssValue::Uri(uri))
            } else {
                return Err(input.new_error(BasicParseErrorKind::QualifiedRuleInvalid));
            }
        }
        Token::Comma => None,
        _ => return Err(input.new_error(BasicParseErrorKind::QualifiedRuleInvalid)),
    };
    Ok(value)
}

fn parse_rgb_args<'i, 't>(p: &mut Parser<'i, 't>) -> Result<Rgba, ParseError<'i, ()>> {
    let red = p.expect_number()?;
    p.expect_comma()?;
    let green = p.expect_number()?;
    p.expect_comma()?;
    let blue = p.expect_number()?;
    let alpha = if p.try_parse(|p| p.expect_comma()).is_ok() {
        p.expect_number()?
    } else {
        1.0
    };
    Ok(Rgba {
        red: channel(red),
        green: channel(green),
        blue: channel(blue),
        alpha: channel(alpha * 255.0),
    })
}

fn channel(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

fn hex_color(hex: &str) -> Option<Rgba> {
    let digit = |c: u8| (c as char).to_digit(16).map(|d| d as u8);
    let bytes = hex.as_bytes();
    match bytes.len() {
        3 => {
            let r = digit(bytes[0])?;
            let g = digit(bytes[1])?;
            let b = digit(bytes[2])?;
            Some(Rgba::opaque(r * 17, g * 17, b * 17))
        }
        6 => {
            let pair = |i: usize| Some(digit(bytes[i])? * 16 + digit(bytes[i + 1])?);
            Some(Rgba::opaque(pair(0)?, pair(2)?, pair(4)?))
        }
        _ => None,
    }
}

// ---- selector grammar --------------------------------------------------

#[derive(Default)]
struct SelectorBuilder {
    selectors: Vec<Selector>,
    compounds: Vec<CompoundSelector>,
    combinators: Vec<Combinator>,
    current: CompoundSelector,
    pending_combinator: Option<Combinator>,
    pending_ws: bool,
}

impl SelectorBuilder {
    /// Flush the previous compound when a new unit starts after a
    /// combinator or whitespace.
    fn begin_unit(&mut self) {
        if let Some(combinator) = self.pending_combinator.take() {
            self.compounds.push(std::mem::take(&mut self.current));
            self.combinators.push(combinator);
        } else if self.pending_ws && !self.current.is_empty() {
            self.compounds.push(std::mem::take(&mut self.current));
            self.combinators.push(Combinator::Descendant);
        }
        self.pending_ws = false;
    }

    fn push_simple(&mut self, simple: SimpleSelector) {
        self.begin_unit();
        self.current.simples.push(simple);
    }

    fn set_pseudo_element(&mut self, name: String) {
        self.begin_unit();
        self.current.pseudo_element = Some(name);
    }

    fn set_combinator(&mut self, combinator: Combinator) -> Result<(), ()> {
        if self.current.is_empty() {
            return Err(());
        }
        self.pending_combinator = Some(combinator);
        self.pending_ws = false;
        Ok(())
    }

    fn finish_selector(&mut self) -> Result<(), ()> {
        if self.current.is_empty() || self.pending_combinator.is_some() {
            return Err(());
        }
        let subject = std::mem::take(&mut self.current);
        let compounds = std::mem::take(&mut self.compounds);
        let combinators = std::mem::take(&mut self.combinators);

        let mut chain: Option<(ComplexSelector, Combinator)> = None;
        for (compound, combinator) in compounds.into_iter().zip(combinators) {
            let node = match chain.take() {
                None => ComplexSelector::Compound(compound),
                Some((ancestor, link)) => ComplexSelector::Combined {
                    ancestor: Box::new(ancestor),
                    combinator: link,
                    subject: compound,
                },
            };
            chain = Some((node, combinator));
        }
        let complex = match chain {
            None => ComplexSelector::Compound(subject),
            Some((ancestor, link)) => ComplexSelector::Combined {
                ancestor: Box::new(ancestor),
                combinator: link,
                subject,
            },
        };
        self.selectors.push(Selector { complex });
        self.pending_ws = false;
        Ok(())
    }
}

fn parse_selector_list_tokens<'i>(
    input: &mut Parser<'i, '_>,
) -> Result<SelectorList, ParseError<'i, ()>> {
    let mut builder = SelectorBuilder::default();
    loop {
        let token = match input.next_including_whitespace() {
            Ok(t) => t.clone(),
            Err(_) => break,
        };
        match token {
            Token::WhiteSpace(_) => {
                if !builder.current.is_empty() {
                    builder.pending_ws = true;
                }
            }
            Token::Comma => {
                builder
                    .finish_selector()
                    .map_err(|_| input.new_error(BasicParseErrorKind::QualifiedRuleInvalid))?;
            }
            Token::Delim('>') => {
                builder
                    .set_combinator(Combinator::Child)
                    .map_err(|_| input.new_error(BasicParseErrorKind::QualifiedRuleInvalid))?;
            }
            Token::Delim('+') => {
                builder
                    .set_combinator(Combinator::NextSibling)
                    .map_err(|_| input.new_error(BasicParseErrorKind::QualifiedRuleInvalid))?;
            }
            Token::Delim('*') => builder.push_simple(SimpleSelector::Universal),
            Token::Delim('.') => {
                let class = input.expect_ident()?.as_ref().to_owned();
                builder.push_simple(SimpleSelector::Class(class));
            }
            Token::Ident(name) => {
                builder.push_simple(SimpleSelector::Type(name.as_ref().to_owned()));
            }
            Token::IDHash(id) => {
                builder.push_simple(SimpleSelector::Id(id.as_ref().to_owned()));
            }
            Token::SquareBracketBlock => {
                let attr = input.parse_nested_block(parse_attr_selector)?;
                builder.push_simple(attr);
            }
            Token::Colon => {
                parse_pseudo(input, &mut builder)?;
            }
            _ => return Err(input.new_error(BasicParseErrorKind::QualifiedRuleInvalid)),
        }
    }
    builder
        .finish_selector()
        .map_err(|_| input.new_error(BasicParseErrorKind::QualifiedRuleInvalid))?;
    Ok(SelectorList(builder.selectors))
}

/// Single-colon pseudo-classes plus the CSS2 pseudo-elements; a doubled
/// colon always names a pseudo-element.
fn parse_pseudo<'i>(
    input: &mut Parser<'i, '_>,
    builder: &mut SelectorBuilder,
) -> Result<(), ParseError<'i, ()>> {
    let token = input.next_including_whitespace()?.clone();
    match token {
        Token::Colon => {
            let name = input.expect_ident()?.to_ascii_lowercase();
            builder.set_pseudo_element(name);
            Ok(())
        }
        Token::Ident(name) => {
            let lower = name.to_ascii_lowercase();
            if matches!(
                lower.as_str(),
                "before" | "after" | "first-line" | "first-letter"
            ) {
                // CSS2 pseudo-elements are reachable through a single colon.
                builder.set_pseudo_element(lower);
                return Ok(());
            }
            let pseudo = match lower.as_str() {
                "first-child" => PseudoClass::FirstChild,
                "last-child" => PseudoClass::LastChild,
                "root" => PseudoClass::Root,
                "empty" => PseudoClass::Empty,
                _ => return Err(input.new_error(BasicParseErrorKind::QualifiedRuleInvalid)),
            };
            builder.push_simple(SimpleSelector::PseudoClass(pseudo));
            Ok(())
        }
        Token::Function(name) => {
            if name.eq_ignore_ascii_case("lang") {
                let lang = input
                    .parse_nested_block(|p| Ok(p.expect_ident()?.as_ref().to_owned()))?;
                builder.push_simple(SimpleSelector::PseudoClass(PseudoClass::Lang(lang)));
                Ok(())
            } else {
                Err(input.new_error(BasicParseErrorKind::QualifiedRuleInvalid))
            }
        }
        _ => Err(input.new_error(BasicParseErrorKind::QualifiedRuleInvalid)),
    }
}

fn parse_attr_selector<'i, 't>(
    p: &mut Parser<'i, 't>,
) -> Result<SimpleSelector, ParseError<'i, ()>> {
    let name = p.expect_ident()?.as_ref().to_owned();
    let op = {
        let token = match p.next() {
            Ok(t) => t.clone(),
            Err(_) => {
                return Ok(SimpleSelector::Attr {
                    name,
                    op: AttrOp::Exists,
                    value: None,
                })
            }
        };
        match token {
            Token::Delim('=') => AttrOp::Equals,
            Token::IncludeMatch => AttrOp::Includes,
            Token::DashMatch => AttrOp::DashMatch,
            _ => return Err(p.new_error(BasicParseErrorKind::QualifiedRuleInvalid)),
        }
    };
    let value = match p.next() {
        Ok(Token::Ident(s)) => s.as_ref().to_owned(),
        Ok(Token::QuotedString(s)) => s.as_ref().to_owned(),
        _ => return Err(p.new_error(BasicParseErrorKind::QualifiedRuleInvalid)),
    };
    Ok(SimpleSelector::Attr {
        name,
        op,
        value: Some(value),
    })
}

fn parse_media_tokens<'i>(input: &mut Parser<'i, '_>) -> MediaList {
    let mut list = MediaList::new();
    loop {
        match input.next() {
            Ok(Token::Ident(name)) => {
                let name = name.as_ref().to_owned();
                list.append_medium(&name);
            }
            Ok(_) => {}
            Err(_) => break,
        }
    }
    list
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> ParseContext {
        ParseContext::default()
    }

    #[test]
    fn test_parse_simple_sheet() {
        let sheet = parse_stylesheet(
            ".foo { color: red; }\n#bar { width: 10px; }",
            &ctx(),
        )
        .unwrap();
        assert_eq!(sheet.len(), 2);
        let CssRule::Style(rule) = &sheet.rules[0] else {
            panic!("expected style rule");
        };
        assert_eq!(rule.declaration.get_property_value("color"), "red");
    }

    #[test]
    fn test_invalid_rule_is_skipped() {
        let sheet = parse_stylesheet(
            "%% { color: red; } .ok { color: blue; }",
            &ctx(),
        )
        .unwrap();
        assert_eq!(sheet.len(), 1);
        let CssRule::Style(rule) = &sheet.rules[0] else {
            panic!("expected style rule");
        };
        assert_eq!(rule.selectors.to_string(), ".ok");
    }

    #[test]
    fn test_important_priority() {
        let decl = parse_declaration_list("color: red !important; width: 10px", true).unwrap();
        assert_eq!(decl.get_property_priority("color"), "important");
        assert_eq!(decl.get_property_priority("width"), "");
    }

    #[test]
    fn test_strict_declaration_errors() {
        assert!(parse_declaration_list("color red", true).is_err());
        // Lenient mode drops the bad declaration and keeps going
        let decl = parse_declaration_list("color red; width: 1px", false).unwrap();
        assert_eq!(decl.len(), 1);
        assert_eq!(decl.get_property_value("width"), "1px");
    }

    #[test]
    fn test_value_forms() {
        assert_eq!(parse_value("red").unwrap(), CssValue::Ident("red".into()));
        assert_eq!(parse_value("inherit").unwrap(), CssValue::Inherit);
        assert_eq!(parse_value("10px").unwrap(), CssValue::Dimension(10.0, Unit::Px));
        assert_eq!(parse_value("50%").unwrap(), CssValue::Percentage(50.0));
        assert_eq!(
            parse_value("#ff0000").unwrap(),
            CssValue::Color(Rgba::opaque(255, 0, 0))
        );
        assert_eq!(
            parse_value("#f00").unwrap(),
            CssValue::Color(Rgba::opaque(255, 0, 0))
        );
        assert_eq!(
            parse_value("rgb(1, 2, 3)").unwrap(),
            CssValue::Color(Rgba::opaque(1, 2, 3))
        );
        assert_eq!(
            parse_value("serif sans-serif").unwrap(),
            CssValue::List(vec![
                CssValue::Ident("serif".into()),
                CssValue::Ident("sans-serif".into())
            ])
        );
    }

    #[test]
    fn test_media_rule_nesting() {
        let sheet = parse_stylesheet(
            "@media print { .page { width: 10px; } } .all { color: red; }",
            &ctx(),
        )
        .unwrap();
        assert_eq!(sheet.len(), 2);
        let CssRule::Media(media) = &sheet.rules[0] else {
            panic!("expected media rule");
        };
        assert_eq!(media.media.media_text(), "print");
        assert_eq!(media.rules.len(), 1);
    }

    #[test]
    fn test_import_without_loader_is_syntax_error() {
        let err = parse_stylesheet("@import url(missing.css);", &ctx()).unwrap_err();
        let CssError::Syntax { text, .. } = err else {
            panic!("expected syntax error");
        };
        assert_eq!(text, "missing.css");
    }

    #[test]
    fn test_import_loads_eagerly() {
        let loader: Rc<ImportLoader> = Rc::new(|uri: &str| {
            assert_eq!(uri, "base.css");
            Ok(".imported { color: green; }".to_owned())
        });
        let sheet = parse_stylesheet(
            "@import url(base.css) print;",
            &ParseContext::with_loader(loader),
        )
        .unwrap();
        assert_eq!(sheet.len(), 1);
        let CssRule::Import(import) = &sheet.rules[0] else {
            panic!("expected import rule");
        };
        assert_eq!(import.uri, "base.css");
        assert_eq!(import.media.media_text(), "print");
        assert_eq!(import.sheet.len(), 1);
        assert_eq!(import.sheet.href.as_deref(), Some("base.css"));
    }

    #[test]
    fn test_import_cycle_is_bounded() {
        let loader: Rc<ImportLoader> =
            Rc::new(|_uri: &str| Ok("@import url(loop.css);".to_owned()));
        let err = parse_stylesheet(
            "@import url(loop.css);",
            &ParseContext::with_loader(loader),
        )
        .unwrap_err();
        assert!(matches!(err, CssError::Syntax { .. }));
    }

    #[test]
    fn test_selector_list_parsing() {
        let list = parse_selector_list(".a > .b, #c rect::before").unwrap();
        assert_eq!(list.0.len(), 2);
        assert_eq!(list.0[0].to_string(), ".a > .b");
        assert_eq!(list.0[1].to_string(), "#c rect::before");
    }
}
