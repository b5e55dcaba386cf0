//! JSX lowering.
//!
//! Rewrites JSX elements and fragments into classic runtime calls:
//! `__jsx(type, props, ...children)`, where `__jsx` and `__Fragment` are bound
//! by [`JSX_RUNTIME_IMPORT`].

use std::collections::HashMap;

use lazy_static::lazy_static;
use oxc_allocator::{Allocator, Box as oxc_box, CloneIn};
use oxc_ast::ast::*;
use oxc_ast::AstBuilder;
use oxc_ast_visit::walk_mut::walk_expression;
use oxc_ast_visit::VisitMut;
use oxc_span::SPAN;
use regex::{Captures, Regex};

pub const JSX_FACTORY: &str = "__jsx";
pub const JSX_FRAGMENT: &str = "__Fragment";

/// Prepended to every module that had JSX lowered.
pub const JSX_RUNTIME_IMPORT: &str =
    "import { createElement as __jsx, Fragment as __Fragment } from \"react\";\n";

lazy_static! {
    static ref ENTITY_RE: Regex =
        Regex::new(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|[A-Za-z][A-Za-z0-9]*);").unwrap();

    /// Named character references accepted in JSX text and attribute strings.
    static ref NAMED_ENTITIES: HashMap<&'static str, char> = {
        let mut m = HashMap::new();
        m.insert("amp", '&');
        m.insert("lt", '<');
        m.insert("gt", '>');
        m.insert("quot", '"');
        m.insert("apos", '\'');
        m.insert("nbsp", '\u{a0}');
        m.insert("copy", '\u{a9}');
        m.insert("reg", '\u{ae}');
        m.insert("trade", '\u{2122}');
        m.insert("hellip", '\u{2026}');
        m.insert("mdash", '\u{2014}');
        m.insert("ndash", '\u{2013}');
        m.insert("lsquo", '\u{2018}');
        m.insert("rsquo", '\u{2019}');
        m.insert("ldquo", '\u{201c}');
        m.insert("rdquo", '\u{201d}');
        m.insert("laquo", '\u{ab}');
        m.insert("raquo", '\u{bb}');
        m.insert("bull", '\u{2022}');
        m.insert("middot", '\u{b7}');
        m.insert("times", '\u{d7}');
        m.insert("divide", '\u{f7}');
        m.insert("deg", '\u{b0}');
        m.insert("plusmn", '\u{b1}');
        m.insert("larr", '\u{2190}');
        m.insert("rarr", '\u{2192}');
        m.insert("uarr", '\u{2191}');
        m.insert("darr", '\u{2193}');
        m.insert("euro", '\u{20ac}');
        m.insert("pound", '\u{a3}');
        m.insert("yen", '\u{a5}');
        m.insert("cent", '\u{a2}');
        m.insert("sect", '\u{a7}');
        m.insert("para", '\u{b6}');
        m.insert("hearts", '\u{2665}');
        m.insert("check", '\u{2713}');
        m
    };
}

/// Decodes HTML character references. Unknown references are left as written.
pub fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    ENTITY_RE
        .replace_all(text, |caps: &Captures| {
            let body = &caps[1];
            let decoded = if let Some(hex) = body
                .strip_prefix("#x")
                .or_else(|| body.strip_prefix("#X"))
            {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = body.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                NAMED_ENTITIES.get(body).copied()
            };
            decoded
                .map(String::from)
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Collapses JSX text the way React's compilers do: lines are trimmed where
/// they meet a line break, whitespace-only lines vanish, and the surviving
/// lines are joined with a single space. Returns `None` when nothing is left.
pub fn clean_jsx_text(raw: &str) -> Option<String> {
    let lines: Vec<&str> = raw.split(['\n', '\r']).collect();
    let last_non_empty = lines
        .iter()
        .rposition(|line| line.chars().any(|c| c != ' ' && c != '\t'))
        .unwrap_or(0);

    let mut out = String::new();
    for (idx, line) in lines.iter().enumerate() {
        let mut trimmed = line.replace('\t', " ");
        if idx != 0 {
            trimmed = trimmed.trim_start_matches(' ').to_string();
        }
        if idx != lines.len() - 1 {
            trimmed = trimmed.trim_end_matches(' ').to_string();
        }
        if trimmed.is_empty() {
            continue;
        }
        out.push_str(&trimmed);
        if idx != last_non_empty {
            out.push(' ');
        }
    }

    if out.is_empty() {
        None
    } else {
        Some(decode_entities(&out))
    }
}

fn is_identifier_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

pub struct JsxLowerer<'a> {
    pub ast: AstBuilder<'a>,
    /// Number of elements and fragments rewritten.
    pub lowered: usize,
}

impl<'a> JsxLowerer<'a> {
    pub fn new(allocator: &'a Allocator) -> Self {
        Self {
            ast: AstBuilder::new(allocator),
            lowered: 0,
        }
    }

    fn property_key(&self, name: &str) -> PropertyKey<'a> {
        let atom = self.ast.allocator.alloc_str(name);
        if is_identifier_name(name) {
            PropertyKey::StaticIdentifier(self.ast.alloc(self.ast.identifier_name(SPAN, atom)))
        } else {
            PropertyKey::StringLiteral(self.ast.alloc(self.ast.string_literal(SPAN, atom, None)))
        }
    }

    fn string_expression(&self, value: &str) -> Expression<'a> {
        let atom = self.ast.allocator.alloc_str(value);
        self.ast.expression_string_literal(SPAN, atom, None)
    }

    fn element_type(&self, name: &JSXElementName<'a>) -> Expression<'a> {
        match name {
            JSXElementName::Identifier(id) => self.string_expression(&id.name),
            JSXElementName::IdentifierReference(id) => {
                self.ast.expression_identifier(SPAN, id.name)
            }
            JSXElementName::NamespacedName(ns) => {
                self.string_expression(&format!("{}:{}", ns.namespace.name, ns.name.name))
            }
            JSXElementName::MemberExpression(member) => self.member_type(member),
            JSXElementName::ThisExpression(_) => self.ast.expression_this(SPAN),
        }
    }

    fn member_type(&self, member: &JSXMemberExpression<'a>) -> Expression<'a> {
        let object = match &member.object {
            JSXMemberExpressionObject::IdentifierReference(id) => {
                self.ast.expression_identifier(SPAN, id.name)
            }
            JSXMemberExpressionObject::MemberExpression(inner) => self.member_type(inner),
            JSXMemberExpressionObject::ThisExpression(_) => self.ast.expression_this(SPAN),
        };
        Expression::from(self.ast.member_expression_static(
            SPAN,
            object,
            self.ast.identifier_name(SPAN, member.property.name),
            false,
        ))
    }

    fn lower_props(&mut self, attributes: &[JSXAttributeItem<'a>]) -> Expression<'a> {
        let mut props = self.ast.vec();

        for item in attributes {
            match item {
                JSXAttributeItem::Attribute(attr) => {
                    let key = match &attr.name {
                        JSXAttributeName::Identifier(id) => self.property_key(&id.name),
                        JSXAttributeName::NamespacedName(ns) => {
                            self.property_key(&format!("{}:{}", ns.namespace.name, ns.name.name))
                        }
                    };

                    let value = match &attr.value {
                        Some(JSXAttributeValue::StringLiteral(s)) => {
                            self.string_expression(&decode_entities(&s.value))
                        }
                        Some(JSXAttributeValue::Element(el)) => self.lower_jsx_element(el),
                        Some(JSXAttributeValue::Fragment(frag)) => self.lower_jsx_fragment(frag),
                        Some(JSXAttributeValue::ExpressionContainer(container)) => {
                            self.lower_jsx_expression(&container.expression)
                        }
                        None => self.ast.expression_boolean_literal(SPAN, true),
                    };

                    props.push(self.ast.object_property_kind_object_property(
                        SPAN,
                        PropertyKind::Init,
                        key,
                        value,
                        false,
                        false,
                        false,
                    ));
                }
                JSXAttributeItem::SpreadAttribute(spread) => {
                    let mut argument = spread.argument.clone_in(self.ast.allocator);
                    self.visit_expression(&mut argument);
                    props.push(self.ast.object_property_kind_spread_property(SPAN, argument));
                }
            }
        }

        if props.is_empty() {
            self.ast.expression_null_literal(SPAN)
        } else {
            self.ast.expression_object(SPAN, props)
        }
    }

    fn lower_children(
        &mut self,
        children: &[JSXChild<'a>],
        args: &mut oxc_allocator::Vec<'a, Argument<'a>>,
    ) {
        for child in children {
            match child {
                JSXChild::Text(text) => {
                    if let Some(cleaned) = clean_jsx_text(&text.value) {
                        args.push(Argument::from(self.string_expression(&cleaned)));
                    }
                }
                JSXChild::Element(el) => {
                    args.push(Argument::from(self.lower_jsx_element(el)));
                }
                JSXChild::Fragment(frag) => {
                    args.push(Argument::from(self.lower_jsx_fragment(frag)));
                }
                JSXChild::ExpressionContainer(container) => {
                    if matches!(container.expression, JSXExpression::EmptyExpression(_)) {
                        continue;
                    }
                    args.push(Argument::from(self.lower_jsx_expression(&container.expression)));
                }
                JSXChild::Spread(spread) => {
                    let mut argument = spread.expression.clone_in(self.ast.allocator);
                    self.visit_expression(&mut argument);
                    args.push(self.ast.argument_spread_element(SPAN, argument));
                }
            }
        }
    }

    fn factory_call(&self, args: oxc_allocator::Vec<'a, Argument<'a>>) -> Expression<'a> {
        self.ast.expression_call(
            SPAN,
            self.ast.expression_identifier(SPAN, JSX_FACTORY),
            None::<oxc_box<TSTypeParameterInstantiation>>,
            args,
            false,
        )
    }

    fn lower_jsx_element(&mut self, element: &JSXElement<'a>) -> Expression<'a> {
        self.lowered += 1;
        let mut args = self.ast.vec();
        args.push(Argument::from(self.element_type(&element.opening_element.name)));
        args.push(Argument::from(
            self.lower_props(&element.opening_element.attributes),
        ));
        self.lower_children(&element.children, &mut args);
        self.factory_call(args)
    }

    fn lower_jsx_fragment(&mut self, fragment: &JSXFragment<'a>) -> Expression<'a> {
        self.lowered += 1;
        let mut args = self.ast.vec();
        args.push(Argument::from(
            self.ast.expression_identifier(SPAN, JSX_FRAGMENT),
        ));
        args.push(Argument::from(self.ast.expression_null_literal(SPAN)));
        self.lower_children(&fragment.children, &mut args);
        self.factory_call(args)
    }

    fn lower_jsx_expression(&mut self, jsx_expr: &JSXExpression<'a>) -> Expression<'a> {
        if let Some(mut e) = jsx_expr
            .as_expression()
            .map(|e| e.clone_in(self.ast.allocator))
        {
            self.visit_expression(&mut e);
            e
        } else {
            self.ast.expression_identifier(SPAN, "undefined")
        }
    }
}

impl<'a> VisitMut<'a> for JsxLowerer<'a> {
    fn visit_expression(&mut self, expr: &mut Expression<'a>) {
        match expr {
            Expression::JSXElement(element) => {
                let lowered = self.lower_jsx_element(element);
                *expr = lowered;
            }
            Expression::JSXFragment(fragment) => {
                let lowered = self.lower_jsx_fragment(fragment);
                *expr = lowered;
            }
            _ => {
                walk_expression(self, expr);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxc_codegen::Codegen;
    use oxc_parser::Parser;
    use oxc_span::SourceType;

    fn lower(code: &str) -> (String, usize) {
        let allocator = Allocator::default();
        let source_type = SourceType::default().with_module(true).with_jsx(true);
        let mut ret = Parser::new(&allocator, code, source_type).parse();
        assert!(ret.errors.is_empty(), "{:?}", ret.errors);
        let mut lowerer = JsxLowerer::new(&allocator);
        lowerer.visit_program(&mut ret.program);
        (Codegen::new().build(&ret.program).code, lowerer.lowered)
    }

    #[test]
    fn test_intrinsic_and_component_tags() {
        let (code, count) = lower(r#"const a = <div className="x"><Button onClick={go} /></div>;"#);
        assert_eq!(count, 2);
        assert!(code.contains("__jsx(\"div\""));
        assert!(code.contains("__jsx(Button"));
        assert!(code.contains("className: \"x\""));
        assert!(!code.contains('<'));
    }

    #[test]
    fn test_fragment_and_member_tags() {
        let (code, _) = lower("const a = <><Foo.Bar /></>;");
        assert!(code.contains("__jsx(__Fragment, null"));
        assert!(code.contains("Foo.Bar"));
    }

    #[test]
    fn test_dashed_attribute_keys_are_quoted() {
        let (code, _) = lower(r#"const a = <div aria-label="hi" disabled />;"#);
        assert!(code.contains("\"aria-label\": \"hi\""));
        assert!(code.contains("disabled: true"));
    }

    #[test]
    fn test_nested_jsx_in_expressions() {
        let (code, count) = lower("const a = <ul>{items.map(i => <li key={i}>{i}</li>)}</ul>;");
        assert_eq!(count, 2);
        assert!(code.contains("__jsx(\"li\""));
    }

    #[test]
    fn test_empty_expression_is_dropped() {
        let (code, _) = lower("const a = <div>{/* note */}</div>;");
        assert!(code.contains("__jsx(\"div\", null)"));
    }

    #[test]
    fn test_no_jsx_lowers_nothing() {
        let (_, count) = lower("export const x = 1 < 2;");
        assert_eq!(count, 0);
    }

    #[test]
    fn test_clean_jsx_text() {
        assert_eq!(clean_jsx_text("  hello  "), Some("  hello  ".to_string()));
        assert_eq!(
            clean_jsx_text("\n    Hello\n    world\n  "),
            Some("Hello world".to_string())
        );
        assert_eq!(clean_jsx_text("\n   \n  "), None);
        assert_eq!(clean_jsx_text("a &amp; b"), Some("a & b".to_string()));
        assert_eq!(clean_jsx_text(" "), Some(" ".to_string()));
        assert_eq!(clean_jsx_text("\t"), Some(" ".to_string()));
    }

    #[test]
    fn test_space_between_expressions_is_kept_once() {
        let (code, _) = lower("const p = <p>{a} {b}</p>;");
        assert!(code.contains("__jsx(\"p\", null, a, \" \", b)"));
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("&lt;tag&gt;"), "<tag>");
        assert_eq!(decode_entities("&#65;&#x42;"), "AB");
        assert_eq!(decode_entities("&unknown;"), "&unknown;");
        assert_eq!(decode_entities("&copy; 2024"), "\u{a9} 2024");
    }
}
