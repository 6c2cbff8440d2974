//! Placeholder scanning for `Fn::Sub` strings using logos

use logos::Logos;

/// Byte range in the substitution string
pub type Span = std::ops::Range<usize>;

#[derive(Logos, Debug, Clone, PartialEq)]
enum SubToken {
    /// `${!Literal}` is written out as `${Literal}` and never resolved
    #[regex(r"\$\{![^}]*\}")]
    Escaped,
    #[regex(r"\$\{[^}!][^}]*\}")]
    Placeholder,
    #[regex(r"[^$]+")]
    Text,
    #[token("$")]
    Dollar,
}

/// A `${Name}` or `${Name.Attribute}` placeholder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder<'a> {
    pub name: &'a str,
    pub attribute: Option<&'a str>,
    pub span: Span,
}

impl Placeholder<'_> {
    /// The placeholder body as written between the braces
    pub fn body(&self) -> String {
        match self.attribute {
            Some(attribute) => format!("{}.{}", self.name, attribute),
            None => self.name.to_string(),
        }
    }
}

/// Find every placeholder in a substitution string.
///
/// Unterminated `${` sequences and escaped `${!...}` blocks are literal text.
pub fn placeholders(template: &str) -> Vec<Placeholder<'_>> {
    let mut lexer = SubToken::lexer(template);
    let mut found = Vec::new();

    while let Some(token) = lexer.next() {
        if let Ok(SubToken::Placeholder) = token {
            let span = lexer.span();
            let inner = template[span.start + 2..span.end - 1].trim();
            let (name, attribute) = match inner.split_once('.') {
                Some((name, attribute)) => (name, Some(attribute)),
                None => (inner, None),
            };
            found.push(Placeholder {
                name,
                attribute,
                span,
            });
        }
    }

    found
}
