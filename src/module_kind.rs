//! Module-kind classification for JS-family files.
//!
//! The dispatcher only needs to know which module system a file speaks so it
//! can pick between the AMD, webpack and Node-style resolvers. Classification
//! works on [`SyntaxFacts`], a summary of the syntax that matters, which a
//! caller may supply from its own parse or which [`SourceClassifier`] derives
//! from the file's text with a lightweight token scan.

use std::fmt;
use std::path::Path;

use crate::collaborators::ModuleKindClassifier;
use crate::error::ResolveResult;

/// Module system of a JS-family file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleKind {
    Amd,
    CommonJs,
    Es6,
    Webpack,
}

impl ModuleKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ModuleKind::Amd => "amd",
            ModuleKind::CommonJs => "commonjs",
            ModuleKind::Es6 => "es6",
            ModuleKind::Webpack => "webpack",
        }
    }
}

impl fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The module-system relevant facts of a parsed file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyntaxFacts {
    /// A `define(...)` call that is not a member access.
    pub amd_define: bool,
    /// An `import`/`export` declaration or `import.meta`.
    pub es_module_syntax: bool,
    /// A `require(...)` call, `module.exports` or `exports.x`.
    pub commonjs: bool,
}

impl SyntaxFacts {
    /// Scan JavaScript source text. Comments, string contents and regular
    /// expression literals are skipped.
    pub fn from_source(source: &str) -> Self {
        let tokens = tokenize(source);
        let mut facts = SyntaxFacts::default();

        for (idx, token) in tokens.iter().enumerate() {
            let Token::Ident(word) = token else {
                continue;
            };
            let member_access = idx > 0 && tokens[idx - 1] == Token::Punct('.');
            if member_access {
                continue;
            }
            let next = tokens.get(idx + 1);
            let after = tokens.get(idx + 2);

            match word.as_str() {
                "define" if next == Some(&Token::Punct('(')) => facts.amd_define = true,
                "require" if next == Some(&Token::Punct('(')) => facts.commonjs = true,
                "module"
                    if next == Some(&Token::Punct('.'))
                        && after == Some(&Token::Ident("exports".to_string())) =>
                {
                    facts.commonjs = true
                }
                "exports" if next == Some(&Token::Punct('.')) => facts.commonjs = true,
                "import" => match next {
                    Some(Token::Ident(_)) | Some(Token::Str) => facts.es_module_syntax = true,
                    Some(Token::Punct('{')) | Some(Token::Punct('*')) => {
                        facts.es_module_syntax = true
                    }
                    Some(Token::Punct('.')) => facts.es_module_syntax = true,
                    _ => {}
                },
                "export" => match next {
                    Some(Token::Ident(_)) | Some(Token::Punct('{')) | Some(Token::Punct('*')) => {
                        facts.es_module_syntax = true
                    }
                    _ => {}
                },
                _ => {}
            }
        }

        facts
    }

    /// AMD wins over ES module syntax, which wins over CommonJS.
    pub fn classify(&self) -> Option<ModuleKind> {
        if self.amd_define {
            Some(ModuleKind::Amd)
        } else if self.es_module_syntax {
            Some(ModuleKind::Es6)
        } else if self.commonjs {
            Some(ModuleKind::CommonJs)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    Punct(char),
    Str,
}

fn tokenize(source: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = source.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            c if c.is_whitespace() => {}
            '/' if chars.peek() == Some(&'/') => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for c in chars.by_ref() {
                    if prev == '*' && c == '/' {
                        break;
                    }
                    prev = c;
                }
            }
            '/' if starts_regex(tokens.last()) => {
                skip_regex(&mut chars);
                tokens.push(Token::Str);
            }
            '"' | '\'' | '`' => {
                let quote = ch;
                let mut escaped = false;
                for c in chars.by_ref() {
                    if escaped {
                        escaped = false;
                    } else if c == '\\' {
                        escaped = true;
                    } else if c == quote {
                        break;
                    }
                }
                tokens.push(Token::Str);
            }
            c if c == '_' || c == '$' || c.is_alphanumeric() => {
                let mut word = String::from(c);
                while let Some(&next) = chars.peek() {
                    if next == '_' || next == '$' || next.is_alphanumeric() {
                        word.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(word));
            }
            c => tokens.push(Token::Punct(c)),
        }
    }

    tokens
}

/// Keywords after which `/` opens a regular expression rather than dividing.
const REGEX_PREFIX_KEYWORDS: [&str; 10] = [
    "return", "typeof", "instanceof", "in", "of", "new", "delete", "void", "throw", "case",
];

/// A `/` starts a regular expression unless it follows an operand.
fn starts_regex(previous: Option<&Token>) -> bool {
    match previous {
        None => true,
        Some(Token::Str) => false,
        Some(Token::Punct(c)) => !matches!(*c, ')' | ']' | '}'),
        Some(Token::Ident(word)) => REGEX_PREFIX_KEYWORDS.contains(&word.as_str()),
    }
}

/// Consume a regular expression body and its flags; the opening `/` is
/// already taken. Stops at a newline so a misread division cannot swallow
/// the rest of the file.
fn skip_regex(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) {
    let mut escaped = false;
    let mut in_class = false;
    while let Some(&c) = chars.peek() {
        if c == '\n' {
            return;
        }
        chars.next();
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '[' => in_class = true,
            ']' => in_class = false,
            '/' if !in_class => break,
            _ => {}
        }
    }
    while chars.peek().is_some_and(|c| c.is_alphanumeric()) {
        chars.next();
    }
}

/// Default classifier: uses supplied facts, otherwise scans the file.
///
/// An unreadable file classifies as unknown, which routes to the Node-style
/// resolver.
#[derive(Debug, Default)]
pub struct SourceClassifier;

impl ModuleKindClassifier for SourceClassifier {
    fn classify(
        &mut self,
        filename: &Path,
        syntax: Option<&SyntaxFacts>,
    ) -> ResolveResult<Option<ModuleKind>> {
        if let Some(facts) = syntax {
            return Ok(facts.classify());
        }

        match std::fs::read_to_string(filename) {
            Ok(source) => Ok(SyntaxFacts::from_source(&source).classify()),
            Err(err) => {
                tracing::debug!(
                    file = %filename.display(),
                    error = %err,
                    "could not read file for module kind detection"
                );
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind(source: &str) -> Option<ModuleKind> {
        SyntaxFacts::from_source(source).classify()
    }

    #[test]
    fn detects_amd_define() {
        assert_eq!(
            kind("define(['./a', 'b'], function (a, b) { return a; });"),
            Some(ModuleKind::Amd)
        );
    }

    #[test]
    fn detects_es_modules() {
        assert_eq!(kind("import foo from './foo';"), Some(ModuleKind::Es6));
        assert_eq!(kind("import './side-effect';"), Some(ModuleKind::Es6));
        assert_eq!(kind("export const x = 1;"), Some(ModuleKind::Es6));
        assert_eq!(kind("export { a } from './a'"), Some(ModuleKind::Es6));
    }

    #[test]
    fn detects_commonjs() {
        assert_eq!(kind("var x = require('./x');"), Some(ModuleKind::CommonJs));
        assert_eq!(kind("module.exports = {};"), Some(ModuleKind::CommonJs));
        assert_eq!(kind("exports.answer = 42;"), Some(ModuleKind::CommonJs));
    }

    #[test]
    fn dynamic_import_is_not_module_syntax() {
        assert_eq!(kind("const m = import('./lazy');"), None);
    }

    #[test]
    fn ignores_comments_strings_and_member_calls() {
        assert_eq!(kind("// define(['a'])\n/* require('x') */"), None);
        assert_eq!(kind("var s = \"import foo from 'bar'\";"), None);
        assert_eq!(kind("loader.define('x'); obj.require('y');"), None);
    }

    #[test]
    fn regex_literals_do_not_open_strings() {
        assert_eq!(
            kind("const re = /'/; define(['./a'], function (a) {});"),
            Some(ModuleKind::Amd)
        );
        assert_eq!(
            kind("if (/[/\"]/.test(x)) {}\nrequire('./y');"),
            Some(ModuleKind::CommonJs)
        );
    }

    #[test]
    fn division_is_not_a_regex() {
        assert_eq!(
            kind("var half = total / 2; var q = a / b; define(['x'], f);"),
            Some(ModuleKind::Amd)
        );
        assert_eq!(kind("var r = (a) / 'b'; // define(['x'])"), None);
    }

    #[test]
    fn supplied_facts_skip_the_file() {
        let facts = SyntaxFacts {
            amd_define: true,
            ..SyntaxFacts::default()
        };
        let mut classifier = SourceClassifier;
        let kind = classifier
            .classify(Path::new("/definitely/not/here.js"), Some(&facts))
            .unwrap();
        assert_eq!(kind, Some(ModuleKind::Amd));
    }

    #[test]
    fn unreadable_file_is_unknown() {
        let mut classifier = SourceClassifier;
        let kind = classifier
            .classify(Path::new("/definitely/not/here.js"), None)
            .unwrap();
        assert_eq!(kind, None);
    }
}
