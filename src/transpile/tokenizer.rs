//! Token-level transpiler built on the sqlparser tokenizer.
//!
//! SQL is tokenized with the input dialect's rules and written back token by
//! token. Only the parts dialects disagree on are rewritten:
//!
//! - delimited identifiers are re-quoted (`` `id` `` becomes `"id"`)
//! - string literals are re-escaped (`'it\'s'` becomes `'it''s'`)
//! - function names go through the output dialect's function table
//!
//! Everything else, whitespace and comments included, is kept as written.

use sqlparser::tokenizer::{Token, Tokenizer};

use crate::sql::{Dialect, SqlDialect};

use super::{TranspilationPlugin, TranspileError};

/// The `sqlparser` plugin.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlparserTranspiler;

impl TranspilationPlugin for SqlparserTranspiler {
    fn name(&self) -> &str {
        "sqlparser"
    }

    fn transpile(&self, sql: &str, from: Dialect, to: Dialect) -> Result<String, TranspileError> {
        if from == to {
            return Ok(sql.to_string());
        }

        let parser_dialect = from.parser_dialect();
        let tokens = Tokenizer::new(&*parser_dialect, sql)
            .tokenize()
            .map_err(|e| TranspileError::Tokenize {
                dialect: from,
                message: e.to_string(),
            })?;

        let mut out = String::with_capacity(sql.len());
        for (i, token) in tokens.iter().enumerate() {
            match token {
                Token::Word(word) if word.quote_style.is_some() => {
                    out.push_str(&to.quote_identifier(&word.value));
                }
                Token::Word(word) if is_call(&tokens[i + 1..]) => {
                    match to.remap_function(&word.value) {
                        Some(name) => out.push_str(name),
                        None => out.push_str(&word.value),
                    }
                }
                Token::SingleQuotedString(s) => out.push_str(&to.quote_string(s)),
                other => out.push_str(&other.to_string()),
            }
        }

        log::debug!("transpiled {} tokens from {} to {}", tokens.len(), from, to);
        Ok(out)
    }
}

/// Whether the next non-whitespace token opens an argument list.
fn is_call(rest: &[Token]) -> bool {
    rest.iter()
        .find(|token| !matches!(token, Token::Whitespace(_)))
        .is_some_and(|token| matches!(token, Token::LParen))
}
