//! Rewriting of named `@name` placeholders into the positional markers the wire clients bind.

use std::borrow::Cow;

mod parsers;
mod scanner;

use parsers::{
    is_block_comment_end, is_block_comment_start, is_line_comment_start, matches_tag,
    try_start_dollar_quote,
};
use scanner::{State, scan_identifier};

/// Target placeholder style for translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// SQL Server wire placeholders `@P1`, `@P2`, ...
    Mssql,
    /// `PostgreSQL` placeholders `$1`, `$2`, ...
    Postgres,
}

impl PlaceholderStyle {
    fn marker(self, position: usize) -> String {
        match self {
            PlaceholderStyle::Mssql => format!("@P{position}"),
            PlaceholderStyle::Postgres => format!("${position}"),
        }
    }
}

/// Replace `@name` placeholders with positional markers.
///
/// `names` lists the bound parameters in binding order, with or without the leading `@`;
/// the n-th name becomes marker n. Matching ignores ASCII case. Names that are not bound
/// (local variables, `@@ROWCOUNT`) are left alone, as is anything inside string literals,
/// quoted or bracketed identifiers, comments and dollar-quoted bodies.
///
/// ```rust
/// use sql_bridge::translation::{translate_named_placeholders, PlaceholderStyle};
///
/// let sql = translate_named_placeholders(
///     "SELECT * FROM users WHERE name = @name AND [@age] = @age",
///     &["@name", "@age"],
///     PlaceholderStyle::Mssql,
/// );
/// assert_eq!(sql, "SELECT * FROM users WHERE name = @P1 AND [@age] = @P2");
/// ```
///
/// Returns a borrowed `Cow` when nothing was replaced.
#[must_use]
pub fn translate_named_placeholders<'a>(
    sql: &'a str,
    names: &[&str],
    target: PlaceholderStyle,
) -> Cow<'a, str> {
    if names.is_empty() {
        return Cow::Borrowed(sql);
    }

    let position_of = |ident: &str| {
        names
            .iter()
            .position(|name| name.trim_start_matches('@').eq_ignore_ascii_case(ident))
            .map(|i| i + 1)
    };

    let mut out: Option<String> = None;
    let mut copied = 0;
    let mut state = State::Normal;
    let mut idx = 0;
    let bytes = sql.as_bytes();

    while idx < bytes.len() {
        let b = bytes[idx];
        match state {
            State::Normal => match b {
                b'\'' => state = State::SingleQuoted,
                b'"' => state = State::DoubleQuoted,
                b'[' if target == PlaceholderStyle::Mssql => state = State::Bracketed,
                _ if is_line_comment_start(bytes, idx) => state = State::LineComment,
                _ if is_block_comment_start(bytes, idx) => {
                    state = State::BlockComment(1);
                    idx += 1;
                }
                b'$' if target == PlaceholderStyle::Postgres => {
                    if let Some((tag, advance)) = try_start_dollar_quote(bytes, idx) {
                        state = State::DollarQuoted(tag);
                        idx = advance;
                    }
                }
                b'@' if bytes.get(idx + 1) == Some(&b'@') => {
                    // system function such as @@IDENTITY
                    idx += 1;
                }
                b'@' => {
                    if let Some((end, ident)) = scan_identifier(bytes, idx + 1)
                        && let Some(position) = position_of(ident)
                    {
                        let buf = out.get_or_insert_with(String::new);
                        buf.push_str(&sql[copied..idx]);
                        buf.push_str(&target.marker(position));
                        copied = end;
                        idx = end;
                        continue;
                    }
                }
                _ => {}
            },
            State::SingleQuoted => {
                if b == b'\'' {
                    if bytes.get(idx + 1) == Some(&b'\'') {
                        idx += 1; // escaped quote
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::DoubleQuoted => {
                if b == b'"' {
                    if bytes.get(idx + 1) == Some(&b'"') {
                        idx += 1;
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::Bracketed => {
                if b == b']' {
                    if bytes.get(idx + 1) == Some(&b']') {
                        idx += 1;
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::LineComment => {
                if b == b'\n' {
                    state = State::Normal;
                }
            }
            State::BlockComment(depth) => {
                if is_block_comment_start(bytes, idx) {
                    state = State::BlockComment(depth + 1);
                    idx += 1;
                } else if is_block_comment_end(bytes, idx) {
                    state = if depth == 1 {
                        State::Normal
                    } else {
                        State::BlockComment(depth - 1)
                    };
                    idx += 1;
                }
            }
            State::DollarQuoted(ref tag) => {
                if b == b'$' && matches_tag(bytes, idx, tag) {
                    idx += tag.len() + 1;
                    state = State::Normal;
                }
            }
        }
        idx += 1;
    }

    match out {
        Some(mut buf) => {
            buf.push_str(&sql[copied..]);
            Cow::Owned(buf)
        }
        None => Cow::Borrowed(sql),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrites_in_binding_order() {
        let sql = "UPDATE users SET name = @name WHERE id = @id AND owner = @ID";
        let res = translate_named_placeholders(sql, &["@id", "@name"], PlaceholderStyle::Mssql);
        assert_eq!(res, "UPDATE users SET name = @P2 WHERE id = @P1 AND owner = @P1");
    }

    #[test]
    fn skips_literals_comments_and_brackets() {
        let sql = "SELECT '@a', [x@a], @a -- @a\n/* @a /* @a */ */ FROM t WHERE b = @a";
        let res = translate_named_placeholders(sql, &["a"], PlaceholderStyle::Mssql);
        assert_eq!(
            res,
            "SELECT '@a', [x@a], @P1 -- @a\n/* @a /* @a */ */ FROM t WHERE b = @P1"
        );
    }

    #[test]
    fn leaves_unbound_names_and_system_functions() {
        let sql = "DECLARE @returnValue INT; SELECT @@ROWCOUNT, @returnValue, @n";
        let res = translate_named_placeholders(sql, &["n"], PlaceholderStyle::Mssql);
        assert_eq!(res, "DECLARE @returnValue INT; SELECT @@ROWCOUNT, @returnValue, @P1");
    }

    #[test]
    fn prefix_names_do_not_match_longer_identifiers() {
        let sql = "SELECT @id, @identity";
        let res = translate_named_placeholders(sql, &["id"], PlaceholderStyle::Mssql);
        assert_eq!(res, "SELECT @P1, @identity");
    }

    #[test]
    fn postgres_skips_dollar_quoted_bodies() {
        let sql = "SELECT $fn$ @a $fn$, @a, 'é' || @b";
        let res = translate_named_placeholders(sql, &["a", "b"], PlaceholderStyle::Postgres);
        assert_eq!(res, "SELECT $fn$ @a $fn$, $1, 'é' || $2");
    }

    #[test]
    fn borrowed_when_nothing_changes() {
        let sql = "SELECT 1";
        assert!(matches!(
            translate_named_placeholders(sql, &["a"], PlaceholderStyle::Mssql),
            Cow::Borrowed(_)
        ));
        assert!(matches!(
            translate_named_placeholders(sql, &[], PlaceholderStyle::Mssql),
            Cow::Borrowed(_)
        ));
    }
}
