// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipegraph contributors

//! Channel placeholder codec
//!
//! Wire format shared with downstream compiler stages:
//!
//! ```text
//! {{channel:task=<task-or-empty>;name=<name>;type=<type-or-json>;}}
//! ```
//!
//! Field grammars: `task` is `[\w\s_-]*`, `name` is `[\w\s_-]+` and `type` is
//! `[\w\s{}":_-]*`. Extraction uses a small tokenizer instead of one large
//! regex so malformed placeholders can be reported with their offset.

use std::ops::Range;

use tracing::trace;

use super::{Channel, ChannelSet, ChannelType};
use crate::errors::{GraphError, GraphResult};

pub(crate) const OPEN: &str = "{{channel:";
const CLOSE: &str = ";}}";

/// Token produced by [`scan`]
///
/// `Literal` and `Placeholder` tokens cover the input in order. `Malformed`
/// tokens are diagnostics: the text they point at is still part of the
/// surrounding literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    Literal(Range<usize>),
    Placeholder {
        span: Range<usize>,
        task: &'a str,
        name: &'a str,
        channel_type: &'a str,
    },
    Malformed {
        offset: usize,
        reason: String,
    },
}

fn is_word(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn is_task_char(c: char) -> bool {
    is_word(c) || c.is_whitespace() || c == '-'
}

fn is_type_char(c: char) -> bool {
    is_task_char(c) || matches!(c, '{' | '}' | '"' | ':')
}

/// Encode the placeholder for a (task, name, type) triple
pub(crate) fn encode_fields(
    task: Option<&str>,
    name: &str,
    channel_type: &ChannelType,
) -> GraphResult<String> {
    let encoded_type = channel_type.encoded();
    if !encoded_type.chars().all(is_type_char) {
        return Err(GraphError::InvalidType {
            channel_type: encoded_type,
        });
    }
    Ok(format!(
        "{}task={};name={};type={}{}",
        OPEN,
        task.unwrap_or(""),
        name,
        encoded_type,
        CLOSE
    ))
}

/// Cursor over one candidate placeholder
struct FieldReader<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> FieldReader<'a> {
    fn expect(&mut self, literal: &str) -> Result<(), String> {
        if self.text[self.pos..].starts_with(literal) {
            self.pos += literal.len();
            Ok(())
        } else {
            Err(format!("expected '{}' at offset {}", literal, self.pos))
        }
    }

    fn field(&mut self, allowed: fn(char) -> bool) -> &'a str {
        let rest = &self.text[self.pos..];
        let len = rest
            .char_indices()
            .find(|(_, c)| !allowed(*c))
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        self.pos += len;
        &rest[..len]
    }

    /// Parse `task=..;name=..;type=..;}}`, returning the fields
    fn placeholder(&mut self) -> Result<(&'a str, &'a str, &'a str), String> {
        self.expect("task=")?;
        let task = self.field(is_task_char);
        self.expect(";name=")?;
        let name = self.field(is_task_char);
        if name.is_empty() {
            return Err("empty channel name".to_string());
        }
        self.expect(";type=")?;
        let channel_type = self.field(is_type_char);
        self.expect(CLOSE)?;
        Ok((task, name, channel_type))
    }
}

/// Tokenize `text` into literal runs and placeholders
pub fn scan(text: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut literal_start = 0;
    let mut search_from = 0;

    while let Some(found) = text[search_from..].find(OPEN) {
        let start = search_from + found;
        let mut reader = FieldReader {
            text,
            pos: start + OPEN.len(),
        };

        match reader.placeholder() {
            Ok((task, name, channel_type)) => {
                if start > literal_start {
                    tokens.push(Token::Literal(literal_start..start));
                }
                tokens.push(Token::Placeholder {
                    span: start..reader.pos,
                    task,
                    name,
                    channel_type,
                });
                literal_start = reader.pos;
                search_from = reader.pos;
            }
            Err(reason) => {
                tokens.push(Token::Malformed {
                    offset: start,
                    reason,
                });
                // '{' is one byte, so this stays on a char boundary
                search_from = start + 1;
            }
        }
    }

    if literal_start < text.len() {
        tokens.push(Token::Literal(literal_start..text.len()));
    }

    tokens
}

fn channel_from_fields(task: &str, name: &str, channel_type: &str) -> GraphResult<Channel> {
    let task = if task.is_empty() { None } else { Some(task) };
    Channel::create(name, ChannelType::parse(channel_type), task, None)
}

/// Decode a string that consists of exactly one placeholder
pub fn decode(text: &str) -> GraphResult<Channel> {
    let tokens = scan(text);
    match tokens.as_slice() {
        [Token::Placeholder {
            span,
            task,
            name,
            channel_type,
        }] if *span == (0..text.len()) => channel_from_fields(task, name, channel_type),
        _ => {
            let (offset, reason) = tokens
                .iter()
                .find_map(|t| match t {
                    Token::Malformed { offset, reason } => Some((*offset, reason.clone())),
                    _ => None,
                })
                .unwrap_or_else(|| (0, "text is not a single channel placeholder".to_string()));
            Err(GraphError::MalformedPlaceholder { offset, reason })
        }
    }
}

/// Decode every well-formed placeholder in `text`
///
/// Returns distinct channels in order of first appearance. Fragments that
/// only look like placeholders are skipped.
pub fn decode_all(text: &str) -> GraphResult<Vec<Channel>> {
    let mut set = ChannelSet::new();
    decode_into(text, &mut set)?;
    Ok(set.into_vec())
}

pub(crate) fn decode_into(text: &str, set: &mut ChannelSet) -> GraphResult<()> {
    if !text.contains(OPEN) {
        return Ok(());
    }
    for token in scan(text) {
        match token {
            Token::Placeholder {
                task,
                name,
                channel_type,
                ..
            } => {
                set.insert(channel_from_fields(task, name, channel_type)?);
            }
            Token::Malformed { offset, reason } => {
                trace!(offset, %reason, "skipping malformed channel placeholder");
            }
            Token::Literal(_) => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use serde_json::{json, Map};

    fn channel(name: &str, ty: &str, task: Option<&str>) -> Channel {
        Channel::create(name, ty, task, None).unwrap()
    }

    #[test]
    fn test_encode_format() {
        assert_eq!(
            channel("out", "String", Some("producer")).encode(),
            "{{channel:task=producer;name=out;type=String;}}"
        );
        assert_eq!(
            channel("x", "Integer", None).encode(),
            "{{channel:task=;name=x;type=Integer;}}"
        );
    }

    #[test]
    fn test_round_trip() {
        let mut schema = Map::new();
        schema.insert("custom_type".into(), json!({"custom_property": "some_value"}));
        let cases = vec![
            channel("out", "String", Some("t1")),
            channel("x", "Integer", None),
            channel("model out", "Model", Some("train-task")),
            Channel::create("meta", schema, Some("t2"), None).unwrap(),
        ];
        for c in cases {
            assert_eq!(decode_all(c.encode()).unwrap(), vec![c.clone()]);
            assert_eq!(decode(c.encode()).unwrap(), c);
        }
    }

    #[test]
    fn test_decode_all_in_command_line() {
        let a = channel("out", "String", Some("t1"));
        let b = channel("x", "Integer", None);
        let text = format!("echo {} --n {} && cat {}", a, b, a);

        let found = decode_all(&text).unwrap();
        assert_eq!(found, vec![a, b]);
    }

    #[test]
    fn test_decode_json_type_with_spaces() {
        let text = r#"{{channel:task=t;name=m;type={"custom": "v"};}}"#;
        let c = decode(text).unwrap();
        match c.channel_type() {
            ChannelType::Schema(map) => assert_eq!(map["custom"], json!("v")),
            other => panic!("expected schema type, got {:?}", other),
        }
        assert_eq!(c.encode(), r#"{{channel:task=t;name=m;type={"custom":"v"};}}"#);
    }

    #[test]
    fn test_malformed_is_skipped_but_located() {
        let good = channel("out", "String", Some("t1"));
        let text = format!("{{{{channel:task=t1;name=;type=String;}}}} {}", good);

        let tokens = scan(&text);
        assert!(matches!(tokens[0], Token::Malformed { offset: 0, .. }));
        assert_eq!(decode_all(&text).unwrap(), vec![good]);

        let err = decode("{{channel:task=t1;name=out;type=String").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedPlaceholder);
    }

    #[test]
    fn test_nested_open_recovers() {
        let good = channel("b", "String", Some("a"));
        let text = format!("{{{{channel:task={}", good);
        assert_eq!(decode_all(&text).unwrap(), vec![good]);
    }

    #[test]
    fn test_invalid_name_in_placeholder_fails() {
        let err = decode_all("{{channel:task=;name=1x;type=String;}}").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidName);
    }

    #[test]
    fn test_unencodable_type_rejected() {
        let mut schema = Map::new();
        schema.insert("a".into(), json!(1));
        schema.insert("b".into(), json!(2));
        let err = Channel::create("m", schema, Some("t"), None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidType);
    }

    #[test]
    fn test_decode_rejects_surrounding_text() {
        let c = channel("out", "String", Some("t1"));
        let err = decode(&format!("x{}", c)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedPlaceholder);
    }

    #[test]
    fn test_scan_literal_spans() {
        let c = channel("out", "String", Some("t1"));
        let text = format!("a{}b", c);
        let tokens = scan(&text);
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0], Token::Literal(0..1));
        assert_eq!(tokens[2], Token::Literal(text.len() - 1..text.len()));
    }
}
