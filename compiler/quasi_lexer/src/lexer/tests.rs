use pretty_assertions::assert_eq;

use crate::{tokenize, LexError, Lexer, Position, SourceBuffer, TokenKind};

use TokenKind::{Comment, Dedent, EndMarker, Indent, Marker, Name, Newline, Nl, Number, Op};

fn kinds(src: &str) -> Vec<(TokenKind, String)> {
    let buf = SourceBuffer::new(src);
    tokenize(&buf)
        .unwrap()
        .into_iter()
        .map(|t| (t.kind, t.text.to_owned()))
        .collect()
}

fn tok(kind: TokenKind, text: &str) -> (TokenKind, String) {
    (kind, text.to_owned())
}

/// Drive a lexer up to and including the first `Newline` token.
fn through_newline(lexer: &mut Lexer<'_>) {
    loop {
        let token = lexer.next_token().unwrap();
        assert_ne!(token.kind, EndMarker, "ran out of input before a Newline");
        if token.kind == Newline {
            return;
        }
    }
}

// === Basic Tokens ===

#[test]
fn simple_assignment() {
    assert_eq!(
        kinds("x = 1\n"),
        vec![
            tok(Name, "x"),
            tok(Op, "="),
            tok(Number, "1"),
            tok(Newline, "\n"),
            tok(EndMarker, ""),
        ]
    );
}

#[test]
fn marker_is_its_own_token() {
    assert_eq!(
        kinds("[$c|"),
        vec![
            tok(Op, "["),
            tok(Marker, "$"),
            tok(Name, "c"),
            tok(Op, "|"),
            tok(Newline, ""),
            tok(EndMarker, ""),
        ]
    );
}

#[test]
fn longest_operator_wins() {
    let ops: Vec<_> = kinds("a **= b // c -> d != e")
        .into_iter()
        .filter(|(k, _)| *k == Op)
        .map(|(_, t)| t)
        .collect();
    assert_eq!(ops, vec!["**=", "//", "->", "!="]);
}

#[test]
fn close_bracket_after_pipe_is_two_tokens() {
    assert_eq!(
        kinds("|]")[..2],
        [tok(Op, "|"), tok(Op, "]")]
    );
}

#[test]
fn prefixed_strings() {
    assert_eq!(
        kinds("rb'x' f\"y\"\n")[..2],
        [tok(TokenKind::String, "rb'x'"), tok(TokenKind::String, "f\"y\"")]
    );
}

#[test]
fn numbers_with_exponents() {
    assert_eq!(
        kinds("1.5e-3 0xE+1\n")[..4],
        [
            tok(Number, "1.5e-3"),
            tok(Number, "0xE"),
            tok(Op, "+"),
            tok(Number, "1"),
        ]
    );
}

// === Line Structure ===

#[test]
fn indent_and_dedent() {
    assert_eq!(
        kinds("if a:\n    b\nc\n"),
        vec![
            tok(Name, "if"),
            tok(Name, "a"),
            tok(Op, ":"),
            tok(Newline, "\n"),
            tok(Indent, "    "),
            tok(Name, "b"),
            tok(Newline, "\n"),
            tok(Dedent, ""),
            tok(Name, "c"),
            tok(Newline, "\n"),
            tok(EndMarker, ""),
        ]
    );
}

#[test]
fn eof_closes_open_blocks() {
    assert_eq!(
        kinds("if a:\n    b")[4..],
        [
            tok(Indent, "    "),
            tok(Name, "b"),
            tok(Newline, ""),
            tok(Dedent, ""),
            tok(EndMarker, ""),
        ]
    );
}

#[test]
fn blank_and_comment_lines_are_not_logical() {
    assert_eq!(
        kinds("x\n\n# c\ny\n"),
        vec![
            tok(Name, "x"),
            tok(Newline, "\n"),
            tok(Nl, "\n"),
            tok(Comment, "# c"),
            tok(Nl, "\n"),
            tok(Name, "y"),
            tok(Newline, "\n"),
            tok(EndMarker, ""),
        ]
    );
}

#[test]
fn newlines_inside_brackets_are_not_logical() {
    assert_eq!(
        kinds("f(a,\n  b)\n"),
        vec![
            tok(Name, "f"),
            tok(Op, "("),
            tok(Name, "a"),
            tok(Op, ","),
            tok(Nl, "\n"),
            tok(Name, "b"),
            tok(Op, ")"),
            tok(Newline, "\n"),
            tok(EndMarker, ""),
        ]
    );
}

#[test]
fn backslash_joins_lines() {
    let buf = SourceBuffer::new("x = 1 + \\\n    2\n");
    let tokens = tokenize(&buf).unwrap();
    let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
    assert_eq!(kinds, vec![Name, Op, Number, Op, Number, Newline, EndMarker]);
    assert_eq!(tokens[4].start.line, 2);
}

#[test]
fn tab_rounds_to_next_stop() {
    assert_eq!(
        kinds("if a:\n\tb\n        c\n")[4..],
        [
            tok(Indent, "\t"),
            tok(Name, "b"),
            tok(Newline, "\n"),
            tok(Name, "c"),
            tok(Newline, "\n"),
            tok(Dedent, ""),
            tok(EndMarker, ""),
        ]
    );
}

#[test]
fn triple_quoted_string_advances_lines() {
    let buf = SourceBuffer::new("s = '''a\nb'''\nt\n");
    let tokens = tokenize(&buf).unwrap();
    assert_eq!(tokens[2].text, "'''a\nb'''");
    assert_eq!(tokens[2].end, Position { offset: 13, line: 2, column: 4 });
    let t = tokens.iter().find(|t| t.text == "t").unwrap();
    assert_eq!(t.start.line, 3);
}

#[test]
fn columns_count_characters() {
    let buf = SourceBuffer::new("é = 'ü'; x\n");
    let tokens = tokenize(&buf).unwrap();
    let x = tokens.iter().find(|t| t.text == "x").unwrap();
    assert_eq!(x.start, Position { offset: 11, line: 1, column: 9 });
    assert_eq!(x.line, "é = 'ü'; x\n");
}

// === Errors ===

#[test]
fn inconsistent_dedent() {
    let buf = SourceBuffer::new("if a:\n    b\n  c\n");
    let err = tokenize(&buf).unwrap_err();
    assert_eq!(
        err,
        LexError::InconsistentDedent {
            pos: Position { offset: 14, line: 3, column: 2 }
        }
    );
}

#[test]
fn unterminated_string() {
    let buf = SourceBuffer::new("x = 'abc\n");
    let err = tokenize(&buf).unwrap_err();
    assert_eq!(
        err,
        LexError::UnterminatedString {
            pos: Position { offset: 4, line: 1, column: 4 }
        }
    );
}

#[test]
fn unexpected_character() {
    let buf = SourceBuffer::new("a ? b");
    let err = tokenize(&buf).unwrap_err();
    assert!(matches!(err, LexError::UnexpectedChar { ch: '?', .. }));
    assert_eq!(err.to_string(), "1:3: unexpected character '?'");
}

// === Raw Blocks ===

#[test]
fn indented_block_is_captured_raw() {
    let src = "with $c:\n    int x = 1;\n    x++;\ny = 2\n";
    let buf = SourceBuffer::new(src);
    let mut lexer = Lexer::new(&buf);
    through_newline(&mut lexer);

    let block = lexer.take_indented_block().unwrap();
    assert_eq!(block.text, "    int x = 1;\n    x++;\n");
    assert_eq!(block.start, Position { offset: 9, line: 2, column: 0 });
    assert_eq!(block.end.line, 4);
    assert_eq!(block.end.column, 0);

    let next = lexer.next_token().unwrap();
    assert_eq!((next.kind, next.text, next.start.line), (Name, "y", 4));
}

#[test]
fn block_keeps_leading_blanks_and_leaves_trailing_ones() {
    let src = "with $c:\n\n    a;\n\n# note\n    b;\n\n# tail\nz\n";
    let buf = SourceBuffer::new(src);
    let mut lexer = Lexer::new(&buf);
    through_newline(&mut lexer);

    let block = lexer.take_indented_block().unwrap();
    assert_eq!(block.text, "\n    a;\n\n# note\n    b;\n");

    let rest: Vec<_> = std::iter::from_fn(|| Some(lexer.next_token().unwrap()))
        .take_while(|t| t.kind != EndMarker)
        .map(|t| (t.kind, t.text, t.start.line))
        .collect();
    assert_eq!(
        rest,
        vec![
            (Nl, "\n", 7),
            (Comment, "# tail", 8),
            (Nl, "\n", 8),
            (Name, "z", 9),
            (Newline, "\n", 9),
        ]
    );
}

#[test]
fn block_may_open_with_a_comment_line() {
    let src = "with $c:\n    #include <x.h>\n    int y;\n";
    let buf = SourceBuffer::new(src);
    let mut lexer = Lexer::new(&buf);
    through_newline(&mut lexer);
    let block = lexer.take_indented_block().unwrap();
    assert_eq!(block.text, "    #include <x.h>\n    int y;\n");
    assert_eq!(lexer.next_token().unwrap().kind, EndMarker);
}

#[test]
fn nested_block_resumes_at_enclosing_level() {
    let src = "def f():\n    with $c:\n        a;\n    return 1\n";
    let buf = SourceBuffer::new(src);
    let mut lexer = Lexer::new(&buf);
    through_newline(&mut lexer);
    through_newline(&mut lexer);

    let block = lexer.take_indented_block().unwrap();
    assert_eq!(block.text, "        a;\n");

    let rest: Vec<_> = std::iter::from_fn(|| Some(lexer.next_token().unwrap()))
        .take_while(|t| t.kind != EndMarker)
        .map(|t| t.kind)
        .collect();
    assert_eq!(rest, vec![Name, Number, Newline, Dedent]);
}

#[test]
fn missing_block_consumes_nothing() {
    let buf = SourceBuffer::new("with $c:\nx\n");
    let mut lexer = Lexer::new(&buf);
    through_newline(&mut lexer);
    assert!(lexer.take_indented_block().is_none());
    let next = lexer.next_token().unwrap();
    assert_eq!((next.kind, next.text), (Name, "x"));
}

// === Raw Spans ===

#[test]
fn take_until_captures_inline_body() {
    let buf = SourceBuffer::new("x = [$c|a + b|] + 1\n");
    let mut lexer = Lexer::new(&buf);
    for _ in 0..6 {
        lexer.next_token().unwrap();
    }
    let span = lexer.take_until("|]").unwrap();
    assert_eq!(span.text, "a + b");
    assert_eq!(span.start.column, 8);
    assert_eq!(span.end.column, 13);

    let rest: Vec<_> = std::iter::from_fn(|| Some(lexer.next_token().unwrap()))
        .take_while(|t| t.kind != EndMarker)
        .map(|t| (t.kind, t.text))
        .collect();
    assert_eq!(rest, vec![(Op, "+"), (Number, "1"), (Newline, "\n")]);
}

#[test]
fn take_until_spans_lines() {
    let buf = SourceBuffer::new("y = [$c|a\n+ b|]\nz\n");
    let mut lexer = Lexer::new(&buf);
    for _ in 0..6 {
        lexer.next_token().unwrap();
    }
    let span = lexer.take_until("|]").unwrap();
    assert_eq!(span.text, "a\n+ b");
    assert_eq!(span.end, Position { offset: 13, line: 2, column: 3 });

    let newline = lexer.next_token().unwrap();
    assert_eq!((newline.kind, newline.start.line), (Newline, 2));
    let z = lexer.next_token().unwrap();
    assert_eq!((z.text, z.start.line), ("z", 3));
}

#[test]
fn take_until_without_close_consumes_nothing() {
    let buf = SourceBuffer::new("[$c|never closed\n");
    let mut lexer = Lexer::new(&buf);
    for _ in 0..4 {
        lexer.next_token().unwrap();
    }
    let before = lexer.here();
    assert!(lexer.take_until("|]").is_none());
    assert_eq!(lexer.here(), before);
}

// === Property tests ===

#[allow(
    clippy::disallowed_types,
    reason = "proptest macros internally use Arc"
)]
mod proptest_lexer {
    use proptest::prelude::*;

    use crate::{tokenize, SourceBuffer, TokenKind};

    proptest! {
        #[test]
        fn token_text_matches_source_offsets(src in "[a-z0-9 =+()#:\\n]{0,80}") {
            let buf = SourceBuffer::new(&src);
            if let Ok(tokens) = tokenize(&buf) {
                let mut last = 0;
                for token in &tokens {
                    let (start, end) = (token.start.offset as usize, token.end.offset as usize);
                    prop_assert!(start >= last, "token {:?} starts before {}", token, last);
                    prop_assert_eq!(&src[start..end], token.text);
                    last = end;
                }
            }
        }

        #[test]
        fn indents_and_dedents_balance(src in "( {0,6}[a-z]{1,3}:?\\n){0,12}") {
            let buf = SourceBuffer::new(&src);
            if let Ok(tokens) = tokenize(&buf) {
                let indents = tokens.iter().filter(|t| t.kind == TokenKind::Indent).count();
                let dedents = tokens.iter().filter(|t| t.kind == TokenKind::Dedent).count();
                prop_assert_eq!(indents, dedents);
                prop_assert_eq!(tokens.last().map(|t| t.kind), Some(TokenKind::EndMarker));
            }
        }
    }
}
