use oolong_compiler::{
    ExpressionKind, Lexer, ParseError, ParsedLambda, Parser,
};

fn parse(source: &str) -> Result<ParsedLambda, ParseError> {
    let tokens = Lexer::new(source).tokenize().expect("lexing should succeed");
    Parser::new(tokens).parse()
}

fn parse_ok(source: &str) -> ParsedLambda {
    parse(source).unwrap_or_else(|error| panic!("failed to parse '{source}': {error}"))
}

#[test]
fn parses_precedence_low_to_high() {
    let parsed = parse_ok("1 + 2 * 3");
    match parsed.body.kind {
        ExpressionKind::Binary(binary) => {
            assert!(matches!(binary.left.kind, ExpressionKind::Literal(_)));
            assert!(matches!(binary.right.kind, ExpressionKind::Binary(_)));
        }
        other => panic!("expected binary root, got {other:?}"),
    }
}

#[test]
fn parses_comparison_below_logical_and() {
    // (1 < 2) && (3 >= 2), not 1 < (2 && 3) >= 2
    let parsed = parse_ok("1 < 2 && 3 >= 2");
    match parsed.body.kind {
        ExpressionKind::Binary(binary) => {
            assert!(matches!(binary.left.kind, ExpressionKind::Binary(_)));
            assert!(matches!(binary.right.kind, ExpressionKind::Binary(_)));
        }
        other => panic!("expected binary root, got {other:?}"),
    }
}

#[test]
fn parses_single_parameter_header() {
    let parsed = parse_ok("m => m");
    let parameters = parsed.parameters.expect("header should be detected");
    assert_eq!(parameters.len(), 1);
    assert_eq!(parameters[0].name, "m");
}

#[test]
fn parses_parenthesized_parameter_list() {
    let parsed = parse_ok("(a, b) => a + b");
    let parameters = parsed.parameters.expect("header should be detected");
    let names: Vec<_> = parameters.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["a", "b"]);
}

#[test]
fn parenthesized_expression_is_not_a_header() {
    let parsed = parse_ok("(1 + 2) * 3");
    assert!(parsed.parameters.is_none());
}

#[test]
fn records_distinct_slots_in_order() {
    let parsed = parse_ok("$1 + $0 + $1");
    assert!(parsed.parameters.is_none());
    let indices: Vec<_> = parsed.slots.iter().map(|slot| slot.index).collect();
    assert_eq!(indices, [0, 1]);
    assert_eq!(parsed.max_slot(), Some(1));
}

#[test]
fn parses_conditional_right_associative() {
    let parsed = parse_ok("true ? 1 : false ? 2 : 3");
    match parsed.body.kind {
        ExpressionKind::Conditional(conditional) => {
            assert!(matches!(
                conditional.alternative.kind,
                ExpressionKind::Conditional(_)
            ));
        }
        other => panic!("expected conditional root, got {other:?}"),
    }
}

#[test]
fn parses_null_propagating_member_chain() {
    let parsed = parse_ok("$0?.length");
    match parsed.body.kind {
        ExpressionKind::Member(member) => {
            assert!(member.null_propagating);
            assert_eq!(member.name, "length");
        }
        other => panic!("expected member access, got {other:?}"),
    }
}

#[test]
fn parses_cast_of_identifier_head() {
    let parsed = parse_ok("(long)$0");
    match parsed.body.kind {
        ExpressionKind::Cast(cast) => assert_eq!(cast.type_name, "long"),
        other => panic!("expected cast, got {other:?}"),
    }
}

#[test]
fn parses_dotted_cast_target() {
    let parsed = parse_ok("(geo.Point)$0");
    match parsed.body.kind {
        ExpressionKind::Cast(cast) => assert_eq!(cast.type_name, "geo.Point"),
        other => panic!("expected cast, got {other:?}"),
    }
}

#[test]
fn parses_new_with_qualified_name() {
    let parsed = parse_ok("new geo.Point(1.0, 2.0)");
    match parsed.body.kind {
        ExpressionKind::New(new) => {
            assert_eq!(new.type_name, "geo.Point");
            assert_eq!(new.arguments.len(), 2);
        }
        other => panic!("expected new expression, got {other:?}"),
    }
}

#[test]
fn unmatched_paren_reports_the_opening_offset() {
    let error = parse("(1 + 2").expect_err("parse should fail");
    assert_eq!(
        error,
        ParseError::UnterminatedGroup {
            open: '(',
            offset: 0
        }
    );

    let error = parse("1 + (2 * 3").expect_err("parse should fail");
    assert_eq!(
        error,
        ParseError::UnterminatedGroup {
            open: '(',
            offset: 4
        }
    );
}

#[test]
fn unmatched_bracket_reports_the_opening_offset() {
    let error = parse("$0[1 + 2").expect_err("parse should fail");
    assert_eq!(
        error,
        ParseError::UnterminatedGroup {
            open: '[',
            offset: 2
        }
    );
}

#[test]
fn unterminated_call_reports_the_opening_offset() {
    let error = parse("$0.substring(1, 2").expect_err("parse should fail");
    assert_eq!(
        error,
        ParseError::UnterminatedGroup {
            open: '(',
            offset: 12
        }
    );
}

#[test]
fn trailing_input_is_rejected() {
    let error = parse("1 2").expect_err("parse should fail");
    assert!(matches!(
        error,
        ParseError::TrailingInput { offset: 2, .. }
    ));
}

#[test]
fn slots_cannot_mix_with_a_parameter_list() {
    let error = parse("(a, b) => $0 + a").expect_err("parse should fail");
    assert_eq!(error, ParseError::SlotWithHeader { offset: 10 });
}

#[test]
fn duplicate_parameter_names_are_rejected() {
    let error = parse("(a, a) => a").expect_err("parse should fail");
    assert!(matches!(
        error,
        ParseError::DuplicateParameter { offset: 4, .. }
    ));
}

#[test]
fn dangling_operator_is_rejected() {
    let error = parse("1 +").expect_err("parse should fail");
    assert!(matches!(error, ParseError::UnexpectedToken { .. }));
}

#[test]
fn misplaced_token_is_an_unknown_symbol() {
    let error = parse("* 2").expect_err("parse should fail");
    assert!(matches!(error, ParseError::UnknownSymbol { offset: 0, .. }));
}

#[test]
fn error_messages_carry_the_position_framing() {
    let error = parse("(1 + 2").expect_err("parse should fail");
    assert!(
        error.to_string().starts_with("position 0 near: "),
        "unexpected message: {error}"
    );
}
