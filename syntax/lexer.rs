//! Tokenize a string representation of a Datalog task.
//!
//! Only five characters (and the pair `:-`) carry structure; everything
//! else is identifier text. Whitespace is insignificant everywhere, so
//! adjacent text fragments belong to the same identifier.

use nom::{
    branch::alt,
    bytes::complete::{is_not, tag},
    character::complete::{char, multispace0},
    combinator::{map, not, recognize},
    error::ParseError,
    multi::{many0, many1},
    sequence::{delimited, terminated},
    IResult, Parser,
};

pub(crate) fn space(input: &str) -> IResult<&str, &str> {
    multispace0(input)
}

/// A run of identifier characters. A colon belongs to an
/// identifier unless it starts the `:-` operator.
pub(crate) fn text(input: &str) -> IResult<&str, &str> {
    recognize(many1(alt((
        is_not("(),.: \t\r\n"),
        terminated(tag(":"), not(char('-'))),
    ))))(input)
}

pub(crate) fn token<I, O, E, F>(mut parser: F) -> impl FnMut(I) -> IResult<I, Token<O, I>, E>
where
    I: Clone,
    O: Clone,
    E: ParseError<I>,
    F: Parser<I, O, E>,
{
    move |input: I| {
        let i = input.clone();
        let (input, t) = parser.parse(input)?;
        Ok((input, Token::new(t, i)))
    }
}

/// Define a lexer function `$function` that recognizes the literal
/// `$tag` and yields `$token`, e.g. `lex_token!(dot<DatalogToken>, ".", DatalogToken::Dot)`.
#[macro_export]
macro_rules! lex_token {
    ($function: ident<$ty: ty>, $tag: literal, $token: expr) => {
        pub(crate) fn $function(input: &str) -> IResult<&str, $crate::Token<$ty, &str>> {
            $crate::lexer::token(::nom::combinator::map(
                ::nom::bytes::complete::tag($tag),
                |_| $token,
            ))(input)
        }
    };
}

/// A token with source information.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Token<T: Clone, S: Clone> {
    pub token: T,
    pub source: S,
}

impl<T: Clone, S: Clone> Token<T, S> {
    pub fn new(token: T, source: S) -> Self {
        Self { token, source }
    }
}

/// A lexer, a.k.a. lexical analyzer, tokenizer.
pub trait Lex<'a, S> {
    type Input;
    type Token;

    /// Tokenize an input stream.
    fn lex(input: Self::Input) -> IResult<Self::Input, Vec<Self::Token>>;
}

/// Lexical element of a Datalog task.
#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub enum DatalogToken {
    Text(String),
    LParen,
    RParen,
    Comma,
    If,
    Dot,
}

impl DatalogToken {
    /// The first character of the token as written.
    pub fn first_char(&self) -> char {
        match self {
            Self::Text(s) => s.chars().next().unwrap_or(' '),
            Self::LParen => '(',
            Self::RParen => ')',
            Self::Comma => ',',
            Self::If => ':',
            Self::Dot => '.',
        }
    }
}

lex_token!(lparen<DatalogToken>, "(", DatalogToken::LParen);
lex_token!(rparen<DatalogToken>, ")", DatalogToken::RParen);
lex_token!(comma<DatalogToken>, ",", DatalogToken::Comma);
lex_token!(r#if<DatalogToken>, ":-", DatalogToken::If);
lex_token!(dot<DatalogToken>, ".", DatalogToken::Dot);

/// Datalog task lexer.
pub struct DatalogLexer;

impl<'a> Lex<'a, &str> for DatalogLexer {
    type Input = &'a str;
    type Token = Token<DatalogToken, &'a str>;

    /// Tokenize a string representation of a Datalog task.
    fn lex(input: &'a str) -> IResult<&'a str, Vec<Self::Token>> {
        many0(delimited(
            space,
            alt((
                lparen,
                rparen,
                comma,
                r#if,
                dot,
                token(map(text, |s: &str| DatalogToken::Text(s.to_owned()))),
            )),
            space,
        ))(input)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use DatalogToken::*;

    fn tokens(input: &str) -> Vec<DatalogToken> {
        let (rest, tokens) = DatalogLexer::lex(input).expect("lexing failed");
        assert!(rest.trim().is_empty(), "unconsumed input {rest:?}");
        tokens.into_iter().map(|t| t.token).collect()
    }

    #[test]
    fn text() {
        assert!(super::text("").is_err(), "empty");
        assert!(super::text("(").is_err(), "structural");
        assert_eq!(super::text("on(a)"), Ok(("(a)", "on")));
        assert_eq!(super::text("a:b:-c"), Ok((":-c", "a:b")), "colon");
    }

    #[test]
    fn lexer() {
        assert_eq!(tokens(""), vec![], "nothing");
        assert_eq!(tokens("  \n"), vec![], "space");
        assert_eq!(
            tokens("p(a,b)."),
            vec![
                Text("p".into()),
                LParen,
                Text("a".into()),
                Comma,
                Text("b".into()),
                RParen,
                Dot
            ],
            "fact"
        );
        assert_eq!(
            tokens("q(Var_X) :- p(Var_X)."),
            vec![
                Text("q".into()),
                LParen,
                Text("Var_X".into()),
                RParen,
                If,
                Text("p".into()),
                LParen,
                Text("Var_X".into()),
                RParen,
                Dot
            ],
            "rule"
        );
        assert_eq!(
            tokens("a b"),
            vec![Text("a".into()), Text("b".into())],
            "split identifier"
        );
    }

    #[test]
    fn sources() {
        let (_, tokens) = DatalogLexer::lex("p ( a )").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::new(Text("p".into()), "p ( a )"),
                Token::new(LParen, "( a )"),
                Token::new(Text("a".into()), "a )"),
                Token::new(RParen, ")"),
            ]
        );
    }
}
