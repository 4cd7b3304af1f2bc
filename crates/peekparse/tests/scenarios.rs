use peekparse::{
    prelude::*,
    text::{ch, ch_if, regex},
};

mod calculator {
    use super::*;

    fn number() -> impl Parser<StrStream, Token = char, Out = f64, Shape = peekparse::algebra::Value>
           + Send
           + Sync
           + 'static {
        regex(r"[0-9]+(\.[0-9]+)?")
            .unwrap()
            .map(|text: String| text.parse::<f64>().unwrap())
            .name("number")
    }

    fn fold(first: f64, rest: Vec<(char, f64)>) -> f64 {
        rest.into_iter().fold(first, |acc, (op, rhs)| match op {
            '+' => acc + rhs,
            '-' => acc - rhs,
            '*' => acc * rhs,
            _ => acc / rhs,
        })
    }

    /// expr = term (('+' | '-') term)*
    pub fn expr() -> Boxed<StrStream, f64> {
        term()
            .then(ch('+').or(ch('-')).then(term()).many())
            .map(|(first, rest)| fold(first, rest))
            .name("expr")
            .boxed()
    }

    /// term = factor (('*' | '/') factor)*
    fn term() -> Boxed<StrStream, f64> {
        factor()
            .then(ch('*').or(ch('/')).then(factor()).many())
            .map(|(first, rest)| fold(first, rest))
            .boxed()
    }

    /// factor = number | '(' expr ')'
    fn factor() -> Boxed<StrStream, f64> {
        number()
            .or(check('(').then(lazy(expr)).then(check(')')))
            .name("factor")
            .boxed()
    }
}

#[test]
fn scenario_a_arithmetic() {
    let expr = calculator::expr();
    let mut stream = StrStream::new("3.14+5*(2-4)");
    let value = expr.parse(&mut stream).unwrap().unwrap();
    assert!((value - -6.86).abs() < 1e-9, "{value}");
    assert!(stream.eof(0));

    // the same grammar is reusable
    let mut stream = StrStream::new("(1+2)*(3+4)/7");
    assert_eq!(expr.parse(&mut stream), Ok(Some(3.0)));
}

#[test]
fn scenario_b_choice_of_units() {
    let grammar = check('A') | check('B');
    let mut stream = StrStream::new("B");
    assert_eq!(grammar.parse(&mut stream), Ok(Some(())));
    assert_eq!(stream.offset(), 1);
}

#[test]
fn scenario_c_offending_token() {
    let digit = ch_if(char::is_ascii_digit).name("digit");
    let sum = digit.clone().then(check('+')).then(digit);

    let err = sum.parse(&mut StrStream::new("2+a")).unwrap_err();
    assert_eq!(err.token(), Some("a"));
    assert_eq!(
        err.to_string(),
        "parser exception in token a. At parser: digit, pos: index: 2. Stream: <string>"
    );
}

#[test]
fn scenario_d_synchronize() {
    let mut stream = ContainerStream::new(vec!["unexpected", ";", "valid"]);
    let guarded = try_catch(check("expected"), sync(";"));
    assert_eq!(guarded.parse(&mut stream), Ok(Some(())));
    assert_eq!(stream.peek(0), Some(&";"));
    assert_eq!(stream.offset(), 1);
}

#[test]
fn scenario_e_lazy_self_reference() {
    // digits = digit digits?, summing right to left: "123" is 1 + (2 + 3)
    fn digits() -> Boxed<StrStream, u32> {
        ch_if(char::is_ascii_digit)
            .map(|c| c.to_digit(10).unwrap())
            .then(lazy(digits).optional())
            .map(|(digit, rest)| digit + rest.unwrap_or(0))
            .boxed()
    }

    assert_eq!(digits().parse(&mut StrStream::new("123")), Ok(Some(6)));
}
