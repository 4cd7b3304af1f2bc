//! Operator sugar over the named constructors:
//! - `a >> b` is [then](crate::structural::then)
//! - `a | b` is [or](crate::structural::or)
//! - `!a` is [not](crate::structural::not)
//! - `-a` is [ignore](crate::structural::ignore)

use std::ops::{BitOr, Neg, Not, Shr};

use crate::{
    behavioral::{
        Action, Boxed, Lazy, Map, Recursive, RecursiveHandle, SyncTo, TryCatch, Where, WithState,
    },
    primitive::{Check, SeqCheck, SeqWith, Single, Until},
    stream::Stream,
    structural::{self, Choice, Ignore, Many, More, Optional, Or, Pred, Then},
    text::Regex,
    tokens::{Extract, Group},
};

macro_rules! sugar {
    ($(<$($gen:ident $(: $bound:path)?),*> $node:ty;)*) => {
        $(
            impl<$($gen $(: $bound)?,)* Rhs> Shr<Rhs> for $node {
                type Output = Then<Self, Rhs>;

                fn shr(self, rhs: Rhs) -> Self::Output {
                    structural::then(self, rhs)
                }
            }

            impl<$($gen $(: $bound)?,)* Rhs> BitOr<Rhs> for $node {
                type Output = Or<Self, Rhs>;

                fn bitor(self, rhs: Rhs) -> Self::Output {
                    structural::or(self, rhs)
                }
            }

            impl<$($gen $(: $bound)?),*> Not for $node {
                type Output = structural::Not<Self>;

                fn not(self) -> Self::Output {
                    structural::not(self)
                }
            }

            impl<$($gen $(: $bound)?),*> Neg for $node {
                type Output = Ignore<Self>;

                fn neg(self) -> Self::Output {
                    structural::ignore(self)
                }
            }
        )*
    };
}

sugar! {
    <T, M> Check<T, M>;
    <T, M, C, K> Single<T, M, C, K>;
    <T, M, K> Until<T, M, K>;
    <T> SeqCheck<T>;
    <T, C> SeqWith<T, C>;
    <A, B> Then<A, B>;
    <A, B, J> Choice<A, B, J>;
    <A> Many<A>;
    <A> More<A>;
    <A> Optional<A>;
    <A> structural::Not<A>;
    <A> Pred<A>;
    <A> Ignore<A>;
    <A, H> Map<A, H>;
    <A, H> Action<A, H>;
    <A, H> Where<A, H>;
    <T, A> WithState<T, A>;
    <A, R, C> TryCatch<A, R, C>;
    <T, M, O, K> SyncTo<T, M, O, K>;
    <S: Stream, O, G, L, K> Boxed<S, O, G, L, K>;
    <S: Stream, O, G, L, K> Lazy<S, O, G, L, K>;
    <S: Stream, O, G, L, K> Recursive<S, O, G, L, K>;
    <S: Stream, O, G, L, K> RecursiveHandle<S, O, G, L, K>;
    <F, K> Extract<F, K>;
    <P> Group<P>;
}

impl<const WINDOW: usize, Rhs> Shr<Rhs> for Regex<WINDOW> {
    type Output = Then<Self, Rhs>;

    fn shr(self, rhs: Rhs) -> Self::Output {
        structural::then(self, rhs)
    }
}

impl<const WINDOW: usize, Rhs> BitOr<Rhs> for Regex<WINDOW> {
    type Output = Or<Self, Rhs>;

    fn bitor(self, rhs: Rhs) -> Self::Output {
        structural::or(self, rhs)
    }
}

impl<const WINDOW: usize> Not for Regex<WINDOW> {
    type Output = structural::Not<Self>;

    fn not(self) -> Self::Output {
        structural::not(self)
    }
}

impl<const WINDOW: usize> Neg for Regex<WINDOW> {
    type Output = Ignore<Self>;

    fn neg(self) -> Self::Output {
        structural::ignore(self)
    }
}

#[cfg(test)]
mod tests {
    use crate::{prelude::*, text::regex, Repr};

    #[test]
    fn operators_build_the_same_grammar() {
        let sugared = check('a') >> (check('b') | check('c')).many() >> !check('d');
        let named = check('a')
            .then(check('b').or(check('c')).many())
            .then(check('d').not());
        assert_eq!(Repr(&sugared).to_string(), Repr(&named).to_string());

        let mut stream = StrStream::new("abcbe");
        assert_eq!(sugared.parse(&mut stream), Ok(Some(())));
        assert_eq!(stream.offset(), 4);
    }

    #[test]
    fn negation_ignores() {
        let digit = single_if(|c: &char| c.is_ascii_digit());
        let pair = -digit.clone() >> digit;
        assert_eq!(pair.parse(&mut StrStream::new("12")), Ok(Some('2')));
    }

    #[test]
    fn patterns_take_every_operator() {
        let word = || regex("[a-z]+").unwrap();
        let spaced = -word() >> check(' ') >> word() >> !word();
        let mut stream = StrStream::new("hello world1");
        assert_eq!(spaced.parse(&mut stream), Ok(Some(String::from("world"))));
        assert_eq!(stream.remaining(), "1");
    }
}
