//! The result-type algebra.
//!
//! Every [Node](crate::Node) declares a [Shape] next to its result type. Combinators derive their
//! own result type from the shapes of their children:
//!
//! | Combination | Rule |
//! | --- | --- |
//! | sequencing | [Unit] operands are dropped, [Tuple]s are flattened, other values are paired |
//! | choice | identical types collapse, a [Unit] branch is absorbed as `Option<T>` |
//! | tagged choice | [Either] of both results |
//! | repetition | [Unit] stays unit, [Text] collects into a [String], anything else into a [Vec] |
//!
//! ```
//! use peekparse::prelude::*;
//!
//! let p = check('[').then(single('a')).then(check(',')).then(single('b')).then(check(']'));
//! assert_eq!(p.parse(&mut StrStream::new("[a,b]")), Ok(Some(('a', 'b'))));
//! ```

/// A type-level description of how a result takes part in the algebra.
pub trait Shape {}

/// Results of type `()` that carry no information.
pub enum Unit {}

/// Any single, opaque result.
pub enum Value {}

/// A single character, repeated into a [String].
pub enum Text {}

/// A flattened tuple of two or more results.
pub enum Tuple {}

impl Shape for Unit {}
impl Shape for Value {}
impl Shape for Text {}
impl Shape for Tuple {}

/// Combines the results of two nodes run one after the other.
/// Implemented on pairs of [Shape]s.
#[cfg_attr(
    feature = "nightly",
    rustc_on_unimplemented(
        message = "results `{L}` and `{R}` cannot be sequenced with shapes `{Self}`",
        label = "No sequencing rule",
    )
)]
pub trait Sequence<L, R> {
    type Out;
    type Shape: Shape;

    fn join(left: L, right: R) -> Self::Out;
}

impl Sequence<(), ()> for (Unit, Unit) {
    type Out = ();
    type Shape = Unit;

    fn join((): (), (): ()) -> Self::Out {}
}

macro_rules! drop_unit {
    ($($shape:ident),*) => {
        $(
            impl<R> Sequence<(), R> for (Unit, $shape) {
                type Out = R;
                type Shape = $shape;

                fn join((): (), right: R) -> Self::Out {
                    right
                }
            }

            impl<L> Sequence<L, ()> for ($shape, Unit) {
                type Out = L;
                type Shape = $shape;

                fn join(left: L, (): ()) -> Self::Out {
                    left
                }
            }
        )*
    };
}

drop_unit!(Value, Text, Tuple);

macro_rules! single_rules {
    ($($left:ident & $right:ident),*) => {
        $(
            impl<L, R> Sequence<L, R> for ($left, $right) {
                type Out = (L, R);
                type Shape = Tuple;

                fn join(left: L, right: R) -> Self::Out {
                    (left, right)
                }
            }
        )*
    };
}

single_rules!(Value & Value, Value & Text, Text & Value, Text & Text);

macro_rules! tuple_rules {
    ($($single:ident),*) => {
        $(
            impl<L: Push<R>, R> Sequence<L, R> for (Tuple, $single) {
                type Out = L::Out;
                type Shape = Tuple;

                fn join(left: L, right: R) -> Self::Out {
                    left.push(right)
                }
            }

            impl<L, R: Prepend<L>> Sequence<L, R> for ($single, Tuple) {
                type Out = R::Out;
                type Shape = Tuple;

                fn join(left: L, right: R) -> Self::Out {
                    right.prepend(left)
                }
            }
        )*
    };
}

tuple_rules!(Value, Text);

impl<L: Concat<R>, R> Sequence<L, R> for (Tuple, Tuple) {
    type Out = L::Out;
    type Shape = Tuple;

    fn join(left: L, right: R) -> Self::Out {
        left.concat(right)
    }
}

/// Combines the results of two alternatives into one type.
/// Implemented on pairs of [Shape]s.
#[cfg_attr(
    feature = "nightly",
    rustc_on_unimplemented(
        message = "alternatives producing `{L}` and `{R}` cannot be collapsed into one type",
        label = "use `either` for a tagged union of differing results",
    )
)]
pub trait Alternative<L, R> {
    type Out;
    type Shape: Shape;

    fn left(left: L) -> Self::Out;
    fn right(right: R) -> Self::Out;
}

impl Alternative<(), ()> for (Unit, Unit) {
    type Out = ();
    type Shape = Unit;

    fn left((): ()) -> Self::Out {}
    fn right((): ()) -> Self::Out {}
}

macro_rules! absorb_unit {
    ($($shape:ident),*) => {
        $(
            impl<R> Alternative<(), R> for (Unit, $shape) {
                type Out = Option<R>;
                type Shape = Value;

                fn left((): ()) -> Self::Out {
                    None
                }
                fn right(right: R) -> Self::Out {
                    Some(right)
                }
            }

            impl<L> Alternative<L, ()> for ($shape, Unit) {
                type Out = Option<L>;
                type Shape = Value;

                fn left(left: L) -> Self::Out {
                    Some(left)
                }
                fn right((): ()) -> Self::Out {
                    None
                }
            }
        )*
    };
}

absorb_unit!(Value, Text, Tuple);

macro_rules! collapse {
    ($($left:ident & $right:ident => $shape:ident),*) => {
        $(
            impl<T> Alternative<T, T> for ($left, $right) {
                type Out = T;
                type Shape = $shape;

                fn left(left: T) -> Self::Out {
                    left
                }
                fn right(right: T) -> Self::Out {
                    right
                }
            }
        )*
    };
}

collapse!(
    Value & Value => Value,
    Text & Text => Text,
    Tuple & Tuple => Tuple,
    Value & Text => Value,
    Text & Value => Value,
    Tuple & Value => Value,
    Value & Tuple => Value
);

/// A tagged union for alternatives with different results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Either<L, R> {
    Left(L),
    Right(R),
}

impl<L, R> Either<L, R> {
    pub fn is_left(&self) -> bool {
        matches!(self, Either::Left(_))
    }

    pub fn left(self) -> Option<L> {
        match self {
            Either::Left(l) => Some(l),
            Either::Right(_) => None,
        }
    }

    pub fn right(self) -> Option<R> {
        match self {
            Either::Left(_) => None,
            Either::Right(r) => Some(r),
        }
    }

    /// Reduce to a single value by handling each side.
    pub fn either<T>(self, on_left: impl FnOnce(L) -> T, on_right: impl FnOnce(R) -> T) -> T {
        match self {
            Either::Left(l) => on_left(l),
            Either::Right(r) => on_right(r),
        }
    }
}

impl<T> Either<T, T> {
    pub fn into_inner(self) -> T {
        match self {
            Either::Left(t) | Either::Right(t) => t,
        }
    }
}

/// Collects the results of a repeated node.
/// Implemented on [Shape]s.
pub trait Repeat<T> {
    type Out: Default;
    type Shape: Shape;

    fn push(acc: &mut Self::Out, item: T);
}

impl Repeat<()> for Unit {
    type Out = ();
    type Shape = Unit;

    fn push(_acc: &mut (), (): ()) {}
}

impl Repeat<char> for Text {
    type Out = String;
    type Shape = Value;

    fn push(acc: &mut String, item: char) {
        acc.push(item);
    }
}

impl<T> Repeat<T> for Value {
    type Out = Vec<T>;
    type Shape = Value;

    fn push(acc: &mut Vec<T>, item: T) {
        acc.push(item);
    }
}

impl<T> Repeat<T> for Tuple {
    type Out = Vec<T>;
    type Shape = Value;

    fn push(acc: &mut Vec<T>, item: T) {
        acc.push(item);
    }
}

/// Append a value to the end of a tuple.
pub trait Push<T> {
    type Out;
    fn push(self, item: T) -> Self::Out;
}

/// Add a value to the start of a tuple.
pub trait Prepend<T> {
    type Out;
    fn prepend(self, item: T) -> Self::Out;
}

/// Join two tuples into one.
pub trait Concat<R> {
    type Out;
    fn concat(self, right: R) -> Self::Out;
}

macro_rules! tuple_ops {
    ($($name:ident)+) => {
        impl<$($name,)+ Z> Push<Z> for ($($name,)+) {
            type Out = ($($name,)+ Z);

            #[allow(non_snake_case)]
            fn push(self, item: Z) -> Self::Out {
                let ($($name,)+) = self;
                ($($name,)+ item)
            }
        }

        impl<$($name,)+ Z> Prepend<Z> for ($($name,)+) {
            type Out = (Z, $($name,)+);

            #[allow(non_snake_case)]
            fn prepend(self, item: Z) -> Self::Out {
                let ($($name,)+) = self;
                (item, $($name,)+)
            }
        }
    };
}

tuple_ops!(A B);
tuple_ops!(A B C);
tuple_ops!(A B C D);
tuple_ops!(A B C D E);
tuple_ops!(A B C D E F);
tuple_ops!(A B C D E F G);
tuple_ops!(A B C D E F G H);
tuple_ops!(A B C D E F G H I);
tuple_ops!(A B C D E F G H I J);
tuple_ops!(A B C D E F G H I J K);

impl<T, B1, B2> Concat<(B1, B2)> for T
where
    T: Push<B1>,
    T::Out: Push<B2>,
{
    type Out = <T::Out as Push<B2>>::Out;

    fn concat(self, (b1, b2): (B1, B2)) -> Self::Out {
        self.push(b1).push(b2)
    }
}

// NOTE: Longer right hand sides push their first element and recurse on the rest.
macro_rules! concat_rules {
    ($first:ident $($rest:ident)+) => {
        impl<T, $first, $($rest,)+> Concat<($first, $($rest,)+)> for T
        where
            T: Push<$first>,
            T::Out: Concat<($($rest,)+)>,
        {
            type Out = <T::Out as Concat<($($rest,)+)>>::Out;

            #[allow(non_snake_case)]
            fn concat(self, ($first, $($rest,)+): ($first, $($rest,)+)) -> Self::Out {
                self.push($first).concat(($($rest,)+))
            }
        }
    };
}

concat_rules!(B1 B2 B3);
concat_rules!(B1 B2 B3 B4);
concat_rules!(B1 B2 B3 B4 B5);
concat_rules!(B1 B2 B3 B4 B5 B6);
concat_rules!(B1 B2 B3 B4 B5 B6 B7);
concat_rules!(B1 B2 B3 B4 B5 B6 B7 B8);
concat_rules!(B1 B2 B3 B4 B5 B6 B7 B8 B9);
concat_rules!(B1 B2 B3 B4 B5 B6 B7 B8 B9 B10);

#[cfg(test)]
mod tests {
    use super::*;

    fn seq<KL, KR, L, R>(left: L, right: R) -> <(KL, KR) as Sequence<L, R>>::Out
    where
        (KL, KR): Sequence<L, R>,
    {
        <(KL, KR)>::join(left, right)
    }

    #[test]
    fn units_are_dropped() {
        let () = seq::<Unit, Unit, _, _>((), ());
        assert_eq!(seq::<Unit, Value, _, _>((), 3), 3);
        assert_eq!(seq::<Value, Unit, _, _>("left", ()), "left");
        assert_eq!(seq::<Tuple, Unit, _, _>((1, 2), ()), (1, 2));
    }

    #[test]
    fn tuples_flatten() {
        assert_eq!(seq::<Value, Text, _, _>(1, 'a'), (1, 'a'));
        assert_eq!(seq::<Tuple, Value, _, _>((1, 'a'), "b"), (1, 'a', "b"));
        assert_eq!(seq::<Value, Tuple, _, _>(0, (1, 2)), (0, 1, 2));
        assert_eq!(
            seq::<Tuple, Tuple, _, _>((1, 2, 3), (4, 5, 6, 7)),
            (1, 2, 3, 4, 5, 6, 7)
        );
    }

    #[test]
    fn sequencing_is_associative() {
        let left = seq::<Tuple, Value, _, _>(seq::<Value, Value, _, _>(1, 2), 3);
        let right = seq::<Value, Tuple, _, _>(1, seq::<Value, Value, _, _>(2, 3));
        assert_eq!(left, right);
    }

    #[test]
    fn alternatives_collapse_or_absorb() {
        assert_eq!(<(Value, Value)>::left(1), 1);
        assert_eq!(<(Unit, Value) as Alternative<(), i32>>::left(()), None);
        assert_eq!(<(Unit, Value) as Alternative<(), i32>>::right(2), Some(2));
        assert_eq!(<(Tuple, Unit) as Alternative<(i32, i32), ()>>::left((1, 2)), Some((1, 2)));
        assert_eq!(<(Tuple, Value) as Alternative<(i32, i32), (i32, i32)>>::right((3, 4)), (3, 4));
        assert_eq!(<(Value, Tuple) as Alternative<(i32, i32), (i32, i32)>>::left((5, 6)), (5, 6));
    }

    #[test]
    fn repetition_containers() {
        let mut text = String::new();
        <Text as Repeat<char>>::push(&mut text, 'h');
        <Text as Repeat<char>>::push(&mut text, 'i');
        assert_eq!(text, "hi");

        let mut values = Vec::new();
        <Value as Repeat<u8>>::push(&mut values, 7);
        assert_eq!(values, vec![7]);
    }

    #[test]
    fn either_accessors() {
        let l: Either<i32, &str> = Either::Left(4);
        assert!(l.is_left());
        assert_eq!(l.left(), Some(4));
        assert_eq!(Either::<i32, i32>::Right(9).into_inner(), 9);
        assert_eq!(
            Either::<i32, &str>::Right("ab").either(|n| n as usize, str::len),
            2
        );
    }
}
