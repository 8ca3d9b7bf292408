// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Symbol tables for diagram values.

use std::collections::BTreeMap;

/// Payload used for `#` when a table does not set one.
pub const DEFAULT_ERROR_PAYLOAD: &str = "error";

/// Conversion between a value and the single character that stands for it
/// in a diagram, used when a symbol is missing from a [`MarbleValues`] table.
///
/// Both directions default to `None`, so a type that only ever appears
/// through explicit tables needs an empty `impl FromMarble for MyType {}`.
pub trait FromMarble: Sized {
    /// Value for a literal diagram character.
    fn from_marble(symbol: char) -> Option<Self> {
        let _ = symbol;
        None
    }

    /// Character that renders this value, if there is a natural one.
    fn to_marble(&self) -> Option<char> {
        None
    }
}

fn single_char(text: &str) -> Option<char> {
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

impl FromMarble for char {
    fn from_marble(symbol: char) -> Option<Self> {
        Some(symbol)
    }

    fn to_marble(&self) -> Option<char> {
        Some(*self)
    }
}

impl FromMarble for String {
    fn from_marble(symbol: char) -> Option<Self> {
        Some(symbol.to_string())
    }

    fn to_marble(&self) -> Option<char> {
        single_char(self)
    }
}

/// Static strings only convert outward; bind them in a table to use them.
impl FromMarble for &'static str {
    fn to_marble(&self) -> Option<char> {
        single_char(self)
    }
}

macro_rules! digit_marbles {
    ($($ty:ty),* $(,)?) => {$(
        impl FromMarble for $ty {
            fn from_marble(symbol: char) -> Option<Self> {
                symbol.to_digit(10).and_then(|digit| <$ty>::try_from(digit).ok())
            }

            fn to_marble(&self) -> Option<char> {
                u32::try_from(*self).ok().and_then(|digit| char::from_digit(digit, 10))
            }
        }
    )*};
}

digit_marbles!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize);

/// Maps diagram symbols to values and carries the payload for `#`.
///
/// ```
/// use ripple_marbles::MarbleValues;
///
/// let values = MarbleValues::new().with('a', "apple").with_error("oops");
/// assert_eq!(values.get('a'), Some(&"apple"));
/// assert_eq!(values.error_payload(), "oops");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MarbleValues<T> {
    values: BTreeMap<char, T>,
    error: Option<String>,
}

impl<T> MarbleValues<T> {
    /// Empty table; every symbol falls back to [`FromMarble`].
    pub fn new() -> Self {
        Self {
            values: BTreeMap::new(),
            error: None,
        }
    }

    /// Binds `symbol` to `value`.
    pub fn with(mut self, symbol: char, value: T) -> Self {
        self.values.insert(symbol, value);
        self
    }

    /// Sets the payload delivered for `#`.
    pub fn with_error(mut self, payload: impl Into<String>) -> Self {
        self.error = Some(payload.into());
        self
    }

    /// Value bound to `symbol`, ignoring the fallback.
    pub fn get(&self, symbol: char) -> Option<&T> {
        self.values.get(&symbol)
    }

    /// Payload for `#`; [`DEFAULT_ERROR_PAYLOAD`] unless set.
    pub fn error_payload(&self) -> &str {
        self.error.as_deref().unwrap_or(DEFAULT_ERROR_PAYLOAD)
    }

    /// Number of explicit bindings.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// `true` when no symbol is bound.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<T: Clone + FromMarble> MarbleValues<T> {
    /// Bound value for `symbol`, else the literal conversion.
    pub fn resolve(&self, symbol: char) -> Option<T> {
        self.values
            .get(&symbol)
            .cloned()
            .or_else(|| T::from_marble(symbol))
    }
}

impl<T: PartialEq + FromMarble> MarbleValues<T> {
    /// Character to draw for `value`: the lowest bound symbol holding an
    /// equal value, else [`FromMarble::to_marble`], else `?`.
    pub fn symbol_for(&self, value: &T) -> char {
        self.values
            .iter()
            .find(|(_, bound)| *bound == value)
            .map(|(symbol, _)| *symbol)
            .or_else(|| value.to_marble())
            .unwrap_or('?')
    }
}

impl<T> Default for MarbleValues<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FromIterator<(char, T)> for MarbleValues<T> {
    fn from_iter<I: IntoIterator<Item = (char, T)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bound_symbols_win_over_literal_conversion() {
        let values = MarbleValues::new().with('a', 'Z');
        assert_eq!(values.resolve('a'), Some('Z'));
        assert_eq!(values.resolve('b'), Some('b'));
    }

    #[test]
    fn digits_convert_for_integers_only() {
        let values: MarbleValues<u8> = MarbleValues::new();
        assert_eq!(values.resolve('7'), Some(7));
        assert_eq!(values.resolve('x'), None);
        assert_eq!(42_u8.to_marble(), None);
        assert_eq!((-1_i32).to_marble(), None);
    }

    #[test]
    fn symbol_lookup_prefers_bindings() {
        let values: MarbleValues<String> = [('a', "a+".to_owned())].into_iter().collect();
        assert_eq!(values.symbol_for(&"a+".to_owned()), 'a');
        assert_eq!(values.symbol_for(&"q".to_owned()), 'q');
        assert_eq!(values.symbol_for(&"long".to_owned()), '?');
    }

    #[test]
    fn error_payload_defaults() {
        let values: MarbleValues<char> = MarbleValues::new();
        assert_eq!(values.error_payload(), DEFAULT_ERROR_PAYLOAD);
    }
}
