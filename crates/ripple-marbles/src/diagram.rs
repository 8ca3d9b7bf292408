// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Marble diagram parser and renderer.
//!
//! Every character occupies one frame unless noted:
//!
//! | Syntax            | Meaning                                                    |
//! |-------------------|------------------------------------------------------------|
//! | `-`               | idle frame                                                 |
//! | `a`..`z`, `0`..`9`| value, resolved through [`MarbleValues`]                   |
//! | `(ab\|)`          | synchronous group; all members share one frame             |
//! | `\|`              | completion                                                 |
//! | `#`               | error                                                      |
//! | `^`               | subscription point, frame zero (hot diagrams only)         |
//! | whitespace        | ignored, occupies no frame                                 |
//! | `10ms`, `2s`, `1m`| time progression (at start or after whitespace)            |
//!
//! Frames before `^` are negative. A diagram without `^` starts at zero.
//! A time progression may not reach past [`MAX_DIAGRAM_FRAMES`].

use std::collections::BTreeMap;

use ripple_core::StreamError;
use serde::Serialize;
use thiserror::Error;

use crate::notification::{Notification, RecordedEvent};
use crate::values::{FromMarble, MarbleValues};

/// Furthest frame a time progression may reach, counted from the first
/// character. Rendering draws every frame, so this bounds its output.
pub const MAX_DIAGRAM_FRAMES: i64 = 1_000_000;

/// Failure to parse a diagram. Positions are character offsets.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// A character outside the grammar, or one not allowed in its context.
    #[error("unexpected character {character:?} at position {position}")]
    UnexpectedCharacter {
        /// The offending character.
        character: char,
        /// Where it appeared.
        position: usize,
    },
    /// `(` without a matching `)`.
    #[error("group opened at position {position} is never closed")]
    UnclosedGroup {
        /// Position of the `(`.
        position: usize,
    },
    /// `)` without a preceding `(`.
    #[error("unmatched ')' at position {position}")]
    UnopenedGroup {
        /// Position of the `)`.
        position: usize,
    },
    /// `(` inside a group.
    #[error("nested group at position {position}")]
    NestedGroup {
        /// Position of the inner `(`.
        position: usize,
    },
    /// `()` with no events.
    #[error("empty group at position {position}")]
    EmptyGroup {
        /// Position of the `(`.
        position: usize,
    },
    /// A second `^`.
    #[error("second subscription point at position {position}")]
    DuplicateSubscriptionPoint {
        /// Position of the second `^`.
        position: usize,
    },
    /// A second `|` or `#`.
    #[error("second terminal marker at position {position}")]
    MultipleTerminals {
        /// Position of the second marker.
        position: usize,
    },
    /// A value or `^` after `|` or `#`.
    #[error("event after terminal marker at position {position}")]
    EventAfterTerminal {
        /// Position of the offending marker.
        position: usize,
    },
    /// A time progression that cannot be expressed in whole frames, or that
    /// reaches past [`MAX_DIAGRAM_FRAMES`].
    #[error("invalid time progression {text:?} at position {position}")]
    InvalidTimeProgression {
        /// The progression as written.
        text: String,
        /// Where it starts.
        position: usize,
    },
    /// A symbol neither bound in the value table nor convertible from its character.
    #[error("symbol {symbol:?} at position {position} has no value")]
    UnmappedSymbol {
        /// The symbol.
        symbol: char,
        /// Where it appeared.
        position: usize,
    },
    /// `^` in a diagram used for a cold stream.
    #[error("cold diagrams cannot contain a subscription point (position {position})")]
    SubscriptionPointInCold {
        /// Position of the `^`.
        position: usize,
    },
}

/// What a token marks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "symbol", rename_all = "snake_case")]
pub enum TokenKind {
    /// A value symbol.
    Value(char),
    /// `#`
    Error,
    /// `|`
    Complete,
    /// `^`
    SubscriptionPoint,
}

impl TokenKind {
    /// The character this kind is written as.
    pub fn symbol(self) -> char {
        match self {
            Self::Value(symbol) => symbol,
            Self::Error => '#',
            Self::Complete => '|',
            Self::SubscriptionPoint => '^',
        }
    }

    /// `true` for `|` and `#`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Error | Self::Complete)
    }
}

/// One parsed marker with its frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct DiagramToken {
    /// Frame relative to the subscription point (or the start).
    pub frame: i64,
    /// What happens at that frame.
    pub kind: TokenKind,
    /// Character offset in the source text.
    pub position: usize,
}

/// A parsed diagram.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Diagram {
    tokens: Vec<DiagramToken>,
    start_frame: i64,
    end_frame: i64,
}

/// Parses `text` with one millisecond per frame.
pub fn parse_diagram(text: &str) -> Result<Diagram, ParseError> {
    Diagram::parse(text)
}

impl Diagram {
    /// Parses `text` with one millisecond per frame.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        Self::parse_with(text, 1)
    }

    /// Parses `text`; time progressions are divided by `frame_duration_ms`.
    pub fn parse_with(text: &str, frame_duration_ms: u64) -> Result<Self, ParseError> {
        let chars: Vec<char> = text.chars().collect();
        let mut tokens = Vec::new();
        let mut frame: i64 = 0;
        // (position of '(', events so far)
        let mut group: Option<(usize, usize)> = None;
        let mut caret: Option<i64> = None;
        let mut terminated = false;

        let mut i = 0;
        while i < chars.len() {
            let c = chars[i];
            let after_gap = i == 0 || chars[i - 1].is_whitespace();
            if group.is_none() && after_gap && c.is_ascii_digit() {
                if let Some((frames, len)) = time_progression(&chars, i, frame_duration_ms)? {
                    frame = frame.saturating_add(frames);
                    if frame > MAX_DIAGRAM_FRAMES {
                        return Err(ParseError::InvalidTimeProgression {
                            text: chars[i..i + len].iter().collect(),
                            position: i,
                        });
                    }
                    i += len;
                    continue;
                }
            }
            let event = match c {
                _ if c.is_whitespace() => None,
                '-' if group.is_none() => {
                    frame = frame.saturating_add(1);
                    None
                }
                '(' => {
                    if group.is_some() {
                        return Err(ParseError::NestedGroup { position: i });
                    }
                    group = Some((i, 0));
                    None
                }
                ')' => {
                    let Some((open, count)) = group.take() else {
                        return Err(ParseError::UnopenedGroup { position: i });
                    };
                    if count == 0 {
                        return Err(ParseError::EmptyGroup { position: open });
                    }
                    frame = frame.saturating_add(1);
                    None
                }
                '^' if group.is_none() => {
                    if terminated {
                        return Err(ParseError::EventAfterTerminal { position: i });
                    }
                    if caret.is_some() {
                        return Err(ParseError::DuplicateSubscriptionPoint { position: i });
                    }
                    caret = Some(frame);
                    Some(TokenKind::SubscriptionPoint)
                }
                '|' | '#' => {
                    if terminated {
                        return Err(ParseError::MultipleTerminals { position: i });
                    }
                    terminated = true;
                    Some(if c == '|' {
                        TokenKind::Complete
                    } else {
                        TokenKind::Error
                    })
                }
                _ if c.is_alphanumeric() => {
                    if terminated {
                        return Err(ParseError::EventAfterTerminal { position: i });
                    }
                    Some(TokenKind::Value(c))
                }
                _ => {
                    return Err(ParseError::UnexpectedCharacter {
                        character: c,
                        position: i,
                    })
                }
            };
            if let Some(kind) = event {
                tokens.push(DiagramToken {
                    frame,
                    kind,
                    position: i,
                });
                match group.as_mut() {
                    Some((_, count)) => *count += 1,
                    None => frame = frame.saturating_add(1),
                }
            }
            i += 1;
        }
        if let Some((open, _)) = group {
            return Err(ParseError::UnclosedGroup { position: open });
        }

        let offset = caret.unwrap_or(0);
        for token in &mut tokens {
            token.frame -= offset;
        }
        Ok(Self {
            tokens,
            start_frame: -offset,
            end_frame: frame - offset,
        })
    }

    /// All tokens in source order, including `^`.
    pub fn tokens(&self) -> &[DiagramToken] {
        &self.tokens
    }

    /// Value and terminal tokens.
    pub fn events(&self) -> impl Iterator<Item = &DiagramToken> {
        self.tokens
            .iter()
            .filter(|token| token.kind != TokenKind::SubscriptionPoint)
    }

    /// The `^` token, if any.
    pub fn subscription_point(&self) -> Option<&DiagramToken> {
        self.tokens
            .iter()
            .find(|token| token.kind == TokenKind::SubscriptionPoint)
    }

    /// The `|` or `#` token, if any.
    pub fn terminal(&self) -> Option<&DiagramToken> {
        self.tokens.iter().find(|token| token.kind.is_terminal())
    }

    /// First frame drawn (negative when there is history before `^`).
    pub fn start_frame(&self) -> i64 {
        self.start_frame
    }

    /// One past the last frame drawn, idle frames included.
    pub fn end_frame(&self) -> i64 {
        self.end_frame
    }

    /// Canonical text: one character per frame, multi-event frames as groups,
    /// no whitespace or time progressions.
    pub fn render(&self) -> String {
        let mut frames: BTreeMap<i64, Vec<char>> = BTreeMap::new();
        for token in &self.tokens {
            frames.entry(token.frame).or_default().push(token.kind.symbol());
        }
        render_frames(&frames, self.start_frame, self.end_frame)
    }

    /// Resolves every event into a notification, keeping negative frames.
    pub fn notifications<T>(
        &self,
        values: &MarbleValues<T>,
    ) -> Result<Vec<(i64, Notification<T>)>, ParseError>
    where
        T: Clone + FromMarble,
    {
        self.events()
            .map(|token| -> Result<(i64, Notification<T>), ParseError> {
                let notification = match token.kind {
                    TokenKind::Value(symbol) => Notification::Next(values.resolve(symbol).ok_or(
                        ParseError::UnmappedSymbol {
                            symbol,
                            position: token.position,
                        },
                    )?),
                    TokenKind::Error => {
                        Notification::Error(StreamError::raised(values.error_payload()))
                    }
                    TokenKind::Complete | TokenKind::SubscriptionPoint => Notification::Complete,
                };
                Ok((token.frame, notification))
            })
            .collect()
    }

    /// Events from frame zero on, as a recording would see them.
    pub fn expected_events<T>(
        &self,
        values: &MarbleValues<T>,
    ) -> Result<Vec<RecordedEvent<T>>, ParseError>
    where
        T: Clone + FromMarble,
    {
        Ok(self
            .notifications(values)?
            .into_iter()
            .filter_map(|(frame, notification)| {
                u64::try_from(frame)
                    .ok()
                    .map(|frame| RecordedEvent { frame, notification })
            })
            .collect())
    }
}

/// Draws `frames` from `start` up to `end` (or past the last occupied frame).
pub(crate) fn render_frames(frames: &BTreeMap<i64, Vec<char>>, start: i64, end: i64) -> String {
    let end = frames
        .keys()
        .next_back()
        .map_or(end, |last| end.max(last.saturating_add(1)));
    let mut out = String::new();
    for frame in start..end {
        match frames.get(&frame).map(Vec::as_slice) {
            None | Some([]) => out.push('-'),
            Some([single]) => out.push(*single),
            Some(many) => {
                out.push('(');
                out.extend(many);
                out.push(')');
            }
        }
    }
    out
}

/// Recognizes `<digits>(ms|s|m)` at `start`. Returns the frame count and the
/// number of characters consumed, or `None` when the text is not a progression.
fn time_progression(
    chars: &[char],
    start: usize,
    frame_duration_ms: u64,
) -> Result<Option<(i64, usize)>, ParseError> {
    let digits_end = start + chars[start..].iter().take_while(|c| c.is_ascii_digit()).count();
    let (unit_ms, unit_len) = match &chars[digits_end..] {
        ['m', 's', ..] => (1_u64, 2),
        ['s', ..] => (1_000, 1),
        ['m', ..] => (60_000, 1),
        _ => return Ok(None),
    };
    let end = digits_end + unit_len;
    if chars.get(end).is_some_and(|c| !c.is_whitespace()) {
        return Ok(None);
    }
    let invalid = || ParseError::InvalidTimeProgression {
        text: chars[start..end].iter().collect(),
        position: start,
    };
    let amount: u64 = chars[start..digits_end]
        .iter()
        .collect::<String>()
        .parse()
        .map_err(|_| invalid())?;
    let total_ms = amount.checked_mul(unit_ms).ok_or_else(invalid)?;
    if frame_duration_ms == 0 || total_ms % frame_duration_ms != 0 {
        return Err(invalid());
    }
    let frames = i64::try_from(total_ms / frame_duration_ms).map_err(|_| invalid())?;
    Ok(Some((frames, end - start)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn frames_of(text: &str) -> Vec<(i64, char)> {
        Diagram::parse(text)
            .unwrap()
            .tokens()
            .iter()
            .map(|token| (token.frame, token.kind.symbol()))
            .collect()
    }

    #[test]
    fn dashes_and_values_take_one_frame_each() {
        assert_eq!(frames_of("-a--b|"), vec![(1, 'a'), (4, 'b'), (5, '|')]);
    }

    #[test]
    fn group_members_share_a_frame_and_the_group_takes_one() {
        assert_eq!(
            frames_of("a-(bc)-d-|"),
            vec![(0, 'a'), (2, 'b'), (2, 'c'), (4, 'd'), (6, '|')]
        );
    }

    #[test]
    fn caret_is_frame_zero() {
        assert_eq!(
            frames_of("--a-^-b|"),
            vec![(-2, 'a'), (0, '^'), (2, 'b'), (3, '|')]
        );
        let diagram = Diagram::parse("--a-^-b|").unwrap();
        assert_eq!(diagram.start_frame(), -4);
        assert_eq!(diagram.end_frame(), 4);
    }

    #[test]
    fn whitespace_is_free() {
        assert_eq!(frames_of(" a b  |"), vec![(0, 'a'), (1, 'b'), (2, '|')]);
    }

    #[test]
    fn time_progressions_advance_by_duration() {
        assert_eq!(frames_of("1000ms (a|)"), vec![(1000, 'a'), (1000, '|')]);
        assert_eq!(frames_of("a 2s b"), vec![(0, 'a'), (2001, 'b')]);
        assert_eq!(
            Diagram::parse_with("1m a", 1000).unwrap().tokens()[0].frame,
            60
        );
    }

    #[test]
    fn digits_without_a_unit_are_values() {
        assert_eq!(frames_of("1-2"), vec![(0, '1'), (2, '2')]);
        assert_eq!(frames_of("5ms1"), vec![(0, '5'), (1, 'm'), (2, 's'), (3, '1')]);
    }

    #[test]
    fn progression_must_divide_into_frames() {
        assert_eq!(
            Diagram::parse_with("15ms a", 10),
            Err(ParseError::InvalidTimeProgression {
                text: "15ms".into(),
                position: 0
            })
        );
    }

    #[test]
    fn progression_past_the_frame_bound_is_rejected() {
        assert_eq!(
            Diagram::parse("100000000000ms a"),
            Err(ParseError::InvalidTimeProgression {
                text: "100000000000ms".into(),
                position: 0
            })
        );
        assert_eq!(
            Diagram::parse("-- 999999ms a"),
            Err(ParseError::InvalidTimeProgression {
                text: "999999ms".into(),
                position: 3
            })
        );
        let edge = Diagram::parse("1000000ms").unwrap();
        assert_eq!(edge.end_frame(), MAX_DIAGRAM_FRAMES);
    }

    #[test]
    fn subscription_point_after_terminal_is_rejected() {
        assert_eq!(
            Diagram::parse("a|^"),
            Err(ParseError::EventAfterTerminal { position: 2 })
        );
    }

    #[test]
    fn render_keeps_trailing_idle_frames() {
        let diagram = Diagram::parse("-a-(bc)--|---").unwrap();
        assert_eq!(diagram.render(), "-a-(bc)--|---");
    }

    #[test]
    fn render_normalizes_progressions_and_whitespace() {
        assert_eq!(Diagram::parse("a 3ms b").unwrap().render(), "a---b");
    }
}
