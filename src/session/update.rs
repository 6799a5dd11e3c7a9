//! Route update fragment.

use super::UpdateType;
use crate::encoding::{EncodingError, Stream};
use crate::token::MAX_TOKENS;

/// What a client should do with its traffic, plus the token chain to do it.
///
/// ```text
///   update_type   integer [0, 2]
///   -- route and continue only --
///   multipath     bool
///   num_tokens    integer [0, MAX_TOKENS]
///   tokens        num_tokens * stride bytes
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RouteUpdate {
    pub update_type: UpdateType,
    pub multipath: bool,
    pub num_tokens: usize,
    pub tokens: Vec<u8>,
}

impl RouteUpdate {
    pub fn direct() -> Self {
        Self::default()
    }

    /// Wrap a sealed token chain. `update_type` picks the stride.
    pub fn with_tokens(update_type: UpdateType, multipath: bool, tokens: Vec<u8>) -> Self {
        let stride = update_type.token_stride();
        let num_tokens = if stride == 0 { 0 } else { tokens.len() / stride };
        Self {
            update_type,
            multipath,
            num_tokens,
            tokens,
        }
    }

    pub fn serialize<S: Stream>(&mut self, stream: &mut S) {
        let mut tag = i32::from(self.update_type.to_byte());
        stream.serialize_integer(&mut tag, 0, 2);
        if stream.error().is_some() {
            return;
        }
        if stream.is_reading() {
            match UpdateType::from_byte(tag as u8) {
                Some(update_type) => self.update_type = update_type,
                None => {
                    stream.fail(EncodingError::OutOfRange {
                        value: i64::from(tag),
                        min: 0,
                        max: 2,
                    });
                    return;
                }
            }
        }

        if self.update_type == UpdateType::Direct {
            if stream.is_reading() {
                self.multipath = false;
                self.num_tokens = 0;
                self.tokens.clear();
            }
            return;
        }

        stream.serialize_bool(&mut self.multipath);
        let mut num_tokens = i32::try_from(self.num_tokens).unwrap_or(i32::MAX);
        stream.serialize_integer(&mut num_tokens, 0, MAX_TOKENS as i32);
        if stream.error().is_some() {
            return;
        }

        let expected = num_tokens as usize * self.update_type.token_stride();
        if stream.is_reading() {
            self.num_tokens = num_tokens as usize;
            self.tokens = vec![0u8; expected];
        } else if self.tokens.len() != expected {
            stream.fail(EncodingError::LengthMismatch {
                expected,
                got: self.tokens.len(),
            });
            return;
        }
        if expected > 0 {
            stream.serialize_bytes(&mut self.tokens);
        }
    }
}
