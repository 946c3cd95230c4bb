//! Operand stack for charstring evaluation.

use super::blend::BlendState;
use crate::error::CharstringError;

/// Largest stack size of any charstring version (CFF2).
///
/// <https://learn.microsoft.com/en-us/typography/opentype/spec/cff2#table-9-top-dict-operator-entries>
const MAX_STACK: usize = 513;

/// Operand stack for charstrings.
///
/// Values are stored as `f64` since arithmetic operators (notably `div`) may
/// produce results that are not representable in 16.16 fixed point. The
/// capacity depends on the charstring version.
pub(crate) struct Stack {
    values: [f64; MAX_STACK],
    top: usize,
    limit: usize,
}

impl Stack {
    pub(crate) fn new(limit: usize) -> Self {
        Self {
            values: [0.0; MAX_STACK],
            top: 0,
            limit: limit.min(MAX_STACK),
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.top == 0
    }

    pub(crate) fn len(&self) -> usize {
        self.top
    }

    pub(crate) fn verify_at_least_len(&self, len: usize) -> Result<(), CharstringError> {
        if self.top < len {
            Err(CharstringError::StackUnderflow)
        } else {
            Ok(())
        }
    }

    /// Returns true if the number of elements on the stack is odd.
    ///
    /// Used for processing some charstring operators where an odd
    /// count represents the presence of the glyph advance width at the
    /// bottom of the stack.
    pub(crate) fn len_is_odd(&self) -> bool {
        self.top & 1 != 0
    }

    pub(crate) fn clear(&mut self) {
        self.top = 0;
    }

    pub(crate) fn push(&mut self, value: f64) -> Result<(), CharstringError> {
        if self.top == self.limit {
            return Err(CharstringError::StackOverflow);
        }
        self.values[self.top] = value;
        self.top += 1;
        Ok(())
    }

    pub(crate) fn pop(&mut self) -> Result<f64, CharstringError> {
        if self.top > 0 {
            self.top -= 1;
            Ok(self.values[self.top])
        } else {
            Err(CharstringError::StackUnderflow)
        }
    }

    /// Pops a value, truncating it to an integer.
    pub(crate) fn pop_i32(&mut self) -> Result<i32, CharstringError> {
        self.pop().map(|v| v as i32)
    }

    /// Returns the value at the given index from the bottom of the stack.
    pub(crate) fn get(&self, index: usize) -> Result<f64, CharstringError> {
        self.values()
            .get(index)
            .copied()
            .ok_or(CharstringError::StackUnderflow)
    }

    /// Returns an array of `N` values starting at `first_index`.
    pub(crate) fn get_array<const N: usize>(
        &self,
        first_index: usize,
    ) -> Result<[f64; N], CharstringError> {
        let end = first_index
            .checked_add(N)
            .filter(|end| *end <= self.top)
            .ok_or(CharstringError::StackUnderflow)?;
        let mut result = [0.0; N];
        result.copy_from_slice(&self.values[first_index..end]);
        Ok(result)
    }

    pub(crate) fn values(&self) -> &[f64] {
        &self.values[..self.top]
    }

    pub(crate) fn values_mut(&mut self) -> &mut [f64] {
        &mut self.values[..self.top]
    }

    /// Removes the bottom `count` values, shifting the rest down.
    pub(crate) fn remove_bottom(&mut self, count: usize) {
        let count = count.min(self.top);
        self.values.copy_within(count..self.top, 0);
        self.top -= count;
    }

    /// Apply the `blend` operator.
    ///
    /// See <https://learn.microsoft.com/en-us/typography/opentype/spec/cff2charstr#syntax-for-font-variations-support-operators>
    pub(crate) fn apply_blend(&mut self, blend_state: &BlendState) -> Result<(), CharstringError> {
        // When the blend operator is invoked, the stack will contain a set
        // of target values, followed by sets of deltas for those values for
        // each variation region, followed by the count of target values.
        //
        // For example, if we're blending two target values across three
        // variation regions, the stack would be setup as follows (parentheses
        // added to signify grouping of deltas):
        //
        // value_0 value_1 (delta_0_0 delta_0_1 delta_0_2) (delta_1_0 delta_1_1 delta_1_2) 2
        let target_value_count = self.pop_i32()?;
        let target_value_count =
            usize::try_from(target_value_count).map_err(|_| CharstringError::StackUnderflow)?;
        let region_count = blend_state.region_count();
        let operand_count = target_value_count
            .checked_mul(region_count + 1)
            .filter(|count| *count <= self.top)
            .ok_or(CharstringError::StackUnderflow)?;
        let start = self.top - operand_count;
        let (values, deltas) = self.values[start..self.top].split_at_mut(target_value_count);
        for (region_ix, scalar) in blend_state.scalars().iter().enumerate() {
            if *scalar == 0.0 {
                continue;
            }
            for (value_ix, value) in values.iter_mut().enumerate() {
                *value += deltas[region_count * value_ix + region_ix] * scalar;
            }
        }
        self.top = start + target_value_count;
        Ok(())
    }
}
