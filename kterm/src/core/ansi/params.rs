// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The CSI/DCS parameter model.
//!
//! Parameters are signed 32-bit with a "default" sentinel (an empty slot),
//! `;` separated, with `:` introducing sub-parameters (SGR 38/48/58 and
//! underline styles). A leading `+` or `-` sign is accepted where the
//! sequence allows signed values; strict mode clamps negative CSI values
//! to 0 at finalization, silently. Parameter overflow wraps the parameter
//! index instead of growing without bound.

use smallvec::SmallVec;

/// Hard cap on `;`-separated parameters; overflow wraps to index 0.
pub const MAX_PARAMS: usize = 16;
/// Hard cap on `:`-separated sub-parameters per parameter.
pub const MAX_SUBPARAMS: usize = 6;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Param {
    /// `None` means the parameter was omitted (default).
    pub value: Option<i32>,
    pub subs: SmallVec<[i32; MAX_SUBPARAMS]>,
}

/// Accumulated parameter list plus the in-flight accumulation state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    items: SmallVec<[Param; MAX_PARAMS]>,
    /// Digits seen for the slot currently accumulating.
    current: Option<i64>,
    negative: bool,
    in_sub: bool,
    /// Set once the list wrapped past [`MAX_PARAMS`].
    wrapped: bool,
}

impl Params {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    pub fn clear(&mut self) { *self = Self::default(); }

    // ── Accumulation (driven by the parser) ─────────────────────────────

    pub fn push_digit(&mut self, digit: u8) {
        let current = self.current.unwrap_or(0);
        // Saturate instead of overflowing on hostile digit strings.
        self.current = Some((current * 10 + i64::from(digit)).min(i64::from(i32::MAX)));
    }

    /// `+` / `-` prefix. Only honored at the start of a slot.
    pub fn push_sign(&mut self, negative: bool) {
        if self.current.is_none() {
            self.negative = negative;
        }
    }

    /// `;` ends the current parameter.
    pub fn next_param(&mut self) {
        self.commit_slot();
        self.in_sub = false;
    }

    /// `:` ends the current value and opens a sub-parameter slot.
    pub fn next_subparam(&mut self) {
        self.commit_slot();
        self.in_sub = true;
    }

    /// Finish accumulation at the final byte. When `clamp_negative` is set
    /// (strict mode), negative top-level values clamp to 0, silently.
    pub fn finish(&mut self, clamp_negative: bool) {
        self.commit_slot();
        if clamp_negative {
            for param in &mut self.items {
                if let Some(v) = param.value
                    && v < 0
                {
                    param.value = Some(0);
                }
            }
        }
    }

    fn commit_slot(&mut self) {
        let value = self.current.take().map(|v| {
            let v = v.min(i64::from(i32::MAX)) as i32;
            if self.negative { -v } else { v }
        });
        self.negative = false;

        if self.in_sub {
            if let Some(last) = self.items.last_mut() {
                if last.subs.len() < MAX_SUBPARAMS {
                    last.subs.push(value.unwrap_or(0));
                }
                return;
            }
        }

        if self.items.len() == MAX_PARAMS {
            // Wrap the parameter index rather than crash or grow.
            self.wrapped = true;
            self.items[0] = Param { value, subs: SmallVec::new() };
        } else {
            self.items.push(Param { value, subs: SmallVec::new() });
        }
    }

    // ── Access ──────────────────────────────────────────────────────────

    #[must_use]
    pub fn len(&self) -> usize { self.items.len() }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty() || (self.items.len() == 1 && self.items[0].value.is_none())
    }

    #[must_use]
    pub fn wrapped(&self) -> bool { self.wrapped }

    /// Parameter `index`, with the sequence's default for omitted slots.
    #[must_use]
    pub fn get(&self, index: usize, default: i32) -> i32 {
        self.items
            .get(index)
            .and_then(|p| p.value)
            .unwrap_or(default)
    }

    /// Sub-parameter `sub` of parameter `index`.
    #[must_use]
    pub fn sub(&self, index: usize, sub: usize) -> Option<i32> {
        self.items.get(index).and_then(|p| p.subs.get(sub)).copied()
    }

    #[must_use]
    pub fn sub_len(&self, index: usize) -> usize {
        self.items.get(index).map_or(0, |p| p.subs.len())
    }

    /// Build a params list from `10;-5;20` style text. Used by unit tests
    /// and by the Gateway packet path, which re-enters sequences textually.
    #[must_use]
    pub fn parse_for_test(text: &str) -> Self {
        let mut params = Self::new();
        for byte in text.bytes() {
            match byte {
                b'0'..=b'9' => params.push_digit(byte - b'0'),
                b';' => params.next_param(),
                b':' => params.next_subparam(),
                b'-' => params.push_sign(true),
                b'+' => params.push_sign(false),
                _ => {}
            }
        }
        if !text.is_empty() {
            params.finish(false);
        }
        params
    }
}
