// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

/// Capacity-limited, insertion-ordered buffer of encoded log lines.
///
/// Owned by the transfer loop only, so it carries no synchronisation.
/// Admission is all-or-nothing: an [`add`](Self::add) that would push the pool
/// past `size` is dropped in its entirety, even if part of it would fit.
#[derive(Debug)]
pub struct RecordPool {
    lines: Vec<String>,
    size: usize,
}

impl RecordPool {
    #[must_use]
    pub fn new(size: usize) -> Self {
        RecordPool {
            lines: Vec::new(),
            size,
        }
    }

    /// Appends `lines` if they all fit, otherwise leaves the pool untouched.
    ///
    /// Returns whether the lines were admitted. A refusal is not an error:
    /// the records are simply gone.
    pub fn add(&mut self, lines: Vec<String>) -> bool {
        if self.lines.len() + lines.len() > self.size {
            return false;
        }
        self.lines.extend(lines);
        true
    }

    /// Takes the current contents in insertion order, leaving the pool empty.
    pub fn get_and_reset(&mut self) -> Vec<String> {
        std::mem::take(&mut self.lines)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }
}
