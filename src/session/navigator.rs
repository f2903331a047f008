/// Cursor over the presented questions. Out-of-range requests clamp silently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Navigator {
    active: usize,
    len: usize,
}

impl Navigator {
    pub(crate) fn new(len: usize) -> Self {
        Self { active: 0, len }
    }

    pub(crate) fn active(&self) -> usize {
        self.active
    }

    pub(crate) fn next(&mut self) -> usize {
        self.go_to(self.active.saturating_add(1))
    }

    pub(crate) fn previous(&mut self) -> usize {
        self.go_to(self.active.saturating_sub(1))
    }

    pub(crate) fn go_to(&mut self, index: usize) -> usize {
        self.active = index.min(self.len.saturating_sub(1));
        self.active
    }
}
