//! Selection + scroll offset over a list of items.

pub struct ScrollableList<T> {
    items: Vec<T>,
    selected: usize,
    scroll_offset: usize,
}

impl<T> Default for ScrollableList<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            selected: 0,
            scroll_offset: 0,
        }
    }
}

impl<T> ScrollableList<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the items, keeping the selection on the item `same` matches if
    /// it is still present.
    pub fn set_items(&mut self, items: Vec<T>, same: impl Fn(&T, &T) -> bool) {
        let keep = self
            .selected_item()
            .and_then(|prev| items.iter().position(|item| same(prev, item)));
        self.items = items;
        self.selected = keep.unwrap_or(0);
        self.clamp();
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn select_up(&mut self, n: usize) {
        self.selected = self.selected.saturating_sub(n);
    }

    pub fn select_down(&mut self, n: usize) {
        self.selected = (self.selected + n).min(self.items.len().saturating_sub(1));
    }

    pub fn select_first(&mut self) {
        self.selected = 0;
        self.scroll_offset = 0;
    }

    pub fn select_last(&mut self) {
        self.selected = self.items.len().saturating_sub(1);
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn selected_item(&self) -> Option<&T> {
        self.items.get(self.selected)
    }

    /// Returns (index, &item) pairs visible in `height` rows.
    /// Call `ensure_visible` first to update the scroll offset.
    pub fn visible_items(&self, height: usize) -> impl Iterator<Item = (usize, &T)> {
        self.items
            .iter()
            .enumerate()
            .skip(self.scroll_offset)
            .take(height)
    }

    pub fn ensure_visible(&mut self, height: usize) {
        if height == 0 {
            return;
        }
        if self.selected < self.scroll_offset {
            self.scroll_offset = self.selected;
        } else if self.selected >= self.scroll_offset + height {
            self.scroll_offset = self.selected + 1 - height;
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn clamp(&mut self) {
        if self.selected >= self.items.len() {
            self.selected = self.items.len().saturating_sub(1);
        }
        if self.scroll_offset > self.selected {
            self.scroll_offset = self.selected;
        }
    }
}
