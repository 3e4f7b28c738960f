use crate::models::ChapterNavigation;

impl ChapterNavigation {
    /// Finds the neighbours of `current` by numeric order among `numbers`.
    ///
    /// Gaps in the numbering are skipped over, so with chapters `{1, 5, 7}`
    /// chapter 5 resolves to previous `1` and next `7`. The order of
    /// `numbers` does not matter and `current` itself is never returned.
    pub fn resolve(numbers: &[f64], current: f64) -> Self {
        let prev_chapter = numbers
            .iter()
            .copied()
            .filter(|n| *n < current)
            .max_by(f64::total_cmp);
        let next_chapter = numbers
            .iter()
            .copied()
            .filter(|n| *n > current)
            .min_by(f64::total_cmp);

        Self {
            prev_chapter,
            next_chapter,
        }
    }
}
