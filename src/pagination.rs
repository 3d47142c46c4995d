//! Fixed-size pagination over an ordered collection.
//!
//! The paginator only knows the total item count and the page size. Callers
//! resolve the requested page number first, ask for the matching
//! [`PageWindow`], fetch that slice from the store, and wrap the rows in a
//! [`Page`] for rendering.

use serde::Serialize;

/// The `LIMIT`/`OFFSET` pair a resolved page number maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub limit: u32,
    pub offset: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    count: u64,
    per_page: u32,
}

impl Paginator {
    pub fn new(count: u64, per_page: u32) -> Self {
        Self { count, per_page: per_page.max(1) }
    }

    /// An empty collection still has one (empty) page.
    pub fn num_pages(&self) -> u32 {
        if self.count == 0 {
            return 1;
        }
        let pages = (self.count + u64::from(self.per_page) - 1) / u64::from(self.per_page);
        u32::try_from(pages).unwrap_or(u32::MAX)
    }

    /// Turns the raw `page` query value into a valid page number.
    ///
    /// Missing or non-numeric input yields the first page; numbers outside
    /// `1..=num_pages` clamp to the last page.
    pub fn resolve(&self, raw: Option<&str>) -> u32 {
        let last = self.num_pages();
        let requested = match raw.map(str::trim).filter(|s| !s.is_empty()) {
            Some(value) => match value.parse::<i64>() {
                Ok(n) => n,
                // Still an integer, just wider than i64: out of range either way.
                Err(_) if is_integer_literal(value) => return last,
                Err(_) => return 1,
            },
            None => return 1,
        };

        if requested < 1 || requested > i64::from(last) {
            last
        } else {
            requested as u32
        }
    }

    pub fn window(&self, number: u32) -> PageWindow {
        let number = number.clamp(1, self.num_pages());
        PageWindow {
            limit: self.per_page,
            offset: u64::from(number - 1) * u64::from(self.per_page),
        }
    }

    pub fn page<T>(&self, number: u32, items: Vec<T>) -> Page<T> {
        let num_pages = self.num_pages();
        let number = number.clamp(1, num_pages);
        let per_page = u64::from(self.per_page);

        let (start_index, end_index) = if self.count == 0 {
            (0, 0)
        } else if number == num_pages {
            (per_page * u64::from(number - 1) + 1, self.count)
        } else {
            (per_page * u64::from(number - 1) + 1, per_page * u64::from(number))
        };

        Page {
            items,
            number,
            num_pages,
            count: self.count,
            has_previous: number > 1,
            has_next: number < num_pages,
            previous_page_number: (number > 1).then(|| number - 1),
            next_page_number: (number < num_pages).then(|| number + 1),
            start_index,
            end_index,
            page_range: (1..=num_pages).collect(),
        }
    }
}

fn is_integer_literal(value: &str) -> bool {
    let digits = value.strip_prefix(['+', '-']).unwrap_or(value);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// One page of results plus everything the paginator template needs.
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: u32,
    pub num_pages: u32,
    pub count: u64,
    pub has_previous: bool,
    pub has_next: bool,
    pub previous_page_number: Option<u32>,
    pub next_page_number: Option<u32>,
    pub start_index: u64,
    pub end_index: u64,
    pub page_range: Vec<u32>,
}

impl<T> Page<T> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thirteen() -> Paginator {
        Paginator::new(13, 10)
    }

    #[test]
    fn thirteen_items_split_into_ten_and_three() {
        let paginator = thirteen();
        assert_eq!(paginator.num_pages(), 2);

        let first = paginator.window(1);
        assert_eq!(first, PageWindow { limit: 10, offset: 0 });
        let items: Vec<u64> = (first.offset..13).take(first.limit as usize).collect();
        assert_eq!(paginator.page(1, items).len(), 10);

        let second = paginator.window(2);
        assert_eq!(second, PageWindow { limit: 10, offset: 10 });
        let items: Vec<u64> = (second.offset..13).take(second.limit as usize).collect();
        let page = paginator.page(2, items);
        assert_eq!(page.len(), 3);
        assert_eq!(page.start_index, 11);
        assert_eq!(page.end_index, 13);
        assert!(page.has_previous);
        assert!(!page.has_next);
    }

    #[test]
    fn missing_or_garbage_page_is_first() {
        let paginator = thirteen();
        assert_eq!(paginator.resolve(None), 1);
        assert_eq!(paginator.resolve(Some("")), 1);
        assert_eq!(paginator.resolve(Some("abc")), 1);
        assert_eq!(paginator.resolve(Some("1.5")), 1);
        assert_eq!(paginator.resolve(Some(" 2 ")), 2);
    }

    #[test]
    fn out_of_range_page_clamps_to_last() {
        let paginator = thirteen();
        assert_eq!(paginator.resolve(Some("3")), 2);
        assert_eq!(paginator.resolve(Some("999999999999")), 2);
        assert_eq!(paginator.resolve(Some("0")), 2);
        assert_eq!(paginator.resolve(Some("-4")), 2);
        assert_eq!(paginator.resolve(Some("99999999999999999999")), 2);
        assert_eq!(paginator.resolve(Some("-99999999999999999999")), 2);
    }

    #[test]
    fn empty_collection_has_one_empty_page() {
        let paginator = Paginator::new(0, 10);
        assert_eq!(paginator.num_pages(), 1);
        assert_eq!(paginator.resolve(Some("5")), 1);

        let page = paginator.page::<u64>(1, Vec::new());
        assert!(page.is_empty());
        assert_eq!(page.start_index, 0);
        assert_eq!(page.end_index, 0);
        assert!(!page.has_next);
        assert!(!page.has_previous);
        assert_eq!(page.page_range, vec![1]);
    }

    #[test]
    fn exact_multiple_has_no_trailing_page() {
        let paginator = Paginator::new(20, 10);
        assert_eq!(paginator.num_pages(), 2);
        let page = paginator.page(1, vec![0u8; 10]);
        assert_eq!(page.next_page_number, Some(2));
        assert_eq!(page.previous_page_number, None);
        assert_eq!(page.page_range, vec![1, 2]);
    }

    #[test]
    fn zero_page_size_is_treated_as_one() {
        let paginator = Paginator::new(3, 0);
        assert_eq!(paginator.num_pages(), 3);
        assert_eq!(paginator.window(2), PageWindow { limit: 1, offset: 1 });
    }
}
