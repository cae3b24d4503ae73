//! Paging of large result collections.
//!
//! A [`NodeBatcher`] borrows an immutable collection (root groups, group members,
//! chain steps) and hands out index-addressed pages of it. Nothing is copied or
//! reordered in place: a declared sort order is computed once, as a permutation
//! of indices, the first time it is needed.
//!
//! Collections up to `max_page_nodes` are presented whole. Larger ones are
//! presented either as a first page plus a remaining-count marker, or as a sample
//! page plus windows covering the full collection:
//!
//! ```text
//! 2500 GC roots, max 1000:
//!   <sample 1000 GC roots>
//!   <GC roots 1-1000>
//!   <GC roots 1001-2000>
//!   <GC roots 2001-2500>
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::sync::OnceLock;

use crate::config::{DEFAULT_MAX_PAGE_NODES, EngineConfig, OverflowMode};

type Comparator<T> = Box<dyn Fn(&T, &T) -> Ordering + Send + Sync>;

/// What the items of a batched collection are, for display labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Noun {
    /// Root groups.
    GcRoots,
    /// Heap instances.
    Instances,
    /// Chain steps.
    Steps,
}

impl Noun {
    /// Plural label used in markers.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::GcRoots => "GC roots",
            Self::Instances => "instances",
            Self::Steps => "steps",
        }
    }
}

/// A contiguous slice of a batched collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<'a, T> {
    /// Index of the first item, in presentation order.
    pub start: usize,
    /// The items.
    pub items: Vec<&'a T>,
    /// Size of the whole collection.
    pub total: usize,
}

impl<T> Page<'_, T> {
    /// Index one past the last item.
    #[must_use]
    pub fn end(&self) -> usize {
        self.start + self.items.len()
    }

    /// Returns `true` if items follow this page.
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.end() < self.total
    }
}

/// Marker for items left out of a truncated presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoreMarker {
    /// Items not shown.
    pub remaining: usize,
    /// What the items are.
    pub noun: Noun,
}

impl fmt::Display for MoreMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<another {} {} left>", self.remaining, self.noun.as_str())
    }
}

/// Marker labelling the sample page of a windowed presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleMarker {
    /// Items in the sample.
    pub count: usize,
    /// What the items are.
    pub noun: Noun,
}

impl fmt::Display for SampleMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<sample {} {}>", self.count, self.noun.as_str())
    }
}

/// An index range of a batched collection, resolved lazily via
/// [`NodeBatcher::window`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    /// First index, inclusive.
    pub start: usize,
    /// Last index, exclusive.
    pub end: usize,
    /// What the items are.
    pub noun: Noun,
}

impl Window {
    /// Number of items in the window.
    #[must_use]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Returns `true` if the window holds no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} {}-{}>", self.noun.as_str(), self.start + 1, self.end)
    }
}

/// How a batched collection is shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Presentation<'a, T> {
    /// Everything fits on one page.
    Full(Page<'a, T>),
    /// The first page, followed by a count of what was left out.
    Truncated {
        /// First `max_page_nodes` items.
        page: Page<'a, T>,
        /// Items not shown.
        more: MoreMarker,
    },
    /// A sample page, followed by windows covering the whole collection.
    Windowed {
        /// Label for the sample page.
        sample_label: SampleMarker,
        /// First `max_page_nodes` items.
        sample: Page<'a, T>,
        /// Consecutive windows of at most `max_page_nodes` items.
        windows: Vec<Window>,
    },
}

/// Index-addressed pager over a borrowed, immutable collection.
///
/// Pages borrow from the collection, not from the batcher, so they outlive it.
pub struct NodeBatcher<'a, T> {
    items: &'a [T],
    compare: Option<Comparator<T>>,
    order: OnceLock<Vec<usize>>,
    max_page_nodes: usize,
    overflow: OverflowMode,
    noun: Noun,
}

impl<T> fmt::Debug for NodeBatcher<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeBatcher")
            .field("len", &self.items.len())
            .field("sorted", &self.compare.is_some())
            .field("max_page_nodes", &self.max_page_nodes)
            .field("overflow", &self.overflow)
            .field("noun", &self.noun)
            .finish_non_exhaustive()
    }
}

impl<'a, T> NodeBatcher<'a, T> {
    /// Create a batcher over `items` with the default threshold.
    #[must_use]
    pub fn new(items: &'a [T], noun: Noun) -> Self {
        Self {
            items,
            compare: None,
            order: OnceLock::new(),
            max_page_nodes: DEFAULT_MAX_PAGE_NODES,
            overflow: OverflowMode::default(),
            noun,
        }
    }

    /// Take the threshold and overflow mode from an engine config.
    #[must_use]
    pub fn with_config(mut self, config: &EngineConfig) -> Self {
        self.max_page_nodes = config.max_page_nodes.max(1);
        self.overflow = config.overflow;
        self
    }

    /// Set the largest collection shown as a single page.
    #[must_use]
    pub fn with_max_page_nodes(mut self, max_page_nodes: usize) -> Self {
        self.max_page_nodes = max_page_nodes.max(1);
        self
    }

    /// Set how collections above the threshold are presented.
    #[must_use]
    pub fn with_overflow(mut self, overflow: OverflowMode) -> Self {
        self.overflow = overflow;
        self
    }

    /// Declare the presentation order. Ties keep collection order.
    #[must_use]
    pub fn sorted_by<F>(mut self, compare: F) -> Self
    where
        F: Fn(&T, &T) -> Ordering + Send + Sync + 'static,
    {
        self.compare = Some(Box::new(compare));
        self.order = OnceLock::new();
        self
    }

    /// Declare the presentation order by a key. Ties keep collection order.
    #[must_use]
    pub fn sorted_by_key<K, F>(self, key: F) -> Self
    where
        K: Ord,
        F: Fn(&T) -> K + Send + Sync + 'static,
    {
        self.sorted_by(move |a, b| key(a).cmp(&key(b)))
    }

    /// Number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if there are no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The item at `index` in presentation order.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&'a T> {
        let slot = match self.sort_order() {
            Some(order) => *order.get(index)?,
            None => index,
        };
        let items = self.items;
        items.get(slot)
    }

    /// Items `start..start + size` in presentation order.
    ///
    /// Out-of-range requests yield a short or empty page. Repeated requests
    /// return identical pages.
    #[must_use]
    pub fn page(&self, start: usize, size: usize) -> Page<'a, T> {
        let total = self.items.len();
        let start = start.min(total);
        let end = start.saturating_add(size).min(total);

        let all = self.items;
        let items = match self.sort_order() {
            Some(order) => order[start..end].iter().map(|&i| &all[i]).collect(),
            None => all[start..end].iter().collect(),
        };
        Page {
            start,
            items,
            total,
        }
    }

    /// The items covered by `window`.
    #[must_use]
    pub fn window(&self, window: &Window) -> Page<'a, T> {
        self.page(window.start, window.len())
    }

    /// Consecutive windows of at most `max_page_nodes` items covering everything.
    #[must_use]
    pub fn windows(&self) -> Vec<Window> {
        let total = self.items.len();
        (0..total)
            .step_by(self.max_page_nodes)
            .map(|start| Window {
                start,
                end: (start + self.max_page_nodes).min(total),
                noun: self.noun,
            })
            .collect()
    }

    /// Decide how the collection is shown.
    #[must_use]
    pub fn present(&self) -> Presentation<'a, T> {
        let total = self.items.len();
        let first = self.page(0, self.max_page_nodes);
        if total <= self.max_page_nodes {
            return Presentation::Full(first);
        }

        match self.overflow {
            OverflowMode::Truncate => Presentation::Truncated {
                more: MoreMarker {
                    remaining: total - first.items.len(),
                    noun: self.noun,
                },
                page: first,
            },
            OverflowMode::Windows => Presentation::Windowed {
                sample_label: SampleMarker {
                    count: first.items.len(),
                    noun: self.noun,
                },
                sample: first,
                windows: self.windows(),
            },
        }
    }

    /// The sorted permutation, computed on first use.
    fn sort_order(&self) -> Option<&[usize]> {
        let compare = self.compare.as_ref()?;
        let order = self.order.get_or_init(|| {
            let mut order: Vec<usize> = (0..self.items.len()).collect();
            // stable sort: equal items keep collection order
            order.sort_by(|&a, &b| compare(&self.items[a], &self.items[b]));
            order
        });
        Some(order)
    }
}
