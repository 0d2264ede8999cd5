use std::fmt;

/// Zero-based feature column index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FeatureIndex(usize);

impl FeatureIndex {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Return the zero-based feature column index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for FeatureIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Index into a `Vec<Node>` arena, identifying a specific node in a decision tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeIndex(usize);

impl NodeIndex {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Return the zero-based arena index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Node impurity under the configured criterion.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Impurity(f64);

impl Impurity {
    pub(crate) fn new(value: f64) -> Self {
        Self(value)
    }

    /// Return the raw impurity value.
    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }
}

impl fmt::Display for Impurity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}", self.0)
    }
}

/// A node in a decision tree arena.
///
/// Trees are stored as `Vec<Node>` where children are referenced by
/// [`NodeIndex`] rather than pointers.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// An interior split node.
    Split {
        /// Feature used for the split.
        feature: FeatureIndex,
        /// Samples with `feature <= threshold` go left.
        threshold: f64,
        /// Index of the left child node.
        left: NodeIndex,
        /// Index of the right child node.
        right: NodeIndex,
        /// Impurity at this node before splitting.
        impurity: Impurity,
        /// Number of training samples that reached this node.
        n_samples: usize,
        /// `n * parent - n_left * left - n_right * right`, always positive.
        impurity_decrease: f64,
    },
    /// A terminal leaf node.
    Leaf {
        /// Majority class of the samples in this leaf (lowest index on ties).
        prediction: usize,
        /// Training sample count per class.
        class_counts: Vec<usize>,
        /// Impurity at this leaf.
        impurity: Impurity,
        /// Number of training samples in this leaf.
        n_samples: usize,
    },
}

impl Node {
    /// Return the impurity at this node (before splitting for interior nodes).
    #[must_use]
    pub fn impurity(&self) -> Impurity {
        match self {
            Node::Split { impurity, .. } | Node::Leaf { impurity, .. } => *impurity,
        }
    }

    /// Return the number of training samples that reached this node.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        match self {
            Node::Split { n_samples, .. } | Node::Leaf { n_samples, .. } => *n_samples,
        }
    }

    /// Return `true` if this node is a leaf.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf { .. })
    }
}

/// Index of the largest count, preferring the lowest index on ties.
pub(crate) fn majority_class(counts: &[usize]) -> usize {
    let mut best = 0;
    for (class, &count) in counts.iter().enumerate() {
        if count > counts[best] {
            best = class;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::{FeatureIndex, Impurity, Node, NodeIndex, majority_class};

    #[test]
    fn feature_index_roundtrip_and_display() {
        let fi = FeatureIndex::new(7);
        assert_eq!(fi.index(), 7);
        assert_eq!(format!("{fi}"), "7");
        assert!(FeatureIndex::new(1) < FeatureIndex::new(5));
    }

    #[test]
    fn node_index_roundtrip_and_display() {
        let ni = NodeIndex::new(42);
        assert_eq!(ni.index(), 42);
        assert_eq!(format!("{}", NodeIndex::new(0)), "0");
    }

    #[test]
    fn impurity_display() {
        assert_eq!(format!("{}", Impurity::new(0.333333)), "0.333333");
        assert_eq!(format!("{}", Impurity::new(0.0)), "0.000000");
    }

    #[test]
    fn majority_prefers_lowest_index_on_tie() {
        assert_eq!(majority_class(&[3, 3]), 0);
        assert_eq!(majority_class(&[1, 4]), 1);
        assert_eq!(majority_class(&[0, 0]), 0);
    }

    fn make_leaf() -> Node {
        Node::Leaf {
            prediction: 1,
            class_counts: vec![2, 8],
            impurity: Impurity::new(0.32),
            n_samples: 10,
        }
    }

    fn make_split() -> Node {
        Node::Split {
            feature: FeatureIndex::new(2),
            threshold: 3.5,
            left: NodeIndex::new(1),
            right: NodeIndex::new(2),
            impurity: Impurity::new(0.48),
            n_samples: 20,
            impurity_decrease: 3.2,
        }
    }

    #[test]
    fn node_accessors() {
        assert!(make_leaf().is_leaf());
        assert!(!make_split().is_leaf());
        assert_eq!(make_leaf().n_samples(), 10);
        assert_eq!(make_split().n_samples(), 20);
        assert!((make_leaf().impurity().value() - 0.32).abs() < f64::EPSILON);
        assert!((make_split().impurity().value() - 0.48).abs() < f64::EPSILON);
    }
}
