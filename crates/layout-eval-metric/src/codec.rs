//! Packed pixel label codec.
//!
//! A label pixel is a packed `0x00RRGGBB` value. The low-order bits carry a
//! multi-hot class vector (bit `c` set means class `c` is present) and bit 23,
//! the top bit of the red channel, flags a ground-truth boundary pixel.
//! Prediction images never carry the boundary flag.
//!
//! The bit layout used by the layout analysis competitions is:
//!
//! | bit | mask       | class                     |
//! |-----|------------|---------------------------|
//! | 0   | `0x000001` | background (out of page)  |
//! | 1   | `0x000002` | comment                   |
//! | 2   | `0x000004` | decoration                |
//! | 3   | `0x000008` | main text body            |
//! | 23  | `0x800000` | boundary (ground truth)   |

/// Maximum number of classes a packed pixel value can carry.
pub const MAX_CLASSES: usize = u32::BITS as usize;

/// Bit index of the ground-truth boundary flag.
pub const BOUNDARY_BIT: u32 = 23;

/// Mask selecting the boundary flag of a packed pixel.
pub const BOUNDARY_MASK: u32 = 1 << BOUNDARY_BIT;

/// Class index that always denotes background.
pub const BACKGROUND: usize = 0;

/// Number of classes in the competition layout ground truth.
pub const DEFAULT_CLASS_COUNT: usize = 4;

/// Classes of the competition layout ground truth, by bit index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DivaClass {
    Background,
    Comment,
    Decoration,
    MainText,
}

impl DivaClass {
    /// All classes in bit order.
    pub const ALL: [Self; DEFAULT_CLASS_COUNT] = [
        Self::Background,
        Self::Comment,
        Self::Decoration,
        Self::MainText,
    ];

    /// Bit index of the class in a packed pixel.
    pub const fn index(self) -> usize {
        match self {
            Self::Background => 0,
            Self::Comment => 1,
            Self::Decoration => 2,
            Self::MainText => 3,
        }
    }

    /// Packed pixel mask of the class.
    pub const fn mask(self) -> u32 {
        1 << self.index()
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Background => "background",
            Self::Comment => "comment",
            Self::Decoration => "decoration",
            Self::MainText => "main text",
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

/// Human-readable name of a class index, `class<N>` past the known table.
pub fn class_name(index: usize) -> String {
    DivaClass::from_index(index).map_or_else(|| format!("class{index}"), |c| c.name().to_owned())
}

/// Fixed-size multi-hot label vector of one pixel.
///
/// Only the first `len` entries are meaningful; the rest are always `false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelVector {
    labels: [bool; MAX_CLASSES],
    len: usize,
}

impl LabelVector {
    /// Creates a vector of `len` absent labels. `len` is capped at [`MAX_CLASSES`].
    pub fn empty(len: usize) -> Self {
        Self {
            labels: [false; MAX_CLASSES],
            len: len.min(MAX_CLASSES),
        }
    }

    /// Decodes the low-order `nb_classes` bits of a packed pixel value.
    ///
    /// e.g. `0b0110` with 4 classes decodes to `[false, true, true, false]`.
    pub fn decode(value: u32, nb_classes: usize) -> Self {
        let mut vector = Self::empty(nb_classes);
        for c in 0..vector.len {
            vector.labels[c] = (value >> c) & 0x1 == 1;
        }
        vector
    }

    /// Packs the labels back into the low-order bits of a pixel value.
    pub fn encode(&self) -> u32 {
        self.as_slice()
            .iter()
            .enumerate()
            .filter(|(_, present)| **present)
            .fold(0, |acc, (c, _)| acc | (1 << c))
    }

    pub const fn len(&self) -> usize {
        self.len
    }

    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.labels[..self.len]
    }

    /// Returns whether class `c` is present. Out-of-range classes are absent.
    pub fn get(&self, c: usize) -> bool {
        c < self.len && self.labels[c]
    }

    /// Sets class `c`. Out-of-range classes are ignored.
    pub fn set(&mut self, c: usize, present: bool) {
        if c < self.len {
            self.labels[c] = present;
        }
    }

    /// Number of classes present.
    pub fn count(&self) -> usize {
        self.as_slice().iter().filter(|&&present| present).count()
    }

    /// Number of positions where the two vectors differ.
    pub fn hamming_distance(&self, other: &Self) -> usize {
        debug_assert_eq!(self.len, other.len);
        self.as_slice()
            .iter()
            .zip(other.as_slice())
            .filter(|(a, b)| a != b)
            .count()
    }

    /// Index of the first class present in both vectors.
    pub fn first_shared(&self, other: &Self) -> Option<usize> {
        (0..self.len.min(other.len)).find(|&c| self.labels[c] && other.labels[c])
    }

    /// Elementwise logical OR.
    pub fn union(&self, other: &Self) -> Self {
        let mut merged = *self;
        for c in 0..self.len.min(other.len) {
            merged.labels[c] |= other.labels[c];
        }
        merged
    }

    /// True when background is present together with at least one other class.
    pub fn is_contradictory(&self) -> bool {
        self.get(BACKGROUND) && self.as_slice().iter().skip(1).any(|&present| present)
    }
}

/// Decodes the boundary flag of a ground-truth pixel value.
pub const fn decode_boundary(value: u32) -> bool {
    (value >> BOUNDARY_BIT) & 0x1 == 1
}

/// Rewrites a ground-truth/prediction pair at a boundary pixel.
///
/// Background is forced into the ground truth. If the prediction then shares
/// at least one label with it, every ground-truth label is pasted onto the
/// prediction; extra predicted labels stay and count as mistakes. A
/// prediction sharing no label is left untouched.
pub fn apply_boundary_tolerance(ground_truth: &mut LabelVector, prediction: &mut LabelVector) {
    ground_truth.set(BACKGROUND, true);
    if ground_truth.first_shared(prediction).is_some() {
        *prediction = prediction.union(ground_truth);
    }
}

/// Decodes a ground-truth/prediction pixel pair with the boundary rewrite applied.
pub fn decode_pair(gt_value: u32, prediction_value: u32, nb_classes: usize) -> (LabelVector, LabelVector) {
    let mut ground_truth = LabelVector::decode(gt_value, nb_classes);
    let mut prediction = LabelVector::decode(prediction_value, nb_classes);
    if decode_boundary(gt_value) {
        apply_boundary_tolerance(&mut ground_truth, &mut prediction);
    }
    (ground_truth, prediction)
}
