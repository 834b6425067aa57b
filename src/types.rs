use ndarray::Array2;

/// Annotation classes, in the order the classifier emits them.
///
/// The tracks are independent: a frame may carry speech and music at the
/// same time.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum Label {
    Speech,
    Music,
}

impl Label {
    /// Every class, in model output order.
    pub const ALL: [Label; 2] = [Label::Speech, Label::Music];

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Label::Speech => "speech",
            Label::Music => "music",
        }
    }

    pub fn parse(value: &str) -> Option<Label> {
        Label::ALL.into_iter().find(|label| label.as_str() == value)
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Number of classifier output classes.
pub const CLASS_COUNT: usize = Label::ALL.len();

/// (time frames x frequency bins) non-negative power spectra.
pub type SpectralMatrix = Array2<f32>;

/// (time frames x mel bands) log-scaled band energies.
pub type MelBandMatrix = Array2<f32>;

/// (time frames x classes) per-frame probabilities in [0, 1].
pub type ProbabilityMatrix = Array2<f32>;

/// (time frames x classes) per-frame boolean decisions.
pub type DecisionMatrix = Array2<bool>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_round_trip_through_text() {
        for label in Label::ALL {
            assert_eq!(Label::parse(label.as_str()), Some(label));
        }
        assert_eq!(Label::parse("noise"), None);
    }

    #[test]
    fn label_indices_match_enumeration_order() {
        assert_eq!(Label::Speech.index(), 0);
        assert_eq!(Label::Music.index(), 1);
    }
}
