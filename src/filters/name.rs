use std::fmt;
use std::str::FromStr;

use crate::error::EditorError;

/// The fixed vocabulary of built-in image effects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterName {
    SharpenLuminance,
    PhotoEffectChrome,
    PhotoEffectFade,
    PhotoEffectInstant,
    PhotoEffectNoir,
    PhotoEffectProcess,
    PhotoEffectTonal,
    PhotoEffectTransfer,
    SepiaTone,
    ColorClamp,
    ColorInvert,
    ColorMonochrome,
    SpotLight,
    ColorPosterize,
    BoxBlur,
    DiscBlur,
    GaussianBlur,
    MaskedVariableBlur,
    MedianFilter,
    MotionBlur,
    NoiseReduction,
}

impl FilterName {
    /// Every supported filter, in the order the editor offers them
    pub const ALL: [FilterName; 21] = [
        FilterName::SharpenLuminance,
        FilterName::PhotoEffectChrome,
        FilterName::PhotoEffectFade,
        FilterName::PhotoEffectInstant,
        FilterName::PhotoEffectNoir,
        FilterName::PhotoEffectProcess,
        FilterName::PhotoEffectTonal,
        FilterName::PhotoEffectTransfer,
        FilterName::SepiaTone,
        FilterName::ColorClamp,
        FilterName::ColorInvert,
        FilterName::ColorMonochrome,
        FilterName::SpotLight,
        FilterName::ColorPosterize,
        FilterName::BoxBlur,
        FilterName::DiscBlur,
        FilterName::GaussianBlur,
        FilterName::MaskedVariableBlur,
        FilterName::MedianFilter,
        FilterName::MotionBlur,
        FilterName::NoiseReduction,
    ];

    /// Canonical identifier, e.g. `CIPhotoEffectNoir`
    pub fn identifier(&self) -> &'static str {
        match self {
            FilterName::SharpenLuminance => "CISharpenLuminance",
            FilterName::PhotoEffectChrome => "CIPhotoEffectChrome",
            FilterName::PhotoEffectFade => "CIPhotoEffectFade",
            FilterName::PhotoEffectInstant => "CIPhotoEffectInstant",
            FilterName::PhotoEffectNoir => "CIPhotoEffectNoir",
            FilterName::PhotoEffectProcess => "CIPhotoEffectProcess",
            FilterName::PhotoEffectTonal => "CIPhotoEffectTonal",
            FilterName::PhotoEffectTransfer => "CIPhotoEffectTransfer",
            FilterName::SepiaTone => "CISepiaTone",
            FilterName::ColorClamp => "CIColorClamp",
            FilterName::ColorInvert => "CIColorInvert",
            FilterName::ColorMonochrome => "CIColorMonochrome",
            FilterName::SpotLight => "CISpotLight",
            FilterName::ColorPosterize => "CIColorPosterize",
            FilterName::BoxBlur => "CIBoxBlur",
            FilterName::DiscBlur => "CIDiscBlur",
            FilterName::GaussianBlur => "CIGaussianBlur",
            FilterName::MaskedVariableBlur => "CIMaskedVariableBlur",
            FilterName::MedianFilter => "CIMedianFilter",
            FilterName::MotionBlur => "CIMotionBlur",
            FilterName::NoiseReduction => "CINoiseReduction",
        }
    }

    /// Short command-line alias, e.g. `noir`
    pub fn alias(&self) -> &'static str {
        match self {
            FilterName::SharpenLuminance => "sharpen",
            FilterName::PhotoEffectChrome => "chrome",
            FilterName::PhotoEffectFade => "fade",
            FilterName::PhotoEffectInstant => "instant",
            FilterName::PhotoEffectNoir => "noir",
            FilterName::PhotoEffectProcess => "process",
            FilterName::PhotoEffectTonal => "tonal",
            FilterName::PhotoEffectTransfer => "transfer",
            FilterName::SepiaTone => "sepia",
            FilterName::ColorClamp => "color-clamp",
            FilterName::ColorInvert => "invert",
            FilterName::ColorMonochrome => "monochrome",
            FilterName::SpotLight => "spotlight",
            FilterName::ColorPosterize => "posterize",
            FilterName::BoxBlur => "box-blur",
            FilterName::DiscBlur => "disc-blur",
            FilterName::GaussianBlur => "gaussian-blur",
            FilterName::MaskedVariableBlur => "masked-variable-blur",
            FilterName::MedianFilter => "median",
            FilterName::MotionBlur => "motion-blur",
            FilterName::NoiseReduction => "noise-reduction",
        }
    }
}

impl fmt::Display for FilterName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identifier())
    }
}

impl FromStr for FilterName {
    type Err = EditorError;

    /// Accepts the canonical identifier or the case-insensitive alias
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        FilterName::ALL
            .iter()
            .copied()
            .find(|name| name.identifier() == trimmed || name.alias().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| EditorError::UnknownFilter { name: s.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_vocabulary_is_complete_and_unique() {
        let identifiers: HashSet<_> = FilterName::ALL.iter().map(|n| n.identifier()).collect();
        let aliases: HashSet<_> = FilterName::ALL.iter().map(|n| n.alias()).collect();
        assert_eq!(identifiers.len(), 21);
        assert_eq!(aliases.len(), 21);
    }

    #[test]
    fn test_parse_identifier_and_alias() {
        assert_eq!("CIPhotoEffectNoir".parse::<FilterName>().unwrap(), FilterName::PhotoEffectNoir);
        assert_eq!("Sepia".parse::<FilterName>().unwrap(), FilterName::SepiaTone);
        for name in FilterName::ALL {
            assert_eq!(name.identifier().parse::<FilterName>().unwrap(), name);
        }
    }

    #[test]
    fn test_unknown_name() {
        let err = "NotARealFilter".parse::<FilterName>().unwrap_err();
        assert!(matches!(err, EditorError::UnknownFilter { name } if name == "NotARealFilter"));
    }
}
