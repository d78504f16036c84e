use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{EditorError, Result};
use crate::filters::effects::{
    BoxBlur, ColorClamp, ColorInvert, ColorMonochrome, ColorPosterize, DiscBlur, GaussianBlur,
    MaskedVariableBlur, MedianFilter, MotionBlur, NoiseReduction, PhotoEffect, SepiaTone,
    SharpenLuminance, SpotLight,
};
use crate::filters::{FilterName, ImageFilter};

type FilterFactory = Box<dyn Fn() -> Arc<dyn ImageFilter> + Send + Sync>;

/// Registry mapping every [`FilterName`] to a factory for its implementation.
///
/// Built-ins are registered on construction; [`FilterRegistry::register`]
/// replaces the implementation behind a name.
pub struct FilterRegistry {
    filters: HashMap<FilterName, FilterFactory>,
}

impl FilterRegistry {
    /// Create a registry with every built-in filter
    pub fn new() -> Self {
        let mut registry = Self {
            filters: HashMap::new(),
        };
        registry.register_builtin_filters();
        registry
    }

    fn register_builtin_filters(&mut self) {
        self.register(FilterName::SharpenLuminance, || Arc::new(SharpenLuminance::new()));

        // Photo looks
        self.register(FilterName::PhotoEffectChrome, || Arc::new(PhotoEffect::Chrome));
        self.register(FilterName::PhotoEffectFade, || Arc::new(PhotoEffect::Fade));
        self.register(FilterName::PhotoEffectInstant, || Arc::new(PhotoEffect::Instant));
        self.register(FilterName::PhotoEffectNoir, || Arc::new(PhotoEffect::Noir));
        self.register(FilterName::PhotoEffectProcess, || Arc::new(PhotoEffect::Process));
        self.register(FilterName::PhotoEffectTonal, || Arc::new(PhotoEffect::Tonal));
        self.register(FilterName::PhotoEffectTransfer, || Arc::new(PhotoEffect::Transfer));

        // Colour adjustments
        self.register(FilterName::SepiaTone, || Arc::new(SepiaTone::new()));
        self.register(FilterName::ColorClamp, || Arc::new(ColorClamp::new()));
        self.register(FilterName::ColorInvert, || Arc::new(ColorInvert));
        self.register(FilterName::ColorMonochrome, || Arc::new(ColorMonochrome::new()));
        self.register(FilterName::SpotLight, || Arc::new(SpotLight::new()));
        self.register(FilterName::ColorPosterize, || Arc::new(ColorPosterize::new()));

        // Blurs
        self.register(FilterName::BoxBlur, || Arc::new(BoxBlur::new()));
        self.register(FilterName::DiscBlur, || Arc::new(DiscBlur::new()));
        self.register(FilterName::GaussianBlur, || Arc::new(GaussianBlur::new()));
        self.register(FilterName::MaskedVariableBlur, || Arc::new(MaskedVariableBlur::new()));
        self.register(FilterName::MedianFilter, || Arc::new(MedianFilter));
        self.register(FilterName::MotionBlur, || Arc::new(MotionBlur::new()));
        self.register(FilterName::NoiseReduction, || Arc::new(NoiseReduction::new()));
    }

    /// Register (or replace) the implementation behind `name`
    pub fn register<F>(&mut self, name: FilterName, factory: F)
    where
        F: Fn() -> Arc<dyn ImageFilter> + Send + Sync + 'static,
    {
        self.filters.insert(name, Box::new(factory));
    }

    pub fn get(&self, name: FilterName) -> Result<Arc<dyn ImageFilter>> {
        self.filters
            .get(&name)
            .map(|factory| factory())
            .ok_or_else(|| EditorError::UnknownFilter { name: name.identifier().to_string() })
    }

    /// Look a filter up by identifier or alias
    pub fn get_by_name(&self, name: &str) -> Result<Arc<dyn ImageFilter>> {
        self.get(name.parse()?)
    }

    /// Registered names in vocabulary order
    pub fn available_filters(&self) -> Vec<FilterName> {
        FilterName::ALL
            .iter()
            .copied()
            .filter(|name| self.filters.contains_key(name))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl Default for FilterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_name_is_registered() {
        let registry = FilterRegistry::new();
        assert_eq!(registry.len(), FilterName::ALL.len());
        for name in FilterName::ALL {
            let filter = registry.get(name).unwrap();
            assert_eq!(filter.name(), name);
            assert!(!filter.description().is_empty());
        }
    }

    #[test]
    fn test_lookup_by_string() {
        let registry = FilterRegistry::new();
        assert_eq!(registry.get_by_name("CISepiaTone").unwrap().name(), FilterName::SepiaTone);
        assert!(matches!(
            registry.get_by_name("CIKaleidoscope"),
            Err(EditorError::UnknownFilter { .. })
        ));
    }

    #[test]
    fn test_register_replaces_builtin() {
        let mut registry = FilterRegistry::new();
        registry.register(FilterName::SepiaTone, || Arc::new(SepiaTone { intensity: 0.5 }));
        assert_eq!(registry.len(), 21);
        assert_eq!(registry.available_filters()[0], FilterName::SharpenLuminance);
    }
}
