//! Builder configuration
//!
//! This module provides the knobs of [`crate::TypeRefBuilder`]: recursion bounds for decoding
//! and substitution, the pointer width of the target, and how mangled names are normalized.

/// Pointer width of the target process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PointerSize {
    /// 32-bit targets
    Bit32,
    /// 64-bit targets
    #[default]
    Bit64,
}

impl PointerSize {
    /// Pointer width in bytes
    #[must_use]
    pub fn bytes(self) -> usize {
        match self {
            PointerSize::Bit32 => 4,
            PointerSize::Bit64 => 8,
        }
    }
}

/// Configuration for a [`crate::TypeRefBuilder`]
///
/// The defaults match a 64-bit target and accept every well-formed image produced by a
/// current compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuilderConfig {
    /// Maximum depth of nested types while decoding a demangle tree or substituting generic
    /// arguments (default: 100)
    pub max_recursion_depth: usize,

    /// Width of absolute pointers in symbolic references and remote memory (default: 64-bit)
    pub pointer_size: PointerSize,

    /// Skip a leading `$s` mangling prefix of type names read from the metadata (default: true)
    pub strip_mangling_prefix: bool,

    /// Maximum number of superclasses visited while resolving a dependent member type
    /// (default: 64)
    pub max_superclass_chain: usize,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            max_recursion_depth: 100,
            pointer_size: PointerSize::Bit64,
            strip_mangling_prefix: true,
            max_superclass_chain: 64,
        }
    }
}

impl BuilderConfig {
    /// Creates a configuration for a 32-bit target
    #[must_use]
    pub fn target_32bit() -> Self {
        Self {
            pointer_size: PointerSize::Bit32,
            ..Self::default()
        }
    }

    /// Creates a configuration with tight recursion bounds
    ///
    /// Suited for untrusted images, where deeply nested names are more likely an attack on
    /// the stack than a real type.
    #[must_use]
    pub fn strict() -> Self {
        Self {
            max_recursion_depth: 32,
            max_superclass_chain: 16,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_config_presets() {
        let default = BuilderConfig::default();
        assert_eq!(default.max_recursion_depth, 100);
        assert_eq!(default.pointer_size.bytes(), 8);
        assert!(default.strip_mangling_prefix);
        assert_eq!(default.max_superclass_chain, 64);

        let target_32bit = BuilderConfig::target_32bit();
        assert_eq!(target_32bit.pointer_size, PointerSize::Bit32);
        assert_eq!(target_32bit.pointer_size.bytes(), 4);
        assert_eq!(target_32bit.max_recursion_depth, 100);

        let strict = BuilderConfig::strict();
        assert!(strict.max_recursion_depth < default.max_recursion_depth);
        assert!(strict.max_superclass_chain < default.max_superclass_chain);
        assert_eq!(strict.pointer_size, PointerSize::Bit64);
    }
}
