use std::fmt;

use crate::{file::parser::Parser, Result};

/// Describes how to recover the metadata of a generic parameter from a closure context.
///
/// Capture descriptors store these recipes in a compact textual form:
///
/// | Encoding | Source |
/// |---|---|
/// | `B<n>` | [`MetadataSource::ClosureBinding`] |
/// | `R<n>` | [`MetadataSource::ReferenceCapture`] |
/// | `M<n>` | [`MetadataSource::MetadataCapture`] |
/// | `G<n><source>_` | [`MetadataSource::GenericArgument`] |
/// | `S` | [`MetadataSource::SelfMetadata`] |
/// | `W` | [`MetadataSource::SelfWitnessTable`] |
///
/// # Examples
///
/// ```rust
/// use reflscope::MetadataSource;
///
/// let source = MetadataSource::decode(b"G1R0_")?;
/// assert_eq!(
///     source,
///     MetadataSource::GenericArgument(1, Box::new(MetadataSource::ReferenceCapture(0)))
/// );
/// assert_eq!(source.to_string(), "G1R0_");
/// # Ok::<(), reflscope::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MetadataSource {
    /// The metadata is stored directly in the context's binding area at this index
    ClosureBinding(u32),
    /// Read the isa pointer of the captured reference at this index
    ReferenceCapture(u32),
    /// The captured value at this index is itself a metadata pointer
    MetadataCapture(u32),
    /// Generic argument at this index of the metadata found through the nested source
    GenericArgument(u32, Box<MetadataSource>),
    /// The `Self` metadata of a witness method
    SelfMetadata,
    /// The `Self` witness table of a witness method
    SelfWitnessTable,
}

impl MetadataSource {
    /// Decode an encoded source. The whole input must be consumed.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] or [`crate::Error::OutOfBounds`] for encodings that
    /// do not follow the grammar above.
    pub fn decode(encoded: &[u8]) -> Result<MetadataSource> {
        let mut parser = Parser::new(encoded);
        let source = Self::decode_source(&mut parser, 0)?;
        if parser.has_more_data() {
            return Err(malformed_error!(
                "Trailing bytes after metadata source at offset {}",
                parser.pos()
            ));
        }

        Ok(source)
    }

    fn decode_source(parser: &mut Parser<'_>, depth: usize) -> Result<MetadataSource> {
        if depth > 64 {
            return Err(crate::Error::RecursionLimit(64));
        }

        let tag = parser.read_le::<u8>()?;
        Ok(match tag {
            b'B' => MetadataSource::ClosureBinding(parser.read_decimal()?),
            b'R' => MetadataSource::ReferenceCapture(parser.read_decimal()?),
            b'M' => MetadataSource::MetadataCapture(parser.read_decimal()?),
            b'G' => {
                let index = parser.read_decimal()?;
                let nested = Self::decode_source(parser, depth + 1)?;
                if parser.read_le::<u8>()? != b'_' {
                    return Err(malformed_error!(
                        "Unterminated generic argument source at offset {}",
                        parser.pos()
                    ));
                }
                MetadataSource::GenericArgument(index, Box::new(nested))
            }
            b'S' => MetadataSource::SelfMetadata,
            b'W' => MetadataSource::SelfWitnessTable,
            other => {
                return Err(malformed_error!(
                    "Unknown metadata source tag {:#04x}",
                    other
                ))
            }
        })
    }

    /// Write the source as an s-expression, as used by the diagnostic dumps.
    ///
    /// # Errors
    /// Propagates formatting errors of the sink.
    pub fn write_sexpr(&self, out: &mut impl fmt::Write) -> fmt::Result {
        match self {
            MetadataSource::ClosureBinding(index) => {
                write!(out, "(closure_binding index={index})")
            }
            MetadataSource::ReferenceCapture(index) => {
                write!(out, "(reference_capture index={index})")
            }
            MetadataSource::MetadataCapture(index) => {
                write!(out, "(metadata_capture index={index})")
            }
            MetadataSource::GenericArgument(index, source) => {
                write!(out, "(generic_argument index={index} ")?;
                source.write_sexpr(out)?;
                out.write_char(')')
            }
            MetadataSource::SelfMetadata => out.write_str("(self)"),
            MetadataSource::SelfWitnessTable => out.write_str("(self_witness_table)"),
        }
    }
}

impl fmt::Display for MetadataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataSource::ClosureBinding(index) => write!(f, "B{index}"),
            MetadataSource::ReferenceCapture(index) => write!(f, "R{index}"),
            MetadataSource::MetadataCapture(index) => write!(f, "M{index}"),
            MetadataSource::GenericArgument(index, source) => write!(f, "G{index}{source}_"),
            MetadataSource::SelfMetadata => f.write_str("S"),
            MetadataSource::SelfWitnessTable => f.write_str("W"),
        }
    }
}
