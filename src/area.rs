//! Memory area definitions for the S7 protocol.
//!
//! This module defines the [`MemoryArea`] enum which represents the controller
//! memory regions a tag can address.
//!
//! # Memory Areas Overview
//!
//! | Area | Notation | Wire code | Block number |
//! |------|----------|:---------:|:------------:|
//! | Data block | `DB<n>` | 0x84 | required |
//! | Inputs | `I` / `E` | 0x81 | 0 |
//! | Outputs | `Q` / `A` | 0x82 | 0 |
//! | Memory (flags) | `M` | 0x83 | 0 |
//! | Counters | `C` / `Z` | 0x1C | 0 |
//! | Timers | `T` | 0x1D | 0 |
//!
//! # Example
//!
//! ```
//! use s7_tags::MemoryArea;
//!
//! assert!(MemoryArea::DataBlock.uses_block_number());
//! assert!(!MemoryArea::Memory.uses_block_number());
//! assert_eq!(MemoryArea::Output.to_string(), "Q");
//! ```

/// Memory areas addressable on the controller.
///
/// Only [`MemoryArea::DataBlock`] carries a block number; every other area
/// is a single flat byte space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MemoryArea {
    /// Data block (DB) area.
    DataBlock,
    /// Process image of the inputs.
    Input,
    /// Process image of the outputs.
    Output,
    /// Memory (flag/marker) area.
    Memory,
    /// Counter area.
    Counter,
    /// Timer area.
    Timer,
}

impl MemoryArea {
    /// Returns the area code used in item specifications.
    pub(crate) fn code(self) -> u8 {
        match self {
            MemoryArea::Input => 0x81,
            MemoryArea::Output => 0x82,
            MemoryArea::Memory => 0x83,
            MemoryArea::DataBlock => 0x84,
            MemoryArea::Counter => 0x1C,
            MemoryArea::Timer => 0x1D,
        }
    }

    /// Returns whether tags in this area carry a block number.
    ///
    /// # Example
    ///
    /// ```
    /// use s7_tags::MemoryArea;
    ///
    /// assert!(MemoryArea::DataBlock.uses_block_number());
    /// assert!(!MemoryArea::Input.uses_block_number());
    /// ```
    pub fn uses_block_number(self) -> bool {
        matches!(self, MemoryArea::DataBlock)
    }
}

impl std::fmt::Display for MemoryArea {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MemoryArea::DataBlock => write!(f, "DB"),
            MemoryArea::Input => write!(f, "I"),
            MemoryArea::Output => write!(f, "Q"),
            MemoryArea::Memory => write!(f, "M"),
            MemoryArea::Counter => write!(f, "C"),
            MemoryArea::Timer => write!(f, "T"),
        }
    }
}
