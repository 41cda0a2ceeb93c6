//! The target machine model.
//!
//! A [`TargetMachine`] is an in-memory description of the machine code is
//! selected for: its instructions (each with one or more pattern graphs and
//! an emit template), its locations (registers and the null location), and
//! the pointer parameters the pointer-lowering transformation needs.
//! Descriptions may be hand-written or machine-generated; the selector only
//! ever consumes the structure defined here. Lookups are by identifier, and
//! a missing identifier is an error, never a silent default.

mod emit;

pub use emit::{EmitStringPart, EmitStringTemplate};

use bitflags::bitflags;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::{
    ir::{InstructionId, LocationId, NodeId, PatternId},
    opstruct::OpStructure,
    Error, Result,
};

bitflags! {
    /// Boolean properties of an instruction.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct InstrFlags: u8 {
        /// The instruction only copies a value between locations
        const COPY = 1 << 0;
        /// The instruction emits no code (used for value reinterpretation)
        const INACTIVE = 1 << 1;
        /// The instruction defines a value pinned to the null location
        const NULL = 1 << 2;
        /// The generic phi instruction
        const PHI = 1 << 3;
        /// The instruction is a SIMD instruction; its pattern consists of
        /// several isomorphic weakly connected components
        const SIMD = 1 << 4;
    }
}

impl Serialize for InstrFlags {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.bits())
    }
}

impl<'de> Deserialize<'de> for InstrFlags {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        let bits = u8::deserialize(deserializer)?;
        InstrFlags::from_bits(bits)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown instruction flags {bits:#x}")))
    }
}

/// Cost and classification properties of an instruction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrProperties {
    /// Static code size contribution, in bytes
    #[serde(rename = "code-size")]
    pub code_size: u64,
    /// Latency, in cycles
    pub latency: u64,
    /// Boolean classification flags
    pub flags: InstrFlags,
}

impl InstrProperties {
    /// Creates properties with the given costs and no flags set.
    #[must_use]
    pub fn new(code_size: u64, latency: u64) -> Self {
        InstrProperties {
            code_size,
            latency,
            flags: InstrFlags::empty(),
        }
    }
}

/// One pattern of an instruction: the op-structure to embed, the data nodes
/// forming its external interface, and the emit template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrPattern {
    /// Identifier of the pattern within its instruction
    pub id: PatternId,
    /// The pattern graph with its constraints
    #[serde(rename = "op-structure")]
    pub op_structure: OpStructure,
    /// Pattern value nodes consumed from outside the pattern
    #[serde(rename = "input-data")]
    pub input_data: Vec<NodeId>,
    /// Pattern value nodes produced for use outside the pattern
    #[serde(rename = "output-data")]
    pub output_data: Vec<NodeId>,
    /// Template of the assembly text to emit
    #[serde(rename = "emit-template")]
    pub emit_template: EmitStringTemplate,
}

/// An instruction of the target machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instruction {
    /// Identifier of the instruction
    pub id: InstructionId,
    /// The patterns describing what the instruction can compute, in order
    pub patterns: Vec<InstrPattern>,
    /// Cost and classification properties
    pub properties: InstrProperties,
}

impl Instruction {
    /// Returns the pattern with the given identifier.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingEntity`] if the instruction has no such
    /// pattern.
    pub fn pattern(&self, id: PatternId) -> Result<&InstrPattern> {
        self.patterns
            .iter()
            .find(|p| p.id == id)
            .ok_or(Error::MissingEntity {
                kind: "pattern",
                id: u64::from(id.raw()),
            })
    }
}

/// A location a value can live in (a register, or the null location).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    /// Identifier of the location
    pub id: LocationId,
    /// Assembly-level name
    pub name: String,
    /// Fixed value of the location, if it always holds one (e.g. a zero
    /// register)
    #[serde(rename = "fixed-value")]
    pub fixed_value: Option<i64>,
}

/// An in-memory target machine description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetMachine {
    /// Identifier of the target
    pub id: String,
    /// Instructions by identifier
    pub instructions: FxHashMap<InstructionId, Instruction>,
    /// Locations by identifier
    pub locations: FxHashMap<LocationId, Location>,
    /// Pointer width in bits
    #[serde(rename = "pointer-size")]
    pub pointer_size: u16,
    /// Bit representation of the null pointer
    #[serde(rename = "null-pointer-value")]
    pub null_pointer_value: i64,
}

impl TargetMachine {
    /// Returns the instruction with the given identifier.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingEntity`] if the target has no such
    /// instruction.
    pub fn instruction(&self, id: InstructionId) -> Result<&Instruction> {
        self.instructions.get(&id).ok_or(Error::MissingEntity {
            kind: "instruction",
            id: u64::from(id.raw()),
        })
    }

    /// Returns the location with the given identifier.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingEntity`] if the target has no such location.
    pub fn location(&self, id: LocationId) -> Result<&Location> {
        self.locations.get(&id).ok_or(Error::MissingEntity {
            kind: "location",
            id: u64::from(id.raw()),
        })
    }

    /// Returns the location identifiers of the target, ascending.
    #[must_use]
    pub fn location_ids(&self) -> Vec<LocationId> {
        let mut ids: Vec<LocationId> = self.locations.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Returns the instruction identifiers of the target, ascending.
    #[must_use]
    pub fn instruction_ids(&self) -> Vec<InstructionId> {
        let mut ids: Vec<InstructionId> = self.instructions.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}
