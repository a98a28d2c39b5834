//! The target environment's block record model (§3 "Block record", "Input
//! encoding", "Block store") plus the closed opcode vocabulary (§6).

use indexmap::IndexMap;
use serde::{Serialize, Serializer};

use crate::error::CompileError;

/// Opaque, monotonically-issued block id. A plain `String` (the target
/// environment's own ids are short alphanumeric strings); kept as a newtype
/// so a bare numeric index can never be confused for one.
pub type BlockId = String;

/// The closed opcode vocabulary this compiler ever emits (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    EventWhenFlagClicked,
    ControlStop,
    ControlIf,
    ControlRepeat,
    ControlRepeatUntil,
    DataSetVariableTo,
    DataAddToList,
    DataDeleteOfList,
    DataReplaceItemOfList,
    DataItemOfList,
    DataLengthOfList,
    LooksSay,
    OperatorAdd,
    OperatorSubtract,
    OperatorMultiply,
    OperatorDivide,
    OperatorLt,
    OperatorGt,
    OperatorEquals,
    OperatorNot,
    ProceduresDefinition,
    ProceduresCall,
}

impl Opcode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EventWhenFlagClicked => "event_whenflagclicked",
            Self::ControlStop => "control_stop",
            Self::ControlIf => "control_if",
            Self::ControlRepeat => "control_repeat",
            Self::ControlRepeatUntil => "control_repeat_until",
            Self::DataSetVariableTo => "data_setvariableto",
            Self::DataAddToList => "data_addtolist",
            Self::DataDeleteOfList => "data_deleteoflist",
            Self::DataReplaceItemOfList => "data_replaceitemoflist",
            Self::DataItemOfList => "data_itemoflist",
            Self::DataLengthOfList => "data_lengthoflist",
            Self::LooksSay => "looks_say",
            Self::OperatorAdd => "operator_add",
            Self::OperatorSubtract => "operator_subtract",
            Self::OperatorMultiply => "operator_multiply",
            Self::OperatorDivide => "operator_divide",
            Self::OperatorLt => "operator_lt",
            Self::OperatorGt => "operator_gt",
            Self::OperatorEquals => "operator_equals",
            Self::OperatorNot => "operator_not",
            Self::ProceduresDefinition => "procedures_definition",
            Self::ProceduresCall => "procedures_call",
        }
    }
}

impl Serialize for Opcode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A literal shadow payload: `[4, "num"]` for numbers, `[10, "text"]` for
/// strings, embedded inside input encoding variant `1`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ShadowPayload {
    Number(NumShadow),
    Text(TextShadow),
}

#[derive(Debug, Clone, PartialEq)]
pub struct NumShadow(pub String);
#[derive(Debug, Clone, PartialEq)]
pub struct TextShadow(pub String);

impl Serialize for NumShadow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeTuple;
        let mut tup = serializer.serialize_tuple(2)?;
        tup.serialize_element(&4)?;
        tup.serialize_element(&self.0)?;
        tup.end()
    }
}

impl Serialize for TextShadow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeTuple;
        let mut tup = serializer.serialize_tuple(2)?;
        tup.serialize_element(&10)?;
        tup.serialize_element(&self.0)?;
        tup.end()
    }
}

/// A variable reporter tuple `[12, name, name]`.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableReporter(pub String);

impl Serialize for VariableReporter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeTuple;
        let mut tup = serializer.serialize_tuple(3)?;
        tup.serialize_element(&12)?;
        tup.serialize_element(&self.0)?;
        tup.serialize_element(&self.0)?;
        tup.end()
    }
}

/// The operand of a block-reference input: either a nested block's id, or a
/// variable reporter tuple.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Operand {
    Block(BlockId),
    Variable(VariableReporter),
}

/// One of the three tagged-array shapes an input slot can take (§3 "Input
/// encoding").
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    /// `[1, payload]`
    LiteralShadow(ShadowPayload),
    /// `[2, operand]`
    BlockRef(Operand),
    /// `[3, operand, shadow_fallback]`
    BlockRefWithShadow(Operand, ShadowPayload),
}

impl Serialize for Input {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeTuple;
        match self {
            Input::LiteralShadow(payload) => {
                let mut tup = serializer.serialize_tuple(2)?;
                tup.serialize_element(&1)?;
                tup.serialize_element(payload)?;
                tup.end()
            }
            Input::BlockRef(operand) => {
                let mut tup = serializer.serialize_tuple(2)?;
                tup.serialize_element(&2)?;
                tup.serialize_element(operand)?;
                tup.end()
            }
            Input::BlockRefWithShadow(operand, shadow) => {
                let mut tup = serializer.serialize_tuple(3)?;
                tup.serialize_element(&3)?;
                tup.serialize_element(operand)?;
                tup.serialize_element(shadow)?;
                tup.end()
            }
        }
    }
}

/// A field value: `[value, variable_id_or_null]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field(pub String, pub Option<String>);

/// Optional procedure metadata carried on `procedures_definition` and
/// `procedures_call` blocks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mutation {
    pub proccode: String,
    /// JSON-encoded ordered list of argument ids, stored pre-encoded
    /// because the target environment's schema represents it as a JSON
    /// *string*, not a nested array (invariant 3, §3).
    pub argumentids: String,
    pub warp: String,
    pub hasnext: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<serde_json::Value>,
}

impl Mutation {
    pub fn procedure(proccode: impl Into<String>, params: &[String]) -> Self {
        Self {
            proccode: proccode.into(),
            argumentids: serde_json::to_string(params).unwrap_or_else(|_| "[]".to_string()),
            warp: "false".to_string(),
            hasnext: "true".to_string(),
            children: Vec::new(),
        }
    }

    pub fn stop_all() -> Self {
        Self {
            proccode: String::new(),
            argumentids: "[]".to_string(),
            warp: "false".to_string(),
            hasnext: "false".to_string(),
            children: Vec::new(),
        }
    }
}

/// One block record (§3 "Block record").
#[derive(Debug, Clone, Serialize)]
pub struct Block {
    pub opcode: Opcode,
    pub next: Option<BlockId>,
    pub parent: Option<BlockId>,
    pub inputs: IndexMap<String, Input>,
    pub fields: IndexMap<String, Field>,
    pub shadow: bool,
    pub top_level: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mutation: Option<Mutation>,
}

impl Block {
    pub fn new(opcode: Opcode) -> Self {
        Self {
            opcode,
            next: None,
            parent: None,
            inputs: IndexMap::new(),
            fields: IndexMap::new(),
            shadow: false,
            top_level: false,
            mutation: None,
        }
    }

    pub fn with_input(mut self, name: &str, input: Input) -> Self {
        self.inputs.insert(name.to_string(), input);
        self
    }

    pub fn with_field(mut self, name: &str, field: Field) -> Self {
        self.fields.insert(name.to_string(), field);
        self
    }

    pub fn with_mutation(mut self, mutation: Mutation) -> Self {
        self.mutation = Some(mutation);
        self
    }
}

/// The block store: every block produced for one sprite's scripts, keyed by
/// opaque id, insertion-ordered for deterministic JSON (§3 "Block store",
/// §5 "byte-identical ... modulo object-field order").
#[derive(Debug, Clone, Default)]
pub struct BlockStore {
    blocks: IndexMap<BlockId, Block>,
}

impl Serialize for BlockStore {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.blocks.serialize(serializer)
    }
}

impl BlockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: BlockId, block: Block) {
        self.blocks.insert(id, block);
    }

    pub fn get(&self, id: &str) -> Option<&Block> {
        self.blocks.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Block> {
        self.blocks.get_mut(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.blocks.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&BlockId, &Block)> {
        self.blocks.iter()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Checks the seven invariants from §8: exactly one `top_level` root
    /// with opcode `event_whenflagclicked` and a null parent; every
    /// `parent`/`next` reference resolves; every block-reference input's id
    /// resolves; every `procedures_call` has a matching
    /// `procedures_definition`.
    pub fn validate(&self) -> Result<(), CompileError> {
        let mut roots = self.blocks.iter().filter(|(_, b)| b.top_level);
        let (root_id, root) = roots
            .next()
            .ok_or_else(|| CompileError::internal("no top_level block in block store"))?;
        if roots.next().is_some() {
            return Err(CompileError::internal("more than one top_level block"));
        }
        if root.opcode.as_str() != Opcode::EventWhenFlagClicked.as_str() {
            return Err(CompileError::internal("top_level block is not event_whenflagclicked"));
        }
        if root.parent.is_some() {
            return Err(CompileError::internal(format!("top_level block {root_id} has a parent")));
        }

        for (id, block) in &self.blocks {
            if !block.top_level {
                let parent = block
                    .parent
                    .as_ref()
                    .ok_or_else(|| CompileError::internal(format!("non-root block {id} has no parent")))?;
                if !self.contains(parent) {
                    return Err(CompileError::internal(format!(
                        "block {id} references missing parent {parent}"
                    )));
                }
            }
            if let Some(next) = &block.next {
                let next_block = self
                    .get(next)
                    .ok_or_else(|| CompileError::internal(format!("block {id} references missing next {next}")))?;
                if next_block.parent.as_deref() != Some(id.as_str()) {
                    return Err(CompileError::internal(format!(
                        "next block {next} does not point back to parent {id}"
                    )));
                }
            }
            for input in block.inputs.values() {
                self.validate_input_refs(input, id)?;
            }
        }

        self.validate_procedure_calls()?;
        Ok(())
    }

    fn validate_input_refs(&self, input: &Input, owner: &str) -> Result<(), CompileError> {
        let operand = match input {
            Input::BlockRef(operand) | Input::BlockRefWithShadow(operand, _) => operand,
            Input::LiteralShadow(_) => return Ok(()),
        };
        if let Operand::Block(id) = operand {
            if !self.contains(id) {
                return Err(CompileError::internal(format!(
                    "block {owner} references missing input block {id}"
                )));
            }
        }
        Ok(())
    }

    fn validate_procedure_calls(&self) -> Result<(), CompileError> {
        let definitions: IndexMap<&str, &Mutation> = self
            .blocks
            .values()
            .filter(|b| b.opcode.as_str() == Opcode::ProceduresDefinition.as_str())
            .filter_map(|b| b.mutation.as_ref().map(|m| (m.proccode.as_str(), m)))
            .collect();

        for block in self.blocks.values() {
            if block.opcode.as_str() != Opcode::ProceduresCall.as_str() {
                continue;
            }
            let Some(call_mutation) = &block.mutation else {
                return Err(CompileError::internal("procedures_call without mutation"));
            };
            let Some(def_mutation) = definitions.get(call_mutation.proccode.as_str()) else {
                return Err(CompileError::internal(format!(
                    "procedures_call {} has no matching procedures_definition",
                    call_mutation.proccode
                )));
            };
            if def_mutation.argumentids != call_mutation.argumentids {
                return Err(CompileError::internal(format!(
                    "procedures_call {} argumentids do not match its definition",
                    call_mutation.proccode
                )));
            }
        }
        Ok(())
    }
}
